//! Update listener that never has an update pending
//!
//! The Pico 2 W has no over-the-air update service, so the firmware wires
//! this listener in to keep the update slot of the scheduler tick serviced.
//! A real listener (e.g. an embassy-boot based receiver) replaces it without
//! changes to the scheduler.

use crate::ports::{UpdateError, UpdatePort};

#[derive(Debug, Default)]
pub struct IdleUpdateListener {
    announced: bool,
}

impl IdleUpdateListener {
    pub const fn new() -> Self {
        Self { announced: false }
    }
}

impl UpdatePort for IdleUpdateListener {
    async fn handle(&mut self) -> Result<(), UpdateError> {
        if !self.announced {
            info!("Remote update listener idle");
            self.announced = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn test_idle_listener_always_succeeds() {
        let mut listener = IdleUpdateListener::new();
        for _ in 0..3 {
            assert_eq!(block_on(listener.handle()), Ok(()));
        }
        assert!(listener.announced);
    }
}
