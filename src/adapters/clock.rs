//! Embassy time source implementing the Clock port

use embassy_time::Instant;

use crate::ports::Clock;

/// Uptime from the embassy time driver plus an optional wall-clock offset
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyClock {
    /// Unix seconds at boot, once synchronized
    boot_unix_secs: Option<u64>,
}

impl EmbassyClock {
    pub const fn new() -> Self {
        Self {
            boot_unix_secs: None,
        }
    }

    /// Anchor wall-clock time to `unix_now`
    pub fn synchronize(&mut self, unix_now: u64) {
        self.boot_unix_secs = Some(unix_now.saturating_sub(Instant::now().as_secs()));
    }
}

impl Clock for EmbassyClock {
    fn uptime_ms(&self) -> u32 {
        // truncation gives the wrapping 32-bit counter
        Instant::now().as_millis() as u32
    }

    fn unix_time(&self) -> Option<u64> {
        self.boot_unix_secs
            .map(|boot| boot + Instant::now().as_secs())
    }
}
