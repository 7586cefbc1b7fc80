//! Update port - remote firmware update listener

use core::future::Future;

/// Error type for update handling
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateError {
    /// The update transfer was interrupted
    TransferFailed,
    /// The received image failed verification
    InvalidImage,
}

/// Port for the remote update listener
///
/// `handle` is called on every scheduler tick and must return quickly when
/// no update is pending.
pub trait UpdatePort {
    fn handle(&mut self) -> impl Future<Output = Result<(), UpdateError>>;
}
