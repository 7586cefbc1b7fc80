//! Wi-Fi port - abstraction over the station-mode radio
//!
//! The link manager drives connectivity through this trait without knowing
//! the radio (CYW43, ESP, mock).

use core::future::Future;
use core::net::Ipv4Addr;

use crate::config::WifiCredentials;

/// Error type for Wi-Fi operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// The radio rejected or failed the join request
    JoinFailed,
    /// The link did not come up within the allowed wait
    Timeout,
    /// Radio driver error
    DriverError,
}

/// Link status as reported by the radio
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    /// Associated and holding an IPv4 address
    Connected,
    /// Association or address acquisition in progress
    Pending,
    /// Not associated
    Disconnected,
}

/// Port for the wireless link
///
/// # Example Implementation
///
/// ```ignore
/// impl WifiPort for Cyw43Link {
///     async fn begin(&mut self, creds: &WifiCredentials) -> Result<(), LinkError> {
///         self.control
///             .join(creds.ssid, JoinOptions::new(creds.password.as_bytes()))
///             .await
///             .map_err(|_| LinkError::JoinFailed)
///     }
///     // ...
/// }
/// ```
pub trait WifiPort {
    /// Issue a connect request with the given credentials
    ///
    /// Returning `Ok` means the request was accepted, not that the link is
    /// up; callers poll [`WifiPort::status`] for that.
    fn begin(
        &mut self,
        credentials: &WifiCredentials,
    ) -> impl Future<Output = Result<(), LinkError>>;

    /// Drop the current association, if any
    fn disconnect(&mut self) -> impl Future<Output = ()>;

    /// Current link status (cheap, no radio traffic)
    fn status(&mut self) -> LinkStatus;

    /// IPv4 address assigned to the station, if any
    fn local_address(&self) -> Option<Ipv4Addr>;
}
