//! Broker port - abstraction for the publish/subscribe transport
//!
//! This trait lets the broker client publish without knowing the MQTT
//! library or the TCP stack underneath.

use core::future::Future;

use crate::config::BrokerSettings;

/// Error type for broker operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BrokerError {
    /// Not connected to the broker
    NotConnected,
    /// Waiting out the reconnect backoff; no attempt was made
    BackingOff,
    /// Broker host could not be resolved
    DnsFailed,
    /// TCP connection to the broker failed
    TransportFailed,
    /// Broker refused the CONNECT (bad credentials, not authorized, ...)
    Rejected,
    /// Keepalive exchange failed
    KeepAliveFailed,
    /// Publish was not accepted
    PublishFailed,
}

/// Port for the message broker connection
///
/// # Example Implementation
///
/// ```ignore
/// impl BrokerPort for MqttBroker {
///     async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BrokerError> {
///         self.client
///             .send_message(topic, payload, QualityOfService::QoS0, false)
///             .await
///             .map_err(|_| BrokerError::PublishFailed)
///     }
///     // ...
/// }
/// ```
pub trait BrokerPort {
    /// Open the transport and perform the authenticated handshake
    fn connect(&mut self, settings: &BrokerSettings) -> impl Future<Output = Result<(), BrokerError>>;

    /// Whether the session is believed to be alive
    fn is_connected(&self) -> bool;

    /// Process inbound traffic and keepalives; call every tick while connected
    fn poll(&mut self) -> impl Future<Output = Result<(), BrokerError>>;

    /// Send one message (QoS 0, not retained)
    fn publish(&mut self, topic: &str, payload: &[u8]) -> impl Future<Output = Result<(), BrokerError>>;
}
