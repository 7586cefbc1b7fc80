//! Broker client - owns the publish connection
//!
//! Reconnection is a non-blocking state machine: every call to
//! [`BrokerClient::ensure_connected`] makes at most one connect attempt and
//! attempts are spaced by a backoff interval, so the scheduler tick always
//! regains control quickly.

use crate::config::BrokerSettings;
use crate::ports::{elapsed_ms, BrokerError, BrokerPort};

/// Connection state owned by the broker client
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BrokerState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct BrokerClient<B> {
    port: B,
    settings: BrokerSettings,
    state: BrokerState,
    backoff_ms: u32,
    /// Uptime of the last connect attempt; `None` before the first one
    last_attempt_ms: Option<u32>,
}

impl<B: BrokerPort> BrokerClient<B> {
    pub fn new(port: B, settings: BrokerSettings, backoff_ms: u32) -> Self {
        Self {
            port,
            settings,
            state: BrokerState::Disconnected,
            backoff_ms,
            last_attempt_ms: None,
        }
    }

    pub fn state(&self) -> BrokerState {
        self.state
    }

    pub fn topic(&self) -> &'static str {
        self.settings.topic
    }

    /// Whether the session is up, as far as both this client and the transport know
    pub fn is_connected(&mut self) -> bool {
        if self.state == BrokerState::Connected && !self.port.is_connected() {
            warn!("MQTT session dropped");
            self.state = BrokerState::Disconnected;
        }
        self.state == BrokerState::Connected
    }

    /// Forget the session after the network link went down or was re-joined
    ///
    /// The transport is not touched; the next connect attempt replaces the
    /// stale socket. Dropping a live session clears the backoff so the
    /// client reconnects as soon as the link allows.
    pub fn invalidate(&mut self) {
        if self.state == BrokerState::Connected {
            warn!("Network link reset, MQTT session dropped");
            self.last_attempt_ms = None;
        }
        self.state = BrokerState::Disconnected;
    }

    /// Make one connect attempt if not connected and the backoff has passed
    ///
    /// Returns `Ok` without touching the transport when already connected,
    /// and `BackingOff` without touching it when the previous attempt was
    /// less than the backoff interval ago.
    pub async fn ensure_connected(&mut self, now_ms: u32) -> Result<(), BrokerError> {
        if self.is_connected() {
            return Ok(());
        }

        if let Some(last) = self.last_attempt_ms {
            if elapsed_ms(last, now_ms) < self.backoff_ms {
                return Err(BrokerError::BackingOff);
            }
        }

        self.last_attempt_ms = Some(now_ms);
        self.state = BrokerState::Connecting;
        info!("Connecting to MQTT broker {}:{}", self.settings.host, self.settings.port);

        match self.port.connect(&self.settings).await {
            Ok(()) => {
                self.state = BrokerState::Connected;
                info!("MQTT connected as {}", self.settings.client_id);
                Ok(())
            }
            Err(e) => {
                self.state = BrokerState::Disconnected;
                warn!("MQTT connect failed: {:?}, retrying in {} ms", e, self.backoff_ms);
                Err(e)
            }
        }
    }

    /// Process inbound traffic and keepalives
    pub async fn service(&mut self) -> Result<(), BrokerError> {
        if self.state != BrokerState::Connected {
            return Err(BrokerError::NotConnected);
        }

        self.port.poll().await.map_err(|e| {
            warn!("MQTT service failed: {:?}", e);
            self.state = BrokerState::Disconnected;
            e
        })
    }

    /// Fire-and-forget publish; failures are reported, never retried
    pub async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected);
        }

        self.port.publish(topic, payload).await
    }
}
