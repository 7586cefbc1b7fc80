//! Adapters - concrete implementations of ports
//!
//! Adapters connect the domain to the outside world by implementing
//! the port traits. Each adapter knows how to work with a specific
//! technology or hardware.
//!
//! # Available Adapters
//!
//! - **as7341**: AS7341 11-channel spectral sensor via any async I2C bus
//! - **sntp**: SNTP time query (packet handling is host-testable)
//! - **update**: idle remote update listener
//! - **cyw43_link**: CYW43 Wi-Fi station (`rp` feature)
//! - **mqtt**: rust-mqtt broker session over embassy-net (`rp` feature)
//! - **clock**: embassy time driver clock (`rp` feature)

pub mod as7341;
pub mod sntp;
pub mod update;

#[cfg(feature = "rp")]
pub mod clock;
#[cfg(feature = "rp")]
pub mod cyw43_link;
#[cfg(feature = "rp")]
pub mod mqtt;

pub use self::as7341::As7341Adapter;
pub use update::IdleUpdateListener;

#[cfg(feature = "rp")]
pub use self::clock::EmbassyClock;
#[cfg(feature = "rp")]
pub use cyw43_link::Cyw43Link;
#[cfg(feature = "rp")]
pub use mqtt::{MqttBroker, SharedSocket};
