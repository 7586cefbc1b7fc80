//! Ports (interfaces) defining the boundaries of the application
//!
//! Ports are traits that define how the domain interacts with external systems.
//! They allow the domain to remain independent of specific implementations.
//!
//! # Hexagonal Architecture
//!
//! In hexagonal architecture, ports define the "holes" in the hexagon where
//! adapters plug in:
//!
//! - **SpectralSensorPort**: How we acquire channel counts (AS7341, mock)
//! - **WifiPort**: How we join the wireless network (CYW43, mock)
//! - **BrokerPort**: How we publish readings (rust-mqtt, mock)
//! - **UpdatePort**: How remote updates are serviced
//! - **Clock**: Uptime and wall-clock time

pub mod broker;
pub mod clock;
pub mod spectral_sensor;
pub mod update;
pub mod wifi;

pub use broker::{BrokerError, BrokerPort};
pub use clock::{elapsed_ms, period_elapsed, Clock};
pub use spectral_sensor::{SpectralSensorConfig, SpectralSensorError, SpectralSensorPort};
pub use update::{UpdateError, UpdatePort};
pub use wifi::{LinkError, LinkStatus, WifiPort};
