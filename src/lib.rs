//! Wi-Fi Spectrometer Library
//!
//! This library provides a hexagonal architecture for a networked PPFD
//! meter: an AS7341 spectral sensor read on a fixed period, with each
//! reading published as JSON to an MQTT broker over Wi-Fi.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Domain Layer                                 │
//! │  - SpectralCounts / SpectralSample entities                     │
//! │  - SensitivityFactors (PPFD calibration)                        │
//! │  - UtcTimestamp                                                  │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Services                                     │
//! │  - LinkManager: Wi-Fi connection state machine                  │
//! │  - BrokerClient: MQTT session with reconnect backoff            │
//! │  - Scheduler: cooperative acquire/publish loop                  │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Ports (Traits)                               │
//! │  - SpectralSensorPort, WifiPort, BrokerPort, UpdatePort, Clock  │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters                                     │
//! │  - As7341Adapter: spectral sensor over I2C                      │
//! │  - Cyw43Link / MqttBroker / EmbassyClock (rp feature)           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Features
//!
//! - `defmt`: log through defmt instead of the `log` facade
//! - `rp`: RP2350 + CYW43 adapters and the `spectrometer` firmware binary
//!
//! Without features the crate builds on the host, which is how the unit
//! tests run.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod telemetry;

/// Domain layer - pure business logic
pub mod domain;

/// Ports - traits defining boundaries
pub mod ports;

/// Services - connection state machines and the scheduler loop
pub mod services;

/// Adapters - concrete implementations
pub mod adapters;

#[cfg(test)]
mod testing;

// Re-export key domain types
pub use domain::{SensitivityFactors, SpectralCounts, SpectralSample, UtcTimestamp};

// Re-export key port traits
pub use ports::{BrokerPort, Clock, SpectralSensorPort, UpdatePort, WifiPort};

// Re-export services
pub use services::{BrokerClient, LinkManager, Scheduler, TickReport};

pub use config::DeviceConfig;
