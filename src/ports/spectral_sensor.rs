//! Spectral sensor port - interface for multi-channel light sensors
//!
//! This port defines how the domain reads the AS7341 (or any sensor that
//! can produce the same ten channels).

use crate::domain::SpectralCounts;
use core::future::Future;

/// Port trait for spectral sensors
///
/// Implementations provide one complete acquisition per call. A failed
/// acquisition is reported as an error and never as zeroed counts.
pub trait SpectralSensorPort {
    /// Run a full measurement and return all ten channels
    ///
    /// On the AS7341 this takes two integrations (one per SMUX bank).
    fn read_all_channels(&mut self) -> impl Future<Output = Result<SpectralCounts, SpectralSensorError>>;

    /// Apply gain and integration settings
    fn configure(
        &mut self,
        config: SpectralSensorConfig,
    ) -> impl Future<Output = Result<(), SpectralSensorError>>;

    /// Check if the sensor is initialized and ready
    fn is_ready(&self) -> bool;
}

/// Spectral sensor configuration
///
/// Integration time is `(atime + 1) * (astep + 1) * 2.78µs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpectralSensorConfig {
    /// Gain index 0-10, maps to 0.5x .. 512x (9 = 256x)
    pub gain: u8,
    /// Number of integration steps (ATIME register)
    pub atime: u8,
    /// Integration step size (ASTEP register)
    pub astep: u16,
}

impl Default for SpectralSensorConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl SpectralSensorConfig {
    /// Highest gain index accepted by the AS7341
    pub const MAX_GAIN: u8 = 10;

    /// Indoor grow-light settings the sensitivity factors were measured with
    pub const fn standard() -> Self {
        Self {
            gain: 9,    // 256x
            atime: 100,
            astep: 999, // ~281ms per integration
        }
    }

    /// Short integration for bright, direct grow-light exposure
    pub const fn bright_light() -> Self {
        Self {
            gain: 4, // 8x
            atime: 29,
            astep: 599,
        }
    }

    /// Integration time of one measurement in microseconds
    pub const fn integration_time_us(&self) -> u32 {
        ((self.atime as u64 + 1) * (self.astep as u64 + 1) * 278 / 100) as u32
    }

    /// Gain multiplier as a display value (0.5x for index 0)
    pub fn gain_factor(&self) -> f32 {
        match self.gain {
            0 => 0.5,
            g => (1u32 << (g - 1).min(9)) as f32,
        }
    }
}

/// Errors that can occur during spectral sensor operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpectralSensorError {
    /// Sensor read operation failed
    ReadFailed,
    /// Sensor has not been initialized
    NotInitialized,
    /// Data was not ready within the expected time
    Timeout,
    /// I2C communication error
    I2cError,
    /// Invalid configuration parameter
    InvalidConfig,
    /// Sensor not responding or not detected
    NotDetected,
}
