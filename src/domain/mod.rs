//! Domain layer - pure business logic independent of infrastructure
//!
//! This module contains the spectral data model and the PPFD calibration
//! that turns raw counts into a published reading.

pub mod calibration;
pub mod sample;
pub mod spectral;
pub mod timestamp;

pub use calibration::{round_ppfd, CalibrationError, SensitivityFactors};
pub use sample::SpectralSample;
pub use spectral::{SpectralCounts, CHANNEL_COUNT, VISIBLE_CHANNEL_COUNT};
pub use timestamp::{UtcTimestamp, UNSYNCED_ISO8601};
