//! Wire payload for spectral readings
//!
//! This module defines the JSON message published to the broker for every
//! sample. Messages are serialized with `serde-json-core` into a caller-owned
//! buffer, so no allocation happens on the device.
//!
//! ```text
//! {"device":"wifi-spectrometer-01","timestamp":"2024-05-01T12:00:00Z",
//!  "channels":{"415nm":10,"445nm":12,...,"clear":900,"nir":300},"ppfd":0.8}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{SpectralCounts, SpectralSample};

/// Buffer size that fits any payload from a validated configuration
///
/// See [`MAX_HOSTNAME_LEN`](crate::config::MAX_HOSTNAME_LEN).
pub const MAX_PAYLOAD_SIZE: usize = 384;

/// Error type for payload encoding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// The output buffer is too small for the message
    BufferFull,
}

/// Error type for payload decoding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Input is not a valid reading message
    InvalidFormat,
}

/// Channel map keyed by wavelength, as published
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMap {
    #[serde(rename = "415nm")]
    pub f1_415nm: u16,
    #[serde(rename = "445nm")]
    pub f2_445nm: u16,
    #[serde(rename = "480nm")]
    pub f3_480nm: u16,
    #[serde(rename = "515nm")]
    pub f4_515nm: u16,
    #[serde(rename = "555nm")]
    pub f5_555nm: u16,
    #[serde(rename = "590nm")]
    pub f6_590nm: u16,
    #[serde(rename = "630nm")]
    pub f7_630nm: u16,
    #[serde(rename = "680nm")]
    pub f8_680nm: u16,
    pub clear: u16,
    pub nir: u16,
}

impl From<SpectralCounts> for ChannelMap {
    fn from(c: SpectralCounts) -> Self {
        Self {
            f1_415nm: c.f1_415nm,
            f2_445nm: c.f2_445nm,
            f3_480nm: c.f3_480nm,
            f4_515nm: c.f4_515nm,
            f5_555nm: c.f5_555nm,
            f6_590nm: c.f6_590nm,
            f7_630nm: c.f7_630nm,
            f8_680nm: c.f8_680nm,
            clear: c.clear,
            nir: c.nir,
        }
    }
}

impl From<ChannelMap> for SpectralCounts {
    fn from(m: ChannelMap) -> Self {
        Self {
            f1_415nm: m.f1_415nm,
            f2_445nm: m.f2_445nm,
            f3_480nm: m.f3_480nm,
            f4_515nm: m.f4_515nm,
            f5_555nm: m.f5_555nm,
            f6_590nm: m.f6_590nm,
            f7_630nm: m.f7_630nm,
            f8_680nm: m.f8_680nm,
            clear: m.clear,
            nir: m.nir,
        }
    }
}

/// One published reading
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadingPayload<'a> {
    /// Device hostname
    pub device: &'a str,
    /// ISO-8601 UTC capture time
    pub timestamp: &'a str,
    pub channels: ChannelMap,
    /// PPFD in µmol/m²/s, two decimals
    pub ppfd: f32,
}

impl ReadingPayload<'_> {
    /// Raw counts carried by this payload
    pub fn counts(&self) -> SpectralCounts {
        self.channels.into()
    }
}

/// Serialize `sample` into `buf`, returning the number of bytes written
pub fn encode(sample: &SpectralSample, device: &str, buf: &mut [u8]) -> Result<usize, EncodeError> {
    let timestamp = sample.captured_at.to_iso8601();
    let payload = ReadingPayload {
        device,
        timestamp: timestamp.as_str(),
        channels: sample.counts.into(),
        ppfd: sample.ppfd,
    };

    serde_json_core::to_slice(&payload, buf).map_err(|_| EncodeError::BufferFull)
}

/// Parse a payload produced by [`encode`]
pub fn decode(bytes: &[u8]) -> Result<ReadingPayload<'_>, DecodeError> {
    serde_json_core::from_slice::<ReadingPayload<'_>>(bytes)
        .map(|(payload, _)| payload)
        .map_err(|_| DecodeError::InvalidFormat)
}
