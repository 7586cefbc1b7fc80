//! Spectral sample domain entity
//!
//! A sample is what one acquisition cycle produces: the raw counts, the PPFD
//! derived from them and the capture time. It has no knowledge of how it is
//! serialized or transmitted.

use crate::domain::calibration::{round_ppfd, SensitivityFactors};
use crate::domain::spectral::SpectralCounts;
use crate::domain::timestamp::UtcTimestamp;

/// One spectrometer reading.
///
/// Built once per cycle and read-only afterwards. The PPFD is stored already
/// rounded to two decimals, the precision it is logged and published with.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpectralSample {
    /// Raw channel counts
    pub counts: SpectralCounts,
    /// PPFD estimate in µmol/m²/s (two decimals)
    pub ppfd: f32,
    /// UTC capture time
    pub captured_at: UtcTimestamp,
}

impl SpectralSample {
    /// Derive a sample from freshly acquired counts
    pub fn capture(
        counts: SpectralCounts,
        factors: &SensitivityFactors,
        captured_at: UtcTimestamp,
    ) -> Self {
        Self {
            counts,
            ppfd: round_ppfd(factors.ppfd(&counts)),
            captured_at,
        }
    }

    /// Rebuild a sample from already-derived values (e.g. a decoded payload)
    pub const fn from_parts(counts: SpectralCounts, ppfd: f32, captured_at: UtcTimestamp) -> Self {
        Self {
            counts,
            ppfd,
            captured_at,
        }
    }
}
