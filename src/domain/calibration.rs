//! PPFD calibration domain service
//!
//! This module converts raw AS7341 channel counts into a photosynthetic
//! photon flux density estimate.

#[allow(unused_imports)]
use micromath::F32Ext;

use crate::domain::spectral::{SpectralCounts, CHANNEL_COUNT, VISIBLE_CHANNEL_COUNT};

/// Error type for calibration parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// A sensitivity divisor is zero, negative, NaN or infinite.
    /// Carries the index of the offending channel (wavelength order).
    NonPositiveFactor(usize),
}

/// Per-channel sensitivity divisors
///
/// Each visible-band count is divided by its factor and the ratios are
/// summed to estimate PPFD:
/// `ppfd = sum(count[i] / factor[i])` for F1..F8.
///
/// Clear and NIR factors are carried for completeness but never enter the
/// sum. All factors are strictly positive.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensitivityFactors {
    pub f1_415nm: f32,
    pub f2_445nm: f32,
    pub f3_480nm: f32,
    pub f4_515nm: f32,
    pub f5_555nm: f32,
    pub f6_590nm: f32,
    pub f7_630nm: f32,
    pub f8_680nm: f32,
    pub clear: f32,
    pub nir: f32,
}

impl SensitivityFactors {
    /// Bench calibration for the AS7341 at 256x gain, ATIME 100, ASTEP 999
    pub const DEFAULT: Self = Self {
        f1_415nm: 100.0,
        f2_445nm: 120.0,
        f3_480nm: 150.0,
        f4_515nm: 180.0,
        f5_555nm: 200.0,
        f6_590nm: 190.0,
        f7_630nm: 170.0,
        f8_680nm: 140.0,
        clear: 1000.0,
        nir: 1000.0,
    };

    /// Create factors from an array in wavelength order (F1..F8, Clear, NIR)
    ///
    /// Rejects any factor that is not a finite, strictly positive number.
    pub fn new(factors: [f32; CHANNEL_COUNT]) -> Result<Self, CalibrationError> {
        if let Some(idx) = factors.iter().position(|f| !(f.is_finite() && *f > 0.0)) {
            return Err(CalibrationError::NonPositiveFactor(idx));
        }

        Ok(Self {
            f1_415nm: factors[0],
            f2_445nm: factors[1],
            f3_480nm: factors[2],
            f4_515nm: factors[3],
            f5_555nm: factors[4],
            f6_590nm: factors[5],
            f7_630nm: factors[6],
            f8_680nm: factors[7],
            clear: factors[8],
            nir: factors[9],
        })
    }

    /// Re-check the positivity invariant (used when validating configuration)
    pub fn validate(&self) -> Result<(), CalibrationError> {
        Self::new(self.all_factors()).map(|_| ())
    }

    /// Visible-band factors F1..F8
    pub const fn visible_factors(&self) -> [f32; VISIBLE_CHANNEL_COUNT] {
        [
            self.f1_415nm,
            self.f2_445nm,
            self.f3_480nm,
            self.f4_515nm,
            self.f5_555nm,
            self.f6_590nm,
            self.f7_630nm,
            self.f8_680nm,
        ]
    }

    /// All factors in wavelength order
    pub const fn all_factors(&self) -> [f32; CHANNEL_COUNT] {
        [
            self.f1_415nm,
            self.f2_445nm,
            self.f3_480nm,
            self.f4_515nm,
            self.f5_555nm,
            self.f6_590nm,
            self.f7_630nm,
            self.f8_680nm,
            self.clear,
            self.nir,
        ]
    }

    /// Estimate PPFD (µmol/m²/s) from raw counts
    ///
    /// Sums `count / factor` over the eight visible channels. Clear and NIR
    /// are excluded. No clamping is applied.
    pub fn ppfd(&self, counts: &SpectralCounts) -> f32 {
        counts
            .visible_channels()
            .iter()
            .zip(self.visible_factors().iter())
            .map(|(&count, &factor)| count as f32 / factor)
            .sum()
    }
}

impl Default for SensitivityFactors {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Round a PPFD value to the two decimals it is logged and published with
#[inline]
pub fn round_ppfd(ppfd: f32) -> f32 {
    (ppfd * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_counts() -> SpectralCounts {
        SpectralCounts::from_array([10, 12, 15, 18, 20, 19, 17, 14, 0, 0])
    }

    #[test]
    fn test_reference_counts_give_point_eight() {
        let ppfd = SensitivityFactors::DEFAULT.ppfd(&reference_counts());
        assert!((ppfd - 0.8).abs() < 1e-5, "ppfd = {}", ppfd);
        assert_eq!(round_ppfd(ppfd), 0.8);
    }

    #[test]
    fn test_clear_and_nir_do_not_contribute() {
        let mut counts = reference_counts();
        let baseline = SensitivityFactors::DEFAULT.ppfd(&counts);

        counts.clear = u16::MAX;
        counts.nir = u16::MAX;

        assert_eq!(SensitivityFactors::DEFAULT.ppfd(&counts), baseline);
    }

    #[test]
    fn test_zero_counts_give_zero() {
        let ppfd = SensitivityFactors::DEFAULT.ppfd(&SpectralCounts::default());
        assert_eq!(ppfd, 0.0);
    }

    #[test]
    fn test_ppfd_is_monotonic_per_visible_channel() {
        let factors = SensitivityFactors::DEFAULT;

        for channel in 0..VISIBLE_CHANNEL_COUNT {
            let mut previous = 0.0_f32;
            for count in (0..=u16::MAX).step_by(4099) {
                let mut raw = [7u16; CHANNEL_COUNT];
                raw[channel] = count;
                let ppfd = factors.ppfd(&SpectralCounts::from_array(raw));

                assert!(ppfd.is_finite());
                assert!(ppfd >= 0.0);
                assert!(ppfd >= previous, "channel {} not monotonic at {}", channel, count);
                previous = ppfd;
            }
        }
    }

    #[test]
    fn test_saturated_counts_stay_finite() {
        let ppfd = SensitivityFactors::DEFAULT.ppfd(&SpectralCounts::from_array([u16::MAX; 10]));
        assert!(ppfd.is_finite());
        assert!(ppfd > 0.0);
    }

    #[test]
    fn test_rejects_non_positive_factors() {
        let mut factors = SensitivityFactors::DEFAULT.all_factors();
        factors[3] = 0.0;
        assert_eq!(
            SensitivityFactors::new(factors),
            Err(CalibrationError::NonPositiveFactor(3))
        );

        factors[3] = -1.0;
        assert!(SensitivityFactors::new(factors).is_err());

        factors[3] = f32::NAN;
        assert!(SensitivityFactors::new(factors).is_err());
    }

    #[test]
    fn test_default_factors_are_valid() {
        assert!(SensitivityFactors::DEFAULT.validate().is_ok());
    }

    #[test]
    fn test_round_ppfd_two_decimals() {
        assert_eq!(round_ppfd(12.344), 12.34);
        assert_eq!(round_ppfd(12.346), 12.35);
        assert_eq!(round_ppfd(0.0), 0.0);
    }
}
