//! Raw spectral counts
//!
//! This module defines the raw channel vector produced by one acquisition
//! of the AS7341 11-channel spectral sensor. Only the ten channels the
//! spectrometer reports are kept: eight visible bands, clear and NIR.

/// Number of channels in one acquisition
pub const CHANNEL_COUNT: usize = 10;

/// Number of visible-band channels (F1..F8)
pub const VISIBLE_CHANNEL_COUNT: usize = 8;

/// Raw counts from one acquisition of the AS7341.
///
/// Produced fresh each cycle by the sensor adapter and never mutated
/// afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpectralCounts {
    /// F1: 415nm - Violet
    pub f1_415nm: u16,
    /// F2: 445nm - Indigo
    pub f2_445nm: u16,
    /// F3: 480nm - Blue
    pub f3_480nm: u16,
    /// F4: 515nm - Cyan
    pub f4_515nm: u16,
    /// F5: 555nm - Green
    pub f5_555nm: u16,
    /// F6: 590nm - Yellow
    pub f6_590nm: u16,
    /// F7: 630nm - Orange
    pub f7_630nm: u16,
    /// F8: 680nm - Red
    pub f8_680nm: u16,
    /// Clear channel (broadband visible light)
    pub clear: u16,
    /// Near-infrared channel
    pub nir: u16,
}

impl SpectralCounts {
    /// Build counts from an array in wavelength order
    ///
    /// Order: F1..F8, Clear, NIR
    pub const fn from_array(counts: [u16; CHANNEL_COUNT]) -> Self {
        Self {
            f1_415nm: counts[0],
            f2_445nm: counts[1],
            f3_480nm: counts[2],
            f4_515nm: counts[3],
            f5_555nm: counts[4],
            f6_590nm: counts[5],
            f7_630nm: counts[6],
            f8_680nm: counts[7],
            clear: counts[8],
            nir: counts[9],
        }
    }

    /// Visible-band channels F1..F8 (the ones that contribute to PPFD)
    pub const fn visible_channels(&self) -> [u16; VISIBLE_CHANNEL_COUNT] {
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

    /// All channels in wavelength order, clear and NIR last
    pub const fn all_channels(&self) -> [u16; CHANNEL_COUNT] {
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

    /// Channel names as they appear in the published payload
    pub const CHANNEL_NAMES: [&'static str; CHANNEL_COUNT] = [
        "415nm", "445nm", "480nm", "515nm", "555nm", "590nm", "630nm", "680nm", "clear", "nir",
    ];

    /// Center wavelengths in nm (0 for clear/NIR)
    pub const CHANNEL_WAVELENGTHS: [u16; CHANNEL_COUNT] =
        [415, 445, 480, 515, 555, 590, 630, 680, 0, 0];
}
