//! AS7341 spectral sensor adapter
//!
//! This adapter implements the SpectralSensorPort trait for the AMS/OSRAM
//! AS7341 11-channel spectral sensor over any async I2C bus.
//!
//! The AS7341 has six ADCs, so a full read takes two integrations with a
//! different SMUX routing each:
//!
//! ```text
//! pass 1: ADC0..5 = F1 F2 F3 F4 Clear NIR
//! pass 2: ADC0..5 = F5 F6 F7 F8 Clear NIR
//! ```
//!
//! Clear and NIR are taken from the second pass.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use crate::domain::SpectralCounts;
use crate::ports::spectral_sensor::{SpectralSensorConfig, SpectralSensorError, SpectralSensorPort};

/// Fixed 7-bit bus address
pub const AS7341_ADDRESS: u8 = 0x39;

const REG_ENABLE: u8 = 0x80;
const REG_ATIME: u8 = 0x81;
const REG_WHOAMI: u8 = 0x92;
const REG_ASTATUS: u8 = 0x94;
const REG_STATUS2: u8 = 0xA3;
const REG_CFG1: u8 = 0xAA;
const REG_CFG6: u8 = 0xAF;
const REG_ASTEP_L: u8 = 0xCA;

const ENABLE_PON: u8 = 1 << 0;
const ENABLE_SP_EN: u8 = 1 << 1;
const ENABLE_SMUXEN: u8 = 1 << 4;

const STATUS2_AVALID: u8 = 1 << 6;
const ASTATUS_ASAT: u8 = 1 << 7;

/// CFG6 SMUX_CMD = 2: write SMUX configuration from RAM
const SMUX_CMD_WRITE: u8 = 2 << 3;

const WHOAMI_MASK: u8 = 0xFC;
const WHOAMI_ID: u8 = 0x09 << 2;

/// SMUX RAM image routing F1-F4, Clear and NIR to ADC0-5
const SMUX_F1_F4: [u8; 20] = [
    0x30, 0x01, 0x00, 0x00, 0x00, 0x42, 0x00, 0x00, 0x50, 0x00, //
    0x00, 0x00, 0x20, 0x04, 0x00, 0x30, 0x01, 0x50, 0x00, 0x06,
];

/// SMUX RAM image routing F5-F8, Clear and NIR to ADC0-5
const SMUX_F5_F8: [u8; 20] = [
    0x00, 0x00, 0x00, 0x40, 0x02, 0x00, 0x10, 0x03, 0x50, 0x10, //
    0x03, 0x00, 0x00, 0x00, 0x24, 0x00, 0x00, 0x50, 0x00, 0x06,
];

const POLL_INTERVAL_MS: u32 = 5;
const SMUX_TIMEOUT_MS: u32 = 100;
/// Lower bound on the data-ready wait; longer integrations wait twice their length
const MIN_DATA_TIMEOUT_MS: u32 = 1_000;

/// AS7341 adapter implementing SpectralSensorPort
pub struct As7341Adapter<I, D> {
    i2c: I,
    delay: D,
    config: SpectralSensorConfig,
    ready: bool,
}

impl<I: I2c, D: DelayNs> As7341Adapter<I, D> {
    /// Create a new AS7341 adapter
    ///
    /// The sensor is not touched until `init()` is called.
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            i2c,
            delay,
            config: SpectralSensorConfig::default(),
            ready: false,
        }
    }

    /// Check the chip identity, power it on and apply `config`
    ///
    /// Returns `NotDetected` if nothing answers at the address or the
    /// identity register does not read as an AS7341.
    pub async fn init(&mut self, config: SpectralSensorConfig) -> Result<(), SpectralSensorError> {
        let id = self
            .read_reg(REG_WHOAMI)
            .await
            .map_err(|_| SpectralSensorError::NotDetected)?;
        if id & WHOAMI_MASK != WHOAMI_ID {
            return Err(SpectralSensorError::NotDetected);
        }

        self.write_reg(REG_ENABLE, ENABLE_PON).await?;
        self.apply_config(config).await?;
        self.ready = true;
        Ok(())
    }

    pub fn config(&self) -> SpectralSensorConfig {
        self.config
    }

    /// Release the underlying I2C bus
    pub fn release(self) -> I {
        self.i2c
    }

    async fn apply_config(&mut self, config: SpectralSensorConfig) -> Result<(), SpectralSensorError> {
        if config.gain > SpectralSensorConfig::MAX_GAIN {
            return Err(SpectralSensorError::InvalidConfig);
        }

        self.write_reg(REG_ATIME, config.atime).await?;
        let [lo, hi] = config.astep.to_le_bytes();
        self.write(&[REG_ASTEP_L, lo, hi]).await?;
        self.write_reg(REG_CFG1, config.gain).await?;

        self.config = config;
        Ok(())
    }

    /// One integration with the given SMUX routing; returns ADC0..5
    async fn measure(&mut self, smux: &[u8; 20]) -> Result<[u16; 6], SpectralSensorError> {
        self.set_enable_bits(ENABLE_SP_EN, false).await?;

        self.write_reg(REG_CFG6, SMUX_CMD_WRITE).await?;
        let mut ram = [0u8; 21];
        ram[1..].copy_from_slice(smux);
        self.write(&ram).await?;

        self.set_enable_bits(ENABLE_SMUXEN, true).await?;
        self.wait_for(REG_ENABLE, ENABLE_SMUXEN, false, SMUX_TIMEOUT_MS)
            .await?;

        self.set_enable_bits(ENABLE_SP_EN, true).await?;
        let data_timeout_ms = (self.config.integration_time_us() / 500).max(MIN_DATA_TIMEOUT_MS);
        self.wait_for(REG_STATUS2, STATUS2_AVALID, true, data_timeout_ms)
            .await?;

        // Reading ASTATUS first latches all six channel registers
        let mut raw = [0u8; 13];
        self.i2c
            .write_read(AS7341_ADDRESS, &[REG_ASTATUS], &mut raw)
            .await
            .map_err(|_| SpectralSensorError::ReadFailed)?;

        if raw[0] & ASTATUS_ASAT != 0 {
            warn!("AS7341: measurement saturated");
        }

        let mut channels = [0u16; 6];
        for (ch, bytes) in channels.iter_mut().zip(raw[1..].chunks_exact(2)) {
            *ch = u16::from_le_bytes([bytes[0], bytes[1]]);
        }
        Ok(channels)
    }

    /// Poll `reg` until `mask` is set (or cleared), giving up after `timeout_ms`
    async fn wait_for(
        &mut self,
        reg: u8,
        mask: u8,
        set: bool,
        timeout_ms: u32,
    ) -> Result<(), SpectralSensorError> {
        let mut waited = 0;
        loop {
            let value = self.read_reg(reg).await?;
            if (value & mask != 0) == set {
                return Ok(());
            }
            if waited >= timeout_ms {
                return Err(SpectralSensorError::Timeout);
            }
            self.delay.delay_ms(POLL_INTERVAL_MS).await;
            waited += POLL_INTERVAL_MS;
        }
    }

    async fn set_enable_bits(&mut self, bits: u8, on: bool) -> Result<(), SpectralSensorError> {
        let current = self.read_reg(REG_ENABLE).await?;
        let value = if on { current | bits } else { current & !bits };
        self.write_reg(REG_ENABLE, value).await
    }

    async fn read_reg(&mut self, reg: u8) -> Result<u8, SpectralSensorError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(AS7341_ADDRESS, &[reg], &mut buf)
            .await
            .map_err(|_| SpectralSensorError::I2cError)?;
        Ok(buf[0])
    }

    async fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SpectralSensorError> {
        self.write(&[reg, value]).await
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), SpectralSensorError> {
        self.i2c
            .write(AS7341_ADDRESS, bytes)
            .await
            .map_err(|_| SpectralSensorError::I2cError)
    }
}

impl<I: I2c, D: DelayNs> SpectralSensorPort for As7341Adapter<I, D> {
    async fn read_all_channels(&mut self) -> Result<SpectralCounts, SpectralSensorError> {
        if !self.ready {
            return Err(SpectralSensorError::NotInitialized);
        }

        let [f1, f2, f3, f4, _, _] = self.measure(&SMUX_F1_F4).await?;
        let [f5, f6, f7, f8, clear, nir] = self.measure(&SMUX_F5_F8).await?;

        Ok(SpectralCounts {
            f1_415nm: f1,
            f2_445nm: f2,
            f3_480nm: f3,
            f4_515nm: f4,
            f5_555nm: f5,
            f6_590nm: f6,
            f7_630nm: f7,
            f8_680nm: f8,
            clear,
            nir,
        })
    }

    async fn configure(&mut self, config: SpectralSensorConfig) -> Result<(), SpectralSensorError> {
        if !self.ready {
            return Err(SpectralSensorError::NotInitialized);
        }
        self.apply_config(config).await
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}
