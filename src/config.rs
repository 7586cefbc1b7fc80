//! Device configuration
//!
//! Network secrets and broker settings are baked in at build time from
//! environment variables so they never live in the source tree:
//!
//! ```text
//! WIFI_SSID=greenhouse WIFI_PASSWORD=... MQTT_HOST=192.168.1.20 cargo firmware
//! ```
//!
//! Unset variables fall back to the defaults below.

use crate::domain::{CalibrationError, SensitivityFactors};
use crate::ports::SpectralSensorConfig;

/// Topic readings are published on unless `MQTT_TOPIC` overrides it
pub const DEFAULT_TOPIC: &str = "ingress/greenhouse/spectrometer/readings";

/// Network name announced over DHCP unless `DEVICE_HOSTNAME` overrides it
pub const DEFAULT_HOSTNAME: &str = "wifi-spectrometer-01";

pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Longest hostname accepted; the DHCP client option holds at most 32 bytes
pub const MAX_HOSTNAME_LEN: usize = 32;

/// Configuration error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    EmptySsid,
    EmptyBrokerHost,
    EmptyTopic,
    EmptyHostname,
    /// Hostname longer than [`MAX_HOSTNAME_LEN`]
    HostnameTooLong,
    /// Hostname is not a DNS label (ASCII letters, digits and `-`)
    InvalidHostname,
    ZeroBrokerPort,
    ZeroAcquisitionPeriod,
    /// Polling interval is zero or longer than the timeout it polls within
    InvalidLinkPolling,
    /// The acquisition settings exceed what the sensor accepts
    InvalidSensorConfig,
    Sensitivity(CalibrationError),
}

impl From<CalibrationError> for ConfigError {
    fn from(e: CalibrationError) -> Self {
        ConfigError::Sensitivity(e)
    }
}

/// Station credentials
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WifiCredentials {
    pub ssid: &'static str,
    pub password: &'static str,
}

/// Broker endpoint and session settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BrokerSettings {
    /// IPv4 literal or DNS name
    pub host: &'static str,
    pub port: u16,
    pub client_id: &'static str,
    pub username: &'static str,
    pub password: &'static str,
    pub topic: &'static str,
    pub keep_alive_secs: u16,
}

/// Scheduler and reconnect timing, all in milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingConfig {
    /// Minimum spacing between acquisitions
    pub acquisition_period_ms: u32,
    /// Idle delay at the end of each scheduler tick
    pub tick_idle_ms: u32,
    /// How long a link repair waits for the radio
    pub link_timeout_ms: u32,
    /// Status polling interval during a link repair
    pub link_poll_ms: u32,
    /// Status polling interval while joining at boot
    pub boot_poll_ms: u32,
    /// Minimum spacing between broker connection attempts
    pub broker_backoff_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl TimingConfig {
    /// 5 s acquisitions, 100 ms ticks
    pub const fn standard() -> Self {
        Self {
            acquisition_period_ms: 5_000,
            tick_idle_ms: 100,
            link_timeout_ms: 10_000,
            link_poll_ms: 500,
            boot_poll_ms: 1_000,
            broker_backoff_ms: 5_000,
        }
    }

    /// One acquisition per minute, slower ticks
    pub const fn low_power() -> Self {
        Self {
            acquisition_period_ms: 60_000,
            tick_idle_ms: 500,
            ..Self::standard()
        }
    }
}

/// Everything the firmware needs to run
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceConfig {
    pub wifi: WifiCredentials,
    pub broker: BrokerSettings,
    /// Device identifier; used as DHCP hostname, MQTT client id and payload `device`
    pub hostname: &'static str,
    pub timing: TimingConfig,
    pub sensor: SpectralSensorConfig,
    pub sensitivity: SensitivityFactors,
}

impl DeviceConfig {
    /// Build the configuration from compile-time environment variables
    pub const fn from_build_env() -> Self {
        let hostname = env_or(option_env!("DEVICE_HOSTNAME"), DEFAULT_HOSTNAME);

        Self {
            wifi: WifiCredentials {
                ssid: env_or(option_env!("WIFI_SSID"), ""),
                password: env_or(option_env!("WIFI_PASSWORD"), ""),
            },
            broker: BrokerSettings {
                host: env_or(option_env!("MQTT_HOST"), ""),
                port: match option_env!("MQTT_PORT") {
                    Some(p) => parse_port(p, DEFAULT_MQTT_PORT),
                    None => DEFAULT_MQTT_PORT,
                },
                client_id: hostname,
                username: env_or(option_env!("MQTT_USERNAME"), ""),
                password: env_or(option_env!("MQTT_PASSWORD"), ""),
                topic: env_or(option_env!("MQTT_TOPIC"), DEFAULT_TOPIC),
                keep_alive_secs: 60,
            },
            hostname,
            timing: TimingConfig::standard(),
            sensor: SpectralSensorConfig::standard(),
            sensitivity: SensitivityFactors::DEFAULT,
        }
    }

    /// Check the configuration before any hardware is touched
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wifi.ssid.is_empty() {
            return Err(ConfigError::EmptySsid);
        }
        if self.broker.host.is_empty() {
            return Err(ConfigError::EmptyBrokerHost);
        }
        if self.broker.port == 0 {
            return Err(ConfigError::ZeroBrokerPort);
        }
        if self.broker.topic.is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        if self.hostname.is_empty() {
            return Err(ConfigError::EmptyHostname);
        }
        if self.hostname.len() > MAX_HOSTNAME_LEN {
            return Err(ConfigError::HostnameTooLong);
        }
        if !self
            .hostname
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
        {
            return Err(ConfigError::InvalidHostname);
        }

        let t = &self.timing;
        if t.acquisition_period_ms == 0 {
            return Err(ConfigError::ZeroAcquisitionPeriod);
        }
        if t.link_poll_ms == 0 || t.link_poll_ms > t.link_timeout_ms || t.boot_poll_ms == 0 {
            return Err(ConfigError::InvalidLinkPolling);
        }

        if self.sensor.gain > SpectralSensorConfig::MAX_GAIN {
            return Err(ConfigError::InvalidSensorConfig);
        }

        self.sensitivity.validate()?;
        Ok(())
    }
}

const fn env_or(value: Option<&'static str>, default: &'static str) -> &'static str {
    match value {
        Some(v) => v,
        None => default,
    }
}

/// Parse a decimal port number; anything malformed yields `default`
const fn parse_port(s: &str, default: u16) -> u16 {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > 5 {
        return default;
    }

    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if !b.is_ascii_digit() {
            return default;
        }
        value = value * 10 + (b - b'0') as u32;
        i += 1;
    }

    if value == 0 || value > u16::MAX as u32 {
        default
    } else {
        value as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> DeviceConfig {
        DeviceConfig {
            wifi: WifiCredentials {
                ssid: "greenhouse",
                password: "hunter22",
            },
            broker: BrokerSettings {
                host: "192.168.1.20",
                port: 1883,
                client_id: "spectro-test",
                username: "device",
                password: "secret",
                topic: DEFAULT_TOPIC,
                keep_alive_secs: 60,
            },
            hostname: "spectro-test",
            timing: TimingConfig::standard(),
            sensor: SpectralSensorConfig::default(),
            sensitivity: SensitivityFactors::DEFAULT,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn test_standard_timing() {
        let t = TimingConfig::default();
        assert_eq!(t.acquisition_period_ms, 5_000);
        assert_eq!(t.tick_idle_ms, 100);
        assert_eq!(t.link_timeout_ms, 10_000);
        assert_eq!(t.link_poll_ms, 500);
        assert_eq!(t.boot_poll_ms, 1_000);
        assert_eq!(t.broker_backoff_ms, 5_000);
    }

    #[test]
    fn test_low_power_keeps_link_timing() {
        let t = TimingConfig::low_power();
        assert_eq!(t.acquisition_period_ms, 60_000);
        assert_eq!(t.link_timeout_ms, 10_000);
    }

    #[test]
    fn test_rejects_missing_fields() {
        let mut c = valid();
        c.wifi.ssid = "";
        assert_eq!(c.validate(), Err(ConfigError::EmptySsid));

        let mut c = valid();
        c.broker.host = "";
        assert_eq!(c.validate(), Err(ConfigError::EmptyBrokerHost));

        let mut c = valid();
        c.broker.topic = "";
        assert_eq!(c.validate(), Err(ConfigError::EmptyTopic));

        let mut c = valid();
        c.hostname = "";
        assert_eq!(c.validate(), Err(ConfigError::EmptyHostname));
    }

    #[test]
    fn test_rejects_unusable_hostname() {
        let mut c = valid();
        c.hostname = "spectrometer-greenhouse-north-01";
        assert_eq!(c.validate(), Ok(()));

        c.hostname = "spectrometer-greenhouse-north-01a";
        assert_eq!(c.validate(), Err(ConfigError::HostnameTooLong));

        c.hostname = "spectro \"01\"";
        assert_eq!(c.validate(), Err(ConfigError::InvalidHostname));
    }

    #[test]
    fn test_rejects_bad_timing() {
        let mut c = valid();
        c.timing.acquisition_period_ms = 0;
        assert_eq!(c.validate(), Err(ConfigError::ZeroAcquisitionPeriod));

        let mut c = valid();
        c.timing.link_poll_ms = 20_000;
        assert_eq!(c.validate(), Err(ConfigError::InvalidLinkPolling));
    }

    #[test]
    fn test_rejects_bad_sensitivity() {
        let mut c = valid();
        c.sensitivity.f3_480nm = 0.0;
        assert_eq!(
            c.validate(),
            Err(ConfigError::Sensitivity(CalibrationError::NonPositiveFactor(2)))
        );
    }

    #[test]
    fn test_rejects_gain_out_of_range() {
        let mut c = valid();
        c.sensor.gain = 11;
        assert_eq!(c.validate(), Err(ConfigError::InvalidSensorConfig));
    }

    #[test]
    fn test_build_env_defaults() {
        let c = DeviceConfig::from_build_env();
        assert!(!c.broker.topic.is_empty());
        assert!(!c.hostname.is_empty());
        assert_eq!(c.broker.client_id, c.hostname);
        assert_eq!(c.timing, TimingConfig::standard());
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("1883", 1), 1883);
        assert_eq!(parse_port("8883", 1), 8883);
        assert_eq!(parse_port("65535", 1), 65535);
        assert_eq!(parse_port("65536", 1), 1);
        assert_eq!(parse_port("0", 1), 1);
        assert_eq!(parse_port("18a3", 1), 1);
        assert_eq!(parse_port("", 1), 1);
    }
}
