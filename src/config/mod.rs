use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to parse config file: {0}")]
    Parse(#[from] serde_yml::Error),
    #[error("No config file at config/p1gateway.yaml or p1gateway.yaml")]
    NotFound,
}

fn serial_baud_default() -> u32 { return 115200 }

#[derive(Deserialize, Serialize, Clone)]
pub struct SerialConfig {
    pub port: String,
    #[serde(default="serial_baud_default")]
    pub baud: u32,
}

fn p1_interval_default() -> u64 { return 10 }
fn p1_read_timeout_default() -> u64 { return 10 }
fn p1_inverse_tariff_default() -> bool { return false }
fn p1_verify_checksum_default() -> bool { return false }

#[derive(Deserialize, Serialize, Clone)]
pub struct P1Config {
    /// Seconds between poll cycles.
    #[serde(default="p1_interval_default")]
    pub interval: u64,
    /// Seconds a cycle may spend waiting for a complete telegram.
    #[serde(default="p1_read_timeout_default")]
    pub read_timeout: u64,
    /// Swap the tariff 1 and tariff 2 registers at assignment time.
    #[serde(default="p1_inverse_tariff_default")]
    pub inverse_tariff: bool,
    /// Verify the CRC16 after the end marker. Off by default; DSMR 2.2
    /// meters do not send one.
    #[serde(default="p1_verify_checksum_default")]
    pub verify_checksum: bool,
}

fn gpio_data_request_pin_default() -> u8 { return 4 }
fn gpio_output_enable_pin_default() -> u8 { return 16 }

#[derive(Deserialize, Serialize, Clone)]
pub struct GpioConfig {
    #[serde(default="gpio_data_request_pin_default")]
    pub data_request_pin: u8,
    #[serde(default="gpio_output_enable_pin_default")]
    pub output_enable_pin: u8,
}

fn p1_default() -> P1Config {
    return P1Config {
        interval: p1_interval_default(),
        read_timeout: p1_read_timeout_default(),
        inverse_tariff: p1_inverse_tariff_default(),
        verify_checksum: p1_verify_checksum_default(),
    }
}

fn gpio_default() -> GpioConfig {
    return GpioConfig {
        data_request_pin: gpio_data_request_pin_default(),
        output_enable_pin: gpio_output_enable_pin_default(),
    }
}

#[derive(Deserialize, Serialize, Clone)]
pub struct Config {
    pub serial: SerialConfig,
    #[serde(default="p1_default")]
    pub p1: P1Config,
    #[serde(default="gpio_default")]
    pub gpio: GpioConfig,
}

impl Config {
    /// Check the two config file locations, preferring the config/ directory.
    pub fn load() -> Result<Self, ConfigError> {
        for path in ["config/p1gateway.yaml", "p1gateway.yaml"] {
            if let Ok(contents) = fs::read_to_string(path) {
                return Self::from_yaml(&contents);
            }
        }
        Err(ConfigError::NotFound)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yml::from_str(contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = Config::from_yaml("serial:\n  port: /dev/ttyUSB0\n").unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud, 115200);
        assert_eq!(config.p1.interval, 10);
        assert_eq!(config.p1.read_timeout, 10);
        assert!(!config.p1.inverse_tariff);
        assert!(!config.p1.verify_checksum);
        assert_eq!(config.gpio.data_request_pin, 4);
        assert_eq!(config.gpio.output_enable_pin, 16);
    }

    #[test]
    fn test_full_config() {
        let yaml = r"
serial:
  port: /dev/ttyAMA0
  baud: 9600
p1:
  interval: 30
  read_timeout: 5
  inverse_tariff: true
  verify_checksum: true
gpio:
  data_request_pin: 17
  output_enable_pin: 27
";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.serial.baud, 9600);
        assert_eq!(config.p1.interval, 30);
        assert!(config.p1.inverse_tariff);
        assert!(config.p1.verify_checksum);
        assert_eq!(config.gpio.data_request_pin, 17);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(Config::from_yaml("serial: [").is_err());
    }
}
