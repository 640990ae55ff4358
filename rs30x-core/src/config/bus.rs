//! Serial bus configuration

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default baud rate of RS30X servos
pub const DEFAULT_BAUDRATE: u32 = 115_200;

/// Default time to wait for a status response
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u32 = 100;

/// Longest response timeout accepted by [`BusConfig::validate`]
pub const MAX_RESPONSE_TIMEOUT_MS: u32 = 10_000;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Baud rate is zero
    InvalidBaudrate,
    /// Response timeout is zero or above [`MAX_RESPONSE_TIMEOUT_MS`]
    InvalidTimeout,
    /// RX and TX share a pin
    PinConflict,
}

/// Servo bus settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BusConfig {
    /// UART baud rate
    pub baudrate: u32,
    /// How long a status request waits for its response
    pub response_timeout_ms: u32,
    /// UART peripheral index
    pub uart_port: u8,
    /// RX pin (GPIO number)
    pub rx_pin: u8,
    /// TX pin (GPIO number)
    pub tx_pin: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            baudrate: DEFAULT_BAUDRATE,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            uart_port: 2,
            rx_pin: 16,
            tx_pin: 17,
        }
    }
}

impl BusConfig {
    /// Set the response timeout
    pub fn with_response_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.response_timeout_ms = timeout_ms;
        self
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baudrate == 0 {
            return Err(ConfigError::InvalidBaudrate);
        }
        if self.response_timeout_ms == 0 || self.response_timeout_ms > MAX_RESPONSE_TIMEOUT_MS {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.rx_pin == self.tx_pin {
            return Err(ConfigError::PinConflict);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = BusConfig::default();
        assert_eq!(config.baudrate, 115_200);
        assert_eq!(config.response_timeout_ms, 100);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = BusConfig::default();
        config.baudrate = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidBaudrate));

        let config = BusConfig::default().with_response_timeout_ms(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeout));

        let config = BusConfig::default().with_response_timeout_ms(60_000);
        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeout));

        let mut config = BusConfig::default();
        config.tx_pin = config.rx_pin;
        assert_eq!(config.validate(), Err(ConfigError::PinConflict));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_parse_partial_toml() {
        let config: BusConfig = toml::from_str("response_timeout_ms = 250\nrx_pin = 4\n").unwrap();
        assert_eq!(config.response_timeout_ms, 250);
        assert_eq!(config.rx_pin, 4);
        assert_eq!(config.baudrate, DEFAULT_BAUDRATE);
    }
}
