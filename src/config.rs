//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Venue Credentials ===
    /// API key for the venue's private endpoints.
    #[serde(default)]
    pub coinex_api_key: String,

    /// API secret used to sign private requests.
    #[serde(default)]
    pub coinex_api_secret: String,

    /// Venue API base URL.
    #[serde(default = "default_base_url")]
    pub coinex_base_url: String,

    // === Trading Parameters ===
    /// Transaction fee deducted by the venue after each hop (0.002 = 0.2%).
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,

    /// Venue minimum order size, denominated in each pair's to-currency.
    #[serde(default = "default_min_trade_size")]
    pub min_trade_size: Decimal,

    // === Execution ===
    /// Interval between order-status polls while waiting for settlement.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Upper bound on the settlement wait for a single order.
    #[serde(default = "default_execution_timeout")]
    pub execution_timeout_ms: u64,

    /// HTTP request timeout.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_ms: u64,

    // === Operation Modes ===
    /// Simulation mode (no real orders).
    #[serde(default = "default_true")]
    pub dry_run: bool,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_base_url() -> String {
    "https://coinex.pw/api/v2".to_string()
}

fn default_fee_rate() -> Decimal {
    Decimal::new(2, 3) // 0.002
}

fn default_min_trade_size() -> Decimal {
    Decimal::new(1, 4) // 0.0001
}

fn default_poll_interval() -> u64 {
    500
}

fn default_execution_timeout() -> u64 {
    120_000
}

fn default_http_timeout() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            return Err("FEE_RATE must be in [0, 1)".to_string());
        }

        if self.min_trade_size <= Decimal::ZERO {
            return Err("MIN_TRADE_SIZE must be positive".to_string());
        }

        if self.poll_interval_ms == 0 {
            return Err("POLL_INTERVAL_MS must be positive".to_string());
        }

        if self.execution_timeout_ms <= self.poll_interval_ms {
            return Err("EXECUTION_TIMEOUT_MS must exceed POLL_INTERVAL_MS".to_string());
        }

        if self.coinex_base_url.is_empty() {
            return Err("COINEX_BASE_URL must not be empty".to_string());
        }

        Ok(())
    }

    /// Whether private-endpoint credentials are present.
    ///
    /// Scanning only touches public endpoints; balances and execution
    /// require both halves of the key pair.
    pub fn has_credentials(&self) -> bool {
        !self.coinex_api_key.is_empty() && !self.coinex_api_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_config() -> Config {
        Config {
            coinex_api_key: String::new(),
            coinex_api_secret: String::new(),
            coinex_base_url: default_base_url(),
            fee_rate: default_fee_rate(),
            min_trade_size: default_min_trade_size(),
            poll_interval_ms: default_poll_interval(),
            execution_timeout_ms: default_execution_timeout(),
            http_timeout_ms: default_http_timeout(),
            dry_run: true,
            rust_log: default_log_level(),
        }
    }

    #[test]
    fn default_values_are_sensible() {
        assert_eq!(default_fee_rate(), dec!(0.002));
        assert_eq!(default_min_trade_size(), dec!(0.0001));
        assert!(default_true());
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_fee() {
        let mut config = test_config();
        config.fee_rate = dec!(1);
        assert!(config.validate().is_err());

        config.fee_rate = dec!(-0.001);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_timeout_below_poll_interval() {
        let mut config = test_config();
        config.execution_timeout_ms = 100;
        config.poll_interval_ms = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn credentials_detection() {
        let mut config = test_config();
        assert!(!config.has_credentials());

        config.coinex_api_key = "key".to_string();
        assert!(!config.has_credentials());

        config.coinex_api_secret = "secret".to_string();
        assert!(config.has_credentials());
    }
}
