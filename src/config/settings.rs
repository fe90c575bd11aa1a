use crate::constants::DEFAULT_MIN_TRADABLE_UNIT;
use serde::{Deserialize, Serialize};

/// Trading parameters, loaded once at startup and passed into the
/// engine by value. Immutable for the duration of a cycle.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TradingSettings {
    /// Coin traded against KRW, e.g. "BTC".
    pub coin_type: String,
    /// KRW spent per grid buy.
    pub unit_price_krw: u64,
    /// Seconds between reconciliation cycles.
    pub trade_interval_secs: u64,
    /// Target profit percentage between a BUY and its paired SELL.
    pub earning_rate_percent: f64,
    /// Percentage spacing between grid slots.
    pub slot_interval_rate_percent: f64,
    /// Smallest quantity the exchange accepts.
    #[serde(default = "default_min_tradable_unit")]
    pub minimum_tradable_unit: f64,
}

fn default_min_tradable_unit() -> f64 {
    DEFAULT_MIN_TRADABLE_UNIT
}

impl TradingSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.coin_type.is_empty() || !self.coin_type.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(anyhow::anyhow!(
                "Coin type {:?} must be a plain currency code like 'BTC'.",
                self.coin_type
            ));
        }
        if self.coin_type.chars().any(|c| c.is_ascii_lowercase()) {
            return Err(anyhow::anyhow!(
                "Coin type {:?} must be upper-case.",
                self.coin_type
            ));
        }
        if self.unit_price_krw < 1_000 {
            return Err(anyhow::anyhow!(
                "Unit price {} KRW is below the exchange order minimum.",
                self.unit_price_krw
            ));
        }
        if self.trade_interval_secs == 0 {
            return Err(anyhow::anyhow!("Trade interval must be at least 1 second."));
        }
        if self.earning_rate_percent <= 0.0 || self.earning_rate_percent > 10.0 {
            return Err(anyhow::anyhow!(
                "Earning rate {} must be within (0, 10] percent.",
                self.earning_rate_percent
            ));
        }
        if self.slot_interval_rate_percent <= 0.0 || self.slot_interval_rate_percent > 5.0 {
            return Err(anyhow::anyhow!(
                "Slot interval rate {} must be within (0, 5] percent.",
                self.slot_interval_rate_percent
            ));
        }
        if self.minimum_tradable_unit <= 0.0 {
            return Err(anyhow::anyhow!(
                "Minimum tradable unit must be positive."
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> TradingSettings {
        TradingSettings {
            coin_type: "BTC".to_string(),
            unit_price_krw: 100_000,
            trade_interval_secs: 30,
            earning_rate_percent: 1.0,
            slot_interval_rate_percent: 0.5,
            minimum_tradable_unit: 0.0001,
        }
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_lowercase_coin() {
        let mut settings = valid_settings();
        settings.coin_type = "btc".to_string();
        let res = settings.validate();
        assert!(res.is_err());
        assert_eq!(
            res.unwrap_err().to_string(),
            "Coin type \"btc\" must be upper-case."
        );
    }

    #[test]
    fn test_validation_rejects_pair_notation() {
        let mut settings = valid_settings();
        settings.coin_type = "BTC/KRW".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_tiny_unit_price() {
        let mut settings = valid_settings();
        settings.unit_price_krw = 500;
        let res = settings.validate();
        assert!(res.is_err());
        assert_eq!(
            res.unwrap_err().to_string(),
            "Unit price 500 KRW is below the exchange order minimum."
        );
    }

    #[test]
    fn test_validation_rejects_zero_interval() {
        let mut settings = valid_settings();
        settings.trade_interval_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_bounds_rates() {
        let mut settings = valid_settings();
        settings.earning_rate_percent = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = valid_settings();
        settings.earning_rate_percent = 10.5;
        assert!(settings.validate().is_err());

        let mut settings = valid_settings();
        settings.slot_interval_rate_percent = -0.5;
        assert!(settings.validate().is_err());

        let mut settings = valid_settings();
        settings.slot_interval_rate_percent = 6.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_minimum_unit_defaults_when_absent() {
        let toml_src = r#"
            coin_type = "ETH"
            unit_price_krw = 50000
            trade_interval_secs = 60
            earning_rate_percent = 1.0
            slot_interval_rate_percent = 0.5
        "#;
        let settings: TradingSettings = toml::from_str(toml_src).unwrap();
        assert_eq!(settings.minimum_tradable_unit, 0.0001);
        assert!(settings.validate().is_ok());
    }
}
