use self::settings::TradingSettings;
use crate::error::BotError;
use std::fs;

pub mod exchange;
pub mod settings;

pub fn load_settings(path: &str) -> Result<TradingSettings, BotError> {
    let content = fs::read_to_string(path)?;
    let settings: TradingSettings = toml::from_str(&content)?;
    settings
        .validate()
        .map_err(|e| BotError::ValidationError(e.to_string()))?;
    Ok(settings)
}
