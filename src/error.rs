use crate::parse::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Config error: {0}")]
    ConfigError(#[from] std::io::Error),
    #[error("Parsing error: {0}")]
    ParsingError(#[from] toml::de::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Failure of a single gateway call. Any of these aborts the running
/// reconciliation cycle; the next scheduled cycle retries from scratch.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Exchange API error {status}: {message}")]
    Api { status: String, message: String },
    #[error("Malformed exchange response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

impl From<ParseError> for GatewayError {
    fn from(err: ParseError) -> Self {
        GatewayError::Malformed(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Malformed(err.to_string())
    }
}
