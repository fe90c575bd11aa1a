use crate::constants::BITHUMB_API_URL;
use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct BithumbCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub api_url: String,
}

pub fn load_credentials() -> Result<BithumbCredentials> {
    dotenv().ok(); // Load .env file if it exists, ignore if missing (env vars might be set otherwise)

    let api_key = env::var("BITHUMB_API_KEY").context("BITHUMB_API_KEY is not set")?;

    let api_secret = env::var("BITHUMB_API_SECRET").context("BITHUMB_API_SECRET is not set")?;

    let api_url = env::var("BITHUMB_API_URL").unwrap_or_else(|_| BITHUMB_API_URL.to_string());

    Ok(BithumbCredentials {
        api_key,
        api_secret,
        api_url,
    })
}
