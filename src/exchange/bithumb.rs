//! Bithumb REST gateway.
//!
//! Implements [`ExchangeGateway`] against the legacy Bithumb API:
//! public market data plus HMAC-SHA512-signed private endpoints. Every
//! numeric field in a response is a string, frequently with thousands
//! separators, and goes through [`crate::parse`] before leaving this
//! module.

use crate::config::exchange::BithumbCredentials;
use crate::constants::{
    HTTP_TIMEOUT, OPEN_ORDER_FETCH_COUNT, PAYMENT_CURRENCY, PROCESSED_ORDER_FETCH_COUNT,
    UNITS_DECIMALS,
};
use crate::error::GatewayError;
use crate::exchange::ExchangeGateway;
use crate::model::{
    datetime_from_micros, AccountBalance, CurrencyBalance, OpenOrder, OrderSide, ProcessedOrder,
};
use crate::parse::{classify_status, parse_krw, parse_units, ResponseStatus};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha512;
use tracing::debug;

type HmacSha512 = Hmac<Sha512>;

pub struct BithumbClient {
    http: reqwest::Client,
    api_key: String,
    api_secret: String,
    base_url: String,
}

impl BithumbClient {
    pub fn new(credentials: &BithumbCredentials) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: credentials.api_key.clone(),
            api_secret: credentials.api_secret.clone(),
            base_url: credentials.api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn public_get(&self, path: &str) -> Result<Value, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let body: Value = self.http.get(&url).send().await?.json().await?;
        envelope_data(body)
    }

    async fn private_post(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Value, GatewayError> {
        let nonce = Utc::now().timestamp_millis().to_string();
        let query = encode_form(endpoint, params)?;
        let signature = self.sign(endpoint, &query, &nonce)?;
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("[API_REQUEST] POST {}", endpoint);

        let body: Value = self
            .http
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("Api-Sign", signature)
            .header("Api-Nonce", &nonce)
            .header("api-client-type", "2")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(query)
            .send()
            .await?
            .json()
            .await?;
        Ok(body)
    }

    /// Legacy Bithumb request signature:
    /// `base64(hex(HMAC-SHA512(endpoint NUL query NUL nonce, secret)))`.
    fn sign(&self, endpoint: &str, query: &str, nonce: &str) -> Result<String, GatewayError> {
        let payload = format!("{endpoint}\u{0}{query}\u{0}{nonce}");
        let mut mac = HmacSha512::new_from_slice(self.api_secret.as_bytes())
            .map_err(|err| GatewayError::Transport(format!("failed to create signing key: {err}")))?;
        mac.update(payload.as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());
        Ok(BASE64.encode(digest.as_bytes()))
    }
}

#[async_trait]
impl ExchangeGateway for BithumbClient {
    async fn current_price(&self, coin: &str) -> Result<u64, GatewayError> {
        let path = format!("/public/orderbook/{}_{}?count=1", coin, PAYMENT_CURRENCY);
        let data = self.public_get(&path).await?;
        best_bid(&data)
    }

    async fn balance(&self, coin: &str) -> Result<AccountBalance, GatewayError> {
        let params = [("currency", coin.to_string())];
        let body = self.private_post("/info/balance", &params).await?;
        let data = envelope_data(body)?;
        Ok(AccountBalance {
            krw: currency_balance(&data, PAYMENT_CURRENCY)?,
            coin: currency_balance(&data, coin)?,
        })
    }

    async fn placed_orders(&self, coin: &str) -> Result<Vec<OpenOrder>, GatewayError> {
        let params = [
            ("order_currency", coin.to_string()),
            ("payment_currency", PAYMENT_CURRENCY.to_string()),
            ("count", OPEN_ORDER_FETCH_COUNT.to_string()),
        ];
        let body = self.private_post("/info/orders", &params).await?;
        match envelope(&body) {
            ResponseStatus::Success => open_orders_from(&body["data"]),
            ResponseStatus::EmptyList => Ok(Vec::new()),
            ResponseStatus::Error { status, message } => {
                Err(GatewayError::Api { status, message })
            }
        }
    }

    async fn processed_orders(&self, coin: &str) -> Result<Vec<ProcessedOrder>, GatewayError> {
        let params = [
            ("order_currency", coin.to_string()),
            ("payment_currency", PAYMENT_CURRENCY.to_string()),
            ("count", PROCESSED_ORDER_FETCH_COUNT.to_string()),
            ("searchGb", "0".to_string()),
        ];
        let body = self.private_post("/info/user_transactions", &params).await?;
        match envelope(&body) {
            ResponseStatus::Success => processed_orders_from(&body["data"]),
            ResponseStatus::EmptyList => Ok(Vec::new()),
            ResponseStatus::Error { status, message } => {
                Err(GatewayError::Api { status, message })
            }
        }
    }

    async fn place_order(
        &self,
        coin: &str,
        side: OrderSide,
        units: f64,
        price: u64,
    ) -> Result<String, GatewayError> {
        let params = [
            ("order_currency", coin.to_string()),
            ("payment_currency", PAYMENT_CURRENCY.to_string()),
            ("units", format_units(units)),
            ("price", price.to_string()),
            ("type", side.api_value().to_string()),
        ];
        let body = self.private_post("/trade/place", &params).await?;
        match envelope(&body) {
            ResponseStatus::Success => string_field(&body, "order_id"),
            ResponseStatus::EmptyList | ResponseStatus::Error { .. } => {
                Err(api_error(&body))
            }
        }
    }

    async fn cancel_order(
        &self,
        coin: &str,
        order_id: &str,
        side: OrderSide,
    ) -> Result<(), GatewayError> {
        let params = [
            ("order_id", order_id.to_string()),
            ("type", side.api_value().to_string()),
            ("order_currency", coin.to_string()),
            ("payment_currency", PAYMENT_CURRENCY.to_string()),
        ];
        let body = self.private_post("/trade/cancel", &params).await?;
        match envelope(&body) {
            ResponseStatus::Success => Ok(()),
            ResponseStatus::EmptyList | ResponseStatus::Error { .. } => Err(api_error(&body)),
        }
    }
}

// --- response decoding helpers ---

fn envelope(body: &Value) -> ResponseStatus {
    let status = body["status"].as_str().unwrap_or("");
    classify_status(status, body["message"].as_str())
}

/// Checks the envelope and extracts `data`; used where an empty-list
/// normalization makes no sense (market data, balances).
fn envelope_data(mut body: Value) -> Result<Value, GatewayError> {
    match envelope(&body) {
        ResponseStatus::Success => Ok(body["data"].take()),
        ResponseStatus::EmptyList | ResponseStatus::Error { .. } => Err(api_error(&body)),
    }
}

fn api_error(body: &Value) -> GatewayError {
    GatewayError::Api {
        status: body["status"].as_str().unwrap_or("unknown").to_string(),
        message: body["message"].as_str().unwrap_or_default().to_string(),
    }
}

fn best_bid(data: &Value) -> Result<u64, GatewayError> {
    let raw = data["bids"][0]["price"]
        .as_str()
        .ok_or_else(|| GatewayError::Malformed("order book has no bids".into()))?;
    Ok(parse_krw(raw)?)
}

fn open_orders_from(data: &Value) -> Result<Vec<OpenOrder>, GatewayError> {
    let entries = data
        .as_array()
        .ok_or_else(|| GatewayError::Malformed("order list is not an array".into()))?;
    let mut orders = Vec::with_capacity(entries.len());
    for entry in entries {
        let side = side_field(entry, "type")?;
        orders.push(OpenOrder {
            order_id: string_field(entry, "order_id")?,
            side,
            price: krw_field(entry, "price")?,
            units_remaining: units_field(entry, "units_remaining")?,
            order_date: datetime_from_micros(micros_field(entry, "order_date")?),
        });
    }
    Ok(orders)
}

fn processed_orders_from(data: &Value) -> Result<Vec<ProcessedOrder>, GatewayError> {
    let entries = data
        .as_array()
        .ok_or_else(|| GatewayError::Malformed("transaction list is not an array".into()))?;
    let mut orders = Vec::with_capacity(entries.len());
    for entry in entries {
        // search: 1 = buy settled, 2 = sell settled; everything else in
        // the feed (deposits, withdrawals, KRW movements) is skipped.
        let side = match string_field(entry, "search")?.as_str() {
            "1" => OrderSide::Buy,
            "2" => OrderSide::Sell,
            _ => continue,
        };
        let transfer_micros = micros_field(entry, "transfer_date")?;
        orders.push(ProcessedOrder {
            // The transaction feed carries no order id; the microsecond
            // transfer stamp is unique per fill and stands in for one.
            order_id: transfer_micros.to_string(),
            side,
            price: krw_field(entry, "price")?,
            units: signed_units_field(entry, "units")?,
            fee: units_field(entry, "fee")?,
            processed_date: datetime_from_micros(transfer_micros),
        });
    }
    Ok(orders)
}

fn currency_balance(data: &Value, currency: &str) -> Result<CurrencyBalance, GatewayError> {
    let key = currency.to_ascii_lowercase();
    Ok(CurrencyBalance {
        total: units_field(data, &format!("total_{key}"))?,
        in_use: units_field(data, &format!("in_use_{key}"))?,
        available: units_field(data, &format!("available_{key}"))?,
    })
}

fn side_field(entry: &Value, key: &str) -> Result<OrderSide, GatewayError> {
    let raw = string_field(entry, key)?;
    OrderSide::from_api_value(&raw)
        .ok_or_else(|| GatewayError::Malformed(format!("unknown order side {raw:?}")))
}

fn string_field(entry: &Value, key: &str) -> Result<String, GatewayError> {
    match &entry[key] {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(GatewayError::Malformed(format!("missing field {key}"))),
    }
}

fn krw_field(entry: &Value, key: &str) -> Result<u64, GatewayError> {
    Ok(parse_krw(&string_field(entry, key)?)?)
}

fn units_field(entry: &Value, key: &str) -> Result<f64, GatewayError> {
    Ok(parse_units(&string_field(entry, key)?)?)
}

/// The transaction feed prefixes quantities with a sign and a space,
/// e.g. `"- 0.0001"`; the side already encodes the direction.
fn signed_units_field(entry: &Value, key: &str) -> Result<f64, GatewayError> {
    let raw = string_field(entry, key)?;
    let stripped = raw.trim_start_matches(|c: char| c == '+' || c == '-' || c == ' ');
    Ok(parse_units(stripped)?)
}

fn micros_field(entry: &Value, key: &str) -> Result<i64, GatewayError> {
    match &entry[key] {
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| GatewayError::Malformed(format!("bad timestamp in {key}"))),
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| GatewayError::Malformed(format!("bad timestamp in {key}"))),
        _ => Err(GatewayError::Malformed(format!("missing field {key}"))),
    }
}

/// Order quantities go to the wire at the planner's decimal precision.
fn format_units(units: f64) -> String {
    format!("{:.*}", UNITS_DECIMALS as usize, units)
}

fn encode_form(endpoint: &str, params: &[(&str, String)]) -> Result<String, GatewayError> {
    let mut pairs: Vec<(&str, String)> = vec![("endpoint", endpoint.to_string())];
    pairs.extend(params.iter().map(|(k, v)| (*k, v.clone())));
    serde_urlencoded::to_string(&pairs)
        .map_err(|err| GatewayError::Malformed(format!("failed to encode request: {err}")))
}
