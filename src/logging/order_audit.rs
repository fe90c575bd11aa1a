use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::{create_dir_all, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// One row in the order audit trail. Every order the bot attempts to
/// place ends up here, whether the exchange accepted it or not.
#[derive(Debug, Serialize, Clone)]
pub struct OrderRecord {
    pub timestamp: String,
    pub coin: String,
    pub event: String, // PLACED, REJECTED
    pub side: String,
    pub price: u64,
    pub units: f64,
    pub reason: String,
    pub order_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct OrderAuditLogger {
    writer: Arc<Mutex<Writer<std::fs::File>>>,
}

impl OrderAuditLogger {
    pub fn new(log_dir: &str) -> Result<Self> {
        let dir = Path::new(log_dir);
        create_dir_all(dir).context("Failed to create audit log directory")?;

        let file_path = dir.join("orders.csv");
        let file_exists = file_path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .context("Failed to open orders.csv")?;

        let writer = csv::WriterBuilder::new()
            .has_headers(!file_exists)
            .from_writer(file);

        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
        })
    }

    pub fn log(&self, record: OrderRecord) {
        if let Ok(mut w) = self.writer.lock() {
            if let Err(e) = w.serialize(record) {
                eprintln!("Failed to write order audit log: {}", e);
            } else {
                let _ = w.flush();
            }
        }
    }

    pub fn log_placed(
        &self,
        coin: &str,
        side: &str,
        price: u64,
        units: f64,
        reason: &str,
        order_id: &str,
    ) {
        self.log(OrderRecord {
            timestamp: Local::now().to_rfc3339(),
            coin: coin.to_string(),
            event: "PLACED".to_string(),
            side: side.to_string(),
            price,
            units,
            reason: reason.to_string(),
            order_id: Some(order_id.to_string()),
            notes: None,
        });
    }

    pub fn log_rejected(
        &self,
        coin: &str,
        side: &str,
        price: u64,
        units: f64,
        reason: &str,
        error: &str,
    ) {
        self.log(OrderRecord {
            timestamp: Local::now().to_rfc3339(),
            coin: coin.to_string(),
            event: "REJECTED".to_string(),
            side: side.to_string(),
            price,
            units,
            reason: reason.to_string(),
            order_id: None,
            notes: Some(error.to_string()),
        });
    }
}
