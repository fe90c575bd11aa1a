//! Exchange access: the gateway trait, the Bithumb REST client, and
//! helpers for running without touching the real exchange.

use crate::error::GatewayError;
use crate::model::{AccountBalance, OpenOrder, OrderSide, ProcessedOrder};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub mod bithumb;
pub mod dry_run;

pub use bithumb::BithumbClient;
pub use dry_run::DryRunGateway;

/// The six exchange operations the reconciliation engine consumes.
///
/// Implementations own the wire protocol; everything returned here is
/// already normalized (integer KRW prices, typed sides, parsed
/// quantities), and the benign "no open orders" response surfaces as an
/// empty vector, not an error.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Current best bid for the coin/KRW pair, integer KRW.
    async fn current_price(&self, coin: &str) -> Result<u64, GatewayError>;

    /// Balance snapshot for KRW and the traded coin.
    async fn balance(&self, coin: &str) -> Result<AccountBalance, GatewayError>;

    /// Orders still resting on the book.
    async fn placed_orders(&self, coin: &str) -> Result<Vec<OpenOrder>, GatewayError>;

    /// Recently settled fills, newest first.
    async fn processed_orders(&self, coin: &str) -> Result<Vec<ProcessedOrder>, GatewayError>;

    /// Places a limit order; returns the exchange-assigned order id.
    async fn place_order(
        &self,
        coin: &str,
        side: OrderSide,
        units: f64,
        price: u64,
    ) -> Result<String, GatewayError>;

    /// Cancels a resting order.
    async fn cancel_order(
        &self,
        coin: &str,
        order_id: &str,
        side: OrderSide,
    ) -> Result<(), GatewayError>;
}

/// A placement recorded by [`MockGateway`].
#[derive(Debug, Clone)]
pub struct MockPlacement {
    pub side: OrderSide,
    pub units: f64,
    pub price: u64,
}

/// In-memory gateway for tests: serves a fixed snapshot and records
/// every write.
pub struct MockGateway {
    price: u64,
    balance: AccountBalance,
    open_orders: Mutex<Vec<OpenOrder>>,
    processed_orders: Vec<ProcessedOrder>,
    fail_requests: bool,
    initial_price_delay: Mutex<Option<Duration>>,
    price_fetch_count: AtomicU64,
    order_counter: AtomicU64,
    placed: Mutex<Vec<MockPlacement>>,
    cancelled: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new(price: u64, balance: AccountBalance) -> Self {
        Self {
            price,
            balance,
            open_orders: Mutex::new(Vec::new()),
            processed_orders: Vec::new(),
            fail_requests: false,
            initial_price_delay: Mutex::new(None),
            price_fetch_count: AtomicU64::new(0),
            order_counter: AtomicU64::new(1),
            placed: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    /// A gateway whose every call fails with a transport error.
    pub fn failing() -> Self {
        let mut mock = Self::new(0, AccountBalance::default());
        mock.fail_requests = true;
        mock
    }

    pub fn with_open_orders(mut self, orders: Vec<OpenOrder>) -> Self {
        self.open_orders = Mutex::new(orders);
        self
    }

    pub fn with_processed_orders(mut self, orders: Vec<ProcessedOrder>) -> Self {
        self.processed_orders = orders;
        self
    }

    /// Stalls the first price fetch, keeping the first cycle in flight
    /// while later scheduler ticks come due.
    pub fn with_initial_price_delay(mut self, delay: Duration) -> Self {
        self.initial_price_delay = Mutex::new(Some(delay));
        self
    }

    /// Appends an order to the open list, as if a placement from an
    /// earlier cycle were still resting on the book.
    pub fn push_open_order(&self, order: OpenOrder) {
        self.open_orders.lock().unwrap().push(order);
    }

    pub fn placements(&self) -> Vec<MockPlacement> {
        self.placed.lock().unwrap().clone()
    }

    pub fn cancellations(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }

    /// Number of price fetches served: one per engine cycle.
    pub fn price_fetches(&self) -> u64 {
        self.price_fetch_count.load(Ordering::SeqCst)
    }

    fn check_availability(&self) -> Result<(), GatewayError> {
        if self.fail_requests {
            return Err(GatewayError::Transport("mock connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ExchangeGateway for MockGateway {
    async fn current_price(&self, _coin: &str) -> Result<u64, GatewayError> {
        self.check_availability()?;
        self.price_fetch_count.fetch_add(1, Ordering::SeqCst);
        let stall = self.initial_price_delay.lock().unwrap().take();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        Ok(self.price)
    }

    async fn balance(&self, _coin: &str) -> Result<AccountBalance, GatewayError> {
        self.check_availability()?;
        Ok(self.balance)
    }

    async fn placed_orders(&self, _coin: &str) -> Result<Vec<OpenOrder>, GatewayError> {
        self.check_availability()?;
        Ok(self.open_orders.lock().unwrap().clone())
    }

    async fn processed_orders(&self, _coin: &str) -> Result<Vec<ProcessedOrder>, GatewayError> {
        self.check_availability()?;
        Ok(self.processed_orders.clone())
    }

    async fn place_order(
        &self,
        _coin: &str,
        side: OrderSide,
        units: f64,
        price: u64,
    ) -> Result<String, GatewayError> {
        self.check_availability()?;
        let id = self.order_counter.fetch_add(1, Ordering::SeqCst);
        self.placed
            .lock()
            .unwrap()
            .push(MockPlacement { side, units, price });
        Ok(format!("mock-order-{}", id))
    }

    async fn cancel_order(
        &self,
        _coin: &str,
        order_id: &str,
        _side: OrderSide,
    ) -> Result<(), GatewayError> {
        self.check_availability()?;
        self.cancelled.lock().unwrap().push(order_id.to_string());
        Ok(())
    }
}
