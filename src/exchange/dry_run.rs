//! Dry-run gateway wrapper.
//!
//! Delegates every read to the wrapped gateway but swallows writes,
//! logging the order that would have been sent instead. Lets a cycle
//! run against live market data with zero side effects.

use crate::error::GatewayError;
use crate::exchange::ExchangeGateway;
use crate::model::{AccountBalance, OpenOrder, OrderSide, ProcessedOrder};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

pub struct DryRunGateway<G: ExchangeGateway> {
    inner: G,
    order_counter: AtomicU64,
}

impl<G: ExchangeGateway> DryRunGateway<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            order_counter: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl<G: ExchangeGateway> ExchangeGateway for DryRunGateway<G> {
    async fn current_price(&self, coin: &str) -> Result<u64, GatewayError> {
        self.inner.current_price(coin).await
    }

    async fn balance(&self, coin: &str) -> Result<AccountBalance, GatewayError> {
        self.inner.balance(coin).await
    }

    async fn placed_orders(&self, coin: &str) -> Result<Vec<OpenOrder>, GatewayError> {
        self.inner.placed_orders(coin).await
    }

    async fn processed_orders(&self, coin: &str) -> Result<Vec<ProcessedOrder>, GatewayError> {
        self.inner.processed_orders(coin).await
    }

    async fn place_order(
        &self,
        coin: &str,
        side: OrderSide,
        units: f64,
        price: u64,
    ) -> Result<String, GatewayError> {
        let n = self.order_counter.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "[DRY_RUN] Would place {} {} {:.4} @ {} KRW",
            side, coin, units, price
        );
        Ok(format!("dry-run-{}", n))
    }

    async fn cancel_order(
        &self,
        coin: &str,
        order_id: &str,
        _side: OrderSide,
    ) -> Result<(), GatewayError> {
        info!("[DRY_RUN] Would cancel {} order {}", coin, order_id);
        Ok(())
    }
}
