//! Reconciliation engine.
//!
//! Each cycle fetches a fresh account snapshot, derives a plan from it
//! and executes the plan against the gateway. Nothing persists between
//! cycles; the exchange is the only source of truth.

pub mod plan;
pub mod report;

pub use plan::{plan_cycle, CyclePlan, CycleSnapshot};
pub use report::{CycleReport, OrderReason, PlacedOrder, PlannedOrder, SkipReason};

use crate::config::settings::TradingSettings;
use crate::error::GatewayError;
use crate::exchange::ExchangeGateway;
use crate::logging::OrderAuditLogger;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ReconciliationEngine {
    gateway: Arc<dyn ExchangeGateway>,
    settings: TradingSettings,
    audit: Option<OrderAuditLogger>,
}

impl ReconciliationEngine {
    pub fn new(gateway: Arc<dyn ExchangeGateway>, settings: TradingSettings) -> Self {
        Self {
            gateway,
            settings,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: OrderAuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Runs one full reconciliation cycle.
    ///
    /// A fetch failure aborts the cycle before any side effect. A
    /// placement failure is recorded in the report and the remaining
    /// orders are still attempted; the next cycle re-derives whatever
    /// is still missing from a fresh snapshot.
    pub async fn run_cycle(&self) -> Result<CycleReport, GatewayError> {
        let coin = self.settings.coin_type.as_str();

        // 1. Fetch one consistent snapshot
        let snapshot = self.fetch_snapshot(coin).await?;

        // 2. Plan, pure and synchronous
        let plan = plan_cycle(&self.settings, &snapshot);
        for skip in &plan.skips {
            info!("[CYCLE_SKIP] {}", skip);
        }

        // 3. Execute the plan
        let mut report = CycleReport {
            current_price: snapshot.current_price,
            skips: plan.skips,
            ..Default::default()
        };
        for planned in plan.orders {
            info!("[ORDER_REQUEST] {} {}", coin, planned);
            match self
                .gateway
                .place_order(coin, planned.side, planned.units, planned.price)
                .await
            {
                Ok(order_id) => {
                    info!("[ORDER_PLACED] {} -> {}", planned, order_id);
                    if let Some(audit) = &self.audit {
                        audit.log_placed(
                            coin,
                            &planned.side.to_string(),
                            planned.price,
                            planned.units,
                            &planned.reason.to_string(),
                            &order_id,
                        );
                    }
                    report.placed.push(PlacedOrder { order_id, planned });
                }
                Err(err) => {
                    warn!("[ORDER_REJECTED] {}: {}", planned, err);
                    if let Some(audit) = &self.audit {
                        audit.log_rejected(
                            coin,
                            &planned.side.to_string(),
                            planned.price,
                            planned.units,
                            &planned.reason.to_string(),
                            &err.to_string(),
                        );
                    }
                    report.failed.push((planned, err.to_string()));
                }
            }
        }
        Ok(report)
    }

    async fn fetch_snapshot(&self, coin: &str) -> Result<CycleSnapshot, GatewayError> {
        let current_price = self.gateway.current_price(coin).await?;
        let balance = self.gateway.balance(coin).await?;
        let open_orders = self.gateway.placed_orders(coin).await?;
        let processed_orders = self.gateway.processed_orders(coin).await?;
        Ok(CycleSnapshot {
            current_price,
            balance,
            open_orders,
            processed_orders,
        })
    }
}
