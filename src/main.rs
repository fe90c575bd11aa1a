use anyhow::Result;
use bithumb_grid_bot::config::exchange::load_credentials;
use bithumb_grid_bot::config::load_settings;
use bithumb_grid_bot::engine::ReconciliationEngine;
use bithumb_grid_bot::exchange::{BithumbClient, DryRunGateway, ExchangeGateway};
use bithumb_grid_bot::logging::OrderAuditLogger;
use bithumb_grid_bot::scheduler::CycleScheduler;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Bithumb Grid Trading Bot", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Run a single reconciliation cycle and exit
    #[arg(long)]
    once: bool,

    /// Log intended orders without sending anything to the exchange
    #[arg(long)]
    dry_run: bool,

    /// Directory for the CSV order audit trail
    #[arg(long, default_value = "logs")]
    audit_log: String,
}

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

#[tokio::main]
async fn main() -> Result<()> {
    // ---------------------------------------------------------
    // 1. Setup Logging (Tracing)
    // ---------------------------------------------------------
    let file_appender = tracing_appender::rolling::daily("logs", "application.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Console Layer (Env Filter)
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
                .add_directive("bithumb_grid_bot=debug".parse().unwrap()),
        );

    // File Layer (Simple Text)
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_target(false)
        .with_filter(tracing_subscriber::EnvFilter::new(
            "info,bithumb_grid_bot=debug",
        ));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    let args = Args::parse();

    // ---------------------------------------------------------
    // 2. Setup Audit Logger
    // ---------------------------------------------------------
    let audit_logger = match OrderAuditLogger::new(&args.audit_log) {
        Ok(l) => Some(l),
        Err(e) => {
            error!("Failed to initialize order audit logger: {}", e);
            None
        }
    };

    // Load configuration
    info!("Loading config from: {}", args.config);
    let settings = load_settings(&args.config)?;
    let interval = Duration::from_secs(settings.trade_interval_secs);

    let credentials = match load_credentials() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load exchange credentials: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting grid bot for {}: {} KRW per slot, one cycle every {}s",
        settings.coin_type, settings.unit_price_krw, settings.trade_interval_secs
    );

    let client = BithumbClient::new(&credentials)?;
    let gateway: Arc<dyn ExchangeGateway> = if args.dry_run {
        info!("[DRY_RUN] Orders will be logged, not sent");
        Arc::new(DryRunGateway::new(client))
    } else {
        Arc::new(client)
    };

    let mut engine = ReconciliationEngine::new(gateway, settings);
    if let Some(audit) = audit_logger {
        engine = engine.with_audit(audit);
    }

    // --- SINGLE CYCLE MODE ---
    if args.once {
        let report = engine.run_cycle().await?;
        info!("[CYCLE] {}", report);
        for placed in &report.placed {
            info!("placed {} -> {}", placed.planned, placed.order_id);
        }
        for (planned, err) in &report.failed {
            error!("failed {}: {}", planned, err);
        }
        return Ok(());
    }

    // --- SCHEDULED MODE ---
    let scheduler = CycleScheduler::new(engine, interval);
    if let Err(e) = scheduler.run().await {
        error!("Scheduler error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
