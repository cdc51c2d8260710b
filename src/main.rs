use marketplace_ledger::config::Settings;
use marketplace_ledger::observability::{init_logging, init_metrics, serve_metrics, LogConfig};
use marketplace_ledger::repositories::{LedgerStore, PgLedgerStore};
use marketplace_ledger::services::{ReportingEngine, SettlementEngine, SettlementPolicy};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;

    init_logging(&LogConfig::from(&settings.application))?;
    info!("Configuration loaded");

    match settings.application.metrics_port {
        Some(port) => {
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            serve_metrics(addr)?;
            info!("Prometheus exporter listening on {}", addr);
        }
        None => {
            init_metrics()?;
        }
    }

    // Connect to PostgreSQL
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.pool_size)
        .acquire_timeout(Duration::from_secs(settings.database.acquire_timeout_secs))
        .connect(&settings.database.url)
        .await?;

    info!("Database connection established");

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations applied successfully");

    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool));
    let policy = SettlementPolicy::from(&settings.settlement);
    let _settlement = SettlementEngine::with_policy(store.clone(), policy);
    let reporting = ReportingEngine::new(store);

    let active = reporting.find_all_active_contracts().await?;
    info!(
        active_contracts = active.len(),
        deposit_cap_ratio = %policy.deposit_cap_ratio,
        "Ledger ready"
    );

    info!("System startup verification complete: ledger store healthy.");

    Ok(())
}
