//! FinOps hub - cost-optimization report service
//!
//! Serves savings reports that combine vendor recommendations with
//! self-detected zombie resources, plus resource and project listings.

use anyhow::Result;
use finops_hub::{api, config::HubConfig};
use hub_lib::{
    detector::ZombieDetector,
    health::{components, HealthRegistry},
    inventory::InventoryService,
    observability::{HubMetrics, StructuredLogger},
    pricing::WasteCostEstimator,
    report::ReportAggregator,
    sources::SnapshotSource,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const HUB_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting finops-hub");

    let config = HubConfig::load()?;
    info!(
        port = config.api_port,
        snapshot = %config.snapshot_path.display(),
        idle_threshold = config.idle_threshold,
        lookback_days = config.lookback_days,
        "Hub configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::RECOMMENDER).await;
    health_registry.register(components::COMPUTE).await;
    health_registry.register(components::MONITORING).await;
    health_registry.register(components::INVENTORY).await;

    let metrics = HubMetrics::new();
    let logger = StructuredLogger::new(api::SERVICE_NAME);

    let pricing = Arc::new(config.pricing()?);
    logger.log_startup(HUB_VERSION, &config.pricing_source());

    let source = Arc::new(SnapshotSource::load(&config.snapshot_path)?);
    let detector = ZombieDetector::new(
        source.clone(),
        source.clone(),
        WasteCostEstimator::new(pricing),
        config.detector_config(),
    );
    let aggregator = ReportAggregator::new(
        source.clone(),
        Arc::new(detector),
        config.aggregator_config(),
    );
    let inventory = InventoryService::new(source.clone(), source);

    let app_state = Arc::new(api::AppState::new(
        Arc::new(aggregator),
        Arc::new(inventory),
        health_registry.clone(),
        metrics,
    ));

    health_registry.set_ready(true);

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    api::serve(config.api_port, app_state, shutdown).await?;

    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
