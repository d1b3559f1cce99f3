use geotrack::config::AppConfig;
use geotrack::{db, kafka, TrackingService};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .init();

    info!("Starting GeoTrack telemetry service...");

    // Init DB
    let pool = db::init_pool(&config).await?;
    info!("Connected to database");

    let service = TrackingService::new(pool, config.query_limits());

    // Start Kafka
    kafka::start_kafka_consumer(&config, service).await?;

    Ok(())
}
