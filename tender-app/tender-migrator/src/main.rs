use anyhow::Context;
use tracing::{error, info};

use tender_infrastructure::{build_marketplace, create_pool, run_migrations, verify_schema};
use tender_shared::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Load configuration
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize telemetry (guard flushes the file writer on exit)
    let _log_guard = tender_shared::telemetry::init_telemetry(&config.log)?;

    info!("{} migrator starting ({})", config.app.name, config.app.env);

    // Connect to Database
    let pool = create_pool(&config.database)
        .await
        .context("connecting to database")?;
    info!("Database connection established.");

    // Apply schema
    run_migrations(&pool).await.context("running migrations")?;
    if let Err(e) = verify_schema(&pool).await {
        error!("Schema verification failed: {}", e);
        return Err(e.into());
    }

    // Smoke-read through the service layer
    let market = build_marketplace(pool.clone(), &config.engine);
    let tenders = market
        .tenders
        .list_tenders(None)
        .await
        .context("listing tenders")?;
    info!("Schema ready, {} tenders on record", tenders.len());

    pool.close().await;
    Ok(())
}
