//! vastd - VAST ad tag server and tracking beacon recorder

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vastd_core::{
    config::Args,
    server::{self, AppState},
    MySqlStore,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("vastd={0},vastd_core={0},info", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("{}", e);
        std::process::exit(1);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.workers)
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(run(args))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let server_config = args.server_config();
    let store_config = args.store_config();

    info!("======================================");
    info!("  vastd - VAST ad server");
    info!("======================================");
    info!("Listen: {}", server_config.addr);
    info!("Workers: {}", args.workers);
    info!(
        "Database: {}@{}:{}/{}",
        store_config.user, store_config.host, store_config.port, store_config.database
    );
    info!("Pool size: {}", store_config.pool_size);
    info!("Acquire timeout: {:?}", store_config.acquire_timeout);
    info!("Tracking URL: {}", args.tracking_url);
    info!("======================================");

    // Connections open on first use; an unreachable database only costs beacons
    let store = MySqlStore::connect_lazy(&store_config);

    if args.db.db_init_schema {
        store
            .ensure_table()
            .await
            .context("failed to create tracking_events table")?;
        info!("tracking_events table ready");
    }

    let state = Arc::new(AppState::new(Arc::new(store)).with_tracking_base(args.tracking_url.clone()));

    let listener = server::bind(&server_config.addr)
        .with_context(|| format!("failed to bind {}", server_config.addr))?;
    info!("vastd listening on http://{}", server_config.addr);

    server::serve(listener, state, &server_config, server::shutdown_signal()).await?;

    info!("vastd stopped");
    Ok(())
}
