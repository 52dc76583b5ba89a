//! AQI Service - air quality HTTP API with synthetic fallback.
//!
//! Run with: `cargo run -p aqi-service`

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use aqi_core::{AcquisitionService, OpenWeatherClient, SampleTable, backfill};
use aqi_service::{Config, api};
use aqi_store::Store;

/// AQI Service - air quality HTTP API with synthetic fallback.
#[derive(Parser, Debug)]
#[command(name = "aqi-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config and environment).
    #[arg(short, long)]
    bind: Option<String>,

    /// Database path (overrides config and environment).
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Start serving without backfilling historical data.
    #[arg(long)]
    skip_backfill: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // A missing .env file is fine
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aqi_service=info".parse()?)
                .add_directive("aqi_core=info".parse()?)
                .add_directive("aqi_store=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // File, then environment, then command line
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    config.apply_env()?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db_path) = args.database {
        config.storage.path = db_path;
    }
    config.validate()?;

    info!("Starting AQI server...");
    info!("Historical data period: {} days", config.history.days);
    if config.security.api_key.is_none() {
        warn!("No API secret configured (API_SECRET_KEY); every request will be rejected");
    }
    if config.upstream.api_key.is_empty() {
        warn!("No upstream API key configured (OPENWEATHER_API_KEY); serving synthetic data");
    }

    let store = Store::open(&config.storage.path)?;
    let samples = SampleTable::load_or_create(&config.storage.samples_path);
    let provider = OpenWeatherClient::new(&config.upstream.base_url, config.upstream.api_key.clone())?
        .timeouts(config.upstream.request_timeout(), config.upstream.probe_timeout());

    let acquisition =
        AcquisitionService::new(Arc::new(provider), Arc::new(Mutex::new(store)), samples);

    if args.skip_backfill {
        info!("Historical backfill skipped");
    } else {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        backfill::run(&acquisition, config.history.days, now).await;
    }

    let bind = config.server.bind.clone();
    let state = aqi_service::AppState::new(acquisition, config);

    let app = api::app(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    info!("Starting server on {}", bind);

    let listener = tokio::net::TcpListener::bind(bind.as_str()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
