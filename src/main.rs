use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use organizer_api::config::{self, AppConfig};
use organizer_api::database::{DatabaseManager, Datastore, MemoryDatastore, PgDatastore};
use organizer_api::{app, notifier, AppState};

#[derive(Debug, Parser)]
#[command(name = "organizer-api", version, about = "Personal organization API server")]
struct Args {
    /// Port to listen on (overrides PORT / API_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Postgres connection string (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Keep everything in memory instead of Postgres
    #[arg(long)]
    memory: bool,

    /// Create the Postgres schema and exit
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("organizer_api=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    let mut config: AppConfig = config::config().clone();
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(url) = args.database_url {
        config.database.url = Some(url);
    }
    config.validate().context("refusing to start with this configuration")?;
    info!("Starting Organizer API in {:?} mode", config.environment);

    let store: Arc<dyn Datastore> = if args.memory {
        warn!("Using the in-memory datastore; data is lost on exit");
        Arc::new(MemoryDatastore::new())
    } else {
        let manager = DatabaseManager::connect(&config.database)
            .await
            .context("failed to connect to Postgres")?;
        let store = PgDatastore::new(manager);
        store.ensure_schema().await.context("failed to apply schema")?;
        if args.migrate {
            info!("Schema is up to date");
            store.close().await;
            return Ok(());
        }
        Arc::new(store)
    };

    let notifier = Arc::from(notifier::from_config(&config.notifier));
    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let state = AppState::new(config, store.clone(), notifier);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Organizer API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    store.close().await;
    info!("Datastore closed, bye");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
