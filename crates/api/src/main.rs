//! API server entry point.

use std::sync::Arc;

use route_store::{InMemoryRouteStore, PostgresRouteStore, RouteStore};
use routing::{TemplateRegistry, load_catalog};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use wes_api::config::{Config, LogFormat};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (text, json) = match config.log_format {
        LogFormat::Text => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

fn load_registry(config: &Config) -> Result<TemplateRegistry, BoxError> {
    let Some(path) = &config.template_catalog else {
        tracing::info!("using built-in template catalog");
        return Ok(TemplateRegistry::with_defaults());
    };

    let registry = TemplateRegistry::from_templates(load_catalog(path)?)?;
    tracing::info!(
        path = %path.display(),
        templates = registry.len(),
        "loaded template catalog"
    );
    Ok(registry)
}

async fn serve<S: RouteStore + 'static>(
    config: &Config,
    store: S,
    registry: Arc<TemplateRegistry>,
) -> Result<(), BoxError> {
    let app = wes_api::create_app(wes_api::create_state(store, registry));

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env()?;
    init_tracing(&config);

    // 2. Build the template catalog; an invalid catalog aborts startup
    let registry = Arc::new(load_registry(&config)?);

    // 3. Pick the route store and start serving
    match &config.database_url {
        Some(url) => {
            let store = PostgresRouteStore::connect(url).await?;
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL route store");
            serve(&config, store, registry).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, routes are kept in memory");
            serve(&config, InMemoryRouteStore::new(), registry).await
        }
    }
}
