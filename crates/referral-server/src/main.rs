mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use referral_api::{AppStateInner, MessageAccess, routes};
use referral_db::{Database, MemoryStore, MessageStore, RestStore};

use config::{Config, StoreBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "referral_desk=debug,referral_api=debug,referral_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn MessageStore> = match &config.store {
        StoreBackend::Sqlite { path } => Arc::new(Database::open(path)?),
        StoreBackend::Rest(rest) => {
            info!("Using hosted message store at {}", rest.base_url);
            Arc::new(RestStore::new(rest.clone())?)
        }
        StoreBackend::Memory => {
            info!("Using in-memory message store; nothing will be persisted");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppStateInner::new(MessageAccess::new(store));

    let app = routes::app(state)
        // The dashboard is served from a different origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Referral desk listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
