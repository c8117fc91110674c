use std::error::Error;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use travel_server::auth::{CachedVerifier, IdentityToolkitVerifier, IdentityVerifier};
use travel_server::config::{AuthBackend, ServerConfig, StoreBackend};
use travel_server::store::{DocumentStore, FirestoreStore, MemoryStore};
use travel_server::web::{AppState, create_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("travel_server=info,tower_http=info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let store: Arc<dyn DocumentStore> = match &config.store {
        StoreBackend::Memory { snapshot: Some(path) } => {
            info!(path = %path.display(), "using memory store with snapshot");
            Arc::new(MemoryStore::open(path)?)
        }
        StoreBackend::Memory { snapshot: None } => {
            warn!("using memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Firestore(firestore) => {
            info!(project = %firestore.project_id, "using Firestore");
            Arc::new(FirestoreStore::new(firestore.clone())?)
        }
    };

    let verifier: Arc<dyn IdentityVerifier> = match &config.auth {
        AuthBackend::Firebase(toolkit) => {
            info!(ttl_secs = config.token_cache.ttl.as_secs(), "verifying tokens with Firebase");
            let client = IdentityToolkitVerifier::new(toolkit.clone())?;
            Arc::new(CachedVerifier::new(client, &config.token_cache))
        }
        AuthBackend::Static(tokens) => {
            if tokens.is_empty() {
                warn!("static auth with no STATIC_TOKENS; every API request will be rejected");
            } else {
                warn!(count = tokens.len(), "using static development tokens");
            }
            Arc::new(tokens.clone())
        }
    };

    let state = AppState::new(store, verifier, config.rules);
    let app = create_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Travel planner listening on http://{addr}");
    info!("  GET  /health");
    info!("  POST|GET         /api/itineraryPlan");
    info!("  GET|PUT|DELETE   /api/itineraryPlan/:id");
    info!("  POST             /api/users");
    info!("  GET|PUT|DELETE   /api/users/:id");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
