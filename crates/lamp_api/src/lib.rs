//! HTTP surface polled by lamp devices.
//!
//! Routes:
//! - `GET /lamps/{lamp_id}/config`: device document, always 200 unless the
//!   cache is unreachable.
//! - `GET /lamps`: registered lamps with their cached readings.
//! - `GET /health`: liveness.
//! - `GET /ready`: cache and upstream reachability.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use common::Error;
use lamp_service::{CacheStore, LampConfigService};
use surf_client::SurfFetcher;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub mod error;
pub mod handlers;

pub use error::ApiError;

/// Shared handler state.
pub struct AppState {
    pub service: Arc<LampConfigService>,
    pub cache: Arc<dyn CacheStore>,
    pub fetcher: Arc<dyn SurfFetcher>,
    pub version: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        service: Arc<LampConfigService>,
        cache: Arc<dyn CacheStore>,
        fetcher: Arc<dyn SurfFetcher>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            service,
            cache,
            fetcher,
            version: version.into(),
            started_at: Utc::now(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/lamps", get(handlers::list_lamps))
        .route("/lamps/{lamp_id}/config", get(handlers::lamp_config))
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM.
pub async fn serve(addr: &str, app: Router) -> Result<(), Error> {
    let listener = TcpListener::bind(addr).await?;
    let local: SocketAddr = listener.local_addr()?;
    info!("Lamp API listening on {}", local);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Lamp API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
