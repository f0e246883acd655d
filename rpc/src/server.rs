//! Router assembly and the serving loop.

use std::future::Future;
use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{auth, handlers, webhook, AppState, RpcError};

/// Every route, with request tracing.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/auth/session", post(auth::open_session))
        .route("/api/guest/invite", post(handlers::invite))
        .route("/api/guest/register", post(handlers::register))
        .route("/api/guest/invitation", get(handlers::invitation))
        .route("/api/guest/complete", post(handlers::complete))
        .route(
            "/api/guest/verification-status",
            get(handlers::verification_status),
        )
        .route("/api/guest/approve", post(handlers::approve))
        .route("/api/passes/:id/cancel", post(handlers::cancel))
        .route("/api/passes/:id/qr", get(handlers::door_qr))
        .route("/api/resident/passes", get(handlers::resident_passes))
        .route("/api/admin/check-in", post(handlers::check_in))
        .route("/api/admin/check-out", post(handlers::check_out))
        .route("/api/admin/passes", get(handlers::all_passes))
        .route("/api/admin/metrics", get(handlers::metrics))
        .route("/api/admin/recent-activity", get(handlers::recent_activity))
        .route("/api/webhooks/identity", post(webhook::identity_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct RpcServer {
    addr: SocketAddr,
    state: AppState,
    cors: bool,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            state,
            cors: false,
        }
    }

    /// Allow cross-origin browser clients.
    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors = enabled;
        self
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut app = create_app(self.state);
        if self.cors {
            app = app.layer(CorsLayer::permissive());
        }
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| RpcError::Server(format!("bind {}: {e}", self.addr)))?;
        info!(addr = %self.addr, "HTTP API listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}
