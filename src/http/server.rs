//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID)
//! - Serve until the shutdown future resolves

use axum::{
    extract::Request,
    http::HeaderName,
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::app::ConfigService;
use crate::config::ServiceConfig;
use crate::http::auth::admin_auth_middleware;
use crate::http::handlers;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConfigService>,
    pub admin_key: Arc<str>,
}

/// HTTP server for the configuration API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ServiceConfig, service: Arc<ConfigService>) -> Self {
        let state = AppState {
            service,
            admin_key: Arc::from(config.admin.api_key.as_str()),
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);

        let admin = Router::new()
            .route("/config/settings/new", post(handlers::create_section))
            .route("/config/settings/token", post(handlers::generate_token))
            .route("/config/settings", delete(handlers::delete_section))
            .route("/config/export", post(handlers::export))
            .route("/config/listeners", get(handlers::list_listeners))
            .route("/admin/status", get(handlers::status))
            .route("/admin/queue", get(handlers::queue))
            .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware));

        let open = Router::new()
            .route("/config/settings", get(handlers::get_settings))
            .route("/config/settings/update", patch(handlers::update_value))
            .route("/config/settings/value", delete(handlers::remove_value))
            .route("/config/diff", patch(handlers::diff))
            .route("/config/import", post(handlers::import))
            .route("/config/register", patch(handlers::register));

        Router::new()
            .merge(admin)
            .merge(open)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    /// The configured router, for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
