use axum::{Router, extract::FromRef, http::HeaderName};

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod flash;
pub mod handlers;
pub mod models;
pub mod render;
pub mod repository;

// Module for routing segregation (Public, User, Admin).
pub mod routes;
use routes::{admin, public, user};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs)
// and to the integration tests.
pub use config::AppConfig;
pub use render::{HtmlRenderer, MockRenderer, RendererState};
pub use repository::{RepositoryState, SqliteRepository, connect_pool, init_db};

/// AppState
///
/// Implements the **Unified State Pattern**. This is the single, thread-safe, and
/// immutable container holding all essential application services and configuration,
/// shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts database access via the SqlitePool connection.
    pub repo: RepositoryState,
    /// Presentation Boundary: renders a named view with a data bag.
    pub renderer: RendererState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow extractors to selectively pull components from the
// shared AppState. The session guard extractors in `auth` only need AppConfig, so
// they depend on `AppConfig: FromRef<S>` rather than on the whole state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for RendererState {
    fn from_ref(app_state: &AppState) -> RendererState {
        app_state.renderer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies observability
/// middleware, and registers the application state.
///
/// Access control is enforced per handler through the guard extractors
/// (`RequireUser`, `RequireAdmin`); a failed guard short-circuits into a redirect
/// to the matching login view before the handler body runs.
pub fn create_router(state: AppState) -> Router {
    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 1. Base Router Assembly: the three security-segregated route modules.
    let base_router = Router::new()
        .merge(public::public_routes())
        .merge(user::user_routes())
        .merge(admin::admin_routes())
        .with_state(state);

    // 2. Observability and Correlation Layers (applied outermost/first).
    base_router.layer(
        ServiceBuilder::new()
            // 2a. Request ID Generation: a unique UUID for every incoming request.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            // 2b. Request Tracing: wraps the request/response lifecycle in a span
            // that carries the generated request ID.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // 2c. Request ID Propagation: returns the x-request-id header to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation: it extracts the
/// `x-request-id` header (if present) and includes it in the structured logging
/// metadata alongside the HTTP method and URI, so every log line for a single
/// request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
