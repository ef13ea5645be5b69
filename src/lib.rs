//! # mutual-gateway
//!
//! Matching state machine and real-time hub for a mutual-interest dating
//! service.
//!
//! Users like, superlike or dislike each other; when interest is mutual
//! both directed edges become MATCHED and a private 1:1 chat is created in
//! the same unit of work. Connected users exchange messages, typing
//! indicators and presence over WebSocket. The durable store is always the
//! system of record; live pushes are at-most-once hints.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)  ── AuthUser (auth)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── MatchService / ChatResolver / MessageDispatcher (service/)
//!     ├── PresenceHub, match_machine (domain/)
//!     │
//!     └── Store: PostgresStore | MemoryStore (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, StatusCode};
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Builds the full application: REST routes, `/ws`, tracing and CORS.
///
/// REST routes answer `408` once [`GatewayConfig::request_timeout`] elapses.
/// `/ws` is left unbounded since the upgraded socket outlives the request.
///
/// [`GatewayConfig::request_timeout`]: crate::config::GatewayConfig::request_timeout
pub fn build_app(state: AppState) -> Router {
    let rest = api::build_router().layer(request_timeout_layer(state.config.request_timeout()));
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.frontend_origin));
    Router::new()
        .merge(rest)
        .route("/ws", get(ws_handler))
        .layer(middleware)
        .with_state(state)
}

fn request_timeout_layer(limit: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, limit)
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin.trim() == "*" {
        return CorsLayer::permissive();
    }
    match HeaderValue::from_str(origin.trim()) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            tracing::warn!(origin, "invalid FRONTEND_ORIGIN; cross-origin requests disabled");
            CorsLayer::new()
        }
    }
}
