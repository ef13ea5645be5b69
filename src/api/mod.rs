//! REST API layer: route handlers, DTOs, OpenAPI and router composition.
//!
//! Resource routes require `Authorization: Bearer <jwt>`; `/health`,
//! `/openapi.json` and `/ws` (token in the query string) do not.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(handlers::routes())
        .merge(handlers::system::routes())
        .merge(openapi::routes())
}
