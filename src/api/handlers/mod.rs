//! REST endpoint handlers organized by resource.

pub mod chats;
pub mod connections;
pub mod presence;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all authenticated resource routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(connections::routes())
        .merge(chats::routes())
        .merge(presence::routes())
}
