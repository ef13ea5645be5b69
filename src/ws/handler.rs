//! Axum WebSocket upgrade handler.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use utoipa::IntoParams;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::error::GatewayError;

/// Query parameters of `GET /ws`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WsParams {
    /// Bearer token; browsers cannot set headers on a WebSocket handshake.
    pub token: Option<String>,
}

/// `GET /ws` — Upgrade an authenticated HTTP connection to WebSocket.
///
/// The token is verified before the upgrade, so a bad token is answered
/// with a plain 401.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] if the token is missing or invalid.
#[utoipa::path(
    get,
    path = "/ws",
    tag = "Live",
    params(WsParams),
    responses(
        (status = 101, description = "Switching protocols"),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse),
    )
)]
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, GatewayError> {
    let token = params
        .token
        .as_deref()
        .ok_or_else(|| GatewayError::Unauthorized("missing token".to_string()))?;
    let user_id = state.tokens.verify(token)?;

    Ok(ws
        .on_upgrade(move |socket| run_connection(socket, user_id, state))
        .into_response())
}
