//! Presence query handler.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{PresenceEntry, PresenceQuery, PresenceResponse};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /presence?userIds=a,b,c` — Online state of each listed user.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on a non-numeric id.
#[utoipa::path(
    get,
    path = "/presence",
    tag = "Presence",
    summary = "Query presence",
    description = "Answers from the live-connection registry, in request order.",
    params(PresenceQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Presence snapshot", body = PresenceResponse),
        (status = 400, description = "Malformed id list", body = ErrorResponse),
    )
)]
pub async fn query_presence(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Query(query): Query<PresenceQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let ids = query.parse_ids()?;
    let online = state.hub.query(&ids).await;
    let presence = ids
        .into_iter()
        .map(|user_id| PresenceEntry {
            user_id,
            online: online.get(&user_id).copied().unwrap_or(false),
        })
        .collect();
    Ok(Json(PresenceResponse { presence }))
}

/// Presence routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/presence", get(query_presence))
}
