//! Relationship handlers: like, superlike, dislike, accept, reject,
//! disconnect and listings.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    DisconnectResponse, IncomingRequestsResponse, MatchedPeersResponse, PairActionResponse,
};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::domain::{InterestKind, UserId};
use crate::error::{ErrorResponse, GatewayError};

async fn record(
    state: &AppState,
    actor: UserId,
    target: UserId,
    kind: InterestKind,
) -> Result<Json<PairActionResponse>, GatewayError> {
    let outcome = state
        .match_service
        .record_interest(actor, target, kind)
        .await?;
    Ok(Json(PairActionResponse::from_outcome(&outcome, actor, target)))
}

/// `POST /connections/{id}/like` — Like a user.
///
/// # Errors
///
/// Returns [`GatewayError`] on self-action, unknown user or store failure.
#[utoipa::path(
    post,
    path = "/connections/{id}/like",
    tag = "Connections",
    summary = "Like a user",
    description = "Records a like. If the target already liked, superliked or has a pending request toward the caller, both edges become MATCHED and the pair's chat is created.",
    params(("id" = i64, Path, description = "Target user id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Interest recorded", body = PairActionResponse),
        (status = 400, description = "Cannot target yourself", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn like_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(target): Path<UserId>,
) -> Result<impl IntoResponse, GatewayError> {
    record(&state, user, target, InterestKind::Like).await
}

/// `POST /connections/{id}/superlike` — Superlike a user.
///
/// # Errors
///
/// Returns [`GatewayError`] on self-action, unknown user or store failure.
#[utoipa::path(
    post,
    path = "/connections/{id}/superlike",
    tag = "Connections",
    summary = "Superlike a user",
    params(("id" = i64, Path, description = "Target user id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Interest recorded", body = PairActionResponse),
        (status = 400, description = "Cannot target yourself", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn superlike_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(target): Path<UserId>,
) -> Result<impl IntoResponse, GatewayError> {
    record(&state, user, target, InterestKind::Superlike).await
}

/// `POST /connections/{id}/dislike` — Dislike a user.
///
/// # Errors
///
/// Returns [`GatewayError`] on self-action, unknown user or store failure.
#[utoipa::path(
    post,
    path = "/connections/{id}/dislike",
    tag = "Connections",
    summary = "Dislike a user",
    params(("id" = i64, Path, description = "Target user id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Interest recorded", body = PairActionResponse),
        (status = 400, description = "Cannot target yourself", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn dislike_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(target): Path<UserId>,
) -> Result<impl IntoResponse, GatewayError> {
    record(&state, user, target, InterestKind::Dislike).await
}

/// `POST /connections/{id}/accept` — Accept a request from user `id`.
///
/// # Errors
///
/// Returns [`GatewayError::NoPendingRequest`] if `id` has no open request
/// toward the caller.
#[utoipa::path(
    post,
    path = "/connections/{id}/accept",
    tag = "Connections",
    summary = "Accept a pending request",
    params(("id" = i64, Path, description = "Requesting user id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Matched", body = PairActionResponse),
        (status = 404, description = "No pending request", body = ErrorResponse),
    )
)]
pub async fn accept_request(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(requester): Path<UserId>,
) -> Result<impl IntoResponse, GatewayError> {
    let outcome = state
        .match_service
        .accept_pending_request(user, requester)
        .await?;
    Ok(Json(PairActionResponse::from_outcome(&outcome, requester, user)))
}

/// `POST /connections/{id}/reject` — Reject a request from user `id`.
///
/// # Errors
///
/// Returns [`GatewayError::NoPendingRequest`] if `id` has no open request
/// toward the caller.
#[utoipa::path(
    post,
    path = "/connections/{id}/reject",
    tag = "Connections",
    summary = "Reject a pending request",
    params(("id" = i64, Path, description = "Requesting user id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Request rejected", body = PairActionResponse),
        (status = 404, description = "No pending request", body = ErrorResponse),
    )
)]
pub async fn reject_request(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(requester): Path<UserId>,
) -> Result<impl IntoResponse, GatewayError> {
    let outcome = state
        .match_service
        .reject_pending_request(user, requester)
        .await?;
    Ok(Json(PairActionResponse::from_outcome(&outcome, requester, user)))
}

/// `POST /connections/{id}/disconnect` — Unmatch user `id`.
///
/// # Errors
///
/// Returns [`GatewayError::ConnectionNotFound`] if the pair has no edges.
#[utoipa::path(
    post,
    path = "/connections/{id}/disconnect",
    tag = "Connections",
    summary = "Disconnect from a user",
    description = "Moves every edge between the caller and the user to DISLIKED. The chat and its history are kept.",
    params(("id" = i64, Path, description = "Peer user id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Disconnected", body = DisconnectResponse),
        (status = 404, description = "No connection", body = ErrorResponse),
    )
)]
pub async fn disconnect_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(peer): Path<UserId>,
) -> Result<impl IntoResponse, GatewayError> {
    state.match_service.disconnect(user, peer).await?;
    Ok(Json(DisconnectResponse {
        disconnected_user_id: peer,
    }))
}

/// `GET /connections` — Ids of users matched with the caller.
///
/// # Errors
///
/// Returns [`GatewayError`] on store failure.
#[utoipa::path(
    get,
    path = "/connections",
    tag = "Connections",
    summary = "List matched users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Matched user ids", body = MatchedPeersResponse),
    )
)]
pub async fn list_connections(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, GatewayError> {
    let connections = state.match_service.matched_peers(user).await?;
    Ok(Json(MatchedPeersResponse { connections }))
}

/// `GET /connections/requests` — Open requests addressed to the caller.
///
/// # Errors
///
/// Returns [`GatewayError`] on store failure.
#[utoipa::path(
    get,
    path = "/connections/requests",
    tag = "Connections",
    summary = "List incoming requests",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Incoming requests", body = IncomingRequestsResponse),
    )
)]
pub async fn list_requests(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, GatewayError> {
    let requests = state.match_service.incoming_requests(user).await?;
    Ok(Json(IncomingRequestsResponse { requests }))
}

/// Relationship routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/connections", get(list_connections))
        .route("/connections/requests", get(list_requests))
        .route("/connections/{id}/like", post(like_user))
        .route("/connections/{id}/superlike", post(superlike_user))
        .route("/connections/{id}/dislike", post(dislike_user))
        .route("/connections/{id}/accept", post(accept_request))
        .route("/connections/{id}/reject", post(reject_request))
        .route("/connections/{id}/disconnect", post(disconnect_user))
}
