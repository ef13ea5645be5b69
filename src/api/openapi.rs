//! OpenAPI document and its routes.
//!
//! With the `swagger-ui` feature the document is served together with the
//! interactive UI at `/swagger-ui`; otherwise only `/openapi.json` is
//! mounted.

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::handlers::{chats, connections, presence, system};
use crate::app_state::AppState;

/// Aggregated OpenAPI description of the gateway.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "mutual-gateway",
        description = "Matching state machine, chats and live presence."
    ),
    paths(
        connections::like_user,
        connections::superlike_user,
        connections::dislike_user,
        connections::accept_request,
        connections::reject_request,
        connections::disconnect_user,
        connections::list_connections,
        connections::list_requests,
        chats::ensure_chat,
        chats::list_chats,
        chats::get_messages,
        chats::send_message,
        presence::query_presence,
        system::health_handler,
        crate::ws::handler::ws_handler,
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Connections", description = "Likes, matches and requests"),
        (name = "Chats", description = "Chats and message history"),
        (name = "Presence", description = "Who is online"),
        (name = "Live", description = "WebSocket endpoint"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;

#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Routes serving the OpenAPI document.
#[cfg(feature = "swagger-ui")]
pub fn routes() -> Router<AppState> {
    Router::new().merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()),
    )
}

/// Routes serving the OpenAPI document.
#[cfg(not(feature = "swagger-ui"))]
pub fn routes() -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;

    Router::new().route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/connections/{id}/like",
            "/connections/requests",
            "/chats/{id}/messages",
            "/chats/with/{userId}",
            "/presence",
            "/health",
            "/ws",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
