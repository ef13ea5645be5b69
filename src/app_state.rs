//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::config::GatewayConfig;
use crate::domain::PresenceHub;
use crate::persistence::Store;
use crate::service::{ChatResolver, MatchService, MessageDispatcher};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
///
/// Built once by the composition root; the hub and services are shared by
/// every request and live connection.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Durable store.
    pub store: Arc<dyn Store>,
    /// Live-connection registry.
    pub hub: Arc<PresenceHub>,
    /// Pairwise match state machine.
    pub match_service: Arc<MatchService>,
    /// Chat find-or-create.
    pub chat_resolver: Arc<ChatResolver>,
    /// Message send, history and typing relay.
    pub dispatcher: Arc<MessageDispatcher>,
    /// Bearer token verification.
    pub tokens: Arc<TokenVerifier>,
    /// Runtime configuration.
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    /// Wires the services over `store`, delivering live events through
    /// `hub`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, hub: Arc<PresenceHub>, config: GatewayConfig) -> Self {
        let store_timeout = config.store_timeout();
        Self {
            match_service: Arc::new(MatchService::new(Arc::clone(&store), store_timeout)),
            chat_resolver: Arc::new(ChatResolver::new(Arc::clone(&store), store_timeout)),
            dispatcher: Arc::new(MessageDispatcher::new(
                Arc::clone(&store),
                Arc::clone(&hub),
                store_timeout,
            )),
            tokens: Arc::new(TokenVerifier::new(&config.jwt_secret)),
            config: Arc::new(config),
            store,
            hub,
        }
    }
}
