//! Service layer: business logic orchestration.
//!
//! [`MatchService`] drives the pairwise state machine, [`ChatResolver`]
//! finds or creates the chat of a user pair, and [`MessageDispatcher`]
//! persists messages before pushing them to live peers through the
//! [`crate::domain::PresenceHub`]. Every store call goes through
//! [`bounded`], so a stalled database surfaces as
//! [`GatewayError::StoreTimeout`] instead of a hung request.

pub mod chat_resolver;
pub mod match_service;
pub mod message_dispatcher;

use std::future::Future;
use std::time::Duration;

pub use chat_resolver::ChatResolver;
pub use match_service::MatchService;
pub use message_dispatcher::MessageDispatcher;

use crate::error::GatewayError;

/// Runs one store call under `limit`.
///
/// Dropping the future on timeout rolls back any open transaction, so a
/// timed-out call is treated as not applied.
pub(crate) async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    if let Ok(result) = tokio::time::timeout(limit, fut).await {
        result
    } else {
        tracing::warn!(?limit, "store call timed out");
        Err(GatewayError::StoreTimeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slow_call_times_out() {
        let result: Result<(), GatewayError> = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(GatewayError::StoreTimeout)));
    }

    #[tokio::test]
    async fn fast_call_passes_through() {
        let result = bounded(Duration::from_secs(1), async { Ok::<_, GatewayError>(7) }).await;
        tokio_test::assert_ok!(&result);
        assert!(matches!(result, Ok(7)));
    }
}
