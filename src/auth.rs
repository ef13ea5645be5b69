//! Bearer-token authentication boundary.
//!
//! Tokens are HS256 JWTs minted by the external login service with the
//! claims `{userId, exp, iat}`. The gateway only verifies them: REST
//! handlers take an [`AuthUser`] extractor, the live endpoint verifies the
//! `token` query parameter before upgrading.

use std::fmt;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::GatewayError;

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user.
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
    /// Issue time, seconds since the Unix epoch.
    pub iat: u64,
}

/// Verifies (and, for tooling, issues) HS256 tokens with a shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Creates a verifier for `secret`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Returns the user a valid, unexpired token was issued for.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthorized`] if the signature, algorithm
    /// or expiry check fails, or the token names a non-positive user id.
    pub fn verify(&self, token: &str) -> Result<UserId, GatewayError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| GatewayError::Unauthorized(e.to_string()))?;
        if data.claims.user_id <= 0 {
            return Err(GatewayError::Unauthorized("invalid user id".to_string()));
        }
        Ok(UserId::new(data.claims.user_id))
    }

    /// Mints a token for `user_id` valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if encoding fails.
    pub fn issue(&self, user_id: UserId, ttl: Duration) -> Result<String, GatewayError> {
        let iat = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        let claims = Claims {
            user_id: user_id.get(),
            exp: iat.saturating_add(ttl.as_secs()),
            iat,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| GatewayError::Internal(e.to_string()))
    }
}

/// Authenticated caller, taken from `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| GatewayError::Unauthorized("missing bearer token".to_string()))?;
        state.tokens.verify(token.trim()).map(AuthUser)
    }
}
