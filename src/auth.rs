// Relay authentication: the chat-platform adapter presents the bot token as a
// bearer token. Caller identity inside the request body is trusted as-is.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use sha2::{Digest, Sha256};

use crate::api::AppState;

/// Hash a raw token with SHA-256.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extractor that rejects requests not carrying the configured bot token.
/// Usage: `_relay: RelayAuth` in handler parameters.
#[derive(Debug, Clone, Copy)]
pub struct RelayAuth;

impl FromRequestParts<AppState> for RelayAuth {
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({"error": "Missing Authorization header"})),
                )
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Invalid Authorization header format"})),
            )
        })?;

        if hash_token(token) != state.token_digest {
            tracing::warn!("rejected relay request with invalid token");
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Invalid token"})),
            ));
        }

        Ok(RelayAuth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let digest = hash_token("secret");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_token("secret"));
        assert_ne!(digest, hash_token("Secret"));
    }
}
