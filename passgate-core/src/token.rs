//! Challenge token binding.
//!
//! The challenge issued at the "options" step must come back untouched at
//! the "verify" step. It travels through the client inside a signed JWT
//! (HS256 over a server-held secret) with a short expiry, so the client can
//! carry it but cannot forge or alter it. The token is the sole anti-replay
//! binding for the challenge: the transport layer clears it after a single
//! verification attempt.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use zeroize::Zeroizing;

use crate::challenge::Challenge;
use crate::error::TokenError;

/// Default token lifetime. Kept short: the token is the only thing stopping
/// a captured challenge from being replayed later.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60);

/// What the challenge was bound to when it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CeremonyContext {
    /// Authentication carries no extra state (usernameless flow).
    Authentication,
    /// Registration carries the pending user id minted at the options step.
    Registration { pending_user_id: String },
}

/// JWT payload carried between the options and verify calls.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    /// Base64url-encoded challenge bytes.
    challenge: String,
    /// Pending user id; present only for registration ceremonies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    iat: u64,
    exp: u64,
}

/// Signs and verifies challenge tokens with a server-held secret.
pub struct TokenBinder {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenBinder {
    /// Create a binder from the raw server secret.
    ///
    /// The secret is wiped from the intermediate buffer on drop; the
    /// derived keys are owned by the underlying JWT library.
    pub fn new(secret: &[u8]) -> Self {
        let secret = Zeroizing::new(secret.to_vec());
        let mut validation = Validation::new(Algorithm::HS256);
        // No clock leeway: an expired token is expired.
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
            validation,
        }
    }

    /// Sign a challenge and its ceremony context into a token valid for `ttl`.
    pub fn bind(
        &self,
        challenge: &Challenge,
        context: &CeremonyContext,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = jsonwebtoken::get_current_timestamp();
        let claims = TokenClaims {
            challenge: challenge.to_base64url(),
            user_id: match context {
                CeremonyContext::Authentication => None,
                CeremonyContext::Registration { pending_user_id } => {
                    Some(pending_user_id.clone())
                }
            },
            iat: now,
            exp: now + ttl.as_secs(),
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "failed to sign challenge token");
            TokenError::Invalid
        })
    }

    /// Verify a token and recover the challenge and ceremony context.
    ///
    /// A token that fails signature verification, is structurally malformed,
    /// or whose expiry has passed is rejected unconditionally.
    pub fn unbind(&self, token: &str) -> Result<(Challenge, CeremonyContext), TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?;

        let challenge_bytes = URL_SAFE_NO_PAD
            .decode(&data.claims.challenge)
            .map_err(|_| TokenError::Invalid)?;

        let context = match data.claims.user_id {
            None => CeremonyContext::Authentication,
            Some(pending_user_id) => CeremonyContext::Registration { pending_user_id },
        };

        Ok((Challenge::from_bytes(challenge_bytes), context))
    }

    /// Like [`unbind`](Self::unbind), mapping an absent token to
    /// [`TokenError::Missing`]. Callers treat all three failures the same
    /// way (ceremony rejected), but the distinction matters for logs.
    pub fn unbind_optional(
        &self,
        token: Option<&str>,
    ) -> Result<(Challenge, CeremonyContext), TokenError> {
        match token {
            Some(t) => self.unbind(t),
            None => Err(TokenError::Missing),
        }
    }
}
