//! Application state module
//!
//! Defines shared state accessible across all request handlers. Every core
//! collaborator is an explicit injected dependency — there are no ambient
//! globals, which keeps the handlers testable against an in-memory store.

use std::sync::Arc;
use std::time::Duration;

use passgate_core::{CeremonyVerifier, ChallengeIssuer, CredentialStore, TokenBinder};

use crate::config::Config;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<ChallengeIssuer>,
    pub binder: Arc<TokenBinder>,
    pub verifier: Arc<CeremonyVerifier>,
    pub store: Arc<dyn CredentialStore>,
    /// Relying Party identity surfaced in ceremony options.
    pub rp_id: String,
    pub rp_name: String,
    /// Lifetime of issued challenge tokens (also the cookie Max-Age).
    pub token_ttl: Duration,
    pub secure_cookies: bool,
}

impl AppState {
    /// Assemble state from configuration and an already-constructed store.
    pub fn new(config: &Config, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            issuer: Arc::new(ChallengeIssuer::new()),
            binder: Arc::new(TokenBinder::new(config.token_secret.as_bytes())),
            verifier: Arc::new(CeremonyVerifier::new(&config.rp_id, &config.rp_origin)),
            store,
            rp_id: config.rp_id.clone(),
            rp_name: config.rp_name.clone(),
            token_ttl: Duration::from_secs(config.token_ttl_secs),
            secure_cookies: config.secure_cookies,
        }
    }
}
