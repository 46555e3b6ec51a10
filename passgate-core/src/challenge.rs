//! Ceremony challenge generation.
//!
//! A challenge is an opaque random byte string drawn from a CSPRNG, issued
//! per ceremony and consumed exactly once at verification. It is never
//! persisted server-side outside the signed token that carries it.

use aws_lc_rs::rand::{SecureRandom, SystemRandom};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

/// Challenge length in bytes (256 bits; the protocol minimum is 16 bytes).
pub const CHALLENGE_LEN: usize = 32;

/// Which ceremony a challenge was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyKind {
    Registration,
    Authentication,
}

/// An opaque, single-use random challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge(Vec<u8>);

impl Challenge {
    /// Wrap raw challenge bytes (e.g. recovered from a token).
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Base64url (no padding) form, as embedded in client data and tokens.
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }
}

/// Produces ceremony challenges from an injected CSPRNG handle.
///
/// No uniqueness bookkeeping is kept: at 256 bits of entropy the collision
/// probability across ceremonies is cryptographically negligible.
pub struct ChallengeIssuer {
    rng: SystemRandom,
}

impl ChallengeIssuer {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    /// Issue a fresh challenge for the given ceremony.
    ///
    /// The kind does not influence generation; it is threaded through so
    /// callers bind it into the ceremony context alongside the challenge.
    pub fn issue(&self, kind: CeremonyKind) -> Challenge {
        let mut bytes = vec![0u8; CHALLENGE_LEN];
        self.rng
            .fill(&mut bytes)
            .expect("system CSPRNG failed to produce entropy");
        tracing::debug!(kind = ?kind, "issued ceremony challenge");
        Challenge(bytes)
    }
}

impl Default for ChallengeIssuer {
    fn default() -> Self {
        Self::new()
    }
}
