//! Passgate Core - server-side passkey ceremony verification
//!
//! This crate implements the verification core of a passwordless,
//! usernameless authentication service built on public-key
//! challenge/response credentials (WebAuthn/FIDO2):
//!
//! - unpredictable ceremony challenges, carried in signed short-lived
//!   tokens the client cannot forge or alter
//! - attestation (registration) and assertion (authentication) response
//!   verification against the issued challenge, the configured origin and
//!   the enrolled public key
//! - cloned-authenticator detection via strictly monotonic signature
//!   counters, with a server-side fallback counter for authenticators that
//!   report none
//! - conversion between the protocol's COSE key encoding and the structured
//!   form the signature primitives require
//!
//! The HTTP layer, cookie transport and persistent storage engine are
//! external collaborators; the crate talks to storage only through the
//! [`CredentialStore`] gateway trait. Cryptographic primitives are
//! delegated to `aws-lc-rs` — nothing here rolls its own.
//!
//! # Example
//!
//! ```no_run
//! use passgate_core::{
//!     CeremonyContext, CeremonyKind, CeremonyVerifier, ChallengeIssuer, TokenBinder,
//!     DEFAULT_TOKEN_TTL,
//! };
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let issuer = ChallengeIssuer::new();
//! let binder = TokenBinder::new(b"server-held-secret");
//! let verifier = CeremonyVerifier::new("example.com", "https://example.com");
//!
//! // Options step: issue a challenge and bind it into a token the HTTP
//! // layer sets as a short-lived cookie.
//! let challenge = issuer.issue(CeremonyKind::Authentication);
//! let token = binder.bind(&challenge, &CeremonyContext::Authentication, DEFAULT_TOKEN_TTL)?;
//!
//! // Verify step: recover the challenge from the returned token, then run
//! // the ceremony against the client's response.
//! let (challenge, _context) = binder.unbind(&token)?;
//! # let _ = (verifier, challenge);
//! # Ok(())
//! # }
//! ```

pub mod challenge;
pub mod cose;
pub mod counter;
pub mod error;
pub mod fields;
pub mod store;
pub mod token;
pub mod verify;

// Re-export main types for convenience
pub use challenge::{CeremonyKind, Challenge, ChallengeIssuer, CHALLENGE_LEN};
pub use cose::{cose_key_algorithm, decode_cose_key, VerifierKey, COSE_ALG_ES256, COSE_ALG_RS256};
pub use counter::{check_and_advance, CounterAdvance, CounterSource, StoredCounters};
pub use error::{CloneError, CodecError, StoreError, TokenError, VerificationError};
pub use fields::BinaryField;
pub use store::{Credential, CredentialStore, DeviceType, MemoryCredentialStore};
pub use token::{CeremonyContext, TokenBinder, DEFAULT_TOKEN_TTL};
pub use verify::{
    AuthenticationOutput, AuthenticationResponse, CeremonyVerifier, RegistrationOutput,
    RegistrationResponse,
};
