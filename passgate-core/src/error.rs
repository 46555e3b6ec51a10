use thiserror::Error;

/// Failures while unbinding a challenge token.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// No token was supplied with the verification request.
    #[error("challenge token missing")]
    Missing,

    /// The token failed MAC verification or is structurally malformed.
    #[error("challenge token invalid")]
    Invalid,

    /// The token's expiry has passed.
    #[error("challenge token expired")]
    Expired,
}

/// Failures while converting a stored COSE public key into a verifier key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The key advertises an algorithm the verifier does not support.
    #[error("unsupported COSE algorithm {0}")]
    UnsupportedAlgorithm(i64),

    /// The key encoding is structurally broken.
    #[error("malformed COSE key: {0}")]
    Malformed(&'static str),
}

/// Failures during attestation or assertion verification.
///
/// Every variant is a hard gate: the ceremony is aborted and nothing is
/// persisted. The HTTP layer must surface these as an opaque failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// Client data `type` does not match the expected ceremony.
    #[error("client data type mismatch")]
    TypeMismatch,

    /// The challenge embedded in client data does not equal the issued one.
    #[error("challenge mismatch")]
    ChallengeMismatch,

    /// The origin embedded in client data does not equal the configured one.
    #[error("origin mismatch")]
    OriginMismatch,

    /// The RP-ID hash inside authenticator data does not match.
    #[error("relying party id hash mismatch")]
    RpIdMismatch,

    /// Signature verification over the assertion payload failed.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// The authenticator did not report user verification.
    #[error("user verification required")]
    UserNotVerified,

    /// A client-supplied field could not be decoded or parsed.
    #[error("malformed response field: {0}")]
    Malformed(&'static str),

    /// The stored key could not be converted for verification.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Raised when the signature counter did not strictly advance.
///
/// This is the system's sole defense against a cloned authenticator secret
/// and must be surfaced to operational monitoring, not just the client.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneError {
    #[error("possible cloned authenticator: counter did not advance (stored {stored}, reported {reported})")]
    PossibleClone { stored: u32, reported: u32 },
}

/// Failures from the credential store gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No credential exists for the given id.
    #[error("credential not found")]
    NotFound,

    /// A conditional write lost: duplicate id on create, or a counter
    /// advance raced with a concurrent authentication.
    #[error("credential store conflict")]
    Conflict,

    /// The storage backend is unreachable. The only retriable category.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}
