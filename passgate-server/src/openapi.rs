//! OpenAPI documentation configuration
//!
//! Generates OpenAPI 3.0 specification for the Passgate API.

use utoipa::OpenApi;

use crate::handlers::health::HealthResponse;
use crate::types::{
    AuthenticationOptions, AuthenticationResult, AuthenticationVerifyRequest,
    AuthenticatorSelection, CredentialDescriptor, LogoutResult, PubKeyCredParam,
    RegistrationOptions, RegistrationResult, RegistrationVerifyRequest, RelyingParty, UserEntity,
};

/// Passgate API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Passgate",
        version = "0.1.0",
        description = r#"
## Passkey Authentication API

Server-side verification of WebAuthn/FIDO2 passkey ceremonies:

- **Registration** - enroll a platform authenticator credential
- **Authentication** - usernameless login with a resident passkey
- **Clone detection** - strict signature-counter enforcement

### How It Works

1. `POST /api/register/options` issues a challenge bound into a signed
   cookie and the options for `navigator.credentials.create()`
2. `POST /api/register/verify` verifies the attestation response and
   persists the credential
3. `POST /api/authenticate/options` issues an authentication challenge
4. `POST /api/authenticate/verify` verifies the assertion signature and
   advances the signature counter

Each challenge cookie is consumed by its first verification attempt.
"#,
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server"),
    ),
    tags(
        (name = "register", description = "Passkey enrollment (attestation) ceremonies"),
        (name = "authenticate", description = "Passkey login (assertion) ceremonies"),
        (name = "session", description = "Session management"),
        (name = "health", description = "Service health endpoints")
    ),
    paths(
        crate::handlers::register::options,
        crate::handlers::register::verify,
        crate::handlers::authenticate::options,
        crate::handlers::authenticate::verify,
        crate::handlers::session::logout,
        crate::handlers::health::health,
    ),
    components(
        schemas(
            RegistrationOptions,
            RegistrationResult,
            RegistrationVerifyRequest,
            AuthenticationOptions,
            AuthenticationResult,
            AuthenticationVerifyRequest,
            LogoutResult,
            RelyingParty,
            UserEntity,
            PubKeyCredParam,
            CredentialDescriptor,
            AuthenticatorSelection,
            HealthResponse,
        )
    )
)]
pub struct ApiDoc;
