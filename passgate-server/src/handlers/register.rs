//! Passkey enrollment handlers.
//!
//! `options` mints a challenge and a pending user id, binds both into a
//! short-lived signed token carried in the ceremony cookie, and returns the
//! document the client feeds to `navigator.credentials.create()`. `verify`
//! consumes that cookie exactly once, verifies the attestation response and
//! persists the new credential.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use uuid::Uuid;

use passgate_core::{
    decode_cose_key, CeremonyContext, CeremonyKind, Credential, DeviceType, RegistrationResponse,
    StoredCounters, TokenError, VerificationError,
};

use crate::cookie;
use crate::error::ApiError;
use crate::handlers::with_cleared_cookie;
use crate::state::AppState;
use crate::types::{
    RegistrationOptions, RegistrationResult, RegistrationVerifyRequest, UserEntity,
};

/// Issue registration ceremony options.
#[utoipa::path(
    post,
    path = "/api/register/options",
    tag = "register",
    responses(
        (status = 200, description = "Registration options issued; ceremony cookie set", body = RegistrationOptions),
    )
)]
pub async fn options(State(state): State<AppState>) -> Result<Response, ApiError> {
    let pending_user_id = Uuid::new_v4().to_string();
    let challenge = state.issuer.issue(CeremonyKind::Registration);

    let token = state.binder.bind(
        &challenge,
        &CeremonyContext::Registration {
            pending_user_id: pending_user_id.clone(),
        },
        state.token_ttl,
    )?;

    let user = UserEntity {
        id: URL_SAFE_NO_PAD.encode(pending_user_id.as_bytes()),
        name: format!("user-{}", &pending_user_id[..8]),
        display_name: format!("user-{}", &pending_user_id[..8]),
    };
    let options = RegistrationOptions::new(
        &state.rp_id,
        &state.rp_name,
        user,
        challenge.to_base64url(),
    );

    tracing::debug!(pending_user_id = %pending_user_id, "registration options issued");

    let mut response = (StatusCode::OK, Json(options)).into_response();
    response.headers_mut().append(
        header::SET_COOKIE,
        cookie::bind_cookie(&token, state.token_ttl.as_secs(), state.secure_cookies),
    );
    Ok(response)
}

/// Verify a registration response and enroll the credential.
#[utoipa::path(
    post,
    path = "/api/register/verify",
    tag = "register",
    request_body = RegistrationVerifyRequest,
    responses(
        (status = 200, description = "Credential enrolled", body = RegistrationResult),
        (status = 400, description = "Attestation verification failed"),
        (status = 401, description = "Ceremony token missing, invalid or expired"),
        (status = 409, description = "Credential id already registered"),
    )
)]
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegistrationResponse>,
) -> Response {
    let token = cookie::extract_token(&headers);
    let secure = state.secure_cookies;
    let response = match verify_inner(&state, token, payload).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => e.into_response(),
    };
    // One attempt per token, pass or fail.
    with_cleared_cookie(response, secure)
}

async fn verify_inner(
    state: &AppState,
    token: Option<String>,
    payload: RegistrationResponse,
) -> Result<RegistrationResult, ApiError> {
    let (challenge, context) = state.binder.unbind_optional(token.as_deref())?;
    let pending_user_id = match context {
        CeremonyContext::Registration { pending_user_id } => pending_user_id,
        // A token minted for the other ceremony does not authorize this one.
        CeremonyContext::Authentication => return Err(TokenError::Invalid.into()),
    };

    let output = state.verifier.verify_registration(&payload, &challenge)?;

    // The options demand user verification; an enrollment without it
    // would produce a credential weaker than advertised.
    if !output.user_verified {
        return Err(VerificationError::UserNotVerified.into());
    }

    // Reject keys this deployment could never verify assertions with,
    // before they reach the store.
    let key = decode_cose_key(&output.public_key).map_err(VerificationError::from)?;

    let now = Utc::now();
    let credential = Credential {
        credential_id: output.credential_id.clone(),
        owner_user_id: pending_user_id.clone(),
        public_key: output.public_key,
        counters: StoredCounters {
            sign_counter: output.initial_counter,
            fallback_counter: 0,
        },
        device_type: DeviceType::Platform,
        created_at: now,
        last_used_at: now,
    };
    state.store.create(credential).await?;

    let credential_id = URL_SAFE_NO_PAD.encode(&output.credential_id);
    tracing::info!(
        user_id = %pending_user_id,
        credential_id = %credential_id,
        format = %output.attestation_format,
        algorithm = key.algorithm(),
        user_verified = output.user_verified,
        "credential enrolled"
    );

    Ok(RegistrationResult {
        success: true,
        credential_id,
    })
}
