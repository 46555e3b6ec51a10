//! Passkey login handlers.
//!
//! Usernameless flow: `options` issues a bare challenge with an empty
//! `allowCredentials`, the authenticator selects the resident credential,
//! and `verify` looks the credential up by the id in the assertion. The
//! counter gate runs after signature verification and its advance is a
//! conditional store write, so two racing assertions cannot both pass.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use passgate_core::{
    check_and_advance, decode_cose_key, AuthenticationResponse, CeremonyContext, CeremonyKind,
    CounterSource, TokenError, VerificationError,
};

use crate::cookie;
use crate::error::ApiError;
use crate::handlers::with_cleared_cookie;
use crate::state::AppState;
use crate::types::{AuthenticationOptions, AuthenticationResult, AuthenticationVerifyRequest};

/// Issue authentication ceremony options.
#[utoipa::path(
    post,
    path = "/api/authenticate/options",
    tag = "authenticate",
    responses(
        (status = 200, description = "Authentication options issued; ceremony cookie set", body = AuthenticationOptions),
    )
)]
pub async fn options(State(state): State<AppState>) -> Result<Response, ApiError> {
    let challenge = state.issuer.issue(CeremonyKind::Authentication);
    let token = state
        .binder
        .bind(&challenge, &CeremonyContext::Authentication, state.token_ttl)?;

    let options = AuthenticationOptions::new(&state.rp_id, challenge.to_base64url());

    let mut response = (StatusCode::OK, Json(options)).into_response();
    response.headers_mut().append(
        header::SET_COOKIE,
        cookie::bind_cookie(&token, state.token_ttl.as_secs(), state.secure_cookies),
    );
    Ok(response)
}

/// Verify an assertion response.
#[utoipa::path(
    post,
    path = "/api/authenticate/verify",
    tag = "authenticate",
    request_body = AuthenticationVerifyRequest,
    responses(
        (status = 200, description = "Authentication succeeded", body = AuthenticationResult),
        (status = 400, description = "Assertion verification failed"),
        (status = 401, description = "Ceremony token missing, invalid or expired"),
        (status = 403, description = "Signature counter did not advance; possible cloned credential"),
        (status = 404, description = "Credential not registered"),
    )
)]
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AuthenticationResponse>,
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
    payload: AuthenticationResponse,
) -> Result<AuthenticationResult, ApiError> {
    let (challenge, context) = state.binder.unbind_optional(token.as_deref())?;
    if context != CeremonyContext::Authentication {
        return Err(TokenError::Invalid.into());
    }

    let credential_id = payload
        .raw_id
        .decode()
        .map_err(ApiError::Verification)?;
    let credential = state
        .store
        .find_by_credential_id(&credential_id)
        .await?
        .ok_or(passgate_core::StoreError::NotFound)?;

    let key = decode_cose_key(&credential.public_key).map_err(VerificationError::from)?;
    let output = state
        .verifier
        .verify_authentication(&payload, &challenge, &key)?;

    // User verification is required by the issued options. Enforced
    // before the counter work so a rejected assertion leaves no trace in
    // the store.
    if !output.user_verified {
        return Err(VerificationError::UserNotVerified.into());
    }

    let source = CounterSource::classify(output.counter, &credential.counters);
    let advance = check_and_advance(&credential.counters, source)?;
    state
        .store
        .advance_counter(&credential_id, advance, Utc::now())
        .await?;

    tracing::info!(
        user_id = %credential.owner_user_id,
        counter = advance.value(),
        user_verified = output.user_verified,
        "authentication succeeded"
    );

    Ok(AuthenticationResult {
        success: true,
        message: "Authentication successful",
    })
}
