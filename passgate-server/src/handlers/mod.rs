//! Request handlers module
//!
//! Contains all HTTP request handlers organized by ceremony:
//! - `register`: passkey enrollment (attestation) endpoints
//! - `authenticate`: passkey login (assertion) endpoints
//! - `session`: logout
//! - `health`: liveness endpoint

pub mod authenticate;
pub mod health;
pub mod register;
pub mod session;

use axum::http::header;
use axum::response::Response;

use crate::cookie;

/// Append a cookie-clearing header to any response.
///
/// Verify handlers call this on every exit path, success or failure, so a
/// ceremony token is consumed by its first verification attempt.
pub(crate) fn with_cleared_cookie(mut response: Response, secure: bool) -> Response {
    response
        .headers_mut()
        .append(header::SET_COOKIE, cookie::clear_cookie(secure));
    response
}
