//! Ceremony token cookie transport.
//!
//! The signed challenge token rides between the options call and the verify
//! call in an HTTP-only, strict-same-site cookie. The cookie is the
//! single-use guarantee for the token: verify handlers clear it on every
//! attempt, success or failure, so a token can never be resubmitted.

use axum::http::{header, HeaderMap, HeaderValue};

/// Cookie carrying the ceremony token.
pub const CEREMONY_COOKIE: &str = "ceremony_token";

/// Build the `Set-Cookie` value binding a token for `max_age` seconds.
pub fn bind_cookie(token: &str, max_age: u64, secure: bool) -> HeaderValue {
    let secure_attr = if secure { "; Secure" } else { "" };
    let cookie = format!(
        "{CEREMONY_COOKIE}={token}; Max-Age={max_age}; Path=/; HttpOnly; SameSite=Strict{secure_attr}"
    );
    // JWTs and the fixed attributes are plain ASCII.
    HeaderValue::from_str(&cookie).expect("cookie value is ASCII")
}

/// Build the `Set-Cookie` value clearing the ceremony cookie.
pub fn clear_cookie(secure: bool) -> HeaderValue {
    let secure_attr = if secure { "; Secure" } else { "" };
    let cookie = format!(
        "{CEREMONY_COOKIE}=; Max-Age=0; Path=/; HttpOnly; SameSite=Strict{secure_attr}"
    );
    HeaderValue::from_str(&cookie).expect("cookie value is ASCII")
}

/// Extract the ceremony token from request headers, if present.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == CEREMONY_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}
