//! Session handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::handlers::with_cleared_cookie;
use crate::state::AppState;
use crate::types::LogoutResult;

/// Clear the ceremony cookie and end the session.
#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "session",
    responses(
        (status = 200, description = "Session cleared", body = LogoutResult),
    )
)]
pub async fn logout(State(state): State<AppState>) -> Response {
    let response = (
        StatusCode::OK,
        Json(LogoutResult {
            success: true,
            message: "Logged out",
        }),
    )
        .into_response();
    with_cleared_cookie(response, state.secure_cookies)
}
