//! User directory handlers
//!
//! Read-only listing and lookup, guarded by the login session token.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use uuid::Uuid;

use super::{claims_from_headers, error_response, ApiState};

/// List all user records (`GET /api/users`)
pub async fn list_users(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    if let Err(response) = claims_from_headers(&headers, &state) {
        return response;
    }

    Json(state.directory.list().await).into_response()
}

/// Look up one user record (`GET /api/users/:id`)
pub async fn get_user(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    if let Err(response) = claims_from_headers(&headers, &state) {
        return response;
    }

    match state.directory.get(id).await {
        Some(user) => Json(user).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "user not found"),
    }
}
