//! Account registration and login handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{error_response, ApiState};
use crate::auth::{hash_password, verify_password};
use crate::directory::DirectoryError;

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

/// Create an account (`POST /api/auth/register`)
pub async fn register(State(state): State<ApiState>, Json(body): Json<RegisterBody>) -> Response {
    if body.username.trim().is_empty() || body.email.trim().is_empty() || body.password.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "username, email and password are required",
        );
    }

    let password_hash = match hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            warn!(error = %e, "Password hashing failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "registration failed");
        }
    };

    match state
        .directory
        .create(body.username.trim(), body.email.trim(), password_hash)
        .await
    {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(DirectoryError::DuplicateEmail) => {
            error_response(StatusCode::CONFLICT, "email already registered")
        }
        Err(e) => {
            warn!(error = %e, "Failed to store user");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "registration failed")
        }
    }
}

/// Verify credentials and mint a session token (`POST /api/auth/login`)
///
/// Unknown email and wrong password produce the same response.
pub async fn login(State(state): State<ApiState>, Json(body): Json<LoginBody>) -> Response {
    let Some(record) = state.directory.find_by_email(body.email.trim()).await else {
        return error_response(StatusCode::UNAUTHORIZED, "invalid email or password");
    };

    match verify_password(&body.password, &record.password_hash) {
        Ok(true) => {}
        Ok(false) => return error_response(StatusCode::UNAUTHORIZED, "invalid email or password"),
        Err(e) => {
            warn!(user_id = %record.id, error = %e, "Password verification failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "login failed");
        }
    }

    let token = match state.tokens.issue(record.id, &record.username) {
        Ok(token) => token,
        Err(e) => {
            warn!(user_id = %record.id, error = %e, "Token issuance failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "login failed");
        }
    };

    info!(user_id = %record.id, username = %record.username, "User logged in");
    let user = crate::directory::PublicUser::from(&record);
    (StatusCode::OK, Json(json!({ "token": token, "user": user }))).into_response()
}
