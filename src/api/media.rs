//! Media join-token handler

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use tracing::warn;

use super::{error_response, ApiState};
use crate::media::MediaError;

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub channel: String,
}

/// Mint a join credential (`GET /api/media/token?channel=NAME`)
///
/// Each client calls this independently once signaling completes; the relay
/// itself never joins the channel.
pub async fn issue_token(State(state): State<ApiState>, Query(query): Query<TokenQuery>) -> Response {
    match state.media.issue(&query.channel) {
        Ok(credential) => Json(credential).into_response(),
        Err(MediaError::EmptyChannel) => {
            error_response(StatusCode::BAD_REQUEST, "channel name is required")
        }
        Err(e) => {
            warn!(error = %e, "Credential issuance failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to generate token")
        }
    }
}
