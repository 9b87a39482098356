//! HTTP API module
//!
//! The request/response plumbing around the relay: account registration and
//! login, the read-only user directory, and media join-token issuance.
//! None of it touches the live presence registry.

mod auth;
mod media;
mod users;

use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tokio::sync::broadcast;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::auth::{SessionClaims, TokenService};
use crate::directory::UserDirectory;
use crate::media::MediaTokenIssuer;

/// Shared state for all API handlers
#[derive(Clone)]
pub struct ApiState {
    pub directory: Arc<UserDirectory>,
    pub tokens: Arc<TokenService>,
    pub media: Arc<MediaTokenIssuer>,
}

/// Build the API router with its CORS layer
pub fn api_router(state: ApiState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/users", get(users::list_users))
        .route("/api/users/:id", get(users::get_user))
        .route("/api/media/token", get(media::issue_token))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// Serve the API until a shutdown signal arrives
pub async fn run_api_server(
    addr: String,
    state: ApiState,
    allowed_origins: &[String],
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = api_router(state, allowed_origins);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutdown signal received, stopping HTTP API");
        })
        .await?;

    Ok(())
}

/// Liveness probe (`GET /`)
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "call-relay" }))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Extract and verify the bearer token, or produce the 401 response
pub(crate) fn claims_from_headers(
    headers: &HeaderMap,
    state: &ApiState,
) -> Result<SessionClaims, Response> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized("missing authorization header"))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("expected a bearer token"))?;

    state
        .tokens
        .verify(token)
        .map_err(|e| unauthorized(&e.to_string()))
}

pub(crate) fn unauthorized(message: &str) -> Response {
    error_response(StatusCode::UNAUTHORIZED, message)
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// State with throwaway secrets for handler tests
    pub fn test_state() -> ApiState {
        ApiState {
            directory: Arc::new(UserDirectory::new()),
            tokens: Arc::new(TokenService::new("test-secret", 7)),
            media: Arc::new(MediaTokenIssuer::new("test-app", "test-certificate", 3600)),
        }
    }

    /// Headers carrying a bearer token
    pub fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {}", token).parse().unwrap(),
        );
        headers
    }

    /// Decode a JSON response body
    pub async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_missing_authorization_header_is_rejected() {
        let state = test_state();
        let result = claims_from_headers(&HeaderMap::new(), &state);
        let response = result.err().expect("rejected");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_non_bearer_authorization_is_rejected() {
        let state = test_state();
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(claims_from_headers(&headers, &state).is_err());
    }

    #[test]
    fn test_valid_bearer_token_is_accepted() {
        let state = test_state();
        let user_id = Uuid::new_v4();
        let token = state.tokens.issue(user_id, "alice").unwrap();

        let claims = claims_from_headers(&bearer_headers(&token), &state).expect("accepted");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "alice");
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
    }

    #[test]
    fn test_router_builds_with_origins() {
        let state = test_state();
        let origins = vec![
            "http://localhost:3000".to_string(),
            "not a header value\u{0}".to_string(),
        ];
        // Unparseable origins are skipped, not fatal
        let _router = api_router(state, &origins);
    }
}
