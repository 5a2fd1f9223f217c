//! Cookie-based identity.
//!
//! Sign-in itself lives upstream of this service; what matters here is the
//! cookie contract. The `username` cookie names the user identity, and the
//! identity decides which coordinator actor a request lands on.

use axum::Json;
use axum::extract::Request;
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use roadie_core::RoadieError;

use crate::error::{ApiError, unauthorized};

const IDENTITY_COOKIE: &str = "username";
const COOKIE_MAX_AGE_SECS: u32 = 86_400;

/// The authenticated identity for one request.
#[derive(Debug, Clone)]
pub struct UserIdentity(pub String);

/// Rejects requests without an identity cookie before they reach a
/// handler; otherwise stores the identity as a request extension.
pub async fn require_user(mut request: Request, next: Next) -> Response {
    let Some(username) = username_from_headers(request.headers()) else {
        return unauthorized();
    };
    request.extensions_mut().insert(UserIdentity(username));
    next.run(request).await
}

#[derive(Debug, serde::Deserialize)]
pub struct LoginRequest {
    pub username: String,
}

/// Issues the identity cookie the rest of the API requires.
pub async fn login(Json(body): Json<LoginRequest>) -> Response {
    let username = body.username.trim().to_string();
    if username.is_empty() {
        return ApiError(RoadieError::validation("username must not be blank"))
            .into_response();
    }
    let cookie = format!(
        "{IDENTITY_COOKIE}={username}; HttpOnly; Path=/; Max-Age={COOKIE_MAX_AGE_SECS}; SameSite=Strict"
    );
    tracing::info!(username, "user logged in");
    (
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "success": true })),
    )
        .into_response()
}

fn username_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == IDENTITY_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}
