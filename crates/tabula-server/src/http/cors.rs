//! The origin policy shared by the HTTP surface and the session endpoint.

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::AppState;

/// Decides which `Origin` values may talk to the server: empty and
/// `"null"` origins (local file testing), any `http://localhost*`, plus a
/// configured allow-list.
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }

    pub fn allows(&self, origin: &str) -> bool {
        origin.is_empty()
            || origin == "null"
            || origin.starts_with("http://localhost")
            || self.allowed.iter().any(|o| o == origin)
    }
}

/// CORS middleware: reject disallowed origins, reflect allowed ones, and
/// answer preflight requests.
pub async fn apply(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !state.origins.allows(&origin) {
        warn!(%origin, "CORS origin not allowed");
        return (StatusCode::FORBIDDEN, "CORS origin not allowed").into_response();
    }

    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };

    if !origin.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&origin) {
            let headers = response.headers_mut();
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("POST, GET, OPTIONS, PUT, DELETE"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(
                    "Accept, Content-Type, Content-Length, Accept-Encoding, Authorization",
                ),
            );
        }
    }

    response
}
