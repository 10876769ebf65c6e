//! The HTTP request surface: thin adapters over the identity service and
//! the game registry, plus the WebSocket session endpoint.

mod auth;
mod cors;
mod games;
mod ws;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::json;

use crate::games::{GameError, GameRegistry};
use crate::hub::SessionHub;
use crate::identity::{IdentityError, IdentityService};

pub use cors::OriginPolicy;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub identity: IdentityService,
    pub registry: GameRegistry,
    pub hub: Arc<SessionHub>,
    pub origins: Arc<OriginPolicy>,
}

/// Build the full router: `/auth/*`, `/game/*` and the session endpoint.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/changepassword", post(auth::change_password))
        .route("/auth/check", get(auth::check))
        .route("/auth/verify", get(auth::verify))
        .route("/game/create", post(games::create))
        .route("/game/list/byuser", post(games::list_by_user))
        .route("/game/list/joinable", post(games::list_joinable))
        .route("/game/join", post(games::join))
        .route("/game/cancel", post(games::cancel))
        .route("/game/ws", get(ws::upgrade))
        .layer(middleware::from_fn_with_state(state.clone(), cors::apply))
        .with_state(state)
}

/// An error reported to the caller as `{"error": "<msg>"}`.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        let status = match err {
            GameError::NotFound => StatusCode::NOT_FOUND,
            GameError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::new(status, err.to_string())
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        let status = match err {
            IdentityError::Hash | IdentityError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::new(status, err.to_string())
    }
}
