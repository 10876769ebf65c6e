//! Identity endpoints.

use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::Json;
use serde::Deserialize;

use crate::identity::{UserProfile, UserRequest};

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    token: String,
}

/// `POST /auth/register`
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<UserRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.identity.register(&req).await?))
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<UserRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.identity.login(&req).await?))
}

/// `POST /auth/changepassword`
pub async fn change_password(
    State(state): State<AppState>,
    Json(req): Json<UserRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.identity.change_password(&req).await?))
}

/// `GET /auth/check?token=` resolves a bearer token to its user.
pub async fn check(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state.identity.user_by_token(&query.token).await?;
    Ok(Json(UserProfile {
        email: user.email.clone(),
        email_verified: user.is_verified(),
        screen_name: user.screen_name.clone(),
        token: String::new(),
    }))
}

/// `GET /auth/verify?token=` completes email verification.
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Redirect, ApiError> {
    state.identity.verify_email(&query.token).await?;
    Ok(Redirect::to("/"))
}
