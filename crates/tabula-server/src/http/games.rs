//! Game lifecycle endpoints.
//!
//! Every handler that returns a Game applies the redaction discipline: a
//! token is revealed only to a caller who has proven the matching role.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::games::Game;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct TokenBody {
    #[serde(default)]
    token: String,
}

#[derive(Debug, Deserialize)]
pub struct GameRef {
    id: i64,
    #[serde(default)]
    token: String,
}

/// `POST /game/create`. The body is a Game whose token fields carry the
/// creators' user tokens.
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<Game>,
) -> Result<Json<Game>, ApiError> {
    let mut game = state.registry.create(&request).await?;

    // Only the seats the request authenticated may see their tokens; an
    // unclaimed seat's placeholder never leaves the server.
    if request.white_player.is_empty() {
        game.white_token.clear();
    }
    if request.black_player.is_empty() {
        game.black_token.clear();
    }

    Ok(Json(game))
}

/// `POST /game/list/byuser`
pub async fn list_by_user(
    State(state): State<AppState>,
    Json(body): Json<TokenBody>,
) -> Result<Json<Vec<Game>>, ApiError> {
    let user = state.identity.user_by_token(&body.token).await?;
    let mut games = state.registry.list_by_user(user.id).await?;
    for game in &mut games {
        game.redact_for(&user.screen_name);
    }
    Ok(Json(games))
}

/// `POST /game/list/joinable`
pub async fn list_joinable(
    State(state): State<AppState>,
    Json(body): Json<TokenBody>,
) -> Result<Json<Vec<Game>>, ApiError> {
    let user = state.identity.user_by_token(&body.token).await?;
    let mut games = state.registry.list_joinable(user.id).await?;
    for game in &mut games {
        game.strip_tokens();
    }
    Ok(Json(games))
}

/// `POST /game/join`
pub async fn join(
    State(state): State<AppState>,
    Json(body): Json<GameRef>,
) -> Result<Json<Game>, ApiError> {
    Ok(Json(state.registry.join(body.id, &body.token).await?))
}

/// `POST /game/cancel`
pub async fn cancel(
    State(state): State<AppState>,
    Json(body): Json<GameRef>,
) -> Result<Json<Value>, ApiError> {
    state.registry.cancel(body.id, &body.token).await?;
    Ok(Json(json!({
        "status": "game deleted successfully",
        "id": body.id,
    })))
}
