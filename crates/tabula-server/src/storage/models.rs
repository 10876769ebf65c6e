//! Data models for tabula storage.

use serde::{Deserialize, Serialize};

/// Sentinel user id for a seat that has not been claimed yet.
pub const UNASSIGNED: i64 = -1;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub email_verified: i64,
    pub password_hash: String,
    pub screen_name: String,
    pub creation_time: i64,
}

impl User {
    pub fn is_verified(&self) -> bool {
        self.email_verified != 0
    }
}

/// A stored game row. Screen names live in `users`; see
/// [`GameWithPlayers`] for the joined shape.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GameRow {
    pub id: i64,
    #[sqlx(rename = "type")]
    pub game_type: String,
    pub white_user_id: i64,
    pub black_user_id: i64,
    pub white_token: String,
    pub black_token: String,
    pub viewer_token: String,
    pub game_over: i64,
    pub game_result: String,
    pub creation_time: i64,
}

impl GameRow {
    /// True if every seat has been claimed.
    pub fn is_full(&self) -> bool {
        self.white_user_id != UNASSIGNED && self.black_user_id != UNASSIGNED
    }

    pub fn is_over(&self) -> bool {
        self.game_over != 0
    }

    /// A game is public iff it has no viewer token.
    pub fn is_public(&self) -> bool {
        self.viewer_token.is_empty()
    }
}

/// A game row joined with the screen names of its seated players.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GameWithPlayers {
    #[sqlx(flatten)]
    pub row: GameRow,
    pub white_player: Option<String>,
    pub black_player: Option<String>,
}

/// One move of a game, as stored in the append-only action log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActionRecord {
    pub action_num: i64,
    pub action: String,
    #[serde(default)]
    pub signature: String,
}
