//! Game lifecycle: registry, roles, and the client-facing game view.

pub mod registry;
pub mod roles;

use serde::{Deserialize, Serialize};

use crate::storage::models::GameWithPlayers;

pub use registry::{GameError, GameRegistry};
pub use roles::{resolve_role, Role};

/// The game as clients see it: stored fields composed with the derived
/// record, plus the `public` flag. Also doubles as the `create` request
/// body, where the token fields carry the creators' *user* tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Game {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "type", default)]
    pub game_type: String,
    #[serde(default)]
    pub white_player: String,
    #[serde(default)]
    pub black_player: String,
    #[serde(default)]
    pub white_token: String,
    #[serde(default)]
    pub black_token: String,
    #[serde(default)]
    pub viewer_token: String,
    #[serde(default)]
    pub game_over: bool,
    #[serde(default)]
    pub game_result: String,
    #[serde(default)]
    pub creation_time: i64,
    #[serde(default)]
    pub num_actions: i64,
    #[serde(default)]
    pub game_record: String,
    #[serde(default)]
    pub public: bool,
}

impl Game {
    pub(crate) fn from_stored(stored: GameWithPlayers, game_record: String, num_actions: i64) -> Self {
        let row = stored.row;
        Self {
            id: row.id,
            game_type: row.game_type,
            white_player: stored.white_player.unwrap_or_default(),
            black_player: stored.black_player.unwrap_or_default(),
            public: row.viewer_token.is_empty(),
            white_token: row.white_token,
            black_token: row.black_token,
            viewer_token: row.viewer_token,
            game_over: row.game_over != 0,
            game_result: row.game_result,
            creation_time: row.creation_time,
            num_actions,
            game_record,
        }
    }

    /// Redact role tokens down to what the named caller has proven: a seat
    /// token stays only if the caller is that seat's player. The viewer
    /// token is left for the participants of a non-public game.
    pub fn redact_for(&mut self, screen_name: &str) {
        if self.white_player != screen_name {
            self.white_token.clear();
        }
        if self.black_player != screen_name {
            self.black_token.clear();
        }
    }

    /// Remove every token (listings for non-participants).
    pub fn strip_tokens(&mut self) {
        self.white_token.clear();
        self.black_token.clear();
        self.viewer_token.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_with_tokens() -> Game {
        Game {
            white_player: "alice".into(),
            black_player: "bob".into(),
            white_token: "wt".into(),
            black_token: "bt".into(),
            viewer_token: "vt".into(),
            ..Game::default()
        }
    }

    #[test]
    fn redact_keeps_only_own_seat_token() {
        let mut game = game_with_tokens();
        game.redact_for("alice");
        assert_eq!(game.white_token, "wt");
        assert_eq!(game.black_token, "");
        assert_eq!(game.viewer_token, "vt");

        let mut game = game_with_tokens();
        game.redact_for("carol");
        assert_eq!(game.white_token, "");
        assert_eq!(game.black_token, "");
    }

    #[test]
    fn strip_removes_everything() {
        let mut game = game_with_tokens();
        game.strip_tokens();
        assert!(game.white_token.is_empty());
        assert!(game.black_token.is_empty());
        assert!(game.viewer_token.is_empty());
    }
}
