//! Session authorization: mapping `(game_id, token)` to a role.

use std::fmt;

use crate::storage::GameDatabase;

/// The role a credential grants within one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    White,
    Black,
    Viewer,
    Invalid,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::White => "white",
            Role::Black => "black",
            Role::Viewer => "viewer",
            Role::Invalid => "invalid",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve a token against a game, returning the role and the canonical
/// role token for that seat (which may differ from the presented token
/// when a *user* token identified the player).
///
/// Resolution order:
/// 1. the game's stored white/black role tokens;
/// 2. a user token whose user holds the white/black seat;
/// 3. the viewer token, when the game has one.
///
/// Anything else is `Invalid`, including any token presented against a
/// public game, which stores no viewer token. The lookup is read-only
/// and simply reflects the registry's state at the moment of the query;
/// a seat claimed by a concurrent join is honoured on the next message.
pub async fn resolve_role(db: &GameDatabase, game_id: i64, token: &str) -> (Role, String) {
    let Ok(game) = db.get_game_row(game_id).await else {
        return (Role::Invalid, String::new());
    };

    if !token.is_empty() && token == game.white_token {
        return (Role::White, game.white_token);
    }
    if !token.is_empty() && token == game.black_token {
        return (Role::Black, game.black_token);
    }

    if let Ok(user) = db.get_user_by_token(token).await {
        if user.id == game.white_user_id {
            return (Role::White, game.white_token);
        }
        if user.id == game.black_user_id {
            return (Role::Black, game.black_token);
        }
    }

    if !game.viewer_token.is_empty() && token == game.viewer_token {
        return (Role::Viewer, game.viewer_token);
    }

    (Role::Invalid, String::new())
}
