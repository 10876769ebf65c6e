//! The game registry: create/join/cancel/finish transitions, game lookup,
//! and the listings behind the request surface.

use tracing::info;

use crate::identity::generate_token;
use crate::storage::db::DatabaseError;
use crate::storage::{ActionRecord, GameDatabase, UNASSIGNED};

use super::Game;

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("invalid game id")]
    NotFound,

    #[error("incorrect token")]
    InvalidUserToken,

    #[error("incorrect token for {0} player")]
    TokenMismatch(&'static str),

    #[error("at least one player must be named")]
    NoPlayers,

    #[error("white and black players cannot be the same")]
    SamePlayer,

    #[error("player '{0}' not found")]
    PlayerNotFound(String),

    #[error("game is full")]
    GameFull,

    #[error("user is already seated in this game")]
    AlreadySeated,

    #[error("invalid token")]
    InvalidRoleToken,

    #[error("cannot cancel a game that has already started")]
    GameStarted,

    #[error("game is over")]
    GameOver,

    #[error("invalid action number: got {got}, expected {expected}")]
    InvalidActionNumber { got: i64, expected: i64 },

    #[error("server error: {0}")]
    Database(#[from] DatabaseError),
}

/// Mediates every game state transition against the durable store.
#[derive(Clone)]
pub struct GameRegistry {
    db: GameDatabase,
}

impl GameRegistry {
    pub fn new(db: GameDatabase) -> Self {
        Self { db }
    }

    /// Create a game from a request whose token fields carry the callers'
    /// user tokens for the named seats.
    ///
    /// Fresh role tokens are generated for both seats (a placeholder for
    /// an unclaimed seat, replaced on join) and for the viewer unless the
    /// game is public. The returned game still carries every token; the
    /// request surface redacts before anything leaves the process.
    pub async fn create(&self, request: &Game) -> Result<Game, GameError> {
        if request.white_player.is_empty() && request.black_player.is_empty() {
            return Err(GameError::NoPlayers);
        }
        if request.white_player == request.black_player {
            return Err(GameError::SamePlayer);
        }

        let mut white_user_id = UNASSIGNED;
        let mut black_user_id = UNASSIGNED;
        if !request.white_player.is_empty() {
            white_user_id = self.seat_user_id(&request.white_player).await?;
            self.check_seat_token(&request.white_player, &request.white_token, "white")
                .await?;
        }
        if !request.black_player.is_empty() {
            black_user_id = self.seat_user_id(&request.black_player).await?;
            self.check_seat_token(&request.black_player, &request.black_token, "black")
                .await?;
        }

        let white_token = generate_token();
        let black_token = generate_token();
        let viewer_token = if request.public {
            String::new()
        } else {
            generate_token()
        };

        let id = self
            .db
            .insert_game(
                &request.game_type,
                white_user_id,
                black_user_id,
                &white_token,
                &black_token,
                &viewer_token,
            )
            .await?;

        info!(
            game_id = id,
            game_type = %request.game_type,
            public = request.public,
            "Game created"
        );

        self.get(id).await
    }

    /// A user claims the remaining open seat.
    pub async fn join(&self, game_id: i64, user_token: &str) -> Result<Game, GameError> {
        let game = self.db.get_game_row(game_id).await.map_err(map_not_found)?;
        if game.is_full() {
            return Err(GameError::GameFull);
        }

        let user = self
            .db
            .get_user_by_token(user_token)
            .await
            .map_err(|_| GameError::InvalidUserToken)?;
        if user.id == game.white_user_id || user.id == game.black_user_id {
            return Err(GameError::AlreadySeated);
        }

        let token = generate_token();
        if game.white_user_id == UNASSIGNED {
            self.db.assign_white_seat(game_id, user.id, &token).await?;
        } else {
            self.db.assign_black_seat(game_id, user.id, &token).await?;
        }

        info!(game_id, user_id = user.id, "Seat claimed");

        let mut joined = self.get(game_id).await?;
        joined.redact_for(&user.screen_name);
        Ok(joined)
    }

    /// Delete a game that is still awaiting a second player. Allowed for
    /// any caller whose token resolves to a role of the game.
    pub async fn cancel(&self, game_id: i64, token: &str) -> Result<(), GameError> {
        let game = self.db.get_game_row(game_id).await.map_err(map_not_found)?;

        let (role, _) = super::resolve_role(&self.db, game_id, token).await;
        if role == super::Role::Invalid {
            return Err(GameError::InvalidRoleToken);
        }
        if game.is_full() {
            return Err(GameError::GameStarted);
        }

        self.db.delete_game(game_id).await?;
        info!(game_id, "Game canceled");
        Ok(())
    }

    /// Record a terminal result. Returns `true` on the transition, `false`
    /// when the game was already finished (the stored result stands).
    pub async fn finish(&self, game_id: i64, result: &str) -> Result<bool, GameError> {
        let finished = self.db.mark_game_finished(game_id, result).await?;
        if finished {
            info!(game_id, result, "Game finished");
        }
        Ok(finished)
    }

    /// Compose the stored game with its derived record.
    pub async fn get(&self, game_id: i64) -> Result<Game, GameError> {
        let stored = self
            .db
            .get_game_with_players(game_id)
            .await
            .map_err(map_not_found)?;
        let (game_record, num_actions) = self.db.game_record(game_id).await?;
        Ok(Game::from_stored(stored, game_record, num_actions))
    }

    /// Games where the user holds a seat; games still awaiting an opponent
    /// sort last. Tokens are NOT redacted here.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<Game>, GameError> {
        let mut games = Vec::new();
        for stored in self.db.list_games_by_user(user_id).await? {
            let (game_record, num_actions) = self.db.game_record(stored.row.id).await?;
            games.push(Game::from_stored(stored, game_record, num_actions));
        }
        Ok(games)
    }

    /// Public games with one open seat the user may claim. Tokens are NOT
    /// redacted here.
    pub async fn list_joinable(&self, user_id: i64) -> Result<Vec<Game>, GameError> {
        let mut games = Vec::new();
        for stored in self.db.list_joinable_games(user_id).await? {
            let (game_record, num_actions) = self.db.game_record(stored.row.id).await?;
            games.push(Game::from_stored(stored, game_record, num_actions));
        }
        Ok(games)
    }

    /// Validate and append one action: the game must be in progress and
    /// the number must name the next free slot. A concurrent duplicate
    /// loses the insert race and is reported like any other wrong number.
    pub async fn record_action(&self, game_id: i64, action: &ActionRecord) -> Result<(), GameError> {
        let game = self.db.get_game_row(game_id).await.map_err(map_not_found)?;
        if game.is_over() {
            return Err(GameError::GameOver);
        }

        let expected = self.db.count_actions(game_id).await? + 1;
        if action.action_num != expected {
            return Err(GameError::InvalidActionNumber {
                got: action.action_num,
                expected,
            });
        }

        match self
            .db
            .append_action(game_id, action.action_num, &action.action, &action.signature)
            .await
        {
            Ok(()) => Ok(()),
            Err(DatabaseError::Conflict(_)) => {
                let expected = self.db.count_actions(game_id).await? + 1;
                Err(GameError::InvalidActionNumber {
                    got: action.action_num,
                    expected,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Ordered action list for session snapshots.
    pub async fn actions(&self, game_id: i64) -> Result<Vec<ActionRecord>, GameError> {
        Ok(self.db.list_actions(game_id).await?)
    }

    pub fn db(&self) -> &GameDatabase {
        &self.db
    }

    async fn seat_user_id(&self, screen_name: &str) -> Result<i64, GameError> {
        self.db
            .get_user_by_screen_name(screen_name)
            .await
            .map(|u| u.id)
            .map_err(|_| GameError::PlayerNotFound(screen_name.to_string()))
    }

    /// The supplied token must authenticate the caller as the named player
    /// for its declared side.
    async fn check_seat_token(
        &self,
        screen_name: &str,
        token: &str,
        side: &'static str,
    ) -> Result<(), GameError> {
        let user = self
            .db
            .get_user_by_token(token)
            .await
            .map_err(|_| GameError::TokenMismatch(side))?;
        if user.screen_name != screen_name {
            return Err(GameError::TokenMismatch(side));
        }
        Ok(())
    }
}

fn map_not_found(err: DatabaseError) -> GameError {
    match err {
        DatabaseError::NotFound(_) => GameError::NotFound,
        other => GameError::Database(other),
    }
}
