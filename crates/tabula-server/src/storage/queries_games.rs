//! Game-table queries: creation, seat assignment, status transitions and
//! the listings the request surface is built on.

use tabula_core::db::unix_timestamp_ms;

use super::db::{DatabaseError, GameDatabase};
use super::models::{GameRow, GameWithPlayers};

const GAME_WITH_PLAYERS: &str = "
    SELECT g.*, u1.screen_name AS white_player, u2.screen_name AS black_player
    FROM games g
    LEFT JOIN users u1 ON g.white_user_id = u1.id
    LEFT JOIN users u2 ON g.black_user_id = u2.id
";

impl GameDatabase {
    /// Insert a new game row and return its id.
    pub async fn insert_game(
        &self,
        game_type: &str,
        white_user_id: i64,
        black_user_id: i64,
        white_token: &str,
        black_token: &str,
        viewer_token: &str,
    ) -> Result<i64, DatabaseError> {
        let now = unix_timestamp_ms();

        let result = sqlx::query(
            "INSERT INTO games (type, white_user_id, black_user_id, white_token, black_token, viewer_token, creation_time)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(game_type)
        .bind(white_user_id)
        .bind(black_user_id)
        .bind(white_token)
        .bind(black_token)
        .bind(viewer_token)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a bare game row by id.
    pub async fn get_game_row(&self, id: i64) -> Result<GameRow, DatabaseError> {
        sqlx::query_as::<_, GameRow>("SELECT * FROM games WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Game {id}")))
    }

    /// Get a game row joined with its players' screen names.
    pub async fn get_game_with_players(&self, id: i64) -> Result<GameWithPlayers, DatabaseError> {
        let query = format!("{GAME_WITH_PLAYERS} WHERE g.id = ?");
        sqlx::query_as::<_, GameWithPlayers>(&query)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Game {id}")))
    }

    /// Seat a user as white, replacing the placeholder token.
    pub async fn assign_white_seat(
        &self,
        game_id: i64,
        user_id: i64,
        token: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE games SET white_user_id = ?, white_token = ? WHERE id = ?")
            .bind(user_id)
            .bind(token)
            .bind(game_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Seat a user as black, replacing the placeholder token.
    pub async fn assign_black_seat(
        &self,
        game_id: i64,
        user_id: i64,
        token: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE games SET black_user_id = ?, black_token = ? WHERE id = ?")
            .bind(user_id)
            .bind(token)
            .bind(game_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Record a terminal result. Only the first call takes effect: once
    /// `game_over` is set the stored result is immutable, so repeats are
    /// no-ops.
    pub async fn mark_game_finished(&self, game_id: i64, result: &str) -> Result<bool, DatabaseError> {
        let updated =
            sqlx::query("UPDATE games SET game_over = 1, game_result = ? WHERE id = ? AND game_over = 0")
                .bind(result)
                .bind(game_id)
                .execute(self.pool())
                .await?;

        Ok(updated.rows_affected() > 0)
    }

    /// Delete a game row (cancellation while awaiting a second player).
    pub async fn delete_game(&self, game_id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM games WHERE id = ?")
            .bind(game_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Games where the user holds a seat, with games still awaiting a
    /// second player sorted last.
    pub async fn list_games_by_user(&self, user_id: i64) -> Result<Vec<GameWithPlayers>, DatabaseError> {
        let query = format!(
            "{GAME_WITH_PLAYERS}
             WHERE g.white_user_id = ? OR g.black_user_id = ?
             ORDER BY (g.white_user_id = -1 OR g.black_user_id = -1), g.id"
        );
        let games = sqlx::query_as::<_, GameWithPlayers>(&query)
            .bind(user_id)
            .bind(user_id)
            .fetch_all(self.pool())
            .await?;

        Ok(games)
    }

    /// Public games with exactly one open seat that the user does not
    /// already occupy.
    pub async fn list_joinable_games(&self, user_id: i64) -> Result<Vec<GameWithPlayers>, DatabaseError> {
        let query = format!(
            "{GAME_WITH_PLAYERS}
             WHERE (g.white_user_id = -1 OR g.black_user_id = -1)
               AND g.viewer_token = ''
               AND g.white_user_id != ? AND g.black_user_id != ?
             ORDER BY g.id"
        );
        let games = sqlx::query_as::<_, GameWithPlayers>(&query)
            .bind(user_id)
            .bind(user_id)
            .fetch_all(self.pool())
            .await?;

        Ok(games)
    }
}
