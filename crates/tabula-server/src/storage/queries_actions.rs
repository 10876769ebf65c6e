//! The append-only action log.
//!
//! `(game_id, action_num)` is the table's primary key, which makes it the
//! serialization point for concurrent appends: of two writers racing for
//! the same slot, exactly one insert succeeds and the loser observes a
//! uniqueness violation surfaced as `DatabaseError::Conflict`.

use tabula_core::db::unix_timestamp_ms;

use super::db::{DatabaseError, GameDatabase};
use super::models::ActionRecord;

impl GameDatabase {
    /// Append one action to a game's log. Fails with
    /// [`DatabaseError::Conflict`] when the slot is already taken.
    pub async fn append_action(
        &self,
        game_id: i64,
        action_num: i64,
        action: &str,
        signature: &str,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp_ms();

        sqlx::query(
            "INSERT INTO actions (game_id, action_num, action, signature, creation_time)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(game_id)
        .bind(action_num)
        .bind(action)
        .bind(signature)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Number of actions recorded for a game.
    pub async fn count_actions(&self, game_id: i64) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM actions WHERE game_id = ?")
            .bind(game_id)
            .fetch_one(self.pool())
            .await?;

        Ok(row.0)
    }

    /// All actions of a game, ordered by `action_num`.
    pub async fn list_actions(&self, game_id: i64) -> Result<Vec<ActionRecord>, DatabaseError> {
        let actions = sqlx::query_as::<_, ActionRecord>(
            "SELECT action_num, action, signature FROM actions WHERE game_id = ? ORDER BY action_num",
        )
        .bind(game_id)
        .fetch_all(self.pool())
        .await?;

        Ok(actions)
    }

    /// The game record: space-joined action texts in order, plus the count.
    pub async fn game_record(&self, game_id: i64) -> Result<(String, i64), DatabaseError> {
        let actions = self.list_actions(game_id).await?;
        let count = actions.len() as i64;
        let record = actions
            .into_iter()
            .map(|a| a.action)
            .collect::<Vec<_>>()
            .join(" ");

        Ok((record, count))
    }
}
