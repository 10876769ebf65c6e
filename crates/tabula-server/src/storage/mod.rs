//! SQLite-backed storage for the tabula game server.

pub mod db;
pub mod models;
mod queries;
mod queries_actions;
mod queries_games;


pub use db::GameDatabase;
pub use models::{ActionRecord, GameRow, GameWithPlayers, User, UNASSIGNED};
