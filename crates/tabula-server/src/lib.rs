//! Tabula game server library.
//!
//! The game session subsystem of a turn-based board-game server:
//! - SQLite storage for users, tokens, games and the append-only action log
//! - identity: registration, login, bearer tokens
//! - game registry: create/join/cancel/finish and listings
//! - authorization resolver: maps `(game_id, token)` to a role
//! - session hub: WebSocket fan-out of strictly ordered actions
//! - HTTP request surface

pub mod games;
pub mod http;
pub mod hub;
pub mod identity;
pub mod protocol;
pub mod storage;
