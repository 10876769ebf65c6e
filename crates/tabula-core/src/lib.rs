//! Tabula core library.
//!
//! Shared plumbing used by the tabula server crates: SQLite pool helpers,
//! configuration resolution, error types, and tracing initialisation.

pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use error::{Error, Result};
