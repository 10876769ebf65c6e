//! Opaque credential generation.
//!
//! User tokens and per-game role tokens share one format: 128 random bits
//! rendered as 32 lowercase hex characters. They are resolved by separate
//! tables, never by inspecting the token itself.

use std::fmt::Write;

use rand::rngs::OsRng;
use rand::RngCore;

/// Generate a fresh opaque token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().fold(String::with_capacity(32), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
