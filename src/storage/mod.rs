//! Storage module for saving and loading play sessions
//!
//! This module provides save/load functionality using JSON serialization.

use crate::domain::entities::GameSession;

/// Save a session to bytes using JSON serialization
pub fn save(session: &GameSession) -> anyhow::Result<Vec<u8>> {
    let json = serde_json::to_string_pretty(session)?;
    Ok(json.into_bytes())
}

/// Load a session from bytes using JSON deserialization
pub fn load(bytes: &[u8]) -> anyhow::Result<GameSession> {
    let json = std::str::from_utf8(bytes)?;
    let session = serde_json::from_str(json)?;
    Ok(session)
}
