//! Infrastructure layer - External dependencies and adapters
//!
//! This layer contains implementations that deal with external concerns
//! like file systems, serialization, and process-wide caches.

pub mod music_cache;
pub mod repositories;

pub use music_cache::*;
pub use repositories::*;
