//! Application layer - Use cases and orchestration
//!
//! This layer orchestrates domain services to fulfill the player-facing
//! operations. It depends on domain but not on infrastructure.

pub mod api;
pub mod dependency_injection;
pub mod services;
pub mod use_cases;

pub use dependency_injection::*;
pub use services::*;
pub use use_cases::*;
