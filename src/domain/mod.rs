//! Domain layer - Story graph, session state machine and ending rules
//!
//! This layer contains the heart of the playback logic, independent of
//! persistence, transport, or media generation concerns.

pub mod condition;
pub mod entities;
pub mod errors;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use condition::*;
pub use entities::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
pub use value_objects::*;
