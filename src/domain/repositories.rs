//! Domain repository traits - Abstractions for data persistence

use crate::domain::entities::{GameSession, StoryGraph};
use crate::domain::errors::DomainError;
use crate::domain::value_objects::{SessionId, StoryId, UserId};
use async_trait::async_trait;
use std::sync::Arc;

/// Read-only access to built story graphs
///
/// Graphs are immutable once built, so implementations hand out shared
/// references and are free to cache them.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Load a story graph by its ID
    async fn load_story(&self, id: &StoryId) -> Result<Arc<StoryGraph>, RepositoryError>;

    /// List all available story IDs
    async fn list_stories(&self) -> Result<Vec<StoryId>, RepositoryError>;
}

/// Persistence of play sessions
///
/// Writes are optimistic: `save_session` only succeeds when the stored
/// version still equals `session.version()`, and returns the new version.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a freshly started session, returning its first version
    async fn create_session(&self, session: &GameSession) -> Result<u64, RepositoryError>;

    async fn load_session(&self, id: &SessionId) -> Result<Option<GameSession>, RepositoryError>;

    /// Replace a stored session if nobody wrote it since it was loaded
    async fn save_session(&self, session: &GameSession) -> Result<u64, RepositoryError>;

    async fn delete_session(&self, id: &SessionId) -> Result<(), RepositoryError>;

    /// Sessions owned by `user` for `story`
    async fn list_sessions(
        &self,
        user: &UserId,
        story: &StoryId,
    ) -> Result<Vec<GameSession>, RepositoryError>;
}

/// Generates identifiers for new sessions
pub trait SessionIdGenerator: Send + Sync {
    fn generate(&self) -> SessionId;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Story not found: {id}")]
    StoryNotFound {
        id: StoryId,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Session not found: {id}")]
    SessionNotFound { id: SessionId },

    #[error("Session already exists: {id}")]
    SessionExists { id: SessionId },

    #[error("Stale write to session {id}: expected version {expected}, stored version is {actual}")]
    VersionConflict {
        id: SessionId,
        expected: u64,
        actual: u64,
    },

    #[error("Story {id} is malformed")]
    MalformedStory {
        id: StoryId,
        #[source]
        source: DomainError,
    },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Serialization error: {message}")]
    SerializationError { message: String },

    #[error("Invalid data format: {message}")]
    InvalidFormat { message: String },

    #[error("Repository unavailable: {reason}")]
    Unavailable { reason: String },
}

impl RepositoryError {
    /// Create a not found error with an optional source
    pub fn story_not_found(id: impl Into<StoryId>) -> Self {
        Self::StoryNotFound {
            id: id.into(),
            source: Some(Box::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Story not found",
            ))),
        }
    }
}
