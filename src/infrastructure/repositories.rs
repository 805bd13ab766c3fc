//! Infrastructure implementations of repository traits

use crate::domain::entities::{GameSession, StoryDocument, StoryGraph};
use crate::domain::repositories::{
    RepositoryError, SessionIdGenerator, SessionRepository, StoryRepository,
};
use crate::domain::value_objects::{SessionId, StoryId, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

/// Parse and build a story document, mapping failures to repository errors
pub fn build_story(json: &str) -> Result<StoryGraph, RepositoryError> {
    let document: StoryDocument =
        serde_json::from_str(json).map_err(|e| RepositoryError::InvalidFormat {
            message: format!("Failed to parse story document: {e}"),
        })?;
    let id = document.id.clone();
    StoryGraph::from_document(document)
        .map_err(|source| RepositoryError::MalformedStory { id, source })
}

/// Whether `id` can name a file directly inside the base directory
fn is_plain_file_stem(id: &str) -> bool {
    !id.is_empty() && !id.contains(['/', '\\', '\0']) && !id.contains("..")
}

/// File system implementation of StoryRepository
///
/// Stories live in `<base>/<story id>.json`. Built graphs are cached, since
/// a story never changes while it is being played.
pub struct FileSystemStoryRepository {
    base_path: PathBuf,
    cache: RwLock<HashMap<StoryId, Arc<StoryGraph>>>,
}

impl FileSystemStoryRepository {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn get_story_path(&self, id: &StoryId) -> Option<PathBuf> {
        is_plain_file_stem(id.as_str()).then(|| self.base_path.join(format!("{id}.json")))
    }
}

#[async_trait]
impl StoryRepository for FileSystemStoryRepository {
    async fn load_story(&self, id: &StoryId) -> Result<Arc<StoryGraph>, RepositoryError> {
        if let Some(graph) = self.cache.read().await.get(id) {
            return Ok(Arc::clone(graph));
        }

        let Some(path) = self.get_story_path(id).filter(|p| p.exists()) else {
            return Err(RepositoryError::story_not_found(id.clone()));
        };

        let content =
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| RepositoryError::IoError {
                    message: format!("Failed to read story file {}: {}", path.display(), e),
                })?;

        let graph = Arc::new(build_story(&content)?);
        if graph.id() != id {
            return Err(RepositoryError::InvalidFormat {
                message: format!(
                    "File {} declares story id {}, expected {id}",
                    path.display(),
                    graph.id()
                ),
            });
        }

        log::info!(
            "Loaded story {id} ({} episodes) from {}",
            graph.episodes().len(),
            path.display()
        );
        self.cache
            .write()
            .await
            .insert(id.clone(), Arc::clone(&graph));
        Ok(graph)
    }

    async fn list_stories(&self) -> Result<Vec<StoryId>, RepositoryError> {
        let mut stories = Vec::new();

        let mut entries =
            tokio::fs::read_dir(&self.base_path)
                .await
                .map_err(|e| RepositoryError::IoError {
                    message: format!(
                        "Failed to read directory {}: {}",
                        self.base_path.display(),
                        e
                    ),
                })?;

        while let Some(entry) =
            entries
                .next_entry()
                .await
                .map_err(|e| RepositoryError::IoError {
                    message: format!("Failed to read directory entry: {e}"),
                })?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                stories.push(StoryId::from(stem));
            }
        }

        stories.sort();
        Ok(stories)
    }
}

/// In-memory implementation for testing and embedding
#[derive(Default)]
pub struct InMemoryStoryRepository {
    stories: HashMap<StoryId, Arc<StoryGraph>>,
}

impl InMemoryStoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_story(&mut self, graph: StoryGraph) {
        let id = graph.id().clone();
        self.stories.insert(id, Arc::new(graph));
    }

    pub fn add_document(&mut self, document: StoryDocument) -> Result<(), RepositoryError> {
        let id = document.id.clone();
        let graph = StoryGraph::from_document(document)
            .map_err(|source| RepositoryError::MalformedStory { id, source })?;
        self.add_story(graph);
        Ok(())
    }
}

#[async_trait]
impl StoryRepository for InMemoryStoryRepository {
    async fn load_story(&self, id: &StoryId) -> Result<Arc<StoryGraph>, RepositoryError> {
        self.stories
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::story_not_found(id.clone()))
    }

    async fn list_stories(&self) -> Result<Vec<StoryId>, RepositoryError> {
        let mut ids: Vec<StoryId> = self.stories.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

fn check_version(stored: &GameSession, incoming: &GameSession) -> Result<u64, RepositoryError> {
    if stored.version() != incoming.version() {
        return Err(RepositoryError::VersionConflict {
            id: incoming.id().clone(),
            expected: incoming.version(),
            actual: stored.version(),
        });
    }
    Ok(stored.version() + 1)
}

/// In-memory session store with optimistic version checks
#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<SessionId, GameSession>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create_session(&self, session: &GameSession) -> Result<u64, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session.id()) {
            return Err(RepositoryError::SessionExists {
                id: session.id().clone(),
            });
        }
        let mut stored = session.clone();
        stored.mark_persisted(1);
        sessions.insert(stored.id().clone(), stored);
        Ok(1)
    }

    async fn load_session(&self, id: &SessionId) -> Result<Option<GameSession>, RepositoryError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn save_session(&self, session: &GameSession) -> Result<u64, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions
            .get(session.id())
            .ok_or_else(|| RepositoryError::SessionNotFound {
                id: session.id().clone(),
            })?;
        let version = check_version(stored, session)?;

        let mut updated = session.clone();
        updated.mark_persisted(version);
        sessions.insert(updated.id().clone(), updated);
        Ok(version)
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), RepositoryError> {
        self.sessions
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::SessionNotFound { id: id.clone() })
    }

    async fn list_sessions(
        &self,
        user: &UserId,
        story: &StoryId,
    ) -> Result<Vec<GameSession>, RepositoryError> {
        let mut sessions: Vec<GameSession> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.user() == Some(user) && s.story_id() == story)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(sessions)
    }
}

/// Session store keeping one JSON file per session
///
/// Read-check-write cycles are serialized inside this process; the version
/// check still catches writers that loaded a stale copy.
pub struct JsonFileSessionRepository {
    base_path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSessionRepository {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn get_session_path(&self, id: &SessionId) -> Option<PathBuf> {
        is_plain_file_stem(id.as_str())
            .then(|| self.base_path.join(format!("{id}.session.json")))
    }

    async fn read(&self, id: &SessionId) -> Result<Option<GameSession>, RepositoryError> {
        let Some(path) = self.get_session_path(id).filter(|p| p.exists()) else {
            return Ok(None);
        };

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| RepositoryError::IoError {
                message: format!("Failed to read session file {}: {}", path.display(), e),
            })?;

        crate::storage::load(&bytes)
            .map(Some)
            .map_err(|e| RepositoryError::SerializationError {
                message: format!("Failed to deserialize session {id}: {e}"),
            })
    }

    /// Replace the session file in one rename so readers never see a partial file
    async fn write(&self, session: &GameSession) -> Result<(), RepositoryError> {
        let path =
            self.get_session_path(session.id())
                .ok_or_else(|| RepositoryError::InvalidFormat {
                    message: format!("Session id {} cannot be used as a file name", session.id()),
                })?;

        tokio::fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| RepositoryError::IoError {
                message: format!("Failed to create session directory: {e}"),
            })?;

        let bytes =
            crate::storage::save(session).map_err(|e| RepositoryError::SerializationError {
                message: format!("Failed to serialize session {}: {e}", session.id()),
            })?;

        let staging = self
            .base_path
            .join(format!("{}.{}.tmp", session.id(), uuid::Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&staging, bytes).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(RepositoryError::IoError {
                message: format!("Failed to write session file {}: {e}", staging.display()),
            });
        }

        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(RepositoryError::IoError {
                message: format!("Failed to replace session file {}: {e}", path.display()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for JsonFileSessionRepository {
    async fn create_session(&self, session: &GameSession) -> Result<u64, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        if self.read(session.id()).await?.is_some() {
            return Err(RepositoryError::SessionExists {
                id: session.id().clone(),
            });
        }
        let mut stored = session.clone();
        stored.mark_persisted(1);
        self.write(&stored).await?;
        Ok(1)
    }

    async fn load_session(&self, id: &SessionId) -> Result<Option<GameSession>, RepositoryError> {
        self.read(id).await
    }

    async fn save_session(&self, session: &GameSession) -> Result<u64, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let stored =
            self.read(session.id())
                .await?
                .ok_or_else(|| RepositoryError::SessionNotFound {
                    id: session.id().clone(),
                })?;
        let version = check_version(&stored, session)?;

        let mut updated = session.clone();
        updated.mark_persisted(version);
        self.write(&updated).await?;
        Ok(version)
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let Some(path) = self.get_session_path(id).filter(|p| p.exists()) else {
            return Err(RepositoryError::SessionNotFound { id: id.clone() });
        };

        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| RepositoryError::IoError {
                message: format!("Failed to delete session file {}: {}", path.display(), e),
            })
    }

    async fn list_sessions(
        &self,
        user: &UserId,
        story: &StoryId,
    ) -> Result<Vec<GameSession>, RepositoryError> {
        let mut sessions = Vec::new();
        if !self.base_path.exists() {
            return Ok(sessions);
        }

        let mut entries =
            tokio::fs::read_dir(&self.base_path)
                .await
                .map_err(|e| RepositoryError::IoError {
                    message: format!(
                        "Failed to read directory {}: {}",
                        self.base_path.display(),
                        e
                    ),
                })?;

        while let Some(entry) =
            entries
                .next_entry()
                .await
                .map_err(|e| RepositoryError::IoError {
                    message: format!("Failed to read directory entry: {e}"),
                })?
        {
            let file_name = entry.file_name();
            let Some(id) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(".session.json"))
            else {
                continue;
            };
            if let Some(session) = self.read(&SessionId::from(id)).await?
                && session.user() == Some(user)
                && session.story_id() == story
            {
                sessions.push(session);
            }
        }

        sessions.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(sessions)
    }
}

/// Random v4 UUID session ids
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidSessionIdGenerator;

impl SessionIdGenerator for UuidSessionIdGenerator {
    fn generate(&self) -> SessionId {
        SessionId::from(uuid::Uuid::new_v4().to_string())
    }
}

/// Predictable `<prefix>-<n>` ids, handy for tests and local play
#[derive(Debug)]
pub struct SequentialSessionIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialSessionIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl SessionIdGenerator for SequentialSessionIdGenerator {
    fn generate(&self) -> SessionId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        SessionId::from(format!("{}-{n}", self.prefix))
    }
}
