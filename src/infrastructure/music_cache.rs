//! In-process music cache

use crate::application::api::MusicRecommendation;
use crate::application::services::{MusicCache, MusicCacheKey};
use crate::domain::value_objects::StoryId;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-wide key/value store with manual per-story clearing
///
/// Concurrent writers for the same key are last-write-wins.
#[derive(Default)]
pub struct InMemoryMusicCache {
    entries: RwLock<HashMap<MusicCacheKey, MusicRecommendation>>,
}

impl InMemoryMusicCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl MusicCache for InMemoryMusicCache {
    async fn get(&self, key: &MusicCacheKey) -> Option<MusicRecommendation> {
        self.entries.read().await.get(key).cloned()
    }

    async fn put(&self, key: MusicCacheKey, value: MusicRecommendation) {
        self.entries.write().await.insert(key, value);
    }

    async fn clear_story(&self, story: &StoryId) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| &key.story_id != story);
        before - entries.len()
    }
}
