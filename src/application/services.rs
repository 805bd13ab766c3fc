//! Application services - Best-effort media side effects
//!
//! Illustration and mood music come from external generation services.
//! Neither may ever fail a gameplay request: every collaborator error is
//! logged here and turned into an absent result.

use crate::application::api::{Illustration, MusicRecommendation};
use crate::config::MediaConfig;
use crate::domain::entities::{Episode, StoryNode};
use crate::domain::value_objects::{NodeId, StoryId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Errors reported by media collaborators
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum GatewayError {
    #[error("generation failed: {message}")]
    Generation { message: String },

    #[error("request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("service unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Everything the illustration service is told about a node
#[derive(Debug, Clone, PartialEq)]
pub struct IllustrationRequest {
    pub node_text: String,
    pub situation: Option<String>,
    pub npc_emotions: Option<BTreeMap<String, String>>,
    pub episode_title: String,
    pub episode_order: u32,
    pub node_depth: u32,
}

impl IllustrationRequest {
    pub fn for_node(episode: &Episode, node: &StoryNode) -> Self {
        Self {
            node_text: node.text().to_string(),
            situation: node.details().situation.clone(),
            npc_emotions: node.details().npc_emotions.clone(),
            episode_title: episode.title().to_string(),
            episode_order: episode.order(),
            node_depth: node.depth(),
        }
    }
}

#[async_trait]
pub trait IllustrationService: Send + Sync {
    async fn generate_image(
        &self,
        request: &IllustrationRequest,
    ) -> Result<Illustration, GatewayError>;
}

#[async_trait]
pub trait MusicRecommendationService: Send + Sync {
    async fn recommend_music(&self, node_text: &str) -> Result<MusicRecommendation, GatewayError>;
}

/// `story:node` key of a cached music recommendation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MusicCacheKey {
    pub story_id: StoryId,
    pub node_id: NodeId,
}

impl MusicCacheKey {
    pub fn new(story_id: StoryId, node_id: NodeId) -> Self {
        Self { story_id, node_id }
    }
}

impl fmt::Display for MusicCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.story_id, self.node_id)
    }
}

/// Process-wide music cache; entries never change once written
#[async_trait]
pub trait MusicCache: Send + Sync {
    async fn get(&self, key: &MusicCacheKey) -> Option<MusicRecommendation>;

    async fn put(&self, key: MusicCacheKey, value: MusicRecommendation);

    /// Drop every entry of `story`, returning how many were removed
    async fn clear_story(&self, story: &StoryId) -> usize;
}

/// Gateway to the illustration and music collaborators
#[derive(Clone)]
pub struct MediaGateway {
    illustrations: Option<Arc<dyn IllustrationService>>,
    music: Option<Arc<dyn MusicRecommendationService>>,
    cache: Arc<dyn MusicCache>,
    config: MediaConfig,
}

impl MediaGateway {
    /// Gateway without collaborators; every lookup yields nothing
    pub fn new(cache: Arc<dyn MusicCache>, config: MediaConfig) -> Self {
        Self {
            illustrations: None,
            music: None,
            cache,
            config,
        }
    }

    pub fn with_illustrations(mut self, service: Arc<dyn IllustrationService>) -> Self {
        self.illustrations = Some(service);
        self
    }

    pub fn with_music(mut self, service: Arc<dyn MusicRecommendationService>) -> Self {
        self.music = Some(service);
        self
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// Request an illustration, bounded by the configured timeout
    pub async fn illustrate(&self, request: &IllustrationRequest) -> Option<Illustration> {
        if !self.config.illustration_enabled {
            return None;
        }
        let service = self.illustrations.as_ref()?;
        let timeout = self.config.illustration_timeout();

        let result = match tokio::time::timeout(timeout, service.generate_image(request)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                after_ms: self.config.illustration_timeout_ms,
            }),
        };

        match result {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!(
                    "Illustration for episode {} depth {} unavailable: {e}",
                    request.episode_order,
                    request.node_depth
                );
                None
            }
        }
    }

    /// Cache-first music lookup for one node
    pub async fn music_for(
        &self,
        story_id: &StoryId,
        node_id: &NodeId,
        node_text: &str,
    ) -> Option<MusicRecommendation> {
        if !self.config.music_enabled {
            return None;
        }
        let service = self.music.as_ref()?;
        let key = MusicCacheKey::new(story_id.clone(), node_id.clone());

        if let Some(hit) = self.cache.get(&key).await {
            log::debug!("Music cache hit for {key}");
            return Some(hit);
        }

        match service.recommend_music(node_text).await {
            Ok(music) => {
                self.cache.put(key, music.clone()).await;
                Some(music)
            }
            Err(e) => {
                log::warn!("Music recommendation for {key} unavailable: {e}");
                None
            }
        }
    }

    /// Warm the cache for `candidates` on detached tasks
    ///
    /// Each candidate gets its own task so one failure cannot affect the
    /// others. The handles are returned for callers that want to wait;
    /// dropping them leaves the tasks running.
    pub fn prefetch_music(
        &self,
        story_id: &StoryId,
        candidates: Vec<(NodeId, String)>,
    ) -> Vec<JoinHandle<()>> {
        if !self.config.music_enabled || !self.config.music_prefetch {
            return Vec::new();
        }
        let Some(service) = self.music.clone() else {
            return Vec::new();
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::debug!("No async runtime available, skipping music prefetch");
            return Vec::new();
        };

        candidates
            .into_iter()
            .map(|(node_id, node_text)| {
                let key = MusicCacheKey::new(story_id.clone(), node_id);
                let cache = Arc::clone(&self.cache);
                let service = Arc::clone(&service);
                runtime.spawn(async move {
                    if cache.get(&key).await.is_some() {
                        return;
                    }
                    match service.recommend_music(&node_text).await {
                        Ok(music) => {
                            log::debug!("Prefetched music for {key}");
                            cache.put(key, music).await;
                        }
                        Err(e) => log::warn!("Music prefetch for {key} failed: {e}"),
                    }
                })
            })
            .collect()
    }

    pub async fn clear_story_music(&self, story_id: &StoryId) -> usize {
        let removed = self.cache.clear_story(story_id).await;
        log::info!("Cleared {removed} cached music entries for story {story_id}");
        removed
    }
}
