//! Dependency injection container for application layer
//!
//! Decouples the playback use case from concrete infrastructure so tests
//! can swap in mock repositories and media collaborators.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storyplay::application::dependency_injection::DependencyContainer;
//!
//! let use_case = DependencyContainer::new()
//!     .register_story_repository(stories)
//!     .register_session_repository(sessions)
//!     .register_session_id_generator(ids)
//!     .register_music_cache(cache)
//!     .get_playback_use_case()
//!     .unwrap();
//! ```
//!
//! Services are stored in a map keyed by `TypeId`. Resolution is optional:
//! a use case is only built once every required service is registered.

use super::services::*;
use super::use_cases::*;
use crate::config::EngineConfig;
use crate::domain::repositories::{SessionIdGenerator, SessionRepository, StoryRepository};
use crate::domain::services::SessionStateMachine;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Simple dependency injection container
pub struct DependencyContainer {
    services: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    config: EngineConfig,
}

impl DependencyContainer {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn register_story_repository(self, repo: Arc<dyn StoryRepository>) -> Self {
        self.register(repo)
    }

    pub fn register_session_repository(self, repo: Arc<dyn SessionRepository>) -> Self {
        self.register(repo)
    }

    pub fn register_session_id_generator(self, ids: Arc<dyn SessionIdGenerator>) -> Self {
        self.register(ids)
    }

    pub fn register_music_cache(self, cache: Arc<dyn MusicCache>) -> Self {
        self.register(cache)
    }

    /// Optional; without it sessions render without illustrations
    pub fn register_illustration_service(self, service: Arc<dyn IllustrationService>) -> Self {
        self.register(service)
    }

    /// Optional; without it no music is recommended
    pub fn register_music_service(self, service: Arc<dyn MusicRecommendationService>) -> Self {
        self.register(service)
    }

    /// Resolve a service by type
    pub fn resolve<T: 'static + Clone>(&self) -> Option<T> {
        self.get_service::<T>()
    }

    /// Media gateway over the registered cache and collaborators
    pub fn get_media_gateway(&self) -> Option<MediaGateway> {
        let cache = self.get_service::<Arc<dyn MusicCache>>()?;
        let mut gateway = MediaGateway::new(cache, self.config.media.clone());

        if let Some(service) = self.get_service::<Arc<dyn IllustrationService>>() {
            gateway = gateway.with_illustrations(service);
        }
        if let Some(service) = self.get_service::<Arc<dyn MusicRecommendationService>>() {
            gateway = gateway.with_music(service);
        }
        Some(gateway)
    }

    /// Get playback use case
    pub fn get_playback_use_case(&self) -> Option<PlaybackUseCase> {
        let stories = self.get_service::<Arc<dyn StoryRepository>>()?;
        let sessions = self.get_service::<Arc<dyn SessionRepository>>()?;
        let ids = self.get_service::<Arc<dyn SessionIdGenerator>>()?;
        let media = self.get_media_gateway()?;

        let gauges = &self.config.gauges;
        let machine = SessionStateMachine::new(gauges.initial_value, gauges.bounds());

        Some(PlaybackUseCase::new(stories, sessions, ids, machine, media))
    }

    fn register<T: 'static + Send + Sync>(mut self, service: T) -> Self {
        self.services.insert(TypeId::of::<T>(), Box::new(service));
        self
    }

    /// Helper to get a service from the container
    fn get_service<T: 'static + Clone>(&self) -> Option<T> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|service| service.downcast_ref::<T>())
            .cloned()
    }
}

impl Default for DependencyContainer {
    fn default() -> Self {
        Self::new()
    }
}
