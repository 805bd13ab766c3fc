//! Dependency injection tests
//! Tests the resolve functionality and service registration

use std::sync::Arc;
use storyplay::application::dependency_injection::DependencyContainer;
use storyplay::config::EngineConfig;
use storyplay::domain::{
    RepositoryError, SessionId, SessionIdGenerator, StoryGraph, StoryId, StoryRepository,
};
use storyplay::infrastructure::{InMemoryMusicCache, InMemorySessionRepository, build_story};

/// Mock repository serving one fixed story
struct TestStoryRepository {
    graph: Arc<StoryGraph>,
}

impl TestStoryRepository {
    fn new() -> Self {
        let graph = build_story(
            r#"{"id": "fixed", "title": "Fixed",
                "gauges": [{"id": "mood", "name": "Mood"}],
                "episodes": [{"id": "e1", "title": "Only", "order": 1, "nodes": [
                    {"id": "root", "depth": 0, "text": "Alone"}
                ]}]}"#,
        )
        .unwrap();
        Self {
            graph: Arc::new(graph),
        }
    }
}

#[async_trait::async_trait]
impl StoryRepository for TestStoryRepository {
    async fn load_story(&self, id: &StoryId) -> Result<Arc<StoryGraph>, RepositoryError> {
        if id == self.graph.id() {
            Ok(self.graph.clone())
        } else {
            Err(RepositoryError::story_not_found(id.clone()))
        }
    }

    async fn list_stories(&self) -> Result<Vec<StoryId>, RepositoryError> {
        Ok(vec![self.graph.id().clone()])
    }
}

/// Mock generator always returning the same id
struct FixedIds;

impl SessionIdGenerator for FixedIds {
    fn generate(&self) -> SessionId {
        SessionId::from("fixed-session")
    }
}

fn container(config: EngineConfig) -> DependencyContainer {
    DependencyContainer::new()
        .with_config(config)
        .register_story_repository(Arc::new(TestStoryRepository::new()))
        .register_session_repository(Arc::new(InMemorySessionRepository::new()))
        .register_session_id_generator(Arc::new(FixedIds))
        .register_music_cache(Arc::new(InMemoryMusicCache::new()))
}

#[test]
fn test_resolve_min_impl() {
    let container = container(EngineConfig::default());

    let resolved = container.resolve::<Arc<dyn StoryRepository>>();
    assert!(resolved.is_some(), "Should be able to resolve registered service");

    let missing = container.resolve::<Arc<String>>();
    assert!(missing.is_none(), "Unregistered service should not resolve");
}

#[tokio::test]
async fn configured_gauge_baseline_reaches_new_sessions() {
    let mut config = EngineConfig::default();
    config.gauges.initial_value = 20;
    let use_case = container(config).get_playback_use_case().unwrap();

    let view = use_case
        .start_session(&StoryId::from("fixed"), None)
        .await
        .unwrap();
    assert_eq!(view.session_id.as_str(), "fixed-session");
    assert_eq!(view.gauge_states["mood"], 20);
}

#[tokio::test]
async fn leaf_root_ends_on_first_submission() {
    let use_case = container(EngineConfig::default())
        .get_playback_use_case()
        .unwrap();
    let view = use_case
        .start_session(&StoryId::from("fixed"), None)
        .await
        .unwrap();
    assert!(view.choices.is_empty());
    assert!(!view.is_game_end);

    // Any index is accepted on a stranded leaf
    let end = use_case
        .submit_choice(&view.session_id, 0, None)
        .await
        .unwrap();
    assert!(end.is_game_end);
}

#[tokio::test]
async fn duplicate_session_ids_conflict() {
    let use_case = container(EngineConfig::default())
        .get_playback_use_case()
        .unwrap();
    use_case
        .start_session(&StoryId::from("fixed"), None)
        .await
        .unwrap();

    let err = use_case
        .start_session(&StoryId::from("fixed"), None)
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 409);
}
