//! The bundled demo story loads, checks clean, and plays to its endings

use std::path::PathBuf;
use std::sync::Arc;
use storyplay::application::DependencyContainer;
use storyplay::application::use_cases::PlaybackUseCase;
use storyplay::check::check_story;
use storyplay::domain::{StoryId, StoryRepository, UserId};
use storyplay::infrastructure::{
    FileSystemStoryRepository, InMemoryMusicCache, JsonFileSessionRepository,
    UuidSessionIdGenerator,
};

fn stories_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("stories")
}

fn lighthouse() -> StoryId {
    StoryId::from("lighthouse")
}

fn playback(session_dir: &std::path::Path) -> PlaybackUseCase {
    DependencyContainer::new()
        .register_story_repository(Arc::new(FileSystemStoryRepository::new(stories_dir())))
        .register_session_repository(Arc::new(JsonFileSessionRepository::new(session_dir)))
        .register_session_id_generator(Arc::new(UuidSessionIdGenerator))
        .register_music_cache(Arc::new(InMemoryMusicCache::new()))
        .get_playback_use_case()
        .unwrap()
}

#[tokio::test]
async fn demo_story_builds_and_checks_without_warnings() {
    let repo = FileSystemStoryRepository::new(stories_dir());
    assert!(repo.list_stories().await.unwrap().contains(&lighthouse()));

    let graph = repo.load_story(&lighthouse()).await.unwrap();
    assert_eq!(graph.episodes().len(), 3);

    let result = check_story(&graph);
    assert!(!result.has_errors(), "{:?}", result.issues);
    assert_eq!(result.warning_count, 0, "{:?}", result.issues);
}

#[tokio::test]
async fn brave_and_kind_path_reaches_the_true_ending() {
    let dir = tempfile::tempdir().unwrap();
    let uc = playback(dir.path());
    let alice = UserId::from("alice");
    let me = Some(&alice);

    let view = uc.start_session(&lighthouse(), me).await.unwrap();
    assert_eq!(view.episode_title, "The Keeper's Letter");

    // Episode 1: stairs, lamp -> brave x2
    uc.submit_choice(&view.session_id, 0, me).await.unwrap();
    let ep2 = uc.submit_choice(&view.session_id, 0, me).await.unwrap();
    assert_eq!(ep2.episode_ending.as_ref().unwrap().id.as_str(), "ep1-beacon");
    assert_eq!(ep2.gauge_states["courage"], 65);
    assert_eq!(ep2.gauge_states["trust"], 55);
    assert_eq!(ep2.episode_title, "Storm Night");

    // Episode 2: row out, pull the sailor aboard
    uc.submit_choice(&view.session_id, 0, me).await.unwrap();
    let ep3 = uc.submit_choice(&view.session_id, 0, me).await.unwrap();
    assert_eq!(ep3.episode_ending.as_ref().unwrap().id.as_str(), "ep2-hero");
    assert_eq!(ep3.gauge_states["courage"], 85);
    assert_eq!(ep3.gauge_states["trust"], 65);

    // Episode 3: stay on
    let end = uc.submit_choice(&view.session_id, 0, me).await.unwrap();
    assert!(end.is_game_end);
    assert_eq!(end.episode_ending.as_ref().unwrap().id.as_str(), "ep3-home");
    assert_eq!(end.gauge_states["trust"], 75);

    let final_ending = uc.get_final_ending(&view.session_id, me).await.unwrap();
    assert_eq!(final_ending.id.as_str(), "f-keeper");
    assert_eq!(final_ending.category, "true");

    let sessions = uc.list_sessions(&alice, &lighthouse()).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].is_completed);
    assert_eq!(sessions[0].completed_episodes, 3);
}

#[tokio::test]
async fn cautious_path_falls_through_to_the_wanderer() {
    let dir = tempfile::tempdir().unwrap();
    let uc = playback(dir.path());

    let view = uc.start_session(&lighthouse(), None).await.unwrap();
    // Episode 1: stairs, logbook -> brave 1, curious 1: only the catch-all matches
    uc.submit_choice(&view.session_id, 0, None).await.unwrap();
    let ep2 = uc.submit_choice(&view.session_id, 1, None).await.unwrap();
    assert_eq!(ep2.episode_ending.as_ref().unwrap().id.as_str(), "ep1-questions");
    assert_eq!(ep2.gauge_states["courage"], 55);

    // Episode 2: signal with the lamp -> careful
    let ep3 = uc.submit_choice(&view.session_id, 1, None).await.unwrap();
    assert_eq!(ep3.episode_ending.as_ref().unwrap().id.as_str(), "ep2-careful");
    assert_eq!(ep3.gauge_states["trust"], 55);
    assert_eq!(ep3.gauge_states["courage"], 45);

    // Episode 3: take the ferry
    let end = uc.submit_choice(&view.session_id, 1, None).await.unwrap();
    assert_eq!(end.episode_ending.as_ref().unwrap().id.as_str(), "ep3-ferry");
    assert_eq!(end.final_ending.as_ref().unwrap().id.as_str(), "f-wanderer");
}
