//! Playback behaviour through the public use case
//! Covers ending selection, gauge clamping, tag resets and episode chaining

use serde_json::{Value, json};
use std::sync::Arc;
use storyplay::application::DependencyContainer;
use storyplay::application::use_cases::{ErrorKind, PlaybackUseCase};
use storyplay::domain::{StoryDocument, StoryId, UserId};
use storyplay::infrastructure::{
    InMemoryMusicCache, InMemorySessionRepository, InMemoryStoryRepository,
    SequentialSessionIdGenerator,
};

/// Episode `e{order}`: choice 0 goes through a hall, choice 1 straight to a leaf
fn episode(order: u32, endings: Value) -> Value {
    let p = format!("e{order}");
    json!({
        "id": p.as_str(),
        "title": format!("Episode {order}"),
        "order": order,
        "introText": format!("Intro {order}"),
        "nodes": [
            {"id": format!("{p}-root"), "depth": 0, "text": format!("Root of {p}"), "choices": [
                {"id": format!("{p}-brave"), "text": "Be brave", "order": 1,
                 "tags": ["brave", "brave"], "nextNodeId": format!("{p}-hall")},
                {"id": format!("{p}-calm"), "text": "Stay calm", "order": 2,
                 "tags": ["calm"], "nextNodeId": format!("{p}-end")}
            ]},
            {"id": format!("{p}-hall"), "depth": 1, "text": format!("Hall of {p}"), "choices": [
                {"id": format!("{p}-on"), "text": "Go on", "order": 1,
                 "tags": ["brave"], "nextNodeId": format!("{p}-hall-end")}
            ]},
            {"id": format!("{p}-end"), "depth": 1, "text": format!("Quiet end of {p}")},
            {"id": format!("{p}-hall-end"), "depth": 2, "text": format!("Loud end of {p}")}
        ],
        "endings": endings
    })
}

fn story(episodes: Vec<Value>, finals: Value) -> StoryDocument {
    serde_json::from_value(json!({
        "id": "tale",
        "title": "Tale",
        "gauges": [{"id": "trust", "name": "Trust"}, {"id": "courage", "name": "Courage"}],
        "episodes": episodes,
        "finalEndings": finals
    }))
    .unwrap()
}

fn playback(document: StoryDocument) -> PlaybackUseCase {
    let mut stories = InMemoryStoryRepository::new();
    stories.add_document(document).unwrap();

    DependencyContainer::new()
        .register_story_repository(Arc::new(stories))
        .register_session_repository(Arc::new(InMemorySessionRepository::new()))
        .register_session_id_generator(Arc::new(SequentialSessionIdGenerator::new("s")))
        .register_music_cache(Arc::new(InMemoryMusicCache::new()))
        .get_playback_use_case()
        .unwrap()
}

fn tale() -> StoryId {
    StoryId::from("tale")
}

#[tokio::test]
async fn start_positions_session_at_first_root() {
    let uc = playback(story(vec![episode(1, json!([]))], json!([])));
    let view = uc.start_session(&tale(), None).await.unwrap();

    assert_eq!(view.episode_order, 1);
    assert_eq!(view.node_id.as_str(), "e1-root");
    assert_eq!(view.intro_text.as_deref(), Some("Intro 1"));
    assert_eq!(view.gauge_states["trust"], 50);
    assert_eq!(view.gauge_states["courage"], 50);
    assert!(view.accumulated_tags.is_empty());
    assert_eq!(view.gauges.len(), 2);
    assert_eq!(view.choices[1].text, "Stay calm");
    assert_eq!(view.choices[1].index, 1);
}

#[tokio::test]
async fn unknown_story_is_not_found() {
    let uc = playback(story(vec![episode(1, json!([]))], json!([])));
    let err = uc
        .start_session(&StoryId::from("missing"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn advancing_accumulates_repeated_tags_and_hides_intro() {
    let uc = playback(story(vec![episode(1, json!([]))], json!([])));
    let start = uc.start_session(&tale(), None).await.unwrap();

    let view = uc.submit_choice(&start.session_id, 0, None).await.unwrap();
    assert_eq!(view.node_id.as_str(), "e1-hall");
    assert_eq!(view.accumulated_tags["brave"], 2);
    assert!(view.intro_text.is_none());
    assert!(!view.is_episode_end);
}

#[tokio::test]
async fn first_matching_rule_is_selected() {
    let uc = playback(story(
        vec![episode(
            1,
            json!([
                {"id": "r1", "title": "R1", "condition": "trust >= 50"},
                {"id": "r2", "title": "R2", "condition": "trust > 100"},
                {"id": "r3", "title": "R3", "condition": "courage >= 50"}
            ]),
        )],
        json!([]),
    ));
    let start = uc.start_session(&tale(), None).await.unwrap();
    let view = uc.submit_choice(&start.session_id, 1, None).await.unwrap();

    assert_eq!(view.episode_ending.unwrap().id.as_str(), "r1");
}

#[tokio::test]
async fn first_declared_rule_is_the_fallback() {
    let uc = playback(story(
        vec![episode(
            1,
            json!([
                {"id": "r1", "title": "R1", "condition": "trust > 90", "gaugeChanges": {"trust": 1}},
                {"id": "r2", "title": "R2", "condition": "#brave >= 10"}
            ]),
        )],
        json!([]),
    ));
    let start = uc.start_session(&tale(), None).await.unwrap();
    let view = uc.submit_choice(&start.session_id, 1, None).await.unwrap();

    assert_eq!(view.episode_ending.unwrap().id.as_str(), "r1");
    assert_eq!(view.gauge_states["trust"], 51);
}

#[tokio::test]
async fn tag_counts_drive_episode_endings() {
    let endings = json!([
        {"id": "hero", "title": "Hero", "condition": "#brave >= 3", "gaugeChanges": {"courage": 20}},
        {"id": "quiet", "title": "Quiet", "condition": "#calm >= 1 AND #brave == 0"}
    ]);
    let uc = playback(story(vec![episode(1, endings)], json!([])));

    let brave = uc.start_session(&tale(), None).await.unwrap();
    uc.submit_choice(&brave.session_id, 0, None).await.unwrap();
    let view = uc.submit_choice(&brave.session_id, 0, None).await.unwrap();
    assert_eq!(view.episode_ending.unwrap().id.as_str(), "hero");
    assert_eq!(view.gauge_states["courage"], 70);

    // `brave` is never counted on this path, so the quiet rule cannot match
    let calm = uc.start_session(&tale(), None).await.unwrap();
    let view = uc.submit_choice(&calm.session_id, 1, None).await.unwrap();
    assert_eq!(view.episode_ending.unwrap().id.as_str(), "hero");
}

#[tokio::test]
async fn episode_end_resets_tags_and_shows_next_intro() {
    let uc = playback(story(
        vec![
            episode(1, json!([{"id": "one", "title": "One", "condition": ""}])),
            episode(2, json!([])),
        ],
        json!([]),
    ));
    let start = uc.start_session(&tale(), None).await.unwrap();
    uc.submit_choice(&start.session_id, 0, None).await.unwrap();
    let view = uc.submit_choice(&start.session_id, 0, None).await.unwrap();

    assert!(view.is_episode_end);
    assert!(!view.is_game_end);
    assert!(view.accumulated_tags.is_empty());
    assert_eq!(view.episode_order, 2);
    assert_eq!(view.node_id.as_str(), "e2-root");
    assert_eq!(view.intro_text.as_deref(), Some("Intro 2"));
    assert_eq!(view.choices.len(), 2);

    let ending = view.episode_ending.unwrap();
    assert_eq!(ending.id.as_str(), "one");
    assert_eq!(ending.episode_id.as_str(), "e1");

    // Re-reading the session shows the plain node view
    let again = uc.get_session(&start.session_id, None).await.unwrap();
    assert!(!again.is_episode_end);
    assert!(again.episode_ending.is_none());
}

#[tokio::test]
async fn gauges_stay_clamped_after_every_ending() {
    let endings = json!([{"id": "swing", "title": "Swing", "condition": "",
                          "gaugeChanges": {"trust": 40, "courage": -70}}]);
    let uc = playback(story(
        vec![
            episode(1, endings.clone()),
            episode(2, endings.clone()),
            episode(3, endings),
        ],
        json!([]),
    ));
    let start = uc.start_session(&tale(), None).await.unwrap();

    let expected = [(90, 0), (100, 0), (100, 0)];
    for (trust, courage) in expected {
        let view = uc.submit_choice(&start.session_id, 1, None).await.unwrap();
        for value in view.gauge_states.values() {
            assert!((0..=100).contains(value));
        }
        assert_eq!(view.gauge_states["trust"], trust);
        assert_eq!(view.gauge_states["courage"], courage);
    }
}

#[tokio::test]
async fn threshold_ending_applies_its_delta() {
    let uc = playback(story(
        vec![
            episode(
                1,
                json!([{"id": "boost", "title": "Boost", "condition": "", "gaugeChanges": {"trust": 25}}]),
            ),
            episode(
                2,
                json!([
                    {"id": "r1", "title": "R1", "condition": "#trust>=70", "gaugeChanges": {"trust": 10}},
                    {"id": "r2", "title": "R2", "condition": ""}
                ]),
            ),
        ],
        json!([]),
    ));
    let start = uc.start_session(&tale(), None).await.unwrap();
    let mid = uc.submit_choice(&start.session_id, 1, None).await.unwrap();
    assert_eq!(mid.gauge_states["trust"], 75);

    let end = uc.submit_choice(&start.session_id, 1, None).await.unwrap();
    assert_eq!(end.episode_ending.unwrap().id.as_str(), "r1");
    assert_eq!(end.gauge_states["trust"], 85);
}

#[tokio::test]
async fn leaf_destination_in_last_episode_ends_game_in_one_call() {
    let finals = json!([
        {"id": "bold", "category": "a", "title": "Bold", "condition": "courage > 50"},
        {"id": "plain", "category": "b", "title": "Plain", "condition": ""}
    ]);
    let any = json!([{"id": "x", "title": "X", "condition": ""}]);
    let uc = playback(story(
        vec![
            episode(1, any.clone()),
            episode(2, any.clone()),
            episode(3, any),
        ],
        finals,
    ));
    let start = uc.start_session(&tale(), None).await.unwrap();
    uc.submit_choice(&start.session_id, 1, None).await.unwrap();
    let third = uc.submit_choice(&start.session_id, 1, None).await.unwrap();
    assert_eq!(third.episode_order, 3);

    let hall = uc.submit_choice(&start.session_id, 0, None).await.unwrap();
    assert!(!hall.is_game_end);

    let end = uc.submit_choice(&start.session_id, 0, None).await.unwrap();
    assert!(end.is_episode_end);
    assert!(end.is_game_end);
    assert!(end.choices.is_empty());
    assert!(end.intro_text.is_none());
    assert_eq!(end.node_id.as_str(), "e3-hall-end");
    let final_ending = end.final_ending.unwrap();
    assert_eq!(final_ending.id.as_str(), "plain");
    assert_eq!(final_ending.gauge_states["courage"], 50);
}

#[tokio::test]
async fn completed_session_answers_with_the_same_terminal_view() {
    let uc = playback(story(
        vec![episode(1, json!([{"id": "x", "title": "X", "condition": ""}]))],
        json!([{"id": "f", "category": "c", "title": "F", "condition": ""}]),
    ));
    let start = uc.start_session(&tale(), None).await.unwrap();
    let done = uc.submit_choice(&start.session_id, 1, None).await.unwrap();

    let first = uc.submit_choice(&start.session_id, 0, None).await.unwrap();
    let second = uc.submit_choice(&start.session_id, 7, None).await.unwrap();

    assert_eq!(first, done);
    assert_eq!(second, done);
    assert_eq!(second.final_ending.unwrap().id.as_str(), "f");
}

#[tokio::test]
async fn invalid_choice_index_leaves_session_unchanged() {
    let uc = playback(story(vec![episode(1, json!([]))], json!([])));
    let start = uc.start_session(&tale(), None).await.unwrap();
    let before = uc.get_session(&start.session_id, None).await.unwrap();

    let err = uc.submit_choice(&start.session_id, 5, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.http_status(), 400);

    let after = uc.get_session(&start.session_id, None).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn anonymous_sessions_are_open_to_everyone() {
    let uc = playback(story(vec![episode(1, json!([]))], json!([])));
    let anonymous = uc.start_session(&tale(), None).await.unwrap();

    let bob = UserId::from("bob");
    let view = uc
        .get_session(&anonymous.session_id, Some(&bob))
        .await
        .unwrap();
    assert_eq!(view.session_id, anonymous.session_id);
}

#[tokio::test]
async fn owned_sessions_reject_other_users() {
    let uc = playback(story(vec![episode(1, json!([]))], json!([])));
    let alice = UserId::from("alice");
    let owned = uc.start_session(&tale(), Some(&alice)).await.unwrap();

    let bob = UserId::from("bob");
    let err = uc
        .submit_choice(&owned.session_id, 0, Some(&bob))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.http_status(), 403);

    let err = uc.get_session(&owned.session_id, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    assert!(uc.get_session(&owned.session_id, Some(&alice)).await.is_ok());
}

#[tokio::test]
async fn final_ending_lookup_follows_completion() {
    let uc = playback(story(
        vec![episode(1, json!([]))],
        json!([{"id": "f", "category": "c", "title": "F", "condition": "trust < 0"}]),
    ));
    let start = uc.start_session(&tale(), None).await.unwrap();

    let err = uc
        .get_final_ending(&start.session_id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    uc.submit_choice(&start.session_id, 1, None).await.unwrap();
    let ending = uc.get_final_ending(&start.session_id, None).await.unwrap();
    assert_eq!(ending.id.as_str(), "f");
    assert_eq!(ending.gauge_states["trust"], 50);
}

#[tokio::test]
async fn story_without_final_endings_completes_without_one() {
    let uc = playback(story(vec![episode(1, json!([]))], json!([])));
    let start = uc.start_session(&tale(), None).await.unwrap();

    let end = uc.submit_choice(&start.session_id, 1, None).await.unwrap();
    assert!(end.is_game_end);
    assert!(end.final_ending.is_none());
    assert!(end.episode_ending.is_none());

    let err = uc
        .get_final_ending(&start.session_id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn sessions_are_listed_per_owner_and_purged() {
    let uc = playback(story(vec![episode(1, json!([]))], json!([])));
    let alice = UserId::from("alice");
    let bob = UserId::from("bob");

    let first = uc.start_session(&tale(), Some(&alice)).await.unwrap();
    uc.start_session(&tale(), Some(&alice)).await.unwrap();
    uc.start_session(&tale(), Some(&bob)).await.unwrap();
    uc.start_session(&tale(), None).await.unwrap();

    let listed = uc.list_sessions(&alice, &tale()).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|s| !s.is_completed));

    let err = uc
        .purge_session(&first.session_id, Some(&bob))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    uc.purge_session(&first.session_id, Some(&alice))
        .await
        .unwrap();
    assert_eq!(uc.list_sessions(&alice, &tale()).await.unwrap().len(), 1);

    let err = uc
        .get_session(&first.session_id, Some(&alice))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn whole_identifiers_are_substituted() {
    use storyplay::domain::{Environment, evaluate_condition};

    let env = Environment::from([("love".to_string(), 5), ("lovely".to_string(), 99)]);
    assert!(!evaluate_condition("#love >= 10", &env));
    assert!(evaluate_condition("#lovely >= 10 AND love == 5", &env));
}
