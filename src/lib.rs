//! # storyplay
//!
//! A playback engine for branching stories. A story is a sequence of
//! episodes, each a tree of nodes joined by choices. Choices add tags,
//! leaves trigger conditional episode endings that move gauges, and the
//! last episode closes the story with a final ending chosen from the
//! gauges.
//!
//! The library follows Clean Architecture: `domain` holds the story graph,
//! the condition evaluator and the session state machine; `application`
//! exposes the player-facing operations; `infrastructure` provides
//! repositories and caches.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use storyplay::application::DependencyContainer;
//! use storyplay::domain::StoryId;
//! use storyplay::infrastructure::{
//!     InMemoryMusicCache, InMemorySessionRepository, InMemoryStoryRepository,
//!     UuidSessionIdGenerator, build_story,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let json = r#"{
//!     "id": "demo", "title": "Demo",
//!     "gauges": [{"id": "trust", "name": "Trust"}],
//!     "episodes": [{
//!         "id": "e1", "title": "Start", "order": 1,
//!         "nodes": [
//!             {"id": "root", "depth": 0, "text": "Hello?",
//!              "choices": [{"id": "c1", "text": "Wave", "order": 1, "nextNodeId": "end"}]},
//!             {"id": "end", "depth": 1, "text": "Goodbye."}
//!         ],
//!         "endings": [{"id": "bye", "title": "Bye", "gaugeChanges": {"trust": 5}}]
//!     }]
//! }"#;
//!
//! let mut stories = InMemoryStoryRepository::new();
//! stories.add_story(build_story(json)?);
//!
//! let playback = DependencyContainer::new()
//!     .register_story_repository(Arc::new(stories))
//!     .register_session_repository(Arc::new(InMemorySessionRepository::new()))
//!     .register_session_id_generator(Arc::new(UuidSessionIdGenerator))
//!     .register_music_cache(Arc::new(InMemoryMusicCache::new()))
//!     .get_playback_use_case()
//!     .expect("all services registered");
//!
//! let view = playback.start_session(&StoryId::from("demo"), None).await?;
//! assert_eq!(view.choices[0].text, "Wave");
//!
//! let view = playback.submit_choice(&view.session_id, 0, None).await?;
//! assert!(view.is_game_end);
//! assert_eq!(view.gauge_states["trust"], 55);
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod check;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod storage;

// Stable public contracts - the main API for library users
pub use application::api::{
    ChoiceView, EpisodeEndingView, FinalEndingView, Illustration, MusicRecommendation,
    SessionSummary, SessionView,
};
pub use application::use_cases::{ApplicationError, ErrorKind, PlaybackUseCase};
pub use config::EngineConfig;
pub use domain::condition::{Condition, evaluate_condition};
pub use storage::{load, save};
