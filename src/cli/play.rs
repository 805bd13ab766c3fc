//! CUI player mode for playing stories
//!
//! Runs a whole playthrough in the terminal through the same use case a
//! server would call, backed by in-memory repositories.

use crate::application::api::SessionView;
use crate::application::dependency_injection::DependencyContainer;
use crate::application::use_cases::{ErrorKind, PlaybackUseCase};
use crate::config::EngineConfig;
use crate::infrastructure::music_cache::InMemoryMusicCache;
use crate::infrastructure::repositories::{
    InMemorySessionRepository, InMemoryStoryRepository, SequentialSessionIdGenerator, build_story,
};
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

/// Build a local use case serving a single story file
pub async fn local_use_case(
    story_path: &Path,
    config: EngineConfig,
) -> anyhow::Result<(PlaybackUseCase, crate::domain::value_objects::StoryId)> {
    let json = tokio::fs::read_to_string(story_path).await?;
    let graph = build_story(&json)?;
    let story_id = graph.id().clone();

    let mut stories = InMemoryStoryRepository::new();
    stories.add_story(graph);

    let use_case = DependencyContainer::new()
        .with_config(config)
        .register_story_repository(Arc::new(stories))
        .register_session_repository(Arc::new(InMemorySessionRepository::new()))
        .register_session_id_generator(Arc::new(SequentialSessionIdGenerator::new("local")))
        .register_music_cache(Arc::new(InMemoryMusicCache::new()))
        .get_playback_use_case()
        .ok_or_else(|| anyhow::anyhow!("playback services are not fully registered"))?;

    Ok((use_case, story_id))
}

/// Run the player mode
pub async fn run_play(story_path: &Path, config: EngineConfig, debug: bool) -> anyhow::Result<()> {
    let (use_case, story_id) = local_use_case(story_path, config).await?;

    println!("=== storyplay ===");
    println!();
    println!("Controls:");
    println!("  1-9:   select choice");
    println!("  q:     quit");
    println!();

    let mut view = use_case.start_session(&story_id, None).await?;

    loop {
        print!("{}", render_view(&view, debug));

        if view.is_game_end {
            println!("== THE END ==");
            return Ok(());
        }

        let input = get_input("Select:")?;
        if input == "q" {
            println!("Goodbye!");
            return Ok(());
        }

        let index = match input.parse::<usize>() {
            Ok(n) if n > 0 => n - 1,
            _ => {
                println!("Invalid input. Enter a choice number or 'q'.");
                continue;
            }
        };

        match use_case.submit_choice(&view.session_id, index, None).await {
            Ok(next) => view = next,
            Err(e) if e.kind() == ErrorKind::InvalidArgument => {
                println!("Invalid choice. Enter 1-{}.", view.choices.len().max(1));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Text shown for one view
pub fn render_view(view: &SessionView, debug: bool) -> String {
    let mut out = String::new();

    if let Some(ending) = &view.episode_ending {
        let _ = writeln!(out, "*** {} ***", ending.title);
        if !ending.text.is_empty() {
            let _ = writeln!(out, "{}", ending.text);
        }
        for (gauge, delta) in &ending.gauge_changes {
            let _ = writeln!(out, "  {gauge} {delta:+}");
        }
        let _ = writeln!(out);
    }

    if let Some(final_ending) = &view.final_ending {
        let _ = writeln!(
            out,
            "=== {} [{}] ===",
            final_ending.title, final_ending.category
        );
        let _ = writeln!(out, "{}", final_ending.summary);
        let _ = writeln!(out);
        return out;
    }

    if let Some(intro) = &view.intro_text {
        let _ = writeln!(
            out,
            "[Episode {}: {}]",
            view.episode_order, view.episode_title
        );
        let _ = writeln!(out, "{intro}");
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "{}", view.node_text);
    let _ = writeln!(out);

    if !view.choices.is_empty() {
        let _ = writeln!(out, "--- Choice ---");
        for choice in &view.choices {
            let _ = writeln!(out, "{}. {}", choice.index + 1, choice.text);
        }
        let _ = writeln!(out);
    }

    if debug {
        let _ = writeln!(out, "[debug]");
        let _ = writeln!(out, "node={}", view.node_id);
        let gauges = serde_json::to_string(&view.gauge_states).unwrap_or_else(|_| "{}".into());
        let tags = serde_json::to_string(&view.accumulated_tags).unwrap_or_else(|_| "{}".into());
        let _ = writeln!(out, "gauges={gauges}");
        let _ = writeln!(out, "tags={tags}");
        let _ = writeln!(out);
    }

    out
}

/// Get user input with an optional prompt
fn get_input(prompt: &str) -> io::Result<String> {
    if !prompt.is_empty() {
        print!("{} ", prompt);
        io::stdout().flush()?;
    }

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
