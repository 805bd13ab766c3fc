//! Public API types - External contracts for storyplay
//!
//! This module contains all public types that external users depend on.
//! These types form the stable contract and should be changed with care.

use crate::domain::entities::{EpisodeEnding, FinalEnding, GameSession, StoryChoice};
use crate::domain::value_objects::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything a client needs to render the current point of a session
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: SessionId,
    pub story_id: StoryId,
    pub episode_id: EpisodeId,
    pub node_id: NodeId,
    pub gauge_states: GaugeStates,
    pub accumulated_tags: TagCounts,
    pub episode_title: String,
    pub episode_order: u32,
    /// Present only when an episode has just started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intro_text: Option<String>,
    pub node_text: String,
    pub node_details: NodeDetails,
    pub choices: Vec<ChoiceView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub illustration: Option<Illustration>,
    pub gauges: Vec<GaugeDefinition>,
    pub is_episode_end: bool,
    pub is_game_end: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_ending: Option<EpisodeEndingView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_ending: Option<FinalEndingView>,
}

/// A selectable choice; `index` is what `submit_choice` expects
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceView {
    pub index: usize,
    pub id: ChoiceId,
    pub text: String,
    pub tags: Vec<String>,
}

impl ChoiceView {
    pub fn new(index: usize, choice: &StoryChoice) -> Self {
        Self {
            index,
            id: choice.id().clone(),
            text: choice.text().to_string(),
            tags: choice.tags().to_vec(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeEndingView {
    pub id: EndingId,
    /// The episode this ending closed
    pub episode_id: EpisodeId,
    pub title: String,
    pub text: String,
    pub gauge_changes: BTreeMap<String, i32>,
}

impl EpisodeEndingView {
    pub fn new(episode_id: EpisodeId, ending: &EpisodeEnding) -> Self {
        Self {
            id: ending.id.clone(),
            episode_id,
            title: ending.title.clone(),
            text: ending.text.clone(),
            gauge_changes: ending.gauge_changes.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinalEndingView {
    pub id: EndingId,
    pub category: String,
    pub title: String,
    pub summary: String,
    /// Gauge values the ending was chosen from
    pub gauge_states: GaugeStates,
}

impl FinalEndingView {
    pub fn new(ending: &FinalEnding, gauge_states: &GaugeStates) -> Self {
        Self {
            id: ending.id.clone(),
            category: ending.category.clone(),
            title: ending.title.clone(),
            summary: ending.summary.clone(),
            gauge_states: gauge_states.clone(),
        }
    }
}

/// Result of the illustration collaborator
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Illustration {
    pub image_url: String,
    pub file_key: String,
}

/// Result of the music recommendation collaborator
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MusicRecommendation {
    pub mood: String,
    pub filename: String,
    pub streaming_url: String,
    pub intensity: f32,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Listing entry for a stored session
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub story_id: StoryId,
    pub episode_id: EpisodeId,
    pub completed_episodes: usize,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_ending_id: Option<EndingId>,
}

impl From<&GameSession> for SessionSummary {
    fn from(session: &GameSession) -> Self {
        Self {
            session_id: session.id().clone(),
            story_id: session.story_id().clone(),
            episode_id: session.current_episode_id().clone(),
            completed_episodes: session.completed_episodes().len(),
            is_completed: session.is_completed(),
            final_ending_id: session.final_ending_id().cloned(),
        }
    }
}
