//! Domain value objects - Immutable objects that describe aspects of the domain

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Macro to implement common traits for string wrapper types
macro_rules! impl_string_wrapper {
    ($type:ident) => {
        impl $type {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $type {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $type {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

/// Unique identifier for a story
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(String);

impl_string_wrapper!(StoryId);

/// Unique identifier for an episode
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeId(String);

impl_string_wrapper!(EpisodeId);

/// Unique identifier for a story node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl_string_wrapper!(NodeId);

/// Unique identifier for a choice edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChoiceId(String);

impl_string_wrapper!(ChoiceId);

/// Identifier shared by episode endings and final endings
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndingId(String);

impl_string_wrapper!(EndingId);

/// Unique identifier for a play session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl_string_wrapper!(SessionId);

/// Identity of an authenticated player
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl_string_wrapper!(UserId);

/// Named integer stats tracked for the whole playthrough
pub type GaugeStates = BTreeMap<String, i32>;

/// Per-episode tag occurrence counters
pub type TagCounts = BTreeMap<String, i32>;

/// Inclusive bounds a gauge value is kept within
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaugeBounds {
    pub min: i32,
    pub max: i32,
}

impl GaugeBounds {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }
}

impl Default for GaugeBounds {
    fn default() -> Self {
        Self::new(0, 100)
    }
}

/// Display definition of a gauge selected for a story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaugeDefinition {
    /// Variable name used in ending conditions and in `gaugeStates`
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(default)]
    pub min_label: String,
    #[serde(default)]
    pub max_label: String,
}

impl GaugeDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            meaning: String::new(),
            min_label: String::new(),
            max_label: String::new(),
        }
    }
}

/// Situation annotations attached to a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub situation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npc_emotions: Option<BTreeMap<String, String>>,
}
