//! Domain entities - Core business objects with identity and lifecycle

use crate::domain::condition::Environment;
use crate::domain::errors::*;
use crate::domain::value_objects::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Authoring hand-off format of a whole story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryDocument {
    pub id: StoryId,
    pub title: String,
    #[serde(default)]
    pub gauges: Vec<GaugeDefinition>,
    pub episodes: Vec<EpisodeDocument>,
    #[serde(default)]
    pub final_endings: Vec<FinalEnding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeDocument {
    pub id: EpisodeId,
    pub title: String,
    pub order: u32,
    #[serde(default)]
    pub intro_text: String,
    pub nodes: Vec<NodeDocument>,
    #[serde(default)]
    pub endings: Vec<EpisodeEnding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDocument {
    pub id: NodeId,
    pub depth: u32,
    pub text: String,
    #[serde(default)]
    pub details: NodeDetails,
    #[serde(default)]
    pub choices: Vec<ChoiceDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceDocument {
    pub id: ChoiceId,
    pub text: String,
    pub order: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub next_node_id: Option<NodeId>,
}

/// Conditional payload applied when an episode's leaf is reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeEnding {
    pub id: EndingId,
    pub title: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub gauge_changes: BTreeMap<String, i32>,
}

/// Conditional payload chosen from the final gauge state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalEnding {
    pub id: EndingId,
    #[serde(default)]
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    id: EpisodeId,
    title: String,
    order: u32,
    intro_text: String,
    root_node_id: NodeId,
    endings: Vec<EpisodeEnding>,
}

impl Episode {
    pub fn id(&self) -> &EpisodeId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn intro_text(&self) -> &str {
        &self.intro_text
    }

    pub fn root_node_id(&self) -> &NodeId {
        &self.root_node_id
    }

    /// Ending rules in declaration order
    pub fn endings(&self) -> &[EpisodeEnding] {
        &self.endings
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoryNode {
    id: NodeId,
    episode_id: EpisodeId,
    depth: u32,
    text: String,
    details: NodeDetails,
    choice_ids: Vec<ChoiceId>,
    parent_choice_id: Option<ChoiceId>,
}

impl StoryNode {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn episode_id(&self) -> &EpisodeId {
        &self.episode_id
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn details(&self) -> &NodeDetails {
        &self.details
    }

    /// Outgoing choice ids sorted by `choiceOrder`
    pub fn choice_ids(&self) -> &[ChoiceId] {
        &self.choice_ids
    }

    pub fn parent_choice_id(&self) -> Option<&ChoiceId> {
        self.parent_choice_id.as_ref()
    }

    pub fn is_leaf(&self) -> bool {
        self.choice_ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoryChoice {
    id: ChoiceId,
    text: String,
    order: u32,
    tags: Vec<String>,
    destination: Option<NodeId>,
}

impl StoryChoice {
    pub fn id(&self) -> &ChoiceId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn destination(&self) -> Option<&NodeId> {
        self.destination.as_ref()
    }
}

/// Read-only, id-indexed view of a story's structure
#[derive(Debug, Clone, PartialEq)]
pub struct StoryGraph {
    id: StoryId,
    title: String,
    gauges: Vec<GaugeDefinition>,
    episodes: Vec<Episode>,
    episode_index: HashMap<EpisodeId, usize>,
    nodes: HashMap<NodeId, StoryNode>,
    choices: HashMap<ChoiceId, StoryChoice>,
    final_endings: Vec<FinalEnding>,
}

impl StoryGraph {
    /// Build and validate the arena from an authoring document
    pub fn from_document(document: StoryDocument) -> Result<Self, DomainError> {
        let StoryDocument {
            id,
            title,
            gauges,
            mut episodes,
            final_endings,
        } = document;

        if episodes.is_empty() {
            return Err(DomainError::configuration_fault(format!(
                "story {id} has no episodes"
            )));
        }

        episodes.sort_by_key(|e| e.order);
        for (position, episode) in episodes.iter().enumerate() {
            let expected = position as u32 + 1;
            if episode.order != expected {
                return Err(DomainError::configuration_fault(format!(
                    "story {id}: episode {} has order {}, expected {expected}",
                    episode.id, episode.order
                )));
            }
        }

        let mut graph = Self {
            id,
            title,
            gauges,
            episodes: Vec::with_capacity(episodes.len()),
            episode_index: HashMap::new(),
            nodes: HashMap::new(),
            choices: HashMap::new(),
            final_endings,
        };

        for episode in episodes {
            graph.add_episode(episode)?;
        }

        Ok(graph)
    }

    fn add_episode(&mut self, document: EpisodeDocument) -> Result<(), DomainError> {
        let episode_id = document.id;
        if self.episode_index.contains_key(&episode_id) {
            return Err(DomainError::configuration_fault(format!(
                "duplicate episode id {episode_id}"
            )));
        }

        let mut roots = document.nodes.iter().filter(|n| n.depth == 0);
        let root_node_id = match (roots.next(), roots.next()) {
            (Some(root), None) => root.id.clone(),
            (None, _) => {
                return Err(DomainError::configuration_fault(format!(
                    "episode {episode_id} has no root node"
                )));
            }
            (Some(_), Some(_)) => {
                return Err(DomainError::configuration_fault(format!(
                    "episode {episode_id} has more than one root node"
                )));
            }
        };

        let depths: HashMap<NodeId, u32> = document
            .nodes
            .iter()
            .map(|n| (n.id.clone(), n.depth))
            .collect();
        let mut parents: HashMap<NodeId, ChoiceId> = HashMap::new();
        let mut node_ids = Vec::with_capacity(document.nodes.len());
        let mut pending = Vec::with_capacity(document.nodes.len());

        for node in document.nodes {
            if self.nodes.contains_key(&node.id) || node_ids.contains(&node.id) {
                return Err(DomainError::configuration_fault(format!(
                    "duplicate node id {}",
                    node.id
                )));
            }

            let mut choices = node.choices;
            choices.sort_by_key(|c| c.order);
            let mut choice_ids = Vec::with_capacity(choices.len());

            for choice in choices {
                if self.choices.contains_key(&choice.id) {
                    return Err(DomainError::configuration_fault(format!(
                        "duplicate choice id {}",
                        choice.id
                    )));
                }

                if let Some(destination) = &choice.next_node_id {
                    let destination_depth = depths.get(destination).ok_or_else(|| {
                        DomainError::configuration_fault(format!(
                            "choice {} points to node {destination} outside episode {episode_id}",
                            choice.id
                        ))
                    })?;
                    let child_depth = node.depth.checked_add(1).ok_or_else(|| {
                        DomainError::configuration_fault(format!(
                            "node {} at depth {} cannot have children",
                            node.id, node.depth
                        ))
                    })?;
                    if *destination_depth != child_depth {
                        return Err(DomainError::configuration_fault(format!(
                            "choice {} links depth {} to depth {destination_depth}",
                            choice.id, node.depth
                        )));
                    }
                    if let Some(existing) = parents.insert(destination.clone(), choice.id.clone())
                    {
                        return Err(DomainError::configuration_fault(format!(
                            "node {destination} is the destination of both {existing} and {}",
                            choice.id
                        )));
                    }
                }

                choice_ids.push(choice.id.clone());
                self.choices.insert(
                    choice.id.clone(),
                    StoryChoice {
                        id: choice.id,
                        text: choice.text,
                        order: choice.order,
                        tags: choice.tags,
                        destination: choice.next_node_id,
                    },
                );
            }

            node_ids.push(node.id.clone());
            pending.push(StoryNode {
                id: node.id,
                episode_id: episode_id.clone(),
                depth: node.depth,
                text: node.text,
                details: node.details,
                choice_ids,
                parent_choice_id: None,
            });
        }

        for mut node in pending {
            node.parent_choice_id = parents.remove(&node.id);
            if node.parent_choice_id.is_none() && node.id != root_node_id {
                return Err(DomainError::configuration_fault(format!(
                    "node {} in episode {episode_id} is unreachable from the root",
                    node.id
                )));
            }
            self.nodes.insert(node.id.clone(), node);
        }

        self.episode_index
            .insert(episode_id.clone(), self.episodes.len());
        self.episodes.push(Episode {
            id: episode_id,
            title: document.title,
            order: document.order,
            intro_text: document.intro_text,
            root_node_id,
            endings: document.endings,
        });

        Ok(())
    }

    pub fn id(&self) -> &StoryId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn gauges(&self) -> &[GaugeDefinition] {
        &self.gauges
    }

    /// Episodes sorted by order, starting at 1
    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn final_endings(&self) -> &[FinalEnding] {
        &self.final_endings
    }

    pub fn episode(&self, id: &EpisodeId) -> Result<&Episode, DomainError> {
        self.episode_index
            .get(id)
            .and_then(|idx| self.episodes.get(*idx))
            .ok_or_else(|| DomainError::not_found("Episode", id))
    }

    pub fn episode_by_order(&self, order: u32) -> Option<&Episode> {
        let position = order.checked_sub(1)? as usize;
        self.episodes.get(position).filter(|e| e.order == order)
    }

    pub fn first_episode(&self) -> Result<&Episode, DomainError> {
        self.episode_by_order(1).ok_or_else(|| {
            DomainError::configuration_fault(format!("story {} has no episode #1", self.id))
        })
    }

    pub fn next_episode(&self, current: &Episode) -> Option<&Episode> {
        self.episode_by_order(current.order + 1)
    }

    pub fn root_node(&self, episode: &Episode) -> Result<&StoryNode, DomainError> {
        self.nodes.get(&episode.root_node_id).ok_or_else(|| {
            DomainError::configuration_fault(format!("episode {} has no root node", episode.id))
        })
    }

    pub fn node(&self, id: &NodeId) -> Result<&StoryNode, DomainError> {
        self.nodes
            .get(id)
            .ok_or_else(|| DomainError::not_found("Node", id))
    }

    /// Outgoing choices of `node` ordered by `choiceOrder`
    pub fn choices_of(&self, node: &StoryNode) -> Vec<&StoryChoice> {
        node.choice_ids
            .iter()
            .filter_map(|id| self.choices.get(id))
            .collect()
    }

    pub fn episode_ending(&self, episode: &EpisodeId, ending: &EndingId) -> Option<&EpisodeEnding> {
        self.episode(episode)
            .ok()?
            .endings
            .iter()
            .find(|e| &e.id == ending)
    }

    pub fn final_ending(&self, id: &EndingId) -> Option<&FinalEnding> {
        self.final_endings.iter().find(|f| &f.id == id)
    }

    /// Every tag name any choice in the story can add
    pub fn tag_names(&self) -> HashSet<&str> {
        self.choices
            .values()
            .flat_map(|c| c.tags.iter().map(String::as_str))
            .collect()
    }
}

/// Lifecycle state of a play session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState<'a> {
    Active {
        episode_id: &'a EpisodeId,
        node_id: &'a NodeId,
    },
    Completed {
        final_ending_id: Option<&'a EndingId>,
    },
}

/// One player's playthrough of one story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    id: SessionId,
    user: Option<UserId>,
    story_id: StoryId,
    current_episode_id: EpisodeId,
    current_node_id: NodeId,
    gauge_states: GaugeStates,
    accumulated_tags: TagCounts,
    visited_nodes: Vec<NodeId>,
    completed_episodes: Vec<EpisodeId>,
    is_completed: bool,
    final_ending_id: Option<EndingId>,
    #[serde(default)]
    last_episode_ending_id: Option<EndingId>,
    #[serde(default)]
    version: u64,
}

impl GameSession {
    pub fn start(
        id: SessionId,
        user: Option<UserId>,
        story_id: StoryId,
        episode_id: EpisodeId,
        root_node_id: NodeId,
        gauge_states: GaugeStates,
    ) -> Self {
        Self {
            id,
            user,
            story_id,
            current_episode_id: episode_id,
            current_node_id: root_node_id.clone(),
            gauge_states,
            accumulated_tags: TagCounts::new(),
            visited_nodes: vec![root_node_id],
            completed_episodes: Vec::new(),
            is_completed: false,
            final_ending_id: None,
            last_episode_ending_id: None,
            version: 0,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    pub fn story_id(&self) -> &StoryId {
        &self.story_id
    }

    pub fn current_episode_id(&self) -> &EpisodeId {
        &self.current_episode_id
    }

    pub fn current_node_id(&self) -> &NodeId {
        &self.current_node_id
    }

    pub fn gauge_states(&self) -> &GaugeStates {
        &self.gauge_states
    }

    pub fn accumulated_tags(&self) -> &TagCounts {
        &self.accumulated_tags
    }

    pub fn visited_nodes(&self) -> &[NodeId] {
        &self.visited_nodes
    }

    pub fn completed_episodes(&self) -> &[EpisodeId] {
        &self.completed_episodes
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn final_ending_id(&self) -> Option<&EndingId> {
        self.final_ending_id.as_ref()
    }

    /// Ending applied when the most recent episode finished
    pub fn last_episode_ending_id(&self) -> Option<&EndingId> {
        self.last_episode_ending_id.as_ref()
    }

    /// Version this copy was loaded at, used for optimistic writes
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Record the version assigned by a session repository after a write
    pub fn mark_persisted(&mut self, version: u64) {
        self.version = version;
    }

    pub fn state(&self) -> SessionState<'_> {
        if self.is_completed {
            SessionState::Completed {
                final_ending_id: self.final_ending_id.as_ref(),
            }
        } else {
            SessionState::Active {
                episode_id: &self.current_episode_id,
                node_id: &self.current_node_id,
            }
        }
    }

    /// Anonymous sessions are open to anyone; owned sessions only to their owner
    pub fn ensure_accessible_by(&self, requester: Option<&UserId>) -> Result<(), DomainError> {
        match &self.user {
            Some(owner) if requester != Some(owner) => Err(DomainError::unauthorized(&self.id)),
            _ => Ok(()),
        }
    }

    /// Gauges overlaid with this episode's tag counters
    pub fn condition_environment(&self) -> Environment {
        let mut env: Environment = self.gauge_states.clone();
        env.extend(self.accumulated_tags.iter().map(|(k, v)| (k.clone(), *v)));
        env
    }

    pub(crate) fn accumulate_tags(&mut self, tags: &[String]) {
        for tag in tags {
            *self.accumulated_tags.entry(tag.clone()).or_insert(0) += 1;
        }
    }

    pub(crate) fn move_to(&mut self, node_id: NodeId) {
        self.current_node_id = node_id.clone();
        self.visited_nodes.push(node_id);
    }

    pub(crate) fn apply_gauge_changes(
        &mut self,
        changes: &BTreeMap<String, i32>,
        bounds: GaugeBounds,
    ) {
        for (gauge, delta) in changes {
            let value = self.gauge_states.entry(gauge.clone()).or_insert(0);
            *value = bounds.clamp(value.saturating_add(*delta));
        }
    }

    pub(crate) fn complete_episode(&mut self, episode_id: EpisodeId, ending_id: Option<EndingId>) {
        self.completed_episodes.push(episode_id);
        self.last_episode_ending_id = ending_id;
    }

    pub(crate) fn enter_episode(&mut self, episode_id: EpisodeId, root_node_id: NodeId) {
        self.current_episode_id = episode_id;
        self.accumulated_tags.clear();
        self.move_to(root_node_id);
    }

    pub(crate) fn finish(&mut self, final_ending_id: Option<EndingId>) {
        self.is_completed = true;
        self.final_ending_id = final_ending_id;
    }
}
