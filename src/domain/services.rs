//! Domain services - Complex business logic that doesn't naturally fit in entities

use crate::domain::condition::{Environment, evaluate_condition};
use crate::domain::entities::{Episode, EpisodeEnding, FinalEnding, GameSession, StoryGraph};
use crate::domain::errors::DomainError;
use crate::domain::value_objects::{GaugeBounds, GaugeStates, SessionId, UserId};

/// Rules selected by first match with a first-declared fallback
pub trait ConditionalRule {
    fn condition(&self) -> &str;
}

impl ConditionalRule for EpisodeEnding {
    fn condition(&self) -> &str {
        &self.condition
    }
}

impl ConditionalRule for FinalEnding {
    fn condition(&self) -> &str {
        &self.condition
    }
}

/// First rule whose condition holds, else the first declared rule
///
/// Only an empty rule list yields `None`.
pub fn select_rule<'a, R: ConditionalRule>(rules: &'a [R], env: &Environment) -> Option<&'a R> {
    rules
        .iter()
        .find(|rule| evaluate_condition(rule.condition(), env))
        .or_else(|| rules.first())
}

/// Outcome of a successful choice submission
#[derive(Debug, Clone, PartialEq)]
pub enum Transition<'g> {
    /// Moved to a node that still offers choices
    Advanced,
    /// An episode finished and the next episode's root was entered
    EpisodeEnded { ending: Option<&'g EpisodeEnding> },
    /// The last episode finished; the session is now completed
    GameEnded {
        episode_ending: Option<&'g EpisodeEnding>,
        final_ending: Option<&'g FinalEnding>,
    },
    /// The session was already completed and was left untouched
    AlreadyCompleted,
}

/// Transition function of a play session over a story graph
///
/// The state machine never persists anything and never locks a session;
/// callers load, apply, and save. Failed transitions leave the session
/// exactly as it was.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    initial_gauge_value: i32,
    bounds: GaugeBounds,
}

impl SessionStateMachine {
    pub fn new(initial_gauge_value: i32, bounds: GaugeBounds) -> Self {
        Self {
            initial_gauge_value,
            bounds,
        }
    }

    pub fn bounds(&self) -> GaugeBounds {
        self.bounds
    }

    /// Create a session positioned at the root of episode #1
    pub fn start(
        &self,
        graph: &StoryGraph,
        id: SessionId,
        user: Option<UserId>,
    ) -> Result<GameSession, DomainError> {
        let episode = graph.first_episode()?;
        let root = graph.root_node(episode)?;

        let gauges: GaugeStates = graph
            .gauges()
            .iter()
            .map(|g| (g.id.clone(), self.initial_gauge_value))
            .collect();

        log::debug!(
            "Starting session {id} on story {} at node {}",
            graph.id(),
            root.id()
        );

        Ok(GameSession::start(
            id,
            user,
            graph.id().clone(),
            episode.id().clone(),
            root.id().clone(),
            gauges,
        ))
    }

    /// Apply the choice at `choice_index` of the current node
    pub fn make_choice<'g>(
        &self,
        graph: &'g StoryGraph,
        session: &mut GameSession,
        choice_index: usize,
    ) -> Result<Transition<'g>, DomainError> {
        if session.is_completed() {
            return Ok(Transition::AlreadyCompleted);
        }

        let episode = graph.episode(session.current_episode_id())?;
        let node = graph.node(session.current_node_id())?;
        let choices = graph.choices_of(node);
        let mut draft = session.clone();

        let transition = if choices.is_empty() {
            log::debug!(
                "Session {} is parked on leaf {}, resolving episode end",
                session.id(),
                node.id()
            );
            self.finish_episode(graph, episode, &mut draft)?
        } else {
            let choice = choices
                .get(choice_index)
                .ok_or(DomainError::InvalidChoiceIndex {
                    index: choice_index,
                    available: choices.len(),
                })?;

            draft.accumulate_tags(choice.tags());

            match choice.destination() {
                Some(destination) => {
                    let next = graph.node(destination)?;
                    draft.move_to(next.id().clone());
                    if next.is_leaf() {
                        self.finish_episode(graph, episode, &mut draft)?
                    } else {
                        Transition::Advanced
                    }
                }
                None => self.finish_episode(graph, episode, &mut draft)?,
            }
        };

        *session = draft;
        Ok(transition)
    }

    fn finish_episode<'g>(
        &self,
        graph: &'g StoryGraph,
        episode: &'g Episode,
        session: &mut GameSession,
    ) -> Result<Transition<'g>, DomainError> {
        let ending = select_rule(episode.endings(), &session.condition_environment());
        if let Some(ending) = ending {
            session.apply_gauge_changes(&ending.gauge_changes, self.bounds);
        }
        session.complete_episode(episode.id().clone(), ending.map(|e| e.id.clone()));

        log::debug!(
            "Session {} finished episode {} with ending {:?}",
            session.id(),
            episode.id(),
            ending.map(|e| e.id.as_str())
        );

        match graph.next_episode(episode) {
            Some(next) => {
                let root = graph.root_node(next)?;
                session.enter_episode(next.id().clone(), root.id().clone());
                Ok(Transition::EpisodeEnded { ending })
            }
            None => Ok(self.finish_game(graph, session, ending)),
        }
    }

    fn finish_game<'g>(
        &self,
        graph: &'g StoryGraph,
        session: &mut GameSession,
        episode_ending: Option<&'g EpisodeEnding>,
    ) -> Transition<'g> {
        let final_ending = select_rule(graph.final_endings(), session.gauge_states());
        session.finish(final_ending.map(|f| f.id.clone()));

        log::info!(
            "Session {} completed story {} with final ending {:?}",
            session.id(),
            graph.id(),
            final_ending.map(|f| f.id.as_str())
        );

        Transition::GameEnded {
            episode_ending,
            final_ending,
        }
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new(50, GaugeBounds::default())
    }
}
