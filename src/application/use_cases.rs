//! Application use cases - High-level business operations

use crate::application::api::*;
use crate::application::services::{IllustrationRequest, MediaGateway};
use crate::domain::entities::{GameSession, StoryGraph};
use crate::domain::errors::DomainError;
use crate::domain::repositories::{
    RepositoryError, SessionIdGenerator, SessionRepository, StoryRepository,
};
use crate::domain::services::{SessionStateMachine, Transition};
use crate::domain::value_objects::{SessionId, StoryId, UserId};
use std::sync::Arc;

/// Which flavour of view a transition produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewKind {
    Current,
    EpisodeEnd,
}

/// Player-facing operations over stored sessions
///
/// Every operation is a single load, transition, save cycle. Sessions are
/// never locked; a save against a copy that someone else already advanced
/// fails with a conflict and leaves the stored session untouched.
pub struct PlaybackUseCase {
    stories: Arc<dyn StoryRepository>,
    sessions: Arc<dyn SessionRepository>,
    ids: Arc<dyn SessionIdGenerator>,
    machine: SessionStateMachine,
    media: MediaGateway,
}

impl PlaybackUseCase {
    pub fn new(
        stories: Arc<dyn StoryRepository>,
        sessions: Arc<dyn SessionRepository>,
        ids: Arc<dyn SessionIdGenerator>,
        machine: SessionStateMachine,
        media: MediaGateway,
    ) -> Self {
        Self {
            stories,
            sessions,
            ids,
            machine,
            media,
        }
    }

    pub async fn list_stories(&self) -> Result<Vec<StoryId>, ApplicationError> {
        Ok(self.stories.list_stories().await?)
    }

    /// Start a new playthrough at the root of episode #1
    pub async fn start_session(
        &self,
        story_id: &StoryId,
        user: Option<&UserId>,
    ) -> Result<SessionView, ApplicationError> {
        let graph = self.stories.load_story(story_id).await?;
        let mut session = self
            .machine
            .start(&graph, self.ids.generate(), user.cloned())?;

        let version = self.sessions.create_session(&session).await?;
        session.mark_persisted(version);

        log::info!(
            "Started session {} on story {story_id} for {}",
            session.id(),
            user.map_or("anonymous", |u| u.as_str())
        );
        self.render(&graph, &session, ViewKind::Current).await
    }

    /// Re-render the current position of a session
    pub async fn get_session(
        &self,
        session_id: &SessionId,
        user: Option<&UserId>,
    ) -> Result<SessionView, ApplicationError> {
        let session = self.load_owned(session_id, user).await?;
        let graph = self.stories.load_story(session.story_id()).await?;
        self.render(&graph, &session, ViewKind::Current).await
    }

    /// Apply a choice and persist the result
    ///
    /// Completed sessions answer with their terminal view and are not
    /// written again.
    pub async fn submit_choice(
        &self,
        session_id: &SessionId,
        choice_index: usize,
        user: Option<&UserId>,
    ) -> Result<SessionView, ApplicationError> {
        let mut session = self.load_owned(session_id, user).await?;
        let graph = self.stories.load_story(session.story_id()).await?;

        let (kind, changed) = match self.machine.make_choice(&graph, &mut session, choice_index)? {
            Transition::Advanced => (ViewKind::Current, true),
            Transition::EpisodeEnded { .. } => (ViewKind::EpisodeEnd, true),
            Transition::GameEnded { .. } => (ViewKind::Current, true),
            Transition::AlreadyCompleted => (ViewKind::Current, false),
        };

        if changed {
            let version = self.save(&session).await?;
            session.mark_persisted(version);
        }

        self.render(&graph, &session, kind).await
    }

    /// Final ending of a completed session
    pub async fn get_final_ending(
        &self,
        session_id: &SessionId,
        user: Option<&UserId>,
    ) -> Result<FinalEndingView, ApplicationError> {
        let session = self.load_owned(session_id, user).await?;
        if !session.is_completed() {
            return Err(DomainError::invalid_state(format!(
                "session {session_id} has not finished its story"
            ))
            .into());
        }

        let ending_id = session
            .final_ending_id()
            .ok_or_else(|| DomainError::not_found("final ending", session_id))?;
        let graph = self.stories.load_story(session.story_id()).await?;
        let ending = graph
            .final_ending(ending_id)
            .ok_or_else(|| DomainError::not_found("final ending", ending_id))?;

        Ok(FinalEndingView::new(ending, session.gauge_states()))
    }

    pub async fn purge_session(
        &self,
        session_id: &SessionId,
        user: Option<&UserId>,
    ) -> Result<(), ApplicationError> {
        self.load_owned(session_id, user).await?;
        self.sessions.delete_session(session_id).await?;
        log::info!("Purged session {session_id}");
        Ok(())
    }

    pub async fn list_sessions(
        &self,
        user: &UserId,
        story_id: &StoryId,
    ) -> Result<Vec<SessionSummary>, ApplicationError> {
        let sessions = self.sessions.list_sessions(user, story_id).await?;
        Ok(sessions.iter().map(SessionSummary::from).collect())
    }

    /// Mood music for the current node, warming the cache for the next ones
    pub async fn get_session_music(
        &self,
        session_id: &SessionId,
        user: Option<&UserId>,
    ) -> Result<Option<MusicRecommendation>, ApplicationError> {
        let session = self.load_owned(session_id, user).await?;
        let graph = self.stories.load_story(session.story_id()).await?;
        let node = graph.node(session.current_node_id())?;

        let music = self
            .media
            .music_for(session.story_id(), node.id(), node.text())
            .await;
        if !session.is_completed() {
            self.prefetch_next(&graph, &session)?;
        }
        Ok(music)
    }

    pub async fn clear_story_music(&self, story_id: &StoryId) -> usize {
        self.media.clear_story_music(story_id).await
    }

    async fn load_owned(
        &self,
        session_id: &SessionId,
        user: Option<&UserId>,
    ) -> Result<GameSession, ApplicationError> {
        let session = self
            .sessions
            .load_session(session_id)
            .await?
            .ok_or_else(|| DomainError::not_found("session", session_id))?;
        session.ensure_accessible_by(user)?;
        Ok(session)
    }

    async fn save(&self, session: &GameSession) -> Result<u64, ApplicationError> {
        match self.sessions.save_session(session).await {
            Ok(version) => Ok(version),
            Err(RepositoryError::VersionConflict {
                id,
                expected,
                actual,
            }) => {
                log::warn!("Rejected stale write to session {id}");
                Err(DomainError::Conflict {
                    session: id.to_string(),
                    expected,
                    actual,
                }
                .into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn prefetch_next(&self, graph: &StoryGraph, session: &GameSession) -> Result<(), DomainError> {
        let node = graph.node(session.current_node_id())?;
        let mut candidates = Vec::new();
        for choice in graph.choices_of(node) {
            if let Some(destination) = choice.destination() {
                let next = graph.node(destination)?;
                candidates.push((next.id().clone(), next.text().to_string()));
            }
        }
        // Handles are dropped on purpose; the tasks keep running.
        let _ = self.media.prefetch_music(session.story_id(), candidates);
        Ok(())
    }

    async fn render(
        &self,
        graph: &StoryGraph,
        session: &GameSession,
        kind: ViewKind,
    ) -> Result<SessionView, ApplicationError> {
        let episode = graph.episode(session.current_episode_id())?;
        let node = graph.node(session.current_node_id())?;
        let is_game_end = session.is_completed();
        let is_episode_end = is_game_end || kind == ViewKind::EpisodeEnd;

        let episode_ending = if is_episode_end {
            session
                .completed_episodes()
                .last()
                .zip(session.last_episode_ending_id())
                .and_then(|(episode_id, ending_id)| {
                    graph
                        .episode_ending(episode_id, ending_id)
                        .map(|ending| EpisodeEndingView::new(episode_id.clone(), ending))
                })
        } else {
            None
        };

        let final_ending = session
            .final_ending_id()
            .and_then(|id| graph.final_ending(id))
            .map(|ending| FinalEndingView::new(ending, session.gauge_states()));

        let choices = if is_game_end {
            Vec::new()
        } else {
            graph
                .choices_of(node)
                .into_iter()
                .enumerate()
                .map(|(index, choice)| ChoiceView::new(index, choice))
                .collect()
        };

        let intro_text = (!is_game_end
            && node.id() == episode.root_node_id()
            && !episode.intro_text().is_empty())
        .then(|| episode.intro_text().to_string());

        let illustration = self
            .media
            .illustrate(&IllustrationRequest::for_node(episode, node))
            .await;

        if !is_game_end {
            self.prefetch_next(graph, session)?;
        }

        Ok(SessionView {
            session_id: session.id().clone(),
            story_id: session.story_id().clone(),
            episode_id: episode.id().clone(),
            node_id: node.id().clone(),
            gauge_states: session.gauge_states().clone(),
            accumulated_tags: session.accumulated_tags().clone(),
            episode_title: episode.title().to_string(),
            episode_order: episode.order(),
            intro_text,
            node_text: node.text().to_string(),
            node_details: node.details().clone(),
            choices,
            illustration,
            gauges: graph.gauges().to_vec(),
            is_episode_end,
            is_game_end,
            episode_ending,
            final_ending,
        })
    }
}

/// Client-facing classification of failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Unauthorized,
    InvalidState,
    ConfigurationFault,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// HTTP status a transport layer should answer with
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidArgument => 400,
            ErrorKind::Unauthorized => 403,
            ErrorKind::InvalidState => 400,
            ErrorKind::ConfigurationFault => 500,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::Domain(e) => match e {
                DomainError::NotFound { .. } => ErrorKind::NotFound,
                DomainError::InvalidChoiceIndex { .. } => ErrorKind::InvalidArgument,
                DomainError::Unauthorized { .. } => ErrorKind::Unauthorized,
                DomainError::InvalidState { .. } => ErrorKind::InvalidState,
                DomainError::ConfigurationFault { .. } => ErrorKind::ConfigurationFault,
                DomainError::Conflict { .. } => ErrorKind::Conflict,
            },
            ApplicationError::Repository(e) => match e {
                RepositoryError::StoryNotFound { .. } | RepositoryError::SessionNotFound { .. } => {
                    ErrorKind::NotFound
                }
                RepositoryError::SessionExists { .. } | RepositoryError::VersionConflict { .. } => {
                    ErrorKind::Conflict
                }
                RepositoryError::MalformedStory { .. } | RepositoryError::InvalidFormat { .. } => {
                    ErrorKind::ConfigurationFault
                }
                RepositoryError::IoError { .. }
                | RepositoryError::SerializationError { .. }
                | RepositoryError::Unavailable { .. } => ErrorKind::Internal,
            },
        }
    }

    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }
}
