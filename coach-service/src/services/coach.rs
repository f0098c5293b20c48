//! Turn orchestration: persist the message, pick a question, record the turn.

use crate::models::{Session, Turn};
use crate::services::clustering::ClusterService;
use crate::services::metrics;
use crate::services::repository::CoachRepository;
use crate::services::selector::{QuestionSelector, Selection};
use crate::services::session_store::SessionStore;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::instrument;

pub struct CoachService {
    repository: Arc<dyn CoachRepository>,
    sessions: Arc<SessionStore>,
    cluster: Arc<ClusterService>,
    selector: QuestionSelector,
    strict_sessions: bool,
}

impl CoachService {
    pub fn new(
        repository: Arc<dyn CoachRepository>,
        sessions: Arc<SessionStore>,
        cluster: Arc<ClusterService>,
        selector: QuestionSelector,
        strict_sessions: bool,
    ) -> Self {
        Self {
            repository,
            sessions,
            cluster,
            selector,
            strict_sessions,
        }
    }

    pub async fn create_session(&self) -> Result<String, AppError> {
        self.sessions.create_session().await
    }

    /// Handle one user message and return the coach's next question.
    #[instrument(skip(self, user_msg), fields(strategy = %self.selector.strategy()))]
    pub async fn take_turn(&self, session_id: &str, user_msg: &str) -> Result<Selection, AppError> {
        if self.strict_sessions && !self.sessions.exists(session_id).await? {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Session {} not found",
                session_id
            )));
        }

        // Every message joins the corpus before a question is chosen so the
        // clustering strategy can fit on it.
        let normalized = user_msg.to_lowercase();
        self.repository
            .append_message(session_id, &normalized)
            .await?;
        self.cluster.observe(normalized);

        let history = self.sessions.get_history(session_id).await?;
        let selection = self.selector.select(user_msg, &history).await;

        self.sessions
            .append_turn(
                session_id,
                Turn::new(user_msg, selection.question.clone(), selection.phase),
            )
            .await?;

        metrics::record_turn(
            self.selector.strategy().as_str(),
            selection.source.as_str(),
            selection.phase.as_str(),
        );
        tracing::info!(
            session_id = %session_id,
            phase = %selection.phase,
            source = selection.source.as_str(),
            "Turn recorded"
        );

        Ok(selection)
    }

    pub async fn session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        self.sessions.get_session(session_id).await
    }

    pub async fn set_username(&self, session_id: &str, username: &str) -> Result<(), AppError> {
        self.sessions.set_display_name(session_id, username).await
    }

    pub async fn get_username(&self, session_id: &str) -> Result<Option<String>, AppError> {
        self.sessions.display_name(session_id).await
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.repository.health_check().await
    }
}
