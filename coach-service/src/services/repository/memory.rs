//! Process-local repository used when no database is configured.

use super::CoachRepository;
use crate::models::{Session, Turn};
use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    sessions: HashMap<String, Session>,
    messages: Vec<(String, String)>,
    profiles: HashMap<String, String>,
}

#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CoachRepository for MemoryRepository {
    async fn insert_session(&self, session_id: &str) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        state
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::with_id(session_id));
        Ok(())
    }

    async fn session_exists(&self, session_id: &str) -> Result<bool, AppError> {
        Ok(self.state.read().await.sessions.contains_key(session_id))
    }

    async fn append_turn(&self, session_id: &str, turn: &Turn) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        state
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::with_id(session_id))
            .append_turn(turn.clone());
        Ok(())
    }

    async fn load_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let state = self.state.read().await;
        Ok(state.sessions.get(session_id).map(|session| {
            let mut session = session.clone();
            session.display_name = state.profiles.get(session_id).cloned();
            session
        }))
    }

    async fn append_message(&self, session_id: &str, message: &str) -> Result<(), AppError> {
        self.state
            .write()
            .await
            .messages
            .push((session_id.to_string(), message.to_string()));
        Ok(())
    }

    async fn recent_messages(&self, limit: usize) -> Result<Vec<String>, AppError> {
        let state = self.state.read().await;
        let start = state.messages.len().saturating_sub(limit);
        Ok(state.messages[start..]
            .iter()
            .map(|(_, message)| message.clone())
            .collect())
    }

    async fn upsert_username(&self, session_id: &str, username: &str) -> Result<(), AppError> {
        self.state
            .write()
            .await
            .profiles
            .insert(session_id.to_string(), username.to_string());
        Ok(())
    }

    async fn get_username(&self, session_id: &str) -> Result<Option<String>, AppError> {
        Ok(self.state.read().await.profiles.get(session_id).cloned())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Phase;

    #[tokio::test]
    async fn append_turn_creates_missing_session() {
        let repo = MemoryRepository::new();
        repo.append_turn("s1", &Turn::new("hi", "What do you mean by that exactly?", Phase::Clarify))
            .await
            .unwrap();

        assert!(repo.session_exists("s1").await.unwrap());
        let session = repo.load_session("s1").await.unwrap().unwrap();
        assert_eq!(session.turns.len(), 1);
    }

    #[tokio::test]
    async fn load_session_carries_display_name() {
        let repo = MemoryRepository::new();
        repo.insert_session("s1").await.unwrap();
        repo.upsert_username("s1", "Ada").await.unwrap();
        repo.upsert_username("s1", "Grace").await.unwrap();

        let session = repo.load_session("s1").await.unwrap().unwrap();
        assert_eq!(session.display_name.as_deref(), Some("Grace"));
    }

    #[tokio::test]
    async fn recent_messages_are_oldest_first_and_bounded() {
        let repo = MemoryRepository::new();
        for i in 0..5 {
            repo.append_message("s", &format!("m{}", i)).await.unwrap();
        }
        assert_eq!(repo.recent_messages(3).await.unwrap(), vec!["m2", "m3", "m4"]);
        assert_eq!(repo.recent_messages(10).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn unknown_lookups_are_absent() {
        let repo = MemoryRepository::new();
        assert!(repo.load_session("nope").await.unwrap().is_none());
        assert!(repo.get_username("nope").await.unwrap().is_none());
    }
}
