//! Authoritative storage for sessions, turns, the message corpus and profiles.

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

use crate::models::{Session, Turn};
use async_trait::async_trait;
use service_core::error::AppError;

/// Persistence operations the coach needs. Every write is a single
/// idempotent-safe statement; no multi-statement transactions.
#[async_trait]
pub trait CoachRepository: Send + Sync {
    /// Record a session id; a no-op if it already exists.
    async fn insert_session(&self, session_id: &str) -> Result<(), AppError>;

    async fn session_exists(&self, session_id: &str) -> Result<bool, AppError>;

    /// Append a turn, creating the session record if it is missing.
    async fn append_turn(&self, session_id: &str, turn: &Turn) -> Result<(), AppError>;

    /// Load a session with its turns in submission order and its display name.
    async fn load_session(&self, session_id: &str) -> Result<Option<Session>, AppError>;

    /// Append a normalised user message to the corpus log.
    async fn append_message(&self, session_id: &str, message: &str) -> Result<(), AppError>;

    /// Up to `limit` most recent corpus messages, oldest first.
    async fn recent_messages(&self, limit: usize) -> Result<Vec<String>, AppError>;

    async fn upsert_username(&self, session_id: &str, username: &str) -> Result<(), AppError>;

    async fn get_username(&self, session_id: &str) -> Result<Option<String>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}
