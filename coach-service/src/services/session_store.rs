//! Read-through session cache over the repository.
//!
//! The repository is the single source of truth. Each cached session sits in
//! its own slot guarded by an async mutex held across the repository write,
//! so appends and loads of the same session are serialised while unrelated
//! sessions proceed independently. When the cache exceeds its capacity the
//! least recently touched idle slots are evicted in one batch.

use crate::models::{Session, Turn};
use crate::services::repository::CoachRepository;
use dashmap::DashMap;
use service_core::error::AppError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

struct SessionSlot {
    last_touched: AtomicU64,
    /// `None` until loaded from the repository.
    session: Mutex<Option<Session>>,
}

pub struct SessionStore {
    repository: Arc<dyn CoachRepository>,
    cache: DashMap<String, Arc<SessionSlot>>,
    capacity: usize,
    clock: AtomicU64,
}

impl SessionStore {
    pub fn new(repository: Arc<dyn CoachRepository>, capacity: usize) -> Self {
        Self {
            repository,
            cache: DashMap::new(),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn slot(&self, session_id: &str) -> Arc<SessionSlot> {
        let now = self.tick();
        let slot = self
            .cache
            .entry(session_id.to_string())
            .or_insert_with(|| {
                Arc::new(SessionSlot {
                    last_touched: AtomicU64::new(now),
                    session: Mutex::new(None),
                })
            })
            .clone();
        slot.last_touched.store(now, Ordering::Relaxed);
        self.evict_if_needed(session_id);
        slot
    }

    /// Once over capacity, evict the least recently touched idle slots down
    /// to a tenth below capacity.
    fn evict_if_needed(&self, keep: &str) {
        let len = self.cache.len();
        if len <= self.capacity {
            return;
        }
        let target = self.capacity - (self.capacity / 10).max(1);

        let mut idle: Vec<(u64, String)> = self
            .cache
            .iter()
            .filter(|entry| entry.key() != keep && Arc::strong_count(entry.value()) == 1)
            .map(|entry| {
                (
                    entry.value().last_touched.load(Ordering::Relaxed),
                    entry.key().clone(),
                )
            })
            .collect();
        idle.sort_unstable();

        // Slots in use are skipped; the cache may overshoot until they go idle.
        for (_, key) in idle.into_iter().take(len - target) {
            self.cache
                .remove_if(&key, |_, slot| Arc::strong_count(slot) == 1);
        }
    }

    /// Create a session with a fresh identifier.
    pub async fn create_session(&self) -> Result<String, AppError> {
        let session = Session::new();
        let session_id = session.session_id.clone();
        self.repository.insert_session(&session_id).await?;

        let slot = self.slot(&session_id);
        *slot.session.lock().await = Some(session);

        tracing::info!(session_id = %session_id, "Session created");
        Ok(session_id)
    }

    pub async fn exists(&self, session_id: &str) -> Result<bool, AppError> {
        if let Some(slot) = self.cache.get(session_id).map(|s| Arc::clone(s.value())) {
            if slot.session.lock().await.is_some() {
                return Ok(true);
            }
        }
        self.repository.session_exists(session_id).await
    }

    /// Append a turn. Unknown ids get an empty log first.
    pub async fn append_turn(&self, session_id: &str, turn: Turn) -> Result<(), AppError> {
        let slot = self.slot(session_id);
        let mut cached = slot.session.lock().await;

        self.repository.append_turn(session_id, &turn).await?;

        if let Some(session) = cached.as_mut() {
            session.append_turn(turn);
        }
        Ok(())
    }

    /// The session with its turns, loading it on a cache miss.
    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let slot = self.slot(session_id);
        let mut cached = slot.session.lock().await;

        if cached.is_none() {
            *cached = self.repository.load_session(session_id).await?;
        }
        let session = cached.clone();
        drop(cached);

        if session.is_none() {
            // Do not keep placeholders for ids that were never created.
            drop(slot);
            self.cache.remove_if(session_id, |_, slot| {
                Arc::strong_count(slot) == 1
                    && slot.session.try_lock().map(|s| s.is_none()).unwrap_or(false)
            });
        }
        Ok(session)
    }

    /// Turns in submission order; empty for unknown sessions.
    pub async fn get_history(&self, session_id: &str) -> Result<Vec<Turn>, AppError> {
        Ok(self
            .get_session(session_id)
            .await?
            .map(|s| s.turns)
            .unwrap_or_default())
    }

    /// Set the display name in the repository and refresh any cached copy.
    pub async fn set_display_name(&self, session_id: &str, name: &str) -> Result<(), AppError> {
        self.repository.upsert_username(session_id, name).await?;

        if let Some(slot) = self.cache.get(session_id).map(|s| Arc::clone(s.value())) {
            if let Some(session) = slot.session.lock().await.as_mut() {
                session.display_name = Some(name.to_string());
            }
        }
        Ok(())
    }

    pub async fn display_name(&self, session_id: &str) -> Result<Option<String>, AppError> {
        self.repository.get_username(session_id).await
    }

    /// Number of cached sessions.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
