//! PostgreSQL repository.

use super::CoachRepository;
use crate::models::{Phase, Session, Turn};
use crate::services::metrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::{Duration, Instant};
use tracing::{info, instrument};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    session_id: String,
    created_utc: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct TurnRow {
    user_msg: String,
    question: String,
    phase: String,
    created_utc: DateTime<Utc>,
}

impl TryFrom<TurnRow> for Turn {
    type Error = AppError;

    fn try_from(row: TurnRow) -> Result<Self, Self::Error> {
        let phase: Phase = row
            .phase
            .parse()
            .map_err(|e: String| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(Turn {
            user_text: row.user_msg,
            coach_question: row.question,
            phase,
            created_at: row.created_utc,
        })
    }
}

/// Map a sqlx error, counting it against `operation`.
fn db_error(operation: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        metrics::record_db_error(operation);
        AppError::DatabaseError(anyhow::anyhow!("{} failed: {}", operation, e))
    }
}

fn observe(operation: &'static str, started: Instant) {
    metrics::record_db_operation(operation, started.elapsed().as_secs_f64());
}

impl PgRepository {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "coach-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Create tables on first use.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl CoachRepository for PgRepository {
    #[instrument(skip(self))]
    async fn insert_session(&self, session_id: &str) -> Result<(), AppError> {
        let started = Instant::now();
        sqlx::query(
            "INSERT INTO coach_sessions (session_id) VALUES ($1) ON CONFLICT (session_id) DO NOTHING",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("insert_session"))?;
        observe("insert_session", started);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn session_exists(&self, session_id: &str) -> Result<bool, AppError> {
        let started = Instant::now();
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM coach_sessions WHERE session_id = $1)",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("session_exists"))?;
        observe("session_exists", started);
        Ok(exists)
    }

    #[instrument(skip(self, turn))]
    async fn append_turn(&self, session_id: &str, turn: &Turn) -> Result<(), AppError> {
        self.insert_session(session_id).await?;

        let started = Instant::now();
        sqlx::query(
            r#"
            INSERT INTO coach_turns (session_id, user_msg, question, phase, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(session_id)
        .bind(&turn.user_text)
        .bind(&turn.coach_question)
        .bind(turn.phase.as_str())
        .bind(turn.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("append_turn"))?;
        observe("append_turn", started);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let started = Instant::now();
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT session_id, created_utc FROM coach_sessions WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("load_session"))?;

        let Some(row) = row else {
            observe("load_session", started);
            return Ok(None);
        };

        let turns = sqlx::query_as::<_, TurnRow>(
            r#"
            SELECT user_msg, question, phase, created_utc
            FROM coach_turns
            WHERE session_id = $1
            ORDER BY turn_id
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load_session"))?
        .into_iter()
        .map(Turn::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        let display_name = self.get_username(session_id).await?;
        observe("load_session", started);

        Ok(Some(Session {
            session_id: row.session_id,
            display_name,
            turns,
            created_at: row.created_utc,
        }))
    }

    #[instrument(skip(self, message))]
    async fn append_message(&self, session_id: &str, message: &str) -> Result<(), AppError> {
        let started = Instant::now();
        sqlx::query("INSERT INTO user_messages (session_id, message) VALUES ($1, $2)")
            .bind(session_id)
            .bind(message)
            .execute(&self.pool)
            .await
            .map_err(db_error("append_message"))?;
        observe("append_message", started);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent_messages(&self, limit: usize) -> Result<Vec<String>, AppError> {
        let started = Instant::now();
        let messages = sqlx::query_scalar::<_, String>(
            r#"
            SELECT message FROM (
                SELECT id, message FROM user_messages ORDER BY id DESC LIMIT $1
            ) recent
            ORDER BY id ASC
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("recent_messages"))?;
        observe("recent_messages", started);
        Ok(messages)
    }

    #[instrument(skip(self, username))]
    async fn upsert_username(&self, session_id: &str, username: &str) -> Result<(), AppError> {
        let started = Instant::now();
        sqlx::query(
            r#"
            INSERT INTO user_profiles (session_id, username)
            VALUES ($1, $2)
            ON CONFLICT (session_id)
            DO UPDATE SET username = EXCLUDED.username, updated_utc = NOW()
            "#,
        )
        .bind(session_id)
        .bind(username)
        .execute(&self.pool)
        .await
        .map_err(db_error("upsert_username"))?;
        observe("upsert_username", started);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_username(&self, session_id: &str) -> Result<Option<String>, AppError> {
        let started = Instant::now();
        let username = sqlx::query_scalar::<_, String>(
            "SELECT username FROM user_profiles WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_username"))?;
        observe("get_username", started);
        Ok(username)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}
