//! Application startup and lifecycle management.

use crate::config::CoachConfig;
use crate::handlers::{health, profile, sessions, turn};
use crate::services::clustering::kmeans::KMeansConfig;
use crate::services::providers::huggingface::{HuggingFaceConfig, HuggingFaceTextProvider};
use crate::services::providers::mock::MockTextProvider;
use crate::services::providers::{GenerationParams, TextProvider};
use crate::services::selector::generative::{GenerativeQuestioner, GenerativeSettings};
use crate::services::{
    init_metrics, ClusterService, ClusterSettings, CoachRepository, CoachService,
    MemoryRepository, PgRepository, QuestionSelector, SessionStore,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: CoachConfig,
    pub coach: Arc<CoachService>,
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application, choosing the text provider from configuration.
    pub async fn build(config: CoachConfig) -> Result<Self, AppError> {
        let text_provider = text_provider_from_config(&config)?;
        Self::build_with_text_provider(config, text_provider).await
    }

    /// Build the application with an explicit text provider.
    pub async fn build_with_text_provider(
        config: CoachConfig,
        text_provider: Arc<dyn TextProvider>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let repository: Arc<dyn CoachRepository> = match &config.database {
            Some(database) => {
                let repo = PgRepository::new(
                    &database.url,
                    database.max_connections,
                    database.min_connections,
                )
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                    e
                })?;
                repo.run_migrations().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to run migrations");
                    e
                })?;
                Arc::new(repo)
            }
            None => {
                tracing::warn!("DATABASE_URL not set - sessions are kept in memory only");
                Arc::new(MemoryRepository::new())
            }
        };

        // Warm the corpus from the persisted message log.
        let seed = repository
            .recent_messages(config.selector.corpus_window)
            .await?;
        tracing::info!(messages = seed.len(), "Corpus loaded");

        let cluster = Arc::new(ClusterService::new(
            ClusterSettings {
                kmeans: KMeansConfig {
                    n_clusters: config.selector.num_clusters,
                    ..KMeansConfig::default()
                },
                refit_interval: config.selector.refit_interval,
                corpus_window: config.selector.corpus_window,
            },
            seed,
        ));

        let generator = GenerativeQuestioner::new(
            text_provider,
            GenerativeSettings {
                params: GenerationParams {
                    max_new_tokens: config.generation.max_new_tokens,
                    ..GenerationParams::default()
                },
                timeout: config.generation.timeout,
                history_window: config.generation.history_window,
            },
        );

        let selector =
            QuestionSelector::new(config.selector.strategy, Arc::clone(&cluster), generator);
        let sessions = Arc::new(SessionStore::new(
            Arc::clone(&repository),
            config.sessions.cache_capacity,
        ));
        let coach = Arc::new(CoachService::new(
            repository,
            sessions,
            cluster,
            selector,
            config.sessions.strict,
        ));

        let state = AppState {
            config: config.clone(),
            coach,
        };

        let http_addr = config.common.bind_address();
        let http_listener = TcpListener::bind(&http_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %http_addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(
            http_port = http_port,
            strategy = %config.selector.strategy,
            "Coach service listener bound"
        );

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);
        axum::serve(self.http_listener, router).await
    }
}

/// Assemble routes and middleware around the shared state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics_handler))
        .route("/sessions", post(sessions::create_session))
        .route("/sessions/:session_id/history", get(sessions::get_history))
        .route("/turn", post(turn::take_turn))
        .route("/set_username", post(profile::set_username))
        .route("/get_username/:session_id", get(profile::get_username))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

fn text_provider_from_config(config: &CoachConfig) -> Result<Arc<dyn TextProvider>, AppError> {
    let Some(endpoint) = config.generation.endpoint.clone() else {
        tracing::info!("GENERATION_ENDPOINT not set - generative strategy will fall back");
        return Ok(Arc::new(MockTextProvider::disabled()));
    };

    let provider = HuggingFaceTextProvider::new(HuggingFaceConfig {
        endpoint: endpoint.clone(),
        model: config.generation.model.clone(),
        api_key: config.generation.api_key.clone(),
        request_timeout: config.generation.timeout,
    })
    .map_err(|e| AppError::ConfigError(anyhow::anyhow!("text provider: {}", e)))?;

    tracing::info!(
        endpoint = %endpoint,
        model = %config.generation.model,
        "Initialized text generation provider"
    );
    Ok(Arc::new(provider))
}
