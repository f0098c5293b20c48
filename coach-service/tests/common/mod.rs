//! Common test utilities for coach-service integration tests.

use coach_service::config::{
    CoachConfig, DatabaseConfig, GenerationConfig, SelectorConfig, SessionConfig,
};
use coach_service::services::providers::mock::MockTextProvider;
use coach_service::services::providers::TextProvider;
use coach_service::services::Strategy;
use coach_service::startup::Application;
use reqwest::Client;
use serde_json::{json, Value};
use service_core::config::Config as CommonConfig;
use std::sync::{Arc, Once};
use std::time::Duration;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,coach_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// In-memory configuration listening on a random local port.
pub fn test_config(strategy: Strategy) -> CoachConfig {
    CoachConfig {
        common: CommonConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        service_name: "coach-service-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: None,
        selector: SelectorConfig {
            strategy,
            ..SelectorConfig::default()
        },
        generation: GenerationConfig {
            timeout: Duration::from_millis(200),
            ..GenerationConfig::default()
        },
        sessions: SessionConfig::default(),
    }
}

/// Configuration backed by the Postgres database named in `TEST_DATABASE_URL`.
#[allow(dead_code)]
pub fn postgres_config(strategy: Strategy) -> CoachConfig {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set to run Postgres-backed tests");

    CoachConfig {
        database: Some(DatabaseConfig {
            url,
            max_connections: 2,
            min_connections: 1,
        }),
        ..test_config(strategy)
    }
}

/// Test application wrapper.
pub struct TestApp {
    pub address: String,
    pub client: Client,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn create_session(&self) -> String {
        let body: Value = self
            .client
            .post(format!("{}/sessions", self.address))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        body["session_id"]
            .as_str()
            .expect("session_id missing")
            .to_string()
    }

    pub async fn post_turn(&self, session_id: &str, user_msg: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/turn", self.address))
            .json(&json!({ "session_id": session_id, "user_msg": user_msg }))
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Post a turn and return `(question, next_phase)`.
    pub async fn turn(&self, session_id: &str, user_msg: &str) -> (String, String) {
        let response = self.post_turn(session_id, user_msg).await;
        assert!(
            response.status().is_success(),
            "turn failed with {}",
            response.status()
        );
        let body: Value = response.json().await.expect("Failed to parse JSON");
        (
            body["question"].as_str().unwrap_or_default().to_string(),
            body["next_phase"].as_str().unwrap_or_default().to_string(),
        )
    }

    pub async fn history(&self, session_id: &str) -> Value {
        self.client
            .get(format!("{}/sessions/{}/history", self.address, session_id))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON")
    }
}

/// Spawn an in-memory application with the given strategy and a disabled
/// generation backend.
#[allow(dead_code)]
pub async fn spawn_app(strategy: Strategy) -> TestApp {
    spawn_app_with(test_config(strategy), Arc::new(MockTextProvider::disabled())).await
}

pub async fn spawn_app_with(config: CoachConfig, provider: Arc<dyn TextProvider>) -> TestApp {
    init_tracing();

    let app = Application::build_with_text_provider(config, provider)
        .await
        .expect("Failed to build application");
    let port = app.http_port();

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build client"),
    }
}
