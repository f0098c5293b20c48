//! Question selection.
//!
//! One interface over three strategies. Whatever the active strategy, a
//! failure to produce a question degrades to the keyword rules, so
//! [`QuestionSelector::select`] always returns a non-empty question.

pub mod cluster;
pub mod generative;
pub mod keyword;

use crate::models::{Phase, Turn};
use crate::services::clustering::{ClusterError, ClusterService};
use crate::services::metrics;
use crate::services::providers::ProviderError;
use generative::GenerativeQuestioner;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Which strategy picks the next question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Keyword,
    Cluster,
    /// Clustering with a random pick among each phase's question variants.
    ClusterVaried,
    Generative,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Keyword => "keyword",
            Strategy::Cluster => "cluster",
            Strategy::ClusterVaried => "cluster_varied",
            Strategy::Generative => "generative",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyword" => Ok(Strategy::Keyword),
            "cluster" => Ok(Strategy::Cluster),
            "cluster_varied" => Ok(Strategy::ClusterVaried),
            "generative" => Ok(Strategy::Generative),
            other => Err(format!("unknown question strategy: {}", other)),
        }
    }
}

/// Which rule set produced a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Keyword,
    Cluster,
    Generative,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Keyword => "keyword",
            Source::Cluster => "cluster",
            Source::Generative => "generative",
        }
    }
}

/// The chosen question and its phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub question: String,
    pub phase: Phase,
    pub source: Source,
}

impl Selection {
    pub fn new(question: impl Into<String>, phase: Phase, source: Source) -> Self {
        Self {
            question: question.into(),
            phase,
            source,
        }
    }
}

/// Reasons a strategy could not answer. Never leaves the selector.
#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("clustering unavailable: {0}")]
    InsufficientData(#[from] ClusterError),

    #[error("cluster {0} has no phase mapping")]
    UnmappedCluster(usize),

    #[error("generation backend unavailable: {0}")]
    GenerationUnavailable(#[from] ProviderError),

    #[error("generation timed out after {0:?}")]
    GenerationTimeout(Duration),

    #[error("generation returned no usable text")]
    EmptyGeneration,

    #[error("selector task failed: {0}")]
    TaskFailed(String),
}

impl SelectorError {
    /// Label used for fallback metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            SelectorError::InsufficientData(_) => "insufficient_data",
            SelectorError::UnmappedCluster(_) => "unmapped_cluster",
            SelectorError::GenerationUnavailable(_) => "generation_unavailable",
            SelectorError::GenerationTimeout(_) => "generation_timeout",
            SelectorError::EmptyGeneration => "empty_generation",
            SelectorError::TaskFailed(_) => "task_failed",
        }
    }
}

pub struct QuestionSelector {
    strategy: Strategy,
    cluster: Arc<ClusterService>,
    generator: GenerativeQuestioner,
}

impl QuestionSelector {
    pub fn new(
        strategy: Strategy,
        cluster: Arc<ClusterService>,
        generator: GenerativeQuestioner,
    ) -> Self {
        Self {
            strategy,
            cluster,
            generator,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Choose the next question for `message`.
    ///
    /// The message is expected to be in the corpus already when clustering.
    pub async fn select(&self, message: &str, history: &[Turn]) -> Selection {
        let attempt = match self.strategy {
            Strategy::Keyword => return keyword::select(message),
            Strategy::Cluster => self.select_by_cluster(message, false).await,
            Strategy::ClusterVaried => self.select_by_cluster(message, true).await,
            Strategy::Generative => self.generator.generate(message, history).await,
        };

        match attempt {
            Ok(selection) => selection,
            Err(e) => {
                tracing::info!(
                    strategy = %self.strategy,
                    reason = e.reason(),
                    error = %e,
                    "Falling back to keyword rules"
                );
                metrics::record_fallback(e.reason());
                keyword::select(message)
            }
        }
    }

    async fn select_by_cluster(&self, message: &str, varied: bool) -> Result<Selection, SelectorError> {
        let cluster = Arc::clone(&self.cluster);
        let normalized = message.to_lowercase();

        let label = tokio::task::spawn_blocking(move || cluster.classify(&normalized))
            .await
            .map_err(|e| SelectorError::TaskFailed(e.to_string()))??;

        cluster::select(label, varied).ok_or(SelectorError::UnmappedCluster(label))
    }
}
