//! Corpus clustering used to personalise question choice.
//!
//! [`ClusterService`] owns the in-memory message corpus and the fitted
//! [`ClusterModel`]. The corpus and the model sit behind separate mutexes:
//! fits hold the model lock and work from a corpus snapshot. Callers run
//! classification on the blocking pool.

pub mod kmeans;
pub mod tfidf;

use kmeans::{KMeans, KMeansConfig};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tfidf::TfidfVectorizer;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("corpus has {available} messages, clustering needs {required}")]
    InsufficientData { available: usize, required: usize },

    #[error("corpus produced an empty vocabulary")]
    EmptyVocabulary,
}

/// Vectorizer plus centroids fit over one corpus snapshot.
#[derive(Debug, Clone)]
pub struct ClusterModel {
    vectorizer: TfidfVectorizer,
    kmeans: KMeans,
    corpus_size: usize,
}

impl ClusterModel {
    pub fn fit<S: AsRef<str>>(corpus: &[S], config: &KMeansConfig) -> Result<Self, ClusterError> {
        if corpus.len() < config.n_clusters {
            return Err(ClusterError::InsufficientData {
                available: corpus.len(),
                required: config.n_clusters,
            });
        }

        let vectorizer =
            TfidfVectorizer::fit(corpus).map_err(|_| ClusterError::EmptyVocabulary)?;
        let points = vectorizer.transform_all(corpus);
        let fit = KMeans::fit(&points, vectorizer.dimension(), config).map_err(|_| {
            ClusterError::InsufficientData {
                available: corpus.len(),
                required: config.n_clusters,
            }
        })?;

        Ok(Self {
            vectorizer,
            kmeans: fit.model,
            corpus_size: corpus.len(),
        })
    }

    /// Cluster label in `0..K` for a message.
    pub fn predict(&self, message: &str) -> usize {
        self.kmeans.predict(&self.vectorizer.transform(message))
    }

    /// Number of messages the model was fit on.
    pub fn corpus_size(&self) -> usize {
        self.corpus_size
    }
}

/// Tuning for corpus retention and refitting.
#[derive(Debug, Clone)]
pub struct ClusterSettings {
    pub kmeans: KMeansConfig,
    /// Refit after this many new messages; `0` never refits.
    pub refit_interval: usize,
    /// Maximum number of recent messages kept for fitting.
    pub corpus_window: usize,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            kmeans: KMeansConfig::default(),
            refit_interval: 25,
            corpus_window: 5000,
        }
    }
}

struct CorpusState {
    messages: VecDeque<String>,
    /// Messages ever observed, including those dropped from the window.
    observed: u64,
}

struct ModelState {
    model: Option<ClusterModel>,
    observed_at_fit: u64,
}

/// Owner of the message corpus and its cluster model.
///
/// The corpus lock is only held to append or snapshot, never across a fit,
/// so observing a message does not wait for an in-flight refit.
pub struct ClusterService {
    settings: ClusterSettings,
    corpus: Mutex<CorpusState>,
    model: Mutex<ModelState>,
}

impl ClusterService {
    /// Create the service, seeding the corpus with previously persisted messages
    /// (oldest first).
    pub fn new(settings: ClusterSettings, seed: Vec<String>) -> Self {
        let mut messages: VecDeque<String> = seed.into_iter().collect();
        while messages.len() > settings.corpus_window.max(1) {
            messages.pop_front();
        }
        let observed = messages.len() as u64;

        Self {
            settings,
            corpus: Mutex::new(CorpusState { messages, observed }),
            model: Mutex::new(ModelState {
                model: None,
                observed_at_fit: 0,
            }),
        }
    }

    fn corpus(&self) -> MutexGuard<'_, CorpusState> {
        self.corpus.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn model(&self) -> MutexGuard<'_, ModelState> {
        self.model.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a normalised message to the corpus.
    pub fn observe(&self, message: String) {
        let mut corpus = self.corpus();
        corpus.messages.push_back(message);
        corpus.observed += 1;
        while corpus.messages.len() > self.settings.corpus_window.max(1) {
            corpus.messages.pop_front();
        }
    }

    /// Assign a message to a cluster, fitting or refitting first when due.
    ///
    /// Fits run on a snapshot of the corpus. A failed refit keeps the
    /// previous model in service.
    pub fn classify(&self, message: &str) -> Result<usize, ClusterError> {
        let mut state = self.model();

        let (snapshot, observed) = {
            let corpus = self.corpus();
            let refit_due = match &state.model {
                None => true,
                Some(_) => {
                    self.settings.refit_interval > 0
                        && corpus.observed - state.observed_at_fit
                            >= self.settings.refit_interval as u64
                }
            };
            if refit_due {
                (Some(Vec::from(corpus.messages.clone())), corpus.observed)
            } else {
                (None, corpus.observed)
            }
        };

        if let Some(snapshot) = snapshot {
            match ClusterModel::fit(&snapshot, &self.settings.kmeans) {
                Ok(model) => {
                    tracing::info!(
                        corpus_size = model.corpus_size(),
                        clusters = self.settings.kmeans.n_clusters,
                        "Fitted cluster model"
                    );
                    crate::services::metrics::record_cluster_fit();
                    state.model = Some(model);
                    state.observed_at_fit = observed;
                }
                Err(e) if state.model.is_none() => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, "Cluster refit failed, keeping previous model");
                }
            }
        }

        state
            .model
            .as_ref()
            .map(|model| model.predict(message))
            .ok_or_else(|| ClusterError::InsufficientData {
                available: self.corpus_len(),
                required: self.settings.kmeans.n_clusters,
            })
    }

    pub fn corpus_len(&self) -> usize {
        self.corpus().messages.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.model().model.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(refit_interval: usize) -> ClusterSettings {
        ClusterSettings {
            refit_interval,
            ..Default::default()
        }
    }

    #[test]
    fn classify_needs_k_messages() {
        let service = ClusterService::new(settings(0), vec![]);
        service.observe("i want a promotion".to_string());
        service.observe("i think it is unfair".to_string());

        let err = service.classify("i want a promotion").unwrap_err();
        assert_eq!(
            err,
            ClusterError::InsufficientData {
                available: 2,
                required: 3
            }
        );
        assert!(!service.is_fitted());
    }

    #[test]
    fn classify_fits_lazily_once_corpus_is_large_enough() {
        let service = ClusterService::new(
            settings(0),
            vec![
                "my goal is to run a marathon".to_string(),
                "i think my manager is wrong".to_string(),
            ],
        );
        service.observe("i love painting landscapes".to_string());

        let label = service.classify("i love painting landscapes").unwrap();
        assert!(label < 3);
        assert!(service.is_fitted());
    }

    #[test]
    fn oldest_message_lands_in_cluster_zero() {
        let service = ClusterService::new(
            settings(0),
            vec![
                "goal goal marathon".to_string(),
                "assumption wrong manager".to_string(),
                "love painting colours".to_string(),
            ],
        );
        assert_eq!(service.classify("goal goal marathon").unwrap(), 0);
    }

    #[test]
    fn corpus_window_drops_oldest_messages() {
        let service = ClusterService::new(
            ClusterSettings {
                corpus_window: 2,
                ..Default::default()
            },
            vec!["one one".to_string(), "two two".to_string()],
        );
        service.observe("three three".to_string());
        assert_eq!(service.corpus_len(), 2);
    }

    #[test]
    fn empty_vocabulary_is_reported() {
        let service = ClusterService::new(
            settings(0),
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
        );
        assert_eq!(
            service.classify("a").unwrap_err(),
            ClusterError::EmptyVocabulary
        );
    }

    #[test]
    fn model_without_refit_stays_on_first_snapshot() {
        let service = ClusterService::new(
            settings(0),
            vec![
                "alpha beta".to_string(),
                "gamma delta".to_string(),
                "epsilon zeta".to_string(),
            ],
        );
        service.classify("alpha").unwrap();
        for i in 0..10 {
            service.observe(format!("message number {}", i));
        }
        service.classify("alpha").unwrap();

        let state = service.model();
        assert_eq!(state.model.as_ref().map(|m| m.corpus_size()), Some(3));
    }

    #[test]
    fn model_refits_after_interval() {
        let service = ClusterService::new(
            settings(2),
            vec![
                "alpha beta".to_string(),
                "gamma delta".to_string(),
                "epsilon zeta".to_string(),
            ],
        );
        service.classify("alpha").unwrap();
        service.observe("eta theta".to_string());
        service.observe("iota kappa".to_string());
        service.classify("alpha").unwrap();

        let state = service.model();
        assert_eq!(state.model.as_ref().map(|m| m.corpus_size()), Some(5));
    }

    #[test]
    fn observe_does_not_wait_for_an_in_flight_fit() {
        let service = std::sync::Arc::new(ClusterService::new(settings(0), vec![]));

        // Holding the model lock stands in for a fit that is still running.
        let fitting = service.model();

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let observer = std::sync::Arc::clone(&service);
        let handle = std::thread::spawn(move || {
            observer.observe("hello world".to_string());
            done_tx.send(()).unwrap();
        });

        let finished = done_rx.recv_timeout(std::time::Duration::from_secs(2));
        drop(fitting);
        handle.join().unwrap();

        assert!(finished.is_ok(), "observe blocked behind the model lock");
        assert_eq!(service.corpus_len(), 1);
    }
}
