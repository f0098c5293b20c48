//! TF-IDF text vectorization.
//!
//! Mirrors the conventional scikit-learn defaults: lowercase input, tokens of
//! two or more word characters, raw term counts, smoothed inverse document
//! frequency (`ln((1 + n) / (1 + df)) + 1`) and L2 normalisation. The
//! vocabulary is frozen at fit time; unknown tokens are ignored on transform.

use std::collections::{BTreeMap, HashMap, HashSet};

/// A sparse feature vector: `(column, weight)` pairs sorted by column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn new(mut entries: Vec<(usize, f64)>) -> Self {
        entries.sort_by_key(|(idx, _)| *idx);
        Self { entries }
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(|(_, v)| *v == 0.0)
    }

    pub fn norm_squared(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v * v).sum()
    }

    /// Dot product against a dense vector.
    pub fn dot(&self, dense: &[f64]) -> f64 {
        self.entries
            .iter()
            .filter_map(|(idx, v)| dense.get(*idx).map(|d| d * v))
            .sum()
    }

    /// Squared Euclidean distance to a dense vector whose squared norm is known.
    pub fn distance_squared(&self, dense: &[f64], dense_norm_squared: f64) -> f64 {
        (self.norm_squared() - 2.0 * self.dot(dense) + dense_norm_squared).max(0.0)
    }
}

/// Error returned when a vectorizer cannot be fit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VectorizerError {
    #[error("empty vocabulary; documents contain no usable tokens")]
    EmptyVocabulary,
}

/// TF-IDF vectorizer fit over a fixed corpus snapshot.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learn the vocabulary and IDF weights from `documents`.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Result<Self, VectorizerError> {
        let num_docs = documents.len() as f64;

        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        for doc in documents {
            let unique: HashSet<String> = tokenize(doc.as_ref()).into_iter().collect();
            for token in unique {
                *doc_freq.entry(token).or_insert(0) += 1;
            }
        }

        if doc_freq.is_empty() {
            return Err(VectorizerError::EmptyVocabulary);
        }

        // BTreeMap iteration gives alphabetical column order.
        let mut vocabulary = HashMap::with_capacity(doc_freq.len());
        let mut idf = Vec::with_capacity(doc_freq.len());
        for (idx, (token, df)) in doc_freq.into_iter().enumerate() {
            vocabulary.insert(token, idx);
            idf.push(((1.0 + num_docs) / (1.0 + df as f64)).ln() + 1.0);
        }

        Ok(Self { vocabulary, idf })
    }

    /// Number of feature columns.
    pub fn dimension(&self) -> usize {
        self.idf.len()
    }

    /// Vectorize one document with the frozen vocabulary.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokenize(text) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();

        let norm = entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut entries {
                *v /= norm;
            }
        }

        SparseVector::new(entries)
    }

    /// Vectorize a batch of documents.
    pub fn transform_all<S: AsRef<str>>(&self, documents: &[S]) -> Vec<SparseVector> {
        documents.iter().map(|d| self.transform(d.as_ref())).collect()
    }
}

/// Lowercase and split on non-word characters, keeping tokens of 2+ chars.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}
