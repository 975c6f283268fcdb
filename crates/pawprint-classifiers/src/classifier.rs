//! Classifier and loader traits and common types

use async_trait::async_trait;
use bytes::Bytes;
use pawprint_core::{ClassLabels, Prediction, Result, ScoredLabel};
use std::sync::Arc;

/// Trait for all image classifiers
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Classify one encoded image (PNG, JPEG, ...)
    async fn classify(&self, image: Bytes) -> Result<ClassificationResult>;

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Labels in output-vector order
    fn labels(&self) -> &ClassLabels;
}

/// Pluggable source of the classifier the server runs.
///
/// The server calls `load` exactly once; implementations may block or
/// download as long as the work happens off the async executor.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Build the classifier
    async fn load(&self) -> Result<Arc<dyn ImageClassifier>>;

    /// Short human-readable description of what will be loaded
    fn describe(&self) -> String;
}

/// Result of classification
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    /// Arg-max class
    pub prediction: Prediction,

    /// Per-class probabilities in label order
    pub scores: Vec<f32>,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl ClassificationResult {
    /// Create a result from a probability vector
    pub fn from_scores(scores: Vec<f32>, labels: &ClassLabels) -> Result<Self> {
        let prediction = labels.resolve(&scores)?;
        Ok(Self {
            prediction,
            scores,
            latency_us: 0,
        })
    }

    /// Set the measured latency
    pub fn with_latency_us(mut self, latency_us: u64) -> Self {
        self.latency_us = latency_us;
        self
    }

    /// Ranked labels, highest probability first
    pub fn top_k(&self, labels: &ClassLabels, k: usize) -> Vec<ScoredLabel> {
        Prediction::top_k(&self.scores, labels, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_scores() {
        let labels = ClassLabels::animals10();
        let mut scores = vec![0.0; 10];
        scores[8] = 1.0;

        let result = ClassificationResult::from_scores(scores, &labels)
            .unwrap()
            .with_latency_us(42);
        assert_eq!(result.prediction.label, "spider");
        assert_eq!(result.latency_us, 42);
        assert_eq!(result.top_k(&labels, 1)[0].label, "spider");
    }

    #[test]
    fn test_from_scores_wrong_length() {
        let labels = ClassLabels::animals10();
        assert!(ClassificationResult::from_scores(vec![1.0], &labels).is_err());
    }
}
