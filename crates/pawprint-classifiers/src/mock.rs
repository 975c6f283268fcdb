//! Fixed-output classifier and loader
//!
//! `StaticClassifier` still decodes every upload with the real preprocessor,
//! so undecodable images fail exactly as they would against a real model.
//! Only the forward pass is replaced by a constant score vector.

use crate::classifier::{ClassificationResult, ImageClassifier, ModelLoader};
use crate::preprocess::ImagePreprocessor;
use async_trait::async_trait;
use bytes::Bytes;
use pawprint_core::{ClassLabels, Error, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Classifier that always returns the same scores
pub struct StaticClassifier {
    name: String,
    labels: ClassLabels,
    scores: Vec<f32>,
    preprocessor: ImagePreprocessor,
    call_count: AtomicU32,
}

impl StaticClassifier {
    /// Uniform-ish scores with `winner` taking `probability`
    pub fn new(labels: ClassLabels, winner: usize, probability: f32) -> Self {
        let n = labels.len();
        let rest = if n > 1 { (1.0 - probability) / (n - 1) as f32 } else { 0.0 };
        let scores = (0..n)
            .map(|i| if i == winner { probability } else { rest })
            .collect();
        Self::with_scores(labels, scores)
    }

    /// Explicit score vector; its length should match `labels`
    pub fn with_scores(labels: ClassLabels, scores: Vec<f32>) -> Self {
        Self {
            name: "static".to_string(),
            labels,
            scores,
            preprocessor: ImagePreprocessor::default(),
            call_count: AtomicU32::new(0),
        }
    }

    /// Set the classifier name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Get the number of times classify was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ImageClassifier for StaticClassifier {
    async fn classify(&self, image: Bytes) -> Result<ClassificationResult> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.preprocessor.decode(&image)?;
        ClassificationResult::from_scores(self.scores.clone(), &self.labels)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &ClassLabels {
        &self.labels
    }
}

/// Loader that hands out a prepared classifier.
///
/// A gated loader blocks in `load` until [`StaticModelLoader::release`] is
/// called, which lets callers observe the "still loading" window.
pub struct StaticModelLoader {
    outcome: std::result::Result<Arc<dyn ImageClassifier>, String>,
    gate: Option<Arc<Notify>>,
}

impl StaticModelLoader {
    /// Loader that succeeds immediately
    pub fn ready(classifier: Arc<dyn ImageClassifier>) -> Self {
        Self {
            outcome: Ok(classifier),
            gate: None,
        }
    }

    /// Loader that always fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            gate: None,
        }
    }

    /// Hold `load` until `release` is called
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    /// Let a pending (or the next) `load` finish
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl ModelLoader for StaticModelLoader {
    async fn load(&self) -> Result<Arc<dyn ImageClassifier>> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.outcome {
            Ok(classifier) => Ok(Arc::clone(classifier)),
            Err(message) => Err(Error::model_unavailable(message.clone())),
        }
    }

    fn describe(&self) -> String {
        "static classifier".to_string()
    }
}
