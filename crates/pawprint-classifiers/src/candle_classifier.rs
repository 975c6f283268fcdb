//! Candle-backed image classifier

use crate::classifier::{ClassificationResult, ImageClassifier};
use crate::model_config::ModelConfig;
use crate::model_loader::{build_network, Network};
use crate::preprocess::ImagePreprocessor;
use async_trait::async_trait;
use bytes::Bytes;
use candle_core::{Device, D};
use candle_nn::VarBuilder;
use pawprint_core::{ClassLabels, Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Image classifier running a Candle network on CPU or GPU.
///
/// Cloning is cheap; clones share the loaded weights.
#[derive(Clone)]
pub struct CandleImageClassifier {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    network: Network,
    device: Device,
    preprocessor: ImagePreprocessor,
    labels: ClassLabels,
    apply_softmax: bool,
}

impl CandleImageClassifier {
    /// Build the classifier from weights already opened as a VarBuilder
    pub fn from_var_builder(
        config: &ModelConfig,
        vb: VarBuilder<'static>,
        device: Device,
    ) -> Result<Self> {
        config.validate()?;
        let network = build_network(config.architecture, config.labels.len(), vb)?;

        Ok(Self {
            inner: Arc::new(Inner {
                name: config.name.clone(),
                network,
                device,
                preprocessor: ImagePreprocessor::new(&config.preprocessing),
                labels: config.labels.clone(),
                apply_softmax: config.inference.apply_softmax,
            }),
        })
    }

    /// Synchronous classification; runs the forward pass on the caller's thread
    pub fn classify_blocking(&self, image: &[u8]) -> Result<ClassificationResult> {
        self.inner.run(image)
    }
}

impl Inner {
    fn run(&self, bytes: &[u8]) -> Result<ClassificationResult> {
        let start = Instant::now();

        let image = self.preprocessor.decode(bytes)?;
        let input = self.preprocessor.to_tensor(&image, &self.device)?;

        let logits = self
            .network
            .forward(&input)
            .map_err(|e| Error::inference(format!("forward pass failed: {}", e)))?;

        let output = if self.apply_softmax {
            candle_nn::ops::softmax(&logits, D::Minus1)
                .map_err(|e| Error::inference(format!("softmax failed: {}", e)))?
        } else {
            logits
        };

        let scores = output
            .flatten_all()
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| Error::inference(format!("failed to read model output: {}", e)))?;

        let latency_us = start.elapsed().as_micros() as u64;
        let result = ClassificationResult::from_scores(scores, &self.labels)?.with_latency_us(latency_us);

        debug!(
            model = %self.name,
            label = %result.prediction.label,
            probability = result.prediction.probability,
            latency_us,
            "Classified image"
        );

        Ok(result)
    }
}

#[async_trait]
impl ImageClassifier for CandleImageClassifier {
    async fn classify(&self, image: Bytes) -> Result<ClassificationResult> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.run(&image))
            .await
            .map_err(|e| Error::internal(format!("inference task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        &self.inner.name
    }

    fn labels(&self) -> &ClassLabels {
        &self.inner.labels
    }
}
