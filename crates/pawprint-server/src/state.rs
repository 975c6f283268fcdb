//! Application state and the one-shot model slot

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::metrics;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;
use pawprint_classifiers::{ImageClassifier, ModelLoader};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Where the model is in its lifecycle
#[derive(Clone)]
pub enum ModelStatus {
    /// Nothing has asked for the model yet
    Idle,
    /// A load task is running
    Loading,
    /// Loaded and serving
    Ready {
        classifier: Arc<dyn ImageClassifier>,
        loaded_at: DateTime<Utc>,
    },
    /// The load task failed; the model stays unavailable
    Failed { error: String },
}

/// Holds the classifier once it has been loaded.
///
/// The only transitions are `Idle -> Loading -> Ready | Failed`.
pub struct ModelSlot {
    status: RwLock<ModelStatus>,
}

impl ModelSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self {
            status: RwLock::new(ModelStatus::Idle),
        }
    }

    /// Move `Idle -> Loading`; false if a load already started
    pub fn begin_loading(&self) -> bool {
        let mut status = self.status.write();
        if matches!(*status, ModelStatus::Idle) {
            *status = ModelStatus::Loading;
            true
        } else {
            false
        }
    }

    /// Store a loaded classifier
    pub fn set_ready(&self, classifier: Arc<dyn ImageClassifier>) {
        *self.status.write() = ModelStatus::Ready {
            classifier,
            loaded_at: Utc::now(),
        };
    }

    /// Record a load failure
    pub fn set_failed(&self, error: impl Into<String>) {
        *self.status.write() = ModelStatus::Failed {
            error: error.into(),
        };
    }

    /// Current status
    pub fn status(&self) -> ModelStatus {
        self.status.read().clone()
    }

    /// True once a classifier is available
    pub fn is_ready(&self) -> bool {
        matches!(*self.status.read(), ModelStatus::Ready { .. })
    }

    /// The classifier, or the error a request should answer with
    pub fn classifier(&self) -> Result<Arc<dyn ImageClassifier>, ApiError> {
        match &*self.status.read() {
            ModelStatus::Ready { classifier, .. } => Ok(Arc::clone(classifier)),
            ModelStatus::Idle | ModelStatus::Loading => Err(ApiError::ModelLoading),
            ModelStatus::Failed { error } => Err(ApiError::ModelUnavailable(error.clone())),
        }
    }

    /// Health view for `/health`
    pub fn health(&self) -> HealthResponse {
        match &*self.status.read() {
            ModelStatus::Idle => HealthResponse {
                status: "idle",
                model_loaded: false,
                model_loading: false,
                model: None,
                loaded_at: None,
                error: None,
            },
            ModelStatus::Loading => HealthResponse {
                status: "loading",
                model_loaded: false,
                model_loading: true,
                model: None,
                loaded_at: None,
                error: None,
            },
            ModelStatus::Ready { classifier, loaded_at } => HealthResponse {
                status: "healthy",
                model_loaded: true,
                model_loading: false,
                model: Some(classifier.name().to_string()),
                loaded_at: Some(*loaded_at),
                error: None,
            },
            ModelStatus::Failed { error } => HealthResponse {
                status: "unhealthy",
                model_loaded: false,
                model_loading: false,
                model: None,
                loaded_at: None,
                error: Some(error.clone()),
            },
        }
    }
}

impl Default for ModelSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub model_loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,

    /// The model, once loaded
    pub slot: Arc<ModelSlot>,

    /// Produces the classifier on first load
    pub loader: Arc<dyn ModelLoader>,

    /// Prometheus handle for `/metrics`, when a recorder is installed
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: ServerConfig, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            config: Arc::new(config),
            slot: Arc::new(ModelSlot::new()),
            loader,
            metrics_handle: None,
        }
    }

    /// Attach the Prometheus handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Spawn the load task unless one already ran
    pub fn ensure_loading(&self) -> Option<JoinHandle<()>> {
        if !self.slot.begin_loading() {
            return None;
        }

        let slot = Arc::clone(&self.slot);
        let loader = Arc::clone(&self.loader);
        Some(tokio::spawn(async move {
            let load = {
                let slot = Arc::clone(&slot);
                tokio::spawn(async move { load_into(&slot, loader.as_ref()).await })
            };
            // A panicking loader must not leave the slot stuck in Loading
            if let Err(e) = load.await {
                error!(error = %e, "Model load task panicked");
                slot.set_failed(format!("model load task panicked: {}", e));
                metrics::record_model_ready(false);
            }
        }))
    }

    /// Load and wait for the outcome
    pub async fn load_now(&self) -> ModelStatus {
        if let Some(task) = self.ensure_loading() {
            if let Err(e) = task.await {
                self.slot.set_failed(format!("model load task panicked: {}", e));
            }
        }
        self.slot.status()
    }
}

async fn load_into(slot: &ModelSlot, loader: &dyn ModelLoader) {
    let description = loader.describe();
    info!(model = %description, "Loading model");
    let start = Instant::now();

    match loader.load().await {
        Ok(classifier) => {
            info!(
                model = %classifier.name(),
                classes = classifier.labels().len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Model loaded"
            );
            slot.set_ready(classifier);
            metrics::record_model_ready(true);
        }
        Err(e) => {
            error!(model = %description, error = %e, "Model failed to load");
            slot.set_failed(e.to_string());
            metrics::record_model_ready(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pawprint_classifiers::mock::{StaticClassifier, StaticModelLoader};
    use pawprint_core::ClassLabels;

    struct PanickingLoader;

    #[async_trait]
    impl ModelLoader for PanickingLoader {
        async fn load(&self) -> pawprint_core::Result<Arc<dyn ImageClassifier>> {
            panic!("corrupt weights header");
        }

        fn describe(&self) -> String {
            "panicking loader".to_string()
        }
    }

    fn classifier() -> Arc<dyn ImageClassifier> {
        Arc::new(StaticClassifier::new(ClassLabels::animals10(), 1, 0.9))
    }

    #[test]
    fn test_slot_transitions() {
        let slot = ModelSlot::new();
        assert!(matches!(slot.classifier(), Err(ApiError::ModelLoading)));
        assert_eq!(slot.health().status, "idle");

        assert!(slot.begin_loading());
        assert!(!slot.begin_loading());
        assert!(slot.health().model_loading);

        slot.set_ready(classifier());
        assert!(slot.is_ready());
        assert!(!slot.begin_loading());
        let health = slot.health();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.model.as_deref(), Some("static"));
    }

    #[test]
    fn test_failed_slot() {
        let slot = ModelSlot::new();
        slot.begin_loading();
        slot.set_failed("weights missing");

        match slot.classifier() {
            Err(ApiError::ModelUnavailable(msg)) => assert_eq!(msg, "weights missing"),
            _ => panic!("Expected unavailable model"),
        }
        assert_eq!(slot.health().status, "unhealthy");
    }

    #[tokio::test]
    async fn test_load_now_runs_once() {
        let state = AppState::new(
            ServerConfig::default(),
            Arc::new(StaticModelLoader::ready(classifier())),
        );

        assert!(matches!(state.load_now().await, ModelStatus::Ready { .. }));
        assert!(state.ensure_loading().is_none());
    }

    #[tokio::test]
    async fn test_load_failure_recorded() {
        let state = AppState::new(
            ServerConfig::default(),
            Arc::new(StaticModelLoader::failing("no weights")),
        );

        match state.load_now().await {
            ModelStatus::Failed { error } => assert!(error.contains("no weights")),
            _ => panic!("Expected failed status"),
        }
    }

    #[tokio::test]
    async fn test_panicking_load_marks_failed() {
        let state = AppState::new(ServerConfig::default(), Arc::new(PanickingLoader));

        let task = state.ensure_loading().unwrap();
        task.await.unwrap();

        match state.slot.status() {
            ModelStatus::Failed { error } => assert!(error.contains("panicked")),
            _ => panic!("Expected failed status"),
        }
        assert!(matches!(
            state.slot.classifier(),
            Err(ApiError::ModelUnavailable(_))
        ));
        assert!(state.ensure_loading().is_none());
    }
}
