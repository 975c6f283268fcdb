//! Pawprint Classifiers
//!
//! Image classification on top of Candle.
//!
//! A request flows through three steps:
//! - decode and resize the upload ([`ImagePreprocessor`])
//! - run the network described by a [`ModelConfig`] ([`CandleImageClassifier`])
//! - map the arg-max output index to a class label
//!
//! The server only sees the [`ImageClassifier`] and [`ModelLoader`] traits, so
//! the Candle backend can be swapped for [`mock::StaticClassifier`] in tests.

pub mod candle_classifier;
pub mod classifier;
pub mod mock;
pub mod model_config;
pub mod model_loader;
pub mod preprocess;

pub use candle_classifier::CandleImageClassifier;
pub use classifier::{ClassificationResult, ImageClassifier, ModelLoader};
pub use model_config::{
    ArchitectureConfig, EfficientNetVariant, InferenceConfig, ModelConfig, ModelSource,
    Normalization, PreprocessingConfig, ResizeFilter,
};
pub use model_loader::{CandleModelLoader, DeviceType, ModelFormat};
pub use preprocess::ImagePreprocessor;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{ClassificationResult, ImageClassifier, ModelLoader};
    pub use crate::model_config::ModelConfig;
    pub use crate::model_loader::CandleModelLoader;
    pub use crate::CandleImageClassifier;
}
