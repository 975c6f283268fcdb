//! Model configuration document
//!
//! A model is described by a small YAML file next to its weights:
//!
//! ```yaml
//! name: animals10-resnet18
//! source:
//!   type: local
//!   path: ./models/animals10.safetensors
//! architecture:
//!   type: resnet18
//! labels: [butterfly, cat, chicken, cow, dog, elephant, horse, sheep, spider, squirrel]
//! ```

use pawprint_core::{ClassLabels, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a single image classification model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name
    #[serde(default = "default_name")]
    pub name: String,

    /// Model version
    #[serde(default = "default_version")]
    pub version: String,

    /// Where the weights live
    pub source: ModelSource,

    /// Network architecture the weights belong to
    pub architecture: ArchitectureConfig,

    /// Class names in output order
    #[serde(default)]
    pub labels: ClassLabels,

    /// Image preprocessing
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,

    /// Inference settings
    #[serde(default)]
    pub inference: InferenceConfig,
}

fn default_name() -> String {
    "animals10".to_string()
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Model source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSource {
    /// Load from local filesystem
    Local { path: PathBuf },

    /// Download from HuggingFace Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_weights_file")]
        filename: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

fn default_weights_file() -> String {
    "model.safetensors".to_string()
}

fn default_revision() -> String {
    "main".to_string()
}

/// Supported network architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ArchitectureConfig {
    Resnet18,
    Resnet34,
    Resnet50,
    Resnet101,
    Resnet152,
    Efficientnet {
        #[serde(default)]
        variant: EfficientNetVariant,
    },
}

/// EfficientNet size variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EfficientNetVariant {
    #[default]
    B0,
    B1,
    B2,
    B3,
    B4,
    B5,
    B6,
    B7,
}

/// How pixel values are scaled before the forward pass
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    /// `pixel / 255`, what the Keras-trained weights expect
    #[default]
    UnitRange,
    /// `(pixel / 255 - mean) / std` with ImageNet statistics
    Imagenet,
    /// Raw 0-255 values as floats
    Raw,
}

/// Resize filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    #[default]
    Nearest,
    Bilinear,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

/// Preprocessing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    #[serde(default = "default_side")]
    pub width: u32,

    #[serde(default = "default_side")]
    pub height: u32,

    #[serde(default)]
    pub filter: ResizeFilter,

    #[serde(default)]
    pub normalization: Normalization,
}

fn default_side() -> u32 {
    224
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            width: default_side(),
            height: default_side(),
            filter: ResizeFilter::default(),
            normalization: Normalization::default(),
        }
    }
}

/// Inference configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Device to run on (cpu, cuda, cuda:N, metal, metal:N)
    #[serde(default = "default_device")]
    pub device: String,

    /// Apply softmax to the network output. Disable for weights exported
    /// with a softmax head already folded in.
    #[serde(default = "default_true")]
    pub apply_softmax: bool,
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            apply_softmax: true,
        }
    }
}

impl ModelConfig {
    /// Config for local weights with every other setting defaulted
    pub fn local(path: impl Into<PathBuf>, architecture: ArchitectureConfig) -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            source: ModelSource::Local { path: path.into() },
            architecture,
            labels: ClassLabels::default(),
            preprocessing: PreprocessingConfig::default(),
            inference: InferenceConfig::default(),
        }
    }

    /// Parse from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid model config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file.
    ///
    /// A relative local weights path is resolved against the config file's
    /// directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read model config {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_yaml_str(&content)?;

        if let ModelSource::Local { path: weights } = &mut config.source {
            if weights.is_relative() {
                if let Some(dir) = path.parent() {
                    *weights = dir.join(&*weights);
                }
            }
        }

        Ok(config)
    }

    /// Check the settings that serde alone cannot
    pub fn validate(&self) -> Result<()> {
        if self.preprocessing.width == 0 || self.preprocessing.height == 0 {
            return Err(Error::config(format!(
                "preprocessing size must be non-zero, got {}x{}",
                self.preprocessing.width, self.preprocessing.height
            )));
        }
        if self.name.trim().is_empty() {
            return Err(Error::config("model name is blank"));
        }
        Ok(())
    }

    /// Labels in network output order
    pub fn class_labels(&self) -> &ClassLabels {
        &self.labels
    }

    /// Local weights path, if the source is local
    pub fn local_path(&self) -> Option<&Path> {
        match &self.source {
            ModelSource::Local { path } => Some(path),
            ModelSource::HuggingFace { .. } => None,
        }
    }
}
