//! Model loading for Candle-based image classifiers

use crate::candle_classifier::CandleImageClassifier;
use crate::classifier::{ImageClassifier, ModelLoader};
use crate::model_config::{ArchitectureConfig, EfficientNetVariant, ModelConfig, ModelSource};
use async_trait::async_trait;
use candle_core::{DType, Device, Module};
use candle_nn::VarBuilder;
use candle_transformers::models::{efficientnet, resnet};
use pawprint_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// A network ready for forward passes
pub type Network = Box<dyn Module + Send + Sync>;

/// Device type for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// CPU inference (always available)
    Cpu,
    /// CUDA GPU inference (if available)
    Cuda(usize), // GPU index
    /// Metal (Apple Silicon)
    Metal(usize),
}

impl FromStr for DeviceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        let (kind, index) = match s.split_once(':') {
            Some((kind, idx)) => {
                let idx = idx
                    .parse::<usize>()
                    .map_err(|_| Error::config(format!("invalid device index in '{}'", s)))?;
                (kind.to_string(), idx)
            }
            None => (s.clone(), 0),
        };

        match kind.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(index)),
            "metal" | "mps" => Ok(Self::Metal(index)),
            _ => Err(Error::config(format!("unknown device '{}'", s))),
        }
    }
}

impl DeviceType {
    /// Create the Candle device
    pub fn create(self) -> Result<Device> {
        match self {
            Self::Cpu => Ok(Device::Cpu),
            Self::Cuda(idx) => Device::new_cuda(idx)
                .map_err(|e| Error::config(format!("Failed to create CUDA device: {}", e))),
            Self::Metal(idx) => Device::new_metal(idx)
                .map_err(|e| Error::config(format!("Failed to create Metal device: {}", e))),
        }
    }
}

/// Model weights file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// SafeTensors format (recommended)
    SafeTensors,
    /// PyTorch pickle format
    PyTorch,
}

impl ModelFormat {
    /// Infer the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("safetensors") => Ok(Self::SafeTensors),
            Some("pt") | Some("pth") | Some("bin") => Ok(Self::PyTorch),
            other => Err(Error::config(format!(
                "unsupported weights format {:?} for {}",
                other,
                path.display()
            ))),
        }
    }
}

/// Resolve the weights path from the configured source
pub fn resolve_model_path(config: &ModelConfig) -> Result<PathBuf> {
    match &config.source {
        ModelSource::Local { path } => {
            if !path.exists() {
                return Err(Error::config(format!("Model file not found: {}", path.display())));
            }
            Ok(path.clone())
        }
        ModelSource::HuggingFace { repo, filename, revision } => {
            download_from_hub(repo, filename, revision)
        }
    }
}

#[cfg(feature = "hub")]
fn download_from_hub(repo: &str, filename: &str, revision: &str) -> Result<PathBuf> {
    use hf_hub::{api::sync::Api, Repo, RepoType};

    info!(repo = %repo, revision = %revision, file = %filename, "Downloading weights from Hugging Face");

    let api = Api::new()
        .map_err(|e| Error::config(format!("Failed to initialize HF API: {}", e)))?;
    let repo = api.repo(Repo::with_revision(
        repo.to_string(),
        RepoType::Model,
        revision.to_string(),
    ));

    repo.get(filename)
        .map_err(|e| Error::config(format!("Failed to download model from HF: {}", e)))
}

#[cfg(not(feature = "hub"))]
fn download_from_hub(repo: &str, _filename: &str, _revision: &str) -> Result<PathBuf> {
    Err(Error::config(format!(
        "model source '{}' needs the `hub` feature",
        repo
    )))
}

/// Open the weights file as a VarBuilder
pub fn load_var_builder(path: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    match ModelFormat::from_path(path)? {
        ModelFormat::SafeTensors => {
            // SAFETY: the weights file is treated as read-only for the life of the process.
            unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device) }
                .map_err(|e| Error::config(format!("Failed to load SafeTensors: {}", e)))
        }
        ModelFormat::PyTorch => VarBuilder::from_pth(path, DType::F32, device)
            .map_err(|e| Error::config(format!("Failed to load PyTorch weights: {}", e))),
    }
}

/// Build the network graph for `architecture` with `num_classes` outputs
pub fn build_network(
    architecture: ArchitectureConfig,
    num_classes: usize,
    vb: VarBuilder<'static>,
) -> Result<Network> {
    let map_err = |e: candle_core::Error| {
        Error::config(format!("weights do not match {:?}: {}", architecture, e))
    };

    let network: Network = match architecture {
        ArchitectureConfig::Resnet18 => Box::new(resnet::resnet18(num_classes, vb).map_err(map_err)?),
        ArchitectureConfig::Resnet34 => Box::new(resnet::resnet34(num_classes, vb).map_err(map_err)?),
        ArchitectureConfig::Resnet50 => Box::new(resnet::resnet50(num_classes, vb).map_err(map_err)?),
        ArchitectureConfig::Resnet101 => {
            Box::new(resnet::resnet101(num_classes, vb).map_err(map_err)?)
        }
        ArchitectureConfig::Resnet152 => {
            Box::new(resnet::resnet152(num_classes, vb).map_err(map_err)?)
        }
        ArchitectureConfig::Efficientnet { variant } => {
            let blocks = match variant {
                EfficientNetVariant::B0 => efficientnet::MBConvConfig::b0(),
                EfficientNetVariant::B1 => efficientnet::MBConvConfig::b1(),
                EfficientNetVariant::B2 => efficientnet::MBConvConfig::b2(),
                EfficientNetVariant::B3 => efficientnet::MBConvConfig::b3(),
                EfficientNetVariant::B4 => efficientnet::MBConvConfig::b4(),
                EfficientNetVariant::B5 => efficientnet::MBConvConfig::b5(),
                EfficientNetVariant::B6 => efficientnet::MBConvConfig::b6(),
                EfficientNetVariant::B7 => efficientnet::MBConvConfig::b7(),
            };
            Box::new(efficientnet::EfficientNet::new(vb, blocks, num_classes).map_err(map_err)?)
        }
    };

    Ok(network)
}

/// Loads a [`CandleImageClassifier`] described by a [`ModelConfig`]
pub struct CandleModelLoader {
    source: ConfigSource,
}

enum ConfigSource {
    Inline(ModelConfig),
    File(PathBuf),
}

impl CandleModelLoader {
    /// Create a loader for the given configuration
    pub fn new(config: ModelConfig) -> Self {
        Self {
            source: ConfigSource::Inline(config),
        }
    }

    /// Create a loader that reads the YAML model config when `load` runs
    pub fn from_config_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ConfigSource::File(path.into()),
        }
    }

    /// Read (or clone) the model configuration
    pub fn config(&self) -> Result<ModelConfig> {
        match &self.source {
            ConfigSource::Inline(config) => Ok(config.clone()),
            ConfigSource::File(path) => ModelConfig::from_file(path),
        }
    }

    /// Blocking load: resolve weights, create the device, build the network
    pub fn load_blocking(config: &ModelConfig) -> Result<CandleImageClassifier> {
        let weights_path = resolve_model_path(config)?;
        let device = config.inference.device.parse::<DeviceType>()?.create()?;

        info!(
            model = %config.name,
            path = %weights_path.display(),
            device = %config.inference.device,
            "Loading model weights"
        );

        let vb = load_var_builder(&weights_path, &device)?;
        CandleImageClassifier::from_var_builder(config, vb, device)
    }
}

#[async_trait]
impl ModelLoader for CandleModelLoader {
    async fn load(&self) -> Result<Arc<dyn ImageClassifier>> {
        let config = self.config()?;
        let classifier = tokio::task::spawn_blocking(move || Self::load_blocking(&config))
            .await
            .map_err(|e| Error::internal(format!("model load task failed: {}", e)))??;
        Ok(Arc::new(classifier))
    }

    fn describe(&self) -> String {
        let config = match &self.source {
            ConfigSource::Inline(config) => config,
            ConfigSource::File(path) => return format!("model config {}", path.display()),
        };
        let source = match &config.source {
            ModelSource::Local { path } => path.display().to_string(),
            ModelSource::HuggingFace { repo, filename, revision } => {
                format!("hf://{}@{}/{}", repo, revision, filename)
            }
        };
        format!("{} ({:?}) from {}", config.name, config.architecture, source)
    }
}
