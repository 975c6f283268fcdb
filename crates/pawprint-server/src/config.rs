//! Server configuration
//!
//! Values are layered: built-in defaults, then the YAML file, then
//! `PAWPRINT_*` environment variables (`PAWPRINT_CORS__ENABLED=true` for
//! nested keys), then command-line flags.

use crate::cli::Cli;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Model config YAML path
    #[serde(default = "default_model_config")]
    pub model_config: PathBuf,

    /// When the model gets loaded
    #[serde(default)]
    pub load_mode: LoadMode,

    /// Largest accepted upload in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Multipart field names accepted as the image upload
    #[serde(default = "default_upload_fields")]
    pub upload_fields: Vec<String>,

    /// Upper bound for `?top_k=`
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Cross-origin settings
    #[serde(default)]
    pub cors: CorsConfig,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from file, environment and CLI overrides
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = Self::from_sources(&cli.config)?;
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the file at `path` (if present), then `PAWPRINT_*` env vars
    pub fn from_sources(path: &Path) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("PAWPRINT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("upload_fields")
                    .with_list_parse_key("cors.allowed_origins"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(listen) = &cli.listen {
            self.listen = listen.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(model_config) = &cli.model_config {
            self.model_config = model_config.clone();
        }
        if let Some(load_mode) = cli.load_mode {
            self.load_mode = load_mode;
        }
        if let Some(max_upload_bytes) = cli.max_upload_bytes {
            self.max_upload_bytes = max_upload_bytes;
        }
        if cli.cors {
            self.cors.enabled = true;
        }
        if let Some(format) = cli.log_format() {
            self.log_format = format;
        }
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_upload_bytes == 0 {
            anyhow::bail!("max_upload_bytes must be greater than zero");
        }
        if self.upload_fields.iter().all(|f| f.trim().is_empty()) {
            anyhow::bail!("upload_fields must name at least one multipart field");
        }
        if self.max_top_k == 0 {
            anyhow::bail!("max_top_k must be at least 1");
        }
        Ok(())
    }

    /// `listen:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            model_config: default_model_config(),
            load_mode: LoadMode::default(),
            max_upload_bytes: default_max_upload_bytes(),
            upload_fields: default_upload_fields(),
            max_top_k: default_max_top_k(),
            cors: CorsConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

/// When the model is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Before the listener is bound; startup fails if loading fails
    Eager,
    /// In a task spawned at startup; requests get 503 until it finishes
    #[default]
    Background,
    /// On the first prediction request
    Lazy,
}

impl FromStr for LoadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eager" => Ok(Self::Eager),
            "background" => Ok(Self::Background),
            "lazy" => Ok(Self::Lazy),
            other => Err(format!(
                "unknown load mode '{}', expected eager, background or lazy",
                other
            )),
        }
    }
}

/// Cross-origin settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Add CORS headers at all
    #[serde(default)]
    pub enabled: bool,

    /// Allowed origins; empty means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_model_config() -> PathBuf {
    PathBuf::from("./models/animals10.yaml")
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_upload_fields() -> Vec<String> {
    vec!["file".to_string(), "image".to_string()]
}

fn default_max_top_k() -> usize {
    5
}
