use crate::config::{LoadMode, LogFormat};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "pawprint-server")]
#[command(author, version, about = "Classify uploaded animal photos over HTTP", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "pawprint.yaml")]
    pub config: PathBuf,

    /// Listen address
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Listen port (hosting platforms pass it as PORT)
    #[arg(short = 'P', long, env = "PORT")]
    pub port: Option<u16>,

    /// Model config YAML (weights path, architecture, labels)
    #[arg(short, long)]
    pub model_config: Option<PathBuf>,

    /// When to load the model: eager, background or lazy
    #[arg(long, value_parser = parse_load_mode)]
    pub load_mode: Option<LoadMode>,

    /// Maximum accepted upload size in bytes
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Allow cross-origin requests
    #[arg(long)]
    pub cors: bool,

    /// Serve a fixed-output classifier instead of loading weights
    #[arg(long)]
    pub mock_model: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Log format requested on the command line, if any
    pub fn log_format(&self) -> Option<LogFormat> {
        self.json_logs.then_some(LogFormat::Json)
    }

    /// Tracing filter directives. A non-empty `RUST_LOG` wins over `--verbose`.
    pub fn log_directives(&self, rust_log: Option<&str>) -> String {
        match rust_log.map(str::trim).filter(|d| !d.is_empty()) {
            Some(directives) => directives.to_string(),
            None if self.verbose => "pawprint=debug,tower_http=debug".to_string(),
            None => "pawprint=info,tower_http=warn".to_string(),
        }
    }
}

fn parse_load_mode(s: &str) -> Result<LoadMode, String> {
    s.parse()
}
