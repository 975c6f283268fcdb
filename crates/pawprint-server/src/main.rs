//! Pawprint server
//!
//! Loads the animal classifier and serves predictions over HTTP.

use anyhow::Result;
use clap::Parser;
use pawprint_classifiers::mock::{StaticClassifier, StaticModelLoader};
use pawprint_classifiers::{CandleModelLoader, ModelLoader};
use pawprint_core::ClassLabels;
use pawprint_server::cli::Cli;
use pawprint_server::{metrics, run_server, AppState, LogFormat, ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ServerConfig::load(&cli)?;
    init_tracing(&cli, config.log_format);

    info!("Starting Pawprint server");
    info!("Model config: {}", config.model_config.display());
    info!("Load mode: {:?}", config.load_mode);

    let loader: Arc<dyn ModelLoader> = if cli.mock_model {
        warn!("Serving a fixed-output mock classifier");
        Arc::new(StaticModelLoader::ready(Arc::new(
            StaticClassifier::new(ClassLabels::animals10(), 1, 0.87).with_name("mock"),
        )))
    } else {
        Arc::new(CandleModelLoader::from_config_file(config.model_config.clone()))
    };

    let metrics_handle = metrics::install()?;
    let state = AppState::new(config, loader).with_metrics(metrics_handle);

    run_server(state).await
}

fn init_tracing(cli: &Cli, format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::try_new(cli.log_directives(rust_log.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directives(None)));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
