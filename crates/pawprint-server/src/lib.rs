//! Pawprint HTTP service
//!
//! Serves an upload page and a `POST /predict` endpoint that classifies an
//! uploaded photo with a model loaded once into shared state.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod static_files;
pub mod upload;

pub use app::{build_app, run_server};
pub use config::{LoadMode, LogFormat, ServerConfig};
pub use error::ApiError;
pub use state::{AppState, HealthResponse, ModelSlot, ModelStatus};
