//! Pawprint operator tools
//!
//! - `split-dataset`: turns `raw-img/<class>/*` into `train/` and `val/` trees
//! - `preflight`: checks a checkout has everything a deployment needs

pub mod cli;
pub mod dataset;
pub mod preflight;

pub use dataset::{split_dataset, ClassSplit, SplitConfig, SplitReport};
pub use preflight::{run_preflight, Check, CheckStatus, PreflightOptions, PreflightReport};
