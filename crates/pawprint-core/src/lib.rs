//! Pawprint Core
//!
//! Types shared across the Pawprint crates.
//!
//! This crate provides:
//! - The error type and result alias used by every library crate
//! - The ordered class-label list that maps model outputs to names
//! - Arg-max selection and the prediction types returned to clients

pub mod error;
pub mod labels;
pub mod types;

pub use error::{Error, Result};
pub use labels::{argmax, ClassLabels, ANIMALS10};
pub use types::{Prediction, ScoredLabel};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::labels::{argmax, ClassLabels};
    pub use crate::types::{Prediction, ScoredLabel};
}
