//! Ordered class labels and arg-max selection
//!
//! The order of a label list is a contract fixed at training time: position
//! `i` names the `i`-th entry of the model's output vector. Nothing here can
//! check that contract against the weights, but the length is verified on
//! every prediction.

use crate::types::Prediction;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The ten Animals-10 classes in training order
pub const ANIMALS10: [&str; 10] = [
    "butterfly",
    "cat",
    "chicken",
    "cow",
    "dog",
    "elephant",
    "horse",
    "sheep",
    "spider",
    "squirrel",
];

/// Non-empty, duplicate-free list of class names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    /// Build a label list, rejecting empty lists, blank names and duplicates
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::config("class label list is empty"));
        }

        let mut seen = HashSet::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(Error::config(format!("class label at index {} is blank", idx)));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::config(format!("duplicate class label '{}'", name)));
            }
        }

        Ok(Self { names })
    }

    /// The Animals-10 label set
    pub fn animals10() -> Self {
        Self {
            names: ANIMALS10.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Label at output index `idx`
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }

    /// Whether `name` is one of the labels
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Iterate over labels in output order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Turn a probability vector into the winning prediction
    pub fn resolve(&self, scores: &[f32]) -> Result<Prediction> {
        if scores.len() != self.names.len() {
            return Err(Error::inference(format!(
                "model produced {} scores but {} class labels are configured",
                scores.len(),
                self.names.len()
            )));
        }

        let (class_index, probability) = argmax(scores)
            .ok_or_else(|| Error::inference("model produced no finite scores"))?;

        Ok(Prediction {
            label: self.names[class_index].clone(),
            class_index,
            probability,
        })
    }
}

impl Default for ClassLabels {
    fn default() -> Self {
        Self::animals10()
    }
}

impl TryFrom<Vec<String>> for ClassLabels {
    type Error = Error;

    fn try_from(names: Vec<String>) -> Result<Self> {
        Self::new(names)
    }
}

impl From<ClassLabels> for Vec<String> {
    fn from(labels: ClassLabels) -> Self {
        labels.names
    }
}

/// Index and value of the largest score.
///
/// Non-finite entries are ignored and the first index wins ties. Returns
/// `None` for an empty slice or one with no finite score.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            continue;
        }
        match best {
            Some((_, current)) if score <= current => {}
            _ => best = Some((idx, score)),
        }
    }
    best
}
