//! Prediction types for Pawprint

use crate::labels::ClassLabels;
use serde::{Deserialize, Serialize};

/// Winning class for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Class name
    pub label: String,

    /// Index into the model's output vector
    pub class_index: usize,

    /// Probability of the class (0.0-1.0)
    pub probability: f32,
}

impl Prediction {
    /// Probability as a percentage, rounded to two decimals
    pub fn confidence_percent(&self) -> f64 {
        to_percent(self.probability)
    }

    /// The `k` most probable labels, highest first
    pub fn top_k(scores: &[f32], labels: &ClassLabels, k: usize) -> Vec<ScoredLabel> {
        let mut ranked: Vec<(usize, f32)> = scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, s)| !s.is_nan())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        ranked
            .into_iter()
            .take(k)
            .filter_map(|(idx, probability)| {
                labels.get(idx).map(|label| ScoredLabel {
                    label: label.to_string(),
                    probability,
                })
            })
            .collect()
    }
}

/// A label with its probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    pub label: String,
    pub probability: f32,
}

impl ScoredLabel {
    /// Probability as a percentage, rounded to two decimals
    pub fn confidence_percent(&self) -> f64 {
        to_percent(self.probability)
    }
}

fn to_percent(probability: f32) -> f64 {
    let pct = (f64::from(probability) * 100.0).clamp(0.0, 100.0);
    (pct * 100.0).round() / 100.0
}
