//! Docking result types

use serde::{Deserialize, Serialize};

/// Scores strictly above this are `High` confidence.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.0;

/// Scores strictly above this (and not above the high threshold) are `Moderate`.
pub const MODERATE_CONFIDENCE_THRESHOLD: f64 = -1.5;

/// Confidence classification derived from a docking score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Moderate,
    Low,
}

impl Confidence {
    /// Classifies a docking score.
    ///
    /// Both thresholds are exclusive: `0.0` is moderate and `-1.5` is low.
    pub fn from_score(score: f64) -> Self {
        if score > HIGH_CONFIDENCE_THRESHOLD {
            Confidence::High
        } else if score > MODERATE_CONFIDENCE_THRESHOLD {
            Confidence::Moderate
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Moderate => "moderate",
            Confidence::Low => "low",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful docking run
///
/// Immutable once attached to a job. Field names match the callback wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockingResult {
    pub input_ref: String,
    pub payload: String,
    pub docking_score: f64,
    pub docking_confidence: Confidence,
    /// Raw artifact text, verbatim
    pub pose: String,
}

impl DockingResult {
    pub fn new(input_ref: String, payload: String, score: f64, pose: String) -> Self {
        Self {
            input_ref,
            payload,
            docking_score: score,
            docking_confidence: Confidence::from_score(score),
            pose,
        }
    }
}
