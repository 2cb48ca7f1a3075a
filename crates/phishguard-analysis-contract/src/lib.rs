#![warn(missing_docs)]
//! # phishguard-analysis-contract
//!
//! ## Purpose
//! Defines the scoring service reply contract and client-side mapping helpers.
//!
//! ## Responsibilities
//! - Parse raw prediction replies into JSON objects.
//! - Normalize historically drifting reply shapes into a canonical
//!   [`ScanResult`].
//! - Bucket probabilities into UI-safe [`RiskTier`] values.
//!
//! ## Data flow
//! Raw reply body -> [`parse_prediction_reply`] -> [`normalize`] ->
//! [`classify`] for display.
//!
//! ## Ownership and lifetimes
//! Normalized values are owned structs so they outlive the network buffer.
//!
//! ## Error model
//! Undecodable bodies return [`AnalysisContractError`]. A decodable body with
//! no usable probability is not an error here; it becomes a
//! [`ScanResult::Failed`] tagged [`FailureKind::DataShape`].
//!
//! ## Security and privacy notes
//! This crate processes only model outputs. It never sees credentials.

use phishguard_core::{
    Assessment, FailureKind, Label, PHISHING_THRESHOLD, RiskTier, ScanFailure, ScanResult,
};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// Reply field names that may carry the phishing probability, in precedence order.
pub const PROBABILITY_FIELDS: [&str; 2] = ["probability", "phishing_probability"];

/// Default message for replies without a usable probability.
pub const DEFAULT_DATA_SHAPE_MESSAGE: &str =
    "The scoring service returned an unexpected response.";

/// Classifier output for one probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Binary verdict.
    pub label: Label,
    /// Risk bucket.
    pub tier: RiskTier,
    /// Probability after clamping to `[0.0, 1.0]`.
    pub probability: f64,
}

/// Clamps a probability into `[0.0, 1.0]`; non-finite values become `0.0`.
pub fn clamp_probability(probability: f64) -> f64 {
    if probability.is_finite() {
        probability.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Maps a probability to its tier. Cutoffs select the higher tier.
pub fn risk_tier(probability: f64) -> RiskTier {
    let probability = clamp_probability(probability);
    if probability >= 0.8 {
        RiskTier::Critical
    } else if probability >= 0.6 {
        RiskTier::High
    } else if probability >= 0.4 {
        RiskTier::Moderate
    } else if probability >= 0.2 {
        RiskTier::Low
    } else {
        RiskTier::VeryLow
    }
}

/// Classifies a probability into a label and tier.
pub fn classify(probability: f64) -> Classification {
    let probability = clamp_probability(probability);
    let label = if probability >= PHISHING_THRESHOLD {
        Label::Phishing
    } else {
        Label::Legitimate
    };

    Classification {
        label,
        tier: risk_tier(probability),
        probability,
    }
}

/// Normalizer with a caller-chosen data-shape message.
#[derive(Debug, Clone)]
pub struct ResponseNormalizer {
    data_shape_message: String,
}

impl ResponseNormalizer {
    /// Creates a normalizer that reports unusable replies with `message`.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            data_shape_message: message.into(),
        }
    }

    /// Normalizes a raw reply into the canonical outcome.
    ///
    /// Probability is read from the first of [`PROBABILITY_FIELDS`] holding a
    /// finite JSON number. A missing or out-of-range probability yields a
    /// [`FailureKind::DataShape`] failure instead of a substituted score.
    pub fn normalize(&self, raw: &Value) -> ScanResult {
        let Some(object) = raw.as_object() else {
            return self.data_shape_failure();
        };

        let Some(probability) = extract_probability(object) else {
            return self.data_shape_failure();
        };

        if !(0.0..=1.0).contains(&probability) {
            warn!(probability, "scoring reply probability outside [0, 1]");
            return self.data_shape_failure();
        }

        let classification = classify(probability);
        if let Some(reported) = object.get("label").and_then(Value::as_str)
            && Label::parse(reported) != Some(classification.label)
        {
            warn!(
                reported,
                derived = classification.label.as_str(),
                "scoring reply label disagrees with probability"
            );
        }

        ScanResult::Assessed(Assessment {
            label: classification.label,
            probability,
            explanation: extract_explanation(object),
        })
    }

    fn data_shape_failure(&self) -> ScanResult {
        ScanResult::Failed(ScanFailure::new(
            FailureKind::DataShape,
            self.data_shape_message.clone(),
        ))
    }
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::with_message(DEFAULT_DATA_SHAPE_MESSAGE)
    }
}

/// Normalizes a raw reply using [`DEFAULT_DATA_SHAPE_MESSAGE`].
pub fn normalize(raw: &Value) -> ScanResult {
    ResponseNormalizer::default().normalize(raw)
}

fn extract_probability(object: &Map<String, Value>) -> Option<f64> {
    PROBABILITY_FIELDS
        .iter()
        .filter_map(|field| object.get(*field).and_then(Value::as_f64))
        .find(|value| value.is_finite())
}

fn extract_explanation(object: &Map<String, Value>) -> Vec<String> {
    match object.get("explanation") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Parses a raw reply body into a JSON object.
///
/// # Errors
/// Returns [`AnalysisContractError::Decode`] for invalid JSON.
/// Returns [`AnalysisContractError::InvalidContract`] when the body is valid
/// JSON but not an object.
pub fn parse_prediction_reply(raw: &str) -> Result<Value, AnalysisContractError> {
    let parsed: Value = serde_json::from_str(raw).map_err(AnalysisContractError::Decode)?;

    if !parsed.is_object() {
        return Err(AnalysisContractError::InvalidContract(
            "prediction reply is not a JSON object".to_string(),
        ));
    }

    Ok(parsed)
}

/// Analysis contract errors.
#[derive(Debug, Error)]
pub enum AnalysisContractError {
    /// JSON decode failure.
    #[error("prediction reply decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// Parsed payload violates contract invariants.
    #[error("prediction reply contract violation: {0}")]
    InvalidContract(String),
}
