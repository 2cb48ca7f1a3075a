#![warn(missing_docs)]
//! # phishguard-core
//!
//! ## Purpose
//! Defines the pure data model used across the `phishguard` workspace.
//!
//! ## Responsibilities
//! - Represent scan inputs, identities, server-held scan records, and the
//!   tagged outcome of one scan.
//! - Define the fixed risk tier buckets.
//! - Provide the generation counter used to discard stale async results.
//!
//! ## Data flow
//! The UI edits a [`ScanInput`], submission produces a [`ScanResult`], and the
//! history backend yields [`ScanRecord`] rows that can be projected back into a
//! [`ScanInput`].
//!
//! ## Ownership and lifetimes
//! All records own their strings so they can cross async boundaries without
//! borrowing from transient network buffers.
//!
//! ## Error model
//! Decoding failures return [`CoreError`].
//!
//! ## Security and privacy notes
//! Identity values are opaque. This crate never logs scan content.
//!
//! ## Example
//! ```rust
//! use phishguard_core::{Generation, ScanInput};
//!
//! let input = ScanInput::new("  Urgent  ", "", "");
//! assert_eq!(input.trimmed().subject, "Urgent");
//! assert!(!input.is_blank());
//!
//! let mut generation = Generation::default();
//! let ticket = generation.advance();
//! assert!(generation.is_current(ticket));
//! generation.advance();
//! assert!(!generation.is_current(ticket));
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Probability at or above which a scan is labelled phishing.
pub const PHISHING_THRESHOLD: f64 = 0.5;

/// Free-text scan submission fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanInput {
    /// Email subject line.
    pub subject: String,
    /// Email body text.
    pub body: String,
    /// Suspicious URL.
    pub url: String,
}

impl ScanInput {
    /// Creates an input from the three raw fields.
    pub fn new(subject: impl Into<String>, body: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            url: url.into(),
        }
    }

    /// Returns a copy with leading/trailing whitespace removed from every field.
    pub fn trimmed(&self) -> Self {
        Self {
            subject: self.subject.trim().to_string(),
            body: self.body.trim().to_string(),
            url: self.url.trim().to_string(),
        }
    }

    /// Returns `true` when all three fields are empty after trimming.
    pub fn is_blank(&self) -> bool {
        self.subject.trim().is_empty() && self.body.trim().is_empty() && self.url.trim().is_empty()
    }
}

/// Authenticated user context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Backend user id, used as the history owner key.
    pub id: String,
    /// Account email address.
    pub email: String,
}

/// Binary verdict attached to a scored scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Probability at or above [`PHISHING_THRESHOLD`].
    Phishing,
    /// Probability below [`PHISHING_THRESHOLD`].
    Legitimate,
}

impl Label {
    /// Returns the wire/display spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Phishing => "phishing",
            Self::Legitimate => "legitimate",
        }
    }

    /// Parses a label case-insensitively, ignoring surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "phishing" => Some(Self::Phishing),
            "legitimate" => Some(Self::Legitimate),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete risk bucket derived from a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    /// `[0.0, 0.2)`
    VeryLow,
    /// `[0.2, 0.4)`
    Low,
    /// `[0.4, 0.6)`
    Moderate,
    /// `[0.6, 0.8)`
    High,
    /// `[0.8, 1.0]`
    Critical,
}

impl RiskTier {
    /// Human-readable tier name.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::VeryLow => "Very Low",
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Successful assessment from the scoring service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Verdict derived from `probability`.
    pub label: Label,
    /// Phishing probability in `[0.0, 1.0]`.
    pub probability: f64,
    /// Ordered human-readable reasons.
    pub explanation: Vec<String>,
}

/// Failure category of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Network, timeout, non-2xx, or unparseable body.
    Transport,
    /// Reply parsed but did not carry a usable probability.
    DataShape,
}

/// User-facing failure of one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Message safe to display; never contains transport diagnostics.
    pub message: String,
}

impl ScanFailure {
    /// Creates a failure of the given kind.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Outcome of one scan: either an assessment or a failure, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScanResult {
    /// The reply carried a usable probability.
    Assessed(Assessment),
    /// The scan could not be scored.
    Failed(ScanFailure),
}

impl ScanResult {
    /// Returns the assessment when present.
    pub fn assessment(&self) -> Option<&Assessment> {
        match self {
            Self::Assessed(assessment) => Some(assessment),
            Self::Failed(_) => None,
        }
    }

    /// Returns the failure when present.
    pub fn failure(&self) -> Option<&ScanFailure> {
        match self {
            Self::Assessed(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

/// One history row owned by the storage backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Row id; numeric ids are normalized to strings.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Submitted subject, if stored.
    #[serde(default)]
    pub subject: Option<String>,
    /// Submitted body, if stored.
    #[serde(default)]
    pub body: Option<String>,
    /// Submitted URL, if stored.
    #[serde(default)]
    pub url: Option<String>,
    /// Stored probability; may be absent or out of range.
    #[serde(default)]
    pub probability: Option<f64>,
    /// Stored label as free text.
    #[serde(default)]
    pub label: Option<String>,
    /// Row creation timestamp; `None` when the row has none.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ScanRecord {
    /// Stored probability, `0.0` when absent.
    pub fn probability_or_zero(&self) -> f64 {
        self.probability.unwrap_or(0.0)
    }

    /// Stored label, `"unknown"` when absent or blank.
    pub fn label_or_unknown(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.trim().is_empty() => label,
            _ => "unknown",
        }
    }

    /// Returns `true` when the stored label reads as phishing.
    pub fn is_phishing(&self) -> bool {
        self.label.as_deref().and_then(Label::parse) == Some(Label::Phishing)
    }

    /// Decodes a JSON array of rows.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when the payload is not a valid row array.
    pub fn list_from_json_bytes(raw: &[u8]) -> Result<Vec<Self>, CoreError> {
        serde_json::from_slice(raw).map_err(CoreError::Codec)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

/// Token captured when an async operation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenerationTicket(u64);

/// Monotonic counter that invalidates outstanding [`GenerationTicket`]s.
///
/// Owners advance the counter whenever the context an operation was started
/// under changes (new key, teardown, newer event). A completing operation
/// applies its result only when its ticket is still current.
#[derive(Debug, Default, Clone)]
pub struct Generation {
    current: u64,
}

impl Generation {
    /// Invalidates all outstanding tickets and returns a fresh one.
    pub fn advance(&mut self) -> GenerationTicket {
        self.current = self.current.wrapping_add(1);
        GenerationTicket(self.current)
    }

    /// Returns a ticket for the current generation without invalidating others.
    pub fn ticket(&self) -> GenerationTicket {
        GenerationTicket(self.current)
    }

    /// Returns `true` when `ticket` has not been superseded.
    pub fn is_current(&self, ticket: GenerationTicket) -> bool {
        self.current == ticket.0
    }
}

/// Error type for core decoding failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON decoding error.
    #[error("record codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}
