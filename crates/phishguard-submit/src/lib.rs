#![warn(missing_docs)]
//! # phishguard-submit
//!
//! ## Purpose
//! Owns the lifecycle of one scan submission against the scoring service.
//!
//! ## Responsibilities
//! - Validate and trim scan input before any request is made.
//! - Guarantee at most one in-flight prediction request per controller.
//! - Normalize replies and map transport failures to user-safe messages.
//! - Provide the reqwest-backed [`HttpPredictionTransport`].
//!
//! ## Data flow
//! Form input + identity -> [`ScanSubmissionController::submit`] ->
//! [`PredictRequest`] -> [`PredictionTransport`] -> normalizer ->
//! [`SubmissionState`].
//!
//! ## Ownership and lifetimes
//! Requests and results are owned values. Controller state sits behind a
//! mutex that is never held across an `.await`.
//!
//! ## Error model
//! Empty submissions return [`SubmitError`] before any request. Transport and
//! data-shape failures are not errors of `submit`; they become a
//! [`ScanResult::Failed`] outcome and the cause is logged.
//!
//! ## Security and privacy notes
//! Scan content is never logged; only the user id and failure classes are.

mod transport;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use phishguard_analysis_contract::ResponseNormalizer;
use phishguard_core::{
    Assessment, FailureKind, Generation, GenerationTicket, Identity, ScanFailure, ScanInput,
    ScanResult,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use transport::{
    HttpPredictionTransport, PREDICT_PATH, PredictionTransport, TransportError, TransportFailureClass,
    classify_transport_error, predict_endpoint,
};

/// User-facing message for any transport failure.
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Failed to connect to backend.";

/// Body of `POST {base_url}/predict`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Trimmed subject.
    pub subject: String,
    /// Trimmed body.
    pub body: String,
    /// Trimmed URL.
    pub url: String,
    /// Owner id, `null` for anonymous scans.
    pub user_id: Option<String>,
}

impl PredictRequest {
    /// Builds a request from trimmed input and the optional identity.
    pub fn new(input: &ScanInput, identity: Option<&Identity>) -> Self {
        let trimmed = input.trimmed();
        Self {
            subject: trimmed.subject,
            body: trimmed.body,
            url: trimmed.url,
            user_id: identity.map(|identity| identity.id.clone()),
        }
    }
}

/// Observable controller state.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    /// Ready for a submission.
    Idle,
    /// A request is in flight.
    Submitting,
    /// Last submission was scored.
    Succeeded(Assessment),
    /// Last submission failed.
    Failed(ScanFailure),
}

/// Result of one `submit` call.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Request finished and its result is now the controller state.
    Completed(ScanResult),
    /// Another submission was already in flight; nothing was sent.
    Busy,
    /// Request finished after [`ScanSubmissionController::reset`]; its
    /// result was discarded.
    Superseded,
}

#[derive(Debug)]
struct ControllerState {
    state: SubmissionState,
    in_flight: bool,
    generation: Generation,
}

/// Submission state machine: `Idle -> Submitting -> {Succeeded, Failed} -> Idle`.
pub struct ScanSubmissionController {
    transport: Arc<dyn PredictionTransport>,
    normalizer: ResponseNormalizer,
    transport_message: String,
    inner: Mutex<ControllerState>,
}

impl ScanSubmissionController {
    /// Creates an idle controller using default user-facing messages.
    pub fn new(transport: Arc<dyn PredictionTransport>) -> Self {
        Self {
            transport,
            normalizer: ResponseNormalizer::default(),
            transport_message: TRANSPORT_FAILURE_MESSAGE.to_string(),
            inner: Mutex::new(ControllerState {
                state: SubmissionState::Idle,
                in_flight: false,
                generation: Generation::default(),
            }),
        }
    }

    /// Overrides the normalizer (and with it the data-shape message).
    pub fn with_normalizer(mut self, normalizer: ResponseNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Overrides the transport failure message.
    pub fn with_transport_message(mut self, message: impl Into<String>) -> Self {
        self.transport_message = message.into();
        self
    }

    /// Submits one scan.
    ///
    /// Any previous outcome is cleared first. Exactly one request is sent
    /// unless the input is blank or another request is in flight.
    ///
    /// # Errors
    /// Returns [`SubmitError::EmptySubmission`] when all trimmed fields are
    /// empty; no request is sent and the controller stays `Idle`.
    pub async fn submit(
        &self,
        input: &ScanInput,
        identity: Option<&Identity>,
    ) -> Result<SubmitOutcome, SubmitError> {
        let (ticket, request) = {
            let mut inner = self.lock();
            if inner.in_flight {
                debug!("submission ignored while another request is in flight");
                return Ok(SubmitOutcome::Busy);
            }

            inner.state = SubmissionState::Idle;
            if input.is_blank() {
                return Err(SubmitError::EmptySubmission);
            }

            inner.state = SubmissionState::Submitting;
            inner.in_flight = true;
            (inner.generation.advance(), PredictRequest::new(input, identity))
        };

        let guard = InFlightGuard {
            inner: &self.inner,
            ticket,
        };

        info!(
            user_id = request.user_id.as_deref().unwrap_or("anonymous"),
            "submitting scan for prediction"
        );
        let result = match self.transport.predict(&request).await {
            Ok(raw) => self.normalizer.normalize(&raw),
            Err(error) => {
                warn!(
                    %error,
                    class = ?classify_transport_error(&error),
                    "prediction request failed"
                );
                ScanResult::Failed(ScanFailure::new(
                    FailureKind::Transport,
                    self.transport_message.clone(),
                ))
            }
        };

        if let ScanResult::Failed(failure) = &result
            && failure.kind == FailureKind::DataShape
        {
            warn!("prediction reply had no usable probability");
        }

        let outcome = {
            let mut inner = self.lock();
            if inner.generation.is_current(ticket) {
                inner.state = match &result {
                    ScanResult::Assessed(assessment) => {
                        SubmissionState::Succeeded(assessment.clone())
                    }
                    ScanResult::Failed(failure) => SubmissionState::Failed(failure.clone()),
                };
                SubmitOutcome::Completed(result)
            } else {
                debug!("discarding superseded prediction reply");
                SubmitOutcome::Superseded
            }
        };

        drop(guard);
        Ok(outcome)
    }

    /// Returns to `Idle` and suppresses the effects of any in-flight request.
    ///
    /// The in-flight request itself still runs to completion, so a new
    /// submission stays blocked until it does.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation.advance();
        inner.state = SubmissionState::Idle;
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SubmissionState {
        self.lock().state.clone()
    }

    /// `true` while a request is in flight.
    pub fn is_submitting(&self) -> bool {
        self.lock().in_flight
    }

    /// Last authoritative result, if any.
    pub fn result(&self) -> Option<ScanResult> {
        match &self.lock().state {
            SubmissionState::Succeeded(assessment) => {
                Some(ScanResult::Assessed(assessment.clone()))
            }
            SubmissionState::Failed(failure) => Some(ScanResult::Failed(failure.clone())),
            SubmissionState::Idle | SubmissionState::Submitting => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ScanSubmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSubmissionController")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight flag when a submission ends, including when the
/// submitting future is dropped mid-request.
struct InFlightGuard<'a> {
    inner: &'a Mutex<ControllerState>,
    ticket: GenerationTicket,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.in_flight = false;
        if inner.generation.is_current(self.ticket) && inner.state == SubmissionState::Submitting {
            inner.state = SubmissionState::Idle;
        }
    }
}

/// Validation errors raised before any request is sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// Subject, body, and URL are all empty after trimming.
    #[error("enter a subject, body, or URL to analyze")]
    EmptySubmission,
    /// Prediction base URL is unusable.
    #[error("invalid prediction endpoint: {0}")]
    InvalidEndpoint(String),
    /// HTTP client could not be constructed.
    #[error("prediction client setup failed: {0}")]
    ClientSetup(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for request construction.

    use super::*;

    #[test]
    fn request_carries_trimmed_fields_and_null_user() {
        let request = PredictRequest::new(&ScanInput::new(" a ", " ", "\thttps://x.test"), None);
        let encoded = serde_json::to_value(&request).expect("request should encode");
        assert_eq!(
            encoded,
            serde_json::json!({"subject": "a", "body": "", "url": "https://x.test", "user_id": null})
        );
    }
}
