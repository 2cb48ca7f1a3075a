//! Prediction transport seam and its reqwest implementation.

use std::time::Duration;

use async_trait::async_trait;
use phishguard_analysis_contract::parse_prediction_reply;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{PredictRequest, SubmitError};

/// Path appended to the configured base URL.
pub const PREDICT_PATH: &str = "predict";

/// Abstract transport used by the submission controller.
#[async_trait]
pub trait PredictionTransport: Send + Sync {
    /// Sends one prediction request and returns the decoded reply object.
    async fn predict(&self, request: &PredictRequest) -> Result<Value, TransportError>;
}

/// Transport-level failure. Details are for diagnostics only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established or was interrupted.
    #[error("scoring service unreachable: {0}")]
    Unreachable(String),
    /// Transport timeout elapsed.
    #[error("scoring service timed out")]
    Timeout,
    /// Server returned 5xx.
    #[error("scoring service error status {0}")]
    Server(u16),
    /// Server returned a non-success status other than 5xx.
    #[error("scoring service rejected request with status {0}")]
    Client(u16),
    /// Success status but the body was not a JSON object.
    #[error("scoring service returned malformed body: {0}")]
    MalformedBody(String),
}

/// Coarse diagnostic class of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailureClass {
    /// Network-level problem; the server may never have seen the request.
    Network,
    /// Server answered with a failure status.
    Status,
    /// Server answered with success but an unusable body.
    Body,
}

/// Classifies a transport error for logging.
pub fn classify_transport_error(error: &TransportError) -> TransportFailureClass {
    match error {
        TransportError::Unreachable(_) | TransportError::Timeout => TransportFailureClass::Network,
        TransportError::Server(_) | TransportError::Client(_) => TransportFailureClass::Status,
        TransportError::MalformedBody(_) => TransportFailureClass::Body,
    }
}

/// Resolves `{base_url}/predict`.
///
/// # Errors
/// Returns [`SubmitError::InvalidEndpoint`] when the base URL does not parse
/// or is not HTTP(S).
pub fn predict_endpoint(base_url: &str) -> Result<Url, SubmitError> {
    let base = base_url.trim().trim_end_matches('/');
    let endpoint = Url::parse(&format!("{base}/{PREDICT_PATH}"))
        .map_err(|error| SubmitError::InvalidEndpoint(format!("{base_url}: {error}")))?;

    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(SubmitError::InvalidEndpoint(format!(
            "{base_url}: scheme must be http or https"
        )));
    }

    Ok(endpoint)
}

/// reqwest-backed prediction transport.
#[derive(Debug, Clone)]
pub struct HttpPredictionTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpPredictionTransport {
    /// Creates a transport posting to `{base_url}/predict` with a client-level
    /// timeout.
    ///
    /// # Errors
    /// Returns [`SubmitError::InvalidEndpoint`] for unusable base URLs and
    /// [`SubmitError::ClientSetup`] when the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SubmitError> {
        let endpoint = predict_endpoint(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| SubmitError::ClientSetup(error.to_string()))?;

        Ok(Self { client, endpoint })
    }

    /// Resolved prediction endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl PredictionTransport for HttpPredictionTransport {
    async fn predict(&self, request: &PredictRequest) -> Result<Value, TransportError> {
        debug!(endpoint = %self.endpoint, "posting prediction request");
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(TransportError::Server(status.as_u16()));
        }
        if !status.is_success() {
            return Err(TransportError::Client(status.as_u16()));
        }

        let body = response.text().await.map_err(from_reqwest)?;
        parse_prediction_reply(&body).map_err(|error| TransportError::MalformedBody(error.to_string()))
    }
}

fn from_reqwest(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Unreachable(error.to_string())
    }
}
