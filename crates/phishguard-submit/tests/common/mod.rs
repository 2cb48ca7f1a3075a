//! Shared fakes for submission tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use phishguard_submit::{PredictRequest, PredictionTransport, TransportError};
use serde_json::Value;
use tokio::sync::Notify;

/// Transport that records requests and replays a configured reply.
pub struct RecordingTransport {
    pub requests: Mutex<Vec<PredictRequest>>,
    pub reply: Mutex<Result<Value, TransportError>>,
    pub gate: Option<Arc<Notify>>,
}

#[allow(dead_code)]
impl RecordingTransport {
    pub fn replying(reply: Result<Value, TransportError>) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            reply: Mutex::new(reply),
            gate: None,
        }
    }

    pub fn gated(reply: Result<Value, TransportError>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::replying(reply)
        }
    }

    pub fn requests(&self) -> Vec<PredictRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl PredictionTransport for RecordingTransport {
    async fn predict(&self, request: &PredictRequest) -> Result<Value, TransportError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.reply.lock().expect("reply lock").clone()
    }
}
