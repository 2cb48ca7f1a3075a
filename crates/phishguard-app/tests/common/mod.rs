//! Shared fakes for app integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use phishguard_auth::{
    AuthBackend, AuthError, Credentials, Session, SessionEvent, SessionListener, Subscription,
};
use phishguard_core::{Identity, ScanRecord};
use phishguard_history::{HistoryError, ScanSource};
use phishguard_submit::{PredictRequest, PredictionTransport, TransportError};
use serde_json::Value;

/// Test identity.
#[allow(dead_code)]
pub fn identity(id: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: format!("{id}@example.com"),
    }
}

/// Auth backend that signs in any non-rejected email.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeAuth {
    pub initial: Option<Identity>,
    pub reject_with: Option<String>,
    pub signups: Mutex<Vec<(String, String)>>,
    pub listener: Mutex<Option<SessionListener>>,
}

#[allow(dead_code)]
impl FakeAuth {
    /// Delivers `event` the way another tab or a token refresh would.
    pub fn emit(&self, event: SessionEvent) {
        let listener = self.listener.lock().expect("listener lock").clone();
        if let Some(listener) = listener {
            listener(event);
        }
    }
}

#[async_trait]
impl AuthBackend for FakeAuth {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.initial.clone().map(|identity| Session {
            identity,
            access_token: "stored-token".to_string(),
        }))
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        if let Some(message) = &self.reject_with {
            return Err(AuthError::backend(message.clone()));
        }
        let id = credentials.email.split('@').next().unwrap_or_default();
        Ok(Session {
            identity: identity(id),
            access_token: "fresh-token".to_string(),
        })
    }

    async fn sign_up_with_password(
        &self,
        credentials: &Credentials,
        redirect_to: &str,
    ) -> Result<(), AuthError> {
        self.signups
            .lock()
            .expect("signups lock")
            .push((credentials.email.clone(), redirect_to.to_string()));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }

    fn subscribe(&self, listener: SessionListener) -> Subscription {
        *self.listener.lock().expect("listener lock") = Some(listener);
        Subscription::new(|| {})
    }
}

/// Transport returning one canned reply and recording requests.
#[allow(dead_code)]
pub struct CannedTransport {
    pub reply: Result<Value, TransportError>,
    pub requests: Mutex<Vec<PredictRequest>>,
}

#[allow(dead_code)]
impl CannedTransport {
    pub fn replying(reply: Result<Value, TransportError>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<PredictRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl PredictionTransport for CannedTransport {
    async fn predict(&self, request: &PredictRequest) -> Result<Value, TransportError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.reply.clone()
    }
}

/// Scan source serving fixed rows and counting queries. Owners listed in
/// `by_owner` get their own rows; everyone else gets `rows`.
#[allow(dead_code)]
#[derive(Default)]
pub struct FixedScans {
    pub rows: Vec<ScanRecord>,
    pub by_owner: HashMap<String, Vec<ScanRecord>>,
    pub queries: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FixedScans {
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("queries lock").clone()
    }
}

#[async_trait]
impl ScanSource for FixedScans {
    async fn fetch_scans(
        &self,
        owner_id: &str,
        _limit: usize,
    ) -> Result<Vec<ScanRecord>, HistoryError> {
        self.queries
            .lock()
            .expect("queries lock")
            .push(owner_id.to_string());
        Ok(self
            .by_owner
            .get(owner_id)
            .cloned()
            .unwrap_or_else(|| self.rows.clone()))
    }
}

/// History row fixture.
#[allow(dead_code)]
pub fn record(id: &str, subject: Option<&str>, minute: u32) -> ScanRecord {
    ScanRecord {
        id: id.to_string(),
        subject: subject.map(str::to_string),
        body: Some(format!("body of {id}")),
        url: None,
        probability: Some(0.91),
        label: Some("phishing".to_string()),
        created_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, minute, 0).single(),
    }
}
