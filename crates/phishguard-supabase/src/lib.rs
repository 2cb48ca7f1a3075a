#![warn(missing_docs)]
//! # phishguard-supabase
//!
//! ## Purpose
//! Binds the auth and scan-history collaborator contracts to a Supabase
//! project over HTTP.
//!
//! ## Responsibilities
//! - Implement [`phishguard_auth::AuthBackend`] against the GoTrue endpoints.
//! - Implement [`phishguard_history::ScanSource`] against the PostgREST
//!   `scans` table.
//! - Broadcast in-process session events to registered listeners.
//!
//! ## Data flow
//! Auth calls update the stored access token and notify listeners; history
//! queries reuse that token so row-level security applies.
//!
//! ## Ownership and lifetimes
//! One [`SupabaseClient`] is shared behind an `Arc` by both consumers.
//!
//! ## Error model
//! Construction failures return [`SupabaseError`]. Request failures are
//! mapped into the consumer crates' error types.
//!
//! ## Security and privacy notes
//! The access token and anon key are never logged or included in `Debug`
//! output.

mod auth;
mod rest;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use phishguard_auth::{SessionEvent, SessionListener, Subscription};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Table holding scan history rows.
pub const SCANS_TABLE: &str = "scans";

/// Project URL and public key.
#[derive(Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`.
    pub url: String,
    /// Public anon key sent as `apikey`.
    pub anon_key: String,
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    listeners: BTreeMap<u64, SessionListener>,
}

/// HTTP client for one Supabase project.
pub struct SupabaseClient {
    http: reqwest::Client,
    base: Url,
    anon_key: String,
    access_token: Mutex<Option<String>>,
    listeners: Arc<Mutex<ListenerRegistry>>,
}

impl SupabaseClient {
    /// Creates a client for `config` with a per-request timeout.
    ///
    /// # Errors
    /// Returns [`SupabaseError::InvalidConfig`] for a non-HTTP(S) URL or a
    /// blank key, and [`SupabaseError::ClientSetup`] when reqwest fails to
    /// build.
    pub fn new(config: &SupabaseConfig, timeout: Duration) -> Result<Self, SupabaseError> {
        let trimmed = config.url.trim().trim_end_matches('/');
        let base = Url::parse(&format!("{trimmed}/"))
            .map_err(|error| SupabaseError::InvalidConfig(format!("{}: {error}", config.url)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(SupabaseError::InvalidConfig(format!(
                "{}: scheme must be http or https",
                config.url
            )));
        }
        if config.anon_key.trim().is_empty() {
            return Err(SupabaseError::InvalidConfig(
                "anon key must be non-empty".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| SupabaseError::ClientSetup(error.to_string()))?;

        Ok(Self {
            http,
            base,
            anon_key: config.anon_key.clone(),
            access_token: Mutex::new(None),
            listeners: Arc::new(Mutex::new(ListenerRegistry::default())),
        })
    }

    /// Seeds a previously persisted access token.
    pub fn with_access_token(self, token: impl Into<String>) -> Self {
        *lock(&self.access_token) = Some(token.into());
        self
    }

    /// Number of active session listeners.
    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).listeners.len()
    }

    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base.join(path)
    }

    fn access_token(&self) -> Option<String> {
        lock(&self.access_token).clone()
    }

    fn set_access_token(&self, token: Option<String>) {
        *lock(&self.access_token) = token;
    }

    fn bearer(&self) -> String {
        let token = self.access_token().unwrap_or_else(|| self.anon_key.clone());
        format!("Bearer {token}")
    }

    fn register(&self, listener: SessionListener) -> Subscription {
        let id = {
            let mut registry = lock(&self.listeners);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.insert(id, listener);
            id
        };

        let registry = Arc::clone(&self.listeners);
        Subscription::new(move || {
            lock(&registry).listeners.remove(&id);
            debug!(listener_id = id, "session listener removed");
        })
    }

    fn broadcast(&self, event: SessionEvent) {
        let listeners: Vec<SessionListener> = lock(&self.listeners)
            .listeners
            .values()
            .cloned()
            .collect();

        for listener in listeners {
            listener(event.clone());
        }
    }
}

impl fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base", &self.base.as_str())
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pulls a human-readable message out of a Supabase error body.
pub fn error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| parsed.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

/// Client construction errors.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// Project URL or key is unusable.
    #[error("invalid supabase config: {0}")]
    InvalidConfig(String),
    /// HTTP client could not be constructed.
    #[error("supabase client setup failed: {0}")]
    ClientSetup(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for config validation, listeners, and error extraction.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn config(url: &str) -> SupabaseConfig {
        SupabaseConfig {
            url: url.to_string(),
            anon_key: "anon".to_string(),
        }
    }

    #[test]
    fn endpoints_resolve_under_project_url() {
        let client = SupabaseClient::new(&config("https://abc.supabase.co/"), Duration::from_secs(1))
            .expect("client should build");
        assert_eq!(
            client.endpoint("auth/v1/user").expect("endpoint").as_str(),
            "https://abc.supabase.co/auth/v1/user"
        );
    }

    #[test]
    fn rejects_blank_key_and_bad_scheme() {
        let blank = SupabaseConfig {
            anon_key: " ".to_string(),
            ..config("https://abc.supabase.co")
        };
        assert!(SupabaseClient::new(&blank, Duration::from_secs(1)).is_err());
        assert!(SupabaseClient::new(&config("ftp://abc"), Duration::from_secs(1)).is_err());
    }

    #[test]
    fn unsubscribed_listeners_stop_receiving_events() {
        let client = SupabaseClient::new(&config("http://localhost:54321"), Duration::from_secs(1))
            .expect("client should build");
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let subscription = client.register(Arc::new(move |_event: SessionEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        client.broadcast(SessionEvent::SignedOut);
        assert!(subscription.unsubscribe());
        client.broadcast(SessionEvent::SignedOut);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(client.listener_count(), 0);
    }

    #[test]
    fn extracts_first_available_error_message() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .as_deref(),
            Some("Invalid login credentials")
        );
        assert_eq!(
            error_message(r#"{"msg":"User already registered"}"#).as_deref(),
            Some("User already registered")
        );
        assert_eq!(error_message("<html>"), None);
        assert_eq!(error_message(r#"{"message":"  "}"#), None);
    }
}
