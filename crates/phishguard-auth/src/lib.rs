#![warn(missing_docs)]
//! # phishguard-auth
//!
//! ## Purpose
//! Tracks the authenticated identity that scans are attributed to.
//!
//! ## Responsibilities
//! - Gate sign-up on a fixed top-level-domain allow-list.
//! - Execute sign-in/sign-up/sign-out through an injectable [`AuthBackend`].
//! - Stay synchronized with the backend's out-of-band session-change stream.
//! - Model session transitions in an explicit [`AuthStateMachine`].
//!
//! ## Data flow
//! UI collects credentials -> [`AuthSessionManager`] validates and calls
//! [`AuthBackend`] -> session events and call results update the
//! [`AuthStateMachine`] -> consumers read [`AuthSessionManager::current_identity`].
//!
//! ## Ownership and lifetimes
//! The manager is an explicitly constructed context object. It owns exactly
//! one [`Subscription`] for its lifetime and releases it in
//! [`AuthSessionManager::dispose`].
//!
//! ## Error model
//! Validation failures and backend failures are surfaced as [`AuthError`].
//! Every failure leaves the manager ready for the next call.
//!
//! ## Security and privacy notes
//! This crate does not log credentials or token values. [`Session`] redacts
//! its access token from `Debug` output.
//!
//! ## Example
//! ```rust
//! use phishguard_auth::{AuthStateMachine, is_email_domain_allowed};
//!
//! let machine = AuthStateMachine::new();
//! assert!(machine.is_auth_loading());
//! assert!(machine.identity().is_none());
//! assert!(is_email_domain_allowed("user@mail.sub.io"));
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use phishguard_core::{Generation, GenerationTicket, Identity};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Top-level domains accepted at sign-up.
pub const ALLOWED_TLDS: [&str; 9] = ["com", "org", "net", "edu", "gov", "io", "ai", "app", "dev"];

/// Message shown when the backend gives no usable failure text.
pub const AUTH_FAILED_FALLBACK: &str = "Authentication failed.";

/// Message shown when sign-up is rejected by the domain allow-list.
pub const DOMAIN_NOT_ALLOWED_MESSAGE: &str =
    "Please use an email address from a supported domain (e.g., .com, .org, .net, .edu, .io).";

/// Returns `true` when the address's final domain label is allow-listed.
///
/// The address is trimmed and lowercased, split at its last `@`, and the
/// domain must have at least two dot-separated labels.
pub fn is_email_domain_allowed(email: &str) -> bool {
    let normalized = email.trim().to_lowercase();
    let Some(at_index) = normalized.rfind('@') else {
        return false;
    };

    let domain = &normalized[at_index + 1..];
    if domain.is_empty() {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    labels
        .last()
        .is_some_and(|tld| ALLOWED_TLDS.contains(tld))
}

/// User-provided login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials from raw form values.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated backend session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// User the session belongs to.
    pub identity: Identity,
    /// Bearer token for storage queries.
    pub access_token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Out-of-band session change reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was established (possibly in another tab/process).
    SignedIn(Identity),
    /// The session token was refreshed.
    TokenRefreshed(Identity),
    /// The session was ended.
    SignedOut,
    /// The session expired.
    Expired,
}

impl SessionEvent {
    /// Identity carried by the event, if the user is still signed in.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::SignedIn(identity) | Self::TokenRefreshed(identity) => Some(identity),
            Self::SignedOut | Self::Expired => None,
        }
    }
}

/// Callback invoked for every session event.
pub type SessionListener = Arc<dyn Fn(SessionEvent) + Send + Sync>;

/// Handle to one session-change registration.
///
/// [`Subscription::unsubscribe`] runs the release hook at most once.
pub struct Subscription {
    release: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    /// Wraps a release hook.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// Releases the registration. Returns `true` only for the call that
    /// actually released it.
    pub fn unsubscribe(&self) -> bool {
        let release = self
            .release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match release {
            Some(release) => {
                release();
                true
            }
            None => false,
        }
    }

    /// Returns `true` until [`Subscription::unsubscribe`] has run.
    pub fn is_active(&self) -> bool {
        self.release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Auth/session collaborator contract.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Returns the currently active session, if any.
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Signs in with email and password.
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    /// Registers a new account; `redirect_to` is the post-confirmation target.
    async fn sign_up_with_password(
        &self,
        credentials: &Credentials,
        redirect_to: &str,
    ) -> Result<(), AuthError>;

    /// Ends the current session.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Registers a listener for session changes.
    fn subscribe(&self, listener: SessionListener) -> Subscription;
}

/// Session state with explicit legal transitions.
#[derive(Debug, Clone)]
pub struct AuthStateMachine {
    identity: Option<Identity>,
    auth_loading: bool,
    disposed: bool,
    generation: Generation,
}

impl AuthStateMachine {
    /// Creates a machine that is still resolving the initial session.
    pub fn new() -> Self {
        Self {
            identity: None,
            auth_loading: true,
            disposed: false,
            generation: Generation::default(),
        }
    }

    /// Current identity snapshot.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// `true` until the initial session lookup has finished.
    pub fn is_auth_loading(&self) -> bool {
        self.auth_loading
    }

    /// `true` after teardown.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Ticket for an initial lookup started now.
    pub fn begin_resolution(&self) -> GenerationTicket {
        self.generation.ticket()
    }

    /// Applies the initial lookup result unless a newer change already landed.
    ///
    /// `auth_loading` clears regardless of outcome. Returns `true` when the
    /// resolved identity was applied.
    pub fn on_initial_session(
        &mut self,
        ticket: GenerationTicket,
        identity: Option<Identity>,
    ) -> bool {
        if self.disposed {
            return false;
        }

        self.auth_loading = false;
        if !self.generation.is_current(ticket) {
            return false;
        }

        self.identity = identity;
        true
    }

    /// Applies an out-of-band session event. Ignored after teardown.
    pub fn on_event(&mut self, event: &SessionEvent) {
        if self.disposed {
            return;
        }

        self.generation.advance();
        self.identity = event.identity().cloned();
    }

    /// Applies a successful sign-in.
    pub fn on_sign_in(&mut self, identity: Identity) {
        if self.disposed {
            return;
        }

        self.generation.advance();
        self.identity = Some(identity);
        self.auth_loading = false;
    }

    /// Applies a successful sign-out.
    pub fn on_sign_out(&mut self) {
        if self.disposed {
            return;
        }

        self.generation.advance();
        self.identity = None;
    }

    /// Marks teardown; later transitions are ignored.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.generation.advance();
    }
}

impl Default for AuthStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Context object owning the current identity and its backend subscription.
pub struct AuthSessionManager {
    backend: Arc<dyn AuthBackend>,
    signup_redirect: String,
    state: Arc<Mutex<AuthStateMachine>>,
    subscription: Subscription,
}

impl AuthSessionManager {
    /// Creates a manager and registers its single session-change listener.
    ///
    /// Call [`AuthSessionManager::resolve_initial_session`] afterwards to clear
    /// the loading flag.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidRedirect`] when `signup_redirect` is not an
    /// absolute URL.
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        signup_redirect: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let signup_redirect = signup_redirect.into();
        Url::parse(&signup_redirect)
            .map_err(|error| AuthError::InvalidRedirect(format!("{signup_redirect}: {error}")))?;

        let state = Arc::new(Mutex::new(AuthStateMachine::new()));
        let listener_state = Arc::clone(&state);
        let subscription = backend.subscribe(Arc::new(move |event: SessionEvent| {
            debug!(?event, "session change received");
            lock_state(&listener_state).on_event(&event);
        }));

        Ok(Self {
            backend,
            signup_redirect,
            state,
            subscription,
        })
    }

    /// Resolves the currently active session once.
    ///
    /// A session event that arrives while the lookup is in flight wins over
    /// the lookup result.
    ///
    /// # Errors
    /// Propagates the backend failure after clearing the loading flag; the
    /// manager stays anonymous in that case.
    pub async fn resolve_initial_session(&self) -> Result<Option<Identity>, AuthError> {
        let ticket = lock_state(&self.state).begin_resolution();
        let resolved = self.backend.current_session().await;

        let mut state = lock_state(&self.state);
        match resolved {
            Ok(session) => {
                let identity = session.map(|session| session.identity);
                if !state.on_initial_session(ticket, identity) {
                    debug!("initial session lookup superseded by a newer change");
                }
                Ok(state.identity().cloned())
            }
            Err(error) => {
                state.on_initial_session(ticket, None);
                warn!(%error, "initial session lookup failed");
                Err(error)
            }
        }
    }

    /// Signs in and records the resulting identity.
    ///
    /// # Errors
    /// Returns [`AuthError::EmptyCredential`] for blank input, or the backend
    /// failure.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let credentials = credentials_for(email, password)?;
        let session = self
            .backend
            .sign_in_with_password(&credentials)
            .await
            .inspect_err(|error| warn!(%error, "sign-in failed"))?;

        info!(user_id = %session.identity.id, "signed in");
        lock_state(&self.state).on_sign_in(session.identity.clone());
        Ok(session.identity)
    }

    /// Registers a new account after checking the domain allow-list.
    ///
    /// # Errors
    /// Returns [`AuthError::DomainNotAllowed`] before any backend call when
    /// the address fails [`is_email_domain_allowed`], or the backend failure.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if !is_email_domain_allowed(email) {
            return Err(AuthError::DomainNotAllowed);
        }

        let credentials = credentials_for(email, password)?;
        self.backend
            .sign_up_with_password(&credentials, &self.signup_redirect)
            .await
            .inspect_err(|error| warn!(%error, "sign-up failed"))?;

        info!("sign-up submitted");
        Ok(())
    }

    /// Ends the session and clears the identity.
    ///
    /// # Errors
    /// Returns the backend failure; the identity is kept in that case.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.backend
            .sign_out()
            .await
            .inspect_err(|error| warn!(%error, "sign-out failed"))?;

        info!("signed out");
        lock_state(&self.state).on_sign_out();
        Ok(())
    }

    /// Current identity snapshot.
    pub fn current_identity(&self) -> Option<Identity> {
        lock_state(&self.state).identity().cloned()
    }

    /// `true` until the initial session lookup has finished.
    pub fn is_auth_loading(&self) -> bool {
        lock_state(&self.state).is_auth_loading()
    }

    /// Releases the session subscription. Safe to call more than once;
    /// returns `true` only for the call that performed teardown.
    pub fn dispose(&self) -> bool {
        lock_state(&self.state).dispose();
        let released = self.subscription.unsubscribe();
        if released {
            debug!("session subscription released");
        }
        released
    }

    /// `true` after [`AuthSessionManager::dispose`].
    pub fn is_disposed(&self) -> bool {
        lock_state(&self.state).is_disposed()
    }
}

impl Drop for AuthSessionManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for AuthSessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSessionManager")
            .field("signup_redirect", &self.signup_redirect)
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

fn credentials_for(email: &str, password: &str) -> Result<Credentials, AuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::EmptyCredential);
    }

    Ok(Credentials::new(email.trim(), password))
}

fn lock_state(state: &Mutex<AuthStateMachine>) -> MutexGuard<'_, AuthStateMachine> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Errors produced by auth validation and backend calls.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Sign-up address is outside the domain allow-list.
    #[error("{}", DOMAIN_NOT_ALLOWED_MESSAGE)]
    DomainNotAllowed,
    /// Email or password is blank.
    #[error("email and password must be non-empty")]
    EmptyCredential,
    /// Sign-up redirect target is not an absolute URL.
    #[error("invalid sign-up redirect: {0}")]
    InvalidRedirect(String),
    /// Backend rejected the request with a human-readable message.
    #[error("{0}")]
    Backend(String),
    /// Backend could not be reached.
    #[error("auth transport failure: {0}")]
    Transport(String),
}

impl AuthError {
    /// Builds a backend error, substituting [`AUTH_FAILED_FALLBACK`] for a
    /// blank message.
    pub fn backend(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self::Backend(AUTH_FAILED_FALLBACK.to_string())
        } else {
            Self::Backend(message)
        }
    }

    /// Message safe to show in the UI.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) | Self::InvalidRedirect(_) => AUTH_FAILED_FALLBACK.to_string(),
            other => other.to_string(),
        }
    }
}
