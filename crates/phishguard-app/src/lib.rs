#![warn(missing_docs)]
//! # phishguard-app
//!
//! ## Purpose
//! Wires auth, submission, history, and UI state into one client context for
//! `phishguard`.
//!
//! ## Responsibilities
//! - Load and validate client configuration from the environment.
//! - Own the session manager, submission controller, history store, and the
//!   form/panel state a presentation layer renders.
//! - Keep history in step with the signed-in identity, including identity
//!   changes that arrive as out-of-band session events.
//! - Install the tracing subscriber and redact secrets before logging.
//!
//! ## Data flow
//! Form -> [`PhishGuardApp::submit_form`] -> prediction endpoint ->
//! [`ResultView`]. Identity -> [`PhishGuardApp::refresh_history`] ->
//! [`HistoryPanel`]. Row selection -> [`PhishGuardApp::select_history`] -> form.
//!
//! ## Ownership and lifetimes
//! [`PhishGuardApp`] owns every component; collaborators are shared through
//! `Arc` so one Supabase client can serve both auth and history.
//!
//! ## Error model
//! Construction and validation failures are wrapped in [`AppError`]. Runtime
//! failures surface as view state rather than errors.
//!
//! ## Security and privacy notes
//! - Passwords are never stored in app state.
//! - Log lines derived from backend messages go through [`redact_sensitive`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use phishguard_auth::{AuthBackend, AuthError, AuthSessionManager};
use phishguard_core::{Identity, ScanResult};
use phishguard_history::{FetchOutcome, ScanHistoryStore, ScanSource};
use phishguard_submit::{
    HttpPredictionTransport, PredictionTransport, ScanSubmissionController, SubmitError,
    SubmitOutcome,
};
use phishguard_supabase::{SupabaseClient, SupabaseConfig, SupabaseError};
use phishguard_ui::{AuthMode, AuthPanelState, HistoryPanel, ResultView, ScanForm};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("PHISHGUARD_VERSION");

/// Prediction service base URL.
pub const API_BASE_URL_VAR: &str = "PHISHGUARD_API_BASE_URL";
/// Per-request timeout in whole seconds.
pub const REQUEST_TIMEOUT_VAR: &str = "PHISHGUARD_REQUEST_TIMEOUT_SECS";
/// Where the confirmation email sends a new user.
pub const SIGNUP_REDIRECT_VAR: &str = "PHISHGUARD_SIGNUP_REDIRECT_URL";
/// Supabase project URL.
pub const SUPABASE_URL_VAR: &str = "PHISHGUARD_SUPABASE_URL";
/// Supabase public anon key.
pub const SUPABASE_ANON_KEY_VAR: &str = "PHISHGUARD_SUPABASE_ANON_KEY";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SIGNUP_REDIRECT_URL: &str = "http://localhost:5173/";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Installs a `tracing` fmt subscriber. Returns `false` when one was
/// already installed.
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt().with_target(false).try_init().is_ok()
}

/// Validated client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prediction service base URL.
    pub api_base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Post-confirmation redirect for sign-up.
    pub signup_redirect_url: String,
    /// Auth/storage project, when configured.
    pub supabase: Option<SupabaseConfig>,
}

impl ClientConfig {
    /// Reads configuration from process environment variables.
    ///
    /// # Errors
    /// See [`ClientConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for malformed URLs, a zero or non-numeric
    /// timeout, or only one of the two Supabase variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_base_url = read(API_BASE_URL_VAR).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        validate_http_url(API_BASE_URL_VAR, &api_base_url)?;

        let request_timeout = match read(REQUEST_TIMEOUT_VAR) {
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            Some(raw) => match raw.parse::<u64>() {
                Ok(seconds) if seconds > 0 => Duration::from_secs(seconds),
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
        };

        let signup_redirect_url =
            read(SIGNUP_REDIRECT_VAR).unwrap_or_else(|| DEFAULT_SIGNUP_REDIRECT_URL.to_string());
        validate_http_url(SIGNUP_REDIRECT_VAR, &signup_redirect_url)?;

        let supabase = match (read(SUPABASE_URL_VAR), read(SUPABASE_ANON_KEY_VAR)) {
            (Some(url), Some(anon_key)) => {
                validate_http_url(SUPABASE_URL_VAR, &url)?;
                Some(SupabaseConfig { url, anon_key })
            }
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteSupabase),
        };

        Ok(Self {
            api_base_url,
            request_timeout,
            signup_redirect_url,
            supabase,
        })
    }
}

fn validate_http_url(variable: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        variable,
        value: value.to_string(),
    };
    let parsed = Url::parse(value).map_err(|_| invalid())?;
    if matches!(parsed.scheme(), "http" | "https") {
        Ok(())
    } else {
        Err(invalid())
    }
}

/// Redacts secret values following common credential markers.
///
/// The value after `password`, `token`, `authorization`, `bearer`, or
/// `apikey` is replaced up to the next `&`, `,`, `;`, or line break.
pub fn redact_sensitive(input: &str) -> String {
    const MARKERS: [&str; 5] = ["password", "token", "authorization", "bearer", "apikey"];
    const SEPARATORS: [char; 5] = ['&', ',', ';', '\n', '\r'];

    let lower = input.to_ascii_lowercase();
    let mut redacted = String::with_capacity(input.len());
    let mut cursor = 0;

    while cursor < input.len() {
        let next_marker = MARKERS
            .iter()
            .filter_map(|marker| {
                lower[cursor..]
                    .find(marker)
                    .map(|offset| (cursor + offset, marker.len()))
            })
            .min_by_key(|(position, _)| *position);

        let Some((position, marker_len)) = next_marker else {
            redacted.push_str(&input[cursor..]);
            break;
        };

        let value_start = position + marker_len;
        let value_end = input[value_start..]
            .find(SEPARATORS)
            .map_or(input.len(), |offset| value_start + offset);

        redacted.push_str(&input[cursor..value_start]);
        if value_end > value_start {
            redacted.push_str("=<redacted>");
        }
        cursor = value_end;
    }

    redacted
}

/// Client context: one per running client.
pub struct PhishGuardApp {
    auth: AuthSessionManager,
    submission: ScanSubmissionController,
    history: ScanHistoryStore,
    form: Mutex<ScanForm>,
    auth_panel: Mutex<AuthPanelState>,
}

impl PhishGuardApp {
    /// Assembles the context from its collaborators.
    ///
    /// # Errors
    /// Returns [`AppError::Auth`] when `signup_redirect` is not a URL.
    pub fn new(
        auth_backend: Arc<dyn AuthBackend>,
        transport: Arc<dyn PredictionTransport>,
        scans: Arc<dyn ScanSource>,
        signup_redirect: &str,
    ) -> Result<Self, AppError> {
        Ok(Self {
            auth: AuthSessionManager::new(auth_backend, signup_redirect)?,
            submission: ScanSubmissionController::new(transport),
            history: ScanHistoryStore::new(scans),
            form: Mutex::new(ScanForm::new()),
            auth_panel: Mutex::new(AuthPanelState::default()),
        })
    }

    /// Builds the HTTP-backed context described by `config`.
    ///
    /// # Errors
    /// Returns [`AppError::SupabaseNotConfigured`] when `config` has no
    /// Supabase project, or the construction failure of either client.
    pub fn connect(config: &ClientConfig) -> Result<Self, AppError> {
        let supabase_config = config
            .supabase
            .as_ref()
            .ok_or(AppError::SupabaseNotConfigured)?;
        let supabase = Arc::new(SupabaseClient::new(supabase_config, config.request_timeout)?);
        let transport =
            HttpPredictionTransport::new(&config.api_base_url, config.request_timeout)?;
        info!(endpoint = %transport.endpoint(), "prediction transport ready");

        Self::new(
            Arc::clone(&supabase) as Arc<dyn AuthBackend>,
            Arc::new(transport),
            supabase,
            &config.signup_redirect_url,
        )
    }

    /// Resolves the stored session and loads history for it.
    pub async fn start(&self) -> Option<Identity> {
        if let Err(error) = self.auth.resolve_initial_session().await {
            warn!(
                error = %redact_sensitive(&error.to_string()),
                "continuing without a session"
            );
        }
        self.refresh_history().await;
        self.auth.current_identity()
    }

    /// Current identity snapshot.
    pub fn identity(&self) -> Option<Identity> {
        self.auth.current_identity()
    }

    /// `true` until the stored session has been resolved.
    pub fn is_auth_loading(&self) -> bool {
        self.auth.is_auth_loading()
    }

    /// Applies `edit` to the submission form.
    pub fn edit_form(&self, edit: impl FnOnce(&mut ScanForm)) {
        edit(&mut lock(&self.form));
    }

    /// Snapshot of the submission form.
    pub fn form(&self) -> ScanForm {
        lock(&self.form).clone()
    }

    /// Submits the current form contents with the current identity.
    ///
    /// A signed-in user's history is reloaded after a scored scan.
    ///
    /// # Errors
    /// Returns [`AppError::Submit`] when every field is blank.
    pub async fn submit_form(&self) -> Result<SubmitOutcome, AppError> {
        let input = lock(&self.form).input().clone();
        let identity = self.auth.current_identity();
        let outcome = self.submission.submit(&input, identity.as_ref()).await?;

        let scored = matches!(&outcome, SubmitOutcome::Completed(ScanResult::Assessed(_)));
        if (identity.is_some() && scored) || !self.history_belongs_to(identity.as_ref()) {
            self.refresh_history().await;
        }
        Ok(outcome)
    }

    /// Clears the result panel and suppresses any in-flight submission.
    pub fn reset_result(&self) {
        self.submission.reset();
    }

    /// `true` while a prediction request is outstanding.
    pub fn is_submitting(&self) -> bool {
        self.submission.is_submitting()
    }

    /// Result panel projection, if a result is showing.
    pub fn result_view(&self) -> Option<ResultView> {
        self.submission
            .result()
            .map(|result| ResultView::from_result(&result))
    }

    /// Reloads history for the current identity.
    pub async fn refresh_history(&self) -> FetchOutcome {
        let identity = self.auth.current_identity();
        self.history.fetch(identity.as_ref()).await
    }

    /// Reloads history only when the stored rows belong to someone other
    /// than the current identity. Returns `None` when they are current.
    pub async fn sync_history(&self) -> Option<FetchOutcome> {
        let identity = self.auth.current_identity();
        if self.history_belongs_to(identity.as_ref()) {
            return None;
        }

        debug!(
            stored_owner = ?self.history.owner_id(),
            "identity changed since history was loaded"
        );
        Some(self.refresh_history().await)
    }

    /// History panel projection.
    ///
    /// Rows loaded for a different identity are never shown; the panel reads
    /// as loading until [`PhishGuardApp::sync_history`] replaces them.
    pub fn history_panel(&self) -> HistoryPanel {
        let identity = self.auth.current_identity();
        if identity.is_some() && !self.history_belongs_to(identity.as_ref()) {
            return HistoryPanel::Loading;
        }

        let records = self.history.records();
        let error = self.history.error_message();
        HistoryPanel::project(
            identity.is_some(),
            self.history.is_loading(),
            error.as_deref(),
            &records,
        )
    }

    /// Copies the history row with `record_id` into the form. Returns
    /// `false` for an unknown id or when the rows belong to another identity,
    /// leaving the form untouched.
    pub fn select_history(&self, record_id: &str) -> bool {
        let identity = self.auth.current_identity();
        if identity.is_none() || !self.history_belongs_to(identity.as_ref()) {
            return false;
        }

        match self.history.select(record_id) {
            Some(record) => {
                lock(&self.form).apply_selection(&record);
                true
            }
            None => false,
        }
    }

    fn history_belongs_to(&self, identity: Option<&Identity>) -> bool {
        self.history.owner_id().as_deref() == identity.map(|identity| identity.id.as_str())
    }

    /// Switches the auth panel between login and sign-up.
    pub fn toggle_auth_mode(&self) {
        lock(&self.auth_panel).toggle_mode();
    }

    /// Snapshot of the auth panel.
    pub fn auth_panel(&self) -> AuthPanelState {
        lock(&self.auth_panel).clone()
    }

    /// Submits the auth panel in its current mode.
    ///
    /// Failures land in the panel's error text; a successful login reloads
    /// history for the new identity.
    pub async fn submit_auth(&self, email: &str, password: &str) {
        let mode = {
            let mut panel = lock(&self.auth_panel);
            panel.begin();
            panel.mode
        };

        let result = match mode {
            AuthMode::Login => self.auth.sign_in(email, password).await.map(|_| ()),
            AuthMode::SignUp => self.auth.sign_up(email, password).await,
        };

        match result {
            Ok(()) => {
                lock(&self.auth_panel).succeed();
                if mode == AuthMode::Login {
                    self.refresh_history().await;
                }
            }
            Err(error) => {
                warn!(
                    ?mode,
                    error = %redact_sensitive(&error.to_string()),
                    "auth panel request failed"
                );
                lock(&self.auth_panel).fail(&error.user_message());
            }
        }
    }

    /// Signs out and clears history.
    ///
    /// # Errors
    /// Returns [`AppError::Auth`] when the backend rejects the sign-out; the
    /// identity and history are kept in that case.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.auth.sign_out().await?;
        self.refresh_history().await;
        Ok(())
    }

    /// Tears down the session subscription and history store. Idempotent.
    pub fn shutdown(&self) {
        if self.auth.dispose() {
            info!("client context shut down");
        }
        self.history.dispose();
        self.submission.reset();
    }
}

impl std::fmt::Debug for PhishGuardApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhishGuardApp")
            .field("auth", &self.auth)
            .field("submission", &self.submission)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A URL variable is not an absolute HTTP(S) URL.
    #[error("{variable} is not an http(s) URL: {value}")]
    InvalidUrl {
        /// Variable name.
        variable: &'static str,
        /// Offending value.
        value: String,
    },
    /// Timeout is not a positive whole number of seconds.
    #[error("PHISHGUARD_REQUEST_TIMEOUT_SECS must be a positive number of seconds: {0}")]
    InvalidTimeout(String),
    /// Only one of the Supabase variables is set.
    #[error("PHISHGUARD_SUPABASE_URL and PHISHGUARD_SUPABASE_ANON_KEY must be set together")]
    IncompleteSupabase,
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// No auth/storage project configured.
    #[error("supabase project is not configured")]
    SupabaseNotConfigured,
    /// Supabase client setup error.
    #[error("supabase error: {0}")]
    Supabase(#[from] SupabaseError),
    /// Auth subsystem error.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
    /// Submission validation or setup error.
    #[error("submit error: {0}")]
    Submit(#[from] SubmitError),
}
