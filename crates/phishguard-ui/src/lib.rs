#![warn(missing_docs)]
//! # phishguard-ui
//!
//! ## Purpose
//! Defines the UI-facing state model for `phishguard`.
//!
//! ## Responsibilities
//! - Hold the submission form and re-populate it from a selected history row.
//! - Project scan results and history rows into display-safe values.
//! - Track the login/sign-up panel state.
//!
//! ## Data flow
//! History selection -> [`SelectionBridge::apply`] -> [`ScanForm`].
//! [`ScanResult`] -> [`ResultView`]. Store snapshot -> [`HistoryPanel`].
//!
//! ## Ownership and lifetimes
//! Views own their strings so a presentation layer can render them after the
//! source state has moved on.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors.
//!
//! ## Security and privacy notes
//! UI state never holds passwords or tokens.

use phishguard_analysis_contract::{clamp_probability, classify};
use phishguard_core::{Label, RiskTier, ScanInput, ScanRecord, ScanResult};

/// Shown in place of the history table when nobody is signed in.
pub const HISTORY_LOGGED_OUT_MESSAGE: &str = "Log in to see your recent phishing analysis history.";
/// Shown while history is loading.
pub const HISTORY_LOADING_MESSAGE: &str = "Loading scan history…";
/// Shown when a signed-in user has no scans.
pub const HISTORY_EMPTY_MESSAGE: &str = "No scans yet. Analyze an email to see it appear here.";
/// Placeholder for rows without a creation time.
pub const MISSING_DATE_TEXT: &str = "-";
/// Placeholder for rows without a subject.
pub const NO_SUBJECT_PLACEHOLDER: &str = "(no subject)";
/// Notice shown after a successful sign-up.
pub const SIGNUP_NOTICE: &str = "Signup successful. Check your email for confirmation if required.";
/// Fallback error text for the auth panel.
pub const AUTH_PANEL_FALLBACK_ERROR: &str = "Authentication failed.";

/// Projects history rows into form input.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionBridge;

impl SelectionBridge {
    /// Copies subject, body, and URL out of `record`; missing fields become
    /// empty strings. The record is never modified.
    pub fn apply(record: &ScanRecord) -> ScanInput {
        ScanInput::new(
            record.subject.clone().unwrap_or_default(),
            record.body.clone().unwrap_or_default(),
            record.url.clone().unwrap_or_default(),
        )
    }
}

/// Submission form fields. Persist across submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanForm {
    input: ScanInput,
}

impl ScanForm {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current field values.
    pub fn input(&self) -> &ScanInput {
        &self.input
    }

    /// Sets the subject field.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.input.subject = subject.into();
    }

    /// Sets the body field.
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.input.body = body.into();
    }

    /// Sets the URL field.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.input.url = url.into();
    }

    /// Overwrites all three fields from a history row at once.
    pub fn apply_selection(&mut self, record: &ScanRecord) {
        self.input = SelectionBridge::apply(record);
    }
}

/// Formats a probability as a percentage with one decimal.
pub fn format_percent(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// Width of a probability bar in percent, always within `[0, 100]`.
pub fn bar_width_percent(probability: f64) -> f64 {
    clamp_probability(probability) * 100.0
}

/// Display projection of a scored scan.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentView {
    /// Verdict text.
    pub label: Label,
    /// Risk tier.
    pub tier: RiskTier,
    /// Percentage text, e.g. `93.0%`.
    pub percent_text: String,
    /// Clamped bar width in percent.
    pub bar_width_percent: f64,
    /// Explanation lines in order.
    pub explanation: Vec<String>,
}

/// Display projection of a [`ScanResult`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    /// Scan was scored.
    Assessment(AssessmentView),
    /// Scan failed; message is already user-safe.
    Error(String),
}

impl ResultView {
    /// Projects a result for display.
    pub fn from_result(result: &ScanResult) -> Self {
        match result {
            ScanResult::Assessed(assessment) => {
                let classification = classify(assessment.probability);
                Self::Assessment(AssessmentView {
                    label: assessment.label,
                    tier: classification.tier,
                    percent_text: format_percent(classification.probability),
                    bar_width_percent: bar_width_percent(assessment.probability),
                    explanation: assessment.explanation.clone(),
                })
            }
            ScanResult::Failed(failure) => Self::Error(failure.message.clone()),
        }
    }
}

/// Display projection of one history row.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRowView {
    /// Row id used for selection.
    pub id: String,
    /// Creation time as `YYYY-MM-DD HH:MM UTC`, or [`MISSING_DATE_TEXT`].
    pub date_text: String,
    /// Subject or [`NO_SUBJECT_PLACEHOLDER`].
    pub subject_text: String,
    /// `true` when the placeholder is shown.
    pub subject_missing: bool,
    /// Stored probability as percentage text.
    pub percent_text: String,
    /// Clamped bar width in percent.
    pub bar_width_percent: f64,
    /// Stored label or `unknown`.
    pub label_text: String,
    /// `true` when the stored label reads as phishing.
    pub is_phishing: bool,
}

impl HistoryRowView {
    /// Projects one stored row.
    pub fn from_record(record: &ScanRecord) -> Self {
        let probability = record.probability_or_zero();
        let subject = record.subject.as_deref().unwrap_or_default();
        Self {
            id: record.id.clone(),
            date_text: record.created_at.map_or_else(
                || MISSING_DATE_TEXT.to_string(),
                |created_at| created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            ),
            subject_text: if subject.is_empty() {
                NO_SUBJECT_PLACEHOLDER.to_string()
            } else {
                subject.to_string()
            },
            subject_missing: subject.is_empty(),
            percent_text: format_percent(probability),
            bar_width_percent: bar_width_percent(probability),
            label_text: record.label_or_unknown().to_string(),
            is_phishing: record.is_phishing(),
        }
    }
}

/// History panel projection.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryPanel {
    /// Nobody is signed in.
    LoggedOut,
    /// A fetch is in flight.
    Loading,
    /// The last fetch failed.
    Error(String),
    /// Signed in with no rows.
    Empty,
    /// Rows to render, newest first.
    Rows {
        /// `Showing latest N result(s)`.
        summary: String,
        /// Row projections.
        rows: Vec<HistoryRowView>,
    },
}

impl HistoryPanel {
    /// Projects a history store snapshot.
    pub fn project(
        signed_in: bool,
        loading: bool,
        error: Option<&str>,
        records: &[ScanRecord],
    ) -> Self {
        if !signed_in {
            return Self::LoggedOut;
        }
        if loading {
            return Self::Loading;
        }
        if let Some(error) = error {
            return Self::Error(error.to_string());
        }
        if records.is_empty() {
            return Self::Empty;
        }

        Self::Rows {
            summary: history_summary(records.len()),
            rows: records.iter().map(HistoryRowView::from_record).collect(),
        }
    }

    /// Status line for states without rows.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::LoggedOut => Some(HISTORY_LOGGED_OUT_MESSAGE),
            Self::Loading => Some(HISTORY_LOADING_MESSAGE),
            Self::Error(message) => Some(message),
            Self::Empty => Some(HISTORY_EMPTY_MESSAGE),
            Self::Rows { .. } => None,
        }
    }
}

fn history_summary(count: usize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("Showing latest {count} result{plural}")
}

/// Login/sign-up panel mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Existing account.
    #[default]
    Login,
    /// New account.
    SignUp,
}

/// Login/sign-up panel state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthPanelState {
    /// Current mode.
    pub mode: AuthMode,
    /// `true` while a request is in flight.
    pub processing: bool,
    /// Error text to show.
    pub error: Option<String>,
    /// Informational notice to show.
    pub notice: Option<String>,
}

impl AuthPanelState {
    /// Switches between login and sign-up, clearing messages.
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::Login,
        };
        self.error = None;
        self.notice = None;
    }

    /// Marks a request as started.
    pub fn begin(&mut self) {
        self.processing = true;
        self.error = None;
        self.notice = None;
    }

    /// Marks the request as successful.
    pub fn succeed(&mut self) {
        self.processing = false;
        if self.mode == AuthMode::SignUp {
            self.notice = Some(SIGNUP_NOTICE.to_string());
        }
    }

    /// Marks the request as failed; blank messages use the fallback.
    pub fn fail(&mut self, message: &str) {
        self.processing = false;
        self.error = Some(if message.trim().is_empty() {
            AUTH_PANEL_FALLBACK_ERROR.to_string()
        } else {
            message.to_string()
        });
    }

    /// Panel heading.
    pub fn title(&self) -> &'static str {
        match self.mode {
            AuthMode::Login => "Login",
            AuthMode::SignUp => "Create an account",
        }
    }

    /// Mode toggle link text.
    pub fn toggle_label(&self) -> &'static str {
        match self.mode {
            AuthMode::Login => "Need an account?",
            AuthMode::SignUp => "Have an account?",
        }
    }

    /// Submit button text.
    pub fn submit_label(&self) -> &'static str {
        match (self.processing, self.mode) {
            (true, _) => "Processing...",
            (false, AuthMode::Login) => "Login",
            (false, AuthMode::SignUp) => "Sign up",
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for form and panel state.

    use super::*;

    #[test]
    fn toggling_mode_clears_messages() {
        let mut panel = AuthPanelState::default();
        panel.fail("Invalid login credentials");
        panel.toggle_mode();

        assert_eq!(panel.mode, AuthMode::SignUp);
        assert!(panel.error.is_none());
        assert_eq!(panel.submit_label(), "Sign up");
    }

    #[test]
    fn signup_success_sets_notice() {
        let mut panel = AuthPanelState {
            mode: AuthMode::SignUp,
            ..AuthPanelState::default()
        };
        panel.begin();
        assert_eq!(panel.submit_label(), "Processing...");
        panel.succeed();
        assert_eq!(panel.notice.as_deref(), Some(SIGNUP_NOTICE));
    }

    #[test]
    fn summary_pluralizes() {
        assert_eq!(history_summary(1), "Showing latest 1 result");
        assert_eq!(history_summary(3), "Showing latest 3 results");
    }
}
