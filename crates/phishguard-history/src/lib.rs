#![warn(missing_docs)]
//! # phishguard-history
//!
//! ## Purpose
//! Synchronizes a user's server-held scan history into client state.
//!
//! ## Responsibilities
//! - Fetch the newest [`HISTORY_LIMIT`] scans for the current identity.
//! - Discard results that arrive after the identity changed or the store was
//!   torn down.
//! - Resolve a selected row id for the selection bridge.
//!
//! ## Data flow
//! Identity -> [`ScanHistoryStore::fetch`] -> [`ScanSource::fetch_scans`] ->
//! ordered, truncated rows -> [`ScanHistoryStore::select`] -> selection bridge.
//!
//! ## Ownership and lifetimes
//! Rows are owned clones of server data and are never mutated.
//!
//! ## Error model
//! Backend failures never propagate as errors from `fetch`; they become an
//! inline error message with an empty row set.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use phishguard_core::{Generation, Identity, ScanRecord};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Maximum number of rows kept in the store.
pub const HISTORY_LIMIT: usize = 50;

/// Inline message shown when history cannot be loaded.
pub const HISTORY_LOAD_FAILED_MESSAGE: &str = "Failed to load scan history.";

/// Storage query contract: rows for `owner_id`, newest first, at most `limit`.
#[async_trait]
pub trait ScanSource: Send + Sync {
    /// Fetches scan rows owned by `owner_id`.
    async fn fetch_scans(&self, owner_id: &str, limit: usize)
    -> Result<Vec<ScanRecord>, HistoryError>;
}

/// Result of one `fetch` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// No identity; the row set was cleared without a request.
    Anonymous,
    /// Rows were applied.
    Loaded(usize),
    /// Backend failed; inline error state was applied.
    Failed,
    /// A newer fetch or teardown made this result stale; nothing was applied.
    Discarded,
}

#[derive(Debug, Default)]
struct HistoryState {
    owner_id: Option<String>,
    records: Vec<ScanRecord>,
    loading: bool,
    error: Option<String>,
    disposed: bool,
    generation: Generation,
}

/// Client-side view of one user's scan history.
pub struct ScanHistoryStore {
    source: Arc<dyn ScanSource>,
    state: Mutex<HistoryState>,
}

impl ScanHistoryStore {
    /// Creates an empty store.
    pub fn new(source: Arc<dyn ScanSource>) -> Self {
        Self {
            source,
            state: Mutex::new(HistoryState::default()),
        }
    }

    /// Loads history for `identity`, replacing any previous rows.
    ///
    /// Starting a fetch invalidates every fetch still in flight.
    pub async fn fetch(&self, identity: Option<&Identity>) -> FetchOutcome {
        let (ticket, owner_id) = {
            let mut state = self.lock();
            if state.disposed {
                return FetchOutcome::Discarded;
            }

            let ticket = state.generation.advance();
            state.error = None;
            let Some(identity) = identity else {
                state.owner_id = None;
                state.records.clear();
                state.loading = false;
                return FetchOutcome::Anonymous;
            };

            if state.owner_id.as_deref() != Some(identity.id.as_str()) {
                state.records.clear();
            }
            state.owner_id = Some(identity.id.clone());
            state.loading = true;
            (ticket, identity.id.clone())
        };

        let fetched = self.source.fetch_scans(&owner_id, HISTORY_LIMIT).await;

        let mut state = self.lock();
        if !state.generation.is_current(ticket) {
            debug!(owner_id = %owner_id, "discarding stale history result");
            return FetchOutcome::Discarded;
        }

        state.loading = false;
        match fetched {
            Ok(mut records) => {
                // Newest first; rows without a timestamp sort last.
                records.sort_by(|left, right| right.created_at.cmp(&left.created_at));
                records.truncate(HISTORY_LIMIT);
                info!(owner_id = %owner_id, count = records.len(), "scan history loaded");
                let count = records.len();
                state.records = records;
                FetchOutcome::Loaded(count)
            }
            Err(error) => {
                warn!(owner_id = %owner_id, %error, "scan history fetch failed");
                state.records.clear();
                state.error = Some(HISTORY_LOAD_FAILED_MESSAGE.to_string());
                FetchOutcome::Failed
            }
        }
    }

    /// Looks up the row with `record_id` for hand-off to the selection
    /// bridge. Unknown ids yield `None`.
    pub fn select(&self, record_id: &str) -> Option<ScanRecord> {
        let selected = self
            .lock()
            .records
            .iter()
            .find(|record| record.id == record_id)
            .cloned();
        if selected.is_none() {
            debug!(record_id, "selected history row not found");
        }
        selected
    }

    /// Current rows, newest first.
    pub fn records(&self) -> Vec<ScanRecord> {
        self.lock().records.clone()
    }

    /// Owner the current rows belong to.
    pub fn owner_id(&self) -> Option<String> {
        self.lock().owner_id.clone()
    }

    /// `true` while a fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Inline error message from the last fetch.
    pub fn error_message(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Tears the store down; in-flight fetches will be discarded.
    pub fn dispose(&self) {
        let mut state = self.lock();
        state.disposed = true;
        state.loading = false;
        state.generation.advance();
    }

    fn lock(&self) -> MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ScanHistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ScanHistoryStore")
            .field("owner_id", &state.owner_id)
            .field("records", &state.records.len())
            .field("loading", &state.loading)
            .finish_non_exhaustive()
    }
}

/// History backend failures.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Backend could not be reached.
    #[error("history transport failure: {0}")]
    Transport(String),
    /// Backend answered with a failure status.
    #[error("history query rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Backend message.
        message: String,
    },
    /// Rows could not be decoded.
    #[error("history decode failure: {0}")]
    Decode(String),
}
