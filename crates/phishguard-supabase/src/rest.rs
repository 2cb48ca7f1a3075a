//! PostgREST binding for [`ScanSource`].

use async_trait::async_trait;
use phishguard_core::ScanRecord;
use phishguard_history::{HistoryError, ScanSource};
use tracing::debug;

use crate::{SCANS_TABLE, SupabaseClient, error_message};

impl SupabaseClient {
    /// Builds the row query for `owner_id`: newest first, at most `limit`.
    ///
    /// # Errors
    /// Returns [`HistoryError::Transport`] when the table path cannot be
    /// joined onto the project URL.
    pub fn scans_query(&self, owner_id: &str, limit: usize) -> Result<url::Url, HistoryError> {
        let mut endpoint = self
            .endpoint(&format!("rest/v1/{SCANS_TABLE}"))
            .map_err(|error| HistoryError::Transport(error.to_string()))?;

        endpoint
            .query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("user_id", &format!("eq.{owner_id}"))
            .append_pair("order", "created_at.desc")
            .append_pair("limit", &limit.to_string());
        Ok(endpoint)
    }
}

#[async_trait]
impl ScanSource for SupabaseClient {
    async fn fetch_scans(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<ScanRecord>, HistoryError> {
        let endpoint = self.scans_query(owner_id, limit)?;
        debug!(table = SCANS_TABLE, limit, "querying scan history");

        let response = self
            .http
            .get(endpoint)
            .header("apikey", &self.anon_key)
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|error| HistoryError::Transport(error.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| HistoryError::Transport(error.to_string()))?;

        if !status.is_success() {
            return Err(HistoryError::Rejected {
                status: status.as_u16(),
                message: error_message(&String::from_utf8_lossy(&body)).unwrap_or_default(),
            });
        }

        ScanRecord::list_from_json_bytes(&body).map_err(|error| HistoryError::Decode(error.to_string()))
    }
}
