//! Append-only submission log per widget with capped retention. Entries are
//! never edited after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{StoreError, StoreResult};
use crate::gateway::RedisGateway;
use crate::keys;
use crate::ttl::TtlManager;
use widget_types::{EventKind, Plan};

const MAX_LIST_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Submission {
    pub submission_id: String,
    pub widget_id: String,
    pub data: Value,
    pub submitted_at: DateTime<Utc>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Ndjson,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            "ndjson" => Some(ExportFormat::Ndjson),
            _ => None,
        }
    }
}

pub struct SubmissionRepository {
    gateway: RedisGateway,
    ttl: TtlManager,
    max_per_widget: u64,
}

impl SubmissionRepository {
    pub fn new(gateway: RedisGateway, ttl: TtlManager, max_per_widget: u64) -> Self {
        Self {
            gateway,
            ttl,
            max_per_widget,
        }
    }

    /// Appends a submission and increments the matching stats bucket. Both
    /// writes touch keys that share the `{widget_id}` hash tag, so they run
    /// in one transaction: a cancellation between list append and stats
    /// increment would otherwise be possible, but grouping them removes the
    /// common case of that race entirely.
    pub async fn append(
        &self,
        widget_id: &str,
        owner_plan: Plan,
        data: Value,
        client_ip: Option<String>,
        user_agent: Option<String>,
    ) -> StoreResult<Submission> {
        let submission = Submission {
            // v7 embeds a millisecond timestamp so submission ids sort
            // time-ordered, matching the append-order the list itself keeps.
            submission_id: uuid::Uuid::now_v7().to_string(),
            widget_id: widget_id.to_string(),
            data,
            submitted_at: Utc::now(),
            client_ip,
            user_agent,
        };

        let serialized = serde_json::to_string(&submission)?;
        let list_key = keys::submission_list(widget_id);
        let window = keys::minute_window(submission.submitted_at);
        let stats_key = keys::stats_bucket(widget_id, EventKind::Submit, &window);
        let ttl_secs = self.ttl.retention_for(owner_plan).as_seconds();
        let cap = self.max_per_widget;

        self.gateway
            .transaction(move |pipe| {
                pipe.cmd("LPUSH").arg(&list_key).arg(&serialized).ignore();
                pipe.cmd("LTRIM")
                    .arg(&list_key)
                    .arg(0)
                    .arg((cap as isize) - 1)
                    .ignore();
                pipe.cmd("EXPIRE").arg(&list_key).arg(ttl_secs.max(1)).ignore();
                pipe.cmd("INCR").arg(&stats_key).ignore();
                pipe.cmd("EXPIRE").arg(&stats_key).arg(ttl_secs.max(1)).ignore();
            })
            .await?;

        Ok(submission)
    }

    pub async fn list(&self, widget_id: &str, offset: u32, limit: u32) -> StoreResult<Vec<Submission>> {
        let limit = limit.clamp(1, MAX_LIST_LIMIT);
        let raw = self
            .gateway
            .lrange(&keys::submission_list(widget_id), offset as isize, limit as isize)
            .await?;
        raw.into_iter()
            .map(|s| serde_json::from_str(&s).map_err(StoreError::from))
            .collect()
    }

    pub async fn recent(&self, widget_id: &str, n: u32) -> StoreResult<Vec<Submission>> {
        self.list(widget_id, 0, n).await
    }

    pub async fn count_capped(&self, widget_id: &str) -> StoreResult<u64> {
        let len = self.gateway.llen(&keys::submission_list(widget_id)).await?;
        Ok((len as u64).min(self.max_per_widget))
    }

    /// Streams the full retained list (newest-first) in the requested wire
    /// format. Does not detect or report truncation if the list was
    /// previously capped mid-append: export reads whatever is retained now.
    pub async fn export(&self, widget_id: &str, format: ExportFormat) -> StoreResult<Vec<u8>> {
        let raw = self
            .gateway
            .lrange(&keys::submission_list(widget_id), 0, self.max_per_widget as isize)
            .await?;
        let submissions: Vec<Submission> = raw
            .into_iter()
            .map(|s| serde_json::from_str(&s).map_err(StoreError::from))
            .collect::<StoreResult<_>>()?;

        match format {
            ExportFormat::Json => Ok(serde_json::to_vec(&submissions)?),
            ExportFormat::Ndjson => {
                let mut out = Vec::new();
                for submission in &submissions {
                    out.extend(serde_json::to_vec(submission)?);
                    out.push(b'\n');
                }
                Ok(out)
            }
            ExportFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                writer
                    .write_record(["submission_id", "submitted_at", "client_ip", "user_agent", "data"])
                    .map_err(|e| StoreError::fatal(format!("csv write failed: {e}")))?;
                for submission in &submissions {
                    writer
                        .write_record([
                            submission.submission_id.as_str(),
                            submission.submitted_at.to_rfc3339().as_str(),
                            submission.client_ip.as_deref().unwrap_or(""),
                            submission.user_agent.as_deref().unwrap_or(""),
                            submission.data.to_string().as_str(),
                        ])
                        .map_err(|e| StoreError::fatal(format!("csv write failed: {e}")))?;
                }
                writer
                    .into_inner()
                    .map_err(|e| StoreError::fatal(format!("csv flush failed: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_format_parses_known_values() {
        assert_eq!(ExportFormat::parse("json"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse("csv"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse("ndjson"), Some(ExportFormat::Ndjson));
        assert_eq!(ExportFormat::parse("xml"), None);
    }
}
