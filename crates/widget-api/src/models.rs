//! Wire types for the HTTP surface: request bodies, query params, and
//! response envelopes. Keeps `widget_store`'s domain structs free of
//! HTTP-specific renaming/defaulting concerns.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use widget_store::{OwnerSummary, StatsSummary, Submission, Widget};

#[derive(Debug, Deserialize)]
pub struct CreateWidgetRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub widget_type: String,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default = "default_config")]
    pub config: Value,
}

fn default_config() -> Value {
    Value::Object(Default::default())
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateWidgetRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub widget_type: Option<String>,
    pub is_visible: Option<bool>,
    pub config: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListWidgetsQuery {
    pub page: Option<String>,
    pub page_size: Option<u32>,
    #[serde(rename = "type")]
    pub widget_type: Option<String>,
    pub visible: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default = "default_config")]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct EventRequest {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct ListSubmissionsQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlanRequest {
    pub plan: String,
}

#[derive(Debug, Serialize)]
pub struct WidgetResponse {
    pub widget_id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub widget_type: String,
    pub is_visible: bool,
    pub config: Value,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Widget> for WidgetResponse {
    fn from(widget: Widget) -> Self {
        Self {
            widget_id: widget.widget_id,
            owner_id: widget.owner_id,
            name: widget.name,
            widget_type: widget.widget_type.as_str().to_string(),
            is_visible: widget.is_visible,
            config: widget.config,
            created_at: widget.created_at.to_rfc3339(),
            updated_at: widget.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WidgetPageResponse {
    pub items: Vec<WidgetResponse>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub total: u64,
    pub by_type: std::collections::HashMap<String, u64>,
    pub by_visibility: std::collections::HashMap<String, u64>,
}

impl From<OwnerSummary> for SummaryResponse {
    fn from(summary: OwnerSummary) -> Self {
        Self {
            total: summary.total,
            by_type: summary.by_type,
            by_visibility: summary.by_visibility,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmissionIdResponse {
    pub submission_id: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub submission_id: String,
    pub data: Value,
    pub submitted_at: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl From<Submission> for SubmissionResponse {
    fn from(submission: Submission) -> Self {
        Self {
            submission_id: submission.submission_id,
            data: submission.data,
            submitted_at: submission.submitted_at.to_rfc3339(),
            client_ip: submission.client_ip,
            user_agent: submission.user_agent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmissionPageResponse {
    pub items: Vec<SubmissionResponse>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub views: u64,
    pub closes: u64,
    pub submits: u64,
    pub conversion_rate: f64,
}

impl From<StatsSummary> for StatsResponse {
    fn from(summary: StatsSummary) -> Self {
        Self {
            views: summary.views,
            closes: summary.closes,
            submits: summary.submits,
            conversion_rate: summary.conversion_rate,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub components: HealthComponents,
}

#[derive(Debug, Serialize)]
pub struct HealthComponents {
    pub redis: &'static str,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Default)]
pub struct MetricsSnapshot {
    pub widgets_created: u64,
    pub submissions_appended: u64,
    pub events_recorded: u64,
    pub requests_admitted: u64,
    pub requests_rate_limited: u64,
}
