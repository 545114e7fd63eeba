//! The only component the HTTP layer reaches. Orchestrates the three
//! repositories and the TTL manager, enforces ownership and visibility, and
//! is the one place that turns a `widget_store::StoreError` into the
//! request-shaped data the handlers serialize.

use serde_json::Value;
use widget_store::{
    ExportFormat, OwnerSummary, StatsRepository, StatsSummary, Submission, SubmissionRepository,
    TtlManager, Widget, WidgetFilter, WidgetPage, WidgetPatch, WidgetRepository,
};
use widget_types::{EventKind, Plan, WidgetType};

use crate::errors::{ApiError, ApiResult};

pub struct WidgetService {
    widgets: WidgetRepository,
    submissions: SubmissionRepository,
    stats: StatsRepository,
    ttl: TtlManager,
    max_page_size: u32,
}

impl WidgetService {
    pub fn new(
        widgets: WidgetRepository,
        submissions: SubmissionRepository,
        stats: StatsRepository,
        ttl: TtlManager,
        max_page_size: u32,
    ) -> Self {
        Self {
            widgets,
            submissions,
            stats,
            ttl,
            max_page_size,
        }
    }

    pub async fn create_widget(
        &self,
        owner_id: &str,
        owner_plan: Plan,
        name: String,
        widget_type_raw: &str,
        is_visible: bool,
        config: Value,
    ) -> ApiResult<Widget> {
        let widget_type = parse_widget_type(widget_type_raw)?;
        let widget = self
            .widgets
            .create(owner_id, owner_plan, name, widget_type, is_visible, config)
            .await?;
        Ok(widget)
    }

    /// Public lookup: an invisible widget is indistinguishable from a
    /// missing one, to avoid letting a probe confirm a hidden widget exists.
    pub async fn get_widget_public(&self, widget_id: &str) -> ApiResult<Widget> {
        let widget = self.widgets.get(widget_id).await?;
        if !widget.is_visible {
            return Err(ApiError::NotFound);
        }
        Ok(widget)
    }

    pub async fn get_widget_owned(&self, owner_id: &str, widget_id: &str) -> ApiResult<Widget> {
        Ok(self.widgets.get_owned(owner_id, widget_id).await?)
    }

    pub async fn update_widget(
        &self,
        owner_id: &str,
        widget_id: &str,
        owner_plan: Plan,
        name: Option<String>,
        widget_type_raw: Option<&str>,
        is_visible: Option<bool>,
        config: Option<Value>,
    ) -> ApiResult<Widget> {
        let widget_type = widget_type_raw.map(parse_widget_type).transpose()?;
        let patch = WidgetPatch {
            name,
            widget_type,
            is_visible,
            config,
        };
        let widget = self.widgets.update(owner_id, widget_id, owner_plan, patch).await?;
        Ok(widget)
    }

    pub async fn delete_widget(&self, owner_id: &str, widget_id: &str) -> ApiResult<()> {
        self.widgets.delete(owner_id, widget_id).await?;
        Ok(())
    }

    pub async fn list_widgets(
        &self,
        owner_id: &str,
        widget_type_raw: Option<&str>,
        is_visible: Option<bool>,
        page_size: Option<u32>,
        cursor: Option<&str>,
    ) -> ApiResult<WidgetPage> {
        let widget_type = widget_type_raw.map(parse_widget_type).transpose()?;
        let filter = WidgetFilter {
            widget_type,
            is_visible,
        };
        let page_size = page_size.unwrap_or(self.max_page_size).min(self.max_page_size);
        let page = self.widgets.list_by_owner(owner_id, &filter, page_size, cursor).await?;
        Ok(page)
    }

    pub async fn summarize_widgets(&self, owner_id: &str) -> ApiResult<OwnerSummary> {
        Ok(self.widgets.summarize_by_owner(owner_id).await?)
    }

    /// Public submission path: loads with the same visibility gate as
    /// `get_widget_public`, then appends. The submission repository's
    /// `append` already folds the stats-submit increment into the same
    /// hash-tagged transaction.
    pub async fn submit_widget(
        &self,
        widget_id: &str,
        data: Value,
        client_ip: Option<String>,
        user_agent: Option<String>,
    ) -> ApiResult<Submission> {
        let widget = self.get_widget_public(widget_id).await?;
        let owner_plan = self.owner_plan_for(&widget).await;
        let submission = self
            .submissions
            .append(widget_id, owner_plan, data, client_ip, user_agent)
            .await?;
        Ok(submission)
    }

    /// Public lifecycle event path. Only `view`/`close` are valid here —
    /// `submit` events are recorded as a side effect of `submit_widget`, not
    /// through this endpoint.
    pub async fn record_event(&self, widget_id: &str, kind_raw: &str) -> ApiResult<()> {
        let kind = match EventKind::parse(kind_raw) {
            Some(EventKind::View) => EventKind::View,
            Some(EventKind::Close) => EventKind::Close,
            Some(EventKind::Submit) | None => {
                return Err(ApiError::validation(format!(
                    "unsupported event type: {kind_raw}"
                )))
            }
        };

        let widget = self.get_widget_public(widget_id).await?;
        let owner_plan = self.owner_plan_for(&widget).await;
        self.stats.record_event(widget_id, kind, owner_plan).await?;
        Ok(())
    }

    pub async fn get_stats(&self, owner_id: &str, widget_id: &str) -> ApiResult<StatsSummary> {
        let widget = self.get_widget_owned(owner_id, widget_id).await?;
        let owner_plan = self.owner_plan_for(&widget).await;
        Ok(self.stats.summary(widget_id, owner_plan).await?)
    }

    pub async fn list_submissions(
        &self,
        owner_id: &str,
        widget_id: &str,
        offset: u32,
        limit: u32,
    ) -> ApiResult<Vec<Submission>> {
        self.get_widget_owned(owner_id, widget_id).await?;
        Ok(self.submissions.list(widget_id, offset, limit).await?)
    }

    pub async fn export_submissions(
        &self,
        owner_id: &str,
        widget_id: &str,
        format_raw: &str,
    ) -> ApiResult<(Vec<u8>, ExportFormat)> {
        self.get_widget_owned(owner_id, widget_id).await?;
        let format = ExportFormat::parse(format_raw)
            .ok_or_else(|| ApiError::validation(format!("unsupported export format: {format_raw}")))?;
        let bytes = self.submissions.export(widget_id, format).await?;
        Ok((bytes, format))
    }

    /// Re-applies TTLs across every widget the owner holds for their new
    /// plan. Triggered synchronously by the `PUT /users/{id}/ttl` handler:
    /// it only ever touches one owner's widgets, so there's no need to make
    /// it a periodic background sweep over the whole keyspace.
    pub async fn update_owner_plan(&self, owner_id: &str, plan_raw: &str) -> ApiResult<u64> {
        let plan = parse_plan(plan_raw)?;
        let applied = self.ttl.apply_owner_plan(owner_id, plan).await?;
        Ok(applied)
    }

    /// Public writes (submissions, lifecycle events) carry no JWT claim, so
    /// they have no principal to read a `plan` off of. `owner_plan` on the
    /// widget record is the denormalized stand-in: set from the owner's
    /// claim at create/update time and kept current by
    /// `update_owner_plan`'s walk over the owner's widgets.
    async fn owner_plan_for(&self, widget: &Widget) -> Plan {
        widget.owner_plan
    }
}

fn parse_widget_type(raw: &str) -> ApiResult<WidgetType> {
    WidgetType::parse(raw).ok_or_else(|| ApiError::validation(format!("unknown widget type: {raw}")))
}

fn parse_plan(raw: &str) -> ApiResult<Plan> {
    Plan::parse(raw).ok_or_else(|| ApiError::validation(format!("unknown plan: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_widget_type_rejects_unknown_values() {
        assert!(parse_widget_type("gadget").is_err());
        assert!(parse_widget_type("form").is_ok());
    }

    #[test]
    fn parse_plan_rejects_unknown_values() {
        assert!(parse_plan("enterprise").is_err());
        assert!(parse_plan("pro").is_ok());
    }
}
