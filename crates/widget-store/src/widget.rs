//! CRUD for widget configuration, with owner, type, and visibility indexes
//! repaired on every write.

use std::collections::HashMap;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;
use widget_types::{Plan, WidgetType};

use crate::errors::{StoreError, StoreResult};
use crate::gateway::RedisGateway;
use crate::keys;
use crate::ttl::TtlManager;

const MAX_CREATE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Widget {
    pub widget_id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    pub is_visible: bool,
    pub config: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Denormalized snapshot of the owner's plan at last write. The spec's
    /// principal/plan pair is only known from a caller's JWT claim, which a
    /// public (anonymous) submission or lifecycle event never carries; this
    /// is the only durable link from `owner_id` to a retention window that
    /// public writes can reach. [`crate::ttl::TtlManager::apply_owner_plan`]
    /// keeps it in sync whenever the owner's plan changes.
    pub owner_plan: Plan,
}

/// Fields a caller may change via `Update`. `None` means "leave as is".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WidgetPatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub widget_type: Option<WidgetType>,
    pub is_visible: Option<bool>,
    pub config: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct WidgetFilter {
    pub widget_type: Option<WidgetType>,
    pub is_visible: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct WidgetPage {
    pub items: Vec<Widget>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OwnerSummary {
    pub total: u64,
    pub by_type: HashMap<String, u64>,
    pub by_visibility: HashMap<String, u64>,
}

pub struct WidgetRepository {
    gateway: RedisGateway,
    ttl: TtlManager,
    max_widgets_per_owner: u64,
}

impl WidgetRepository {
    pub fn new(gateway: RedisGateway, ttl: TtlManager, max_widgets_per_owner: u64) -> Self {
        Self {
            gateway,
            ttl,
            max_widgets_per_owner,
        }
    }

    pub async fn create(
        &self,
        owner_id: &str,
        owner_plan: widget_types::Plan,
        name: String,
        widget_type: WidgetType,
        is_visible: bool,
        config: Value,
    ) -> StoreResult<Widget> {
        if name.trim().is_empty() {
            return Err(StoreError::validation("name must not be empty"));
        }

        let retention = self.ttl.retention_for(owner_plan);
        let now = Utc::now();

        for _ in 0..MAX_CREATE_ATTEMPTS {
            let widget_id = Uuid::new_v4().simple().to_string();
            let record_key = keys::widget_record(&widget_id);

            if self.gateway.exists(&record_key).await? {
                continue;
            }

            let widget = Widget {
                widget_id: widget_id.clone(),
                owner_id: owner_id.to_string(),
                name: name.clone(),
                widget_type,
                is_visible,
                config: config.clone(),
                created_at: now,
                updated_at: now,
                owner_plan,
            };

            self.write_record(&widget, retention.as_seconds()).await?;
            self.repair_indexes_insert(&widget).await;

            return Ok(widget);
        }

        Err(StoreError::conflict(
            "could not allocate a unique widget id after several attempts",
        ))
    }

    pub async fn get(&self, widget_id: &str) -> StoreResult<Widget> {
        self.load(widget_id).await
    }

    pub async fn get_owned(&self, owner_id: &str, widget_id: &str) -> StoreResult<Widget> {
        let widget = self.load(widget_id).await?;
        if widget.owner_id != owner_id {
            // Same NotFound as a missing record: owner probes must not be
            // able to tell "doesn't exist" from "exists, isn't yours".
            return Err(StoreError::NotFound);
        }
        Ok(widget)
    }

    pub async fn update(
        &self,
        owner_id: &str,
        widget_id: &str,
        owner_plan: widget_types::Plan,
        patch: WidgetPatch,
    ) -> StoreResult<Widget> {
        let mut widget = self.get_owned(owner_id, widget_id).await?;
        let previous_type = widget.widget_type;
        let previous_visible = widget.is_visible;

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(StoreError::validation("name must not be empty"));
            }
            widget.name = name;
        }
        if let Some(widget_type) = patch.widget_type {
            widget.widget_type = widget_type;
        }
        if let Some(is_visible) = patch.is_visible {
            widget.is_visible = is_visible;
        }
        if let Some(config) = patch.config {
            widget.config = config;
        }
        widget.updated_at = Utc::now();
        widget.owner_plan = owner_plan;

        let retention = self.ttl.retention_for(owner_plan);
        self.write_record(&widget, retention.as_seconds()).await?;

        if previous_type != widget.widget_type {
            self.gateway
                .srem(&keys::type_index(previous_type.as_str()), &widget.widget_id)
                .await
                .ok();
            self.gateway
                .sadd(&keys::type_index(widget.widget_type.as_str()), &widget.widget_id)
                .await
                .ok();
        }
        if previous_visible != widget.is_visible {
            if widget.is_visible {
                self.gateway
                    .sadd(&keys::visibility_index(), &widget.widget_id)
                    .await
                    .ok();
            } else {
                self.gateway
                    .srem(&keys::visibility_index(), &widget.widget_id)
                    .await
                    .ok();
            }
        }

        Ok(widget)
    }

    pub async fn delete(&self, owner_id: &str, widget_id: &str) -> StoreResult<()> {
        let widget = self.get_owned(owner_id, widget_id).await?;

        self.gateway.del(&keys::widget_record(widget_id)).await?;

        // Secondary cleanups are best-effort: TTLs reap stragglers, and a
        // failure here must not roll back the already-committed deletion.
        if let Err(err) = self.gateway.srem(&keys::owner_index(owner_id), widget_id).await {
            warn!(widget_id, error = %err, "owner index cleanup failed, will expire");
        }
        if let Err(err) = self
            .gateway
            .srem(&keys::type_index(widget.widget_type.as_str()), widget_id)
            .await
        {
            warn!(widget_id, error = %err, "type index cleanup failed, will expire");
        }
        if let Err(err) = self.gateway.srem(&keys::visibility_index(), widget_id).await {
            warn!(widget_id, error = %err, "visibility index cleanup failed, will expire");
        }
        if let Err(err) = self.gateway.del(&keys::submission_list(widget_id)).await {
            warn!(widget_id, error = %err, "submission list cleanup failed, will expire");
        }

        Ok(())
    }

    pub async fn list_by_owner(
        &self,
        owner_id: &str,
        filter: &WidgetFilter,
        page_size: u32,
        cursor: Option<&str>,
    ) -> StoreResult<WidgetPage> {
        let candidate_ids = self.filtered_owner_ids(owner_id, filter).await?;

        let mut widgets = Vec::with_capacity(candidate_ids.len());
        for id in candidate_ids {
            if let Ok(widget) = self.load(&id).await {
                widgets.push(widget);
            }
            // Missing/expired ids are silently skipped: repair-on-read.
        }
        widgets.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.widget_id.cmp(&b.widget_id))
        });

        let start = match cursor {
            Some(token) => {
                let (after_created_at, after_id) = decode_cursor(token)?;
                widgets
                    .iter()
                    .position(|w| w.created_at < after_created_at || (w.created_at == after_created_at && w.widget_id > after_id))
                    .unwrap_or(widgets.len())
            }
            None => 0,
        };

        let page_size = page_size.max(1) as usize;
        let end = (start + page_size).min(widgets.len());
        let items: Vec<Widget> = widgets[start..end].to_vec();

        let next_cursor = if end < widgets.len() {
            let last = &items[items.len() - 1];
            Some(encode_cursor(last.created_at, &last.widget_id))
        } else {
            None
        };

        Ok(WidgetPage { items, next_cursor })
    }

    pub async fn summarize_by_owner(&self, owner_id: &str) -> StoreResult<OwnerSummary> {
        let owner_key = keys::owner_index(owner_id);
        let total = self.gateway.scard(&owner_key).await?;

        let mut by_type = HashMap::new();
        for widget_type in WidgetType::ALL {
            let count = self
                .gateway
                .sinterstore_card(&[owner_key.clone(), keys::type_index(widget_type.as_str())])
                .await?;
            by_type.insert(widget_type.as_str().to_string(), count);
        }

        let mut by_visibility = HashMap::new();
        let visible_count = self
            .gateway
            .sinterstore_card(&[owner_key.clone(), keys::visibility_index()])
            .await?;
        by_visibility.insert("visible".to_string(), visible_count);
        by_visibility.insert("hidden".to_string(), total.saturating_sub(visible_count));

        Ok(OwnerSummary {
            total,
            by_type,
            by_visibility,
        })
    }

    async fn filtered_owner_ids(
        &self,
        owner_id: &str,
        filter: &WidgetFilter,
    ) -> StoreResult<Vec<String>> {
        let mut keysets = vec![keys::owner_index(owner_id)];
        if let Some(widget_type) = filter.widget_type {
            keysets.push(keys::type_index(widget_type.as_str()));
        }
        if filter.is_visible == Some(true) {
            keysets.push(keys::visibility_index());
        }

        let mut ids = if keysets.len() == 1 {
            self.gateway.smembers(&keysets[0]).await?
        } else {
            self.gateway.sinter(&keysets).await?
        };

        if filter.is_visible == Some(false) {
            let visible: std::collections::HashSet<String> =
                self.gateway.smembers(&keys::visibility_index()).await?.into_iter().collect();
            ids.retain(|id| !visible.contains(id));
        }

        Ok(ids.into_iter().take(self.max_widgets_per_owner as usize).collect())
    }

    async fn load(&self, widget_id: &str) -> StoreResult<Widget> {
        let fields = self.gateway.hgetall(&keys::widget_record(widget_id)).await?;
        if fields.is_empty() {
            return Err(StoreError::NotFound);
        }
        decode_widget(widget_id, &fields)
    }

    async fn write_record(&self, widget: &Widget, ttl_secs: i64) -> StoreResult<()> {
        let record_key = keys::widget_record(&widget.widget_id);
        let fields = encode_widget(widget)?;
        self.gateway.hset_all(&record_key, fields).await?;
        self.gateway.expire(&record_key, ttl_secs).await?;
        Ok(())
    }

    async fn repair_indexes_insert(&self, widget: &Widget) {
        let owner_key = keys::owner_index(&widget.owner_id);
        let type_key = keys::type_index(widget.widget_type.as_str());
        let _ = self.gateway.sadd(&owner_key, &widget.widget_id).await;
        let _ = self.gateway.sadd(&type_key, &widget.widget_id).await;
        if widget.is_visible {
            let _ = self
                .gateway
                .sadd(&keys::visibility_index(), &widget.widget_id)
                .await;
        }
    }
}

fn encode_widget(widget: &Widget) -> StoreResult<Vec<(String, String)>> {
    Ok(vec![
        ("widget_id".to_string(), widget.widget_id.clone()),
        ("owner_id".to_string(), widget.owner_id.clone()),
        ("name".to_string(), widget.name.clone()),
        ("type".to_string(), widget.widget_type.as_str().to_string()),
        ("is_visible".to_string(), widget.is_visible.to_string()),
        ("config".to_string(), serde_json::to_string(&widget.config)?),
        ("created_at".to_string(), widget.created_at.to_rfc3339()),
        ("updated_at".to_string(), widget.updated_at.to_rfc3339()),
        ("owner_plan".to_string(), widget.owner_plan.as_str().to_string()),
    ])
}

fn decode_widget(widget_id: &str, fields: &HashMap<String, String>) -> StoreResult<Widget> {
    let get = |key: &str| {
        fields
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::fatal(format!("widget record missing field {key}")))
    };

    let widget_type = WidgetType::parse(&get("type")?)
        .ok_or_else(|| StoreError::fatal("widget record has invalid type"))?;
    let config: Value = serde_json::from_str(&get("config")?)?;
    let created_at = DateTime::parse_from_rfc3339(&get("created_at")?)
        .map_err(|e| StoreError::fatal(format!("invalid created_at: {e}")))?
        .with_timezone(&Utc);
    let updated_at = DateTime::parse_from_rfc3339(&get("updated_at")?)
        .map_err(|e| StoreError::fatal(format!("invalid updated_at: {e}")))?
        .with_timezone(&Utc);

    Ok(Widget {
        widget_id: widget_id.to_string(),
        owner_id: get("owner_id")?,
        name: get("name")?,
        widget_type,
        is_visible: get("is_visible")? == "true",
        config,
        created_at,
        updated_at,
        owner_plan: fields
            .get("owner_plan")
            .and_then(|s| Plan::parse(s))
            .unwrap_or_default(),
    })
}

fn encode_cursor(created_at: DateTime<Utc>, widget_id: &str) -> String {
    let raw = format!("{}|{}", created_at.to_rfc3339(), widget_id);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw)
}

fn decode_cursor(token: &str) -> StoreResult<(DateTime<Utc>, String)> {
    let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| StoreError::validation("invalid cursor"))?;
    let raw = String::from_utf8(raw).map_err(|_| StoreError::validation("invalid cursor"))?;
    let (ts, id) = raw
        .split_once('|')
        .ok_or_else(|| StoreError::validation("invalid cursor"))?;
    let created_at = DateTime::parse_from_rfc3339(ts)
        .map_err(|_| StoreError::validation("invalid cursor"))?
        .with_timezone(&Utc);
    Ok((created_at, id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let at = Utc::now();
        let token = encode_cursor(at, "abc123");
        let (decoded_at, decoded_id) = decode_cursor(&token).unwrap();
        assert_eq!(decoded_id, "abc123");
        assert_eq!(decoded_at.timestamp(), at.timestamp());
    }

    #[test]
    fn decode_widget_rejects_missing_fields() {
        let fields = HashMap::new();
        assert!(decode_widget("w1", &fields).is_err());
    }
}
