//! Resolves an owner's plan to a retention window and re-applies it to
//! every owner-scoped key on write. There is no touch-on-read — reads never
//! extend a TTL.

use widget_types::{Plan, PlanRetention, RetentionTable};

use crate::errors::StoreResult;
use crate::gateway::RedisGateway;
use crate::keys;

#[derive(Clone)]
pub struct TtlManager {
    table: RetentionTable,
    gateway: RedisGateway,
}

impl TtlManager {
    pub fn new(table: RetentionTable, gateway: RedisGateway) -> Self {
        Self { table, gateway }
    }

    pub fn retention_for(&self, plan: Plan) -> PlanRetention {
        self.table.for_plan(plan)
    }

    /// Walks every widget the owner holds and re-applies the retention for
    /// `new_plan` to its record, submission list, and every stats bucket the
    /// widget currently has (type/visibility index membership is left
    /// untouched — those carry no TTL of their own). Also rewrites the
    /// record's denormalized `owner_plan` field, the signal public writes
    /// (which carry no JWT claim) use to pick a retention for newly touched
    /// stats buckets. Idempotent: running it twice in a row is a no-op on
    /// the second pass. On a downgrade this shortens every bucket's TTL
    /// immediately rather than waiting for the next event to touch it —
    /// otherwise a widget's buckets from a longer-retention plan would
    /// outlive the new window until their own next increment.
    pub async fn apply_owner_plan(&self, owner_id: &str, new_plan: Plan) -> StoreResult<u64> {
        let retention = self.retention_for(new_plan);
        let ttl_secs = retention.as_seconds();

        let widget_ids = self.gateway.smembers(&keys::owner_index(owner_id)).await?;
        let mut applied = 0u64;

        for widget_id in &widget_ids {
            let record_key = keys::widget_record(widget_id);
            if self.gateway.exists(&record_key).await? {
                self.gateway
                    .hset_all(
                        &record_key,
                        vec![("owner_plan".to_string(), new_plan.as_str().to_string())],
                    )
                    .await?;
                self.gateway.expire(&record_key, ttl_secs).await?;
                let _ = self
                    .gateway
                    .expire(&keys::submission_list(widget_id), ttl_secs)
                    .await;

                let bucket_keys = self
                    .gateway
                    .scan_match(&keys::stats_bucket_pattern(widget_id))
                    .await?;
                for bucket_key in bucket_keys {
                    let _ = self.gateway.expire(&bucket_key, ttl_secs).await;
                }

                applied += 1;
            }
        }

        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_lookup_matches_table() {
        let table = RetentionTable::new(7, 90);
        // TtlManager::retention_for only reads the table; no Redis needed.
        assert_eq!(table.for_plan(Plan::Free).days, 7);
        assert_eq!(table.for_plan(Plan::Pro).days, 90);
    }
}
