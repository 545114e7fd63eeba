//! Per-minute event counters, summarized on read. Counters are approximate
//! and eventually consistent by design — the rate limiter makes the same
//! tradeoff for admission counting.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use widget_types::{EventKind, Plan};

use crate::errors::StoreResult;
use crate::gateway::RedisGateway;
use crate::keys;
use crate::ttl::TtlManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Minute,
    Hour,
    Day,
}

impl Granularity {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "minute" => Some(Granularity::Minute),
            "hour" => Some(Granularity::Hour),
            "day" => Some(Granularity::Day),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct StatsSummary {
    pub views: u64,
    pub closes: u64,
    pub submits: u64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeSeriesPoint {
    pub bucket_start: DateTime<Utc>,
    pub count: u64,
}

const MGET_CHUNK: usize = 500;

pub struct StatsRepository {
    gateway: RedisGateway,
    ttl: TtlManager,
}

impl StatsRepository {
    pub fn new(gateway: RedisGateway, ttl: TtlManager) -> Self {
        Self { gateway, ttl }
    }

    pub async fn record_event(&self, widget_id: &str, kind: EventKind, owner_plan: Plan) -> StoreResult<()> {
        let window = keys::minute_window(Utc::now());
        let key = keys::stats_bucket(widget_id, kind, &window);
        let ttl_secs = self.ttl.retention_for(owner_plan).as_seconds();
        self.gateway.incr_with_expire(&key, ttl_secs).await?;
        Ok(())
    }

    /// Sums every minute bucket over the owner's retention window. The
    /// window itself doubles as "how far back stats buckets can still
    /// exist" since they share the widget's TTL.
    pub async fn summary(&self, widget_id: &str, owner_plan: Plan) -> StoreResult<StatsSummary> {
        let retention = self.ttl.retention_for(owner_plan);
        let now = Utc::now();
        let from = now - retention.as_duration_chrono();

        let views = self.sum_range(widget_id, EventKind::View, from, now).await?;
        let closes = self.sum_range(widget_id, EventKind::Close, from, now).await?;
        let submits = self.sum_range(widget_id, EventKind::Submit, from, now).await?;

        let conversion_rate = round_one_decimal(submits as f64 / views.max(1) as f64);

        Ok(StatsSummary {
            views,
            closes,
            submits,
            conversion_rate,
        })
    }

    pub async fn time_series(
        &self,
        widget_id: &str,
        kind: EventKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        granularity: Granularity,
    ) -> StoreResult<Vec<TimeSeriesPoint>> {
        let bucket_len = match granularity {
            Granularity::Minute => ChronoDuration::minutes(1),
            Granularity::Hour => ChronoDuration::hours(1),
            Granularity::Day => ChronoDuration::days(1),
        };

        let mut points = Vec::new();
        let mut cursor = floor_to(from, granularity);
        while cursor < to {
            let next = cursor + bucket_len;
            let count = self.sum_range(widget_id, kind, cursor, next).await?;
            points.push(TimeSeriesPoint {
                bucket_start: cursor,
                count,
            });
            cursor = next;
        }
        Ok(points)
    }

    /// Batches per-minute bucket keys into `MGET` calls of at most
    /// [`MGET_CHUNK`] keys rather than one round trip per minute — a 90-day
    /// `pro` window is ~130,000 buckets, which would otherwise dominate the
    /// request's latency with sequential `GET`s.
    async fn sum_range(
        &self,
        widget_id: &str,
        kind: EventKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut bucket_keys = Vec::new();
        let mut cursor = from;
        while cursor < to {
            let window = keys::minute_window(cursor);
            bucket_keys.push(keys::stats_bucket(widget_id, kind, &window));
            cursor += ChronoDuration::minutes(1);
        }

        let mut total = 0u64;
        for chunk in bucket_keys.chunks(MGET_CHUNK) {
            let values = self.gateway.mget(chunk).await?;
            for value in values.into_iter().flatten() {
                total += value.parse::<u64>().unwrap_or(0);
            }
        }
        Ok(total)
    }
}

fn floor_to(at: DateTime<Utc>, granularity: Granularity) -> DateTime<Utc> {
    let secs = at.timestamp();
    let floored = match granularity {
        Granularity::Minute => secs - secs.rem_euclid(60),
        Granularity::Hour => secs - secs.rem_euclid(3600),
        Granularity::Day => secs - secs.rem_euclid(86_400),
    };
    DateTime::from_timestamp(floored, 0).unwrap_or(at)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

trait RetentionSeconds {
    fn as_duration_chrono(&self) -> ChronoDuration;
}

impl RetentionSeconds for widget_types::PlanRetention {
    fn as_duration_chrono(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.as_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_rate_rounds_to_one_decimal() {
        assert_eq!(round_one_decimal(1.0 / 3.0), 0.3);
        assert_eq!(round_one_decimal(0.0), 0.0);
    }

    #[test]
    fn granularity_parses_known_values() {
        assert_eq!(Granularity::parse("hour"), Some(Granularity::Hour));
        assert_eq!(Granularity::parse("fortnight"), None);
    }
}
