//! Deterministic key construction. This is the single place in the crate
//! allowed to format a Redis key string; every repository goes through it.

use chrono::{DateTime, Utc};
use widget_types::EventKind;

/// Formats a timestamp as the minute-resolution window label used by both
/// the stats buckets and the rate limiter (`yyyy-mm-ddThh:mm`).
pub fn minute_window(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M").to_string()
}

/// Every per-widget key below wraps `widget_id` in a `{...}` hash tag so a
/// clustered deployment always routes a widget's record, submission list,
/// and stats buckets to the same slot — required for `RedisGateway::transaction`
/// to run multi-key pipelines atomically.
pub fn widget_record(widget_id: &str) -> String {
    format!("widget:{{{widget_id}}}")
}

/// Owner/type/visibility indexes all share the `{idx}` hash tag so
/// [`crate::gateway::RedisGateway::sinter`]/`sinterstore_card` — which
/// intersect an owner's index against a type or visibility index — stay a
/// single-slot operation on a clustered deployment.
pub fn owner_index(owner_id: &str) -> String {
    format!("{{idx}}:owner:{owner_id}:widgets")
}

pub fn type_index(widget_type: &str) -> String {
    format!("{{idx}}:type:{widget_type}:widgets")
}

pub fn visibility_index() -> String {
    "{idx}:visible:widgets".to_string()
}

pub fn submission_list(widget_id: &str) -> String {
    format!("widget:{{{widget_id}}}:submissions")
}

pub fn stats_bucket(widget_id: &str, kind: EventKind, window: &str) -> String {
    format!("widget:{{{widget_id}}}:stats:{kind}:{window}")
}

/// `SCAN ... MATCH` pattern covering every stats bucket of a widget,
/// regardless of kind or minute.
pub fn stats_bucket_pattern(widget_id: &str) -> String {
    format!("widget:{{{widget_id}}}:stats:*")
}

pub fn rate_limit_ip(ip: &str, window: &str) -> String {
    format!("rl:ip:{ip}:{window}")
}

pub fn rate_limit_global(window: &str) -> String {
    format!("rl:global:{window}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn minute_window_floors_to_the_minute() {
        let at = Utc.with_ymd_and_hms(2026, 7, 28, 14, 5, 59).unwrap();
        assert_eq!(minute_window(at), "2026-07-28T14:05");
    }

    #[test]
    fn widget_and_submission_keys_share_the_widget_id_hash_tag() {
        assert_eq!(widget_record("w1"), "widget:{w1}");
        assert_eq!(submission_list("w1"), "widget:{w1}:submissions");
    }

    #[test]
    fn stats_bucket_key_includes_kind_and_window() {
        assert_eq!(
            stats_bucket("w1", EventKind::Submit, "2026-07-28T14:05"),
            "widget:{w1}:stats:submit:2026-07-28T14:05"
        );
    }
}
