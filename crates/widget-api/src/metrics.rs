//! In-process metrics registry backing `GET /metrics`.
//!
//! This is a JSON snapshot, not a Prometheus scrape target: a handful of
//! atomic counters, bumped inline by the service layer and the rate-limit
//! middleware, read out as a [`crate::models::MetricsSnapshot`] on request.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::MetricsSnapshot;

#[derive(Default)]
pub struct MetricsRegistry {
    widgets_created: AtomicU64,
    submissions_appended: AtomicU64,
    events_recorded: AtomicU64,
    requests_admitted: AtomicU64,
    requests_rate_limited: AtomicU64,
}

impl MetricsRegistry {
    pub fn record_widget_created(&self) {
        self.widgets_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submission_appended(&self) {
        self.submissions_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event(&self) {
        self.events_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_admission(&self, admitted: bool) {
        if admitted {
            self.requests_admitted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_rate_limited.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            widgets_created: self.widgets_created.load(Ordering::Relaxed),
            submissions_appended: self.submissions_appended.load(Ordering::Relaxed),
            events_recorded: self.events_recorded.load(Ordering::Relaxed),
            requests_admitted: self.requests_admitted.load(Ordering::Relaxed),
            requests_rate_limited: self.requests_rate_limited.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let registry = MetricsRegistry::default();
        let snap = registry.snapshot();
        assert_eq!(snap.widgets_created, 0);
        assert_eq!(snap.requests_admitted, 0);
    }

    #[test]
    fn admission_splits_into_admitted_and_rate_limited() {
        let registry = MetricsRegistry::default();
        registry.record_admission(true);
        registry.record_admission(true);
        registry.record_admission(false);
        let snap = registry.snapshot();
        assert_eq!(snap.requests_admitted, 2);
        assert_eq!(snap.requests_rate_limited, 1);
    }
}
