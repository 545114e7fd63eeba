/*!
Redis-backed storage and lifecycle layer for the widget backend.

This crate owns every byte that touches Redis: deterministic key naming
([`keys`]), a thin gateway over pipelined/transactional Redis operations
([`gateway`]), the three owner-scoped repositories ([`widget`],
[`submission`], [`stats`]), per-plan retention ([`ttl`]), and the fixed-window
rate limiter ([`rate_limit`]). Nothing above this crate should construct a
Redis key string or issue a raw Redis command directly.
*/

pub mod config;
pub mod errors;
pub mod gateway;
pub mod keys;
pub mod rate_limit;
pub mod stats;
pub mod submission;
pub mod ttl;
pub mod widget;

pub use config::StoreConfig;
pub use errors::{StoreError, StoreResult};
pub use gateway::RedisGateway;
pub use rate_limit::{RateDecision, RateLimiter};
pub use stats::{StatsRepository, StatsSummary, TimeSeriesPoint};
pub use submission::{ExportFormat, Submission, SubmissionRepository};
pub use ttl::TtlManager;
pub use widget::{OwnerSummary, Widget, WidgetFilter, WidgetPage, WidgetPatch, WidgetRepository};

pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
