//! Shared domain types for the widget backend.
//!
//! This crate holds the small set of types that both the storage layer
//! (`widget-store`) and the HTTP layer (`widget-api`) need to agree on
//! without depending on each other: the widget/event enumerations, the
//! billing plan and its retention policy, and a handful of serde-friendly
//! newtypes used on the wire.

pub mod domain;
pub mod retention;

pub use domain::{EventKind, Plan, WidgetType};
pub use retention::{PlanRetention, RetentionTable};
