//! Core enumerations shared across the storage and API layers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of displayable artifact a widget renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    Form,
    Popup,
    Banner,
    Quiz,
    Survey,
}

impl WidgetType {
    pub const ALL: [WidgetType; 5] = [
        WidgetType::Form,
        WidgetType::Popup,
        WidgetType::Banner,
        WidgetType::Quiz,
        WidgetType::Survey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetType::Form => "form",
            WidgetType::Popup => "popup",
            WidgetType::Banner => "banner",
            WidgetType::Quiz => "quiz",
            WidgetType::Survey => "survey",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "form" => Some(WidgetType::Form),
            "popup" => Some(WidgetType::Popup),
            "banner" => Some(WidgetType::Banner),
            "quiz" => Some(WidgetType::Quiz),
            "survey" => Some(WidgetType::Survey),
            _ => None,
        }
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle event recorded against a widget and aggregated into stats buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    View,
    Close,
    Submit,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::View => "view",
            EventKind::Close => "close",
            EventKind::Submit => "submit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view" => Some(EventKind::View),
            "close" => Some(EventKind::Close),
            "submit" => Some(EventKind::Submit),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing tier of an owner. Drives every TTL decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Plan::Free),
            "pro" => Some(Plan::Pro),
            _ => None,
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
