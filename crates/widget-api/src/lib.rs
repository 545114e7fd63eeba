/*!
HTTP surface and orchestration for the widget backend.

This crate wires [`widget_store`]'s repositories behind an Axum router: JWT
bearer auth for the owner-facing `/api/v1/*` surface, fixed-window rate
limiting for the public, unauthenticated widget endpoints, and the two
background monitors in [`health`].
*/

pub mod config;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod service;
pub mod state;

pub use config::AppConfig;
pub use state::AppState;
