pub mod auth;
pub mod payload_limit;
pub mod rate_limit;
pub mod request_validation;
pub mod security_headers;

pub use auth::{auth_middleware, AuthConfig, Principal};
pub use payload_limit::PayloadLimitLayer;
pub use rate_limit::rate_limit_middleware;
pub use request_validation::request_validation_middleware;
pub use security_headers::security_headers_middleware;
