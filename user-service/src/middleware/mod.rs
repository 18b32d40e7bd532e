pub mod admin;
pub mod auth;
pub mod metrics;

pub use admin::admin_auth_middleware;
pub use auth::require_bearer;
pub use metrics::metrics_middleware;
