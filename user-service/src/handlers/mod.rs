//! HTTP handlers for user-service.

pub mod admin;
pub mod metrics;
pub mod users;
