//! HTTP handlers for coach-service.

pub mod health;
pub mod profile;
pub mod sessions;
pub mod turn;
