//! Coach Service - Socratic questioning over a persisted conversation log.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
