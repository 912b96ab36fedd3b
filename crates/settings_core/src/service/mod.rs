//! Settings use-case services.
//!
//! # Responsibility
//! - Orchestrate cache, repository and defaults into settings reads/writes.
//! - Keep callers decoupled from storage and cache details.

pub mod entry;
pub mod error;
pub mod owner_settings;
pub mod settings_service;
