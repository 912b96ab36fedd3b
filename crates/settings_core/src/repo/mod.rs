//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the record store contract consumed by the settings service.
//! - Isolate SQLite query details from resolution and caching logic.
//!
//! # Invariants
//! - Repository writes must enforce `SettingRecord::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod setting_repo;
