//! Settings domain model.
//!
//! # Responsibility
//! - Define the value universe a setting can hold.
//! - Define the persisted record shape and owner identity.
//!
//! # Invariants
//! - A record is addressed by `(namespace, key)` plus an optional owner.
//! - Value typing lives in `SettingValue`; records only carry encoded text.

pub mod setting;
pub mod value;
