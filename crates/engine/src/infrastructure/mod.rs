//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod catalog;
pub mod chat;
pub mod clock;
pub mod directory;
pub mod fuzzy;
pub mod metrics;
pub mod ports;
pub mod settings;
pub mod sqlite;
