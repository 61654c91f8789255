//! Chibi Bot Engine library.
//!
//! This crate contains all server-side code for the chibi sync server.
//!
//! ## Structure
//!
//! - `use_cases/` - Chat command interpretation and operator state normalization
//! - `rooms/` - Room registry, rooms and their presentation bridges
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `api/` - HTTP and WebSocket entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod rooms;
pub mod use_cases;

/// Test fixtures module for unit and integration tests.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
