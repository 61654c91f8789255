//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - The operator catalog (read-only, loaded once at startup)
//! - Chat ingestion (local channel today, an IRC client tomorrow)
//! - Channel existence checks
//! - Persistence (snapshots and user preferences)
//! - Metrics
//! - Clock/Random (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Errors
// =============================================================================
pub use error::{CatalogError, ChatError, DirectoryError, RepoError};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{
    ChannelDirectory, ChatConnector, ChatMessage, ChatSource, Metric, MetricsSink, NameMatch,
    OperatorCatalog, OperatorRecord, SkinRecord, SpineAssets,
};

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::{PreferencesStore, RoomSnapshot, SnapshotStore};

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::{ClockPort, RandomPort};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use external::{
    MockChannelDirectory, MockChatConnector, MockChatSource, MockMetricsSink, MockOperatorCatalog,
};
#[cfg(test)]
pub use repos::{MockPreferencesStore, MockSnapshotStore};
#[cfg(test)]
pub use testing::{MockClockPort, MockRandomPort};
