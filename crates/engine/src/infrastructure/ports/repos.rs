//! Repository port traits for persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chibibot_domain::{Chatter, OperatorState, RuntimeConfig};

use super::error::RepoError;

/// Everything needed to bring a room back after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub channel_name: String,
    pub runtime_config: RuntimeConfig,
    pub chatters: Vec<Chatter>,
    pub saved_at: DateTime<Utc>,
}

// =============================================================================
// Room Snapshots
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save_room(&self, snapshot: &RoomSnapshot) -> Result<(), RepoError>;

    /// Load and delete the snapshot for `channel`, if any.
    async fn take_room(&self, channel: &str) -> Result<Option<RoomSnapshot>, RepoError>;
}

// =============================================================================
// User Preferences
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreferencesStore: Send + Sync {
    async fn get(&self, username: &str) -> Result<Option<OperatorState>, RepoError>;
    async fn save(&self, username: &str, state: &OperatorState) -> Result<(), RepoError>;
    async fn clear(&self, username: &str) -> Result<(), RepoError>;
}
