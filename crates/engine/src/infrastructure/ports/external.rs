//! External service port traits: catalog, chat, channel directory, metrics.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use chibibot_domain::{Facing, Faction, Stance};
use chibibot_shared::MetricsSnapshot;

use super::error::{CatalogError, ChatError, DirectoryError};

// =============================================================================
// Operator Catalog
// =============================================================================

/// Spine files and animation names for one (skin, stance, facing).
///
/// Paths are relative to the asset root.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpineAssets {
    #[serde(rename = "atlas")]
    pub atlas_path: String,
    #[serde(rename = "png")]
    pub png_path: String,
    #[serde(rename = "skel")]
    pub skel_path: String,
    #[serde(default)]
    pub animations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SkinRecord {
    #[serde(default)]
    pub base: HashMap<Facing, SpineAssets>,
    #[serde(default)]
    pub battle: HashMap<Facing, SpineAssets>,
}

impl SkinRecord {
    pub fn facings(&self, stance: Stance) -> &HashMap<Facing, SpineAssets> {
        match stance {
            Stance::Base => &self.base,
            Stance::Battle => &self.battle,
        }
    }

    pub fn has_stance(&self, stance: Stance) -> bool {
        !self.facings(stance).is_empty()
    }

    pub fn assets(&self, stance: Stance, facing: Facing) -> Option<&SpineAssets> {
        self.facings(stance).get(&facing)
    }
}

/// Everything the catalog knows about one operator or enemy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorRecord {
    pub operator_id: String,
    pub display_name: String,
    pub skins: BTreeMap<String, SkinRecord>,
}

impl OperatorRecord {
    pub fn skin_names(&self) -> Vec<String> {
        self.skins.keys().cloned().collect()
    }
}

/// Outcome of resolving a human-typed name.
#[derive(Debug, Clone, PartialEq)]
pub enum NameMatch {
    /// Exactly one id matched.
    Found(String),
    /// No unambiguous match; up to five display names ranked by similarity.
    Suggestions(Vec<String>),
}

/// Read-only lookup over the indexed chibi assets.
///
/// Implementations are loaded once and never mutated by lookups.
#[cfg_attr(test, mockall::automock)]
pub trait OperatorCatalog: Send + Sync {
    fn operator(&self, operator_id: &str, faction: Faction)
        -> Result<Arc<OperatorRecord>, CatalogError>;

    /// Known ids for a faction, in a stable order.
    fn operator_ids(&self, faction: Faction) -> Vec<String>;

    fn resolve(
        &self,
        operator_id: &str,
        faction: Faction,
        skin: &str,
        stance: Stance,
        facing: Facing,
    ) -> Result<SpineAssets, CatalogError>;

    /// Succeeds if the tuple exists and has every one of `animations`.
    fn contains(
        &self,
        operator_id: &str,
        faction: Faction,
        skin: &str,
        stance: Stance,
        facing: Facing,
        animations: &[String],
    ) -> Result<(), CatalogError>;

    fn resolve_name(&self, name: &str, faction: Faction) -> NameMatch;
}

// =============================================================================
// Chat Ingestion
// =============================================================================

/// One line of chat.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub username: String,
    pub display_name: String,
    pub text: String,
}

impl ChatMessage {
    pub fn new(
        username: impl Into<String>,
        display_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            display_name: display_name.into(),
            text: text.into(),
        }
    }
}

/// A connected chat channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatSource: Send + Sync {
    /// Next chat line. `None` once the source disconnects or is closed.
    async fn next_message(&self) -> Option<ChatMessage>;

    /// Send a line back to the channel.
    async fn reply(&self, text: &str) -> Result<(), ChatError>;

    /// Disconnect. Any pending `next_message` returns `None`.
    async fn close(&self) -> Result<(), ChatError>;
}

/// Opens chat sources for channels.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatConnector: Send + Sync {
    async fn connect(&self, channel: &str) -> Result<Arc<dyn ChatSource>, ChatError>;
}

// =============================================================================
// Channel Directory
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    async fn channel_exists(&self, channel: &str) -> Result<bool, DirectoryError>;
}

// =============================================================================
// Metrics
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    RoomCreated,
    RoomRemoved,
    ConnectionOpened,
    ConnectionClosed,
    CommandProcessed,
    ChatterAdded,
    ClientMessageReceived,
}

/// Counter sink, constructed once at startup and handed to every
/// component that emits metrics.
#[cfg_attr(test, mockall::automock)]
pub trait MetricsSink: Send + Sync {
    fn incr(&self, metric: Metric);
    fn snapshot(&self) -> MetricsSnapshot;
}
