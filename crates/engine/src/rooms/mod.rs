//! Rooms: one per chat channel.
//!
//! A room ties a chat source, its chatters and a presentation bridge
//! together. The registry owns every running room.

mod bridge;
mod error;
mod registry;
mod room;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chibibot_domain::RuntimeConfig;

use crate::infrastructure::ports::{
    ChannelDirectory, ChatConnector, ClockPort, MetricsSink, OperatorCatalog, PreferencesStore,
    RandomPort, SnapshotStore,
};
use crate::infrastructure::settings::{InitialOperatorDetails, Settings};

pub use bridge::{
    BridgeError, ConnectionHandle, InboundListener, ListenerId, Outbound, PresentationBridge,
    CLOSE_WAIT, PING_INTERVAL, PING_WRITE_TIMEOUT,
};
pub use error::RoomError;
pub use registry::{RoomRegistry, SHUTDOWN_TIMEOUT};
pub use room::Room;

/// Ports every room is built from.
#[derive(Clone)]
pub struct RoomDeps {
    pub catalog: Arc<dyn OperatorCatalog>,
    pub chat: Arc<dyn ChatConnector>,
    pub directory: Arc<dyn ChannelDirectory>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub preferences: Arc<dyn PreferencesStore>,
    pub metrics: Arc<dyn MetricsSink>,
    pub clock: Arc<dyn ClockPort>,
    pub random: Arc<dyn RandomPort>,
}

/// Per-room behaviour taken from process settings.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    pub exclude_names: HashSet<String>,
    pub initial_operator: InitialOperatorDetails,
    pub remove_chibi_after: Option<Duration>,
    pub remove_unused_rooms_after: Option<Duration>,
    pub show_chat_messages: bool,
    pub asset_url_prefix: String,
    pub runtime_config: RuntimeConfig,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for RoomSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            exclude_names: settings
                .exclude_names
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
            initial_operator: settings.initial_operator.clone(),
            remove_chibi_after: settings.remove_chibi_after,
            remove_unused_rooms_after: settings.remove_unused_rooms_after,
            show_chat_messages: settings.show_chat_messages,
            asset_url_prefix: settings.asset_url_prefix.clone(),
            runtime_config: settings.runtime_config.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Room wiring over in-memory adapters.

    use super::*;
    use crate::infrastructure::chat::LocalChatHub;
    use crate::infrastructure::clock::{FixedRandom, ManualClock};
    use crate::infrastructure::directory::StaticChannelDirectory;
    use crate::infrastructure::metrics::AtomicMetrics;
    use crate::infrastructure::ports::{
        MockPreferencesStore, MockSnapshotStore, PreferencesStore, SnapshotStore,
    };
    use crate::test_fixtures::fake_catalog;
    use chrono::{TimeZone, Utc};

    pub struct Harness {
        pub hub: Arc<LocalChatHub>,
        pub clock: Arc<ManualClock>,
        pub metrics: Arc<AtomicMetrics>,
        pub deps: RoomDeps,
    }

    pub fn quiet_preferences() -> MockPreferencesStore {
        let mut preferences = MockPreferencesStore::new();
        preferences.expect_get().returning(|_| Ok(None));
        preferences.expect_save().returning(|_, _| Ok(()));
        preferences.expect_clear().returning(|_| Ok(()));
        preferences
    }

    pub fn empty_snapshots() -> MockSnapshotStore {
        let mut snapshots = MockSnapshotStore::new();
        snapshots.expect_take_room().returning(|_| Ok(None));
        snapshots.expect_save_room().returning(|_| Ok(()));
        snapshots
    }

    pub fn harness() -> Harness {
        harness_with(Arc::new(quiet_preferences()), Arc::new(empty_snapshots()))
    }

    pub fn harness_with(
        preferences: Arc<dyn PreferencesStore>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Harness {
        let hub = Arc::new(LocalChatHub::new());
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        let clock = Arc::new(ManualClock::new(start));
        let metrics = Arc::new(AtomicMetrics::new());
        let deps = RoomDeps {
            catalog: Arc::new(fake_catalog()),
            chat: hub.clone(),
            directory: Arc::new(StaticChannelDirectory::new(Vec::<String>::new())),
            snapshots,
            preferences,
            metrics: metrics.clone(),
            clock: clock.clone(),
            random: Arc::new(FixedRandom(0)),
        };
        Harness {
            hub,
            clock,
            metrics,
            deps,
        }
    }
}
