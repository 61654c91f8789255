//! Every running room, keyed by channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use chibibot_domain::{OperatorState, RuntimeConfig, RuntimeConfigPatch};
use chibibot_shared::{AssignOperatorRequest, RoomSummary};

use super::bridge::PresentationBridge;
use super::room::Room;
use super::{RoomDeps, RoomError, RoomSettings};
use crate::infrastructure::ports::Metric;
use crate::use_cases::operator_state::OperatorStateService;

/// Upper bound on [`RoomRegistry::wait_for_shutdown_with_timeout`].
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RoomRegistry {
    /// All mutations go through this lock.
    rooms: Mutex<HashMap<String, Arc<Room>>>,
    deps: RoomDeps,
    settings: RoomSettings,
    shutdown_complete: CancellationToken,
}

impl RoomRegistry {
    pub fn new(deps: RoomDeps, settings: RoomSettings) -> Arc<Self> {
        Arc::new(Self {
            rooms: Mutex::new(HashMap::new()),
            deps,
            settings,
            shutdown_complete: CancellationToken::new(),
        })
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    /// Create the room for `channel` unless it is already running.
    ///
    /// The room is built in full before it is registered; nothing is left
    /// behind when any step fails.
    pub async fn create_room_or_noop(
        self: &Arc<Self>,
        channel: &str,
    ) -> Result<Arc<Room>, RoomError> {
        let channel = channel.trim().to_lowercase();
        let mut rooms = self.rooms.lock().await;
        if let Some(room) = rooms.get(&channel) {
            return Ok(room.clone());
        }

        if !self.deps.directory.channel_exists(&channel).await? {
            return Err(RoomError::ChannelNotFound(channel));
        }

        let operators = Arc::new(OperatorStateService::new(
            self.deps.catalog.clone(),
            self.deps.random.clone(),
            self.settings.runtime_config.clone(),
        )?);
        let chat = self.deps.chat.connect(&channel).await?;
        let bridge = PresentationBridge::new(
            channel.clone(),
            operators.clone(),
            self.deps.metrics.clone(),
            self.settings.asset_url_prefix.clone(),
        );
        let room = Arc::new(Room::new(
            channel.clone(),
            chat,
            bridge,
            operators,
            &self.deps,
            &self.settings,
        ));

        match self.deps.snapshots.take_room(&channel).await {
            Ok(Some(snapshot)) => room.restore(snapshot).await,
            Ok(None) => {}
            Err(e) => tracing::warn!(channel = %channel, error = %e, "Failed to load room snapshot"),
        }
        if let Err(e) = room.seed_broadcaster().await {
            tracing::warn!(channel = %channel, error = %e, "Could not give the broadcaster a chibi");
        }

        rooms.insert(channel.clone(), room.clone());
        self.spawn_run(room.clone());
        self.deps.metrics.incr(Metric::RoomCreated);
        tracing::info!(channel = %channel, "Room created");
        Ok(room)
    }

    fn spawn_run(self: &Arc<Self>, room: Arc<Room>) {
        let registry = Arc::downgrade(self);
        tokio::spawn(async move {
            room.run().await;
            if let Some(registry) = registry.upgrade() {
                registry.forget(&room).await;
            }
        });
    }

    /// Drop `room` from the map if it is still the registered instance.
    async fn forget(&self, room: &Arc<Room>) {
        let mut rooms = self.rooms.lock().await;
        let registered = rooms
            .get(room.channel_name())
            .is_some_and(|current| Arc::ptr_eq(current, room));
        if registered {
            rooms.remove(room.channel_name());
            self.deps.metrics.incr(Metric::RoomRemoved);
            tracing::info!(channel = %room.channel_name(), "Room deregistered after chat ended");
        }
    }

    /// Close and remove the room for `channel`. Absent rooms are a no-op.
    ///
    /// Render clients that do not acknowledge the close are logged; the room
    /// is gone either way.
    pub async fn remove_room(&self, channel: &str) -> Result<(), RoomError> {
        let channel = channel.trim().to_lowercase();
        let mut rooms = self.rooms.lock().await;
        let Some(room) = rooms.remove(&channel) else {
            return Ok(());
        };
        self.deps.metrics.incr(Metric::RoomRemoved);
        tracing::info!(channel = %channel, "Removing room");
        match room.close().await {
            Err(RoomError::Bridge(e)) => {
                tracing::warn!(channel = %channel, error = %e, "Room removed with unclosed render clients");
                Ok(())
            }
            result => result,
        }
    }

    pub async fn room(&self, channel: &str) -> Option<Arc<Room>> {
        let channel = channel.trim().to_lowercase();
        self.rooms.lock().await.get(&channel).cloned()
    }

    /// Remove rooms whose last chat is older than the configured threshold.
    /// Returns the channels removed.
    pub async fn garbage_collect(&self) -> Vec<String> {
        let Some(threshold) = self.settings.remove_unused_rooms_after else {
            return Vec::new();
        };
        let threshold = chrono::Duration::from_std(threshold).unwrap_or(chrono::Duration::MAX);
        let now = self.deps.clock.now();

        let mut rooms = self.rooms.lock().await;
        let mut stale = Vec::new();
        for (channel, room) in rooms.iter() {
            let idle = now.signed_duration_since(room.last_chat_at().await);
            if idle > threshold {
                stale.push(channel.clone());
            }
        }

        for channel in &stale {
            let Some(room) = rooms.remove(channel) else {
                continue;
            };
            self.deps.metrics.incr(Metric::RoomRemoved);
            tracing::info!(channel = %channel, "Removing unused room");
            if let Err(e) = room.close().await {
                tracing::warn!(channel = %channel, error = %e, "Room did not close cleanly");
            }
        }
        stale
    }

    /// Run [`Self::garbage_collect`] every threshold period until `stop`
    /// fires. Disabled when no threshold is configured.
    pub fn spawn_gc(self: &Arc<Self>, stop: CancellationToken) -> Option<JoinHandle<()>> {
        let period = self.settings.remove_unused_rooms_after?;
        let registry = self.clone();
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = interval.tick() => {
                        let removed = registry.garbage_collect().await;
                        tracing::debug!(removed = removed.len(), "Room garbage collection done");
                    }
                }
            }
        }))
    }

    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let rooms: Vec<Arc<Room>> = self.rooms.lock().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            summaries.push(room.summary().await);
        }
        summaries.sort_by(|a, b| a.channel_name.cmp(&b.channel_name));
        summaries
    }

    pub async fn update_config(
        &self,
        channel: &str,
        patch: &RuntimeConfigPatch,
    ) -> Result<RuntimeConfig, RoomError> {
        self.existing(channel).await?.update_config(patch)
    }

    pub async fn assign_operator(
        &self,
        channel: &str,
        request: AssignOperatorRequest,
    ) -> Result<OperatorState, RoomError> {
        self.existing(channel).await?.assign_operator(request).await
    }

    async fn existing(&self, channel: &str) -> Result<Arc<Room>, RoomError> {
        self.room(channel)
            .await
            .ok_or_else(|| RoomError::RoomNotFound(channel.to_string()))
    }

    /// Save every room for a later restore, then close them all at once.
    pub async fn shutdown(&self) {
        let rooms: Vec<Arc<Room>> = {
            let mut rooms = self.rooms.lock().await;
            rooms.drain().map(|(_, room)| room).collect()
        };
        tracing::info!(rooms = rooms.len(), "Shutting down rooms");

        for room in &rooms {
            let snapshot = room.snapshot().await;
            if let Err(e) = self.deps.snapshots.save_room(&snapshot).await {
                tracing::warn!(channel = %room.channel_name(), error = %e, "Failed to save room snapshot");
            }
        }

        let results = join_all(rooms.iter().map(|room| room.close())).await;
        for (room, result) in rooms.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(channel = %room.channel_name(), error = %e, "Room did not close cleanly");
            }
        }

        self.shutdown_complete.cancel();
        tracing::info!("Room shutdown complete");
    }

    /// Wait for [`Self::shutdown`] to finish, giving up after
    /// [`SHUTDOWN_TIMEOUT`]. Returns whether it finished.
    pub async fn wait_for_shutdown_with_timeout(&self) -> bool {
        let finished = tokio::time::timeout(SHUTDOWN_TIMEOUT, self.shutdown_complete.cancelled())
            .await
            .is_ok();
        if !finished {
            tracing::warn!("Timed out waiting for rooms to shut down");
        }
        finished
    }
}
