//! Presentation bridge: fan-out of chibi state to a room's render clients.
//!
//! Each attached client gets its own bounded outbound queue. Writes never
//! block the caller; a full or closed queue is logged and skipped so one slow
//! client cannot stall the room.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use chibibot_domain::{Action, OperatorState, RollingWindow};
use chibibot_shared::{ClientMessage, ConnectionSummary, ServerMessage, SetOperatorPayload};

use crate::infrastructure::ports::{CatalogError, Metric, MetricsSink};
use crate::use_cases::operator_state::OperatorStateService;

/// Buffer size for per-connection message channel.
pub const CONNECTION_CHANNEL_BUFFER: usize = 256;
pub const PING_INTERVAL: Duration = Duration::from_secs(30);
/// Deadline for writing one ping frame.
pub const PING_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
/// Per-connection wait for a close acknowledgement.
pub const CLOSE_WAIT: Duration = Duration::from_millis(100);
const FPS_WINDOW: usize = 10;

/// What the transport task should write next.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(ServerMessage),
    Ping,
}

/// Observer for every inbound client message.
pub type InboundListener = Arc<dyn Fn(Uuid, &ClientMessage) + Send + Sync>;

/// Returned by [`PresentationBridge::add_listener`]; pass it back to
/// [`PresentationBridge::remove_listener`] to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// The transport side of one attached client.
pub struct ConnectionHandle {
    pub connection_id: Uuid,
    pub outbound: mpsc::Receiver<Outbound>,
    /// Cancelled when the bridge wants this connection gone.
    pub shutdown: CancellationToken,
}

impl ConnectionHandle {
    /// A handle that is shut down from the start and never receives anything.
    pub fn closed(connection_id: Uuid) -> Self {
        let (_, outbound) = mpsc::channel(1);
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        Self {
            connection_id,
            outbound,
            shutdown,
        }
    }
}

struct Connection {
    sender: mpsc::Sender<Outbound>,
    shutdown: CancellationToken,
    /// Cancelled once the transport task has deregistered.
    done: CancellationToken,
    fps: RollingWindow<f64>,
    show_chat_messages: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("{0} connection(s) did not acknowledge close")]
    CloseTimeout(usize),
}

pub struct PresentationBridge {
    channel_name: String,
    connections: DashMap<Uuid, Connection>,
    listeners: DashMap<ListenerId, InboundListener>,
    next_listener_id: AtomicU64,
    operators: Arc<OperatorStateService>,
    metrics: Arc<dyn MetricsSink>,
    asset_url_prefix: String,
    ping_task: CancellationToken,
}

impl PresentationBridge {
    /// Create the bridge and start its ping sweep.
    pub fn new(
        channel_name: impl Into<String>,
        operators: Arc<OperatorStateService>,
        metrics: Arc<dyn MetricsSink>,
        asset_url_prefix: impl Into<String>,
    ) -> Arc<Self> {
        let bridge = Arc::new(Self {
            channel_name: channel_name.into(),
            connections: DashMap::new(),
            listeners: DashMap::new(),
            next_listener_id: AtomicU64::new(0),
            operators,
            metrics,
            asset_url_prefix: asset_url_prefix.into(),
            ping_task: CancellationToken::new(),
        });
        tokio::spawn(ping_sweep(
            Arc::downgrade(&bridge),
            bridge.ping_task.clone(),
        ));
        bridge
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }

    pub fn is_closed(&self) -> bool {
        self.ping_task.is_cancelled()
    }

    /// Register a client and queue `replay` for it alone.
    ///
    /// Once the bridge is closed the client is not registered and the
    /// returned handle is already shut down.
    pub fn add_connection(&self, replay: Vec<ServerMessage>) -> ConnectionHandle {
        let connection_id = Uuid::new_v4();
        if self.is_closed() {
            return self.rejected(connection_id);
        }

        let capacity = CONNECTION_CHANNEL_BUFFER.max(replay.len() + 1);
        let (sender, outbound) = mpsc::channel(capacity);
        let shutdown = CancellationToken::new();

        // Replay goes out before the connection is visible to broadcasts.
        for message in replay {
            if let Err(e) = sender.try_send(Outbound::Message(message)) {
                tracing::warn!(connection_id = %connection_id, error = %e, "Failed to queue replay");
            }
        }

        self.connections.insert(
            connection_id,
            Connection {
                sender,
                shutdown: shutdown.clone(),
                done: CancellationToken::new(),
                fps: RollingWindow::new(FPS_WINDOW),
                show_chat_messages: true,
            },
        );
        // close() may have swept the map between the check above and the insert.
        if self.is_closed() {
            self.connections.remove(&connection_id);
            return self.rejected(connection_id);
        }
        self.metrics.incr(Metric::ConnectionOpened);
        tracing::info!(
            channel = %self.channel_name,
            connection_id = %connection_id,
            "Render client connected"
        );

        ConnectionHandle {
            connection_id,
            outbound,
            shutdown,
        }
    }

    fn rejected(&self, connection_id: Uuid) -> ConnectionHandle {
        tracing::info!(
            channel = %self.channel_name,
            connection_id = %connection_id,
            "Rejecting render client, bridge is closed"
        );
        ConnectionHandle::closed(connection_id)
    }

    /// Deregister a client. Called by its transport task on exit.
    pub fn remove_connection(&self, connection_id: Uuid) {
        if let Some((_, connection)) = self.connections.remove(&connection_id) {
            connection.done.cancel();
            self.metrics.incr(Metric::ConnectionClosed);
            tracing::info!(
                channel = %self.channel_name,
                connection_id = %connection_id,
                "Render client disconnected"
            );
        }
    }

    pub fn add_listener(&self, listener: InboundListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(id, listener);
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Dispatch one inbound text frame from `connection_id`.
    pub fn handle_inbound(&self, connection_id: Uuid, text: &str) {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                return;
            }
        };

        // Clone out so a listener may unsubscribe without deadlocking the map.
        let listeners: Vec<InboundListener> = self
            .listeners
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for listener in &listeners {
            listener(connection_id, &message);
        }

        let Some(mut connection) = self.connections.get_mut(&connection_id) else {
            return;
        };
        match message {
            ClientMessage::RuntimeDebugUpdate { average_fps } => {
                connection.fps.push(average_fps);
            }
            ClientMessage::RuntimeRoomSettings { show_chat_messages } => {
                connection.show_chat_messages = show_chat_messages;
            }
            ClientMessage::Unknown => {
                tracing::warn!(connection_id = %connection_id, "Ignoring unrecognized client message");
            }
        }
    }

    /// Render payload for a normalized state.
    pub fn operator_payload(
        &self,
        user_name: &str,
        user_name_display: &str,
        state: &OperatorState,
    ) -> Result<SetOperatorPayload, CatalogError> {
        let assets = self.operators.validated_assets(state)?;
        let config = self.operators.config();
        Ok(SetOperatorPayload {
            user_name: user_name.to_string(),
            user_name_display: user_name_display.to_string(),
            operator_id: state.operator_id.clone(),
            atlas_file: format!("{}{}", self.asset_url_prefix, assets.atlas_path),
            png_file: format!("{}{}", self.asset_url_prefix, assets.png_path),
            skel_file: format!("{}{}", self.asset_url_prefix, assets.skel_path),
            start_pos: state.start_pos,
            animation_speed: state.animation_speed,
            available_animations: state.available_animations.clone(),
            sprite_scale: state.sprite_scale,
            max_sprite_pixel_size: config.max_sprite_pixel_size,
            movement_speed_px: config.reference_movement_speed_px,
            movement_speed: state.movement_speed,
            action: state
                .action
                .clone()
                .unwrap_or_else(|| Action::play_one(state.stance.default_animation())),
        })
    }

    /// Validate and broadcast one chatter's state. Only this push fails on a
    /// catalog miss.
    pub fn set_operator(
        &self,
        user_name: &str,
        user_name_display: &str,
        state: &OperatorState,
    ) -> Result<(), CatalogError> {
        let payload = self.operator_payload(user_name, user_name_display, state)?;
        self.broadcast(ServerMessage::SetOperator(payload));
        Ok(())
    }

    pub fn remove_operator(&self, user_name: &str) {
        self.broadcast(ServerMessage::RemoveOperator {
            user_name: user_name.to_string(),
        });
    }

    /// Caption for clients that have captions enabled.
    pub fn show_chat_message(&self, user_name: &str, message: &str) {
        let message = ServerMessage::ShowChatMessage {
            user_name: user_name.to_string(),
            message: message.to_string(),
        };
        self.send_where(message, |connection| connection.show_chat_messages);
    }

    pub fn find_operator(&self, user_name: &str) {
        self.broadcast(ServerMessage::FindOperator {
            user_name: user_name.to_string(),
        });
    }

    pub fn broadcast(&self, message: ServerMessage) {
        self.send_where(message, |_| true);
    }

    fn send_where(&self, message: ServerMessage, filter: impl Fn(&Connection) -> bool) {
        tracing::debug!(
            channel = %self.channel_name,
            type_name = message.type_name(),
            user = %message.user_name(),
            "Broadcasting"
        );
        for entry in self.connections.iter() {
            if !filter(entry.value()) {
                continue;
            }
            if let Err(e) = entry.sender.try_send(Outbound::Message(message.clone())) {
                tracing::warn!(
                    channel = %self.channel_name,
                    connection_id = %entry.key(),
                    error = %e,
                    "Failed to send to render client"
                );
            }
        }
    }

    /// Queue a ping on every connection without waiting for replies.
    pub fn ping_all(&self) {
        for entry in self.connections.iter() {
            if let Err(e) = entry.sender.try_send(Outbound::Ping) {
                tracing::debug!(connection_id = %entry.key(), error = %e, "Skipping ping");
            }
        }
    }

    pub fn connection_summaries(&self) -> Vec<ConnectionSummary> {
        self.connections
            .iter()
            .map(|entry| ConnectionSummary {
                connection_id: *entry.key(),
                average_fps: entry.fps.average(),
                show_chat_messages: entry.show_chat_messages,
            })
            .collect()
    }

    /// Stop pinging and ask every client to disconnect, waiting a bounded
    /// time for each.
    pub async fn close(&self) -> Result<(), BridgeError> {
        self.ping_task.cancel();

        let pending: Vec<(Uuid, CancellationToken, CancellationToken)> = self
            .connections
            .iter()
            .map(|entry| (*entry.key(), entry.shutdown.clone(), entry.done.clone()))
            .collect();

        let mut timed_out = 0;
        for (connection_id, shutdown, done) in pending {
            shutdown.cancel();
            if tokio::time::timeout(CLOSE_WAIT, done.cancelled()).await.is_err() {
                tracing::warn!(connection_id = %connection_id, "Render client did not close in time");
                self.connections.remove(&connection_id);
                timed_out += 1;
            }
        }

        tracing::info!(channel = %self.channel_name, "Presentation bridge closed");
        if timed_out > 0 {
            return Err(BridgeError::CloseTimeout(timed_out));
        }
        Ok(())
    }
}

async fn ping_sweep(bridge: Weak<PresentationBridge>, stop: CancellationToken) {
    let mut interval = tokio::time::interval(PING_INTERVAL);
    interval.tick().await;
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = interval.tick() => {
                let Some(bridge) = bridge.upgrade() else { break };
                bridge.ping_all();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::metrics::AtomicMetrics;
    use crate::test_fixtures::{amiya_base, operator_service};
    use std::sync::atomic::AtomicUsize;

    fn bridge() -> Arc<PresentationBridge> {
        PresentationBridge::new(
            "stym",
            Arc::new(operator_service()),
            Arc::new(AtomicMetrics::new()),
            "/image/assets/",
        )
    }

    fn drain(handle: &mut ConnectionHandle) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(message) = handle.outbound.try_recv() {
            out.push(message);
        }
        out
    }

    #[tokio::test]
    async fn replay_reaches_only_the_new_connection() {
        let bridge = bridge();
        let mut first = bridge.add_connection(Vec::new());

        let payload = bridge
            .operator_payload("alice", "Alice", &amiya_base())
            .unwrap();
        let mut second = bridge.add_connection(vec![
            ServerMessage::SetOperator(payload.clone()),
            ServerMessage::SetOperator(SetOperatorPayload {
                user_name: "bob".into(),
                ..payload
            }),
        ]);

        assert!(drain(&mut first).is_empty());
        assert_eq!(drain(&mut second).len(), 2);
        assert_eq!(bridge.num_connections(), 2);
    }

    #[tokio::test]
    async fn set_operator_uses_prefixed_asset_urls() {
        let bridge = bridge();
        let mut handle = bridge.add_connection(Vec::new());
        bridge.set_operator("alice", "Alice", &amiya_base()).unwrap();

        match drain(&mut handle).pop() {
            Some(Outbound::Message(ServerMessage::SetOperator(payload))) => {
                assert!(payload.atlas_file.starts_with("/image/assets/characters/"));
                assert_eq!(payload.movement_speed_px, 80);
                assert_eq!(payload.action, Action::play_one("Relax"));
            }
            other => panic!("expected SET_OPERATOR, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_validation_sends_nothing() {
        let bridge = bridge();
        let mut handle = bridge.add_connection(Vec::new());
        let mut state = amiya_base();
        state.set_action(Action::play_one("Dance"));

        assert!(bridge.set_operator("alice", "Alice", &state).is_err());
        assert!(drain(&mut handle).is_empty());
    }

    #[tokio::test]
    async fn dead_connection_does_not_abort_broadcast() {
        let bridge = bridge();
        let dead = bridge.add_connection(Vec::new());
        drop(dead);
        let mut live = bridge.add_connection(Vec::new());

        bridge.remove_operator("alice");
        assert_eq!(
            drain(&mut live),
            vec![Outbound::Message(ServerMessage::RemoveOperator {
                user_name: "alice".into()
            })]
        );
    }

    #[tokio::test]
    async fn inbound_settings_filter_captions() {
        let bridge = bridge();
        let mut quiet = bridge.add_connection(Vec::new());
        let mut loud = bridge.add_connection(Vec::new());

        bridge.handle_inbound(
            quiet.connection_id,
            r#"{"type_name":"RUNTIME_ROOM_SETTINGS","show_chat_messages":false}"#,
        );
        bridge.show_chat_message("alice", "hi");

        assert!(drain(&mut quiet).is_empty());
        assert_eq!(drain(&mut loud).len(), 1);
    }

    #[tokio::test]
    async fn fps_samples_and_listeners() {
        let bridge = bridge();
        let handle = bridge.add_connection(Vec::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let listener = bridge.add_listener(Arc::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        for fps in ["30", "60"] {
            bridge.handle_inbound(
                handle.connection_id,
                &format!(r#"{{"type_name":"RUNTIME_DEBUG_UPDATE","average_fps":{fps}}}"#),
            );
        }
        bridge.handle_inbound(handle.connection_id, r#"{"type_name":"WHATEVER"}"#);
        bridge.handle_inbound(handle.connection_id, "not json");

        assert_eq!(seen.load(Ordering::SeqCst), 3);
        let summary = &bridge.connection_summaries()[0];
        assert_eq!(summary.average_fps, 45.0);

        assert!(bridge.remove_listener(listener));
        assert!(!bridge.remove_listener(listener));
        bridge.handle_inbound(
            handle.connection_id,
            r#"{"type_name":"RUNTIME_DEBUG_UPDATE","average_fps":30}"#,
        );
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn closed_bridge_turns_new_clients_away() {
        let metrics = Arc::new(AtomicMetrics::new());
        let bridge = PresentationBridge::new(
            "stym",
            Arc::new(operator_service()),
            metrics.clone(),
            "/image/assets/",
        );
        bridge.close().await.unwrap();

        let mut late = bridge.add_connection(Vec::new());
        assert!(late.shutdown.is_cancelled());
        assert_eq!(bridge.num_connections(), 0);
        assert_eq!(metrics.snapshot().connections_opened, 0);

        bridge.remove_operator("alice");
        assert!(drain(&mut late).is_empty());
    }

    #[tokio::test]
    async fn close_is_bounded_for_stuck_clients() {
        let bridge = bridge();
        let _stuck = bridge.add_connection(Vec::new());
        let polite = bridge.add_connection(Vec::new());

        let responder = {
            let bridge = bridge.clone();
            let id = polite.connection_id;
            let shutdown = polite.shutdown.clone();
            tokio::spawn(async move {
                shutdown.cancelled().await;
                bridge.remove_connection(id);
            })
        };

        let started = std::time::Instant::now();
        let result = bridge.close().await;
        responder.await.unwrap();

        assert!(matches!(result, Err(BridgeError::CloseTimeout(1))));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(bridge.num_connections(), 0);
    }
}
