//! One channel's chatters, chat source and presentation bridge.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::{Instant, Interval};

use chibibot_domain::{
    Action, Chatter, Facing, OperatorState, RuntimeConfig, RuntimeConfigPatch,
};
use chibibot_shared::{AssignOperatorRequest, RoomSummary, ServerMessage};

use super::bridge::{ConnectionHandle, ListenerId, PresentationBridge};
use super::{RoomDeps, RoomError, RoomSettings};
use crate::infrastructure::ports::{
    ChatMessage, ChatSource, ClockPort, Metric, MetricsSink, PreferencesStore, RoomSnapshot,
};
use crate::infrastructure::settings::InitialOperatorDetails;
use crate::use_cases::commands::{is_command, Command, CommandInterpreter, USAGE_FOLLOW};
use crate::use_cases::operator_state::{OperatorError, OperatorStateService};

/// Animation requested by admin assignment; normalization swaps it for the
/// stance default.
const ASSIGNED_ANIMATION: &str = "Default";

pub struct Room {
    channel_name: String,
    chat: Arc<dyn ChatSource>,
    bridge: Arc<PresentationBridge>,
    operators: Arc<OperatorStateService>,
    interpreter: CommandInterpreter,
    preferences: Arc<dyn PreferencesStore>,
    metrics: Arc<dyn MetricsSink>,
    clock: Arc<dyn ClockPort>,
    /// Every mutation and its broadcast happen under this lock.
    chatters: Mutex<HashMap<String, Chatter>>,
    exclude_names: HashSet<String>,
    initial_operator: InitialOperatorDetails,
    remove_chibi_after: Option<Duration>,
    created_at: DateTime<Utc>,
    closed: AtomicBool,
    /// Counts inbound render-client messages into the metrics sink.
    telemetry: ListenerId,
}

impl Room {
    pub fn new(
        channel_name: impl Into<String>,
        chat: Arc<dyn ChatSource>,
        bridge: Arc<PresentationBridge>,
        operators: Arc<OperatorStateService>,
        deps: &RoomDeps,
        settings: &RoomSettings,
    ) -> Self {
        let metrics = deps.metrics.clone();
        let telemetry = bridge.add_listener(Arc::new(move |_, _| {
            metrics.incr(Metric::ClientMessageReceived);
        }));
        Self {
            channel_name: channel_name.into(),
            chat,
            bridge,
            interpreter: CommandInterpreter::new(operators.clone(), settings.show_chat_messages),
            operators,
            preferences: deps.preferences.clone(),
            metrics: deps.metrics.clone(),
            clock: deps.clock.clone(),
            chatters: Mutex::new(HashMap::new()),
            exclude_names: settings.exclude_names.clone(),
            initial_operator: settings.initial_operator.clone(),
            remove_chibi_after: settings.remove_chibi_after,
            created_at: deps.clock.now(),
            closed: AtomicBool::new(false),
            telemetry,
        }
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn bridge(&self) -> &Arc<PresentationBridge> {
        &self.bridge
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close chat ingestion, then the bridge. Both are attempted; the first
    /// error wins.
    pub async fn close(&self) -> Result<(), RoomError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!(channel = %self.channel_name, "Closing room");

        let chat_result = self.chat.close().await;
        self.bridge.remove_listener(self.telemetry);
        let bridge_result = self.bridge.close().await;

        chat_result?;
        bridge_result?;
        tracing::info!(channel = %self.channel_name, "Room closed");
        Ok(())
    }

    /// Pull chat until the source ends. A source that ends on its own closes
    /// the room.
    pub async fn run(&self) {
        tracing::info!(channel = %self.channel_name, "Room is running");
        let mut eviction = self.remove_chibi_after.map(|period| {
            tokio::time::interval_at(Instant::now() + period, period)
        });

        loop {
            tokio::select! {
                message = self.chat.next_message() => match message {
                    Some(message) => self.handle_message(message).await,
                    None => break,
                },
                _ = next_tick(&mut eviction) => {
                    if let Some(period) = self.remove_chibi_after {
                        self.garbage_collect_chatters(period).await;
                    }
                }
            }
        }

        if !self.is_closed() {
            tracing::warn!(channel = %self.channel_name, "Chat read loop ended early, closing room");
            if let Err(e) = self.close().await {
                tracing::error!(channel = %self.channel_name, error = %e, "Failed to close room");
            }
        }
        tracing::info!(channel = %self.channel_name, "Room run is done");
    }

    fn is_excluded(&self, username: &str) -> bool {
        self.exclude_names.contains(&username.to_lowercase())
    }

    /// Process one chat line end to end: first-chatter assignment, command
    /// interpretation, commit, broadcast and reply.
    pub async fn handle_message(&self, message: ChatMessage) {
        if self.is_excluded(&message.username) {
            return;
        }
        // The chat reply goes out after the chatters lock is released.
        if let Some(text) = self.process(&message).await {
            self.reply(&text).await;
        }
    }

    /// Everything in [`Room::handle_message`] that needs the chatters lock.
    /// Returns the chat reply, if any.
    async fn process(&self, message: &ChatMessage) -> Option<String> {
        let mut chatters = self.chatters.lock().await;

        if !chatters.contains_key(&message.username) {
            let state = match self.initial_state(&message.username).await {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(user = %message.username, error = %e, "Failed to pick a chibi");
                    return None;
                }
            };
            if let Err(e) = self.commit(
                &mut chatters,
                &message.username,
                &message.display_name,
                state,
            ) {
                tracing::warn!(user = %message.username, error = %e, "Failed to give chibi");
                return None;
            }
            self.metrics.incr(Metric::ChatterAdded);
            tracing::info!(channel = %self.channel_name, user = %message.username, "Chatter joined");
        }

        let now = self.clock.now();
        let chatter = chatters.get_mut(&message.username)?;
        chatter.touch(now);

        if is_command(&message.text) {
            self.metrics.incr(Metric::CommandProcessed);
        }
        match self.interpreter.interpret(&chatter.state, message) {
            Ok(command) => self.apply(&mut chatters, message, command).await,
            Err(e) => Some(e.to_string()),
        }
    }

    /// Commit `command` and return the chat reply it produces.
    async fn apply(
        &self,
        chatters: &mut HashMap<String, Chatter>,
        message: &ChatMessage,
        command: Command,
    ) -> Option<String> {
        let username = message.username.as_str();
        tracing::debug!(user = %username, command = command.name(), "Applying command");

        match command {
            Command::NoOp => {}
            Command::Reply(text) => return Some(text),
            Command::Info(kind) => {
                return chatters.get(username).map(|chatter| kind.render(&chatter.state));
            }
            Command::Update(state) => {
                if let Err(e) = self.commit(chatters, username, &message.display_name, state) {
                    tracing::warn!(user = %username, error = %e, "Rejected chibi update");
                    return Some(e.to_string());
                }
            }
            Command::Follow(state) => {
                let target_present = match &state.action {
                    Some(Action::Follow { target, .. }) => chatters.contains_key(target),
                    _ => false,
                };
                if !target_present {
                    return Some(USAGE_FOLLOW.to_string());
                }
                if let Err(e) = self.commit(chatters, username, &message.display_name, state) {
                    tracing::warn!(user = %username, error = %e, "Rejected follow");
                    return Some(e.to_string());
                }
            }
            Command::ShowMessage(text) => self.bridge.show_chat_message(username, &text),
            Command::SavePreferences(state) => {
                if let Err(e) = self.preferences.save(username, &state).await {
                    tracing::error!(user = %username, error = %e, "Failed to save preferences");
                }
            }
            Command::ClearPreferences => {
                if let Err(e) = self.preferences.clear(username).await {
                    tracing::error!(user = %username, error = %e, "Failed to clear preferences");
                }
            }
            Command::Find => self.bridge.find_operator(username),
        }
        None
    }

    /// Normalize, broadcast, then store. Nothing is stored if the broadcast
    /// fails validation.
    fn commit(
        &self,
        chatters: &mut HashMap<String, Chatter>,
        username: &str,
        display_name: &str,
        state: OperatorState,
    ) -> Result<OperatorState, RoomError> {
        let state = self.operators.normalize(state)?;
        self.bridge.set_operator(username, display_name, &state)?;

        let now = self.clock.now();
        match chatters.get_mut(username) {
            Some(chatter) => {
                chatter.display_name = display_name.to_string();
                chatter.state = state.clone();
            }
            None => {
                chatters.insert(
                    username.to_string(),
                    Chatter::new(username, display_name, state.clone(), now),
                );
            }
        }
        Ok(state)
    }

    async fn reply(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Err(e) = self.chat.reply(text).await {
            tracing::warn!(channel = %self.channel_name, error = %e, "Failed to send chat reply");
        }
    }

    /// Saved preferences if any, otherwise a random operator.
    async fn initial_state(&self, username: &str) -> Result<OperatorState, OperatorError> {
        match self.preferences.get(username).await {
            Ok(Some(saved)) => match self.operators.normalize(saved) {
                Ok(state) => return Ok(state),
                Err(e) => {
                    tracing::warn!(user = %username, error = %e, "Saved preferences no longer valid");
                }
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(user = %username, error = %e, "Failed to load preferences"),
        }
        self.operators.random_operator()
    }

    /// Give the broadcaster the configured default chibi if they have none.
    pub async fn seed_broadcaster(&self) -> Result<(), RoomError> {
        let mut chatters = self.chatters.lock().await;
        if chatters.contains_key(&self.channel_name) || self.is_excluded(&self.channel_name) {
            return Ok(());
        }
        let state = self.operators.operator_from_default(&self.initial_operator)?;
        let state = self.operators.normalize(state)?;
        chatters.insert(
            self.channel_name.clone(),
            Chatter::new(
                &self.channel_name,
                &self.channel_name,
                state,
                self.clock.now(),
            ),
        );
        Ok(())
    }

    /// Admin path: put a specific operator on `username`, bypassing chat.
    pub async fn assign_operator(
        &self,
        request: AssignOperatorRequest,
    ) -> Result<OperatorState, RoomError> {
        let state = OperatorState {
            skin: request.skin,
            stance: request.stance,
            facing: Facing::Front,
            animation_speed: self.operators.config().default_animation_speed,
            start_pos: request.start_pos,
            action: Some(Action::play_one(ASSIGNED_ANIMATION)),
            ..OperatorState::request(request.operator_id, request.faction)
        };

        let display_name = request
            .display_name
            .unwrap_or_else(|| request.username.clone());
        let mut chatters = self.chatters.lock().await;
        let is_new = !chatters.contains_key(&request.username);
        let state = self.commit(&mut chatters, &request.username, &display_name, state)?;
        if is_new {
            self.metrics.incr(Metric::ChatterAdded);
        }
        Ok(state)
    }

    /// Register a render client, replaying every chibi to it alone.
    ///
    /// A closed room hands back a handle that is already shut down.
    pub async fn attach(&self) -> ConnectionHandle {
        if self.is_closed() {
            tracing::info!(channel = %self.channel_name, "Refusing render client, room is closed");
            return ConnectionHandle::closed(uuid::Uuid::new_v4());
        }
        let chatters = self.chatters.lock().await;
        let replay = chatters
            .values()
            .filter_map(|chatter| {
                match self
                    .bridge
                    .operator_payload(&chatter.username, &chatter.display_name, &chatter.state)
                {
                    Ok(payload) => Some(ServerMessage::SetOperator(payload)),
                    Err(e) => {
                        tracing::warn!(user = %chatter.username, error = %e, "Skipping replay");
                        None
                    }
                }
            })
            .collect();
        self.bridge.add_connection(replay)
    }

    /// Most recent chat across all chatters, or creation time if none.
    pub async fn last_chat_at(&self) -> DateTime<Utc> {
        let chatters = self.chatters.lock().await;
        chatters
            .values()
            .map(|chatter| chatter.last_chat_at)
            .max()
            .unwrap_or(self.created_at)
    }

    pub async fn has_active_chatters(&self, period: Duration) -> bool {
        let idle = self.clock.now().signed_duration_since(self.last_chat_at().await);
        idle <= to_chrono(period)
    }

    /// Drop chatters idle longer than `period`. The broadcaster stays.
    pub async fn garbage_collect_chatters(&self, period: Duration) -> usize {
        let now = self.clock.now();
        let period = to_chrono(period);
        let mut chatters = self.chatters.lock().await;

        let stale: Vec<String> = chatters
            .values()
            .filter(|c| c.username != self.channel_name && !c.is_active_within(now, period))
            .map(|c| c.username.clone())
            .collect();
        for username in &stale {
            chatters.remove(username);
            self.bridge.remove_operator(username);
            tracing::debug!(channel = %self.channel_name, user = %username, "Removed idle chibi");
        }
        tracing::info!(
            channel = %self.channel_name,
            removed = stale.len(),
            "Garbage collected chatters"
        );
        stale.len()
    }

    pub async fn snapshot(&self) -> RoomSnapshot {
        let chatters = self.chatters.lock().await;
        RoomSnapshot {
            channel_name: self.channel_name.clone(),
            runtime_config: self.operators.config(),
            chatters: chatters.values().cloned().collect(),
            saved_at: self.clock.now(),
        }
    }

    /// Reload chatters from a snapshot. Entries that no longer validate are
    /// dropped.
    pub async fn restore(&self, snapshot: RoomSnapshot) {
        if let Err(e) = self.operators.set_config(snapshot.runtime_config) {
            tracing::warn!(channel = %self.channel_name, error = %e, "Ignoring saved runtime config");
        }
        let mut chatters = self.chatters.lock().await;
        for mut chatter in snapshot.chatters {
            if self.is_excluded(&chatter.username) {
                continue;
            }
            match self.operators.normalize(chatter.state.clone()) {
                Ok(state) => {
                    chatter.state = state;
                    chatters.insert(chatter.username.clone(), chatter);
                }
                Err(e) => {
                    tracing::warn!(user = %chatter.username, error = %e, "Dropping saved chatter");
                }
            }
        }
        tracing::info!(
            channel = %self.channel_name,
            chatters = chatters.len(),
            "Restored room snapshot"
        );
    }

    pub fn update_config(&self, patch: &RuntimeConfigPatch) -> Result<RuntimeConfig, RoomError> {
        let merged = self.operators.config().merged_with(patch);
        merged.validate()?;
        self.operators.set_config(merged.clone())?;
        tracing::info!(channel = %self.channel_name, "Runtime config updated");
        Ok(merged)
    }

    pub async fn chatter_state(&self, username: &str) -> Option<OperatorState> {
        let chatters = self.chatters.lock().await;
        chatters.get(username).map(|c| c.state.clone())
    }

    pub async fn num_chatters(&self) -> usize {
        self.chatters.lock().await.len()
    }

    pub async fn summary(&self) -> RoomSummary {
        RoomSummary {
            channel_name: self.channel_name.clone(),
            num_chatters: self.num_chatters().await,
            num_connections: self.bridge.num_connections(),
            created_at: self.created_at,
            last_chat_at: self.last_chat_at().await,
            connections: self.bridge.connection_summaries(),
        }
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn to_chrono(period: Duration) -> chrono::Duration {
    chrono::Duration::from_std(period).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::chat::ChannelChatSource;
    use crate::infrastructure::ports::{
        ChatConnector, ChatError, MockPreferencesStore, MockRandomPort,
    };
    use crate::rooms::bridge::Outbound;
    use crate::rooms::testing::{empty_snapshots, harness, harness_with, Harness};
    use crate::test_fixtures::{AMIYA, SLUG};
    use chibibot_domain::{Faction, Stance, Vector2};

    struct Fixture {
        harness: Harness,
        room: Room,
        source: Arc<ChannelChatSource>,
    }

    async fn fixture_from(harness: Harness, settings: RoomSettings) -> Fixture {
        let chat = harness.deps.chat.connect("stym").await.unwrap();
        let source = harness.hub.source("stym").unwrap();
        let operators = Arc::new(
            OperatorStateService::new(
                harness.deps.catalog.clone(),
                harness.deps.random.clone(),
                settings.runtime_config.clone(),
            )
            .unwrap(),
        );
        let bridge = PresentationBridge::new(
            "stym",
            operators.clone(),
            harness.deps.metrics.clone(),
            settings.asset_url_prefix.clone(),
        );
        let room = Room::new("stym", chat, bridge, operators, &harness.deps, &settings);
        Fixture {
            harness,
            room,
            source,
        }
    }

    /// Chat source whose replies block until released.
    #[derive(Default)]
    struct StalledReplies {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl ChatSource for StalledReplies {
        async fn next_message(&self) -> Option<ChatMessage> {
            None
        }

        async fn reply(&self, _text: &str) -> Result<(), ChatError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(())
        }

        async fn close(&self) -> Result<(), ChatError> {
            Ok(())
        }
    }

    async fn fixture() -> Fixture {
        fixture_from(harness(), RoomSettings::default()).await
    }

    fn drain(handle: &mut ConnectionHandle) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(Outbound::Message(message)) = handle.outbound.try_recv() {
            out.push(message);
        }
        out
    }

    async fn say(room: &Room, user: &str, text: &str) {
        room.handle_message(ChatMessage::new(user, user.to_uppercase(), text))
            .await;
    }

    #[tokio::test]
    async fn first_message_gives_a_chibi_and_a_caption() {
        let f = fixture().await;
        let mut client = f.room.attach().await;

        say(&f.room, "alice", "hello").await;

        let sent = drain(&mut client);
        assert_eq!(sent.len(), 2);
        assert!(matches!(&sent[0], ServerMessage::SetOperator(p) if p.operator_id == AMIYA));
        assert_eq!(
            sent[1],
            ServerMessage::ShowChatMessage {
                user_name: "alice".into(),
                message: "hello".into()
            }
        );
        assert_eq!(f.harness.metrics.snapshot().chatters_added, 1);
    }

    #[tokio::test]
    async fn commands_commit_and_broadcast() {
        let f = fixture().await;
        say(&f.room, "alice", "!chibi speed 999").await;

        let state = f.room.chatter_state("alice").await.unwrap();
        assert_eq!(state.animation_speed, 5.0);
        assert_eq!(f.harness.metrics.snapshot().commands_processed, 1);
    }

    #[tokio::test]
    async fn usage_errors_are_replied_in_chat() {
        let f = fixture().await;
        say(&f.room, "alice", "!chibi face back").await;
        assert_eq!(
            f.source.recent_replies(),
            vec!["base chibi's can't face backwards. Try setting to battle stance first"]
        );
    }

    #[tokio::test]
    async fn slow_replies_do_not_hold_the_room() {
        let harness = harness();
        let settings = RoomSettings::default();
        let chat = Arc::new(StalledReplies::default());
        let operators = Arc::new(
            OperatorStateService::new(
                harness.deps.catalog.clone(),
                harness.deps.random.clone(),
                settings.runtime_config.clone(),
            )
            .unwrap(),
        );
        let bridge = PresentationBridge::new(
            "stym",
            operators.clone(),
            harness.deps.metrics.clone(),
            settings.asset_url_prefix.clone(),
        );
        let room = Arc::new(Room::new(
            "stym",
            chat.clone(),
            bridge,
            operators,
            &harness.deps,
            &settings,
        ));

        let talker = {
            let room = room.clone();
            tokio::spawn(async move { say(&room, "alice", "!chibi help").await })
        };
        chat.entered.notified().await;

        let chatters = tokio::time::timeout(Duration::from_secs(1), room.num_chatters())
            .await
            .unwrap();
        assert_eq!(chatters, 1);

        chat.release.notify_one();
        talker.await.unwrap();
    }

    #[tokio::test]
    async fn help_does_not_touch_state() {
        let f = fixture().await;
        say(&f.room, "alice", "hi").await;
        let before = f.room.chatter_state("alice").await;

        say(&f.room, "alice", "!chibi help").await;

        assert_eq!(f.room.chatter_state("alice").await, before);
        assert_eq!(f.source.recent_replies().len(), 1);
    }

    #[tokio::test]
    async fn info_is_rendered_from_committed_state() {
        let f = fixture().await;
        say(&f.room, "alice", "!chibi play sit").await;
        say(&f.room, "alice", "!chibi info").await;
        assert_eq!(
            f.source.recent_replies(),
            vec!["Amiya: default, base, Front, (Sit)"]
        );
    }

    #[tokio::test]
    async fn excluded_users_are_ignored() {
        let settings = RoomSettings {
            exclude_names: ["nightbot".to_string()].into_iter().collect(),
            ..RoomSettings::default()
        };
        let f = fixture_from(harness(), settings).await;
        say(&f.room, "NightBot", "!chibi walk").await;
        assert_eq!(f.room.num_chatters().await, 0);
    }

    #[tokio::test]
    async fn follow_needs_a_target_in_the_room() {
        let f = fixture().await;
        say(&f.room, "alice", "!chibi follow bob_1").await;
        assert_eq!(f.source.recent_replies(), vec![USAGE_FOLLOW]);

        say(&f.room, "bob_1", "hi").await;
        say(&f.room, "alice", "!chibi follow bob_1").await;
        let state = f.room.chatter_state("alice").await.unwrap();
        assert!(matches!(state.action, Some(Action::Follow { ref target, .. }) if target == "bob_1"));
    }

    #[tokio::test]
    async fn saved_preferences_seed_new_chatters() {
        let mut preferences = MockPreferencesStore::new();
        preferences.expect_get().returning(|username| {
            Ok((username == "alice").then(|| OperatorState::request(SLUG, Faction::Enemy)))
        });
        preferences
            .expect_save()
            .withf(|username, state| username.to_string() == "alice" && state.operator_id == SLUG)
            .times(1)
            .returning(|_, _| Ok(()));
        let f = fixture_from(
            harness_with(Arc::new(preferences), Arc::new(empty_snapshots())),
            RoomSettings::default(),
        )
        .await;

        say(&f.room, "alice", "!chibi save").await;

        let state = f.room.chatter_state("alice").await.unwrap();
        assert_eq!(state.operator_id, SLUG);
        assert_eq!(state.stance, Stance::Battle);
    }

    #[tokio::test]
    async fn eviction_skips_the_broadcaster() {
        let f = fixture().await;
        f.room.seed_broadcaster().await.unwrap();
        say(&f.room, "alice", "hi").await;
        let mut client = f.room.attach().await;
        assert_eq!(drain(&mut client).len(), 2);

        f.harness.clock.advance(chrono::Duration::minutes(41));
        let removed = f
            .room
            .garbage_collect_chatters(Duration::from_secs(40 * 60))
            .await;

        assert_eq!(removed, 1);
        assert_eq!(f.room.num_chatters().await, 1);
        assert_eq!(
            drain(&mut client),
            vec![ServerMessage::RemoveOperator {
                user_name: "alice".into()
            }]
        );
    }

    #[tokio::test]
    async fn activity_window_uses_latest_chat() {
        let f = fixture().await;
        say(&f.room, "alice", "hi").await;
        let period = Duration::from_secs(60);

        f.harness.clock.advance(chrono::Duration::seconds(60));
        assert!(f.room.has_active_chatters(period).await);
        f.harness.clock.advance(chrono::Duration::seconds(1));
        assert!(!f.room.has_active_chatters(period).await);
    }

    #[tokio::test]
    async fn assigned_operator_is_normalized() {
        let f = fixture().await;
        let state = f
            .room
            .assign_operator(AssignOperatorRequest {
                username: "carol".into(),
                display_name: None,
                operator_id: SLUG.into(),
                faction: Faction::Enemy,
                skin: "default".into(),
                stance: Stance::Base,
                start_pos: Some(Vector2::new(0.25, 0.0)),
            })
            .await
            .unwrap();

        assert_eq!(state.stance, Stance::Battle);
        assert_eq!(state.action, Some(Action::play_one("Idle")));
        assert_eq!(state.start_pos, Some(Vector2::new(0.25, 0.0)));

        let unknown = f
            .room
            .assign_operator(AssignOperatorRequest {
                username: "carol".into(),
                display_name: None,
                operator_id: "char_999_ghost".into(),
                faction: Faction::Operator,
                skin: "default".into(),
                stance: Stance::Base,
                start_pos: None,
            })
            .await;
        assert!(unknown.is_err());
        assert_eq!(
            f.room.chatter_state("carol").await.map(|s| s.operator_id),
            Some(SLUG.to_string())
        );
    }

    #[tokio::test]
    async fn assignment_does_not_draw_a_random_operator() {
        let mut random = MockRandomPort::new();
        random.expect_gen_index().never();
        let mut harness = harness();
        harness.deps.random = Arc::new(random);
        let f = fixture_from(harness, RoomSettings::default()).await;

        let state = f
            .room
            .assign_operator(AssignOperatorRequest {
                username: "carol".into(),
                display_name: Some("Carol".into()),
                operator_id: SLUG.into(),
                faction: Faction::Enemy,
                skin: "default".into(),
                stance: Stance::Battle,
                start_pos: None,
            })
            .await
            .unwrap();

        assert_eq!(state.operator_id, SLUG);
        assert_eq!(state.start_pos, None);
        assert_eq!(state.animation_speed, 1.0);
    }

    #[tokio::test]
    async fn closed_room_turns_render_clients_away() {
        let f = fixture().await;
        say(&f.room, "alice", "hi").await;
        f.room.close().await.unwrap();

        let mut late = f.room.attach().await;

        assert!(late.shutdown.is_cancelled());
        assert!(drain(&mut late).is_empty());
        assert_eq!(f.room.bridge().num_connections(), 0);
        assert_eq!(f.harness.metrics.snapshot().connections_opened, 0);
    }

    #[tokio::test]
    async fn client_messages_are_counted_until_close() {
        let f = fixture().await;
        let client = f.room.attach().await;
        let frame = r#"{"type_name":"RUNTIME_DEBUG_UPDATE","average_fps":60}"#;

        let id = client.connection_id;
        f.room.bridge().handle_inbound(id, frame);
        assert_eq!(f.harness.metrics.snapshot().client_messages_received, 1);

        let bridge = f.room.bridge().clone();
        let responder = tokio::spawn(async move {
            client.shutdown.cancelled().await;
            bridge.remove_connection(id);
        });
        f.room.close().await.unwrap();
        responder.await.unwrap();

        f.room.bridge().handle_inbound(id, frame);
        assert_eq!(f.harness.metrics.snapshot().client_messages_received, 1);
    }

    #[tokio::test]
    async fn snapshot_restores_into_a_new_room() {
        let f = fixture().await;
        say(&f.room, "alice", "!chibi walk 0.3").await;
        let snapshot = f.room.snapshot().await;

        let g = fixture_from(harness(), RoomSettings::default()).await;
        g.room.restore(snapshot).await;
        let state = g.room.chatter_state("alice").await.unwrap();
        assert!(matches!(state.action, Some(Action::WalkTo { .. })));
    }

    #[tokio::test]
    async fn run_closes_the_room_when_chat_ends() {
        let f = fixture().await;
        let room = Arc::new(f.room);
        let runner = {
            let room = room.clone();
            tokio::spawn(async move { room.run().await })
        };

        f.harness
            .hub
            .inject("stym", ChatMessage::new("alice", "Alice", "hi"))
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while room.num_chatters().await == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        f.source.close().await.unwrap();
        runner.await.unwrap();
        assert!(room.is_closed());
    }

    #[tokio::test]
    async fn config_updates_are_validated() {
        let f = fixture().await;
        let merged = f
            .room
            .update_config(&RuntimeConfigPatch {
                max_animation_speed: Some(3.0),
                ..RuntimeConfigPatch::default()
            })
            .unwrap();
        assert_eq!(merged.max_animation_speed, 3.0);

        let bad = f.room.update_config(&RuntimeConfigPatch {
            min_animation_speed: Some(6.0),
            ..RuntimeConfigPatch::default()
        });
        assert!(matches!(bad, Err(RoomError::Config(_))));
    }
}
