//! In-process chat ingestion.
//!
//! `LocalChatHub` hands out one `ChannelChatSource` per channel. Lines are
//! pushed in through [`LocalChatHub::inject`] (the admin chat endpoint and
//! tests use this) and read by the room's loop.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use chibibot_domain::RollingWindow;

use super::ports::{ChatConnector, ChatError, ChatMessage, ChatSource};

/// Pending lines per channel before `inject` starts failing.
const CHAT_CHANNEL_BUFFER: usize = 256;

/// Replies kept per source for inspection.
const REPLY_HISTORY: usize = 50;

pub struct ChannelChatSource {
    channel: String,
    receiver: tokio::sync::Mutex<mpsc::Receiver<ChatMessage>>,
    cancel: CancellationToken,
    replies: Mutex<RollingWindow<String>>,
}

impl ChannelChatSource {
    fn new(channel: &str, receiver: mpsc::Receiver<ChatMessage>) -> Self {
        Self {
            channel: channel.to_string(),
            receiver: tokio::sync::Mutex::new(receiver),
            cancel: CancellationToken::new(),
            replies: Mutex::new(RollingWindow::new(REPLY_HISTORY)),
        }
    }

    /// Most recent replies, oldest first.
    pub fn recent_replies(&self) -> Vec<String> {
        match self.replies.lock() {
            Ok(replies) => replies.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[async_trait]
impl ChatSource for ChannelChatSource {
    async fn next_message(&self) -> Option<ChatMessage> {
        let mut receiver = self.receiver.lock().await;
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            message = receiver.recv() => message,
        }
    }

    async fn reply(&self, text: &str) -> Result<(), ChatError> {
        if self.is_closed() {
            return Err(ChatError::Closed);
        }
        tracing::info!(channel = %self.channel, reply = %text, "Chat reply");
        match self.replies.lock() {
            Ok(mut replies) => replies.push(text.to_string()),
            Err(poisoned) => poisoned.into_inner().push(text.to_string()),
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), ChatError> {
        self.cancel.cancel();
        tracing::debug!(channel = %self.channel, "Chat source closed");
        Ok(())
    }
}

/// Chat connector backed by in-memory channels.
#[derive(Default)]
pub struct LocalChatHub {
    senders: DashMap<String, mpsc::Sender<ChatMessage>>,
    sources: DashMap<String, Arc<ChannelChatSource>>,
}

impl LocalChatHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one chat line to the source connected for `channel`.
    pub fn inject(&self, channel: &str, message: ChatMessage) -> Result<(), ChatError> {
        let sender = self
            .senders
            .get(channel)
            .map(|s| s.clone())
            .ok_or_else(|| ChatError::NotConnected(channel.to_string()))?;
        sender.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                ChatError::Connect(format!("chat buffer full for {channel}"))
            }
            mpsc::error::TrySendError::Closed(_) => ChatError::Closed,
        })
    }

    /// The live source for `channel`, if one is connected.
    pub fn source(&self, channel: &str) -> Option<Arc<ChannelChatSource>> {
        self.sources.get(channel).map(|s| s.clone())
    }
}

#[async_trait]
impl ChatConnector for LocalChatHub {
    async fn connect(&self, channel: &str) -> Result<Arc<dyn ChatSource>, ChatError> {
        let (tx, rx) = mpsc::channel(CHAT_CHANNEL_BUFFER);
        let source = Arc::new(ChannelChatSource::new(channel, rx));
        self.senders.insert(channel.to_string(), tx);
        if let Some(previous) = self.sources.insert(channel.to_string(), source.clone()) {
            previous.cancel.cancel();
        }
        tracing::info!(channel = %channel, "Chat source connected");
        Ok(source)
    }
}
