//! Atomic counter metrics sink.

use std::sync::atomic::{AtomicU64, Ordering};

use chibibot_shared::MetricsSnapshot;

use super::ports::{Metric, MetricsSink};

#[derive(Debug, Default)]
pub struct AtomicMetrics {
    rooms_created: AtomicU64,
    rooms_removed: AtomicU64,
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    commands_processed: AtomicU64,
    chatters_added: AtomicU64,
    client_messages_received: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, metric: Metric) -> &AtomicU64 {
        match metric {
            Metric::RoomCreated => &self.rooms_created,
            Metric::RoomRemoved => &self.rooms_removed,
            Metric::ConnectionOpened => &self.connections_opened,
            Metric::ConnectionClosed => &self.connections_closed,
            Metric::CommandProcessed => &self.commands_processed,
            Metric::ChatterAdded => &self.chatters_added,
            Metric::ClientMessageReceived => &self.client_messages_received,
        }
    }
}

impl MetricsSink for AtomicMetrics {
    fn incr(&self, metric: Metric) {
        self.counter(metric).fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rooms_created: self.rooms_created.load(Ordering::Relaxed),
            rooms_removed: self.rooms_removed.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            commands_processed: self.commands_processed.load(Ordering::Relaxed),
            chatters_added: self.chatters_added.load(Ordering::Relaxed),
            client_messages_received: self.client_messages_received.load(Ordering::Relaxed),
        }
    }
}
