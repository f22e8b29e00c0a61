//! Session events for presentation layers, dispatched over a broadcast channel.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use auditflow_core::ids::{EngagementId, Generation, SessionId};
use auditflow_core::session::AuditStatus;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    StatusChanged {
        session_id: SessionId,
        generation: Generation,
        status: AuditStatus,
    },

    BenchmarkUpdated {
        session_id: SessionId,
        industry: String,
    },

    EngagementLinked {
        session_id: SessionId,
        engagement_id: EngagementId,
    },

    /// A response arrived for a dispatch that a reset or newer dispatch superseded.
    StaleResponseDiscarded {
        session_id: SessionId,
        response_generation: Generation,
        current_generation: Generation,
    },
}

/// Broadcast-based event emitter.
///
/// Non-blocking: `emit` never awaits. Slow receivers lag rather than
/// blocking the session.
pub(crate) struct EventEmitter {
    tx: broadcast::Sender<AuditEvent>,
    emit_count: AtomicU64,
}

impl EventEmitter {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self {
            tx,
            emit_count: AtomicU64::new(0),
        }
    }

    /// Returns the number of receivers that got the event (0 with no subscribers).
    pub(crate) fn emit(&self, event: AuditEvent) -> usize {
        let _ = self.emit_count.fetch_add(1, Ordering::Relaxed);
        self.tx.send(event).unwrap_or(0)
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.tx.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::Relaxed)
    }
}
