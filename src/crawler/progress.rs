//! Human-readable progress stream
//!
//! Progress messages are separate from logs: they are the ordered, per-item
//! account of a crawl that a caller shows to its user. Emitting never fails.

use tokio::sync::mpsc::UnboundedSender;

/// Receives progress messages
pub trait ProgressSink: Send + Sync {
    fn emit(&self, message: String);
}

/// Forwards messages into a tokio channel
///
/// Messages sent after the receiver is dropped are discarded.
pub struct ChannelProgressSink {
    tx: UnboundedSender<String>,
}

impl ChannelProgressSink {
    pub fn new(tx: UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, message: String) {
        let _ = self.tx.send(message);
    }
}

/// Writes messages to the log at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn emit(&self, message: String) {
        tracing::info!(target: "note_harvester::progress", "{}", message);
    }
}
