//! Notification sink for download events.
//!
//! The download engine reports every record change through a
//! [`DownloadEventSink`]. The UI/IPC layer decides how to fan events out;
//! [`ChannelSink`] forwards them over a tokio channel for that purpose.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::types::download::{DownloadEvent, DownloadRecord};

/// Receiver of download notifications.
///
/// Calls are made while the download registry is locked, which keeps
/// notifications for one record in order. Implementations must return
/// quickly and must not call back into the download manager.
pub trait DownloadEventSink: Send + Sync {
    /// Progress tick or state transition (`download:update`).
    fn on_update(&self, record: &DownloadRecord);
    /// Successful completion (`download:complete`).
    fn on_complete(&self, record: &DownloadRecord);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DownloadEventSink for NullSink {
    fn on_update(&self, _record: &DownloadRecord) {}
    fn on_complete(&self, _record: &DownloadRecord) {}
}

/// Sink that forwards events into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<DownloadEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<DownloadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: DownloadEvent) {
        // A closed receiver only means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

impl DownloadEventSink for ChannelSink {
    fn on_update(&self, record: &DownloadRecord) {
        self.send(DownloadEvent::Update(record.clone()));
    }

    fn on_complete(&self, record: &DownloadRecord) {
        self.send(DownloadEvent::Complete(record.clone()));
    }
}
