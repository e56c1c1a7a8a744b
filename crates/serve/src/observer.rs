//! Request log stream.

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::broadcast;

/// Events buffered per subscriber before the slowest one starts lagging.
pub(crate) const EVENT_CAPACITY: usize = 256;

/// One completed HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    pub method: String,
    /// Path and query string as received.
    pub url: String,
    pub status: u16,
}

impl std::fmt::Display for RequestEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let time = self
            .time
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(|_| std::fmt::Error)?;
        write!(f, "[{time}] {} {} {}", self.method, self.url, self.status)
    }
}

/// Fan-out of [`RequestEvent`]s to any number of subscribers.
///
/// Publishing never blocks and never fails: with no subscribers the event is
/// dropped, and subscribers that fall behind miss the oldest events.
#[derive(Debug, Clone)]
pub struct RequestLog {
    sender: broadcast::Sender<RequestEvent>,
}

impl Default for RequestLog {
    fn default() -> Self {
        Self { sender: broadcast::channel(EVENT_CAPACITY).0 }
    }
}

impl RequestLog {
    pub fn subscribe(&self) -> broadcast::Receiver<RequestEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn publish(&self, event: RequestEvent) {
        tracing::info!(method = %event.method, url = %event.url, status = event.status, "Handled request");
        let _ = self.sender.send(event);
    }
}
