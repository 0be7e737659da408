use anyhow::Result;
use tokio::sync::broadcast;
use tracing::trace;

use super::types::{EventKind, NoticeSeverity, TrackerEvent};
use crate::events::EventPayload;

/// Event subscriber handle
pub struct EventSubscriber {
    receiver: broadcast::Receiver<TrackerEvent>,
    filter: Option<EventFilter>,
}

impl EventSubscriber {
    pub fn new(receiver: broadcast::Receiver<TrackerEvent>, filter: Option<EventFilter>) -> Self {
        Self { receiver, filter }
    }

    /// Receive the next event matching the filter
    pub async fn recv(&mut self) -> Result<TrackerEvent> {
        loop {
            let event = self.receiver.recv().await?;

            if let Some(ref filter) = self.filter {
                if filter.matches(&event) {
                    return Ok(event);
                }
            } else {
                return Ok(event);
            }
        }
    }

    /// Try to receive without blocking
    pub fn try_recv(&mut self) -> Result<Option<TrackerEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if let Some(ref filter) = self.filter {
                        if filter.matches(&event) {
                            return Ok(Some(event));
                        }
                        // Continue to next event
                    } else {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Event filter for selective subscription
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    kinds: Option<Vec<EventKind>>,
    min_severity: Option<NoticeSeverity>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kinds(mut self, kinds: Vec<EventKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    /// Only applies to user notices; other event kinds always pass.
    pub fn with_min_severity(mut self, severity: NoticeSeverity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    pub fn matches(&self, event: &TrackerEvent) -> bool {
        if let Some(ref kinds) = self.kinds
            && !kinds.contains(&event.kind)
        {
            return false;
        }

        if let Some(min_severity) = self.min_severity
            && let EventPayload::Notice { severity, .. } = &event.payload
            && *severity < min_severity
        {
            return false;
        }

        true
    }
}

/// Broadcast bus connecting the tracker, sync agent, and completion gate
/// to each other and to the hosting UI.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TrackerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Lagging or absent subscribers are not an error.
    pub fn publish(&self, event: TrackerEvent) {
        trace!("Publishing event {:?}", event.kind);
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber::new(self.sender.subscribe(), None)
    }

    pub fn subscribe_filtered(&self, filter: EventFilter) -> EventSubscriber {
        EventSubscriber::new(self.sender.subscribe(), Some(filter))
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::constants::EVENT_BUS_CAPACITY)
    }
}
