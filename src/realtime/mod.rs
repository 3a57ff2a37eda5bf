//! Realtime change fan-out.
//!
//! Writers publish one [`ChangeEvent`] per committed row change; subscribers receive the
//! events matching their [`ChannelFilter`]. Delivery is best effort: a subscriber that
//! falls behind the channel capacity is told how many events it missed and should refetch.

use tokio::sync::broadcast;

use crate::models::{ChangeEvent, ChannelFilter};

/// Buffered events per subscriber before it starts lagging.
pub const CHANNEL_CAPACITY: usize = 256;

/// What a subscriber sees on its channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Event(ChangeEvent),
    /// The subscriber lagged and this many events were dropped.
    Missed(u64),
}

/// Process-wide publisher of row change events.
#[derive(Clone)]
pub struct RealtimeHub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish a change. Having no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        tracing::debug!(
            table = event.table.as_str(),
            kind = ?event.kind,
            record_id = %event.record_id,
            "Publishing change event"
        );
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self, filter: ChannelFilter) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A filtered view of the change stream. Dropping it unsubscribes.
pub struct Subscription {
    rx: broadcast::Receiver<ChangeEvent>,
    filter: ChannelFilter,
}

impl Subscription {
    pub fn filter(&self) -> &ChannelFilter {
        &self.filter
    }

    /// Wait for the next matching event. Returns `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(Delivery::Event(event)),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Realtime subscriber lagged, skipped {} events", n);
                    return Some(Delivery::Missed(n));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
