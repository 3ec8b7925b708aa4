//! Fan-out of catalog events to live subscribers.
//!
//! Each subscriber owns a bounded queue of pre-encoded frames, drained by
//! its connection task. The bus keeps the sending halves in a map guarded
//! by a single mutex, so registration, broadcast and unregistration never
//! interleave.
//!
//! A send that fails (queue closed because the connection went away, or
//! queue full because the peer stopped reading) marks the subscriber dead.
//! Dead subscribers are removed once the broadcast pass is over.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::protocol::{CatalogEvent, Frame, ProtocolError};

/// Statistics for monitoring bus health.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusStats {
    pub events_sent: u64,
    pub subscribers_dropped: u64,
    pub active_subscribers: usize,
}

/// Counters updated without taking the subscriber lock.
#[derive(Default)]
struct AtomicBusStats {
    events_sent: AtomicU64,
    subscribers_dropped: AtomicU64,
}

/// Receiving side handed to a connection task.
pub struct Subscription {
    id: Uuid,
    frames: mpsc::Receiver<Frame>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next frame for this subscriber; `None` once the bus dropped it.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }

    #[cfg(test)]
    pub(crate) fn try_recv(&mut self) -> Option<Frame> {
        self.frames.try_recv().ok()
    }
}

pub struct NotificationBus {
    subscribers: Mutex<HashMap<Uuid, mpsc::Sender<Frame>>>,
    /// Frames buffered per subscriber before it is considered dead
    capacity: usize,
    stats: Arc<AtomicBusStats>,
}

impl NotificationBus {
    /// Create a bus whose subscriber queues hold `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            stats: Arc::new(AtomicBusStats::default()),
        }
    }

    /// Register a subscriber with `initial` as the first frame in its queue.
    pub async fn register(&self, initial: &CatalogEvent) -> Result<Subscription, ProtocolError> {
        let frame = initial.encode()?;
        let (sender, frames) = mpsc::channel(self.capacity);
        let id = Uuid::new_v4();

        let mut subscribers = self.subscribers.lock().await;
        // capacity >= 1 and nobody else holds the sender yet
        let _ = sender.try_send(frame);
        subscribers.insert(id, sender);
        log::debug!("Subscriber {id} registered ({} live)", subscribers.len());

        Ok(Subscription { id, frames })
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub async fn unregister(&self, id: &Uuid) -> bool {
        let removed = self.subscribers.lock().await.remove(id).is_some();
        if removed {
            log::debug!("Subscriber {id} unregistered");
        }
        removed
    }

    /// Send `event` to every live subscriber.
    ///
    /// Returns the number of subscribers the event was delivered to.
    pub async fn broadcast(&self, event: &CatalogEvent) -> Result<usize, ProtocolError> {
        let frame = event.encode()?;

        let mut subscribers = self.subscribers.lock().await;
        let mut dead = Vec::new();
        let mut delivered = 0;
        for (id, sender) in subscribers.iter() {
            match sender.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    log::warn!("Dropping subscriber {id}: {e}");
                    dead.push(*id);
                }
            }
        }
        for id in &dead {
            subscribers.remove(id);
        }
        drop(subscribers);

        self.stats.events_sent.fetch_add(1, Ordering::Relaxed);
        self.stats
            .subscribers_dropped
            .fetch_add(dead.len() as u64, Ordering::Relaxed);
        log::debug!("Broadcast {} to {delivered} subscribers", event.action());
        Ok(delivered)
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn is_registered(&self, id: &Uuid) -> bool {
        self.subscribers.lock().await.contains_key(id)
    }

    pub async fn stats(&self) -> BusStats {
        BusStats {
            events_sent: self.stats.events_sent.load(Ordering::Relaxed),
            subscribers_dropped: self.stats.subscribers_dropped.load(Ordering::Relaxed),
            active_subscribers: self.subscriber_count().await,
        }
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}
