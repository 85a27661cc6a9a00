use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::records::Appointment;

use crate::models::{LifecycleEvent, Room};

const DEFAULT_BUFFER: usize = 64;

struct Subscriber {
    rooms: HashSet<Room>,
    sender: mpsc::Sender<LifecycleEvent>,
}

/// Handle returned by [`NotificationRelay::subscribe`]. Dropping the receiver
/// unsubscribes lazily: the entry is pruned on the next publish.
pub struct Subscription {
    pub id: Uuid,
    pub receiver: mpsc::Receiver<LifecycleEvent>,
}

/// In-process fan-out of lifecycle events to room subscribers.
///
/// Delivery is best effort and at most once per subscriber per event. A full
/// subscriber buffer drops the event rather than blocking the publisher.
pub struct NotificationRelay {
    subscribers: Arc<RwLock<HashMap<Uuid, Subscriber>>>,
    buffer: usize,
}

impl NotificationRelay {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            buffer: buffer.max(1),
        }
    }

    pub async fn subscribe(&self, rooms: impl IntoIterator<Item = Room>) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();
        let rooms: HashSet<Room> = rooms.into_iter().collect();

        debug!("Subscriber {} joined rooms {:?}", id, rooms);
        self.subscribers.write().await.insert(id, Subscriber { rooms, sender });

        Subscription { id, receiver }
    }

    pub async fn unsubscribe(&self, id: Uuid) {
        if self.subscribers.write().await.remove(&id).is_some() {
            debug!("Subscriber {} left", id);
        }
    }

    pub async fn publish(&self, room: Room, event: LifecycleEvent) -> usize {
        self.publish_to(&[room], event).await
    }

    /// Delivers `event` once to every subscriber in any of `rooms`. Returns the
    /// number of subscribers that accepted it.
    pub async fn publish_to(&self, rooms: &[Room], event: LifecycleEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        {
            let subscribers = self.subscribers.read().await;
            for (id, subscriber) in subscribers.iter() {
                if !rooms.iter().any(|room| subscriber.rooms.contains(room)) {
                    continue;
                }

                match subscriber.sender.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!("Subscriber {} is not keeping up, dropping event for {}", id, event.appointment_id);
                    }
                    Err(TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in closed {
                subscribers.remove(&id);
                debug!("Pruned closed subscriber {}", id);
            }
        }

        debug!(
            "Event {} -> {} delivered to {} subscriber(s)",
            event.appointment_id, event.new_status, delivered
        );
        delivered
    }

    /// Publishes the appointment's current status to its patient, its doctor and
    /// the admins.
    pub async fn announce(&self, appointment: &Appointment) -> usize {
        self.publish_to(&Room::audience(appointment), LifecycleEvent::for_appointment(appointment))
            .await
    }

    pub async fn active_subscribers(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

impl Default for NotificationRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for NotificationRelay {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
            buffer: self.buffer,
        }
    }
}
