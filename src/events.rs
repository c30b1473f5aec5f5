use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Domain events emitted after a successful commit.
///
/// Delivery is best-effort: a full or closed channel is logged by the caller
/// and never fails the originating operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated(Uuid),
    OrderCompleted(Uuid),
    OrderCancelled(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Stock events
    StockMovementPosted {
        movement_id: Uuid,
        product_id: Uuid,
        lot_id: Uuid,
        kind: String,
        quantity: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Convenience constructor for an event channel of the given capacity.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_are_delivered_in_order() {
        let (sender, mut receiver) = channel(8);
        let order_id = Uuid::new_v4();

        sender.send(Event::OrderCreated(order_id)).await.unwrap();
        sender.send(Event::OrderCompleted(order_id)).await.unwrap();

        assert!(matches!(
            receiver.recv().await,
            Some(Event::OrderCreated(id)) if id == order_id
        ));
        assert!(matches!(
            receiver.recv().await,
            Some(Event::OrderCompleted(id)) if id == order_id
        ));
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (sender, receiver) = channel(1);
        drop(receiver);

        let result = sender.send(Event::OrderCancelled(Uuid::new_v4())).await;
        assert!(result.is_err());
    }
}
