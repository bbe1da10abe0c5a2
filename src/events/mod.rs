use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::OrderStatus;

/// Events emitted by the engine on committed state changes.
///
/// Delivery is fire-and-forget: a failed or missing consumer never rolls
/// back the transition that produced the event. Notification fan-out
/// (in-app records, push) is a consumer concern.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Event {
    OrderPlaced {
        order_id: Uuid,
        customer_id: Uuid,
        total: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    OrderCancelled(Uuid),
    CouponRedeemed {
        code: String,
        order_id: Uuid,
    },
    PaymentCompleted(Uuid),
    PaymentFailed(Uuid),
}

#[derive(Clone, Debug)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a bounded channel and the sender half wrapped for the
    /// engine. The receiver is handed to the embedding application's
    /// notification consumer.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropped_receiver_surfaces_as_error_not_panic() {
        let (sender, rx) = EventSender::channel(4);
        drop(rx);
        assert!(sender.send(Event::OrderCancelled(Uuid::new_v4())).await.is_err());
    }
}
