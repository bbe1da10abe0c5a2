use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{Order, OrderStatus};
use crate::store::OrderStore;

/// Order persistence and lifecycle tracking. Status changes emit an
/// [`Event::OrderStatusChanged`] so a notification consumer can fan out;
/// delivery failure never rolls the transition back.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    event_sender: Option<EventSender>,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, event_sender: Option<EventSender>) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, customer_id = %order.customer_id))]
    pub async fn create(&self, order: Order) -> Result<Order, ServiceError> {
        self.store.insert(order.clone()).await?;
        info!(total = %order.pricing.total, "order created");
        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, ServiceError> {
        self.store.find(order_id).await
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, ServiceError> {
        self.store.list_for_customer(customer_id).await
    }

    /// Advances an order along its fulfillment ladder. Terminal orders
    /// are frozen; setting the current status again is a no-op.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<Order, ServiceError> {
        let order = self
            .store
            .find(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;

        let old_status = order.status;
        if old_status == new_status {
            return Ok(order);
        }
        if old_status.is_terminal() {
            return Err(ServiceError::InvalidStatus(format!(
                "order {} is already {}",
                order_id, old_status
            )));
        }

        let updated = self.store.update_status(order_id, new_status).await?;
        info!(old_status = %old_status, "order status updated");

        self.emit(Event::OrderStatusChanged {
            order_id,
            old_status,
            new_status,
        })
        .await;
        if new_status == OrderStatus::Cancelled {
            self.emit(Event::OrderCancelled(order_id)).await;
        }
        Ok(updated)
    }

    /// Cancels an order, shorthand for a `Cancelled` status update.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel(&self, order_id: Uuid) -> Result<Order, ServiceError> {
        self.update_status(order_id, OrderStatus::Cancelled).await
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send order event");
            }
        }
    }
}
