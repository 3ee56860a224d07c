use crate::error::WorkflowError;
use crate::models::{Order, OrderStatus, PaymentStatus};
use crate::repository::OrderRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Statuses reachable from `from`. Forward skips are allowed; nothing moves
/// backwards and `Delivered` is terminal.
pub fn allowed_targets(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match from {
        OrderPlaced => &[Confirmed, Shipped, OutForDelivery, Delivered],
        Confirmed => &[Shipped, OutForDelivery, Delivered],
        Shipped => &[OutForDelivery, Delivered],
        OutForDelivery => &[Delivered],
        Delivered => &[],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Unchanged,
}

/// Move `order` to `target`, stamping the stage timestamp once. Entering
/// `Confirmed` also settles the payment axis.
pub fn advance(
    order: &mut Order,
    target: OrderStatus,
    now: DateTime<Utc>,
) -> Result<Transition, WorkflowError> {
    if order.status == target {
        return Ok(Transition::Unchanged);
    }
    if !allowed_targets(order.status).contains(&target) {
        return Err(WorkflowError::InvalidTransition {
            from: order.status,
            to: target,
        });
    }

    let stamp = match target {
        OrderStatus::OrderPlaced => None,
        OrderStatus::Confirmed => Some(&mut order.confirmed_at),
        OrderStatus::Shipped => Some(&mut order.shipped_at),
        OrderStatus::OutForDelivery => Some(&mut order.out_for_delivery_at),
        OrderStatus::Delivered => Some(&mut order.delivered_at),
    };
    if let Some(slot) = stamp {
        slot.get_or_insert(now);
    }

    if target == OrderStatus::Confirmed {
        order.payment_status = PaymentStatus::Confirmed;
    }
    order.status = target;
    order.updated_at = now;
    Ok(Transition::Applied)
}

/// Returns false if the payment was already confirmed. A confirmed payment is
/// never overwritten.
pub fn confirm_payment(order: &mut Order, gateway_payment_id: &str, now: DateTime<Utc>) -> bool {
    if order.payment_status == PaymentStatus::Confirmed {
        return false;
    }
    order.payment_status = PaymentStatus::Confirmed;
    order.gateway_payment_id = Some(gateway_payment_id.to_string());
    order.updated_at = now;
    true
}

/// Returns false if the payment is already confirmed (left untouched) or
/// already failed.
pub fn fail_payment(order: &mut Order, now: DateTime<Utc>) -> bool {
    if order.payment_status != PaymentStatus::Pending {
        return false;
    }
    order.payment_status = PaymentStatus::Failed;
    order.updated_at = now;
    true
}

/// Applies administrative status changes against the order store.
pub struct OrderLedger {
    orders: Arc<dyn OrderRepository>,
}

impl OrderLedger {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, WorkflowError> {
        self.orders
            .get_order(order_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Order not found".to_string()))
    }

    pub async fn update_status(
        &self,
        order_id: Uuid,
        target: OrderStatus,
    ) -> Result<Order, WorkflowError> {
        let mut order = self.get_order(order_id).await?;

        match advance(&mut order, target, Utc::now())? {
            Transition::Applied => {
                self.orders.save_progress(&order).await?;
                tracing::info!(
                    order_code = %order.order_code,
                    status = %order.status,
                    "Order status updated"
                );
            }
            Transition::Unchanged => {
                tracing::debug!(order_code = %order.order_code, "Status unchanged, nothing to persist");
            }
        }
        Ok(order)
    }
}
