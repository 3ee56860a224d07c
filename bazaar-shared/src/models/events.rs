use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderPlacedEvent {
    pub order_id: Uuid,
    pub order_code: String,
    pub user_id: String,
    pub payment_method: String,
    pub total: Decimal,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentVerifiedEvent {
    pub order_id: Uuid,
    pub order_code: String,
    pub gateway_order_id: String,
    pub accepted: bool,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ShipmentDispatchedEvent {
    pub order_id: Uuid,
    pub order_code: String,
    pub shipment_id: String,
    pub awb_code: Option<String>,
    pub timestamp: i64,
}

/// Audit trail entry for the order workflow.
///
/// Events are written to the `audit` tracing target as JSON so a log shipper
/// can route them separately from operational logs.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEvent {
    OrderPlaced(OrderPlacedEvent),
    PaymentVerified(PaymentVerifiedEvent),
    ShipmentDispatched(ShipmentDispatchedEvent),
}

impl OrderEvent {
    pub fn order_code(&self) -> &str {
        match self {
            OrderEvent::OrderPlaced(e) => &e.order_code,
            OrderEvent::PaymentVerified(e) => &e.order_code,
            OrderEvent::ShipmentDispatched(e) => &e.order_code,
        }
    }

    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(payload) => tracing::info!(target: "audit", order_code = self.order_code(), "{}", payload),
            Err(e) => tracing::warn!(target: "audit", "Failed to serialize order event: {}", e),
        }
    }
}
