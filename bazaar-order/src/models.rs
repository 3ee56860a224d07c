use bazaar_catalog::PricedLine;
use bazaar_core::DeliverTo;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

/// Order status in the lifecycle. Declaration order is lifecycle order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    OrderPlaced,
    Confirmed,
    Shipped,
    OutForDelivery,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::OrderPlaced,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::OrderPlaced => "order_placed",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CashOnDelivery,
    Gateway,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
            PaymentMethod::Gateway => "gateway",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cash_on_delivery" => Some(PaymentMethod::CashOnDelivery),
            "gateway" => Some(PaymentMethod::Gateway),
            _ => None,
        }
    }

    pub fn is_cod(&self) -> bool {
        matches!(self, PaymentMethod::CashOnDelivery)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "confirmed" => Some(PaymentStatus::Confirmed),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

static LAST_CODE_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Human-readable order code, `ORD-<unix millis>`. Never repeats within a
/// process: a clash with the previous code is bumped forward by one.
pub fn next_order_code(now: DateTime<Utc>) -> String {
    let candidate = now.timestamp_millis();
    let mut last = LAST_CODE_MILLIS.load(Ordering::SeqCst);
    loop {
        let next = candidate.max(last + 1);
        match LAST_CODE_MILLIS.compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => return format!("ORD-{}", next),
            Err(actual) => last = actual,
        }
    }
}

/// A purchased product, frozen at placement time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: u32,
    pub price_per_item: Decimal,
    pub original_price: Option<Decimal>,
    pub total_for_item: Decimal,
}

impl OrderItem {
    pub fn savings(&self) -> Option<Decimal> {
        self.original_price.map(|original| original - self.price_per_item)
    }
}

impl From<PricedLine> for OrderItem {
    fn from(line: PricedLine) -> Self {
        Self {
            product_id: line.product_id,
            product_name: line.product_name,
            quantity: line.quantity,
            price_per_item: line.price_per_item,
            original_price: line.original_price,
            total_for_item: line.total_for_item,
        }
    }
}

/// The single source of truth for a customer's purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_code: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub deliver_to: DeliverTo,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub shipping_charge: Decimal,
    pub placed_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub out_for_delivery_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub courier_order_id: Option<String>,
    pub shipment_id: Option<String>,
    pub awb_code: Option<String>,
    pub courier_name: Option<String>,
    pub tracking_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        user_id: String,
        deliver_to: DeliverTo,
        items: Vec<OrderItem>,
        shipping_charge: Decimal,
        payment_method: PaymentMethod,
        estimated_delivery_days: i64,
    ) -> Self {
        let now = Utc::now();
        let subtotal = items.iter().map(|item| item.total_for_item).sum();
        Self {
            id: Uuid::new_v4(),
            order_code: next_order_code(now),
            user_id,
            status: OrderStatus::OrderPlaced,
            payment_method,
            payment_status: PaymentStatus::Pending,
            deliver_to,
            items,
            subtotal,
            shipping_charge,
            placed_at: now,
            confirmed_at: None,
            shipped_at: None,
            out_for_delivery_at: None,
            delivered_at: None,
            estimated_delivery_date: Some(now + Duration::days(estimated_delivery_days)),
            gateway_order_id: None,
            gateway_payment_id: None,
            courier_order_id: None,
            shipment_id: None,
            awb_code: None,
            courier_name: None,
            tracking_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Always derived from its parts.
    pub fn total(&self) -> Decimal {
        self.subtotal + self.shipping_charge
    }

    pub fn belongs_to(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    pub fn has_shipment(&self) -> bool {
        self.shipment_id.is_some()
    }

    /// Shipment booked and airway bill assigned: nothing left to dispatch.
    pub fn is_dispatched(&self) -> bool {
        self.shipment_id.is_some() && self.awb_code.is_some()
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}
