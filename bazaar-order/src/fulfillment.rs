use crate::error::WorkflowError;
use crate::ledger::{self, Transition};
use crate::models::{Order, OrderItem, OrderStatus};
use crate::repository::OrderRepository;
use crate::retry::{retry_read, RetryPolicy};
use bazaar_catalog::{Product, WeightEstimator};
use bazaar_core::repository::ProductRepository;
use bazaar_core::shipping::{
    tracking_url, AirwayBill, CarrierClient, ShipmentItem, ShipmentPayment, ShipmentRequest,
};
use bazaar_shared::models::{OrderEvent, ShipmentDispatchedEvent};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const CARRIER: &str = "shipping carrier";
const MAX_SKU_LEN: usize = 50;
const MAX_ITEM_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentOutcome {
    pub order: Order,
    /// The order already had a shipment and an airway bill.
    pub already_created: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingReport {
    pub order_code: String,
    pub awb_code: String,
    pub courier_name: Option<String>,
    pub tracking_url: Option<String>,
    pub tracking: serde_json::Value,
}

/// Courier SKUs allow `[A-Za-z0-9_-]` only.
pub fn courier_sku(item: &OrderItem) -> String {
    let cleaned: String = item
        .product_id
        .to_string()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_SKU_LEN)
        .collect();
    if cleaned.is_empty() {
        "SKU".to_string()
    } else {
        cleaned
    }
}

/// Books shipments with the carrier for placed orders.
pub struct ShipmentDispatcher {
    carrier: Arc<dyn CarrierClient>,
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    estimator: WeightEstimator,
    retry: RetryPolicy,
}

impl ShipmentDispatcher {
    pub fn new(
        carrier: Arc<dyn CarrierClient>,
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        estimator: WeightEstimator,
    ) -> Self {
        Self {
            carrier,
            orders,
            products,
            estimator,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Book a shipment and assign an airway bill. At most one shipment ever
    /// exists per order: a complete dispatch is returned as-is, and a
    /// shipment without an airway bill only retries the assignment.
    pub async fn create_shipment(&self, order_id: Uuid) -> Result<ShipmentOutcome, WorkflowError> {
        let mut order = self.load(order_id).await?;

        if order.is_dispatched() {
            return Ok(ShipmentOutcome {
                order,
                already_created: true,
            });
        }
        if !self.carrier.is_configured() {
            return Err(WorkflowError::Unconfigured(CARRIER));
        }

        let shipment_id = match order.shipment_id.clone() {
            Some(existing) => {
                tracing::info!(
                    order_code = %order.order_code,
                    shipment_id = %existing,
                    "Shipment exists without airway bill, retrying assignment"
                );
                existing
            }
            None => {
                self.book(&mut order).await?;
                if order.is_dispatched() {
                    return Ok(ShipmentOutcome {
                        order,
                        already_created: true,
                    });
                }
                order.shipment_id.clone().ok_or_else(|| {
                    WorkflowError::Storage("shipment claim recorded without identifiers".to_string())
                })?
            }
        };

        let airway_bill = self
            .assign_airway_bill(&shipment_id, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    order_code = %order.order_code,
                    shipment_id = %shipment_id,
                    "Airway bill assignment failed, shipment kept: {}",
                    e
                );
                e
            })?;

        let url = tracking_url(&airway_bill.awb_code);
        self.orders
            .record_airway_bill(order.id, &airway_bill, &url)
            .await
            .map_err(|e| {
                // The carrier will refuse to assign again; the code must be
                // entered by hand.
                tracing::error!(
                    order_code = %order.order_code,
                    shipment_id = %shipment_id,
                    awb = %airway_bill.awb_code,
                    courier = %airway_bill.courier_name,
                    "Airway bill assigned but not recorded, reconcile manually: {}",
                    e
                );
                WorkflowError::from(e)
            })?;
        order.awb_code = Some(airway_bill.awb_code.clone());
        order.courier_name = Some(airway_bill.courier_name.clone());
        order.tracking_url = Some(url);

        if order.status < OrderStatus::Shipped
            && ledger::advance(&mut order, OrderStatus::Shipped, Utc::now())? == Transition::Applied
        {
            self.orders.save_progress(&order).await?;
        }

        tracing::info!(
            order_code = %order.order_code,
            awb = %airway_bill.awb_code,
            courier = %airway_bill.courier_name,
            "Shipment dispatched"
        );
        OrderEvent::ShipmentDispatched(ShipmentDispatchedEvent {
            order_id: order.id,
            order_code: order.order_code.clone(),
            shipment_id,
            awb_code: order.awb_code.clone(),
            timestamp: Utc::now().timestamp(),
        })
        .emit();

        Ok(ShipmentOutcome {
            order,
            already_created: false,
        })
    }

    /// Not retried: the carrier may have assigned before a timeout.
    pub async fn assign_airway_bill(
        &self,
        shipment_id: &str,
        courier_id: Option<i64>,
    ) -> Result<AirwayBill, WorkflowError> {
        if !self.carrier.is_configured() {
            return Err(WorkflowError::Unconfigured(CARRIER));
        }
        Ok(self.carrier.assign_awb(shipment_id, courier_id).await?)
    }

    pub async fn generate_label(&self, order_id: Uuid) -> Result<String, WorkflowError> {
        let order = self.load(order_id).await?;
        let shipment_id = order.shipment_id.ok_or_else(|| {
            WorkflowError::Validation("Create shipment first before generating label".to_string())
        })?;
        if !self.carrier.is_configured() {
            return Err(WorkflowError::Unconfigured(CARRIER));
        }
        Ok(self.carrier.generate_label(&[shipment_id]).await?)
    }

    pub async fn request_pickup(&self, order_id: Uuid) -> Result<serde_json::Value, WorkflowError> {
        let order = self.load(order_id).await?;
        let shipment_id = order.shipment_id.ok_or_else(|| {
            WorkflowError::Validation("Create shipment first before requesting pickup".to_string())
        })?;
        if !self.carrier.is_configured() {
            return Err(WorkflowError::Unconfigured(CARRIER));
        }
        Ok(self.carrier.generate_pickup(&[shipment_id]).await?)
    }

    /// Live tracking by airway bill number or order code.
    pub async fn track(&self, awb_or_order_code: &str) -> Result<TrackingReport, WorkflowError> {
        let key = awb_or_order_code.trim();
        let order = self
            .orders
            .find_by_code_or_awb(key)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Order not found".to_string()))?;
        let awb_code = order.awb_code.clone().ok_or_else(|| {
            WorkflowError::Validation("Shipment not yet created for this order".to_string())
        })?;
        if !self.carrier.is_configured() {
            return Err(WorkflowError::Unconfigured(CARRIER));
        }

        let tracking = retry_read(self.retry, || self.carrier.track_awb(&awb_code)).await?;
        Ok(TrackingReport {
            order_code: order.order_code,
            awb_code,
            courier_name: order.courier_name,
            tracking_url: order.tracking_url,
            tracking,
        })
    }

    /// Create the remote shipment and claim it on the order. When a
    /// concurrent dispatch claimed first, `order` takes on its identifiers.
    async fn book(&self, order: &mut Order) -> Result<(), WorkflowError> {
        let request = self.shipment_request(order).await?;
        let created = self.carrier.create_shipment(&request).await?;

        if self
            .orders
            .record_shipment_if_absent(order.id, &created)
            .await?
        {
            order.courier_order_id = Some(created.courier_order_id);
            order.shipment_id = Some(created.shipment_id);
            return Ok(());
        }

        tracing::warn!(
            order_code = %order.order_code,
            orphaned_shipment_id = %created.shipment_id,
            "Another dispatch booked this order first, adopting its shipment"
        );
        *order = self.load(order.id).await?;
        Ok(())
    }

    async fn shipment_request(&self, order: &Order) -> Result<ShipmentRequest, WorkflowError> {
        let ids: Vec<Uuid> = order.items.iter().map(|i| i.product_id).collect();
        let catalog: HashMap<Uuid, Product> = self
            .products
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let package = self.estimator.package(order.items.iter().map(|item| {
            let dims = catalog.get(&item.product_id).and_then(|p| p.dimensions.as_ref());
            (dims, item.quantity)
        }));

        let items = order
            .items
            .iter()
            .map(|item| ShipmentItem {
                name: item.product_name.chars().take(MAX_ITEM_NAME_LEN).collect(),
                sku: courier_sku(item),
                units: item.quantity,
                selling_price: item.price_per_item,
            })
            .collect();

        Ok(ShipmentRequest {
            order_code: order.order_code.clone(),
            order_date: order.placed_at.date_naive(),
            deliver_to: order.deliver_to.clone(),
            items,
            payment: if order.payment_method.is_cod() {
                ShipmentPayment::Cod
            } else {
                ShipmentPayment::Prepaid
            },
            sub_total: order.subtotal,
            package,
        })
    }

    async fn load(&self, order_id: Uuid) -> Result<Order, WorkflowError> {
        self.orders
            .get_order(order_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Order not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::mocks::{sample_order, MockCarrier};
    use crate::models::PaymentMethod;
    use bazaar_core::shipping::CreatedShipment;
    use bazaar_core::IntegrationError;

    struct Fixture {
        store: Arc<InMemoryStore>,
        carrier: Arc<MockCarrier>,
        dispatcher: ShipmentDispatcher,
        order: Order,
    }

    async fn fixture(carrier: MockCarrier, method: PaymentMethod) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let carrier = Arc::new(carrier);
        let order = sample_order(method);
        store.create_order(&order).await.unwrap();
        let dispatcher = ShipmentDispatcher::new(
            carrier.clone(),
            store.clone(),
            store.clone(),
            WeightEstimator::default(),
        )
        .with_retry_policy(RetryPolicy::immediate(1));
        Fixture {
            store,
            carrier,
            dispatcher,
            order,
        }
    }

    #[tokio::test]
    async fn test_dispatch_books_assigns_and_ships() {
        let f = fixture(MockCarrier::new(), PaymentMethod::CashOnDelivery).await;

        let outcome = f.dispatcher.create_shipment(f.order.id).await.unwrap();

        assert!(!outcome.already_created);
        let stored = f.store.get_order(f.order.id).await.unwrap().unwrap();
        assert!(stored.shipment_id.is_some());
        let awb = stored.awb_code.clone().unwrap();
        assert_eq!(stored.tracking_url, Some(tracking_url(&awb)));
        assert_eq!(stored.status, OrderStatus::Shipped);
        assert!(stored.shipped_at.is_some());

        let request = f.carrier.last_shipment_request().unwrap();
        assert_eq!(request.payment, ShipmentPayment::Cod);
        assert_eq!(request.order_code, f.order.order_code);
        assert!(request.package.weight_kg >= 0.5);
    }

    #[tokio::test]
    async fn test_second_dispatch_returns_existing_without_calling_carrier() {
        let f = fixture(MockCarrier::new(), PaymentMethod::Gateway).await;
        let first = f.dispatcher.create_shipment(f.order.id).await.unwrap();

        let second = f.dispatcher.create_shipment(f.order.id).await.unwrap();

        assert!(second.already_created);
        assert_eq!(second.order.awb_code, first.order.awb_code);
        assert_eq!(f.carrier.calls("create_shipment"), 1);
        assert_eq!(f.carrier.calls("assign_awb"), 1);
    }

    #[tokio::test]
    async fn test_awb_failure_keeps_shipment_and_retry_only_assigns() {
        let f = fixture(MockCarrier::new(), PaymentMethod::CashOnDelivery).await;
        f.carrier.fail_next(
            "assign_awb",
            IntegrationError::Api {
                service: "shiprocket",
                status: 400,
                message: "courier unavailable".to_string(),
            },
        );

        let err = f.dispatcher.create_shipment(f.order.id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Upstream { .. }));
        let stored = f.store.get_order(f.order.id).await.unwrap().unwrap();
        assert!(stored.shipment_id.is_some());
        assert!(stored.awb_code.is_none());
        assert_eq!(stored.status, OrderStatus::OrderPlaced);

        f.dispatcher.create_shipment(f.order.id).await.unwrap();

        assert_eq!(f.carrier.calls("create_shipment"), 1);
        assert_eq!(f.carrier.calls("assign_awb"), 2);
        let stored = f.store.get_order(f.order.id).await.unwrap().unwrap();
        assert!(stored.awb_code.is_some());
    }

    /// Delegates to the in-memory store but cannot persist airway bills.
    struct AirwayBillWriteFails(Arc<InMemoryStore>);

    #[async_trait::async_trait]
    impl OrderRepository for AirwayBillWriteFails {
        async fn create_order(&self, order: &Order) -> Result<Uuid, bazaar_core::RepoError> {
            self.0.create_order(order).await
        }

        async fn get_order(&self, id: Uuid) -> Result<Option<Order>, bazaar_core::RepoError> {
            self.0.get_order(id).await
        }

        async fn find_by_code(&self, order_code: &str) -> Result<Option<Order>, bazaar_core::RepoError> {
            self.0.find_by_code(order_code).await
        }

        async fn find_by_code_or_awb(&self, key: &str) -> Result<Option<Order>, bazaar_core::RepoError> {
            self.0.find_by_code_or_awb(key).await
        }

        async fn list_orders(
            &self,
            filter: &crate::repository::OrderFilter,
        ) -> Result<crate::repository::OrderPage, bazaar_core::RepoError> {
            self.0.list_orders(filter).await
        }

        async fn save_progress(&self, order: &Order) -> Result<(), bazaar_core::RepoError> {
            self.0.save_progress(order).await
        }

        async fn record_gateway_order(&self, id: Uuid, gateway_order_id: &str) -> Result<(), bazaar_core::RepoError> {
            self.0.record_gateway_order(id, gateway_order_id).await
        }

        async fn record_shipment_if_absent(
            &self,
            id: Uuid,
            shipment: &CreatedShipment,
        ) -> Result<bool, bazaar_core::RepoError> {
            self.0.record_shipment_if_absent(id, shipment).await
        }

        async fn record_airway_bill(
            &self,
            _id: Uuid,
            _airway_bill: &AirwayBill,
            _tracking_url: &str,
        ) -> Result<(), bazaar_core::RepoError> {
            Err("connection reset".into())
        }
    }

    #[tokio::test]
    async fn test_unrecorded_airway_bill_surfaces_storage_error() {
        let store = Arc::new(InMemoryStore::new());
        let carrier = Arc::new(MockCarrier::new());
        let order = sample_order(PaymentMethod::CashOnDelivery);
        store.create_order(&order).await.unwrap();
        let dispatcher = ShipmentDispatcher::new(
            carrier.clone(),
            Arc::new(AirwayBillWriteFails(store.clone())),
            store.clone(),
            WeightEstimator::default(),
        )
        .with_retry_policy(RetryPolicy::immediate(1));

        let err = dispatcher.create_shipment(order.id).await.unwrap_err();

        assert!(matches!(err, WorkflowError::Storage(ref msg) if msg.contains("connection reset")));
        assert_eq!(carrier.calls("assign_awb"), 1);
        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert!(stored.shipment_id.is_some());
        assert!(stored.awb_code.is_none());
        assert_eq!(stored.status, OrderStatus::OrderPlaced);
    }

    #[tokio::test]
    async fn test_lost_race_adopts_winning_shipment() {
        let f = fixture(MockCarrier::new(), PaymentMethod::CashOnDelivery).await;
        let mut stale = f.order.clone();
        f.store
            .record_shipment_if_absent(
                f.order.id,
                &CreatedShipment {
                    courier_order_id: "winner-co".to_string(),
                    shipment_id: "winner-sh".to_string(),
                },
            )
            .await
            .unwrap();

        f.dispatcher.book(&mut stale).await.unwrap();

        assert_eq!(stale.shipment_id.as_deref(), Some("winner-sh"));
        assert_eq!(f.carrier.calls("create_shipment"), 1);
        let stored = f.store.get_order(f.order.id).await.unwrap().unwrap();
        assert_eq!(stored.courier_order_id.as_deref(), Some("winner-co"));
    }

    #[tokio::test]
    async fn test_unconfigured_carrier_rejects_dispatch() {
        let f = fixture(MockCarrier::unconfigured(), PaymentMethod::CashOnDelivery).await;

        let err = f.dispatcher.create_shipment(f.order.id).await.unwrap_err();

        assert!(matches!(err, WorkflowError::Unconfigured(_)));
        assert_eq!(f.carrier.calls("create_shipment"), 0);
    }

    #[tokio::test]
    async fn test_label_and_pickup_need_a_shipment() {
        let f = fixture(MockCarrier::new(), PaymentMethod::CashOnDelivery).await;

        let err = f.dispatcher.generate_label(f.order.id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        let err = f.dispatcher.request_pickup(f.order.id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        f.dispatcher.create_shipment(f.order.id).await.unwrap();
        let label = f.dispatcher.generate_label(f.order.id).await.unwrap();
        assert!(label.starts_with("https://"));
        let pickup = f.dispatcher.request_pickup(f.order.id).await.unwrap();
        assert_eq!(pickup["pickup_status"], 1);
    }

    #[tokio::test]
    async fn test_track_by_awb_or_order_code() {
        let f = fixture(MockCarrier::new(), PaymentMethod::CashOnDelivery).await;
        let err = f.dispatcher.track(&f.order.order_code).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let outcome = f.dispatcher.create_shipment(f.order.id).await.unwrap();
        let awb = outcome.order.awb_code.unwrap();

        let by_code = f.dispatcher.track(&f.order.order_code).await.unwrap();
        let by_awb = f.dispatcher.track(&awb).await.unwrap();
        assert_eq!(by_code.awb_code, awb);
        assert_eq!(by_awb.order_code, f.order.order_code);

        let missing = f.dispatcher.track("AWB-NOPE").await;
        assert!(matches!(missing, Err(WorkflowError::NotFound(_))));
    }

    #[test]
    fn test_courier_sku_is_sanitized() {
        let order = sample_order(PaymentMethod::CashOnDelivery);
        let sku = courier_sku(&order.items[0]);
        assert!(sku.len() <= 50);
        assert!(sku.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
