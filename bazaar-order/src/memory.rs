//! In-process storage backing tests and local runs without Postgres.

use crate::models::Order;
use crate::repository::{OrderFilter, OrderPage, OrderRepository};
use async_trait::async_trait;
use bazaar_catalog::Product;
use bazaar_core::repository::{AddressRepository, ProductRepository};
use bazaar_core::shipping::{AirwayBill, CreatedShipment};
use bazaar_core::{RepoError, UserAddress};
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryStore {
    products: RwLock<HashMap<Uuid, Product>>,
    addresses: RwLock<HashMap<Uuid, UserAddress>>,
    orders: RwLock<HashMap<Uuid, Order>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn missing(id: Uuid) -> RepoError {
        format!("order {} does not exist", id).into()
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn create_product(&self, product: &Product) -> Result<Uuid, RepoError> {
        let mut products = self.products.write().await;
        if products.values().any(|p| p.slug == product.slug) {
            return Err(format!("slug '{}' is already taken", product.slug).into());
        }
        products.insert(product.id, product.clone());
        Ok(product.id)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, RepoError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, RepoError> {
        let products = self.products.read().await;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn update_product(&self, product: &Product) -> Result<bool, RepoError> {
        let mut products = self.products.write().await;
        match products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AddressRepository for InMemoryStore {
    async fn create_address(&self, address: &UserAddress) -> Result<Uuid, RepoError> {
        let mut addresses = self.addresses.write().await;
        if address.is_default {
            for existing in addresses.values_mut() {
                if existing.user_id == address.user_id {
                    existing.is_default = false;
                }
            }
        }
        addresses.insert(address.id, address.clone());
        Ok(address.id)
    }

    async fn get_address(&self, id: Uuid, user_id: &str) -> Result<Option<UserAddress>, RepoError> {
        Ok(self
            .addresses
            .read()
            .await
            .get(&id)
            .filter(|a| a.user_id == user_id)
            .cloned())
    }

    async fn list_addresses(&self, user_id: &str) -> Result<Vec<UserAddress>, RepoError> {
        let mut list: Vec<UserAddress> = self
            .addresses
            .read()
            .await
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.is_default.cmp(&a.is_default).then(a.full_name.cmp(&b.full_name)));
        Ok(list)
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn create_order(&self, order: &Order) -> Result<Uuid, RepoError> {
        let mut orders = self.orders.write().await;
        if orders.values().any(|o| o.order_code == order.order_code) {
            return Err(format!("order code {} already exists", order.order_code).into());
        }
        orders.insert(order.id, order.clone());
        Ok(order.id)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_by_code(&self, order_code: &str) -> Result<Option<Order>, RepoError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|o| o.order_code == order_code)
            .cloned())
    }

    async fn find_by_code_or_awb(&self, key: &str) -> Result<Option<Order>, RepoError> {
        let orders = self.orders.read().await;
        let by_awb = orders.values().find(|o| o.awb_code.as_deref() == Some(key));
        Ok(by_awb
            .or_else(|| orders.values().find(|o| o.order_code == key))
            .cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<OrderPage, RepoError> {
        let orders = self.orders.read().await;
        let mut matching: Vec<&Order> = orders
            .values()
            .filter(|o| filter.user_id.as_deref().map_or(true, |u| o.user_id == u))
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_code.cmp(&a.order_code))
        });

        let total = matching.len() as u64;
        let orders = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect();
        Ok(OrderPage { orders, total })
    }

    async fn save_progress(&self, order: &Order) -> Result<(), RepoError> {
        let mut orders = self.orders.write().await;
        let stored = orders.get_mut(&order.id).ok_or_else(|| Self::missing(order.id))?;
        stored.status = order.status;
        stored.confirmed_at = order.confirmed_at;
        stored.shipped_at = order.shipped_at;
        stored.out_for_delivery_at = order.out_for_delivery_at;
        stored.delivered_at = order.delivered_at;
        stored.payment_status = order.payment_status;
        stored.gateway_payment_id = order.gateway_payment_id.clone();
        stored.updated_at = order.updated_at;
        Ok(())
    }

    async fn record_gateway_order(&self, id: Uuid, gateway_order_id: &str) -> Result<(), RepoError> {
        let mut orders = self.orders.write().await;
        let stored = orders.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        stored.gateway_order_id = Some(gateway_order_id.to_string());
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn record_shipment_if_absent(
        &self,
        id: Uuid,
        shipment: &CreatedShipment,
    ) -> Result<bool, RepoError> {
        let mut orders = self.orders.write().await;
        let stored = orders.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        if stored.shipment_id.is_some() {
            return Ok(false);
        }
        stored.courier_order_id = Some(shipment.courier_order_id.clone());
        stored.shipment_id = Some(shipment.shipment_id.clone());
        stored.updated_at = Utc::now();
        Ok(true)
    }

    async fn record_airway_bill(
        &self,
        id: Uuid,
        airway_bill: &AirwayBill,
        tracking_url: &str,
    ) -> Result<(), RepoError> {
        let mut orders = self.orders.write().await;
        let stored = orders.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        stored.awb_code = Some(airway_bill.awb_code.clone());
        stored.courier_name = Some(airway_bill.courier_name.clone());
        stored.tracking_url = Some(tracking_url.to_string());
        stored.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::sample_order;
    use crate::models::{OrderStatus, PaymentMethod};

    #[tokio::test]
    async fn test_shipment_is_recorded_once() {
        let store = InMemoryStore::new();
        let order = sample_order(PaymentMethod::CashOnDelivery);
        store.create_order(&order).await.unwrap();

        let first = CreatedShipment {
            courier_order_id: "co-1".to_string(),
            shipment_id: "sh-1".to_string(),
        };
        let second = CreatedShipment {
            courier_order_id: "co-2".to_string(),
            shipment_id: "sh-2".to_string(),
        };

        assert!(store.record_shipment_if_absent(order.id, &first).await.unwrap());
        assert!(!store.record_shipment_if_absent(order.id, &second).await.unwrap());

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.shipment_id.as_deref(), Some("sh-1"));
    }

    #[tokio::test]
    async fn test_lookup_by_awb_or_code() {
        let store = InMemoryStore::new();
        let order = sample_order(PaymentMethod::CashOnDelivery);
        store.create_order(&order).await.unwrap();
        store
            .record_airway_bill(
                order.id,
                &AirwayBill {
                    awb_code: "AWB123".to_string(),
                    courier_name: "Delhivery".to_string(),
                },
                "https://track.shiprocket.in/?awb=AWB123",
            )
            .await
            .unwrap();

        let by_awb = store.find_by_code_or_awb("AWB123").await.unwrap().unwrap();
        let by_code = store.find_by_code_or_awb(&order.order_code).await.unwrap().unwrap();
        assert_eq!(by_awb.id, order.id);
        assert_eq!(by_code.id, order.id);
        assert!(store.find_by_code_or_awb("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            let mut order = sample_order(PaymentMethod::CashOnDelivery);
            if i % 2 == 0 {
                order.status = OrderStatus::Shipped;
            }
            order.created_at += chrono::Duration::seconds(i);
            store.create_order(&order).await.unwrap();
        }

        let page = store
            .list_orders(&OrderFilter::new(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.orders.len(), 2);
        assert!(page.orders[0].created_at >= page.orders[1].created_at);

        let shipped = store
            .list_orders(&OrderFilter::new(None, None).with_status(Some(OrderStatus::Shipped)))
            .await
            .unwrap();
        assert_eq!(shipped.total, 3);

        let other_user = store
            .list_orders(&OrderFilter::new(None, None).for_user("someone-else"))
            .await
            .unwrap();
        assert_eq!(other_user.total, 0);
    }
}
