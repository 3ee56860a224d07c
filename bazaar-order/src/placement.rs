use crate::error::WorkflowError;
use crate::models::{Order, OrderItem, PaymentMethod};
use crate::repository::OrderRepository;
use crate::shipping::{ShippingQuote, ShippingRateResolver};
use bazaar_catalog::lines::{merge_quantities, requested_ids};
use bazaar_catalog::{aggregate_lines, LineRequest, PricedCart, Product};
use bazaar_core::repository::{AddressRepository, ProductRepository};
use bazaar_core::UserAddress;
use bazaar_shared::models::{OrderEvent, OrderPlacedEvent};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub address_id: Uuid,
    pub items: Vec<LineRequest>,
    pub payment_method: PaymentMethod,
}

/// A cart priced against the catalogue and a saved address, before anything
/// is persisted.
#[derive(Debug, Clone)]
pub struct PricedCheckout {
    pub address: UserAddress,
    pub cart: PricedCart,
    pub quote: ShippingQuote,
}

pub struct OrderPlacement {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    addresses: Arc<dyn AddressRepository>,
    shipping: Arc<ShippingRateResolver>,
    estimated_delivery_days: i64,
}

impl OrderPlacement {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        addresses: Arc<dyn AddressRepository>,
        shipping: Arc<ShippingRateResolver>,
        estimated_delivery_days: i64,
    ) -> Self {
        Self {
            orders,
            products,
            addresses,
            shipping,
            estimated_delivery_days,
        }
    }

    /// Validate lines, resolve the address, price the cart and quote shipping.
    pub async fn price_checkout(
        &self,
        user_id: &str,
        address_id: Uuid,
        items: &[LineRequest],
        cod: bool,
    ) -> Result<PricedCheckout, WorkflowError> {
        // Shape errors are reported before any lookup.
        merge_quantities(items)?;

        let address = self
            .addresses
            .get_address(address_id, user_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Address not found".to_string()))?;

        let catalog = self.load_catalog(items).await?;
        let cart = aggregate_lines(items, &catalog)?;

        let lines = cart.lines.iter().map(|line| {
            let dims = catalog.get(&line.product_id).and_then(|p| p.dimensions.as_ref());
            (dims, line.quantity)
        });
        let quote = self.shipping.quote(lines, &address.pincode, cod).await;

        Ok(PricedCheckout { address, cart, quote })
    }

    /// Create an order from a cart. Nothing is written unless every step
    /// before persistence succeeds.
    pub async fn place_order(&self, user_id: &str, request: PlaceOrder) -> Result<Order, WorkflowError> {
        let priced = self
            .price_checkout(
                user_id,
                request.address_id,
                &request.items,
                request.payment_method.is_cod(),
            )
            .await?;

        let items: Vec<OrderItem> = priced.cart.lines.into_iter().map(OrderItem::from).collect();
        let order = Order::new(
            user_id.to_string(),
            priced.address.deliver_to(),
            items,
            priced.quote.charge,
            request.payment_method,
            self.estimated_delivery_days,
        );

        self.orders.create_order(&order).await?;

        tracing::info!(
            order_code = %order.order_code,
            payment_method = order.payment_method.as_str(),
            total = %order.total(),
            "Order placed"
        );
        OrderEvent::OrderPlaced(OrderPlacedEvent {
            order_id: order.id,
            order_code: order.order_code.clone(),
            user_id: order.user_id.clone(),
            payment_method: order.payment_method.as_str().to_string(),
            total: order.total(),
            timestamp: order.placed_at.timestamp(),
        })
        .emit();

        Ok(order)
    }

    async fn load_catalog(&self, items: &[LineRequest]) -> Result<HashMap<Uuid, Product>, WorkflowError> {
        let ids = requested_ids(items);
        let products = self.products.get_products(&ids).await?;
        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }
}
