use std::sync::Arc;

use bazaar_catalog::WeightEstimator;
use bazaar_core::payment::PaymentGateway;
use bazaar_core::repository::{AddressRepository, ProductRepository};
use bazaar_core::shipping::CarrierClient;
use bazaar_order::{
    OrderLedger, OrderPlacement, OrderRepository, PaymentOrchestrator, ShipmentDispatcher,
    ShippingRateResolver,
};
use bazaar_store::app_config::BusinessRules;

use crate::middleware::resiliency::Resiliency;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

/// Adapters and settings the workflow services are built from.
pub struct Wiring {
    pub orders: Arc<dyn OrderRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub addresses: Arc<dyn AddressRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub carrier: Arc<dyn CarrierClient>,
    pub currency: String,
    pub test_mode: bool,
    pub business_rules: BusinessRules,
}

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthConfig,
    pub orders: Arc<dyn OrderRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub addresses: Arc<dyn AddressRepository>,
    pub ledger: Arc<OrderLedger>,
    pub placement: Arc<OrderPlacement>,
    pub payments: Arc<PaymentOrchestrator>,
    pub shipping: Arc<ShippingRateResolver>,
    pub dispatcher: Arc<ShipmentDispatcher>,
    pub resiliency: Arc<Resiliency>,
}

impl AppState {
    pub fn new(auth: AuthConfig, wiring: Wiring) -> Self {
        let estimator = WeightEstimator::new(wiring.business_rules.default_item_weight_kg);

        let shipping = Arc::new(ShippingRateResolver::new(wiring.carrier.clone(), estimator));
        let placement = Arc::new(OrderPlacement::new(
            wiring.orders.clone(),
            wiring.products.clone(),
            wiring.addresses.clone(),
            shipping.clone(),
            wiring.business_rules.estimated_delivery_days,
        ));
        let payments = Arc::new(
            PaymentOrchestrator::new(
                wiring.gateway,
                wiring.orders.clone(),
                placement.clone(),
                &wiring.currency,
            )
            .with_test_mode(wiring.test_mode),
        );
        let dispatcher = Arc::new(ShipmentDispatcher::new(
            wiring.carrier,
            wiring.orders.clone(),
            wiring.products.clone(),
            estimator,
        ));

        Self {
            auth,
            ledger: Arc::new(OrderLedger::new(wiring.orders.clone())),
            orders: wiring.orders,
            products: wiring.products,
            addresses: wiring.addresses,
            placement,
            payments,
            shipping,
            dispatcher,
            resiliency: Arc::new(Resiliency::default()),
        }
    }
}
