//! Test doubles for the payment gateway and the courier, plus sample data.

use crate::models::{Order, OrderItem, PaymentMethod};
use async_trait::async_trait;
use bazaar_core::payment::{verify_payment_signature, GatewayOrder, PaymentGateway};
use bazaar_core::shipping::{
    AirwayBill, CarrierClient, CourierQuote, CreatedShipment, Serviceability, ShipmentRequest,
};
use bazaar_core::{AddressType, DeliverTo, IntegrationError, IntegrationResult, UserAddress};
use bazaar_shared::Masked;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

pub struct MockPaymentGateway {
    key_id: Option<String>,
    secret: String,
    created: AtomicUsize,
    last_receipt: Mutex<Option<String>>,
    create_failures: Mutex<VecDeque<IntegrationError>>,
}

impl MockPaymentGateway {
    pub fn new(secret: &str) -> Self {
        Self {
            key_id: Some("rzp_test_key".to_string()),
            secret: secret.to_string(),
            created: AtomicUsize::new(0),
            last_receipt: Mutex::new(None),
            create_failures: Mutex::new(VecDeque::new()),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            key_id: None,
            ..Self::new("")
        }
    }

    pub fn fail_next_create(&self, error: IntegrationError) {
        if let Ok(mut failures) = self.create_failures.lock() {
            failures.push_back(error);
        }
    }

    pub fn created_orders(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn last_receipt(&self) -> Option<String> {
        self.last_receipt.lock().ok().and_then(|r| r.clone())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> IntegrationResult<GatewayOrder> {
        if let Some(error) = self.create_failures.lock().ok().and_then(|mut f| f.pop_front()) {
            return Err(error);
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut last) = self.last_receipt.lock() {
            *last = Some(receipt.to_string());
        }
        Ok(GatewayOrder {
            id: format!("order_mock{:04}", n),
            amount,
            currency: currency.to_string(),
            receipt: receipt.to_string(),
            status: "created".to_string(),
        })
    }

    fn verify_signature(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool {
        verify_payment_signature(&self.secret, gateway_order_id, gateway_payment_id, signature)
    }
}

/// Scripted courier. Every call is counted by operation name; failures
/// queued with [`MockCarrier::fail_next`] are returned before any success.
pub struct MockCarrier {
    configured: bool,
    serviceability: Serviceability,
    calls: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<HashMap<&'static str, VecDeque<IntegrationError>>>,
    shipment_requests: Mutex<Vec<ShipmentRequest>>,
}

impl Default for MockCarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCarrier {
    pub fn new() -> Self {
        Self {
            configured: true,
            serviceability: Serviceability::Available {
                couriers: vec![CourierQuote {
                    courier_id: 1,
                    courier_name: "Delhivery Surface".to_string(),
                    charge: Decimal::from(50),
                    etd: Some("4 days".to_string()),
                }],
            },
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            shipment_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    pub fn with_serviceability(mut self, serviceability: Serviceability) -> Self {
        self.serviceability = serviceability;
        self
    }

    pub fn fail_next(&self, operation: &'static str, error: IntegrationError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.entry(operation).or_default().push_back(error);
        }
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .ok()
            .and_then(|c| c.get(operation).copied())
            .unwrap_or(0)
    }

    pub fn last_shipment_request(&self) -> Option<ShipmentRequest> {
        self.shipment_requests.lock().ok().and_then(|r| r.last().cloned())
    }

    /// Counts the call and returns its sequence number, or a queued failure.
    fn record(&self, operation: &'static str) -> IntegrationResult<usize> {
        if let Some(error) = self
            .failures
            .lock()
            .ok()
            .and_then(|mut f| f.get_mut(operation).and_then(VecDeque::pop_front))
        {
            self.bump(operation);
            return Err(error);
        }
        Ok(self.bump(operation))
    }

    fn bump(&self, operation: &'static str) -> usize {
        match self.calls.lock() {
            Ok(mut calls) => {
                let count = calls.entry(operation).or_insert(0);
                *count += 1;
                *count
            }
            Err(_) => 0,
        }
    }
}

#[async_trait]
impl CarrierClient for MockCarrier {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn check_serviceability(
        &self,
        _delivery_postcode: &str,
        _weight_kg: f64,
        _cod: bool,
    ) -> IntegrationResult<Serviceability> {
        self.record("check_serviceability")?;
        Ok(self.serviceability.clone())
    }

    async fn create_shipment(&self, request: &ShipmentRequest) -> IntegrationResult<CreatedShipment> {
        let n = self.record("create_shipment")?;
        if let Ok(mut requests) = self.shipment_requests.lock() {
            requests.push(request.clone());
        }
        Ok(CreatedShipment {
            courier_order_id: format!("{}", 900_000 + n),
            shipment_id: format!("{}", 800_000 + n),
        })
    }

    async fn assign_awb(
        &self,
        shipment_id: &str,
        _courier_id: Option<i64>,
    ) -> IntegrationResult<AirwayBill> {
        self.record("assign_awb")?;
        Ok(AirwayBill {
            awb_code: format!("AWB{}", shipment_id),
            courier_name: "Delhivery Surface".to_string(),
        })
    }

    async fn generate_pickup(&self, shipment_ids: &[String]) -> IntegrationResult<serde_json::Value> {
        self.record("generate_pickup")?;
        Ok(serde_json::json!({
            "pickup_status": 1,
            "response": { "shipment_ids": shipment_ids },
        }))
    }

    async fn generate_label(&self, shipment_ids: &[String]) -> IntegrationResult<String> {
        self.record("generate_label")?;
        Ok(format!(
            "https://labels.example.com/{}.pdf",
            shipment_ids.join("-")
        ))
    }

    async fn track_awb(&self, awb_code: &str) -> IntegrationResult<serde_json::Value> {
        self.record("track_awb")?;
        Ok(serde_json::json!({
            "tracking_data": { "awb": awb_code, "current_status": "In Transit" }
        }))
    }
}

pub fn sample_deliver_to() -> DeliverTo {
    DeliverTo {
        full_name: "Meera Iyer".to_string(),
        address_line_1: "4 Lake View Road".to_string(),
        address_line_2: String::new(),
        city: "Chennai".to_string(),
        state: "Tamil Nadu".to_string(),
        pincode: "600001".to_string(),
        phone: Masked("9840012345".to_string()),
        email: Masked("meera@example.com".to_string()),
        landmark: String::new(),
    }
}

pub fn sample_address(user_id: &str) -> UserAddress {
    UserAddress {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        address_type: AddressType::Home,
        full_name: "Asha Verma".to_string(),
        mobile_number: Masked("+91 98765 43210".to_string()),
        email_address: Masked("asha@example.com".to_string()),
        address_line_1: "12 MG Road".to_string(),
        address_line_2: String::new(),
        pincode: "560001".to_string(),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        landmark: String::new(),
        is_default: true,
    }
}

/// A placed order with one line of two units at 250.
pub fn sample_order(payment_method: PaymentMethod) -> Order {
    let price = Decimal::from(250);
    let items = vec![OrderItem {
        product_id: Uuid::new_v4(),
        product_name: "Handloom Saree Stole".to_string(),
        quantity: 2,
        price_per_item: price,
        original_price: None,
        total_for_item: price * Decimal::from(2),
    }];
    Order::new(
        "user-1".to_string(),
        sample_deliver_to(),
        items,
        Decimal::from(40),
        payment_method,
        5,
    )
}
