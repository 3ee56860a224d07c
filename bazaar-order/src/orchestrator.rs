use crate::error::WorkflowError;
use crate::ledger;
use crate::models::{Order, PaymentMethod, PaymentStatus};
use crate::placement::{OrderPlacement, PlaceOrder};
use crate::repository::OrderRepository;
use bazaar_catalog::LineRequest;
use bazaar_core::payment::{to_subunits, PaymentGateway};
use bazaar_shared::models::{OrderEvent, PaymentVerifiedEvent};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

const GATEWAY: &str = "payment gateway";

#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
    pub address_id: Option<Uuid>,
    pub items: Vec<LineRequest>,
    /// Pay for an existing gateway order instead of placing a new one.
    pub order_code: Option<String>,
}

/// What the storefront needs to open the gateway's checkout widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_code: Option<String>,
    pub gateway_order_id: String,
    pub key_id: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct VerifyPayment {
    pub order_code: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

pub struct PaymentOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderRepository>,
    placement: Arc<OrderPlacement>,
    currency: String,
    test_mode: bool,
}

impl PaymentOrchestrator {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        orders: Arc<dyn OrderRepository>,
        placement: Arc<OrderPlacement>,
        currency: &str,
    ) -> Self {
        Self {
            gateway,
            orders,
            placement,
            currency: currency.to_string(),
            test_mode: false,
        }
    }

    /// Allow the fixed-amount checkout used to smoke-test gateway keys.
    pub fn with_test_mode(mut self, enabled: bool) -> Self {
        self.test_mode = enabled;
        self
    }

    /// Open a gateway order for an existing order, a new cart, or (in test
    /// mode only) a fixed 1.00 smoke-test payment.
    pub async fn create_payment_order(
        &self,
        user_id: &str,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, WorkflowError> {
        let key_id = self
            .gateway
            .key_id()
            .filter(|_| self.gateway.is_configured())
            .ok_or(WorkflowError::Unconfigured(GATEWAY))?
            .to_string();

        let order = match (request.order_code.as_deref(), request.items.is_empty()) {
            (Some(code), _) => Some(self.payable_order(user_id, code).await?),
            (None, false) => {
                let address_id = request.address_id.ok_or_else(|| {
                    WorkflowError::Validation("Delivery address is required".to_string())
                })?;
                let placed = self
                    .placement
                    .place_order(
                        user_id,
                        PlaceOrder {
                            address_id,
                            items: request.items,
                            payment_method: PaymentMethod::Gateway,
                        },
                    )
                    .await?;
                Some(placed)
            }
            (None, true) if self.test_mode => None,
            (None, true) => {
                return Err(WorkflowError::Validation("Cart is empty".to_string()));
            }
        };

        let (amount, receipt) = match &order {
            Some(order) => (order.total(), order.order_code.clone()),
            None => (Decimal::ONE, format!("test_{}", Utc::now().timestamp_millis())),
        };
        let amount = to_subunits(amount)
            .filter(|a| *a > 0)
            .ok_or_else(|| WorkflowError::Validation("Order amount is not payable".to_string()))?;

        let gateway_order = self
            .gateway
            .create_order(amount, &self.currency, &receipt)
            .await
            .map_err(|e| {
                // The local order stays pending and can be paid later by code.
                tracing::error!(receipt = %receipt, "Gateway order creation failed: {}", e);
                WorkflowError::from(e)
            })?;

        if let Some(order) = &order {
            self.orders
                .record_gateway_order(order.id, &gateway_order.id)
                .await?;
            tracing::info!(
                order_code = %order.order_code,
                gateway_order_id = %gateway_order.id,
                amount,
                "Gateway order created"
            );
        } else {
            tracing::info!(gateway_order_id = %gateway_order.id, "Test gateway order created");
        }

        Ok(CheckoutSession {
            order_code: order.map(|o| o.order_code),
            gateway_order_id: gateway_order.id,
            key_id,
            amount: gateway_order.amount,
            currency: gateway_order.currency,
        })
    }

    /// Check the gateway's signature and settle the payment axis. A payment
    /// that is already confirmed is returned unchanged.
    pub async fn verify_payment(
        &self,
        user_id: &str,
        request: VerifyPayment,
    ) -> Result<Order, WorkflowError> {
        for (field, value) in [
            ("orderCode", &request.order_code),
            ("gatewayOrderId", &request.gateway_order_id),
            ("gatewayPaymentId", &request.gateway_payment_id),
            ("signature", &request.signature),
        ] {
            if value.trim().is_empty() {
                return Err(WorkflowError::Validation(format!("{} is required", field)));
            }
        }

        let mut order = self
            .orders
            .find_by_code(&request.order_code)
            .await?
            .filter(|o| o.belongs_to(user_id))
            .ok_or_else(|| WorkflowError::NotFound("Order not found".to_string()))?;

        if order.payment_status == PaymentStatus::Confirmed {
            tracing::debug!(order_code = %order.order_code, "Payment already confirmed");
            return Ok(order);
        }
        if order.payment_method != PaymentMethod::Gateway {
            return Err(WorkflowError::Validation(
                "Order is not paid through the gateway".to_string(),
            ));
        }

        let matches_order = order.gateway_order_id.as_deref() == Some(request.gateway_order_id.as_str());
        let accepted = matches_order
            && self.gateway.verify_signature(
                &request.gateway_order_id,
                &request.gateway_payment_id,
                &request.signature,
            );

        let now = Utc::now();
        let changed = if accepted {
            ledger::confirm_payment(&mut order, &request.gateway_payment_id, now)
        } else {
            ledger::fail_payment(&mut order, now)
        };
        if changed {
            self.orders.save_progress(&order).await?;
        }

        OrderEvent::PaymentVerified(PaymentVerifiedEvent {
            order_id: order.id,
            order_code: order.order_code.clone(),
            gateway_order_id: request.gateway_order_id.clone(),
            accepted,
            timestamp: now.timestamp(),
        })
        .emit();

        if accepted {
            tracing::info!(order_code = %order.order_code, "Payment confirmed");
            Ok(order)
        } else {
            tracing::warn!(
                order_code = %order.order_code,
                gateway_order_matches = matches_order,
                "Payment signature rejected"
            );
            Err(WorkflowError::SignatureInvalid)
        }
    }

    async fn payable_order(&self, user_id: &str, order_code: &str) -> Result<Order, WorkflowError> {
        let order = self
            .orders
            .find_by_code(order_code)
            .await?
            .filter(|o| o.belongs_to(user_id))
            .ok_or_else(|| WorkflowError::NotFound("Order not found".to_string()))?;

        if order.payment_method != PaymentMethod::Gateway {
            return Err(WorkflowError::Validation(
                "Order is not paid through the gateway".to_string(),
            ));
        }
        if order.payment_status == PaymentStatus::Confirmed {
            return Err(WorkflowError::Validation("Order is already paid".to_string()));
        }
        Ok(order)
    }
}
