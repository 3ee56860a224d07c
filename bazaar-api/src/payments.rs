use axum::{extract::State, middleware, response::IntoResponse, routing::post, Extension, Router};
use bazaar_catalog::LineRequest;
use bazaar_order::{CheckoutRequest, VerifyPayment};
use serde::Deserialize;
use uuid::Uuid;

use crate::envelope::{ok, ApiJson, OrderView};
use crate::error::AppError;
use crate::middleware::{customer_auth_middleware, Claims};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentOrderRequest {
    pub address_id: Option<Uuid>,
    #[serde(default)]
    pub items: Vec<LineRequest>,
    pub order_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyPaymentRequest {
    pub order_code: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/payments/order", post(create_payment_order))
        .route("/v1/payments/verify", post(verify_payment))
        .route_layer(middleware::from_fn_with_state(state, customer_auth_middleware))
}

/// POST /v1/payments/order
async fn create_payment_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreatePaymentOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .payments
        .create_payment_order(
            &claims.sub,
            CheckoutRequest {
                address_id: req.address_id,
                items: req.items,
                order_code: req.order_code.filter(|code| !code.trim().is_empty()),
            },
        )
        .await?;

    Ok(ok("Payment order created", session))
}

/// POST /v1/payments/verify
async fn verify_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let order = state
        .payments
        .verify_payment(
            &claims.sub,
            VerifyPayment {
                order_code: req.order_code,
                gateway_order_id: req.gateway_order_id,
                gateway_payment_id: req.gateway_payment_id,
                signature: req.signature,
            },
        )
        .await?;

    Ok(ok("Payment verified", OrderView::from(order)))
}
