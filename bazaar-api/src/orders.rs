use axum::{
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::get,
    Extension, Router,
};
use bazaar_catalog::{LineError, LineRequest};
use bazaar_order::{PaymentMethod, PlaceOrder, WorkflowError};
use serde::Deserialize;
use uuid::Uuid;

use crate::envelope::{created, ok, ApiJson, ApiQuery, ListOrdersQuery, OrderListView, OrderView};
use crate::error::AppError;
use crate::middleware::{customer_auth_middleware, Claims};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub address_id: Option<Uuid>,
    #[serde(default)]
    pub items: Vec<LineRequest>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/orders", get(list_orders).post(create_order))
        .route("/v1/orders/{id}", get(get_order))
        .route_layer(middleware::from_fn_with_state(state, customer_auth_middleware))
}

/// POST /v1/orders
async fn create_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.items.is_empty() {
        return Err(WorkflowError::from(LineError::Empty).into());
    }
    let address_id = req
        .address_id
        .ok_or_else(|| AppError::ValidationError("Delivery address is required".to_string()))?;

    let order = state
        .placement
        .place_order(
            &claims.sub,
            PlaceOrder {
                address_id,
                items: req.items,
                payment_method: req.payment_method,
            },
        )
        .await?;

    Ok(created("Order placed successfully", OrderView::from(order)))
}

/// GET /v1/orders
async fn list_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<ListOrdersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = query.into_filter()?.for_user(&claims.sub);
    let page = state
        .orders
        .list_orders(&filter)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(ok("Orders fetched", OrderListView::new(page, &filter)))
}

/// GET /v1/orders/{id}
async fn get_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.ledger.get_order(order_id).await?;
    // Another customer's order is reported as missing.
    if !order.belongs_to(&claims.sub) {
        return Err(AppError::NotFoundError("Order not found".to_string()));
    }

    Ok(ok("Order fetched", OrderView::from(order)))
}
