use axum::{
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Router,
};
use bazaar_catalog::{product::slugify, Dimensions, Product};
use bazaar_order::OrderStatus;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::envelope::{created, ok, ApiJson, ApiQuery, ListOrdersQuery, OrderListView, OrderView};
use crate::error::AppError;
use crate::middleware::{admin_auth_middleware, Claims};
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub image: Option<String>,
    pub is_active: Option<bool>,
    pub dimensions: Option<Dimensions>,
}

/// Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    /// `null` clears the sale price.
    #[serde(default, with = "double_option")]
    pub sale_price: Option<Option<Decimal>>,
    pub image: Option<String>,
    pub is_active: Option<bool>,
    pub dimensions: Option<Dimensions>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

fn validate_pricing(product: &Product) -> Result<(), AppError> {
    if product.name.trim().is_empty() {
        return Err(AppError::ValidationError("name is required".to_string()));
    }
    if product.price <= Decimal::ZERO {
        return Err(AppError::ValidationError("price must be positive".to_string()));
    }
    if let Some(sale) = product.sale_price {
        if sale <= Decimal::ZERO || sale > product.price {
            return Err(AppError::ValidationError(
                "salePrice must be positive and not above price".to_string(),
            ));
        }
    }
    Ok(())
}

impl CreateProductRequest {
    fn into_product(self) -> Result<Product, AppError> {
        let mut product = Product::new(self.name.trim(), self.price);
        if let Some(slug) = self.slug.as_deref().map(slugify).filter(|s| !s.is_empty()) {
            product.slug = slug;
        }
        product.description = self.description;
        product.sale_price = self.sale_price;
        product.image = self.image;
        product.is_active = self.is_active.unwrap_or(true);
        product.dimensions = self.dimensions;

        validate_pricing(&product)?;
        Ok(product)
    }
}

impl UpdateProductRequest {
    fn apply(self, product: &mut Product) -> Result<(), AppError> {
        if let Some(name) = self.name {
            product.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(sale_price) = self.sale_price {
            product.sale_price = sale_price;
        }
        if let Some(image) = self.image {
            product.image = Some(image);
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
        if let Some(dimensions) = self.dimensions {
            product.dimensions = Some(dimensions);
        }
        validate_pricing(product)
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/orders", get(list_orders))
        .route("/admin/orders/{id}", get(get_order))
        .route("/admin/orders/{id}/status", put(update_status))
        .route("/admin/orders/{id}/create-shipment", post(create_shipment))
        .route("/admin/orders/{id}/generate-label", post(generate_label))
        .route("/admin/orders/{id}/request-pickup", post(request_pickup))
        .route("/admin/products", post(create_product))
        .route("/admin/products/{id}", put(update_product))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}

// ============================================================================
// Orders
// ============================================================================

/// GET /admin/orders
async fn list_orders(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListOrdersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = query.into_filter()?;
    let page = state
        .orders
        .list_orders(&filter)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(ok("Orders fetched", OrderListView::new(page, &filter)))
}

/// GET /admin/orders/{id}
async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.ledger.get_order(order_id).await?;
    Ok(ok("Order fetched", OrderView::from(order)))
}

/// PUT /admin/orders/{id}/status
async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let target = OrderStatus::parse(req.status.trim()).ok_or_else(|| {
        AppError::ValidationError(format!("Invalid status: {}", req.status))
    })?;

    let order = state.ledger.update_status(order_id, target).await?;
    tracing::info!(order_code = %order.order_code, status = %target, admin = %claims.sub, "Order status updated");

    Ok(ok("Order status updated", OrderView::from(order)))
}

/// POST /admin/orders/{id}/create-shipment
async fn create_shipment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.dispatcher.create_shipment(order_id).await?;
    let message = if outcome.already_created {
        "Shipment already created"
    } else {
        "Shipment created"
    };

    Ok(ok(
        message,
        json!({
            "alreadyCreated": outcome.already_created,
            "awbCode": outcome.order.awb_code,
            "trackingUrl": outcome.order.tracking_url,
            "order": OrderView::from(outcome.order),
        }),
    ))
}

/// POST /admin/orders/{id}/generate-label
async fn generate_label(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let label_url = state.dispatcher.generate_label(order_id).await?;
    Ok(ok("Label generated", json!({ "labelUrl": label_url })))
}

/// POST /admin/orders/{id}/request-pickup
async fn request_pickup(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let pickup = state.dispatcher.request_pickup(order_id).await?;
    Ok(ok("Pickup requested", pickup))
}

// ============================================================================
// Catalogue
// ============================================================================

/// POST /admin/products
async fn create_product(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let product = req.into_product()?;
    state
        .products
        .create_product(&product)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok(created("Product created", product))
}

/// PUT /admin/products/{id}
async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut product = state
        .products
        .get_product(product_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("Product not found".to_string()))?;

    req.apply(&mut product)?;

    let updated = state
        .products
        .update_product(&product)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if !updated {
        return Err(AppError::NotFoundError("Product not found".to_string()));
    }

    Ok(ok("Product updated", product))
}
