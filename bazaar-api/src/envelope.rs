use axum::{
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    Json,
};
use bazaar_order::{Order, OrderFilter, OrderPage, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// JSON body extractor whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Success body: `{"message": ..., "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

pub fn ok<T: Serialize>(message: &str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        message: message.to_string(),
        data,
    })
}

pub fn created<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok(message, data))
}

/// An order as returned to clients, with its derived total.
#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub total: Decimal,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            total: order.total(),
            order,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListView {
    pub orders: Vec<OrderView>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl OrderListView {
    pub fn new(page: OrderPage, filter: &OrderFilter) -> Self {
        Self {
            orders: page.orders.into_iter().map(OrderView::from).collect(),
            total: page.total,
            page: filter.page,
            limit: filter.limit,
        }
    }
}

/// `?page=&limit=&status=` on order listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

impl ListOrdersQuery {
    pub fn into_filter(self) -> Result<OrderFilter, AppError> {
        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                OrderStatus::parse(raw)
                    .ok_or_else(|| AppError::ValidationError(format!("Invalid status: {}", raw)))?,
            ),
            None => None,
        };
        Ok(OrderFilter::new(self.page, self.limit).with_status(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_order::mocks::sample_order;
    use bazaar_order::PaymentMethod;

    #[test]
    fn test_order_view_carries_total() {
        let order = sample_order(PaymentMethod::CashOnDelivery);
        let expected = order.total();
        let value = serde_json::to_value(OrderView::from(order)).unwrap();

        assert_eq!(value["total"], serde_json::json!(expected));
        assert!(value["orderCode"].as_str().unwrap().starts_with("ORD-"));
        assert_eq!(value["status"], "order_placed");
    }

    #[test]
    fn test_list_query_rejects_unknown_status() {
        let query = ListOrdersQuery { status: Some("lost".into()), ..Default::default() };
        assert!(matches!(query.into_filter(), Err(AppError::ValidationError(_))));

        let filter = ListOrdersQuery { page: Some(2), limit: Some(500), status: Some("shipped".into()) }
            .into_filter()
            .unwrap();
        assert_eq!(filter.page, 2);
        assert_eq!(filter.limit, 100);
        assert_eq!(filter.status, Some(OrderStatus::Shipped));
    }
}
