use crate::models::{Order, OrderStatus};
use async_trait::async_trait;
use bazaar_core::shipping::{AirwayBill, CreatedShipment};
use bazaar_core::RepoError;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Listing filter. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFilter {
    pub user_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub page: u32,
    pub limit: u32,
}

impl OrderFilter {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            user_id: None,
            status: None,
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn for_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn with_status(mut self, status: Option<OrderStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: u64,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create_order(&self, order: &Order) -> Result<Uuid, RepoError>;

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, RepoError>;

    async fn find_by_code(&self, order_code: &str) -> Result<Option<Order>, RepoError>;

    /// Looks the key up as an airway bill number first, then as an order code.
    async fn find_by_code_or_awb(&self, key: &str) -> Result<Option<Order>, RepoError>;

    /// Newest first.
    async fn list_orders(&self, filter: &OrderFilter) -> Result<OrderPage, RepoError>;

    /// Persist the status and payment axes (status, stage timestamps,
    /// payment status, gateway payment id).
    async fn save_progress(&self, order: &Order) -> Result<(), RepoError>;

    async fn record_gateway_order(&self, id: Uuid, gateway_order_id: &str) -> Result<(), RepoError>;

    /// Conditional write: stores the shipment identifiers only if the order
    /// has none yet. Returns false when another dispatch won.
    async fn record_shipment_if_absent(
        &self,
        id: Uuid,
        shipment: &CreatedShipment,
    ) -> Result<bool, RepoError>;

    async fn record_airway_bill(
        &self,
        id: Uuid,
        airway_bill: &AirwayBill,
        tracking_url: &str,
    ) -> Result<(), RepoError>;
}
