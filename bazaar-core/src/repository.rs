use async_trait::async_trait;
use bazaar_catalog::Product;
use uuid::Uuid;

use crate::address::UserAddress;
use crate::RepoError;

/// Repository trait for product catalog access
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create_product(&self, product: &Product) -> Result<Uuid, RepoError>;

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, RepoError>;

    /// Fetch several products at once. Unknown ids are simply absent from
    /// the result.
    async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, RepoError>;

    /// Returns `false` when no product has this id.
    async fn update_product(&self, product: &Product) -> Result<bool, RepoError>;
}

/// Repository trait for saved delivery addresses
#[async_trait]
pub trait AddressRepository: Send + Sync {
    async fn create_address(&self, address: &UserAddress) -> Result<Uuid, RepoError>;

    /// Only returns the address when it belongs to `user_id`.
    async fn get_address(&self, id: Uuid, user_id: &str) -> Result<Option<UserAddress>, RepoError>;

    async fn list_addresses(&self, user_id: &str) -> Result<Vec<UserAddress>, RepoError>;
}
