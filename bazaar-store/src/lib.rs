pub mod address_repo;
pub mod app_config;
pub mod carrier;
pub mod catalog_repo;
pub mod database;
pub mod gateway;
pub mod order_repo;

pub use address_repo::PgAddressRepository;
pub use carrier::{ShiprocketClient, TokenCache};
pub use catalog_repo::PgProductRepository;
pub use database::DbClient;
pub use gateway::RazorpayGateway;
pub use order_repo::PgOrderRepository;
