pub mod shiprocket;
pub mod token_cache;

pub use shiprocket::ShiprocketClient;
pub use token_cache::TokenCache;
