pub mod error;
pub mod fulfillment;
pub mod ledger;
pub mod memory;
pub mod mocks;
pub mod models;
pub mod orchestrator;
pub mod placement;
pub mod repository;
pub mod retry;
pub mod shipping;

pub use error::WorkflowError;
pub use fulfillment::{ShipmentDispatcher, ShipmentOutcome, TrackingReport};
pub use ledger::OrderLedger;
pub use memory::InMemoryStore;
pub use models::{Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus};
pub use orchestrator::{CheckoutRequest, CheckoutSession, PaymentOrchestrator, VerifyPayment};
pub use placement::{OrderPlacement, PlaceOrder, PricedCheckout};
pub use repository::{OrderFilter, OrderPage, OrderRepository};
pub use retry::RetryPolicy;
pub use shipping::{ShippingQuote, ShippingRateResolver};
