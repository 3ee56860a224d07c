pub mod events;

pub use events::{OrderEvent, OrderPlacedEvent, PaymentVerifiedEvent, ShipmentDispatchedEvent};
