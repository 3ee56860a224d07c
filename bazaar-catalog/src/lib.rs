pub mod product;
pub mod lines;
pub mod weight;

pub use product::{Product, Dimensions};
pub use lines::{aggregate_lines, LineError, LineRequest, PricedCart, PricedLine};
pub use weight::{Package, WeightEstimator};
