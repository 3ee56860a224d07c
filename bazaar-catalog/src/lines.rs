use crate::product::Product;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// A `(productId, quantity)` pair as submitted by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// One priced line per distinct product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: u32,
    pub price_per_item: Decimal,
    pub original_price: Option<Decimal>,
    pub total_for_item: Decimal,
}

impl PricedLine {
    /// Per-unit saving against the list price, for display.
    pub fn savings(&self) -> Option<Decimal> {
        self.original_price.map(|original| original - self.price_per_item)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("At least one item is required to place an order.")]
    Empty,

    #[error("Quantity must be at least 1 for product {0}")]
    ZeroQuantity(Uuid),

    #[error("Some products are invalid or inactive: {0:?}")]
    InvalidItems(Vec<Uuid>),
}

/// Sum quantities per product. Keyed by product id so iteration order does
/// not depend on the order the client sent the lines in.
pub fn merge_quantities(requests: &[LineRequest]) -> Result<BTreeMap<Uuid, u32>, LineError> {
    if requests.is_empty() {
        return Err(LineError::Empty);
    }

    let mut merged: BTreeMap<Uuid, u32> = BTreeMap::new();
    for request in requests {
        if request.quantity == 0 {
            return Err(LineError::ZeroQuantity(request.product_id));
        }
        let entry = merged.entry(request.product_id).or_insert(0);
        *entry = entry.saturating_add(request.quantity);
    }
    Ok(merged)
}

/// Distinct product ids referenced by a request, sorted.
pub fn requested_ids(requests: &[LineRequest]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = requests.iter().map(|r| r.product_id).collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Price the requested lines against a catalogue snapshot.
///
/// Fails with every missing or inactive product id, not just the first.
pub fn aggregate_lines(
    requests: &[LineRequest],
    catalog: &HashMap<Uuid, Product>,
) -> Result<PricedCart, LineError> {
    let merged = merge_quantities(requests)?;

    let invalid: Vec<Uuid> = merged
        .keys()
        .filter(|id| !catalog.get(id).map(Product::is_orderable).unwrap_or(false))
        .copied()
        .collect();
    if !invalid.is_empty() {
        return Err(LineError::InvalidItems(invalid));
    }

    let mut lines = Vec::with_capacity(merged.len());
    let mut subtotal = Decimal::ZERO;

    for (product_id, quantity) in merged {
        let Some(product) = catalog.get(&product_id) else {
            continue;
        };
        let price_per_item = product.effective_price();
        let total_for_item = price_per_item * Decimal::from(quantity);
        subtotal += total_for_item;

        lines.push(PricedLine {
            product_id,
            product_name: product.name.clone(),
            quantity,
            price_per_item,
            original_price: product.original_price(),
            total_for_item,
        });
    }

    Ok(PricedCart { lines, subtotal })
}
