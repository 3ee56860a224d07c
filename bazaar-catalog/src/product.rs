use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Physical size of a single unit, in centimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub height_cm: Option<f64>,
    pub width_cm: Option<f64>,
    pub depth_cm: Option<f64>,
}

impl Dimensions {
    pub fn new(height_cm: f64, width_cm: f64, depth_cm: f64) -> Self {
        Self {
            height_cm: Some(height_cm),
            width_cm: Some(width_cm),
            depth_cm: Some(depth_cm),
        }
    }

    /// All three sides, only when every one of them is known and positive.
    pub fn sides(&self) -> Option<(f64, f64, f64)> {
        match (self.height_cm, self.width_cm, self.depth_cm) {
            (Some(h), Some(w), Some(d)) if h > 0.0 && w > 0.0 && d > 0.0 => Some((h, w, d)),
            _ => None,
        }
    }

    pub fn volume_cm3(&self) -> Option<f64> {
        self.sides().map(|(h, w, d)| h * w * d)
    }
}

/// Catalogue entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub image: Option<String>,
    pub is_active: bool,
    pub dimensions: Option<Dimensions>,
}

impl Product {
    pub fn new(name: &str, price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slugify(name),
            description: String::new(),
            price,
            sale_price: None,
            image: None,
            is_active: true,
            dimensions: None,
        }
    }

    /// Price the customer pays: the sale price when one is set.
    pub fn effective_price(&self) -> Decimal {
        self.sale_price.unwrap_or(self.price)
    }

    /// List price, reported only while a sale price is active.
    pub fn original_price(&self) -> Option<Decimal> {
        self.sale_price.map(|_| self.price)
    }

    pub fn savings(&self) -> Option<Decimal> {
        self.sale_price.map(|sale| self.price - sale)
    }

    pub fn is_orderable(&self) -> bool {
        self.is_active
    }
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}
