use crate::product::Dimensions;
use serde::{Deserialize, Serialize};

/// Industry-standard volumetric divisor (cm³ per kg).
pub const VOLUMETRIC_DIVISOR: f64 = 5000.0;
/// Floor applied per unit when dimensions are known.
pub const MIN_UNIT_WEIGHT_KG: f64 = 0.1;
/// Carrier minimum for a whole package.
pub const MIN_PACKAGE_WEIGHT_KG: f64 = 0.5;
pub const DEFAULT_UNIT_WEIGHT_KG: f64 = 0.2;
pub const MIN_PACKAGE_SIDE_CM: f64 = 10.0;

/// A single consolidated parcel sent to the courier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub weight_kg: f64,
    pub length_cm: f64,
    pub breadth_cm: f64,
    pub height_cm: f64,
}

/// Chargeable-weight estimates for carts and orders.
#[derive(Debug, Clone, Copy)]
pub struct WeightEstimator {
    default_unit_weight_kg: f64,
}

impl WeightEstimator {
    pub fn new(default_unit_weight_kg: f64) -> Self {
        Self { default_unit_weight_kg }
    }

    /// Weight of one line: volumetric when all dimensions are known, a flat
    /// per-unit default otherwise.
    pub fn line_weight(&self, dimensions: Option<&Dimensions>, quantity: u32) -> f64 {
        let qty = f64::from(quantity);
        match dimensions.and_then(Dimensions::volume_cm3) {
            Some(volume) => {
                let volumetric = volume * qty / VOLUMETRIC_DIVISOR;
                volumetric.max(MIN_UNIT_WEIGHT_KG * qty)
            }
            None => self.default_unit_weight_kg * qty,
        }
    }

    pub fn total_weight<'a, I>(&self, lines: I) -> f64
    where
        I: IntoIterator<Item = (Option<&'a Dimensions>, u32)>,
    {
        let total: f64 = lines
            .into_iter()
            .map(|(dims, qty)| self.line_weight(dims, qty))
            .sum();
        total.max(MIN_PACKAGE_WEIGHT_KG)
    }

    /// Consolidate lines into one parcel: weights add up, each side is the
    /// largest seen across lines.
    pub fn package<'a, I>(&self, lines: I) -> Package
    where
        I: IntoIterator<Item = (Option<&'a Dimensions>, u32)>,
    {
        let mut package = Package {
            weight_kg: 0.0,
            length_cm: MIN_PACKAGE_SIDE_CM,
            breadth_cm: MIN_PACKAGE_SIDE_CM,
            height_cm: MIN_PACKAGE_SIDE_CM,
        };

        for (dims, qty) in lines {
            package.weight_kg += self.line_weight(dims, qty);
            if let Some((h, w, d)) = dims.and_then(Dimensions::sides) {
                package.length_cm = package.length_cm.max(h);
                package.breadth_cm = package.breadth_cm.max(w);
                package.height_cm = package.height_cm.max(d);
            }
        }

        package.weight_kg = package.weight_kg.max(MIN_PACKAGE_WEIGHT_KG);
        package
    }
}

impl Default for WeightEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_UNIT_WEIGHT_KG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volumetric_weight() {
        let estimator = WeightEstimator::default();
        let cube = Dimensions::new(20.0, 20.0, 20.0);

        assert_eq!(estimator.line_weight(Some(&cube), 1), 1.6);
        assert_eq!(estimator.total_weight([(Some(&cube), 1)]), 1.6);
    }

    #[test]
    fn test_unit_floor_applies_to_tiny_items() {
        let estimator = WeightEstimator::default();
        let ring_box = Dimensions::new(2.0, 2.0, 2.0);

        // 8 cm³ is far below 0.1 kg per unit
        let weight = estimator.line_weight(Some(&ring_box), 3);
        assert!((weight - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_package_minimum() {
        let estimator = WeightEstimator::default();
        assert_eq!(estimator.total_weight([(None, 1)]), MIN_PACKAGE_WEIGHT_KG);
        assert_eq!(estimator.total_weight(std::iter::empty()), MIN_PACKAGE_WEIGHT_KG);
    }

    #[test]
    fn test_package_takes_max_sides() {
        let estimator = WeightEstimator::default();
        let tall = Dimensions::new(30.0, 5.0, 5.0);
        let wide = Dimensions::new(5.0, 25.0, 12.0);

        let package = estimator.package([(Some(&tall), 1), (Some(&wide), 2), (None, 1)]);

        assert_eq!(package.length_cm, 30.0);
        assert_eq!(package.breadth_cm, 25.0);
        assert_eq!(package.height_cm, 12.0);
        let expected = 0.15 + (5.0 * 25.0 * 12.0 * 2.0 / 5000.0) + 0.2;
        assert!((package.weight_kg - expected).abs() < 1e-9);
    }
}
