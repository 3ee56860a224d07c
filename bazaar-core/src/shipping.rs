use async_trait::async_trait;
use bazaar_catalog::Package;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::address::DeliverTo;
use crate::IntegrationResult;

pub const TRACKING_BASE_URL: &str = "https://track.shiprocket.in/?awb=";

/// Public tracking page for an airway bill.
pub fn tracking_url(awb_code: &str) -> String {
    format!("{}{}", TRACKING_BASE_URL, awb_code)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourierQuote {
    pub courier_id: i64,
    pub courier_name: String,
    pub charge: Decimal,
    pub etd: Option<String>,
}

/// Result of a serviceability check for one destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Serviceability {
    Available { couriers: Vec<CourierQuote> },
    Unavailable { reason: String },
}

impl Serviceability {
    pub fn is_available(&self) -> bool {
        matches!(self, Serviceability::Available { .. })
    }

    /// The cheapest courier on offer, if any.
    pub fn cheapest(&self) -> Option<&CourierQuote> {
        match self {
            Serviceability::Available { couriers } => couriers.iter().min_by(|a, b| a.charge.cmp(&b.charge)),
            Serviceability::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentPayment {
    Cod,
    Prepaid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentItem {
    pub name: String,
    pub sku: String,
    pub units: u32,
    pub selling_price: Decimal,
}

/// Everything the courier needs to book a pickup for one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRequest {
    pub order_code: String,
    pub order_date: NaiveDate,
    pub deliver_to: DeliverTo,
    pub items: Vec<ShipmentItem>,
    pub payment: ShipmentPayment,
    pub sub_total: Decimal,
    pub package: Package,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedShipment {
    pub courier_order_id: String,
    pub shipment_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirwayBill {
    pub awb_code: String,
    pub courier_name: String,
}

/// Courier aggregator integration.
#[async_trait]
pub trait CarrierClient: Send + Sync {
    /// Credentials and pickup postcode are all present.
    fn is_configured(&self) -> bool;

    async fn check_serviceability(
        &self,
        delivery_postcode: &str,
        weight_kg: f64,
        cod: bool,
    ) -> IntegrationResult<Serviceability>;

    async fn create_shipment(&self, request: &ShipmentRequest) -> IntegrationResult<CreatedShipment>;

    async fn assign_awb(
        &self,
        shipment_id: &str,
        courier_id: Option<i64>,
    ) -> IntegrationResult<AirwayBill>;

    async fn generate_pickup(&self, shipment_ids: &[String]) -> IntegrationResult<serde_json::Value>;

    /// Returns the label PDF URL.
    async fn generate_label(&self, shipment_ids: &[String]) -> IntegrationResult<String>;

    async fn track_awb(&self, awb_code: &str) -> IntegrationResult<serde_json::Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(id: i64, charge: Decimal) -> CourierQuote {
        CourierQuote {
            courier_id: id,
            courier_name: format!("Courier {}", id),
            charge,
            etd: None,
        }
    }

    #[test]
    fn test_cheapest_courier() {
        let result = Serviceability::Available {
            couriers: vec![quote(1, dec!(92.5)), quote(2, dec!(64)), quote(3, dec!(110))],
        };
        assert_eq!(result.cheapest().map(|c| c.courier_id), Some(2));
    }

    #[test]
    fn test_unavailable_has_no_quote() {
        let result = Serviceability::Unavailable { reason: "Pincode not serviceable".to_string() };
        assert!(!result.is_available());
        assert!(result.cheapest().is_none());
        assert!(Serviceability::Available { couriers: vec![] }.cheapest().is_none());
    }

    #[test]
    fn test_tracking_url() {
        assert_eq!(tracking_url("AWB123"), "https://track.shiprocket.in/?awb=AWB123");
    }
}
