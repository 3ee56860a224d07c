use crate::error::WorkflowError;
use crate::retry::{retry_read, RetryPolicy};
use bazaar_catalog::{Dimensions, WeightEstimator};
use bazaar_core::shipping::{CarrierClient, CourierQuote, Serviceability};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

/// A shipping charge for one cart and destination. Never persisted on its
/// own; the charge is copied onto the order at placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    pub destination_postcode: String,
    pub weight_kg: f64,
    pub cod: bool,
    pub charge: Decimal,
    pub courier_name: Option<String>,
    pub etd: Option<String>,
    pub couriers: Vec<CourierQuote>,
    /// Why the charge fell back to zero, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
}

impl ShippingQuote {
    fn free(postcode: &str, weight_kg: f64, cod: bool, reason: String) -> Self {
        Self {
            destination_postcode: postcode.to_string(),
            weight_kg,
            cod,
            charge: Decimal::ZERO,
            courier_name: None,
            etd: None,
            couriers: Vec::new(),
            unavailable_reason: Some(reason),
        }
    }
}

/// Resolves the shipping charge for a cart by asking the carrier for its
/// cheapest serviceable courier.
pub struct ShippingRateResolver {
    carrier: Arc<dyn CarrierClient>,
    estimator: WeightEstimator,
    retry: RetryPolicy,
}

impl ShippingRateResolver {
    pub fn new(carrier: Arc<dyn CarrierClient>, estimator: WeightEstimator) -> Self {
        Self {
            carrier,
            estimator,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn estimator(&self) -> &WeightEstimator {
        &self.estimator
    }

    /// Serviceability for a destination. Upstream errors are surfaced.
    pub async fn check(
        &self,
        postcode: &str,
        weight_kg: f64,
        cod: bool,
    ) -> Result<Serviceability, WorkflowError> {
        let postcode = postcode.trim();
        if postcode.is_empty() {
            return Err(WorkflowError::Validation("Delivery pincode is required".to_string()));
        }
        if !self.carrier.is_configured() {
            return Ok(Serviceability::Unavailable {
                reason: "Shipping carrier not configured".to_string(),
            });
        }

        let serviceability = retry_read(self.retry, || {
            self.carrier.check_serviceability(postcode, weight_kg, cod)
        })
        .await?;
        Ok(serviceability)
    }

    /// Charge for shipping `lines` to `postcode`. Never fails: an
    /// unconfigured carrier, an unserviceable destination or an upstream
    /// error all resolve to a zero charge.
    pub async fn quote<'a, I>(&self, lines: I, postcode: &str, cod: bool) -> ShippingQuote
    where
        I: IntoIterator<Item = (Option<&'a Dimensions>, u32)>,
    {
        let weight_kg = self.estimator.total_weight(lines);
        let postcode = postcode.trim();

        if !self.carrier.is_configured() {
            tracing::debug!("Shipping carrier not configured, quoting zero");
            return ShippingQuote::free(postcode, weight_kg, cod, "Shipping carrier not configured".to_string());
        }

        let result = retry_read(self.retry, || {
            self.carrier.check_serviceability(postcode, weight_kg, cod)
        })
        .await;

        match result {
            Ok(serviceability) => match serviceability.cheapest().cloned() {
                Some(courier) => ShippingQuote {
                    destination_postcode: postcode.to_string(),
                    weight_kg,
                    cod,
                    charge: courier.charge.max(Decimal::ZERO),
                    courier_name: Some(courier.courier_name),
                    etd: courier.etd,
                    couriers: match serviceability {
                        Serviceability::Available { couriers } => couriers,
                        Serviceability::Unavailable { .. } => Vec::new(),
                    },
                    unavailable_reason: None,
                },
                None => {
                    let reason = match serviceability {
                        Serviceability::Unavailable { reason } => reason,
                        Serviceability::Available { .. } => "No courier available".to_string(),
                    };
                    tracing::info!(postcode, %reason, "Destination not serviceable, quoting zero");
                    ShippingQuote::free(postcode, weight_kg, cod, reason)
                }
            },
            Err(e) => {
                tracing::warn!(postcode, "Shipping quote failed, quoting zero: {}", e);
                ShippingQuote::free(postcode, weight_kg, cod, e.to_string())
            }
        }
    }
}
