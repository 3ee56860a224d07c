use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::IntegrationResult;

type HmacSha256 = Hmac<Sha256>;

/// A remote order created with the payment gateway. The client-side checkout
/// widget is opened against `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    /// Amount in minor units (paise for INR).
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub status: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key handed to the checkout widget. `None` when unconfigured.
    fn key_id(&self) -> Option<&str>;

    fn is_configured(&self) -> bool {
        self.key_id().is_some()
    }

    /// Create a remote order for `amount` minor units.
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> IntegrationResult<GatewayOrder>;

    /// Check the signature returned by the checkout widget. Never errors:
    /// anything that cannot be verified is `false`.
    fn verify_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> bool;
}

/// Convert a major-unit amount to minor units, rounding to the nearest unit.
pub fn to_subunits(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Hex HMAC-SHA256 of `order_id|payment_id` keyed by the merchant secret.
pub fn sign_payment(secret: &str, gateway_order_id: &str, gateway_payment_id: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(gateway_payment_id.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_payment_signature(
    secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
) -> bool {
    if secret.is_empty()
        || gateway_order_id.is_empty()
        || gateway_payment_id.is_empty()
        || signature.is_empty()
    {
        return false;
    }

    match sign_payment(secret, gateway_order_id, gateway_payment_id) {
        Some(expected) => expected == signature,
        None => false,
    }
}
