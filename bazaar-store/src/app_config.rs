use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub payment: PaymentConfig,
    pub carrier: CarrierConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Razorpay credentials. Empty values leave the gateway unconfigured.
#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    #[serde(default)]
    pub key_id: String,
    #[serde(default)]
    pub key_secret: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Allows a fixed 1.00 checkout with an empty cart.
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default = "default_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

/// Shiprocket credentials and pickup address.
#[derive(Debug, Deserialize, Clone)]
pub struct CarrierConfig {
    #[serde(default = "default_carrier_url")]
    pub base_url: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub pickup_postcode: String,
    #[serde(default = "default_pickup_location")]
    pub pickup_location: String,
    #[serde(default = "default_token_validity_hours")]
    pub token_validity_hours: u64,
    #[serde(default = "default_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

/// Provider tokens expire after ten days; a cached one must be dropped
/// before that.
const MAX_TOKEN_VALIDITY_HOURS: u64 = 10 * 24 - 1;

impl CarrierConfig {
    /// How long a fetched token is reused, kept within 1..=239 hours.
    pub fn token_validity(&self) -> Duration {
        let hours = self.token_validity_hours.clamp(1, MAX_TOKEN_VALIDITY_HOURS);
        if hours != self.token_validity_hours {
            tracing::warn!(
                "carrier.token_validity_hours = {} is out of range, using {}",
                self.token_validity_hours,
                hours
            );
        }
        Duration::from_secs(hours * 3600)
    }

    pub fn is_configured(&self) -> bool {
        [&self.email, &self.password, &self.pickup_postcode]
            .iter()
            .all(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_delivery_days")]
    pub estimated_delivery_days: i64,
    #[serde(default = "default_item_weight")]
    pub default_item_weight_kg: f64,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            estimated_delivery_days: default_delivery_days(),
            default_item_weight_kg: default_item_weight(),
        }
    }
}

fn default_currency() -> String { "INR".to_string() }
fn default_carrier_url() -> String { "https://apiv2.shiprocket.in/v1/external".to_string() }
fn default_pickup_location() -> String { "Default".to_string() }
// Provider tokens live ten days.
fn default_token_validity_hours() -> u64 { 9 * 24 }
fn default_timeout_seconds() -> u64 { 15 }
fn default_delivery_days() -> i64 { 5 }
fn default_item_weight() -> f64 { 0.2 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(environment())
            .build()?;

        s.try_deserialize()
    }
}

/// `BAZAAR__<SECTION>__<KEY>`, e.g. `BAZAAR__PAYMENT__KEY_SECRET=...`.
fn environment() -> config::Environment {
    config::Environment::with_prefix("BAZAAR").separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_fall_back_to_defaults() {
        let s = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                port = 8080
                [database]
                url = "postgres://localhost/bazaar"
                [auth]
                jwt_secret = "secret"
                [payment]
                key_id = "rzp_test"
                [carrier]
                email = "ops@example.com"
                [business_rules]
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: Config = s.try_deserialize().unwrap();
        assert_eq!(config.payment.currency, "INR");
        assert!(!config.payment.test_mode);
        assert_eq!(config.carrier.token_validity_hours, 216);
        assert_eq!(config.carrier.pickup_location, "Default");
        assert!(!config.carrier.is_configured());
        assert_eq!(config.business_rules.estimated_delivery_days, 5);
        assert_eq!(config.business_rules.default_item_weight_kg, 0.2);
    }

    #[test]
    fn test_environment_keys_use_double_underscores() {
        let vars: config::Map<String, String> = [
            ("BAZAAR__PAYMENT__KEY_SECRET", "from-env"),
            ("BAZAAR_PAYMENT__KEY_ID", "ignored"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let s = config::Config::builder()
            .add_source(environment().source(Some(vars)))
            .build()
            .unwrap();

        assert_eq!(s.get_string("payment.key_secret").unwrap(), "from-env");
        assert!(s.get_string("payment.key_id").is_err());
    }

    fn carrier_with_validity(hours: u64) -> CarrierConfig {
        let s = config::Config::builder()
            .add_source(config::File::from_str(
                &format!("email = \"ops@example.com\"\ntoken_validity_hours = {}", hours),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        s.try_deserialize().unwrap()
    }

    #[test]
    fn test_token_validity_stays_inside_provider_expiry() {
        assert_eq!(carrier_with_validity(216).token_validity(), Duration::from_secs(216 * 3600));
        assert_eq!(carrier_with_validity(240).token_validity(), Duration::from_secs(239 * 3600));
        assert_eq!(carrier_with_validity(10_000).token_validity(), Duration::from_secs(239 * 3600));
        assert_eq!(carrier_with_validity(0).token_validity(), Duration::from_secs(3600));
    }
}
