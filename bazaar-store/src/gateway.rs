use crate::app_config::PaymentConfig;
use async_trait::async_trait;
use bazaar_core::payment::{verify_payment_signature, GatewayOrder, PaymentGateway};
use bazaar_core::{IntegrationError, IntegrationResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const SERVICE: &str = "razorpay";
const API_URL: &str = "https://api.razorpay.com/v1";

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    receipt: Option<String>,
    #[serde(default)]
    status: String,
}

/// Razorpay orders API and checkout signature verification.
#[derive(Clone)]
pub struct RazorpayGateway {
    client: Client,
    api_url: String,
    key_id: Option<String>,
    key_secret: Option<String>,
}

impl RazorpayGateway {
    pub fn new(config: &PaymentConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;
        let non_empty = |v: &str| (!v.trim().is_empty()).then(|| v.trim().to_string());

        Ok(Self {
            client,
            api_url: API_URL.to_string(),
            key_id: non_empty(&config.key_id),
            key_secret: non_empty(&config.key_secret),
        })
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn is_configured(&self) -> bool {
        self.key_id.is_some() && self.key_secret.is_some()
    }

    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> IntegrationResult<GatewayOrder> {
        let (Some(key_id), Some(key_secret)) = (&self.key_id, &self.key_secret) else {
            return Err(IntegrationError::Unconfigured(SERVICE));
        };

        let response = self
            .client
            .post(format!("{}/orders", self.api_url))
            .basic_auth(key_id, Some(key_secret))
            .json(&CreateOrderBody {
                amount,
                currency,
                receipt,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IntegrationError::Timeout { service: SERVICE }
                } else {
                    IntegrationError::Transport {
                        service: SERVICE,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .pointer("/error/description")
                .and_then(Value::as_str)
                .unwrap_or("order creation failed")
                .to_string();
            return Err(IntegrationError::Api {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        let order: OrderResponse = response.json().await.map_err(|e| IntegrationError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;

        Ok(GatewayOrder {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
            receipt: order.receipt.unwrap_or_else(|| receipt.to_string()),
            status: order.status,
        })
    }

    fn verify_signature(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool {
        match &self.key_secret {
            Some(secret) => verify_payment_signature(secret, gateway_order_id, gateway_payment_id, signature),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::payment::sign_payment;
    use serde_json::json;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(key_id: &str, key_secret: &str) -> PaymentConfig {
        PaymentConfig {
            key_id: key_id.to_string(),
            key_secret: key_secret.to_string(),
            currency: "INR".to_string(),
            test_mode: false,
            request_timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn test_create_order_posts_amount_in_paise() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(header_exists("authorization"))
            .and(body_json(json!({ "amount": 49900, "currency": "INR", "receipt": "ORD-42" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "order_Nx1",
                "entity": "order",
                "amount": 49900,
                "currency": "INR",
                "receipt": "ORD-42",
                "status": "created"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = RazorpayGateway::new(&config("rzp_test_key", "secret"))
            .unwrap()
            .with_api_url(&server.uri());
        let order = gateway.create_order(49900, "INR", "ORD-42").await.unwrap();

        assert_eq!(order.id, "order_Nx1");
        assert_eq!(order.amount, 49900);
        assert_eq!(order.status, "created");
    }

    #[tokio::test]
    async fn test_api_error_carries_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": "BAD_REQUEST_ERROR", "description": "Authentication failed" }
            })))
            .mount(&server)
            .await;

        let gateway = RazorpayGateway::new(&config("rzp_test_key", "wrong"))
            .unwrap()
            .with_api_url(&server.uri());
        let err = gateway.create_order(100, "INR", "test_1").await.unwrap_err();

        assert_eq!(
            err,
            IntegrationError::Api {
                service: "razorpay",
                status: 400,
                message: "Authentication failed".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_secret_is_unconfigured() {
        let gateway = RazorpayGateway::new(&config("rzp_test_key", " ")).unwrap();

        assert!(!gateway.is_configured());
        assert!(matches!(
            gateway.create_order(100, "INR", "r").await,
            Err(IntegrationError::Unconfigured("razorpay"))
        ));
        assert!(!gateway.verify_signature("order_1", "pay_1", "anything"));
    }

    #[test]
    fn test_verifies_with_configured_secret() {
        let gateway = RazorpayGateway::new(&config("rzp_test_key", "s3cret")).unwrap();
        let signature = sign_payment("s3cret", "order_1", "pay_1").unwrap();

        assert!(gateway.verify_signature("order_1", "pay_1", &signature));
        assert!(!gateway.verify_signature("order_1", "pay_2", &signature));
    }
}
