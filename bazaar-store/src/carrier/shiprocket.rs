use super::token_cache::TokenCache;
use crate::app_config::CarrierConfig;
use async_trait::async_trait;
use bazaar_core::shipping::{
    AirwayBill, CarrierClient, CourierQuote, CreatedShipment, Serviceability, ShipmentPayment,
    ShipmentRequest,
};
use bazaar_core::{IntegrationError, IntegrationResult};
use reqwest::{Client, RequestBuilder, StatusCode};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const SERVICE: &str = "shiprocket";
const MIN_WEIGHT_KG: f64 = 0.5;

struct Credentials {
    email: String,
    password: String,
}

/// Shiprocket courier aggregator client.
pub struct ShiprocketClient {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
    pickup_postcode: Option<String>,
    pickup_location: String,
    tokens: TokenCache,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl ShiprocketClient {
    pub fn new(config: &CarrierConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        let credentials = match (non_empty(&config.email), non_empty(&config.password)) {
            (Some(email), Some(password)) => Some(Credentials { email, password }),
            _ => None,
        };

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
            pickup_postcode: non_empty(&config.pickup_postcode),
            pickup_location: config.pickup_location.clone(),
            tokens: TokenCache::new(config.token_validity()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn token(&self) -> IntegrationResult<String> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(IntegrationError::Unconfigured(SERVICE))?;

        self.tokens
            .get_or_refresh(|| async {
                let body = serde_json::json!({
                    "email": credentials.email,
                    "password": credentials.password,
                });
                let response = send(self.client.post(self.url("auth/login")).json(&body)).await?;
                let token = response
                    .get("token")
                    .and_then(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| IntegrationError::Api {
                        service: SERVICE,
                        status: 401,
                        message: message_of(&response).unwrap_or("Shiprocket auth failed").to_string(),
                    })?;
                tracing::info!("Shiprocket token refreshed");
                Ok(token.to_string())
            })
            .await
    }

    /// Authenticated call. A 401 drops the cached token so the next call
    /// logs in again.
    async fn call(&self, request: RequestBuilder) -> IntegrationResult<Value> {
        let token = self.token().await?;
        let result = send(request.bearer_auth(token)).await;
        if let Err(IntegrationError::Api { status: 401, .. }) = &result {
            tracing::warn!("Shiprocket rejected the cached token");
            self.tokens.invalidate().await;
        }
        result
    }
}

async fn send(request: RequestBuilder) -> IntegrationResult<Value> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    let body: Value = match response.text().await {
        Ok(text) if text.trim().is_empty() => Value::Null,
        Ok(text) => serde_json::from_str(&text).map_err(|e| IntegrationError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?,
        Err(e) => return Err(transport_error(e)),
    };

    // Shiprocket also reports failures as `"status": 0` on a 200.
    let soft_failure = body.get("status").and_then(Value::as_i64) == Some(0);
    if !status.is_success() || soft_failure {
        let status = if status.is_success() { StatusCode::UNPROCESSABLE_ENTITY } else { status };
        return Err(IntegrationError::Api {
            service: SERVICE,
            status: status.as_u16(),
            message: message_of(&body).unwrap_or("Shiprocket request failed").to_string(),
        });
    }
    Ok(body)
}

fn transport_error(e: reqwest::Error) -> IntegrationError {
    if e.is_timeout() {
        IntegrationError::Timeout { service: SERVICE }
    } else {
        IntegrationError::Transport {
            service: SERVICE,
            message: e.to_string(),
        }
    }
}

fn message_of(body: &Value) -> Option<&str> {
    body.get("message")
        .and_then(Value::as_str)
        .or_else(|| body.pointer("/errors/0/message").and_then(Value::as_str))
}

/// Ids come back as numbers or strings depending on the endpoint.
fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn decode_error(message: &str) -> IntegrationError {
    IntegrationError::Decode {
        service: SERVICE,
        message: message.to_string(),
    }
}

#[derive(Deserialize)]
struct ServiceabilityData {
    #[serde(default)]
    available: bool,
    #[serde(default, rename = "courier_availibility")]
    couriers: Vec<CourierRow>,
}

#[derive(Deserialize)]
struct CourierRow {
    courier_id: i64,
    courier_name: String,
    charges: f64,
    #[serde(default)]
    etd: Option<String>,
}

fn parse_serviceability(body: &Value) -> IntegrationResult<Serviceability> {
    let data: Option<ServiceabilityData> = body
        .get("data")
        .filter(|d| d.is_object())
        .map(|d| serde_json::from_value(d.clone()))
        .transpose()
        .map_err(|e| decode_error(&e.to_string()))?;

    match data {
        Some(data) if data.available => {
            let couriers = data
                .couriers
                .into_iter()
                .filter_map(|c| {
                    Some(CourierQuote {
                        courier_id: c.courier_id,
                        courier_name: c.courier_name,
                        charge: Decimal::from_f64(c.charges)?.round_dp(2),
                        etd: c.etd,
                    })
                })
                .collect();
            Ok(Serviceability::Available { couriers })
        }
        _ => Ok(Serviceability::Unavailable {
            reason: message_of(body).unwrap_or("Pincode not serviceable").to_string(),
        }),
    }
}

fn parse_airway_bill(body: &Value) -> IntegrationResult<AirwayBill> {
    let row = body
        .pointer("/response/data")
        .or_else(|| body.pointer("/data/awb_assign_status/0"))
        .or_else(|| body.pointer("/data/0"))
        .ok_or_else(|| decode_error("airway bill missing from response"))?;

    let awb_code = row
        .get("awb_code")
        .or_else(|| row.get("awb"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| decode_error("airway bill number missing from response"))?;
    let courier_name = row
        .get("courier_name")
        .or_else(|| row.get("courier"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(AirwayBill {
        awb_code: awb_code.to_string(),
        courier_name: courier_name.to_string(),
    })
}

#[derive(Serialize)]
struct AdhocItem<'a> {
    name: &'a str,
    sku: &'a str,
    units: u32,
    selling_price: Decimal,
}

#[derive(Serialize)]
struct AdhocOrder<'a> {
    order_id: &'a str,
    order_date: String,
    pickup_location: &'a str,
    channel_id: &'a str,
    comment: &'a str,
    billing_customer_name: String,
    billing_last_name: String,
    billing_address: &'a str,
    billing_address_2: &'a str,
    billing_city: &'a str,
    billing_pincode: &'a str,
    billing_state: &'a str,
    billing_country: &'a str,
    billing_email: &'a str,
    billing_phone: String,
    shipping_is_billing: bool,
    shipping_customer_name: String,
    shipping_last_name: String,
    shipping_address: &'a str,
    shipping_address_2: &'a str,
    shipping_city: &'a str,
    shipping_pincode: &'a str,
    shipping_state: &'a str,
    shipping_country: &'a str,
    shipping_phone: String,
    order_items: Vec<AdhocItem<'a>>,
    payment_method: &'a str,
    sub_total: Decimal,
    length: f64,
    breadth: f64,
    height: f64,
    weight: f64,
}

impl<'a> AdhocOrder<'a> {
    fn build(request: &'a ShipmentRequest, pickup_location: &'a str) -> Self {
        let d = &request.deliver_to;
        let (first_name, last_name) = d.split_name();
        let phone = d.phone_digits();
        Self {
            order_id: &request.order_code,
            order_date: request.order_date.format("%Y-%m-%d").to_string(),
            pickup_location,
            channel_id: "",
            comment: "Order from bazaar",
            billing_customer_name: first_name.clone(),
            billing_last_name: last_name.clone(),
            billing_address: &d.address_line_1,
            billing_address_2: &d.address_line_2,
            billing_city: &d.city,
            billing_pincode: &d.pincode,
            billing_state: &d.state,
            billing_country: "India",
            billing_email: d.email.expose(),
            billing_phone: phone.clone(),
            shipping_is_billing: true,
            shipping_customer_name: first_name,
            shipping_last_name: last_name,
            shipping_address: &d.address_line_1,
            shipping_address_2: &d.address_line_2,
            shipping_city: &d.city,
            shipping_pincode: &d.pincode,
            shipping_state: &d.state,
            shipping_country: "India",
            shipping_phone: phone,
            order_items: request
                .items
                .iter()
                .map(|item| AdhocItem {
                    name: &item.name,
                    sku: &item.sku,
                    units: item.units,
                    selling_price: item.selling_price.round(),
                })
                .collect(),
            payment_method: match request.payment {
                ShipmentPayment::Cod => "cod",
                ShipmentPayment::Prepaid => "prepaid",
            },
            sub_total: request.sub_total,
            length: request.package.length_cm,
            breadth: request.package.breadth_cm,
            height: request.package.height_cm,
            weight: request.package.weight_kg.max(MIN_WEIGHT_KG),
        }
    }
}

#[async_trait]
impl CarrierClient for ShiprocketClient {
    fn is_configured(&self) -> bool {
        self.credentials.is_some() && self.pickup_postcode.is_some()
    }

    async fn check_serviceability(
        &self,
        delivery_postcode: &str,
        weight_kg: f64,
        cod: bool,
    ) -> IntegrationResult<Serviceability> {
        let pickup = self
            .pickup_postcode
            .as_deref()
            .ok_or(IntegrationError::Unconfigured(SERVICE))?;

        let weight = weight_kg.max(MIN_WEIGHT_KG).to_string();
        let request = self.client.get(self.url("courier/serviceability/")).query(&[
            ("pickup_postcode", pickup),
            ("delivery_postcode", delivery_postcode.trim()),
            ("weight", weight.as_str()),
            ("cod", if cod { "1" } else { "0" }),
            ("mode", "Surface"),
        ]);

        match self.call(request).await {
            Ok(body) => parse_serviceability(&body),
            // Unserviceable pincodes come back as soft failures.
            Err(IntegrationError::Api { status, message, .. }) if status == 404 || status == 422 => {
                Ok(Serviceability::Unavailable { reason: message })
            }
            Err(e) => Err(e),
        }
    }

    async fn create_shipment(&self, request: &ShipmentRequest) -> IntegrationResult<CreatedShipment> {
        if !self.is_configured() {
            return Err(IntegrationError::Unconfigured(SERVICE));
        }
        let payload = AdhocOrder::build(request, &self.pickup_location);
        let body = self
            .call(self.client.post(self.url("orders/create/adhoc")).json(&payload))
            .await?;

        let courier_order_id = id_string(body.get("order_id"))
            .ok_or_else(|| decode_error("order_id missing from response"))?;
        let shipment_id = id_string(body.get("shipment_id"))
            .ok_or_else(|| decode_error("shipment_id missing from response"))?;

        tracing::info!(
            order_code = %request.order_code,
            shipment_id = %shipment_id,
            "Shiprocket order created"
        );
        Ok(CreatedShipment {
            courier_order_id,
            shipment_id,
        })
    }

    async fn assign_awb(
        &self,
        shipment_id: &str,
        courier_id: Option<i64>,
    ) -> IntegrationResult<AirwayBill> {
        let mut payload = serde_json::json!({ "shipment_id": [shipment_id] });
        if let Some(courier_id) = courier_id {
            payload["courier_id"] = Value::from(courier_id);
        }
        let body = self
            .call(self.client.post(self.url("courier/assign/awb")).json(&payload))
            .await?;
        if body.get("awb_assign_status").and_then(Value::as_i64) == Some(0) {
            return Err(IntegrationError::Api {
                service: SERVICE,
                status: 422,
                message: message_of(&body)
                    .or_else(|| body.pointer("/response/data/awb_assign_error").and_then(Value::as_str))
                    .unwrap_or("AWB assignment failed")
                    .to_string(),
            });
        }
        parse_airway_bill(&body)
    }

    async fn generate_pickup(&self, shipment_ids: &[String]) -> IntegrationResult<Value> {
        let payload = serde_json::json!({ "shipment_id": shipment_ids });
        self.call(self.client.post(self.url("courier/generate/pickup")).json(&payload))
            .await
    }

    async fn generate_label(&self, shipment_ids: &[String]) -> IntegrationResult<String> {
        let payload = serde_json::json!({ "shipment_id": shipment_ids });
        let body = self
            .call(self.client.post(self.url("courier/generate/label")).json(&payload))
            .await?;
        body.get("label_url")
            .or_else(|| body.pointer("/data/label_url"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| decode_error("label_url missing from response"))
    }

    async fn track_awb(&self, awb_code: &str) -> IntegrationResult<Value> {
        let path = format!("courier/track/awb/{}", awb_code.trim());
        self.call(self.client.get(self.url(&path))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_catalog::Package;
    use bazaar_core::shipping::ShipmentItem;
    use bazaar_core::DeliverTo;
    use bazaar_shared::Masked;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> CarrierConfig {
        CarrierConfig {
            base_url: base_url.to_string(),
            email: "ops@example.com".to_string(),
            password: "hunter2".to_string(),
            pickup_postcode: "110001".to_string(),
            pickup_location: "Warehouse".to_string(),
            token_validity_hours: 216,
            request_timeout_seconds: 5,
        }
    }

    async fn mount_login(server: &MockServer, expected_logins: u64) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "sr-token" })))
            .expect(expected_logins)
            .mount(server)
            .await;
    }

    fn request() -> ShipmentRequest {
        ShipmentRequest {
            order_code: "ORD-1700000000000".to_string(),
            order_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            deliver_to: DeliverTo {
                full_name: "Ravi Kumar Singh".to_string(),
                address_line_1: "221 Park Street".to_string(),
                address_line_2: String::new(),
                city: "Kolkata".to_string(),
                state: "West Bengal".to_string(),
                pincode: "700016".to_string(),
                phone: Masked("+91 98300 12345".to_string()),
                email: Masked("ravi@example.com".to_string()),
                landmark: String::new(),
            },
            items: vec![ShipmentItem {
                name: "Terracotta Lamp".to_string(),
                sku: "lamp-01".to_string(),
                units: 2,
                selling_price: dec!(349.60),
            }],
            payment: ShipmentPayment::Cod,
            sub_total: dec!(699.20),
            package: Package {
                weight_kg: 0.3,
                length_cm: 10.0,
                breadth_cm: 12.0,
                height_cm: 15.0,
            },
        }
    }

    #[tokio::test]
    async fn test_serviceability_lists_couriers_and_reuses_token() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/courier/serviceability/"))
            .and(query_param("pickup_postcode", "110001"))
            .and(query_param("delivery_postcode", "560001"))
            .and(query_param("cod", "1"))
            .and(query_param("mode", "Surface"))
            .and(header("authorization", "Bearer sr-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 200,
                "data": {
                    "available": true,
                    "courier_availibility": [
                        { "courier_id": 10, "courier_name": "Delhivery", "charges": 92.5, "etd": "Mar 18" },
                        { "courier_id": 12, "courier_name": "Ekart", "charges": 71.0, "etd": "Mar 19" }
                    ]
                }
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = ShiprocketClient::new(&config(&server.uri())).unwrap();
        let first = client.check_serviceability("560001", 0.2, true).await.unwrap();
        client.check_serviceability("560001", 0.2, true).await.unwrap();

        let cheapest = first.cheapest().unwrap();
        assert_eq!(cheapest.courier_id, 12);
        assert_eq!(cheapest.charge, dec!(71));
    }

    #[tokio::test]
    async fn test_soft_failure_is_unserviceable() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/courier/serviceability/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 0,
                "message": "Delivery postcode not serviceable"
            })))
            .mount(&server)
            .await;

        let client = ShiprocketClient::new(&config(&server.uri())).unwrap();
        let result = client.check_serviceability("999999", 1.0, false).await.unwrap();

        assert_eq!(
            result,
            Serviceability::Unavailable {
                reason: "Delivery postcode not serviceable".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_create_shipment_sends_adhoc_payload() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/orders/create/adhoc"))
            .and(body_partial_json(json!({
                "order_id": "ORD-1700000000000",
                "order_date": "2026-03-14",
                "pickup_location": "Warehouse",
                "billing_customer_name": "Ravi",
                "billing_last_name": "Kumar Singh",
                "billing_phone": "9830012345",
                "billing_country": "India",
                "payment_method": "cod",
                "weight": 0.5,
                "breadth": 12.0,
                "order_items": [{ "sku": "lamp-01", "units": 2, "selling_price": 350.0 }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "order_id": 381991,
                "shipment_id": 377452,
                "status": "NEW"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ShiprocketClient::new(&config(&server.uri())).unwrap();
        let created = client.create_shipment(&request()).await.unwrap();

        assert_eq!(created.courier_order_id, "381991");
        assert_eq!(created.shipment_id, "377452");
    }

    #[tokio::test]
    async fn test_assign_awb_reads_response_row() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/courier/assign/awb"))
            .and(body_partial_json(json!({ "shipment_id": ["377452"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "awb_assign_status": 1,
                "response": { "data": { "awb_code": "1900000001", "courier_name": "Xpressbees" } }
            })))
            .mount(&server)
            .await;

        let client = ShiprocketClient::new(&config(&server.uri())).unwrap();
        let awb = client.assign_awb("377452", None).await.unwrap();

        assert_eq!(awb.awb_code, "1900000001");
        assert_eq!(awb.courier_name, "Xpressbees");
    }

    #[test]
    fn test_airway_bill_fallback_shapes() {
        let nested = json!({ "data": { "awb_assign_status": [{ "awb": "A1", "courier": "Bluedart" }] } });
        let listed = json!({ "data": [{ "awb_code": "A2", "courier_name": "DTDC" }] });

        assert_eq!(parse_airway_bill(&nested).unwrap().awb_code, "A1");
        assert_eq!(parse_airway_bill(&listed).unwrap().courier_name, "DTDC");
        assert!(matches!(
            parse_airway_bill(&json!({ "data": {} })),
            Err(IntegrationError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_drops_cached_token() {
        let server = MockServer::start().await;
        mount_login(&server, 2).await;
        Mock::given(method("GET"))
            .and(path("/courier/track/awb/1900000001"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Token expired" })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/courier/track/awb/1900000001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tracking_data": { "shipment_status": 6 }
            })))
            .mount(&server)
            .await;

        let client = ShiprocketClient::new(&config(&server.uri())).unwrap();
        let first = client.track_awb("1900000001").await;
        assert!(matches!(first, Err(IntegrationError::Api { status: 401, .. })));

        let tracking = client.track_awb("1900000001").await.unwrap();
        assert_eq!(tracking["tracking_data"]["shipment_status"], 6);
    }

    #[tokio::test]
    async fn test_label_url_and_timeouts() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/courier/generate/label"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "label_created": 1,
                "label_url": "https://cdn.example.com/label.pdf"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/courier/generate/pickup"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "pickup_status": 1 }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let mut cfg = config(&server.uri());
        cfg.request_timeout_seconds = 1;
        let client = ShiprocketClient::new(&cfg).unwrap();

        let label = client.generate_label(&["377452".to_string()]).await.unwrap();
        assert_eq!(label, "https://cdn.example.com/label.pdf");

        let pickup = client.generate_pickup(&["377452".to_string()]).await;
        assert!(matches!(pickup, Err(IntegrationError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_missing_credentials_are_unconfigured() {
        let mut cfg = config("http://127.0.0.1:9");
        cfg.password = String::new();
        let client = ShiprocketClient::new(&cfg).unwrap();

        assert!(!client.is_configured());
        let result = client.track_awb("1900000001").await;
        assert!(matches!(result, Err(IntegrationError::Unconfigured(_))));
    }
}
