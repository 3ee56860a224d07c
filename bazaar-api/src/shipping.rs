use axum::{
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Router,
};
use bazaar_catalog::{weight::MIN_PACKAGE_WEIGHT_KG, LineRequest};
use serde::{de, Deserialize, Deserializer};
use uuid::Uuid;

use crate::envelope::{ok, ApiJson, ApiQuery};
use crate::error::AppError;
use crate::middleware::{customer_auth_middleware, Claims};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub address_id: Uuid,
    #[serde(default)]
    pub items: Vec<LineRequest>,
    #[serde(default)]
    pub cod: bool,
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub pincode: Option<String>,
    /// Kilograms.
    pub weight: Option<f64>,
    /// `1`/`0` or `true`/`false`; cash on delivery when absent.
    #[serde(default = "cod_when_absent", deserialize_with = "cod_flag")]
    pub cod: bool,
}

fn cod_when_absent() -> bool {
    true
}

fn cod_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(de::Error::custom(format!("cod must be 1, 0, true or false, got `{}`", other))),
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    let customer = Router::new()
        .route("/v1/shipping/quote", post(quote))
        .route_layer(middleware::from_fn_with_state(state, customer_auth_middleware));

    Router::new()
        .route("/v1/shipping/check", get(check))
        .route("/v1/shipping/track/{key}", get(track))
        .merge(customer)
}

/// POST /v1/shipping/quote
async fn quote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<QuoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let priced = state
        .placement
        .price_checkout(&claims.sub, req.address_id, &req.items, req.cod)
        .await?;

    Ok(ok("Shipping charge calculated", priced.quote))
}

/// GET /v1/shipping/check?pincode=&weight=&cod=
async fn check(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CheckQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pincode = query.pincode.unwrap_or_default();
    let weight = query
        .weight
        .filter(|kg| kg.is_finite() && *kg > 0.0)
        .unwrap_or(MIN_PACKAGE_WEIGHT_KG);

    let serviceability = state.shipping.check(&pincode, weight, query.cod).await?;
    Ok(ok("Serviceability checked", serviceability))
}

/// GET /v1/shipping/track/{awbOrOrderCode}
async fn track(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let report = state.dispatcher.track(&key).await?;
    Ok(ok("Tracking fetched", report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;

    fn parse(uri: &'static str) -> Result<CheckQuery, String> {
        Query::<CheckQuery>::try_from_uri(&Uri::from_static(uri))
            .map(|Query(q)| q)
            .map_err(|e| e.body_text())
    }

    #[test]
    fn test_cod_flag_accepts_numeric_and_boolean_forms() {
        assert!(parse("/v1/shipping/check?pincode=110001&cod=1").unwrap().cod);
        assert!(parse("/v1/shipping/check?pincode=110001&cod=true").unwrap().cod);
        assert!(!parse("/v1/shipping/check?pincode=110001&cod=0").unwrap().cod);
        assert!(!parse("/v1/shipping/check?pincode=110001&cod=false").unwrap().cod);
    }

    #[test]
    fn test_cod_defaults_to_cash_on_delivery() {
        let query = parse("/v1/shipping/check?pincode=110001&weight=0.5").unwrap();
        assert!(query.cod);
        assert_eq!(query.weight, Some(0.5));
    }

    #[test]
    fn test_unknown_cod_value_is_rejected() {
        let err = parse("/v1/shipping/check?pincode=110001&cod=yes").unwrap_err();
        assert!(err.contains("cod must be"));
    }
}
