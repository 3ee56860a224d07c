use axum::{extract::State, middleware, response::IntoResponse, routing::get, Extension, Router};
use bazaar_core::{AddressType, UserAddress};
use bazaar_shared::Masked;
use serde::Deserialize;
use uuid::Uuid;

use crate::envelope::{created, ok, ApiJson};
use crate::error::AppError;
use crate::middleware::{customer_auth_middleware, Claims};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateAddressRequest {
    pub address_type: Option<String>,
    pub full_name: String,
    pub mobile_number: String,
    pub email_address: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub pincode: String,
    pub city: String,
    pub state: String,
    pub landmark: String,
    pub is_default: bool,
}

impl CreateAddressRequest {
    fn into_address(self, user_id: &str) -> Result<UserAddress, AppError> {
        for (field, value) in [
            ("fullName", &self.full_name),
            ("mobileNumber", &self.mobile_number),
            ("addressLine1", &self.address_line_1),
            ("pincode", &self.pincode),
            ("city", &self.city),
            ("state", &self.state),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::ValidationError(format!("{} is required", field)));
            }
        }

        let pincode = self.pincode.trim().to_string();
        if pincode.len() != 6 || !pincode.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::ValidationError("pincode must be 6 digits".to_string()));
        }

        let address_type = match self.address_type.as_deref() {
            None => AddressType::Home,
            Some(raw) => AddressType::parse(raw)
                .ok_or_else(|| AppError::ValidationError(format!("Invalid address type: {}", raw)))?,
        };

        Ok(UserAddress {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            address_type,
            full_name: self.full_name.trim().to_string(),
            mobile_number: Masked(self.mobile_number.trim().to_string()),
            email_address: Masked(self.email_address.trim().to_string()),
            address_line_1: self.address_line_1,
            address_line_2: self.address_line_2,
            pincode,
            city: self.city,
            state: self.state,
            landmark: self.landmark,
            is_default: self.is_default,
        })
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/addresses", get(list_addresses).post(create_address))
        .route_layer(middleware::from_fn_with_state(state, customer_auth_middleware))
}

/// POST /v1/addresses
async fn create_address(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateAddressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let address = req.into_address(&claims.sub)?;
    state
        .addresses
        .create_address(&address)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    tracing::info!(address_id = %address.id, phone = %address.mobile_number.hint(), "Address saved");
    Ok(created("Address saved", address))
}

/// GET /v1/addresses
async fn list_addresses(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let addresses = state
        .addresses
        .list_addresses(&claims.sub)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(ok("Addresses fetched", addresses))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateAddressRequest {
        CreateAddressRequest {
            full_name: "Asha Verma".into(),
            mobile_number: "9876543210".into(),
            address_line_1: "12 MG Road".into(),
            pincode: " 560001 ".into(),
            city: "Bengaluru".into(),
            state: "Karnataka".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_request_builds_address() {
        let address = request().into_address("user-1").unwrap();
        assert_eq!(address.pincode, "560001");
        assert_eq!(address.address_type, AddressType::Home);
        assert_eq!(address.user_id, "user-1");
    }

    #[test]
    fn test_rejects_missing_fields_and_bad_pincode() {
        let missing = CreateAddressRequest { city: " ".into(), ..request() };
        assert!(matches!(missing.into_address("u"), Err(AppError::ValidationError(m)) if m == "city is required"));

        let bad_pin = CreateAddressRequest { pincode: "56001".into(), ..request() };
        assert!(bad_pin.into_address("u").is_err());

        let bad_type = CreateAddressRequest { address_type: Some("Castle".into()), ..request() };
        assert!(bad_type.into_address("u").is_err());
    }
}
