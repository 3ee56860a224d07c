use bazaar_shared::Masked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressType {
    Home,
    Office,
    Other,
}

impl AddressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::Home => "Home",
            AddressType::Office => "Office",
            AddressType::Other => "Other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Home" => Some(AddressType::Home),
            "Office" => Some(AddressType::Office),
            "Other" => Some(AddressType::Other),
            _ => None,
        }
    }
}

/// A saved delivery address belonging to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAddress {
    pub id: Uuid,
    pub user_id: String,
    pub address_type: AddressType,
    pub full_name: String,
    pub mobile_number: Masked<String>,
    pub email_address: Masked<String>,
    pub address_line_1: String,
    #[serde(default)]
    pub address_line_2: String,
    pub pincode: String,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub landmark: String,
    #[serde(default)]
    pub is_default: bool,
}

impl UserAddress {
    /// Snapshot used on an order. Later edits to the saved address never
    /// reach orders that were already placed.
    pub fn deliver_to(&self) -> DeliverTo {
        DeliverTo {
            full_name: self.full_name.clone(),
            address_line_1: self.address_line_1.clone(),
            address_line_2: self.address_line_2.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            pincode: self.pincode.trim().to_string(),
            phone: self.mobile_number.clone(),
            email: self.email_address.clone(),
            landmark: self.landmark.clone(),
        }
    }
}

/// Delivery details frozen onto an order at placement time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverTo {
    pub full_name: String,
    pub address_line_1: String,
    #[serde(default)]
    pub address_line_2: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone: Masked<String>,
    pub email: Masked<String>,
    #[serde(default)]
    pub landmark: String,
}

impl DeliverTo {
    /// First word as the first name, the rest as the last name.
    pub fn split_name(&self) -> (String, String) {
        let trimmed = self.full_name.trim();
        let mut parts = trimmed.split_whitespace();
        let first = parts.next().unwrap_or("Customer").to_string();
        let last = parts.collect::<Vec<_>>().join(" ");
        (first, last)
    }

    /// Last ten digits of the phone number, as couriers expect.
    pub fn phone_digits(&self) -> String {
        let digits: Vec<char> = self.phone.expose().chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return "0000000000".to_string();
        }
        let start = digits.len().saturating_sub(10);
        digits[start..].iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> UserAddress {
        UserAddress {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            address_type: AddressType::Home,
            full_name: "  Asha Rani Verma ".to_string(),
            mobile_number: Masked("+91 98765-43210".to_string()),
            email_address: Masked("asha@example.com".to_string()),
            address_line_1: "12 MG Road".to_string(),
            address_line_2: String::new(),
            pincode: " 560001 ".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            landmark: String::new(),
            is_default: true,
        }
    }

    #[test]
    fn test_deliver_to_snapshot() {
        let deliver_to = address().deliver_to();
        assert_eq!(deliver_to.pincode, "560001");
        assert_eq!(deliver_to.split_name(), ("Asha".to_string(), "Rani Verma".to_string()));
        assert_eq!(deliver_to.phone_digits(), "9876543210");
    }

    #[test]
    fn test_address_type_round_trip() {
        assert_eq!(AddressType::parse("Office"), Some(AddressType::Office));
        assert_eq!(AddressType::parse("office"), None);
    }
}
