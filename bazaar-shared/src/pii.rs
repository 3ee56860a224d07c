use serde::{Serialize, Deserialize, Serializer};
use std::fmt;

/// A wrapper for customer contact data (phone numbers, emails) that masks its
/// value in Debug and Display output.
///
/// Serialization passes the real value through: API responses need it, log
/// macros must not see it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T: AsRef<str>> Masked<T> {
    /// Last four characters only, e.g. `******3210` for a phone number.
    pub fn hint(&self) -> String {
        let value = self.0.as_ref();
        let count = value.chars().count();
        if count <= 4 {
            return "****".to_string();
        }
        let tail: String = value.chars().skip(count - 4).collect();
        format!("******{}", tail)
    }
}

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Masked(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_masked() {
        let phone = Masked("9876543210".to_string());
        assert_eq!(format!("{:?}", phone), "********");
        assert_eq!(phone.hint(), "******3210");
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"9876543210\"");
    }

    #[test]
    fn test_short_values_fully_hidden() {
        assert_eq!(Masked("12".to_string()).hint(), "****");
    }
}
