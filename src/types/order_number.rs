use serde::{Deserialize, Serialize};
use std::fmt;
use crate::error::{Error, Result};

/// A purchase-order number that passed the Luhn checksum.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn parse(value: &str) -> Result<Self> {
        if !luhn_valid(value) {
            return Err(Error::InvalidOrderNumber(value.to_string()));
        }
        Ok(OrderNumber(value.to_string()))
    }

    /// Rebuilds a number read back from storage, where it was validated on insert.
    pub(crate) fn from_stored(value: String) -> Self {
        OrderNumber(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        OrderNumber::parse(&value)
    }
}

impl From<OrderNumber> for String {
    fn from(value: OrderNumber) -> String {
        value.0
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Luhn checksum: double every second digit from the right, fold doubled
/// digits above 9 back into one digit, and require a total divisible by 10.
/// Empty input and any non-ASCII-digit character are rejected.
pub fn luhn_valid(number: &str) -> bool {
    if number.is_empty() {
        return false;
    }

    let mut sum = 0u32;
    for (i, c) in number.chars().rev().enumerate() {
        let Some(mut digit) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }

    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Left-to-right parity formulation, independent of `luhn_valid`.
    fn reference_luhn(number: &str) -> bool {
        let bytes = number.as_bytes();
        if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
            return false;
        }
        let parity = bytes.len() % 2;
        let total: u32 = bytes
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let d = (b - b'0') as u32;
                if i % 2 == parity {
                    let doubled = d * 2;
                    if doubled > 9 { doubled - 9 } else { doubled }
                } else {
                    d
                }
            })
            .sum();
        total % 10 == 0
    }

    #[test]
    fn known_numbers() {
        assert!(luhn_valid("12345678903"));
        assert!(!luhn_valid("12345678902"));
        assert!(luhn_valid("79927398713"));
        assert!(luhn_valid("0"));
        assert!(!luhn_valid(""));
        assert!(!luhn_valid("1234567890a"));
        assert!(!luhn_valid(" 12345678903"));
        assert!(!luhn_valid("١٢٣"));
    }

    #[test]
    fn parse_rejects_invalid_checksum() {
        let err = OrderNumber::parse("12345678902").unwrap_err();
        assert!(matches!(err, Error::InvalidOrderNumber(ref n) if n == "12345678902"));
    }

    #[test]
    fn deserializes_with_validation() {
        let ok: OrderNumber = serde_json::from_str("\"12345678903\"").unwrap();
        assert_eq!(ok.as_str(), "12345678903");
        assert!(serde_json::from_str::<OrderNumber>("\"12345678902\"").is_err());
    }

    proptest! {
        #[test]
        fn agrees_with_reference_on_digit_strings(number in "[0-9]{0,24}") {
            prop_assert_eq!(luhn_valid(&number), reference_luhn(&number));
        }

        #[test]
        fn rejects_any_non_digit(prefix in "[0-9]{0,8}", bad in "[^0-9]", suffix in "[0-9]{0,8}") {
            let number = format!("{}{}{}", prefix, bad, suffix);
            prop_assert!(!luhn_valid(&number));
        }

        #[test]
        fn exactly_one_check_digit_is_valid(payload in "[0-9]{1,18}") {
            let valid = (0..10)
                .filter(|d| luhn_valid(&format!("{}{}", payload, d)))
                .count();
            prop_assert_eq!(valid, 1);
        }
    }
}
