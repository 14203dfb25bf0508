//! Money value object: integer minor units plus an ISO 4217 currency code.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// ISO 4217 currency code, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parses a three-letter currency code, case-insensitively.
    pub fn new(code: impl AsRef<str>) -> Result<Self, ValidationError> {
        let code = code.as_ref().trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                format!("'{}' is not a three-letter ISO 4217 code", code),
            ));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of decimal places the gateway expects for this currency.
    pub fn minor_unit_exponent(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" | "HUF" | "TWD" | "CLP" | "VND" => 0,
            _ => 2,
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::new(value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An amount of money in the currency's minor units (e.g. cents).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount_minor: i64,
    currency: Currency,
}

impl Money {
    pub fn new(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    /// Creates a strictly positive amount, as required for anything charged.
    pub fn positive(amount_minor: i64, currency: Currency) -> Result<Self, ValidationError> {
        if amount_minor <= 0 {
            return Err(ValidationError::not_positive("amount", amount_minor));
        }
        Ok(Self::new(amount_minor, currency))
    }

    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Renders the amount as the decimal string payment gateways expect ("150.00").
    pub fn to_decimal_string(&self) -> String {
        let exponent = self.currency.minor_unit_exponent();
        if exponent == 0 {
            return self.amount_minor.to_string();
        }
        let divisor = 10_i64.pow(exponent);
        let sign = if self.amount_minor < 0 { "-" } else { "" };
        let abs = self.amount_minor.unsigned_abs();
        let divisor = divisor as u64;
        format!(
            "{}{}.{:0width$}",
            sign,
            abs / divisor,
            abs % divisor,
            width = exponent as usize
        )
    }

    /// Parses a gateway decimal string ("150.5", "150.00") into minor units.
    pub fn from_decimal_str(value: &str, currency: Currency) -> Result<Self, ValidationError> {
        let exponent = currency.minor_unit_exponent() as usize;
        let invalid = || ValidationError::invalid_format("amount", format!("'{}' is not a decimal amount", value));

        let trimmed = value.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty()
            || fraction.len() > exponent
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let padded = format!("{:0<width$}", fraction, width = exponent);
        let fraction: i64 = if padded.is_empty() {
            0
        } else {
            padded.parse().map_err(|_| invalid())?
        };
        let minor = whole
            .checked_mul(10_i64.pow(exponent as u32))
            .and_then(|w| w.checked_add(fraction))
            .ok_or_else(invalid)?;

        Ok(Self::new(if negative { -minor } else { minor }, currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_decimal_string(), self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd() -> Currency {
        Currency::new("usd").unwrap()
    }

    #[test]
    fn currency_is_normalized_to_upper_case() {
        assert_eq!(usd().as_str(), "USD");
    }

    #[test]
    fn currency_rejects_bad_codes() {
        assert!(Currency::new("US").is_err());
        assert!(Currency::new("US1").is_err());
        assert!(Currency::new("").is_err());
    }

    #[test]
    fn positive_rejects_zero_and_negative() {
        assert!(Money::positive(0, usd()).is_err());
        assert!(Money::positive(-100, usd()).is_err());
        assert!(Money::positive(1, usd()).is_ok());
    }

    #[test]
    fn decimal_string_pads_minor_units() {
        assert_eq!(Money::new(15000, usd()).to_decimal_string(), "150.00");
        assert_eq!(Money::new(5, usd()).to_decimal_string(), "0.05");
        assert_eq!(Money::new(-250, usd()).to_decimal_string(), "-2.50");
    }

    #[test]
    fn zero_decimal_currencies_have_no_fraction() {
        let jpy = Currency::new("JPY").unwrap();
        assert_eq!(Money::new(5000, jpy).to_decimal_string(), "5000");
    }

    #[test]
    fn parses_gateway_decimal_strings() {
        assert_eq!(Money::from_decimal_str("150.5", usd()).unwrap().amount_minor(), 15050);
        assert_eq!(Money::from_decimal_str("150", usd()).unwrap().amount_minor(), 15000);
        assert_eq!(Money::from_decimal_str("0.07", usd()).unwrap().amount_minor(), 7);
    }

    #[test]
    fn rejects_malformed_decimal_strings() {
        assert!(Money::from_decimal_str("1.234", usd()).is_err());
        assert!(Money::from_decimal_str("abc", usd()).is_err());
        assert!(Money::from_decimal_str(".50", usd()).is_err());
    }
}
