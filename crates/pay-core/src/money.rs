//! # Money Types
//!
//! Amounts are kept in minor units (kopecks, cents) so they stay exact.
//! On the wire the payment service speaks decimal major units, either as a
//! JSON number (requests) or as a string like `"299.00"` (responses).

use crate::error::{PaymentError, PaymentResult};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Minor units per major unit for every supported currency.
const MINOR_PER_MAJOR: i64 = 100;

/// Currency reported by the payment service (ISO 4217)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Currency {
    #[default]
    RUB,
    USD,
    EUR,
    /// Any code the client does not know about, kept as reported
    Other(String),
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &str {
        match self {
            Currency::RUB => "RUB",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::Other(code) => code.as_str(),
        }
    }

    /// Display symbol, falling back to the ISO code
    pub fn symbol(&self) -> &str {
        match self {
            Currency::RUB => "₽",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::Other(code) => code.as_str(),
        }
    }

    /// Parse a currency code, case-insensitively
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "RUB" => Currency::RUB,
            "USD" => Currency::USD,
            "EUR" => Currency::EUR,
            other => Currency::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Currency::from_code(&code))
    }
}

/// Monetary amount in minor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    minor: i64,
}

impl Amount {
    /// Create from minor units (kopecks)
    pub fn from_minor(minor: i64) -> Self {
        Self { minor }
    }

    /// Create from whole major units (rubles)
    pub fn from_major(major: i64) -> Self {
        Self {
            minor: major.saturating_mul(MINOR_PER_MAJOR),
        }
    }

    /// Parse a decimal string such as `"299"`, `"299.5"` or `"299.00"`.
    ///
    /// More than two fractional digits are rejected rather than rounded.
    pub fn parse_decimal(input: &str) -> PaymentResult<Self> {
        let invalid = || PaymentError::InvalidRequest(format!("invalid amount: {:?}", input));

        let trimmed = input.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = match digits.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (digits, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if fraction.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let minor = whole
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|m| m.checked_add(fraction))
            .ok_or_else(invalid)?;

        Ok(Self {
            minor: if negative { -minor } else { minor },
        })
    }

    /// Amount in minor units
    pub fn minor(&self) -> i64 {
        self.minor
    }

    /// Check that the amount can be charged
    pub fn is_positive(&self) -> bool {
        self.minor > 0
    }

    /// Decimal value as a JSON number; whole amounts stay integers
    pub fn to_json_number(&self) -> serde_json::Number {
        if self.minor % MINOR_PER_MAJOR == 0 {
            serde_json::Number::from(self.minor / MINOR_PER_MAJOR)
        } else {
            serde_json::Number::from_f64(self.minor as f64 / MINOR_PER_MAJOR as f64)
                .unwrap_or_else(|| serde_json::Number::from(self.minor / MINOR_PER_MAJOR))
        }
    }

    /// Format with a currency symbol (e.g., "299.00 ₽")
    pub fn display_in(&self, currency: &Currency) -> String {
        format!("{} {}", self, currency.symbol())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let abs = self.minor.unsigned_abs();
        let per = MINOR_PER_MAJOR as u64;
        write!(f, "{}{}.{:02}", sign, abs / per, abs % per)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_number().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::parse_decimal(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount::from_major(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        i64::try_from(v)
            .map(Amount::from_major)
            .map_err(|_| E::custom("amount out of range"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        if !v.is_finite() {
            return Err(E::custom("amount is not finite"));
        }
        Ok(Amount::from_minor((v * MINOR_PER_MAJOR as f64).round() as i64))
    }
}
