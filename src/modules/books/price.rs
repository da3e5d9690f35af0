use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Non-negative amount with two fractional digits, held as whole cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price {
    cents: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriceError {
    #[error("price is empty")]
    Empty,
    #[error("price must not be negative")]
    Negative,
    #[error("price '{0}' is not a decimal number")]
    Malformed(String),
    #[error("price '{0}' has more than two fractional digits")]
    TooPrecise(String),
    #[error("price '{0}' is out of range")]
    Overflow(String),
}

impl Price {
    pub const fn from_cents(cents: i64) -> Option<Self> {
        if cents < 0 {
            None
        } else {
            Some(Self { cents })
        }
    }

    pub const fn cents(self) -> i64 {
        self.cents
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PriceError::Empty);
        }
        if s.starts_with('-') {
            return Err(PriceError::Negative);
        }

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(frac) {
            return Err(PriceError::Malformed(s.to_string()));
        }
        if frac.len() > 2 {
            return Err(PriceError::TooPrecise(s.to_string()));
        }

        let overflow = || PriceError::Overflow(s.to_string());
        let whole: i64 = whole.parse().map_err(|_| overflow())?;
        // "5" -> 50 cents, "05" -> 5 cents
        let frac: i64 = format!("{frac:0<2}").parse().map_err(|_| overflow())?;

        whole
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(frac))
            .map(|cents| Self { cents })
            .ok_or_else(overflow)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PriceVisitor)
    }
}

struct PriceVisitor;

impl Visitor<'_> for PriceVisitor {
    type Value = Price;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount such as \"12.99\" or 12.99")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Price, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Price, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Price, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Price, E> {
        // Display for f64 is the shortest round-tripping form, so 12.99 stays "12.99".
        self.visit_str(&v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("12.99".parse::<Price>().unwrap().cents(), 1299);
        assert_eq!("12.9".parse::<Price>().unwrap().cents(), 1290);
        assert_eq!("12.05".parse::<Price>().unwrap().cents(), 1205);
        assert_eq!("7".parse::<Price>().unwrap().cents(), 700);
        assert_eq!(" 0.50 ".parse::<Price>().unwrap().cents(), 50);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("".parse::<Price>(), Err(PriceError::Empty));
        assert_eq!("-1.00".parse::<Price>(), Err(PriceError::Negative));
        assert!(matches!("12,99".parse::<Price>(), Err(PriceError::Malformed(_))));
        assert!(matches!(".99".parse::<Price>(), Err(PriceError::Malformed(_))));
        assert!(matches!("1.999".parse::<Price>(), Err(PriceError::TooPrecise(_))));
        assert!(matches!(
            "99999999999999999999".parse::<Price>(),
            Err(PriceError::Overflow(_))
        ));
    }

    #[test]
    fn displays_two_fractional_digits() {
        assert_eq!(Price::from_cents(1205).unwrap().to_string(), "12.05");
        assert_eq!(Price::from_cents(5).unwrap().to_string(), "0.05");
        assert!(Price::from_cents(-1).is_none());
    }

    #[test]
    fn json_accepts_strings_and_numbers() {
        let from_str: Price = serde_json::from_str("\"19.99\"").unwrap();
        let from_float: Price = serde_json::from_str("19.99").unwrap();
        let from_int: Price = serde_json::from_str("20").unwrap();

        assert_eq!(from_str.cents(), 1999);
        assert_eq!(from_float, from_str);
        assert_eq!(from_int.cents(), 2000);
        assert_eq!(serde_json::to_string(&from_str).unwrap(), "\"19.99\"");
        assert!(serde_json::from_str::<Price>("-3").is_err());
    }
}
