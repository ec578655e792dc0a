//! Monetary values as printed in German-locale bank exports.
//!
//! ING writes numbers with `.` as the thousands separator and `,` as the decimal separator, for
//! example `-1.234,56`. This module turns those strings into exact `Decimal` values and pairs them
//! with a currency.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

const THOUSANDS_SEPARATOR: char = '.';
const DECIMAL_SEPARATOR: char = ',';

/// Parses a German-locale number such as `1.234,00` into `1234.00`.
///
/// All thousands separators are removed and the decimal comma becomes a decimal point before the
/// value is handed to `Decimal`, so the scale of the input is preserved.
///
/// # Examples
/// ```
/// # use ing_import::model::parse_number_de;
/// # use std::str::FromStr;
/// # use rust_decimal::Decimal;
/// let n = parse_number_de("1.234,00").unwrap();
/// assert_eq!(n, Decimal::from_str("1234.00").unwrap());
/// assert_eq!(n.to_string(), "1234.00");
/// ```
pub fn parse_number_de(s: &str) -> Result<Decimal, AmountError> {
    let normalized = s
        .trim()
        .replace(THOUSANDS_SEPARATOR, "")
        .replace(DECIMAL_SEPARATOR, ".");
    Decimal::from_str(&normalized).map_err(|e| AmountError {
        input: s.to_string(),
        source: e,
    })
}

/// An error that can occur when parsing German-locale strings into `Decimal` values.
pub struct AmountError {
    input: String,
    source: rust_decimal::Error,
}

impl AmountError {
    /// The string that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmountError")
            .field("input", &self.input)
            .field("source", &self.source)
            .finish()
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "unable to parse '{}' as a number: {}", self.input, self.source)
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// A number together with its currency, e.g. `-500.00 EUR`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Amount {
    number: Decimal,
    currency: String,
}

impl Amount {
    pub fn new(number: Decimal, currency: impl Into<String>) -> Self {
        Self {
            number,
            currency: currency.into(),
        }
    }

    pub fn number(&self) -> Decimal {
        self.number
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_thousands() {
        assert_eq!(parse_number_de("1.234,00").unwrap(), dec("1234.00"));
    }

    #[test]
    fn test_parse_negative() {
        assert_eq!(parse_number_de("-500,00").unwrap(), dec("-500.00"));
    }

    #[test]
    fn test_parse_many_thousands() {
        assert_eq!(parse_number_de("-1.234.567,89").unwrap(), dec("-1234567.89"));
    }

    #[test]
    fn test_parse_keeps_scale() {
        let n = parse_number_de("5.000,00").unwrap();
        assert_eq!(n.to_string(), "5000.00");
        assert_eq!(n.scale(), 2);
    }

    #[test]
    fn test_parse_is_exact() {
        let a = parse_number_de("0,10").unwrap();
        let b = parse_number_de("0,20").unwrap();
        assert_eq!(a + b, dec("0.30"));
    }

    #[test]
    fn test_parse_whitespace() {
        assert_eq!(parse_number_de("  12,5 ").unwrap(), dec("12.5"));
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_number_de("42").unwrap(), dec("42"));
    }

    #[test]
    fn test_parse_empty_is_error() {
        let e = parse_number_de("").unwrap_err();
        assert_eq!(e.input(), "");
    }

    #[test]
    fn test_parse_garbage_is_error() {
        let e = parse_number_de("12,34 EUR").unwrap_err();
        assert_eq!(e.input(), "12,34 EUR");
        assert!(e.to_string().contains("12,34 EUR"));
    }

    #[test]
    fn test_amount_display() {
        let amount = Amount::new(parse_number_de("-1.500,25").unwrap(), "EUR");
        assert_eq!(amount.to_string(), "-1500.25 EUR");
        assert_eq!(amount.currency(), "EUR");
        assert_eq!(amount.number(), dec("-1500.25"));
    }
}
