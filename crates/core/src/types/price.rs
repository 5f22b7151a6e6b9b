//! Prices using decimal arithmetic.

use core::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Exclusive upper bound on stored amounts (`NUMERIC(12, 2)`).
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

    /// Whether `amount` fits a money column once rounded to cents the way
    /// Postgres rounds.
    #[must_use]
    pub fn is_storable(amount: Decimal) -> bool {
        !amount.is_sign_negative()
            && amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
                < Self::MAX_AMOUNT
    }

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Parse a scraped price string like `"$1,299.00"` or `"19.99"`.
    ///
    /// Currency symbols, thousands separators, and whitespace are ignored.
    /// Returns `None` when no number can be recovered.
    #[must_use]
    pub fn parse_amount(raw: &str) -> Option<Decimal> {
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        Decimal::from_str(&cleaned).ok()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.currency_code.symbol();
        if self.currency_code.minor_units() == 0 {
            write!(f, "{symbol}{}", self.amount.round())
        } else {
            write!(f, "{symbol}{:.2}", self.amount)
        }
    }
}

/// ISO 4217 currency codes accepted for catalog prices and commissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    JPY,
    INR,
}

impl CurrencyCode {
    /// Display symbol used when formatting prices.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD => "$",
            Self::CAD => "CA$",
            Self::AUD => "A$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::JPY => "¥",
            Self::INR => "₹",
        }
    }

    /// Number of digits after the decimal point.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Self::JPY => 0,
            _ => 2,
        }
    }

    /// The three-letter code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::JPY => "JPY",
            Self::INR => "INR",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" | "$" => Ok(Self::USD),
            "EUR" | "€" => Ok(Self::EUR),
            "GBP" | "£" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "JPY" | "¥" => Ok(Self::JPY),
            "INR" | "₹" => Ok(Self::INR),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_symbol_and_minor_units() {
        let usd = Price::new(Decimal::new(1999, 2), CurrencyCode::USD);
        assert_eq!(usd.to_string(), "$19.99");

        let yen = Price::new(Decimal::new(1200, 0), CurrencyCode::JPY);
        assert_eq!(yen.to_string(), "¥1200");
    }

    #[test]
    fn storable_amounts_fit_numeric_12_2() {
        assert_eq!(Price::MAX_AMOUNT, Decimal::from(10_000_000_000_i64));
        assert!(Price::is_storable(Decimal::ZERO));
        assert!(Price::is_storable(Decimal::new(999_999_999_999, 2)));
        assert!(!Price::is_storable(Decimal::new(9_999_999_999_995, 3)));
        assert!(!Price::is_storable(Decimal::from(10_000_000_000_i64)));
        assert!(!Price::is_storable(Decimal::new(-1, 2)));
    }

    #[test]
    fn parse_amount_strips_symbols_and_separators() {
        assert_eq!(Price::parse_amount("$1,299.00"), Some(Decimal::new(129_900, 2)));
        assert_eq!(Price::parse_amount(" 19.99 USD"), Some(Decimal::new(1999, 2)));
        assert_eq!(Price::parse_amount("free"), None);
    }

    #[test]
    fn currency_codes_parse_case_insensitively() {
        assert_eq!("eur".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
        assert_eq!("£".parse::<CurrencyCode>().unwrap(), CurrencyCode::GBP);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
