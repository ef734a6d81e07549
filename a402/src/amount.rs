//! Human price to minor unit conversion.
//!
//! Prices are written the way a merchant thinks about them (`"0.05"`,
//! `"$1.00"`) and travel on the wire as an integer count of the asset's
//! smallest unit. Every supported asset is a 6-decimal USDC deployment, so one
//! scale factor covers them all.
//!
//! Conversion multiplies by [`SCALE`] and truncates toward zero:
//!
//! ```
//! use a402::amount::to_minor_units;
//!
//! assert_eq!(to_minor_units("0.05").unwrap().inner(), 50_000);
//! assert_eq!(to_minor_units("$1.00").unwrap().inner(), 1_000_000);
//! assert_eq!(to_minor_units("0.0000019").unwrap().inner(), 1);
//! ```

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::proto::MinorUnits;

/// Minor units per whole unit of every supported asset.
pub const SCALE: u64 = 1_000_000;

/// Accepted price syntax: optional `$`, optional sign, digits with optional
/// thousands separators, optional fraction.
static PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$?\s*(?P<num>[+-]?(?:\d{1,3}(?:,\d{3})+|\d+)?(?:\.\d+)?)$")
        .expect("valid price regex")
});

/// Errors from price conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The price is not a non-negative decimal, or is too large to represent.
    #[error("invalid price {0:?}: expected a non-negative decimal")]
    InvalidPrice(String),
}

/// Parses a human price into a decimal, rejecting negatives.
///
/// # Errors
///
/// Returns [`AmountError::InvalidPrice`] for anything that is not a
/// non-negative decimal.
pub fn parse_price(price: &str) -> Result<Decimal, AmountError> {
    let invalid = || AmountError::InvalidPrice(price.to_owned());
    let trimmed = price.trim();
    let number = PRICE
        .captures(trimmed)
        .and_then(|caps| caps.name("num"))
        .map(|m| normalize(m.as_str()))
        .filter(|num| num.chars().any(|c| c.is_ascii_digit()))
        .ok_or_else(invalid)?;
    let value = Decimal::from_str(&number).map_err(|_| invalid())?;
    if value < Decimal::ZERO {
        return Err(invalid());
    }
    Ok(value)
}

/// Drops separators and a `+` sign, and gives a bare fraction a leading zero.
fn normalize(num: &str) -> String {
    let digits = num.replace(',', "");
    let (sign, body) = match digits.strip_prefix(['+', '-']) {
        Some(body) if digits.starts_with('-') => ("-", body),
        Some(body) => ("", body),
        None => ("", digits.as_str()),
    };
    if body.starts_with('.') {
        format!("{sign}0{body}")
    } else {
        format!("{sign}{body}")
    }
}

/// Converts a human price into minor units, truncating toward zero.
///
/// # Errors
///
/// Returns [`AmountError::InvalidPrice`] for negative or non-numeric input,
/// or when the result does not fit in a `u64`.
pub fn to_minor_units(price: &str) -> Result<MinorUnits, AmountError> {
    let value = parse_price(price)?;
    value
        .checked_mul(Decimal::from(SCALE))
        .map(|scaled| scaled.trunc())
        .and_then(|scaled| scaled.to_u64())
        .map(MinorUnits::from)
        .ok_or_else(|| AmountError::InvalidPrice(price.to_owned()))
}
