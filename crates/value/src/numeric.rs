//! Exact decimal values for NUMERIC columns
//!
//! NUMERIC values are carried as normalized decimal text and never pass
//! through a binary floating type. The backend's NUMERIC holds up to 29
//! integer digits and 9 fractional digits.

use crate::codec::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Maximum number of digits before the decimal point.
pub const MAX_INTEGER_DIGITS: usize = 29;

/// Maximum number of digits after the decimal point.
pub const MAX_FRACTION_DIGITS: usize = 9;

/// A NUMERIC value as normalized decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Numeric(String);

impl Numeric {
    /// Parse decimal text such as `"-123.4500"` into `-123.45`.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::TypeMismatch {
            expected: "NUMERIC".into(),
            found: format!("'{}'", text),
        };

        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };

        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (unsigned, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let int_part = int_part.trim_start_matches('0');
        let frac_part = frac_part.trim_end_matches('0');

        if int_part.len() > MAX_INTEGER_DIGITS || frac_part.len() > MAX_FRACTION_DIGITS {
            return Err(Error::TypeMismatch {
                expected: format!(
                    "NUMERIC with at most {} integer and {} fractional digits",
                    MAX_INTEGER_DIGITS, MAX_FRACTION_DIGITS
                ),
                found: format!("'{}'", text),
            });
        }

        let mut normalized = String::with_capacity(int_part.len() + frac_part.len() + 3);
        let is_zero = int_part.is_empty() && frac_part.is_empty();
        if negative && !is_zero {
            normalized.push('-');
        }
        if int_part.is_empty() {
            normalized.push('0');
        } else {
            normalized.push_str(int_part);
        }
        if !frac_part.is_empty() {
            normalized.push('.');
            normalized.push_str(frac_part);
        }

        Ok(Numeric(normalized))
    }

    /// The normalized decimal text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.starts_with('-')
    }

    fn parts(&self) -> (&str, &str) {
        let unsigned = self.0.trim_start_matches('-');
        unsigned.split_once('.').unwrap_or((unsigned, ""))
    }

    /// Convert to a `rust_decimal::Decimal` when the value fits its 28 digits.
    pub fn to_decimal(&self) -> Option<Decimal> {
        Decimal::from_str_exact(&self.0).ok()
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Ord for Numeric {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }

        // Normalized text has no leading integer zeros and no trailing
        // fractional zeros, so digit strings compare by length then lexically.
        let (int_a, frac_a) = self.parts();
        let (int_b, frac_b) = other.parts();
        let magnitude = int_a
            .len()
            .cmp(&int_b.len())
            .then_with(|| int_a.cmp(int_b))
            .then_with(|| frac_a.cmp(frac_b));

        if self.is_negative() {
            magnitude.reverse()
        } else {
            magnitude
        }
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Numeric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Numeric::parse(s)
    }
}

impl TryFrom<String> for Numeric {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Numeric::parse(&s)
    }
}

impl From<Numeric> for String {
    fn from(n: Numeric) -> Self {
        n.0
    }
}

impl TryFrom<Decimal> for Numeric {
    type Error = Error;

    fn try_from(d: Decimal) -> Result<Self> {
        Numeric::parse(&d.normalize().to_string())
    }
}

impl From<i64> for Numeric {
    fn from(i: i64) -> Self {
        Numeric(i.to_string())
    }
}
