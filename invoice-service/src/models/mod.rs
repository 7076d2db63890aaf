use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Amount in the smallest currency unit (cents for USD). Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Cents(u64);

impl Cents {
    pub fn new(value: u64) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Convert a dollar amount, rounding half toward positive infinity.
    pub fn from_dollars(dollars: f64) -> Option<Self> {
        let scaled = (dollars * 100.0 + 0.5).floor();

        if !scaled.is_finite() || scaled >= u64::MAX as f64 {
            return None;
        }

        Self::new(scaled.max(0.0) as u64)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount is required")]
    Missing,

    #[error("Invalid amount")]
    Invalid,
}

/// A validated invoice amount.
///
/// `original` is the value exactly as the caller sent it and is echoed back
/// in the response next to the computed cents.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceAmount {
    pub original: Value,
    pub cents: Cents,
}

impl InvoiceAmount {
    /// Validate the `amount` field of a request body.
    ///
    /// Numbers are taken as-is; strings are read by their longest leading
    /// decimal literal (`"12.5 USD"` is 12.5). Anything else is invalid.
    pub fn parse(amount: Option<Value>) -> Result<Self, AmountError> {
        let original = match amount {
            None | Some(Value::Null) => return Err(AmountError::Missing),
            Some(value) => value,
        };

        let dollars = match &original {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_leading_decimal(s),
            _ => None,
        }
        .ok_or(AmountError::Invalid)?;

        let cents = Cents::from_dollars(dollars).ok_or(AmountError::Invalid)?;

        Ok(Self { original, cents })
    }
}

/// Recipient of issued invoices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub email: String,
    pub name: String,
}

fn parse_leading_decimal(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    if s[end..].starts_with("Infinity") {
        return Some(if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        end += 1 + frac_digits;
    }

    if int_digits + frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse().ok()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
