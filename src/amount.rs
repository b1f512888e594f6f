use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

/// Fractional digits kept by the balance column.
pub const BALANCE_SCALE: u32 = 18;

/// Total significant digits the balance column can hold.
pub const BALANCE_PRECISION: usize = 28;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Invalid decimal amount `{raw}`")]
    InvalidFormat { raw: String },
    #[error("Amount must be greater than zero, got `{raw}`")]
    NonPositive { raw: String },
    #[error("Too many decimal places: {scale}, max {BALANCE_SCALE} allowed")]
    TooManyDecimalPlaces { scale: usize },
    #[error("Too many digits: {digits}, max precision is {BALANCE_PRECISION}")]
    TooManyDigits { digits: usize },
}

/// Strictly positive transfer amount that fits the balance column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    /// Parses `raw` as a decimal literal: `[+-]digits[.digits][(e|E)[+-]digits]`.
    ///
    /// The exponent is folded into the written digits first, so `1.5e3`
    /// is checked as `1500` and `1e-19` as nineteen fractional places.
    /// The digit limits are checked on the text itself, before any
    /// conversion, so values too wide for [`Decimal`] still report
    /// [`AmountError::TooManyDigits`] rather than a format error.
    pub fn parse(raw: &str) -> Result<Self, AmountError> {
        let invalid = || AmountError::InvalidFormat {
            raw: raw.to_owned(),
        };

        let (negative, unsigned) = match raw.as_bytes().first() {
            Some(b'-') => (true, &raw[1..]),
            Some(b'+') => (false, &raw[1..]),
            _ => (false, raw),
        };
        let (number, exponent) = match unsigned.split_once(['e', 'E']) {
            Some((number, exponent)) => {
                let exponent = parse_exponent(exponent).ok_or_else(invalid)?;
                (number, exponent)
            }
            None => (unsigned, 0),
        };
        let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let mut coefficient = int_part
            .bytes()
            .chain(frac_part.bytes())
            .skip_while(|b| *b == b'0')
            .map(char::from)
            .collect::<String>();
        if negative || coefficient.is_empty() {
            return Err(AmountError::NonPositive {
                raw: raw.to_owned(),
            });
        }

        let scale = frac_part.len() as i64 - exponent;
        if scale > BALANCE_SCALE as i64 {
            return Err(AmountError::TooManyDecimalPlaces {
                scale: usize::try_from(scale).unwrap_or(usize::MAX),
            });
        }
        // a positive exponent past the fraction shifts zeros into the integer part
        let padding = usize::try_from(-scale.min(0)).unwrap_or(usize::MAX);
        let digits = coefficient.len().saturating_add(padding);
        if digits > BALANCE_PRECISION {
            return Err(AmountError::TooManyDigits { digits });
        }
        coefficient.extend(std::iter::repeat_n('0', padding));

        let mantissa: i128 = coefficient.parse().map_err(|_| invalid())?;
        let value = Decimal::try_from_i128_with_scale(mantissa, scale.max(0) as u32)
            .map_err(|_| invalid())?;
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

/// Exponent digits with an optional sign. Oversized exponents saturate,
/// which still fails the scale or digit limit.
fn parse_exponent(raw: &str) -> Option<i64> {
    let (negative, digits) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX).min(i64::MAX / 2);
    Some(if negative { -magnitude } else { magnitude })
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Renders a balance the way the balance column stores it: always with
/// [`BALANCE_SCALE`] fractional digits.
pub fn render_balance(balance: Decimal) -> String {
    let mut balance = balance;
    balance.rescale(BALANCE_SCALE);
    balance.to_string()
}
