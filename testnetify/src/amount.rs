//! Exact arithmetic on the decimal strings Cosmos SDK uses for amounts.
//!
//! Integer amounts (`"1000"`) and 18-place decimals
//! (`"1000.000000000000000000"`) are both held as [`U256`]; decimals are
//! scaled by `10^18` so adding an integer delta never touches the fraction.

use alloy_primitives::U256;

use crate::error::{GenesisError, Result};

/// Fractional digits of an SDK `LegacyDec`.
pub const DECIMAL_PLACES: usize = 18;

const DECIMAL_SCALE: u64 = 1_000_000_000_000_000_000;

fn invalid(path: &str, value: &str, reason: impl Into<String>) -> GenesisError {
    GenesisError::InvalidAmount {
        path: path.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_digits(path: &str, value: &str, digits: &str) -> Result<U256> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(path, value, "expected decimal digits"));
    }
    U256::from_str_radix(digits, 10).map_err(|e| invalid(path, value, e.to_string()))
}

/// Parse an unsigned integer amount such as `"250000"`.
pub fn parse_int(path: &str, value: &str) -> Result<U256> {
    parse_digits(path, value, value)
}

/// Parse a decimal such as `"12.5"` into its `10^18`-scaled integer.
pub fn parse_dec(path: &str, value: &str) -> Result<U256> {
    let (int_part, frac_part) = match value.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (value, ""),
    };
    if frac_part.len() > DECIMAL_PLACES {
        return Err(invalid(
            path,
            value,
            format!("more than {DECIMAL_PLACES} fractional digits"),
        ));
    }

    let int = parse_digits(path, value, int_part)?;
    let frac = if frac_part.is_empty() {
        U256::ZERO
    } else {
        let padded = format!("{frac_part:0<DECIMAL_PLACES$}");
        parse_digits(path, value, &padded)?
    };

    int.checked_mul(U256::from(DECIMAL_SCALE))
        .and_then(|scaled| scaled.checked_add(frac))
        .ok_or_else(|| GenesisError::Overflow {
            path: path.to_string(),
        })
}

/// Render a `10^18`-scaled integer with exactly 18 fractional digits.
pub fn format_dec(scaled: U256) -> String {
    let scale = U256::from(DECIMAL_SCALE);
    let int = scaled / scale;
    let frac = (scaled % scale).to_string();
    format!("{int}.{frac:0>DECIMAL_PLACES$}")
}

/// `value + delta` for an integer amount string.
pub fn add_int(path: &str, value: &str, delta: U256) -> Result<String> {
    parse_int(path, value)?
        .checked_add(delta)
        .map(|sum| sum.to_string())
        .ok_or_else(|| GenesisError::Overflow {
            path: path.to_string(),
        })
}

/// `value + delta` for a decimal string; the result always has 18 places.
pub fn add_dec(path: &str, value: &str, delta: U256) -> Result<String> {
    let overflow = || GenesisError::Overflow {
        path: path.to_string(),
    };
    let delta = delta.checked_mul(U256::from(DECIMAL_SCALE)).ok_or_else(overflow)?;
    parse_dec(path, value)?
        .checked_add(delta)
        .map(format_dec)
        .ok_or_else(overflow)
}
