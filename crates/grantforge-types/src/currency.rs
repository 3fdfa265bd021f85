//! Fundable assets and decimal amount conversion. Amounts cross the wire as
//! base-unit strings; humans type decimal strings. Conversion is exact
//! integer math, never floating point.

use serde::{Deserialize, Serialize};

use crate::{Address, ContentHash, TypeError};

/// One fundable asset on a chain, as listed in the chain registry or added
/// per workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyInfo {
    pub address: Address,
    pub label: String,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_hash: Option<ContentHash>,
}

// 10^38 is the largest power of ten that fits in u128.
const MAX_DECIMALS: u8 = 38;

/// Convert a human decimal string into base units (`"1.5"` at 18 decimals
/// becomes `1_500_000_000_000_000_000`). Rejects excess fractional digits
/// rather than silently truncating.
pub fn parse_amount(human: &str, decimals: u8) -> Result<u128, TypeError> {
    if decimals > MAX_DECIMALS {
        return Err(TypeError::InvalidAmount(format!(
            "unsupported decimals: {decimals}"
        )));
    }
    let s = human.trim();
    if s.is_empty() {
        return Err(TypeError::InvalidAmount("empty amount".to_string()));
    }
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(TypeError::InvalidAmount(format!("not a number: {s}")));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TypeError::InvalidAmount(format!("not a number: {s}")));
    }
    if frac.len() > decimals as usize {
        return Err(TypeError::InvalidAmount(format!(
            "more than {decimals} fractional digits: {s}"
        )));
    }

    let overflow = || TypeError::InvalidAmount(format!("amount out of range: {s}"));
    let scale = 10u128.pow(decimals as u32);
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| overflow())?
    };
    let frac_units = if frac.is_empty() {
        0
    } else {
        let parsed = frac.parse::<u128>().map_err(|_| overflow())?;
        parsed * 10u128.pow((decimals as usize - frac.len()) as u32)
    };
    whole_units
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(overflow)
}

/// Convert base units back into a trimmed decimal string. Inverse of
/// [`parse_amount`]: no trailing zeros, no trailing dot.
pub fn format_amount(base_units: u128, decimals: u8) -> String {
    let digits = base_units.to_string();
    let d = decimals as usize;
    let (whole, frac) = if digits.len() > d {
        let split = digits.len() - d;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{digits:0>d$}"))
    };
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole
    } else {
        format!("{whole}.{frac}")
    }
}
