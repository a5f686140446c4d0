// Fixed-point conversions between raw on-chain integers and human-scale
// amounts, plus the round-number heuristic used for airdrop detection.

use log::warn;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::iter;
use thiserror::Error as ThisError;

/// Fractional digits kept after scaling a token amount (truncated).
pub const TOKEN_SCALE: usize = 6;

pub const ETHER_DECIMALS: u32 = 18;

/// Amounts whose decimal string ends like this look allocated, not bought.
pub const ROUND_TRAILING_ZEROS: &str = "00000";
pub const ROUND_TRAILING_NINES: &str = "9999";

/// Absolute tolerance for the common-amount and power-of-ten checks.
pub const ROUND_TOLERANCE: f64 = 0.001;

pub const COMMON_AIRDROP_AMOUNTS: &[f64] = &[
    100.0,
    200.0,
    500.0,
    1_000.0,
    2_000.0,
    5_000.0,
    10_000.0,
    20_000.0,
    25_000.0,
    50_000.0,
    100_000.0,
    200_000.0,
    500_000.0,
    1_000_000.0,
    2_000_000.0,
    5_000_000.0,
    10_000_000.0,
    50_000_000.0,
    100_000_000.0,
    500_000_000.0,
    1_000_000_000.0,
];

///
/// AmountError
///

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum AmountError {
    #[error("not an unsigned integer: {0:?}")]
    NotAnInteger(String),

    #[error("value out of decimal range: {0}")]
    OutOfRange(String),
}

pub fn is_unsigned_integer(raw: &str) -> bool {
    !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit())
}

/// Divide `raw` by 10^decimals, truncating to [`TOKEN_SCALE`] places.
///
/// The shift is done on the digit string so values wider than `u128`
/// still scale exactly as long as the result fits a `Decimal`.
pub fn parse_token_amount(raw: &str, decimals: u8) -> Result<Decimal, AmountError> {
    let raw = raw.trim();
    if !is_unsigned_integer(raw) {
        return Err(AmountError::NotAnInteger(raw.to_string()));
    }

    if decimals == 0 {
        return Decimal::from_str_exact(raw).map_err(|_| AmountError::OutOfRange(raw.to_string()));
    }

    let decimals = usize::from(decimals);
    let (int_part, frac_part) = match raw.len().checked_sub(decimals) {
        Some(split) => raw.split_at(split),
        None => ("", raw),
    };

    let int_part = match int_part.trim_start_matches('0') {
        "" => "0",
        digits => digits,
    };
    let leading_zeros = decimals.saturating_sub(raw.len());
    let frac: String = iter::repeat('0')
        .take(leading_zeros)
        .chain(frac_part.chars())
        .chain(iter::repeat('0'))
        .take(TOKEN_SCALE)
        .collect();

    Decimal::from_str_exact(&format!("{int_part}.{frac}")).map_err(|_| AmountError::OutOfRange(raw.to_string()))
}

/// Lenient form of [`parse_token_amount`]: failures become zero.
pub fn scale_token_amount(raw: &str, decimals: u8) -> Decimal {
    parse_token_amount(raw, decimals).unwrap_or_else(|e| {
        warn!("Error scaling token amount {raw} ({decimals} decimals): {e}");
        Decimal::ZERO
    })
}

pub fn parse_wei(raw: &str) -> Result<Decimal, AmountError> {
    let raw = raw.trim();
    if !is_unsigned_integer(raw) {
        return Err(AmountError::NotAnInteger(raw.to_string()));
    }

    let wei = raw.parse::<i128>().map_err(|_| AmountError::OutOfRange(raw.to_string()))?;

    Decimal::try_from_i128_with_scale(wei, ETHER_DECIMALS).map_err(|_| AmountError::OutOfRange(raw.to_string()))
}

/// Wei to ether; invalid input becomes zero.
pub fn wei_to_ether(raw: &str) -> Decimal {
    parse_wei(raw).unwrap_or_else(|e| {
        warn!("Error converting wei to ether: {e}");
        Decimal::ZERO
    })
}

/// Heuristic for amounts that look like a deliberate allocation.
pub fn is_round_number(amount: Decimal) -> bool {
    if amount <= Decimal::ZERO {
        return false;
    }

    let text = amount.to_string();
    if text.ends_with(ROUND_TRAILING_ZEROS) {
        return true;
    }

    let Some(value) = amount.to_f64() else {
        return false;
    };

    if COMMON_AIRDROP_AMOUNTS.iter().any(|common| (value - common).abs() < ROUND_TOLERANCE) {
        return true;
    }

    let log10 = value.log10();
    if log10.is_finite() && (log10 - log10.round()).abs() < ROUND_TOLERANCE {
        return true;
    }

    text.ends_with(ROUND_TRAILING_NINES)
}

/// Ether paid for gas, or `None` when either input is missing or zero.
pub fn estimate_cost_eth(gas_used: Option<u64>, gas_price_wei: Option<&str>) -> Option<Decimal> {
    let gas_used = gas_used.filter(|g| *g > 0)?;
    let gas_price = gas_price_wei.filter(|p| !p.trim().is_empty())?;

    let price_eth = wei_to_ether(gas_price);
    if price_eth <= Decimal::ZERO {
        return None;
    }

    price_eth.checked_mul(Decimal::from(gas_used)).map(|cost| cost.normalize())
}

/// USD paid for gas at `eth_price_usd`, or `None` if anything is missing
/// or non-positive.
pub fn estimate_cost_usd(gas_used: Option<u64>, gas_price_wei: Option<&str>, eth_price_usd: f64) -> Option<Decimal> {
    if !(eth_price_usd > 0.0) {
        return None;
    }

    let eth_cost = estimate_cost_eth(gas_used, gas_price_wei)?;
    let price = Decimal::from_f64(eth_price_usd)?;

    eth_cost.checked_mul(price).map(|cost| cost.normalize())
}

/// Compact form with K/M/B suffixes.
pub fn format_number(amount: Decimal, decimals: usize) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let Some(value) = amount.to_f64() else {
        return amount.to_string();
    };

    if value >= 1_000_000_000.0 {
        format!("{:.decimals$}B", value / 1_000_000_000.0)
    } else if value >= 1_000_000.0 {
        format!("{:.decimals$}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.decimals$}K", value / 1_000.0)
    } else {
        format!("{value:.decimals$}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn test_scale_token_amount() {
        assert_eq!(scale_token_amount("1000000000000000000000", 18), dec!(1000));
        assert_eq!(scale_token_amount("1234567891", 9), dec!(1.234567));
        assert_eq!(scale_token_amount("5", 3), dec!(0.005));
        assert_eq!(scale_token_amount("12345", 0), dec!(12345));
        assert_eq!(scale_token_amount("0", 18), Decimal::ZERO);
    }

    #[test]
    fn test_scale_keeps_six_places() {
        assert_eq!(scale_token_amount("1000000000000000000000", 18).to_string(), "1000.000000");
        assert_eq!(scale_token_amount("12345", 0).to_string(), "12345");
    }

    #[test]
    fn test_scale_wider_than_u128() {
        // 10^40 raw with 18 decimals -> 10^22 tokens
        let raw = format!("1{}", "0".repeat(40));
        assert_eq!(scale_token_amount(&raw, 18), Decimal::from_str("10000000000000000000000").unwrap());
    }

    #[test]
    fn test_scale_decimals_beyond_digits() {
        assert_eq!(scale_token_amount("1", 6), dec!(0.000001));
        assert_eq!(scale_token_amount("1", 7), Decimal::ZERO);
        assert_eq!(scale_token_amount("1", 255), Decimal::ZERO);
        assert_eq!(scale_token_amount("000123", 4), dec!(0.0123));

        let raw = "9".repeat(80);
        assert_eq!(parse_token_amount(&raw, u8::MAX).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_scale_invalid_is_zero() {
        assert_eq!(scale_token_amount("", 18), Decimal::ZERO);
        assert_eq!(scale_token_amount("-5", 18), Decimal::ZERO);
        assert_eq!(scale_token_amount("1.5", 18), Decimal::ZERO);
        assert_eq!(scale_token_amount("abc", 0), Decimal::ZERO);
        assert!(matches!(parse_token_amount("12x", 6), Err(AmountError::NotAnInteger(_))));
    }

    #[test]
    fn test_scale_truncation_tolerance() {
        for (raw, decimals) in [("123456789012345678901", 18u8), ("999999999", 8), ("1", 7), ("42", 2)] {
            let scaled = scale_token_amount(raw, decimals);
            let back = scaled * Decimal::from(10u64.pow(u32::from(decimals)));
            let raw = Decimal::from_str(raw).unwrap();
            let tolerance = Decimal::from(10u64.pow(u32::from(decimals).saturating_sub(TOKEN_SCALE as u32)));

            assert!(back <= raw);
            assert!(raw - back < tolerance);
        }
    }

    #[test]
    fn test_wei_to_ether() {
        assert_eq!(wei_to_ether("1000000000000000000"), Decimal::ONE);
        assert_eq!(wei_to_ether("20000000000"), dec!(0.00000002));
        assert_eq!(wei_to_ether("nope"), Decimal::ZERO);
        assert_eq!(wei_to_ether(""), Decimal::ZERO);
    }

    #[test]
    fn test_round_numbers() {
        assert!(is_round_number(dec!(1000)));
        assert!(is_round_number(dec!(1000.000000)));
        assert!(is_round_number(dec!(25000)));
        assert!(is_round_number(dec!(0.01)));
        assert!(is_round_number(dec!(99999)));
        assert!(is_round_number(dec!(1200000)));

        assert!(!is_round_number(dec!(837.42)));
        assert!(!is_round_number(dec!(837.420000)));
        assert!(!is_round_number(dec!(1234.5)));
        assert!(!is_round_number(Decimal::ZERO));
        assert!(!is_round_number(dec!(-1000)));
    }

    #[test]
    fn test_estimate_cost() {
        let usd = estimate_cost_usd(Some(21000), Some("20000000000"), 2000.0).unwrap();
        assert_eq!(usd, dec!(0.84));

        let eth = estimate_cost_eth(Some(21000), Some("20000000000")).unwrap();
        assert_eq!(eth, dec!(0.00042));
    }

    #[test]
    fn test_estimate_cost_missing_inputs() {
        assert_eq!(estimate_cost_usd(Some(21000), Some("20000000000"), 0.0), None);
        assert_eq!(estimate_cost_usd(Some(21000), Some("20000000000"), -1.0), None);
        assert_eq!(estimate_cost_usd(Some(21000), Some("20000000000"), f64::NAN), None);
        assert_eq!(estimate_cost_usd(None, Some("20000000000"), 2000.0), None);
        assert_eq!(estimate_cost_usd(Some(0), Some("20000000000"), 2000.0), None);
        assert_eq!(estimate_cost_usd(Some(21000), None, 2000.0), None);
        assert_eq!(estimate_cost_usd(Some(21000), Some("0"), 2000.0), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(Decimal::ZERO, 2), "0");
        assert_eq!(format_number(dec!(837.42), 2), "837.42");
        assert_eq!(format_number(dec!(1500), 2), "1.50K");
        assert_eq!(format_number(dec!(2500000), 1), "2.5M");
        assert_eq!(format_number(dec!(3000000000), 2), "3.00B");
    }
}
