//! Conversion between human-readable decimal amounts and integer base units.
//!
//! `0.1` USDC (6 decimals) is `100000` base units; `1.5` ether is
//! `1500000000000000000` wei. Parsing is exact: inputs are held as
//! [`Decimal`] and scaled with integer arithmetic into a [`U256`].

use std::str::FromStr;

use alloy_primitives::U256;
use rust_decimal::Decimal;

use crate::error::WalletError;

pub const ETHER_DECIMALS: u8 = 18;
pub const GWEI_DECIMALS: u8 = 9;

/// 1 gwei in wei.
pub const GWEI: u128 = 1_000_000_000;

/// Significant digits a [`Decimal`] always holds; also its largest scale.
const DECIMAL_DIGITS: usize = 28;

/// Parses a plain (`"0.005"`) or scientific (`"5e-3"`) amount string.
/// Negative values are rejected.
pub fn parse_amount(amount: &str) -> Result<Decimal, WalletError> {
    let trimmed = amount.trim();
    let value = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|e| WalletError::InvalidAmount(format!("`{amount}`: {e}")))?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err(WalletError::InvalidAmount(format!("`{amount}` is negative")));
    }
    Ok(value)
}

/// `amount × 10^decimals`, rounded half-up to an integer.
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<U256, WalletError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(WalletError::InvalidAmount(format!("{amount} is negative")));
    }

    let mantissa = amount.mantissa().unsigned_abs();
    let scale = amount.scale();
    let decimals = u32::from(decimals);

    if scale <= decimals {
        let factor = pow10(decimals - scale)?;
        return U256::from(mantissa)
            .checked_mul(factor)
            .ok_or_else(|| WalletError::InvalidAmount(format!("{amount} overflows uint256")));
    }

    // More fractional digits than the unit holds: drop them, rounding half-up.
    // scale - decimals <= 28, so the divisor fits in a u128.
    let divisor = 10u128.pow(scale - decimals);
    let quotient = mantissa / divisor;
    let remainder = mantissa % divisor;
    let rounded = if remainder >= divisor - remainder { quotient + 1 } else { quotient };
    Ok(U256::from(rounded))
}

/// Parses and scales in one step.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, WalletError> {
    to_base_units(parse_amount(amount)?, decimals)
}

/// `raw / 10^decimals` as a [`Decimal`].
///
/// Exact inverse of [`to_base_units`] while the result needs at most 28
/// significant digits. Past that the fraction is rounded half-up to the
/// digits that remain. Fails only when the integer part alone exceeds
/// [`Decimal::MAX`].
pub fn to_display_units(raw: U256, decimals: u8) -> Result<Decimal, WalletError> {
    let digits = raw.to_string();
    let decimals = usize::from(decimals);

    let (int_part, frac_part) = match digits.len().checked_sub(decimals) {
        Some(split) if split > 0 => (&digits[..split], digits[split..].to_string()),
        _ => ("0", format!("{digits:0>decimals$}")),
    };

    let int_digits = if int_part == "0" { 0 } else { int_part.len() };
    let scale = decimals.min(DECIMAL_DIGITS.saturating_sub(int_digits));
    let (kept, dropped) = frac_part.split_at(scale);

    let too_large = || WalletError::InvalidAmount(format!("{raw} at {decimals} decimals is too large to display"));
    let mut mantissa: u128 = format!("{int_part}{kept}").parse().map_err(|_| too_large())?;
    if dropped.as_bytes().first().is_some_and(|&d| d >= b'5') {
        mantissa = mantissa.checked_add(1).ok_or_else(too_large)?;
    }

    let mantissa = i128::try_from(mantissa).map_err(|_| too_large())?;
    // scale <= 28, so the cast is lossless.
    Decimal::try_from_i128_with_scale(mantissa, scale as u32)
        .map(|d| d.normalize())
        .map_err(|_| too_large())
}

pub fn parse_ether(amount: &str) -> Result<U256, WalletError> {
    parse_units(amount, ETHER_DECIMALS)
}

pub fn format_ether(wei: U256) -> Result<Decimal, WalletError> {
    to_display_units(wei, ETHER_DECIMALS)
}

/// Parses a gwei amount (`"1.5"`) into wei. Fee fields never exceed u128.
pub fn parse_gwei(amount: &str) -> Result<u128, WalletError> {
    let wei = parse_units(amount, GWEI_DECIMALS)?;
    u128::try_from(wei).map_err(|_| WalletError::InvalidAmount(format!("{amount} gwei overflows u128")))
}

pub fn format_gwei(wei: u128) -> Result<Decimal, WalletError> {
    to_display_units(U256::from(wei), GWEI_DECIMALS)
}

/// `amount` as a big-endian uint256 ABI word.
pub fn to_abi_word(amount: U256) -> [u8; 32] {
    amount.to_be_bytes::<32>()
}

fn pow10(exp: u32) -> Result<U256, WalletError> {
    let ten = U256::from(10u8);
    let mut acc = U256::from(1u8);
    for _ in 0..exp {
        acc = acc
            .checked_mul(ten)
            .ok_or_else(|| WalletError::InvalidAmount(format!("10^{exp} overflows uint256")))?;
    }
    Ok(acc)
}
