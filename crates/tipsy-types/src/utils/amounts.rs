//! Fixed-point token amounts.
//!
//! Amounts travel as raw integer units (`U256`). Rendering never rounds:
//! digits past the requested precision are cut off.

use alloy_primitives::U256;
use thiserror::Error;

/// Decimals of USDC and the USDP stablecoin.
pub const USDC_DECIMALS: u8 = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
	#[error("Amount is empty")]
	Empty,
	#[error("Invalid amount '{0}'")]
	Invalid(String),
	#[error("Amount has more than {0} decimal places")]
	TooPrecise(u8),
	#[error("Amount overflows 256 bits")]
	Overflow,
}

fn split_units(amount: U256, decimals: u8) -> (U256, String) {
	let scale = U256::from(10u64).pow(U256::from(decimals));
	let whole = amount / scale;
	let fraction = (amount % scale).to_string();
	let padded = format!("{:0>width$}", fraction, width = decimals as usize);
	(whole, padded)
}

/// Renders a raw USDC amount with all six decimals, e.g. `"1.500000 USDC"`.
pub fn format_usdc(amount: U256) -> String {
	let (whole, fraction) = split_units(amount, USDC_DECIMALS);
	format!("{}.{} USDC", whole, fraction)
}

/// Renders a raw USDC amount with two decimals, e.g. `"500.00 USDC"`.
pub fn format_usdc_short(amount: U256) -> String {
	let (whole, fraction) = split_units(amount, USDC_DECIMALS);
	format!("{}.{} USDC", whole, &fraction[..2])
}

/// Renders a raw amount with trailing fractional zeros removed.
///
/// `format_token_amount(U256::from(1_500_000), 6) == "1.5"`.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
	if decimals == 0 {
		return amount.to_string();
	}
	let (whole, fraction) = split_units(amount, decimals);
	let trimmed = fraction.trim_end_matches('0');
	if trimmed.is_empty() {
		whole.to_string()
	} else {
		format!("{}.{}", whole, trimmed)
	}
}

/// [`format_token_amount`] followed by the token symbol, e.g. `"1.5 USDP"`.
pub fn format_token(amount: U256, decimals: u8, symbol: &str) -> String {
	format!("{} {}", format_token_amount(amount, decimals), symbol)
}

/// Parses a decimal string such as `"12.5"` into raw units.
pub fn parse_token_amount(input: &str, decimals: u8) -> Result<U256, AmountError> {
	let input = input.trim();
	if input.is_empty() {
		return Err(AmountError::Empty);
	}

	let (whole, fraction) = match input.split_once('.') {
		Some((whole, fraction)) => (whole, fraction),
		None => (input, ""),
	};
	if whole.is_empty() && fraction.is_empty() {
		return Err(AmountError::Invalid(input.to_string()));
	}
	if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
	{
		return Err(AmountError::Invalid(input.to_string()));
	}
	if fraction.len() > decimals as usize {
		return Err(AmountError::TooPrecise(decimals));
	}

	let digits = format!(
		"{}{:0<width$}",
		if whole.is_empty() { "0" } else { whole },
		fraction,
		width = decimals as usize
	);
	U256::from_str_radix(&digits, 10).map_err(|_| AmountError::Overflow)
}

/// Parses a USDC amount string into 6-decimal raw units.
pub fn parse_usdc(input: &str) -> Result<U256, AmountError> {
	parse_token_amount(input, USDC_DECIMALS)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_format_usdc_keeps_six_decimals() {
		assert_eq!(format_usdc(U256::from(1_500_000u64)), "1.500000 USDC");
		assert_eq!(format_usdc(U256::ZERO), "0.000000 USDC");
		assert_eq!(format_usdc(U256::from(1u64)), "0.000001 USDC");
		assert_eq!(format_usdc(U256::from(123_456_789u64)), "123.456789 USDC");
	}

	#[test]
	fn test_format_usdc_short_truncates() {
		assert_eq!(format_usdc_short(U256::from(500_000_000u64)), "500.00 USDC");
		assert_eq!(format_usdc_short(U256::from(1_999_999u64)), "1.99 USDC");
	}

	#[test]
	fn test_format_token_amount_trims_zeros() {
		assert_eq!(format_token_amount(U256::from(1_500_000u64), 6), "1.5");
		assert_eq!(format_token_amount(U256::from(10_000_000u64), 6), "10");
		assert_eq!(format_token_amount(U256::from(42u64), 0), "42");
		assert_eq!(
			format_token_amount(U256::from(1_000_000_000_000_000_000u128), 18),
			"1"
		);
	}

	#[test]
	fn test_format_token_appends_symbol() {
		assert_eq!(format_token(U256::from(1_500_000u64), 6, "USDP"), "1.5 USDP");
		assert_eq!(format_token(U256::from(25u64), 0, "DOT"), "25 DOT");
		assert_eq!(format_token(U256::ZERO, 6, "USDC"), "0 USDC");
	}

	#[test]
	fn test_parse_usdc() {
		assert_eq!(parse_usdc("1.5"), Ok(U256::from(1_500_000u64)));
		assert_eq!(parse_usdc("10"), Ok(U256::from(10_000_000u64)));
		assert_eq!(parse_usdc(".25"), Ok(U256::from(250_000u64)));
		assert_eq!(parse_usdc("0.000001"), Ok(U256::from(1u64)));
	}

	#[test]
	fn test_parse_usdc_rejects_bad_input() {
		assert_eq!(parse_usdc(""), Err(AmountError::Empty));
		assert_eq!(parse_usdc("."), Err(AmountError::Invalid(".".to_string())));
		assert_eq!(parse_usdc("-1"), Err(AmountError::Invalid("-1".to_string())));
		assert_eq!(parse_usdc("1.2.3"), Err(AmountError::Invalid("1.2.3".to_string())));
		assert_eq!(parse_usdc("1.0000001"), Err(AmountError::TooPrecise(6)));
	}
}
