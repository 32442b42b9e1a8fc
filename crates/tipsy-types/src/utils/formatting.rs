//! Address display helpers.

use alloy_primitives::Address;
use std::str::FromStr;

/// Shortens an address for display: first 6 characters, `...`, last 4.
///
/// Strings of ten characters or fewer are returned unchanged.
pub fn truncate_address(address: &str) -> String {
	let chars: Vec<char> = address.chars().collect();
	if chars.len() <= 10 {
		return address.to_string();
	}
	let head: String = chars[..6].iter().collect();
	let tail: String = chars[chars.len() - 4..].iter().collect();
	format!("{}...{}", head, tail)
}

/// Returns the EIP-55 checksummed form of an H160 address.
pub fn checksum_address(address: &str) -> Option<String> {
	Address::from_str(address)
		.ok()
		.map(|parsed| parsed.to_checksum(None))
}

/// `true` for a `0x`-prefixed, 40 hex digit string.
pub fn is_valid_evm_address(address: &str) -> bool {
	address.len() == 42
		&& address.starts_with("0x")
		&& address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Adds "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.starts_with("0x") || hex_str.starts_with("0X") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Removes a leading "0x" or "0X" if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Current unix time in seconds.
pub fn current_timestamp() -> u64 {
	chrono::Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_address() {
		assert_eq!(
			truncate_address("0x1234567890123456789012345678901234567890"),
			"0x1234...7890"
		);
		assert_eq!(truncate_address("0x12345678"), "0x12345678");
		assert_eq!(
			truncate_address("5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY"),
			"5Grwva...utQY"
		);
	}

	#[test]
	fn test_checksum_address() {
		assert_eq!(
			checksum_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").as_deref(),
			Some("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
		);
		assert!(checksum_address("not-an-address").is_none());
	}

	#[test]
	fn test_is_valid_evm_address() {
		assert!(is_valid_evm_address(
			"0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb8"
		));
		assert!(!is_valid_evm_address(
			"742d35Cc6634C0532925a3b844Bc9e7595f0bEb8"
		));
		assert!(!is_valid_evm_address("0x742d35"));
		assert!(!is_valid_evm_address(
			"0xZZ2d35Cc6634C0532925a3b844Bc9e7595f0bEb8"
		));
	}

	#[test]
	fn test_hex_prefix_helpers() {
		assert_eq!(with_0x_prefix("abcd"), "0xabcd");
		assert_eq!(with_0x_prefix("0xabcd"), "0xabcd");
		assert_eq!(without_0x_prefix("0Xabcd"), "abcd");
		assert_eq!(without_0x_prefix("abcd"), "abcd");
	}
}
