//! Amount and address helpers.

pub mod amounts;
pub mod formatting;

pub use amounts::{
	format_token, format_token_amount, format_usdc, format_usdc_short, parse_token_amount, parse_usdc,
	AmountError, USDC_DECIMALS,
};
pub use formatting::{
	checksum_address, current_timestamp, is_valid_evm_address, truncate_address, with_0x_prefix,
	without_0x_prefix,
};
