//! Common types for the TipsyDot client stack.
//!
//! This crate holds the read-models shared by every other crate: builder,
//! campaign and tip records, the uniform transaction outcome, chain monitor
//! payloads, activity feed entries, the network registry types and the
//! listener registry used for event fan-out.

/// Activity feed records.
pub mod activity;
/// Chain monitor payloads.
pub mod chain;
/// Tipping contract records, events and transaction outcomes.
pub mod contract;
/// Keyed callback registry with unsubscribe handles.
pub mod listeners;
/// Network mode and chain registry types.
pub mod networks;
/// Secure string type for private keys and secret URIs.
pub mod secret_string;
/// Amount and address helpers.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use activity::*;
pub use chain::*;
pub use contract::*;
pub use listeners::{Callback, ListenerSet, Subscription};
pub use networks::{
	AssetHubConfig, AssetsConfig, ContractAddresses, EvmChainConfig, FeatureFlags, NativeCurrency,
	NetworkConfig, NetworkMode, PrecompileAddresses,
};
pub use secret_string::SecretString;
pub use utils::{
	checksum_address, current_timestamp, format_token, format_token_amount, format_usdc,
	format_usdc_short, is_valid_evm_address, parse_token_amount, parse_usdc, truncate_address,
	with_0x_prefix, without_0x_prefix, AmountError, USDC_DECIMALS,
};
pub use validation::*;
