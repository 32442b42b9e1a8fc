//! Contract adapters for the TipsyDot tipping contract.
//!
//! The same capability surface is offered for a Solidity deployment on an EVM
//! chain and an ink! deployment on a Substrate contracts chain. UI code talks
//! to [`ContractInterface`] (usually through [`unified::UnifiedContract`]) and
//! never branches on the chain family.
//!
//! Two error disciplines apply at this boundary:
//! - reads swallow transport failures, log them and return `None`/zero/`false`;
//! - writes never return an error: every outcome is a [`TransactionResult`].

use alloy_primitives::{Bytes, U256};
use async_trait::async_trait;
use thiserror::Error;
use tipsy_types::{
	Builder, BuilderRegisteredEvent, Callback, Campaign, ContractFamily, Subscription, Tip,
	TipSentEvent, TransactionResult,
};

pub mod donation;
pub mod factory;
pub mod unified;

pub mod implementations {
	pub mod evm {
		pub mod abi;
		pub mod adapter;
		pub mod alloy;
	}
	pub mod ink {
		pub mod adapter;
		pub mod codec;
		pub mod subxt_client;
	}
}

pub use donation::{DonationClient, EvmDonationClient};
pub use factory::{AdapterFactory, ContractHandle, DefaultAdapterFactory};
pub use implementations::evm::adapter::{EvmContractAdapter, EvmReader, EvmWriter};
pub use implementations::evm::alloy::{AlloyReader, AlloySettings, AlloyWriter};
pub use implementations::ink::adapter::{
	ExtrinsicStatus, InkAdapterOptions, InkClient, InkContractAdapter,
};
pub use implementations::ink::subxt_client::SubxtInkClient;
pub use unified::{Notice, UnifiedContract, UnifiedError, WalletType};

/// Error message of every write attempted without a connected signer.
pub const NO_SIGNER: &str = "No signer available: connect a wallet first";

/// Errors raised below the adapter boundary.
#[derive(Debug, Error)]
pub enum ContractError {
	#[error("Network error: {0}")]
	Network(String),
	#[error("Decode error: {0}")]
	Decode(String),
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
	#[error("{}", NO_SIGNER)]
	NoSigner,
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	#[error("Timeout: {0}")]
	Timeout(String),
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Validation error: {0}")]
	Validation(#[from] tipsy_types::ValidationError),
}

/// The capability surface shared by both contract families.
#[async_trait]
pub trait ContractInterface: Send + Sync {
	/// Builder by id; `None` when absent or on read failure.
	async fn get_builder(&self, builder_id: u64) -> Option<Builder>;

	async fn get_campaign(&self, campaign_id: u64) -> Option<Campaign>;

	async fn get_tip(&self, tip_id: u64) -> Option<Tip>;

	/// Native balance of `address`; zero on read failure.
	async fn get_balance(&self, address: &str) -> U256;

	/// Protocol fee in basis points; zero on read failure.
	async fn get_protocol_fee(&self) -> U256;

	async fn is_paused(&self) -> bool;

	async fn register_builder(&self, name: &str, address: &str) -> TransactionResult;

	/// Sends `amount` of the native token to a builder.
	async fn tip(&self, builder_id: u64, amount: U256, message: &str) -> TransactionResult;

	async fn create_campaign(
		&self,
		builder_id: u64,
		target_amount: U256,
		duration_days: u32,
	) -> TransactionResult;

	async fn set_protocol_fee(&self, fee_bps: U256) -> TransactionResult;

	async fn set_paused(&self, paused: bool) -> TransactionResult;

	async fn set_treasury(&self, treasury: &str) -> TransactionResult;

	/// Forwards raw calldata to another contract through the signer.
	async fn call_contract(&self, target: &str, data: Bytes, value: U256) -> TransactionResult;

	fn on_tip_sent(&self, callback: Callback<TipSentEvent>) -> Subscription;

	fn on_builder_registered(&self, callback: Callback<BuilderRegisteredEvent>) -> Subscription;

	fn is_connected(&self) -> bool;

	fn connected_address(&self) -> Option<String>;

	fn chain_id(&self) -> u64;

	fn contract_address(&self) -> String;

	fn family(&self) -> ContractFamily;
}
