//! Tipping contract read-models and the uniform transaction outcome.
//!
//! These records are the same regardless of which contract family backs
//! them. Addresses are kept in the family's native textual form: `0x`-prefixed
//! H160 for EVM contracts and SS58 for ink! contracts.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A builder registered with the tipping contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Builder {
	pub id: u64,
	pub address: String,
	pub name: String,
	pub total_received: U256,
	pub tip_count: U256,
	pub is_active: bool,
}

/// A fundraising campaign owned by a builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
	pub id: u64,
	pub builder_id: u64,
	pub target_amount: U256,
	pub raised_amount: U256,
	/// Unix timestamp in seconds.
	pub deadline: u64,
	pub is_active: bool,
}

/// A tip recorded by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tip {
	pub from: String,
	pub builder_id: u64,
	pub amount: U256,
	pub message: String,
	pub timestamp: u64,
	pub campaign_id: Option<u64>,
}

/// Emitted when a tip is sent to a builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipSentEvent {
	pub from: String,
	pub builder_id: u64,
	pub amount: U256,
	pub message: String,
	pub timestamp: u64,
}

/// Emitted when a new builder is registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderRegisteredEvent {
	pub builder_id: u64,
	pub address: String,
	pub name: String,
}

/// The chain family a contract adapter talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractFamily {
	/// Solidity contract on an EVM chain.
	Evm,
	/// ink! contract on a Substrate contracts chain.
	Ink,
}

impl fmt::Display for ContractFamily {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ContractFamily::Evm => write!(f, "evm"),
			ContractFamily::Ink => write!(f, "ink"),
		}
	}
}

/// Which adapter family the unified contract should use.
///
/// `Auto` picks EVM when an EVM account is connected, otherwise ink! when a
/// Substrate key source is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractSelection {
	#[default]
	Auto,
	Evm,
	Ink,
}

impl ContractSelection {
	/// The forced family, if any.
	pub fn forced(&self) -> Option<ContractFamily> {
		match self {
			ContractSelection::Auto => None,
			ContractSelection::Evm => Some(ContractFamily::Evm),
			ContractSelection::Ink => Some(ContractFamily::Ink),
		}
	}
}

/// Lifecycle status of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
	/// Hash obtained, not yet confirmed.
	Pending,
	/// Confirmed on chain (receipt status 1, or finalized extrinsic).
	Success,
	/// Reverted, dropped, invalid, or never submitted.
	Failed,
}

impl fmt::Display for TransactionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TransactionStatus::Pending => write!(f, "pending"),
			TransactionStatus::Success => write!(f, "success"),
			TransactionStatus::Failed => write!(f, "failed"),
		}
	}
}

/// Outcome of every state-changing contract call.
///
/// Adapters always resolve writes to this shape instead of returning an
/// error, so callers have a single failure path to handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
	pub hash: String,
	pub status: TransactionStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub block_number: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub gas_used: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl TransactionResult {
	/// A submitted transaction whose inclusion has not been observed yet.
	pub fn pending(hash: impl Into<String>) -> Self {
		Self {
			hash: hash.into(),
			status: TransactionStatus::Pending,
			block_number: None,
			gas_used: None,
			error: None,
		}
	}

	/// A confirmed transaction.
	pub fn success(hash: impl Into<String>) -> Self {
		Self {
			status: TransactionStatus::Success,
			..Self::pending(hash)
		}
	}

	/// A call that never produced a hash.
	pub fn failed(error: impl Into<String>) -> Self {
		Self {
			hash: String::new(),
			status: TransactionStatus::Failed,
			block_number: None,
			gas_used: None,
			error: Some(error.into()),
		}
	}

	/// A transaction that was submitted but ended in a failed state.
	pub fn failed_with_hash(hash: impl Into<String>, error: impl Into<String>) -> Self {
		Self {
			hash: hash.into(),
			..Self::failed(error)
		}
	}

	pub fn with_block_number(mut self, block_number: u64) -> Self {
		self.block_number = Some(block_number);
		self
	}

	pub fn with_gas_used(mut self, gas_used: u64) -> Self {
		self.gas_used = Some(gas_used);
		self
	}

	pub fn is_success(&self) -> bool {
		self.status == TransactionStatus::Success
	}

	pub fn is_failed(&self) -> bool {
		self.status == TransactionStatus::Failed
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_failed_result_has_error_and_empty_hash() {
		let result = TransactionResult::failed("no signer available");
		assert_eq!(result.status, TransactionStatus::Failed);
		assert!(result.hash.is_empty());
		assert_eq!(result.error.as_deref(), Some("no signer available"));
	}

	#[test]
	fn test_success_builder_methods() {
		let result = TransactionResult::success("0xabc")
			.with_block_number(42)
			.with_gas_used(21_000);
		assert!(result.is_success());
		assert_eq!(result.block_number, Some(42));
		assert_eq!(result.gas_used, Some(21_000));
		assert!(result.error.is_none());
	}

	#[test]
	fn test_serialization_uses_lowercase_status_and_skips_empty_fields() {
		let json = serde_json::to_value(TransactionResult::pending("0xdead")).unwrap();
		assert_eq!(json["status"], "pending");
		assert!(json.get("block_number").is_none());
		assert!(json.get("error").is_none());

		let family = serde_json::to_value(ContractFamily::Ink).unwrap();
		assert_eq!(family, "ink");
	}
}
