//! Payloads published by the chain monitor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the most recent block seen by the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
	pub chain: String,
	pub block_number: u64,
	pub block_hash: String,
}

/// A block header as delivered by the header subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
	pub number: u64,
	pub hash: String,
}

/// An asset transfer matched against the monitored asset id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTransfer {
	pub asset_id: u32,
	pub from: String,
	pub to: String,
	pub amount: u128,
	pub block_number: u64,
	pub timestamp: DateTime<Utc>,
}
