//! Activity feed records.
//!
//! Amounts are display strings here: the feed mixes fungible transfers,
//! swaps ("10 USDC → 9.9 USDP") and NFT mints, so there is no single unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Locally generated, process-unique activity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActivityId(pub u64);

impl fmt::Display for ActivityId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "activity-{}", self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
	XcmTransfer,
	Swap,
	Tip,
	NftMint,
	Bridge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
	Pending,
	Success,
	Failed,
}

/// One asset line of a decoded XCM message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XcmAssetSummary {
	pub id: String,
	pub amount: String,
}

/// Human-readable view of an XCM message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XcmDecodedSummary {
	pub method: String,
	pub destination: String,
	pub beneficiary: String,
	pub assets: Vec<XcmAssetSummary>,
	pub fee: String,
}

/// Encoded XCM payload alongside its decoded summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XcmMessageSummary {
	/// Hex-encoded SCALE bytes of the message.
	pub encoded: String,
	pub decoded: XcmDecodedSummary,
}

/// A user-visible record in the activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainActivity {
	pub id: ActivityId,
	pub timestamp: DateTime<Utc>,
	pub kind: ActivityKind,
	pub status: ActivityStatus,
	pub from: Option<String>,
	pub to: Option<String>,
	pub amount: Option<String>,
	pub asset: Option<String>,
	pub tx_hash: Option<String>,
	pub xcm_message: Option<XcmMessageSummary>,
	pub explanation: Option<String>,
}

/// Fields of an activity before the tracker assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
	pub kind: ActivityKind,
	pub status: ActivityStatus,
	pub from: Option<String>,
	pub to: Option<String>,
	pub amount: Option<String>,
	pub asset: Option<String>,
	pub tx_hash: Option<String>,
	pub xcm_message: Option<XcmMessageSummary>,
	pub explanation: Option<String>,
}

impl NewActivity {
	pub fn new(kind: ActivityKind) -> Self {
		Self {
			kind,
			status: ActivityStatus::Pending,
			from: None,
			to: None,
			amount: None,
			asset: None,
			tx_hash: None,
			xcm_message: None,
			explanation: None,
		}
	}

	pub fn into_activity(self, id: ActivityId, timestamp: DateTime<Utc>) -> OnChainActivity {
		OnChainActivity {
			id,
			timestamp,
			kind: self.kind,
			status: self.status,
			from: self.from,
			to: self.to,
			amount: self.amount,
			asset: self.asset,
			tx_hash: self.tx_hash,
			xcm_message: self.xcm_message,
			explanation: self.explanation,
		}
	}
}

/// Partial update applied to an existing activity.
///
/// Only fields set to `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityUpdate {
	pub status: Option<ActivityStatus>,
	pub from: Option<String>,
	pub to: Option<String>,
	pub amount: Option<String>,
	pub asset: Option<String>,
	pub tx_hash: Option<String>,
	pub xcm_message: Option<XcmMessageSummary>,
	pub explanation: Option<String>,
}

impl ActivityUpdate {
	pub fn status(status: ActivityStatus) -> Self {
		Self {
			status: Some(status),
			..Default::default()
		}
	}

	pub fn with_tx_hash(mut self, hash: impl Into<String>) -> Self {
		self.tx_hash = Some(hash.into());
		self
	}

	pub fn apply_to(self, activity: &mut OnChainActivity) {
		if let Some(status) = self.status {
			activity.status = status;
		}
		if let Some(from) = self.from {
			activity.from = Some(from);
		}
		if let Some(to) = self.to {
			activity.to = Some(to);
		}
		if let Some(amount) = self.amount {
			activity.amount = Some(amount);
		}
		if let Some(asset) = self.asset {
			activity.asset = Some(asset);
		}
		if let Some(tx_hash) = self.tx_hash {
			activity.tx_hash = Some(tx_hash);
		}
		if let Some(xcm_message) = self.xcm_message {
			activity.xcm_message = Some(xcm_message);
		}
		if let Some(explanation) = self.explanation {
			activity.explanation = Some(explanation);
		}
	}
}
