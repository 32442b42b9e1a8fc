//! In-memory on-chain activity feed.
//!
//! The list is held most-recent-first and replaced as a whole on every
//! change, so readers always see a consistent snapshot. Subscribers receive
//! the current list when they subscribe and again after each change.
//!
//! Writers are serialized: id assignment, timestamping and the swap happen
//! under one lock, so ids in the list are strictly descending.

use arc_swap::ArcSwap;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use tipsy_types::{
	ActivityId, ActivityKind, ActivityUpdate, Callback, ListenerSet, NewActivity, OnChainActivity,
	Subscription, XcmAssetSummary, XcmDecodedSummary, XcmMessageSummary,
};

pub type ActivityList = Arc<Vec<OnChainActivity>>;

pub struct XcmTransferParams {
	pub from: String,
	pub to: String,
	pub amount: String,
	pub asset: String,
	pub destination_chain: String,
	/// Hex SCALE encoding of the message, when it was built locally.
	pub encoded: Option<String>,
}

pub struct SwapParams {
	pub from_token: String,
	pub to_token: String,
	pub from_amount: String,
	pub to_amount: String,
	pub address: String,
}

pub struct TipParams {
	pub from: String,
	pub campaign_id: u64,
	pub amount: String,
	pub message: Option<String>,
}

pub struct NftMintParams {
	pub recipient: String,
	pub token_id: Option<String>,
}

pub struct BridgeParams {
	pub from: String,
	pub from_chain: String,
	pub to_chain: String,
	pub amount: String,
	pub asset: String,
}

pub struct ActivityTracker {
	activities: ArcSwap<Vec<OnChainActivity>>,
	listeners: ListenerSet<ActivityList>,
	/// Last assigned id; held while a writer replaces the list.
	writer: Mutex<u64>,
}

impl Default for ActivityTracker {
	fn default() -> Self {
		Self::new()
	}
}

impl ActivityTracker {
	pub fn new() -> Self {
		Self {
			activities: ArcSwap::from_pointee(Vec::new()),
			listeners: ListenerSet::new(),
			writer: Mutex::new(0),
		}
	}

	/// Registers `callback` and calls it once with the current list.
	pub fn subscribe<F>(&self, callback: F) -> Subscription
	where
		F: Fn(&ActivityList) + Send + Sync + 'static,
	{
		let callback: Callback<ActivityList> = Arc::new(callback);
		callback(&self.activities.load_full());
		self.listeners.subscribe_arc(callback)
	}

	fn writer(&self) -> MutexGuard<'_, u64> {
		self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	fn notify(&self) {
		self.listeners.emit(&self.activities.load_full());
	}

	pub fn add_activity(&self, activity: NewActivity) -> OnChainActivity {
		let activity = {
			let mut last_id = self.writer();
			*last_id += 1;
			let activity = activity.into_activity(ActivityId(*last_id), Utc::now());

			let current = self.activities.load();
			let mut next = Vec::with_capacity(current.len() + 1);
			next.push(activity.clone());
			next.extend(current.iter().cloned());
			self.activities.store(Arc::new(next));
			activity
		};
		tracing::debug!(id = %activity.id, kind = ?activity.kind, "Activity added");
		self.notify();
		activity
	}

	/// Applies `update` to the activity with `id`. Returns `false` when no such
	/// activity exists.
	pub fn update_activity(&self, id: ActivityId, update: ActivityUpdate) -> bool {
		{
			let _writer = self.writer();
			let current = self.activities.load();
			let Some(index) = current.iter().position(|a| a.id == id) else {
				return false;
			};
			let mut next = current.as_ref().clone();
			update.apply_to(&mut next[index]);
			self.activities.store(Arc::new(next));
		}
		self.notify();
		true
	}

	pub fn activities(&self) -> ActivityList {
		self.activities.load_full()
	}

	/// The `n` most recent activities.
	pub fn recent(&self, n: usize) -> Vec<OnChainActivity> {
		self.activities.load().iter().take(n).cloned().collect()
	}

	/// Empties the feed. Ids keep ascending afterwards.
	pub fn clear(&self) {
		{
			let _writer = self.writer();
			self.activities.store(Arc::new(Vec::new()));
		}
		self.notify();
	}

	pub fn track_xcm_transfer(&self, params: XcmTransferParams) -> OnChainActivity {
		let mut activity = NewActivity::new(ActivityKind::XcmTransfer);
		activity.explanation = Some(format!(
			"Initiating XCM reserve transfer of {} {} to {}. Assets will be locked on the source chain and corresponding tokens minted on destination.",
			params.amount, params.asset, params.destination_chain
		));
		activity.xcm_message = params.encoded.map(|encoded| XcmMessageSummary {
			encoded,
			decoded: XcmDecodedSummary {
				method: "reserve_transfer_assets".to_string(),
				destination: params.destination_chain.clone(),
				beneficiary: params.to.clone(),
				assets: vec![XcmAssetSummary {
					id: params.asset.clone(),
					amount: params.amount.clone(),
				}],
				fee: format!("0.001 {}", params.asset),
			},
		});
		activity.from = Some(params.from);
		activity.to = Some(params.to);
		activity.amount = Some(params.amount);
		activity.asset = Some(params.asset);
		self.add_activity(activity)
	}

	pub fn track_swap(&self, params: SwapParams) -> OnChainActivity {
		let mut activity = NewActivity::new(ActivityKind::Swap);
		activity.explanation = Some(format!(
			"Swapping {} {} for approximately {} {} using AMM liquidity pools.",
			params.from_amount, params.from_token, params.to_amount, params.to_token
		));
		activity.amount = Some(format!(
			"{} {} → {} {}",
			params.from_amount, params.from_token, params.to_amount, params.to_token
		));
		activity.from = Some(params.address);
		activity.asset = Some(params.from_token);
		self.add_activity(activity)
	}

	pub fn track_tip(&self, params: TipParams) -> OnChainActivity {
		let message = params
			.message
			.filter(|m| !m.is_empty())
			.map(|m| format!(" Message: \"{}\"", m))
			.unwrap_or_default();

		let mut activity = NewActivity::new(ActivityKind::Tip);
		activity.explanation = Some(format!(
			"Tipping {} USDP to Campaign #{}.{} A 0.1% protocol fee supports the treasury.",
			params.amount, params.campaign_id, message
		));
		activity.from = Some(params.from);
		activity.to = Some(format!("Campaign #{}", params.campaign_id));
		activity.amount = Some(params.amount);
		activity.asset = Some("USDP".to_string());
		self.add_activity(activity)
	}

	pub fn track_nft_mint(&self, params: NftMintParams) -> OnChainActivity {
		let token = params
			.token_id
			.map(|id| format!(" #{}", id))
			.unwrap_or_default();

		let mut activity = NewActivity::new(ActivityKind::NftMint);
		activity.explanation = Some(format!(
			"Minting dynamic TipCard NFT{}. Traits are generated based on tip amount and current blockchain metrics.",
			token
		));
		activity.to = Some(params.recipient);
		self.add_activity(activity)
	}

	pub fn track_bridge(&self, params: BridgeParams) -> OnChainActivity {
		let mut activity = NewActivity::new(ActivityKind::Bridge);
		activity.explanation = Some(format!(
			"Bridging {} {} from {} to {} using burn/mint mechanism.",
			params.amount, params.asset, params.from_chain, params.to_chain
		));
		activity.from = Some(params.from);
		activity.amount = Some(params.amount);
		activity.asset = Some(params.asset);
		self.add_activity(activity)
	}
}
