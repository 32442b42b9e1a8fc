//! ink! contract adapter.
//!
//! Reads are dry-runs of contract messages; writes are signed `Contracts::call`
//! extrinsics whose status stream is folded into a single
//! [`TransactionResult`]. The connected [`SubstrateAccount`] is the origin of
//! every call.

use super::codec::{
	decode_message_output, encode_message, messages, InkBuilder, InkCampaign, InkTip,
};
use crate::{ContractError, ContractInterface, NO_SIGNER};
use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use parity_scale_codec::{Decode, Encode};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use subxt::utils::AccountId32;
use tipsy_types::{
	current_timestamp, Builder, BuilderRegisteredEvent, Callback, Campaign, ContractFamily,
	ListenerSet, Subscription, Tip, TipSentEvent, TransactionResult,
};
use tipsy_wallet::SubstrateAccount;

/// Chain id reported when none is configured.
pub const DEFAULT_INK_CHAIN_ID: u64 = 42;

/// Lifecycle of a submitted extrinsic as seen by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtrinsicStatus {
	InBlock {
		hash: String,
		block_number: Option<u64>,
	},
	Finalized {
		hash: String,
		block_number: Option<u64>,
	},
	/// Included but the dispatch failed.
	Failed { hash: String, error: String },
	Dropped(String),
	Invalid(String),
}

/// Transport to a contracts-enabled Substrate node.
#[async_trait]
pub trait InkClient: Send + Sync {
	/// Dry-runs a message and returns its raw output bytes.
	async fn dry_run(
		&self,
		origin: &AccountId32,
		contract: &AccountId32,
		input: Vec<u8>,
	) -> Result<Vec<u8>, ContractError>;

	/// Signs and submits a `Contracts::call` extrinsic.
	async fn submit(
		&self,
		signer: &SubstrateAccount,
		contract: &AccountId32,
		input: Vec<u8>,
		value: u128,
	) -> Result<BoxStream<'static, ExtrinsicStatus>, ContractError>;

	async fn free_balance(&self, account: &AccountId32) -> Result<u128, ContractError>;
}

#[derive(Debug, Clone)]
pub struct InkAdapterOptions {
	pub chain_id: u64,
	/// Return `Pending` at block inclusion instead of waiting for finality.
	pub wait_for_finalization: bool,
}

impl Default for InkAdapterOptions {
	fn default() -> Self {
		Self {
			chain_id: DEFAULT_INK_CHAIN_ID,
			wait_for_finalization: true,
		}
	}
}

pub struct InkContractAdapter {
	client: Arc<dyn InkClient>,
	contract: AccountId32,
	options: InkAdapterOptions,
	account: RwLock<Option<SubstrateAccount>>,
	tip_sent: ListenerSet<TipSentEvent>,
	builder_registered: ListenerSet<BuilderRegisteredEvent>,
}

fn parse_account(address: &str) -> Result<AccountId32, ContractError> {
	AccountId32::from_str(address.trim())
		.map_err(|e| ContractError::InvalidAddress(format!("{}: {:?}", address, e)))
}

fn to_balance(amount: U256, what: &str) -> Result<u128, ContractError> {
	u128::try_from(amount).map_err(|_| {
		ContractError::Validation(tipsy_types::ValidationError::InvalidValue {
			field: what.to_string(),
			message: format!("{} exceeds the u128 balance range", amount),
		})
	})
}

impl InkContractAdapter {
	pub fn new(client: Arc<dyn InkClient>, contract: &str, options: InkAdapterOptions) -> Result<Self, ContractError> {
		Ok(Self {
			client,
			contract: parse_account(contract)?,
			options,
			account: RwLock::new(None),
			tip_sent: ListenerSet::new(),
			builder_registered: ListenerSet::new(),
		})
	}

	/// Makes `account` the origin and signer of subsequent calls.
	pub fn connect(&self, account: SubstrateAccount) {
		tracing::info!(address = %account.address, "ink! adapter connected");
		*self.account.write().unwrap_or_else(PoisonError::into_inner) = Some(account);
	}

	pub fn disconnect(&self) {
		if self
			.account
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.take()
			.is_some()
		{
			tracing::info!("ink! adapter disconnected");
		}
	}

	fn account(&self) -> Option<SubstrateAccount> {
		self.account
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	async fn query<T: Decode + Send>(&self, label: &str, input: Vec<u8>) -> Option<T> {
		let origin = self
			.account()
			.map(|a| a.account_id())
			.unwrap_or_else(|| self.contract.clone());

		let result = self
			.client
			.dry_run(&origin, &self.contract, input)
			.await
			.and_then(|data| decode_message_output::<T>(&data));

		match result {
			Ok(value) => Some(value),
			Err(e) => {
				tracing::warn!(message = label, error = %e, "ink! query failed");
				None
			},
		}
	}

	/// Submits a message and folds the status stream into one result.
	async fn execute(
		&self,
		label: &str,
		input: Vec<u8>,
		value: u128,
		mut on_inclusion: Option<TipSentEvent>,
	) -> TransactionResult {
		let Some(account) = self.account() else {
			return TransactionResult::failed(NO_SIGNER);
		};

		let mut statuses = match self
			.client
			.submit(&account, &self.contract, input, value)
			.await
		{
			Ok(statuses) => statuses,
			Err(e) => {
				tracing::warn!(message = label, error = %e, "Failed to submit extrinsic");
				return TransactionResult::failed(e.to_string());
			},
		};

		let mut included_hash: Option<String> = None;
		while let Some(status) = statuses.next().await {
			match status {
				ExtrinsicStatus::InBlock { hash, block_number } => {
					tracing::info!(tx_hash = %hash, message = label, "Extrinsic included in block");
					if let Some(event) = on_inclusion.take() {
						self.tip_sent.emit(&event);
					}
					if !self.options.wait_for_finalization {
						let result = TransactionResult::pending(hash);
						return match block_number {
							Some(block) => result.with_block_number(block),
							None => result,
						};
					}
					included_hash = Some(hash);
				},
				ExtrinsicStatus::Finalized { hash, block_number } => {
					tracing::info!(tx_hash = %hash, message = label, "Extrinsic finalized");
					let result = TransactionResult::success(hash);
					return match block_number {
						Some(block) => result.with_block_number(block),
						None => result,
					};
				},
				ExtrinsicStatus::Failed { hash, error } => {
					tracing::warn!(tx_hash = %hash, message = label, error = %error, "Extrinsic failed");
					return TransactionResult::failed_with_hash(hash, error);
				},
				ExtrinsicStatus::Dropped(reason) | ExtrinsicStatus::Invalid(reason) => {
					tracing::warn!(message = label, reason = %reason, "Extrinsic not included");
					let error = format!("Transaction failed: {}", reason);
					return match included_hash {
						Some(hash) => TransactionResult::failed_with_hash(hash, error),
						None => TransactionResult::failed(error),
					};
				},
			}
		}

		let error = "Transaction status stream ended before finalization";
		match included_hash {
			Some(hash) => TransactionResult::failed_with_hash(hash, error),
			None => TransactionResult::failed(error),
		}
	}

	async fn execute_message<A: Encode>(&self, label: &str, args: A, value: u128) -> TransactionResult {
		self.execute(label, encode_message(label, args), value, None)
			.await
	}
}

impl From<InkBuilder> for Builder {
	fn from(b: InkBuilder) -> Self {
		Builder {
			id: b.id,
			address: AccountId32(b.address).to_string(),
			name: b.name,
			total_received: U256::from(b.total_received),
			tip_count: U256::from(b.tip_count),
			is_active: b.is_active,
		}
	}
}

impl From<InkCampaign> for Campaign {
	fn from(c: InkCampaign) -> Self {
		Campaign {
			id: c.id,
			builder_id: c.builder_id,
			target_amount: U256::from(c.target_amount),
			raised_amount: U256::from(c.raised_amount),
			deadline: c.deadline,
			is_active: c.is_active,
		}
	}
}

impl From<InkTip> for Tip {
	fn from(t: InkTip) -> Self {
		Tip {
			from: AccountId32(t.from).to_string(),
			builder_id: t.builder_id,
			amount: U256::from(t.amount),
			message: t.message,
			timestamp: t.timestamp,
			campaign_id: t.campaign_id,
		}
	}
}

#[async_trait]
impl ContractInterface for InkContractAdapter {
	async fn get_builder(&self, builder_id: u64) -> Option<Builder> {
		self.query::<Option<InkBuilder>>(
			messages::GET_BUILDER,
			encode_message(messages::GET_BUILDER, (builder_id,)),
		)
		.await
		.flatten()
		.map(Builder::from)
	}

	async fn get_campaign(&self, campaign_id: u64) -> Option<Campaign> {
		self.query::<Option<InkCampaign>>(
			messages::GET_CAMPAIGN,
			encode_message(messages::GET_CAMPAIGN, (campaign_id,)),
		)
		.await
		.flatten()
		.map(Campaign::from)
	}

	async fn get_tip(&self, tip_id: u64) -> Option<Tip> {
		self.query::<Option<InkTip>>(messages::GET_TIP, encode_message(messages::GET_TIP, (tip_id,)))
			.await
			.flatten()
			.map(Tip::from)
	}

	async fn get_balance(&self, address: &str) -> U256 {
		let account = match parse_account(address) {
			Ok(account) => account,
			Err(e) => {
				tracing::warn!(error = %e, "Balance query with invalid address");
				return U256::ZERO;
			},
		};
		match self.client.free_balance(&account).await {
			Ok(free) => U256::from(free),
			Err(e) => {
				tracing::warn!(error = %e, "Failed to get balance");
				U256::ZERO
			},
		}
	}

	async fn get_protocol_fee(&self) -> U256 {
		self.query::<u16>(
			messages::PROTOCOL_FEE_BPS,
			encode_message(messages::PROTOCOL_FEE_BPS, ()),
		)
		.await
		.map(U256::from)
		.unwrap_or(U256::ZERO)
	}

	async fn is_paused(&self) -> bool {
		self.query::<bool>(messages::PAUSED, encode_message(messages::PAUSED, ()))
			.await
			.unwrap_or(false)
	}

	async fn register_builder(&self, name: &str, address: &str) -> TransactionResult {
		let builder = match parse_account(address) {
			Ok(account) => account,
			Err(e) => return TransactionResult::failed(e.to_string()),
		};
		self.execute_message(messages::REGISTER_BUILDER, (name.to_string(), builder.0), 0)
			.await
	}

	async fn tip(&self, builder_id: u64, amount: U256, message: &str) -> TransactionResult {
		let value = match to_balance(amount, "amount") {
			Ok(value) => value,
			Err(e) => return TransactionResult::failed(e.to_string()),
		};
		let event = self.account().map(|account| TipSentEvent {
			from: account.address,
			builder_id,
			amount,
			message: message.to_string(),
			timestamp: current_timestamp(),
		});
		self.execute(
			messages::TIP,
			encode_message(messages::TIP, (builder_id, message.to_string())),
			value,
			event,
		)
		.await
	}

	async fn create_campaign(
		&self,
		builder_id: u64,
		target_amount: U256,
		duration_days: u32,
	) -> TransactionResult {
		let target = match to_balance(target_amount, "target_amount") {
			Ok(target) => target,
			Err(e) => return TransactionResult::failed(e.to_string()),
		};
		self.execute_message(messages::CREATE_CAMPAIGN, (builder_id, target, duration_days), 0)
			.await
	}

	async fn set_protocol_fee(&self, fee_bps: U256) -> TransactionResult {
		let Ok(fee) = u16::try_from(fee_bps) else {
			return TransactionResult::failed("Protocol fee exceeds u16 basis points");
		};
		self.execute_message(messages::SET_PROTOCOL_FEE, (fee,), 0).await
	}

	async fn set_paused(&self, paused: bool) -> TransactionResult {
		self.execute_message(messages::SET_PAUSED, (paused,), 0).await
	}

	async fn set_treasury(&self, treasury: &str) -> TransactionResult {
		match parse_account(treasury) {
			Ok(account) => {
				self.execute_message(messages::SET_TREASURY, (account.0,), 0)
					.await
			},
			Err(e) => TransactionResult::failed(e.to_string()),
		}
	}

	async fn call_contract(&self, target: &str, data: Bytes, value: U256) -> TransactionResult {
		let Ok(target) = Address::from_str(target.trim()) else {
			return TransactionResult::failed(format!("Invalid address: {}", target));
		};
		let value = match to_balance(value, "value") {
			Ok(value) => value,
			Err(e) => return TransactionResult::failed(e.to_string()),
		};
		self.execute_message(
			messages::CALL_SOLIDITY_CONTRACT,
			(target.0 .0, data.to_vec(), value),
			value,
		)
		.await
	}

	fn on_tip_sent(&self, callback: Callback<TipSentEvent>) -> Subscription {
		self.tip_sent.subscribe_arc(callback)
	}

	fn on_builder_registered(&self, callback: Callback<BuilderRegisteredEvent>) -> Subscription {
		self.builder_registered.subscribe_arc(callback)
	}

	fn is_connected(&self) -> bool {
		self.account().is_some()
	}

	fn connected_address(&self) -> Option<String> {
		self.account().map(|a| a.address)
	}

	fn chain_id(&self) -> u64 {
		self.options.chain_id
	}

	fn contract_address(&self) -> String {
		self.contract.to_string()
	}

	fn family(&self) -> ContractFamily {
		ContractFamily::Ink
	}
}

#[cfg(test)]
mod tests {
	use super::super::codec::{selector, LangError, Selector};
	use super::*;
	use std::collections::HashMap;
	use std::sync::Mutex;

	const CONTRACT: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";

	#[derive(Default)]
	struct FakeClient {
		responses: HashMap<Selector, Vec<u8>>,
		statuses: Vec<ExtrinsicStatus>,
		origins: Mutex<Vec<AccountId32>>,
		submitted: Mutex<Vec<(Vec<u8>, u128)>>,
	}

	#[async_trait]
	impl InkClient for FakeClient {
		async fn dry_run(
			&self,
			origin: &AccountId32,
			_contract: &AccountId32,
			input: Vec<u8>,
		) -> Result<Vec<u8>, ContractError> {
			self.origins.lock().unwrap().push(origin.clone());
			let sel: Selector = input[..4].try_into().unwrap();
			self.responses
				.get(&sel)
				.cloned()
				.ok_or_else(|| ContractError::Network("node unreachable".into()))
		}

		async fn submit(
			&self,
			_signer: &SubstrateAccount,
			_contract: &AccountId32,
			input: Vec<u8>,
			value: u128,
		) -> Result<BoxStream<'static, ExtrinsicStatus>, ContractError> {
			self.submitted.lock().unwrap().push((input, value));
			Ok(futures::stream::iter(self.statuses.clone()).boxed())
		}

		async fn free_balance(&self, _account: &AccountId32) -> Result<u128, ContractError> {
			Ok(1_000)
		}
	}

	fn alice() -> SubstrateAccount {
		SubstrateAccount::from_keypair(subxt_signer::sr25519::dev::alice())
	}

	fn in_block() -> ExtrinsicStatus {
		ExtrinsicStatus::InBlock {
			hash: "0xaa".into(),
			block_number: Some(10),
		}
	}

	fn finalized() -> ExtrinsicStatus {
		ExtrinsicStatus::Finalized {
			hash: "0xaa".into(),
			block_number: Some(10),
		}
	}

	fn new_adapter(client: FakeClient, options: InkAdapterOptions) -> (Arc<FakeClient>, InkContractAdapter) {
		let client = Arc::new(client);
		let adapter = InkContractAdapter::new(client.clone(), CONTRACT, options).unwrap();
		(client, adapter)
	}

	#[tokio::test]
	async fn test_reads_decode_ink_output() {
		let builder = InkBuilder {
			id: 1,
			address: alice().account_id().0,
			name: "Alice".into(),
			total_received: 2_000_000,
			tip_count: 2,
			is_active: true,
		};
		let mut responses = HashMap::new();
		responses.insert(
			selector(messages::GET_BUILDER),
			Ok::<_, LangError>(Some(builder)).encode(),
		);
		responses.insert(
			selector(messages::GET_CAMPAIGN),
			Ok::<Option<InkCampaign>, LangError>(None).encode(),
		);
		responses.insert(selector(messages::PAUSED), Ok::<_, LangError>(true).encode());
		let (_, adapter) = new_adapter(
			FakeClient {
				responses,
				..Default::default()
			},
			InkAdapterOptions::default(),
		);

		let builder = adapter.get_builder(1).await.unwrap();
		assert_eq!(builder.address, alice().address);
		assert_eq!(builder.total_received, U256::from(2_000_000u64));
		assert!(adapter.get_campaign(1).await.is_none());
		assert!(adapter.is_paused().await);
		// Missing response stands in for a transport failure.
		assert_eq!(adapter.get_protocol_fee().await, U256::ZERO);
		assert!(adapter.get_tip(1).await.is_none());
	}

	#[tokio::test]
	async fn test_reads_use_contract_as_origin_until_connected() {
		let mut responses = HashMap::new();
		responses.insert(selector(messages::PAUSED), Ok::<_, LangError>(false).encode());
		let (client, adapter) = new_adapter(
			FakeClient {
				responses,
				..Default::default()
			},
			InkAdapterOptions::default(),
		);

		adapter.is_paused().await;
		adapter.connect(alice());
		adapter.is_paused().await;

		let origins = client.origins.lock().unwrap().clone();
		assert_eq!(origins[0].to_string(), CONTRACT);
		assert_eq!(origins[1], alice().account_id());
	}

	#[tokio::test]
	async fn test_write_without_account_fails() {
		let (client, adapter) = new_adapter(FakeClient::default(), InkAdapterOptions::default());
		let result = adapter.tip(0, U256::from(1_000_000u64), "gm").await;
		assert!(result.is_failed());
		assert_eq!(result.error.as_deref(), Some(NO_SIGNER));
		assert!(client.submitted.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_tip_waits_for_finalization_and_emits_at_inclusion() {
		let (client, adapter) = new_adapter(
			FakeClient {
				statuses: vec![in_block(), finalized()],
				..Default::default()
			},
			InkAdapterOptions::default(),
		);
		adapter.connect(alice());

		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = seen.clone();
		let sub = adapter.on_tip_sent(Arc::new(move |e: &TipSentEvent| {
			sink.lock().unwrap().push(e.clone())
		}));

		let result = adapter.tip(3, U256::from(5_000u64), "gm").await;
		assert!(result.is_success());
		assert_eq!(result.block_number, Some(10));

		let events = seen.lock().unwrap().clone();
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].from, alice().address);
		assert_eq!(events[0].builder_id, 3);

		let submitted = client.submitted.lock().unwrap().clone();
		assert_eq!(submitted[0].1, 5_000);
		assert_eq!(&submitted[0].0[..4], &selector(messages::TIP));
		sub.unsubscribe();
	}

	#[tokio::test]
	async fn test_inclusion_is_pending_without_finality_wait() {
		let (_, adapter) = new_adapter(
			FakeClient {
				statuses: vec![in_block(), finalized()],
				..Default::default()
			},
			InkAdapterOptions {
				wait_for_finalization: false,
				..Default::default()
			},
		);
		adapter.connect(alice());
		let result = adapter.set_paused(true).await;
		assert_eq!(result.status, tipsy_types::TransactionStatus::Pending);
		assert_eq!(result.hash, "0xaa");
	}

	#[tokio::test]
	async fn test_dropped_and_truncated_streams_fail() {
		let (_, adapter) = new_adapter(
			FakeClient {
				statuses: vec![in_block(), ExtrinsicStatus::Dropped("pool full".into())],
				..Default::default()
			},
			InkAdapterOptions::default(),
		);
		adapter.connect(alice());
		let result = adapter.create_campaign(1, U256::from(10u64), 7).await;
		assert!(result.is_failed());
		assert_eq!(result.hash, "0xaa");

		let (_, truncated) = adapter_with_statuses(vec![in_block()]);
		let result = truncated.set_paused(false).await;
		assert!(result.is_failed());
	}

	fn adapter_with_statuses(statuses: Vec<ExtrinsicStatus>) -> (Arc<FakeClient>, InkContractAdapter) {
		let (client, adapter) = new_adapter(
			FakeClient {
				statuses,
				..Default::default()
			},
			InkAdapterOptions::default(),
		);
		adapter.connect(alice());
		(client, adapter)
	}

	#[tokio::test]
	async fn test_identity_and_disconnect() {
		let (_, adapter) = adapter_with_statuses(vec![]);
		assert_eq!(adapter.family(), ContractFamily::Ink);
		assert_eq!(adapter.chain_id(), DEFAULT_INK_CHAIN_ID);
		assert_eq!(adapter.contract_address(), CONTRACT);
		assert_eq!(adapter.connected_address(), Some(alice().address));
		assert_eq!(adapter.get_balance(CONTRACT).await, U256::from(1_000u64));

		adapter.disconnect();
		assert!(!adapter.is_connected());
		assert!(adapter.set_protocol_fee(U256::from(70_000u64)).await.is_failed());
	}

	#[test]
	fn test_invalid_contract_address() {
		assert!(InkContractAdapter::new(
			Arc::new(FakeClient::default()),
			"0x1234",
			InkAdapterOptions::default()
		)
		.is_err());
	}
}
