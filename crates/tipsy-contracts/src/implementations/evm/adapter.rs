//! EVM contract adapter.
//!
//! The adapter is bound to one contract address and drives two optional
//! backends: an [`EvmReader`] for calls, receipts and log watching, and an
//! [`EvmWriter`] holding the signer. Without a writer every write fails with
//! [`NO_SIGNER`]; without a reader writes are fire-and-forget and return
//! `Pending`.

use super::abi::{BuilderData, CampaignData, ITipping, TipData};
use crate::{ContractError, ContractInterface, NO_SIGNER};
use alloy_primitives::{Address, Bytes, Log, B256, U256};
use alloy_sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tipsy_types::{
	current_timestamp, with_0x_prefix, Builder, BuilderRegisteredEvent, Callback, Campaign,
	ContractFamily, ListenerSet, Subscription, Tip, TipSentEvent, TransactionResult,
};
use tokio::task::JoinHandle;

/// Outcome of waiting for a transaction receipt.
#[derive(Debug, Clone)]
pub struct ReceiptSummary {
	pub hash: B256,
	pub success: bool,
	pub block_number: Option<u64>,
	pub gas_used: u64,
	pub logs: Vec<Log>,
}

/// Logs of one event emitted by one contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogWatch {
	pub address: Address,
	pub topic0: B256,
}

pub type LogSink = Arc<dyn Fn(Log) + Send + Sync>;

/// Running log watch; stopping it aborts the polling task.
#[derive(Debug)]
pub struct WatchHandle {
	task: Option<JoinHandle<()>>,
}

impl WatchHandle {
	pub fn new(task: JoinHandle<()>) -> Self {
		Self { task: Some(task) }
	}

	/// A handle with no task behind it.
	pub fn detached() -> Self {
		Self { task: None }
	}

	pub fn stop(self) {
		if let Some(task) = self.task {
			task.abort();
		}
	}
}

/// Read side of an EVM chain.
#[async_trait]
pub trait EvmReader: Send + Sync {
	/// `eth_call` against `to`.
	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ContractError>;

	async fn balance(&self, address: Address) -> Result<U256, ContractError>;

	/// Waits until the receipt has the configured number of confirmations.
	async fn wait_for_receipt(&self, hash: B256) -> Result<ReceiptSummary, ContractError>;

	/// Starts delivering matching logs to `sink` until the handle is stopped.
	fn watch_logs(&self, watch: LogWatch, sink: LogSink) -> WatchHandle;
}

/// Signing side of an EVM chain.
#[async_trait]
pub trait EvmWriter: Send + Sync {
	fn address(&self) -> Address;

	fn chain_id(&self) -> u64;

	/// Signs and broadcasts a transaction, returning its hash.
	async fn send(&self, to: Address, data: Bytes, value: U256) -> Result<B256, ContractError>;
}

type WatchSlot = Arc<Mutex<Option<WatchHandle>>>;

fn lock(slot: &WatchSlot) -> MutexGuard<'_, Option<WatchHandle>> {
	slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn hash_string(hash: &B256) -> String {
	with_0x_prefix(&hex::encode(hash))
}

pub struct EvmContractAdapter {
	contract: Address,
	reader: Option<Arc<dyn EvmReader>>,
	writer: Option<Arc<dyn EvmWriter>>,
	tip_sent: ListenerSet<TipSentEvent>,
	builder_registered: ListenerSet<BuilderRegisteredEvent>,
	tip_watch: WatchSlot,
	builder_watch: WatchSlot,
}

impl EvmContractAdapter {
	pub fn new(
		contract: Address,
		reader: Option<Arc<dyn EvmReader>>,
		writer: Option<Arc<dyn EvmWriter>>,
	) -> Self {
		Self {
			contract,
			reader,
			writer,
			tip_sent: ListenerSet::new(),
			builder_registered: ListenerSet::new(),
			tip_watch: Arc::new(Mutex::new(None)),
			builder_watch: Arc::new(Mutex::new(None)),
		}
	}

	async fn read<C: SolCall>(&self, call: C) -> Option<C::Return> {
		let Some(reader) = &self.reader else {
			tracing::warn!(method = C::SIGNATURE, "No EVM reader configured");
			return None;
		};

		let output = match reader.call(self.contract, call.abi_encode().into()).await {
			Ok(output) => output,
			Err(e) => {
				tracing::warn!(method = C::SIGNATURE, error = %e, "Contract read failed");
				return None;
			},
		};

		match C::abi_decode_returns(&output, true) {
			Ok(decoded) => Some(decoded),
			Err(e) => {
				tracing::warn!(method = C::SIGNATURE, error = %e, "Failed to decode contract output");
				None
			},
		}
	}

	/// Submits a call and, with a reader, waits for its receipt.
	async fn submit(
		&self,
		to: Address,
		call_data: Bytes,
		value: U256,
		method: &str,
	) -> (TransactionResult, Option<ReceiptSummary>) {
		let Some(writer) = &self.writer else {
			return (TransactionResult::failed(NO_SIGNER), None);
		};

		let hash = match writer.send(to, call_data, value).await {
			Ok(hash) => hash,
			Err(e) => {
				tracing::warn!(method, error = %e, "Failed to submit transaction");
				return (TransactionResult::failed(e.to_string()), None);
			},
		};
		let hash_str = hash_string(&hash);
		tracing::info!(tx_hash = %hash_str, method, chain_id = writer.chain_id(), "Submitted transaction");

		let Some(reader) = &self.reader else {
			return (TransactionResult::pending(hash_str), None);
		};

		match reader.wait_for_receipt(hash).await {
			Ok(receipt) if receipt.success => {
				let mut result =
					TransactionResult::success(hash_string(&receipt.hash)).with_gas_used(receipt.gas_used);
				if let Some(block) = receipt.block_number {
					result = result.with_block_number(block);
				}
				tracing::info!(tx_hash = %result.hash, method, "Transaction confirmed");
				(result, Some(receipt))
			},
			Ok(receipt) => {
				tracing::warn!(tx_hash = %hash_str, method, "Transaction reverted");
				(
					TransactionResult::failed_with_hash(hash_str, "Transaction reverted"),
					Some(receipt),
				)
			},
			Err(e) => (
				TransactionResult::failed_with_hash(hash_str, format!("Receipt not available: {}", e)),
				None,
			),
		}
	}

	async fn submit_to_contract<C: SolCall>(&self, call: C, value: U256) -> (TransactionResult, Option<ReceiptSummary>) {
		self.submit(self.contract, call.abi_encode().into(), value, C::SIGNATURE)
			.await
	}

	fn sender(&self) -> String {
		self.writer
			.as_ref()
			.map(|w| w.address().to_checksum(None))
			.unwrap_or_default()
	}

	/// Adds a listener and starts the log watch for its event if none is running.
	fn subscribe_event<T, D>(
		&self,
		listeners: &ListenerSet<T>,
		slot: &WatchSlot,
		topic0: B256,
		decode: D,
		callback: Callback<T>,
	) -> Subscription
	where
		T: Send + Sync + 'static,
		D: Fn(&Log) -> Option<T> + Send + Sync + 'static,
	{
		let subscription = listeners.subscribe_arc(callback);
		let Some(reader) = &self.reader else {
			return subscription;
		};

		{
			let mut running = lock(slot);
			if running.is_none() {
				let fan_out = listeners.clone();
				let sink: LogSink = Arc::new(move |log: Log| {
					if let Some(event) = decode(&log) {
						fan_out.emit(&event);
					}
				});
				*running = Some(reader.watch_logs(
					LogWatch {
						address: self.contract,
						topic0,
					},
					sink,
				));
			}
		}

		let listeners = listeners.clone();
		let slot = slot.clone();
		subscription.and_then(move || {
			if listeners.is_empty() {
				if let Some(handle) = lock(&slot).take() {
					handle.stop();
				}
			}
		})
	}
}

fn parse_address(address: &str) -> Result<Address, ContractError> {
	Address::from_str(address.trim())
		.map_err(|e| ContractError::InvalidAddress(format!("{}: {}", address, e)))
}

fn decode_tip_sent(log: &Log) -> Option<TipSentEvent> {
	match ITipping::TipSent::decode_log(log, true) {
		Ok(event) => Some(TipSentEvent {
			from: event.from.to_checksum(None),
			builder_id: event.builderId.saturating_to(),
			amount: event.amount,
			message: event.message.clone(),
			timestamp: event.timestamp.saturating_to(),
		}),
		Err(e) => {
			tracing::debug!(error = %e, "Skipping undecodable TipSent log");
			None
		},
	}
}

fn decode_builder_registered(log: &Log) -> Option<BuilderRegisteredEvent> {
	match ITipping::BuilderRegistered::decode_log(log, true) {
		Ok(event) => Some(BuilderRegisteredEvent {
			builder_id: event.builderId.saturating_to(),
			address: event.builderAddress.to_checksum(None),
			name: event.name.clone(),
		}),
		Err(e) => {
			tracing::debug!(error = %e, "Skipping undecodable BuilderRegistered log");
			None
		},
	}
}

impl From<BuilderData> for Builder {
	fn from(data: BuilderData) -> Self {
		Builder {
			id: data.id.saturating_to(),
			address: data.builderAddress.to_checksum(None),
			name: data.name,
			total_received: data.totalReceived,
			tip_count: data.tipCount,
			is_active: data.isActive,
		}
	}
}

impl From<CampaignData> for Campaign {
	fn from(data: CampaignData) -> Self {
		Campaign {
			id: data.id.saturating_to(),
			builder_id: data.builderId.saturating_to(),
			target_amount: data.targetAmount,
			raised_amount: data.raisedAmount,
			deadline: data.deadline.saturating_to(),
			is_active: data.isActive,
		}
	}
}

impl From<TipData> for Tip {
	fn from(data: TipData) -> Self {
		Tip {
			from: data.from.to_checksum(None),
			builder_id: data.builderId.saturating_to(),
			amount: data.amount,
			message: data.message,
			timestamp: data.timestamp.saturating_to(),
			campaign_id: (data.campaignId > U256::ZERO).then(|| data.campaignId.saturating_to()),
		}
	}
}

#[async_trait]
impl ContractInterface for EvmContractAdapter {
	async fn get_builder(&self, builder_id: u64) -> Option<Builder> {
		let data = self
			.read(ITipping::getBuilderCall {
				builderId: U256::from(builder_id),
			})
			.await?
			._0;
		(!data.id.is_zero()).then(|| data.into())
	}

	async fn get_campaign(&self, campaign_id: u64) -> Option<Campaign> {
		let data = self
			.read(ITipping::getCampaignCall {
				campaignId: U256::from(campaign_id),
			})
			.await?
			._0;
		(!data.id.is_zero()).then(|| data.into())
	}

	async fn get_tip(&self, tip_id: u64) -> Option<Tip> {
		let data = self
			.read(ITipping::getTipCall {
				tipId: U256::from(tip_id),
			})
			.await?
			._0;
		(data.from != Address::ZERO).then(|| data.into())
	}

	async fn get_balance(&self, address: &str) -> U256 {
		let Some(reader) = &self.reader else {
			tracing::warn!("No EVM reader configured");
			return U256::ZERO;
		};
		let address = match parse_address(address) {
			Ok(address) => address,
			Err(e) => {
				tracing::warn!(error = %e, "Balance query with invalid address");
				return U256::ZERO;
			},
		};
		reader.balance(address).await.unwrap_or_else(|e| {
			tracing::warn!(error = %e, "Failed to get balance");
			U256::ZERO
		})
	}

	async fn get_protocol_fee(&self) -> U256 {
		self.read(ITipping::protocolFeeBpsCall {})
			.await
			.map(|r| r._0)
			.unwrap_or(U256::ZERO)
	}

	async fn is_paused(&self) -> bool {
		self.read(ITipping::pausedCall {})
			.await
			.map(|r| r._0)
			.unwrap_or(false)
	}

	async fn register_builder(&self, name: &str, address: &str) -> TransactionResult {
		let builder_address = match parse_address(address) {
			Ok(address) => address,
			Err(e) => return TransactionResult::failed(e.to_string()),
		};

		let (result, receipt) = self
			.submit_to_contract(
				ITipping::registerBuilderCall {
					name: name.to_string(),
					builderAddress: builder_address,
				},
				U256::ZERO,
			)
			.await;

		if let (true, Some(receipt)) = (result.is_success(), receipt) {
			let event = receipt
				.logs
				.iter()
				.filter(|log| log.address == self.contract)
				.find_map(decode_builder_registered)
				.unwrap_or_else(|| BuilderRegisteredEvent {
					builder_id: 0,
					address: builder_address.to_checksum(None),
					name: name.to_string(),
				});
			self.builder_registered.emit(&event);
		}
		result
	}

	async fn tip(&self, builder_id: u64, amount: U256, message: &str) -> TransactionResult {
		let (result, receipt) = self
			.submit_to_contract(
				ITipping::tipCall {
					builderId: U256::from(builder_id),
					message: message.to_string(),
				},
				amount,
			)
			.await;

		if result.is_success() && receipt.is_some() {
			self.tip_sent.emit(&TipSentEvent {
				from: self.sender(),
				builder_id,
				amount,
				message: message.to_string(),
				timestamp: current_timestamp(),
			});
		}
		result
	}

	async fn create_campaign(
		&self,
		builder_id: u64,
		target_amount: U256,
		duration_days: u32,
	) -> TransactionResult {
		self.submit_to_contract(
			ITipping::createCampaignCall {
				builderId: U256::from(builder_id),
				targetAmount: target_amount,
				durationDays: U256::from(duration_days),
			},
			U256::ZERO,
		)
		.await
		.0
	}

	async fn set_protocol_fee(&self, fee_bps: U256) -> TransactionResult {
		self.submit_to_contract(ITipping::setProtocolFeeCall { newFeeBps: fee_bps }, U256::ZERO)
			.await
			.0
	}

	async fn set_paused(&self, paused: bool) -> TransactionResult {
		self.submit_to_contract(ITipping::setPausedCall { isPaused: paused }, U256::ZERO)
			.await
			.0
	}

	async fn set_treasury(&self, treasury: &str) -> TransactionResult {
		let treasury = match parse_address(treasury) {
			Ok(address) => address,
			Err(e) => return TransactionResult::failed(e.to_string()),
		};
		self.submit_to_contract(ITipping::setTreasuryCall { treasury }, U256::ZERO)
			.await
			.0
	}

	async fn call_contract(&self, target: &str, data: Bytes, value: U256) -> TransactionResult {
		let target = match parse_address(target) {
			Ok(address) => address,
			Err(e) => return TransactionResult::failed(e.to_string()),
		};
		self.submit(target, data, value, "callContract").await.0
	}

	fn on_tip_sent(&self, callback: Callback<TipSentEvent>) -> Subscription {
		self.subscribe_event(
			&self.tip_sent,
			&self.tip_watch,
			ITipping::TipSent::SIGNATURE_HASH,
			decode_tip_sent,
			callback,
		)
	}

	fn on_builder_registered(&self, callback: Callback<BuilderRegisteredEvent>) -> Subscription {
		self.subscribe_event(
			&self.builder_registered,
			&self.builder_watch,
			ITipping::BuilderRegistered::SIGNATURE_HASH,
			decode_builder_registered,
			callback,
		)
	}

	fn is_connected(&self) -> bool {
		self.writer.is_some()
	}

	fn connected_address(&self) -> Option<String> {
		self.writer.as_ref().map(|w| w.address().to_checksum(None))
	}

	fn chain_id(&self) -> u64 {
		self.writer.as_ref().map(|w| w.chain_id()).unwrap_or(0)
	}

	fn contract_address(&self) -> String {
		self.contract.to_checksum(None)
	}

	fn family(&self) -> ContractFamily {
		ContractFamily::Evm
	}
}

impl Drop for EvmContractAdapter {
	fn drop(&mut self) {
		for slot in [&self.tip_watch, &self.builder_watch] {
			if let Some(handle) = lock(slot).take() {
				handle.stop();
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, LogData};
	use std::sync::atomic::{AtomicUsize, Ordering};

	const CONTRACT: Address = address!("1234567890123456789012345678901234567890");
	const SENDER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

	#[derive(Default)]
	struct MockReader {
		builder: Option<BuilderData>,
		fail_calls: bool,
		receipt_success: bool,
		receipt_logs: Vec<Log>,
		sinks: Mutex<Vec<(LogWatch, LogSink)>>,
		watches_started: AtomicUsize,
	}

	impl MockReader {
		fn push_log(&self, log: Log) {
			let sinks: Vec<(LogWatch, LogSink)> = self.sinks.lock().unwrap().clone();
			for (watch, sink) in sinks {
				if log.address == watch.address && log.topics().first() == Some(&watch.topic0) {
					sink(log.clone());
				}
			}
		}
	}

	#[async_trait]
	impl EvmReader for MockReader {
		async fn call(&self, _to: Address, data: Bytes) -> Result<Bytes, ContractError> {
			if self.fail_calls {
				return Err(ContractError::Network("connection refused".into()));
			}
			let selector: [u8; 4] = data[..4].try_into().unwrap();
			if selector == ITipping::getBuilderCall::SELECTOR {
				let builder = self.builder.clone().unwrap_or(BuilderData {
					id: U256::ZERO,
					builderAddress: Address::ZERO,
					name: String::new(),
					totalReceived: U256::ZERO,
					tipCount: U256::ZERO,
					isActive: false,
				});
				return Ok(ITipping::getBuilderCall::abi_encode_returns(&(builder,)).into());
			}
			if selector == ITipping::protocolFeeBpsCall::SELECTOR {
				return Ok(ITipping::protocolFeeBpsCall::abi_encode_returns(&(U256::from(10u64),)).into());
			}
			Err(ContractError::Network("unexpected call".into()))
		}

		async fn balance(&self, _address: Address) -> Result<U256, ContractError> {
			Ok(U256::from(5u64))
		}

		async fn wait_for_receipt(&self, hash: B256) -> Result<ReceiptSummary, ContractError> {
			Ok(ReceiptSummary {
				hash,
				success: self.receipt_success,
				block_number: Some(7),
				gas_used: 21_000,
				logs: self.receipt_logs.clone(),
			})
		}

		fn watch_logs(&self, watch: LogWatch, sink: LogSink) -> WatchHandle {
			self.watches_started.fetch_add(1, Ordering::SeqCst);
			self.sinks.lock().unwrap().push((watch, sink));
			WatchHandle::detached()
		}
	}

	struct MockWriter {
		fail: bool,
	}

	#[async_trait]
	impl EvmWriter for MockWriter {
		fn address(&self) -> Address {
			SENDER
		}

		fn chain_id(&self) -> u64 {
			1284
		}

		async fn send(&self, _to: Address, _data: Bytes, _value: U256) -> Result<B256, ContractError> {
			if self.fail {
				Err(ContractError::TransactionFailed("insufficient funds".into()))
			} else {
				Ok(B256::repeat_byte(0xab))
			}
		}
	}

	fn builder_data(id: u64) -> BuilderData {
		BuilderData {
			id: U256::from(id),
			builderAddress: SENDER,
			name: "Alice".to_string(),
			totalReceived: U256::from(1_000_000u64),
			tipCount: U256::from(3u64),
			isActive: true,
		}
	}

	fn tip_sent_log(builder_id: u64) -> Log {
		let event = ITipping::TipSent {
			from: SENDER,
			builderId: U256::from(builder_id),
			amount: U256::from(1_000_000u64),
			message: "gm".to_string(),
			timestamp: U256::from(1_700_000_000u64),
		};
		let data: LogData = event.encode_log_data();
		Log {
			address: CONTRACT,
			data,
		}
	}

	#[tokio::test]
	async fn test_get_builder_zero_id_is_none() {
		let reader = Arc::new(MockReader::default());
		let adapter = EvmContractAdapter::new(CONTRACT, Some(reader), None);
		assert!(adapter.get_builder(0).await.is_none());
	}

	#[tokio::test]
	async fn test_get_builder_populated() {
		let reader = Arc::new(MockReader {
			builder: Some(builder_data(1)),
			..Default::default()
		});
		let adapter = EvmContractAdapter::new(CONTRACT, Some(reader), None);

		let builder = adapter.get_builder(1).await.unwrap();
		assert_eq!(builder.id, 1);
		assert_eq!(builder.name, "Alice");
		assert_eq!(builder.address, SENDER.to_checksum(None));
		assert_eq!(builder.tip_count, U256::from(3u64));
		assert_eq!(adapter.get_protocol_fee().await, U256::from(10u64));
	}

	#[tokio::test]
	async fn test_read_failures_become_benign_values() {
		let reader = Arc::new(MockReader {
			fail_calls: true,
			..Default::default()
		});
		let adapter = EvmContractAdapter::new(CONTRACT, Some(reader), None);
		assert!(adapter.get_builder(1).await.is_none());
		assert_eq!(adapter.get_protocol_fee().await, U256::ZERO);
		assert!(!adapter.is_paused().await);
		assert_eq!(adapter.get_balance("not-an-address").await, U256::ZERO);
	}

	#[tokio::test]
	async fn test_tip_without_signer_fails() {
		let adapter = EvmContractAdapter::new(CONTRACT, None, None);
		let result = adapter.tip(0, U256::from(1_000_000u64), "gm").await;
		assert!(result.is_failed());
		assert!(!result.error.unwrap_or_default().is_empty());
		assert!(!adapter.is_connected());
		assert_eq!(adapter.chain_id(), 0);
	}

	#[tokio::test]
	async fn test_tip_success_reports_receipt_and_emits() {
		let reader = Arc::new(MockReader {
			receipt_success: true,
			..Default::default()
		});
		let adapter = EvmContractAdapter::new(
			CONTRACT,
			Some(reader),
			Some(Arc::new(MockWriter { fail: false })),
		);

		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = seen.clone();
		let sub = adapter.on_tip_sent(Arc::new(move |e: &TipSentEvent| {
			sink.lock().unwrap().push(e.clone())
		}));

		let result = adapter.tip(2, U256::from(1_000_000u64), "gm").await;
		assert!(result.is_success());
		assert!(!result.hash.is_empty());
		assert_eq!(result.block_number, Some(7));
		assert_eq!(result.gas_used, Some(21_000));

		let events = seen.lock().unwrap().clone();
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].builder_id, 2);
		assert_eq!(events[0].from, SENDER.to_checksum(None));
		sub.unsubscribe();
	}

	#[tokio::test]
	async fn test_reverted_receipt_is_failed() {
		let reader = Arc::new(MockReader::default());
		let adapter = EvmContractAdapter::new(
			CONTRACT,
			Some(reader),
			Some(Arc::new(MockWriter { fail: false })),
		);
		let result = adapter
			.create_campaign(1, U256::from(100_000_000u64), 30)
			.await;
		assert!(result.is_failed());
		assert!(!result.hash.is_empty());
		assert!(result.gas_used.is_none());
	}

	#[tokio::test]
	async fn test_fire_and_forget_without_reader() {
		let adapter =
			EvmContractAdapter::new(CONTRACT, None, Some(Arc::new(MockWriter { fail: false })));
		let result = adapter.set_paused(true).await;
		assert_eq!(result.status, tipsy_types::TransactionStatus::Pending);
		assert_eq!(result.hash, format!("0x{}", "ab".repeat(32)));
		assert!(result.block_number.is_none());
	}

	#[tokio::test]
	async fn test_submission_error_is_failed_result() {
		let adapter =
			EvmContractAdapter::new(CONTRACT, None, Some(Arc::new(MockWriter { fail: true })));
		let result = adapter.register_builder("Bob", &SENDER.to_string()).await;
		assert!(result.is_failed());
		assert!(result.hash.is_empty());
		assert!(result.error.unwrap().contains("insufficient funds"));

		let invalid = adapter.register_builder("Bob", "0xnope").await;
		assert!(invalid.is_failed());
	}

	#[tokio::test]
	async fn test_register_builder_reads_id_from_receipt_logs() {
		let event = ITipping::BuilderRegistered {
			builderId: U256::from(9u64),
			builderAddress: SENDER,
			name: "Bob".to_string(),
		};
		let reader = Arc::new(MockReader {
			receipt_success: true,
			receipt_logs: vec![Log {
				address: CONTRACT,
				data: event.encode_log_data(),
			}],
			..Default::default()
		});
		let adapter = EvmContractAdapter::new(
			CONTRACT,
			Some(reader),
			Some(Arc::new(MockWriter { fail: false })),
		);

		let ids = Arc::new(Mutex::new(Vec::new()));
		let sink = ids.clone();
		let _sub = adapter.on_builder_registered(Arc::new(move |e: &BuilderRegisteredEvent| {
			sink.lock().unwrap().push(e.builder_id)
		}));

		assert!(adapter.register_builder("Bob", &SENDER.to_string()).await.is_success());
		assert_eq!(*ids.lock().unwrap(), vec![9]);
	}

	#[tokio::test]
	async fn test_log_watch_fans_out_and_stops_with_last_listener() {
		let reader = Arc::new(MockReader::default());
		let adapter = EvmContractAdapter::new(CONTRACT, Some(reader.clone()), None);

		let count = Arc::new(AtomicUsize::new(0));
		let c1 = count.clone();
		let first = adapter.on_tip_sent(Arc::new(move |_: &TipSentEvent| {
			c1.fetch_add(1, Ordering::SeqCst);
		}));
		let c2 = count.clone();
		let second = adapter.on_tip_sent(Arc::new(move |_: &TipSentEvent| {
			c2.fetch_add(1, Ordering::SeqCst);
		}));
		assert_eq!(reader.watches_started.load(Ordering::SeqCst), 1);

		reader.push_log(tip_sent_log(4));
		assert_eq!(count.load(Ordering::SeqCst), 2);

		first.unsubscribe();
		assert!(lock(&adapter.tip_watch).is_some());
		second.unsubscribe();
		assert!(lock(&adapter.tip_watch).is_none());

		// A new listener restarts the watch.
		let _third = adapter.on_tip_sent(Arc::new(|_: &TipSentEvent| {}));
		assert_eq!(reader.watches_started.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn test_tip_conversion_maps_zero_campaign_to_none() {
		let data = TipData {
			from: SENDER,
			builderId: U256::from(1u64),
			amount: U256::from(5u64),
			message: "hi".to_string(),
			timestamp: U256::from(10u64),
			campaignId: U256::ZERO,
		};
		let tip: Tip = data.clone().into();
		assert_eq!(tip.campaign_id, None);

		let with_campaign: Tip = TipData {
			campaignId: U256::from(3u64),
			..data
		}
		.into();
		assert_eq!(with_campaign.campaign_id, Some(3));
	}
}
