//! Alloy-backed EVM reader and writer.
//!
//! [`AlloyReader`] serves calls, receipts and log polling over a plain HTTP
//! provider. [`AlloyWriter`] wraps a provider with the wallet filler so every
//! submitted request is signed locally before broadcast.

use super::adapter::{EvmReader, EvmWriter, LogSink, LogWatch, ReceiptSummary, WatchHandle};
use crate::ContractError;
use alloy_primitives::{Address, Bytes, Log as PrimLog, LogData, B256, U256};
use alloy_provider::{Provider, ProviderBuilder, RootProvider};
use alloy_rpc_types::{Filter, TransactionRequest};
use alloy_transport_http::Http;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tipsy_types::{with_0x_prefix, ConfigSchema, Field, FieldType, Schema, ValidationError};
use tipsy_wallet::EvmWallet;

type HttpProvider = Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>;

/// Polling parameters shared by receipt waits and log watches.
#[derive(Debug, Clone)]
pub struct AlloySettings {
	pub confirmations: u64,
	pub receipt_timeout: Duration,
	pub receipt_poll_interval: Duration,
	pub log_poll_interval: Duration,
}

impl Default for AlloySettings {
	fn default() -> Self {
		Self {
			confirmations: 1,
			receipt_timeout: Duration::from_secs(300),
			receipt_poll_interval: Duration::from_secs(2),
			log_poll_interval: Duration::from_secs(3),
		}
	}
}

impl AlloySettings {
	/// Reads the optional polling fields of an EVM contract section.
	pub fn from_config(config: &toml::Value) -> Self {
		let defaults = Self::default();
		let secs = |key: &str| {
			config
				.get(key)
				.and_then(|v| v.as_integer())
				.map(|v| Duration::from_secs(v as u64))
		};
		Self {
			confirmations: config
				.get("confirmations")
				.and_then(|v| v.as_integer())
				.map(|v| v as u64)
				.unwrap_or(defaults.confirmations),
			receipt_timeout: secs("receipt_timeout_secs").unwrap_or(defaults.receipt_timeout),
			receipt_poll_interval: defaults.receipt_poll_interval,
			log_poll_interval: secs("log_poll_interval_secs").unwrap_or(defaults.log_poll_interval),
		}
	}
}

fn parse_url(rpc_url: &str) -> Result<reqwest::Url, ContractError> {
	rpc_url
		.parse()
		.map_err(|e| ContractError::Config(format!("Invalid RPC URL {}: {}", rpc_url, e)))
}

pub struct AlloyReader {
	provider: RootProvider<Http<reqwest::Client>>,
	settings: AlloySettings,
}

impl AlloyReader {
	pub fn new(rpc_url: &str, settings: AlloySettings) -> Result<Self, ContractError> {
		let provider = RootProvider::new_http(parse_url(rpc_url)?);
		Ok(Self { provider, settings })
	}

	async fn logs_loop(
		provider: RootProvider<Http<reqwest::Client>>,
		watch: LogWatch,
		sink: LogSink,
		poll_interval: Duration,
	) {
		let mut interval = tokio::time::interval(poll_interval);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
		interval.tick().await;

		// Only logs emitted after the watch started are delivered.
		let mut last_block = match provider.get_block_number().await {
			Ok(block) => block,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to get starting block, watching from genesis");
				0
			},
		};

		loop {
			interval.tick().await;

			let current_block = match provider.get_block_number().await {
				Ok(block) => block,
				Err(e) => {
					tracing::error!("Failed to get block number: {}", e);
					continue;
				},
			};

			if current_block <= last_block {
				continue;
			}

			let filter = Filter::new()
				.address(vec![watch.address])
				.event_signature(vec![watch.topic0])
				.from_block(last_block + 1)
				.to_block(current_block);

			let logs = match provider.get_logs(&filter).await {
				Ok(logs) => logs,
				Err(e) => {
					tracing::error!("Failed to get logs: {}", e);
					continue;
				},
			};

			for log in logs {
				sink(PrimLog {
					address: log.address(),
					data: LogData::new_unchecked(log.topics().to_vec(), log.data().data.clone()),
				});
			}

			last_block = current_block;
		}
	}
}

#[async_trait]
impl EvmReader for AlloyReader {
	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ContractError> {
		self.provider
			.call(&TransactionRequest::default().to(to).input(data.into()))
			.await
			.map_err(|e| ContractError::Network(format!("eth_call failed: {}", e)))
	}

	async fn balance(&self, address: Address) -> Result<U256, ContractError> {
		self.provider
			.get_balance(address)
			.await
			.map_err(|e| ContractError::Network(format!("Failed to get balance: {}", e)))
	}

	async fn wait_for_receipt(&self, hash: B256) -> Result<ReceiptSummary, ContractError> {
		let confirmations = self.settings.confirmations;
		let start_time = tokio::time::Instant::now();
		let hash_str = with_0x_prefix(&hex::encode(hash.0));

		tracing::debug!(
			tx_hash = %hash_str,
			"Waiting for {} confirmations (timeout: {}s)",
			confirmations,
			self.settings.receipt_timeout.as_secs()
		);

		loop {
			if start_time.elapsed() > self.settings.receipt_timeout {
				return Err(ContractError::Timeout(format!(
					"No receipt for {} after {} seconds",
					hash_str,
					self.settings.receipt_timeout.as_secs()
				)));
			}

			let receipt = match self.provider.get_transaction_receipt(hash).await {
				Ok(Some(receipt)) => receipt,
				Ok(None) => {
					tokio::time::sleep(self.settings.receipt_poll_interval).await;
					continue;
				},
				Err(e) => {
					return Err(ContractError::Network(format!("Failed to get receipt: {}", e)));
				},
			};

			let current_block = self
				.provider
				.get_block_number()
				.await
				.map_err(|e| ContractError::Network(format!("Failed to get block number: {}", e)))?;

			let tx_block = receipt.block_number.unwrap_or(0);
			// The inclusion block counts as the first confirmation.
			let current_confirmations = current_block.saturating_sub(tx_block) + 1;

			if current_confirmations >= confirmations {
				let logs = receipt
					.inner
					.logs()
					.iter()
					.map(|log| PrimLog {
						address: log.address(),
						data: LogData::new_unchecked(log.topics().to_vec(), log.data().data.clone()),
					})
					.collect();
				return Ok(ReceiptSummary {
					hash: receipt.transaction_hash,
					success: receipt.status(),
					block_number: receipt.block_number,
					gas_used: u64::try_from(receipt.gas_used).unwrap_or(u64::MAX),
					logs,
				});
			}

			tracing::debug!(
				"Waiting for {} more confirmations...",
				confirmations.saturating_sub(current_confirmations)
			);
			tokio::time::sleep(self.settings.receipt_poll_interval).await;
		}
	}

	fn watch_logs(&self, watch: LogWatch, sink: LogSink) -> WatchHandle {
		let provider = self.provider.clone();
		let poll_interval = self.settings.log_poll_interval;
		tracing::debug!(address = %watch.address, topic = %watch.topic0, "Starting log watch");
		WatchHandle::new(tokio::spawn(async move {
			Self::logs_loop(provider, watch, sink, poll_interval).await;
		}))
	}
}

/// Signs and broadcasts transactions with a connected [`EvmWallet`].
pub struct AlloyWriter {
	provider: HttpProvider,
	address: Address,
	chain_id: u64,
}

impl AlloyWriter {
	/// Fails with [`ContractError::NoSigner`] while the wallet is disconnected.
	pub fn new(rpc_url: &str, wallet: &EvmWallet, chain_id: u64) -> Result<Self, ContractError> {
		let url = parse_url(rpc_url)?;
		let ethereum_wallet = wallet
			.ethereum_wallet(chain_id)
			.ok_or(ContractError::NoSigner)?;

		let provider = ProviderBuilder::new()
			.with_recommended_fillers()
			.wallet(ethereum_wallet)
			.on_http(url);

		Ok(Self {
			provider: Arc::new(provider),
			address: wallet.address(),
			chain_id,
		})
	}
}

#[async_trait]
impl EvmWriter for AlloyWriter {
	fn address(&self) -> Address {
		self.address
	}

	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn send(&self, to: Address, data: Bytes, value: U256) -> Result<B256, ContractError> {
		let request = TransactionRequest::default()
			.from(self.address)
			.to(to)
			.input(data.into())
			.value(value);

		let pending_tx = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| ContractError::TransactionFailed(format!("Failed to send transaction: {}", e)))?;

		Ok(*pending_tx.tx_hash())
	}
}

/// Schema of the `[contracts.evm]` section.
pub struct EvmContractSchema;

impl EvmContractSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

fn positive_integer() -> FieldType {
	FieldType::Integer {
		min: Some(1),
		max: None,
	}
}

impl ConfigSchema for EvmContractSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("address", FieldType::String).with_validator(|value| {
				match value.as_str().map(tipsy_types::is_valid_evm_address) {
					Some(true) => Ok(()),
					_ => Err("address must be a 0x-prefixed 20-byte hex string".to_string()),
				}
			})],
			vec![
				Field::new("rpc_url", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
						_ => Err("rpc_url must be an http(s) URL".to_string()),
					}
				}),
				Field::new("confirmations", positive_integer()),
				Field::new("receipt_timeout_secs", positive_integer()),
				Field::new("log_poll_interval_secs", positive_integer()),
			],
		);

		schema.validate(config)
	}
}
