//! subxt transport for ink! contracts on `pallet-contracts` chains.

use super::adapter::{ExtrinsicStatus, InkClient};
use super::codec::{ContractsCallArgs, DryRunOutcome};
use crate::ContractError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use parity_scale_codec::Encode;
use subxt::backend::legacy::LegacyRpcMethods;
use subxt::backend::rpc::RpcClient;
use subxt::dynamic::Value;
use subxt::ext::scale_value::At;
use subxt::tx::TxStatus;
use subxt::utils::{AccountId32, H256};
use subxt::{OnlineClient, PolkadotConfig};
use tipsy_types::{with_0x_prefix, ConfigSchema, Field, FieldType, Schema, ValidationError};
use tipsy_wallet::SubstrateAccount;

pub struct SubxtInkClient {
	api: OnlineClient<PolkadotConfig>,
	rpc: LegacyRpcMethods<PolkadotConfig>,
}

fn network_err(context: &str, e: impl std::fmt::Display) -> ContractError {
	ContractError::Network(format!("{}: {}", context, e))
}

fn hash_string(hash: H256) -> String {
	with_0x_prefix(&hex::encode(hash.0))
}

impl SubxtInkClient {
	pub async fn connect(ws_url: &str) -> Result<Self, ContractError> {
		let rpc_client = RpcClient::from_url(ws_url)
			.await
			.map_err(|e| network_err(&format!("Failed to connect to {}", ws_url), e))?;
		let api = OnlineClient::<PolkadotConfig>::from_rpc_client(rpc_client.clone())
			.await
			.map_err(|e| network_err("Failed to load chain metadata", e))?;
		tracing::info!(url = %ws_url, "Connected to contracts chain");

		Ok(Self {
			api,
			rpc: LegacyRpcMethods::new(rpc_client),
		})
	}

	async fn call_runtime(
		&self,
		origin: &AccountId32,
		contract: &AccountId32,
		value: u128,
		input: Vec<u8>,
	) -> Result<DryRunOutcome, ContractError> {
		let args = ContractsCallArgs::dry_run(origin.0, contract.0, value, input).encode();
		let raw = self
			.rpc
			.state_call("ContractsApi_call", Some(args.as_slice()), None)
			.await
			.map_err(|e| network_err("ContractsApi_call failed", e))?;
		DryRunOutcome::decode(&raw)
	}
}

async fn block_number(api: &OnlineClient<PolkadotConfig>, hash: H256) -> Option<u64> {
	match api.blocks().at(hash).await {
		Ok(block) => Some(block.number().into()),
		Err(e) => {
			tracing::debug!(error = %e, "Could not resolve block number");
			None
		},
	}
}

#[async_trait]
impl InkClient for SubxtInkClient {
	async fn dry_run(
		&self,
		origin: &AccountId32,
		contract: &AccountId32,
		input: Vec<u8>,
	) -> Result<Vec<u8>, ContractError> {
		self.call_runtime(origin, contract, 0, input)
			.await?
			.into_return_data()
	}

	async fn submit(
		&self,
		signer: &SubstrateAccount,
		contract: &AccountId32,
		input: Vec<u8>,
		value: u128,
	) -> Result<BoxStream<'static, ExtrinsicStatus>, ContractError> {
		// The dry-run supplies the gas and deposit limits, and rejects reverting calls early.
		let estimate = self
			.call_runtime(&signer.account_id(), contract, value, input.clone())
			.await?;
		let gas = estimate.gas_required;
		let deposit_limit = estimate.storage_deposit.charge();
		estimate.into_return_data()?;

		let tx = subxt::dynamic::tx(
			"Contracts",
			"call",
			vec![
				Value::unnamed_variant("Id", [Value::from_bytes(contract.0)]),
				Value::u128(value),
				Value::named_composite([
					("ref_time", Value::u128(gas.ref_time.into())),
					("proof_size", Value::u128(gas.proof_size.into())),
				]),
				match deposit_limit {
					Some(limit) => Value::unnamed_variant("Some", [Value::u128(limit)]),
					None => Value::unnamed_variant("None", []),
				},
				Value::from_bytes(input),
			],
		);

		let progress = self
			.api
			.tx()
			.sign_and_submit_then_watch_default(&tx, signer.keypair())
			.await
			.map_err(|e| ContractError::TransactionFailed(format!("Failed to submit extrinsic: {}", e)))?;

		let api = self.api.clone();
		let statuses = futures::stream::unfold(Some(progress), move |state| {
			let api = api.clone();
			async move {
				let mut progress = state?;
				loop {
					let status = match progress.next().await {
						None => return None,
						Some(Err(e)) => return Some((ExtrinsicStatus::Invalid(e.to_string()), None)),
						Some(Ok(status)) => status,
					};
					match status {
						TxStatus::InBestBlock(in_block) => {
							let block_number = block_number(&api, in_block.block_hash()).await;
							let status = ExtrinsicStatus::InBlock {
								hash: hash_string(in_block.extrinsic_hash()),
								block_number,
							};
							return Some((status, Some(progress)));
						},
						TxStatus::InFinalizedBlock(in_block) => {
							let hash = hash_string(in_block.extrinsic_hash());
							let status = match in_block.wait_for_success().await {
								Ok(_) => ExtrinsicStatus::Finalized {
									hash,
									block_number: block_number(&api, in_block.block_hash()).await,
								},
								Err(e) => ExtrinsicStatus::Failed {
									hash,
									error: e.to_string(),
								},
							};
							return Some((status, None));
						},
						TxStatus::Error { message } | TxStatus::Invalid { message } => {
							return Some((ExtrinsicStatus::Invalid(message), None));
						},
						TxStatus::Dropped { message } => {
							return Some((ExtrinsicStatus::Dropped(message), None));
						},
						_ => continue,
					}
				}
			}
		});

		Ok(statuses.boxed())
	}

	async fn free_balance(&self, account: &AccountId32) -> Result<u128, ContractError> {
		let query = subxt::dynamic::storage("System", "Account", vec![Value::from_bytes(account.0)]);
		let storage = self
			.api
			.storage()
			.at_latest()
			.await
			.map_err(|e| network_err("Failed to get latest block", e))?;

		let Some(entry) = storage
			.fetch(&query)
			.await
			.map_err(|e| network_err("Failed to read System.Account", e))?
		else {
			return Ok(0);
		};

		let value = entry
			.to_value()
			.map_err(|e| ContractError::Decode(format!("System.Account: {}", e)))?;
		value
			.at("data")
			.and_then(|data| data.at("free"))
			.and_then(|free| free.as_u128())
			.ok_or_else(|| ContractError::Decode("System.Account has no data.free".to_string()))
	}
}

/// Schema of the `[contracts.ink]` section.
pub struct InkContractSchema;

impl InkContractSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for InkContractSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("address", FieldType::String).with_validator(|value| {
				match value.as_str().map(|s| s.parse::<AccountId32>()) {
					Some(Ok(_)) => Ok(()),
					_ => Err("address must be an SS58 account id".to_string()),
				}
			})],
			vec![
				Field::new("ws_url", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("ws://") || url.starts_with("wss://") => Ok(()),
						_ => Err("ws_url must be a ws(s) URL".to_string()),
					}
				}),
				Field::new(
					"chain_id",
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				),
				Field::new("wait_for_finalization", FieldType::Boolean),
			],
		);

		schema.validate(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn section(raw: &str) -> toml::Value {
		raw.parse::<toml::Table>().map(toml::Value::Table).unwrap()
	}

	#[test]
	fn test_schema_accepts_ss58_address() {
		let config = section(
			r#"
			address = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty"
			ws_url = "ws://localhost:9944"
			wait_for_finalization = false
			"#,
		);
		assert!(InkContractSchema::validate_config(&config).is_ok());
	}

	#[test]
	fn test_schema_rejects_evm_address_and_http_url() {
		assert!(InkContractSchema::validate_config(&section(
			r#"address = "0x1234567890123456789012345678901234567890""#
		))
		.is_err());
		assert!(InkContractSchema::validate_config(&section(
			r#"
			address = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty"
			ws_url = "http://localhost:9944"
			"#
		))
		.is_err());
	}
}
