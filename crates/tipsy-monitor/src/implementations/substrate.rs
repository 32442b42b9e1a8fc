//! subxt-backed chain source for AssetHub.

use crate::{ChainConnector, ChainSource, HeaderStream, MonitorError, TransferEvent};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use subxt::backend::legacy::LegacyRpcMethods;
use subxt::backend::rpc::RpcClient;
use subxt::dynamic::Value;
use subxt::events::StaticEvent;
use subxt::ext::scale_decode::DecodeAsType;
use subxt::ext::scale_value::At;
use subxt::utils::{AccountId32, H256};
use subxt::{OnlineClient, PolkadotConfig};
use tipsy_types::BlockHeader;

/// `pallet_assets::Event::Transferred`.
#[derive(Debug, DecodeAsType)]
#[decode_as_type(crate_path = "subxt::ext::scale_decode")]
struct Transferred {
	asset_id: u32,
	from: AccountId32,
	to: AccountId32,
	amount: u128,
}

impl StaticEvent for Transferred {
	const PALLET: &'static str = "Assets";
	const EVENT: &'static str = "Transferred";
}

fn hash_string(hash: H256) -> String {
	format!("0x{}", hex::encode(hash.0))
}

fn parse_hash(raw: &str) -> Result<H256, MonitorError> {
	let bytes = hex::decode(raw.trim_start_matches("0x"))
		.map_err(|e| MonitorError::Query(format!("Invalid block hash {}: {}", raw, e)))?;
	if bytes.len() != 32 {
		return Err(MonitorError::Query(format!("Invalid block hash length: {}", raw)));
	}
	Ok(H256::from_slice(&bytes))
}

pub struct SubxtChainSource {
	api: OnlineClient<PolkadotConfig>,
	rpc: LegacyRpcMethods<PolkadotConfig>,
}

impl SubxtChainSource {
	pub async fn connect(ws_url: &str) -> Result<Self, MonitorError> {
		let rpc_client = RpcClient::from_url(ws_url)
			.await
			.map_err(|e| MonitorError::Connection(format!("Failed to connect to {}: {}", ws_url, e)))?;
		let api = OnlineClient::<PolkadotConfig>::from_rpc_client(rpc_client.clone())
			.await
			.map_err(|e| MonitorError::Connection(format!("Failed to load metadata: {}", e)))?;

		Ok(Self {
			api,
			rpc: LegacyRpcMethods::new(rpc_client),
		})
	}
}

#[async_trait]
impl ChainSource for SubxtChainSource {
	async fn chain_name(&self) -> Result<String, MonitorError> {
		self.rpc
			.system_chain()
			.await
			.map_err(|e| MonitorError::Query(format!("system_chain: {}", e)))
	}

	async fn latest_header(&self) -> Result<BlockHeader, MonitorError> {
		let block = self
			.api
			.blocks()
			.at_latest()
			.await
			.map_err(|e| MonitorError::Query(format!("Failed to get latest block: {}", e)))?;
		Ok(BlockHeader {
			number: u64::from(block.number()),
			hash: hash_string(block.hash()),
		})
	}

	async fn subscribe_headers(&self) -> Result<HeaderStream, MonitorError> {
		let blocks = self
			.api
			.blocks()
			.subscribe_best()
			.await
			.map_err(|e| MonitorError::Subscription(e.to_string()))?;

		Ok(blocks
			.map(|result| {
				result
					.map(|block| BlockHeader {
						number: u64::from(block.number()),
						hash: hash_string(block.hash()),
					})
					.map_err(|e| MonitorError::Subscription(e.to_string()))
			})
			.boxed())
	}

	async fn asset_transfers(&self, header: &BlockHeader) -> Result<Vec<TransferEvent>, MonitorError> {
		let hash = parse_hash(&header.hash)?;
		let events = self
			.api
			.blocks()
			.at(hash)
			.await
			.map_err(|e| MonitorError::Query(format!("block {}: {}", header.number, e)))?
			.events()
			.await
			.map_err(|e| MonitorError::Query(format!("events of block {}: {}", header.number, e)))?;

		events
			.find::<Transferred>()
			.map(|event| {
				event
					.map(|t| TransferEvent {
						asset_id: t.asset_id,
						from: t.from.to_string(),
						to: t.to.to_string(),
						amount: t.amount,
					})
					.map_err(|e| MonitorError::Query(format!("Assets.Transferred: {}", e)))
			})
			.collect()
	}

	async fn asset_balance(&self, asset_id: u32, address: &str) -> Result<Option<u128>, MonitorError> {
		let account: AccountId32 = address
			.parse()
			.map_err(|_| MonitorError::InvalidAddress(address.to_string()))?;
		let query = subxt::dynamic::storage(
			"Assets",
			"Account",
			vec![Value::u128(asset_id.into()), Value::from_bytes(account.0)],
		);

		let entry = self
			.api
			.storage()
			.at_latest()
			.await
			.map_err(|e| MonitorError::Query(format!("Failed to get latest block: {}", e)))?
			.fetch(&query)
			.await
			.map_err(|e| MonitorError::Query(format!("Assets.Account: {}", e)))?;

		let Some(entry) = entry else {
			return Ok(None);
		};
		let value = entry
			.to_value()
			.map_err(|e| MonitorError::Query(format!("Assets.Account: {}", e)))?;
		value
			.at("balance")
			.and_then(|balance| balance.as_u128())
			.map(Some)
			.ok_or_else(|| MonitorError::Query("Assets.Account has no balance".to_string()))
	}
}

/// Opens a [`SubxtChainSource`] on `ws_url`.
pub struct SubxtConnector {
	ws_url: String,
}

impl SubxtConnector {
	pub fn new(ws_url: impl Into<String>) -> Self {
		Self {
			ws_url: ws_url.into(),
		}
	}
}

#[async_trait]
impl ChainConnector for SubxtConnector {
	async fn connect(&self) -> Result<Arc<dyn ChainSource>, MonitorError> {
		Ok(Arc::new(SubxtChainSource::connect(&self.ws_url).await?))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_block_hash_round_trips_through_string() {
		let hash = H256::repeat_byte(0xab);
		let raw = hash_string(hash);
		assert!(raw.starts_with("0xabab"));
		assert_eq!(parse_hash(&raw).unwrap(), hash);
	}

	#[test]
	fn test_parse_hash_rejects_short_input() {
		assert!(matches!(parse_hash("0x1234"), Err(MonitorError::Query(_))));
		assert!(parse_hash("not-hex").is_err());
	}
}
