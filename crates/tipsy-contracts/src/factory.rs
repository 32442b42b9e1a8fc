//! Construction of contract adapters from configuration.

use crate::implementations::evm::alloy::{
	AlloyReader, AlloySettings, AlloyWriter, EvmContractSchema,
};
use crate::implementations::ink::adapter::InkAdapterOptions;
use crate::implementations::ink::subxt_client::{InkContractSchema, SubxtInkClient};
use crate::unified::WalletType;
use crate::{ContractError, ContractInterface, EvmContractAdapter, EvmWriter, InkContractAdapter};
use alloy_primitives::Address;
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;
use tipsy_types::NetworkConfig;
use tipsy_wallet::{WalletConnector, WalletService};

/// A built adapter. ink! adapters are kept concrete so an account can be
/// connected to them.
#[derive(Clone)]
pub enum ContractHandle {
	Evm(Arc<EvmContractAdapter>),
	Ink(Arc<InkContractAdapter>),
}

impl ContractHandle {
	pub fn contract(&self) -> Arc<dyn ContractInterface> {
		match self {
			ContractHandle::Evm(adapter) => adapter.clone(),
			ContractHandle::Ink(adapter) => adapter.clone(),
		}
	}

	pub fn wallet_type(&self) -> WalletType {
		match self {
			ContractHandle::Evm(_) => WalletType::Evm,
			ContractHandle::Ink(_) => WalletType::Ink,
		}
	}
}

#[async_trait]
pub trait AdapterFactory: Send + Sync {
	async fn build(
		&self,
		wallet_type: WalletType,
		wallets: &WalletService,
	) -> Result<ContractHandle, ContractError>;
}

#[derive(Debug, Clone)]
struct EvmTarget {
	address: Address,
	rpc_url: String,
	chain_id: u64,
	settings: AlloySettings,
}

#[derive(Debug, Clone)]
struct InkTarget {
	address: String,
	ws_url: String,
	options: InkAdapterOptions,
}

/// Builds alloy-backed EVM adapters and subxt-backed ink! adapters.
pub struct DefaultAdapterFactory {
	evm: Option<EvmTarget>,
	ink: Option<InkTarget>,
}

fn str_field<'a>(section: &'a toml::Value, key: &str) -> Option<&'a str> {
	section.get(key).and_then(|v| v.as_str())
}

impl DefaultAdapterFactory {
	/// Reads the `[contracts.evm]` and `[contracts.ink]` sections; endpoints
	/// default to those of `network`.
	pub fn from_config(
		evm: Option<&toml::Value>,
		ink: Option<&toml::Value>,
		network: &NetworkConfig,
	) -> Result<Self, ContractError> {
		let evm = evm
			.map(|section| -> Result<EvmTarget, ContractError> {
				EvmContractSchema::validate_config(section)?;
				let raw = str_field(section, "address").unwrap_or_default();
				let address = Address::from_str(raw)
					.map_err(|e| ContractError::InvalidAddress(format!("{}: {}", raw, e)))?;
				Ok(EvmTarget {
					address,
					rpc_url: str_field(section, "rpc_url")
						.unwrap_or(&network.evm_chain.rpc_url)
						.to_string(),
					chain_id: network.evm_chain.chain_id,
					settings: AlloySettings::from_config(section),
				})
			})
			.transpose()?;

		let ink = ink
			.map(|section| -> Result<InkTarget, ContractError> {
				InkContractSchema::validate_config(section)?;
				let defaults = InkAdapterOptions::default();
				Ok(InkTarget {
					address: str_field(section, "address").unwrap_or_default().to_string(),
					ws_url: str_field(section, "ws_url")
						.unwrap_or(&network.asset_hub.ws_url)
						.to_string(),
					options: InkAdapterOptions {
						chain_id: section
							.get("chain_id")
							.and_then(|v| v.as_integer())
							.map(|v| v as u64)
							.unwrap_or(defaults.chain_id),
						wait_for_finalization: section
							.get("wait_for_finalization")
							.and_then(|v| v.as_bool())
							.unwrap_or(defaults.wait_for_finalization),
					},
				})
			})
			.transpose()?;

		Ok(Self { evm, ink })
	}

	fn build_evm(&self, wallets: &WalletService) -> Result<ContractHandle, ContractError> {
		let target = self
			.evm
			.as_ref()
			.ok_or_else(|| ContractError::Config("No EVM contract configured".to_string()))?;

		let reader = AlloyReader::new(&target.rpc_url, target.settings.clone())?;
		let writer = match wallets.evm() {
			Some(wallet) if wallet.is_connected() => Some(Arc::new(AlloyWriter::new(
				&target.rpc_url,
				&wallet,
				target.chain_id,
			)?) as Arc<dyn EvmWriter>),
			_ => None,
		};

		tracing::info!(
			contract = %target.address,
			chain_id = target.chain_id,
			signer = writer.is_some(),
			"Built EVM contract adapter"
		);
		Ok(ContractHandle::Evm(Arc::new(EvmContractAdapter::new(
			target.address,
			Some(Arc::new(reader)),
			writer,
		))))
	}

	async fn build_ink(&self) -> Result<ContractHandle, ContractError> {
		let target = self
			.ink
			.as_ref()
			.ok_or_else(|| ContractError::Config("No ink! contract configured".to_string()))?;

		let client = SubxtInkClient::connect(&target.ws_url).await?;
		let adapter = InkContractAdapter::new(Arc::new(client), &target.address, target.options.clone())?;
		tracing::info!(contract = %target.address, "Built ink! contract adapter");
		Ok(ContractHandle::Ink(Arc::new(adapter)))
	}
}

#[async_trait]
impl AdapterFactory for DefaultAdapterFactory {
	async fn build(
		&self,
		wallet_type: WalletType,
		wallets: &WalletService,
	) -> Result<ContractHandle, ContractError> {
		match wallet_type {
			WalletType::Evm => self.build_evm(wallets),
			WalletType::Ink => self.build_ink().await,
		}
	}
}
