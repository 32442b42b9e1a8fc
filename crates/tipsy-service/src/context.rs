//! Wiring shared by every command.

use alloy_primitives::Address;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tipsy_config::{BridgeConfig, Config, NetworkRegistry, WalletConfig};
use tipsy_contracts::{
	AdapterFactory, ContractError, DefaultAdapterFactory, UnifiedContract, UnifiedError,
};
use tipsy_core::xcm::XcmMessageBuilder;
use tipsy_core::ActivityTracker;
use tipsy_types::{ContractSelection, NetworkConfig};
use tipsy_wallet::{EvmWallet, SubstrateWallet, WalletError, WalletService};

#[derive(Debug, Error)]
pub enum ServiceError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("{0} is not available")]
	Unavailable(String),
	#[error("{0}")]
	Failed(String),
}

/// Everything resolved from the configuration file before a command runs.
pub struct AppContext {
	pub config: Config,
	pub network: NetworkConfig,
	pub wallets: Arc<WalletService>,
	pub factory: Arc<dyn AdapterFactory>,
	pub activity: ActivityTracker,
}

impl AppContext {
	pub fn new(config: Config, registry: &NetworkRegistry) -> Result<Self, Box<dyn std::error::Error>> {
		let network = config.network(registry);
		tracing::info!(
			network = %network.mode,
			evm_chain = %network.evm_chain.name,
			asset_hub = %network.asset_hub.name,
			"Resolved network"
		);

		let wallets = Arc::new(build_wallets(&config.wallet)?);
		let factory = build_factory(&config, &network)?;

		Ok(Self {
			config,
			network,
			wallets,
			factory,
			activity: ActivityTracker::new(),
		})
	}

	/// The unified contract for the configured selection.
	///
	/// A configured EVM key is enabled first so that `auto` selection prefers
	/// EVM. With `connect` the chosen wallet is also attached for writes.
	pub async fn contract(&self, connect: bool) -> Result<UnifiedContract, UnifiedError> {
		if self.wallets.evm().is_some() && self.config.contracts.selection != ContractSelection::Ink {
			self.wallets.connect_evm().await?;
		}

		let mut unified = UnifiedContract::new(
			self.config.contracts.selection,
			self.factory.clone(),
			self.wallets.clone(),
		);
		if connect {
			unified.connect().await?;
		} else {
			unified.initialize().await?;
		}
		Ok(unified)
	}

	/// Token and donation contract addresses for the approve-then-donate flow.
	pub fn donation_addresses(&self) -> Result<(Address, Address), ServiceError> {
		let token = self
			.config
			.donation
			.token_address
			.as_deref()
			.or(self.network.contracts.mock_usdc.as_deref())
			.ok_or_else(|| ServiceError::Config("no USDC token address for this network".into()))?;
		let donation = self
			.config
			.donation
			.contract_address
			.as_deref()
			.or(self.network.contracts.donation.as_deref())
			.ok_or_else(|| ServiceError::Config("no donation contract for this network".into()))?;
		Ok((parse_address(token)?, parse_address(donation)?))
	}

	/// Endpoint and asset watched by the chain monitor.
	pub fn monitor_target(&self) -> (String, u32) {
		let ws_url = self
			.config
			.monitor
			.ws_url
			.clone()
			.unwrap_or_else(|| self.network.asset_hub.ws_url.clone());
		let asset_id = self
			.config
			.monitor
			.asset_id
			.unwrap_or(self.network.assets.usdc_asset_id);
		(ws_url, asset_id)
	}

	pub fn asset_hub_ws(&self) -> String {
		bridge_endpoint(&self.config.bridge, &self.network)
	}

	pub fn xcm_builder(&self) -> XcmMessageBuilder {
		XcmMessageBuilder::new(self.config.bridge.destination_para_id)
	}
}

pub fn build_wallets(config: &WalletConfig) -> Result<WalletService, WalletError> {
	let evm = config
		.evm_private_key
		.as_ref()
		.map(EvmWallet::from_private_key)
		.transpose()?;
	let substrate = if config.substrate_suris.is_empty() {
		None
	} else {
		Some(SubstrateWallet::from_suris(&config.substrate_suris)?)
	};
	Ok(WalletService::new(evm, substrate))
}

fn build_factory(config: &Config, network: &NetworkConfig) -> Result<Arc<dyn AdapterFactory>, ContractError> {
	let factory = DefaultAdapterFactory::from_config(
		config.contracts.evm.as_ref(),
		config.contracts.ink.as_ref(),
		network,
	)?;
	Ok(Arc::new(factory))
}

fn bridge_endpoint(bridge: &BridgeConfig, network: &NetworkConfig) -> String {
	bridge
		.asset_hub_ws
		.clone()
		.unwrap_or_else(|| network.asset_hub.ws_url.clone())
}

fn parse_address(raw: &str) -> Result<Address, ServiceError> {
	Address::from_str(raw).map_err(|e| ServiceError::Config(format!("Invalid address {}: {}", raw, e)))
}
