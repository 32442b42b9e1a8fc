//! Network mode and chain registry types.
//!
//! A [`NetworkConfig`] bundles everything the client needs to reach one
//! deployment: the EVM chain, the AssetHub chain, asset ids, precompile
//! addresses, deployed contract addresses and feature flags. The built-in
//! values for each mode live in `tipsy-config`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deployment mode selecting one entry of the chain registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
	#[default]
	Local,
	Testnet,
	Production,
}

impl NetworkMode {
	pub const ALL: [NetworkMode; 3] = [
		NetworkMode::Local,
		NetworkMode::Testnet,
		NetworkMode::Production,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			NetworkMode::Local => "local",
			NetworkMode::Testnet => "testnet",
			NetworkMode::Production => "production",
		}
	}
}

impl fmt::Display for NetworkMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for NetworkMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"local" => Ok(NetworkMode::Local),
			"testnet" => Ok(NetworkMode::Testnet),
			"production" => Ok(NetworkMode::Production),
			other => Err(format!("unknown network mode '{}'", other)),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
	pub name: String,
	pub symbol: String,
	pub decimals: u8,
}

/// The EVM chain hosting the Solidity tipping contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmChainConfig {
	pub name: String,
	pub rpc_url: String,
	pub ws_url: String,
	pub chain_id: u64,
	pub para_id: u32,
	pub native_currency: NativeCurrency,
}

/// The AssetHub chain watched by the chain monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetHubConfig {
	pub name: String,
	pub ws_url: String,
	pub para_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetsConfig {
	pub usdc_asset_id: u32,
	pub usdc_decimals: u8,
	pub usdc_symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecompileAddresses {
	pub assets: String,
	pub xcm: String,
	pub balance: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
	#[serde(default)]
	pub donation: Option<String>,
	#[serde(default)]
	pub mock_usdc: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
	pub enable_swap: bool,
	pub enable_liquidity_pools: bool,
	pub enable_real_xcm: bool,
	pub enable_chain_monitor: bool,
}

/// One resolved entry of the chain registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
	pub mode: NetworkMode,
	pub evm_chain: EvmChainConfig,
	pub asset_hub: AssetHubConfig,
	pub assets: AssetsConfig,
	pub precompiles: PrecompileAddresses,
	#[serde(default)]
	pub contracts: ContractAddresses,
	pub features: FeatureFlags,
}

impl NetworkConfig {
	/// Block explorer link for a transaction or extrinsic hash.
	pub fn explorer_url(&self, tx_hash: &str) -> String {
		match self.mode {
			NetworkMode::Local => format!("http://localhost:8545/tx/{}", tx_hash),
			NetworkMode::Testnet => format!("https://paseo.subscan.io/extrinsic/{}", tx_hash),
			NetworkMode::Production => {
				format!("https://polkadot.subscan.io/extrinsic/{}", tx_hash)
			},
		}
	}

	/// Faucet for test funds; only the testnet has one.
	pub fn faucet_url(&self) -> Option<&'static str> {
		match self.mode {
			NetworkMode::Testnet => Some("https://faucet.paseo.network"),
			_ => None,
		}
	}
}
