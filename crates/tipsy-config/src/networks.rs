//! Built-in chain registry.
//!
//! Each [`NetworkMode`] has a default [`NetworkConfig`]. Endpoint, chain id,
//! para id and asset id defaults can be overridden through `TIPSY_*`
//! environment variables, read once when the registry is built.

use std::collections::HashMap;
use tipsy_types::{
	AssetHubConfig, AssetsConfig, ContractAddresses, EvmChainConfig, FeatureFlags, NativeCurrency,
	NetworkConfig, NetworkMode, PrecompileAddresses,
};

/// Environment variable selecting the active network mode.
pub const NETWORK_MODE_ENV: &str = "TIPSY_NETWORK_MODE";

const ASSETS_PRECOMPILE: &str = "0x0000000000000000000000000000000000000802";
const XCM_PRECOMPILE: &str = "0x0000000000000000000000000000000000000803";
const BALANCE_PRECOMPILE: &str = "0x0000000000000000000000000000000000000801";

/// Resolved chain registry for every network mode.
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
	entries: HashMap<NetworkMode, NetworkConfig>,
}

struct Lookup<F: Fn(&str) -> Option<String>>(F);

impl<F: Fn(&str) -> Option<String>> Lookup<F> {
	fn string(&self, key: &str, default: &str) -> String {
		(self.0)(key).unwrap_or_else(|| default.to_string())
	}

	fn number<T: std::str::FromStr + Copy + std::fmt::Display>(&self, key: &str, default: T) -> T {
		match (self.0)(key) {
			Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
				tracing::warn!(key, value = %raw, default = %default, "Ignoring non-numeric override");
				default
			}),
			None => default,
		}
	}

	fn optional(&self, key: &str) -> Option<String> {
		(self.0)(key).filter(|v| !v.trim().is_empty())
	}

	fn flag(&self, key: &str) -> bool {
		(self.0)(key).as_deref() == Some("true")
	}
}

fn env_prefix(mode: NetworkMode) -> &'static str {
	match mode {
		NetworkMode::Local => "TIPSY_LOCAL",
		NetworkMode::Testnet => "TIPSY_TESTNET",
		NetworkMode::Production => "TIPSY_PROD",
	}
}

impl NetworkRegistry {
	/// Registry built from the process environment.
	pub fn from_env() -> Self {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Registry with defaults only.
	pub fn builtin() -> Self {
		Self::from_lookup(|_| None)
	}

	/// Registry built from an arbitrary key lookup.
	pub fn from_lookup<F>(lookup: F) -> Self
	where
		F: Fn(&str) -> Option<String>,
	{
		let lookup = Lookup(lookup);
		let entries = NetworkMode::ALL
			.into_iter()
			.map(|mode| (mode, build_entry(mode, &lookup)))
			.collect();
		Self { entries }
	}

	pub fn get(&self, mode: NetworkMode) -> NetworkConfig {
		self.entries
			.get(&mode)
			.cloned()
			.unwrap_or_else(|| build_entry(mode, &Lookup(|_: &str| None)))
	}

	/// Replaces the entry for `config.mode`.
	pub fn insert(&mut self, config: NetworkConfig) {
		self.entries.insert(config.mode, config);
	}
}

/// Parses a network mode, falling back to `local` with a warning.
pub fn resolve_network_mode(raw: Option<&str>) -> NetworkMode {
	match raw {
		None => NetworkMode::Local,
		Some(raw) if raw.trim().is_empty() => NetworkMode::Local,
		Some(raw) => raw.parse().unwrap_or_else(|_| {
			tracing::warn!(mode = raw, "Invalid network mode, falling back to local");
			NetworkMode::Local
		}),
	}
}

/// Reads [`NETWORK_MODE_ENV`] from the environment.
pub fn network_mode_from_env() -> NetworkMode {
	resolve_network_mode(std::env::var(NETWORK_MODE_ENV).ok().as_deref())
}

fn build_entry<F: Fn(&str) -> Option<String>>(mode: NetworkMode, env: &Lookup<F>) -> NetworkConfig {
	let p = env_prefix(mode);
	let key = |suffix: &str| format!("{}_{}", p, suffix);

	let (evm_name, rpc, ws, chain_id, para_id, currency) = match mode {
		NetworkMode::Local => (
			"OmniNode",
			"http://localhost:8546",
			"ws://localhost:9945",
			420_420_421u64,
			2000u32,
			("Test DOT", "TDOT"),
		),
		NetworkMode::Testnet => (
			"Moonriver Alpha",
			"https://moonriver-alpha.api.onfinality.io/public",
			"wss://moonriver-alpha.api.onfinality.io/public-ws",
			1285,
			2023,
			("Moonriver", "MOVR"),
		),
		NetworkMode::Production => (
			"Moonbeam",
			"https://rpc.api.moonbeam.network",
			"wss://wss.api.moonbeam.network",
			1284,
			2004,
			("Glimmer", "GLMR"),
		),
	};

	let (hub_name, hub_ws, usdc_asset_id) = match mode {
		NetworkMode::Local => ("Local AssetHub", "ws://localhost:8000", 1337u32),
		NetworkMode::Testnet => (
			"Paseo AssetHub",
			"wss://paseo-asset-hub-rpc.dwellir.com",
			1337,
		),
		NetworkMode::Production => (
			"Polkadot AssetHub",
			"wss://polkadot-asset-hub-rpc.dwellir.com",
			1984,
		),
	};

	let features = match mode {
		NetworkMode::Local => FeatureFlags {
			enable_swap: false,
			enable_liquidity_pools: false,
			enable_real_xcm: true,
			enable_chain_monitor: true,
		},
		NetworkMode::Testnet => FeatureFlags {
			enable_swap: env.flag("TIPSY_ENABLE_SWAP"),
			enable_liquidity_pools: env.flag("TIPSY_ENABLE_LIQUIDITY_POOLS"),
			enable_real_xcm: true,
			enable_chain_monitor: true,
		},
		NetworkMode::Production => FeatureFlags {
			enable_swap: true,
			enable_liquidity_pools: true,
			enable_real_xcm: true,
			enable_chain_monitor: true,
		},
	};

	// Only the local node ships a mock USDC deployment.
	let mock_usdc = match mode {
		NetworkMode::Local => env.optional("TIPSY_MOCK_USDC_CONTRACT"),
		_ => None,
	};

	NetworkConfig {
		mode,
		evm_chain: EvmChainConfig {
			name: evm_name.to_string(),
			rpc_url: env.string(&key("EVM_RPC"), rpc),
			ws_url: env.string(&key("EVM_WS"), ws),
			chain_id: env.number(&key("EVM_CHAIN_ID"), chain_id),
			para_id: env.number(&key("EVM_PARA_ID"), para_id),
			native_currency: NativeCurrency {
				name: currency.0.to_string(),
				symbol: currency.1.to_string(),
				decimals: 18,
			},
		},
		asset_hub: AssetHubConfig {
			name: hub_name.to_string(),
			ws_url: env.string(&key("ASSETHUB_WS"), hub_ws),
			para_id: env.number(&key("ASSETHUB_PARA_ID"), 1000u32),
		},
		assets: AssetsConfig {
			usdc_asset_id: env.number(&key("USDC_ASSET_ID"), usdc_asset_id),
			usdc_decimals: 6,
			usdc_symbol: "USDC".to_string(),
		},
		precompiles: PrecompileAddresses {
			assets: env.string("TIPSY_ASSETS_PRECOMPILE", ASSETS_PRECOMPILE),
			xcm: env.string("TIPSY_XCM_PRECOMPILE", XCM_PRECOMPILE),
			balance: env.string("TIPSY_BALANCE_PRECOMPILE", BALANCE_PRECOMPILE),
		},
		contracts: ContractAddresses {
			donation: env.optional("TIPSY_DONATION_CONTRACT"),
			mock_usdc,
		},
		features,
	}
}
