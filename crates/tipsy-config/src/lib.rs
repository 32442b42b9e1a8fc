//! Configuration for the TipsyDot client stack.
//!
//! Configuration is read from a TOML file. Before parsing, every
//! `${VAR}` or `${VAR:-default}` placeholder is replaced with the value of the
//! environment variable, so secrets and endpoints can be injected at start.
//! Adapter sections under `[contracts]` stay as raw TOML tables and are
//! validated by the adapter that consumes them.

pub mod networks;

pub use networks::{network_mode_from_env, resolve_network_mode, NetworkRegistry};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tipsy_types::{ContractSelection, NetworkConfig, NetworkMode, SecretString};

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub app: AppConfig,
	/// Full replacements for built-in registry entries, keyed by mode.
	#[serde(default)]
	pub networks: HashMap<String, NetworkConfig>,
	pub contracts: ContractsConfig,
	#[serde(default)]
	pub wallet: WalletConfig,
	#[serde(default)]
	pub donation: DonationConfig,
	#[serde(default)]
	pub monitor: MonitorConfig,
	#[serde(default)]
	pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
	pub id: String,
	/// `local`, `testnet` or `production`. Unknown values fall back to `local`.
	#[serde(default)]
	pub network_mode: Option<String>,
}

/// Contract adapter selection and per-family adapter settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractsConfig {
	#[serde(default)]
	pub selection: ContractSelection,
	pub evm: Option<toml::Value>,
	pub ink: Option<toml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WalletConfig {
	/// Hex private key of the EVM account.
	pub evm_private_key: Option<SecretString>,
	/// Secret URIs (`//Alice`, mnemonics, raw seeds) of the Substrate accounts.
	#[serde(default)]
	pub substrate_suris: Vec<SecretString>,
}

/// ERC-20 approve + donate flow settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DonationConfig {
	/// Token to approve. Defaults to the registry's mock USDC.
	pub token_address: Option<String>,
	/// Donation contract. Defaults to the registry's donation contract.
	pub contract_address: Option<String>,
	/// Whole-USDC amounts offered to the user.
	#[serde(default = "default_presets")]
	pub presets: Vec<u64>,
	#[serde(default = "default_receipt_timeout_secs")]
	pub receipt_timeout_secs: u64,
}

impl Default for DonationConfig {
	fn default() -> Self {
		Self {
			token_address: None,
			contract_address: None,
			presets: default_presets(),
			receipt_timeout_secs: default_receipt_timeout_secs(),
		}
	}
}

fn default_presets() -> Vec<u64> {
	vec![10, 50, 100]
}

fn default_receipt_timeout_secs() -> u64 {
	300
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
	#[serde(default = "default_true")]
	pub enabled: bool,
	/// Overrides the registry's AssetHub endpoint.
	pub ws_url: Option<String>,
	/// Overrides the registry's USDC asset id.
	pub asset_id: Option<u32>,
}

impl Default for MonitorConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			ws_url: None,
			asset_id: None,
		}
	}
}

fn default_true() -> bool {
	true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeMode {
	#[default]
	Live,
	Demo,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
	#[serde(default)]
	pub mode: BridgeMode,
	/// Chain the reserve transfer is submitted to. Defaults to the registry's AssetHub.
	pub asset_hub_ws: Option<String>,
	#[serde(default = "default_destination_para_id")]
	pub destination_para_id: u32,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			mode: BridgeMode::Live,
			asset_hub_ws: None,
			destination_para_id: default_destination_para_id(),
		}
	}
}

fn default_destination_para_id() -> u32 {
	1111
}

/// Replaces `${VAR}` and `${VAR:-default}` placeholders.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	resolve_placeholders(input, |name| std::env::var(name).ok())
}

fn resolve_placeholders<F>(input: &str, lookup: F) -> Result<String, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut output = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match lookup(name.as_str()) {
			Some(value) => value,
			None => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						name.as_str()
					)))
				},
			},
		};
		output.push_str(&input[last..whole.start()]);
		output.push_str(&value);
		last = whole.end();
	}
	output.push_str(&input[last..]);

	Ok(output)
}

impl Config {
	/// Loads and validates a configuration file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let contents = tokio::fs::read_to_string(path.as_ref()).await?;
		contents.parse()
	}

	/// The active network mode, with invalid values mapped to `local`.
	/// Without `app.network_mode` the `TIPSY_NETWORK_MODE` variable decides.
	pub fn network_mode(&self) -> NetworkMode {
		match self.app.network_mode.as_deref() {
			Some(raw) => resolve_network_mode(Some(raw)),
			None => network_mode_from_env(),
		}
	}

	/// The registry entry for the active mode, honouring `[networks.<mode>]`.
	pub fn network(&self, registry: &NetworkRegistry) -> NetworkConfig {
		let mode = self.network_mode();
		self.networks
			.get(mode.as_str())
			.cloned()
			.unwrap_or_else(|| registry.get(mode))
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.app.id.trim().is_empty() {
			return Err(ConfigError::Validation("App ID cannot be empty".into()));
		}

		for (key, network) in &self.networks {
			let mode: NetworkMode = key.parse().map_err(|e: String| {
				ConfigError::Validation(format!("networks.{}: {}", key, e))
			})?;
			if network.mode != mode {
				return Err(ConfigError::Validation(format!(
					"Network entry '{}' declares mode '{}'",
					key, network.mode
				)));
			}
		}

		if self.contracts.evm.is_none() && self.contracts.ink.is_none() {
			return Err(ConfigError::Validation(
				"At least one of [contracts.evm] or [contracts.ink] must be configured".into(),
			));
		}
		match self.contracts.selection {
			ContractSelection::Evm if self.contracts.evm.is_none() => {
				return Err(ConfigError::Validation(
					"contracts.selection = \"evm\" requires [contracts.evm]".into(),
				));
			},
			ContractSelection::Ink if self.contracts.ink.is_none() => {
				return Err(ConfigError::Validation(
					"contracts.selection = \"ink\" requires [contracts.ink]".into(),
				));
			},
			_ => {},
		}
		for (name, section) in [("evm", &self.contracts.evm), ("ink", &self.contracts.ink)] {
			if let Some(section) = section {
				if !section.is_table() {
					return Err(ConfigError::Validation(format!(
						"contracts.{} must be a table",
						name
					)));
				}
			}
		}

		if self
			.wallet
			.substrate_suris
			.iter()
			.any(|suri| suri.is_empty())
		{
			return Err(ConfigError::Validation(
				"wallet.substrate_suris cannot contain empty entries".into(),
			));
		}

		if self.donation.presets.is_empty() {
			return Err(ConfigError::Validation(
				"donation.presets cannot be empty".into(),
			));
		}
		if self.donation.presets.contains(&0) {
			return Err(ConfigError::Validation(
				"donation.presets must be greater than zero".into(),
			));
		}
		if self.donation.receipt_timeout_secs == 0 {
			return Err(ConfigError::Validation(
				"donation.receipt_timeout_secs must be greater than zero".into(),
			));
		}

		if self.bridge.destination_para_id == 0 {
			return Err(ConfigError::Validation(
				"bridge.destination_para_id must be greater than zero".into(),
			));
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
