//! Wallet-driven selection of the contract family.
//!
//! [`UnifiedContract`] decides whether the EVM or the ink! adapter serves the
//! current session, builds it on demand and exposes the small set of helper
//! operations the UI needs. User-facing outcomes are published as [`Notice`]s.

use crate::factory::{AdapterFactory, ContractHandle};
use crate::{ContractError, ContractInterface};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tipsy_types::{
	Builder, Callback, Campaign, ContractSelection, ListenerSet, Subscription, TransactionResult,
};
use tipsy_wallet::{WalletError, WalletService, WalletState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletType {
	Evm,
	Ink,
}

impl fmt::Display for WalletType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			WalletType::Evm => write!(f, "evm"),
			WalletType::Ink => write!(f, "ink"),
		}
	}
}

/// Forced selection wins; otherwise a connected EVM account means EVM and an
/// available Substrate key source means ink!.
pub fn detect(selection: ContractSelection, state: &WalletState) -> Option<WalletType> {
	match selection {
		ContractSelection::Evm => Some(WalletType::Evm),
		ContractSelection::Ink => Some(WalletType::Ink),
		ContractSelection::Auto if state.evm_connected && state.evm_address.is_some() => {
			Some(WalletType::Evm)
		},
		ContractSelection::Auto if state.substrate_available => Some(WalletType::Ink),
		ContractSelection::Auto => None,
	}
}

/// User-facing outcome of a façade operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
	Success(String),
	Info(String),
	Error(String),
}

#[derive(Debug, Error)]
pub enum UnifiedError {
	#[error("No wallet type detected")]
	NoWalletType,
	#[error("Please connect your EVM wallet")]
	EvmWalletNotConnected,
	#[error(transparent)]
	Wallet(#[from] WalletError),
	#[error(transparent)]
	Contract(#[from] ContractError),
}

pub struct UnifiedContract {
	selection: ContractSelection,
	wallet_type: Option<WalletType>,
	handle: Option<ContractHandle>,
	pending_tx: Option<TransactionResult>,
	last_error: Option<String>,
	substrate_address: Option<String>,
	factory: Arc<dyn AdapterFactory>,
	wallets: Arc<WalletService>,
	notices: ListenerSet<Notice>,
}

impl UnifiedContract {
	pub fn new(
		selection: ContractSelection,
		factory: Arc<dyn AdapterFactory>,
		wallets: Arc<WalletService>,
	) -> Self {
		let wallet_type = detect(selection, &wallets.state());
		Self {
			selection,
			wallet_type,
			handle: None,
			pending_tx: None,
			last_error: None,
			substrate_address: None,
			factory,
			wallets,
			notices: ListenerSet::new(),
		}
	}

	pub fn on_notice(&self, callback: Callback<Notice>) -> Subscription {
		self.notices.subscribe_arc(callback)
	}

	fn notify(&self, notice: Notice) {
		match &notice {
			Notice::Error(message) => tracing::warn!(%message, "Contract notice"),
			Notice::Success(message) | Notice::Info(message) => {
				tracing::info!(%message, "Contract notice")
			},
		}
		self.notices.emit(&notice);
	}

	pub fn wallet_type(&self) -> Option<WalletType> {
		self.wallet_type
	}

	pub fn contract(&self) -> Option<Arc<dyn ContractInterface>> {
		self.handle.as_ref().map(ContractHandle::contract)
	}

	pub fn pending_tx(&self) -> Option<&TransactionResult> {
		self.pending_tx.as_ref()
	}

	pub fn last_error(&self) -> Option<&str> {
		self.last_error.as_deref()
	}

	/// Re-runs detection; a changed type discards the adapter, the connected
	/// Polkadot account and the pending tx.
	pub fn refresh(&mut self) {
		let detected = detect(self.selection, &self.wallets.state());
		if detected != self.wallet_type {
			tracing::debug!(from = ?self.wallet_type, to = ?detected, "Wallet type changed");
			self.wallet_type = detected;
			self.reset_session();
		}
	}

	pub fn switch_wallet_type(&mut self, wallet_type: Option<WalletType>) {
		self.wallet_type = wallet_type;
		self.reset_session();
		self.last_error = None;
	}

	fn reset_session(&mut self) {
		self.handle = None;
		self.substrate_address = None;
		self.pending_tx = None;
	}

	/// Builds the adapter for the current wallet type, replacing any existing one.
	pub async fn initialize(&mut self) -> Result<(), UnifiedError> {
		let Some(wallet_type) = self.wallet_type else {
			return Ok(());
		};

		match self.factory.build(wallet_type, &self.wallets).await {
			Ok(handle) => {
				if let (ContractHandle::Ink(adapter), Some(address)) = (&handle, &self.substrate_address) {
					if let Some(account) = self.wallets.substrate().and_then(|w| w.find(address)) {
						adapter.connect(account);
					}
				}
				self.handle = Some(handle);
				Ok(())
			},
			Err(e) => {
				self.last_error = Some(e.to_string());
				Err(e.into())
			},
		}
	}

	pub async fn connect(&mut self) -> Result<(), UnifiedError> {
		self.last_error = None;
		let result = self.try_connect().await;
		match &result {
			Ok(()) => {
				let message = match self.wallet_type {
					Some(WalletType::Ink) => "Connected to Polkadot wallet",
					_ => "Connected to EVM wallet",
				};
				self.notify(Notice::Success(message.to_string()));
			},
			Err(e) => {
				self.last_error = Some(e.to_string());
				self.notify(Notice::Error(format!("Failed to connect: {}", e)));
			},
		}
		result
	}

	async fn try_connect(&mut self) -> Result<(), UnifiedError> {
		match self.wallet_type.ok_or(UnifiedError::NoWalletType)? {
			WalletType::Ink => {
				if self.handle.is_none() {
					self.initialize().await?;
				}
				let account = self.wallets.connect_substrate().await?;
				if let Some(ContractHandle::Ink(adapter)) = &self.handle {
					adapter.connect(account.clone());
				}
				self.substrate_address = Some(account.address);
				Ok(())
			},
			WalletType::Evm => {
				if !self.wallets.state().evm_connected {
					return Err(UnifiedError::EvmWalletNotConnected);
				}
				// The signer is attached at build time.
				self.initialize().await
			},
		}
	}

	pub async fn disconnect(&mut self) {
		match self.wallet_type {
			Some(WalletType::Ink) => {
				if let Some(ContractHandle::Ink(adapter)) = &self.handle {
					adapter.disconnect();
				}
				self.wallets.disconnect_substrate().await;
				self.substrate_address = None;
			},
			Some(WalletType::Evm) => {
				self.wallets.disconnect_evm().await;
				self.handle = None;
			},
			None => {},
		}
		self.notify(Notice::Info("Disconnected from wallet".to_string()));
	}

	pub fn is_connected(&self) -> bool {
		match self.wallet_type {
			Some(WalletType::Evm) => self.wallets.state().evm_connected,
			Some(WalletType::Ink) => self.substrate_address.is_some(),
			None => false,
		}
	}

	pub fn address(&self) -> Option<String> {
		match self.wallet_type {
			Some(WalletType::Evm) => self.wallets.state().evm_address,
			Some(WalletType::Ink) => self.substrate_address.clone(),
			None => None,
		}
	}

	fn record(&mut self, result: &TransactionResult, action: &str, success: String) {
		if result.is_failed() {
			let error = result.error.clone().unwrap_or_default();
			self.notify(Notice::Error(format!("Failed to {}: {}", action, error)));
			self.last_error = Some(error);
		} else {
			self.notify(Notice::Success(success));
		}
		self.pending_tx = Some(result.clone());
	}

	pub async fn send_tip(&mut self, builder_id: u64, amount: U256, message: &str) -> Option<TransactionResult> {
		let contract = match self.contract() {
			Some(contract) if self.is_connected() => contract,
			_ => {
				self.notify(Notice::Error("Please connect your wallet first".to_string()));
				return None;
			},
		};

		let result = contract.tip(builder_id, amount, message).await;
		let success = match self.wallet_type {
			Some(WalletType::Evm) => {
				format!("Tip sent! Transaction: {}...", result.hash.chars().take(10).collect::<String>())
			},
			_ => "Tip sent successfully!".to_string(),
		};
		self.record(&result, "send tip", success);
		Some(result)
	}

	pub async fn fetch_builder(&self, builder_id: u64) -> Option<Builder> {
		self.contract()?.get_builder(builder_id).await
	}

	pub async fn fetch_campaign(&self, campaign_id: u64) -> Option<Campaign> {
		self.contract()?.get_campaign(campaign_id).await
	}

	pub async fn register_builder(&mut self, name: &str, address: &str) -> Option<TransactionResult> {
		let Some(contract) = self.contract() else {
			self.notify(Notice::Error("Contract not initialized".to_string()));
			return None;
		};
		let result = contract.register_builder(name, address).await;
		self.record(&result, "register builder", "Builder registered successfully!".to_string());
		Some(result)
	}

	pub async fn create_campaign(
		&mut self,
		builder_id: u64,
		target_amount: U256,
		duration_days: u32,
	) -> Option<TransactionResult> {
		let Some(contract) = self.contract() else {
			self.notify(Notice::Error("Contract not initialized".to_string()));
			return None;
		};
		let result = contract
			.create_campaign(builder_id, target_amount, duration_days)
			.await;
		self.record(&result, "create campaign", "Campaign created successfully!".to_string());
		Some(result)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::ink::adapter::{ExtrinsicStatus, InkAdapterOptions, InkClient};
	use crate::{EvmContractAdapter, InkContractAdapter};
	use alloy_primitives::address;
	use async_trait::async_trait;
	use futures::stream::BoxStream;
	use futures::StreamExt;
	use std::sync::Mutex;
	use subxt::utils::AccountId32;
	use tipsy_types::{SecretString, TransactionStatus};
	use tipsy_wallet::{EvmWallet, SubstrateAccount, SubstrateWallet};

	struct FinalizingClient;

	#[async_trait]
	impl InkClient for FinalizingClient {
		async fn dry_run(
			&self,
			_origin: &AccountId32,
			_contract: &AccountId32,
			_input: Vec<u8>,
		) -> Result<Vec<u8>, ContractError> {
			Err(ContractError::Network("offline".into()))
		}

		async fn submit(
			&self,
			_signer: &SubstrateAccount,
			_contract: &AccountId32,
			_input: Vec<u8>,
			_value: u128,
		) -> Result<BoxStream<'static, ExtrinsicStatus>, ContractError> {
			Ok(futures::stream::iter(vec![ExtrinsicStatus::Finalized {
				hash: "0xfeed".into(),
				block_number: Some(3),
			}])
			.boxed())
		}

		async fn free_balance(&self, _account: &AccountId32) -> Result<u128, ContractError> {
			Ok(0)
		}
	}

	#[derive(Default)]
	struct FakeFactory {
		builds: Mutex<Vec<WalletType>>,
	}

	#[async_trait]
	impl AdapterFactory for FakeFactory {
		async fn build(
			&self,
			wallet_type: WalletType,
			_wallets: &WalletService,
		) -> Result<ContractHandle, ContractError> {
			self.builds.lock().unwrap().push(wallet_type);
			Ok(match wallet_type {
				WalletType::Evm => ContractHandle::Evm(Arc::new(EvmContractAdapter::new(
					address!("1234567890123456789012345678901234567890"),
					None,
					None,
				))),
				WalletType::Ink => ContractHandle::Ink(Arc::new(
					InkContractAdapter::new(
						Arc::new(FinalizingClient),
						"5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty",
						InkAdapterOptions::default(),
					)
					.unwrap(),
				)),
			})
		}
	}

	fn wallets(evm: bool, substrate: Option<&[&str]>) -> Arc<WalletService> {
		let evm = evm.then(|| {
			EvmWallet::from_private_key(&SecretString::from(
				"ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
			))
			.unwrap()
		});
		let substrate = substrate.map(|uris| {
			let uris: Vec<SecretString> = uris.iter().map(|u| SecretString::from(*u)).collect();
			SubstrateWallet::from_suris(&uris).unwrap()
		});
		Arc::new(WalletService::new(evm, substrate))
	}

	fn collect_notices(unified: &UnifiedContract) -> (Arc<Mutex<Vec<Notice>>>, Subscription) {
		let notices = Arc::new(Mutex::new(Vec::new()));
		let sink = notices.clone();
		let sub = unified.on_notice(Arc::new(move |n: &Notice| sink.lock().unwrap().push(n.clone())));
		(notices, sub)
	}

	#[test]
	fn test_detect() {
		let mut state = WalletState::default();
		assert_eq!(detect(ContractSelection::Auto, &state), None);
		assert_eq!(detect(ContractSelection::Ink, &state), Some(WalletType::Ink));

		state.substrate_available = true;
		assert_eq!(detect(ContractSelection::Auto, &state), Some(WalletType::Ink));

		state.evm_connected = true;
		state.evm_address = Some("0xabc".into());
		assert_eq!(detect(ContractSelection::Auto, &state), Some(WalletType::Evm));
		assert_eq!(detect(ContractSelection::Ink, &state), Some(WalletType::Ink));
	}

	#[tokio::test]
	async fn test_switch_wallet_type_clears_session_state() {
		let wallets = wallets(false, Some(&["//Alice"]));
		let mut unified = UnifiedContract::new(
			ContractSelection::Auto,
			Arc::new(FakeFactory::default()),
			wallets,
		);
		assert_eq!(unified.wallet_type(), Some(WalletType::Ink));

		unified.connect().await.unwrap();
		let result = unified.send_tip(1, U256::from(1_000u64), "gm").await.unwrap();
		assert_eq!(result.status, TransactionStatus::Success);
		assert!(unified.pending_tx().is_some());
		unified.last_error = Some("stale".into());

		unified.switch_wallet_type(Some(WalletType::Evm));
		assert_eq!(unified.wallet_type(), Some(WalletType::Evm));
		assert!(unified.contract().is_none());
		assert!(unified.pending_tx().is_none());
		assert!(unified.last_error().is_none());
	}

	#[tokio::test]
	async fn test_family_change_drops_polkadot_account() {
		let wallets = wallets(true, Some(&["//Alice"]));
		let mut unified = UnifiedContract::new(
			ContractSelection::Auto,
			Arc::new(FakeFactory::default()),
			wallets.clone(),
		);
		unified.connect().await.unwrap();
		assert!(unified.is_connected());

		unified.switch_wallet_type(Some(WalletType::Evm));
		unified.switch_wallet_type(Some(WalletType::Ink));
		assert!(!unified.is_connected());
		assert!(unified.address().is_none());

		unified.connect().await.unwrap();
		wallets.connect_evm().await.unwrap();
		unified.refresh();
		assert_eq!(unified.wallet_type(), Some(WalletType::Evm));
		wallets.disconnect_evm().await;
		unified.refresh();
		assert_eq!(unified.wallet_type(), Some(WalletType::Ink));
		assert!(!unified.is_connected());
		assert!(unified.address().is_none());
	}

	#[tokio::test]
	async fn test_ink_connect_uses_first_account() {
		let wallets = wallets(false, Some(&["//Alice", "//Bob"]));
		let mut unified = UnifiedContract::new(
			ContractSelection::Ink,
			Arc::new(FakeFactory::default()),
			wallets,
		);
		unified.connect().await.unwrap();
		assert!(unified.is_connected());
		assert_eq!(
			unified.address().as_deref(),
			Some("5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY")
		);
		assert!(unified.contract().unwrap().is_connected());

		unified.disconnect().await;
		assert!(!unified.is_connected());
		assert!(!unified.contract().unwrap().is_connected());
	}

	#[tokio::test]
	async fn test_ink_connect_errors() {
		let mut no_extension = UnifiedContract::new(
			ContractSelection::Ink,
			Arc::new(FakeFactory::default()),
			wallets(false, None),
		);
		let err = no_extension.connect().await.unwrap_err();
		assert_eq!(err.to_string(), "No Polkadot wallet extension found");

		let mut no_accounts = UnifiedContract::new(
			ContractSelection::Ink,
			Arc::new(FakeFactory::default()),
			wallets(false, Some(&[])),
		);
		let (notices, _sub) = collect_notices(&no_accounts);
		let err = no_accounts.connect().await.unwrap_err();
		assert_eq!(err.to_string(), "No accounts found in Polkadot wallet");
		assert_eq!(
			no_accounts.last_error(),
			Some("No accounts found in Polkadot wallet")
		);
		assert_eq!(
			notices.lock().unwrap().last(),
			Some(&Notice::Error(
				"Failed to connect: No accounts found in Polkadot wallet".to_string()
			))
		);
	}

	#[tokio::test]
	async fn test_evm_requires_connected_wallet() {
		let wallets = wallets(true, None);
		let factory = Arc::new(FakeFactory::default());
		let mut unified = UnifiedContract::new(ContractSelection::Evm, factory.clone(), wallets.clone());
		assert!(matches!(
			unified.connect().await,
			Err(UnifiedError::EvmWalletNotConnected)
		));

		wallets.connect_evm().await.unwrap();
		unified.connect().await.unwrap();
		assert!(unified.is_connected());
		assert_eq!(*factory.builds.lock().unwrap(), vec![WalletType::Evm]);
	}

	#[tokio::test]
	async fn test_refresh_follows_wallet_state() {
		let wallets = wallets(true, Some(&["//Alice"]));
		let mut unified = UnifiedContract::new(
			ContractSelection::Auto,
			Arc::new(FakeFactory::default()),
			wallets.clone(),
		);
		assert_eq!(unified.wallet_type(), Some(WalletType::Ink));
		unified.initialize().await.unwrap();
		assert!(unified.contract().is_some());

		wallets.connect_evm().await.unwrap();
		unified.refresh();
		assert_eq!(unified.wallet_type(), Some(WalletType::Evm));
		assert!(unified.contract().is_none());
	}

	#[tokio::test]
	async fn test_helpers_without_contract_or_connection() {
		let mut unified = UnifiedContract::new(
			ContractSelection::Evm,
			Arc::new(FakeFactory::default()),
			wallets(true, None),
		);
		let (notices, _sub) = collect_notices(&unified);

		assert!(unified.send_tip(1, U256::from(1u64), "gm").await.is_none());
		assert!(unified.register_builder("Bob", "0x00").await.is_none());
		assert!(unified.fetch_builder(1).await.is_none());
		assert_eq!(
			*notices.lock().unwrap(),
			vec![
				Notice::Error("Please connect your wallet first".to_string()),
				Notice::Error("Contract not initialized".to_string()),
			]
		);

		// Built but without a signer: the write reports a failed result.
		unified.initialize().await.unwrap();
		let result = unified
			.create_campaign(1, U256::from(100u64), 30)
			.await
			.unwrap();
		assert!(result.is_failed());
		assert!(unified.last_error().is_some());
		assert_eq!(unified.pending_tx().map(|tx| tx.status), Some(TransactionStatus::Failed));
	}
}
