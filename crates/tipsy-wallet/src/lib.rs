//! Wallet connectors for the TipsyDot client stack.
//!
//! Two independent connection paths exist: an EVM wallet backed by a local
//! secp256k1 key, and a Substrate wallet backed by one or more sr25519 secret
//! URIs. Each exposes its accounts, `connect`/`disconnect` and a signer. The
//! [`WalletService`] owns both and publishes a [`WalletState`] snapshot on
//! every connection change so contract selection can be re-evaluated.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

pub mod implementations {
	pub mod evm;
	pub mod substrate;
}

pub use implementations::evm::EvmWallet;
pub use implementations::substrate::{SubstrateAccount, SubstrateWallet};

/// Errors that can occur during wallet operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("No Polkadot wallet extension found")]
	NoExtension,
	#[error("No accounts found in Polkadot wallet")]
	NoAccounts,
	#[error("No EVM wallet configured")]
	NoEvmWallet,
	#[error("Wallet not connected")]
	NotConnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletKind {
	Evm,
	Substrate,
}

/// Common surface of both wallet paths.
#[async_trait]
pub trait WalletConnector: Send + Sync {
	fn kind(&self) -> WalletKind;

	/// Enables the wallet and returns its accounts.
	async fn connect(&self) -> Result<Vec<String>, WalletError>;

	async fn disconnect(&self);

	/// Accounts exposed while connected; empty otherwise.
	fn accounts(&self) -> Vec<String>;

	fn is_connected(&self) -> bool;
}

/// Snapshot of both wallet paths, used for contract family detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletState {
	pub evm_connected: bool,
	pub evm_address: Option<String>,
	/// A Substrate key source is configured, connected or not.
	pub substrate_available: bool,
	pub substrate_connected: bool,
	pub substrate_address: Option<String>,
}

/// Owns the configured wallets and broadcasts state changes.
pub struct WalletService {
	evm: Option<Arc<EvmWallet>>,
	substrate: Option<Arc<SubstrateWallet>>,
	state: watch::Sender<WalletState>,
}

impl WalletService {
	pub fn new(evm: Option<EvmWallet>, substrate: Option<SubstrateWallet>) -> Self {
		let service = Self {
			evm: evm.map(Arc::new),
			substrate: substrate.map(Arc::new),
			state: watch::channel(WalletState::default()).0,
		};
		service.publish();
		service
	}

	pub fn evm(&self) -> Option<Arc<EvmWallet>> {
		self.evm.clone()
	}

	pub fn substrate(&self) -> Option<Arc<SubstrateWallet>> {
		self.substrate.clone()
	}

	pub fn state(&self) -> WalletState {
		self.state.borrow().clone()
	}

	/// Receiver notified on every connect/disconnect.
	pub fn subscribe(&self) -> watch::Receiver<WalletState> {
		self.state.subscribe()
	}

	pub async fn connect_evm(&self) -> Result<String, WalletError> {
		let wallet = self.evm.as_ref().ok_or(WalletError::NoEvmWallet)?;
		let accounts = wallet.connect().await?;
		self.publish();
		accounts.into_iter().next().ok_or(WalletError::NotConnected)
	}

	pub async fn disconnect_evm(&self) {
		if let Some(wallet) = &self.evm {
			wallet.disconnect().await;
			self.publish();
		}
	}

	/// Enables the Substrate wallet and returns its first account.
	pub async fn connect_substrate(&self) -> Result<SubstrateAccount, WalletError> {
		let wallet = self.substrate.as_ref().ok_or(WalletError::NoExtension)?;
		wallet.connect().await?;
		self.publish();
		wallet.first_account().ok_or(WalletError::NoAccounts)
	}

	pub async fn disconnect_substrate(&self) {
		if let Some(wallet) = &self.substrate {
			wallet.disconnect().await;
			self.publish();
		}
	}

	fn publish(&self) {
		let evm_address = self
			.evm
			.as_ref()
			.and_then(|w| w.accounts().into_iter().next());
		let substrate_address = self
			.substrate
			.as_ref()
			.and_then(|w| w.accounts().into_iter().next());

		let next = WalletState {
			evm_connected: evm_address.is_some(),
			evm_address,
			substrate_available: self.substrate.is_some(),
			substrate_connected: substrate_address.is_some(),
			substrate_address,
		};
		self.state.send_if_modified(|current| {
			if *current == next {
				false
			} else {
				*current = next;
				true
			}
		});
	}
}
