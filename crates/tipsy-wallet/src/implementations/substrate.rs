//! Substrate wallet backed by sr25519 secret URIs.
//!
//! Stands in for a browser extension: the configured URIs are its accounts,
//! and an empty URI list is an extension with no accounts.

use crate::{WalletConnector, WalletError, WalletKind};
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use subxt::utils::AccountId32;
use subxt_signer::sr25519::Keypair;
use subxt_signer::SecretUri;
use tipsy_types::SecretString;

/// One sr25519 account and its signing key.
#[derive(Clone)]
pub struct SubstrateAccount {
	/// SS58 address (generic prefix 42).
	pub address: String,
	keypair: Keypair,
}

impl SubstrateAccount {
	pub fn from_keypair(keypair: Keypair) -> Self {
		let address = AccountId32(keypair.public_key().0).to_string();
		Self { address, keypair }
	}

	pub fn account_id(&self) -> AccountId32 {
		AccountId32(self.keypair.public_key().0)
	}

	pub fn keypair(&self) -> &Keypair {
		&self.keypair
	}
}

impl std::fmt::Debug for SubstrateAccount {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SubstrateAccount")
			.field("address", &self.address)
			.finish_non_exhaustive()
	}
}

pub struct SubstrateWallet {
	accounts: Vec<SubstrateAccount>,
	connected: AtomicBool,
}

impl SubstrateWallet {
	pub fn from_suris(suris: &[SecretString]) -> Result<Self, WalletError> {
		let accounts = suris
			.iter()
			.map(|suri| {
				suri.with_exposed(|raw| {
					let uri = SecretUri::from_str(raw)
						.map_err(|e| WalletError::InvalidKey(format!("Invalid secret URI: {}", e)))?;
					Keypair::from_uri(&uri)
						.map(SubstrateAccount::from_keypair)
						.map_err(|e| WalletError::InvalidKey(format!("Invalid sr25519 key: {}", e)))
				})
			})
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self::from_accounts(accounts))
	}

	pub fn from_accounts(accounts: Vec<SubstrateAccount>) -> Self {
		Self {
			accounts,
			connected: AtomicBool::new(false),
		}
	}

	/// First account, available only while connected.
	pub fn first_account(&self) -> Option<SubstrateAccount> {
		if self.is_connected() {
			self.accounts.first().cloned()
		} else {
			None
		}
	}

	pub fn find(&self, address: &str) -> Option<SubstrateAccount> {
		self.accounts.iter().find(|a| a.address == address).cloned()
	}
}

#[async_trait]
impl WalletConnector for SubstrateWallet {
	fn kind(&self) -> WalletKind {
		WalletKind::Substrate
	}

	async fn connect(&self) -> Result<Vec<String>, WalletError> {
		if self.accounts.is_empty() {
			return Err(WalletError::NoAccounts);
		}
		self.connected.store(true, Ordering::SeqCst);
		tracing::info!(accounts = self.accounts.len(), "Substrate wallet connected");
		Ok(self.accounts())
	}

	async fn disconnect(&self) {
		if self.connected.swap(false, Ordering::SeqCst) {
			tracing::info!("Substrate wallet disconnected");
		}
	}

	fn accounts(&self) -> Vec<String> {
		if self.is_connected() {
			self.accounts.iter().map(|a| a.address.clone()).collect()
		} else {
			Vec::new()
		}
	}

	fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}
}
