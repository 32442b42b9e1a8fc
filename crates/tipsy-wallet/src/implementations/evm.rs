//! EVM wallet backed by a local private key.

use crate::{WalletConnector, WalletError, WalletKind};
use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tipsy_types::SecretString;

/// Local secp256k1 key exposed as a connectable wallet.
pub struct EvmWallet {
	signer: PrivateKeySigner,
	connected: AtomicBool,
}

impl EvmWallet {
	/// Parses a hex private key, with or without `0x`.
	pub fn from_private_key(key: &SecretString) -> Result<Self, WalletError> {
		let signer = key
			.with_exposed(|k| k.trim().parse::<PrivateKeySigner>())
			.map_err(|e| WalletError::InvalidKey(format!("Invalid EVM private key: {}", e)))?;
		Ok(Self {
			signer,
			connected: AtomicBool::new(false),
		})
	}

	pub fn address(&self) -> Address {
		self.signer.address()
	}

	/// The signer bound to `chain_id`, available only while connected.
	pub fn signer(&self, chain_id: u64) -> Option<PrivateKeySigner> {
		self.is_connected()
			.then(|| self.signer.clone().with_chain_id(Some(chain_id)))
	}

	/// Wallet for an alloy provider's signing filler, available only while connected.
	pub fn ethereum_wallet(&self, chain_id: u64) -> Option<EthereumWallet> {
		self.signer(chain_id).map(EthereumWallet::from)
	}
}

impl std::fmt::Debug for EvmWallet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EvmWallet")
			.field("address", &self.address())
			.field("connected", &self.is_connected())
			.finish()
	}
}

#[async_trait]
impl WalletConnector for EvmWallet {
	fn kind(&self) -> WalletKind {
		WalletKind::Evm
	}

	async fn connect(&self) -> Result<Vec<String>, WalletError> {
		self.connected.store(true, Ordering::SeqCst);
		tracing::info!(address = %self.address(), "EVM wallet connected");
		Ok(self.accounts())
	}

	async fn disconnect(&self) {
		if self.connected.swap(false, Ordering::SeqCst) {
			tracing::info!(address = %self.address(), "EVM wallet disconnected");
		}
	}

	fn accounts(&self) -> Vec<String> {
		if self.is_connected() {
			vec![self.address().to_checksum(None)]
		} else {
			Vec::new()
		}
	}

	fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}
}
