//! ERC-20 approve / donate pair used by the donation flow.

use crate::implementations::evm::abi::{IDonation, IERC20};
use crate::{ContractError, EvmReader, EvmWriter};
use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use std::sync::Arc;

/// The two transactions of a donation and their receipts.
#[async_trait]
pub trait DonationClient: Send + Sync {
	/// Approves the donation contract to spend `amount` base units of the token.
	async fn approve(&self, amount: U256) -> Result<B256, ContractError>;

	async fn donate(&self, builder_id: u64, amount: U256) -> Result<B256, ContractError>;

	/// `true` when the transaction executed successfully.
	async fn wait_for_receipt(&self, hash: B256) -> Result<bool, ContractError>;

	/// Token balance of the signing account.
	async fn token_balance(&self) -> Result<U256, ContractError>;
}

pub struct EvmDonationClient {
	token: Address,
	donation: Address,
	reader: Arc<dyn EvmReader>,
	writer: Arc<dyn EvmWriter>,
}

impl EvmDonationClient {
	pub fn new(
		token: Address,
		donation: Address,
		reader: Arc<dyn EvmReader>,
		writer: Arc<dyn EvmWriter>,
	) -> Self {
		Self {
			token,
			donation,
			reader,
			writer,
		}
	}
}

#[async_trait]
impl DonationClient for EvmDonationClient {
	async fn approve(&self, amount: U256) -> Result<B256, ContractError> {
		let call = IERC20::approveCall {
			spender: self.donation,
			amount,
		};
		tracing::debug!(token = %self.token, spender = %self.donation, %amount, "Approving token spend");
		self.writer
			.send(self.token, call.abi_encode().into(), U256::ZERO)
			.await
	}

	async fn donate(&self, builder_id: u64, amount: U256) -> Result<B256, ContractError> {
		let call = IDonation::donateCall {
			builderId: U256::from(builder_id),
			amount,
		};
		self.writer
			.send(self.donation, call.abi_encode().into(), U256::ZERO)
			.await
	}

	async fn wait_for_receipt(&self, hash: B256) -> Result<bool, ContractError> {
		Ok(self.reader.wait_for_receipt(hash).await?.success)
	}

	async fn token_balance(&self) -> Result<U256, ContractError> {
		let call = IERC20::balanceOfCall {
			account: self.writer.address(),
		};
		let output = self
			.reader
			.call(self.token, call.abi_encode().into())
			.await?;
		IERC20::balanceOfCall::abi_decode_returns(&output, true)
			.map(|r| r._0)
			.map_err(|e| ContractError::Decode(format!("balanceOf: {}", e)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::evm::adapter::{LogSink, LogWatch, ReceiptSummary, WatchHandle};
	use alloy_primitives::{address, Bytes};
	use std::sync::Mutex;

	const TOKEN: Address = address!("00000000000000000000000000000000000007c0");
	const DONATION: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
	const OWNER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

	struct Recorder {
		sent: Mutex<Vec<(Address, Bytes)>>,
	}

	#[async_trait]
	impl EvmWriter for Recorder {
		fn address(&self) -> Address {
			OWNER
		}

		fn chain_id(&self) -> u64 {
			420420421
		}

		async fn send(&self, to: Address, data: Bytes, _value: U256) -> Result<B256, ContractError> {
			self.sent.lock().unwrap().push((to, data));
			Ok(B256::repeat_byte(1))
		}
	}

	struct Balances;

	#[async_trait]
	impl EvmReader for Balances {
		async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes, ContractError> {
			Ok(IERC20::balanceOfCall::abi_encode_returns(&(U256::from(42_000_000u64),)).into())
		}

		async fn balance(&self, _address: Address) -> Result<U256, ContractError> {
			Ok(U256::ZERO)
		}

		async fn wait_for_receipt(&self, hash: B256) -> Result<ReceiptSummary, ContractError> {
			Ok(ReceiptSummary {
				hash,
				success: true,
				block_number: Some(1),
				gas_used: 50_000,
				logs: vec![],
			})
		}

		fn watch_logs(&self, _watch: LogWatch, _sink: LogSink) -> WatchHandle {
			WatchHandle::detached()
		}
	}

	#[tokio::test]
	async fn test_approve_then_donate_targets() {
		let writer = Arc::new(Recorder {
			sent: Mutex::new(Vec::new()),
		});
		let client = EvmDonationClient::new(TOKEN, DONATION, Arc::new(Balances), writer.clone());

		let amount = U256::from(10_000_000u64);
		let hash = client.approve(amount).await.unwrap();
		assert!(client.wait_for_receipt(hash).await.unwrap());
		client.donate(2, amount).await.unwrap();

		let sent = writer.sent.lock().unwrap().clone();
		assert_eq!(sent[0].0, TOKEN);
		let approve = IERC20::approveCall::abi_decode(&sent[0].1, true).unwrap();
		assert_eq!(approve.spender, DONATION);
		assert_eq!(approve.amount, amount);

		assert_eq!(sent[1].0, DONATION);
		let donate = IDonation::donateCall::abi_decode(&sent[1].1, true).unwrap();
		assert_eq!(donate.builderId, U256::from(2u64));
	}

	#[tokio::test]
	async fn test_token_balance() {
		let client = EvmDonationClient::new(
			TOKEN,
			DONATION,
			Arc::new(Balances),
			Arc::new(Recorder {
				sent: Mutex::new(Vec::new()),
			}),
		);
		assert_eq!(client.token_balance().await.unwrap(), U256::from(42_000_000u64));
	}
}
