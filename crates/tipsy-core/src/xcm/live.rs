//! Live reserve transfers through `pallet-xcm`.

use super::{BridgeError, BridgeInterface, StatusCallback, TransferRequest, XcmMessageBuilder};
use async_trait::async_trait;
use subxt::dynamic::Value;
use subxt::tx::TxStatus;
use subxt::{OnlineClient, PolkadotConfig};
use tipsy_wallet::SubstrateAccount;

/// Signs `PolkadotXcm::limited_reserve_transfer_assets` with a Substrate
/// account and waits for finalization.
pub struct SubxtBridge {
	api: OnlineClient<PolkadotConfig>,
	signer: SubstrateAccount,
	builder: XcmMessageBuilder,
}

impl SubxtBridge {
	pub async fn connect(
		ws_url: &str,
		signer: SubstrateAccount,
		builder: XcmMessageBuilder,
	) -> Result<Self, BridgeError> {
		let api = OnlineClient::<PolkadotConfig>::from_url(ws_url)
			.await
			.map_err(|e| BridgeError::Connection(format!("{}: {}", ws_url, e)))?;
		tracing::info!(url = %ws_url, "Connected to AssetHub");
		Ok(Self {
			api,
			signer,
			builder,
		})
	}
}

#[async_trait]
impl BridgeInterface for SubxtBridge {
	async fn reserve_transfer(
		&self,
		request: &TransferRequest,
		on_status: StatusCallback,
	) -> Result<String, BridgeError> {
		let message = request.build(&self.builder)?;
		on_status("Preparing XCM transfer - verify addresses carefully");
		tracing::info!(
			asset = request.asset.symbol,
			amount = request.amount,
			beneficiary = %request.beneficiary,
			dest_para_id = self.builder.destination_para_id(),
			"Submitting reserve transfer"
		);

		let tx = subxt::dynamic::tx(
			"PolkadotXcm",
			"limited_reserve_transfer_assets",
			vec![
				message.dest.to_value(),
				message.beneficiary.to_value(),
				message.assets.to_value(),
				Value::u128(message.fee_asset_item.into()),
				Value::unnamed_variant("Unlimited", []),
			],
		);

		on_status("Signing transaction...");
		let mut progress = self
			.api
			.tx()
			.sign_and_submit_then_watch_default(&tx, self.signer.keypair())
			.await
			.map_err(|e| BridgeError::Submission(e.to_string()))?;

		while let Some(status) = progress.next().await {
			match status.map_err(|e| BridgeError::Submission(e.to_string()))? {
				TxStatus::InBestBlock(in_block) => {
					on_status(&format!("Transaction included in block {:?}", in_block.block_hash()));
				},
				TxStatus::InFinalizedBlock(in_block) => {
					in_block
						.wait_for_success()
						.await
						.map_err(|e| BridgeError::Submission(e.to_string()))?;
					let hash = format!("0x{}", hex::encode(in_block.extrinsic_hash().0));
					on_status("Transaction finalized - XCM transfer submitted");
					tracing::info!(tx_hash = %hash, "Reserve transfer finalized");
					return Ok(hash);
				},
				TxStatus::Error { message } | TxStatus::Invalid { message } => {
					return Err(BridgeError::Submission(message));
				},
				TxStatus::Dropped { message } => return Err(BridgeError::Dropped(message)),
				_ => continue,
			}
		}

		Err(BridgeError::Dropped("status stream ended".to_string()))
	}
}
