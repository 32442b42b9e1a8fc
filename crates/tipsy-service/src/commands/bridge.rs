//! XCM reserve transfers from AssetHub.

use crate::context::{AppContext, ServiceError};
use std::error::Error;
use std::sync::Arc;
use tipsy_config::BridgeMode;
use tipsy_core::xcm::assets::AssetKind;
use tipsy_core::xcm::{BridgeInterface, SubxtBridge, TransferRequest, XcmAsset, XcmMessageBuilder};
use tipsy_core::XcmTransferParams;
use tipsy_types::{format_token_amount, parse_token_amount, ActivityStatus, ActivityUpdate};

/// Raw units for a fungible amount, the token id for an NFT.
pub(crate) fn parse_amount(asset: &XcmAsset, input: &str) -> Result<u128, ServiceError> {
	match asset.kind {
		AssetKind::Fungible { decimals } => {
			let raw = parse_token_amount(input, decimals)
				.map_err(|e| ServiceError::Failed(e.to_string()))?;
			u128::try_from(raw)
				.map_err(|_| ServiceError::Failed(format!("Amount {} is too large", input)))
		},
		AssetKind::NonFungible => input
			.trim()
			.trim_start_matches('#')
			.parse()
			.map_err(|_| ServiceError::Failed(format!("Invalid token id '{}'", input))),
	}
}

fn amount_label(asset: &XcmAsset, amount: u128) -> String {
	match asset.kind {
		AssetKind::Fungible { decimals } => format_token_amount(alloy_primitives::U256::from(amount), decimals),
		AssetKind::NonFungible => format!("#{}", amount),
	}
}

#[cfg(feature = "demo")]
async fn demo_bridge(
	context: &AppContext,
	builder: XcmMessageBuilder,
) -> Result<(Box<dyn BridgeInterface>, String), ServiceError> {
	tracing::warn!("Bridge runs in demo mode; nothing is submitted");
	let from = match context.wallets.connect_substrate().await {
		Ok(account) => account.address,
		Err(_) => "demo".to_string(),
	};
	Ok((Box::new(tipsy_core::xcm::SimulatedBridge::new(builder)), from))
}

#[cfg(not(feature = "demo"))]
async fn demo_bridge(
	_context: &AppContext,
	_builder: XcmMessageBuilder,
) -> Result<(Box<dyn BridgeInterface>, String), ServiceError> {
	Err(ServiceError::Config(
		"bridge.mode = \"demo\" needs a build with the demo feature".into(),
	))
}

pub async fn run(context: &AppContext, symbol: &str, amount: &str, beneficiary: &str) -> Result<(), Box<dyn Error>> {
	let asset = XcmAsset::by_symbol(symbol)
		.ok_or_else(|| ServiceError::Failed(format!("Unknown asset {}", symbol)))?;
	let request = TransferRequest {
		asset,
		amount: parse_amount(&asset, amount)?,
		beneficiary: beneficiary.to_string(),
	};

	let builder = context.xcm_builder();
	let message = request.build(&builder)?;
	let destination = format!("Parachain({})", builder.destination_para_id());

	let (bridge, from): (Box<dyn BridgeInterface>, String) = match context.config.bridge.mode {
		BridgeMode::Live => {
			let account = context.wallets.connect_substrate().await?;
			let from = account.address.clone();
			let bridge = SubxtBridge::connect(&context.asset_hub_ws(), account, builder).await?;
			(Box::new(bridge), from)
		},
		BridgeMode::Demo => demo_bridge(context, builder).await?,
	};

	let record = context.activity.track_xcm_transfer(XcmTransferParams {
		from,
		to: beneficiary.to_string(),
		amount: amount_label(&asset, request.amount),
		asset: asset.symbol.to_string(),
		destination_chain: destination,
		encoded: Some(message.encoded_hex()),
	});
	if let Some(explanation) = &record.explanation {
		println!("{}", explanation);
	}
	println!("Message:  {}", message.encoded_hex());

	let result = bridge
		.reserve_transfer(&request, Arc::new(|line: &str| println!("Status:   {}", line)))
		.await;
	match result {
		Ok(hash) => {
			context.activity.update_activity(
				record.id,
				ActivityUpdate::status(ActivityStatus::Success).with_tx_hash(hash.clone()),
			);
			let status = bridge.query_status(&hash).await;
			println!("Hash:     {}", status.hash);
			println!("Explorer: {}", context.network.explorer_url(&hash));
			println!("{}", status.message);
			Ok(())
		},
		Err(e) => {
			context
				.activity
				.update_activity(record.id, ActivityUpdate::status(ActivityStatus::Failed));
			Err(e.into())
		},
	}
}
