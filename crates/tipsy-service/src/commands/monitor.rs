//! Live view of AssetHub blocks and transfers of the watched asset.

use crate::context::AppContext;
use std::error::Error;
use std::sync::Arc;
use tipsy_monitor::{ChainMonitor, SubxtConnector};
use tipsy_types::{format_token_amount, AssetTransfer, ChainInfo};
use tokio::sync::mpsc;

pub async fn run(context: &AppContext, blocks: Option<u64>) -> Result<(), Box<dyn Error>> {
	if !context.config.monitor.enabled || !context.network.features.enable_chain_monitor {
		tracing::warn!(network = %context.network.mode, "Chain monitor is disabled");
		return Ok(());
	}

	let (ws_url, asset_id) = context.monitor_target();
	let decimals = context.network.assets.usdc_decimals;
	let monitor = ChainMonitor::new(Arc::new(SubxtConnector::new(&ws_url)), asset_id);
	monitor.connect().await?;

	let info = monitor.chain_info().await?;
	println!("Connected to {} at block #{}", info.chain, info.block_number);

	let (block_tx, mut block_rx) = mpsc::unbounded_channel::<u64>();
	let blocks_sub = monitor.on_new_block(Arc::new(move |info: &ChainInfo| {
		println!("Block #{} {}", info.block_number, info.block_hash);
		block_tx.send(info.block_number).ok();
	}));
	let transfers_sub = monitor.on_asset_transfer(Arc::new(move |transfer: &AssetTransfer| {
		println!(
			"Transfer of {} (asset {}) from {} to {} in block #{}",
			format_token_amount(alloy_primitives::U256::from(transfer.amount), decimals),
			transfer.asset_id,
			transfer.from,
			transfer.to,
			transfer.block_number
		);
	}));

	let mut seen = 0u64;
	loop {
		tokio::select! {
			block = block_rx.recv() => {
				if block.is_none() {
					break;
				}
				seen += 1;
				if blocks.is_some_and(|limit| seen >= limit) {
					break;
				}
			}
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("Interrupted");
				break;
			}
		}
	}

	blocks_sub.unsubscribe();
	transfers_sub.unsubscribe();
	monitor.disconnect().await;
	tracing::info!(blocks = seen, "Monitor stopped");
	Ok(())
}
