//! Reads and writes through the unified contract.

use super::report;
use crate::context::{AppContext, ServiceError};
use std::error::Error;
use std::sync::Arc;
use tipsy_contracts::{ContractInterface, UnifiedContract};
use tipsy_types::{format_usdc, parse_usdc};

fn require(unified: &UnifiedContract) -> Result<Arc<dyn ContractInterface>, ServiceError> {
	unified
		.contract()
		.ok_or_else(|| ServiceError::Unavailable("Contract (no wallet type detected)".into()))
}

pub async fn info(context: &AppContext) -> Result<(), Box<dyn Error>> {
	let network = &context.network;
	println!("Network:   {}", network.mode);
	println!(
		"EVM chain: {} (chain id {}, {})",
		network.evm_chain.name, network.evm_chain.chain_id, network.evm_chain.rpc_url
	);
	println!(
		"AssetHub:  {} (para {}, {})",
		network.asset_hub.name, network.asset_hub.para_id, network.asset_hub.ws_url
	);
	if let Some(faucet) = network.faucet_url() {
		println!("Faucet:    {}", faucet);
	}

	let unified = context.contract(false).await?;
	let Some(wallet_type) = unified.wallet_type() else {
		println!("Contract:  not available (no wallet type detected)");
		return Ok(());
	};
	let contract = require(&unified)?;
	println!(
		"Contract:  {} {} (chain id {})",
		contract.family(),
		contract.contract_address(),
		contract.chain_id()
	);
	tracing::debug!(%wallet_type, "Contract family selected");
	println!("Fee:       {} bps", contract.get_protocol_fee().await);
	println!("Paused:    {}", contract.is_paused().await);
	if let Some(address) = unified.address() {
		println!("Account:   {}", address);
		println!("Balance:   {}", contract.get_balance(&address).await);
	}
	Ok(())
}

pub async fn builder(context: &AppContext, id: u64) -> Result<(), Box<dyn Error>> {
	let unified = context.contract(false).await?;
	require(&unified)?;
	let builder = unified
		.fetch_builder(id)
		.await
		.ok_or_else(|| ServiceError::Failed(format!("Builder {} not found", id)))?;
	println!("{}", serde_json::to_string_pretty(&builder)?);
	println!("Total received: {}", format_usdc(builder.total_received));
	Ok(())
}

pub async fn campaign(context: &AppContext, id: u64) -> Result<(), Box<dyn Error>> {
	let unified = context.contract(false).await?;
	require(&unified)?;
	let campaign = unified
		.fetch_campaign(id)
		.await
		.ok_or_else(|| ServiceError::Failed(format!("Campaign {} not found", id)))?;
	println!("{}", serde_json::to_string_pretty(&campaign)?);
	Ok(())
}

pub async fn tip_record(context: &AppContext, id: u64) -> Result<(), Box<dyn Error>> {
	let unified = context.contract(false).await?;
	let tip = require(&unified)?
		.get_tip(id)
		.await
		.ok_or_else(|| ServiceError::Failed(format!("Tip {} not found", id)))?;
	println!("{}", serde_json::to_string_pretty(&tip)?);
	Ok(())
}

pub async fn register(context: &AppContext, name: &str, address: &str) -> Result<(), Box<dyn Error>> {
	let mut unified = context.contract(true).await?;
	let result = unified
		.register_builder(name, address)
		.await
		.ok_or_else(|| ServiceError::Unavailable("Contract".into()))?;
	report(context, &result)?;
	Ok(())
}

pub async fn tip(context: &AppContext, builder_id: u64, amount: &str, message: &str) -> Result<(), Box<dyn Error>> {
	let amount = parse_usdc(amount)?;
	let mut unified = context.contract(true).await?;
	let result = unified
		.send_tip(builder_id, amount, message)
		.await
		.ok_or_else(|| ServiceError::Unavailable("Connected wallet".into()))?;
	report(context, &result)?;
	Ok(())
}

pub async fn create_campaign(
	context: &AppContext,
	builder_id: u64,
	target: &str,
	days: u32,
) -> Result<(), Box<dyn Error>> {
	let target = parse_usdc(target)?;
	let mut unified = context.contract(true).await?;
	let result = unified
		.create_campaign(builder_id, target, days)
		.await
		.ok_or_else(|| ServiceError::Unavailable("Contract".into()))?;
	report(context, &result)?;
	Ok(())
}
