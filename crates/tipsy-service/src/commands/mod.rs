//! Subcommands of the `tipsy` binary.

use crate::context::{AppContext, ServiceError};
use clap::Subcommand;
use tipsy_types::TransactionResult;

mod bridge;
mod contract;
mod donate;
mod monitor;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
	/// Show the active network and contract state
	Info,
	/// Read a builder record
	Builder { id: u64 },
	/// Read a campaign record
	Campaign { id: u64 },
	/// Read a tip record
	TipRecord { id: u64 },
	/// Register a builder
	Register {
		#[arg(long)]
		name: String,
		#[arg(long)]
		address: String,
	},
	/// Tip a builder in USDC
	Tip {
		#[arg(long)]
		builder: u64,
		/// Decimal USDC amount, e.g. 12.5
		#[arg(long)]
		amount: String,
		#[arg(long, default_value = "")]
		message: String,
	},
	/// Open a funding campaign for a builder
	CreateCampaign {
		#[arg(long)]
		builder: u64,
		/// Decimal USDC target
		#[arg(long)]
		target: String,
		#[arg(long)]
		days: u32,
	},
	/// Approve and donate a preset amount to a featured builder
	Donate {
		/// Index into the featured builders
		#[arg(long, default_value_t = 0)]
		builder: usize,
		/// Whole USDC, one of the configured presets
		#[arg(long)]
		amount: u64,
	},
	/// Reserve-transfer an asset from AssetHub to the destination parachain
	Bridge {
		#[arg(long, default_value = "USDC")]
		asset: String,
		/// Decimal amount for fungibles, the token id for TIPCARD
		#[arg(long)]
		amount: String,
		/// EVM address on the destination chain
		#[arg(long)]
		beneficiary: String,
	},
	/// Follow new blocks and transfers of the watched asset
	Monitor {
		/// Stop after this many blocks; runs until interrupted when omitted
		#[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
		blocks: Option<u64>,
	},
}

pub async fn run(command: Command, context: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
	match command {
		Command::Info => contract::info(context).await,
		Command::Builder { id } => contract::builder(context, id).await,
		Command::Campaign { id } => contract::campaign(context, id).await,
		Command::TipRecord { id } => contract::tip_record(context, id).await,
		Command::Register { name, address } => contract::register(context, &name, &address).await,
		Command::Tip {
			builder,
			amount,
			message,
		} => contract::tip(context, builder, &amount, &message).await,
		Command::CreateCampaign {
			builder,
			target,
			days,
		} => contract::create_campaign(context, builder, &target, days).await,
		Command::Donate { builder, amount } => donate::run(context, builder, amount).await,
		Command::Bridge {
			asset,
			amount,
			beneficiary,
		} => bridge::run(context, &asset, &amount, &beneficiary).await,
		Command::Monitor { blocks } => monitor::run(context, blocks).await,
	}
}

/// Prints a write outcome; a failed transaction becomes an error.
fn report(context: &AppContext, result: &TransactionResult) -> Result<(), ServiceError> {
	println!("Status:   {}", result.status);
	if !result.hash.is_empty() {
		println!("Hash:     {}", result.hash);
		println!("Explorer: {}", context.network.explorer_url(&result.hash));
	}
	if let Some(block) = result.block_number {
		println!("Block:    {}", block);
	}
	match &result.error {
		Some(error) if result.is_failed() => Err(ServiceError::Failed(error.clone())),
		_ => Ok(()),
	}
}
