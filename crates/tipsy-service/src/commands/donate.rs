//! The approve-then-donate flow on the EVM side.

use crate::context::{AppContext, ServiceError};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tipsy_contracts::{AlloyReader, AlloySettings, AlloyWriter, EvmDonationClient};
use tipsy_core::{DonationFlow, DonationStep, EventBus, FlowEvent};
use tipsy_types::{ActivityKind, ActivityStatus, ActivityUpdate, NewActivity};
use tipsy_wallet::WalletError;
use tokio::sync::broadcast::error::RecvError;

pub async fn run(context: &AppContext, builder: usize, amount: u64) -> Result<(), Box<dyn Error>> {
	let (token, donation) = context.donation_addresses()?;
	let wallet = context.wallets.evm().ok_or(WalletError::NoEvmWallet)?;
	let account = context.wallets.connect_evm().await?;

	let timeout = Duration::from_secs(context.config.donation.receipt_timeout_secs);
	let rpc_url = &context.network.evm_chain.rpc_url;
	let reader = AlloyReader::new(
		rpc_url,
		AlloySettings {
			receipt_timeout: timeout,
			..AlloySettings::default()
		},
	)?;
	let writer = AlloyWriter::new(rpc_url, &wallet, context.network.evm_chain.chain_id)?;
	let client = EvmDonationClient::new(token, donation, Arc::new(reader), Arc::new(writer));

	let events = EventBus::default();
	let printer = tokio::spawn(print_events(events.subscribe()));

	let flow = DonationFlow::new(
		Arc::new(client),
		context.config.donation.presets.clone(),
		events,
	)
	.with_receipt_timeout(timeout);
	flow.on_wallet_connected(true);
	flow.select_builder(builder)?;
	flow.select_amount(amount)?;

	let profile = flow.selected_builder();
	let mut activity = NewActivity::new(ActivityKind::Tip);
	activity.from = Some(account);
	activity.to = Some(profile.name.to_string());
	activity.amount = Some(amount.to_string());
	activity.asset = Some("USDC".to_string());
	activity.explanation = Some(format!(
		"Donating {} USDC to {} ({})",
		amount, profile.name, profile.project
	));
	let record = context.activity.add_activity(activity);

	let step = flow.continue_to_approve().await?;
	let update = match (step, flow.donate_hash()) {
		(DonationStep::Complete, Some(hash)) => {
			ActivityUpdate::status(ActivityStatus::Success).with_tx_hash(hash.to_string())
		},
		_ => ActivityUpdate::status(ActivityStatus::Failed),
	};
	context.activity.update_activity(record.id, update);
	let final_step = flow.close();

	// Dropping the flow closes the channel and ends the printer.
	drop(flow);
	printer.await.ok();

	let latest = context.activity.recent(1);
	if let Some(entry) = latest.first() {
		println!("{}: {:?}", entry.id, entry.status);
	}
	if step != DonationStep::Complete {
		return Err(ServiceError::Failed(format!("Donation stopped at step {}", step)).into());
	}
	if let Some(hash) = latest.first().and_then(|a| a.tx_hash.as_deref()) {
		println!("Explorer: {}", context.network.explorer_url(hash));
	}
	tracing::debug!(step = %final_step, "Donation flow closed");
	Ok(())
}

async fn print_events(mut receiver: tokio::sync::broadcast::Receiver<FlowEvent>) {
	loop {
		match receiver.recv().await {
			Ok(FlowEvent::StepChanged { from, to }) => println!("Step:   {} -> {}", from, to),
			Ok(FlowEvent::Notice(message)) => println!("Notice: {}", message),
			Ok(FlowEvent::Error(message)) => println!("Error:  {}", message),
			Ok(FlowEvent::Celebrate { tx_hash }) => println!("Donated in {}", tx_hash),
			Err(RecvError::Lagged(skipped)) => {
				tracing::warn!(skipped, "Flow event printer lagged");
			},
			Err(RecvError::Closed) => break,
		}
	}
}
