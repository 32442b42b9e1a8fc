//! Donation step machine.
//!
//! A donation moves Connect -> Select -> Approve -> Donate -> Complete. The
//! Approve and Donate steps each submit one transaction and advance only
//! once its receipt reports success; any failure drops the flow back to
//! Select. There is no error state and nothing is retried automatically.

use crate::event_bus::{EventBus, FlowEvent};
use alloy_primitives::{B256, U256};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tipsy_contracts::DonationClient;
use tipsy_types::USDC_DECIMALS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DonationStep {
	Connect,
	Select,
	Approve,
	Donate,
	Complete,
}

impl fmt::Display for DonationStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			DonationStep::Connect => "connect",
			DonationStep::Select => "select",
			DonationStep::Approve => "approve",
			DonationStep::Donate => "donate",
			DonationStep::Complete => "complete",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
	#[error("Invalid step transition from {from} to {to}")]
	InvalidTransition {
		from: DonationStep,
		to: DonationStep,
	},
	#[error("Expected step {expected}, flow is at {actual}")]
	WrongStep {
		expected: DonationStep,
		actual: DonationStep,
	},
	#[error("Unknown builder index {0}")]
	UnknownBuilder(usize),
	#[error("Amount {0} is not one of the offered presets")]
	InvalidAmount(u64),
}

/// A builder offered by the donation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderProfile {
	pub id: u64,
	pub name: &'static str,
	pub project: &'static str,
	pub description: &'static str,
}

pub const BUILDERS: [BuilderProfile; 3] = [
	BuilderProfile {
		id: 0,
		name: "Alice - Moonbeam",
		project: "EVM Smart Contracts for Polkadot",
		description: "Building seamless Ethereum compatibility on Polkadot",
	},
	BuilderProfile {
		id: 1,
		name: "Bob - Astar",
		project: "WASM & EVM Multi-VM Platform",
		description: "Enabling both WASM and EVM smart contracts",
	},
	BuilderProfile {
		id: 2,
		name: "Charlie - Acala",
		project: "DeFi Hub of Polkadot",
		description: "Building decentralized finance infrastructure",
	},
];

/// Whole-USDC amounts offered when none are configured.
pub const DEFAULT_PRESETS: [u64; 3] = [10, 50, 100];

static TRANSITIONS: Lazy<HashMap<DonationStep, HashSet<DonationStep>>> = Lazy::new(|| {
	use DonationStep::*;
	HashMap::from([
		(Connect, HashSet::from([Select])),
		(Select, HashSet::from([Approve])),
		(Approve, HashSet::from([Donate, Select])),
		(Donate, HashSet::from([Complete, Select])),
		(Complete, HashSet::from([Connect])),
	])
});

fn is_valid_transition(from: DonationStep, to: DonationStep) -> bool {
	TRANSITIONS.get(&from).is_some_and(|next| next.contains(&to))
}

struct FlowState {
	step: DonationStep,
	builder: usize,
	amount: u64,
	approve_hash: Option<B256>,
	donate_hash: Option<B256>,
}

/// Drives one approve-then-donate sequence against a [`DonationClient`].
pub struct DonationFlow {
	client: Arc<dyn DonationClient>,
	events: EventBus,
	presets: Vec<u64>,
	receipt_timeout: Duration,
	state: Mutex<FlowState>,
}

impl DonationFlow {
	pub fn new(client: Arc<dyn DonationClient>, presets: Vec<u64>, events: EventBus) -> Self {
		let presets = if presets.is_empty() {
			DEFAULT_PRESETS.to_vec()
		} else {
			presets
		};
		let amount = presets[0];
		Self {
			client,
			events,
			presets,
			receipt_timeout: Duration::from_secs(300),
			state: Mutex::new(FlowState {
				step: DonationStep::Connect,
				builder: 0,
				amount,
				approve_hash: None,
				donate_hash: None,
			}),
		}
	}

	/// A receipt not seen within `timeout` counts as a failed transaction.
	pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
		self.receipt_timeout = timeout;
		self
	}

	fn state(&self) -> MutexGuard<'_, FlowState> {
		self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	pub fn step(&self) -> DonationStep {
		self.state().step
	}

	pub fn presets(&self) -> &[u64] {
		&self.presets
	}

	pub fn selected_builder(&self) -> BuilderProfile {
		BUILDERS[self.state().builder]
	}

	/// Selected amount in whole USDC.
	pub fn selected_amount(&self) -> u64 {
		self.state().amount
	}

	/// Hash of the last approval, kept for display only.
	pub fn approve_hash(&self) -> Option<B256> {
		self.state().approve_hash
	}

	pub fn donate_hash(&self) -> Option<B256> {
		self.state().donate_hash
	}

	fn transition(&self, to: DonationStep) -> Result<(), WorkflowError> {
		let from = {
			let mut state = self.state();
			let from = state.step;
			if !is_valid_transition(from, to) {
				return Err(WorkflowError::InvalidTransition { from, to });
			}
			state.step = to;
			from
		};
		tracing::debug!(%from, %to, "Donation step changed");
		self.events.publish(FlowEvent::StepChanged { from, to }).ok();
		Ok(())
	}

	fn require_step(&self, expected: DonationStep) -> Result<(), WorkflowError> {
		let actual = self.step();
		if actual != expected {
			return Err(WorkflowError::WrongStep { expected, actual });
		}
		Ok(())
	}

	/// Leaves Connect once the wallet reports a connection.
	pub fn on_wallet_connected(&self, connected: bool) {
		if connected && self.step() == DonationStep::Connect {
			self.transition(DonationStep::Select).ok();
		}
	}

	pub fn select_builder(&self, index: usize) -> Result<(), WorkflowError> {
		self.require_step(DonationStep::Select)?;
		if index >= BUILDERS.len() {
			return Err(WorkflowError::UnknownBuilder(index));
		}
		self.state().builder = index;
		Ok(())
	}

	pub fn select_amount(&self, amount: u64) -> Result<(), WorkflowError> {
		self.require_step(DonationStep::Select)?;
		if !self.presets.contains(&amount) {
			return Err(WorkflowError::InvalidAmount(amount));
		}
		self.state().amount = amount;
		Ok(())
	}

	/// Runs approve then donate for the current selection.
	///
	/// Chain failures are not errors here: they are reported on the event bus
	/// and the flow returns to Select. The returned step is where the flow
	/// ended up.
	#[tracing::instrument(skip(self))]
	pub async fn continue_to_approve(&self) -> Result<DonationStep, WorkflowError> {
		self.transition(DonationStep::Approve)?;

		let (builder, amount) = {
			let state = self.state();
			(BUILDERS[state.builder], state.amount)
		};
		let raw_amount = U256::from(amount) * U256::from(10u64).pow(U256::from(USDC_DECIMALS));

		let approve_hash = match self.client.approve(raw_amount).await {
			Ok(hash) => hash,
			Err(e) => return self.fail("Approval failed", e.to_string()),
		};
		self.state().approve_hash = Some(approve_hash);
		tracing::info!(tx_hash = %approve_hash, amount, "Approval submitted");
		if let Err(reason) = self.confirm(approve_hash).await {
			return self.fail("Approval failed", reason);
		}

		self.transition(DonationStep::Donate)?;
		let donate_hash = match self.client.donate(builder.id, raw_amount).await {
			Ok(hash) => hash,
			Err(e) => return self.fail("Donation failed", e.to_string()),
		};
		self.state().donate_hash = Some(donate_hash);
		tracing::info!(tx_hash = %donate_hash, builder = builder.name, "Donation submitted");
		if let Err(reason) = self.confirm(donate_hash).await {
			return self.fail("Donation failed", reason);
		}

		self.transition(DonationStep::Complete)?;
		self.events
			.publish(FlowEvent::Notice("Donation successful!".to_string()))
			.ok();
		self.events
			.publish(FlowEvent::Celebrate {
				tx_hash: donate_hash.to_string(),
			})
			.ok();
		Ok(DonationStep::Complete)
	}

	async fn confirm(&self, hash: B256) -> Result<(), String> {
		match tokio::time::timeout(self.receipt_timeout, self.client.wait_for_receipt(hash)).await {
			Ok(Ok(true)) => Ok(()),
			Ok(Ok(false)) => Err("transaction reverted".to_string()),
			Ok(Err(e)) => Err(e.to_string()),
			Err(_) => Err(format!(
				"no receipt after {}s",
				self.receipt_timeout.as_secs()
			)),
		}
	}

	fn fail(&self, message: &str, reason: String) -> Result<DonationStep, WorkflowError> {
		tracing::warn!(error = %reason, "{}", message);
		self.events.publish(FlowEvent::Error(message.to_string())).ok();
		self.transition(DonationStep::Select)?;
		Ok(DonationStep::Select)
	}

	/// Closing a completed flow resets the selection and starts over. Closing
	/// at any other step leaves the state alone; the caller drops the flow.
	pub fn close(&self) -> DonationStep {
		if self.step() == DonationStep::Complete && self.transition(DonationStep::Connect).is_ok() {
			let mut state = self.state();
			state.builder = 0;
			state.amount = self.presets[0];
			state.approve_hash = None;
			state.donate_hash = None;
		}
		self.step()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use tipsy_contracts::ContractError;

	#[derive(Default)]
	struct FakeDonations {
		approve_ok: bool,
		approve_receipt_ok: bool,
		donate_receipt_ok: bool,
		hang_receipts: bool,
		donated: Mutex<Vec<(u64, U256)>>,
		receipts: AtomicUsize,
	}

	impl FakeDonations {
		fn happy() -> Self {
			Self {
				approve_ok: true,
				approve_receipt_ok: true,
				donate_receipt_ok: true,
				..Default::default()
			}
		}
	}

	#[async_trait]
	impl DonationClient for FakeDonations {
		async fn approve(&self, _amount: U256) -> Result<B256, ContractError> {
			if self.approve_ok {
				Ok(B256::repeat_byte(0xa1))
			} else {
				Err(ContractError::TransactionFailed("user rejected".into()))
			}
		}

		async fn donate(&self, builder_id: u64, amount: U256) -> Result<B256, ContractError> {
			self.donated.lock().unwrap().push((builder_id, amount));
			Ok(B256::repeat_byte(0xd0))
		}

		async fn wait_for_receipt(&self, hash: B256) -> Result<bool, ContractError> {
			self.receipts.fetch_add(1, Ordering::SeqCst);
			if self.hang_receipts {
				std::future::pending::<()>().await;
			}
			if hash == B256::repeat_byte(0xa1) {
				Ok(self.approve_receipt_ok)
			} else {
				Ok(self.donate_receipt_ok)
			}
		}

		async fn token_balance(&self) -> Result<U256, ContractError> {
			Ok(U256::ZERO)
		}
	}

	fn flow(client: FakeDonations) -> (DonationFlow, Arc<FakeDonations>, EventBus) {
		let client = Arc::new(client);
		let events = EventBus::default();
		let flow = DonationFlow::new(client.clone(), vec![], events.clone());
		(flow, client, events)
	}

	fn drain(rx: &mut tokio::sync::broadcast::Receiver<FlowEvent>) -> Vec<FlowEvent> {
		let mut out = Vec::new();
		while let Ok(event) = rx.try_recv() {
			out.push(event);
		}
		out
	}

	#[test]
	fn test_transition_table() {
		use DonationStep::*;
		assert!(is_valid_transition(Connect, Select));
		assert!(is_valid_transition(Approve, Select));
		assert!(is_valid_transition(Donate, Complete));
		assert!(!is_valid_transition(Select, Complete));
		assert!(!is_valid_transition(Approve, Complete));
		assert!(!is_valid_transition(Connect, Approve));
	}

	#[tokio::test]
	async fn test_happy_path_reaches_complete() {
		let (flow, client, events) = flow(FakeDonations::happy());
		let mut rx = events.subscribe();

		flow.on_wallet_connected(true);
		assert_eq!(flow.step(), DonationStep::Select);
		flow.select_builder(2).unwrap();
		flow.select_amount(50).unwrap();

		assert_eq!(flow.continue_to_approve().await.unwrap(), DonationStep::Complete);
		assert_eq!(
			client.donated.lock().unwrap().as_slice(),
			&[(2, U256::from(50_000_000u64))]
		);

		let events = drain(&mut rx);
		assert!(events.contains(&FlowEvent::StepChanged {
			from: DonationStep::Donate,
			to: DonationStep::Complete,
		}));
		assert!(matches!(events.last(), Some(FlowEvent::Celebrate { .. })));
	}

	#[tokio::test]
	async fn test_failed_approval_receipt_returns_to_select() {
		let (flow, client, events) = flow(FakeDonations {
			approve_ok: true,
			approve_receipt_ok: false,
			donate_receipt_ok: true,
			..Default::default()
		});
		let mut rx = events.subscribe();
		flow.on_wallet_connected(true);

		assert_eq!(flow.continue_to_approve().await.unwrap(), DonationStep::Select);
		assert!(client.donated.lock().unwrap().is_empty());
		// The hash stays visible after the failure.
		assert_eq!(flow.approve_hash(), Some(B256::repeat_byte(0xa1)));
		assert!(drain(&mut rx).contains(&FlowEvent::Error("Approval failed".into())));
	}

	#[tokio::test]
	async fn test_failed_donation_receipt_never_completes() {
		let (flow, _client, events) = flow(FakeDonations {
			approve_ok: true,
			approve_receipt_ok: true,
			donate_receipt_ok: false,
			..Default::default()
		});
		let mut rx = events.subscribe();
		flow.on_wallet_connected(true);

		assert_eq!(flow.continue_to_approve().await.unwrap(), DonationStep::Select);
		let events = drain(&mut rx);
		assert!(events.contains(&FlowEvent::Error("Donation failed".into())));
		assert!(!events.iter().any(|e| matches!(e, FlowEvent::Celebrate { .. })));
	}

	#[tokio::test]
	async fn test_submission_error_returns_to_select() {
		let (flow, client, _events) = flow(FakeDonations::default());
		flow.on_wallet_connected(true);
		assert_eq!(flow.continue_to_approve().await.unwrap(), DonationStep::Select);
		assert_eq!(client.receipts.load(Ordering::SeqCst), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_receipt_timeout_counts_as_failure() {
		let client = Arc::new(FakeDonations {
			hang_receipts: true,
			..FakeDonations::happy()
		});
		let flow = DonationFlow::new(client, vec![10], EventBus::default())
			.with_receipt_timeout(Duration::from_secs(5));
		flow.on_wallet_connected(true);
		assert_eq!(flow.continue_to_approve().await.unwrap(), DonationStep::Select);
	}

	#[tokio::test]
	async fn test_selection_rules() {
		let (flow, _client, _events) = flow(FakeDonations::happy());
		assert_eq!(
			flow.select_builder(1),
			Err(WorkflowError::WrongStep {
				expected: DonationStep::Select,
				actual: DonationStep::Connect,
			})
		);
		assert!(matches!(
			flow.continue_to_approve().await,
			Err(WorkflowError::InvalidTransition { .. })
		));

		flow.on_wallet_connected(true);
		assert_eq!(flow.select_builder(3), Err(WorkflowError::UnknownBuilder(3)));
		assert_eq!(flow.select_amount(25), Err(WorkflowError::InvalidAmount(25)));
		assert_eq!(flow.selected_amount(), 10);
		assert_eq!(flow.selected_builder().name, "Alice - Moonbeam");
	}

	#[tokio::test]
	async fn test_close_resets_only_after_completion() {
		let (flow, _client, _events) = flow(FakeDonations::happy());
		flow.on_wallet_connected(true);
		flow.select_builder(1).unwrap();
		assert_eq!(flow.close(), DonationStep::Select);
		assert_eq!(flow.selected_builder().id, 1);

		flow.select_amount(100).unwrap();
		flow.continue_to_approve().await.unwrap();
		assert_eq!(flow.close(), DonationStep::Connect);
		assert_eq!(flow.selected_builder().id, 0);
		assert_eq!(flow.selected_amount(), 10);
		assert_eq!(flow.donate_hash(), None);
	}
}
