//! Broadcast channel for donation flow notifications.

use crate::workflow::DonationStep;
use tokio::sync::broadcast;

/// Something a front end should show while a donation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
	StepChanged {
		from: DonationStep,
		to: DonationStep,
	},
	/// Informational toast.
	Notice(String),
	/// Error toast.
	Error(String),
	/// The donation went through.
	Celebrate { tx_hash: String },
}

/// Cloneable handle to the flow's broadcast channel.
///
/// Publishing with no subscriber is not an error for callers; they discard
/// the result with `.ok()`.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<FlowEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn publish(&self, event: FlowEvent) -> Result<usize, broadcast::error::SendError<FlowEvent>> {
		self.sender.send(event)
	}

	pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(64)
	}
}
