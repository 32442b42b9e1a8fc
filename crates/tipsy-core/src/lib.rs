//! Application logic of the TipsyDot client.
//!
//! This crate holds the pieces a front end drives directly: the donation
//! step workflow, the on-chain activity feed and the XCM reserve-transfer
//! helpers. Everything is constructed explicitly and passed to its users;
//! nothing here is a process-wide singleton.

pub mod activity;
pub mod event_bus;
pub mod workflow;
pub mod xcm;

pub use activity::{
	ActivityTracker, BridgeParams, NftMintParams, SwapParams, TipParams, XcmTransferParams,
};
pub use event_bus::{EventBus, FlowEvent};
pub use workflow::{BuilderProfile, DonationFlow, DonationStep, WorkflowError, BUILDERS};
