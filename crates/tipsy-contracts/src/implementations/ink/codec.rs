//! SCALE encoding of ink! messages and `ContractsApi_call` dry-runs.

use crate::ContractError;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use parity_scale_codec::{Decode, Encode};

/// ink! flags a reverted execution with bit 0 of `ExecReturnValue::flags`.
pub const REVERT_FLAG: u32 = 1;

pub type Selector = [u8; 4];

/// Default ink! selector: the first four bytes of `blake2b-256(label)`.
pub fn selector(label: &str) -> Selector {
	let digest = Blake2b::<U32>::digest(label.as_bytes());
	[digest[0], digest[1], digest[2], digest[3]]
}

/// Selector followed by the SCALE-encoded argument tuple.
pub fn encode_message<A: Encode>(label: &str, args: A) -> Vec<u8> {
	let mut input = selector(label).to_vec();
	args.encode_to(&mut input);
	input
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct Weight {
	#[codec(compact)]
	pub ref_time: u64,
	#[codec(compact)]
	pub proof_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum StorageDeposit {
	Refund(u128),
	Charge(u128),
}

impl StorageDeposit {
	/// The amount to allow as `storage_deposit_limit` when submitting.
	pub fn charge(&self) -> Option<u128> {
		match self {
			StorageDeposit::Refund(_) => None,
			StorageDeposit::Charge(amount) => Some(*amount),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ExecReturnValue {
	pub flags: u32,
	pub data: Vec<u8>,
}

impl ExecReturnValue {
	pub fn did_revert(&self) -> bool {
		self.flags & REVERT_FLAG != 0
	}
}

/// Arguments of the `ContractsApi_call` runtime API.
#[derive(Debug, Clone, Encode)]
pub struct ContractsCallArgs {
	pub origin: [u8; 32],
	pub dest: [u8; 32],
	pub value: u128,
	pub gas_limit: Option<Weight>,
	pub storage_deposit_limit: Option<u128>,
	pub input_data: Vec<u8>,
}

impl ContractsCallArgs {
	/// A dry-run with unlimited gas and storage deposit.
	pub fn dry_run(origin: [u8; 32], dest: [u8; 32], value: u128, input_data: Vec<u8>) -> Self {
		Self {
			origin,
			dest,
			value,
			gas_limit: None,
			storage_deposit_limit: None,
			input_data,
		}
	}
}

/// The leading fields of a `ContractResult`; trailing event records are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRunOutcome {
	pub gas_consumed: Weight,
	pub gas_required: Weight,
	pub storage_deposit: StorageDeposit,
	pub debug_message: String,
	pub result: Result<ExecReturnValue, String>,
}

impl DryRunOutcome {
	pub fn decode(bytes: &[u8]) -> Result<Self, ContractError> {
		let mut input = bytes;
		let decode_err = |what: &str, e: parity_scale_codec::Error| {
			ContractError::Decode(format!("ContractsApi_call {}: {}", what, e))
		};

		let gas_consumed = Weight::decode(&mut input).map_err(|e| decode_err("gas_consumed", e))?;
		let gas_required = Weight::decode(&mut input).map_err(|e| decode_err("gas_required", e))?;
		let storage_deposit =
			StorageDeposit::decode(&mut input).map_err(|e| decode_err("storage_deposit", e))?;
		let debug_message = Vec::<u8>::decode(&mut input).map_err(|e| decode_err("debug_message", e))?;
		let debug_message = String::from_utf8_lossy(&debug_message).into_owned();

		let result = match u8::decode(&mut input).map_err(|e| decode_err("result", e))? {
			0 => Ok(ExecReturnValue::decode(&mut input).map_err(|e| decode_err("return value", e))?),
			1 => Err(if debug_message.is_empty() {
				"Contract call dispatch error".to_string()
			} else {
				format!("Contract call dispatch error: {}", debug_message)
			}),
			other => {
				return Err(ContractError::Decode(format!(
					"ContractsApi_call result: invalid discriminant {}",
					other
				)))
			},
		};

		Ok(Self {
			gas_consumed,
			gas_required,
			storage_deposit,
			debug_message,
			result,
		})
	}

	/// Message output bytes, or an error for dispatch failures and reverts.
	pub fn into_return_data(self) -> Result<Vec<u8>, ContractError> {
		let value = self.result.map_err(ContractError::TransactionFailed)?;
		if value.did_revert() {
			return Err(ContractError::TransactionFailed("Contract execution reverted".to_string()));
		}
		Ok(value.data)
	}
}

/// Error an ink! dispatcher reports instead of a message result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum LangError {
	#[codec(index = 1)]
	CouldNotReadInput,
}

/// Decodes ink! message output, which is always wrapped in `Result<_, LangError>`.
pub fn decode_message_output<T: Decode>(data: &[u8]) -> Result<T, ContractError> {
	let mut input = data;
	match Result::<T, LangError>::decode(&mut input) {
		Ok(Ok(value)) => Ok(value),
		Ok(Err(e)) => Err(ContractError::Decode(format!("ink! dispatch error: {:?}", e))),
		Err(e) => Err(ContractError::Decode(format!("Failed to decode message output: {}", e))),
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct InkBuilder {
	pub id: u64,
	pub address: [u8; 32],
	pub name: String,
	pub total_received: u128,
	pub tip_count: u64,
	pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct InkCampaign {
	pub id: u64,
	pub builder_id: u64,
	pub target_amount: u128,
	pub raised_amount: u128,
	pub deadline: u64,
	pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct InkTip {
	pub from: [u8; 32],
	pub builder_id: u64,
	pub amount: u128,
	pub message: String,
	pub timestamp: u64,
	pub campaign_id: Option<u64>,
}

/// Message labels of the ink! tipping contract.
pub mod messages {
	pub const GET_BUILDER: &str = "get_builder";
	pub const GET_CAMPAIGN: &str = "get_campaign";
	pub const GET_TIP: &str = "get_tip";
	pub const PROTOCOL_FEE_BPS: &str = "protocol_fee_bps";
	pub const PAUSED: &str = "paused";
	pub const REGISTER_BUILDER: &str = "register_builder";
	pub const TIP: &str = "tip";
	pub const CREATE_CAMPAIGN: &str = "create_campaign";
	pub const SET_PROTOCOL_FEE: &str = "set_protocol_fee";
	pub const SET_PAUSED: &str = "set_paused";
	pub const SET_TREASURY: &str = "set_treasury";
	pub const CALL_SOLIDITY_CONTRACT: &str = "call_solidity_contract";
}
