//! XCM v4 locations and assets.
//!
//! Only the subset needed for reserve transfers of pallet-assets tokens is
//! modelled. SCALE indices follow `staging-xcm` v4 so the encoding matches
//! what the chain expects.

use parity_scale_codec::Encode;
use serde::{Serialize, Serializer};
use subxt::dynamic::Value;

fn serialize_key<S: Serializer>(key: &[u8; 20], serializer: S) -> Result<S::Ok, S::Error> {
	serializer.serialize_str(&format!("0x{}", hex::encode(key)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Serialize)]
pub enum NetworkId {
	#[codec(index = 2)]
	Polkadot,
	#[codec(index = 3)]
	Kusama,
	#[codec(index = 7)]
	Ethereum {
		#[codec(compact)]
		chain_id: u64,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Serialize)]
pub enum Junction {
	#[codec(index = 0)]
	Parachain(#[codec(compact)] u32),
	#[codec(index = 3)]
	AccountKey20 {
		network: Option<NetworkId>,
		#[serde(serialize_with = "serialize_key")]
		key: [u8; 20],
	},
	#[codec(index = 4)]
	PalletInstance(u8),
	#[codec(index = 5)]
	GeneralIndex(#[codec(compact)] u128),
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Serialize)]
pub enum Junctions {
	#[codec(index = 0)]
	Here,
	#[codec(index = 1)]
	X1([Junction; 1]),
	#[codec(index = 2)]
	X2([Junction; 2]),
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Serialize)]
pub struct Location {
	pub parents: u8,
	pub interior: Junctions,
}

impl Location {
	pub fn parachain(para_id: u32) -> Self {
		Self {
			parents: 0,
			interior: Junctions::X1([Junction::Parachain(para_id)]),
		}
	}

	pub fn account_key20(key: [u8; 20]) -> Self {
		Self {
			parents: 0,
			interior: Junctions::X1([Junction::AccountKey20 { network: None, key }]),
		}
	}

	/// A pallet-assets token: `X2(PalletInstance, GeneralIndex)`.
	pub fn pallet_asset(pallet_instance: u8, asset_id: u128) -> Self {
		Self {
			parents: 0,
			interior: Junctions::X2([
				Junction::PalletInstance(pallet_instance),
				Junction::GeneralIndex(asset_id),
			]),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Serialize)]
pub enum AssetInstance {
	#[codec(index = 0)]
	Undefined,
	#[codec(index = 1)]
	Index(#[codec(compact)] u128),
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Serialize)]
pub enum Fungibility {
	#[codec(index = 0)]
	Fungible(#[codec(compact)] u128),
	#[codec(index = 1)]
	NonFungible(AssetInstance),
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Serialize)]
pub struct Asset {
	pub id: Location,
	pub fun: Fungibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Serialize)]
pub enum VersionedLocation {
	#[codec(index = 4)]
	V4(Location),
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Serialize)]
pub enum VersionedAssets {
	#[codec(index = 4)]
	V4(Vec<Asset>),
}

fn none() -> Value {
	Value::unnamed_variant("None", [])
}

impl NetworkId {
	fn to_value(&self) -> Value {
		match self {
			NetworkId::Polkadot => Value::unnamed_variant("Polkadot", []),
			NetworkId::Kusama => Value::unnamed_variant("Kusama", []),
			NetworkId::Ethereum { chain_id } => {
				Value::named_variant("Ethereum", [("chain_id", Value::u128((*chain_id).into()))])
			},
		}
	}
}

impl Junction {
	fn to_value(&self) -> Value {
		match self {
			Junction::Parachain(id) => Value::unnamed_variant("Parachain", [Value::u128((*id).into())]),
			Junction::AccountKey20 { network, key } => Value::named_variant(
				"AccountKey20",
				[
					(
						"network",
						match network {
							Some(network) => Value::unnamed_variant("Some", [network.to_value()]),
							None => none(),
						},
					),
					("key", Value::from_bytes(key)),
				],
			),
			Junction::PalletInstance(index) => {
				Value::unnamed_variant("PalletInstance", [Value::u128((*index).into())])
			},
			Junction::GeneralIndex(index) => Value::unnamed_variant("GeneralIndex", [Value::u128(*index)]),
		}
	}
}

impl Location {
	/// Dynamic value for extrinsic construction through subxt.
	pub fn to_value(&self) -> Value {
		let interior = match &self.interior {
			Junctions::Here => Value::unnamed_variant("Here", []),
			Junctions::X1(junctions) => Value::unnamed_variant(
				"X1",
				[Value::unnamed_composite(junctions.iter().map(Junction::to_value))],
			),
			Junctions::X2(junctions) => Value::unnamed_variant(
				"X2",
				[Value::unnamed_composite(junctions.iter().map(Junction::to_value))],
			),
		};
		Value::named_composite([
			("parents", Value::u128(self.parents.into())),
			("interior", interior),
		])
	}
}

impl Asset {
	fn to_value(&self) -> Value {
		let fun = match &self.fun {
			Fungibility::Fungible(amount) => Value::unnamed_variant("Fungible", [Value::u128(*amount)]),
			Fungibility::NonFungible(instance) => {
				let instance = match instance {
					AssetInstance::Undefined => Value::unnamed_variant("Undefined", []),
					AssetInstance::Index(index) => Value::unnamed_variant("Index", [Value::u128(*index)]),
				};
				Value::unnamed_variant("NonFungible", [instance])
			},
		};
		Value::named_composite([
			("id", Value::unnamed_composite([self.id.to_value()])),
			("fun", fun),
		])
	}
}

impl VersionedLocation {
	pub fn to_value(&self) -> Value {
		match self {
			VersionedLocation::V4(location) => Value::unnamed_variant("V4", [location.to_value()]),
		}
	}
}

impl VersionedAssets {
	pub fn to_value(&self) -> Value {
		match self {
			VersionedAssets::V4(assets) => Value::unnamed_variant(
				"V4",
				[Value::unnamed_composite(assets.iter().map(Asset::to_value))],
			),
		}
	}
}
