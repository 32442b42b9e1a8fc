//! Reserve-transfer message construction.

use super::assets::{
	AssetKind, XcmAsset, ASSETS_PALLET_INSTANCE, PASSET_HUB_PARA_ID, TIPCARD, USDC, USDP,
};
use super::types::{
	Asset, AssetInstance, Fungibility, Junction, Junctions, Location, VersionedAssets,
	VersionedLocation,
};
use super::BridgeError;
use alloy_primitives::Address;
use parity_scale_codec::Encode;
use serde::Serialize;
use std::str::FromStr;
use tipsy_types::{is_valid_evm_address, XcmAssetSummary, XcmDecodedSummary, XcmMessageSummary};

/// Arguments of `PolkadotXcm::limited_reserve_transfer_assets`, minus the
/// weight limit.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Serialize)]
pub struct ReserveTransferMessage {
	pub dest: VersionedLocation,
	pub beneficiary: VersionedLocation,
	pub assets: VersionedAssets,
	pub fee_asset_item: u32,
}

impl ReserveTransferMessage {
	pub fn encoded_hex(&self) -> String {
		format!("0x{}", hex::encode(self.encode()))
	}

	/// Encoded bytes plus the decoded view shown in the activity feed.
	pub fn summary(&self, asset: &XcmAsset, amount: u128, beneficiary: &str) -> XcmMessageSummary {
		let destination = match &self.dest {
			VersionedLocation::V4(location) => match &location.interior {
				Junctions::X1([Junction::Parachain(id)]) => {
					format!("Parachain({})", id)
				},
				other => format!("{:?}", other),
			},
		};
		XcmMessageSummary {
			encoded: self.encoded_hex(),
			decoded: XcmDecodedSummary {
				method: "reserve_transfer_assets".to_string(),
				destination,
				beneficiary: beneficiary.to_string(),
				assets: vec![XcmAssetSummary {
					id: asset.symbol.to_string(),
					amount: asset.display_amount(amount),
				}],
				fee: format!("0.001 {}", asset.symbol),
			},
		}
	}
}

/// Builds reserve transfers from AssetHub to one destination parachain.
#[derive(Debug, Clone)]
pub struct XcmMessageBuilder {
	destination_para_id: u32,
}

impl Default for XcmMessageBuilder {
	fn default() -> Self {
		Self::new(PASSET_HUB_PARA_ID)
	}
}

fn beneficiary_key(beneficiary: &str) -> Result<[u8; 20], BridgeError> {
	if !is_valid_evm_address(beneficiary) {
		return Err(BridgeError::InvalidBeneficiary(beneficiary.to_string()));
	}
	Address::from_str(beneficiary)
		.map(|address| address.0 .0)
		.map_err(|_| BridgeError::InvalidBeneficiary(beneficiary.to_string()))
}

impl XcmMessageBuilder {
	pub fn new(destination_para_id: u32) -> Self {
		Self {
			destination_para_id,
		}
	}

	pub fn destination_para_id(&self) -> u32 {
		self.destination_para_id
	}

	fn message(&self, asset: &XcmAsset, fun: Fungibility, beneficiary: &str) -> Result<ReserveTransferMessage, BridgeError> {
		let key = beneficiary_key(beneficiary)?;
		Ok(ReserveTransferMessage {
			dest: VersionedLocation::V4(Location::parachain(self.destination_para_id)),
			beneficiary: VersionedLocation::V4(Location::account_key20(key)),
			assets: VersionedAssets::V4(vec![Asset {
				id: Location::pallet_asset(ASSETS_PALLET_INSTANCE, asset.asset_id),
				fun,
			}]),
			fee_asset_item: 0,
		})
	}

	/// Moves `amount` raw units of a fungible asset to an EVM beneficiary.
	pub fn fungible_reserve_transfer(
		&self,
		asset: &XcmAsset,
		amount: u128,
		beneficiary: &str,
	) -> Result<ReserveTransferMessage, BridgeError> {
		if asset.kind == AssetKind::NonFungible {
			return Err(BridgeError::UnsupportedAsset(asset.symbol.to_string()));
		}
		self.message(asset, Fungibility::Fungible(amount), beneficiary)
	}

	pub fn reserve_transfer(&self, amount: u128, beneficiary: &str) -> Result<ReserveTransferMessage, BridgeError> {
		self.fungible_reserve_transfer(&USDC, amount, beneficiary)
	}

	pub fn usdp_reserve_transfer(&self, amount: u128, beneficiary: &str) -> Result<ReserveTransferMessage, BridgeError> {
		self.fungible_reserve_transfer(&USDP, amount, beneficiary)
	}

	/// Moves one TipCard NFT. Reserve transfers keep the card's provenance
	/// on AssetHub.
	pub fn nft_reserve_transfer(&self, token_id: u128, beneficiary: &str) -> Result<ReserveTransferMessage, BridgeError> {
		self.message(
			&TIPCARD,
			Fungibility::NonFungible(AssetInstance::Index(token_id)),
			beneficiary,
		)
	}

	/// Always `None`: none of the bridged assets may be teleported.
	pub fn teleport_transfer(&self, _amount: u128, _beneficiary: &str) -> Option<ReserveTransferMessage> {
		tracing::warn!("Teleport is not used for USDC, USDP or TipCards; use a reserve transfer");
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BENEFICIARY: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

	#[test]
	fn test_usdc_message_structure() {
		let message = XcmMessageBuilder::default()
			.reserve_transfer(500_000_000, BENEFICIARY)
			.unwrap();

		let json = serde_json::to_value(&message).unwrap();
		assert_eq!(json["dest"]["V4"]["interior"]["X1"][0]["Parachain"], 1111);
		assert_eq!(json["assets"]["V4"][0]["id"]["interior"]["X2"][0]["PalletInstance"], 50);
		assert_eq!(json["assets"]["V4"][0]["id"]["interior"]["X2"][1]["GeneralIndex"], 31337);
		assert_eq!(json["assets"]["V4"][0]["fun"]["Fungible"], 500_000_000u64);
		assert_eq!(json["fee_asset_item"], 0);
		// fee_asset_item is the trailing little-endian u32.
		assert!(message.encode().ends_with(&[0, 0, 0, 0]));
	}

	#[test]
	fn test_usdp_and_nft_asset_ids() {
		let builder = XcmMessageBuilder::default();
		let usdp = serde_json::to_value(builder.usdp_reserve_transfer(1, BENEFICIARY).unwrap()).unwrap();
		assert_eq!(usdp["assets"]["V4"][0]["id"]["interior"]["X2"][1]["GeneralIndex"], 42069);

		let nft = serde_json::to_value(builder.nft_reserve_transfer(7, BENEFICIARY).unwrap()).unwrap();
		assert_eq!(nft["assets"]["V4"][0]["id"]["interior"]["X2"][1]["GeneralIndex"], 69420);
		assert_eq!(nft["assets"]["V4"][0]["fun"]["NonFungible"]["Index"], 7);
	}

	#[test]
	fn test_invalid_beneficiary_and_teleport() {
		let builder = XcmMessageBuilder::new(2222);
		assert!(matches!(
			builder.reserve_transfer(1, "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY"),
			Err(BridgeError::InvalidBeneficiary(_))
		));
		assert!(matches!(
			builder.fungible_reserve_transfer(&TIPCARD, 1, BENEFICIARY),
			Err(BridgeError::UnsupportedAsset(_))
		));
		assert!(builder.teleport_transfer(1, BENEFICIARY).is_none());
	}

	#[test]
	fn test_summary() {
		let message = XcmMessageBuilder::default()
			.reserve_transfer(1_500_000, BENEFICIARY)
			.unwrap();
		let summary = message.summary(&USDC, 1_500_000, BENEFICIARY);
		assert!(summary.encoded.starts_with("0x04"));
		assert_eq!(summary.decoded.destination, "Parachain(1111)");
		assert_eq!(summary.decoded.assets[0].amount, "1.5 USDC");
		assert_eq!(summary.decoded.fee, "0.001 USDC");
	}
}
