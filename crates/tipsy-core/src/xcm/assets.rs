//! Assets moved by the bridge and the chains involved.

use alloy_primitives::U256;
use tipsy_types::format_token;

pub const ASSET_HUB_PARA_ID: u32 = 1000;
pub const PASSET_HUB_PARA_ID: u32 = 1111;
pub const TIPSYDOT_PARA_ID: u32 = 2222;

/// Pallet index of `pallet-assets` on AssetHub.
pub const ASSETS_PALLET_INSTANCE: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
	Fungible { decimals: u8 },
	NonFungible,
}

/// How an asset crosses chains. Every asset here is a reserve asset;
/// teleports are only for relay-native tokens moving to system chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
	Reserve,
	Teleport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XcmAsset {
	pub symbol: &'static str,
	pub asset_id: u128,
	pub kind: AssetKind,
	pub transfer: TransferKind,
}

pub const USDC: XcmAsset = XcmAsset {
	symbol: "USDC",
	asset_id: 31337,
	kind: AssetKind::Fungible { decimals: 6 },
	transfer: TransferKind::Reserve,
};

pub const USDP: XcmAsset = XcmAsset {
	symbol: "USDP",
	asset_id: 42069,
	kind: AssetKind::Fungible { decimals: 6 },
	transfer: TransferKind::Reserve,
};

pub const TIPCARD: XcmAsset = XcmAsset {
	symbol: "TIPCARD",
	asset_id: 69420,
	kind: AssetKind::NonFungible,
	transfer: TransferKind::Reserve,
};

pub const ASSETS: [XcmAsset; 3] = [USDC, USDP, TIPCARD];

impl XcmAsset {
	pub fn by_symbol(symbol: &str) -> Option<XcmAsset> {
		ASSETS
			.iter()
			.find(|asset| asset.symbol.eq_ignore_ascii_case(symbol))
			.copied()
	}

	/// `"1.5 USDC"` for fungibles, `"TIPCARD #7"` for NFTs.
	pub fn display_amount(&self, amount: u128) -> String {
		match self.kind {
			AssetKind::Fungible { decimals } => {
				format_token(U256::from(amount), decimals, self.symbol)
			},
			AssetKind::NonFungible => format!("{} #{}", self.symbol, amount),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_catalogue_is_reserve_only() {
		assert!(ASSETS.iter().all(|a| a.transfer == TransferKind::Reserve));
		assert_eq!(XcmAsset::by_symbol("usdp"), Some(USDP));
		assert_eq!(XcmAsset::by_symbol("DOT"), None);
	}

	#[test]
	fn test_display_amount() {
		assert_eq!(USDC.display_amount(1_500_000), "1.5 USDC");
		assert_eq!(TIPCARD.display_amount(7), "TIPCARD #7");
	}
}
