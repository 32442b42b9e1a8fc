//! Solidity ABI of the tipping, donation and ERC-20 contracts.

use alloy_sol_types::sol;

sol! {
	#[derive(Debug, PartialEq, Eq)]
	struct BuilderData {
		uint256 id;
		address builderAddress;
		string name;
		uint256 totalReceived;
		uint256 tipCount;
		bool isActive;
	}

	#[derive(Debug, PartialEq, Eq)]
	struct CampaignData {
		uint256 id;
		uint256 builderId;
		uint256 targetAmount;
		uint256 raisedAmount;
		uint256 deadline;
		bool isActive;
	}

	#[derive(Debug, PartialEq, Eq)]
	struct TipData {
		address from;
		uint256 builderId;
		uint256 amount;
		string message;
		uint256 timestamp;
		uint256 campaignId;
	}

	interface ITipping {
		function getBuilder(uint256 builderId) external view returns (BuilderData memory);
		function getCampaign(uint256 campaignId) external view returns (CampaignData memory);
		function getTip(uint256 tipId) external view returns (TipData memory);
		function protocolFeeBps() external view returns (uint256);
		function paused() external view returns (bool);

		function registerBuilder(string name, address builderAddress) external;
		function tip(uint256 builderId, string message) external payable;
		function createCampaign(uint256 builderId, uint256 targetAmount, uint256 durationDays) external;
		function setProtocolFee(uint256 newFeeBps) external;
		function setPaused(bool isPaused) external;
		function setTreasury(address treasury) external;

		event TipSent(address indexed from, uint256 indexed builderId, uint256 amount, string message, uint256 timestamp);
		event BuilderRegistered(uint256 indexed builderId, address indexed builderAddress, string name);
	}

	interface IERC20 {
		function approve(address spender, uint256 amount) external returns (bool);
		function balanceOf(address account) external view returns (uint256);
	}

	interface IDonation {
		function donate(uint256 builderId, uint256 amount) external;
	}
}
