//! Live AssetHub monitor.
//!
//! The monitor follows best-block headers over one long-lived connection,
//! republishes them as [`ChainInfo`] and scans each block for transfers of a
//! single asset. Both streams are delivered through listener sets.

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tipsy_types::{AssetTransfer, BlockHeader, Callback, ChainInfo, ListenerSet, Subscription};
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};

pub mod implementations {
	pub mod substrate;
}

pub use implementations::substrate::{SubxtChainSource, SubxtConnector};

/// Asset tracked when none is configured.
pub const DEFAULT_ASSET_ID: u32 = 1337;

#[derive(Debug, Error)]
pub enum MonitorError {
	#[error("Not connected")]
	NotConnected,
	#[error("Connection error: {0}")]
	Connection(String),
	#[error("Subscription error: {0}")]
	Subscription(String),
	#[error("Query error: {0}")]
	Query(String),
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
}

/// An `Assets::Transferred` event as found in a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
	pub asset_id: u32,
	pub from: String,
	pub to: String,
	pub amount: u128,
}

pub type HeaderStream = BoxStream<'static, Result<BlockHeader, MonitorError>>;

/// One open connection to a Substrate chain.
#[async_trait]
pub trait ChainSource: Send + Sync {
	async fn chain_name(&self) -> Result<String, MonitorError>;

	async fn latest_header(&self) -> Result<BlockHeader, MonitorError>;

	/// Best-block headers, starting with the next one produced.
	async fn subscribe_headers(&self) -> Result<HeaderStream, MonitorError>;

	/// Every `Assets::Transferred` event of the block.
	async fn asset_transfers(&self, header: &BlockHeader) -> Result<Vec<TransferEvent>, MonitorError>;

	/// `Assets::Account` balance, `None` when the account holds no entry.
	async fn asset_balance(&self, asset_id: u32, address: &str) -> Result<Option<u128>, MonitorError>;
}

#[async_trait]
pub trait ChainConnector: Send + Sync {
	async fn connect(&self) -> Result<Arc<dyn ChainSource>, MonitorError>;
}

struct Connection {
	source: Arc<dyn ChainSource>,
	stop_tx: mpsc::Sender<()>,
	task: JoinHandle<()>,
}

pub struct ChainMonitor {
	connector: Arc<dyn ChainConnector>,
	asset_id: u32,
	connection: Mutex<Option<Connection>>,
	is_connected: AtomicBool,
	blocks: ListenerSet<ChainInfo>,
	transfers: ListenerSet<AssetTransfer>,
}

impl ChainMonitor {
	pub fn new(connector: Arc<dyn ChainConnector>, asset_id: u32) -> Self {
		Self {
			connector,
			asset_id,
			connection: Mutex::new(None),
			is_connected: AtomicBool::new(false),
			blocks: ListenerSet::new(),
			transfers: ListenerSet::new(),
		}
	}

	pub fn asset_id(&self) -> u32 {
		self.asset_id
	}

	pub fn is_connected(&self) -> bool {
		self.is_connected.load(Ordering::SeqCst)
	}

	/// Opens the connection and starts following headers. A second call while
	/// connected does nothing.
	#[tracing::instrument(skip(self), fields(asset_id = self.asset_id))]
	pub async fn connect(&self) -> Result<(), MonitorError> {
		let mut connection = self.connection.lock().await;
		if connection.is_some() {
			return Ok(());
		}

		tracing::info!("Connecting to AssetHub");
		let source = self.connector.connect().await?;
		let chain = source.chain_name().await?;
		tracing::info!(chain = %chain, asset_id = self.asset_id, "Connected to chain");

		let headers = source.subscribe_headers().await?;
		let (stop_tx, stop_rx) = mpsc::channel(1);

		let task = tokio::spawn(Self::process_headers(
			source.clone(),
			chain,
			self.asset_id,
			headers,
			self.blocks.clone(),
			self.transfers.clone(),
			stop_rx,
		));

		*connection = Some(Connection {
			source,
			stop_tx,
			task,
		});
		self.is_connected.store(true, Ordering::SeqCst);
		Ok(())
	}

	async fn process_headers(
		source: Arc<dyn ChainSource>,
		chain: String,
		asset_id: u32,
		mut headers: HeaderStream,
		blocks: ListenerSet<ChainInfo>,
		transfers: ListenerSet<AssetTransfer>,
		mut stop_rx: mpsc::Receiver<()>,
	) {
		// Block scans run beside the header loop so a slow block never holds
		// back the next header or the stop signal.
		let mut scans = JoinSet::new();
		loop {
			tokio::select! {
				next = headers.next() => {
					let header = match next {
						Some(Ok(header)) => header,
						Some(Err(e)) => {
							tracing::warn!(error = %e, "Header subscription error");
							continue;
						}
						None => {
							tracing::info!("Header subscription ended");
							break;
						}
					};

					blocks.emit(&ChainInfo {
						chain: chain.clone(),
						block_number: header.number,
						block_hash: header.hash.clone(),
					});
					scans.spawn(Self::scan_block(source.clone(), asset_id, header, transfers.clone()));
				}
				Some(joined) = scans.join_next(), if !scans.is_empty() => {
					if let Err(e) = joined {
						tracing::warn!(error = %e, "Block scan task failed");
					}
				}
				_ = stop_rx.recv() => {
					break;
				}
			}
		}
		if !scans.is_empty() {
			tracing::debug!(pending = scans.len(), "Aborting block scans");
		}
		scans.shutdown().await;
	}

	async fn scan_block(
		source: Arc<dyn ChainSource>,
		asset_id: u32,
		header: BlockHeader,
		transfers: ListenerSet<AssetTransfer>,
	) {
		match source.asset_transfers(&header).await {
			Ok(events) => {
				for event in events.into_iter().filter(|e| e.asset_id == asset_id) {
					tracing::debug!(block = header.number, amount = event.amount, "Asset transfer");
					transfers.emit(&AssetTransfer {
						asset_id,
						from: event.from,
						to: event.to,
						amount: event.amount,
						block_number: header.number,
						timestamp: Utc::now(),
					});
				}
			},
			Err(e) => {
				tracing::error!(block = header.number, error = %e, "Error checking transfers");
			},
		}
	}

	pub fn on_new_block(&self, callback: Callback<ChainInfo>) -> Subscription {
		self.blocks.subscribe_arc(callback)
	}

	pub fn on_asset_transfer(&self, callback: Callback<AssetTransfer>) -> Subscription {
		self.transfers.subscribe_arc(callback)
	}

	async fn source(&self) -> Result<Arc<dyn ChainSource>, MonitorError> {
		self.connection
			.lock()
			.await
			.as_ref()
			.map(|c| c.source.clone())
			.ok_or(MonitorError::NotConnected)
	}

	/// Balance of the monitored asset; an account without an entry holds zero.
	pub async fn asset_balance(&self, address: &str) -> Result<u128, MonitorError> {
		let source = self.source().await?;
		Ok(source
			.asset_balance(self.asset_id, address)
			.await?
			.unwrap_or(0))
	}

	pub async fn chain_info(&self) -> Result<ChainInfo, MonitorError> {
		let source = self.source().await?;
		let (chain, header) = futures::try_join!(source.chain_name(), source.latest_header())?;
		Ok(ChainInfo {
			chain,
			block_number: header.number,
			block_hash: header.hash,
		})
	}

	/// Stops following headers, drops the connection and removes every listener.
	pub async fn disconnect(&self) {
		let connection = self.connection.lock().await.take();
		if let Some(connection) = connection {
			let _ = connection.stop_tx.send(()).await;
			if let Err(e) = connection.task.await {
				tracing::warn!(error = %e, "Header task did not stop cleanly");
			}
			tracing::info!("Disconnected from AssetHub");
		}
		self.is_connected.store(false, Ordering::SeqCst);
		self.blocks.clear();
		self.transfers.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::AtomicUsize;
	use std::time::Duration;
	use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

	type HeaderFeed = UnboundedSender<Result<BlockHeader, MonitorError>>;

	struct FakeSource {
		headers: std::sync::Mutex<Option<UnboundedReceiver<Result<BlockHeader, MonitorError>>>>,
		failing_block: u64,
		stalled_block: u64,
	}

	#[async_trait]
	impl ChainSource for FakeSource {
		async fn chain_name(&self) -> Result<String, MonitorError> {
			Ok("Polkadot Asset Hub".to_string())
		}

		async fn latest_header(&self) -> Result<BlockHeader, MonitorError> {
			Ok(BlockHeader {
				number: 42,
				hash: "0x42".into(),
			})
		}

		async fn subscribe_headers(&self) -> Result<HeaderStream, MonitorError> {
			let rx = self
				.headers
				.lock()
				.unwrap()
				.take()
				.ok_or_else(|| MonitorError::Subscription("already subscribed".into()))?;
			Ok(futures::stream::unfold(rx, |mut rx| async move {
				rx.recv().await.map(|item| (item, rx))
			})
			.boxed())
		}

		async fn asset_transfers(&self, header: &BlockHeader) -> Result<Vec<TransferEvent>, MonitorError> {
			if header.number == self.failing_block {
				return Err(MonitorError::Query("events unavailable".into()));
			}
			if header.number == self.stalled_block {
				futures::future::pending::<()>().await;
			}
			Ok(vec![
				TransferEvent {
					asset_id: DEFAULT_ASSET_ID,
					from: "alice".into(),
					to: "bob".into(),
					amount: 1_500_000,
				},
				TransferEvent {
					asset_id: 1984,
					from: "alice".into(),
					to: "bob".into(),
					amount: 7,
				},
			])
		}

		async fn asset_balance(&self, _asset_id: u32, address: &str) -> Result<Option<u128>, MonitorError> {
			Ok((address == "alice").then_some(10_000_000))
		}
	}

	struct FakeConnector {
		source: Arc<FakeSource>,
		connects: AtomicUsize,
	}

	#[async_trait]
	impl ChainConnector for FakeConnector {
		async fn connect(&self) -> Result<Arc<dyn ChainSource>, MonitorError> {
			self.connects.fetch_add(1, Ordering::SeqCst);
			Ok(self.source.clone())
		}
	}

	fn monitor(failing_block: u64) -> (ChainMonitor, Arc<FakeConnector>, HeaderFeed) {
		stalling_monitor(failing_block, 0)
	}

	fn stalling_monitor(failing_block: u64, stalled_block: u64) -> (ChainMonitor, Arc<FakeConnector>, HeaderFeed) {
		let (tx, rx) = unbounded_channel();
		let connector = Arc::new(FakeConnector {
			source: Arc::new(FakeSource {
				headers: std::sync::Mutex::new(Some(rx)),
				failing_block,
				stalled_block,
			}),
			connects: AtomicUsize::new(0),
		});
		(ChainMonitor::new(connector.clone(), DEFAULT_ASSET_ID), connector, tx)
	}

	fn header(number: u64) -> Result<BlockHeader, MonitorError> {
		Ok(BlockHeader {
			number,
			hash: format!("0x{:064x}", number),
		})
	}

	async fn recv<T>(rx: &mut UnboundedReceiver<T>) -> T {
		tokio::time::timeout(Duration::from_secs(5), rx.recv())
			.await
			.expect("listener not called in time")
			.expect("listener channel closed")
	}

	#[tokio::test]
	async fn test_connect_is_idempotent() {
		let (monitor, connector, _feed) = monitor(0);
		monitor.connect().await.unwrap();
		monitor.connect().await.unwrap();
		assert!(monitor.is_connected());
		assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
		monitor.disconnect().await;
	}

	#[tokio::test]
	async fn test_blocks_and_matching_transfers_are_published() {
		let (monitor, _connector, feed) = monitor(0);
		let (block_tx, mut block_rx) = unbounded_channel();
		let (transfer_tx, mut transfer_rx) = unbounded_channel();
		let _blocks = monitor.on_new_block(Arc::new(move |info: &ChainInfo| {
			let _ = block_tx.send(info.clone());
		}));
		let _transfers = monitor.on_asset_transfer(Arc::new(move |t: &AssetTransfer| {
			let _ = transfer_tx.send(t.clone());
		}));

		monitor.connect().await.unwrap();
		feed.send(header(100)).unwrap();

		let info = recv(&mut block_rx).await;
		assert_eq!(info.chain, "Polkadot Asset Hub");
		assert_eq!(info.block_number, 100);

		let transfer = recv(&mut transfer_rx).await;
		assert_eq!(transfer.asset_id, DEFAULT_ASSET_ID);
		assert_eq!(transfer.amount, 1_500_000);
		assert_eq!(transfer.block_number, 100);

		monitor.disconnect().await;
		// The 1984 transfer was filtered out.
		assert!(transfer_rx.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_scan_error_does_not_stop_subscription() {
		let (monitor, _connector, feed) = monitor(7);
		let (block_tx, mut block_rx) = unbounded_channel();
		let (transfer_tx, mut transfer_rx) = unbounded_channel();
		let _blocks = monitor.on_new_block(Arc::new(move |info: &ChainInfo| {
			let _ = block_tx.send(info.block_number);
		}));
		let _transfers = monitor.on_asset_transfer(Arc::new(move |t: &AssetTransfer| {
			let _ = transfer_tx.send(t.block_number);
		}));

		monitor.connect().await.unwrap();
		feed.send(header(7)).unwrap();
		feed.send(Err(MonitorError::Subscription("transient".into())))
			.unwrap();
		feed.send(header(8)).unwrap();

		assert_eq!(recv(&mut block_rx).await, 7);
		assert_eq!(recv(&mut block_rx).await, 8);
		assert_eq!(recv(&mut transfer_rx).await, 8);
		monitor.disconnect().await;
	}

	#[tokio::test]
	async fn test_stalled_scan_does_not_block_headers_or_disconnect() {
		let (monitor, _connector, feed) = stalling_monitor(0, 9);
		let (block_tx, mut block_rx) = unbounded_channel();
		let (transfer_tx, mut transfer_rx) = unbounded_channel();
		let _blocks = monitor.on_new_block(Arc::new(move |info: &ChainInfo| {
			let _ = block_tx.send(info.block_number);
		}));
		let _transfers = monitor.on_asset_transfer(Arc::new(move |t: &AssetTransfer| {
			let _ = transfer_tx.send(t.block_number);
		}));

		monitor.connect().await.unwrap();
		feed.send(header(9)).unwrap();
		feed.send(header(10)).unwrap();

		assert_eq!(recv(&mut block_rx).await, 9);
		assert_eq!(recv(&mut block_rx).await, 10);
		assert_eq!(recv(&mut transfer_rx).await, 10);

		tokio::time::timeout(Duration::from_secs(5), monitor.disconnect())
			.await
			.expect("disconnect hung on a stalled scan");
		assert!(!monitor.is_connected());
	}

	#[tokio::test]
	async fn test_queries_allowed_while_disconnect_waits() {
		let (monitor, _connector, feed) = stalling_monitor(0, 3);
		monitor.connect().await.unwrap();
		feed.send(header(3)).unwrap();

		let both = async {
			tokio::join!(monitor.disconnect(), async {
				tokio::task::yield_now().await;
				monitor.asset_balance("alice").await
			})
		};
		let (_, balance) = tokio::time::timeout(Duration::from_secs(5), both)
			.await
			.expect("connection lock held across disconnect");
		assert!(matches!(balance, Err(MonitorError::NotConnected)));
	}

	#[tokio::test]
	async fn test_queries_require_connection() {
		let (monitor, _connector, _feed) = monitor(0);
		assert!(matches!(
			monitor.asset_balance("alice").await,
			Err(MonitorError::NotConnected)
		));
		assert!(matches!(monitor.chain_info().await, Err(MonitorError::NotConnected)));

		monitor.connect().await.unwrap();
		assert_eq!(monitor.asset_balance("alice").await.unwrap(), 10_000_000);
		assert_eq!(monitor.asset_balance("carol").await.unwrap(), 0);
		let info = monitor.chain_info().await.unwrap();
		assert_eq!(info.block_number, 42);
	}

	#[tokio::test]
	async fn test_disconnect_clears_listeners_and_is_idempotent() {
		let (monitor, _connector, _feed) = monitor(0);
		let _sub = monitor.on_new_block(Arc::new(|_: &ChainInfo| {}));
		monitor.connect().await.unwrap();

		monitor.disconnect().await;
		monitor.disconnect().await;
		assert!(!monitor.is_connected());
		assert!(monitor.blocks.is_empty());
		assert!(matches!(
			monitor.asset_balance("alice").await,
			Err(MonitorError::NotConnected)
		));
	}
}
