pub mod error;
pub mod ingest;
pub mod mempool_space;
pub mod models;

#[cfg(test)]
pub mod mock;

pub use error::{FetchError, FetchResult};
pub use ingest::{fetch_block_by_height, fetch_latest_blocks, parse_block_hash, poll_new_blocks};
pub use mempool_space::MempoolSpace;
pub use models::{AddressStats, BlockRecord, ChainStats, TxInput, TxRecord};

/// Default block explorer REST root.
pub const DEFAULT_API_BASE_URL: &str = "https://mempool.space/api";

/// Source of typed chain records. Every call fails independently; callers
/// decide whether a failure is surfaced or treated as "no update".
#[allow(async_fn_in_trait)]
pub trait DataSupplier {
    /// Most recent blocks, newest first, without transaction lists.
    async fn fetch_recent_blocks(&self) -> FetchResult<Vec<BlockRecord>>;

    /// Transactions of one block (first page).
    async fn fetch_block_txs(&self, block_id: &str) -> FetchResult<Vec<TxRecord>>;

    /// Raw block hash text for a height.
    async fn fetch_block_hash(&self, height: u64) -> FetchResult<String>;

    async fn fetch_block(&self, block_id: &str) -> FetchResult<BlockRecord>;

    async fn fetch_address_info(&self, address: &str) -> FetchResult<AddressStats>;

    /// At most `limit` recently seen unconfirmed transactions.
    async fn fetch_recent_mempool_txs(&self, limit: usize) -> FetchResult<Vec<TxRecord>>;
}
