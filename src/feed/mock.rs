use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::models::{AddressStats, BlockRecord, TxRecord};
use super::{DataSupplier, FetchError, FetchResult};

/// In-memory supplier for tests. Blocks are keyed by height, their id is
/// the record's `id`, and individual calls can be made to fail.
#[derive(Debug, Default)]
pub struct MockSupplier {
    pub recent: Vec<BlockRecord>,
    pub blocks: HashMap<u64, BlockRecord>,
    pub txs: HashMap<String, Vec<TxRecord>>,
    pub addresses: HashMap<String, AddressStats>,
    pub mempool: Vec<TxRecord>,
    pub fail_recent: bool,
    pub fail_txs_for: HashSet<String>,
    pub hash_override: HashMap<u64, String>,
    pub calls: RefCell<Vec<String>>,
}

impl MockSupplier {
    pub fn with_recent(blocks: Vec<BlockRecord>) -> Self {
        let mut mock = Self::default();
        for block in &blocks {
            mock.blocks.insert(block.height, block.clone());
        }
        mock.recent = blocks;
        mock
    }

    fn log(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn unavailable(what: &str) -> FetchError {
        FetchError::Status {
            url: what.to_string(),
            status: 503,
        }
    }
}

impl DataSupplier for MockSupplier {
    async fn fetch_recent_blocks(&self) -> FetchResult<Vec<BlockRecord>> {
        self.log("recent".into());
        if self.fail_recent {
            return Err(Self::unavailable("recent"));
        }
        Ok(self.recent.clone())
    }

    async fn fetch_block_txs(&self, block_id: &str) -> FetchResult<Vec<TxRecord>> {
        self.log(format!("txs:{block_id}"));
        if self.fail_txs_for.contains(block_id) {
            return Err(Self::unavailable(block_id));
        }
        Ok(self.txs.get(block_id).cloned().unwrap_or_default())
    }

    async fn fetch_block_hash(&self, height: u64) -> FetchResult<String> {
        self.log(format!("hash:{height}"));
        if let Some(text) = self.hash_override.get(&height) {
            return Ok(text.clone());
        }
        self.blocks
            .get(&height)
            .map(|b| format!("{}\n", b.id))
            .ok_or_else(|| FetchError::NotFound(format!("block-height/{height}")))
    }

    async fn fetch_block(&self, block_id: &str) -> FetchResult<BlockRecord> {
        self.log(format!("block:{block_id}"));
        self.blocks
            .values()
            .find(|b| b.id == block_id)
            .map(|b| BlockRecord {
                tx_list: Vec::new(),
                is_rbf: false,
                enriched: false,
                ..b.clone()
            })
            .ok_or_else(|| FetchError::NotFound(format!("block/{block_id}")))
    }

    async fn fetch_address_info(&self, address: &str) -> FetchResult<AddressStats> {
        self.log(format!("address:{address}"));
        self.addresses
            .get(address)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("address/{address}")))
    }

    async fn fetch_recent_mempool_txs(&self, limit: usize) -> FetchResult<Vec<TxRecord>> {
        self.log(format!("mempool:{limit}"));
        Ok(self.mempool.iter().take(limit).cloned().collect())
    }
}
