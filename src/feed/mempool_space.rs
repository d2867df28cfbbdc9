use log::debug;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::models::{AddressStats, BlockRecord, RawBlock, TxRecord};
use super::{DataSupplier, FetchError, FetchResult};

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// [`DataSupplier`] backed by a mempool.space-compatible REST API.
#[derive(Debug, Clone)]
pub struct MempoolSpace {
    client: Client,
    base_url: String,
}

impl MempoolSpace {
    pub fn new(base_url: &str) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> FetchResult<reqwest::Response> {
        let url = self.url(path);
        debug!("GET {url}");
        let resp = self.client.get(&url).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(FetchError::NotFound(url)),
            status if !status.is_success() => Err(FetchError::Status {
                url,
                status: status.as_u16(),
            }),
            _ => Ok(resp),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> FetchResult<T> {
        self.get(path)
            .await?
            .json::<T>()
            .await
            .map_err(|e| FetchError::Decode(format!("{path}: {e}")))
    }
}

impl DataSupplier for MempoolSpace {
    async fn fetch_recent_blocks(&self) -> FetchResult<Vec<BlockRecord>> {
        // The v1 listing carries pool and fee extras; the plain one does not.
        let raw: Vec<RawBlock> = self.get_json("v1/blocks").await?;
        Ok(raw.into_iter().map(BlockRecord::from).collect())
    }

    async fn fetch_block_txs(&self, block_id: &str) -> FetchResult<Vec<TxRecord>> {
        self.get_json(&format!("block/{block_id}/txs")).await
    }

    async fn fetch_block_hash(&self, height: u64) -> FetchResult<String> {
        let path = format!("block-height/{height}");
        self.get(&path)
            .await?
            .text()
            .await
            .map_err(|e| FetchError::Decode(format!("{path}: {e}")))
    }

    async fn fetch_block(&self, block_id: &str) -> FetchResult<BlockRecord> {
        let raw: RawBlock = self.get_json(&format!("v1/block/{block_id}")).await?;
        Ok(BlockRecord::from(raw))
    }

    async fn fetch_address_info(&self, address: &str) -> FetchResult<AddressStats> {
        self.get_json(&format!("address/{address}")).await
    }

    async fn fetch_recent_mempool_txs(&self, limit: usize) -> FetchResult<Vec<TxRecord>> {
        let mut txs: Vec<TxRecord> = self.get_json("mempool/recent").await?;
        txs.truncate(limit);
        Ok(txs)
    }
}
