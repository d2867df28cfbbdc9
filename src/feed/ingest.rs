//! Supplier-side halves of the ingestion protocol: fetching and enriching
//! records before they are handed to the engine.

use futures::future::join_all;
use log::{debug, warn};

use super::models::BlockRecord;
use super::{DataSupplier, FetchError, FetchResult};

/// Attach a block's transaction sample. A failed tx fetch downgrades the
/// block to "no transactions, no RBF" instead of failing it.
pub async fn enrich<S: DataSupplier>(supplier: &S, block: BlockRecord) -> BlockRecord {
    match supplier.fetch_block_txs(&block.id).await {
        Ok(txs) => block.with_transactions(txs),
        Err(e) => {
            warn!(
                "INGEST - tx list for block #{} unavailable, keeping it bare: {}",
                block.height, e
            );
            block.without_transactions()
        }
    }
}

/// Initial load: the recent block window, each enriched concurrently.
pub async fn fetch_latest_blocks<S: DataSupplier>(supplier: &S) -> FetchResult<Vec<BlockRecord>> {
    let blocks = supplier.fetch_recent_blocks().await?;
    Ok(join_all(blocks.into_iter().map(|b| enrich(supplier, b))).await)
}

/// One realtime poll: recent blocks strictly above `frontier`, ascending,
/// each enriched best-effort. A failure of the listing itself aborts the
/// cycle and leaves the caller's state untouched.
pub async fn poll_new_blocks<S: DataSupplier>(
    supplier: &S,
    frontier: Option<u64>,
) -> FetchResult<Vec<BlockRecord>> {
    let mut fresh: Vec<BlockRecord> = supplier
        .fetch_recent_blocks()
        .await?
        .into_iter()
        .filter(|b| frontier.is_none_or(|top| b.height > top))
        .collect();
    fresh.sort_by_key(|b| b.height);
    fresh.dedup_by_key(|b| b.height);

    debug!(
        "POLL - {} new block(s) above frontier {:?}",
        fresh.len(),
        frontier
    );

    let mut enriched = Vec::with_capacity(fresh.len());
    for block in fresh {
        enriched.push(enrich(supplier, block).await);
    }
    Ok(enriched)
}

/// Validate the text returned by a height lookup as a 32-byte hex hash.
pub fn parse_block_hash(text: &str) -> FetchResult<String> {
    let trimmed = text.trim();
    let bytes = hex::decode(trimmed)
        .map_err(|e| FetchError::Decode(format!("block hash {trimmed:?}: {e}")))?;
    if bytes.len() != 32 {
        return Err(FetchError::Decode(format!(
            "block hash {trimmed:?} is {} bytes, expected 32",
            bytes.len()
        )));
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Manual lookup: height → hash → block → transactions. The first two steps
/// fail the whole lookup; the last one only degrades enrichment.
pub async fn fetch_block_by_height<S: DataSupplier>(
    supplier: &S,
    height: u64,
) -> FetchResult<BlockRecord> {
    let hash = parse_block_hash(&supplier.fetch_block_hash(height).await?)?;
    let block = supplier.fetch_block(&hash).await?;
    if block.height != height {
        return Err(FetchError::Decode(format!(
            "block {hash} reports height {}, expected {height}",
            block.height
        )));
    }
    Ok(enrich(supplier, block).await)
}

#[cfg(test)]
mod tests {
    use super::{fetch_block_by_height, fetch_latest_blocks, parse_block_hash, poll_new_blocks};
    use crate::feed::mock::MockSupplier;
    use crate::feed::models::{BlockRecord, TxInput, TxRecord};

    fn rbf_tx() -> TxRecord {
        TxRecord {
            txid: "rbf".into(),
            vin: vec![TxInput { sequence: 0 }],
            fee: None,
            vsize: None,
        }
    }

    fn supplier() -> MockSupplier {
        let blocks = vec![
            BlockRecord::sample(103, 0.3, "Foundry USA"),
            BlockRecord::sample(102, 0.1, "AntPool"),
            BlockRecord::sample(101, 0.2, "F2Pool"),
        ];
        let mut mock = MockSupplier::with_recent(blocks);
        mock.txs.insert(format!("{:064x}", 103), vec![rbf_tx()]);
        mock
    }

    #[actix_web::test]
    async fn latest_blocks_are_enriched() {
        let mock = supplier();
        let blocks = fetch_latest_blocks(&mock).await.expect("recent blocks");
        assert_eq!(blocks.len(), 3);
        assert!(blocks.iter().all(|b| b.enriched));
        assert!(blocks.iter().find(|b| b.height == 103).is_some_and(|b| b.is_rbf));
    }

    #[actix_web::test]
    async fn poll_keeps_only_heights_above_frontier_in_ascending_order() {
        let mock = supplier();
        let fresh = poll_new_blocks(&mock, Some(101)).await.expect("poll");
        let heights: Vec<u64> = fresh.iter().map(|b| b.height).collect();
        assert_eq!(heights, vec![102, 103]);
    }

    #[actix_web::test]
    async fn poll_at_frontier_yields_nothing_and_skips_tx_fetches() {
        let mock = supplier();
        let fresh = poll_new_blocks(&mock, Some(103)).await.expect("poll");
        assert!(fresh.is_empty());
        assert_eq!(mock.calls.borrow().as_slice(), ["recent".to_string()]);
    }

    #[actix_web::test]
    async fn tx_failure_is_isolated_to_its_block() {
        let mut mock = supplier();
        mock.fail_txs_for.insert(format!("{:064x}", 103));
        let fresh = poll_new_blocks(&mock, None).await.expect("poll");
        assert_eq!(fresh.len(), 3);
        let broken = fresh.iter().find(|b| b.height == 103).expect("103 kept");
        assert!(!broken.enriched);
        assert!(!broken.is_rbf);
        assert!(fresh.iter().filter(|b| b.height != 103).all(|b| b.enriched));
    }

    #[actix_web::test]
    async fn listing_failure_aborts_the_poll() {
        let mut mock = supplier();
        mock.fail_recent = true;
        assert!(poll_new_blocks(&mock, Some(1)).await.is_err());
    }

    #[actix_web::test]
    async fn fetch_by_height_walks_hash_then_block_then_txs() {
        let mock = supplier();
        let block = fetch_block_by_height(&mock, 103).await.expect("lookup");
        assert_eq!(block.height, 103);
        assert!(block.is_rbf);
        let calls = mock.calls.borrow();
        assert!(calls[0].starts_with("hash:"));
        assert!(calls[1].starts_with("block:"));
        assert!(calls[2].starts_with("txs:"));
    }

    #[actix_web::test]
    async fn unknown_height_is_not_found() {
        let mock = supplier();
        let err = fetch_block_by_height(&mock, 9).await.expect_err("missing");
        assert!(err.is_not_found());
    }

    #[actix_web::test]
    async fn garbage_hash_is_rejected_before_block_fetch() {
        let mut mock = supplier();
        mock.hash_override.insert(102, "<html>oops</html>".into());
        let err = fetch_block_by_height(&mock, 102).await.expect_err("bad hash");
        assert!(!err.is_not_found());
        assert_eq!(mock.calls.borrow().len(), 1);
    }

    #[test]
    fn block_hash_must_be_32_bytes() {
        assert!(parse_block_hash("abcd").is_err());
        let hash = "00000000000000000002A7C4C1E48D76C5A37902165A270156B7A8D72728A054";
        assert_eq!(
            parse_block_hash(&format!("  {hash}\n")).expect("valid"),
            hash.to_ascii_lowercase()
        );
    }
}
