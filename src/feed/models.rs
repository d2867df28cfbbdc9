use serde::{Deserialize, Serialize};

/// Input sequence numbers below this value signal replace-by-fee (BIP125).
pub const RBF_SEQUENCE_MAX: u32 = 0xffff_fffe;

/// Transactions kept per block for satellites and RBF detection.
/// RBF is only inferred from this sample, so a block can signal RBF
/// further down its transaction list without being flagged.
pub const RBF_SAMPLE_SIZE: usize = 10;

pub const SATS_PER_BTC: f64 = 100_000_000.0;

pub const GENESIS_HASH: &str = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";
pub const GENESIS_TIMESTAMP: i64 = 1_231_006_505;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub sequence: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub txid: String,
    #[serde(default)]
    pub vin: Vec<TxInput>,
    #[serde(default)]
    pub fee: Option<u64>,
    #[serde(default)]
    pub vsize: Option<u64>,
}

impl TxRecord {
    pub fn signals_rbf(&self) -> bool {
        self.vin.iter().any(|input| input.sequence < RBF_SEQUENCE_MAX)
    }

    /// sat/vB, when the supplier reported both fee and size.
    pub fn fee_rate(&self) -> Option<f64> {
        match (self.fee, self.vsize) {
            (Some(fee), Some(vsize)) if vsize > 0 => Some(fee as f64 / vsize as f64),
            _ => None,
        }
    }
}

/* ---------- Wire shapes (as served by the block explorer) ---------- */

#[derive(Debug, Clone, Deserialize)]
pub struct RawPool {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBlockExtras {
    #[serde(rename = "totalFees", default)]
    pub total_fees: Option<u64>,
    #[serde(default)]
    pub pool: Option<RawPool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    pub id: String,
    pub height: u64,
    pub timestamp: i64,
    pub tx_count: u64,
    #[serde(default)]
    pub extras: Option<RawBlockExtras>,
}

/* ---------- Validated records consumed by the engine ---------- */

/// A mined block as the engine sees it: fees in BTC, miner resolved,
/// and (when enrichment succeeded) a sample of its transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub id: String,
    pub height: u64,
    pub timestamp: i64,
    pub tx_count: u64,
    pub total_fees: f64,
    pub miner: String,
    pub tx_list: Vec<TxRecord>,
    pub is_rbf: bool,
    /// False when the transaction list could not be fetched.
    pub enriched: bool,
}

impl From<RawBlock> for BlockRecord {
    fn from(raw: RawBlock) -> Self {
        let extras = raw.extras.unwrap_or_default();
        let total_fees = extras.total_fees.unwrap_or(0) as f64 / SATS_PER_BTC;
        let miner = extras
            .pool
            .map(|p| p.name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        Self {
            id: raw.id,
            height: raw.height,
            timestamp: raw.timestamp,
            tx_count: raw.tx_count,
            total_fees,
            miner,
            tx_list: Vec::new(),
            is_rbf: false,
            enriched: false,
        }
    }
}

impl BlockRecord {
    /// The genesis block, seeded into every scene as the spiral's anchor.
    pub fn genesis() -> Self {
        Self {
            id: GENESIS_HASH.to_string(),
            height: 0,
            timestamp: GENESIS_TIMESTAMP,
            tx_count: 1,
            total_fees: 0.0,
            miner: "Satoshi".to_string(),
            tx_list: Vec::new(),
            is_rbf: false,
            enriched: true,
        }
    }

    /// Attach the sampled transaction list and derive the RBF flag from it.
    pub fn with_transactions(mut self, txs: Vec<TxRecord>) -> Self {
        self.tx_list = txs.into_iter().take(RBF_SAMPLE_SIZE).collect();
        self.is_rbf = self.tx_list.iter().any(TxRecord::signals_rbf);
        self.enriched = true;
        self
    }

    /// Record a failed enrichment: no transactions, no RBF signal.
    pub fn without_transactions(mut self) -> Self {
        self.tx_list.clear();
        self.is_rbf = false;
        self.enriched = false;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStats {
    #[serde(default)]
    pub funded_txo_sum: u64,
    #[serde(default)]
    pub spent_txo_sum: u64,
    #[serde(default)]
    pub tx_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressStats {
    #[serde(default)]
    pub chain_stats: ChainStats,
}

impl AddressStats {
    pub fn funded_btc(&self) -> f64 {
        self.chain_stats.funded_txo_sum as f64 / SATS_PER_BTC
    }

    pub fn spent_btc(&self) -> f64 {
        self.chain_stats.spent_txo_sum as f64 / SATS_PER_BTC
    }
}

#[cfg(test)]
impl BlockRecord {
    pub fn sample(height: u64, total_fees: f64, miner: &str) -> Self {
        Self {
            id: format!("{height:064x}"),
            height,
            timestamp: GENESIS_TIMESTAMP + height as i64 * 600,
            tx_count: 2_000 + height % 97,
            total_fees,
            miner: miner.to_string(),
            tx_list: Vec::new(),
            is_rbf: false,
            enriched: true,
        }
    }
}
