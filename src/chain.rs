// File: src/chain.rs
// In-memory block store backing the explorer endpoints, plus the demo block producer

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::data_models::{
    BlockDetail, BlockPage, BlockRow, ChainInfo, CountInfo, Page, TransactionDetail, TxInfo,
};
use crate::status::{STATUS_PENDING, STATUS_SUCCESS};

/// Rows returned by the latest-blocks and latest-transactions endpoints
pub const LATEST_ROWS: usize = 8;
/// Cap for the latest-transactions list and the transaction count history
pub const HISTORY_CAP: usize = 500;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub type SharedChain = Arc<RwLock<ChainStore>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub hash: String,
    pub tx_type: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub height: u64,
    pub hash: String,
    pub prev_hash: String,
    pub chain_coord: String,
    pub version: u16,
    /// Unix seconds
    pub timestamp: i64,
    pub formulator: String,
    pub timeout_count: u32,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Success when the block was formed without timeouts, pending otherwise
    pub fn status(&self) -> i64 {
        if self.timeout_count > 0 { STATUS_PENDING } else { STATUS_SUCCESS }
    }

    pub fn to_row(&self) -> BlockRow {
        BlockRow {
            height: self.height,
            hash: self.hash.clone(),
            time: format_time(self.timestamp),
            status: self.status(),
            tx_count: self.transactions.len() as u64,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("block height {expected} expected, got {got}")]
    OutOfOrder { expected: u64, got: u64 },
}

/// Blocks by height with hash, transaction and formulator indexes
#[derive(Debug, Default)]
pub struct ChainStore {
    blocks: Vec<Block>,
    by_hash: HashMap<String, u64>,
    tx_index: HashMap<String, (u64, usize)>,
    formulator_blocks: HashMap<String, u64>,
    latest_transactions: VecDeque<TxInfo>,
    transaction_counts: VecDeque<CountInfo>,
    info: ChainInfo,
}

impl ChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedChain {
        Arc::new(RwLock::new(self))
    }

    /// Height of the tip; 0 for an empty chain
    pub fn height(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Append the next block; heights start at 1 and must be contiguous
    pub fn push_block(&mut self, block: Block) -> Result<(), ChainError> {
        let expected = self.height() + 1;
        if block.height != expected {
            return Err(ChainError::OutOfOrder { expected, got: block.height });
        }

        self.by_hash.insert(block.hash.clone(), block.height);
        for (index, tx) in block.transactions.iter().enumerate() {
            self.tx_index.insert(tx.hash.clone(), (block.height, index));
        }
        *self.formulator_blocks.entry(block.formulator.clone()).or_insert(0) += 1;

        for tx in block.transactions.iter().rev() {
            self.latest_transactions.push_front(TxInfo {
                tx_hash: tx.hash.clone(),
                block_hash: block.hash.clone(),
                chain_id: block.chain_coord.clone(),
                time: tx.timestamp,
                tx_type: tx.tx_type.clone(),
            });
        }
        self.latest_transactions.truncate(HISTORY_CAP);

        // Throughput is sampled over pairs of blocks
        if block.height % 2 == 0 {
            let previous = self.blocks.last().map_or(0, |b| b.transactions.len());
            let count = previous + block.transactions.len();
            self.info.maximum_tps = self.info.maximum_tps.max(count);
            self.transaction_counts.push_front(CountInfo { time: block.timestamp, count });
            self.transaction_counts.truncate(HISTORY_CAP);
        }

        self.info.blocks = block.height;
        self.info.transactions += block.transactions.len() as u64;
        self.info.formulators = self.formulator_blocks.len();

        debug!(height = block.height, hash = %block.hash, "block stored");
        self.blocks.push(block);
        Ok(())
    }

    pub fn block(&self, height: u64) -> Option<&Block> {
        let index = usize::try_from(height.checked_sub(1)?).ok()?;
        self.blocks.get(index)
    }

    pub fn block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.by_hash.get(hash).and_then(|&height| self.block(height))
    }

    pub fn height_of(&self, hash: &str) -> Option<u64> {
        self.by_hash.get(hash).copied()
    }

    /// Newest blocks first, at most [`LATEST_ROWS`]
    pub fn latest_blocks(&self, echo: u64) -> BlockPage {
        let rows: Vec<BlockRow> = self
            .blocks
            .iter()
            .rev()
            .take(LATEST_ROWS)
            .map(Block::to_row)
            .collect();
        let total = rows.len() as u64;
        Page::new(rows, total, echo)
    }

    /// Blocks counted down from the tip, skipping `start`
    pub fn paginate_blocks(&self, start: u64, length: u64, echo: u64) -> BlockPage {
        let rows = self
            .blocks
            .iter()
            .rev()
            .skip(usize::try_from(start).unwrap_or(usize::MAX))
            .take(usize::try_from(length).unwrap_or(usize::MAX))
            .map(Block::to_row)
            .collect();
        Page::new(rows, self.height(), echo)
    }

    pub fn latest_transactions(&self) -> Vec<TxInfo> {
        self.latest_transactions.iter().take(LATEST_ROWS).cloned().collect()
    }

    pub fn paginate_transactions(&self, start: u64, length: u64, echo: u64) -> Page<TxInfo> {
        let rows = self
            .latest_transactions
            .iter()
            .skip(usize::try_from(start).unwrap_or(usize::MAX))
            .take(usize::try_from(length).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Page::new(rows, self.latest_transactions.len() as u64, echo)
    }

    pub fn transaction_counts(&self) -> Vec<CountInfo> {
        self.transaction_counts.iter().copied().collect()
    }

    pub fn chain_info(&self) -> ChainInfo {
        self.info.clone()
    }

    pub fn maximum_tps(&self) -> usize {
        self.info.maximum_tps
    }

    /// Number of blocks produced by `formulator`
    pub fn formulator_block_count(&self, formulator: &str) -> u64 {
        self.formulator_blocks.get(formulator).copied().unwrap_or(0)
    }

    pub fn block_detail(&self, height: u64) -> Option<BlockDetail> {
        let block = self.block(height)?;
        Some(BlockDetail {
            hash: block.hash.clone(),
            chain_coord: block.chain_coord.clone(),
            height: block.height,
            version: block.version,
            prev_hash: block.prev_hash.clone(),
            timestamp: format_time(block.timestamp),
            formulator: block.formulator.clone(),
            timeout_count: block.timeout_count,
            transaction_count: block.transactions.len(),
            transactions: block.transactions.iter().map(|tx| tx.hash.clone()).collect(),
        })
    }

    pub fn transaction_detail(&self, hash: &str) -> Option<TransactionDetail> {
        let &(height, index) = self.tx_index.get(hash)?;
        let block = self.block(height)?;
        let tx = block.transactions.get(index)?;
        Some(TransactionDetail {
            tx_type: tx.tx_type.clone(),
            block_hash: block.hash.clone(),
            block_height: block.height,
            block_timestamp: format_time(block.timestamp),
            tx_hash: tx.hash.clone(),
            tx_timestamp: format_time(tx.timestamp),
        })
    }
}

/// `"<date> <time>"` in UTC
pub fn format_time(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

const TX_TYPES: [&str; 4] = ["Transfer", "Withdraw", "CreateAccount", "Formulation"];
const FORMULATOR_COUNT: u8 = 4;

/// Deterministic demo blocks derived from blake3 hashes of the height
#[derive(Debug, Clone)]
pub struct DemoProducer {
    chain_coord: String,
}

impl Default for DemoProducer {
    fn default() -> Self {
        Self { chain_coord: "0:0:0".to_string() }
    }
}

impl DemoProducer {
    pub fn block(&self, height: u64, prev_hash: &str, timestamp: i64) -> Block {
        let seed = blake3::hash(&height.to_le_bytes());
        let seed = seed.as_bytes();

        let formulator_index = seed[0] % FORMULATOR_COUNT;
        let formulator = hex::encode(&blake3::hash(&[formulator_index]).as_bytes()[..20]);
        let timeout_count = u32::from(seed[1] % 7 == 0);
        let tx_count = usize::from(seed[2] % 6);

        let transactions = (0..tx_count)
            .map(|i| {
                let mut hasher = blake3::Hasher::new();
                hasher.update(&height.to_le_bytes());
                hasher.update(&(i as u64).to_le_bytes());
                Transaction {
                    hash: hasher.finalize().to_hex().to_string(),
                    tx_type: TX_TYPES[usize::from(seed[3 + i]) % TX_TYPES.len()].to_string(),
                    timestamp: timestamp - 1,
                }
            })
            .collect();

        let mut hasher = blake3::Hasher::new();
        hasher.update(prev_hash.as_bytes());
        hasher.update(&height.to_le_bytes());
        hasher.update(&timestamp.to_le_bytes());

        Block {
            height,
            hash: hasher.finalize().to_hex().to_string(),
            prev_hash: prev_hash.to_string(),
            chain_coord: self.chain_coord.clone(),
            version: 1,
            timestamp,
            formulator,
            timeout_count,
            transactions,
        }
    }

    /// Append the block following the current tip
    pub fn extend(&self, store: &mut ChainStore, timestamp: i64) -> Result<u64, ChainError> {
        let height = store.height() + 1;
        let prev_hash = store
            .block(height - 1)
            .map(|b| b.hash.clone())
            .unwrap_or_else(|| "0".repeat(64));
        store.push_block(self.block(height, &prev_hash, timestamp))?;
        Ok(height)
    }

    /// Fill `store` with `count` blocks spaced `spacing` apart, ending now
    pub fn seed(&self, store: &mut ChainStore, count: u64, spacing: Duration) -> Result<(), ChainError> {
        let now = Utc::now().timestamp();
        let step = spacing.as_secs().max(1) as i64;
        for i in (0..count).rev() {
            self.extend(store, now - i as i64 * step)?;
        }
        info!(blocks = count, "demo chain seeded");
        Ok(())
    }

    /// Produce a block every `interval` until the task is aborted
    pub fn spawn(self, chain: SharedChain, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                let mut store = chain.write().await;
                match self.extend(&mut store, Utc::now().timestamp()) {
                    Ok(height) => debug!(height, "demo block produced"),
                    Err(e) => tracing::warn!(error = %e, "demo block rejected"),
                }
            }
        })
    }
}
