// File: src/data_models.rs
// Shared data structures and models for all interfaces

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind address for the explorer server
    pub listen: SocketAddr,
    /// Base URL of a running explorer (terminal front-ends)
    pub explorer_url: String,
    /// Enable permissive CORS
    pub cors: bool,
    /// Blocks created before the server starts serving
    pub seed_blocks: u64,
    /// Interval between demo blocks
    pub block_interval: Duration,
    /// Latest-blocks table refresh interval
    pub refresh_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            explorer_url: "http://127.0.0.1:8080".to_string(),
            cors: false,
            seed_blocks: 200,
            block_interval: Duration::from_secs(2),
            refresh_interval: Duration::from_millis(3000),
        }
    }
}

/// One row of the latest-blocks table as served by the data endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRow {
    #[serde(rename = "Block Height")]
    pub height: u64,
    #[serde(rename = "Block Hash")]
    pub hash: String,
    /// `"<date> <time>"`
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Status", with = "lenient_number")]
    pub status: i64,
    #[serde(rename = "Txs", with = "lenient_number")]
    pub tx_count: u64,
}

/// Server-side paging envelope (legacy DataTables field names)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(rename = "iTotalRecords", default)]
    pub total_records: u64,
    #[serde(rename = "iTotalDisplayRecords", default)]
    pub total_display_records: u64,
    #[serde(rename = "sEcho", default)]
    pub echo: u64,
    #[serde(rename = "sColumns", default)]
    pub columns: String,
    #[serde(rename = "aaData", default = "Vec::new")]
    pub data: Vec<T>,
}

pub type BlockPage = Page<BlockRow>;

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: u64, echo: u64) -> Self {
        Self {
            total_records: total,
            total_display_records: total,
            echo,
            columns: String::new(),
            data,
        }
    }
}

/// Paging request parameters sent by the table widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub draw: u64,
    #[serde(default)]
    pub start: u64,
    /// -1 requests every row
    #[serde(default = "all_rows")]
    pub length: i64,
}

fn all_rows() -> i64 {
    -1
}

impl PageRequest {
    pub fn all(draw: u64) -> Self {
        Self { draw, start: 0, length: all_rows() }
    }
}

/// Transaction summary used by the latest-transactions lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInfo {
    #[serde(rename = "TxHash")]
    pub tx_hash: String,
    #[serde(rename = "BlockHash")]
    pub block_hash: String,
    #[serde(rename = "ChainID")]
    pub chain_id: String,
    #[serde(rename = "Time")]
    pub time: i64,
    #[serde(rename = "TxType")]
    pub tx_type: String,
}

/// Transactions counted over a pair of blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountInfo {
    pub time: i64,
    pub count: usize,
}

/// Running totals for the whole chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub blocks: u64,
    pub transactions: u64,
    pub formulators: usize,
    pub maximum_tps: usize,
}

/// Full block view for detail pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDetail {
    #[serde(rename = "Hash")]
    pub hash: String,
    #[serde(rename = "ChainCoord")]
    pub chain_coord: String,
    #[serde(rename = "Height")]
    pub height: u64,
    #[serde(rename = "Version")]
    pub version: u16,
    #[serde(rename = "HashPrevBlock")]
    pub prev_hash: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "FormulationAddress")]
    pub formulator: String,
    #[serde(rename = "TimeoutCount")]
    pub timeout_count: u32,
    #[serde(rename = "Transaction Count")]
    pub transaction_count: usize,
    #[serde(rename = "Transactions")]
    pub transactions: Vec<String>,
}

/// Full transaction view for detail pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetail {
    #[serde(rename = "Type")]
    pub tx_type: String,
    #[serde(rename = "Block Hash")]
    pub block_hash: String,
    #[serde(rename = "Block Height")]
    pub block_height: u64,
    #[serde(rename = "Block Timestamp")]
    pub block_timestamp: String,
    #[serde(rename = "Tx Hash")]
    pub tx_hash: String,
    #[serde(rename = "Tx TimeStamp")]
    pub tx_timestamp: String,
}

/// Numbers that older explorers serialize as decimal strings.
///
/// Written back as strings so existing pages keep parsing the payload.
mod lenient_number {
    use super::*;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: fmt::Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: std::str::FromStr + TryFrom<i64> + TryFrom<u64>,
        <T as std::str::FromStr>::Err: fmt::Display,
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Unsigned(u64),
            Signed(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Unsigned(n) => <T as TryFrom<u64>>::try_from(n)
                .map_err(|_| serde::de::Error::custom(format!("number {} out of range", n))),
            Raw::Signed(n) => <T as TryFrom<i64>>::try_from(n)
                .map_err(|_| serde::de::Error::custom(format!("number {} out of range", n))),
            Raw::Text(s) => s.trim().parse::<T>().map_err(serde::de::Error::custom),
        }
    }
}
