//! Block and transaction shapes as returned by a node's verbose `getblock`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A block with its transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub hash: String,
    pub size: u64,
    /// Unix timestamp (seconds).
    pub time: i64,
    pub index: u64,
    #[serde(rename = "previousblockhash", default, skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
    #[serde(rename = "merkleroot", default, skip_serializing_if = "Option::is_none")]
    pub merkle_root: Option<String>,
    #[serde(default)]
    pub tx: Vec<Transaction>,
}

impl Block {
    /// Block hash without the `0x` prefix.
    pub fn hash_hex(&self) -> &str {
        strip_0x(&self.hash)
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }

    /// UTC calendar date of the block (`YYYY-MM-DD`).
    pub fn date(&self) -> String {
        self.datetime()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// One transaction inside a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type")]
    pub tx_type: String,
    #[serde(default)]
    pub vout: Vec<Vout>,
    /// Invocation script (hex); only present on invocation transactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl Transaction {
    /// Transaction hash without the `0x` prefix.
    pub fn hash_hex(&self) -> &str {
        strip_0x(&self.txid)
    }

    pub fn pays_any(&self, addresses: &[&str]) -> bool {
        self.vout.iter().any(|v| addresses.contains(&v.address.as_str()))
    }
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vout {
    pub n: u32,
    pub asset: String,
    /// Decimal amount as reported by the node (`"1"`, `"0.5"`).
    pub value: String,
    pub address: String,
}

pub(crate) fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verbose_block() {
        let raw = serde_json::json!({
            "hash": "0xabc1",
            "size": 686,
            "version": 0,
            "previousblockhash": "0xabc0",
            "merkleroot": "0xdef",
            "time": 1541030400,
            "index": 2000000,
            "nonce": "1a2b",
            "tx": [{
                "txid": "0xfeed",
                "size": 200,
                "type": "InvocationTransaction",
                "version": 1,
                "attributes": [],
                "vin": [],
                "vout": [{"n": 0, "asset": "0xc56f", "value": "1", "address": "ASH41gtWftHvhuYhZz1jj7ee7z9vp9D9wk"}],
                "script": "00c1"
            }]
        });
        let block: Block = serde_json::from_value(raw).unwrap();
        assert_eq!(block.index, 2_000_000);
        assert_eq!(block.hash_hex(), "abc1");
        assert_eq!(block.date(), "2018-11-01");
        assert_eq!(block.tx[0].tx_type, "InvocationTransaction");
        assert_eq!(block.tx[0].hash_hex(), "feed");
        assert!(block.tx[0].pays_any(&["ASH41gtWftHvhuYhZz1jj7ee7z9vp9D9wk"]));
    }

    #[test]
    fn miner_transaction_without_script() {
        let tx: Transaction = serde_json::from_value(serde_json::json!({
            "txid": "0x01", "type": "MinerTransaction"
        }))
        .unwrap();
        assert!(tx.script.is_none());
        assert!(tx.vout.is_empty());
    }
}
