//! Block fetcher.
//!
//! Requests a contiguous range of blocks with a bounded number of requests
//! in flight and yields them in height order.

use futures::stream::{self, StreamExt, TryStreamExt};

use neoetl_core::Block;
use neoetl_rpc::{NeoRpc, RpcError};

pub struct BlockFetcher {
    concurrency: usize,
}

impl BlockFetcher {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch blocks `from..=to`, in order. Fails on the first error.
    pub async fn fetch(&self, rpc: &dyn NeoRpc, from: u64, to: u64) -> Result<Vec<Block>, RpcError> {
        if to < from {
            return Ok(vec![]);
        }
        stream::iter(from..=to)
            .map(|height| rpc.block(height))
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}

/// Split `from..=to` into inclusive ranges of at most `size` heights.
pub fn chunks(from: u64, to: u64, size: u64) -> Vec<(u64, u64)> {
    let size = size.max(1);
    let mut out = Vec::new();
    let mut start = from;
    while start <= to {
        let end = start.saturating_add(size - 1).min(to);
        out.push((start, end));
        if end == u64::MAX {
            break;
        }
        start = end + 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use neoetl_rpc::{ContractParam, InvokeResult};

    use super::*;

    struct Slow {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl NeoRpc for Slow {
        async fn block_count(&self) -> Result<u64, RpcError> {
            Ok(100)
        }
        async fn block(&self, height: u64) -> Result<Block, RpcError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            // Later heights finish first.
            tokio::time::sleep(std::time::Duration::from_millis(20 - height)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(serde_json::from_value(serde_json::json!({
                "hash": format!("0x{height:02x}"), "size": 1, "time": 0, "index": height
            }))
            .unwrap())
        }
        async fn invoke_function(
            &self,
            _contract: &str,
            _operation: &str,
            _params: Vec<ContractParam>,
        ) -> Result<InvokeResult, RpcError> {
            Err(RpcError::UnexpectedResponse("unused".into()))
        }
        fn url(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn keeps_order_and_bounds_concurrency() {
        let rpc = Slow {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let blocks = BlockFetcher::new(3).fetch(&rpc, 1, 10).await.unwrap();
        let heights: Vec<_> = blocks.iter().map(|b| b.index).collect();
        assert_eq!(heights, (1..=10).collect::<Vec<_>>());
        assert!(rpc.peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn chunking() {
        assert_eq!(chunks(1, 25, 10), vec![(1, 10), (11, 20), (21, 25)]);
        assert_eq!(chunks(5, 5, 10), vec![(5, 5)]);
        assert!(chunks(6, 5, 10).is_empty());
    }
}
