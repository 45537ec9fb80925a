//! Node discovery and selection.
//!
//! A [`NodeDirectory`] lists candidate nodes with their reported height. The
//! [`NodeSelector`] drops deny-listed hosts, keeps the nodes at the highest
//! height and rotates through them each time a fresh connection is asked for.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::{HttpClientConfig, HttpNeoRpc, NeoRpc};
use crate::error::RpcError;

pub const NEOSCAN_MAINNET: &str = "https://api.neoscan.io/api/main_net/v1";

/// Hosts known to serve stale or rate-limited data.
pub const DEFAULT_DENY_LIST: [&str; 4] = [
    "neo.org",
    "rustylogic.ddns.net",
    "*neonexchange.org",
    "*nash.io",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub url: String,
    pub height: u64,
}

#[async_trait]
pub trait NodeDirectory: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>, RpcError>;
}

/// Hands out RPC clients, re-selecting a node on every call.
#[async_trait]
pub trait RpcConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn NeoRpc>, RpcError>;
}

/// Always returns the same client.
pub struct FixedConnector(pub Arc<dyn NeoRpc>);

#[async_trait]
impl RpcConnector for FixedConnector {
    async fn connect(&self) -> Result<Arc<dyn NeoRpc>, RpcError> {
        Ok(Arc::clone(&self.0))
    }
}

// ─── Deny list ───────────────────────────────────────────────────────────────

/// Host patterns: `*suffix` matches a host ending in `suffix`, anything else
/// matches a host containing it.
#[derive(Debug, Clone)]
pub struct DenyList {
    contains: Vec<String>,
    suffixes: Vec<String>,
}

impl Default for DenyList {
    fn default() -> Self {
        Self::from_patterns(DEFAULT_DENY_LIST)
    }
}

impl DenyList {
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self {
            contains: Vec::new(),
            suffixes: Vec::new(),
        };
        for p in patterns {
            let p = p.as_ref().to_ascii_lowercase();
            match p.strip_prefix('*') {
                Some(suffix) => list.suffixes.push(suffix.to_string()),
                None => list.contains.push(p),
            }
        }
        list
    }

    pub fn is_denied(&self, url: &str) -> bool {
        let host = reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .unwrap_or_else(|| url.to_ascii_lowercase());
        self.contains.iter().any(|p| host.contains(p.as_str()))
            || self.suffixes.iter().any(|s| host.ends_with(s.as_str()))
    }
}

/// Deny-listed nodes removed, then only those at the highest height kept.
pub fn best_nodes(nodes: Vec<NodeInfo>, deny: &DenyList) -> Vec<NodeInfo> {
    let allowed: Vec<NodeInfo> = nodes.into_iter().filter(|n| !deny.is_denied(&n.url)).collect();
    let Some(max) = allowed.iter().map(|n| n.height).max() else {
        return Vec::new();
    };
    allowed.into_iter().filter(|n| n.height == max).collect()
}

// ─── Directories ─────────────────────────────────────────────────────────────

/// Neoscan explorer API: node listing and address balances.
pub struct NeoscanClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct NeoscanBalance {
    #[serde(default)]
    balance: Vec<NeoscanAsset>,
}

#[derive(Debug, Deserialize)]
struct NeoscanAsset {
    asset_symbol: String,
    amount: f64,
}

impl NeoscanClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn mainnet() -> Result<Self, RpcError> {
        Self::new(NEOSCAN_MAINNET, Duration::from_secs(30))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, RpcError> {
        let url = format!("{}/{path}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RpcError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(RpcError::Http(format!("HTTP {} from {url}", resp.status().as_u16())));
        }
        resp.json::<T>()
            .await
            .map_err(|e| RpcError::UnexpectedResponse(e.to_string()))
    }

    /// Current balances of `address` in base units, keyed by asset symbol.
    pub async fn balance(&self, address: &str) -> Result<HashMap<String, u64>, RpcError> {
        let body: NeoscanBalance = self.get(&format!("get_balance/{address}")).await?;
        Ok(body
            .balance
            .into_iter()
            .map(|a| (a.asset_symbol, (a.amount * 1e8).round() as u64))
            .collect())
    }
}

#[async_trait]
impl NodeDirectory for NeoscanClient {
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>, RpcError> {
        self.get("get_all_nodes").await
    }
}

/// A fixed set of URLs, each probed with `getblockcount`.
pub struct StaticDirectory {
    urls: Vec<String>,
    config: HttpClientConfig,
}

impl StaticDirectory {
    pub fn new(urls: Vec<String>, config: HttpClientConfig) -> Self {
        Self { urls, config }
    }
}

#[async_trait]
impl NodeDirectory for StaticDirectory {
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>, RpcError> {
        let mut nodes = Vec::with_capacity(self.urls.len());
        for url in &self.urls {
            let probe = HttpNeoRpc::new(url.clone(), self.config.clone())?;
            match probe.block_count().await {
                Ok(count) => nodes.push(NodeInfo {
                    url: url.clone(),
                    height: count,
                }),
                Err(e) => tracing::warn!(url = %url, error = %e, "node probe failed"),
            }
        }
        Ok(nodes)
    }
}

// ─── Selector ────────────────────────────────────────────────────────────────

pub struct NodeSelector {
    directory: Box<dyn NodeDirectory>,
    deny: DenyList,
    client: HttpClientConfig,
    candidates: Mutex<Vec<NodeInfo>>,
    cursor: AtomicUsize,
}

impl NodeSelector {
    pub fn new(directory: Box<dyn NodeDirectory>, deny: DenyList, client: HttpClientConfig) -> Self {
        Self {
            directory,
            deny,
            client,
            candidates: Mutex::new(Vec::new()),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Re-list nodes and replace the candidate set. Returns its size.
    pub async fn refresh(&self) -> Result<usize, RpcError> {
        let listed = self.directory.list_nodes().await?;
        let total = listed.len();
        let best = best_nodes(listed, &self.deny);
        if best.is_empty() {
            return Err(RpcError::NoNodes { listed: total });
        }
        tracing::debug!(listed = total, candidates = best.len(), height = best[0].height, "node set refreshed");
        let n = best.len();
        *self.candidates.lock().unwrap() = best;
        Ok(n)
    }

    /// Refresh, then take the next candidate in rotation.
    pub async fn select(&self) -> Result<NodeInfo, RpcError> {
        self.refresh().await?;
        let candidates = self.candidates.lock().unwrap();
        if candidates.is_empty() {
            return Err(RpcError::NoNodes { listed: 0 });
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
        Ok(candidates[idx].clone())
    }
}

#[async_trait]
impl RpcConnector for NodeSelector {
    async fn connect(&self) -> Result<Arc<dyn NeoRpc>, RpcError> {
        let node = self.select().await?;
        tracing::info!(url = %node.url, height = node.height, "selected node");
        Ok(Arc::new(HttpNeoRpc::new(node.url, self.client.clone())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Listed(Vec<NodeInfo>);

    #[async_trait]
    impl NodeDirectory for Listed {
        async fn list_nodes(&self) -> Result<Vec<NodeInfo>, RpcError> {
            Ok(self.0.clone())
        }
    }

    fn node(url: &str, height: u64) -> NodeInfo {
        NodeInfo {
            url: url.into(),
            height,
        }
    }

    #[test]
    fn deny_list_patterns() {
        let deny = DenyList::default();
        assert!(deny.is_denied("https://seed1.neo.org:10331"));
        assert!(deny.is_denied("http://rustylogic.ddns.net:10332"));
        assert!(deny.is_denied("https://seed3.neo.nash.io"));
        assert!(deny.is_denied("https://seed2.neonexchange.org:10331"));
        assert!(!deny.is_denied("https://seed1.switcheo.network:10331"));
    }

    #[test]
    fn keeps_only_highest_allowed_nodes() {
        let best = best_nodes(
            vec![
                node("https://seed1.neo.org:10331", 5_000_001),
                node("https://a.example:10331", 5_000_000),
                node("https://b.example:10331", 5_000_000),
                node("https://c.example:10331", 4_999_990),
            ],
            &DenyList::default(),
        );
        let urls: Vec<_> = best.iter().map(|n| n.url.as_str()).collect();
        assert_eq!(urls, ["https://a.example:10331", "https://b.example:10331"]);
    }

    #[tokio::test]
    async fn selector_rotates_through_candidates() {
        let selector = NodeSelector::new(
            Box::new(Listed(vec![
                node("https://a.example", 10),
                node("https://b.example", 10),
            ])),
            DenyList::default(),
            HttpClientConfig::default(),
        );
        let first = selector.select().await.unwrap();
        let second = selector.select().await.unwrap();
        let third = selector.select().await.unwrap();
        assert_ne!(first.url, second.url);
        assert_eq!(first.url, third.url);
    }

    #[tokio::test]
    async fn selector_fails_when_everything_is_denied() {
        let selector = NodeSelector::new(
            Box::new(Listed(vec![node("https://seed1.neo.org", 10)])),
            DenyList::default(),
            HttpClientConfig::default(),
        );
        let err = selector.select().await.unwrap_err();
        assert!(matches!(err, RpcError::NoNodes { listed: 1 }));
    }
}
