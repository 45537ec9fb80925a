//! The [`NeoRpc`] trait and its HTTP JSON-RPC implementation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use neoetl_core::Block;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{RpcError, UNKNOWN_BLOCK_CODE};
use crate::request::{ContractParam, InvokeResult, JsonRpcRequest, JsonRpcResponse};
use crate::retry::{RetryConfig, RetryPolicy};

/// The node calls the pipeline needs.
///
/// Object-safe; stored as `Arc<dyn NeoRpc>`.
#[async_trait]
pub trait NeoRpc: Send + Sync {
    /// Number of blocks in the node's chain (tip height + 1).
    async fn block_count(&self) -> Result<u64, RpcError>;

    /// Verbose block at `height`. Fails with [`RpcError::NotFound`] past the tip.
    async fn block(&self, height: u64) -> Result<Block, RpcError>;

    /// Read-only contract invocation.
    async fn invoke_function(
        &self,
        contract: &str,
        operation: &str,
        params: Vec<ContractParam>,
    ) -> Result<InvokeResult, RpcError>;

    /// Endpoint, for logging.
    fn url(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    pub retry: RetryConfig,
    pub request_timeout_ms: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            request_timeout_ms: 30_000,
        }
    }
}

/// JSON-RPC 2.0 over HTTP with a per-request timeout and bounded retry.
pub struct HttpNeoRpc {
    url: String,
    http: reqwest::Client,
    retry: RetryPolicy,
    timeout: Duration,
    next_id: AtomicU64,
}

impl HttpNeoRpc {
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, RpcError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Http(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            http,
            retry: RetryPolicy::new(config.retry),
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn default_for(url: impl Into<String>) -> Result<Self, RpcError> {
        Self::new(url, HttpClientConfig::default())
    }

    fn map_err(&self, e: reqwest::Error) -> RpcError {
        if e.is_timeout() {
            RpcError::Timeout {
                ms: self.timeout.as_millis() as u64,
            }
        } else {
            RpcError::Http(e.to_string())
        }
    }

    async fn send_once(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, RpcError> {
        let resp = self
            .http
            .post(&self.url)
            .json(req)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RpcError::Http(format!("HTTP {status}: {body}")));
        }

        resp.json::<JsonRpcResponse>()
            .await
            .map_err(|e| RpcError::UnexpectedResponse(e.to_string()))
    }

    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, RpcError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.send_once(&req).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() => match self.retry.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            url = %self.url,
                            method = %req.method,
                            "retrying request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(attempt, error = %e, url = %self.url, "max retries exceeded");
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Send `method` and deserialize its result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let value = self
            .send(JsonRpcRequest::new(id, method, params))
            .await?
            .into_result()
            .map_err(RpcError::Rpc)?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl NeoRpc for HttpNeoRpc {
    async fn block_count(&self) -> Result<u64, RpcError> {
        self.call("getblockcount", vec![]).await
    }

    async fn block(&self, height: u64) -> Result<Block, RpcError> {
        match self.call("getblock", vec![json!(height), json!(1)]).await {
            Err(RpcError::Rpc(e)) if e.code == UNKNOWN_BLOCK_CODE => {
                Err(RpcError::NotFound { height })
            }
            other => other,
        }
    }

    async fn invoke_function(
        &self,
        contract: &str,
        operation: &str,
        params: Vec<ContractParam>,
    ) -> Result<InvokeResult, RpcError> {
        let params = serde_json::to_value(params)?;
        self.call("invokefunction", vec![json!(contract), json!(operation), params])
            .await
    }

    fn url(&self) -> &str {
        &self.url
    }
}
