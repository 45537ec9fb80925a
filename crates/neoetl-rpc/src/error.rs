//! RPC error types.

use thiserror::Error;

use crate::request::JsonRpcError;

/// NEO nodes answer `getblock` past the tip with this code.
pub const UNKNOWN_BLOCK_CODE: i64 = -100;

/// Errors raised while talking to a NEO node or a node directory.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Connection refused, reset, DNS failure or a non-2xx status.
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// JSON-RPC error object returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    #[error("Block {height} not found")]
    NotFound { height: u64 },

    #[error("No usable node (directory listed {listed}, all filtered or unreachable)")]
    NoNodes { listed: usize },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}

impl RpcError {
    /// Returns `true` for failures that a different node might not have:
    /// the caller should re-select a node and retry.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout { .. } | Self::NoNodes { .. })
    }

    /// Returns `true` if the node reported the block as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Transient errors worth retrying against the same node.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout { .. })
    }
}
