//! Error types for the ingestion pipeline.

use neoetl_core::{DecodeError, StoreError};
use neoetl_ledger::LedgerError;
use neoetl_rpc::RpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Block {block}, transaction {tx}: {source}")]
    Decode {
        block: u64,
        tx: String,
        #[source]
        source: DecodeError,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    /// Returns `true` if the run cannot continue on a later attempt without
    /// intervention: a store failure, a critical contract calling an unknown
    /// function, or bad configuration. Node connection failures are not fatal.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Rpc(e) => !e.is_connection_error(),
            _ => true,
        }
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Rpc(e) if e.is_connection_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_are_not_fatal() {
        let timeout = IngestError::Rpc(RpcError::Timeout { ms: 30_000 });
        assert!(timeout.is_connection_error());
        assert!(!timeout.is_fatal());

        let missing = IngestError::Rpc(RpcError::NotFound { height: 7 });
        assert!(missing.is_fatal());

        let critical = IngestError::Decode {
            block: 3_000_000,
            tx: "ab".into(),
            source: DecodeError::UnknownCriticalContract {
                hash: "a32bcf5d7082f740a4007b16e812cf66a457c3d4".into(),
                function: "6e6f7065".into(),
            },
        };
        assert!(critical.is_fatal());
        assert!(critical.to_string().contains("3000000"));
    }
}
