//! neoetl-rpc: talking to NEO nodes.
//!
//! - [`NeoRpc`]: the node calls the pipeline needs, object-safe
//! - [`HttpNeoRpc`]: JSON-RPC 2.0 over `reqwest` with timeout and retry
//! - [`node`]: node directories, deny-list and max-height selection
//! - [`queries`]: auxiliary contract state queries

pub mod client;
pub mod error;
pub mod node;
pub mod queries;
pub mod request;
pub mod retry;

pub use client::{HttpClientConfig, HttpNeoRpc, NeoRpc};
pub use error::RpcError;
pub use node::{
    DenyList, FixedConnector, NeoscanClient, NodeDirectory, NodeInfo, NodeSelector,
    RpcConnector, StaticDirectory,
};
pub use request::{ContractParam, InvokeResult, StackItem};
pub use retry::{RetryConfig, RetryPolicy};
