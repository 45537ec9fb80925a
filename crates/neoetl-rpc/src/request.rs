//! JSON-RPC 2.0 wire types and NEO contract invocation shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// The result value, or the node's error object.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A typed argument to `invokefunction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractParam {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Value,
}

impl ContractParam {
    pub fn byte_array(hex: impl Into<String>) -> Self {
        Self {
            kind: "ByteArray".into(),
            value: Value::String(hex.into()),
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self {
            kind: "String".into(),
            value: Value::String(s.into()),
        }
    }
}

/// One VM stack item in an invocation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
}

impl StackItem {
    /// The value as a hex string, for `ByteArray` items.
    pub fn as_hex(&self) -> Option<&str> {
        self.value.as_str()
    }
}

/// Result of a read-only `invokefunction` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeResult {
    #[serde(default)]
    pub script: String,
    pub state: String,
    #[serde(default)]
    pub gas_consumed: Option<String>,
    #[serde(default)]
    pub stack: Vec<StackItem>,
}

impl InvokeResult {
    /// `true` unless the VM faulted.
    pub fn halted(&self) -> bool {
        self.state.starts_with("HALT")
    }
}
