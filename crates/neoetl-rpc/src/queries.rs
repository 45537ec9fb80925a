//! Read-only exchange contract queries. Not used on the ingestion path.

use neoetl_core::address::script_hash_from_address;
use neoetl_core::codec::{hex_to_bytes, reverse_hex_bytes};

use crate::client::NeoRpc;
use crate::error::RpcError;
use crate::request::{ContractParam, InvokeResult, StackItem};

fn first_item(result: &InvokeResult, operation: &str) -> Result<StackItem, RpcError> {
    if !result.halted() {
        return Err(RpcError::UnexpectedResponse(format!(
            "{operation} faulted: {}",
            result.state
        )));
    }
    result
        .stack
        .first()
        .cloned()
        .ok_or_else(|| RpcError::UnexpectedResponse(format!("{operation} returned an empty stack")))
}

/// Interpret a stack item as an unsigned integer.
///
/// Byte arrays are little-endian; an empty array is zero.
pub fn stack_integer(item: &StackItem) -> Result<u64, RpcError> {
    let bad = |reason: String| RpcError::UnexpectedResponse(reason);
    match item.kind.as_str() {
        "Integer" => match &item.value {
            serde_json::Value::String(s) => s.parse().map_err(|_| bad(format!("integer '{s}'"))),
            serde_json::Value::Number(n) => n.as_u64().ok_or_else(|| bad(format!("integer {n}"))),
            other => Err(bad(format!("integer {other}"))),
        },
        "ByteArray" | "Boolean" => {
            let hex = item.as_hex().unwrap_or_default();
            let bytes = hex_to_bytes(hex).map_err(|e| bad(e.to_string()))?;
            if bytes.len() > 8 {
                return Err(bad(format!("{} byte integer", bytes.len())));
            }
            Ok(bytes
                .iter()
                .rev()
                .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
        }
        other => Err(bad(format!("unexpected stack item type {other}"))),
    }
}

/// `getState` on the exchange contract: `01` means trading is active.
pub async fn is_trading_active(rpc: &dyn NeoRpc, contract: &str) -> Result<bool, RpcError> {
    let result = rpc.invoke_function(contract, "getState", vec![]).await?;
    let item = first_item(&result, "getState")?;
    match item.as_hex().unwrap_or_default() {
        "" | "00" => Ok(false),
        "01" => Ok(true),
        other => Err(RpcError::UnexpectedResponse(format!("getState returned '{other}'"))),
    }
}

/// `getBalance(address, asset)` on the exchange contract, in base units.
pub async fn contract_balance(
    rpc: &dyn NeoRpc,
    contract: &str,
    address: &str,
    asset_hash: &str,
) -> Result<u64, RpcError> {
    let to_param = |hex: &str| {
        reverse_hex_bytes(hex)
            .map(ContractParam::byte_array)
            .map_err(|e| RpcError::UnexpectedResponse(e.to_string()))
    };
    let script_hash = script_hash_from_address(address)
        .map_err(|e| RpcError::UnexpectedResponse(e.to_string()))?;
    let params = vec![
        to_param(&script_hash)?,
        to_param(asset_hash.trim_start_matches("0x"))?,
    ];

    let result = rpc.invoke_function(contract, "getBalance", params).await?;
    stack_integer(&first_item(&result, "getBalance")?)
}
