//! Contract and method recovery from a disassembled invocation script.

use crate::codec::{reverse_hex_bytes, zero_pad};
use crate::contracts::{
    ContractRegistry, ResolvedContract, CUSTODY_ADDRESSES, SWTH_TOKEN,
};
use crate::error::DecodeError;
use crate::operation::OperationKind;
use crate::script::RawInstruction;
use crate::types::Transaction;

/// MCT token script hash in script (little-endian) order.
const MCT_RAW: &str = "3fbc607c12c28736343224a4b4d8f513a5c27ca8";

/// What a tracked transaction invokes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The transaction's contract: first `APPCALL`/`TAILCALL` target.
    pub contract: ResolvedContract,
    pub kind: OperationKind,
    /// Method name operand as pushed, if any.
    pub function_hex: Option<String>,
}

/// Call-site details found after the first `PACK`.
#[derive(Debug, Default)]
struct CallSite<'a> {
    function: Option<&'a str>,
    /// Raw-order (little-endian) operand, padded to 20 bytes.
    contract_raw: Option<String>,
}

fn invocation_operand(ins: &RawInstruction) -> Option<&str> {
    if ins.is_invocation() {
        ins.operand.as_deref()
    } else {
        None
    }
}

fn call_site(script: &[RawInstruction]) -> CallSite<'_> {
    let mut site = CallSite::default();
    let Some(pack) = script.iter().position(|i| i.mnemonic == "PACK") else {
        return site;
    };
    for ins in &script[pack + 1..] {
        if site.function.is_none() && ins.mnemonic.starts_with("PUSHBYTES") {
            site.function = ins.operand.as_deref();
        }
        if site.contract_raw.is_none() {
            if let Some(op) = invocation_operand(ins) {
                site.contract_raw = Some(zero_pad(op, Some(40)));
            }
        }
        if site.function.is_some() && site.contract_raw.is_some() {
            break;
        }
    }
    site
}

/// Work out whether `tx` is tracked and, if so, which contract and method it
/// invokes.
///
/// Returns `Ok(None)` for transactions that do not touch a tracked contract.
/// The only fatal outcome is [`DecodeError::UnknownCriticalContract`].
pub fn resolve_transaction(
    registry: &ContractRegistry,
    tx: &Transaction,
    script: &[RawInstruction],
) -> Result<Option<Resolution>, DecodeError> {
    let Some(first) = script.iter().find_map(invocation_operand) else {
        return Ok(None);
    };
    let contract_hash = reverse_hex_bytes(&zero_pad(first, Some(40)))?;

    let site = call_site(script);
    let Some(site_raw) = site.contract_raw.as_deref() else {
        return Ok(None);
    };
    let site_hash = reverse_hex_bytes(site_raw)?;
    let function_hex = site.function.map(str::to_string);
    let named = site.function.and_then(OperationKind::from_hex);

    let pays_custody = tx.pays_any(&CUSTODY_ADDRESSES);
    let site_known = registry.resolve(&site_hash).is_some();

    let kind = if site_known && site.function.is_some() {
        match named {
            Some(kind) => kind,
            None if registry.is_critical(&site_hash) => {
                return Err(DecodeError::UnknownCriticalContract {
                    hash: site_hash,
                    function: function_hex.unwrap_or_default(),
                });
            }
            None => OperationKind::PassUnknown,
        }
    } else if pays_custody && (site_raw == MCT_RAW || site_hash == SWTH_TOKEN) {
        named.unwrap_or(OperationKind::PassUnknown)
    } else if registry.is_pass_unknown(&site_hash) {
        OperationKind::PassUnknown
    } else {
        return Ok(None);
    };

    let contract = registry
        .resolve(&contract_hash)
        .ok_or(DecodeError::UnknownContractVersion {
            hash: contract_hash,
        })?;

    Ok(Some(Resolution {
        contract,
        kind,
        function_hex,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{ContractVersion, CONTRACT_V2, CONTRACT_V3};

    fn raw(hash_be: &str) -> String {
        reverse_hex_bytes(hash_be).unwrap()
    }

    fn invoke(contract_be: &str, function: &str) -> Vec<RawInstruction> {
        let name = hex::encode(function);
        vec![
            RawInstruction::bare("PUSH1"),
            RawInstruction::bare("PUSH1"),
            RawInstruction::bare("PACK"),
            RawInstruction::with_operand(format!("PUSHBYTES{}", name.len() / 2), name),
            RawInstruction::with_operand("APPCALL", raw(contract_be)),
        ]
    }

    fn tx(address: &str) -> Transaction {
        serde_json::from_value(serde_json::json!({
            "txid": "0x01",
            "type": "InvocationTransaction",
            "vout": [{"n": 0, "asset": "0xc56f", "value": "1", "address": address}]
        }))
        .unwrap()
    }

    #[test]
    fn resolves_known_method() {
        let reg = ContractRegistry::mainnet();
        let res = resolve_transaction(&reg, &tx("AXX"), &invoke(CONTRACT_V2, "cancelOffer"))
            .unwrap()
            .unwrap();
        assert_eq!(res.kind, OperationKind::CancelOffer);
        assert_eq!(res.contract.version, ContractVersion::V2);
        assert_eq!(res.contract.hash, CONTRACT_V2);
    }

    #[test]
    fn unknown_method_on_critical_contract_is_fatal() {
        let reg = ContractRegistry::mainnet();
        let err = resolve_transaction(&reg, &tx("AXX"), &invoke(CONTRACT_V3, "nope")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn unknown_method_elsewhere_passes() {
        let reg = ContractRegistry::mainnet();
        let res = resolve_transaction(
            &reg,
            &tx("AXX"),
            &invoke(crate::contracts::CONTRACT_V1_5, "nope"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(res.kind, OperationKind::PassUnknown);
    }

    #[test]
    fn untracked_contract_is_excluded() {
        let reg = ContractRegistry::mainnet();
        let script = invoke("1111111111111111111111111111111111111111", "transfer");
        assert!(resolve_transaction(&reg, &tx("AXX"), &script).unwrap().is_none());
    }

    #[test]
    fn allow_listed_contract_passes_unknown() {
        let other = "1111111111111111111111111111111111111111";
        let reg = ContractRegistry::mainnet().with_pass_unknown([other]);
        let mut script = invoke(other, "transfer");
        // contract hash itself must still have a version
        script.insert(0, RawInstruction::with_operand("APPCALL", raw(CONTRACT_V2)));
        let res = resolve_transaction(&reg, &tx("AXX"), &script).unwrap().unwrap();
        assert_eq!(res.kind, OperationKind::PassUnknown);
    }

    #[test]
    fn script_without_invocation_is_excluded() {
        let reg = ContractRegistry::mainnet();
        let script = [RawInstruction::bare("PUSH0"), RawInstruction::bare("PACK")];
        assert!(resolve_transaction(&reg, &tx("AXX"), &script).unwrap().is_none());
    }

    #[test]
    fn token_transfer_resolves_as_token() {
        let reg = ContractRegistry::mainnet();
        let res = resolve_transaction(
            &reg,
            &tx(CUSTODY_ADDRESSES[0]),
            &invoke(SWTH_TOKEN, "transfer"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(res.kind, OperationKind::Transfer);
        assert_eq!(res.contract.version, ContractVersion::Token);
        assert_eq!(res.contract.symbol.as_deref(), Some("SWTH"));
    }
}
