//! Operation decoders.
//!
//! [`decode_operation`] dispatches on the resolved [`OperationKind`] to one
//! pure decode function per record variant. Kinds without a typed decoder
//! become [`OperationRecord::Unrecognized`].

mod funds;
mod offer;
mod swap;

use crate::contracts::{ContractRegistry, ContractVersion, Layout, TokenTable};
use crate::disasm::{AvmDisassembler, Disassembler};
use crate::error::DecodeError;
use crate::offer_hash::{OfferHasher, Sha256dOfferHasher};
use crate::operation::OperationKind;
use crate::record::{OperationRecord, RecordMeta, Unrecognized};
use crate::resolver::{resolve_transaction, Resolution};
use crate::script::{RawInstruction, ScriptReader};
use crate::types::{Block, Transaction};

/// Everything a decode function needs besides the instructions.
#[derive(Clone, Copy)]
pub struct DecodeContext<'a> {
    pub block: &'a Block,
    pub tx: &'a Transaction,
    pub resolution: &'a Resolution,
    pub tokens: &'a TokenTable,
    pub hasher: &'a dyn OfferHasher,
}

impl<'a> DecodeContext<'a> {
    pub fn meta(&self) -> RecordMeta {
        RecordMeta {
            block_hash: self.block.hash_hex().to_string(),
            block_number: self.block.index,
            block_size: self.block.size,
            block_time: self.block.time,
            block_date: self.block.date(),
            contract_hash: self.resolution.contract.hash.clone(),
            contract_version: self.resolution.contract.version,
            transaction_hash: self.tx.hash_hex().to_string(),
            transaction_type: self.tx.tx_type.clone(),
        }
    }

    pub fn version(&self) -> ContractVersion {
        self.resolution.contract.version
    }

    /// Operand layout of the exchange contract; token contracts have none.
    fn layout(&self) -> Result<Layout, DecodeError> {
        self.version()
            .layout()
            .ok_or_else(|| DecodeError::UnknownContractVersion {
                hash: self.resolution.contract.hash.clone(),
            })
    }
}

/// Decode one resolved invocation into its record.
pub fn decode_operation(
    ctx: &DecodeContext<'_>,
    script: ScriptReader<'_>,
) -> Result<OperationRecord, DecodeError> {
    use OperationKind as K;

    let meta = ctx.meta();
    let record = match ctx.resolution.kind {
        K::Deposit => OperationRecord::Deposit(funds::deposit(ctx, meta, script)?),
        K::Withdraw | K::Withdrawal | K::WithdrawAssets => {
            OperationRecord::Withdraw(funds::withdraw(ctx, meta)?)
        }
        K::Transfer => OperationRecord::Transfer(funds::transfer(ctx, meta, script)?),
        K::MakeOffer => OperationRecord::MakeOffer(offer::make_offer(ctx, meta, script)?),
        K::FillOffer => OperationRecord::FillOffer(offer::fill_offer(ctx, meta, script)?),
        K::CancelOffer => OperationRecord::Cancel(offer::cancel(meta, script)?),
        K::FreezeTrading => OperationRecord::FreezeTrading(swap::freeze(meta, script)?),
        K::UnfreezeTrading => OperationRecord::UnfreezeTrading(swap::unfreeze(meta, script)?),
        K::CreateAtomicSwap => {
            OperationRecord::CreateAtomicSwap(swap::create(ctx, meta, script)?)
        }
        K::ExecuteAtomicSwap => OperationRecord::ExecuteAtomicSwap(swap::execute(meta, script)?),
        K::CancelAtomicSwap => OperationRecord::CancelAtomicSwap(swap::cancel(meta, script)?),
        function => OperationRecord::Unrecognized(Unrecognized { meta, function }),
    };
    Ok(record)
}

/// Intermediate results of decoding one transaction, for inspection.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub instructions: Vec<RawInstruction>,
    pub resolution: Option<Resolution>,
    pub record: Option<OperationRecord>,
}

/// Disassembles, resolves and decodes transactions against a registry.
pub struct Decoder {
    registry: ContractRegistry,
    disassembler: Box<dyn Disassembler>,
    hasher: Box<dyn OfferHasher>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(ContractRegistry::mainnet())
    }
}

impl Decoder {
    pub fn new(registry: ContractRegistry) -> Self {
        Self {
            registry,
            disassembler: Box::new(AvmDisassembler),
            hasher: Box::new(Sha256dOfferHasher),
        }
    }

    pub fn with_disassembler(mut self, disassembler: impl Disassembler + 'static) -> Self {
        self.disassembler = Box::new(disassembler);
        self
    }

    pub fn with_hasher(mut self, hasher: impl OfferHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    /// Decode `tx`, or `Ok(None)` if it does not touch a tracked contract.
    pub fn decode_transaction(
        &self,
        block: &Block,
        tx: &Transaction,
    ) -> Result<Option<OperationRecord>, DecodeError> {
        Ok(self.inspect(block, tx)?.record)
    }

    /// Like [`Decoder::decode_transaction`] but keeps the disassembly and
    /// resolution alongside the record.
    pub fn inspect(&self, block: &Block, tx: &Transaction) -> Result<Inspection, DecodeError> {
        let Some(script_hex) = tx.script.as_deref() else {
            return Ok(Inspection {
                instructions: Vec::new(),
                resolution: None,
                record: None,
            });
        };
        let instructions = self.disassembler.disassemble_hex(script_hex)?;
        let resolution = resolve_transaction(&self.registry, tx, &instructions)?;

        let record = match &resolution {
            Some(resolution) => {
                let ctx = DecodeContext {
                    block,
                    tx,
                    resolution,
                    tokens: self.registry.tokens(),
                    hasher: self.hasher.as_ref(),
                };
                tracing::trace!(
                    tx = %tx.hash_hex(),
                    kind = %resolution.kind,
                    contract = %resolution.contract.hash,
                    "decoding operation"
                );
                Some(decode_operation(&ctx, ScriptReader::new(&instructions))?)
            }
            None => None,
        };

        Ok(Inspection {
            instructions,
            resolution,
            record,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Script builders shared by the decoder tests.

    use super::*;
    use crate::codec::reverse_hex_bytes;
    use crate::contracts::ResolvedContract;

    pub fn bytes(hex: &str) -> RawInstruction {
        RawInstruction::with_operand(format!("PUSHBYTES{}", hex.len() / 2), hex)
    }

    pub fn int(n: u8) -> RawInstruction {
        RawInstruction::bare(format!("PUSH{n}"))
    }

    /// Script-order bytes of a big-endian hash.
    pub fn le(hash_be: &str) -> RawInstruction {
        bytes(&reverse_hex_bytes(hash_be).unwrap())
    }

    /// Little-endian amount push.
    pub fn amount(value: u64) -> RawInstruction {
        let le = value.to_le_bytes();
        let len = le.iter().rposition(|b| *b != 0).map_or(1, |i| i + 1);
        bytes(&hex::encode(&le[..len]))
    }

    pub fn block() -> Block {
        serde_json::from_value(serde_json::json!({
            "hash": "0xb10c", "size": 686, "time": 1541030400, "index": 2000000, "tx": []
        }))
        .unwrap()
    }

    pub fn tx(vout: serde_json::Value) -> Transaction {
        serde_json::from_value(serde_json::json!({
            "txid": "0xfeed", "type": "InvocationTransaction", "vout": vout
        }))
        .unwrap()
    }

    pub fn resolution(hash: &str, version: ContractVersion, kind: OperationKind) -> Resolution {
        Resolution {
            contract: ResolvedContract {
                hash: hash.to_string(),
                version,
                symbol: None,
            },
            kind,
            function_hex: None,
        }
    }

    pub fn decode_with(
        resolution: &Resolution,
        tx: &Transaction,
        script: &[RawInstruction],
    ) -> Result<OperationRecord, DecodeError> {
        let block = block();
        let tokens = TokenTable::mainnet();
        let ctx = DecodeContext {
            block: &block,
            tx,
            resolution,
            tokens: &tokens,
            hasher: &Sha256dOfferHasher,
        };
        decode_operation(&ctx, ScriptReader::new(script))
    }

    pub fn decode(
        resolution: &Resolution,
        script: &[RawInstruction],
    ) -> Result<OperationRecord, DecodeError> {
        decode_with(resolution, &tx(serde_json::json!([])), script)
    }
}
