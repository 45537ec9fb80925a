//! Positional operand access over a disassembled script.
//!
//! Invocation scripts push their arguments in reverse order, so operand `0`
//! is the last argument of the contract method. Two push encodings occur:
//! an immediate small integer (`PUSH0`..`PUSH16`, `PUSHM1`) or a
//! length-prefixed byte array (`PUSHBYTESn`, `PUSHDATA1/2/4`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::AddressRef;
use crate::codec::{hex_to_bytes, reverse_hex_bytes, zero_pad, Fixed8Amount};
use crate::contracts::{AssetRef, TokenTable};
use crate::error::DecodeError;

/// One disassembled bytecode step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInstruction {
    pub mnemonic: String,
    /// Operand bytes as hex, in script order.
    pub operand: Option<String>,
}

impl RawInstruction {
    pub fn bare(mnemonic: impl Into<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            operand: None,
        }
    }

    pub fn with_operand(mnemonic: impl Into<String>, operand: impl Into<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            operand: Some(operand.into()),
        }
    }

    /// Interpret this instruction as a push, if it is one.
    pub fn push(&self) -> Option<Push<'_>> {
        let m = self.mnemonic.as_str();
        if let Some(n) = m.strip_prefix("PUSHBYTES") {
            let declared_len = n.parse().ok()?;
            return Some(Push::Bytes {
                hex: self.operand.as_deref().unwrap_or(""),
                declared_len,
            });
        }
        if m.starts_with("PUSHDATA") {
            let hex = self.operand.as_deref().unwrap_or("");
            return Some(Push::Bytes {
                hex,
                declared_len: hex.len() / 2,
            });
        }
        if m == "PUSHM1" {
            return Some(Push::Int(-1));
        }
        let n: i64 = m.strip_prefix("PUSH")?.parse().ok()?;
        (0..=16).contains(&n).then_some(Push::Int(n))
    }

    pub fn is_invocation(&self) -> bool {
        matches!(self.mnemonic.as_str(), "APPCALL" | "TAILCALL")
    }
}

impl fmt::Display for RawInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Some(op) => write!(f, "{} 0x{op}", self.mnemonic),
            None => write!(f, "{}", self.mnemonic),
        }
    }
}

/// The two push encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push<'a> {
    Int(i64),
    Bytes { hex: &'a str, declared_len: usize },
}

/// Reader over one transaction's instruction sequence.
#[derive(Debug, Clone, Copy)]
pub struct ScriptReader<'a> {
    instructions: &'a [RawInstruction],
}

impl<'a> ScriptReader<'a> {
    pub fn new(instructions: &'a [RawInstruction]) -> Self {
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&'a RawInstruction, DecodeError> {
        self.instructions.get(index).ok_or_else(|| {
            DecodeError::operand(
                index,
                format!("out of range (script has {} instructions)", self.instructions.len()),
            )
        })
    }

    /// `true` if instruction `index` exists and has the given mnemonic.
    pub fn is(&self, index: usize, mnemonic: &str) -> bool {
        self.instructions
            .get(index)
            .is_some_and(|i| i.mnemonic == mnemonic)
    }

    pub fn push(&self, index: usize) -> Result<Push<'a>, DecodeError> {
        let ins = self.get(index)?;
        ins.push()
            .ok_or_else(|| DecodeError::operand(index, format!("expected a push, found {ins}")))
    }

    /// Byte-array operand as hex in script order, left-padded to `size` hex chars.
    pub fn raw_hex(&self, index: usize, size: Option<usize>) -> Result<String, DecodeError> {
        match self.push(index)? {
            Push::Bytes { hex, .. } => Ok(zero_pad(hex, size)),
            Push::Int(_) => Err(DecodeError::operand(index, "expected a byte array push")),
        }
    }

    /// Byte-array operand padded to `size` hex chars and flipped to big-endian.
    pub fn hash_be(&self, index: usize, size: Option<usize>) -> Result<String, DecodeError> {
        reverse_hex_bytes(&self.raw_hex(index, size)?)
    }

    /// An amount in base units, whichever encoding carried it.
    pub fn amount(&self, index: usize) -> Result<Fixed8Amount, DecodeError> {
        let ins = self.get(index)?;
        match self.push(index)? {
            Push::Int(n) => {
                let value = u64::try_from(n)
                    .map_err(|_| DecodeError::operand(index, "negative amount"))?;
                Ok(Fixed8Amount::new(ins.mnemonic.clone(), value))
            }
            Push::Bytes { hex, declared_len } => {
                if declared_len > 8 {
                    return Err(DecodeError::UnsupportedAmountWidth {
                        index,
                        width: declared_len,
                    });
                }
                let value = hex_to_bytes(hex)?
                    .iter()
                    .rev()
                    .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
                Ok(Fixed8Amount::new(hex, value))
            }
        }
    }

    /// A fee amount where a bare `PUSH0` means "no fee" rather than zero.
    pub fn optional_fee(&self, index: usize) -> Result<Option<Fixed8Amount>, DecodeError> {
        if self.is(index, "PUSH0") {
            return Ok(None);
        }
        self.amount(index).map(Some)
    }

    /// A boolean pushed as `PUSH1` / `PUSH0`.
    pub fn flag(&self, index: usize) -> Result<bool, DecodeError> {
        match self.push(index)? {
            Push::Int(1) => Ok(true),
            Push::Int(0) => Ok(false),
            other => Err(DecodeError::operand(index, format!("expected a boolean, found {other:?}"))),
        }
    }

    /// An immediate integer (`PUSH0`..`PUSH16`) as pushed.
    pub fn small_int(&self, index: usize) -> Result<i64, DecodeError> {
        match self.push(index)? {
            Push::Int(n) => Ok(n),
            Push::Bytes { .. } => Err(DecodeError::operand(index, "expected an immediate integer")),
        }
    }

    pub fn address(&self, index: usize) -> Result<AddressRef, DecodeError> {
        AddressRef::from_script_hash(&self.hash_be(index, Some(40))?)
    }

    pub fn asset(&self, index: usize, tokens: &TokenTable) -> Result<AssetRef, DecodeError> {
        tokens.resolve(&self.hash_be(index, None)?)
    }

    /// Byte-array operand padded to `size` hex chars and read as UTF-8.
    pub fn utf8(&self, index: usize, size: Option<usize>) -> Result<String, DecodeError> {
        let bytes = hex_to_bytes(&self.raw_hex(index, size)?)?;
        String::from_utf8(bytes).map_err(|e| DecodeError::operand(index, e.to_string()))
    }
}
