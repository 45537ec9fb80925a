//! NEO AVM bytecode disassembler.
//!
//! Only the structure of the stream matters here: push payloads and call
//! targets keep their operand bytes, every other opcode is emitted as a bare
//! mnemonic. Nothing is executed.

use crate::codec::hex_to_bytes;
use crate::error::DecodeError;
use crate::script::RawInstruction;

/// Turns raw script bytes into an ordered instruction sequence.
pub trait Disassembler: Send + Sync {
    fn disassemble(&self, script: &[u8]) -> Result<Vec<RawInstruction>, DecodeError>;

    /// Convenience wrapper for scripts delivered as hex by the node.
    fn disassemble_hex(&self, script_hex: &str) -> Result<Vec<RawInstruction>, DecodeError> {
        let hex = script_hex.strip_prefix("0x").unwrap_or(script_hex);
        self.disassemble(&hex_to_bytes(hex)?)
    }
}

/// Disassembler for the NEO 2.x AVM instruction set.
#[derive(Debug, Default, Clone, Copy)]
pub struct AvmDisassembler;

impl Disassembler for AvmDisassembler {
    fn disassemble(&self, script: &[u8]) -> Result<Vec<RawInstruction>, DecodeError> {
        let mut cursor = Cursor { script, offset: 0 };
        let mut out = Vec::new();

        while let Some(op) = cursor.next_byte() {
            let instruction = match op {
                0x00 => RawInstruction::bare("PUSH0"),
                0x01..=0x4b => {
                    let n = op as usize;
                    RawInstruction::with_operand(format!("PUSHBYTES{n}"), cursor.take(n)?)
                }
                0x4c => {
                    let len = cursor.take_le(1)?;
                    RawInstruction::with_operand("PUSHDATA1", cursor.take(len)?)
                }
                0x4d => {
                    let len = cursor.take_le(2)?;
                    RawInstruction::with_operand("PUSHDATA2", cursor.take(len)?)
                }
                0x4e => {
                    let len = cursor.take_le(4)?;
                    RawInstruction::with_operand("PUSHDATA4", cursor.take(len)?)
                }
                0x4f => RawInstruction::bare("PUSHM1"),
                0x51..=0x60 => RawInstruction::bare(format!("PUSH{}", op - 0x50)),
                0x62..=0x65 => RawInstruction::with_operand(mnemonic(op), cursor.take(2)?),
                0x67 | 0x69 => RawInstruction::with_operand(mnemonic(op), cursor.take(20)?),
                0x68 => {
                    let len = cursor.take_var_int()?;
                    RawInstruction::with_operand("SYSCALL", cursor.take(len)?)
                }
                0xe0 => RawInstruction::with_operand("CALL_I", cursor.take(4)?),
                0xe1 | 0xe3 => RawInstruction::with_operand(mnemonic(op), cursor.take(22)?),
                0xe2 | 0xe4 => RawInstruction::with_operand(mnemonic(op), cursor.take(2)?),
                _ => RawInstruction::bare(mnemonic(op)),
            };
            out.push(instruction);
        }

        Ok(out)
    }
}

struct Cursor<'a> {
    script: &'a [u8],
    offset: usize,
}

impl Cursor<'_> {
    fn next_byte(&mut self) -> Option<u8> {
        let b = self.script.get(self.offset).copied()?;
        self.offset += 1;
        Some(b)
    }

    fn take(&mut self, n: usize) -> Result<String, DecodeError> {
        let end = self.offset.checked_add(n).filter(|end| *end <= self.script.len());
        let Some(end) = end else {
            return Err(DecodeError::TruncatedScript {
                offset: self.offset,
                reason: format!("operand of {n} bytes runs past end of script"),
            });
        };
        let operand = hex::encode(&self.script[self.offset..end]);
        self.offset = end;
        Ok(operand)
    }

    fn take_le(&mut self, width: usize) -> Result<usize, DecodeError> {
        let start = self.offset;
        let bytes = hex_to_bytes(&self.take(width)?)?;
        let value = bytes
            .iter()
            .rev()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
        usize::try_from(value).map_err(|_| DecodeError::TruncatedScript {
            offset: start,
            reason: "length prefix does not fit in memory".into(),
        })
    }

    fn take_var_int(&mut self) -> Result<usize, DecodeError> {
        let start = self.offset;
        match self.next_byte() {
            Some(0xfd) => self.take_le(2),
            Some(0xfe) => self.take_le(4),
            Some(0xff) => self.take_le(8),
            Some(b) => Ok(b as usize),
            None => Err(DecodeError::TruncatedScript {
                offset: start,
                reason: "missing length prefix".into(),
            }),
        }
    }
}

fn mnemonic(op: u8) -> String {
    let name = match op {
        0x61 => "NOP",
        0x62 => "JMP",
        0x63 => "JMPIF",
        0x64 => "JMPIFNOT",
        0x65 => "CALL",
        0x66 => "RET",
        0x67 => "APPCALL",
        0x68 => "SYSCALL",
        0x69 => "TAILCALL",
        0x6a => "DUPFROMALTSTACK",
        0x6b => "TOALTSTACK",
        0x6c => "FROMALTSTACK",
        0x6d => "XDROP",
        0x72 => "XSWAP",
        0x73 => "XTUCK",
        0x74 => "DEPTH",
        0x75 => "DROP",
        0x76 => "DUP",
        0x77 => "NIP",
        0x78 => "OVER",
        0x79 => "PICK",
        0x7a => "ROLL",
        0x7b => "ROT",
        0x7c => "SWAP",
        0x7d => "TUCK",
        0x7e => "CAT",
        0x7f => "SUBSTR",
        0x80 => "LEFT",
        0x81 => "RIGHT",
        0x82 => "SIZE",
        0x83 => "INVERT",
        0x84 => "AND",
        0x85 => "OR",
        0x86 => "XOR",
        0x87 => "EQUAL",
        0x8b => "INC",
        0x8c => "DEC",
        0x8d => "SIGN",
        0x8f => "NEGATE",
        0x90 => "ABS",
        0x91 => "NOT",
        0x92 => "NZ",
        0x93 => "ADD",
        0x94 => "SUB",
        0x95 => "MUL",
        0x96 => "DIV",
        0x97 => "MOD",
        0x98 => "SHL",
        0x99 => "SHR",
        0x9a => "BOOLAND",
        0x9b => "BOOLOR",
        0x9c => "NUMEQUAL",
        0x9e => "NUMNOTEQUAL",
        0x9f => "LT",
        0xa0 => "GT",
        0xa1 => "LTE",
        0xa2 => "GTE",
        0xa3 => "MIN",
        0xa4 => "MAX",
        0xa5 => "WITHIN",
        0xa7 => "SHA1",
        0xa8 => "SHA256",
        0xa9 => "HASH160",
        0xaa => "HASH256",
        0xac => "CHECKSIG",
        0xad => "VERIFY",
        0xae => "CHECKMULTISIG",
        0xc0 => "ARRAYSIZE",
        0xc1 => "PACK",
        0xc2 => "UNPACK",
        0xc3 => "PICKITEM",
        0xc4 => "SETITEM",
        0xc5 => "NEWARRAY",
        0xc6 => "NEWSTRUCT",
        0xc7 => "NEWMAP",
        0xc8 => "APPEND",
        0xc9 => "REVERSE",
        0xca => "REMOVE",
        0xcb => "HASKEY",
        0xcc => "KEYS",
        0xcd => "VALUES",
        0xe0 => "CALL_I",
        0xe1 => "CALL_E",
        0xe2 => "CALL_ED",
        0xe3 => "CALL_ET",
        0xe4 => "CALL_EDT",
        0xf0 => "THROW",
        0xf1 => "THROWIFNOT",
        other => return format!("UNKNOWN_{other:02X}"),
    };
    name.to_string()
}
