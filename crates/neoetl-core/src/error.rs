//! Error types for script decoding.

use thiserror::Error;

/// Errors raised while disassembling, resolving or decoding a transaction script.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed hex '{hex}': {reason}")]
    MalformedHex { hex: String, reason: String },

    #[error("Operand {index}: {reason}")]
    OperandDecode { index: usize, reason: String },

    #[error("Operand {index}: amount width of {width} bytes is not supported (max 8)")]
    UnsupportedAmountWidth { index: usize, width: usize },

    #[error("Invalid Fixed8 amount '{value}': {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error("Unknown asset {hash}")]
    UnknownAsset { hash: String },

    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Contract {hash} has no known version")]
    UnknownContractVersion { hash: String },

    #[error("Truncated script at byte {offset}: {reason}")]
    TruncatedScript { offset: usize, reason: String },

    #[error("Critical contract {hash} invoked with unknown function '{function}'")]
    UnknownCriticalContract { hash: String, function: String },
}

impl DecodeError {
    /// Returns `true` if this error must abort the block instead of skipping
    /// the single offending transaction.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnknownCriticalContract { .. })
    }

    pub(crate) fn operand(index: usize, reason: impl Into<String>) -> Self {
        Self::OperandDecode {
            index,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(hex: &str, reason: impl Into<String>) -> Self {
        Self::MalformedHex {
            hex: hex.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_critical_contract_is_fatal() {
        let critical = DecodeError::UnknownCriticalContract {
            hash: "91b83e96f2a7c4fdf0c1688441ec61986c7cae26".into(),
            function: "6e6f7065".into(),
        };
        assert!(critical.is_fatal());
        assert!(!DecodeError::UnsupportedAmountWidth { index: 0, width: 9 }.is_fatal());
        assert!(!DecodeError::operand(3, "out of range").is_fatal());
    }
}
