//! Hex and Fixed8 helpers shared by every decoder.
//!
//! On-chain integers and script hashes are little-endian; every logical value
//! in this crate is big-endian hex, so nearly every operand passes through
//! [`zero_pad`] and [`reverse_hex_bytes`] before use.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Number of base units in one Fixed8 unit.
pub const FIXED8_SCALE: u64 = 100_000_000;

/// Byte-wise reversal of a hex string (endian flip).
pub fn reverse_hex_bytes(hex: &str) -> Result<String, DecodeError> {
    if hex.len() % 2 != 0 {
        return Err(DecodeError::malformed(hex, "odd length"));
    }
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DecodeError::malformed(hex, "non-hex character"));
    }
    let mut out = String::with_capacity(hex.len());
    for pair in hex.as_bytes().rchunks(2) {
        // chunks are ASCII hex digits, checked above
        out.push(pair[0] as char);
        out.push(pair[1] as char);
    }
    Ok(out)
}

/// Left-pad `hex` with `'0'` to an even length, or to `size` (rounded up to
/// even) when given. Never truncates.
pub fn zero_pad(hex: &str, size: Option<usize>) -> String {
    let target = match size {
        Some(n) => n + n % 2,
        None => hex.len() + hex.len() % 2,
    };
    if hex.len() >= target {
        return hex.to_string();
    }
    format!("{hex:0>target$}")
}

/// Render a raw integer as an 8-decimal Fixed8 string (`500000000` → `"5.00000000"`).
pub fn decode_fixed8(raw: u64) -> String {
    format!("{}.{:08}", raw / FIXED8_SCALE, raw % FIXED8_SCALE)
}

/// Parse a decimal string back into base units.
///
/// Accepts the output of [`decode_fixed8`] as well as the shorter forms nodes
/// report for transaction outputs (`"12"`, `"0.5"`).
pub fn parse_fixed8(value: &str) -> Result<u64, DecodeError> {
    let invalid = |reason: &str| DecodeError::InvalidAmount {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let (whole, frac) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid("empty"));
    }
    if frac.len() > 8 {
        return Err(invalid("more than 8 decimal places"));
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid("not a decimal number"));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid("integer part overflows"))?
    };
    let frac: u64 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<8}").parse().map_err(|_| invalid("bad fraction"))?
    };

    whole
        .checked_mul(FIXED8_SCALE)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| invalid("overflows u64"))
}

/// Decode hex into bytes with a crate error.
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, DecodeError> {
    hex::decode(hex).map_err(|e| DecodeError::malformed(hex, e.to_string()))
}

/// A decoded amount in every form downstream consumers need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixed8Amount {
    /// The push it came from: a mnemonic (`PUSH5`) or the raw operand hex.
    pub original: String,
    /// Base units.
    pub value: u64,
    /// 8-decimal rendering of `value`.
    pub fixed8: String,
}

impl Fixed8Amount {
    pub fn new(original: impl Into<String>, value: u64) -> Self {
        Self {
            original: original.into(),
            value,
            fixed8: decode_fixed8(value),
        }
    }

    /// Build from a node-reported decimal string such as a transaction output value.
    pub fn from_decimal(value: &str) -> Result<Self, DecodeError> {
        Ok(Self::new(value, parse_fixed8(value)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_flips_byte_order() {
        assert_eq!(reverse_hex_bytes("0102ab").unwrap(), "ab0201");
        assert_eq!(reverse_hex_bytes("").unwrap(), "");
    }

    #[test]
    fn reverse_is_an_involution() {
        for h in [
            "00",
            "26ae7c6c9861ec418468c1f0fdc4a7f2963eb891",
            "9b7cffdaa674beae0f930ebe6085af9093e5fe56b34a5c220ccdcf6efc336fc5",
        ] {
            assert_eq!(reverse_hex_bytes(&reverse_hex_bytes(h).unwrap()).unwrap(), h);
        }
    }

    #[test]
    fn reverse_rejects_odd_and_non_hex() {
        assert!(matches!(
            reverse_hex_bytes("abc"),
            Err(DecodeError::MalformedHex { .. })
        ));
        assert!(matches!(
            reverse_hex_bytes("zz"),
            Err(DecodeError::MalformedHex { .. })
        ));
    }

    #[test]
    fn zero_pad_even_and_sized() {
        assert_eq!(zero_pad("abc", None), "0abc");
        assert_eq!(zero_pad("ab", None), "ab");
        assert_eq!(zero_pad("ab", Some(6)), "0000ab");
        assert_eq!(zero_pad("ab", Some(5)), "0000ab");
        assert_eq!(zero_pad("abcdef", Some(4)), "abcdef");
    }

    #[test]
    fn fixed8_rendering() {
        assert_eq!(decode_fixed8(0), "0.00000000");
        assert_eq!(decode_fixed8(1), "0.00000001");
        assert_eq!(decode_fixed8(500_000_000), "5.00000000");
        assert_eq!(decode_fixed8(123_456_789_012), "1234.56789012");
    }

    #[test]
    fn fixed8_roundtrip_without_float_loss() {
        let samples = [
            0u64,
            1,
            99_999_999,
            100_000_000,
            (1u64 << 53) + 1,
            (1u64 << 63) - 1,
            1u64 << 63,
            u64::MAX,
        ];
        for n in samples {
            assert_eq!(parse_fixed8(&decode_fixed8(n)).unwrap(), n, "n = {n}");
        }
    }

    #[test]
    fn parse_short_decimals() {
        assert_eq!(parse_fixed8("12").unwrap(), 1_200_000_000);
        assert_eq!(parse_fixed8("0.5").unwrap(), 50_000_000);
        assert_eq!(parse_fixed8(".00000001").unwrap(), 1);
        assert!(parse_fixed8("1.000000001").is_err());
        assert!(parse_fixed8("-1").is_err());
        assert!(parse_fixed8("").is_err());
        assert!(parse_fixed8("184467440737.09551616").is_err());
    }
}
