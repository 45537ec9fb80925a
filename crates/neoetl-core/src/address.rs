//! Script-hash ↔ base58check address conversion.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec::{hex_to_bytes, reverse_hex_bytes};
use crate::error::DecodeError;

/// Address version byte used on NEO mainnet.
pub const ADDRESS_VERSION: u8 = 0x17;

/// An account identifier in both of its forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressRef {
    /// Big-endian script hash (40 hex chars).
    pub script_hash: String,
    /// Base58check address (`A...`).
    pub address: String,
}

impl AddressRef {
    pub fn from_script_hash(script_hash: &str) -> Result<Self, DecodeError> {
        Ok(Self {
            address: address_from_script_hash(script_hash)?,
            script_hash: script_hash.to_string(),
        })
    }

    pub fn from_address(address: &str) -> Result<Self, DecodeError> {
        Ok(Self {
            script_hash: script_hash_from_address(address)?,
            address: address.to_string(),
        })
    }
}

pub(crate) fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Encode a big-endian script hash as a base58check address.
pub fn address_from_script_hash(script_hash: &str) -> Result<String, DecodeError> {
    if script_hash.len() != 40 {
        return Err(DecodeError::malformed(script_hash, "script hash must be 20 bytes"));
    }
    let le = hex_to_bytes(&reverse_hex_bytes(script_hash)?)?;

    let mut payload = Vec::with_capacity(25);
    payload.push(ADDRESS_VERSION);
    payload.extend_from_slice(&le);
    let checksum = sha256d(&payload);
    payload.extend_from_slice(&checksum[..4]);

    Ok(bs58::encode(payload).into_string())
}

/// Decode a base58check address into its big-endian script hash.
pub fn script_hash_from_address(address: &str) -> Result<String, DecodeError> {
    let invalid = |reason: &str| DecodeError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let data = bs58::decode(address)
        .into_vec()
        .map_err(|e| invalid(&e.to_string()))?;
    if data.len() != 25 {
        return Err(invalid("expected 25 bytes"));
    }
    if data[0] != ADDRESS_VERSION {
        return Err(invalid("wrong version byte"));
    }
    let checksum = sha256d(&data[..21]);
    if checksum[..4] != data[21..] {
        return Err(invalid("checksum mismatch"));
    }

    reverse_hex_bytes(&hex::encode(&data[1..21]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTODY: &str = "ASH41gtWftHvhuYhZz1jj7ee7z9vp9D9wk";
    const CUSTODY_HASH: &str = "e707714512577b42f9a011f8b870625429f93573";

    #[test]
    fn encodes_known_address() {
        assert_eq!(address_from_script_hash(CUSTODY_HASH).unwrap(), CUSTODY);
    }

    #[test]
    fn decodes_known_address() {
        assert_eq!(script_hash_from_address(CUSTODY).unwrap(), CUSTODY_HASH);
        assert_eq!(
            script_hash_from_address("AMAvaXFKtowxB5VpJ928QCSLZD9iMRnhbo").unwrap(),
            "2f5013a2cccf48f3c9617119be865886a1a4343b"
        );
    }

    #[test]
    fn rejects_bad_checksum() {
        let err = script_hash_from_address("ASH41gtWftHvhuYhZz1jj7ee7z9vp9D9wm").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidAddress { .. }));
    }

    #[test]
    fn rejects_short_script_hash() {
        assert!(address_from_script_hash("abcd").is_err());
    }
}
