//! Offer hash derivation: the join key between MakeOffer and later
//! FillOffer / Cancel records.

use crate::address::sha256d;
use crate::codec::{hex_to_bytes, reverse_hex_bytes};
use crate::error::DecodeError;

/// Inputs to the offer hash, all big-endian hex as decoded.
#[derive(Debug, Clone, Copy)]
pub struct OfferKey<'a> {
    pub maker_script_hash: &'a str,
    pub offer_asset: &'a str,
    pub offer_amount: u64,
    pub want_asset: &'a str,
    pub want_amount: u64,
    /// Nonce bytes exactly as pushed.
    pub nonce: &'a [u8],
}

/// Computes offer hashes from decoded offer terms.
pub trait OfferHasher: Send + Sync {
    fn offer_hash(&self, key: &OfferKey<'_>) -> Result<String, DecodeError>;
}

/// Double SHA-256 over the offer key laid out the way the contract stores it:
/// maker ‖ offer asset ‖ want asset (little-endian), offer amount ‖ want
/// amount (8-byte little-endian), nonce. The digest is displayed reversed,
/// matching how offer hashes appear in fill and cancel operands.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256dOfferHasher;

impl OfferHasher for Sha256dOfferHasher {
    fn offer_hash(&self, key: &OfferKey<'_>) -> Result<String, DecodeError> {
        let mut buf = Vec::with_capacity(20 + 32 + 32 + 16 + key.nonce.len());
        for hash in [key.maker_script_hash, key.offer_asset, key.want_asset] {
            buf.extend(hex_to_bytes(&reverse_hex_bytes(hash)?)?);
        }
        buf.extend_from_slice(&key.offer_amount.to_le_bytes());
        buf.extend_from_slice(&key.want_amount.to_le_bytes());
        buf.extend_from_slice(key.nonce);

        reverse_hex_bytes(&hex::encode(sha256d(&buf)))
    }
}
