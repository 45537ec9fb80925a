//! Error types for the aggregation engine.

use neoetl_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Unknown trade pair for {offer}/{want}")]
    UnknownTradePair { offer: String, want: String },

    #[error("Offer {offer_hash} has unusable terms: {reason}")]
    InvalidTerms { offer_hash: String, reason: String },

    #[error("Amount {amount} does not fit a signed balance")]
    Overflow { amount: u128 },
}

impl LedgerError {
    /// Returns `true` if only the ledger update for this record is lost and
    /// ingestion can continue.
    pub fn is_skippable(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}
