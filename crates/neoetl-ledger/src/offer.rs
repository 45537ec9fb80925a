//! Per-offer order book state.
//!
//! Fills are kept as a set keyed by transaction hash and the derived amounts
//! are recomputed from that set on every change, so applying the same
//! operation twice leaves the state unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use neoetl_core::record::OfferTerms;
use neoetl_core::{AddressRef, AssetRef, Fixed8Amount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Open,
    Filled,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferState {
    pub offer_hash: String,
    pub status: OfferStatus,
    /// Created from a fill or cancel before the offer itself was seen.
    pub partial: bool,
    pub maker: Option<AddressRef>,
    pub offer_asset: Option<AssetRef>,
    pub offer_amount: Option<Fixed8Amount>,
    pub want_asset: Option<AssetRef>,
    pub want_amount: Option<Fixed8Amount>,
    /// `offer_amount - amount_filled`; negative when fills exceed the offer.
    pub maker_amount_open: Option<i64>,
    pub amount_filled: Option<u64>,
    /// Fill transaction → amount taken (unknown on the legacy layout).
    pub fills: BTreeMap<String, Option<u64>>,
    pub make_txn: Option<String>,
    pub cancel_txn: Option<String>,
}

impl OfferState {
    /// A placeholder for an offer referenced before its make was seen.
    pub fn partial(offer_hash: impl Into<String>) -> Self {
        Self {
            offer_hash: offer_hash.into(),
            status: OfferStatus::Open,
            partial: true,
            maker: None,
            offer_asset: None,
            offer_amount: None,
            want_asset: None,
            want_amount: None,
            maker_amount_open: None,
            amount_filled: None,
            fills: BTreeMap::new(),
            make_txn: None,
            cancel_txn: None,
        }
    }

    pub fn terms(&self) -> Option<OfferTerms> {
        Some(OfferTerms {
            maker: self.maker.clone()?,
            offer_asset: self.offer_asset.clone()?,
            offer_amount: self.offer_amount.clone()?,
            want_asset: self.want_asset.clone()?,
            want_amount: self.want_amount.clone()?,
        })
    }

    pub fn apply_make(&mut self, tx_hash: &str, terms: &OfferTerms) {
        self.partial = false;
        self.maker = Some(terms.maker.clone());
        self.offer_asset = Some(terms.offer_asset.clone());
        self.offer_amount = Some(terms.offer_amount.clone());
        self.want_asset = Some(terms.want_asset.clone());
        self.want_amount = Some(terms.want_amount.clone());
        self.make_txn = Some(tx_hash.to_string());
        self.recompute();
    }

    pub fn apply_fill(&mut self, tx_hash: &str, taker_amount: Option<u64>) {
        self.fills.insert(tx_hash.to_string(), taker_amount);
        self.recompute();
    }

    pub fn apply_cancel(&mut self, tx_hash: &str) {
        self.status = OfferStatus::Closed;
        self.cancel_txn = Some(tx_hash.to_string());
        self.recompute();
    }

    /// Re-derive `amount_filled`, `maker_amount_open` and the status from
    /// the fill set.
    pub fn recompute(&mut self) {
        // Any unknown fill amount makes the sum unknown.
        self.amount_filled = self
            .fills
            .values()
            .try_fold(0u64, |acc, fill| fill.and_then(|v| acc.checked_add(v)));

        if self.status == OfferStatus::Closed {
            self.maker_amount_open = Some(0);
            return;
        }

        self.maker_amount_open = match (&self.offer_amount, self.amount_filled) {
            (Some(offer), Some(filled)) => {
                let offer = i64::try_from(offer.value).unwrap_or(i64::MAX);
                let filled = i64::try_from(filled).unwrap_or(i64::MAX);
                Some(offer.saturating_sub(filled))
            }
            _ => None,
        };
        self.status = match self.maker_amount_open {
            Some(open) if open <= 0 => OfferStatus::Filled,
            _ => OfferStatus::Open,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::terms;

    #[test]
    fn fills_reduce_open_amount() {
        let mut state = OfferState::partial("aa");
        state.apply_make("make", &terms(500_000_000, 1_000_000_000));
        assert_eq!(state.maker_amount_open, Some(500_000_000));
        assert_eq!(state.amount_filled, Some(0));

        state.apply_fill("f1", Some(200_000_000));
        assert_eq!(state.maker_amount_open, Some(300_000_000));
        assert_eq!(state.amount_filled, Some(200_000_000));
        assert_eq!(state.status, OfferStatus::Open);
        assert!(!state.partial);

        state.apply_fill("f2", Some(300_000_000));
        assert_eq!(state.maker_amount_open, Some(0));
        assert_eq!(state.status, OfferStatus::Filled);
    }

    #[test]
    fn replayed_operations_converge() {
        let mut once = OfferState::partial("aa");
        once.apply_make("make", &terms(500_000_000, 1_000_000_000));
        once.apply_fill("f1", Some(200_000_000));

        let mut twice = once.clone();
        twice.apply_make("make", &terms(500_000_000, 1_000_000_000));
        twice.apply_fill("f1", Some(200_000_000));
        assert_eq!(once, twice);
    }

    #[test]
    fn fill_before_make_is_partial_then_completed() {
        let mut state = OfferState::partial("aa");
        state.apply_fill("f1", Some(100));
        assert!(state.partial);
        assert_eq!(state.amount_filled, Some(100));
        assert_eq!(state.maker_amount_open, None);
        assert!(state.terms().is_none());

        state.apply_make("make", &terms(400, 800));
        assert!(!state.partial);
        assert_eq!(state.maker_amount_open, Some(300));
        assert!(state.terms().is_some());
    }

    #[test]
    fn unknown_fill_amount_poisons_totals() {
        let mut state = OfferState::partial("aa");
        state.apply_make("make", &terms(400, 800));
        state.apply_fill("f1", Some(100));
        state.apply_fill("f2", None);
        assert_eq!(state.amount_filled, None);
        assert_eq!(state.maker_amount_open, None);
        assert_eq!(state.status, OfferStatus::Open);
    }

    #[test]
    fn cancel_closes_and_stays_closed() {
        let mut state = OfferState::partial("aa");
        state.apply_make("make", &terms(400, 800));
        state.apply_cancel("c1");
        assert_eq!(state.status, OfferStatus::Closed);
        assert_eq!(state.maker_amount_open, Some(0));
        assert_eq!(state.cancel_txn.as_deref(), Some("c1"));

        // A make replayed after the cancel must not reopen the offer.
        state.apply_make("make", &terms(400, 800));
        assert_eq!(state.status, OfferStatus::Closed);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_value(OfferStatus::Filled).unwrap();
        assert_eq!(json, "filled");
    }
}
