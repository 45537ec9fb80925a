//! Trade pair naming.
//!
//! A pair is `BASE_QUOTE`. The listed pairs win; anything else is named by
//! quote-asset rank (NEO before GAS before SWTH).

use std::collections::HashSet;

use crate::error::LedgerError;

/// Quote assets, most preferred first.
pub const DEFAULT_QUOTE_RANK: [&str; 3] = ["NEO", "GAS", "SWTH"];

/// Pairs that traded on the exchange but are no longer listed by it.
pub const DELISTED_PAIRS: [&str; 12] = [
    "ONT_NEO", "ONT_GAS", "ONT_SWTH", "SDT_NEO", "SDT_GAS", "SDT_SWTH", "RPX_NEO", "RPX_GAS",
    "RPX_SWTH", "IAM_NEO", "IAM_GAS", "IAM_SWTH",
];

#[derive(Debug, Clone)]
pub struct TradePairs {
    known: HashSet<String>,
    quote_rank: Vec<String>,
}

impl Default for TradePairs {
    fn default() -> Self {
        Self::new(DELISTED_PAIRS)
    }
}

impl TradePairs {
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: pairs.into_iter().map(Into::into).collect(),
            quote_rank: DEFAULT_QUOTE_RANK.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_pairs<I, S>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known.extend(pairs.into_iter().map(Into::into));
        self
    }

    pub fn with_quote_rank<I, S>(mut self, rank: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.quote_rank = rank.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_known(&self, pair: &str) -> bool {
        self.known.contains(pair)
    }

    /// Name the market an offer of `offer` for `want` trades on.
    pub fn resolve(&self, offer: &str, want: &str) -> Result<String, LedgerError> {
        let direct = format!("{offer}_{want}");
        if self.known.contains(&direct) {
            return Ok(direct);
        }
        let flipped = format!("{want}_{offer}");
        if self.known.contains(&flipped) {
            return Ok(flipped);
        }

        let rank = |symbol: &str| self.quote_rank.iter().position(|q| q == symbol);
        match (rank(offer), rank(want)) {
            (Some(o), Some(w)) if o < w => Ok(flipped),
            (Some(_), Some(_)) => Ok(direct),
            (Some(_), None) => Ok(flipped),
            (None, Some(_)) => Ok(direct),
            (None, None) => Err(LedgerError::UnknownTradePair {
                offer: offer.to_string(),
                want: want.to_string(),
            }),
        }
    }
}
