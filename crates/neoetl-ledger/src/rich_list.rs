//! Rich-list balance deltas and their per-address rollup.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Why an address balance moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaRole {
    MakerWant,
    MakerOffer,
    TakerWant,
    TakerOffer,
    Deposit,
    TransferTo,
    TransferFrom,
}

impl DeltaRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MakerWant => "maker_want",
            Self::MakerOffer => "maker_offer",
            Self::TakerWant => "taker_want",
            Self::TakerOffer => "taker_offer",
            Self::Deposit => "deposit",
            Self::TransferTo => "transfer_to",
            Self::TransferFrom => "transfer_from",
        }
    }
}

impl fmt::Display for DeltaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One balance movement, stored in `address_transactions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichListDelta {
    pub id: String,
    pub address: String,
    pub transaction_hash: String,
    pub role: DeltaRole,
    pub block_number: u64,
    pub block_date: String,
    /// `switcheo_transaction_type` of the operation that caused it.
    pub operation: String,
    pub asset: String,
    pub amount: u64,
    pub on_chain: i64,
    pub smart_contract: i64,
    pub total: i64,
}

impl RichListDelta {
    pub fn id_for(address: &str, tx_hash: &str, role: DeltaRole) -> String {
        format!("{address}_{tx_hash}_{role}")
    }

    /// Prefix shared by every delta of `address`.
    pub fn prefix(address: &str) -> String {
        format!("{address}_")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichListBalance {
    pub total: i64,
    pub on_chain: i64,
    pub smart_contract: i64,
}

impl RichListBalance {
    /// Empty balance whose `total` starts at the baseline for `asset`.
    pub fn starting_at(baseline: Option<&BTreeMap<String, u64>>, asset: &str) -> Self {
        let total = baseline
            .and_then(|b| b.get(asset))
            .map_or(0, |v| i64::try_from(*v).unwrap_or(i64::MAX));
        Self {
            total,
            ..Default::default()
        }
    }

    /// Count one delta. `total` only takes deltas dated on or after
    /// `cutoff` (`YYYY-MM-DD` compares as text).
    pub fn add(&mut self, delta: &RichListDelta, cutoff: &str) {
        self.on_chain = self.on_chain.saturating_add(delta.on_chain);
        self.smart_contract = self.smart_contract.saturating_add(delta.smart_contract);
        if delta.block_date.as_str() >= cutoff {
            self.total = self.total.saturating_add(delta.total);
        }
    }
}

/// Recompute an address's rich-list balance from all of its deltas.
///
/// Only deltas in `asset` count. The engine keeps the balance running as
/// deltas arrive; this full fold is for re-basing it.
pub fn rollup<'a, I>(
    deltas: I,
    asset: &str,
    cutoff: &str,
    baseline: Option<&BTreeMap<String, u64>>,
) -> RichListBalance
where
    I: IntoIterator<Item = &'a RichListDelta>,
{
    let mut balance = RichListBalance::starting_at(baseline, asset);
    for delta in deltas.into_iter().filter(|d| d.asset == asset) {
        balance.add(delta, cutoff);
    }
    balance
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(role: DeltaRole, date: &str, asset: &str, on_chain: i64, sc: i64, total: i64) -> RichListDelta {
        RichListDelta {
            id: RichListDelta::id_for("AX", "tx", role),
            address: "AX".into(),
            transaction_hash: "tx".into(),
            role,
            block_number: 1,
            block_date: date.into(),
            operation: "deposit".into(),
            asset: asset.into(),
            amount: on_chain.unsigned_abs().max(sc.unsigned_abs()),
            on_chain,
            smart_contract: sc,
            total,
        }
    }

    #[test]
    fn ids_and_prefix() {
        assert_eq!(
            RichListDelta::id_for("AX", "ff00", DeltaRole::TakerWant),
            "AX_ff00_taker_want"
        );
        assert!(RichListDelta::id_for("AX", "ff00", DeltaRole::Deposit)
            .starts_with(&RichListDelta::prefix("AX")));
    }

    #[test]
    fn total_respects_cutoff_and_baseline() {
        let deltas = vec![
            delta(DeltaRole::Deposit, "2018-10-01", "SWTH", -100, 100, 0),
            delta(DeltaRole::TransferTo, "2018-10-29", "SWTH", 50, 0, 50),
            delta(DeltaRole::TransferTo, "2018-10-30", "SWTH", 70, 0, 70),
            delta(DeltaRole::TransferTo, "2018-11-02", "NEO", 9, 0, 9),
        ];
        let baseline = BTreeMap::from([("SWTH".to_string(), 1_000u64)]);

        let balance = rollup(&deltas, "SWTH", "2018-10-30", Some(&baseline));
        assert_eq!(
            balance,
            RichListBalance {
                total: 1_070,
                on_chain: 20,
                smart_contract: 100,
            }
        );

        let no_baseline = rollup(&deltas, "SWTH", "2018-10-30", None);
        assert_eq!(no_baseline.total, 70);
    }
}
