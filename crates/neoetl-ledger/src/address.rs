//! Per-address trading statistics and balances.
//!
//! The merge methods on [`AddressLedgerEntry`] fold unconditionally. Replay
//! protection lives outside the entry: each merge is claimed under an
//! [`AppliedMerge`] key in `address_merges`, and the engine skips keys it
//! finds there. Activity is stored one [`AddressActivity`] document per
//! address and transaction, so neither grows the entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use neoetl_core::record::{Fee, Payment, RecordMeta};
use neoetl_core::Fixed8Amount;

use crate::rich_list::{RichListBalance, RichListDelta};

/// Per-asset balances, in base units. Balances only ever see movements the
/// exchange observed, so they can go negative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBalances {
    pub on_chain: BTreeMap<String, i64>,
    pub smart_contract: BTreeMap<String, i64>,
    pub total: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeTypeCount {
    pub maker: u64,
    pub taker: u64,
}

/// Make or take counters for one trade pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairCounts {
    pub count: u64,
    pub wants: BTreeMap<String, u64>,
    pub offers: BTreeMap<String, u64>,
}

impl PairCounts {
    fn bump(&mut self, offer_asset: &str, want_asset: &str) {
        self.count += 1;
        *self.wants.entry(want_asset.to_string()).or_default() += 1;
        *self.offers.entry(offer_asset.to_string()).or_default() += 1;
    }
}

// ─── Activity log ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositActivity {
    pub asset: String,
    pub amount: Fixed8Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeActivity {
    pub offer_hash: String,
    pub offer_asset: String,
    pub offer_amount: Fixed8Amount,
    pub want_asset: String,
    pub want_amount: Fixed8Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillActivity {
    pub offer_hash: String,
    pub taker_amount: Option<Fixed8Amount>,
    pub fee: Option<Fee>,
    /// Maker address, when the offer's make has been seen.
    pub maker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelActivity {
    pub offer_hash: String,
    pub offer_asset: Option<String>,
    pub offer_amount: Option<Fixed8Amount>,
    pub want_asset: Option<String>,
    pub want_amount: Option<Fixed8Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawActivity {
    pub withdrawals: Vec<Payment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "activity", rename_all = "snake_case")]
pub enum Activity {
    Deposit(DepositActivity),
    Make(MakeActivity),
    Fill(FillActivity),
    Cancel(CancelActivity),
    Withdraw(WithdrawActivity),
}

/// One exchange action of one address, stored in `address_activity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressActivity {
    pub address: String,
    pub transaction_hash: String,
    pub block_number: u64,
    pub block_date: String,
    #[serde(flatten)]
    pub activity: Activity,
}

impl AddressActivity {
    pub fn new(address: &str, meta: &RecordMeta, activity: Activity) -> Self {
        Self {
            address: address.to_string(),
            transaction_hash: meta.transaction_hash.clone(),
            block_number: meta.block_number,
            block_date: meta.block_date.clone(),
            activity,
        }
    }

    pub fn id(&self) -> String {
        Self::id_for(&self.address, &self.transaction_hash)
    }

    pub fn id_for(address: &str, tx_hash: &str) -> String {
        format!("{address}_{tx_hash}")
    }

    /// Prefix shared by every activity of `address`.
    pub fn prefix(address: &str) -> String {
        format!("{address}_")
    }
}

// ─── Merge keys ──────────────────────────────────────────────────────────────

/// Marks one merge of one transaction into an address entry and its daily
/// snapshot as done. Stored in `address_merges`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMerge {
    pub address: String,
    pub transaction_hash: String,
    pub part: String,
}

impl AppliedMerge {
    pub fn id(&self) -> String {
        Self::id_for(&self.address, &self.transaction_hash, &self.part)
    }

    pub fn id_for(address: &str, tx_hash: &str, part: &str) -> String {
        format!("{address}|{tx_hash}|{part}")
    }

    /// Prefix shared by every merge of `tx_hash` into `address`.
    pub fn prefix(address: &str, tx_hash: &str) -> String {
        format!("{address}|{tx_hash}|")
    }
}

// ─── Entry ───────────────────────────────────────────────────────────────────

/// Aggregates for one address, or for one address on one day when `date`
/// is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressLedgerEntry {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub fees_paid: BTreeMap<String, u64>,
    /// Fills per trade pair.
    pub trade_count: BTreeMap<String, u64>,
    pub amount_traded: BTreeMap<String, u64>,
    pub total_amount_traded: BTreeMap<String, u64>,
    pub asset_balance: AssetBalances,
    pub trade_type_count: TradeTypeCount,
    pub makes: BTreeMap<String, PairCounts>,
    pub takes: BTreeMap<String, PairCounts>,
    /// Running rich-list balance in the settlement asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_list: Option<RichListBalance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_balance: Option<BTreeMap<String, u64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Maker,
    Taker,
}

impl TradeSide {
    /// Merge key part for this side of a fill.
    pub fn part(self) -> &'static str {
        match self {
            Self::Maker => "trade:maker",
            Self::Taker => "trade:taker",
        }
    }
}

/// One side of a fill, from the point of view of the address being updated.
#[derive(Debug, Clone, Copy)]
pub struct TradeLeg<'a> {
    pub side: TradeSide,
    pub pair: &'a str,
    /// The asset this address gave up, and how much.
    pub gave: (&'a str, u64),
    /// The asset this address received, and how much.
    pub got: (&'a str, u64),
}

impl AddressLedgerEntry {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn for_date(address: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            date: Some(date.into()),
            ..Default::default()
        }
    }

    /// Document id: the address, or `address|date` for a daily snapshot.
    pub fn id(&self) -> String {
        match &self.date {
            Some(date) => Self::snapshot_id(&self.address, date),
            None => self.address.clone(),
        }
    }

    pub fn snapshot_id(address: &str, date: &str) -> String {
        format!("{address}|{date}")
    }

    pub fn add_fee(&mut self, asset: &str, amount: u64) {
        add_to(&mut self.fees_paid, asset, amount);
    }

    /// Count one fill on `leg.pair`. `amount_traded` records what this
    /// address gave; `total_amount_traded` records both sides.
    pub fn add_trade(&mut self, leg: TradeLeg<'_>) {
        *self.trade_count.entry(leg.pair.to_string()).or_default() += 1;

        let (gave_asset, gave_amount) = leg.gave;
        let (got_asset, got_amount) = leg.got;
        add_to(&mut self.amount_traded, gave_asset, gave_amount);
        add_to(&mut self.total_amount_traded, gave_asset, gave_amount);
        add_to(&mut self.total_amount_traded, got_asset, got_amount);
    }

    pub fn adjust_balance(&mut self, asset: &str, on_chain: i64, smart_contract: i64, total: i64) {
        let balances = &mut self.asset_balance;
        for (map, delta) in [
            (&mut balances.on_chain, on_chain),
            (&mut balances.smart_contract, smart_contract),
            (&mut balances.total, total),
        ] {
            if delta != 0 {
                let v = map.entry(asset.to_string()).or_default();
                *v = v.saturating_add(delta);
            }
        }
    }

    pub fn count_make(&mut self, pair: &str, offer_asset: &str, want_asset: &str) {
        self.trade_type_count.maker += 1;
        self.makes
            .entry(pair.to_string())
            .or_default()
            .bump(offer_asset, want_asset);
    }

    pub fn count_take(&mut self, pair: &str, offer_asset: &str, want_asset: &str) {
        self.trade_type_count.taker += 1;
        self.takes
            .entry(pair.to_string())
            .or_default()
            .bump(offer_asset, want_asset);
    }

    /// Fold one settlement-asset delta into the running rich-list balance,
    /// starting from the baseline the first time.
    pub fn add_rich_list_delta(&mut self, delta: &RichListDelta, cutoff: &str) {
        let baseline = self.baseline_balance.as_ref();
        self.rich_list
            .get_or_insert_with(|| RichListBalance::starting_at(baseline, &delta.asset))
            .add(delta, cutoff);
    }
}

fn add_to(map: &mut BTreeMap<String, u64>, asset: &str, amount: u64) {
    let v = map.entry(asset.to_string()).or_default();
    *v = v.saturating_add(amount);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rich_list::DeltaRole;
    use crate::testing::{meta, DATE};

    #[test]
    fn balances_and_fees_fold() {
        let mut entry = AddressLedgerEntry::new("AX");
        entry.add_fee("SWTH", 10);
        entry.add_fee("SWTH", 5);
        assert_eq!(entry.fees_paid["SWTH"], 15);

        entry.adjust_balance("NEO", -3, 3, 0);
        assert_eq!(entry.asset_balance.on_chain["NEO"], -3);
        assert_eq!(entry.asset_balance.smart_contract["NEO"], 3);
        assert!(!entry.asset_balance.total.contains_key("NEO"));
    }

    #[test]
    fn one_fill_touches_several_counters() {
        let mut entry = AddressLedgerEntry::new("AX");
        entry.adjust_balance("SWTH", 0, 20, 20);
        entry.adjust_balance("NEO", 0, -40, -40);
        entry.add_trade(TradeLeg {
            side: TradeSide::Taker,
            pair: "SWTH_NEO",
            gave: ("NEO", 40),
            got: ("SWTH", 20),
        });
        entry.count_take("SWTH_NEO", "SWTH", "NEO");

        assert_eq!(entry.trade_count["SWTH_NEO"], 1);
        assert_eq!(entry.amount_traded["NEO"], 40);
        assert_eq!(entry.total_amount_traded["SWTH"], 20);
        assert_eq!(entry.trade_type_count.taker, 1);
        assert_eq!(entry.takes["SWTH_NEO"].wants["NEO"], 1);
        assert_eq!(entry.takes["SWTH_NEO"].offers["SWTH"], 1);
    }

    #[test]
    fn running_rich_list_starts_from_baseline_and_honours_cutoff() {
        let delta = |date: &str, total: i64| RichListDelta {
            id: RichListDelta::id_for("AX", date, DeltaRole::TransferTo),
            address: "AX".into(),
            transaction_hash: date.into(),
            role: DeltaRole::TransferTo,
            block_number: 1,
            block_date: date.into(),
            operation: "transfer".into(),
            asset: "SWTH".into(),
            amount: total.unsigned_abs(),
            on_chain: total,
            smart_contract: 0,
            total,
        };
        let mut entry = AddressLedgerEntry::new("AX");
        entry.baseline_balance = Some(BTreeMap::from([("SWTH".to_string(), 1_000)]));
        entry.add_rich_list_delta(&delta("2018-10-29", 50), "2018-10-30");
        entry.add_rich_list_delta(&delta("2018-10-30", 70), "2018-10-30");

        let balance = entry.rich_list.unwrap();
        assert_eq!(balance.total, 1_070);
        assert_eq!(balance.on_chain, 120);
    }

    #[test]
    fn keyed_ids() {
        assert_eq!(AddressLedgerEntry::new("AX").id(), "AX");
        assert_eq!(AddressLedgerEntry::for_date("AX", "2018-11-01").id(), "AX|2018-11-01");

        let merge = AppliedMerge {
            address: "AX".into(),
            transaction_hash: "t1".into(),
            part: TradeSide::Maker.part().into(),
        };
        assert_eq!(merge.id(), "AX|t1|trade:maker");
        assert!(merge.id().starts_with(&AppliedMerge::prefix("AX", "t1")));
        assert!(!merge.id().starts_with(&AppliedMerge::prefix("AX", "t")));
    }

    #[test]
    fn activity_is_tagged_and_flat() {
        let activity = AddressActivity::new(
            "AX",
            &meta("d1"),
            Activity::Deposit(DepositActivity {
                asset: "SWTH".into(),
                amount: Fixed8Amount::new("0a", 10),
            }),
        );
        assert_eq!(activity.id(), "AX_d1");
        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["activity"], "deposit");
        assert_eq!(json["asset"], "SWTH");
        assert_eq!(json["block_date"], DATE);
        let back: AddressActivity = serde_json::from_value(json).unwrap();
        assert_eq!(back, activity);
    }

    #[test]
    fn entry_survives_a_json_round_trip() {
        let mut entry = AddressLedgerEntry::new("AX");
        entry.count_make("SWTH_NEO", "SWTH", "NEO");
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("date").is_none());
        let back: AddressLedgerEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
