//! Routes decoded operations into offer state, address ledger entries and
//! rich-list deltas.
//!
//! Each operation is read-then-merged against the store and written back in
//! one atomic batch, so the next operation always sees the previous one. A
//! batch only touches documents keyed by the operation's addresses and
//! transaction; nothing scans an address's history.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use neoetl_core::contracts::CUSTODY_ADDRESSES;
use neoetl_core::record::{
    Cancel, Deposit, FillOffer, MakeOffer, OfferTerms, RecordMeta, Transfer, Withdraw,
};
use neoetl_core::{Collection, DocumentStore, OperationRecord, WriteBatch};

use crate::address::{
    Activity, AddressActivity, AddressLedgerEntry, AppliedMerge, CancelActivity, DepositActivity,
    FillActivity, MakeActivity, TradeLeg, TradeSide, WithdrawActivity,
};
use crate::error::LedgerError;
use crate::offer::OfferState;
use crate::rich_list::{rollup, DeltaRole, RichListDelta};
use crate::trade_pair::TradePairs;

/// Rich-list settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Symbol whose balances make up the rich list; its transfers also move
    /// ledger balances.
    pub settlement_asset: String,
    /// First `YYYY-MM-DD` whose deltas count toward the rich-list total.
    pub rich_list_cutoff: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            settlement_asset: "SWTH".into(),
            rich_list_cutoff: "2018-10-30".into(),
        }
    }
}

/// What one [`LedgerEngine::apply`] call wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub offers: usize,
    pub entries: usize,
    pub deltas: usize,
    /// Merges folded for the first time; zero on a replay.
    pub merges: usize,
}

/// Entries, keys and logs touched while applying one operation.
struct Working {
    tx: String,
    date: String,
    settlement_asset: String,
    cutoff: String,
    entries: BTreeMap<String, AddressLedgerEntry>,
    /// Merge keys already in the store for this transaction.
    merged: BTreeSet<String>,
    merges: Vec<AppliedMerge>,
    activity: Vec<AddressActivity>,
    deltas: Vec<RichListDelta>,
}

impl Working {
    fn new(meta: &RecordMeta, config: &LedgerConfig) -> Self {
        Self {
            tx: meta.transaction_hash.clone(),
            date: meta.block_date.clone(),
            settlement_asset: config.settlement_asset.clone(),
            cutoff: config.rich_list_cutoff.clone(),
            entries: BTreeMap::new(),
            merged: BTreeSet::new(),
            merges: Vec::new(),
            activity: Vec::new(),
            deltas: Vec::new(),
        }
    }

    fn main(&mut self, address: &str) -> &mut AddressLedgerEntry {
        self.entries
            .entry(address.to_string())
            .or_insert_with(|| AddressLedgerEntry::new(address))
    }

    /// Run `merge` on the address entry and on its snapshot for the day,
    /// unless `part` of this transaction was already merged for `address`.
    fn each(&mut self, address: &str, part: &str, mut merge: impl FnMut(&mut AddressLedgerEntry)) -> bool {
        let key = AppliedMerge::id_for(address, &self.tx, part);
        if !self.merged.insert(key) {
            return false;
        }
        merge(self.main(address));
        let date = self.date.clone();
        let snapshot = self
            .entries
            .entry(AddressLedgerEntry::snapshot_id(address, &date))
            .or_insert_with(|| AddressLedgerEntry::for_date(address, date));
        merge(snapshot);
        self.merges.push(AppliedMerge {
            address: address.to_string(),
            transaction_hash: self.tx.clone(),
            part: part.to_string(),
        });
        true
    }

    fn log(&mut self, address: &str, meta: &RecordMeta, activity: Activity) {
        self.activity.push(AddressActivity::new(address, meta, activity));
    }

    fn move_balance(&mut self, meta: &RecordMeta, operation: &str, change: BalanceChange<'_>) {
        let merged = self.each(change.address, change.role.as_str(), |e| {
            e.adjust_balance(change.asset, change.on_chain, change.smart_contract, change.total)
        });
        if !merged {
            return;
        }
        let tx = &meta.transaction_hash;
        let delta = RichListDelta {
            id: RichListDelta::id_for(change.address, tx, change.role),
            address: change.address.to_string(),
            transaction_hash: tx.clone(),
            role: change.role,
            block_number: meta.block_number,
            block_date: meta.block_date.clone(),
            operation: operation.to_string(),
            asset: change.asset.to_string(),
            amount: change.amount,
            on_chain: change.on_chain,
            smart_contract: change.smart_contract,
            total: change.total,
        };
        if delta.asset == self.settlement_asset {
            let entry = self
                .entries
                .entry(change.address.to_string())
                .or_insert_with(|| AddressLedgerEntry::new(change.address));
            entry.add_rich_list_delta(&delta, &self.cutoff);
        }
        self.deltas.push(delta);
    }
}

struct BalanceChange<'a> {
    address: &'a str,
    role: DeltaRole,
    asset: &'a str,
    amount: u64,
    on_chain: i64,
    smart_contract: i64,
    total: i64,
}

fn signed(amount: u64) -> Result<i64, LedgerError> {
    i64::try_from(amount).map_err(|_| LedgerError::Overflow {
        amount: amount.into(),
    })
}

/// Amount of the wanted asset exchanged for `taker_amount` of the offered
/// asset, at the offer's ratio, rounded down.
pub fn want_delta(offer_hash: &str, terms: &OfferTerms, taker_amount: u64) -> Result<u64, LedgerError> {
    let offer = terms.offer_amount.value;
    if offer == 0 {
        return Err(LedgerError::InvalidTerms {
            offer_hash: offer_hash.to_string(),
            reason: "offer amount is zero".into(),
        });
    }
    let delta = u128::from(taker_amount) * u128::from(terms.want_amount.value) / u128::from(offer);
    u64::try_from(delta).map_err(|_| LedgerError::Overflow { amount: delta })
}

pub struct LedgerEngine {
    store: Arc<dyn DocumentStore>,
    pairs: TradePairs,
    config: LedgerConfig,
}

impl LedgerEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            pairs: TradePairs::default(),
            config: LedgerConfig::default(),
        }
    }

    pub fn with_trade_pairs(mut self, pairs: TradePairs) -> Self {
        self.pairs = pairs;
        self
    }

    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Fold one operation into the aggregates.
    ///
    /// On [`LedgerError::UnknownTradePair`] the offer state is still written;
    /// only the address statistics for the operation are skipped.
    pub async fn apply(&self, record: &OperationRecord) -> Result<ApplyOutcome, LedgerError> {
        debug!(
            tx = %record.transaction_hash(),
            kind = record.type_name(),
            "aggregating"
        );
        match record {
            OperationRecord::MakeOffer(make) => self.apply_make(make).await,
            OperationRecord::FillOffer(fill) => self.apply_fill(fill).await,
            OperationRecord::Cancel(cancel) => self.apply_cancel(cancel).await,
            OperationRecord::Deposit(deposit) => self.apply_deposit(deposit).await,
            OperationRecord::Withdraw(withdraw) => self.apply_withdraw(withdraw).await,
            OperationRecord::Transfer(transfer) => self.apply_transfer(transfer).await,
            _ => Ok(ApplyOutcome::default()),
        }
    }

    fn working(&self, meta: &RecordMeta) -> Working {
        Working::new(meta, &self.config)
    }

    // ─── Offers ──────────────────────────────────────────────────────────────

    async fn apply_make(&self, make: &MakeOffer) -> Result<ApplyOutcome, LedgerError> {
        let (Some(offer_hash), Some(terms)) = (&make.offer_hash, &make.terms) else {
            debug!(tx = %make.meta.transaction_hash, "make without offer hash or terms");
            return Ok(ApplyOutcome::default());
        };
        let meta = &make.meta;
        let tx = &meta.transaction_hash;

        let mut offer = self.load_offer(offer_hash).await?;
        offer.apply_make(tx, terms);
        let mut batch = WriteBatch::new();
        batch.put_value(Collection::OfferHash, offer_hash, &offer)?;

        let maker = &terms.maker.address;
        let (offer_asset, want_asset) = (&terms.offer_asset.symbol, &terms.want_asset.symbol);
        let mut work = self.working(meta);
        work.log(
            maker,
            meta,
            Activity::Make(MakeActivity {
                offer_hash: offer_hash.clone(),
                offer_asset: offer_asset.clone(),
                offer_amount: terms.offer_amount.clone(),
                want_asset: want_asset.clone(),
                want_amount: terms.want_amount.clone(),
            }),
        );

        let pair = self.pairs.resolve(offer_asset, want_asset);
        if let Ok(pair) = &pair {
            self.load_entry(&mut work, maker).await?;
            work.each(maker, "make", |e| e.count_make(pair, offer_asset, want_asset));
        }
        let outcome = self.commit(work, batch, 1).await?;
        pair.map(|_| outcome)
    }

    async fn apply_fill(&self, fill: &FillOffer) -> Result<ApplyOutcome, LedgerError> {
        let meta = &fill.meta;
        let tx = &meta.transaction_hash;

        let mut offer = self.load_offer(&fill.offer_hash).await?;
        offer.apply_fill(tx, fill.taker_amount.as_ref().map(|a| a.value));
        let mut batch = WriteBatch::new();
        batch.put_value(Collection::OfferHash, &fill.offer_hash, &offer)?;

        let taker = &fill.taker.address;
        let mut work = self.working(meta);
        work.log(
            taker,
            meta,
            Activity::Fill(FillActivity {
                offer_hash: fill.offer_hash.clone(),
                taker_amount: fill.taker_amount.clone(),
                fee: fill.fee.clone(),
                maker: offer.maker.as_ref().map(|m| m.address.clone()),
            }),
        );
        if let Some(fee) = &fill.fee {
            if let Some(asset) = &fee.asset {
                self.load_entry(&mut work, taker).await?;
                work.each(taker, "fee", |e| e.add_fee(&asset.symbol, fee.amount.value));
            }
        }

        let settled = match (offer.terms(), &fill.taker_amount) {
            (Some(terms), Some(taker_amount)) => {
                self.settle_fill(&mut work, fill, &terms, taker_amount.value)
                    .await
            }
            _ => {
                debug!(tx = %tx, offer = %fill.offer_hash, "fill without known terms or amount");
                Ok(())
            }
        };
        let outcome = self.commit(work, batch, 1).await?;
        settled.map(|_| outcome)
    }

    /// Move balances between taker and maker for one fill. Nothing is
    /// merged unless every amount and the trade pair check out.
    async fn settle_fill(
        &self,
        work: &mut Working,
        fill: &FillOffer,
        terms: &OfferTerms,
        taker_amount: u64,
    ) -> Result<(), LedgerError> {
        let meta = &fill.meta;
        let offer_asset = terms.offer_asset.symbol.as_str();
        let want_asset = terms.want_asset.symbol.as_str();

        let pair = self.pairs.resolve(offer_asset, want_asset)?;
        let want_amount = want_delta(&fill.offer_hash, terms, taker_amount)?;
        let gave = signed(taker_amount)?;
        let got = signed(want_amount)?;

        let taker = fill.taker.address.as_str();
        let maker = terms.maker.address.as_str();
        self.load_entry(work, taker).await?;
        self.load_entry(work, maker).await?;

        let op = "fillOffer";
        for (address, role, asset, amount, delta) in [
            (taker, DeltaRole::TakerOffer, offer_asset, taker_amount, gave),
            (taker, DeltaRole::TakerWant, want_asset, want_amount, -got),
            (maker, DeltaRole::MakerOffer, offer_asset, taker_amount, -gave),
            (maker, DeltaRole::MakerWant, want_asset, want_amount, got),
        ] {
            work.move_balance(
                meta,
                op,
                BalanceChange {
                    address,
                    role,
                    asset,
                    amount,
                    on_chain: 0,
                    smart_contract: delta,
                    total: delta,
                },
            );
        }

        let legs = [
            (taker, TradeSide::Taker, (want_asset, want_amount), (offer_asset, taker_amount)),
            (maker, TradeSide::Maker, (offer_asset, taker_amount), (want_asset, want_amount)),
        ];
        for (address, side, gave, got) in legs {
            work.each(address, side.part(), |e| {
                e.add_trade(TradeLeg {
                    side,
                    pair: &pair,
                    gave,
                    got,
                })
            });
        }
        work.each(taker, "take", |e| e.count_take(&pair, offer_asset, want_asset));
        Ok(())
    }

    async fn apply_cancel(&self, cancel: &Cancel) -> Result<ApplyOutcome, LedgerError> {
        let meta = &cancel.meta;
        let tx = &meta.transaction_hash;

        let mut offer = self.load_offer(&cancel.offer_hash).await?;
        offer.apply_cancel(tx);
        let mut batch = WriteBatch::new();
        batch.put_value(Collection::OfferHash, &cancel.offer_hash, &offer)?;

        let mut work = self.working(meta);
        if let Some(maker) = &offer.maker {
            work.log(
                &maker.address,
                meta,
                Activity::Cancel(CancelActivity {
                    offer_hash: cancel.offer_hash.clone(),
                    offer_asset: offer.offer_asset.as_ref().map(|a| a.symbol.clone()),
                    offer_amount: offer.offer_amount.clone(),
                    want_asset: offer.want_asset.as_ref().map(|a| a.symbol.clone()),
                    want_amount: offer.want_amount.clone(),
                }),
            );
        }
        self.commit(work, batch, 1).await
    }

    // ─── Funds ───────────────────────────────────────────────────────────────

    async fn apply_deposit(&self, deposit: &Deposit) -> Result<ApplyOutcome, LedgerError> {
        let meta = &deposit.meta;
        let depositor = &deposit.depositor.address;
        let amount = signed(deposit.amount.value)?;

        let mut work = self.working(meta);
        work.log(
            depositor,
            meta,
            Activity::Deposit(DepositActivity {
                asset: deposit.asset.symbol.clone(),
                amount: deposit.amount.clone(),
            }),
        );
        self.load_entry(&mut work, depositor).await?;
        work.move_balance(
            meta,
            "deposit",
            BalanceChange {
                address: depositor,
                role: DeltaRole::Deposit,
                asset: &deposit.asset.symbol,
                amount: deposit.amount.value,
                on_chain: -amount,
                smart_contract: amount,
                total: 0,
            },
        );
        self.commit(work, WriteBatch::new(), 0).await
    }

    async fn apply_withdraw(&self, withdraw: &Withdraw) -> Result<ApplyOutcome, LedgerError> {
        let meta = &withdraw.meta;
        let recipient = withdraw
            .withdrawals
            .iter()
            .find(|p| !CUSTODY_ADDRESSES.contains(&p.address.as_str()));
        let Some(recipient) = recipient else {
            debug!(tx = %meta.transaction_hash, "withdrawal pays only custody addresses");
            return Ok(ApplyOutcome::default());
        };

        let mut work = self.working(meta);
        work.log(
            &recipient.address,
            meta,
            Activity::Withdraw(WithdrawActivity {
                withdrawals: withdraw.withdrawals.clone(),
            }),
        );
        self.commit(work, WriteBatch::new(), 0).await
    }

    async fn apply_transfer(&self, transfer: &Transfer) -> Result<ApplyOutcome, LedgerError> {
        let Some(moved) = &transfer.transfer else {
            return Ok(ApplyOutcome::default());
        };
        let asset = self.config.settlement_asset.as_str();
        if moved.token.as_deref() != Some(asset) {
            return Ok(ApplyOutcome::default());
        }
        let meta = &transfer.meta;
        let amount = signed(moved.amount.value)?;

        let mut work = self.working(meta);
        for (address, role, delta) in [
            (&moved.to.address, DeltaRole::TransferTo, amount),
            (&moved.from.address, DeltaRole::TransferFrom, -amount),
        ] {
            self.load_entry(&mut work, address).await?;
            work.move_balance(
                meta,
                "transfer",
                BalanceChange {
                    address,
                    role,
                    asset,
                    amount: moved.amount.value,
                    on_chain: delta,
                    smart_contract: 0,
                    total: delta,
                },
            );
        }
        self.commit(work, WriteBatch::new(), 0).await
    }

    // ─── Rich list ───────────────────────────────────────────────────────────

    /// Record a known starting balance for `address` and re-base its
    /// rich-list balance on it from the stored deltas.
    pub async fn set_baseline_balance(
        &self,
        address: &str,
        balances: BTreeMap<String, u64>,
    ) -> Result<(), LedgerError> {
        let mut entry = self
            .entry(address)
            .await?
            .unwrap_or_else(|| AddressLedgerEntry::new(address));
        entry.baseline_balance = Some(balances);
        let deltas = self.deltas(address).await?;
        entry.rich_list = Some(rollup(
            &deltas,
            &self.config.settlement_asset,
            &self.config.rich_list_cutoff,
            entry.baseline_balance.as_ref(),
        ));

        let mut batch = WriteBatch::new();
        batch.put_value(Collection::Addresses, address, &entry)?;
        self.store.apply(batch).await?;
        Ok(())
    }

    // ─── Reads ───────────────────────────────────────────────────────────────

    pub async fn offer(&self, offer_hash: &str) -> Result<Option<OfferState>, LedgerError> {
        let doc = self.store.find_one(Collection::OfferHash, offer_hash).await?;
        Ok(doc.map(|d| d.parse(Collection::OfferHash)).transpose()?)
    }

    pub async fn entry(&self, address: &str) -> Result<Option<AddressLedgerEntry>, LedgerError> {
        let doc = self.store.find_one(Collection::Addresses, address).await?;
        Ok(doc.map(|d| d.parse(Collection::Addresses)).transpose()?)
    }

    pub async fn snapshot(
        &self,
        address: &str,
        date: &str,
    ) -> Result<Option<AddressLedgerEntry>, LedgerError> {
        let id = AddressLedgerEntry::snapshot_id(address, date);
        let doc = self.store.find_one(Collection::AddressesDate, &id).await?;
        Ok(doc.map(|d| d.parse(Collection::AddressesDate)).transpose()?)
    }

    pub async fn deltas(&self, address: &str) -> Result<Vec<RichListDelta>, LedgerError> {
        let docs = self
            .store
            .scan_prefix(Collection::AddressTransactions, &RichListDelta::prefix(address))
            .await?;
        docs.iter()
            .map(|d| d.parse(Collection::AddressTransactions).map_err(LedgerError::from))
            .collect()
    }

    /// Activity log of `address`, ordered by transaction hash.
    pub async fn activity(&self, address: &str) -> Result<Vec<AddressActivity>, LedgerError> {
        let docs = self
            .store
            .scan_prefix(Collection::AddressActivity, &AddressActivity::prefix(address))
            .await?;
        docs.iter()
            .map(|d| d.parse(Collection::AddressActivity).map_err(LedgerError::from))
            .collect()
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    async fn load_offer(&self, offer_hash: &str) -> Result<OfferState, LedgerError> {
        Ok(self
            .offer(offer_hash)
            .await?
            .unwrap_or_else(|| OfferState::partial(offer_hash)))
    }

    /// Bring the stored entry, today's snapshot and the merge keys of this
    /// transaction for `address` into `work`.
    async fn load_entry(&self, work: &mut Working, address: &str) -> Result<(), LedgerError> {
        if work.entries.contains_key(address) {
            return Ok(());
        }
        let entry = self
            .entry(address)
            .await?
            .unwrap_or_else(|| AddressLedgerEntry::new(address));
        work.entries.insert(address.to_string(), entry);

        let id = AddressLedgerEntry::snapshot_id(address, &work.date);
        let snapshot = self
            .snapshot(address, &work.date)
            .await?
            .unwrap_or_else(|| AddressLedgerEntry::for_date(address, work.date.clone()));
        work.entries.insert(id, snapshot);

        let merged = self
            .store
            .scan_prefix(Collection::AddressMerges, &AppliedMerge::prefix(address, &work.tx))
            .await?;
        work.merged.extend(merged.into_iter().map(|d| d.id));
        Ok(())
    }

    /// Write entries, deltas, merge keys, activity and `batch` together.
    async fn commit(
        &self,
        work: Working,
        mut batch: WriteBatch,
        offers: usize,
    ) -> Result<ApplyOutcome, LedgerError> {
        for delta in &work.deltas {
            batch.put_value(Collection::AddressTransactions, &delta.id, delta)?;
        }
        for merge in &work.merges {
            batch.put_value(Collection::AddressMerges, merge.id(), merge)?;
        }
        for activity in &work.activity {
            batch.put_value(Collection::AddressActivity, activity.id(), activity)?;
        }
        if !work.merges.is_empty() {
            for entry in work.entries.values() {
                let collection = if entry.date.is_some() {
                    Collection::AddressesDate
                } else {
                    Collection::Addresses
                };
                batch.put_value(collection, entry.id(), entry)?;
            }
        }

        let outcome = ApplyOutcome {
            offers,
            entries: if work.merges.is_empty() { 0 } else { work.entries.len() },
            deltas: work.deltas.len(),
            merges: work.merges.len(),
        };
        self.store.apply(batch).await?;
        Ok(outcome)
    }
}
