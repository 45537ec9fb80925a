//! neoetl-ledger: derived aggregates over decoded exchange operations.
//!
//! # Architecture
//!
//! ```text
//! OperationRecord → LedgerEngine
//!                      ├── OfferState          (offer_hash)
//!                      ├── AddressLedgerEntry  (addresses, addresses_date)
//!                      ├── AppliedMerge        (address_merges)
//!                      ├── AddressActivity     (address_activity)
//!                      ├── RichListDelta       (address_transactions)
//!                      └── TradePairs          (pair naming)
//! ```

pub mod address;
pub mod engine;
pub mod error;
pub mod offer;
pub mod rich_list;
pub mod trade_pair;

pub use address::{
    Activity, AddressActivity, AddressLedgerEntry, AppliedMerge, AssetBalances, PairCounts,
    TradeTypeCount,
};
pub use engine::{ApplyOutcome, LedgerConfig, LedgerEngine};
pub use error::LedgerError;
pub use offer::{OfferState, OfferStatus};
pub use rich_list::{DeltaRole, RichListBalance, RichListDelta};
pub use trade_pair::TradePairs;
