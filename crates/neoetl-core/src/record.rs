//! Typed operation records produced by the decoders.

use serde::{Deserialize, Serialize};

use crate::address::AddressRef;
use crate::codec::Fixed8Amount;
use crate::contracts::{AssetRef, ContractVersion};
use crate::operation::OperationKind;

/// Fields shared by every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub block_hash: String,
    pub block_number: u64,
    pub block_size: u64,
    pub block_time: i64,
    /// UTC `YYYY-MM-DD` of `block_time`.
    pub block_date: String,
    pub contract_hash: String,
    pub contract_version: ContractVersion,
    pub transaction_hash: String,
    pub transaction_type: String,
}

/// A transaction output, as listed on deposits and withdrawals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub address: String,
    pub asset: AssetRef,
    pub amount: Fixed8Amount,
}

/// A fee paid on an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub amount: Fixed8Amount,
    /// Absent when the layout carries no asset for this fee.
    pub asset: Option<AssetRef>,
    /// Whether the fee is burned instead of collected, when the layout says.
    pub burn: Option<bool>,
}

/// What an offer gives and what it wants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferTerms {
    pub maker: AddressRef,
    pub offer_asset: AssetRef,
    pub offer_amount: Fixed8Amount,
    pub want_asset: AssetRef,
    pub want_amount: Fixed8Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub amount: Fixed8Amount,
    pub asset: AssetRef,
    pub depositor: AddressRef,
    /// Outputs of the transaction.
    pub deposits: Vec<Payment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdraw {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub withdrawals: Vec<Payment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeOffer {
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// The nonce as pushed (hex, script order).
    pub nonce_hex: String,
    /// Offer identifier: the decoded uuid nonce, or the generation label for
    /// layouts whose nonce is not a uuid.
    pub offer_id: String,
    /// Absent on the legacy layout, which is not decoded past its nonce.
    pub terms: Option<OfferTerms>,
    pub maker_fee: Option<Fee>,
    pub offer_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillOffer {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub offer_hash: String,
    pub taker: AddressRef,
    /// Amount of the offered asset taken; absent on the legacy layout.
    pub taker_amount: Option<Fixed8Amount>,
    /// Taker fee; `None` when the fee was pushed as a bare `PUSH0`.
    pub fee: Option<Fee>,
    pub maker_fee: Option<Fee>,
    pub use_native_token: Option<bool>,
    pub amount_to_fill: Option<Fixed8Amount>,
    pub trading_pair: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancel {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub offer_hash: String,
}

/// A token movement between two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub amount: Fixed8Amount,
    pub from: AddressRef,
    pub to: AddressRef,
    /// Symbol of the token contract, when the contract is a known token.
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// `None` for the legacy token contract, which carries no operands.
    pub transfer: Option<TokenTransfer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeState {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingStateChange {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub trade_state: TradeState,
    /// The push mnemonic the state came from.
    pub trade_state_original: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAtomicSwap {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub fee: Fee,
    /// Expiry as big-endian hex, plus its numeric value when it fits.
    pub expiry_hex: String,
    pub expiry_time: Option<u64>,
    pub hash_of_secret: String,
    pub amount: Fixed8Amount,
    pub asset: AssetRef,
    pub taker: AddressRef,
    pub maker: AddressRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteAtomicSwap {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub preimage: String,
    pub hash_of_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelAtomicSwap {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub burn_cancel_fee: bool,
    pub cancel_fee: Fixed8Amount,
    pub hash_of_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unrecognized {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub function: OperationKind,
}

/// One decoded contract operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "switcheo_transaction_type")]
pub enum OperationRecord {
    #[serde(rename = "deposit")]
    Deposit(Deposit),
    #[serde(rename = "withdrawal")]
    Withdraw(Withdraw),
    #[serde(rename = "makeOffer")]
    MakeOffer(MakeOffer),
    #[serde(rename = "fillOffer")]
    FillOffer(FillOffer),
    #[serde(rename = "cancel")]
    Cancel(Cancel),
    #[serde(rename = "transfer")]
    Transfer(Transfer),
    #[serde(rename = "freezeTrading")]
    FreezeTrading(TradingStateChange),
    #[serde(rename = "unfreezeTrading")]
    UnfreezeTrading(TradingStateChange),
    #[serde(rename = "createAtomicSwap")]
    CreateAtomicSwap(CreateAtomicSwap),
    #[serde(rename = "executeAtomicSwap")]
    ExecuteAtomicSwap(ExecuteAtomicSwap),
    #[serde(rename = "cancelAtomicSwap")]
    CancelAtomicSwap(CancelAtomicSwap),
    #[serde(rename = "unrecognized")]
    Unrecognized(Unrecognized),
}

impl OperationRecord {
    pub fn meta(&self) -> &RecordMeta {
        match self {
            Self::Deposit(r) => &r.meta,
            Self::Withdraw(r) => &r.meta,
            Self::MakeOffer(r) => &r.meta,
            Self::FillOffer(r) => &r.meta,
            Self::Cancel(r) => &r.meta,
            Self::Transfer(r) => &r.meta,
            Self::FreezeTrading(r) | Self::UnfreezeTrading(r) => &r.meta,
            Self::CreateAtomicSwap(r) => &r.meta,
            Self::ExecuteAtomicSwap(r) => &r.meta,
            Self::CancelAtomicSwap(r) => &r.meta,
            Self::Unrecognized(r) => &r.meta,
        }
    }

    /// The `switcheo_transaction_type` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Deposit(_) => "deposit",
            Self::Withdraw(_) => "withdrawal",
            Self::MakeOffer(_) => "makeOffer",
            Self::FillOffer(_) => "fillOffer",
            Self::Cancel(_) => "cancel",
            Self::Transfer(_) => "transfer",
            Self::FreezeTrading(_) => "freezeTrading",
            Self::UnfreezeTrading(_) => "unfreezeTrading",
            Self::CreateAtomicSwap(_) => "createAtomicSwap",
            Self::ExecuteAtomicSwap(_) => "executeAtomicSwap",
            Self::CancelAtomicSwap(_) => "cancelAtomicSwap",
            Self::Unrecognized(_) => "unrecognized",
        }
    }

    pub fn transaction_hash(&self) -> &str {
        &self.meta().transaction_hash
    }
}
