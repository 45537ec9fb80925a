//! Contract method names recognised in invocation scripts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Every method name the exchange and token contracts are known to expose.
///
/// The name is pushed as raw bytes right after `PACK`; [`OperationKind::from_hex`]
/// maps that operand back to a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    AddToWhitelist,
    AnnounceCancel,
    AnnounceWithdraw,
    Approve,
    CancelAtomicSwap,
    CancelOffer,
    CreateAtomicSwap,
    Deploy,
    Deposit,
    DepositFrom,
    DisableTransfer,
    ExecuteAtomicSwap,
    FillOffer,
    FreezeTrading,
    GenerateTokens,
    Inflation,
    Initialize,
    MakeOffer,
    MintTokens,
    OnTokenTransfer,
    PassUnknown,
    RemoveFromWhitelist,
    SetTakerFee,
    Transfer,
    UnfreezeTrading,
    UnlockAdvisor,
    UnlockTeam,
    Withdraw,
    WithdrawAssets,
    Withdrawal,
}

const NAMES: &[(OperationKind, &str)] = &[
    (OperationKind::AddToWhitelist, "addToWhitelist"),
    (OperationKind::AnnounceCancel, "announceCancel"),
    (OperationKind::AnnounceWithdraw, "announceWithdraw"),
    (OperationKind::Approve, "approve"),
    (OperationKind::CancelAtomicSwap, "cancelAtomicSwap"),
    (OperationKind::CancelOffer, "cancelOffer"),
    (OperationKind::CreateAtomicSwap, "createAtomicSwap"),
    (OperationKind::Deploy, "deploy"),
    (OperationKind::Deposit, "deposit"),
    (OperationKind::DepositFrom, "depositFrom"),
    (OperationKind::DisableTransfer, "disableTransfer"),
    (OperationKind::ExecuteAtomicSwap, "executeAtomicSwap"),
    (OperationKind::FillOffer, "fillOffer"),
    (OperationKind::FreezeTrading, "freezeTrading"),
    (OperationKind::GenerateTokens, "generate_tokens"),
    (OperationKind::Inflation, "inflation"),
    (OperationKind::Initialize, "initialize"),
    (OperationKind::MakeOffer, "makeOffer"),
    (OperationKind::MintTokens, "mintTokens"),
    (OperationKind::OnTokenTransfer, "onTokenTransfer"),
    (OperationKind::PassUnknown, "passUnknown"),
    (OperationKind::RemoveFromWhitelist, "removeFromWhitelist"),
    (OperationKind::SetTakerFee, "setTakerFee"),
    (OperationKind::Transfer, "transfer"),
    (OperationKind::UnfreezeTrading, "unfreezeTrading"),
    (OperationKind::UnlockAdvisor, "unlockAdvisor"),
    (OperationKind::UnlockTeam, "unlockTeam"),
    (OperationKind::Withdraw, "withdraw"),
    (OperationKind::WithdrawAssets, "withdrawAssets"),
    (OperationKind::Withdrawal, "withdrawal"),
];

impl OperationKind {
    /// On-chain method name.
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(k, _)| *k == self)
            .map(|(_, n)| *n)
            .unwrap_or("passUnknown")
    }

    pub fn from_name(name: &str) -> Option<Self> {
        NAMES.iter().find(|(_, n)| *n == name).map(|(k, _)| *k)
    }

    /// Look up the method name pushed as hex bytes.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let bytes = hex::decode(hex).ok()?;
        let name = std::str::from_utf8(&bytes).ok()?;
        Self::from_name(name)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_through_its_name() {
        for (kind, name) in NAMES {
            assert_eq!(kind.name(), *name);
            assert_eq!(OperationKind::from_name(name), Some(*kind));
        }
    }

    #[test]
    fn hex_names() {
        // "makeOffer"
        assert_eq!(
            OperationKind::from_hex("6d616b654f66666572"),
            Some(OperationKind::MakeOffer)
        );
        // "generate_tokens"
        assert_eq!(
            OperationKind::from_hex("67656e65726174655f746f6b656e73"),
            Some(OperationKind::GenerateTokens)
        );
        assert_eq!(OperationKind::from_hex("6e6f7065"), None);
        assert_eq!(OperationKind::from_hex("zz"), None);
    }
}
