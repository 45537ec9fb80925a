//! deposit, withdraw and NEP-5 transfer.

use super::DecodeContext;
use crate::codec::Fixed8Amount;
use crate::contracts::{ContractVersion, TokenTable, CUSTODY_ADDRESSES};
use crate::error::DecodeError;
use crate::record::{Deposit, Payment, RecordMeta, TokenTransfer, Transfer, Withdraw};
use crate::script::ScriptReader;
use crate::types::Vout;

fn payment(vout: &Vout, tokens: &TokenTable) -> Result<Payment, DecodeError> {
    Ok(Payment {
        address: vout.address.clone(),
        asset: tokens.resolve(&vout.asset)?,
        amount: Fixed8Amount::from_decimal(&vout.value)?,
    })
}

pub(super) fn deposit(
    ctx: &DecodeContext<'_>,
    meta: RecordMeta,
    r: ScriptReader<'_>,
) -> Result<Deposit, DecodeError> {
    let deposits = ctx
        .tx
        .vout
        .iter()
        .filter(|v| CUSTODY_ADDRESSES.contains(&v.address.as_str()))
        .map(|v| payment(v, ctx.tokens))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Deposit {
        meta,
        amount: r.amount(0)?,
        asset: r.asset(1, ctx.tokens)?,
        depositor: r.address(2)?,
        deposits,
    })
}

pub(super) fn withdraw(ctx: &DecodeContext<'_>, meta: RecordMeta) -> Result<Withdraw, DecodeError> {
    let withdrawals = ctx
        .tx
        .vout
        .iter()
        .map(|v| payment(v, ctx.tokens))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Withdraw { meta, withdrawals })
}

pub(super) fn transfer(
    ctx: &DecodeContext<'_>,
    meta: RecordMeta,
    r: ScriptReader<'_>,
) -> Result<Transfer, DecodeError> {
    // The legacy token contract carries no readable operands; its
    // transfers are kept as markers, never dropped.
    if ctx.version() == ContractVersion::LegacyToken {
        return Ok(Transfer {
            meta,
            transfer: None,
        });
    }

    // some wallets emit `PUSH<n> DROP` ahead of the arguments
    let base = if r.is(1, "DROP") { 2 } else { 0 };
    let contract = &ctx.resolution.contract;
    let token = contract
        .symbol
        .clone()
        .or_else(|| ctx.tokens.symbol(&contract.hash).map(str::to_string));

    Ok(Transfer {
        meta,
        transfer: Some(TokenTransfer {
            amount: r.amount(base)?,
            to: r.address(base + 1)?,
            from: r.address(base + 2)?,
            token,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::contracts::{
        ContractVersion, CONTRACT_V2, CUSTODY_ADDRESSES, LEGACY_TOKEN_CONTRACT, NEO_ASSET,
        SWTH_TOKEN,
    };
    use crate::error::DecodeError;
    use crate::operation::OperationKind;
    use crate::record::OperationRecord;
    use crate::script::RawInstruction;

    const USER: &str = "2f5013a2cccf48f3c9617119be865886a1a4343b";

    fn vouts() -> serde_json::Value {
        serde_json::json!([
            {"n": 0, "asset": format!("0x{NEO_ASSET}"), "value": "10", "address": CUSTODY_ADDRESSES[0]},
            {"n": 1, "asset": format!("0x{NEO_ASSET}"), "value": "0.5", "address": "AMAvaXFKtowxB5VpJ928QCSLZD9iMRnhbo"}
        ])
    }

    #[test]
    fn deposit_lists_custody_outputs() {
        let res = resolution(CONTRACT_V2, ContractVersion::V2, OperationKind::Deposit);
        let script = [amount(1_000_000_000), le(NEO_ASSET), le(USER)];
        let rec = decode_with(&res, &tx(vouts()), &script).unwrap();
        let OperationRecord::Deposit(d) = rec else {
            panic!("expected deposit");
        };
        assert_eq!(d.amount.fixed8, "10.00000000");
        assert_eq!(d.asset.symbol, "NEO");
        assert_eq!(d.depositor.address, "AMAvaXFKtowxB5VpJ928QCSLZD9iMRnhbo");
        assert_eq!(d.deposits.len(), 1);
        assert_eq!(d.deposits[0].amount.value, 1_000_000_000);
    }

    #[test]
    fn withdraw_reads_every_output() {
        let res = resolution(CONTRACT_V2, ContractVersion::V2, OperationKind::Withdrawal);
        let rec = decode_with(&res, &tx(vouts()), &[]).unwrap();
        let OperationRecord::Withdraw(w) = rec else {
            panic!("expected withdraw");
        };
        assert_eq!(w.withdrawals.len(), 2);
        assert_eq!(w.withdrawals[1].amount.fixed8, "0.50000000");
    }

    #[test]
    fn transfer_with_drop_prefix() {
        let mut res = resolution(SWTH_TOKEN, ContractVersion::Token, OperationKind::Transfer);
        res.contract.symbol = Some("SWTH".into());
        let script = [
            int(5),
            RawInstruction::bare("DROP"),
            amount(250_000_000),
            le(USER),
            le("e707714512577b42f9a011f8b870625429f93573"),
        ];
        let OperationRecord::Transfer(t) = decode(&res, &script).unwrap() else {
            panic!("expected transfer");
        };
        let t = t.transfer.unwrap();
        assert_eq!(t.amount.fixed8, "2.50000000");
        assert_eq!(t.to.script_hash, USER);
        assert_eq!(t.from.address, "ASH41gtWftHvhuYhZz1jj7ee7z9vp9D9wk");
        assert_eq!(t.token.as_deref(), Some("SWTH"));
    }

    #[test]
    fn immediate_transfer_amount_is_fixed8() {
        let res = resolution(SWTH_TOKEN, ContractVersion::Token, OperationKind::Transfer);
        let script = [int(3), le(USER), le(USER)];
        let OperationRecord::Transfer(t) = decode(&res, &script).unwrap() else {
            panic!("expected transfer");
        };
        let t = t.transfer.unwrap();
        assert_eq!(t.amount.fixed8, "0.00000003");
        assert_eq!(t.token.as_deref(), Some("SWTH"));
    }

    #[test]
    fn legacy_token_transfer_is_a_marker() {
        let res = resolution(
            LEGACY_TOKEN_CONTRACT,
            ContractVersion::LegacyToken,
            OperationKind::Transfer,
        );
        let OperationRecord::Transfer(t) = decode(&res, &[]).unwrap() else {
            panic!("expected transfer");
        };
        assert!(t.transfer.is_none());
    }

    #[test]
    fn bad_output_value_fails_the_transaction() {
        let res = resolution(CONTRACT_V2, ContractVersion::V2, OperationKind::Withdraw);
        let vout = serde_json::json!([
            {"n": 0, "asset": NEO_ASSET, "value": "1.123456789", "address": "A"}
        ]);
        let err = decode_with(&res, &tx(vout), &[]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidAmount { .. }));
    }
}
