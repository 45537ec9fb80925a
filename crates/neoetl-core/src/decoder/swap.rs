//! Atomic swaps and trading freezes.

use super::DecodeContext;
use crate::error::DecodeError;
use crate::record::{
    CancelAtomicSwap, CreateAtomicSwap, ExecuteAtomicSwap, Fee, RecordMeta, TradeState,
    TradingStateChange,
};
use crate::script::{Push, ScriptReader};

const SECRET_HASH_HEX: usize = 64;

fn trading_state(
    meta: RecordMeta,
    r: ScriptReader<'_>,
    trade_state: TradeState,
) -> Result<TradingStateChange, DecodeError> {
    Ok(TradingStateChange {
        meta,
        trade_state,
        trade_state_original: r.get(0)?.to_string(),
    })
}

/// Anything but an explicit `PUSH0` leaves trading active.
pub(super) fn freeze(meta: RecordMeta, r: ScriptReader<'_>) -> Result<TradingStateChange, DecodeError> {
    let state = if r.is(0, "PUSH0") {
        TradeState::Inactive
    } else {
        TradeState::Active
    };
    trading_state(meta, r, state)
}

/// Only an explicit `PUSH1` activates trading.
pub(super) fn unfreeze(
    meta: RecordMeta,
    r: ScriptReader<'_>,
) -> Result<TradingStateChange, DecodeError> {
    let state = if r.is(0, "PUSH1") {
        TradeState::Active
    } else {
        TradeState::Inactive
    };
    trading_state(meta, r, state)
}

pub(super) fn create(
    ctx: &DecodeContext<'_>,
    meta: RecordMeta,
    r: ScriptReader<'_>,
) -> Result<CreateAtomicSwap, DecodeError> {
    let (expiry_hex, expiry_time) = match r.push(3)? {
        Push::Int(n) => (format!("{n:x}"), u64::try_from(n).ok()),
        Push::Bytes { .. } => {
            let hex = r.hash_be(3, None)?;
            let time = u64::from_str_radix(&hex, 16).ok();
            (hex, time)
        }
    };

    Ok(CreateAtomicSwap {
        meta,
        fee: Fee {
            burn: Some(r.flag(0)?),
            amount: r.amount(1)?,
            asset: Some(r.asset(2, ctx.tokens)?),
        },
        expiry_hex,
        expiry_time,
        hash_of_secret: r.hash_be(4, Some(SECRET_HASH_HEX))?,
        amount: r.amount(5)?,
        asset: r.asset(6, ctx.tokens)?,
        taker: r.address(7)?,
        maker: r.address(8)?,
    })
}

pub(super) fn execute(meta: RecordMeta, r: ScriptReader<'_>) -> Result<ExecuteAtomicSwap, DecodeError> {
    Ok(ExecuteAtomicSwap {
        meta,
        preimage: r.hash_be(0, None)?,
        hash_of_secret: r.hash_be(1, Some(SECRET_HASH_HEX))?,
    })
}

pub(super) fn cancel(meta: RecordMeta, r: ScriptReader<'_>) -> Result<CancelAtomicSwap, DecodeError> {
    Ok(CancelAtomicSwap {
        meta,
        burn_cancel_fee: r.flag(0)?,
        cancel_fee: r.amount(1)?,
        hash_of_secret: r.hash_be(2, Some(SECRET_HASH_HEX))?,
    })
}
