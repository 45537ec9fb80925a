//! makeOffer, fillOffer and cancelOffer.

use super::DecodeContext;
use crate::codec::zero_pad;
use crate::contracts::{ContractVersion, Layout};
use crate::error::DecodeError;
use crate::offer_hash::OfferKey;
use crate::record::{Cancel, Fee, FillOffer, MakeOffer, OfferTerms, RecordMeta};
use crate::script::ScriptReader;

/// Hex length of the short nonces that carry no uuid.
const SHORT_NONCE_HEX: usize = 16;
/// Offer id recorded for short-nonce makes.
const SHORT_NONCE_ID: &str = "v1";
/// A uuid nonce is 36 ASCII bytes.
const UUID_NONCE_HEX: usize = 72;

pub(super) fn make_offer(
    ctx: &DecodeContext<'_>,
    meta: RecordMeta,
    r: ScriptReader<'_>,
) -> Result<MakeOffer, DecodeError> {
    let (terms, maker_fee) = match ctx.layout()? {
        Layout::Legacy => {
            let nonce_hex = zero_pad(&r.raw_hex(4, None)?, Some(64));
            let offer_id = match ctx.version() {
                ContractVersion::V1 => "v1.1",
                _ => "v1.5",
            };
            return Ok(MakeOffer {
                meta,
                nonce_hex,
                offer_id: offer_id.to_string(),
                terms: None,
                maker_fee: None,
                offer_hash: None,
            });
        }
        Layout::Standard => {
            let terms = OfferTerms {
                want_amount: r.amount(1)?,
                want_asset: r.asset(2, ctx.tokens)?,
                offer_amount: r.amount(3)?,
                offer_asset: r.asset(4, ctx.tokens)?,
                maker: r.address(5)?,
            };
            (terms, None)
        }
        Layout::MultiFee => {
            let fee = Fee {
                amount: r.amount(1)?,
                asset: Some(r.asset(2, ctx.tokens)?),
                burn: None,
            };
            let terms = OfferTerms {
                want_amount: r.amount(3)?,
                want_asset: r.asset(4, ctx.tokens)?,
                offer_amount: r.amount(5)?,
                offer_asset: r.asset(6, ctx.tokens)?,
                maker: r.address(7)?,
            };
            (terms, Some(fee))
        }
    };

    let raw_nonce = r.raw_hex(0, None)?;
    let (nonce_hex, offer_id, offer_hash) = if raw_nonce.len() == SHORT_NONCE_HEX {
        (raw_nonce, SHORT_NONCE_ID.to_string(), None)
    } else {
        let uuid = r.utf8(0, Some(UUID_NONCE_HEX))?;
        let hash = ctx.hasher.offer_hash(&OfferKey {
            maker_script_hash: &terms.maker.script_hash,
            offer_asset: &terms.offer_asset.hash,
            offer_amount: terms.offer_amount.value,
            want_asset: &terms.want_asset.hash,
            want_amount: terms.want_amount.value,
            nonce: uuid.as_bytes(),
        })?;
        (zero_pad(&raw_nonce, Some(UUID_NONCE_HEX)), uuid, Some(hash))
    };

    Ok(MakeOffer {
        meta,
        nonce_hex,
        offer_id,
        terms: Some(terms),
        maker_fee,
        offer_hash,
    })
}

pub(super) fn fill_offer(
    ctx: &DecodeContext<'_>,
    meta: RecordMeta,
    r: ScriptReader<'_>,
) -> Result<FillOffer, DecodeError> {
    let fill = match ctx.layout()? {
        Layout::Legacy => FillOffer {
            meta,
            use_native_token: Some(r.flag(0)?),
            amount_to_fill: Some(r.amount(1)?),
            offer_hash: r.hash_be(2, Some(64))?,
            trading_pair: Some(r.hash_be(3, Some(104))?),
            taker: r.address(4)?,
            taker_amount: None,
            fee: None,
            maker_fee: None,
        },
        Layout::Standard => {
            // the fee asset is only meaningful when a fee was paid
            let fee = match r.optional_fee(1)? {
                Some(amount) => Some(Fee {
                    amount,
                    asset: Some(r.asset(2, ctx.tokens)?),
                    burn: None,
                }),
                None => None,
            };
            FillOffer {
                meta,
                fee,
                taker_amount: Some(r.amount(3)?),
                offer_hash: r.hash_be(4, Some(64))?,
                taker: r.address(5)?,
                maker_fee: None,
                use_native_token: None,
                amount_to_fill: None,
                trading_pair: None,
            }
        }
        Layout::MultiFee => {
            let maker_fee = match r.optional_fee(1)? {
                Some(amount) => Some(Fee {
                    amount,
                    asset: None,
                    burn: Some(r.flag(0)?),
                }),
                None => None,
            };
            let fee = match r.optional_fee(3)? {
                Some(amount) => Some(Fee {
                    amount,
                    asset: Some(r.asset(4, ctx.tokens)?),
                    burn: Some(r.flag(2)?),
                }),
                None => None,
            };
            FillOffer {
                meta,
                maker_fee,
                fee,
                taker_amount: Some(r.amount(5)?),
                offer_hash: r.hash_be(6, Some(64))?,
                taker: r.address(7)?,
                use_native_token: None,
                amount_to_fill: None,
                trading_pair: None,
            }
        }
    };
    Ok(fill)
}

pub(super) fn cancel(meta: RecordMeta, r: ScriptReader<'_>) -> Result<Cancel, DecodeError> {
    Ok(Cancel {
        meta,
        offer_hash: r.hash_be(0, Some(64))?,
    })
}
