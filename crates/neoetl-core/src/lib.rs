//! neoetl-core: decoding of NEO exchange contract invocations.
//!
//! # Architecture
//!
//! ```text
//! Transaction.script (hex)
//!   └─ Disassembler        → Vec<RawInstruction>
//!        └─ resolve_transaction → Resolution { contract, kind }
//!             └─ decode_operation   → OperationRecord
//! ```
//!
//! [`Decoder`] bundles the three steps. Everything here is pure; storage is
//! reached only through the [`DocumentStore`] trait, implemented in
//! `neoetl-storage`.

pub mod address;
pub mod codec;
pub mod contracts;
pub mod decoder;
pub mod disasm;
pub mod error;
pub mod offer_hash;
pub mod operation;
pub mod record;
pub mod resolver;
pub mod script;
pub mod store;
pub mod types;

pub use address::AddressRef;
pub use codec::Fixed8Amount;
pub use contracts::{AssetRef, ContractRegistry, ContractVersion, Layout, TokenTable};
pub use decoder::{decode_operation, DecodeContext, Decoder, Inspection};
pub use disasm::{AvmDisassembler, Disassembler};
pub use error::DecodeError;
pub use offer_hash::{OfferHasher, OfferKey, Sha256dOfferHasher};
pub use operation::OperationKind;
pub use record::OperationRecord;
pub use resolver::{resolve_transaction, Resolution};
pub use script::{RawInstruction, ScriptReader};
pub use store::{Collection, Document, DocumentStore, StoreError, WriteBatch};
pub use types::{Block, Transaction, Vout};
