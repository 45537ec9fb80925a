//! Known exchange contracts and the token table.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

pub const NEO_ASSET: &str = "c56f33fc6ecfcd0c225c4ab356fee59390af8560be0e930faebe74a6daff7c9b";
pub const GAS_ASSET: &str = "602c79718b16e442de58778e148d0b1084e3b2dffd5de6b7b16cee7969282de7";
pub const SWTH_TOKEN: &str = "ab38352559b8b203bde5fddfa0b07d8b2525e132";

pub const CONTRACT_V1: &str = "0ec5712e0f7c63e4b0fea31029a28cea5e9d551f";
pub const CONTRACT_V1_5: &str = "01bafeeafe62e651efc3a530fde170cf2f7b09bd";
pub const CONTRACT_V2: &str = "91b83e96f2a7c4fdf0c1688441ec61986c7cae26";
pub const CONTRACT_V3: &str = "a32bcf5d7082f740a4007b16e812cf66a457c3d4";
pub const CONTRACT_V3_1: &str = "b9a70a85136ed73f1f94e83edfee68c00daf412f";
pub const LEGACY_TOKEN_CONTRACT: &str = "78e6d16b914fe15bc16150aeb11d0c2a8e532bdd";

/// Exchange custody addresses; outputs paying these belong to the exchange.
pub const CUSTODY_ADDRESSES: [&str; 2] = [
    "ASH41gtWftHvhuYhZz1jj7ee7z9vp9D9wk",
    "AMAvaXFKtowxB5VpJ928QCSLZD9iMRnhbo",
];

/// Contracts whose function table must always resolve.
const CRITICAL_CONTRACTS: [&str; 2] = [CONTRACT_V3, CONTRACT_V2];

const MAINNET_TOKENS: &[(&str, &str)] = &[
    ("NEO", NEO_ASSET),
    ("GAS", GAS_ASSET),
    ("SWTH", SWTH_TOKEN),
    ("MCT", "a87cc2a513f5d8b4a42432343687c2127c60bc3f"),
    ("RPX", "ecc6b20d3ccac1ee9ef109af5a7cdb85706b1df9"),
    ("DBC", "b951ecbbc5fe37a9c280a76cb0ce0014827294cf"),
    ("QLC", "0d821bd7b6d53f5c2b40e217c6defc8bbe896cf5"),
    ("TKY", "132947096727c84c7f9e076c90f08fec3bc17f18"),
    ("ONT", "ceab719b8baa2310f232ee0d277c061704541cfb"),
    ("ZPT", "ac116d4b8d4ca55e6b6d4ecce2192039b51cccc5"),
    ("SOUL", "ed07cffad18f1308db51920d99a2af60ac66a7b3"),
    ("NKN", "c36aee199dbba6c3f439983657558cfb67629599"),
    ("EFX", "acbc532904b6b51b5ea6d19b803d78af70e7e6f9"),
];

/// Historical contract generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractVersion {
    V1,
    V1_5,
    V2,
    V3,
    V3_1,
    LegacyToken,
    Token,
}

/// Operand layout family shared by several contract versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Early five-operand layout.
    Legacy,
    /// Single-fee layout.
    Standard,
    /// Separate maker / taker fees with burn flags.
    MultiFee,
}

impl ContractVersion {
    /// Exchange contracts have an operand layout; token contracts do not.
    pub fn layout(self) -> Option<Layout> {
        match self {
            Self::V1 | Self::V1_5 => Some(Layout::Legacy),
            Self::V2 => Some(Layout::Standard),
            Self::V3 | Self::V3_1 => Some(Layout::MultiFee),
            Self::LegacyToken | Self::Token => None,
        }
    }
}

impl fmt::Display for ContractVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "V1"),
            Self::V1_5 => write!(f, "V1_5"),
            Self::V2 => write!(f, "V2"),
            Self::V3 => write!(f, "V3"),
            Self::V3_1 => write!(f, "V3_1"),
            Self::LegacyToken => write!(f, "legacy-token"),
            Self::Token => write!(f, "token"),
        }
    }
}

/// A contract hash resolved against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedContract {
    pub hash: String,
    pub version: ContractVersion,
    /// Token symbol when `version` is [`ContractVersion::Token`].
    pub symbol: Option<String>,
}

/// An asset id with its resolved symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub hash: String,
    pub symbol: String,
}

/// Asset id → symbol table.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    by_hash: HashMap<String, String>,
}

#[derive(Deserialize)]
struct TokenDetails {
    hash: String,
}

impl TokenTable {
    pub fn mainnet() -> Self {
        let mut table = Self::default();
        for (symbol, hash) in MAINNET_TOKENS {
            table.insert(*symbol, *hash);
        }
        table
    }

    pub fn insert(&mut self, symbol: impl Into<String>, hash: impl Into<String>) {
        let hash = hash.into().trim_start_matches("0x").to_ascii_lowercase();
        self.by_hash.insert(hash, symbol.into());
    }

    /// Merge a token listing of the shape `{"SYMBOL": {"hash": "..."}, ...}`.
    pub fn extend_from_json(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let listing: HashMap<String, TokenDetails> = serde_json::from_str(json)?;
        let count = listing.len();
        for (symbol, details) in listing {
            self.insert(symbol, details.hash);
        }
        Ok(count)
    }

    pub fn symbol(&self, hash: &str) -> Option<&str> {
        self.by_hash
            .get(hash.trim_start_matches("0x"))
            .map(String::as_str)
    }

    pub fn hash_of(&self, symbol: &str) -> Option<&str> {
        self.by_hash
            .iter()
            .find(|(_, s)| s.as_str() == symbol)
            .map(|(h, _)| h.as_str())
    }

    pub fn resolve(&self, hash: &str) -> Result<AssetRef, DecodeError> {
        let hash = hash.trim_start_matches("0x");
        match self.symbol(hash) {
            Some(symbol) => Ok(AssetRef {
                hash: hash.to_string(),
                symbol: symbol.to_string(),
            }),
            None => Err(DecodeError::UnknownAsset {
                hash: hash.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    fn is_script_hash(hash: &str) -> bool {
        hash.len() == 40
    }
}

/// Contract hash → version table plus the token table and the pass-unknown
/// allow-list.
#[derive(Debug, Clone)]
pub struct ContractRegistry {
    contracts: HashMap<String, ContractVersion>,
    tokens: TokenTable,
    pass_unknown: HashSet<String>,
}

impl Default for ContractRegistry {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl ContractRegistry {
    pub fn mainnet() -> Self {
        let contracts = [
            (CONTRACT_V1, ContractVersion::V1),
            (CONTRACT_V1_5, ContractVersion::V1_5),
            (CONTRACT_V2, ContractVersion::V2),
            (CONTRACT_V3, ContractVersion::V3),
            (CONTRACT_V3_1, ContractVersion::V3_1),
            (LEGACY_TOKEN_CONTRACT, ContractVersion::LegacyToken),
        ]
        .into_iter()
        .map(|(h, v)| (h.to_string(), v))
        .collect();

        Self {
            contracts,
            tokens: TokenTable::mainnet(),
            pass_unknown: HashSet::new(),
        }
    }

    /// Replace the token table.
    pub fn with_tokens(mut self, tokens: TokenTable) -> Self {
        self.tokens = tokens;
        self
    }

    /// Add contract hashes that are tracked without a typed decoder.
    pub fn with_pass_unknown<I, S>(mut self, hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pass_unknown
            .extend(hashes.into_iter().map(|h| h.into().to_ascii_lowercase()));
        self
    }

    pub fn register(&mut self, hash: impl Into<String>, version: ContractVersion) {
        self.contracts.insert(hash.into().to_ascii_lowercase(), version);
    }

    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut TokenTable {
        &mut self.tokens
    }

    /// Resolve a big-endian contract hash to its version.
    ///
    /// NEP-5 tokens in the token table resolve as [`ContractVersion::Token`].
    pub fn resolve(&self, hash: &str) -> Option<ResolvedContract> {
        if let Some(version) = self.contracts.get(hash) {
            return Some(ResolvedContract {
                hash: hash.to_string(),
                version: *version,
                symbol: None,
            });
        }
        let symbol = self.tokens.symbol(hash)?;
        TokenTable::is_script_hash(hash).then(|| ResolvedContract {
            hash: hash.to_string(),
            version: ContractVersion::Token,
            symbol: Some(symbol.to_string()),
        })
    }

    pub fn is_critical(&self, hash: &str) -> bool {
        CRITICAL_CONTRACTS.contains(&hash)
    }

    pub fn is_pass_unknown(&self, hash: &str) -> bool {
        self.pass_unknown.contains(hash)
    }
}
