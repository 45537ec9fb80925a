//! End-to-end ingestion against a scripted node and the in-memory store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use neoetl_core::codec::{hex_to_bytes, reverse_hex_bytes};
use neoetl_core::contracts::{CONTRACT_V2, CONTRACT_V3, NEO_ASSET, SWTH_TOKEN};
use neoetl_core::{Block, Collection, Decoder, DocumentStore, OperationRecord};
use neoetl_ingest::{BlockWalker, IngestError, IngestorBuilder};
use neoetl_ledger::{LedgerEngine, OfferStatus};
use neoetl_rpc::{ContractParam, InvokeResult, NeoRpc, RpcConnector, RpcError};
use neoetl_storage::MemoryStore;

const MAKER: &str = "e707714512577b42f9a011f8b870625429f93573";
const TAKER: &str = "5b7074e873973a6ed3708862f219a6fbf4d1c411";
const UUID: &str = "4a3b0e0e-5d5c-4d7f-9a1b-6b0d3c2e1f00";
const UUID_2: &str = "9c1d2e3f-0a1b-4c2d-8e3f-5a6b7c8d9e0f";
const START: u64 = 100;

// ─── Script builders ─────────────────────────────────────────────────────────

fn push(data: &[u8]) -> Vec<u8> {
    assert!(data.len() <= 75);
    let mut out = vec![data.len() as u8];
    out.extend_from_slice(data);
    out
}

/// Push of a big-endian hash in script byte order.
fn push_le(hash_be: &str) -> Vec<u8> {
    push(&hex_to_bytes(&reverse_hex_bytes(hash_be).unwrap()).unwrap())
}

fn push_amount(value: u64) -> Vec<u8> {
    let le = value.to_le_bytes();
    let len = le.iter().rposition(|b| *b != 0).map_or(1, |i| i + 1);
    push(&le[..len])
}

/// Arguments (already in push order), then `PUSHn PACK <name> APPCALL <contract>`.
fn invoke(contract_be: &str, function: &str, args: Vec<Vec<u8>>) -> String {
    let mut script: Vec<u8> = Vec::new();
    let argc = args.len() as u8;
    for arg in args {
        script.extend(arg);
    }
    script.push(0x50 + argc);
    script.push(0xc1);
    script.extend(push(function.as_bytes()));
    script.push(0x67);
    script.extend(hex_to_bytes(&reverse_hex_bytes(contract_be).unwrap()).unwrap());
    hex::encode(script)
}

/// SWTH offered for 10 NEO by [`MAKER`], `offer_amount` already pushed.
fn make_script_with(nonce: &str, offer_amount: Vec<u8>) -> String {
    invoke(
        CONTRACT_V2,
        "makeOffer",
        vec![
            push(nonce.as_bytes()),
            push_amount(1_000_000_000),
            push_le(NEO_ASSET),
            offer_amount,
            push_le(SWTH_TOKEN),
            push_le(MAKER),
        ],
    )
}

fn make_script() -> String {
    make_script_with(UUID, push_amount(500_000_000))
}

fn fill_script(offer_hash: &str, taker_amount: u64) -> String {
    invoke(
        CONTRACT_V2,
        "fillOffer",
        vec![
            vec![0x00],
            vec![0x00],
            push_le(SWTH_TOKEN),
            push_amount(taker_amount),
            push_le(offer_hash),
            push_le(TAKER),
        ],
    )
}

fn tx(txid: &str, script: Option<String>) -> serde_json::Value {
    match script {
        Some(script) => serde_json::json!({
            "txid": format!("0x{txid}"), "type": "InvocationTransaction", "script": script
        }),
        None => serde_json::json!({ "txid": format!("0x{txid}"), "type": "ContractTransaction" }),
    }
}

fn block(index: u64, txs: Vec<serde_json::Value>) -> Block {
    serde_json::from_value(serde_json::json!({
        "hash": format!("0x{index:064x}"),
        "size": 512,
        "time": 1541030400 + index as i64,
        "index": index,
        "tx": txs,
    }))
    .unwrap()
}

/// Offer hash the decoder derives for [`make_script`].
fn offer_hash() -> String {
    let make = block(START, vec![tx("aa01", Some(make_script()))]);
    match Decoder::default().decode_transaction(&make, &make.tx[0]).unwrap() {
        Some(OperationRecord::MakeOffer(m)) => m.offer_hash.unwrap(),
        other => panic!("unexpected {other:?}"),
    }
}

/// Make at 100 (plus an untracked transfer), fill at 101 (plus a truncated
/// script), empty block at 102.
fn chain() -> Vec<Block> {
    vec![
        block(START, vec![tx("aa01", Some(make_script())), tx("aa02", None)]),
        block(
            START + 1,
            vec![
                tx("bb01", Some(fill_script(&offer_hash(), 200_000_000))),
                tx("bb02", Some("67ab".into())),
            ],
        ),
        block(START + 2, vec![]),
    ]
}

// ─── Scripted node ───────────────────────────────────────────────────────────

struct ScriptedRpc {
    blocks: HashMap<u64, Block>,
    /// Heights that time out on their first request.
    flaky: Mutex<HashSet<u64>>,
}

impl ScriptedRpc {
    fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks: blocks.into_iter().map(|b| (b.index, b)).collect(),
            flaky: Mutex::new(HashSet::new()),
        }
    }

    fn flaky_at(self, height: u64) -> Self {
        self.flaky.lock().unwrap().insert(height);
        self
    }
}

#[async_trait]
impl NeoRpc for ScriptedRpc {
    async fn block_count(&self) -> Result<u64, RpcError> {
        Ok(self.blocks.keys().max().map_or(0, |h| h + 1))
    }

    async fn block(&self, height: u64) -> Result<Block, RpcError> {
        if self.flaky.lock().unwrap().remove(&height) {
            return Err(RpcError::Timeout { ms: 30_000 });
        }
        self.blocks
            .get(&height)
            .cloned()
            .ok_or(RpcError::NotFound { height })
    }

    async fn invoke_function(
        &self,
        _contract: &str,
        _operation: &str,
        _params: Vec<ContractParam>,
    ) -> Result<InvokeResult, RpcError> {
        Err(RpcError::UnexpectedResponse("not scripted".into()))
    }

    fn url(&self) -> &str {
        "scripted"
    }
}

struct CountingConnector {
    rpc: Arc<ScriptedRpc>,
    connects: AtomicUsize,
}

#[async_trait]
impl RpcConnector for CountingConnector {
    async fn connect(&self) -> Result<Arc<dyn NeoRpc>, RpcError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.rpc.clone())
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn builder(store: Arc<MemoryStore>, rpc: ScriptedRpc) -> IngestorBuilder {
    IngestorBuilder::new()
        .start_height(START)
        .chunk_size(2)
        .concurrency(2)
        .store(store)
        .rpc(Arc::new(rpc))
}

fn dump_all(store: &MemoryStore) -> Vec<Vec<neoetl_core::Document>> {
    Collection::ALL.iter().map(|c| store.dump(*c)).collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ingests_make_then_fill_from_scripts() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = builder(store.clone(), ScriptedRpc::new(chain())).build().unwrap();

    let report = ingestor.ingest_missing().await.unwrap();
    assert_eq!(report.from, START);
    assert_eq!(report.to, Some(START + 2));
    assert_eq!(report.chunks, 2);
    assert_eq!(report.stats.blocks, 3);
    assert_eq!(report.stats.records, 2);
    assert_eq!(report.stats.ignored, 1);
    assert_eq!(report.stats.skipped, 1);

    assert_eq!(store.count(Collection::Blocks).await.unwrap(), 3);
    assert_eq!(store.count(Collection::Transactions).await.unwrap(), 2);
    assert_eq!(store.count(Collection::Fees).await.unwrap(), 1);
    assert_eq!(store.count(Collection::Freezes).await.unwrap(), 0);

    let ledger = ingestor.ledger();
    let offer = ledger.offer(&offer_hash()).await.unwrap().unwrap();
    assert_eq!(offer.maker_amount_open, Some(300_000_000));
    assert_eq!(offer.amount_filled, Some(200_000_000));
    assert_eq!(offer.status, OfferStatus::Open);

    let maker_address = neoetl_core::AddressRef::from_script_hash(MAKER).unwrap().address;
    let taker_address = neoetl_core::AddressRef::from_script_hash(TAKER).unwrap().address;
    let maker = ledger.entry(&maker_address).await.unwrap().unwrap();
    let taker = ledger.entry(&taker_address).await.unwrap().unwrap();
    assert_eq!(taker.asset_balance.smart_contract["SWTH"], 200_000_000);
    assert_eq!(maker.asset_balance.smart_contract["SWTH"], -200_000_000);
    assert_eq!(taker.asset_balance.smart_contract["NEO"], -400_000_000);
    assert_eq!(maker.asset_balance.smart_contract["NEO"], 400_000_000);
    assert!(taker.fees_paid.is_empty());
}

#[tokio::test]
async fn second_run_finds_nothing_missing() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = builder(store.clone(), ScriptedRpc::new(chain())).build().unwrap();

    ingestor.ingest_missing().await.unwrap();
    let before = dump_all(&store);
    let report = ingestor.ingest_missing().await.unwrap();
    assert!(report.is_up_to_date());
    assert_eq!(report.from, START + 3);
    assert_eq!(dump_all(&store), before);

    let status = ingestor.status().await.unwrap();
    assert_eq!(status.chain_height, START + 2);
    assert_eq!(status.next_height, START + 3);
    assert_eq!(status.behind, 0);
}

#[tokio::test]
async fn rewalking_blocks_changes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(LedgerEngine::new(store.clone()));
    let walker = BlockWalker::new(Arc::new(Decoder::default()), ledger, store.clone(), 1);

    let blocks = chain();
    for block in &blocks {
        walker.walk(block).await.unwrap();
    }
    let first = dump_all(&store);
    for block in &blocks {
        walker.walk(block).await.unwrap();
    }
    assert_eq!(dump_all(&store), first);
}

#[tokio::test]
async fn malformed_transaction_mid_block_skips_only_itself() {
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(LedgerEngine::new(store.clone()));
    let walker = BlockWalker::new(Arc::new(Decoder::default()), ledger.clone(), store.clone(), 1);

    let mixed = block(
        START,
        vec![
            tx("cc01", Some(make_script())),
            tx("cc02", None),
            // nine-byte amount push
            tx("cc03", Some(make_script_with(UUID_2, push(&[0x01; 9])))),
            tx("cc04", Some(make_script_with(UUID_2, push_amount(100_000_000)))),
        ],
    );
    let stats = walker.walk(&mixed).await.unwrap();
    assert_eq!(stats.transactions, 4);
    assert_eq!(stats.records, 2);
    assert_eq!(stats.ignored, 1);
    assert_eq!(stats.skipped, 1);

    for id in ["cc01", "cc04"] {
        assert!(store.find_one(Collection::Transactions, id).await.unwrap().is_some(), "{id}");
    }
    assert!(store.find_one(Collection::Transactions, "cc03").await.unwrap().is_none());
    assert_eq!(store.count(Collection::Transactions).await.unwrap(), 2);
    assert_eq!(store.count(Collection::OfferHash).await.unwrap(), 2);
    assert!(store.find_one(Collection::Blocks, &START.to_string()).await.unwrap().is_some());

    let maker_address = neoetl_core::AddressRef::from_script_hash(MAKER).unwrap().address;
    let maker = ledger.entry(&maker_address).await.unwrap().unwrap();
    assert_eq!(maker.trade_type_count.maker, 2);
    assert_eq!(maker.makes["SWTH_NEO"].count, 2);
}

#[tokio::test]
async fn connection_failure_reselects_and_retries_once() {
    let store = Arc::new(MemoryStore::new());
    let connector = Arc::new(CountingConnector {
        rpc: Arc::new(ScriptedRpc::new(chain()).flaky_at(START + 2)),
        connects: AtomicUsize::new(0),
    });
    let ingestor = IngestorBuilder::new()
        .start_height(START)
        .chunk_size(2)
        .store(store.clone())
        .connector(connector.clone())
        .build()
        .unwrap();

    let report = ingestor.ingest_missing().await.unwrap();
    assert_eq!(report.reconnects, 1);
    assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    assert_eq!(store.count(Collection::Blocks).await.unwrap(), 3);
}

#[tokio::test]
async fn missing_block_is_not_retried() {
    let store = Arc::new(MemoryStore::new());
    let mut blocks = chain();
    blocks.remove(1);
    let ingestor = builder(store.clone(), ScriptedRpc::new(blocks)).build().unwrap();

    let err = ingestor.ingest_missing().await.unwrap_err();
    assert!(matches!(err, IngestError::Rpc(RpcError::NotFound { height }) if height == START + 1));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn critical_contract_failure_aborts_the_block() {
    let store = Arc::new(MemoryStore::new());
    let bad = invoke(CONTRACT_V3, "nope", vec![vec![0x00]]);
    let mut blocks = chain();
    blocks[1] = block(
        START + 1,
        vec![
            tx("bb01", Some(fill_script(&offer_hash(), 200_000_000))),
            tx("bb03", Some(bad)),
        ],
    );
    let ingestor = builder(store.clone(), ScriptedRpc::new(blocks)).build().unwrap();

    let err = ingestor.ingest_missing().await.unwrap_err();
    match &err {
        IngestError::Decode { block, tx, .. } => {
            assert_eq!(*block, START + 1);
            assert_eq!(tx, "bb03");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(err.is_fatal());

    // block 101 was not recorded, so the next run starts there again
    assert_eq!(store.count(Collection::Blocks).await.unwrap(), 1);
    assert_eq!(ingestor.first_missing().await.unwrap(), START + 1);
}

#[tokio::test]
async fn resumes_from_the_first_gap() {
    let store = Arc::new(MemoryStore::new());
    let blocks = chain();
    let walker = BlockWalker::new(
        Arc::new(Decoder::default()),
        Arc::new(LedgerEngine::new(store.clone())),
        store.clone(),
        10,
    );
    walker.walk(&blocks[0]).await.unwrap();

    let ingestor = builder(store.clone(), ScriptedRpc::new(blocks)).build().unwrap();
    assert_eq!(ingestor.first_missing().await.unwrap(), START + 1);

    let report = ingestor.ingest_missing().await.unwrap();
    assert_eq!(report.from, START + 1);
    assert_eq!(report.stats.blocks, 2);
    assert_eq!(store.count(Collection::Blocks).await.unwrap(), 3);
}
