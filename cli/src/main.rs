//! neoetl CLI: ingest and inspect NEO exchange transactions.
//!
//! # Commands
//! ```text
//! neoetl ingest          [--follow --interval <secs>]
//! neoetl decode          <script-hex> [--vout <json>] [--height <n>]
//! neoetl status
//! neoetl trading-state   [--contract <hash>]
//! neoetl baseline        <address>
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd_decode;
mod cmd_ingest;
mod cmd_query;
mod config;
mod tracing_setup;

use config::FileConfig;

#[derive(Parser)]
#[command(
    name = "neoetl",
    about = "NEO exchange transaction ETL",
    long_about = "
Decodes exchange contract invocations from NEO blocks and maintains offer,
address and rich-list state in a document store.

ENVIRONMENT VARIABLES:
  NEOETL_CONFIG     JSON config file
  NEOETL_DATABASE   SQLite database file
  NEOETL_NODES      Comma-separated node URLs (skips node discovery)
  RUST_LOG          Log filter, overrides --log-level
",
    version
)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true, env = "NEOETL_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file (overrides the config file)
    #[arg(long, global = true, env = "NEOETL_DATABASE")]
    database: Option<PathBuf>,

    /// Node URLs to use instead of the node directory
    #[arg(long = "node", global = true, env = "NEOETL_NODES", value_delimiter = ',')]
    nodes: Vec<String>,

    /// Global log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every block from the first gap up to the chain height
    Ingest {
        /// Keep ingesting new blocks as they arrive
        #[arg(long)]
        follow: bool,
        /// Seconds between runs in follow mode
        #[arg(long, default_value_t = 15)]
        interval: u64,
        /// First block height considered
        #[arg(long)]
        start_height: Option<u64>,
        /// Block requests in flight
        #[arg(long)]
        concurrency: Option<usize>,
        /// Blocks per fetch chunk
        #[arg(long)]
        chunk_size: Option<u64>,
        /// JSON token listing to merge into the token table
        #[arg(long)]
        token_file: Option<PathBuf>,
    },

    /// Disassemble, resolve and decode one invocation script
    Decode {
        /// Invocation script (hex, optionally 0x-prefixed)
        script: String,
        /// Transaction outputs as a JSON array of {n, asset, value, address}
        #[arg(long)]
        vout: Option<String>,
        /// Transaction id to report
        #[arg(long, default_value = "0x00")]
        txid: String,
        /// Block height to report
        #[arg(long, default_value_t = 0)]
        height: u64,
        /// Block time (unix seconds)
        #[arg(long, default_value_t = 0)]
        time: i64,
        /// Print only the decoded record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare the chain height with what has been ingested
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Query whether trading is active on an exchange contract
    #[command(name = "trading-state")]
    TradingState {
        /// Contract script hash (defaults to the current exchange contract)
        #[arg(long)]
        contract: Option<String>,
    },

    /// Seed an address's rich-list baseline from the Neoscan balance
    Baseline {
        /// Base58 address
        address: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut file = FileConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        file.log.level = level;
    }
    if cli.log_json {
        file.log.json = true;
    }
    if cli.database.is_some() {
        file.database = cli.database;
    }
    if !cli.nodes.is_empty() {
        file.ingest.node_urls = cli.nodes;
    }
    tracing_setup::init_tracing(&file.log);

    match cli.command {
        Commands::Ingest {
            follow,
            interval,
            start_height,
            concurrency,
            chunk_size,
            token_file,
        } => {
            let ingest = &mut file.ingest;
            if let Some(height) = start_height {
                ingest.start_height = height;
            }
            if let Some(n) = concurrency {
                ingest.concurrency = n;
            }
            if let Some(size) = chunk_size {
                ingest.chunk_size = size;
            }
            if token_file.is_some() {
                ingest.token_file = token_file;
            }
            cmd_ingest::run(&file, follow, interval).await
        }

        Commands::Decode {
            script,
            vout,
            txid,
            height,
            time,
            json,
        } => cmd_decode::run(
            &file.ingest,
            cmd_decode::Input {
                script,
                vout: vout.as_deref(),
                txid,
                height,
                time,
            },
            json,
        ),

        Commands::Status { json } => cmd_query::status(&file, json).await,

        Commands::TradingState { contract } => {
            cmd_query::trading_state(&file, contract.as_deref()).await
        }

        Commands::Baseline { address } => cmd_query::baseline(&file, &address).await,
    }
}
