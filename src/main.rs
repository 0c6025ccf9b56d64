//! HARBI Node
//!
//! Main entry point for running a HARBI node: opens the chain database,
//! prepares the proof-of-work context and optionally mines on top of the
//! local tip.

use clap::Parser;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::EnvFilter;

use harbi_core::config::NodeConfig;
use harbi_core::consensus::{Amount, CoinbaseData, Network, Params};
use harbi_core::error::NodeResult;
use harbi_core::mining::{build_block_template, now_millis, FoundBlock, Miner, TemplateManager};
use harbi_core::pow::{init_shared_context, shared_context_cache, State, HASHING_ALGO_VERSION};
use harbi_core::storage::{ChainError, ChainState, DbStores};

/// HARBI blockDAG node
#[derive(Parser, Debug)]
#[command(name = "harbi-node", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Network to run (mainnet or devnet)
    #[arg(short, long)]
    network: Option<Network>,

    /// Data directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Mine on top of the local tip
    #[arg(long)]
    mine: bool,

    /// Number of mining threads
    #[arg(long)]
    threads: Option<usize>,

    /// Address paid by mined blocks
    #[arg(long)]
    mining_address: Option<String>,

    /// Where the full proof-of-work dataset is stored
    #[arg(long)]
    dataset_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Command line flags win over the config file
    fn apply(self, config: &mut NodeConfig) {
        if let Some(network) = self.network {
            config.network = network;
        }
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if self.mine {
            config.mining.enabled = true;
        }
        if let Some(threads) = self.threads {
            config.mining.threads = threads;
        }
        if let Some(address) = self.mining_address {
            config.mining.address = Some(address);
        }
        if let Some(dataset_file) = self.dataset_file {
            config.dataset_file = Some(dataset_file);
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
    }
}

fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut config = match NodeConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut config);
    init_logging(&config.log_level);

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║                  HARBI BLOCKDAG NODE                     ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    match run(config).await {
        Ok(()) => {
            info!("node stopped");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: NodeConfig) -> NodeResult<()> {
    let params = Params::for_network(config.network);
    info!(
        network = %config.network,
        genesis = %params.genesis_hash,
        pow = HASHING_ALGO_VERSION,
        "starting node v{}",
        env!("CARGO_PKG_VERSION")
    );

    let stores = Arc::new(DbStores::open(config.database_dir())?);
    let chain = ChainState::open(params, stores.clone())?;
    let stats = chain.get_stats();
    info!(
        tip = %stats.tip_hash,
        blue_score = stats.blue_score,
        daa_score = stats.daa_score,
        "chain state loaded"
    );

    init_shared_context(config.pow_config());

    if config.mining.enabled {
        let coinbase_data = config.mining_coinbase_data()?;
        mine(&config, Arc::new(Mutex::new(chain)), coinbase_data).await?;
    } else {
        info!("mining disabled, press Ctrl+C to stop");
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
    }

    stores.flush()?;
    Ok(())
}

/// Mine on the local tip until Ctrl+C
async fn mine(
    config: &NodeConfig,
    chain: Arc<Mutex<ChainState<DbStores>>>,
    coinbase_data: CoinbaseData,
) -> NodeResult<()> {
    let templates = Arc::new(TemplateManager::new());
    let miner = Miner::new(templates.clone());
    tokio::spawn(miner.clone().log_hash_rate());

    let mut shutdown = Box::pin(tokio::signal::ctrl_c());

    // Loading or generating the dataset can take minutes
    let generate_dataset = config.mining.generate_dataset;
    let context = tokio::select! {
        context = tokio::task::spawn_blocking(move || shared_context_cache().get(generate_dataset)) => context??,
        _ = &mut shutdown => {
            info!("Shutdown signal received");
            miner.stop();
            return Ok(());
        }
    };

    let threads = config.mining.threads.max(1);
    let (found_tx, mut found_rx) = mpsc::channel::<FoundBlock>(threads);
    let workers = miner.spawn_workers(threads, found_tx)?;
    let refresh = Duration::from_millis(config.mining.template_refresh_ms.max(10));

    loop {
        let generation = {
            let chain = chain.lock();
            let template = build_block_template(&*chain, &coinbase_data, Vec::new(), now_millis())?;
            let state = State::with_context(&template.block.header, context.clone());
            templates.set(template, state)
        };
        trace!(generation, "new block template");

        tokio::select! {
            found = found_rx.recv() => {
                let Some(FoundBlock { block, template }) = found else {
                    break;
                };
                let reward = Amount::from(block.coinbase().map_or(0, |coinbase| coinbase.total_output_value()));
                let mut chain = chain.lock();
                match chain.accept_block(block, template.virtual_block.clone(), &context) {
                    Ok(hash) => {
                        let stats = chain.get_stats();
                        info!(
                            blue_score = stats.blue_score,
                            daa_score = stats.daa_score,
                            "Block {} accepted | coinbase pays {}",
                            hash,
                            reward
                        );
                    }
                    Err(ChainError::NotOnTip { block, .. }) => debug!(block = %block, "stale block dropped"),
                    Err(err) => warn!("mined block rejected: {err}"),
                }
            }
            _ = tokio::time::sleep(refresh) => {}
            _ = &mut shutdown => {
                info!("Shutdown signal received. Stopping miner...");
                break;
            }
        }
    }

    miner.stop();
    templates.clear();
    drop(found_rx);
    tokio::task::spawn_blocking(move || {
        for worker in workers {
            if worker.join().is_err() {
                warn!("mining worker panicked");
            }
        }
    })
    .await?;
    Ok(())
}
