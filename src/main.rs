use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prometheus::Registry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use relay_monitor::consensus::{ConsensusClient, HttpBeaconApi};
use relay_monitor::types::{epoch_at_slot, BlsPublicKey};
use relay_monitor::Config;

#[derive(Parser)]
#[command(name = "relay-monitor")]
#[command(about = "Monitors MEV-boost relays against beacon chain ground truth", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    
    /// Network preset, ignored when a configuration file is given
    #[arg(short, long, default_value = "mainnet")]
    network: String,
    
    /// Beacon node API endpoint
    #[arg(short, long)]
    endpoint: Option<String>,
    
    #[arg(short, long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the chain head and report proposer and parent hash for each head
    Run,
    
    /// Print the status of a validator
    ValidatorStatus {
        /// BLS public key (0x-prefixed hex)
        pubkey: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::for_network(&cli.network)?,
    };
    if let Some(endpoint) = cli.endpoint {
        config.consensus.endpoint = endpoint;
    }
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    config.validate()?;
    
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    
    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    
    let registry = Registry::new();
    let client = connect(&config, &registry).await?;
    
    match cli.command {
        Commands::Run => run(&client, config.chain.slots_per_epoch).await?,
        Commands::ValidatorStatus { pubkey } => {
            let public_key: BlsPublicKey = pubkey.parse().context("invalid public key")?;
            let status = client.get_validator_status(&public_key)?;
            println!("{} {}", public_key, status);
        }
    }
    
    Ok(())
}

async fn connect(config: &Config, registry: &Registry) -> Result<ConsensusClient> {
    let client_config = config.consensus.client_config();
    let api = Arc::new(HttpBeaconApi::new(&client_config)?);
    
    let now = SystemTime::now();
    let current_slot = config.chain.current_slot(now);
    
    info!(
        endpoint = %client_config.endpoint,
        network = %config.chain.network,
        current_slot,
        "Connecting to beacon node"
    );
    
    let client = ConsensusClient::new(
        api,
        &client_config,
        registry,
        current_slot,
        config.chain.slots_per_epoch,
    )
    .await?;
    
    Ok(client)
}

async fn run(client: &ConsensusClient, slots_per_epoch: u64) -> Result<()> {
    let cancel = CancellationToken::new();
    let mut heads = client.stream_heads(cancel.clone());
    
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down...");
            shutdown.cancel();
        }
    });
    
    let mut current_epoch = None;
    while let Some(head) = heads.recv().await {
        let epoch = epoch_at_slot(head.slot, slots_per_epoch);
        if current_epoch != Some(epoch) {
            // Duties for the following epoch are stable once it is one epoch away
            if let Err(e) = client.fetch_proposers(epoch + 1).await {
                warn!("could not load consensus state for epoch {}: {}", epoch + 1, e);
            }
            current_epoch = Some(epoch);
        }
        
        if let Err(e) = client.fetch_execution_hash(head.slot).await {
            warn!(slot = head.slot, "could not fetch execution hash: {}", e);
        }
        
        let next_slot = head.slot + 1;
        
        match client.get_proposer_public_key(next_slot) {
            Ok(proposer) => info!(slot = head.slot, root = %head.root, %proposer, "new head"),
            Err(e) => warn!(slot = head.slot, root = %head.root, "new head: {}", e),
        }
        
        match client.get_parent_hash(next_slot).await {
            Ok(parent_hash) => info!(slot = next_slot, %parent_hash, "expected parent hash"),
            Err(e) => warn!(slot = next_slot, "could not resolve parent hash: {}", e),
        }
    }
    
    info!("{}", client.metrics().encode()?);
    Ok(())
}
