mod create;
mod params;
mod status;

pub use create::create_and_initialize_tree;
pub use params::{TreeArgs, TreeParams};
pub use status::TreeStatus;

#[cfg(test)]
pub(crate) use status::tests::tree_account;

use anyhow::Result;
use cadence_macros::statsd_count;
use clap::{Args, Parser, Subcommand};
use cnft_core::{
    airdrop_if_needed, setup_metrics, ChainError, FundingArgs, KeypairStore, MetricsArgs, Rpc,
    SessionArgs, SolanaRpcArgs,
};
use mpl_bubblegum::accounts::TreeConfig;
use solana_sdk::{pubkey::Pubkey, signature::Signer};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum TreeErrorKind {
    #[error("solana rpc: {0}")]
    Chain(#[from] ChainError),
    #[error("unsupported depth/buffer pair ({max_depth}, {max_buffer_size})")]
    InvalidDepthSizePair { max_depth: u32, max_buffer_size: u32 },
    #[error("canopy depth {canopy_depth} exceeds max depth {max_depth}")]
    CanopyTooDeep { canopy_depth: u32, max_depth: u32 },
    #[error("tree account {0} not found")]
    AccountNotFound(Pubkey),
    #[error("account {0} is not a concurrent merkle tree")]
    NotATree(Pubkey),
    #[error("tree account {0} is truncated")]
    Truncated(Pubkey),
    #[error("deserialize tree header: {0}")]
    Header(#[from] std::io::Error),
}

/// The Bubblegum tree config account, which acts as the tree authority.
pub fn find_tree_authority(tree: &Pubkey) -> Pubkey {
    TreeConfig::find_pda(tree).0
}

pub fn parse_pubkey(s: &str) -> Result<Pubkey, &'static str> {
    Pubkey::try_from(s).map_err(|_| "Failed to parse public key")
}

#[derive(Debug, Parser, Clone)]
pub struct CreateArgs {
    /// Tree configuration
    #[clap(flatten)]
    pub tree: TreeArgs,

    /// Session configuration
    #[clap(flatten)]
    pub session: SessionArgs,

    /// Faucet configuration
    #[clap(flatten)]
    pub funding: FundingArgs,

    /// Metrics configuration
    #[clap(flatten)]
    pub metrics: MetricsArgs,

    /// Solana configuration
    #[clap(flatten)]
    pub solana: SolanaRpcArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct StatusArgs {
    /// Solana configuration
    #[clap(flatten)]
    pub solana: SolanaRpcArgs,

    /// The trees to inspect
    #[arg(value_parser = parse_pubkey, required = true)]
    pub trees: Vec<Pubkey>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Allocate and initialize a new merkle tree owned by the session wallet.
    #[clap(name = "create")]
    Create(CreateArgs),
    /// Decode and print the on-chain state of existing trees.
    #[clap(name = "status")]
    Status(StatusArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TreeCommand {
    #[clap(subcommand)]
    pub action: Commands,
}

pub async fn subcommand(subcommand: TreeCommand) -> Result<()> {
    match subcommand.action {
        Commands::Create(args) => create(args).await?,
        Commands::Status(args) => status(args).await?,
    }

    Ok(())
}

async fn create(config: CreateArgs) -> Result<()> {
    let params = TreeParams::try_from(&config.tree)?;
    let cluster = config.solana.explorer_cluster.clone();
    let rpc = Rpc::from_config(config.solana);

    setup_metrics(config.metrics)?;

    let wallet = KeypairStore::from_config(&config.session).get_or_create(&config.session.wallet)?;
    airdrop_if_needed(&rpc, &wallet.pubkey(), &config.funding).await?;

    create_and_initialize_tree(&rpc, &wallet, &params, &cluster).await?;

    statsd_count!("tree.created", 1);

    Ok(())
}

async fn status(config: StatusArgs) -> Result<()> {
    let rpc = Rpc::from_config(config.solana);

    for tree in config.trees {
        let status = TreeStatus::fetch(&rpc, &tree).await?;

        println!("Tree {}", status.pubkey);
        println!("  max depth:       {}", status.max_depth);
        println!("  max buffer size: {}", status.max_buffer_size);
        println!("  canopy depth:    {}", status.canopy_depth);
        println!("  creation slot:   {}", status.creation_slot);
        println!("  sequence:        {}", status.seq);
        println!(
            "  leaves:          {} / {}",
            status.num_leaves,
            status.capacity()
        );
        println!("  bubblegum tree:  {}", status.bubblegum_authority);
    }

    Ok(())
}
