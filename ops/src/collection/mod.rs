mod bootstrap;

pub use bootstrap::{get_or_create_collection, CollectionDetails, CollectionStore};

use crate::tree::parse_pubkey;
use anyhow::Result;
use clap::Parser;
use cnft_core::{
    airdrop_if_needed, explorer_address_url, ChainError, FundingArgs, KeypairStore, Rpc,
    SessionArgs, SolanaRpcArgs,
};
use solana_sdk::{program_error::ProgramError, pubkey::Pubkey, signature::Signer};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum CollectionErrorKind {
    #[error("solana rpc: {0}")]
    Chain(#[from] ChainError),
    #[error("build token instruction: {0}")]
    Token(#[from] ProgramError),
    #[error("collection {kind} account {address} not found")]
    MissingAccount { kind: &'static str, address: Pubkey },
    #[error("collection {mint}: {reason}")]
    InvalidCollection { mint: Pubkey, reason: &'static str },
    #[error("collection store: {0}")]
    Io(#[from] std::io::Error),
    #[error("collection store: {0}")]
    Json(#[from] serde_json::Error),
    #[error("collection store: {0}")]
    ParsePubkey(#[from] solana_sdk::pubkey::ParsePubkeyError),
}

#[derive(Debug, Clone, Parser)]
pub struct CollectionArgs {
    /// Existing collection NFT mint to mint into
    #[arg(long, env = "COLLECTION_NFT", value_parser = parse_pubkey)]
    pub collection_mint: Option<Pubkey>,

    /// Name of a newly minted collection NFT
    #[arg(long, env, default_value = "Collection NFT")]
    pub collection_name: String,

    /// Symbol of a newly minted collection NFT
    #[arg(long, env, default_value = "Collection")]
    pub collection_symbol: String,

    /// Off-chain metadata URI of a newly minted collection NFT
    #[arg(long, env, default_value = "https://example.com/cnft/collection.json")]
    pub collection_uri: String,
}

#[derive(Debug, Parser, Clone)]
pub struct Args {
    /// Collection configuration
    #[clap(flatten)]
    pub collection: CollectionArgs,

    /// Session configuration
    #[clap(flatten)]
    pub session: SessionArgs,

    /// Faucet configuration
    #[clap(flatten)]
    pub funding: FundingArgs,

    /// Solana configuration
    #[clap(flatten)]
    pub solana: SolanaRpcArgs,
}

pub async fn run(config: Args) -> Result<()> {
    let cluster = config.solana.explorer_cluster.clone();
    let rpc = Rpc::from_config(config.solana);

    let wallet = KeypairStore::from_config(&config.session).get_or_create(&config.session.wallet)?;
    airdrop_if_needed(&rpc, &wallet.pubkey(), &config.funding).await?;

    let store = CollectionStore::new(&config.session.session_dir, &config.session.wallet);
    let collection =
        get_or_create_collection(&rpc, &wallet, &store, &config.collection, &cluster).await?;

    println!("Collection Mint: {}", collection.mint);
    println!("Collection Metadata: {}", collection.metadata);
    println!("Collection Master Edition: {}", collection.master_edition);
    println!("{}", explorer_address_url(&collection.mint, &cluster));

    Ok(())
}
