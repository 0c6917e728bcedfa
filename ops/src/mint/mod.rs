mod batch;
mod metadata;

pub use batch::{mint_compressed_nfts, MintAuthorities, MintOptions, MintReceipt};
pub use metadata::{LeafMetadataArgs, MetadataError};

use crate::{
    collection::{get_or_create_collection, CollectionArgs, CollectionDetails, CollectionStore},
    tree::{parse_pubkey, TreeErrorKind, TreeStatus},
};
use anyhow::Result;
use cadence_macros::{statsd_count, statsd_time};
use clap::Parser;
use cnft_core::{
    airdrop_if_needed, setup_metrics, ChainClient, ChainError, FundingArgs, KeypairStore,
    MetricsArgs, Rpc, SessionArgs, SolanaRpcArgs,
};
use indicatif::HumanDuration;
use log::{info, warn};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::time::Instant;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum MintErrorKind {
    #[error("mint compressed nft {index}: {source}")]
    Submit { index: u64, source: ChainError },
    #[error("metadata of compressed nft {index}: {source}")]
    Metadata { index: u64, source: MetadataError },
    #[error("tree: {0}")]
    Tree(#[from] TreeErrorKind),
    #[error("tree {0} is not a bubblegum tree")]
    NotBubblegumTree(Pubkey),
}

#[derive(Debug, Parser, Clone)]
pub struct MintArgs {
    /// Number of leaves to mint, defaults to the remaining capacity of the tree
    #[arg(long, env)]
    pub amount: Option<u64>,

    /// Upper bound on concurrently submitted mint transactions
    #[arg(long, env, default_value = "1")]
    pub max_in_flight: usize,

    /// Owner of the minted leaves, defaults to the session wallet
    #[arg(long, env, value_parser = parse_pubkey)]
    pub leaf_owner: Option<Pubkey>,

    /// Delegate of the minted leaves, defaults to the leaf owner
    #[arg(long, env, value_parser = parse_pubkey)]
    pub leaf_delegate: Option<Pubkey>,

    /// Leaf metadata configuration
    #[clap(flatten)]
    pub leaf: LeafMetadataArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct Args {
    /// The tree to mint into
    #[arg(long, env, value_parser = parse_pubkey)]
    pub tree: Pubkey,

    /// Mint configuration
    #[clap(flatten)]
    pub mint: MintArgs,

    /// Collection configuration
    #[clap(flatten)]
    pub collection: CollectionArgs,

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

/// Bounds a requested amount by what is left in the tree.
pub fn plan_amount(requested: Option<u64>, status: &TreeStatus) -> u64 {
    let remaining = status.remaining();

    match requested {
        Some(amount) if amount > remaining => {
            warn!(
                "tree {} has room for {} more leaves, minting {} instead of {}",
                status.pubkey, remaining, remaining, amount
            );

            remaining
        }
        Some(amount) => amount,
        None => remaining,
    }
}

/// Mints into an existing tree, never past its capacity.
pub async fn mint_into_tree<C>(
    client: &C,
    authorities: &MintAuthorities<'_>,
    tree: &Pubkey,
    collection: &CollectionDetails,
    config: &MintArgs,
    explorer_cluster: &str,
) -> Result<Vec<MintReceipt>, MintErrorKind>
where
    C: ChainClient + ?Sized,
{
    let status = TreeStatus::fetch(client, tree).await?;
    if !status.bubblegum_authority {
        return Err(MintErrorKind::NotBubblegumTree(*tree));
    }

    let amount = plan_amount(config.amount, &status);
    info!(
        "minting {} compressed nfts into tree {} ({} / {} used)",
        amount,
        tree,
        status.num_leaves,
        status.capacity()
    );

    let options = MintOptions {
        max_in_flight: config.max_in_flight,
        first_leaf_nonce: Some(status.num_leaves),
        explorer_cluster: explorer_cluster.to_string(),
    };

    mint_compressed_nfts(
        client,
        authorities,
        tree,
        collection,
        &config.leaf,
        amount,
        &options,
    )
    .await
}

impl MintArgs {
    /// Authorities with `wallet` signing every role and the configured leaf recipients.
    pub fn authorities<'a>(&self, wallet: &'a Keypair) -> MintAuthorities<'a> {
        let mut authorities = MintAuthorities::single(wallet);

        if let Some(owner) = self.leaf_owner {
            authorities.leaf_owner = owner;
            authorities.leaf_delegate = owner;
        }
        if let Some(delegate) = self.leaf_delegate {
            authorities.leaf_delegate = delegate;
        }

        authorities
    }
}

pub async fn run(config: Args) -> Result<()> {
    let cluster = config.solana.explorer_cluster.clone();
    let rpc = Rpc::from_config(config.solana);

    setup_metrics(config.metrics)?;

    let wallet = KeypairStore::from_config(&config.session).get_or_create(&config.session.wallet)?;
    airdrop_if_needed(&rpc, &wallet.pubkey(), &config.funding).await?;

    let store = CollectionStore::new(&config.session.session_dir, &config.session.wallet);
    let collection =
        get_or_create_collection(&rpc, &wallet, &store, &config.collection, &cluster).await?;

    let started = Instant::now();
    let authorities = config.mint.authorities(&wallet);

    match mint_into_tree(
        &rpc,
        &authorities,
        &config.tree,
        &collection,
        &config.mint,
        &cluster,
    )
    .await
    {
        Ok(receipts) => {
            statsd_count!("mint.succeeded", receipts.len() as i64);
            statsd_time!("mint.batch", started.elapsed());

            info!(
                "minted {} compressed nfts in {}",
                receipts.len(),
                HumanDuration(started.elapsed())
            );
            print_receipts(&receipts);

            Ok(())
        }
        Err(err) => {
            statsd_count!("mint.failed", 1);

            Err(err.into())
        }
    }
}

pub fn print_receipts(receipts: &[MintReceipt]) {
    for receipt in receipts {
        match receipt.asset_id {
            Some(asset_id) => println!("Minted #{} asset {}", receipt.index, asset_id),
            None => println!("Minted #{} {}", receipt.index, receipt.signature),
        }
    }
}
