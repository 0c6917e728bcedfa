use crate::{
    collection::{get_or_create_collection, CollectionArgs, CollectionDetails, CollectionStore},
    mint::{
        mint_compressed_nfts, print_receipts, LeafMetadataArgs, MintAuthorities, MintOptions,
        MintReceipt,
    },
    tree::{create_and_initialize_tree, TreeArgs, TreeParams},
};
use anyhow::Result;
use cadence_macros::{statsd_count, statsd_time};
use clap::Parser;
use cnft_core::{
    airdrop_if_needed, explorer_address_url, setup_metrics, ChainClient, FundingArgs,
    KeypairStore, MetricsArgs, Rpc, SessionArgs, SolanaRpcArgs,
};
use indicatif::HumanDuration;
use log::info;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::time::Instant;

#[derive(Debug, Parser, Clone)]
pub struct Args {
    /// Tree configuration
    #[clap(flatten)]
    pub tree: TreeArgs,

    /// Upper bound on concurrently submitted mint transactions
    #[arg(long, env, default_value = "1")]
    pub max_in_flight: usize,

    /// Leaf metadata configuration
    #[clap(flatten)]
    pub leaf: LeafMetadataArgs,

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

#[derive(Debug)]
pub struct RunSummary {
    pub tree: Pubkey,
    pub collection: CollectionDetails,
    pub receipts: Vec<MintReceipt>,
}

/// Funds the wallet, creates a tree, bootstraps the collection and fills
/// every leaf of the new tree, in that order.
pub async fn run_with<C>(
    client: &C,
    wallet: &Keypair,
    config: &Args,
    store: &CollectionStore,
) -> Result<RunSummary>
where
    C: ChainClient + ?Sized,
{
    let params = TreeParams::try_from(&config.tree)?;
    let cluster = config.solana.explorer_cluster.as_str();

    airdrop_if_needed(client, &wallet.pubkey(), &config.funding).await?;

    let tree = create_and_initialize_tree(client, wallet, &params, cluster).await?;
    let collection =
        get_or_create_collection(client, wallet, store, &config.collection, cluster).await?;

    let options = MintOptions {
        max_in_flight: config.max_in_flight,
        first_leaf_nonce: Some(0),
        explorer_cluster: cluster.to_string(),
    };
    let receipts = mint_compressed_nfts(
        client,
        &MintAuthorities::single(wallet),
        &tree,
        &collection,
        &config.leaf,
        params.capacity(),
        &options,
    )
    .await?;

    Ok(RunSummary {
        tree,
        collection,
        receipts,
    })
}

pub async fn run(config: Args) -> Result<()> {
    let rpc = Rpc::from_config(config.solana.clone());

    setup_metrics(config.metrics.clone())?;

    let wallet = KeypairStore::from_config(&config.session).get_or_create(&config.session.wallet)?;
    let store = CollectionStore::new(&config.session.session_dir, &config.session.wallet);

    info!("running with wallet {} against {}", wallet.pubkey(), rpc.url());
    let started = Instant::now();

    match run_with(&rpc, &wallet, &config, &store).await {
        Ok(summary) => {
            statsd_count!("tree.created", 1);
            statsd_count!("mint.succeeded", summary.receipts.len() as i64);
            statsd_time!("run.completed", started.elapsed());

            print_receipts(&summary.receipts);
            println!("Collection Mint: {}", summary.collection.mint);
            println!(
                "{}",
                explorer_address_url(&summary.tree, &config.solana.explorer_cluster)
            );

            info!(
                "minted {} compressed nfts in {}",
                summary.receipts.len(),
                HumanDuration(started.elapsed())
            );

            Ok(())
        }
        Err(err) => {
            statsd_count!("run.failed", 1);

            Err(err)
        }
    }
}
