use anyhow::Result;
use clap::Parser;
use cnft_core::{
    airdrop_if_needed, explorer_address_url, ChainClient, FundingArgs, KeypairStore, Rpc,
    SessionArgs, SolanaRpcArgs,
};
use solana_sdk::{native_token::lamports_to_sol, signature::Signer};

#[derive(Debug, Parser, Clone)]
pub struct Args {
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

    let store = KeypairStore::from_config(&config.session);
    let wallet = store.get_or_create(&config.session.wallet)?;

    if let Some(signature) = airdrop_if_needed(&rpc, &wallet.pubkey(), &config.funding).await? {
        println!("Airdrop: {}", signature);
    }

    let balance = rpc.get_balance(&wallet.pubkey()).await?;

    println!("Wallet {}: {}", config.session.wallet, wallet.pubkey());
    println!("Balance: {} SOL", lamports_to_sol(balance));
    println!("{}", explorer_address_url(&wallet.pubkey(), &cluster));

    Ok(())
}
