mod collection;
mod mint;
mod run;
mod session;
#[cfg(test)]
mod testing;
mod tree;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(author, version)]
struct Args {
    #[command(subcommand)]
    pub action: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Create a tree, bootstrap the collection and fill the tree with compressed NFTs.
    #[clap(name = "run")]
    Run(run::Args),
    /// Load or create the session wallet and fund it when needed.
    #[clap(name = "session")]
    Session(session::Args),
    #[clap(name = "tree")]
    Tree(tree::TreeCommand),
    /// Reuse or mint the collection NFT for the session wallet.
    #[clap(name = "collection")]
    Collection(collection::Args),
    /// Mint compressed NFTs into an existing tree.
    #[clap(name = "mint")]
    Mint(mint::Args),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    env_logger::init();

    match args.action {
        Command::Run(args) => run::run(args).await?,
        Command::Session(args) => session::run(args).await?,
        Command::Tree(subcommand) => tree::subcommand(subcommand).await?,
        Command::Collection(args) => collection::run(args).await?,
        Command::Mint(args) => mint::run(args).await?,
    }

    Ok(())
}
