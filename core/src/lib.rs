mod explorer;
mod faucet;
mod keypair_store;
mod metrics;
mod solana_rpc;

pub use explorer::*;
pub use faucet::*;
pub use keypair_store::*;
pub use metrics::*;
pub use solana_rpc::*;
