use solana_sdk::{pubkey::Pubkey, signature::Signature};

const EXPLORER_URL: &str = "https://explorer.solana.com";

fn cluster_query(cluster: &str) -> String {
    match cluster {
        "" | "mainnet" | "mainnet-beta" => String::new(),
        cluster => format!("?cluster={}", cluster),
    }
}

pub fn explorer_tx_url(signature: &Signature, cluster: &str) -> String {
    format!("{}/tx/{}{}", EXPLORER_URL, signature, cluster_query(cluster))
}

pub fn explorer_address_url(address: &Pubkey, cluster: &str) -> String {
    format!(
        "{}/address/{}{}",
        EXPLORER_URL,
        address,
        cluster_query(cluster)
    )
}
