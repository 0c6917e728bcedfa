use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use clap::Parser;
use solana_client::{
    client_error::ClientError, nonblocking::rpc_client::RpcClient,
    rpc_config::RpcSendTransactionConfig,
};
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::SignerError,
    transaction::Transaction,
};
use std::{sync::Arc, time::Duration};
use thiserror::Error as ThisError;

#[derive(Clone, Parser, Debug)]
pub struct SolanaRpcArgs {
    /// Solana RPC URL
    #[arg(long, env, default_value = "https://api.devnet.solana.com")]
    pub solana_rpc_url: String,

    /// Cluster name used when printing explorer links
    #[arg(long, env, default_value = "devnet")]
    pub explorer_cluster: String,
}

#[derive(ThisError, Debug)]
pub enum ChainError {
    #[error("solana rpc: {0}")]
    Rpc(#[from] ClientError),
    #[error("sign transaction: {0}")]
    Signer(#[from] SignerError),
    #[error("airdrop {0} was not confirmed")]
    AirdropNotConfirmed(Signature),
}

/// The cluster operations the minting flows depend on.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, ChainError>;

    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, ChainError>;

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize)
        -> Result<u64, ChainError>;

    /// Requests lamports from the cluster faucet and waits until the airdrop is confirmed.
    async fn request_airdrop(&self, pubkey: &Pubkey, lamports: u64)
        -> Result<Signature, ChainError>;

    /// Builds, signs and submits a single transaction, returning once it reaches `confirmed`.
    async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        signers: &[&Keypair],
    ) -> Result<Signature, ChainError>;
}

#[derive(Clone)]
pub struct Rpc(Arc<RpcClient>);

impl Rpc {
    pub fn from_config(config: SolanaRpcArgs) -> Self {
        Rpc(Arc::new(RpcClient::new_with_commitment(
            config.solana_rpc_url,
            CommitmentConfig::confirmed(),
        )))
    }

    pub fn url(&self) -> String {
        self.0.url()
    }

    async fn confirm_airdrop(&self, signature: &Signature) -> Result<(), ChainError> {
        let confirmed = self
            .0
            .confirm_transaction_with_commitment(signature, CommitmentConfig::confirmed())
            .await?
            .value;

        if confirmed {
            Ok(())
        } else {
            Err(ChainError::AirdropNotConfirmed(*signature))
        }
    }
}

#[async_trait]
impl ChainClient for Rpc {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, ChainError> {
        (|| async {
            self.0
                .get_account_with_commitment(pubkey, CommitmentConfig::confirmed())
                .await
        })
        .retry(&ExponentialBuilder::default())
        .await
        .map(|response| response.value)
        .map_err(Into::into)
    }

    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, ChainError> {
        (|| async { self.0.get_balance(pubkey).await })
            .retry(&ExponentialBuilder::default())
            .await
            .map_err(Into::into)
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, ChainError> {
        (|| async { self.0.get_minimum_balance_for_rent_exemption(data_len).await })
            .retry(&ExponentialBuilder::default())
            .await
            .map_err(Into::into)
    }

    async fn request_airdrop(
        &self,
        pubkey: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, ChainError> {
        let signature = self.0.request_airdrop(pubkey, lamports).await?;

        (|| async { self.confirm_airdrop(&signature).await })
            .retry(
                &ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(500))
                    .with_max_times(10),
            )
            .await?;

        Ok(signature)
    }

    async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        signers: &[&Keypair],
    ) -> Result<Signature, ChainError> {
        let recent_blockhash = (|| async { self.0.get_latest_blockhash().await })
            .retry(&ExponentialBuilder::default())
            .await?;

        let signers = signers.to_vec();
        let mut transaction = Transaction::new_with_payer(instructions, Some(payer));
        transaction.try_sign(&signers, recent_blockhash)?;

        self.0
            .send_and_confirm_transaction_with_spinner_and_config(
                &transaction,
                CommitmentConfig::confirmed(),
                RpcSendTransactionConfig {
                    skip_preflight: true,
                    ..RpcSendTransactionConfig::default()
                },
            )
            .await
            .map_err(Into::into)
    }
}
