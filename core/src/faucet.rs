use crate::{ChainClient, ChainError};
use clap::Parser;
use log::{debug, info};
use solana_sdk::{
    native_token::{lamports_to_sol, sol_to_lamports},
    pubkey::Pubkey,
    signature::Signature,
};

#[derive(Clone, Parser, Debug)]
pub struct FundingArgs {
    /// Request an airdrop when the wallet balance drops below this many SOL
    #[arg(long, env, default_value = "1.0")]
    pub airdrop_threshold_sol: f64,

    /// Amount of SOL requested per airdrop
    #[arg(long, env, default_value = "2.0")]
    pub airdrop_amount_sol: f64,
}

impl Default for FundingArgs {
    fn default() -> Self {
        Self {
            airdrop_threshold_sol: 1.0,
            airdrop_amount_sol: 2.0,
        }
    }
}

/// Tops up `pubkey` from the cluster faucet when its balance is under the threshold.
///
/// Returns the airdrop signature, or `None` when the wallet was already funded.
pub async fn airdrop_if_needed<C>(
    client: &C,
    pubkey: &Pubkey,
    config: &FundingArgs,
) -> Result<Option<Signature>, ChainError>
where
    C: ChainClient + ?Sized,
{
    let balance = client.get_balance(pubkey).await?;
    let threshold = sol_to_lamports(config.airdrop_threshold_sol);

    if balance >= threshold {
        debug!(
            "wallet {} holds {} SOL, no airdrop needed",
            pubkey,
            lamports_to_sol(balance)
        );
        return Ok(None);
    }

    let lamports = sol_to_lamports(config.airdrop_amount_sol);
    info!(
        "wallet {} holds {} SOL, requesting {} SOL",
        pubkey,
        lamports_to_sol(balance),
        config.airdrop_amount_sol
    );

    let signature = client.request_airdrop(pubkey, lamports).await?;

    info!("airdrop {} confirmed", signature);

    Ok(Some(signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use solana_client::client_error::{ClientError, ClientErrorKind};
    use solana_sdk::{
        account::Account, instruction::Instruction, native_token::LAMPORTS_PER_SOL,
        signature::Keypair,
    };
    use std::sync::Mutex;

    fn rpc_error(message: &str) -> ChainError {
        ClientError::from(ClientErrorKind::Custom(message.to_string())).into()
    }

    struct Faucet {
        balance: u64,
        fail: bool,
        requested: Mutex<Vec<u64>>,
    }

    impl Faucet {
        fn new(balance: u64, fail: bool) -> Self {
            Self {
                balance,
                fail,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChainClient for Faucet {
        async fn get_account(&self, _pubkey: &Pubkey) -> Result<Option<Account>, ChainError> {
            Ok(None)
        }

        async fn get_balance(&self, _pubkey: &Pubkey) -> Result<u64, ChainError> {
            Ok(self.balance)
        }

        async fn minimum_balance_for_rent_exemption(
            &self,
            _data_len: usize,
        ) -> Result<u64, ChainError> {
            Ok(0)
        }

        async fn request_airdrop(
            &self,
            _pubkey: &Pubkey,
            lamports: u64,
        ) -> Result<Signature, ChainError> {
            if self.fail {
                return Err(rpc_error("airdrop limit reached"));
            }
            self.requested.lock().unwrap().push(lamports);

            Ok(Signature::new_unique())
        }

        async fn send_and_confirm(
            &self,
            _instructions: &[Instruction],
            _payer: &Pubkey,
            _signers: &[&Keypair],
        ) -> Result<Signature, ChainError> {
            unreachable!("funding never sends transactions")
        }
    }

    #[tokio::test]
    async fn funded_wallet_is_left_alone() {
        let faucet = Faucet::new(5 * LAMPORTS_PER_SOL, false);

        let result = airdrop_if_needed(&faucet, &Pubkey::new_unique(), &FundingArgs::default())
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(faucet.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn low_balance_requests_configured_amount() {
        let faucet = Faucet::new(LAMPORTS_PER_SOL / 2, false);

        let result = airdrop_if_needed(&faucet, &Pubkey::new_unique(), &FundingArgs::default())
            .await
            .unwrap();

        assert!(result.is_some());
        assert_eq!(*faucet.requested.lock().unwrap(), vec![2 * LAMPORTS_PER_SOL]);
    }

    #[tokio::test]
    async fn faucet_failure_is_returned() {
        let faucet = Faucet::new(0, true);

        let result =
            airdrop_if_needed(&faucet, &Pubkey::new_unique(), &FundingArgs::default()).await;

        assert!(matches!(result, Err(ChainError::Rpc(_))));
    }
}
