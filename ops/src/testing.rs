use crate::collection::CollectionDetails;
use async_trait::async_trait;
use borsh::BorshSerialize;
use cnft_core::{ChainClient, ChainError};
use mpl_token_metadata::{
    accounts::{MasterEdition, Metadata},
    types::{CollectionDetails as SizedCollection, Key, TokenStandard},
};
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_sdk::{
    account::Account,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

fn rpc_error(message: &str) -> ChainError {
    ClientError::from(ClientErrorKind::Custom(message.to_string())).into()
}

#[derive(Debug, Clone)]
pub struct SentTransaction {
    pub instructions: Vec<Instruction>,
    pub payer: Pubkey,
    pub signers: Vec<Pubkey>,
    pub signature: Signature,
}

/// In-memory cluster that records every confirmed transaction.
pub struct MockChain {
    accounts: Mutex<HashMap<Pubkey, Account>>,
    sent: Mutex<Vec<SentTransaction>>,
    attempts: AtomicUsize,
    airdrops: AtomicUsize,
    balance: u64,
    fail_send_at: Option<usize>,
    fail_airdrop: bool,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            airdrops: AtomicUsize::new(0),
            balance: u64::MAX,
            fail_send_at: None,
            fail_airdrop: false,
        }
    }

    pub const fn with_balance(mut self, balance: u64) -> Self {
        self.balance = balance;
        self
    }

    /// Rejects the `attempt`-th submission (zero based).
    pub const fn failing_send(mut self, attempt: usize) -> Self {
        self.fail_send_at = Some(attempt);
        self
    }

    pub const fn failing_airdrop(mut self) -> Self {
        self.fail_airdrop = true;
        self
    }

    pub fn insert_account(&self, pubkey: Pubkey, account: Account) {
        self.accounts.lock().unwrap().insert(pubkey, account);
    }

    pub fn sent(&self) -> Vec<SentTransaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn airdrops(&self) -> usize {
        self.airdrops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, ChainError> {
        Ok(self.accounts.lock().unwrap().get(pubkey).cloned())
    }

    async fn get_balance(&self, _pubkey: &Pubkey) -> Result<u64, ChainError> {
        Ok(self.balance)
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, ChainError> {
        Ok((data_len as u64 + 128) * 6960)
    }

    async fn request_airdrop(
        &self,
        _pubkey: &Pubkey,
        _lamports: u64,
    ) -> Result<Signature, ChainError> {
        self.airdrops.fetch_add(1, Ordering::SeqCst);

        if self.fail_airdrop {
            return Err(rpc_error("airdrop request limit reached"));
        }

        Ok(Signature::new_unique())
    }

    async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        signers: &[&Keypair],
    ) -> Result<Signature, ChainError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);

        // Let other in-flight submissions interleave.
        tokio::task::yield_now().await;

        if self.fail_send_at == Some(attempt) {
            return Err(rpc_error("transaction simulation failed"));
        }

        let signature = Signature::new_unique();
        self.sent.lock().unwrap().push(SentTransaction {
            instructions: instructions.to_vec(),
            payer: *payer,
            signers: signers.iter().map(|signer| signer.pubkey()).collect(),
            signature,
        });

        Ok(signature)
    }
}

/// Stores metadata and master edition accounts for `mint`, updated by `authority`.
pub fn seed_collection(chain: &MockChain, mint: &Pubkey, authority: &Pubkey) {
    let details = CollectionDetails::from_mint(*mint);

    let metadata = Metadata {
        key: Key::MetadataV1,
        update_authority: *authority,
        mint: *mint,
        name: "Collection NFT".to_string(),
        symbol: "Collection".to_string(),
        uri: "https://example.com/collection.json".to_string(),
        seller_fee_basis_points: 0,
        creators: None,
        primary_sale_happened: false,
        is_mutable: true,
        edition_nonce: None,
        token_standard: Some(TokenStandard::NonFungible),
        collection: None,
        uses: None,
        collection_details: Some(SizedCollection::V1 { size: 0 }),
        programmable_config: None,
    };
    let edition = MasterEdition {
        key: Key::MasterEditionV2,
        supply: 0,
        max_supply: Some(0),
    };

    chain.insert_account(
        details.metadata,
        token_metadata_account(borsh_bytes(&metadata)),
    );
    chain.insert_account(
        details.master_edition,
        token_metadata_account(borsh_bytes(&edition)),
    );
}

fn borsh_bytes<T: BorshSerialize>(value: &T) -> Vec<u8> {
    value.try_to_vec().unwrap()
}

pub fn token_metadata_account(data: Vec<u8>) -> Account {
    Account {
        lamports: 1,
        data,
        owner: mpl_token_metadata::ID,
        executable: false,
        rent_epoch: 0,
    }
}
