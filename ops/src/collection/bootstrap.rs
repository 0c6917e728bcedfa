use super::{CollectionArgs, CollectionErrorKind};
use cnft_core::{explorer_tx_url, ChainClient};
use log::{debug, error, info, warn};
use mpl_token_metadata::{
    accounts::{MasterEdition, Metadata},
    instructions::{CreateMasterEditionV3Builder, CreateMetadataAccountV3Builder},
    types::{CollectionDetails as SizedCollection, Creator, DataV2},
};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    account::Account,
    instruction::Instruction,
    program_pack::Pack,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction, system_program,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account,
};
use spl_token::{
    instruction::{initialize_mint, mint_to},
    state::Mint,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// The parent NFT every minted leaf points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionDetails {
    pub mint: Pubkey,
    pub metadata: Pubkey,
    pub master_edition: Pubkey,
}

impl CollectionDetails {
    pub fn from_mint(mint: Pubkey) -> Self {
        Self {
            mint,
            metadata: Metadata::find_pda(&mint).0,
            master_edition: MasterEdition::find_pda(&mint).0,
        }
    }

    /// Loads an existing collection, checking its metadata and master edition
    /// accounts and that `authority` controls it.
    pub async fn fetch<C>(
        client: &C,
        mint: Pubkey,
        authority: &Pubkey,
    ) -> Result<Self, CollectionErrorKind>
    where
        C: ChainClient + ?Sized,
    {
        let details = Self::from_mint(mint);

        let metadata = client
            .get_account(&details.metadata)
            .await?
            .ok_or(CollectionErrorKind::MissingAccount {
                kind: "metadata",
                address: details.metadata,
            })?;
        check_metadata(&details, &metadata, authority)?;

        let edition = client
            .get_account(&details.master_edition)
            .await?
            .ok_or(CollectionErrorKind::MissingAccount {
                kind: "master edition",
                address: details.master_edition,
            })?;
        check_master_edition(&details, &edition)?;

        Ok(details)
    }
}

fn invalid(details: &CollectionDetails, reason: &'static str) -> CollectionErrorKind {
    CollectionErrorKind::InvalidCollection {
        mint: details.mint,
        reason,
    }
}

fn check_metadata(
    details: &CollectionDetails,
    account: &Account,
    authority: &Pubkey,
) -> Result<(), CollectionErrorKind> {
    if account.owner != mpl_token_metadata::ID {
        return Err(invalid(details, "metadata is not owned by the token metadata program"));
    }

    let metadata = Metadata::safe_deserialize(&account.data)
        .map_err(|_| invalid(details, "metadata account holds no token metadata"))?;
    if metadata.mint != details.mint {
        return Err(invalid(details, "metadata belongs to another mint"));
    }
    if metadata.update_authority != *authority {
        return Err(invalid(details, "wallet is not the collection update authority"));
    }

    Ok(())
}

fn check_master_edition(
    details: &CollectionDetails,
    account: &Account,
) -> Result<(), CollectionErrorKind> {
    if account.owner != mpl_token_metadata::ID {
        return Err(invalid(details, "master edition is not owned by the token metadata program"));
    }

    MasterEdition::safe_deserialize(&account.data)
        .map_err(|_| invalid(details, "master edition account holds no master edition"))?;

    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCollection {
    mint: String,
}

/// Remembers the collection minted for a wallet between runs.
#[derive(Debug, Clone)]
pub struct CollectionStore {
    path: PathBuf,
}

impl CollectionStore {
    pub fn new(session_dir: &Path, wallet: &str) -> Self {
        Self {
            path: session_dir.join(format!("{}-collection.json", wallet)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Pubkey>, CollectionErrorKind> {
        if !self.path.exists() {
            return Ok(None);
        }

        let stored: StoredCollection = serde_json::from_slice(&fs::read(&self.path)?)?;
        let mint = Pubkey::from_str(&stored.mint)?;

        Ok(Some(mint))
    }

    pub fn save(&self, mint: &Pubkey) -> Result<(), CollectionErrorKind> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let stored = StoredCollection {
            mint: mint.to_string(),
        };
        fs::write(&self.path, serde_json::to_vec_pretty(&stored)?)?;

        Ok(())
    }
}

fn create_collection_instructions(
    payer: &Pubkey,
    mint: &Pubkey,
    mint_rent: u64,
    config: &CollectionArgs,
) -> Result<Vec<Instruction>, CollectionErrorKind> {
    let details = CollectionDetails::from_mint(*mint);
    let token_account = get_associated_token_address(payer, mint);

    let create_mint_account_ix = system_instruction::create_account(
        payer,
        mint,
        mint_rent,
        Mint::LEN as u64,
        &spl_token::id(),
    );

    let init_mint_ix = initialize_mint(&spl_token::id(), mint, payer, Some(payer), 0)?;

    let create_token_account_ix =
        create_associated_token_account(payer, payer, mint, &spl_token::id());

    let mint_to_ix = mint_to(&spl_token::id(), mint, &token_account, payer, &[], 1)?;

    let create_metadata_ix = CreateMetadataAccountV3Builder::new()
        .metadata(details.metadata)
        .mint(*mint)
        .mint_authority(*payer)
        .payer(*payer)
        .update_authority(*payer, true)
        .system_program(system_program::id())
        .data(DataV2 {
            name: config.collection_name.clone(),
            symbol: config.collection_symbol.clone(),
            uri: config.collection_uri.clone(),
            seller_fee_basis_points: 0,
            creators: Some(vec![Creator {
                address: *payer,
                verified: true,
                share: 100,
            }]),
            collection: None,
            uses: None,
        })
        .is_mutable(true)
        .collection_details(SizedCollection::V1 { size: 0 })
        .instruction();

    let create_master_edition_ix = CreateMasterEditionV3Builder::new()
        .edition(details.master_edition)
        .mint(*mint)
        .update_authority(*payer)
        .mint_authority(*payer)
        .payer(*payer)
        .metadata(details.metadata)
        .token_program(spl_token::id())
        .system_program(system_program::id())
        .max_supply(0)
        .instruction();

    Ok(vec![
        create_mint_account_ix,
        init_mint_ix,
        create_token_account_ix,
        mint_to_ix,
        create_metadata_ix,
        create_master_edition_ix,
    ])
}

/// Mints a new collection NFT (mint, token account, metadata and master
/// edition) in one transaction signed by the payer and the new mint.
pub async fn create_collection<C>(
    client: &C,
    payer: &Keypair,
    config: &CollectionArgs,
    explorer_cluster: &str,
) -> Result<CollectionDetails, CollectionErrorKind>
where
    C: ChainClient + ?Sized,
{
    let mint = Keypair::new();
    let mint_rent = client.minimum_balance_for_rent_exemption(Mint::LEN).await?;

    let instructions =
        create_collection_instructions(&payer.pubkey(), &mint.pubkey(), mint_rent, config)?;

    match client
        .send_and_confirm(&instructions, &payer.pubkey(), &[payer, &mint])
        .await
    {
        Ok(signature) => {
            println!("{}", explorer_tx_url(&signature, explorer_cluster));
            info!("created collection {}", mint.pubkey());

            Ok(CollectionDetails::from_mint(mint.pubkey()))
        }
        Err(err) => {
            error!("failed to create collection nft: {}", err);

            Err(err.into())
        }
    }
}

/// Returns the configured or remembered collection, minting one when neither exists.
///
/// An explicitly configured collection must be valid. A remembered one that no
/// longer checks out (for example after switching clusters) is replaced.
pub async fn get_or_create_collection<C>(
    client: &C,
    payer: &Keypair,
    store: &CollectionStore,
    config: &CollectionArgs,
    explorer_cluster: &str,
) -> Result<CollectionDetails, CollectionErrorKind>
where
    C: ChainClient + ?Sized,
{
    if let Some(mint) = config.collection_mint {
        debug!("using configured collection {}", mint);

        return CollectionDetails::fetch(client, mint, &payer.pubkey()).await;
    }

    if let Some(mint) = store.load()? {
        match CollectionDetails::fetch(client, mint, &payer.pubkey()).await {
            Ok(details) => {
                info!("reusing collection {} from {:?}", mint, store.path());

                return Ok(details);
            }
            Err(CollectionErrorKind::Chain(err)) => return Err(err.into()),
            Err(err) => warn!("stored collection {} is unusable: {}", mint, err),
        }
    }

    let details = create_collection(client, payer, config, explorer_cluster).await?;
    store.save(&details.mint)?;

    Ok(details)
}
