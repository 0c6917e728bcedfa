use super::{
    metadata::{create_nft_metadata, into_collection_member, LeafMetadataArgs},
    MintErrorKind,
};
use crate::{collection::CollectionDetails, tree::find_tree_authority};
use cnft_core::{explorer_tx_url, ChainClient, ChainError};
use futures::{stream::FuturesUnordered, StreamExt};
use log::{debug, error};
use mpl_bubblegum::{instructions::MintToCollectionV1Builder, utils::get_asset_id};
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};

/// The identities involved in minting a leaf. Signers pay, delegate the tree
/// and authorize the collection; the leaf owner and delegate only receive.
#[derive(Debug, Clone, Copy)]
pub struct MintAuthorities<'a> {
    pub payer: &'a Keypair,
    pub tree_delegate: &'a Keypair,
    pub collection_authority: &'a Keypair,
    pub leaf_owner: Pubkey,
    pub leaf_delegate: Pubkey,
}

impl<'a> MintAuthorities<'a> {
    /// One wallet in every role.
    pub fn single(wallet: &'a Keypair) -> Self {
        Self {
            payer: wallet,
            tree_delegate: wallet,
            collection_authority: wallet,
            leaf_owner: wallet.pubkey(),
            leaf_delegate: wallet.pubkey(),
        }
    }

    /// Distinct signing keypairs, payer first.
    pub fn signers(&self) -> Vec<&'a Keypair> {
        let mut signers: Vec<&'a Keypair> = Vec::with_capacity(3);

        for keypair in [self.payer, self.tree_delegate, self.collection_authority] {
            if !signers.iter().any(|s| s.pubkey() == keypair.pubkey()) {
                signers.push(keypair);
            }
        }

        signers
    }
}

#[derive(Debug, Clone)]
pub struct MintOptions {
    /// Upper bound on submitted but unconfirmed mint transactions.
    pub max_in_flight: usize,
    /// Leaf count of the tree before the batch, when known.
    pub first_leaf_nonce: Option<u64>,
    pub explorer_cluster: String,
}

impl Default for MintOptions {
    fn default() -> Self {
        Self {
            max_in_flight: 1,
            first_leaf_nonce: None,
            explorer_cluster: "devnet".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    pub index: u64,
    pub signature: Signature,
    pub asset_id: Option<Pubkey>,
}

fn mint_to_collection_instruction(
    authorities: &MintAuthorities<'_>,
    tree: &Pubkey,
    collection: &CollectionDetails,
    template: &LeafMetadataArgs,
    index: u64,
) -> Result<Instruction, MintErrorKind> {
    let metadata = create_nft_metadata(template, &authorities.payer.pubkey(), index)
        .map_err(|source| MintErrorKind::Metadata { index, source })?;
    let metadata = into_collection_member(metadata, &collection.mint);

    Ok(MintToCollectionV1Builder::new()
        .tree_config(find_tree_authority(tree))
        .leaf_owner(authorities.leaf_owner)
        .leaf_delegate(authorities.leaf_delegate)
        .merkle_tree(*tree)
        .payer(authorities.payer.pubkey())
        .tree_creator_or_delegate(authorities.tree_delegate.pubkey())
        .collection_authority(authorities.collection_authority.pubkey())
        .collection_authority_record_pda(None)
        .collection_mint(collection.mint)
        .collection_metadata(collection.metadata)
        .collection_edition(collection.master_edition)
        .log_wrapper(spl_noop::id())
        .compression_program(spl_account_compression::id())
        .token_metadata_program(mpl_token_metadata::ID)
        .metadata(metadata)
        .instruction())
}

/// Mints `amount` leaves into `tree` as members of `collection`, one
/// transaction per leaf.
///
/// At most `options.max_in_flight` transactions are outstanding at a time.
/// The first failure stops scheduling; transactions already in flight are
/// awaited and the failure is returned. Leaves confirmed before that stay
/// minted. Receipts are ordered by index.
pub async fn mint_compressed_nfts<C>(
    client: &C,
    authorities: &MintAuthorities<'_>,
    tree: &Pubkey,
    collection: &CollectionDetails,
    template: &LeafMetadataArgs,
    amount: u64,
    options: &MintOptions,
) -> Result<Vec<MintReceipt>, MintErrorKind>
where
    C: ChainClient + ?Sized,
{
    let max_in_flight = options.max_in_flight.max(1);
    let payer = authorities.payer.pubkey();
    let signers = authorities.signers();
    let signers = signers.as_slice();

    let mut in_flight = FuturesUnordered::new();
    let mut receipts = Vec::new();
    let mut failure = None;
    let mut next_index = 0;

    loop {
        while failure.is_none() && next_index < amount && in_flight.len() < max_in_flight {
            let index = next_index;
            next_index += 1;

            let instruction =
                match mint_to_collection_instruction(authorities, tree, collection, template, index)
                {
                    Ok(instruction) => instruction,
                    Err(err) => {
                        error!("failed to mint compressed nft {}: {}", index, err);
                        failure = Some(err);
                        break;
                    }
                };

            debug!("submitting compressed nft {} into tree {}", index, tree);

            in_flight.push(async move {
                let result = client
                    .send_and_confirm(std::slice::from_ref(&instruction), &payer, signers)
                    .await;

                (index, result)
            });
        }

        match in_flight.next().await {
            Some((index, result)) => {
                settle(index, result, options, tree, &mut receipts, &mut failure)
            }
            None => break,
        }
    }

    if let Some(err) = failure {
        return Err(err);
    }

    receipts.sort_by_key(|receipt| receipt.index);

    Ok(receipts)
}

fn settle(
    index: u64,
    result: Result<Signature, ChainError>,
    options: &MintOptions,
    tree: &Pubkey,
    receipts: &mut Vec<MintReceipt>,
    failure: &mut Option<MintErrorKind>,
) {
    match result {
        Ok(signature) => {
            println!("{}", explorer_tx_url(&signature, &options.explorer_cluster));

            // Leaf order only matches submission order when minting one at a time.
            let asset_id = options
                .first_leaf_nonce
                .filter(|_| options.max_in_flight <= 1)
                .map(|first| get_asset_id(tree, first + index));

            receipts.push(MintReceipt {
                index,
                signature,
                asset_id,
            });
        }
        Err(source) => {
            error!("failed to mint compressed nft {}: {}", index, source);

            if failure.is_none() {
                *failure = Some(MintErrorKind::Submit { index, source });
            }
        }
    }
}
