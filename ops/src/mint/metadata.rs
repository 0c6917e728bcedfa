use clap::Args;
use mpl_bubblegum::types::{
    Collection, Creator, MetadataArgs, TokenProgramVersion, TokenStandard,
};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error as ThisError;

pub const MAX_NAME_LENGTH: usize = 32;
pub const MAX_SYMBOL_LENGTH: usize = 10;
pub const MAX_URI_LENGTH: usize = 200;
pub const MAX_SELLER_FEE_BASIS_POINTS: u16 = 10_000;

#[derive(ThisError, Debug, PartialEq, Eq)]
pub enum MetadataError {
    #[error("name {0:?} is longer than 32 bytes")]
    NameTooLong(String),
    #[error("symbol {0:?} is longer than 10 bytes")]
    SymbolTooLong(String),
    #[error("uri {0:?} is longer than 200 bytes")]
    UriTooLong(String),
    #[error("seller fee of {0} basis points exceeds 10000")]
    SellerFeeTooHigh(u16),
}

/// Template for the metadata of every leaf in a batch.
#[derive(Debug, Clone, Args)]
pub struct LeafMetadataArgs {
    /// Leaf names are "<prefix> #<index>"
    #[arg(long, env, default_value = "CNFT")]
    pub nft_name_prefix: String,

    /// Symbol of every minted leaf
    #[arg(long, env, default_value = "CNFT")]
    pub nft_symbol: String,

    /// Leaf URIs are "<base>/<index>.json"
    #[arg(long, env, default_value = "https://example.com/cnft")]
    pub nft_uri_base: String,

    /// Royalty in basis points
    #[arg(long, env, default_value = "0")]
    pub seller_fee_basis_points: u16,
}

impl Default for LeafMetadataArgs {
    fn default() -> Self {
        Self {
            nft_name_prefix: "CNFT".to_string(),
            nft_symbol: "CNFT".to_string(),
            nft_uri_base: "https://example.com/cnft".to_string(),
            seller_fee_basis_points: 0,
        }
    }
}

pub fn leaf_name(template: &LeafMetadataArgs, index: u64) -> String {
    format!("{} #{}", template.nft_name_prefix, index)
}

/// Builds the metadata of leaf `index`, with `creator` as the sole, unverified creator.
pub fn create_nft_metadata(
    template: &LeafMetadataArgs,
    creator: &Pubkey,
    index: u64,
) -> Result<MetadataArgs, MetadataError> {
    let name = leaf_name(template, index);
    let uri = format!("{}/{}.json", template.nft_uri_base.trim_end_matches('/'), index);

    if name.len() > MAX_NAME_LENGTH {
        return Err(MetadataError::NameTooLong(name));
    }
    if template.nft_symbol.len() > MAX_SYMBOL_LENGTH {
        return Err(MetadataError::SymbolTooLong(template.nft_symbol.clone()));
    }
    if uri.len() > MAX_URI_LENGTH {
        return Err(MetadataError::UriTooLong(uri));
    }
    if template.seller_fee_basis_points > MAX_SELLER_FEE_BASIS_POINTS {
        return Err(MetadataError::SellerFeeTooHigh(
            template.seller_fee_basis_points,
        ));
    }

    Ok(MetadataArgs {
        name,
        symbol: template.nft_symbol.clone(),
        uri,
        seller_fee_basis_points: template.seller_fee_basis_points,
        primary_sale_happened: false,
        is_mutable: false,
        edition_nonce: Some(0),
        token_standard: Some(TokenStandard::NonFungible),
        collection: None,
        uses: None,
        token_program_version: TokenProgramVersion::Original,
        creators: vec![Creator {
            address: *creator,
            verified: false,
            share: 100,
        }],
    })
}

/// Marks `metadata` as a member of `collection_mint`. Bubblegum verifies the
/// membership itself when minting through `mint_to_collection_v1`.
pub fn into_collection_member(
    mut metadata: MetadataArgs,
    collection_mint: &Pubkey,
) -> MetadataArgs {
    metadata.collection = Some(Collection {
        verified: false,
        key: *collection_mint,
    });
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_are_tagged_with_their_index() {
        let creator = Pubkey::new_unique();
        let template = LeafMetadataArgs::default();

        let first = create_nft_metadata(&template, &creator, 0).unwrap();
        let eighth = create_nft_metadata(&template, &creator, 7).unwrap();

        assert_eq!(first.name, "CNFT #0");
        assert_eq!(eighth.name, "CNFT #7");
        assert_eq!(eighth.uri, "https://example.com/cnft/7.json");
        assert_eq!(eighth.symbol, "CNFT");
        assert_eq!(eighth.creators.len(), 1);
        assert_eq!(eighth.creators[0].address, creator);
        assert_eq!(eighth.creators[0].share, 100);
        assert!(!eighth.creators[0].verified);
        assert!(eighth.collection.is_none());
    }

    #[test]
    fn collection_membership_starts_unverified() {
        let collection_mint = Pubkey::new_unique();
        let metadata =
            create_nft_metadata(&LeafMetadataArgs::default(), &Pubkey::new_unique(), 3).unwrap();

        let member = into_collection_member(metadata, &collection_mint);

        let collection = member.collection.unwrap();
        assert_eq!(collection.key, collection_mint);
        assert!(!collection.verified);
    }

    #[test]
    fn trailing_slash_in_uri_base_is_ignored() {
        let template = LeafMetadataArgs {
            nft_uri_base: "https://example.com/cnft/".to_string(),
            ..LeafMetadataArgs::default()
        };

        let metadata = create_nft_metadata(&template, &Pubkey::new_unique(), 12).unwrap();

        assert_eq!(metadata.uri, "https://example.com/cnft/12.json");
    }

    #[test]
    fn rejects_fields_the_program_would_refuse() {
        let creator = Pubkey::new_unique();

        let long_name = LeafMetadataArgs {
            nft_name_prefix: "A very long compressed NFT name".to_string(),
            ..LeafMetadataArgs::default()
        };
        assert!(matches!(
            create_nft_metadata(&long_name, &creator, 100),
            Err(MetadataError::NameTooLong(_))
        ));

        let long_symbol = LeafMetadataArgs {
            nft_symbol: "SYMBOLTOOLONG".to_string(),
            ..LeafMetadataArgs::default()
        };
        assert!(matches!(
            create_nft_metadata(&long_symbol, &creator, 0),
            Err(MetadataError::SymbolTooLong(_))
        ));

        let greedy = LeafMetadataArgs {
            seller_fee_basis_points: 10_001,
            ..LeafMetadataArgs::default()
        };
        assert_eq!(
            create_nft_metadata(&greedy, &creator, 0).unwrap_err(),
            MetadataError::SellerFeeTooHigh(10_001)
        );
    }
}
