use super::{find_tree_authority, TreeErrorKind};
use borsh::BorshDeserialize;
use cnft_core::ChainClient;
use log::debug;
use solana_sdk::{account::Account, pubkey::Pubkey};
use spl_account_compression::state::{
    merkle_tree_get_size, ConcurrentMerkleTreeHeader, CONCURRENT_MERKLE_TREE_HEADER_SIZE_V1,
};

const CONCURRENT_MERKLE_TREE_ACCOUNT_TYPE: u8 = 1;

// The tree body ends with the rightmost proof, whose leaf index is followed by
// four bytes of padding.
const RIGHTMOST_INDEX_FROM_END: usize = 8;

#[derive(Debug, Clone)]
pub struct TreeStatus {
    pub pubkey: Pubkey,
    pub max_depth: u32,
    pub max_buffer_size: u32,
    pub creation_slot: u64,
    pub canopy_depth: u32,
    pub seq: u64,
    pub num_leaves: u64,
    /// Whether the header authority is the Bubblegum tree config for this tree.
    pub bubblegum_authority: bool,
}

impl TreeStatus {
    pub fn try_from_account(pubkey: Pubkey, account: &Account) -> Result<Self, TreeErrorKind> {
        let bytes = account.data.as_slice();

        if account.owner != spl_account_compression::id()
            || bytes.first() != Some(&CONCURRENT_MERKLE_TREE_ACCOUNT_TYPE)
        {
            return Err(TreeErrorKind::NotATree(pubkey));
        }

        if bytes.len() < CONCURRENT_MERKLE_TREE_HEADER_SIZE_V1 {
            return Err(TreeErrorKind::Truncated(pubkey));
        }

        let (header_bytes, rest) = bytes.split_at(CONCURRENT_MERKLE_TREE_HEADER_SIZE_V1);
        let header = ConcurrentMerkleTreeHeader::try_from_slice(header_bytes)?;

        let max_depth = header.get_max_depth();
        let max_buffer_size = header.get_max_buffer_size();

        let merkle_tree_size =
            merkle_tree_get_size(&header).map_err(|_| TreeErrorKind::InvalidDepthSizePair {
                max_depth,
                max_buffer_size,
            })?;
        if rest.len() < merkle_tree_size {
            return Err(TreeErrorKind::Truncated(pubkey));
        }
        let (tree_bytes, canopy_bytes) = rest.split_at(merkle_tree_size);

        let seq = u64::from_le_bytes(read_array(tree_bytes, 0));
        let index_offset = merkle_tree_size - RIGHTMOST_INDEX_FROM_END;
        let num_leaves = u32::from_le_bytes(read_array(tree_bytes, index_offset)) as u64;

        let canopy_depth =
            canopy_depth(canopy_bytes.len()).ok_or(TreeErrorKind::NotATree(pubkey))?;

        let bubblegum_authority = header
            .assert_valid_authority(&find_tree_authority(&pubkey))
            .is_ok();

        debug!(
            "tree {} depth {} buffer {} canopy {} leaves {}",
            pubkey, max_depth, max_buffer_size, canopy_depth, num_leaves
        );

        Ok(Self {
            pubkey,
            max_depth,
            max_buffer_size,
            creation_slot: header.get_creation_slot(),
            canopy_depth,
            seq,
            num_leaves,
            bubblegum_authority,
        })
    }

    pub async fn fetch<C>(client: &C, pubkey: &Pubkey) -> Result<Self, TreeErrorKind>
    where
        C: ChainClient + ?Sized,
    {
        let account = client
            .get_account(pubkey)
            .await?
            .ok_or(TreeErrorKind::AccountNotFound(*pubkey))?;

        Self::try_from_account(*pubkey, &account)
    }

    pub const fn capacity(&self) -> u64 {
        1 << self.max_depth
    }

    pub const fn remaining(&self) -> u64 {
        self.capacity().saturating_sub(self.num_leaves)
    }
}

fn read_array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}

// The canopy stores every node above the cut: 2^(depth + 1) - 2 nodes.
fn canopy_depth(canopy_bytes: usize) -> Option<u32> {
    if canopy_bytes % 32 != 0 {
        return None;
    }

    let nodes = canopy_bytes / 32 + 2;
    nodes
        .is_power_of_two()
        .then(|| nodes.trailing_zeros() - 1)
}
