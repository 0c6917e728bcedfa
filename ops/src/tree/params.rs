use super::TreeErrorKind;
use borsh::BorshDeserialize;
use clap::Args;
use solana_sdk::pubkey::Pubkey;
use spl_account_compression::state::{
    merkle_tree_get_size, ConcurrentMerkleTreeHeader, CONCURRENT_MERKLE_TREE_HEADER_SIZE_V1,
};

const NODE_SIZE: usize = 32;

#[derive(Debug, Clone, Args)]
pub struct TreeArgs {
    /// Depth of the merkle tree, capacity is 2^max_depth leaves
    #[arg(long, env, default_value = "3")]
    pub max_depth: u32,

    /// Number of concurrent changes the tree buffers
    #[arg(long, env, default_value = "8")]
    pub max_buffer_size: u32,

    /// Number of upper tree levels cached on-chain
    #[arg(long, env, default_value = "0")]
    pub canopy_depth: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    max_depth: u32,
    max_buffer_size: u32,
    canopy_depth: u32,
    merkle_tree_size: usize,
}

impl TreeParams {
    pub fn new(
        max_depth: u32,
        max_buffer_size: u32,
        canopy_depth: u32,
    ) -> Result<Self, TreeErrorKind> {
        let merkle_tree_size = merkle_tree_size(max_depth, max_buffer_size)?;

        if canopy_depth > max_depth {
            return Err(TreeErrorKind::CanopyTooDeep {
                canopy_depth,
                max_depth,
            });
        }

        Ok(Self {
            max_depth,
            max_buffer_size,
            canopy_depth,
            merkle_tree_size,
        })
    }

    pub const fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub const fn max_buffer_size(&self) -> u32 {
        self.max_buffer_size
    }

    pub const fn canopy_depth(&self) -> u32 {
        self.canopy_depth
    }

    pub const fn capacity(&self) -> u64 {
        1 << self.max_depth
    }

    /// Size of the `ConcurrentMerkleTree` body that follows the header.
    pub const fn merkle_tree_size(&self) -> usize {
        self.merkle_tree_size
    }

    /// Bytes to allocate for the tree account: header, tree body and canopy.
    pub const fn account_size(&self) -> usize {
        CONCURRENT_MERKLE_TREE_HEADER_SIZE_V1
            + self.merkle_tree_size
            + canopy_size(self.canopy_depth)
    }
}

impl TryFrom<&TreeArgs> for TreeParams {
    type Error = TreeErrorKind;

    fn try_from(args: &TreeArgs) -> Result<Self, Self::Error> {
        Self::new(args.max_depth, args.max_buffer_size, args.canopy_depth)
    }
}

/// Body size of a tree with this shape, as the compression program computes it
/// from an initialized header. Unsupported pairs are rejected.
pub fn merkle_tree_size(max_depth: u32, max_buffer_size: u32) -> Result<usize, TreeErrorKind> {
    let mut header =
        ConcurrentMerkleTreeHeader::try_from_slice(&[0; CONCURRENT_MERKLE_TREE_HEADER_SIZE_V1])?;
    header.initialize(max_depth, max_buffer_size, &Pubkey::default(), 0);

    merkle_tree_get_size(&header).map_err(|_| TreeErrorKind::InvalidDepthSizePair {
        max_depth,
        max_buffer_size,
    })
}

pub const fn canopy_size(canopy_depth: u32) -> usize {
    ((1 << (canopy_depth + 1)) - 2) * NODE_SIZE
}
