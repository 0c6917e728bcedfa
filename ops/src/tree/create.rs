use super::{find_tree_authority, TreeErrorKind, TreeParams};
use cnft_core::{explorer_tx_url, ChainClient};
use log::{debug, error};
use mpl_bubblegum::instructions::CreateTreeConfigBuilder;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
};

fn create_tree_instructions(
    payer: &Pubkey,
    tree: &Pubkey,
    params: &TreeParams,
    lamports: u64,
) -> [Instruction; 2] {
    let alloc_tree_ix = system_instruction::create_account(
        payer,
        tree,
        lamports,
        params.account_size() as u64,
        &spl_account_compression::id(),
    );

    let create_tree_ix = CreateTreeConfigBuilder::new()
        .tree_config(find_tree_authority(tree))
        .merkle_tree(*tree)
        .payer(*payer)
        .tree_creator(*payer)
        .log_wrapper(spl_noop::id())
        .compression_program(spl_account_compression::id())
        .max_depth(params.max_depth())
        .max_buffer_size(params.max_buffer_size())
        .public(false)
        .instruction();

    [alloc_tree_ix, create_tree_ix]
}

/// Allocates a tree account sized for `params` and initializes it as a
/// Bubblegum tree owned by `payer`, in a single transaction.
///
/// The tree address comes from a freshly generated keypair which signs the
/// allocation alongside the payer.
pub async fn create_and_initialize_tree<C>(
    client: &C,
    payer: &Keypair,
    params: &TreeParams,
    explorer_cluster: &str,
) -> Result<Pubkey, TreeErrorKind>
where
    C: ChainClient + ?Sized,
{
    let tree_keypair = Keypair::new();
    let tree = tree_keypair.pubkey();

    let lamports = client
        .minimum_balance_for_rent_exemption(params.account_size())
        .await?;
    debug!(
        "allocating {} bytes for tree {} with canopy depth {} ({} lamports)",
        params.account_size(),
        tree,
        params.canopy_depth(),
        lamports
    );

    let instructions = create_tree_instructions(&payer.pubkey(), &tree, params, lamports);

    match client
        .send_and_confirm(&instructions, &payer.pubkey(), &[&tree_keypair, payer])
        .await
    {
        Ok(signature) => {
            println!("{}", explorer_tx_url(&signature, explorer_cluster));
            println!("Tree Address: {}", tree);

            Ok(tree)
        }
        Err(err) => {
            error!("failed to create merkle tree: {}", err);

            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;
    use cnft_core::ChainError;
    use solana_sdk::system_program;

    #[tokio::test]
    async fn submits_alloc_and_init_in_one_transaction() {
        let chain = MockChain::new();
        let payer = Keypair::new();
        let params = TreeParams::new(3, 8, 0).unwrap();

        let tree = create_and_initialize_tree(&chain, &payer, &params, "devnet")
            .await
            .unwrap();

        let sent = chain.sent();
        assert_eq!(sent.len(), 1);

        let transaction = &sent[0];
        assert_eq!(transaction.payer, payer.pubkey());
        assert_eq!(transaction.instructions.len(), 2);
        assert!(transaction.signers.contains(&tree));
        assert!(transaction.signers.contains(&payer.pubkey()));

        let alloc = &transaction.instructions[0];
        assert_eq!(alloc.program_id, system_program::id());
        assert_eq!(alloc.accounts[1].pubkey, tree);

        let init = &transaction.instructions[1];
        assert_eq!(init.program_id, mpl_bubblegum::ID);
        assert!(init
            .accounts
            .iter()
            .any(|meta| meta.pubkey == find_tree_authority(&tree)));
        assert!(init.accounts.iter().any(|meta| meta.pubkey == tree));
    }

    #[tokio::test]
    async fn each_creation_yields_a_new_address() {
        let chain = MockChain::new();
        let payer = Keypair::new();
        let params = TreeParams::new(5, 8, 2).unwrap();

        let first = create_and_initialize_tree(&chain, &payer, &params, "devnet")
            .await
            .unwrap();
        let second = create_and_initialize_tree(&chain, &payer, &params, "devnet")
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(chain.sent().len(), 2);
    }

    #[tokio::test]
    async fn submission_failure_is_returned() {
        let chain = MockChain::new().failing_send(0);
        let payer = Keypair::new();
        let params = TreeParams::new(3, 8, 0).unwrap();

        let result = create_and_initialize_tree(&chain, &payer, &params, "devnet").await;

        assert!(matches!(
            result,
            Err(TreeErrorKind::Chain(ChainError::Rpc(_)))
        ));
        assert!(chain.sent().is_empty());
    }

    #[test]
    fn allocation_is_sized_and_owned_for_compression() {
        let payer = Pubkey::new_unique();
        let tree = Pubkey::new_unique();
        let params = TreeParams::new(3, 8, 0).unwrap();

        let [alloc, _] = create_tree_instructions(&payer, &tree, &params, 42);

        let expected = system_instruction::create_account(
            &payer,
            &tree,
            42,
            1304,
            &spl_account_compression::id(),
        );
        assert_eq!(alloc, expected);
    }
}
