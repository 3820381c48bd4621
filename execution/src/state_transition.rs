//! Apply a block's transactions to state.
//!
//! Re-submitting an already applied height is a no-op so a host can safely replay its
//! block log after a restart. Skipping a height is an error.

use crate::{BlockContext, BlockHashWindow, Layer, State};
use anyhow::{anyhow, Context as _};
use commonware_cryptography::ed25519::PublicKey;
use greenbox_types::{
    execution::{Key, Output, Transaction, Value},
    greenbox::Settings,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Result of executing a block's state transition
#[derive(Debug, Default)]
pub struct StateTransitionResult {
    /// Events and accepted transactions in execution order. Empty for a replayed height.
    pub outputs: Vec<Output>,
    /// Map of public keys to their next expected nonce after processing
    pub processed_nonces: BTreeMap<PublicKey, u64>,
}

/// Height of the last committed block, or 0 for a fresh state.
pub async fn committed_height<S: State>(state: &S) -> anyhow::Result<u64> {
    Ok(match state.get(&Key::Commit).await.context("read commit")? {
        Some(Value::Commit { height }) => height,
        _ => 0,
    })
}

/// Execute state transition for a block
///
/// `hashes` must end at the hash of block `context.height - 1`. Only processes the block if
/// it is the next expected height.
pub async fn execute_state_transition<S: State>(
    state: &mut S,
    settings: &Settings,
    hashes: &BlockHashWindow,
    context: BlockContext,
    transactions: Vec<Transaction>,
) -> anyhow::Result<StateTransitionResult> {
    let height = context.height;
    let state_height = committed_height(state).await?;

    // If this is not the next expected height, either treat as a no-op (already processed),
    // or fail (height gap) to avoid silently skipping blocks.
    if height <= state_height {
        debug!(height, state_height, "block already applied");
        return Ok(StateTransitionResult::default());
    }
    let expected_next_height = state_height.saturating_add(1);
    if height != expected_next_height {
        return Err(anyhow!(
            "non-sequential height: state_height={state_height}, expected={expected_next_height}, requested={height}"
        ));
    }
    // A lagging window would push due entries into overtime while their hashes are
    // still within lookback.
    let latest = hashes.latest().map(|(latest, _)| latest);
    if latest != height.checked_sub(1) {
        return Err(anyhow!(
            "hash window must end at height {}, ends at {latest:?} while executing {height}",
            height - 1
        ));
    }

    let mut layer = Layer::new(state, settings, context, hashes);
    let (outputs, processed_nonces) = layer
        .execute(transactions)
        .await
        .with_context(|| format!("execute layer (height={height})"))?;
    let changes = layer.commit();

    state
        .apply(changes)
        .await
        .with_context(|| format!("apply state changes (height={height})"))?;
    state
        .insert(Key::Commit, Value::Commit { height })
        .await
        .with_context(|| format!("commit state (height={height})"))?;

    Ok(StateTransitionResult {
        outputs,
        processed_nonces,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{create_account_keypair, create_settings, create_window};
    use crate::mocks::raw_domain_word;
    use crate::state::{nonce, Memory};
    use crate::views;
    use greenbox_types::{
        execution::{Event, Instruction},
        greenbox::{ActionStatus, Address, Asset},
    };

    #[tokio::test]
    async fn replayed_height_is_noop_and_gap_fails() {
        let mut state = Memory::default();
        let (settings, _, _) = create_settings(5);
        let window = create_window(&settings, 0);
        let (signer, public) = create_account_keypair(3);

        let tx = Transaction::sign(&signer, 0, Instruction::RevealBoxes);
        let result = execute_state_transition(
            &mut state,
            &settings,
            &window,
            BlockContext::new(1, 10),
            vec![tx.clone()],
        )
        .await
        .unwrap();
        assert_eq!(result.processed_nonces.get(&public), Some(&1));
        assert_eq!(committed_height(&state).await.unwrap(), 1);

        // Same height again changes nothing.
        let replay = execute_state_transition(
            &mut state,
            &settings,
            &window,
            BlockContext::new(1, 10),
            vec![tx],
        )
        .await
        .unwrap();
        assert!(replay.outputs.is_empty());
        assert_eq!(nonce(&state, &public).await.unwrap(), 1);

        let gap = execute_state_transition(
            &mut state,
            &settings,
            &window,
            BlockContext::new(3, 30),
            Vec::new(),
        )
        .await;
        assert!(gap.is_err());
    }

    #[tokio::test]
    async fn window_must_end_at_parent() {
        let mut state = Memory::default();
        let (settings, _, _) = create_settings(5);

        // Reaching the executing height.
        let ahead = create_window(&settings, 1);
        let result = execute_state_transition(
            &mut state,
            &settings,
            &ahead,
            BlockContext::new(1, 10),
            Vec::new(),
        )
        .await;
        assert!(result.is_err());

        // Empty.
        let empty = BlockHashWindow::new(settings.lookback).unwrap();
        let result = execute_state_transition(
            &mut state,
            &settings,
            &empty,
            BlockContext::new(1, 10),
            Vec::new(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(committed_height(&state).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn lagging_window_leaves_due_entries_queued() {
        let mut state = Memory::default();
        let (settings, owner, _) = create_settings(2);
        let (buyer, buyer_public) = create_account_keypair(3);
        let buyer_address = Address::from_public(&buyer_public);

        let register = vec![
            Transaction::sign(
                &owner,
                0,
                Instruction::RegisterDomain {
                    domain_id: 1,
                    packed: raw_domain_word(100, [15, 200, 1000, 0], [0; 4], 8),
                    reset_sold: false,
                },
            ),
            Transaction::sign(
                &owner,
                1,
                Instruction::Mint {
                    asset: Asset::Energy,
                    to: buyer_address,
                    amount: 100_000_000,
                },
            ),
        ];
        let purchase = vec![Transaction::sign(
            &buyer,
            0,
            Instruction::MakeGreenBox {
                domain_id: 1,
                box_amount: 1,
                pixels: None,
            },
        )];
        let blocks = [register, purchase, Vec::new(), Vec::new(), Vec::new()];
        for (height, transactions) in (1u64..).zip(blocks) {
            execute_state_transition(
                &mut state,
                &settings,
                &create_window(&settings, height - 1),
                BlockContext::new(height, height * 10),
                transactions,
            )
            .await
            .unwrap();
        }

        // The action bought at 2 is due at 4; block 6 arrives with a window ending at 3.
        let reveal = Transaction::sign(&buyer, 1, Instruction::RevealBoxes);
        let lagging = create_window(&settings, 3);
        let result = execute_state_transition(
            &mut state,
            &settings,
            &lagging,
            BlockContext::new(6, 60),
            vec![reveal.clone()],
        )
        .await;
        assert!(result.is_err());
        let action = views::action(&state, 1).await.unwrap().unwrap();
        assert_eq!(action.status, ActionStatus::Pending);

        let result = execute_state_transition(
            &mut state,
            &settings,
            &create_window(&settings, 5),
            BlockContext::new(6, 60),
            vec![reveal],
        )
        .await
        .unwrap();
        assert!(result
            .outputs
            .iter()
            .any(|output| matches!(output, Output::Event(Event::BoxesRevealed(_)))));
        let status = views::queue_status(&state).await.unwrap();
        assert_eq!((status.pending, status.overtime), (0, 0));
    }
}
