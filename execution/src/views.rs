//! Read-only queries over committed state.
//!
//! Every view works on any [`State`], so the same functions serve an uncommitted
//! [`crate::Layer`] during a block and the backing store between blocks.

use anyhow::Result;
use greenbox_types::execution::{Key, Value};
use greenbox_types::greenbox::{
    calculate_gifts, Action, ActionStatus, Address, Asset, DomainConfig, GiftReport, LuckyFund, Node,
    OvertimeSet, QueueEntry, Word256,
};

use crate::state::State;

/// Size of one id in a paginated byte page.
pub const ID_LENGTH: usize = 4;

/// Reveal queue summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStatus {
    pub pending: usize,
    pub overtime: usize,
    /// Due block of the oldest pending entry.
    pub head_due_block: Option<u64>,
}

/// Raw stored word of a domain, or the zero word if it was never registered.
pub async fn domain_word<S: State>(state: &S, domain_id: u16) -> Result<Word256> {
    Ok(match state.get(&Key::Domain(domain_id)).await? {
        Some(Value::Domain(word)) => word,
        _ => Word256::ZERO,
    })
}

pub async fn domain<S: State>(state: &S, domain_id: u16) -> Result<Option<DomainConfig>> {
    Ok(match state.get(&Key::Domain(domain_id)).await? {
        Some(Value::Domain(word)) => Some(DomainConfig::from_word(&word)),
        _ => None,
    })
}

pub async fn action<S: State>(state: &S, action_id: u32) -> Result<Option<Action>> {
    Ok(match state.get(&Key::Action(action_id)).await? {
        Some(Value::Action(action)) => Some(action),
        _ => None,
    })
}

/// Packed action word, or the zero word for an unknown id.
pub async fn green_action_word<S: State>(state: &S, action_id: u32) -> Result<Word256> {
    Ok(action(state, action_id)
        .await?
        .map(|action| action.green.to_word())
        .unwrap_or(Word256::ZERO))
}

pub async fn node<S: State>(state: &S, node_id: u32) -> Result<Option<Node>> {
    Ok(match state.get(&Key::Node(node_id)).await? {
        Some(Value::Node(node)) => Some(node),
        _ => None,
    })
}

pub async fn queue_status<S: State>(state: &S) -> Result<QueueStatus> {
    let mut status = QueueStatus::default();
    if let Some(Value::RevealQueue(queue)) = state.get(&Key::RevealQueue).await? {
        status.pending = queue.len();
        status.head_due_block = queue.head().map(|entry| entry.due_block);
    }
    status.overtime = overtime_entries(state).await?.len();
    Ok(status)
}

/// Overtime entries in ascending action id order.
pub async fn overtime_entries<S: State>(state: &S) -> Result<Vec<QueueEntry>> {
    Ok(match state.get(&Key::Overtime).await? {
        Some(Value::Overtime(OvertimeSet { entries })) => entries.into_values().collect(),
        _ => Vec::new(),
    })
}

/// Recomputes the report of a revealed action from its stored hash and the tiers
/// recorded at purchase. Matches the emitted `BoxesRevealed` report exactly.
pub async fn check_gifts<S: State>(state: &S, action_id: u32) -> Result<Option<GiftReport>> {
    let Some(action) = action(state, action_id).await? else {
        return Ok(None);
    };
    let ActionStatus::Revealed { hash, recovered } = action.status else {
        return Ok(None);
    };

    Ok(Some(GiftReport {
        action_id,
        green: action.green,
        hash,
        node: action.node,
        recovered,
        outcome: calculate_gifts(&action.boundaries, action_id, action.green.boxes(), &hash),
    }))
}

pub async fn balance<S: State>(state: &S, asset: Asset, address: Address) -> Result<u64> {
    Ok(match state.get(&Key::Balance(asset, address)).await? {
        Some(Value::Balance(balance)) => balance,
        _ => 0,
    })
}

pub async fn lucky_fund<S: State>(state: &S) -> Result<LuckyFund> {
    Ok(match state.get(&Key::LuckyFund).await? {
        Some(Value::LuckyFund(fund)) => fund,
        _ => LuckyFund::default(),
    })
}

/// Next nonce a manager command for `address` must carry.
pub async fn manager_nonce<S: State>(state: &S, address: Address) -> Result<u64> {
    Ok(match state.get(&Key::ManagerNonce(address)).await? {
        Some(Value::ManagerNonce(nonce)) => nonce,
        _ => 0,
    })
}

/// Clips `ids` to `[offset, offset + count)` and packs the slice as big-endian u32s.
///
/// `count == 0` means "everything from `offset`". Returns the full length alongside.
pub fn paginate(ids: &[u32], offset: u32, count: u32) -> (u32, Vec<u8>) {
    let total = ids.len() as u32;
    let start = (offset as usize).min(ids.len());
    let end = if count == 0 {
        ids.len()
    } else {
        start.saturating_add(count as usize).min(ids.len())
    };

    let mut page = Vec::with_capacity((end - start) * ID_LENGTH);
    for id in &ids[start..end] {
        page.extend_from_slice(&id.to_be_bytes());
    }
    (total, page)
}

async fn index<S: State>(state: &S, key: &Key) -> Result<Vec<u32>> {
    Ok(match state.get(key).await? {
        Some(Value::ActionIds(ids)) => ids,
        _ => Vec::new(),
    })
}

pub async fn user_action_ids<S: State>(
    state: &S,
    user: Address,
    offset: u32,
    count: u32,
) -> Result<(u32, Vec<u8>)> {
    let ids = index(state, &Key::UserActions(user)).await?;
    Ok(paginate(&ids, offset, count))
}

pub async fn domain_action_ids<S: State>(
    state: &S,
    domain_id: u16,
    offset: u32,
    count: u32,
) -> Result<(u32, Vec<u8>)> {
    let ids = index(state, &Key::DomainActions(domain_id)).await?;
    Ok(paginate(&ids, offset, count))
}

pub async fn node_ids<S: State>(state: &S, offset: u32, count: u32) -> Result<(u32, Vec<u8>)> {
    let ids = index(state, &Key::NodeIndex).await?;
    Ok(paginate(&ids, offset, count))
}

/// Unpacks a page produced by [`paginate`].
pub fn unpack_ids(page: &[u8]) -> Vec<u32> {
    page.chunks_exact(ID_LENGTH)
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Memory;

    #[test]
    fn paginate_clips_to_bounds() {
        let ids: Vec<u32> = (1..=10).collect();

        let (total, page) = paginate(&ids, 0, 0);
        assert_eq!(total, 10);
        assert_eq!(unpack_ids(&page), ids);

        let (_, page) = paginate(&ids, 3, 4);
        assert_eq!(unpack_ids(&page), vec![4, 5, 6, 7]);
        assert_eq!(page[..4], [0, 0, 0, 4]);

        let (_, page) = paginate(&ids, 8, 100);
        assert_eq!(unpack_ids(&page), vec![9, 10]);

        let (total, page) = paginate(&ids, 11, 2);
        assert_eq!(total, 10);
        assert!(page.is_empty());

        let (total, page) = paginate(&[], 0, 0);
        assert_eq!(total, 0);
        assert!(page.is_empty());
    }

    #[test]
    fn paginate_slices_match_full_list() {
        let ids: Vec<u32> = (100..137).collect();
        let (_, full) = paginate(&ids, 0, 0);
        let full = unpack_ids(&full);
        for offset in 0..40u32 {
            for count in 1..8u32 {
                let (_, page) = paginate(&ids, offset, count);
                let start = (offset as usize).min(full.len());
                let end = (start + count as usize).min(full.len());
                assert_eq!(unpack_ids(&page), full[start..end]);
            }
        }
    }

    #[tokio::test]
    async fn empty_state_views() {
        let state = Memory::default();
        assert_eq!(domain_word(&state, 1).await.unwrap(), Word256::ZERO);
        assert_eq!(green_action_word(&state, 1).await.unwrap(), Word256::ZERO);
        assert_eq!(queue_status(&state).await.unwrap(), QueueStatus::default());
        assert_eq!(check_gifts(&state, 1).await.unwrap(), None);
        assert_eq!(lucky_fund(&state).await.unwrap(), LuckyFund::default());
        assert_eq!(
            user_action_ids(&state, Address([1u8; 20]), 0, 0)
                .await
                .unwrap(),
            (0, Vec::new())
        );
    }
}
