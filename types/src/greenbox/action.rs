//! Purchased box batches and the commit-reveal queues that resolve them.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::sha256::Digest;
use std::collections::{BTreeMap, VecDeque};

use super::{
    Address, NodeShare, Word256, BOX_AMOUNT_MASK, MAX_QUEUE_LENGTH, SEED_PAYMENT_FLAG,
    TIER_COUNT,
};

const BLOCK_HEIGHT_OFFSET: usize = 0;
const DOMAIN_ID_OFFSET: usize = 4;
const BOX_START_OFFSET: usize = 6;
const BOX_AMOUNT_OFFSET: usize = 10;
const ACTOR_OFFSET: usize = 12;

/// The indexer-facing fields of an action, packed as
/// `blockHeight(32) | domainId(16) | boxStart(32) | boxAmount(16) | actor(160)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GreenAction {
    pub commit_block: u32,
    pub domain_id: u16,
    pub box_start: u32,
    /// Raw purchase amount; bit 15 is the seed-payment flag.
    pub box_amount: u16,
    pub actor: Address,
}

impl GreenAction {
    pub fn boxes(&self) -> u16 {
        self.box_amount & BOX_AMOUNT_MASK
    }

    pub fn pays_with_seed(&self) -> bool {
        self.box_amount & SEED_PAYMENT_FLAG != 0
    }

    pub fn to_word(&self) -> Word256 {
        let mut word = Word256::ZERO;
        word.set_u32(BLOCK_HEIGHT_OFFSET, self.commit_block);
        word.set_u16(DOMAIN_ID_OFFSET, self.domain_id);
        word.set_u32(BOX_START_OFFSET, self.box_start);
        word.set_u16(BOX_AMOUNT_OFFSET, self.box_amount);
        word.0[ACTOR_OFFSET..].copy_from_slice(&self.actor.0);
        word
    }

    pub fn from_word(word: &Word256) -> Self {
        let mut actor = Address::default();
        actor.0.copy_from_slice(&word.0[ACTOR_OFFSET..]);
        Self {
            commit_block: word.u32_at(BLOCK_HEIGHT_OFFSET),
            domain_id: word.u16_at(DOMAIN_ID_OFFSET),
            box_start: word.u32_at(BOX_START_OFFSET),
            box_amount: word.u16_at(BOX_AMOUNT_OFFSET),
            actor,
        }
    }
}

impl Write for GreenAction {
    fn write(&self, writer: &mut impl BufMut) {
        self.to_word().write(writer);
    }
}

impl Read for GreenAction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self::from_word(&Word256::read(reader)?))
    }
}

impl FixedSize for GreenAction {
    const SIZE: usize = Word256::SIZE;
}

/// Resolution state of an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionStatus {
    /// Waiting in the commit queue for its due block.
    Pending,
    /// The due block's hash left the lookback window before reveal.
    Overtime,
    /// Resolved against `hash`, through overtime recovery when `recovered`. Terminal.
    Revealed { hash: Digest, recovered: bool },
}

impl ActionStatus {
    pub fn hash(&self) -> Option<&Digest> {
        match self {
            Self::Revealed { hash, .. } => Some(hash),
            _ => None,
        }
    }

    pub fn is_revealed(&self) -> bool {
        matches!(self, Self::Revealed { .. })
    }

    pub fn is_recovered(&self) -> bool {
        matches!(
            self,
            Self::Revealed {
                recovered: true,
                ..
            }
        )
    }
}

impl Write for ActionStatus {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Pending => 0u8.write(writer),
            Self::Overtime => 1u8.write(writer),
            Self::Revealed { hash, recovered } => {
                2u8.write(writer);
                hash.write(writer);
                recovered.write(writer);
            }
        }
    }
}

impl Read for ActionStatus {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Overtime),
            2 => Ok(Self::Revealed {
                hash: Digest::read(reader)?,
                recovered: bool::read(reader)?,
            }),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for ActionStatus {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Revealed { .. } => Digest::SIZE + bool::SIZE,
                _ => 0,
            }
    }
}

/// A stored action: created by a purchase, mutated once by a reveal path.
///
/// `boundaries` and `node` are fixed at purchase so that every later decode of the
/// action uses the tiers and split it was sold under, even after the domain is
/// re-registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    pub action_id: u32,
    pub green: GreenAction,
    pub boundaries: [u16; TIER_COUNT],
    pub node: Option<NodeShare>,
    pub status: ActionStatus,
}

impl Write for Action {
    fn write(&self, writer: &mut impl BufMut) {
        self.action_id.write(writer);
        self.green.write(writer);
        for boundary in &self.boundaries {
            boundary.write(writer);
        }
        self.node.write(writer);
        self.status.write(writer);
    }
}

impl Read for Action {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let action_id = u32::read(reader)?;
        let green = GreenAction::read(reader)?;
        let mut boundaries = [0u16; TIER_COUNT];
        for boundary in boundaries.iter_mut() {
            *boundary = u16::read(reader)?;
        }
        if boundaries.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(Error::Invalid("Action", "boundaries not cumulative"));
        }
        Ok(Self {
            action_id,
            green,
            boundaries,
            node: Option::<NodeShare>::read(reader)?,
            status: ActionStatus::read(reader)?,
        })
    }
}

impl EncodeSize for Action {
    fn encode_size(&self) -> usize {
        u32::SIZE
            + GreenAction::SIZE
            + TIER_COUNT * u16::SIZE
            + self.node.encode_size()
            + self.status.encode_size()
    }
}

/// An action waiting for (or past) its due block.
///
/// `commit_seed` is the most recent block hash known when the purchase was queued. It is
/// kept for audit only; outcomes mix the resolved hash alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueEntry {
    pub action_id: u32,
    pub due_block: u64,
    pub commit_seed: Digest,
}

impl Write for QueueEntry {
    fn write(&self, writer: &mut impl BufMut) {
        self.action_id.write(writer);
        self.due_block.write(writer);
        self.commit_seed.write(writer);
    }
}

impl Read for QueueEntry {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            action_id: u32::read(reader)?,
            due_block: u64::read(reader)?,
            commit_seed: Digest::read(reader)?,
        })
    }
}

impl FixedSize for QueueEntry {
    const SIZE: usize = u32::SIZE + u64::SIZE + Digest::SIZE;
}

/// Pending actions in enqueue order. Due blocks are non-decreasing because every entry is
/// queued at `height + reveal_delay` with a fixed delay.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitQueue {
    pub entries: VecDeque<QueueEntry>,
}

impl CommitQueue {
    pub fn push(&mut self, entry: QueueEntry) {
        self.entries.push_back(entry);
    }

    pub fn head(&self) -> Option<&QueueEntry> {
        self.entries.front()
    }

    /// Pops the head if its due block is strictly below `height`.
    pub fn pop_due(&mut self, height: u64) -> Option<QueueEntry> {
        match self.entries.front() {
            Some(head) if head.due_block < height => self.entries.pop_front(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Write for CommitQueue {
    fn write(&self, writer: &mut impl BufMut) {
        (self.entries.len() as u32).write(writer);
        for entry in &self.entries {
            entry.write(writer);
        }
    }
}

impl Read for CommitQueue {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let len = u32::read(reader)? as usize;
        if len > MAX_QUEUE_LENGTH {
            return Err(Error::Invalid("CommitQueue", "too many entries"));
        }
        let mut entries = VecDeque::with_capacity(len);
        for _ in 0..len {
            entries.push_back(QueueEntry::read(reader)?);
        }
        Ok(Self { entries })
    }
}

impl EncodeSize for CommitQueue {
    fn encode_size(&self) -> usize {
        u32::SIZE + self.entries.len() * QueueEntry::SIZE
    }
}

/// Actions whose due-block hash is no longer retrievable, keyed by action id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OvertimeSet {
    pub entries: BTreeMap<u32, QueueEntry>,
}

impl OvertimeSet {
    pub fn insert(&mut self, entry: QueueEntry) {
        self.entries.insert(entry.action_id, entry);
    }

    pub fn remove(&mut self, action_id: u32) -> Option<QueueEntry> {
        self.entries.remove(&action_id)
    }

    pub fn contains(&self, action_id: u32) -> bool {
        self.entries.contains_key(&action_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Write for OvertimeSet {
    fn write(&self, writer: &mut impl BufMut) {
        (self.entries.len() as u32).write(writer);
        for entry in self.entries.values() {
            entry.write(writer);
        }
    }
}

impl Read for OvertimeSet {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let len = u32::read(reader)? as usize;
        if len > MAX_QUEUE_LENGTH {
            return Err(Error::Invalid("OvertimeSet", "too many entries"));
        }
        let mut set = Self::default();
        for _ in 0..len {
            let entry = QueueEntry::read(reader)?;
            if set.entries.insert(entry.action_id, entry).is_some() {
                return Err(Error::Invalid("OvertimeSet", "duplicate action id"));
            }
        }
        Ok(set)
    }
}

impl EncodeSize for OvertimeSet {
    fn encode_size(&self) -> usize {
        u32::SIZE + self.entries.len() * QueueEntry::SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::Encode;

    fn entry(action_id: u32, due_block: u64) -> QueueEntry {
        QueueEntry {
            action_id,
            due_block,
            commit_seed: Digest([action_id as u8; 32]),
        }
    }

    #[test]
    fn green_action_word_layout() {
        let green = GreenAction {
            commit_block: 0x0102_0304,
            domain_id: 1,
            box_start: 123,
            box_amount: SEED_PAYMENT_FLAG | 234,
            actor: Address([0xAA; 20]),
        };
        let word = green.to_word();
        assert_eq!(&word.0[..4], &[1, 2, 3, 4]);
        assert_eq!(&word.0[4..6], &[0, 1]);
        assert_eq!(&word.0[6..10], &123u32.to_be_bytes());
        assert_eq!(&word.0[10..12], &(0x8000u16 | 234).to_be_bytes());
        assert_eq!(&word.0[12..], &[0xAA; 20]);
        assert_eq!(GreenAction::from_word(&word), green);
        assert_eq!(green.boxes(), 234);
        assert!(green.pays_with_seed());
    }

    #[test]
    fn pop_due_stops_at_not_yet_due_head() {
        let mut queue = CommitQueue::default();
        queue.push(entry(1, 10));
        queue.push(entry(2, 12));

        assert_eq!(queue.pop_due(10), None);
        assert_eq!(queue.pop_due(11).map(|e| e.action_id), Some(1));
        assert_eq!(queue.pop_due(11), None);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn queues_round_trip() {
        let mut queue = CommitQueue::default();
        queue.push(entry(1, 10));
        queue.push(entry(2, 12));
        let encoded = queue.encode();
        assert_eq!(encoded.len(), queue.encode_size());
        assert_eq!(CommitQueue::read(&mut &encoded[..]).unwrap(), queue);

        let mut overtime = OvertimeSet::default();
        overtime.insert(entry(7, 3));
        overtime.insert(entry(4, 1));
        let encoded = overtime.encode();
        assert_eq!(OvertimeSet::read(&mut &encoded[..]).unwrap(), overtime);
    }

    #[test]
    fn overtime_rejects_duplicate_ids() {
        let mut buf = Vec::new();
        2u32.write(&mut buf);
        entry(5, 1).write(&mut buf);
        entry(5, 2).write(&mut buf);
        assert!(matches!(
            OvertimeSet::read(&mut &buf[..]),
            Err(Error::Invalid("OvertimeSet", "duplicate action id"))
        ));
    }

    #[test]
    fn action_status_round_trips() {
        let node = NodeShare {
            node_id: 5,
            owner: Address([0x44; 20]),
            percentage: 30,
        };
        for (status, node) in [
            (ActionStatus::Pending, None),
            (ActionStatus::Overtime, Some(node)),
            (
                ActionStatus::Revealed {
                    hash: Digest([9u8; 32]),
                    recovered: true,
                },
                Some(node),
            ),
        ] {
            let action = Action {
                action_id: 3,
                green: GreenAction::default(),
                boundaries: [1, 2, 3, 4, 5, 6, 7, 8],
                node,
                status,
            };
            let encoded = action.encode();
            assert_eq!(encoded.len(), action.encode_size());
            assert_eq!(Action::read(&mut &encoded[..]).unwrap(), action);
        }
    }

    #[test]
    fn action_rejects_unordered_boundaries() {
        let action = Action {
            action_id: 3,
            green: GreenAction::default(),
            boundaries: [1, 2, 3, 4, 5, 6, 8, 7],
            node: None,
            status: ActionStatus::Pending,
        };
        let encoded = action.encode();
        assert!(matches!(
            Action::read(&mut &encoded[..]),
            Err(Error::Invalid("Action", "boundaries not cumulative"))
        ));
    }
}
