//! Deterministic outcome decoder.
//!
//! Every box of an action draws a 16-bit value from
//! `sha256(hash || action_id_be32 || (offset / 16)_be32)`, sixteen boxes per digest,
//! and lands in the first tier whose cumulative boundary it is strictly below.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::{
    sha256::{Digest, Sha256},
    Hasher,
};

use super::{Address, GreenAction, NodeShare, BOX_AMOUNT_MASK, TIER_COUNT};

/// Box values drawn from one digest.
pub const BOXES_PER_DIGEST: u32 = 16;

/// Prize tiers in classification order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Tier {
    Chance1 = 0,
    Chance2 = 1,
    Chance3 = 2,
    Chance4 = 3,
    Ratio1 = 4,
    Ratio2 = 5,
    Ratio3 = 6,
    Ratio4 = 7,
}

impl Tier {
    pub const ALL: [Tier; TIER_COUNT] = [
        Tier::Chance1,
        Tier::Chance2,
        Tier::Chance3,
        Tier::Chance4,
        Tier::Ratio1,
        Tier::Ratio2,
        Tier::Ratio3,
        Tier::Ratio4,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl Write for Tier {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for Tier {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let tag = u8::read(reader)?;
        Self::from_index(tag as usize).ok_or(Error::InvalidEnum(tag))
    }
}

impl FixedSize for Tier {
    const SIZE: usize = u8::SIZE;
}

/// A winning box: its offset within the action and the tier it hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WonBox {
    pub offset: u16,
    pub tier: Tier,
}

impl Write for WonBox {
    fn write(&self, writer: &mut impl BufMut) {
        self.offset.write(writer);
        self.tier.write(writer);
    }
}

impl Read for WonBox {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            offset: u16::read(reader)?,
            tier: Tier::read(reader)?,
        })
    }
}

impl FixedSize for WonBox {
    const SIZE: usize = u16::SIZE + Tier::SIZE;
}

/// Per-tier win counts and the winning boxes in offset order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GiftOutcome {
    pub counters: [u32; TIER_COUNT],
    pub won: Vec<WonBox>,
}

impl GiftOutcome {
    pub fn total_wins(&self) -> u32 {
        self.counters.iter().sum()
    }
}

impl Write for GiftOutcome {
    fn write(&self, writer: &mut impl BufMut) {
        for counter in &self.counters {
            counter.write(writer);
        }
        (self.won.len() as u16).write(writer);
        for won in &self.won {
            won.write(writer);
        }
    }
}

impl Read for GiftOutcome {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let mut counters = [0u32; TIER_COUNT];
        for counter in counters.iter_mut() {
            *counter = u32::read(reader)?;
        }
        let len = u16::read(reader)?;
        if len > BOX_AMOUNT_MASK {
            return Err(Error::Invalid("GiftOutcome", "too many winning boxes"));
        }
        let mut won = Vec::with_capacity(len as usize);
        for _ in 0..len {
            won.push(WonBox::read(reader)?);
        }
        if counters.iter().sum::<u32>() != won.len() as u32 {
            return Err(Error::Invalid("GiftOutcome", "counters do not match wins"));
        }
        Ok(Self { counters, won })
    }
}

impl EncodeSize for GiftOutcome {
    fn encode_size(&self) -> usize {
        TIER_COUNT * u32::SIZE + u16::SIZE + self.won.len() * WonBox::SIZE
    }
}

/// Classifies a box value against cumulative boundaries.
pub fn classify(value: u16, boundaries: &[u16; TIER_COUNT]) -> Option<Tier> {
    boundaries
        .iter()
        .position(|boundary| value < *boundary)
        .and_then(Tier::from_index)
}

fn box_digest(hash: &Digest, action_id: u32, chunk: u32) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(hash.as_ref());
    hasher.update(&action_id.to_be_bytes());
    hasher.update(&chunk.to_be_bytes());
    hasher.finalize()
}

/// Value drawn for the box at `offset`.
pub fn box_value(hash: &Digest, action_id: u32, offset: u32) -> u16 {
    let digest = box_digest(hash, action_id, offset / BOXES_PER_DIGEST);
    let at = 2 * (offset % BOXES_PER_DIGEST) as usize;
    u16::from_be_bytes([digest.0[at], digest.0[at + 1]])
}

/// Resolves `boxes` boxes of an action against `boundaries`.
///
/// `boxes` is the masked box count; the seed-payment flag never influences outcomes.
pub fn calculate_gifts(
    boundaries: &[u16; TIER_COUNT],
    action_id: u32,
    boxes: u16,
    hash: &Digest,
) -> GiftOutcome {
    let boxes = (boxes & BOX_AMOUNT_MASK) as u32;
    let mut outcome = GiftOutcome::default();
    let mut digest = None;
    for offset in 0..boxes {
        let slot = offset % BOXES_PER_DIGEST;
        if slot == 0 {
            digest = Some(box_digest(hash, action_id, offset / BOXES_PER_DIGEST));
        }
        let Some(digest) = digest.as_ref() else {
            continue;
        };
        let at = 2 * slot as usize;
        let value = u16::from_be_bytes([digest.0[at], digest.0[at + 1]]);
        if let Some(tier) = classify(value, boundaries) {
            outcome.counters[tier.index()] += 1;
            outcome.won.push(WonBox {
                offset: offset as u16,
                tier,
            });
        }
    }
    outcome
}

/// A resolved action as reported to indexers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GiftReport {
    pub action_id: u32,
    pub green: GreenAction,
    pub hash: Digest,
    pub node: Option<NodeShare>,
    /// Resolved through overtime recovery rather than the window.
    pub recovered: bool,
    pub outcome: GiftOutcome,
}

impl GiftReport {
    pub fn actor(&self) -> Address {
        self.green.actor
    }
}

impl Write for GiftReport {
    fn write(&self, writer: &mut impl BufMut) {
        self.action_id.write(writer);
        self.green.write(writer);
        self.hash.write(writer);
        self.node.write(writer);
        self.recovered.write(writer);
        self.outcome.write(writer);
    }
}

impl Read for GiftReport {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            action_id: u32::read(reader)?,
            green: GreenAction::read(reader)?,
            hash: Digest::read(reader)?,
            node: Option::<NodeShare>::read(reader)?,
            recovered: bool::read(reader)?,
            outcome: GiftOutcome::read(reader)?,
        })
    }
}

impl EncodeSize for GiftReport {
    fn encode_size(&self) -> usize {
        u32::SIZE
            + GreenAction::SIZE
            + Digest::SIZE
            + self.node.encode_size()
            + bool::SIZE
            + self.outcome.encode_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::greenbox::DomainConfig;
    use commonware_codec::Encode;

    fn boundaries() -> [u16; TIER_COUNT] {
        DomainConfig {
            box_top: 200_000,
            chances: [15, 200, 1000, 0],
            ratios: [500, 1500, 0, 0],
            decimal: 8,
            ..Default::default()
        }
        .accumulate()
        .unwrap()
        .boundaries()
    }

    #[test]
    fn classify_picks_first_boundary_above_value() {
        let b = boundaries();
        assert_eq!(classify(0, &b), Some(Tier::Chance1));
        assert_eq!(classify(97, &b), Some(Tier::Chance1));
        assert_eq!(classify(98, &b), Some(Tier::Chance2));
        assert_eq!(classify(7962, &b), Some(Tier::Chance3));
        // Zero-width tiers are unreachable.
        assert_eq!(classify(7963, &b), Some(Tier::Ratio1));
        assert_eq!(classify(21_069, &b), Some(Tier::Ratio2));
        assert_eq!(classify(21_070, &b), None);
        assert_eq!(classify(u16::MAX, &b), None);
    }

    #[test]
    fn outcome_matches_per_box_values() {
        let b = boundaries();
        let hash = Sha256::hash(b"block");
        let outcome = calculate_gifts(&b, 7, 123, &hash);

        let mut expected = GiftOutcome::default();
        for offset in 0..123u32 {
            if let Some(tier) = classify(box_value(&hash, 7, offset), &b) {
                expected.counters[tier.index()] += 1;
                expected.won.push(WonBox {
                    offset: offset as u16,
                    tier,
                });
            }
        }
        assert_eq!(outcome, expected);
        assert_eq!(outcome.total_wins() as usize, outcome.won.len());
    }

    #[test]
    fn outcome_depends_on_action_id_and_hash() {
        let b = [u16::MAX; TIER_COUNT];
        let hash = Sha256::hash(b"block");
        // Every value below u16::MAX wins Chance1.
        let all = calculate_gifts(&b, 1, 64, &hash);
        assert!(all.counters[0] >= 60);

        let none = calculate_gifts(&[0; TIER_COUNT], 1, 64, &hash);
        assert_eq!(none, GiftOutcome::default());

        let x = calculate_gifts(&boundaries(), 1, 500, &hash);
        let y = calculate_gifts(&boundaries(), 2, 500, &hash);
        let z = calculate_gifts(&boundaries(), 1, 500, &Sha256::hash(b"other"));
        assert_ne!(x, y);
        assert_ne!(x, z);
    }

    #[test]
    fn seed_flag_is_ignored() {
        let hash = Sha256::hash(b"block");
        assert_eq!(
            calculate_gifts(&boundaries(), 3, 0x8000 | 40, &hash),
            calculate_gifts(&boundaries(), 3, 40, &hash)
        );
    }

    #[test]
    fn report_round_trips() {
        let hash = Sha256::hash(b"block");
        let report = GiftReport {
            action_id: 9,
            green: GreenAction {
                commit_block: 10,
                domain_id: 1,
                box_start: 0,
                box_amount: 123,
                actor: Address([5u8; 20]),
            },
            hash,
            node: Some(NodeShare {
                node_id: 0x12ABC,
                owner: Address([6u8; 20]),
                percentage: 20,
            }),
            recovered: false,
            outcome: calculate_gifts(&boundaries(), 9, 123, &hash),
        };
        let encoded = report.encode();
        assert_eq!(encoded.len(), report.encode_size());
        assert_eq!(GiftReport::read(&mut &encoded[..]).unwrap(), report);
    }
}
