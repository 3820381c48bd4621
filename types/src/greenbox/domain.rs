//! Domain configuration and its packed word.
//!
//! Layout (most significant byte first):
//!
//! ```text
//! byte  0      x            u8   (cosmetic)
//! byte  1      y            u8   (cosmetic)
//! byte  2      w            u8   (cosmetic)
//! byte  3      h            u8   (cosmetic)
//! bytes 4..8   boxTop       u32
//! bytes 8..16  chance1..4   u16 each
//! bytes 16..24 ratio1..4    u16 each
//! byte  24     decimal      u8
//! bytes 25..28 nodeBound(1) | nodeId(23)
//! bytes 28..32 boxesSold    u32
//! ```
//!
//! Registration accepts raw chance/ratio values in parts per 10 000 and stores each as a
//! running cumulative boundary on the `u16` scale, so reveal-time classification is a
//! handful of comparisons.

use thiserror::Error as ThisError;

use super::{
    Word256, CHANCE_SCALE, MAX_CUMULATIVE_CHANCE, MAX_DECIMAL, MAX_NODE_ID, RAW_CHANCE_SCALE,
    TIER_COUNT,
};

const X_OFFSET: usize = 0;
const Y_OFFSET: usize = 1;
const W_OFFSET: usize = 2;
const H_OFFSET: usize = 3;
const BOX_TOP_OFFSET: usize = 4;
const CHANCE_OFFSET: usize = 8;
const RATIO_OFFSET: usize = 16;
const DECIMAL_OFFSET: usize = 24;
const NODE_OFFSET: usize = 25;
const BOXES_SOLD_OFFSET: usize = 28;

const NODE_BOUND_BIT: u32 = 1 << 23;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum PackError {
    #[error("cumulative chance {total} exceeds {max}")]
    ChanceOverflow { total: u32, max: u32 },
    #[error("decimal {got} exceeds {max}")]
    DecimalTooLarge { got: u8, max: u8 },
    #[error("node id {got} exceeds {max}")]
    NodeIdTooLarge { got: u32, max: u32 },
}

/// Converts a raw value (parts per 10 000) to the 65 536 scale, rounding half up.
pub fn convert(raw: u16) -> u32 {
    (CHANCE_SCALE * raw as u32 + RAW_CHANCE_SCALE / 2) / RAW_CHANCE_SCALE
}

/// Cosmetic placement of a domain on the front-end grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Geometry {
    pub x: u8,
    pub y: u8,
    pub w: u8,
    pub h: u8,
}

/// Field view of a domain word.
///
/// The same struct represents both the raw registration input and the stored config;
/// [`DomainConfig::accumulate`] turns the former into the latter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DomainConfig {
    pub geometry: Geometry,
    pub box_top: u32,
    pub chances: [u16; 4],
    pub ratios: [u16; 4],
    pub decimal: u8,
    pub node_bound: bool,
    pub node_id: u32,
    pub boxes_sold: u32,
}

impl DomainConfig {
    pub fn from_word(word: &Word256) -> Self {
        let mut chances = [0u16; 4];
        let mut ratios = [0u16; 4];
        for i in 0..4 {
            chances[i] = word.u16_at(CHANCE_OFFSET + 2 * i);
            ratios[i] = word.u16_at(RATIO_OFFSET + 2 * i);
        }
        let node = word.u24_at(NODE_OFFSET);

        Self {
            geometry: Geometry {
                x: word.u8_at(X_OFFSET),
                y: word.u8_at(Y_OFFSET),
                w: word.u8_at(W_OFFSET),
                h: word.u8_at(H_OFFSET),
            },
            box_top: word.u32_at(BOX_TOP_OFFSET),
            chances,
            ratios,
            decimal: word.u8_at(DECIMAL_OFFSET),
            node_bound: node & NODE_BOUND_BIT != 0,
            node_id: node & MAX_NODE_ID,
            boxes_sold: word.u32_at(BOXES_SOLD_OFFSET),
        }
    }

    /// Packs the config. Node ids wider than 23 bits are truncated; use
    /// [`DomainConfig::validate`] first.
    pub fn to_word(&self) -> Word256 {
        let mut word = Word256::ZERO;
        word.set_u8(X_OFFSET, self.geometry.x);
        word.set_u8(Y_OFFSET, self.geometry.y);
        word.set_u8(W_OFFSET, self.geometry.w);
        word.set_u8(H_OFFSET, self.geometry.h);
        word.set_u32(BOX_TOP_OFFSET, self.box_top);
        for i in 0..4 {
            word.set_u16(CHANCE_OFFSET + 2 * i, self.chances[i]);
            word.set_u16(RATIO_OFFSET + 2 * i, self.ratios[i]);
        }
        word.set_u8(DECIMAL_OFFSET, self.decimal);
        let mut node = self.node_id & MAX_NODE_ID;
        if self.node_bound {
            node |= NODE_BOUND_BIT;
        }
        word.set_u24(NODE_OFFSET, node);
        word.set_u32(BOXES_SOLD_OFFSET, self.boxes_sold);
        word
    }

    pub fn validate(&self) -> Result<(), PackError> {
        if self.decimal > MAX_DECIMAL {
            return Err(PackError::DecimalTooLarge {
                got: self.decimal,
                max: MAX_DECIMAL,
            });
        }
        if self.node_id > MAX_NODE_ID {
            return Err(PackError::NodeIdTooLarge {
                got: self.node_id,
                max: MAX_NODE_ID,
            });
        }
        Ok(())
    }

    /// Converts raw per-10 000 chance/ratio values into cumulative boundaries.
    pub fn accumulate(&self) -> Result<Self, PackError> {
        self.validate()?;

        let mut total = 0u32;
        let mut stored = *self;
        for (slot, raw) in stored
            .chances
            .iter_mut()
            .chain(stored.ratios.iter_mut())
            .zip(self.chances.iter().chain(self.ratios.iter()))
        {
            total += convert(*raw);
            if total > MAX_CUMULATIVE_CHANCE {
                return Err(PackError::ChanceOverflow {
                    total,
                    max: MAX_CUMULATIVE_CHANCE,
                });
            }
            *slot = total as u16;
        }
        Ok(stored)
    }

    /// The eight stored boundaries in classification order.
    pub fn boundaries(&self) -> [u16; TIER_COUNT] {
        let mut out = [0u16; TIER_COUNT];
        out[..4].copy_from_slice(&self.chances);
        out[4..].copy_from_slice(&self.ratios);
        out
    }

    pub fn is_cumulative(&self) -> bool {
        self.boundaries().windows(2).all(|pair| pair[0] <= pair[1])
    }

    pub fn node(&self) -> Option<u32> {
        self.node_bound.then_some(self.node_id)
    }

    pub fn remaining(&self) -> u32 {
        self.box_top.saturating_sub(self.boxes_sold)
    }

    /// Price of `boxes` boxes in base units (`boxes * 10^decimal`).
    pub fn price(&self, boxes: u16) -> Option<u64> {
        10u64
            .checked_pow(self.decimal as u32)?
            .checked_mul(boxes as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_config() -> DomainConfig {
        DomainConfig {
            box_top: 200_000,
            chances: [15, 200, 1000, 0],
            ratios: [500, 1500, 0, 0],
            decimal: 8,
            ..Default::default()
        }
    }

    #[test]
    fn convert_rounds_half_up() {
        assert_eq!(convert(0), 0);
        assert_eq!(convert(15), 98);
        assert_eq!(convert(200), 1311);
        assert_eq!(convert(1000), 6554);
        assert_eq!(convert(10_000), 65_536);
    }

    #[test]
    fn accumulate_builds_running_sums() {
        let stored = scenario_config().accumulate().unwrap();
        assert_eq!(stored.chances, [98, 1409, 7963, 7963]);
        assert_eq!(stored.ratios, [11240, 21070, 21070, 21070]);
        assert!(stored.is_cumulative());
        assert_eq!(stored.box_top, 200_000);
        assert_eq!(stored.decimal, 8);
    }

    #[test]
    fn accumulate_rejects_full_scale() {
        let config = DomainConfig {
            chances: [10_000, 0, 0, 0],
            ..Default::default()
        };
        assert_eq!(
            config.accumulate(),
            Err(PackError::ChanceOverflow {
                total: 65_536,
                max: MAX_CUMULATIVE_CHANCE
            })
        );
    }

    #[test]
    fn accumulate_rejects_large_decimal() {
        let config = DomainConfig {
            decimal: MAX_DECIMAL + 1,
            ..Default::default()
        };
        assert!(matches!(
            config.accumulate(),
            Err(PackError::DecimalTooLarge { .. })
        ));
    }

    #[test]
    fn word_layout_matches_offsets() {
        let config = DomainConfig {
            geometry: Geometry {
                x: 1,
                y: 2,
                w: 3,
                h: 4,
            },
            node_bound: true,
            node_id: 0x12ABC,
            boxes_sold: 123,
            ..scenario_config()
        };
        let word = config.to_word();
        assert_eq!(&word.0[..4], &[1, 2, 3, 4]);
        assert_eq!(&word.0[4..8], &200_000u32.to_be_bytes());
        assert_eq!(&word.0[8..10], &15u16.to_be_bytes());
        assert_eq!(word.0[24], 8);
        assert_eq!(&word.0[25..28], &[0x81, 0x2A, 0xBC]);
        assert_eq!(word.low_u32(), 123);
        assert_eq!(DomainConfig::from_word(&word), config);
    }

    #[test]
    fn price_scales_with_decimal() {
        let config = scenario_config();
        assert_eq!(config.price(123), Some(12_300_000_000));
        let huge = DomainConfig {
            decimal: MAX_DECIMAL,
            ..Default::default()
        };
        assert_eq!(huge.price(1), Some(1_000_000_000_000_000_000));
        assert_eq!(huge.price(100), None);
    }
}
