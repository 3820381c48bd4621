use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, Write};
use commonware_utils::{from_hex_formatted, hex};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::read_bytes;

/// Length of a packed word in bytes.
pub const WORD_LENGTH: usize = 32;

/// A 256-bit big-endian packed word.
///
/// Field offsets used by [`super::DomainConfig`] and [`super::GreenAction`] are counted
/// in bytes from the most significant end.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Word256(pub [u8; WORD_LENGTH]);

impl Word256 {
    pub const ZERO: Self = Self([0u8; WORD_LENGTH]);

    pub fn from_hex(value: &str) -> Option<Self> {
        let bytes = from_hex_formatted(value)?;
        if bytes.len() != WORD_LENGTH {
            return None;
        }
        let mut out = [0u8; WORD_LENGTH];
        out.copy_from_slice(&bytes);
        Some(Self(out))
    }

    pub(crate) fn u8_at(&self, offset: usize) -> u8 {
        self.0[offset]
    }

    pub(crate) fn u16_at(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.0[offset], self.0[offset + 1]])
    }

    pub(crate) fn u24_at(&self, offset: usize) -> u32 {
        u32::from_be_bytes([0, self.0[offset], self.0[offset + 1], self.0[offset + 2]])
    }

    pub(crate) fn u32_at(&self, offset: usize) -> u32 {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.0[offset..offset + 4]);
        u32::from_be_bytes(buf)
    }

    pub(crate) fn set_u8(&mut self, offset: usize, value: u8) {
        self.0[offset] = value;
    }

    pub(crate) fn set_u16(&mut self, offset: usize, value: u16) {
        self.0[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Writes the low 24 bits of `value`.
    pub(crate) fn set_u24(&mut self, offset: usize, value: u32) {
        self.0[offset..offset + 3].copy_from_slice(&value.to_be_bytes()[1..]);
    }

    pub(crate) fn set_u32(&mut self, offset: usize, value: u32) {
        self.0[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    /// Low 32 bits of the word.
    pub fn low_u32(&self) -> u32 {
        self.u32_at(WORD_LENGTH - 4)
    }
}

impl fmt::Display for Word256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex(&self.0))
    }
}

impl fmt::Debug for Word256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for Word256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Word256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::from_hex(&value)
            .ok_or_else(|| serde::de::Error::custom("expected a 32-byte hex string"))
    }
}

impl Write for Word256 {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&self.0);
    }
}

impl Read for Word256 {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let bytes = read_bytes(reader, WORD_LENGTH)?;
        let mut out = [0u8; WORD_LENGTH];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl FixedSize for Word256 {
    const SIZE: usize = WORD_LENGTH;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_are_big_endian() {
        let mut word = Word256::ZERO;
        word.set_u32(4, 200_000);
        word.set_u16(8, 0xABCD);
        word.set_u24(25, 0x812ABC);
        word.set_u32(28, 123);

        assert_eq!(word.u32_at(4), 200_000);
        assert_eq!(word.0[8], 0xAB);
        assert_eq!(word.u16_at(8), 0xABCD);
        assert_eq!(word.u24_at(25), 0x812ABC);
        assert_eq!(word.low_u32(), 123);
    }

    #[test]
    fn set_u24_ignores_high_byte() {
        let mut word = Word256::ZERO;
        word.set_u24(0, 0xFF12_3456);
        assert_eq!(&word.0[..4], &[0x12, 0x34, 0x56, 0x00]);
    }

    #[test]
    fn hex_parsing_requires_full_word() {
        let word = Word256([7u8; WORD_LENGTH]);
        assert_eq!(Word256::from_hex(&word.to_string()), Some(word));
        assert_eq!(Word256::from_hex("0x0102"), None);
        assert_eq!(Word256::from_hex("not hex"), None);
    }
}
