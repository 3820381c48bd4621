//! The bounded block hash window the reveal engine resolves actions against.
//!
//! The host pushes the hash of every block once it is produced. While block `h` executes,
//! the window holds at most `lookback` hashes ending at `h - 1`, mirroring a ledger that
//! only exposes recent block hashes. Anything older is gone and can only come back through
//! owner-supplied recovery.

use commonware_cryptography::sha256::Digest;
use std::collections::VecDeque;
use thiserror::Error as ThisError;

/// Height and timestamp of the block being executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockContext {
    pub height: u64,
    /// Seconds; compared against manager-signature deadlines.
    pub timestamp: u64,
}

impl BlockContext {
    pub fn new(height: u64, timestamp: u64) -> Self {
        Self { height, timestamp }
    }
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum WindowError {
    #[error("lookback must be non-zero")]
    ZeroLookback,
    #[error("non-contiguous block hash: expected height {expected}, got {got}")]
    NonContiguous { expected: u64, got: u64 },
}

#[derive(Clone, Debug)]
pub struct BlockHashWindow {
    lookback: u64,
    /// Height of `hashes[0]`.
    start: u64,
    hashes: VecDeque<Digest>,
}

impl BlockHashWindow {
    pub fn new(lookback: u64) -> Result<Self, WindowError> {
        if lookback == 0 {
            return Err(WindowError::ZeroLookback);
        }
        Ok(Self {
            lookback,
            start: 0,
            hashes: VecDeque::new(),
        })
    }

    pub fn lookback(&self) -> u64 {
        self.lookback
    }

    /// Records the hash of block `height`. Heights must be pushed in order without gaps;
    /// the first push may start anywhere.
    pub fn push(&mut self, height: u64, hash: Digest) -> Result<(), WindowError> {
        if !self.hashes.is_empty() {
            let expected = self.start + self.hashes.len() as u64;
            if height != expected {
                return Err(WindowError::NonContiguous {
                    expected,
                    got: height,
                });
            }
        } else {
            self.start = height;
        }
        self.hashes.push_back(hash);
        while self.hashes.len() as u64 > self.lookback {
            self.hashes.pop_front();
            self.start += 1;
        }
        Ok(())
    }

    pub fn get(&self, height: u64) -> Option<&Digest> {
        let offset = height.checked_sub(self.start)?;
        self.hashes.get(usize::try_from(offset).ok()?)
    }

    /// Most recent `(height, hash)`.
    pub fn latest(&self) -> Option<(u64, &Digest)> {
        let hash = self.hashes.back()?;
        Some((self.start + self.hashes.len() as u64 - 1, hash))
    }

    /// Oldest height still retrievable.
    pub fn oldest(&self) -> Option<u64> {
        (!self.hashes.is_empty()).then_some(self.start)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_cryptography::{sha256::Sha256, Hasher};

    fn hash(height: u64) -> Digest {
        Sha256::hash(&height.to_be_bytes())
    }

    #[test]
    fn window_drops_hashes_past_lookback() {
        let mut window = BlockHashWindow::new(3).unwrap();
        for height in 10..=14 {
            window.push(height, hash(height)).unwrap();
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.oldest(), Some(12));
        assert_eq!(window.get(11), None);
        assert_eq!(window.get(12), Some(&hash(12)));
        assert_eq!(window.get(14), Some(&hash(14)));
        assert_eq!(window.get(15), None);
        assert_eq!(window.latest(), Some((14, &hash(14))));
    }

    #[test]
    fn window_rejects_gaps() {
        let mut window = BlockHashWindow::new(256).unwrap();
        window.push(1, hash(1)).unwrap();
        assert_eq!(
            window.push(3, hash(3)),
            Err(WindowError::NonContiguous {
                expected: 2,
                got: 3
            })
        );
        assert_eq!(BlockHashWindow::new(0).err(), Some(WindowError::ZeroLookback));
    }

    #[test]
    fn empty_window_has_nothing() {
        let window = BlockHashWindow::new(4).unwrap();
        assert!(window.is_empty());
        assert_eq!(window.latest(), None);
        assert_eq!(window.oldest(), None);
        assert_eq!(window.get(0), None);
    }
}
