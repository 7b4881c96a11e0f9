//! Sliding-window replay protection for inbound packet ids.

use crate::core::{CryptoError, REPLAY_WINDOW_SIZE};

const WORDS: usize = REPLAY_WINDOW_SIZE / 64;

/// Anti-replay sliding window.
///
/// Bit `i` of the bitmap records whether `highest - i` has been accepted.
/// Ids more than [`REPLAY_WINDOW_SIZE`] below the highest are rejected.
#[derive(Debug, Clone)]
pub struct ReplayWindow {
    bitmap: [u64; WORDS],
    highest: u64,
    initialized: bool,
}

impl Default for ReplayWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self {
            bitmap: [0; WORDS],
            highest: 0,
            initialized: false,
        }
    }

    /// Check an id without recording it.
    ///
    /// Run before authentication so forged packets cannot advance the window.
    pub fn check(&self, id: u64) -> Result<(), CryptoError> {
        if !self.initialized || id > self.highest {
            return Ok(());
        }
        let diff = self.highest - id;
        if diff >= REPLAY_WINDOW_SIZE as u64 || self.bit(diff) {
            return Err(CryptoError::ReplayDetected);
        }
        Ok(())
    }

    /// Record an authenticated id.
    pub fn accept(&mut self, id: u64) -> Result<(), CryptoError> {
        self.check(id)?;
        if !self.initialized {
            self.initialized = true;
            self.highest = id;
        } else if id > self.highest {
            self.shift(id - self.highest);
            self.highest = id;
        }
        let diff = self.highest - id;
        self.set_bit(diff);
        Ok(())
    }

    /// Highest id accepted so far.
    pub fn highest(&self) -> Option<u64> {
        self.initialized.then_some(self.highest)
    }

    fn bit(&self, diff: u64) -> bool {
        let index = diff as usize;
        self.bitmap[index / 64] & (1 << (index % 64)) != 0
    }

    fn set_bit(&mut self, diff: u64) {
        let index = diff as usize;
        self.bitmap[index / 64] |= 1 << (index % 64);
    }

    /// Move every recorded bit `shift` positions older.
    fn shift(&mut self, shift: u64) {
        if shift >= REPLAY_WINDOW_SIZE as u64 {
            self.bitmap = [0; WORDS];
            return;
        }

        let shift_words = (shift / 64) as usize;
        let shift_bits = (shift % 64) as u32;

        if shift_words > 0 {
            for i in (shift_words..WORDS).rev() {
                self.bitmap[i] = self.bitmap[i - shift_words];
            }
            for word in self.bitmap.iter_mut().take(shift_words) {
                *word = 0;
            }
        }

        if shift_bits > 0 {
            let mut carry = 0u64;
            for word in self.bitmap.iter_mut() {
                let next_carry = *word >> (64 - shift_bits);
                *word = (*word << shift_bits) | carry;
                carry = next_carry;
            }
        }
    }
}
