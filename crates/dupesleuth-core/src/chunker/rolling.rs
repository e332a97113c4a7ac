/// Buzhash — a table-driven sliding-window rolling hash.
///
/// Each byte maps to a pseudo-random 64-bit value. Advancing the window
/// rotates the hash by one bit and XORs in the incoming byte's value; once
/// the window is full, the outgoing byte's value (rotated by the window
/// length) is XORed back out. The hash therefore depends only on the last
/// `window` bytes, which is what makes chunk boundaries a function of local
/// content.
use crate::mix::splitmix64;

/// Largest supported window. A 64-byte window is excluded: XOR-ing all 64
/// rotations of a value collapses to all-zeros or all-ones, so constant runs
/// would always (or never) hit the cut mask.
pub const MAX_WINDOW: usize = 63;

const TABLE_SEED: u64 = 0x6275_7A68_6173_6821;

/// Per-byte random values, generated at compile time.
static TABLE: [u64; 256] = build_table();

const fn build_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = splitmix64(TABLE_SEED.wrapping_add(i as u64));
        i += 1;
    }
    table
}

/// Sliding-window buzhash state.
#[derive(Debug, Clone)]
pub struct RollingHash {
    window: [u8; MAX_WINDOW],
    size: usize,
    /// Ring position of the oldest byte once the window is full.
    pos: usize,
    filled: usize,
    hash: u64,
}

impl RollingHash {
    /// Create a rolling hash over `size` bytes (clamped to `1..=MAX_WINDOW`).
    pub fn new(size: usize) -> Self {
        Self {
            window: [0; MAX_WINDOW],
            size: size.clamp(1, MAX_WINDOW),
            pos: 0,
            filled: 0,
            hash: 0,
        }
    }

    /// Window length in bytes.
    pub fn window_size(&self) -> usize {
        self.size
    }

    /// Current hash value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.hash
    }

    /// Clear the window.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.filled = 0;
        self.hash = 0;
    }

    /// Push one byte into the window and return the updated hash.
    #[inline]
    pub fn roll(&mut self, byte: u8) -> u64 {
        if self.filled < self.size {
            self.window[self.filled] = byte;
            self.filled += 1;
            self.hash = self.hash.rotate_left(1) ^ TABLE[byte as usize];
        } else {
            let outgoing = self.window[self.pos];
            self.window[self.pos] = byte;
            self.pos += 1;
            if self.pos == self.size {
                self.pos = 0;
            }
            self.hash = self.hash.rotate_left(1)
                ^ TABLE[outgoing as usize].rotate_left(self.size as u32)
                ^ TABLE[byte as usize];
        }
        self.hash
    }
}
