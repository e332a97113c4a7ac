/// MinHash signatures over a file's chunk-digest set.
///
/// Each slot holds the minimum, over all chunk hashes of a file, of one
/// derived hash function. The probability that two files agree on a slot
/// equals the Jaccard similarity of their chunk sets, so the fraction of
/// equal slots is an unbiased similarity estimate that costs O(k) per pair
/// regardless of file size.
///
/// # Slot count
///
/// `k` trades signature size for accuracy. The estimate has standard
/// deviation `sqrt(J(1-J)/k)`; with the default `k = 2` (a 16-byte
/// signature) similarity can only be 0, 0.5, or 1. Raise
/// `ScanConfig::minhash_slots` to 64–128 for reliable near-duplicate
/// thresholds at 0.5–1 KiB per file.
use crate::mix::splitmix64;
use crate::model::ChunkDigest;
use serde::Serialize;

/// Default number of signature slots (16 bytes per signature).
pub const DEFAULT_SIGNATURE_SLOTS: usize = 2;

const MULTIPLIER_SEED: u64 = 0x4D69_6E48_6173_6821;

/// A frozen MinHash signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MinHashSignature(Vec<u64>);

impl MinHashSignature {
    /// A signature of `slots` slots with no hashes folded in.
    pub fn empty(slots: usize) -> Self {
        Self(vec![u64::MAX; slots])
    }

    pub fn from_slots(slots: Vec<u64>) -> Self {
        Self(slots)
    }

    pub fn slots(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fixed-size exchange format: `8 * k` little-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|slot| slot.to_le_bytes()).collect()
    }

    /// Parse the exchange format. Trailing bytes that do not fill a slot
    /// are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let slots = bytes
            .chunks_exact(8)
            .map(|word| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(word);
                u64::from_le_bytes(buf)
            })
            .collect();
        Self(slots)
    }

    /// Estimated Jaccard similarity with `other`.
    pub fn similarity(&self, other: &Self) -> f64 {
        calculate_similarity(&self.0, &other.0)
    }
}

/// Fraction of positions at which `a` and `b` agree.
///
/// Symmetric; `1.0` for identical signatures (including two empty ones);
/// `0.0` when the signatures have different slot counts.
pub fn calculate_similarity(a: &[u64], b: &[u64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    if a.is_empty() {
        return 1.0;
    }
    let equal = a.iter().zip(b).filter(|(x, y)| x == y).count();
    equal as f64 / a.len() as f64
}

/// Incremental MinHash builder. Slots only ever decrease.
#[derive(Debug, Clone)]
pub struct MinHasher {
    slots: Vec<u64>,
    multipliers: Vec<u64>,
}

impl MinHasher {
    /// A builder with `slots` hash families (at least one).
    pub fn new(slots: usize) -> Self {
        let k = slots.max(1);
        let multipliers = (0..k as u64)
            .map(|i| splitmix64(MULTIPLIER_SEED.wrapping_add(i)) | 1)
            .collect();
        Self {
            slots: vec![u64::MAX; k],
            multipliers,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Set every slot to `u64::MAX`.
    pub fn reset(&mut self) {
        self.slots.fill(u64::MAX);
    }

    /// Fold one chunk hash into every slot.
    #[inline]
    pub fn add_chunk_hash(&mut self, value: u64) {
        for (slot, &mult) in self.slots.iter_mut().zip(&self.multipliers) {
            let derived = derive(value, mult);
            if derived < *slot {
                *slot = derived;
            }
        }
    }

    pub fn add_chunk_hashes(&mut self, values: &[u64]) {
        for &value in values {
            self.add_chunk_hash(value);
        }
    }

    /// Fold a chunk digest (its first 8 bytes) into every slot.
    pub fn add_digest(&mut self, digest: &ChunkDigest) {
        self.add_chunk_hash(digest.fold());
    }

    /// Copy the slots into `out`; returns how many were written.
    pub fn write_signature(&self, out: &mut [u64]) -> usize {
        let n = out.len().min(self.slots.len());
        out[..n].copy_from_slice(&self.slots[..n]);
        n
    }

    /// Freeze the current slots into a signature.
    pub fn signature(&self) -> MinHashSignature {
        MinHashSignature(self.slots.clone())
    }
}

/// Odd-multiplier hash family followed by an xorshift; both steps are
/// bijections on `u64`, so distinct inputs never collide within a family.
#[inline]
fn derive(value: u64, multiplier: u64) -> u64 {
    let x = value.wrapping_mul(multiplier);
    x ^ (x >> 29)
}
