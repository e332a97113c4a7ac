/// Property tests for the fingerprinting primitives: chunk boundaries,
/// content hashes, and MinHash signatures.
use dupesleuth_core::chunker::{chunk_all, Chunk, ChunkerConfig, ContentChunker};
use dupesleuth_core::hasher::ContentHasher;
use dupesleuth_core::minhash::{MinHashSignature, MinHasher};
use dupesleuth_core::model::ChunkDigest;
use proptest::prelude::*;
use std::collections::HashSet;

fn small_config() -> ChunkerConfig {
    ChunkerConfig {
        window_size: 48,
        cut_mask: (1 << 12) - 1,
        min_size: 2048,
        max_size: 64 * 1024,
    }
}

/// Tiny chunks so proptest-sized inputs still hit every code path.
fn tiny_config() -> ChunkerConfig {
    ChunkerConfig {
        window_size: 16,
        cut_mask: (1 << 6) - 1,
        min_size: 64,
        max_size: 512,
    }
}

fn pseudo_random(len: usize, seed: u64) -> Vec<u8> {
    let mut x = seed | 1;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            x as u8
        })
        .collect()
}

fn chunk_digests(data: &[u8], config: ChunkerConfig) -> Vec<ChunkDigest> {
    chunk_all(config, data)
        .unwrap()
        .iter()
        .map(|c| ContentHasher::hash(&data[c.offset as usize..c.end() as usize]))
        .collect()
}

#[test]
fn one_mebibyte_of_zeros_is_one_chunk() {
    let data = vec![0u8; 1024 * 1024];
    let chunks = chunk_all(ChunkerConfig::default(), &data).unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].length, data.len());
}

#[test]
fn insertion_only_disturbs_nearby_chunks() {
    let data = pseudo_random(512 * 1024, 0xC0FFEE);
    let mut inserted = data.clone();
    let at = data.len() / 2;
    inserted.splice(at..at, b"a few inserted bytes".iter().copied());

    let before = chunk_digests(&data, small_config());
    let after: HashSet<ChunkDigest> = chunk_digests(&inserted, small_config())
        .into_iter()
        .collect();
    let shared = before.iter().filter(|d| after.contains(d)).count();
    assert!(before.len() > 40);
    assert!(
        shared + 3 >= before.len(),
        "only {shared} of {} chunks survived the insertion",
        before.len()
    );
}

#[test]
fn single_byte_change_near_end_touches_only_the_tail() {
    let data = pseudo_random(512 * 1024, 0xBEEF);
    let mut edited = data.clone();
    let at = edited.len() - 64;
    edited[at] = edited[at].wrapping_add(1);

    let a = chunk_digests(&data, small_config());
    let b = chunk_digests(&edited, small_config());
    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    assert!(prefix + 2 >= a.len());

    let mut ma = MinHasher::new(128);
    let mut mb = MinHasher::new(128);
    a.iter().for_each(|d| ma.add_digest(d));
    b.iter().for_each(|d| mb.add_digest(d));
    let similarity = ma.signature().similarity(&mb.signature());
    assert!(similarity > 0.9, "similarity {similarity}");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The chunk sequence must not depend on how the stream is split.
    #[test]
    fn chunking_is_split_independent(
        data in proptest::collection::vec(any::<u8>(), 0..8192),
        splits in proptest::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        let whole = chunk_all(tiny_config(), &data).unwrap();

        let mut cuts: Vec<usize> = splits.iter().map(|i| i.index(data.len() + 1)).collect();
        cuts.push(0);
        cuts.push(data.len());
        cuts.sort_unstable();

        let mut chunker = ContentChunker::new(tiny_config()).unwrap();
        let mut pieces: Vec<Chunk> = Vec::new();
        for w in cuts.windows(2) {
            chunker.process_data(&data[w[0]..w[1]], |c| pieces.push(c));
        }
        chunker.finish(|c| pieces.push(c));

        prop_assert_eq!(whole, pieces);
    }

    /// Chunks tile the input and respect the size bounds.
    #[test]
    fn chunks_cover_input_within_bounds(data in proptest::collection::vec(any::<u8>(), 1..16384)) {
        let config = tiny_config();
        let chunks = chunk_all(config, &data).unwrap();

        let mut offset = 0u64;
        for (i, c) in chunks.iter().enumerate() {
            prop_assert_eq!(c.offset, offset);
            prop_assert!(c.length <= config.max_size);
            if i + 1 < chunks.len() {
                prop_assert!(c.length >= config.min_size);
            }
            offset = c.end();
        }
        prop_assert_eq!(offset, data.len() as u64);
    }

    /// Streaming updates equal the one-shot hash, however the input is fed.
    #[test]
    fn hashing_is_feed_independent(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
        step in 1usize..700,
    ) {
        let mut hasher = ContentHasher::new();
        for piece in data.chunks(step) {
            hasher.update(piece);
        }
        prop_assert_eq!(hasher.digest(), ContentHasher::hash(&data));
        prop_assert_eq!(hasher.bytes_hashed(), data.len() as u64);

        let mut prefix = [0u8; 12];
        prop_assert_eq!(hasher.finalize(&mut prefix), 12);
        let full = hasher.digest();
        prop_assert_eq!(&prefix[..], &full.as_bytes()[..12]);
    }

    #[test]
    fn batch_hashing_matches_single(inputs in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..256), 0..16,
    )) {
        let batch = ContentHasher::hash_batch(&inputs);
        let single: Vec<ChunkDigest> = inputs.iter().map(|i| ContentHasher::hash(i)).collect();
        prop_assert_eq!(batch, single);
    }

    /// A MinHash signature depends on the set of chunk hashes, not their order.
    #[test]
    fn minhash_ignores_order(values in proptest::collection::vec(any::<u64>(), 0..64), seed in any::<u64>()) {
        let mut shuffled = values.clone();
        // Deterministic Fisher-Yates driven by the seed.
        let mut x = seed | 1;
        for i in (1..shuffled.len()).rev() {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            shuffled.swap(i, (x % (i as u64 + 1)) as usize);
        }

        let mut a = MinHasher::new(8);
        let mut b = MinHasher::new(8);
        a.add_chunk_hashes(&values);
        b.add_chunk_hashes(&shuffled);
        prop_assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn similarity_is_bounded_and_symmetric(
        a in proptest::collection::vec(any::<u64>(), 4),
        b in proptest::collection::vec(any::<u64>(), 4),
    ) {
        let sa = MinHashSignature::from_slots(a);
        let sb = MinHashSignature::from_slots(b);
        let s = sa.similarity(&sb);
        prop_assert!((0.0..=1.0).contains(&s));
        prop_assert_eq!(s, sb.similarity(&sa));
        prop_assert_eq!(sa.similarity(&sa), 1.0);
        prop_assert_eq!(MinHashSignature::from_bytes(&sa.to_bytes()), sa);
    }
}
