/// Near-duplicate and similar-image detection.
///
/// Both searches are all-pairs over the candidate set, split across the
/// rayon pool by the outer index. Pairs that are already exact duplicates
/// are skipped; they belong in a [`super::DuplicateGroup`] instead.
use crate::model::{ChunkDigest, FileFingerprint};
use crate::phash::hamming_distance;
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::path::PathBuf;

/// Two files whose MinHash signatures agree on at least the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarPair {
    pub a: PathBuf,
    pub b: PathBuf,
    /// Estimated Jaccard similarity of the chunk sets, in `[0, 1]`.
    pub similarity: f64,
}

/// Two images whose perceptual hashes are within the distance bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagePair {
    pub a: PathBuf,
    pub b: PathBuf,
    /// Hamming distance between the 64-bit hashes.
    pub distance: u32,
}

struct Candidate<'a> {
    file: &'a FileFingerprint,
    key: ChunkDigest,
}

fn candidates<'a, P>(files: &'a [FileFingerprint], keep: P) -> Vec<Candidate<'a>>
where
    P: Fn(&FileFingerprint) -> bool,
{
    files
        .iter()
        .filter(|f| keep(*f))
        .map(|file| Candidate {
            file,
            key: file.exact_key(),
        })
        .collect()
}

fn is_exact_pair(x: &Candidate<'_>, y: &Candidate<'_>) -> bool {
    x.file.size == y.file.size && x.key == y.key
}

/// Ordered so that `a < b`, which keeps output stable across runs.
fn ordered(x: &FileFingerprint, y: &FileFingerprint) -> (PathBuf, PathBuf) {
    if x.path <= y.path {
        (x.path.clone(), y.path.clone())
    } else {
        (y.path.clone(), x.path.clone())
    }
}

/// Pairs of non-empty, non-identical files with MinHash similarity at or
/// above `threshold`, most similar first.
pub fn find_near_duplicates(files: &[FileFingerprint], threshold: f64) -> Vec<SimilarPair> {
    let pool = candidates(files, |f| f.size > 0 && !f.min_hash.is_empty());
    let pool = pool.as_slice();

    let mut pairs: Vec<SimilarPair> = (0..pool.len())
        .into_par_iter()
        .flat_map_iter(move |i| {
            let x = &pool[i];
            pool[i + 1..].iter().filter_map(move |y| {
                if is_exact_pair(x, y) {
                    return None;
                }
                let similarity = x.file.min_hash.similarity(&y.file.min_hash);
                (similarity >= threshold).then(|| {
                    let (a, b) = ordered(x.file, y.file);
                    SimilarPair { a, b, similarity }
                })
            })
        })
        .collect();

    pairs.sort_by(|p, q| {
        q.similarity
            .partial_cmp(&p.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| p.a.cmp(&q.a))
            .then_with(|| p.b.cmp(&q.b))
    });
    pairs
}

/// Pairs of images whose perceptual hashes differ in at most `max_distance`
/// bits, closest first. Exact byte-for-byte copies are skipped.
pub fn find_similar_images(files: &[FileFingerprint], max_distance: u32) -> Vec<ImagePair> {
    let pool = candidates(files, |f| f.perceptual_hash.is_some());
    let pool = pool.as_slice();

    let mut pairs: Vec<ImagePair> = (0..pool.len())
        .into_par_iter()
        .flat_map_iter(move |i| {
            let x = &pool[i];
            pool[i + 1..].iter().filter_map(move |y| {
                let (Some(hx), Some(hy)) = (x.file.perceptual_hash, y.file.perceptual_hash) else {
                    return None;
                };
                if is_exact_pair(x, y) {
                    return None;
                }
                let distance = hamming_distance(hx, hy);
                (distance <= max_distance).then(|| {
                    let (a, b) = ordered(x.file, y.file);
                    ImagePair { a, b, distance }
                })
            })
        })
        .collect();

    pairs.sort_by(|p, q| {
        p.distance
            .cmp(&q.distance)
            .then_with(|| p.a.cmp(&q.a))
            .then_with(|| p.b.cmp(&q.b))
    });
    pairs
}
