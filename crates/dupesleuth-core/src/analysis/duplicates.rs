/// Exact duplicate detection over finished fingerprints.
///
/// Files are grouped by `(size, exact_key)`. The size is part of the key so
/// that a digest collision between files of different lengths could never
/// merge them, and empty files are left out entirely: every empty file is
/// trivially identical to every other and deleting them frees nothing.
use crate::model::{ChunkDigest, FileFingerprint};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// A set of files with identical content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// Size of each file in the group.
    pub size: u64,
    pub digest: ChunkDigest,
    /// Member paths, sorted.
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Bytes freed by keeping exactly one copy.
    pub fn wasted_bytes(&self) -> u64 {
        self.size * self.paths.len().saturating_sub(1) as u64
    }
}

/// Group identical files. Only groups of two or more are returned, largest
/// waste first.
pub fn find_duplicates(files: &[FileFingerprint]) -> Vec<DuplicateGroup> {
    let mut by_key: HashMap<(u64, ChunkDigest), Vec<PathBuf>> = HashMap::new();
    for file in files.iter().filter(|f| f.size > 0) {
        by_key
            .entry((file.size, file.exact_key()))
            .or_default()
            .push(file.path.clone());
    }

    let mut groups: Vec<DuplicateGroup> = by_key
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|((size, digest), mut paths)| {
            paths.sort();
            DuplicateGroup {
                size,
                digest,
                paths,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        b.wasted_bytes()
            .cmp(&a.wasted_bytes())
            .then_with(|| a.paths.cmp(&b.paths))
    });
    groups
}

/// Total bytes freed by collapsing every group to a single copy.
pub fn reclaimable_bytes(groups: &[DuplicateGroup]) -> u64 {
    groups.iter().map(DuplicateGroup::wasted_bytes).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::ContentHasher;
    use crate::minhash::MinHashSignature;

    fn fp(path: &str, content: &[u8]) -> FileFingerprint {
        FileFingerprint {
            path: PathBuf::from(path),
            size: content.len() as u64,
            whole_file_digest: Some(ContentHasher::hash(content)),
            chunk_digests: vec![ContentHasher::hash(content)],
            min_hash: MinHashSignature::empty(2),
            perceptual_hash: None,
        }
    }

    #[test]
    fn groups_identical_content() {
        let files = [
            fp("b/copy.txt", b"same bytes"),
            fp("a/orig.txt", b"same bytes"),
            fp("c/other.txt", b"different!"),
        ];
        let groups = find_duplicates(&files);
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].paths,
            [PathBuf::from("a/orig.txt"), PathBuf::from("b/copy.txt")]
        );
        assert_eq!(groups[0].wasted_bytes(), 10);
    }

    #[test]
    fn empty_files_never_group() {
        let files = [fp("a", b""), fp("b", b""), fp("c", b"")];
        assert!(find_duplicates(&files).is_empty());
    }

    #[test]
    fn chunk_list_key_is_used_without_whole_file_digest() {
        let mut a = fp("a", b"payload");
        let mut b = fp("b", b"payload");
        a.whole_file_digest = None;
        b.whole_file_digest = None;
        let groups = find_duplicates(&[a, b]);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn groups_sorted_by_waste_and_summed() {
        let big = vec![7u8; 1_000];
        let files = [
            fp("s1", b"small"),
            fp("s2", b"small"),
            fp("b1", &big),
            fp("b2", &big),
            fp("b3", &big),
        ];
        let groups = find_duplicates(&files);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].size, 1_000);
        assert_eq!(reclaimable_bytes(&groups), 2_000 + 5);
    }
}
