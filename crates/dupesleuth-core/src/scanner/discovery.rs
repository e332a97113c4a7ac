/// Directory discovery using `jwalk` — turns a root path into a stream of
/// [`ScanTarget`]s.
///
/// Only regular files are yielded. Directories are traversed but not
/// reported; symlinks are neither followed nor reported, so a link to a file
/// elsewhere in the tree can never pose as a duplicate of its target.
/// Traversal errors (typically access denied on a directory) are yielded as
/// [`ScanFailure`]s and the walk continues.
use crate::model::ScanTarget;
use crate::scanner::progress::ScanFailure;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Cancellation is polled once per this many walker entries.
const CANCEL_POLL_INTERVAL: u64 = 256;

/// Walk `root`, handing every regular file (or failure) to `visit`.
///
/// Stops early when `cancel` is set or when `visit` returns `Break`.
/// Returns the number of directory entries examined.
pub fn walk_targets<F>(root: &Path, cancel: &AtomicBool, mut visit: F) -> u64
where
    F: FnMut(Result<ScanTarget, ScanFailure>) -> ControlFlow<()>,
{
    // A single file is its own tree.
    if let Ok(meta) = std::fs::symlink_metadata(root) {
        if meta.is_file() {
            let _ = visit(Ok(ScanTarget {
                path: root.to_path_buf(),
                size: meta.len(),
                modified: meta.modified().ok(),
            }));
            return 1;
        }
    }

    let walker = jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()));

    let mut examined: u64 = 0;
    for entry_result in walker {
        examined += 1;
        if examined % CANCEL_POLL_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
            debug!("Discovery cancelled after {examined} entries");
            break;
        }

        let flow = match entry_result {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                // Stat outside jwalk's callback; this is the expensive syscall.
                match ScanTarget::from_path(&path) {
                    Ok(target) => visit(Ok(target)),
                    Err(err) => visit(Err(ScanFailure {
                        path,
                        message: err.to_string(),
                    })),
                }
            }
            Err(err) => visit(Err(ScanFailure {
                path: err.path().map(Path::to_path_buf).unwrap_or_default(),
                message: err.to_string(),
            })),
        };
        if flow.is_break() {
            break;
        }
    }
    examined
}

/// Walk `root` to completion and collect the results.
pub fn collect_targets(root: &Path) -> (Vec<ScanTarget>, Vec<ScanFailure>) {
    let never = AtomicBool::new(false);
    let mut targets = Vec::new();
    let mut failures = Vec::new();
    walk_targets(root, &never, |item| {
        match item {
            Ok(target) => targets.push(target),
            Err(failure) => failures.push(failure),
        }
        ControlFlow::Continue(())
    });
    (targets, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("top.txt"), b"hello").unwrap();
        fs::write(root.join("a/mid.bin"), vec![0u8; 300]).unwrap();
        fs::write(root.join("a/b/deep.dat"), vec![1u8; 42]).unwrap();
        fs::write(root.join("a/b/.hidden"), b"x").unwrap();
        dir
    }

    #[test]
    fn yields_only_regular_files_with_sizes() {
        let dir = tree();
        let (mut targets, failures) = collect_targets(dir.path());
        assert!(failures.is_empty());
        targets.sort_by(|a, b| a.path.cmp(&b.path));

        let names: Vec<_> = targets
            .iter()
            .map(|t| t.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, [".hidden", "deep.dat", "mid.bin", "top.txt"]);
        let deep = targets.iter().find(|t| t.path.ends_with("deep.dat")).unwrap();
        assert_eq!(deep.size, 42);
        assert!(deep.modified.is_some());
    }

    #[test]
    fn single_file_root_is_one_target() {
        let dir = tree();
        let (targets, _) = collect_targets(&dir.path().join("top.txt"));
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].size, 5);
    }

    #[test]
    fn break_stops_the_walk() {
        let dir = tree();
        let never = AtomicBool::new(false);
        let mut seen = 0;
        walk_targets(dir.path(), &never, |_| {
            seen += 1;
            ControlFlow::Break(())
        });
        assert_eq!(seen, 1);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_reported() {
        let dir = tree();
        std::os::unix::fs::symlink(dir.path().join("top.txt"), dir.path().join("link.txt"))
            .unwrap();
        let (targets, _) = collect_targets(dir.path());
        assert!(targets.iter().all(|t| !t.path.ends_with("link.txt")));
        assert_eq!(targets.len(), 4);
    }
}
