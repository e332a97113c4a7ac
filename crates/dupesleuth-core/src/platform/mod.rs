/// Platform-specific file opening for direct (unbuffered) reads.
///
/// On Windows the file is opened with `FILE_FLAG_NO_BUFFERING` so reads
/// bypass the system cache; this requires sector-aligned offsets, lengths,
/// and buffer addresses, which [`crate::io::DirectSource`] guarantees.
/// Elsewhere the file is opened normally and only the aligned access
/// pattern is kept.
use std::fs::File;
use std::io;
use std::path::Path;

/// Alignment for direct reads: offsets, lengths, and buffer addresses.
/// 4 KiB covers both 512e and 4Kn sector sizes.
pub const SECTOR_ALIGN: usize = 4096;

/// Open `path` read-only for direct access.
#[cfg(windows)]
pub fn open_direct(path: &Path) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;
    use windows::Win32::Storage::FileSystem::{FILE_FLAG_NO_BUFFERING, FILE_FLAG_SEQUENTIAL_SCAN};

    std::fs::OpenOptions::new()
        .read(true)
        .custom_flags(FILE_FLAG_NO_BUFFERING.0 | FILE_FLAG_SEQUENTIAL_SCAN.0)
        .open(path)
}

/// Open `path` read-only for direct access.
#[cfg(not(windows))]
pub fn open_direct(path: &Path) -> io::Result<File> {
    File::open(path)
}
