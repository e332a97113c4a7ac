/// Storage access — where the bytes for one scan target come from.
///
/// [`ByteSource`] is the capability the pipeline reads through. Two
/// implementations exist:
/// - [`BufferedSource`] — plain reads through the OS page cache; best for
///   the many small files of a typical tree.
/// - [`DirectSource`] — sector-aligned reads that bypass the cache where the
///   platform allows; avoids evicting the whole cache while streaming
///   multi-gigabyte files once.
///
/// [`open_source`] picks one from the file size and an [`AccessPolicy`].
pub mod direct;

pub use direct::DirectSource;

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Default size at which `AccessPolicy::Auto` switches to direct reads.
pub const DEFAULT_DIRECT_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Caller preference for how files are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
    /// Direct for files at or above the threshold, buffered below.
    #[default]
    Auto,
    Buffered,
    Direct,
}

/// The access mode actually chosen for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Buffered,
    Direct,
}

/// Positional reads over one file.
pub trait ByteSource: Send {
    /// Read into `buf` starting at `offset`. Returns fewer bytes than
    /// requested only at end of file; `Ok(0)` means EOF.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    fn mode(&self) -> AccessMode;
}

/// Decide the access mode for a file of `size` bytes.
pub fn choose_mode(size: u64, policy: AccessPolicy, direct_threshold: u64) -> AccessMode {
    match policy {
        AccessPolicy::Buffered => AccessMode::Buffered,
        AccessPolicy::Direct => AccessMode::Direct,
        AccessPolicy::Auto if size >= direct_threshold => AccessMode::Direct,
        AccessPolicy::Auto => AccessMode::Buffered,
    }
}

/// Open `path` with the mode chosen by [`choose_mode`].
pub fn open_source(
    path: &Path,
    size: u64,
    policy: AccessPolicy,
    direct_threshold: u64,
) -> io::Result<Box<dyn ByteSource>> {
    Ok(match choose_mode(size, policy, direct_threshold) {
        AccessMode::Buffered => Box::new(BufferedSource::open(path)?),
        AccessMode::Direct => Box::new(DirectSource::open(path)?),
    })
}

/// Reads through the OS page cache.
#[derive(Debug)]
pub struct BufferedSource {
    file: File,
    position: u64,
}

impl BufferedSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: File::open(path)?,
            position: 0,
        })
    }
}

impl ByteSource for BufferedSource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if offset != self.position {
            self.file.seek(SeekFrom::Start(offset))?;
        }
        let n = read_full(&mut self.file, buf)?;
        self.position = offset + n as u64;
        Ok(n)
    }

    fn mode(&self) -> AccessMode {
        AccessMode::Buffered
    }
}

/// Fill `buf` unless EOF intervenes; retries on `Interrupted`.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
