/// Direct (unbuffered) byte source.
///
/// Every read is widened to sector boundaries and lands in a
/// sector-aligned staging buffer; the requested window is then copied out.
/// Sequential scans request `read_size`-aligned offsets, so in practice the
/// widening only matters for the final, short read.
use super::{read_full, AccessMode, ByteSource};
use crate::platform::{open_direct, SECTOR_ALIGN};
use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use std::path::Path;

/// Heap buffer whose usable window starts on a `SECTOR_ALIGN` boundary.
#[derive(Debug, Default)]
struct AlignedBuffer {
    storage: Vec<u8>,
    start: usize,
    len: usize,
}

impl AlignedBuffer {
    /// Make room for `len` aligned bytes, reallocating only when growing.
    fn ensure(&mut self, len: usize) -> io::Result<()> {
        if len <= self.len {
            return Ok(());
        }
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(len + SECTOR_ALIGN)
            .map_err(|_| io::Error::new(io::ErrorKind::OutOfMemory, "direct read buffer"))?;
        storage.resize(len + SECTOR_ALIGN, 0);
        let start = storage.as_ptr().align_offset(SECTOR_ALIGN);
        if start >= SECTOR_ALIGN {
            return Err(io::Error::other("cannot align direct read buffer"));
        }
        self.storage = storage;
        self.start = start;
        self.len = len;
        Ok(())
    }

    fn window(&mut self, len: usize) -> &mut [u8] {
        &mut self.storage[self.start..self.start + len]
    }
}

/// Sector-aligned reader that bypasses the OS cache where supported.
#[derive(Debug)]
pub struct DirectSource {
    file: File,
    staging: AlignedBuffer,
}

impl DirectSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: open_direct(path)?,
            staging: AlignedBuffer::default(),
        })
    }
}

#[inline]
fn align_up(n: usize) -> usize {
    n.div_ceil(SECTOR_ALIGN) * SECTOR_ALIGN
}

impl ByteSource for DirectSource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let aligned_offset = offset - offset % SECTOR_ALIGN as u64;
        let lead = (offset - aligned_offset) as usize;
        let span = align_up(lead + buf.len());

        self.staging.ensure(span)?;
        self.file.seek(SeekFrom::Start(aligned_offset))?;
        let window = self.staging.window(span);
        let n = read_full(&mut self.file, window)?;

        let available = n.saturating_sub(lead).min(buf.len());
        buf[..available].copy_from_slice(&window[lead..lead + available]);
        Ok(available)
    }

    fn mode(&self) -> AccessMode {
        AccessMode::Direct
    }
}
