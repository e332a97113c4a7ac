/// Content-defined chunking (CDC).
///
/// Splits a byte stream into variable-length chunks whose boundaries are
/// chosen by a rolling hash over local content. Inserting or deleting bytes
/// only disturbs the boundaries near the edit, so near-identical files share
/// most of their chunks — the property the MinHash engine relies on.
///
/// A boundary is declared after a byte when any of these hold:
/// - the chunk has reached `min_size` **and** `rolling_hash & mask == 0`
///   (normalised cut),
/// - the chunk has reached `max_size` (forced cut),
/// - the stream ends ([`ContentChunker::finish`]).
///
/// The rolling window is cleared at every boundary, so a chunk's cut point
/// depends only on bytes inside that chunk.
pub mod rolling;

use crate::error::ConfigError;
use rolling::{RollingHash, MAX_WINDOW};
use serde::{Deserialize, Serialize};

/// Default rolling window, in bytes.
pub const DEFAULT_WINDOW_SIZE: usize = 48;

/// Default minimum chunk size (128 KiB).
pub const DEFAULT_MIN_CHUNK: usize = 128 * 1024;

/// Default maximum chunk size (4 MiB).
pub const DEFAULT_MAX_CHUNK: usize = 4 * 1024 * 1024;

/// Default cut mask: 17 low bits. After the 128 KiB minimum a cut fires with
/// probability 2^-17 per byte, giving an expected chunk of ~256 KiB.
pub const DEFAULT_CUT_MASK: u64 = (1 << 17) - 1;

/// Tunable chunker parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub window_size: usize,
    pub cut_mask: u64,
    pub min_size: usize,
    pub max_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            cut_mask: DEFAULT_CUT_MASK,
            min_size: DEFAULT_MIN_CHUNK,
            max_size: DEFAULT_MAX_CHUNK,
        }
    }
}

impl ChunkerConfig {
    /// Build a config whose mask targets roughly `avg_size` bytes per chunk.
    ///
    /// The mask gets `log2(avg_size - min_size)` low bits set (at least one).
    pub fn with_average(min_size: usize, avg_size: usize, max_size: usize) -> Self {
        let spread = avg_size.saturating_sub(min_size).max(2) as u64;
        let bits = 63 - spread.leading_zeros();
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            cut_mask: (1u64 << bits.max(1)) - 1,
            min_size,
            max_size,
        }
    }

    /// Reject configurations the chunker cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 || self.window_size > MAX_WINDOW {
            return Err(ConfigError::Invalid(format!(
                "chunker window_size must be in 1..={MAX_WINDOW}, got {}",
                self.window_size
            )));
        }
        if self.min_size == 0 || self.min_size > self.max_size {
            return Err(ConfigError::Invalid(format!(
                "chunker sizes must satisfy 0 < min_size <= max_size, got {}..{}",
                self.min_size, self.max_size
            )));
        }
        if self.cut_mask == 0 {
            return Err(ConfigError::Invalid(
                "chunker cut_mask must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// A contiguous span of the stream. Only lives for the callback invocation;
/// the caller keeps whatever digest it derives from the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Offset of the first byte within the logical stream.
    pub offset: u64,
    /// Length in bytes.
    pub length: usize,
    /// Rolling hash value at the cut point.
    pub rolling_hash: u64,
}

impl Chunk {
    /// Offset one past the last byte.
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.length as u64
    }
}

/// Streaming content-defined chunker. One instance processes one logical
/// stream end-to-end; [`finish`](Self::finish) readies it for the next one.
#[derive(Debug, Clone)]
pub struct ContentChunker {
    config: ChunkerConfig,
    rolling: RollingHash,
    chunk_start: u64,
    chunk_len: usize,
    /// Chunk length below which bytes cannot affect a cut and are not hashed.
    skip_len: usize,
}

impl ContentChunker {
    /// Create a chunker, validating the configuration.
    pub fn new(config: ChunkerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            rolling: RollingHash::new(config.window_size),
            chunk_start: 0,
            chunk_len: 0,
            skip_len: config.min_size.saturating_sub(config.window_size),
        })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Bytes consumed since the last reset.
    pub fn stream_position(&self) -> u64 {
        self.chunk_start + self.chunk_len as u64
    }

    /// Clear all rolling and positional state.
    pub fn reset(&mut self) {
        self.rolling.reset();
        self.chunk_start = 0;
        self.chunk_len = 0;
    }

    /// Consume `data` and invoke `on_chunk` for every boundary it contains,
    /// in stream order. May be called any number of times per stream; the
    /// chunk sequence does not depend on how the stream is split.
    pub fn process_data<F: FnMut(Chunk)>(&mut self, data: &[u8], mut on_chunk: F) {
        let ChunkerConfig {
            cut_mask,
            min_size,
            max_size,
            ..
        } = self.config;

        let mut i = 0;
        while i < data.len() {
            // The hash at any eligible cut covers only the last `window` bytes,
            // so everything before `min - window` is counted without hashing.
            if self.chunk_len < self.skip_len {
                let n = (self.skip_len - self.chunk_len).min(data.len() - i);
                self.chunk_len += n;
                i += n;
                continue;
            }

            let hash = self.rolling.roll(data[i]);
            self.chunk_len += 1;
            i += 1;

            let at_max = self.chunk_len >= max_size;
            if at_max || (self.chunk_len >= min_size && hash & cut_mask == 0) {
                self.emit(hash, &mut on_chunk);
            }
        }
    }

    /// Flush the trailing chunk (if any) at end of stream, then reset.
    ///
    /// The tail is emitted even when shorter than `min_size`, so the emitted
    /// chunks always cover the whole stream.
    pub fn finish<F: FnMut(Chunk)>(&mut self, mut on_chunk: F) {
        if self.chunk_len > 0 {
            let hash = self.rolling.value();
            self.emit(hash, &mut on_chunk);
        }
        self.reset();
    }

    fn emit<F: FnMut(Chunk)>(&mut self, rolling_hash: u64, on_chunk: &mut F) {
        let chunk = Chunk {
            offset: self.chunk_start,
            length: self.chunk_len,
            rolling_hash,
        };
        self.chunk_start = chunk.end();
        self.chunk_len = 0;
        self.rolling.reset();
        on_chunk(chunk);
    }
}

/// Convenience: chunk a complete in-memory buffer.
pub fn chunk_all(config: ChunkerConfig, data: &[u8]) -> Result<Vec<Chunk>, ConfigError> {
    let mut chunker = ContentChunker::new(config)?;
    let mut chunks = Vec::new();
    chunker.process_data(data, |c| chunks.push(c));
    chunker.finish(|c| chunks.push(c));
    Ok(chunks)
}
