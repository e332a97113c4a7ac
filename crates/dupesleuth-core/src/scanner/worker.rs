/// Per-worker fingerprinting pipeline.
///
/// Each worker thread owns one [`FilePipeline`]: a chunker, two hashers
/// (per-chunk and whole-file), a MinHash engine, and a read buffer. A file
/// is read once, front to back, through the I/O scheduler; every read is fed
/// to the chunker and whole-file hasher in stream order. Chunk bytes are
/// hashed as they stream past, so a chunk that straddles two reads never
/// needs to be reassembled.
use crate::analysis::is_image_path;
use crate::chunker::ContentChunker;
use crate::config::ScanConfig;
use crate::error::{ScanError, SchedulerError};
use crate::hasher::ContentHasher;
use crate::io::{open_source, AccessPolicy};
use crate::minhash::MinHasher;
use crate::model::{ChunkDigest, FileFingerprint, ScanTarget};
use crate::phash::phash_encoded;
use crate::scanner::ScanContext;
use crate::scheduler::IoScheduler;
use crossbeam_channel::Receiver;
use tracing::{trace, warn};

/// Per-chunk state: the running chunk hash and what finished chunks produce.
#[derive(Debug)]
struct ChunkSink {
    hasher: ContentHasher,
    min_hasher: MinHasher,
    digests: Vec<ChunkDigest>,
}

impl ChunkSink {
    /// Close the current chunk.
    fn seal(&mut self) {
        let digest = self.hasher.digest();
        self.min_hasher.add_digest(&digest);
        self.digests.push(digest);
        self.hasher.init();
    }
}

/// Reusable single-file pipeline. Not shared between threads.
#[derive(Debug)]
pub struct FilePipeline {
    chunker: ContentChunker,
    sink: ChunkSink,
    file_hasher: Option<ContentHasher>,
    buffer: Vec<u8>,
    read_size: usize,
    image_bytes: Vec<u8>,
    perceptual_images: bool,
    max_image_bytes: u64,
    access_policy: AccessPolicy,
    direct_io_threshold: u64,
}

impl FilePipeline {
    pub fn new(config: &ScanConfig) -> Result<Self, ScanError> {
        Ok(Self {
            chunker: ContentChunker::new(config.chunker)?,
            sink: ChunkSink {
                hasher: ContentHasher::new(),
                min_hasher: MinHasher::new(config.minhash_slots),
                digests: Vec::new(),
            },
            file_hasher: config.whole_file_digest.then(ContentHasher::new),
            buffer: Vec::new(),
            read_size: config.scheduler.read_size,
            image_bytes: Vec::new(),
            perceptual_images: config.perceptual_images,
            max_image_bytes: config.max_image_bytes,
            access_policy: config.access_policy,
            direct_io_threshold: config.direct_io_threshold,
        })
    }

    /// Allocate the read buffer on first use. Failure fails the current
    /// target only; the next target tries again.
    fn ensure_buffer(&mut self) -> Result<(), ScanError> {
        if self.buffer.len() == self.read_size {
            return Ok(());
        }
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(self.read_size)
            .map_err(|_| ScanError::BufferAlloc(self.read_size))?;
        buffer.resize(self.read_size, 0);
        self.buffer = buffer;
        Ok(())
    }

    fn reset(&mut self) {
        self.chunker.reset();
        self.sink.hasher.init();
        self.sink.min_hasher.reset();
        self.sink.digests.clear();
        if let Some(hasher) = self.file_hasher.as_mut() {
            hasher.init();
        }
        self.image_bytes.clear();
    }

    /// Read `target` end to end and produce its fingerprint.
    ///
    /// Returns `ScanError::Cancelled` when the scheduler is stopped part-way.
    /// A file that ends before `target.size` is `ScanError::Truncated`; one
    /// that grew is fingerprinted at its new length.
    pub fn fingerprint(
        &mut self,
        target: &ScanTarget,
        scheduler: &IoScheduler,
    ) -> Result<FileFingerprint, ScanError> {
        self.reset();
        self.ensure_buffer()?;

        let mut source = open_source(
            &target.path,
            target.size,
            self.access_policy,
            self.direct_io_threshold,
        )
        .map_err(|source| ScanError::Open {
            path: target.path.clone(),
            source,
        })?;

        let want_image = self.perceptual_images
            && target.size <= self.max_image_bytes
            && is_image_path(&target.path);
        let mut offset: u64 = 0;

        loop {
            let buffer = &mut self.buffer;
            let n = scheduler
                .execute(|| source.read_at(offset, buffer))
                .map_err(|err| match err {
                    SchedulerError::Stopped => ScanError::Cancelled,
                    SchedulerError::Io(source) => ScanError::Read {
                        path: target.path.clone(),
                        offset,
                        source,
                    },
                })?;
            if n == 0 {
                break;
            }

            let data = &self.buffer[..n];
            absorb(&mut self.chunker, &mut self.sink, data, offset);
            if let Some(hasher) = self.file_hasher.as_mut() {
                hasher.update(data);
            }
            if want_image && (self.image_bytes.len() + n) as u64 <= self.max_image_bytes {
                self.image_bytes.extend_from_slice(data);
            }
            offset += n as u64;
        }

        if offset < target.size {
            return Err(ScanError::Truncated {
                path: target.path.clone(),
                expected: target.size,
                actual: offset,
            });
        }

        let sink = &mut self.sink;
        self.chunker.finish(|_| sink.seal());
        debug_assert_eq!(self.chunker.stream_position(), 0);

        let perceptual_hash = if want_image && self.image_bytes.len() as u64 == offset {
            match phash_encoded(&self.image_bytes) {
                Ok(hash) => Some(hash),
                Err(err) => {
                    warn!("No perceptual hash for {}: {err}", target.path.display());
                    None
                }
            }
        } else {
            None
        };

        trace!(
            "{}: {} bytes, {} chunks",
            target.path.display(),
            offset,
            self.sink.digests.len()
        );

        Ok(FileFingerprint {
            path: target.path.clone(),
            size: offset,
            whole_file_digest: self.file_hasher.as_ref().map(ContentHasher::digest),
            chunk_digests: std::mem::take(&mut self.sink.digests),
            min_hash: self.sink.min_hasher.signature(),
            perceptual_hash,
        })
    }
}

/// Feed one read (starting at stream offset `base`) through the chunker,
/// hashing chunk bytes as boundaries are found.
fn absorb(chunker: &mut ContentChunker, sink: &mut ChunkSink, data: &[u8], base: u64) {
    let mut seg_start = 0usize;
    chunker.process_data(data, |chunk| {
        let end = (chunk.end() - base) as usize;
        sink.hasher.update(&data[seg_start..end]);
        sink.seal();
        seg_start = end;
    });
    sink.hasher.update(&data[seg_start..]);
}

/// Worker thread body: pull targets until the queue closes or the scan is
/// cancelled.
pub(crate) fn run_worker(
    targets: Receiver<ScanTarget>,
    mut pipeline: FilePipeline,
    scheduler: &IoScheduler,
    ctx: &ScanContext,
) {
    for target in targets.iter() {
        if ctx.is_cancelled() {
            break;
        }
        match pipeline.fingerprint(&target, scheduler) {
            Ok(fingerprint) => ctx.record_result(fingerprint, scheduler),
            Err(ScanError::Cancelled) => break,
            Err(err) => ctx.record_failure(&target.path, &err.to_string()),
        }
    }
    // Dropping `targets` here lets the walker notice once every worker is gone.
}
