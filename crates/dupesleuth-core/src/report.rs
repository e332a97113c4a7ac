/// Report assembly and export.
///
/// A [`Report`] bundles a scan summary with every analysis result. It is
/// written as pretty JSON ([`write_json`]); duplicate groups can also be
/// flattened to CSV ([`write_csv`]), one row per file.
use crate::analysis::{
    find_duplicates, find_near_duplicates, find_similar_images, reclaimable_bytes,
    waste_by_category, CategoryWaste, DuplicateGroup, ImagePair, SimilarPair,
};
use crate::error::ReportError;
use crate::model::{FileFingerprint, ScanSummary};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// Thresholds for the similarity searches.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    /// Minimum MinHash similarity for a near-duplicate pair.
    pub similarity_threshold: f64,
    /// Maximum perceptual-hash distance for a similar-image pair.
    pub image_distance: u32,
    /// Include every per-file fingerprint in the JSON output.
    pub include_fingerprints: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.5,
            image_distance: crate::phash::DEFAULT_SIMILARITY_THRESHOLD,
            include_fingerprints: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Local>,
    pub root: PathBuf,
    pub summary: ScanSummary,
    pub reclaimable_bytes: u64,
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub waste_by_category: Vec<CategoryWaste>,
    pub near_duplicates: Vec<SimilarPair>,
    pub similar_images: Vec<ImagePair>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fingerprints: Vec<FileFingerprint>,
}

impl Report {
    /// Run every analysis over `fingerprints`.
    pub fn build(
        root: PathBuf,
        summary: ScanSummary,
        fingerprints: Vec<FileFingerprint>,
        options: &ReportOptions,
    ) -> Self {
        let duplicate_groups = find_duplicates(&fingerprints);
        let near_duplicates = find_near_duplicates(&fingerprints, options.similarity_threshold);
        let similar_images = find_similar_images(&fingerprints, options.image_distance);

        Self {
            generated_at: Local::now(),
            root,
            summary,
            reclaimable_bytes: reclaimable_bytes(&duplicate_groups),
            waste_by_category: waste_by_category(&duplicate_groups),
            duplicate_groups,
            near_duplicates,
            similar_images,
            fingerprints: if options.include_fingerprints {
                fingerprints
            } else {
                Vec::new()
            },
        }
    }
}

/// Write `report` as pretty-printed JSON.
pub fn write_json<W: Write>(writer: W, report: &Report) -> Result<(), ReportError> {
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

#[derive(Serialize)]
struct CsvRow<'a> {
    group: usize,
    size: u64,
    digest: String,
    path: std::borrow::Cow<'a, str>,
}

/// Write duplicate groups as CSV: `group,size,digest,path`, one row per
/// member file.
pub fn write_csv<W: Write>(writer: W, groups: &[DuplicateGroup]) -> Result<(), ReportError> {
    let mut csv = csv::Writer::from_writer(writer);
    for (index, group) in groups.iter().enumerate() {
        let digest = group.digest.to_hex();
        for path in &group.paths {
            csv.serialize(CsvRow {
                group: index + 1,
                size: group.size,
                digest: digest.clone(),
                path: path.to_string_lossy(),
            })?;
        }
    }
    csv.flush()?;
    Ok(())
}
