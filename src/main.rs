//! DupeSleuth — duplicate and near-duplicate file finder.
//!
//! Thin binary entry point. All logic lives in the `dupesleuth-core` crate.

use anyhow::Context;
use clap::Parser;
use dupesleuth_core::model::{format_count, format_rate, format_size, ScanSummary};
use dupesleuth_core::report::{write_csv, write_json, Report, ReportOptions};
use dupesleuth_core::scanner::{start_scan, ScanProgress};
use dupesleuth_core::ScanConfig;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Groups printed in the console summary.
const TOP_GROUPS: usize = 10;

#[derive(Debug, Parser)]
#[command(name = "dupesleuth", version, about)]
struct Args {
    /// Directory (or single file) to scan.
    root: PathBuf,

    /// JSON configuration file; command-line flags override it.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the full report as JSON.
    #[arg(long, value_name = "OUT")]
    json: Option<PathBuf>,

    /// Write duplicate groups as CSV.
    #[arg(long, value_name = "OUT")]
    csv: Option<PathBuf>,

    /// Include every per-file fingerprint in the JSON report.
    #[arg(long, requires = "json")]
    with_fingerprints: bool,

    /// Minimum MinHash similarity for near-duplicate pairs.
    #[arg(long, default_value_t = 0.5, value_name = "F")]
    similarity: f64,

    /// Maximum perceptual-hash distance for similar images.
    #[arg(long, default_value_t = dupesleuth_core::phash::DEFAULT_SIMILARITY_THRESHOLD, value_name = "N")]
    image_distance: u32,

    /// MinHash slots per file (8 bytes each).
    #[arg(long, value_name = "K")]
    minhash_slots: Option<usize>,

    /// Worker threads (default: CPU count).
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Skip the whole-file digest; exact groups then key on chunk lists.
    #[arg(long)]
    no_whole_file: bool,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn scan_config(&self) -> anyhow::Result<ScanConfig> {
        let mut config = match &self.config {
            Some(path) => ScanConfig::from_json_file(path)?,
            None => ScanConfig::default(),
        };
        if let Some(slots) = self.minhash_slots {
            config.minhash_slots = slots;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.no_whole_file {
            config.whole_file_digest = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    tracing::info!("DupeSleuth starting");

    let config = args.scan_config()?;
    let handle = start_scan(args.root.clone(), config)?;

    let summary = loop {
        match handle.progress_rx.recv() {
            Ok(ScanProgress::Discovered {
                files_found,
                bytes_found,
            }) => tracing::debug!(
                "Discovered {} files ({})",
                format_count(files_found),
                format_size(bytes_found)
            ),
            Ok(ScanProgress::Update {
                files_done,
                bytes_done,
                current_path,
                concurrency,
            }) => tracing::debug!(
                "{} files, {} (concurrency {concurrency}): {current_path}",
                format_count(files_done),
                format_size(bytes_done)
            ),
            // Already logged by the scanner.
            Ok(ScanProgress::Error { .. }) => {}
            Ok(ScanProgress::Complete { summary }) => break summary,
            Ok(ScanProgress::Cancelled) => anyhow::bail!("scan cancelled"),
            Err(_) => anyhow::bail!("scan thread exited without completing"),
        }
    };

    let fingerprints = handle.join();
    let options = ReportOptions {
        similarity_threshold: args.similarity,
        image_distance: args.image_distance,
        include_fingerprints: args.with_fingerprints,
    };
    let report = Report::build(args.root.clone(), summary, fingerprints, &options);
    print_summary(&report);

    if let Some(path) = &args.json {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_json(BufWriter::new(file), &report)?;
        tracing::info!("JSON report written to {}", path.display());
    }
    if let Some(path) = &args.csv {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_csv(BufWriter::new(file), &report.duplicate_groups)?;
        tracing::info!("CSV report written to {}", path.display());
    }

    Ok(())
}

fn print_summary(report: &Report) {
    let ScanSummary {
        files_scanned,
        bytes_scanned,
        error_count,
        duration,
        scheduler,
    } = &report.summary;

    println!(
        "Scanned {} files ({}) in {:.1?} at {}, {} errors",
        format_count(*files_scanned),
        format_size(*bytes_scanned),
        duration,
        format_rate(*bytes_scanned, *duration),
        format_count(*error_count)
    );
    println!(
        "I/O: {} reads, p50 {:.1?}, p95 {:.1?}, final concurrency {}/{}",
        format_count(scheduler.completed_ops),
        scheduler.p50_latency,
        scheduler.p95_latency,
        scheduler.current_concurrency,
        scheduler.max_concurrency
    );
    println!(
        "{} duplicate groups, {} reclaimable",
        format_count(report.duplicate_groups.len() as u64),
        format_size(report.reclaimable_bytes)
    );

    for group in report.duplicate_groups.iter().take(TOP_GROUPS) {
        println!(
            "\n  {} x {} ({} wasted)",
            group.paths.len(),
            format_size(group.size),
            format_size(group.wasted_bytes())
        );
        for path in &group.paths {
            println!("    {}", path.display());
        }
    }

    if !report.waste_by_category.is_empty() {
        println!();
        for waste in &report.waste_by_category {
            println!(
                "  {:<12} {}",
                waste.category.label(),
                format_size(waste.wasted_bytes)
            );
        }
    }

    println!(
        "\n{} near-duplicate pairs, {} similar image pairs",
        format_count(report.near_duplicates.len() as u64),
        format_count(report.similar_images.len() as u64)
    );
    for pair in report.near_duplicates.iter().take(TOP_GROUPS) {
        println!(
            "  {:>5.1}%  {}  ~  {}",
            pair.similarity * 100.0,
            pair.a.display(),
            pair.b.display()
        );
    }
    for pair in report.similar_images.iter().take(TOP_GROUPS) {
        println!(
            "  {:>2} bits  {}  ~  {}",
            pair.distance,
            pair.a.display(),
            pair.b.display()
        );
    }
}
