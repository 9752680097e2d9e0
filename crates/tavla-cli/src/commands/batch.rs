//! Batch processing command for multiple PDFs.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, warn};

use tavla_core::{DocumentPipeline, DocumentResult, LopdfSource, NoOcr};

use super::process::{write_outputs, OutputFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    document: Option<DocumentResult>,
    error: Option<String>,
    elapsed_ms: u64,
}

pub fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching PDF files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let backend = NoOcr;
    let pipeline = DocumentPipeline::new(&backend, config.clone());
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let outcome = LopdfSource::open(&path)
            .map_err(anyhow::Error::from)
            .and_then(|source| pipeline.process(&source).map_err(anyhow::Error::from));
        let elapsed_ms = file_start.elapsed().as_millis() as u64;

        match outcome {
            Ok(document) => {
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("tables");
                write_outputs(
                    &document,
                    stem,
                    args.format,
                    args.output_dir.as_deref(),
                    &config,
                )?;
                results.push(FileResult {
                    path,
                    document: Some(document),
                    error: None,
                    elapsed_ms,
                });
            }
            Err(e) if args.continue_on_error => {
                warn!("Failed to process {}: {}", path.display(), e);
                results.push(FileResult {
                    path,
                    document: None,
                    error: Some(e.to_string()),
                    elapsed_ms,
                });
            }
            Err(e) => {
                error!("Failed to process {}: {}", path.display(), e);
                anyhow::bail!("Processing failed: {}", e);
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));
        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let successful = results.iter().filter(|r| r.document.is_some()).count();
    let failed = results.len() - successful;

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed).red()
    );

    Ok(())
}

fn write_summary(path: &std::path::Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["file", "pages", "rows", "elapsed_ms", "error"])?;

    for result in results {
        let (pages, rows) = result
            .document
            .as_ref()
            .map(|d| (d.pages.len(), d.total_rows()))
            .unwrap_or((0, 0));
        writer.write_record([
            result.path.display().to_string(),
            pages.to_string(),
            rows.to_string(),
            result.elapsed_ms.to_string(),
            result.error.clone().unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
