//! Process command - extract tables from a single PDF.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use tavla_core::{
    exporter_for, DocumentPipeline, DocumentResult, Exporter, LopdfSource, NoOcr, TavlaConfig,
};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output directory (default: print to stdout)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Reverse column order for right-to-left presentation
    #[arg(long)]
    rtl: bool,

    /// Show per-page extraction methods
    #[arg(long)]
    show_methods: bool,

    /// Dump the raw text layer and exit without extracting tables
    #[arg(long)]
    dump_text: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Comma-separated values with a UTF-8 BOM
    Csv,
    /// JSON array of row arrays
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

pub fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = super::load_config(config_path)?;
    if args.rtl {
        config.export.rtl = true;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.set_message("Loading PDF...");

    let source = LopdfSource::open(&args.input)?;
    debug!("PDF has {} pages", tavla_core::PageSource::page_count(&source));

    if args.dump_text {
        pb.finish_and_clear();
        println!("{}", source.full_text()?);
        return Ok(());
    }

    pb.set_message("Extracting tables...");
    let backend = NoOcr;
    let pipeline = DocumentPipeline::new(&backend, config.clone());
    let document = pipeline.process(&source)?;

    pb.finish_with_message("Done");

    let stem = args
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("tables");
    write_outputs(&document, stem, args.format, args.output_dir.as_deref(), &config)?;

    println!(
        "{} {} pages, {} rows in {:?}",
        style("✓").green(),
        document.pages.len(),
        document.total_rows(),
        start.elapsed()
    );

    if args.show_methods {
        println!();
        for (method, count) in document.method_counts() {
            println!("  {} {} page(s)", style(method).cyan(), count);
        }
    }

    Ok(())
}

/// Export every non-empty table; files go under the output directory,
/// otherwise contents print to stdout.
pub fn write_outputs(
    document: &DocumentResult,
    stem: &str,
    format: OutputFormat,
    output_dir: Option<&std::path::Path>,
    config: &TavlaConfig,
) -> anyhow::Result<()> {
    let exporter = exporter_for(format.as_str())?;

    for (page, table) in document.tables() {
        let exported = exporter.export(
            table,
            &page_stem(stem, page),
            &config.export,
        )?;

        match output_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                let path = dir.join(&exported.file_name);
                fs::write(&path, &exported.bytes)?;
                println!(
                    "{} Output written to {}",
                    style("✓").green(),
                    path.display()
                );
            }
            None => {
                println!("{}", String::from_utf8_lossy(&exported.bytes));
            }
        }
    }

    Ok(())
}

/// `<stem>-page-<n>`, the base name for one page's export.
pub fn page_stem(stem: &str, page: u32) -> String {
    format!("{}-page-{}", stem, page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_page_stem_naming() {
        assert_eq!(page_stem("statement", 3), "statement-page-3");
    }

    #[test]
    fn test_format_tags() {
        assert_eq!(OutputFormat::Csv.as_str(), "csv");
        assert_eq!(OutputFormat::Json.as_str(), "json");
    }
}
