//! CLI binary for seamfit.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `MeasurementProfile` / `ResizeConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use seamfit::{chart, MeasurementProfile, ResizeConfig, ResizeProgress};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "seamfit",
    version,
    about = "Resize garment sewing patterns and tile them onto printable A4 pages"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Resize a pattern and produce the printable tile archive
    Resize {
        /// Pattern file (SVG or PDF) or HTTP/HTTPS URL
        input: String,

        /// Bust measurement in cm
        #[arg(long)]
        bust: Option<f64>,

        /// Waist measurement in cm
        #[arg(long)]
        waist: Option<f64>,

        /// Hip measurement in cm
        #[arg(long)]
        hips: Option<f64>,

        /// Torso height in cm (vertical fallback reference)
        #[arg(long)]
        torso_height: Option<f64>,

        /// Garment size the pattern was drafted for (e.g. 38)
        #[arg(long)]
        size: Option<String>,

        /// File containing the raw size-estimation response text
        #[arg(long)]
        estimate_file: Option<PathBuf>,

        /// Working directory for artifacts (cleared at run start)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Print DPI for tiles and calibration mark
        #[arg(long, default_value_t = 300)]
        dpi: u32,

        /// Pages processed concurrently
        #[arg(long, default_value_t = 4)]
        concurrency: usize,

        /// Print the run record as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Render each page to a full-size PNG preview
    Preview {
        /// Pattern file (SVG or PDF) or HTTP/HTTPS URL
        input: String,

        /// Directory for the preview PNGs
        #[arg(short, long, default_value = "preview")]
        out_dir: PathBuf,
    },

    /// Show document facts without processing anything
    Inspect {
        /// Pattern file (SVG or PDF) or HTTP/HTTPS URL
        input: String,
    },
}

// ── CLI progress callback using indicatif ────────────────────────────────

/// Terminal progress: one bar, a log line per finished page. Pages
/// complete out of order in concurrent mode, so state is atomic.
struct CliProgress {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{bar:40.green/238}] {pos}/{len} pages  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl ResizeProgress for CliProgress {
    fn on_run_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
    }

    fn on_page_complete(&self, page_num: usize, total: usize, tile_count: usize) {
        self.bar
            .println(format!("  ✓ page {page_num}/{total}  {tile_count} tiles"));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar
            .println(format!("  ✗ page {page_num}/{total}  {error}"));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, _total: usize, _success: usize) {
        self.bar.finish_and_clear();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "seamfit=debug" } else { "seamfit=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Resize {
            input,
            bust,
            waist,
            hips,
            torso_height,
            size,
            estimate_file,
            out_dir,
            dpi,
            concurrency,
            json,
        } => {
            if let Some(label) = size.as_deref() {
                if chart::lookup(label).is_none() {
                    eprintln!(
                        "warning: unknown size '{label}' (known sizes: {})",
                        chart::sizes().join(", ")
                    );
                }
            }

            let estimate_text = match &estimate_file {
                Some(path) => Some(
                    std::fs::read_to_string(path)
                        .with_context(|| format!("reading estimate file {}", path.display()))?,
                ),
                None => None,
            };

            let profile = MeasurementProfile {
                bust_cm: positive(bust),
                waist_cm: positive(waist),
                hips_cm: positive(hips),
                torso_height_cm: positive(torso_height),
                original_size: size,
                estimate_text,
            };

            let progress = CliProgress::new();
            let mut builder = ResizeConfig::builder()
                .print_dpi(dpi)
                .concurrency(concurrency)
                .progress(progress);
            if let Some(dir) = out_dir {
                builder = builder.work_dir(dir);
            } else {
                // Without an explicit directory the artifacts would live
                // in a temp dir that vanishes when the process exits.
                builder = builder.work_dir("seamfit-out");
            }
            let config = builder.build()?;

            let output = seamfit::resize(&input, &profile, &config)
                .await
                .context("resize run failed")?;

            if json {
                let record = output.to_record(&input, &profile);
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!(
                    "scale: x = {:.4}, y = {:.4}",
                    output.factors.x, output.factors.y
                );
                println!(
                    "pages: {}/{} processed, {} tiles",
                    output.stats.processed_pages,
                    output.stats.total_pages,
                    output.stats.tile_count
                );
                for page in output.pages.iter().filter(|p| !p.is_success()) {
                    println!("  skipped page {}: {}", page.page_num, page.error.as_ref().unwrap());
                }
                if let Some(archive) = &output.archive {
                    println!("archive: {}", archive.display());
                }
            }
        }

        Command::Preview { input, out_dir } => {
            let config = ResizeConfig::default();
            let paths = seamfit::preview(&input, &out_dir, &config)
                .await
                .context("preview failed")?;
            for path in paths {
                println!("{}", path.display());
            }
        }

        Command::Inspect { input } => {
            let info = seamfit::inspect(&input).await.context("inspect failed")?;
            println!("kind: {}", info.kind);
            println!("pages: {}", info.page_count);
        }
    }

    Ok(())
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}
