//! CLI binary for fileflip.
//!
//! A thin shim over the library crate: loads the input, runs
//! select → convert → download → clear on a `ConversionPipeline`, and
//! reports the outcome.

use anyhow::{bail, Context, Result};
use clap::Parser;
use fileflip::{
    load_source, ConversionKind, ConversionPipeline, PipelineConfig, PipelineObserver, Status,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Spinner shown while a conversion is in flight.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::hidden();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        Arc::new(Self { bar })
    }
}

impl PipelineObserver for CliObserver {
    fn on_conversion_start(&self, name: &str, kind: ConversionKind) {
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.set_prefix("Converting");
        self.bar.set_message(format!("{name} ({kind})"));
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_conversion_complete(&self, name: &str, _kind: ConversionKind, output_len: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}  {}",
            green("✔"),
            bold(name),
            dim(&format!("{output_len} bytes"))
        );
    }

    fn on_conversion_error(&self, name: &str, _kind: ConversionKind, error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}  {}", red("✘"), bold(name), red(error));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # PDF → DOCX next to the input
  fileflip --kind pdf-to-docx report.pdf

  # Text/DOCX → PDF into another directory
  fileflip --kind docx-to-pdf notes.txt -o out/

  # Images
  fileflip --kind png-to-jpg --jpeg-quality 90 diagram.png
  fileflip --kind jpg-to-png https://example.com/photo.jpg

  # Delegate document kinds to a conversion service
  fileflip --kind pdf-to-docx --remote http://localhost:5000/convert report.pdf

  # Machine-readable report
  fileflip --kind pdf-to-docx --json report.pdf

KINDS:
  pdf-to-docx   .pdf           → .docx  (placeholder text per page)
  docx-to-pdf   .docx, .txt    → .pdf   (input read as plain text)
  jpg-to-png    .jpg, .jpeg    → .png
  png-to-jpg    .png           → .jpg
"#;

/// Convert a file between PDF/DOCX and JPG/PNG.
#[derive(Parser, Debug)]
#[command(
    name = "fileflip",
    version,
    about = "Convert a file between PDF/DOCX and JPG/PNG",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path or HTTP/HTTPS URL.
    input: String,

    /// Conversion kind: pdf-to-docx, docx-to-pdf, jpg-to-png, png-to-jpg.
    #[arg(short, long, env = "FILEFLIP_KIND")]
    kind: ConversionKind,

    /// Directory to write the converted file into. Default: current directory.
    #[arg(short, long, env = "FILEFLIP_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Remote conversion service URL for document kinds.
    #[arg(long, env = "FILEFLIP_REMOTE")]
    remote: Option<String>,

    /// Remote request timeout in seconds.
    #[arg(long, env = "FILEFLIP_REMOTE_TIMEOUT", default_value_t = 60)]
    remote_timeout: u64,

    /// Retries after a transient remote failure.
    #[arg(long, env = "FILEFLIP_REMOTE_RETRIES", default_value_t = 0)]
    remote_retries: u32,

    /// JPEG quality (1–100).
    #[arg(long, env = "FILEFLIP_JPEG_QUALITY", default_value_t = 95,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "FILEFLIP_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print a JSON report instead of human-readable output.
    #[arg(long, env = "FILEFLIP_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FILEFLIP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FILEFLIP_QUIET")]
    quiet: bool,
}

#[derive(Serialize)]
struct Report {
    input: String,
    kind: ConversionKind,
    status: Status,
    error: Option<String>,
    output: Option<PathBuf>,
    mime_type: Option<String>,
    bytes: Option<usize>,
    duration_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli, show_progress)?;
    let pipeline = ConversionPipeline::new(config).context("Failed to build pipeline")?;

    // ── Load + select ────────────────────────────────────────────────────
    let start = Instant::now();
    let source = load_source(&cli.input, cli.download_timeout)
        .await
        .context("Failed to load input")?;
    let source_name = source.name.clone();

    pipeline.select_file(source.bytes, source.name, cli.kind);

    // ── Convert ──────────────────────────────────────────────────────────
    let status = pipeline.convert().await;
    let snapshot = pipeline.snapshot();
    let error = snapshot.as_ref().and_then(|s| s.error.clone());

    // ── Download ─────────────────────────────────────────────────────────
    let mut report = Report {
        input: cli.input.clone(),
        kind: cli.kind,
        status,
        error,
        output: None,
        mime_type: None,
        bytes: None,
        duration_ms: 0,
    };

    if let Some(artifact) = pipeline.download() {
        let dir = cli.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        let path = artifact.save_in(&dir).context("Failed to save output")?;
        report.output = Some(path);
        report.mime_type = Some(artifact.mime_type.clone());
        report.bytes = Some(artifact.len());
    }

    pipeline.clear();
    report.duration_ms = start.elapsed().as_millis() as u64;

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        if let Some(ref path) = report.output {
            eprintln!(
                "{}  {}  →  {}  {}",
                green("✔"),
                source_name,
                bold(&path.display().to_string()),
                dim(&format!("{}ms", report.duration_ms)),
            );
        }
    }

    if report.status != Status::Converted {
        bail!(
            "{}",
            report
                .error
                .unwrap_or_else(|| format!("conversion ended in state '{}'", report.status))
        );
    }
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, show_progress: bool) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .jpeg_quality(cli.jpeg_quality)
        .remote_timeout_secs(cli.remote_timeout)
        .remote_max_retries(cli.remote_retries);

    if let Some(ref url) = cli.remote {
        builder = builder.remote_endpoint(url.clone());
    }
    if show_progress {
        builder = builder.observer(CliObserver::new());
    }

    builder.build().context("Invalid configuration")
}
