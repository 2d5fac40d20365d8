//! CLI binary for edgequake-md2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and writes the results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_md2pdf::pipeline::input::resolve_input;
use edgequake_md2pdf::{
    convert_files, preview_html, render_html, BatchOutput, ConversionConfig,
    ConversionProgressCallback, InputFile, MarginConfig, MarkdownDocument, ProgressCallback,
    ARCHIVE_NAME,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` tells us the batch size.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading inputs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total} document(s)…"))
        ));
    }

    fn on_item_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_item_complete(&self, completed: usize, total: usize, name: &str, pdf_len: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}",
            green("✓"),
            completed,
            total,
            name,
            dim(&format!("{:.1} KiB", pdf_len as f64 / 1024.0)),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, completed: usize, total: usize, name: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}",
            red("✗"),
            completed,
            total,
            name,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} document(s) converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents converted  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One document, written next to the current directory as report.pdf
  md2pdf report.md

  # Choose the output file
  md2pdf report.md -o build/report.pdf

  # Several documents into a directory
  md2pdf docs/*.md -o build/pdf

  # Several documents into one ZIP (converted_pdfs.zip by default)
  md2pdf docs/*.md --zip

  # Wider top and bottom margins (millimetres, 0–50)
  md2pdf --margin 15 --margin-top 30 --margin-bottom 30 report.md

  # Convert from URL
  md2pdf https://example.com/guide.md

  # Preview fragment or full print HTML on stdout
  md2pdf --preview notes.md
  md2pdf --html notes.md > notes.html

  # Machine-readable summary
  md2pdf --json docs/*.md --zip > summary.json

ENVIRONMENT VARIABLES:
  MD2PDF_OUTPUT             Output file, directory or archive path
  MD2PDF_MARGIN             Margin on every side (mm)
  MD2PDF_CONCURRENCY        Documents rendered at once
  MD2PDF_TIMEOUT            Per-document render timeout (s)
  MD2PDF_DOWNLOAD_TIMEOUT   URL download timeout (s)
  RUST_LOG                  Log filter, overrides --verbose/--quiet

BACKENDS:
  With the default `chrome` feature, PDFs are printed by a headless Chromium
  found on the system (launched once, reused for the whole run). Builds
  without it use the built-in constrained backend: standard fonts, ASCII
  text, images replaced by "[Image removed]".
"#;

/// Convert Markdown files and URLs to print-ready PDF.
#[derive(Parser, Debug)]
#[command(
    name = "md2pdf",
    version,
    about = "Convert Markdown files and URLs to print-ready PDF",
    long_about = "Convert Markdown documents (local files or URLs) to paginated A4 PDF with \
an embedded print style sheet. Several inputs are converted as one batch: a failing \
document is reported and the others are still written.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local Markdown file paths or HTTP/HTTPS URLs.
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<String>,

    /// Output file (one input), directory (several inputs) or archive (--zip).
    #[arg(short, long, env = "MD2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Package every PDF into one ZIP archive.
    #[arg(long, env = "MD2PDF_ZIP")]
    zip: bool,

    /// Margin on every side in millimetres.
    #[arg(long, env = "MD2PDF_MARGIN", default_value_t = 20)]
    margin: u32,

    /// Top margin in millimetres (overrides --margin).
    #[arg(long, env = "MD2PDF_MARGIN_TOP")]
    margin_top: Option<u32>,

    /// Right margin in millimetres (overrides --margin).
    #[arg(long, env = "MD2PDF_MARGIN_RIGHT")]
    margin_right: Option<u32>,

    /// Bottom margin in millimetres (overrides --margin).
    #[arg(long, env = "MD2PDF_MARGIN_BOTTOM")]
    margin_bottom: Option<u32>,

    /// Left margin in millimetres (overrides --margin).
    #[arg(long, env = "MD2PDF_MARGIN_LEFT")]
    margin_left: Option<u32>,

    /// Number of documents rendered at the same time.
    #[arg(short, long, env = "MD2PDF_CONCURRENCY", default_value_t = 2)]
    concurrency: usize,

    /// Per-document render timeout in seconds.
    #[arg(long, env = "MD2PDF_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "MD2PDF_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the scoped HTML preview fragment instead of converting.
    #[arg(long, env = "MD2PDF_PREVIEW", conflicts_with_all = ["html", "zip"])]
    preview: bool,

    /// Print the full print-ready HTML document instead of converting.
    #[arg(long, env = "MD2PDF_HTML", conflicts_with = "zip")]
    html: bool,

    /// Print a JSON summary (stats, per-document results) on stdout.
    #[arg(long, env = "MD2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MD2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2PDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.preview && !cli.html;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Resolve inputs ───────────────────────────────────────────────────
    let files = futures::future::try_join_all(
        cli.inputs
            .iter()
            .map(|input| resolve_input(input, config.download_timeout_secs)),
    )
    .await
    .context("Failed to read input")?;

    if cli.preview || cli.html {
        return write_html(&cli, files).await;
    }

    // Ctrl-C stops the batch between documents; finished PDFs are kept.
    let cancellation = config.cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancellation.cancel();
        }
    });

    // ── Run conversion ───────────────────────────────────────────────────
    let single = files.len() == 1;
    let output = convert_files(files, &config)
        .await
        .context("Conversion failed")?;

    let written = if cli.zip {
        let path = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(ARCHIVE_NAME));
        let archive = output
            .to_zip_archive()
            .context("Failed to build ZIP archive")?;
        write_bytes(&path, &archive).await?;
        vec![path]
    } else if single {
        let mut written = Vec::new();
        if let Some(result) = output.successes().next() {
            let path = cli
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(&result.output_name));
            write_bytes(&path, result.pdf_bytes().unwrap_or_default()).await?;
            written.push(path);
        }
        written
    } else {
        let dir = cli.output.clone().unwrap_or_else(|| PathBuf::from("."));
        let mut written = Vec::new();
        for result in output.successes() {
            let path = dir.join(&result.output_name);
            write_bytes(&path, result.pdf_bytes().unwrap_or_default()).await?;
            written.push(path);
        }
        written
    };

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        print_json(&output, &written)?;
    } else if !cli.quiet {
        if !show_progress {
            for failure in output.failures() {
                if let Some(err) = failure.error() {
                    eprintln!("{} {}", red("✗"), err);
                }
            }
        }
        for path in &written {
            eprintln!("{}  {}", green("→"), bold(&path.display().to_string()));
        }
        eprintln!(
            "{}",
            dim(&format!(
                "   {}/{} documents  {} bytes  {}ms",
                output.stats.succeeded,
                output.stats.total,
                output.stats.total_pdf_bytes,
                output.stats.total_duration_ms
            ))
        );
    }

    let failed = output.stats.total - output.stats.succeeded;
    if failed > 0 {
        anyhow::bail!(
            "{} of {} documents failed to convert",
            failed,
            output.stats.total
        );
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let margin = MarginConfig::new(
        cli.margin_top.unwrap_or(cli.margin),
        cli.margin_right.unwrap_or(cli.margin),
        cli.margin_bottom.unwrap_or(cli.margin),
        cli.margin_left.unwrap_or(cli.margin),
    );

    let mut builder = ConversionConfig::builder()
        .margin(margin)
        .concurrency(cli.concurrency)
        .render_timeout_secs(cli.timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `--html` / `--preview`: no PDF backend involved.
async fn write_html(cli: &Cli, files: Vec<InputFile>) -> Result<()> {
    if cli.output.is_some() && files.len() > 1 {
        anyhow::bail!("--output with --html/--preview takes a single input");
    }

    let mut pages = Vec::with_capacity(files.len());
    for file in files {
        let doc = MarkdownDocument::from_input(file).context("Failed to decode input")?;
        let html = if cli.preview {
            preview_html(&doc.source_text)
        } else {
            render_html(&doc.source_text)
        };
        pages.push(html);
    }

    if let Some(ref path) = cli.output {
        write_bytes(path, pages.concat().as_bytes()).await?;
        if !cli.quiet {
            eprintln!("{}  {}", green("→"), bold(&path.display().to_string()));
        }
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for html in pages {
        handle
            .write_all(html.as_bytes())
            .context("Failed to write to stdout")?;
        if !html.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }
    Ok(())
}

async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {:?}", path))
}

fn print_json(output: &BatchOutput, written: &[PathBuf]) -> Result<()> {
    let results: Vec<serde_json::Value> = output
        .results
        .iter()
        .map(|r| {
            serde_json::json!({
                "index": r.index,
                "source_name": r.source_name,
                "output_name": r.output_name,
                "success": r.is_success(),
                "pdf_bytes": r.pdf_bytes().map(<[u8]>::len),
                "error": r.error(),
                "duration_ms": r.duration_ms,
            })
        })
        .collect();

    let summary = serde_json::json!({
        "stats": output.stats,
        "results": results,
        "written": written,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
    );
    Ok(())
}
