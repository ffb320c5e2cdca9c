//! CLI binary for horizon-convert.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use horizon_convert::pipeline::input::resolve_input;
use horizon_convert::{
    convert_async, inspect, write_output, ConversionConfig, ConversionProgressCallback,
    ConversionRequest, Format, PageSeparator, PageSize, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner whose message follows the stages.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, source: Format, target: Format, input_bytes: usize) {
        self.bar.set_prefix("Converting");
        self.bar
            .set_message(format!("{source} → {target}  {}", dim(&format!("{input_bytes} bytes"))));
    }

    fn on_extracted(&self, blocks: usize) {
        self.bar.set_message(format!("{blocks} text blocks extracted, assembling…"));
    }

    fn on_conversion_complete(&self, output_bytes: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} converted  {}",
            green("✔"),
            dim(&format!("{output_bytes} bytes"))
        );
    }

    fn on_conversion_error(&self, error: &str) {
        self.bar.finish_and_clear();
        let first_line = error.lines().next().unwrap_or(error);
        eprintln!("{} {}", red("✘"), red(first_line));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # DOCX to PDF
  docconv minutes.docx --to pdf -o minutes.pdf

  # Extract the text of a PDF to stdout
  docconv report.pdf --to txt

  # PDF to DOCX with a chosen output name
  docconv report.pdf --to docx --name quarterly -o out/quarterly.docx

  # Convert from URL
  docconv https://example.com/files/report.pdf --to txt

  # Inspect a document without converting it
  docconv --inspect-only report.pdf

  # Stats as JSON
  docconv report.pdf --to txt -o report.txt --json

SUPPORTED CONVERSIONS:
  DOCX → PDF    paragraph text laid out on pages
  PDF  → TXT    text extraction in page order
  PDF  → DOCX   one paragraph per extracted text block

  Same-format requests are rejected unless --pass-through is given.

ENVIRONMENT VARIABLES:
  Every flag can also be set with DOCCONV_<FLAG>, e.g. DOCCONV_PAGE_SIZE=a4.
  RUST_LOG overrides the log filter.
"#;

/// Convert documents between PDF, DOCX and plain text.
#[derive(Parser, Debug)]
#[command(
    name = "docconv",
    version,
    about = "Convert documents between PDF, DOCX and plain text",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path or HTTP/HTTPS URL.
    input: String,

    /// Target format: pdf, txt or docx.
    #[arg(long, env = "DOCCONV_TO", required_unless_present = "inspect_only")]
    to: Option<String>,

    /// Source format, when the file name does not tell.
    #[arg(long, env = "DOCCONV_FROM")]
    from: Option<String>,

    /// Write the converted document to this file instead of stdout.
    #[arg(short, long, env = "DOCCONV_OUTPUT")]
    output: Option<PathBuf>,

    /// Suggested output file name reported in JSON (default: converted_document.<ext>).
    #[arg(long, env = "DOCCONV_NAME")]
    name: Option<String>,

    /// Print conversion stats (or inspection results) as JSON.
    #[arg(long, env = "DOCCONV_JSON")]
    json: bool,

    /// Print what the document contains, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Allow same-format requests, returning the input unchanged.
    #[arg(long, env = "DOCCONV_PASS_THROUGH")]
    pass_through: bool,

    /// Largest accepted input in bytes.
    #[arg(long, env = "DOCCONV_MAX_BYTES", default_value_t = 50 * 1024 * 1024)]
    max_bytes: u64,

    /// Page size of rendered PDFs.
    #[arg(long, env = "DOCCONV_PAGE_SIZE", value_enum, default_value = "letter")]
    page_size: PageSizeArg,

    /// Body font size in points (4–72).
    #[arg(long, env = "DOCCONV_FONT_SIZE", default_value_t = 11,
          value_parser = clap::value_parser!(u32).range(4..=72))]
    font_size: u32,

    /// Page margin in points.
    #[arg(long, env = "DOCCONV_MARGIN", default_value_t = 72)]
    margin: u32,

    /// Page separator in text output: newline, blank, formfeed, or custom string.
    #[arg(long, env = "DOCCONV_SEPARATOR", default_value = "newline")]
    separator: String,

    /// Document title written into PDF and DOCX metadata.
    #[arg(long, env = "DOCCONV_TITLE")]
    title: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOCCONV_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Conversion timeout in seconds.
    #[arg(long, env = "DOCCONV_RENDER_TIMEOUT", default_value_t = 60)]
    render_timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCCONV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCCONV_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DOCCONV_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PageSizeArg {
    Letter,
    A4,
}

impl From<PageSizeArg> for PageSize {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::Letter => PageSize::Letter,
            PageSizeArg::A4 => PageSize::A4,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    let declared = cli
        .from
        .as_deref()
        .map(Format::from_extension)
        .transpose()
        .context("Invalid --from format")?;

    let document = resolve_input(&cli.input, declared, &config)
        .await
        .with_context(|| format!("Failed to read input '{}'", cli.input))?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&document, &config).context("Failed to inspect document")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
            );
        } else {
            println!("File:         {}", info.file_name);
            println!("Format:       {}", info.declared_format);
            if let Some(detected) = info.detected_format {
                println!("Detected:     {}", detected);
            }
            println!("Size:         {} bytes", info.size_bytes);
            if let Some(pages) = info.pages {
                println!("Pages:        {}", pages);
            }
            println!("Blocks:       {}", info.blocks);
            println!("Characters:   {}", info.characters);
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let target: Format = cli
        .to
        .as_deref()
        .unwrap_or_default()
        .parse()
        .context("Invalid --to format")?;

    let mut request = ConversionRequest::new(document, target);
    if let Some(ref name) = cli.name {
        request = request.with_file_name(name.clone());
    }

    let result = convert_async(request, &config)
        .await
        .context("Conversion failed")?;

    if let Some(ref output_path) = cli.output {
        write_output(&result.content, output_path)
            .await
            .context("Failed to write output")?;

        if !cli.quiet && !cli.json {
            eprintln!(
                "{}  {} → {}  {} blocks  {}ms  →  {}",
                green("✔"),
                result.stats.source,
                result.stats.target,
                result.stats.blocks,
                result.stats.duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else if !cli.json {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(&result.content)
            .context("Failed to write to stdout")?;
        handle.flush().context("Failed to flush stdout")?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress && cli.output.is_none() {
        eprintln!(
            "Converted {} → {}: {} blocks, {} bytes in {}ms",
            result.stats.source,
            result.stats.target,
            result.stats.blocks,
            result.stats.output_bytes,
            result.stats.duration_ms
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .max_input_bytes(cli.max_bytes)
        .allow_pass_through(cli.pass_through)
        .page_size(cli.page_size.into())
        .font_size_pt(cli.font_size)
        .line_height_pt(line_height_for(cli.font_size))
        .margin_pt(cli.margin)
        .page_separator(parse_separator(&cli.separator))
        .download_timeout_secs(cli.download_timeout)
        .render_timeout_secs(cli.render_timeout);

    if let Some(ref title) = cli.title {
        builder = builder.document_title(title.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Leading of roughly 1.25× the font size, never below it.
fn line_height_for(font_size: u32) -> u32 {
    (font_size * 5).div_ceil(4).max(font_size)
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "newline" | "none" => PageSeparator::Newline,
        "blank" => PageSeparator::BlankLine,
        "formfeed" | "ff" => PageSeparator::FormFeed,
        _ => PageSeparator::Custom(s.to_string()),
    }
}
