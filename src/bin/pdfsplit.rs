//! CLI binary for pdfsplit.
//!
//! A thin shim over the library crate that maps CLI flags to `SplitConfig`
//! and a `StoreConfig`, runs one split, and prints the result as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdfsplit::{
    open_store, ObjectStore, ProgressCallback, SplitConfig, SplitProgressCallback, SplitRequest,
    Splitter, StoreConfig,
};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per stored page.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Spinner until `on_split_start` reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Fetching PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Splitting");
    }
}

impl SplitProgressCallback for CliProgressCallback {
    fn on_split_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_page_stored(&self, page_num: usize, total_pages: usize, location: &str) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(location),
        ));
        self.bar.inc(1);
    }

    fn on_split_complete(&self, stored_pages: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages stored",
            green("✔"),
            bold(&stored_pages.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Split intake/reports/q1.pdf under ./blobs into ./blobs/output/q1-NNN.jpg
  pdfsplit --store fs --root ./blobs reports/q1.pdf

  # Same, against Azure Blob Storage
  export StorageAccountConnectionString='BlobEndpoint=https://acct.blob.core.windows.net;SharedAccessSignature=sv=...'
  pdfsplit --store azure reports/q1.pdf

  # Request body from stdin
  echo '{"blobPath":"reports/q1.pdf"}' | pdfsplit --store fs --root ./blobs --request -

  # Try it without any store: upload a local file into memory first
  pdfsplit --store memory --upload ./q1.pdf q1.pdf

OUTPUT:
  stdout receives the JSON list of stored pages, [{"filepath": ...}, ...].
  On failure stdout receives {"kind": ..., "key": ..., "message": ...} and the
  exit code is 2 for request faults and 1 for everything else.

ENVIRONMENT VARIABLES:
  StorageAccountConnectionString  Azure storage connection string
  PDFSPLIT_ROOT                   Root directory for --store fs
  PDFIUM_LIB_PATH                 Path to libpdfium or its directory
"#;

/// Split a PDF in an object store into one JPEG per page.
#[derive(Parser, Debug)]
#[command(
    name = "pdfsplit",
    version,
    about = "Split a PDF in an object store into one JPEG per page",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source key in the source namespace, or with --request a JSON request file (`-` for stdin).
    input: String,

    /// Treat INPUT as a `{"blobPath": ...}` request file.
    #[arg(long)]
    request: bool,

    /// Store backend.
    #[arg(long, env = "PDFSPLIT_STORE", value_enum, default_value = "fs")]
    store: StoreArg,

    /// Root directory for the `fs` store.
    #[arg(long, env = "PDFSPLIT_ROOT", default_value = ".")]
    root: PathBuf,

    /// Azure connection string for the `azure` store.
    #[arg(long, env = "StorageAccountConnectionString", hide_env_values = true)]
    connection_string: Option<String>,

    /// Namespace the source key is read from.
    #[arg(long, env = "PDFSPLIT_SOURCE_NAMESPACE", default_value = "intake")]
    source_namespace: String,

    /// Namespace page images are written to.
    #[arg(long, env = "PDFSPLIT_OUTPUT_NAMESPACE", default_value = "output")]
    output_namespace: String,

    /// Rendering DPI (72–600).
    #[arg(long, env = "PDFSPLIT_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Maximum rendered edge length in pixels.
    #[arg(long, env = "PDFSPLIT_MAX_PIXELS", default_value_t = 4000)]
    max_pixels: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFSPLIT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Path to libpdfium, or the directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Abort the split after this many seconds.
    #[arg(long, env = "PDFSPLIT_TIMEOUT")]
    timeout: Option<u64>,

    /// Local PDF to write at the source key before splitting.
    #[arg(long)]
    upload: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "PDFSPLIT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFSPLIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFSPLIT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StoreArg {
    Memory,
    Fs,
    Azure,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress;
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

    // ── Resolve request ──────────────────────────────────────────────────
    let request = if cli.request {
        read_request(&cli.input).await?
    } else {
        SplitRequest::new(cli.input.clone())
    };

    // ── Build store + config ─────────────────────────────────────────────
    let store = open_store(&store_config(&cli)?).context("Failed to open store")?;

    let cli_progress = show_progress.then(CliProgressCallback::new_dynamic);
    let progress_cb: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn SplitProgressCallback>);
    let config = build_config(&cli, progress_cb)?;

    // ── Run split ────────────────────────────────────────────────────────
    let outcome = async {
        if let Some(ref path) = cli.upload {
            upload(store.as_ref(), &config, &request, path).await?;
        }
        let splitter = Splitter::new(store.clone(), config.clone());
        anyhow::Ok(splitter.handle(&request).await)
    }
    .await;

    let outcome = match outcome {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(e),
        Err(e) => {
            clear_progress(cli_progress.as_deref());
            return Err(e);
        }
    };

    match outcome {
        Ok(result) => {
            let json =
                serde_json::to_string_pretty(&result).context("Failed to serialise output")?;
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            clear_progress(cli_progress.as_deref());
            let body = e.to_body();
            let json = serde_json::to_string_pretty(&body).context("Failed to serialise error")?;
            println!("{json}");
            if !cli.quiet {
                eprintln!("Split failed: {e}");
            }
            Ok(if body.kind.is_client_fault() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// Remove a still-running progress bar so nothing redraws over later output.
fn clear_progress(progress: Option<&CliProgressCallback>) {
    if let Some(cb) = progress {
        if !cb.bar.is_finished() {
            cb.bar.finish_and_clear();
        }
    }
}

/// Read a JSON request body from a file, or stdin for `-`.
async fn read_request(input: &str) -> Result<SplitRequest> {
    let raw = if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read request from {:?}", input))?
    };
    serde_json::from_str(&raw).context("Request is not a valid {\"blobPath\": ...} object")
}

/// Map store flags to `StoreConfig`.
fn store_config(cli: &Cli) -> Result<StoreConfig> {
    Ok(match cli.store {
        StoreArg::Memory => StoreConfig::Memory,
        StoreArg::Fs => StoreConfig::LocalFs {
            root: cli.root.clone(),
        },
        StoreArg::Azure => StoreConfig::AzureBlob {
            connection_string: cli.connection_string.clone().context(
                "--store azure needs --connection-string or StorageAccountConnectionString",
            )?,
        },
    })
}

/// Map CLI args to `SplitConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SplitConfig> {
    let mut builder = SplitConfig::builder()
        .source_namespace(cli.source_namespace.as_str())
        .output_namespace(cli.output_namespace.as_str())
        .dpi(cli.dpi)
        .max_rendered_pixels(cli.max_pixels);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.as_str());
    }
    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(path.clone());
    }
    if let Some(secs) = cli.timeout {
        builder = builder.timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn upload(
    store: &dyn ObjectStore,
    config: &SplitConfig,
    request: &SplitRequest,
    path: &Path,
) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    let key = request.blob_path.trim().trim_start_matches('/');
    store
        .put(&config.source_namespace, key, bytes, "application/pdf")
        .await
        .with_context(|| format!("Failed to upload {:?} to {}", path, key))
}
