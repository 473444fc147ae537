//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use nbindex_core::{ProgressReporter, UpdateSummary, assemble, update_index};
use nbindex_shared::{AppConfig, NbIndexError, Notebook, init_config, load_config, load_config_from};
use nbindex_solr::SolrClient;
use nbindex_source::LocalSource;
use nbindex_storage::{NotebookArchive, Storage};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// nbindex: make Jupyter notebooks searchable.
#[derive(Parser)]
#[command(
    name = "nbindex",
    version,
    about = "Index Jupyter notebooks into Solr cell and notebook cores.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.nbindex/nbindex.toml).
    #[arg(long, global = true, env = "NBINDEX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Index notebooks from the configured source.
    Update {
        /// Only index notebooks with the same filename as this path.
        #[arg(long)]
        path: Option<String>,
    },

    /// Print the search documents for one notebook file without indexing.
    Documents {
        /// Notebook file to read.
        file: PathBuf,

        /// Logical path used for the notebook id (defaults to FILE).
        #[arg(long)]
        path: Option<String>,
    },

    /// Retrieve archived notebook bytes by notebook id.
    Fetch {
        /// Notebook document id.
        id: String,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "nbindex=info",
        1 => "nbindex=debug",
        _ => "nbindex=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Update { path } => cmd_update(config_path, path.as_deref()).await,
        Command::Documents { file, path } => cmd_documents(&file, path.as_deref()),
        Command::Fetch { id, out } => cmd_fetch(config_path, &id, out.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn notebook_indexed(&self, path: &str, current: usize, total: usize) {
        self.spinner.set_message(format!("Indexed [{current}/{total}] {path}"));
    }

    fn notebook_failed(&self, path: &str, error: &NbIndexError) {
        self.spinner.println(format!("failed: {path}: {error}"));
    }

    fn done(&self, _summary: &UpdateSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_update(config_path: Option<&Path>, filter: Option<&str>) -> Result<()> {
    let config = resolve_config(config_path)?;

    let source = LocalSource::new(&config.source)?;
    let index = SolrClient::new(&config.solr)?;
    let archive = Storage::open(&config.archive.resolved_path()?).await?;
    info!(
        base_dir = %source.base_dir().display(),
        solr = %config.solr.base_url,
        "starting update"
    );

    let progress = CliProgress::new();
    let summary = update_index(&source, &index, &archive, filter, &progress).await?;

    println!(
        "Indexed {} notebook(s), {} collection(s) posted, {} failure(s) in {:.1}s",
        summary.notebooks_indexed,
        summary.collections_posted,
        summary.failures.len(),
        summary.elapsed.as_secs_f64()
    );

    if !summary.is_success() {
        return Err(eyre!("Failed to update: {}", summary.failed_paths()));
    }
    Ok(())
}

fn cmd_documents(file: &Path, path: Option<&str>) -> Result<()> {
    let bytes = std::fs::read(file).map_err(|e| NbIndexError::io(file, e))?;
    let notebook = Notebook::from_slice(&bytes)?;

    let logical_path = match path {
        Some(p) => p.to_string(),
        None => file.to_string_lossy().into_owned(),
    };
    let documents = assemble(&logical_path, &notebook, None);

    println!("{}", serde_json::to_string_pretty(&documents)?);
    Ok(())
}

async fn cmd_fetch(config_path: Option<&Path>, id: &str, out: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let archive = Storage::open_readonly(&config.archive.resolved_path()?).await?;

    let bytes = archive
        .get(id)
        .await?
        .ok_or_else(|| eyre!("no archived notebook with id '{id}'"))?;

    match out {
        Some(out) => {
            std::fs::write(out, &bytes).map_err(|e| NbIndexError::io(out, e))?;
            println!("Wrote {} bytes to {}", bytes.len(), out.display());
        }
        None => std::io::stdout().write_all(&bytes)?,
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
