mod config;
mod show;

use std::ffi::OsStr;
use std::io::IsTerminal as _;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Args as ClapArgs, CommandFactory as _, Parser, Subcommand};
use misc_income_sync::Record;
use misc_income_sync::ledger::{FileLedger, LedgerReader as _, MemoryLedger};
use misc_income_sync::reconcile::{ReconcileResult, reconcile};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::config::{Config, Settings};
use crate::show::Palette;

/// Daily log files kept before the oldest is removed.
const LOG_FILES_KEPT: usize = 7;

#[derive(Parser)]
#[command(
    name = "misc-income-sync",
    about = "Reconcile Misc Income deposits from a source export against the ledger"
)]
#[command(disable_help_subcommand = true)]
struct Args {
    /// Config file path. Defaults to misc-income-sync.toml in the current directory.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Ledger file path
    #[arg(short, long, global = true)]
    ledger: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs)]
struct SourceArgs {
    /// Source export (csv or spreadsheet). Replaces the files from the config.
    #[arg(short, long)]
    source: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show differences between the source and the ledger and exit
    Diff {
        #[command(flatten)]
        sources: SourceArgs,
    },
    /// Add the new deposits from the source to the ledger
    Sync {
        #[command(flatten)]
        sources: SourceArgs,

        /// Submit to an in-memory copy of the ledger instead
        #[arg(long)]
        dry_run: bool,
    },
    /// Print every deposit in the ledger
    List,
    /// Create an empty ledger
    Init,
}

pub fn run(args: impl IntoIterator<Item = String>) -> Result<()> {
    clap_complete::CompleteEnv::with_factory(Args::command).complete();

    let args = Args::parse_from(args);
    let config = match &args.config {
        Some(path) => Some(Config::load_from_file(path)?),
        None => Config::find_and_load()?,
    };
    let sources = match &args.command {
        Commands::Diff { sources } | Commands::Sync { sources, .. } => sources.source.clone(),
        Commands::List | Commands::Init => Vec::new(),
    };
    let settings = Settings::resolve(config, args.ledger, sources);
    init_logging(settings.log_file.as_deref())?;

    let palette = if std::io::stdout().is_terminal() {
        Palette::colored()
    } else {
        Palette::plain()
    };

    match args.command {
        Commands::Diff { .. } => {
            let (result, _) = compare(&settings)?;
            print!("{}", show::render_diff(&result, &palette));
            Ok(())
        }
        Commands::Sync { dry_run, .. } => sync(&settings, dry_run, &palette),
        Commands::List => {
            let mut records = FileLedger::open(settings.ledger()?)?.list_all()?;
            misc_income_sync::sort_for_display(&mut records);
            print!("{}", show::render_ledger(&records));
            Ok(())
        }
        Commands::Init => {
            let ledger = FileLedger::create(settings.ledger()?)?;
            println!("Created ledger {}", ledger.path().display());
            Ok(())
        }
    }
}

/// Reconcile the configured sources against the ledger, returning the ledger contents as well.
fn compare(settings: &Settings) -> Result<(ReconcileResult, Vec<Record>)> {
    let incoming = misc_income_sync::import::read_all(settings.sources()?, &settings.import)?;
    let existing = FileLedger::open(settings.ledger()?)?.list_all()?;
    let result = reconcile(incoming, existing.clone());
    Ok((result, existing))
}

fn sync(settings: &Settings, dry_run: bool, palette: &Palette) -> Result<()> {
    let (mut result, existing) = compare(settings)?;
    print!("{}", show::render_diff(&result, palette));

    if result.new_count() == 0 {
        println!("Nothing to add.");
        return Ok(());
    }

    let summary = if dry_run {
        tracing::info!("dry run, submitting to an in-memory ledger");
        result.submit_new(&mut MemoryLedger::new(existing))
    } else {
        let mut ledger = FileLedger::open(settings.ledger()?)?;
        result.submit_new(&mut ledger)
    };
    println!();
    print!("{}", show::render_submitted(&result, summary, palette));
    Ok(())
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "misc_income_sync=info".into());

    let file_layer = match log_file {
        Some(path) => Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(rolling_appender(path)?),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

/// Daily log files next to `path`, named like `misc_income_sync.2025-01-15.log`.
fn rolling_appender(path: &Path) -> Result<RollingFileAppender> {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let prefix = path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("misc_income_sync");

    let mut builder = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(LOG_FILES_KEPT);
    if let Some(extension) = path.extension().and_then(OsStr::to_str) {
        builder = builder.filename_suffix(extension);
    }
    builder
        .build(directory)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn file_names(directory: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(directory)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn log_file_is_dated() {
        let dir = tempfile::tempdir().unwrap();
        let mut appender = rolling_appender(&dir.path().join("logs/sync.log")).unwrap();
        writeln!(appender, "started").unwrap();
        appender.flush().unwrap();

        let today = chrono::Utc::now().format("%Y-%m-%d");
        assert_eq!(
            file_names(&dir.path().join("logs")),
            [format!("sync.{today}.log")]
        );
    }

    #[test]
    fn log_file_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut appender = rolling_appender(&dir.path().join("sync")).unwrap();
        writeln!(appender, "started").unwrap();
        appender.flush().unwrap();

        let today = chrono::Utc::now().format("%Y-%m-%d");
        assert_eq!(file_names(dir.path()), [format!("sync.{today}")]);
    }
}
