use std::fs;
use std::io::{self, BufRead as _, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use directories::ProjectDirs;
use leafview_application::{AppContext, DocumentInfo, open_document};
use leafview_core::Config;
use leafview_engine::Engine;
use leafview_storage::Storage;
use leafview_ui::Ui;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "LEAFVIEW_LOG";
const LOG_FILE_NAME: &str = "leafview.log";

/// Terminal viewer for PDF and image documents.
#[derive(Debug, Parser)]
#[command(name = "leafview", version, about)]
struct Args {
    /// Files to open, one tab each.
    files: Vec<PathBuf>,

    /// Use this configuration file instead of the per-user one.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Print document information for each file and exit.
    #[arg(long)]
    info: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let project_dirs =
        ProjectDirs::from("dev", "leafview", "leafview").context("resolve project dirs")?;

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => project_dirs.config_dir().join(leafview_storage::CONFIG_FILE_NAME),
    };
    let storage = Storage::open(&config_path)?;
    let config = storage.load_config()?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    init_logging(project_dirs.data_dir(), &config)?;
    tracing::info!(config = %storage.path().display(), files = args.files.len(), "starting");

    let engine = Engine::new();
    if let Err(err) = engine.check_pdfium() {
        tracing::warn!(error = %format!("{err:#}"), "pdf rendering unavailable");
    }
    if args.info {
        return print_info(&engine, &args.files);
    }

    let mut ui = Ui::new(AppContext::new(config), engine, args.files);
    let outcome = ui.run()?;
    if outcome.config_changed {
        storage.save_config(&outcome.config)?;
        tracing::info!("config saved");
    }
    Ok(())
}

/// Sends tracing output to a log file so it never lands on the TUI.
fn init_logging(data_dir: &Path, config: &Config) -> anyhow::Result<()> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("create data dir {}", data_dir.display()))?;
    let log_path = data_dir.join(LOG_FILE_NAME);
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("open log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("init logging: {err}"))?;
    Ok(())
}

fn print_info(engine: &Engine, files: &[PathBuf]) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut prompt = |path: &Path, incorrect: bool| -> Option<String> {
        if incorrect {
            eprintln!("Incorrect password.");
        }
        eprint!("Password for {}: ", path.display());
        io::stderr().flush().ok()?;
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    };

    let mut failed = 0usize;
    for path in files {
        match open_document(engine, path, &mut prompt) {
            Ok(opened) => {
                let info = DocumentInfo::collect(&opened.path, opened.document.as_ref());
                let width = info
                    .rows()
                    .iter()
                    .map(|(label, _)| label.len())
                    .max()
                    .unwrap_or(0);
                for (label, value) in info.rows() {
                    println!("{label:<width$}  {value}");
                }
                println!();
            }
            Err(err) => {
                failed += 1;
                tracing::warn!(path = %path.display(), error = %err, "info failed");
                eprintln!("{}: {err}", path.display());
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} files could not be opened", files.len());
    }
    Ok(())
}
