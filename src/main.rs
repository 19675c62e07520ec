use anyhow::Result;
use cefdetect::{
    config::Config,
    detector::{Detector, ScanEvent, ScanState},
    output::{format_outcome_to_string, pretty_size, print_outcome, OutputFormat},
    platform::SearchRoot,
    search::{detected_tools, SearchProvider, SystemSearch, WalkSearch},
    ScanOutcome,
};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Exit codes for scripting
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const NOTHING_FOUND: u8 = 2;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Parser)]
#[command(name = "cefdetect")]
#[command(
    author,
    version,
    about = "Find installed applications built on Chromium (Electron, NW.js, CEF, ...)"
)]
struct Cli {
    /// Log detection decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan this machine for Chromium-based applications
    Scan {
        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write output to file
        #[arg(short, long)]
        output: Option<String>,

        /// Timeout in seconds for each external search invocation
        #[arg(long)]
        timeout: Option<u64>,

        /// Additional directory to search (repeatable)
        #[arg(long = "root")]
        roots: Vec<PathBuf>,

        /// Skip fd/locate/Everything and walk the search roots directly
        #[arg(long)]
        walk_only: bool,
    },

    /// Show the search backend and roots that would be used
    Backend,

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "cefdetect=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring unreadable config file: {}", e);
            Config::default()
        }
    };

    match cli.command {
        Commands::Scan {
            format,
            output,
            timeout,
            roots,
            walk_only,
        } => {
            if let Some(secs) = timeout {
                config.search_timeout_secs = secs;
            }
            config.extra_roots.extend(roots);
            let format_str = format.unwrap_or(config.default_format.clone());

            run_scan(&config, format_str, output, walk_only).await
        }
        Commands::Backend => {
            show_backend(&config);
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

async fn run_scan(
    config: &Config,
    format: String,
    output_file: Option<String>,
    walk_only: bool,
) -> Result<u8> {
    let format = OutputFormat::from_str(&format).map_err(|e| anyhow::anyhow!(e))?;
    let is_interactive = format == OutputFormat::Table && output_file.is_none();

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            cancel.store(true, Ordering::Relaxed);
            eprintln!("Cancelling scan, press Ctrl-C again to quit immediately");
            // a search tool may still be running; don't make the user wait for it
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(exit_codes::INTERRUPTED);
            }
        });
    }

    let roots = config.search_roots();
    let provider: Arc<dyn SearchProvider> = if walk_only {
        Arc::new(WalkSearch::new(roots).with_cancel_flag(cancel.clone()))
    } else {
        Arc::new(
            SystemSearch::new(roots, config.search_timeout()).with_cancel_flag(cancel.clone()),
        )
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let detector = Detector::new(provider)
        .with_options(config.detector_options())
        .with_events(tx)
        .with_cancel_flag(cancel);

    let progress = if is_interactive {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(ScanState::Idle.description());
        Some(pb)
    } else {
        None
    };

    let watcher = tokio::spawn(watch_events(rx, progress));
    let outcome = detector.run().await;
    // the detector owns the sender; dropping it ends the watcher
    drop(detector);
    if let Ok(Some(pb)) = watcher.await {
        pb.finish_and_clear();
    }

    if let Some(path) = output_file {
        let content = format_outcome_to_string(&outcome, format)?;
        std::fs::write(&path, content)?;
        eprintln!("Results written to: {}", path);
    } else {
        print_outcome(&outcome, format)?;
    }

    Ok(match outcome {
        ScanOutcome::Detected(_) => exit_codes::SUCCESS,
        ScanOutcome::NothingFound { .. } => exit_codes::NOTHING_FOUND,
    })
}

/// Mirrors scan events onto the spinner until the detector goes away.
async fn watch_events(
    mut rx: mpsc::UnboundedReceiver<ScanEvent>,
    progress: Option<ProgressBar>,
) -> Option<ProgressBar> {
    let mut state = ScanState::Idle;
    let mut found = 0usize;
    let mut total = 0u64;

    while let Some(event) = rx.recv().await {
        match event {
            ScanEvent::StateChanged(next) => state = next,
            ScanEvent::Detected { app, .. } => {
                found += 1;
                total += app.size_bytes;
            }
        }
        if let Some(pb) = &progress {
            pb.set_message(format!(
                "{}... {} found ({})",
                state.description(),
                found,
                pretty_size(total)
            ));
        }
    }

    progress
}

fn show_backend(config: &Config) {
    let tools = detected_tools();

    println!("Search backend: {}", tools.backend.name());
    if let Some(program) = tools.backend.program() {
        println!("  Program: {}", program.display());
    }
    match &tools.locate {
        Some(locate) => println!("  locate:  {}", locate.display()),
        None => println!("  locate:  not available"),
    }
    println!("  Timeout: {}s per search", config.search_timeout_secs);
    println!();
    println!("Search roots:");
    for SearchRoot { path, max_depth } in config.search_roots() {
        match max_depth {
            Some(depth) => println!("  {} (depth {})", path.display(), depth),
            None => println!("  {}", path.display()),
        }
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    // Show current config
    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'cefdetect config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
