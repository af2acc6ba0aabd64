//! Call Tracker CLI - Command-line front end for Call Tracker
//!
//! Commands:
//! - run: Track calls interactively from line commands on stdin
//! - summary: Print the daily summary
//! - export: Write the call report
//! - clear: Clear call history
//! - behaviors: List the behavior catalog
//! - doctor: Diagnose store and catalog configuration

use clap::{ArgAction, Parser, Subcommand};
use std::fs;
use std::future::Future;
use std::io::{self, BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use calltracker::picker::RandomPicker;
use calltracker::report::{self, REPORT_FILE_NAME};
use calltracker::store::DailyStore;
use calltracker::{
    BehaviorCatalog, CallRecord, Command, DailyData, Driver, JsonFileStore, Reply, Summary,
    ToggleOutcome, Tracker, TrackerConfig, TrackerError, TrackerEvent, PRODUCER_NAME,
    TRACKER_VERSION,
};

/// Call Tracker - track coaching behaviors across customer calls
#[derive(Parser)]
#[command(name = "calltracker")]
#[command(version = TRACKER_VERSION)]
#[command(about = "Track call-handling behaviors and daily statistics", long_about = None)]
struct Cli {
    /// Directory holding the stored daily data
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// JSON file with behavior definitions (built-in catalog when omitted)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Seconds into a call before the check-in reminder
    #[arg(long, global = true)]
    check_in_after: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track calls interactively (reads commands from stdin)
    Run,

    /// Print the daily summary
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the call report
    Export {
        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = REPORT_FILE_NAME)]
        output: PathBuf,
    },

    /// Clear all call history
    Clear {
        /// Confirm that history should be deleted
        #[arg(long)]
        yes: bool,
    },

    /// List the behavior catalog
    Behaviors {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose store and catalog configuration
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliFailure> {
    let mut config = TrackerConfig::default();
    if let Some(dir) = cli.store_dir {
        config = config.with_store_dir(dir);
    }
    if let Some(path) = cli.catalog {
        config = config.with_catalog_path(path);
    }
    if let Some(seconds) = cli.check_in_after {
        config = config.with_check_in_after(seconds);
    }

    match cli.command {
        Commands::Run => cmd_run(&config).await,
        Commands::Summary { json } => cmd_summary(&config, json).await,
        Commands::Export { output } => cmd_export(&config, &output).await,
        Commands::Clear { yes } => cmd_clear(&config, yes).await,
        Commands::Behaviors { json } => cmd_behaviors(&config, json),
        Commands::Doctor { json } => cmd_doctor(&config, json).await,
    }
}

async fn cmd_run(config: &TrackerConfig) -> Result<(), CliFailure> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let tracker = Tracker::open_with_config(config, Some(events_tx)).await?;

    // Notifications arrive independently of command replies
    let notifier = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            print_event(&event);
        }
    });

    let interrupted = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let salvaged = drive_lines(tracker, spawn_stdin_reader(), interrupted).await?;
    if let Some(record) = salvaged {
        println!("Call {} was still active and has been saved.", record.id);
    }
    let _ = notifier.await;
    Ok(())
}

/// Feed input lines to a driver until quit, end of input or interruption.
///
/// Every exit from the loop goes through the driver's shutdown, so a call that
/// is still active is committed and persisted before this returns.
async fn drive_lines<S>(
    tracker: Tracker,
    mut lines: mpsc::UnboundedReceiver<io::Result<String>>,
    interrupted: S,
) -> Result<Option<CallRecord>, CliFailure>
where
    S: Future<Output = ()>,
{
    let catalog = tracker.catalog().clone();
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
    let driver = tokio::spawn(Driver::new(tracker).run(cmd_rx, move |reply| {
        let _ = reply_tx.send(reply);
    }));

    print_run_help(&catalog);

    tokio::pin!(interrupted);
    loop {
        let line = tokio::select! {
            line = lines.recv() => line,
            _ = &mut interrupted => None,
        };
        let line = match line {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                warn!(error = %e, "Failed to read input, stopping");
                eprintln!("error: could not read input ({e})");
                break;
            }
            None => break,
        };

        let input = match parse_run_line(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("error: {message}");
                continue;
            }
        };

        let (command, export_path) = match input {
            RunInput::Quit => break,
            RunInput::Help => {
                print_run_help(&catalog);
                continue;
            }
            RunInput::Command(command, path) => (command, path),
        };

        if cmd_tx.send(command).await.is_err() {
            break;
        }
        match reply_rx.recv().await {
            Some(Ok(reply)) => {
                if let Err(e) = render_reply(reply, &catalog, export_path.as_deref()) {
                    eprintln!("error: could not write report ({e})");
                }
            }
            Some(Err(e)) => eprintln!("error: {e}"),
            None => break,
        }
    }

    drop(cmd_tx);
    let salvaged = driver
        .await
        .map_err(|e| CliFailure::Internal(e.to_string()))??;
    Ok(salvaged)
}

/// Read stdin on a plain thread so a pending read never holds up runtime shutdown
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

enum RunInput {
    Command(Command, Option<PathBuf>),
    Help,
    Quit,
}

fn parse_run_line(line: &str) -> Result<Option<RunInput>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let input = match word {
        "start" => RunInput::Command(Command::Start(rest.to_string()), None),
        "toggle" | "t" => {
            if rest.is_empty() {
                return Err("usage: toggle <behavior-id>".to_string());
            }
            RunInput::Command(Command::Toggle(rest.to_string()), None)
        }
        "end" => RunInput::Command(Command::End, None),
        "summary" => RunInput::Command(Command::Summary, None),
        "progress" => RunInput::Command(Command::Progress, None),
        "export" => {
            let path = (!rest.is_empty()).then(|| PathBuf::from(rest));
            RunInput::Command(Command::Export, path)
        }
        "clear" => RunInput::Command(Command::Clear, None),
        "help" | "?" => RunInput::Help,
        "quit" | "exit" => RunInput::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Some(input))
}

fn print_run_help(catalog: &BehaviorCatalog) {
    println!("Commands: start <id> | toggle <behavior> | end | summary | progress | export [path] | clear | quit");
    println!("Behaviors:");
    for behavior in catalog.iter() {
        println!("  {:<20} {}", behavior.id, behavior.name);
    }
}

fn print_event(event: &TrackerEvent) {
    match event {
        TrackerEvent::CheckIn { call_id, advisory } => println!(
            "[{}] {} minutes reached. Please check in with the customer.",
            call_id,
            advisory.threshold_seconds / 60
        ),
        TrackerEvent::LoadFailed { message } => {
            eprintln!("warning: starting with empty history ({message})")
        }
        TrackerEvent::PersistenceFailed { op, message } => {
            eprintln!("warning: {op:?} failed, changes are kept in memory only ({message})")
        }
    }
}

fn render_reply(
    reply: Reply,
    catalog: &BehaviorCatalog,
    export_path: Option<&Path>,
) -> io::Result<()> {
    match reply {
        Reply::Started { call_id } => println!("Call session started: {call_id}"),
        Reply::Toggled(result) => {
            let name = catalog.display_name(&result.behavior_id);
            match result.outcome {
                ToggleOutcome::Activated { encouragement } => println!(
                    "[{}/{}] + {}: {}",
                    result.completed, result.total, name, encouragement
                ),
                ToggleOutcome::Deactivated => {
                    println!("[{}/{}] - {}", result.completed, result.total, name)
                }
            }
        }
        Reply::Ended { recap, .. } => print!("{recap}"),
        Reply::Summary(summary) => print!("{}", format_summary(&summary)),
        Reply::Progress(progress) => println!(
            "Behaviors: {}/{} ({:.0}%)",
            progress.completed,
            progress.total,
            progress.percent()
        ),
        Reply::Report(text) => match export_path {
            Some(path) => {
                fs::write(path, text)?;
                println!("Report written to {}", path.display());
            }
            None => print!("{text}"),
        },
        Reply::Cleared => println!("Call history has been cleared."),
    }
    Ok(())
}

fn format_summary(summary: &Summary) -> String {
    format!(
        "Total Calls: {}\n{}",
        summary.total_calls,
        report::render_summary_lines(summary)
    )
}

async fn cmd_summary(config: &TrackerConfig, json: bool) -> Result<(), CliFailure> {
    let tracker = Tracker::open_with_config(config, None).await?;
    let summary = tracker.compute_summary();

    if json {
        let output = SummaryOutput {
            producer: PRODUCER_NAME.to_string(),
            version: TRACKER_VERSION.to_string(),
            exported_at: chrono::Utc::now().to_rfc3339(),
            summary,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", format_summary(&summary));
    }

    tracker.shutdown().await?;
    Ok(())
}

async fn cmd_export(config: &TrackerConfig, output: &Path) -> Result<(), CliFailure> {
    let tracker = Tracker::open_with_config(config, None).await?;
    let text = tracker.export_report()?;

    if output.to_string_lossy() == "-" {
        print!("{text}");
    } else {
        fs::write(output, text)?;
        eprintln!("Report written to {}", output.display());
    }

    tracker.shutdown().await?;
    Ok(())
}

async fn cmd_clear(config: &TrackerConfig, yes: bool) -> Result<(), CliFailure> {
    if !yes {
        return Err(CliFailure::ConfirmationRequired);
    }

    let mut tracker = Tracker::open_with_config(config, None).await?;
    tracker.clear_history();
    tracker.shutdown().await?;
    println!("Call history has been cleared.");
    Ok(())
}

fn cmd_behaviors(config: &TrackerConfig, json: bool) -> Result<(), CliFailure> {
    let catalog = config.load_catalog()?;

    if json {
        let behaviors: Vec<_> = catalog.iter().collect();
        println!("{}", serde_json::to_string_pretty(&behaviors)?);
        return Ok(());
    }

    let mut picker = RandomPicker;
    for behavior in catalog.iter() {
        println!("{} ({})", behavior.name, behavior.id);
        if let Some(hint) = catalog.example_hint(&behavior.id, &mut picker) {
            println!("    e.g. \"{hint}\"");
        }
    }
    Ok(())
}

async fn cmd_doctor(config: &TrackerConfig, json: bool) -> Result<(), CliFailure> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Call Tracker version {}", TRACKER_VERSION),
    });

    let catalog = match config.load_catalog() {
        Ok(catalog) => {
            checks.push(DoctorCheck {
                name: "catalog".to_string(),
                status: CheckStatus::Ok,
                message: format!("{} behaviors defined", catalog.len()),
            });
            Some(catalog)
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "catalog".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            });
            None
        }
    };

    let store = JsonFileStore::new(&config.store_dir);
    if !config.store_dir.exists() {
        checks.push(DoctorCheck {
            name: "store".to_string(),
            status: CheckStatus::Warning,
            message: format!(
                "Store directory {} does not exist yet",
                config.store_dir.display()
            ),
        });
    } else {
        match store.load(&config.store_key).await {
            Ok(Some(data)) => checks.push(check_stored_data(&data, catalog.as_ref())),
            Ok(None) => checks.push(DoctorCheck {
                name: "store".to_string(),
                status: CheckStatus::Ok,
                message: "No stored history".to_string(),
            }),
            Err(e) => checks.push(DoctorCheck {
                name: "store".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read {}: {}", store.path_for(&config.store_key).display(), e),
            }),
        }
    }

    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: if io::stdin().is_terminal() {
            "stdin is a TTY (interactive mode)".to_string()
        } else {
            "stdin is a pipe (scripted mode ready)".to_string()
        },
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: TRACKER_VERSION.to_string(),
        checked_at: chrono::Utc::now().to_rfc3339(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Call Tracker Doctor Report");
        println!("==========================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CliFailure::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_stored_data(data: &DailyData, catalog: Option<&BehaviorCatalog>) -> DoctorCheck {
    let unknown: Vec<&str> = match catalog {
        Some(catalog) => data
            .behavior_tally
            .keys()
            .map(String::as_str)
            .filter(|id| !catalog.contains(id))
            .collect(),
        None => Vec::new(),
    };

    if unknown.is_empty() {
        DoctorCheck {
            name: "store".to_string(),
            status: CheckStatus::Ok,
            message: format!("Stored history valid ({} calls)", data.calls.len()),
        }
    } else {
        DoctorCheck {
            name: "store".to_string(),
            status: CheckStatus::Warning,
            message: format!(
                "{} calls stored; tally has ids not in the catalog: {}",
                data.calls.len(),
                unknown.join(", ")
            ),
        }
    }
}

// Error types

#[derive(Debug)]
enum CliFailure {
    Io(io::Error),
    Json(serde_json::Error),
    Tracker(TrackerError),
    ConfirmationRequired,
    DoctorFailed,
    Internal(String),
}

impl From<io::Error> for CliFailure {
    fn from(e: io::Error) -> Self {
        CliFailure::Io(e)
    }
}

impl From<serde_json::Error> for CliFailure {
    fn from(e: serde_json::Error) -> Self {
        CliFailure::Json(e)
    }
}

impl From<TrackerError> for CliFailure {
    fn from(e: TrackerError) -> Self {
        CliFailure::Tracker(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliFailure> for CliError {
    fn from(e: CliFailure) -> Self {
        match e {
            CliFailure::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliFailure::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            CliFailure::Tracker(e) => tracker_error(e),
            CliFailure::ConfirmationRequired => CliError {
                code: "CONFIRMATION_REQUIRED".to_string(),
                message: "This will clear all call history and cannot be undone".to_string(),
                hint: Some("Re-run with --yes to confirm".to_string()),
            },
            CliFailure::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            CliFailure::Internal(message) => CliError {
                code: "INTERNAL_ERROR".to_string(),
                message,
                hint: None,
            },
        }
    }
}

fn tracker_error(e: TrackerError) -> CliError {
    let (code, hint) = match &e {
        TrackerError::NoHistory => ("NO_DATA", Some("End at least one call before exporting")),
        TrackerError::InvalidCatalog(_) => ("INVALID_CATALOG", Some("Run 'calltracker doctor' for details")),
        TrackerError::UnknownBehavior(_) => ("UNKNOWN_BEHAVIOR", Some("Run 'calltracker behaviors' to list ids")),
        e if e.is_persistence() => ("STORE_ERROR", Some("Check --store-dir and its permissions")),
        _ => ("SESSION_ERROR", None),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: hint.map(str::to_string),
    }
}

// Report types

#[derive(serde::Serialize)]
struct SummaryOutput {
    producer: String,
    version: String,
    exported_at: String,
    summary: Summary,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checked_at: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
