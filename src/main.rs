//! leadflow - lead categorization and form flow engine
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use leadflow::actions::{to_json, to_json_pretty, ActionRunner, ActionType};
use leadflow::config::{leadflow_home, Config};
use leadflow::error::exit_codes;
use leadflow::storage::FileSessionStore;

// =============================================================================
// CLI Definition
// =============================================================================

/// leadflow - lead categorization and form flow engine
#[derive(Parser)]
#[command(name = "leadflow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// [Form] Start a new session and print its id
    Start {
        /// Pretty-print the JSON output
        #[arg(long, short)]
        json: bool,
    },

    /// [Form] Apply a form action (JSON stdin/stdout)
    Step {
        /// The action to apply
        #[arg(value_enum)]
        action: StepAction,
    },

    /// [User] Categorize a profile from a file or stdin
    Categorize {
        /// Profile JSON file (reads stdin when omitted)
        #[arg(long, short)]
        file: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [User] Print the current record for a session
    Record {
        /// Session ID to inspect
        session_id: String,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Developer] List recent sessions
    Sessions {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
        /// Maximum number of sessions to show
        #[arg(long, short, default_value = "20")]
        limit: usize,
    },

    /// [Developer] Dump session state
    Debug {
        /// Session ID to inspect
        session_id: String,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Developer] View trace events for a session
    Trace {
        /// Session ID to inspect
        session_id: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
        /// Show only the most recent N events
        #[arg(long, short)]
        limit: Option<usize>,
        /// Event type (e.g. sink_failed) or group: navigation, categories, problems
        #[arg(long)]
        event_type: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StepAction {
    Basics,
    Academic,
    EvaluationComplete,
    EvaluationCancel,
    ExtendedNurture,
    Counselling,
    Back,
}

impl From<StepAction> for ActionType {
    fn from(action: StepAction) -> Self {
        match action {
            StepAction::Basics => ActionType::Basics,
            StepAction::Academic => ActionType::Academic,
            StepAction::EvaluationComplete => ActionType::EvaluationComplete,
            StepAction::EvaluationCancel => ActionType::EvaluationCancel,
            StepAction::ExtendedNurture => ActionType::ExtendedNurture,
            StepAction::Counselling => ActionType::Counselling,
            StepAction::Back => ActionType::Back,
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("leadflow error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Install the log subscriber.
///
/// Logs go to stderr so stdout stays machine-readable. `LEADFLOW_LOG`
/// takes an `EnvFilter` directive; the default is `warn`.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("LEADFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Set up the global panic handler.
///
/// On panic, logs to `<leadflow home>/crash.log` and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("leadflow panic: {}", info);

        if let Some(home) = leadflow_home() {
            let _ = std::fs::create_dir_all(&home);
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { json } => run_start(json),
        Commands::Step { action } => run_step(action.into()),
        Commands::Categorize { file, json, quiet } => run_categorize(file, json, quiet),
        Commands::Record { session_id, quiet } => run_record(&session_id, quiet),
        Commands::Sessions { json, quiet, limit } => run_sessions(json, quiet, limit),
        Commands::Debug { session_id, quiet } => run_debug(&session_id, quiet),
        Commands::Trace {
            session_id,
            json,
            quiet,
            limit,
            event_type,
        } => run_trace(&session_id, json, quiet, limit, event_type),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn action_runner() -> Result<ActionRunner<FileSessionStore>, Box<dyn std::error::Error>> {
    let config = Config::load();
    let store = FileSessionStore::new()?;
    Ok(ActionRunner::with_configured_sinks(store, config))
}

fn run_start(pretty: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let output = action_runner()?.start()?;

    if pretty {
        println!("{}", to_json_pretty(&output)?);
    } else {
        println!("{}", to_json(&output)?);
    }

    Ok(ExitCode::from(exit_codes::OK as u8))
}

fn run_step(action: ActionType) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let output = action_runner()?.run(action)?;
    println!("{}", output);

    Ok(ExitCode::from(exit_codes::OK as u8))
}

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::OK as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

fn run_categorize(
    file: Option<PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use leadflow::cli::{CategorizeCommand, CategorizeOptions};
    use leadflow::util::{read_stream_with_limit, MAX_INPUT_SIZE};

    let cmd = CategorizeCommand::new(Config::load());
    let options = CategorizeOptions { json, quiet };

    let output = match file {
        Some(path) => cmd.run_file(&path),
        None => {
            let input = read_stream_with_limit(std::io::stdin(), "stdin", MAX_INPUT_SIZE)?;
            cmd.run(&input)
        }
    };
    let formatted = cmd.format_output(&output, &options);

    if !formatted.is_empty() {
        print!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_record(session_id: &str, quiet: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use leadflow::cli::RecordCommand;

    let store = FileSessionStore::new()?;
    let cmd = RecordCommand::new(store);

    let output = cmd.run(session_id);
    let formatted = cmd.format_output(&output, quiet);

    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_sessions(
    json: bool,
    quiet: bool,
    limit: usize,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use leadflow::cli::{SessionsCommand, SessionsOptions};

    let store = FileSessionStore::new()?;

    let cmd = SessionsCommand::new(store);
    let options = SessionsOptions { json, quiet, limit };

    let output = cmd.run(&options);
    let formatted = cmd.format_output(&output, &options);

    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_debug(session_id: &str, quiet: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use leadflow::cli::{DebugCommand, DebugOptions};

    let store = FileSessionStore::new()?;

    let cmd = DebugCommand::new(store, Config::load());
    let options = DebugOptions { quiet };

    let output = cmd.run(session_id);
    let formatted = cmd.format_output(&output, &options);

    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_trace(
    session_id: &str,
    json: bool,
    quiet: bool,
    limit: Option<usize>,
    event_type: Option<String>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use leadflow::cli::{TraceCommand, TraceOptions};

    let store = FileSessionStore::new()?;

    let cmd = TraceCommand::new(store);
    let options = TraceOptions {
        json,
        quiet,
        limit,
        event_type,
    };

    let output = cmd.run(session_id, &options);
    let formatted = cmd.format_output(&output, &options);

    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

// =============================================================================
// Tests
// =============================================================================
