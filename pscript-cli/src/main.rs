//! pscript CLI
//!
//! Runs `.psc` automation scripts against the desktop.
//!
//! Usage:
//!   pscript run demos/hello.psc                 # Run a script
//!   pscript run demos/hello.psc --dry-run       # Record actions instead of performing them
//!   pscript run demos/hello.psc --json          # Print the session report as JSON
//!   pscript check demos/hello.psc               # Validate a script without running it
//!   pscript commands --plugins plugins          # List available commands
//!
//! Press Ctrl-C, or move the pointer into a screen corner, to stop a running
//! script at the next command.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use pscript::applications;
use pscript::commands::{parse_seconds, BUILTIN_COMMANDS};
use pscript::config::{
    DEFAULT_FAILSAFE_INTERVAL_MS, DEFAULT_FAILSAFE_MARGIN, DEFAULT_KEY_INTERVAL_MS,
    DEFAULT_OPEN_SETTLE_MS, DEFAULT_TYPE_SETTLE_MS,
};
use pscript::keyboard;
use pscript::platforms::simulated::SimulatedActivity;
use pscript::{
    create_driver, parse_script, read_script, AutomationDriver, CaptureLogger, Command,
    EngineBuilder, EngineConfig, ExecutorConfig, FailsafeConfig, LogEntry, PluginReport,
    SamplePlugin, ScriptLogger, SessionOutcome, SessionReport, SimulatedDriver,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

mod output;

use output::StdoutLogger;

#[derive(Parser)]
#[command(name = "pscript")]
#[command(version, about = "Run line-oriented desktop automation scripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script
    Run(RunArgs),
    /// Parse a script and report problems without running it
    Check(CheckArgs),
    /// List every command the engine knows about
    Commands(PluginArgs),
}

#[derive(Parser, Debug)]
struct PluginArgs {
    /// Directory containing plugin subdirectories with a plugin.json
    #[clap(long, env = "PSCRIPT_PLUGINS")]
    plugins: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct TimingArgs {
    /// Delay between launching an application and focusing its window
    #[clap(long, env = "PSCRIPT_OPEN_SETTLE_MS", default_value_t = DEFAULT_OPEN_SETTLE_MS)]
    open_settle_ms: u64,

    /// Delay before the first keystroke of `type`
    #[clap(long, env = "PSCRIPT_TYPE_SETTLE_MS", default_value_t = DEFAULT_TYPE_SETTLE_MS)]
    type_settle_ms: u64,

    /// Delay between keystrokes
    #[clap(long, env = "PSCRIPT_KEY_INTERVAL_MS", default_value_t = DEFAULT_KEY_INTERVAL_MS)]
    key_interval_ms: u64,

    /// How often the failsafe samples the pointer
    #[clap(long, env = "PSCRIPT_FAILSAFE_INTERVAL_MS", default_value_t = DEFAULT_FAILSAFE_INTERVAL_MS)]
    failsafe_interval_ms: u64,

    /// Distance in pixels from a screen corner that triggers the failsafe
    #[clap(long, env = "PSCRIPT_FAILSAFE_MARGIN", default_value_t = DEFAULT_FAILSAFE_MARGIN)]
    failsafe_margin: f64,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Script file (.psc)
    script: PathBuf,

    #[command(flatten)]
    plugins: PluginArgs,

    /// Record launches and keystrokes instead of performing them; plugin
    /// programs are logged but not started
    #[clap(long, env = "PSCRIPT_DRY_RUN")]
    dry_run: bool,

    /// Disable the pointer-in-corner abort
    #[clap(long, env = "PSCRIPT_NO_FAILSAFE")]
    no_failsafe: bool,

    /// Print the session report, log and plugin report as JSON
    #[clap(long, env = "PSCRIPT_JSON")]
    json: bool,

    #[command(flatten)]
    timing: TimingArgs,
}

impl RunArgs {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            executor: ExecutorConfig {
                open_settle_ms: self.timing.open_settle_ms,
                type_settle_ms: self.timing.type_settle_ms,
                key_interval_ms: self.timing.key_interval_ms,
                dry_run: self.dry_run,
            },
            failsafe: FailsafeConfig {
                enabled: !self.no_failsafe,
                interval_ms: self.timing.failsafe_interval_ms,
                margin: self.timing.failsafe_margin,
            },
        }
    }
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Script file (.psc)
    script: PathBuf,

    #[command(flatten)]
    plugins: PluginArgs,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    script: String,
    report: &'a SessionReport,
    plugins: &'a PluginReport,
    log: Vec<LogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    activity: Option<SimulatedActivity>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Run(args) => run_script(args).await,
        Commands::Check(args) => check_script(args),
        Commands::Commands(args) => list_commands(args),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Engine with the sample plugin and, if given, the plugins directory.
fn engine(plugins: &PluginArgs, config: EngineConfig) -> EngineBuilder {
    let builder = EngineBuilder::new()
        .config(config)
        .plugin(Box::new(SamplePlugin));
    match &plugins.plugins {
        Some(dir) => builder.plugins_dir(dir),
        None => builder,
    }
}

async fn run_script(args: RunArgs) -> Result<i32> {
    let source = read_script(&args.script)
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;

    let simulated = args.dry_run.then(SimulatedDriver::new);
    let driver: Arc<dyn AutomationDriver> = match &simulated {
        Some(driver) => Arc::new(driver.clone()),
        None => create_driver(false),
    };

    // JSON mode keeps stdout for the final document.
    let capture = CaptureLogger::new();
    let logger: Arc<dyn ScriptLogger> = if args.json {
        Arc::new(capture.clone())
    } else {
        Arc::new(StdoutLogger)
    };

    let (runner, plugins) = engine(&args.plugins, args.engine_config())
        .driver(driver)
        .logger(logger)
        .build();
    let runner = Arc::new(runner);

    if !args.json {
        output::print_plugin_report(&plugins);
        if args.dry_run {
            println!("{}", "Dry run: no applications or keystrokes will be sent".yellow());
        }
    }

    let mut session = tokio::spawn({
        let runner = runner.clone();
        async move { runner.run(&source).await }
    });

    let report = loop {
        tokio::select! {
            joined = &mut session => break joined.context("Script task failed")?,
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                if runner.request_abort() {
                    warn!("Ctrl-C received, stopping at the next command");
                } else {
                    debug!("Ctrl-C received with no running session");
                }
            }
        }
    };

    if args.json {
        let document = RunOutput {
            script: args.script.display().to_string(),
            report: &report,
            plugins: &plugins,
            log: capture.entries(),
            activity: simulated.map(|driver| driver.activity()),
        };
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        output::print_session_report(&report);
        if let Some(driver) = &simulated {
            let activity = driver.activity();
            println!("  launched: {:?}", activity.launched);
            println!("  typed: {:?}", activity.typed);
        }
    }

    Ok(exit_code(&report.outcome))
}

fn exit_code(outcome: &SessionOutcome) -> i32 {
    match outcome {
        SessionOutcome::Finished | SessionOutcome::Stopped { .. } => 0,
        SessionOutcome::Aborted { .. } => 130,
        SessionOutcome::Faulted { .. } => 2,
        SessionOutcome::Rejected => 1,
    }
}

/// What would go wrong if `command` were run, without running it.
fn check_command(command: &Command, known: &[String]) -> Option<String> {
    if !known.contains(&command.name) {
        return Some(format!("unknown command '{}'", command.name));
    }
    match command.name.as_str() {
        "wait" => parse_seconds(&command.argument).err().map(|e| e.to_string()),
        "open" | "close" => {
            let app = command.argument.trim().to_lowercase();
            applications::lookup(&app)
                .is_none()
                .then(|| format!("unknown application '{app}'"))
        }
        "type" => keyboard::keystrokes(&keyboard::substitute_literals(&command.argument))
            .err()
            .map(|ch| format!("cannot type character {ch:?}")),
        _ => None,
    }
}

fn check_script(args: CheckArgs) -> Result<i32> {
    let source = read_script(&args.script)
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;

    let (runner, _plugins) = engine(&args.plugins, EngineConfig::default())
        .driver(Arc::new(SimulatedDriver::new()))
        .logger(Arc::new(StdoutLogger))
        .build();

    let commands = parse_script(&source);
    let mut problems = 0;
    for command in &commands {
        match check_command(command, runner.commands()) {
            Some(problem) => {
                problems += 1;
                println!(
                    "{} {:>4}  {}  {}",
                    "✗".red(),
                    command.line_number,
                    command,
                    problem.red()
                );
            }
            None => println!("{} {:>4}  {}", "✓".green(), command.line_number, command),
        }
    }

    println!();
    if problems == 0 {
        println!("{} {} commands", "VALID".green().bold(), commands.len());
        Ok(0)
    } else {
        println!(
            "{} {} of {} commands have problems",
            "INVALID".red().bold(),
            problems,
            commands.len()
        );
        Ok(1)
    }
}

fn list_commands(args: PluginArgs) -> Result<i32> {
    let (runner, plugins) = engine(&args, EngineConfig::default())
        .driver(Arc::new(SimulatedDriver::new()))
        .logger(Arc::new(StdoutLogger))
        .build();

    println!("{}", "Commands:".bold());
    for name in runner.commands() {
        if BUILTIN_COMMANDS.contains(&name.as_str()) {
            println!("  {name}");
        } else {
            println!("  {} {}", name, "(plugin)".dimmed());
        }
    }
    output::print_plugin_report(&plugins);
    Ok(0)
}
