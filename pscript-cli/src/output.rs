use colored::*;
use pscript::{PluginReport, ScriptLogger, SessionOutcome, SessionReport};

/// Prints script log lines to stdout, colored by what they report.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutLogger;

impl ScriptLogger for StdoutLogger {
    fn log(&self, message: &str) {
        let line = if message.starts_with("> Line") {
            message.cyan()
        } else if message.starts_with("Error executing") || message.starts_with("Failed") {
            message.red()
        } else if message.contains("aborted") || message.contains("already running") {
            message.yellow().bold()
        } else if message.starts_with("Exit command") || message.starts_with("Script execution finished") {
            message.green()
        } else {
            message.normal()
        };
        println!("{line}");
    }
}

pub fn print_plugin_report(report: &PluginReport) {
    if report.loaded.is_empty() && report.failed.is_empty() {
        return;
    }
    println!(
        "{} {} loaded, {} failed",
        "Plugins:".bold(),
        report.loaded.len(),
        report.failed.len()
    );
}

pub fn print_session_report(report: &SessionReport) {
    let status = match &report.outcome {
        SessionOutcome::Finished => "FINISHED".green().bold(),
        SessionOutcome::Stopped { line } => format!("STOPPED (exit on line {line})").green().bold(),
        SessionOutcome::Aborted { line } => format!("ABORTED (before line {line})").yellow().bold(),
        SessionOutcome::Faulted { message } => format!("FAULTED: {message}").red().bold(),
        SessionOutcome::Rejected => "REJECTED".red().bold(),
    };
    println!();
    println!("{status}");
    println!(
        "  {} dispatched, {} failed, {:.2}s",
        report.dispatched,
        if report.failures > 0 {
            report.failures.to_string().red()
        } else {
            report.failures.to_string().normal()
        },
        report.elapsed_ms as f64 / 1000.0
    );
}
