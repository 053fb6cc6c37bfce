//! The run loop.
//!
//! `Idle → Running → {Finished | Aborted | Stopped | Faulted} → Idle`. Only one
//! session runs at a time. Per-command failures are logged and dispatch goes
//! on; only `exit`, an abort request or a panic end a session early.

use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::FailsafeConfig;
use crate::executor::Executor;
use crate::failsafe::Failsafe;
use crate::logger::ScriptLogger;
use crate::parser::{parse_script, Command};
use crate::registry::Flow;

pub const BUSY_MESSAGE: &str = "Script is already running. Please wait.";

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Every command was dispatched.
    Finished,
    /// An abort was observed before dispatching the command on `line`, or
    /// while `line` was the last command running.
    Aborted { line: usize },
    /// `exit` on `line` ended the session.
    Stopped { line: usize },
    /// The dispatch loop panicked.
    Faulted { message: String },
    /// Another session was already running; nothing was dispatched.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    /// Commands handed to the executor, including failed ones.
    pub dispatched: usize,
    pub failures: usize,
    pub elapsed_ms: u64,
}

#[derive(Default)]
struct Tally {
    dispatched: usize,
    failures: usize,
}

/// Clears the session state however the run ends.
struct SessionGuard<'a> {
    running: &'a AtomicBool,
    abort: &'a Mutex<Option<CancellationToken>>,
    failsafe: Option<Failsafe>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        // Dropping the watchdog stops it.
        self.failsafe.take();
        self.abort
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.running.store(false, Ordering::SeqCst);
    }
}

pub struct ScriptRunner {
    executor: tokio::sync::Mutex<Executor>,
    logger: Arc<dyn ScriptLogger>,
    failsafe: FailsafeConfig,
    command_names: Vec<String>,
    running: AtomicBool,
    abort: Mutex<Option<CancellationToken>>,
}

impl ScriptRunner {
    pub fn new(executor: Executor, logger: Arc<dyn ScriptLogger>, failsafe: FailsafeConfig) -> Self {
        let command_names = executor.registry().list_names();
        Self {
            executor: tokio::sync::Mutex::new(executor),
            logger,
            failsafe,
            command_names,
            running: AtomicBool::new(false),
            abort: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Names of every command the executor can resolve.
    pub fn commands(&self) -> &[String] {
        &self.command_names
    }

    pub fn logger(&self) -> Arc<dyn ScriptLogger> {
        self.logger.clone()
    }

    /// Applications with a tracked process handle.
    pub async fn open_processes(&self) -> Vec<String> {
        self.executor.lock().await.open_processes()
    }

    /// Ask the running session to stop at the next command boundary. Returns
    /// `false` when no session is running.
    pub fn request_abort(&self) -> bool {
        match self.abort_slot().as_ref() {
            Some(token) => {
                info!("Abort requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn abort_slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.abort.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parse and run `source`. Never fails: every problem ends up in the log
    /// and the returned report.
    pub async fn run(&self, source: &str) -> SessionReport {
        let started = Instant::now();

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Rejected run request: a script is already running");
            self.logger.log(BUSY_MESSAGE);
            return SessionReport {
                outcome: SessionOutcome::Rejected,
                dispatched: 0,
                failures: 0,
                elapsed_ms: 0,
            };
        }

        // Built before the first await so a dropped future still resets the state.
        let mut guard = SessionGuard {
            running: &self.running,
            abort: &self.abort,
            failsafe: None,
        };
        let token = CancellationToken::new();
        *self.abort_slot() = Some(token.clone());

        let mut executor = self.executor.lock().await;
        if self.failsafe.enabled {
            guard.failsafe = Some(Failsafe::spawn(
                executor.driver(),
                token.clone(),
                self.logger.clone(),
                &self.failsafe,
            ));
        }

        let commands = parse_script(source);
        info!(commands = commands.len(), "Starting script session");
        self.logger.log("Starting script execution...");

        let mut tally = Tally::default();
        let dispatch = self.dispatch(&mut executor, &commands, &token, &mut tally);
        let outcome = match AssertUnwindSafe(dispatch).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Script session panicked: {}", message);
                self.logger
                    .log(&format!("Script execution failed unexpectedly: {message}"));
                SessionOutcome::Faulted { message }
            }
        };

        let report = SessionReport {
            outcome,
            dispatched: tally.dispatched,
            failures: tally.failures,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(outcome = ?report.outcome, dispatched = report.dispatched, failures = report.failures, "Script session ended");
        report
    }

    async fn dispatch(
        &self,
        executor: &mut Executor,
        commands: &[Command],
        token: &CancellationToken,
        tally: &mut Tally,
    ) -> SessionOutcome {
        for command in commands {
            if token.is_cancelled() {
                self.logger.log(&format!(
                    "Script execution aborted before line {}.",
                    command.line_number
                ));
                return SessionOutcome::Aborted {
                    line: command.line_number,
                };
            }

            self.logger
                .log(&format!("> Line {}: {}", command.line_number, command));
            tally.dispatched += 1;

            match executor
                .execute(&command.name, &command.argument, self.logger.as_ref(), token)
                .await
            {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => {
                    self.logger
                        .log("Exit command received. Stopping script.");
                    return SessionOutcome::Stopped {
                        line: command.line_number,
                    };
                }
                Err(e) => {
                    tally.failures += 1;
                    warn!(command = %command.name, line = command.line_number, kind = e.kind(), "{}", e);
                    self.logger.log(&format!(
                        "Error executing command '{}' (line {}): {} [{}]",
                        command.name,
                        command.line_number,
                        e,
                        e.kind()
                    ));
                }
            }
        }

        // An abort that lands during the final command still counts.
        if let (true, Some(last)) = (token.is_cancelled(), commands.last()) {
            self.logger.log(&format!(
                "Script execution aborted during line {}.",
                last.line_number
            ));
            return SessionOutcome::Aborted {
                line: last.line_number,
            };
        }

        self.logger.log(&format!(
            "Script execution finished: {} commands, {} failed.",
            tally.dispatched, tally.failures
        ));
        SessionOutcome::Finished
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutorConfig;
    use crate::logger::CaptureLogger;
    use crate::platforms::SimulatedDriver;
    use crate::registry::CommandRegistry;
    use std::time::Duration;

    fn runner() -> ScriptRunner {
        let executor = Executor::new(
            CommandRegistry::new(),
            Arc::new(SimulatedDriver::new()),
            ExecutorConfig::immediate(),
        );
        ScriptRunner::new(
            executor,
            Arc::new(CaptureLogger::new()),
            FailsafeConfig::disabled(),
        )
    }

    #[tokio::test]
    async fn test_dropped_run_while_waiting_for_executor_resets_state() {
        let runner = runner();
        let held = runner.executor.lock().await;

        let pending = tokio::time::timeout(Duration::from_millis(20), runner.run("wait 0")).await;
        assert!(pending.is_err());
        drop(held);

        assert!(!runner.is_running());
        assert!(!runner.request_abort());
        let report = runner.run("wait 0").await;
        assert_eq!(report.outcome, SessionOutcome::Finished);
    }

    #[test]
    fn test_panic_message_extracts_text() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
