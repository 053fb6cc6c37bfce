//! Command resolution and invocation.
//!
//! The executor owns the command registry, the platform driver and the table of
//! processes opened by `open`. Handlers receive a [`CommandContext`] that borrows
//! those pieces for the duration of one call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::commands;
use crate::config::ExecutorConfig;
use crate::errors::ScriptError;
use crate::logger::ScriptLogger;
use crate::platforms::{AppProcess, AutomationDriver};
use crate::registry::{CommandRegistry, Flow};

/// Processes started by `open`, keyed by lowercase logical application name.
#[derive(Default)]
pub struct ProcessTable {
    handles: HashMap<String, Box<dyn AppProcess>>,
}

impl ProcessTable {
    /// Track a process. Returns the handle previously stored under `name`, which
    /// is not terminated.
    pub fn insert(
        &mut self,
        name: &str,
        process: Box<dyn AppProcess>,
    ) -> Option<Box<dyn AppProcess>> {
        self.handles.insert(name.to_string(), process)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn AppProcess>> {
        self.handles.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Box<dyn AppProcess>> {
        self.handles.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handles.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Everything a handler may touch during one invocation.
pub struct CommandContext<'a> {
    command: &'a str,
    driver: &'a dyn AutomationDriver,
    processes: &'a mut ProcessTable,
    logger: &'a dyn ScriptLogger,
    config: &'a ExecutorConfig,
    cancel: &'a CancellationToken,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        command: &'a str,
        driver: &'a dyn AutomationDriver,
        processes: &'a mut ProcessTable,
        logger: &'a dyn ScriptLogger,
        config: &'a ExecutorConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            command,
            driver,
            processes,
            logger,
            config,
            cancel,
        }
    }

    /// Name of the command being executed.
    pub fn command(&self) -> &str {
        self.command
    }

    pub fn driver(&self) -> &dyn AutomationDriver {
        self.driver
    }

    pub fn processes(&mut self) -> &mut ProcessTable {
        &mut *self.processes
    }

    pub fn config(&self) -> &ExecutorConfig {
        self.config
    }

    pub fn log(&self, message: &str) {
        self.logger.log(message);
    }

    /// The session's abort token.
    pub fn cancellation(&self) -> &CancellationToken {
        self.cancel
    }

    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleep without blocking the runtime. Returns `false` if the session was
    /// aborted before the duration elapsed.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if duration.is_zero() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancel.cancelled() => false,
        }
    }
}

pub struct Executor {
    registry: CommandRegistry,
    driver: Arc<dyn AutomationDriver>,
    processes: ProcessTable,
    config: ExecutorConfig,
}

impl Executor {
    /// Build an executor on top of `registry`. The built-in commands are
    /// registered last, so they take precedence over plugin commands.
    pub fn new(
        mut registry: CommandRegistry,
        driver: Arc<dyn AutomationDriver>,
        config: ExecutorConfig,
    ) -> Self {
        commands::register_builtins(&mut registry);
        debug!(commands = ?registry.list_names(), "Executor ready");
        Self {
            registry,
            driver,
            processes: ProcessTable::default(),
            config,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn driver(&self) -> Arc<dyn AutomationDriver> {
        self.driver.clone()
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Names of applications with a tracked process handle.
    pub fn open_processes(&self) -> Vec<String> {
        self.processes.names()
    }

    /// Resolve `name` and invoke its handler.
    #[instrument(level = "debug", skip(self, logger, cancel))]
    pub async fn execute(
        &mut self,
        name: &str,
        argument: &str,
        logger: &dyn ScriptLogger,
        cancel: &CancellationToken,
    ) -> Result<Flow, ScriptError> {
        let handler = self
            .registry
            .resolve(name)
            .ok_or_else(|| ScriptError::UnknownCommand(name.to_lowercase()))?;

        let mut ctx = CommandContext::new(
            name,
            self.driver.as_ref(),
            &mut self.processes,
            logger,
            &self.config,
            cancel,
        );
        handler.invoke(&mut ctx, argument).await
    }
}
