//! Line-oriented desktop automation scripts
//!
//! A script is plain text with one command per line (`open notepad`,
//! `type hello/e`, `wait 1.5`, `close notepad`, `exit`). This crate parses
//! scripts, resolves commands through an extensible registry, performs their
//! side effects through a platform driver and sequences them in a run loop that
//! can be aborted at any command boundary, either explicitly or by moving the
//! pointer into a screen corner.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

pub mod applications;
pub mod commands;
pub mod config;
pub mod errors;
pub mod executor;
pub mod failsafe;
pub mod keyboard;
pub mod logger;
pub mod parser;
pub mod platforms;
pub mod plugins;
pub mod registry;
pub mod runner;

pub use config::{EngineConfig, ExecutorConfig, FailsafeConfig};
pub use errors::{PluginError, ScriptError};
pub use executor::{CommandContext, Executor, ProcessTable};
pub use logger::{CaptureLogger, LogEntry, ScriptLogger, TracingLogger};
pub use parser::{parse_line, parse_script, read_script, Command};
pub use platforms::{create_driver, AppProcess, AutomationDriver, SimulatedDriver, SystemDriver};
pub use plugins::{Plugin, PluginManager, PluginReport, SamplePlugin};
pub use registry::{CommandHandler, CommandRegistry, Flow};
pub use runner::{ScriptRunner, SessionOutcome, SessionReport};

/// Wires plugins, the executor and the run loop together.
///
/// ```no_run
/// # async fn demo() {
/// use pscript::{EngineBuilder, SamplePlugin};
///
/// let (runner, _plugins) = EngineBuilder::new()
///     .plugin(Box::new(SamplePlugin))
///     .plugins_dir("plugins")
///     .build();
/// runner.run("hello world\nwait 0.5").await;
/// # }
/// ```
pub struct EngineBuilder {
    config: EngineConfig,
    driver: Option<Arc<dyn AutomationDriver>>,
    logger: Option<Arc<dyn ScriptLogger>>,
    manager: PluginManager,
    plugins_dir: Option<PathBuf>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            driver: None,
            logger: None,
            manager: PluginManager::new(),
            plugins_dir: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to the host driver.
    pub fn driver(mut self, driver: Arc<dyn AutomationDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Defaults to [`TracingLogger`].
    pub fn logger(mut self, logger: Arc<dyn ScriptLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.manager = self.manager.with_plugin(plugin);
        self
    }

    /// Directory scanned for `plugin.json` plugins.
    pub fn plugins_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.plugins_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Load plugins, then build the executor so built-ins are registered last.
    #[instrument(level = "debug", skip(self))]
    pub fn build(mut self) -> (ScriptRunner, PluginReport) {
        let driver = self.driver.unwrap_or_else(|| create_driver(false));
        let logger = self.logger.unwrap_or_else(|| Arc::new(TracingLogger));

        let mut registry = CommandRegistry::new();
        let report = self
            .manager
            .load(&mut registry, self.plugins_dir.as_deref(), logger.as_ref());

        let executor = Executor::new(registry, driver, self.config.executor);
        let runner = ScriptRunner::new(executor, logger, self.config.failsafe);
        info!(
            commands = runner.commands().len(),
            plugins = report.loaded.len(),
            "Script engine ready"
        );
        (runner, report)
    }
}
