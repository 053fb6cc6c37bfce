//! Command set extensions.
//!
//! A plugin is anything that implements [`Plugin`]: compiled-in plugins are
//! handed to the [`PluginManager`] directly, and external plugins are discovered
//! as subdirectories of a plugins folder that contain a `plugin.json` manifest.
//! Each manifest command runs an external program with the script argument.
//!
//! Loading is isolated per plugin: a plugin that fails to load or register is
//! logged and skipped, and the others still load. Commands a plugin registered
//! before failing stay registered.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::{PluginError, ScriptError};
use crate::executor::CommandContext;
use crate::logger::ScriptLogger;
use crate::registry::{CommandHandler, CommandRegistry, Flow};
use crate::runner::panic_message;

/// File a plugin directory must contain.
pub const MANIFEST_FILE: &str = "plugin.json";

pub trait Plugin: Send {
    fn name(&self) -> &str;

    /// Add commands to `registry`. This is the only thing a plugin may do.
    fn register(&self, registry: &mut CommandRegistry) -> Result<(), PluginError>;
}

/// Ships with the engine and adds `hello`.
pub struct SamplePlugin;

impl Plugin for SamplePlugin {
    fn name(&self) -> &str {
        "sample_plugin"
    }

    fn register(&self, registry: &mut CommandRegistry) -> Result<(), PluginError> {
        registry.register_fn("hello", |ctx, argument| {
            ctx.log(&format!("Hello from sample plugin! Args: {argument}"));
            Ok(Flow::Continue)
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    #[serde(default)]
    pub description: Option<String>,
    pub commands: Vec<ManifestCommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestCommand {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A plugin described by a `plugin.json` manifest.
#[derive(Debug, Clone)]
pub struct ManifestPlugin {
    name: String,
    directory: PathBuf,
    manifest: PluginManifest,
}

impl ManifestPlugin {
    /// Read the manifest in `directory`. The plugin is named after the directory.
    pub fn load(directory: &Path) -> Result<Self, PluginError> {
        let name = directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PluginError::InvalidManifest("plugin directory has no name".into()))?;

        let manifest_path = directory.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(PluginError::InvalidManifest(format!(
                "missing {MANIFEST_FILE}"
            )));
        }
        let content = std::fs::read_to_string(&manifest_path)?;
        let manifest: PluginManifest = serde_json::from_str(&content)?;

        Ok(Self {
            name,
            directory: directory.to_path_buf(),
            manifest,
        })
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn resolve_program(&self, program: &str) -> String {
        let path = Path::new(program);
        // Relative paths with a directory part are relative to the plugin folder;
        // bare names go through PATH.
        if path.is_relative() && path.components().count() > 1 {
            self.directory.join(path).to_string_lossy().into_owned()
        } else {
            program.to_string()
        }
    }
}

impl Plugin for ManifestPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self, registry: &mut CommandRegistry) -> Result<(), PluginError> {
        for command in &self.manifest.commands {
            let name = command.name.trim();
            if name.is_empty() || name.contains(char::is_whitespace) || name.starts_with('#') {
                return Err(PluginError::Registration(format!(
                    "invalid command name {:?}",
                    command.name
                )));
            }
            registry.register(
                name,
                Arc::new(ExternalCommand {
                    command: name.to_lowercase(),
                    program: self.resolve_program(&command.program),
                    args: command.args.clone(),
                    working_dir: self.directory.clone(),
                }),
            );
            debug!(plugin = %self.name, command = name, "Registered plugin command");
        }
        Ok(())
    }
}

/// Runs `program args... <argument>` in the plugin directory and logs its
/// standard output line by line.
pub struct ExternalCommand {
    command: String,
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

#[async_trait]
impl CommandHandler for ExternalCommand {
    async fn invoke(
        &self,
        ctx: &mut CommandContext<'_>,
        argument: &str,
    ) -> Result<Flow, ScriptError> {
        if ctx.config().dry_run {
            let mut command_line = vec![self.program.as_str()];
            command_line.extend(self.args.iter().map(String::as_str));
            if !argument.is_empty() {
                command_line.push(argument);
            }
            ctx.log(&format!("Dry run: skipped `{}`", command_line.join(" ")));
            return Ok(Flow::Continue);
        }

        let mut process = tokio::process::Command::new(&self.program);
        process
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if !argument.is_empty() {
            process.arg(argument);
        }

        let output = tokio::select! {
            output = process.output() => output.map_err(|e| {
                ScriptError::handler_failure(&self.command, format!("failed to run {}: {e}", self.program))
            })?,
            _ = ctx.cancellation().cancelled() => {
                debug!(command = %self.command, "Plugin command interrupted by abort");
                return Ok(Flow::Continue);
            }
        };

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            ctx.log(line);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScriptError::handler_failure(
                &self.command,
                format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }
        Ok(Flow::Continue)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PluginReport {
    pub loaded: Vec<String>,
    /// `(plugin name, error message)`
    pub failed: Vec<(String, String)>,
}

#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Box<dyn Plugin>>,
    loaded: bool,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a compiled-in plugin.
    pub fn with_plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Register compiled-in plugins, then discover plugins in `plugins_dir`.
    /// Runs once; later calls do nothing.
    pub fn load(
        &mut self,
        registry: &mut CommandRegistry,
        plugins_dir: Option<&Path>,
        logger: &dyn ScriptLogger,
    ) -> PluginReport {
        let mut report = PluginReport::default();
        if self.loaded {
            warn!("Plugins were already loaded; ignoring repeated load");
            return report;
        }
        self.loaded = true;

        for plugin in &self.plugins {
            install(plugin.as_ref(), registry, logger, &mut report);
        }
        if let Some(dir) = plugins_dir {
            discover_into(dir, registry, logger, &mut report);
        }
        report
    }

    /// Load every plugin found directly under `dir`.
    pub fn discover(
        &mut self,
        registry: &mut CommandRegistry,
        dir: &Path,
        logger: &dyn ScriptLogger,
    ) -> PluginReport {
        self.load(registry, Some(dir), logger)
    }
}

fn install(
    plugin: &dyn Plugin,
    registry: &mut CommandRegistry,
    logger: &dyn ScriptLogger,
    report: &mut PluginReport,
) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| plugin.register(registry)))
        .unwrap_or_else(|panic| Err(PluginError::Panicked(panic_message(panic.as_ref()))));
    match outcome {
        Ok(()) => {
            info!("Loaded plugin: {}", plugin.name());
            logger.log(&format!("Loaded plugin: {}", plugin.name()));
            report.loaded.push(plugin.name().to_string());
        }
        Err(e) => fail(plugin.name(), &e, logger, report),
    }
}

fn fail(name: &str, error: &PluginError, logger: &dyn ScriptLogger, report: &mut PluginReport) {
    warn!("Failed to load plugin {}: {}", name, error);
    logger.log(&format!("Failed to load plugin {name}: {error}"));
    report.failed.push((name.to_string(), error.to_string()));
}

fn discover_into(
    dir: &Path,
    registry: &mut CommandRegistry,
    logger: &dyn ScriptLogger,
    report: &mut PluginReport,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read plugins directory {}: {}", dir.display(), e);
            logger.log(&format!(
                "No plugins loaded from {}: {e}",
                dir.display()
            ));
            return;
        }
    };

    let mut directories: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    directories.sort();

    for directory in directories {
        match ManifestPlugin::load(&directory) {
            Ok(plugin) => install(&plugin, registry, logger, report),
            Err(e) => {
                let name = directory
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| directory.display().to_string());
                fail(&name, &e, logger, report);
            }
        }
    }
}
