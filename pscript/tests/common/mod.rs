#![allow(dead_code)]

use pscript::{
    CaptureLogger, CommandRegistry, EngineBuilder, EngineConfig, ExecutorConfig, FailsafeConfig,
    Flow, Plugin, PluginError, PluginReport, ScriptRunner, SimulatedDriver,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub struct Harness {
    pub runner: Arc<ScriptRunner>,
    pub driver: SimulatedDriver,
    pub logger: CaptureLogger,
    pub plugins: PluginReport,
}

/// No delays and no watchdog.
pub fn quiet_config() -> EngineConfig {
    EngineConfig {
        executor: ExecutorConfig::immediate(),
        failsafe: FailsafeConfig::disabled(),
    }
}

pub fn harness() -> Harness {
    harness_with(|builder| builder)
}

/// Route engine tracing into the test output; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn harness_with(configure: impl FnOnce(EngineBuilder) -> EngineBuilder) -> Harness {
    init_tracing();
    let driver = SimulatedDriver::new();
    let logger = CaptureLogger::new();
    let builder = EngineBuilder::new()
        .config(quiet_config())
        .driver(Arc::new(driver.clone()))
        .logger(Arc::new(logger.clone()));
    let (runner, plugins) = configure(builder).build();
    Harness {
        runner: Arc::new(runner),
        driver,
        logger,
        plugins,
    }
}

/// Poll until some log line contains `needle`.
pub async fn wait_for_log(logger: &CaptureLogger, needle: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while logger.count_containing(needle) == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no log line containing {needle:?}: {:?}", logger.lines()));
}

/// Registers `stop`, which aborts the session from inside a handler, and
/// `boom`, which panics.
pub struct TestHooks;

impl Plugin for TestHooks {
    fn name(&self) -> &str {
        "test_hooks"
    }

    fn register(&self, registry: &mut CommandRegistry) -> Result<(), PluginError> {
        registry.register_fn("stop", |ctx, _| {
            ctx.cancellation().cancel();
            Ok(Flow::Continue)
        });
        registry.register_fn("boom", |_, argument| panic!("boom: {argument}"));
        Ok(())
    }
}

/// Panics while registering.
pub struct PanickingPlugin;

impl Plugin for PanickingPlugin {
    fn name(&self) -> &str {
        "panicking"
    }

    fn register(&self, _registry: &mut CommandRegistry) -> Result<(), PluginError> {
        panic!("plugin exploded");
    }
}

/// Registers one command, then fails.
pub struct FailingPlugin;

impl Plugin for FailingPlugin {
    fn name(&self) -> &str {
        "failing"
    }

    fn register(&self, registry: &mut CommandRegistry) -> Result<(), PluginError> {
        registry.register_fn("half", |ctx, _| {
            ctx.log("half registered");
            Ok(Flow::Continue)
        });
        Err(PluginError::Registration("refusing to finish".into()))
    }
}
