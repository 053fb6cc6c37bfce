mod common;

use common::{harness_with, quiet_config, FailingPlugin, PanickingPlugin};
use pscript::{CommandRegistry, Flow, Plugin, PluginError, SamplePlugin, SessionOutcome};
use std::fs;
use std::path::Path;

fn write_manifest(root: &Path, plugin: &str, manifest: &str) {
    let dir = root.join(plugin);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("plugin.json"), manifest).unwrap();
}

struct ShadowingPlugin;

impl Plugin for ShadowingPlugin {
    fn name(&self) -> &str {
        "shadowing"
    }

    fn register(&self, registry: &mut CommandRegistry) -> Result<(), PluginError> {
        registry.register_fn("wait", |ctx, _| {
            ctx.log("plugin wait");
            Ok(Flow::Continue)
        });
        Ok(())
    }
}

#[tokio::test]
async fn test_sample_plugin_adds_hello() {
    let h = harness_with(|builder| builder.plugin(Box::new(SamplePlugin)));

    assert_eq!(h.plugins.loaded, vec!["sample_plugin"]);
    assert!(h.runner.commands().iter().any(|name| name == "hello"));

    let report = h.runner.run("Hello big world").await;

    assert_eq!(report.outcome, SessionOutcome::Finished);
    assert_eq!(
        h.logger
            .count_containing("Hello from sample plugin! Args: big world"),
        1
    );
}

#[tokio::test]
async fn test_builtins_take_precedence_over_plugins() {
    let h = harness_with(|builder| builder.plugin(Box::new(ShadowingPlugin)));

    h.runner.run("wait 0").await;

    assert_eq!(h.logger.count_containing("plugin wait"), 0);
    assert_eq!(h.logger.count_containing("Waiting for 0 seconds..."), 1);
}

#[tokio::test]
async fn test_failing_plugin_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(
        dir.path(),
        "a_good",
        r#"{"commands": [{"name": "greet", "program": "echo"}]}"#,
    );
    write_manifest(dir.path(), "b_broken", "{ not json");
    write_manifest(
        dir.path(),
        "c_also_good",
        r#"{"commands": [{"name": "wave", "program": "echo"}]}"#,
    );
    let plugins = dir.path().to_path_buf();

    let h = harness_with(|builder| {
        builder
            .plugin(Box::new(FailingPlugin))
            .plugin(Box::new(SamplePlugin))
            .plugins_dir(plugins)
    });

    assert_eq!(
        h.plugins.loaded,
        vec!["sample_plugin", "a_good", "c_also_good"]
    );
    let failed: Vec<&str> = h.plugins.failed.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(failed, vec!["failing", "b_broken"]);

    assert_eq!(h.logger.count_containing("Failed to load plugin b_broken"), 1);
    assert_eq!(h.logger.count_containing("Failed to load plugin failing"), 1);
    assert_eq!(h.logger.count_containing("Failed to load plugin"), 2);

    for name in ["hello", "greet", "wave"] {
        assert!(h.runner.commands().iter().any(|c| c == name), "{name} missing");
    }
}

#[tokio::test]
async fn test_partial_registration_is_kept() {
    let h = harness_with(|builder| builder.plugin(Box::new(FailingPlugin)));

    assert_eq!(h.plugins.failed.len(), 1);
    h.runner.run("half").await;
    assert_eq!(h.logger.count_containing("half registered"), 1);
}

#[tokio::test]
async fn test_invalid_command_name_fails_manifest_plugin() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(
        dir.path(),
        "spaced",
        r#"{"commands": [{"name": "fine", "program": "echo"}, {"name": "two words", "program": "echo"}]}"#,
    );
    let plugins = dir.path().to_path_buf();

    let h = harness_with(|builder| builder.plugins_dir(plugins));

    assert!(h.plugins.loaded.is_empty());
    assert_eq!(h.plugins.failed.len(), 1);
    assert!(h.plugins.failed[0].1.contains("two words"));
    assert!(h.runner.commands().iter().any(|c| c == "fine"));
}

#[tokio::test]
async fn test_plain_files_and_empty_dirs_in_plugins_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("README.txt"), "not a plugin").unwrap();
    fs::create_dir_all(dir.path().join("no_manifest")).unwrap();
    let plugins = dir.path().to_path_buf();

    let h = harness_with(|builder| builder.plugins_dir(plugins));

    assert!(h.plugins.loaded.is_empty());
    assert_eq!(h.plugins.failed.len(), 1);
    assert_eq!(h.plugins.failed[0].0, "no_manifest");
}

#[tokio::test]
async fn test_missing_plugins_dir_is_reported_once() {
    let h = harness_with(|builder| builder.plugins_dir("/no/such/plugins/dir"));

    assert!(h.plugins.loaded.is_empty());
    assert!(h.plugins.failed.is_empty());
    assert_eq!(h.logger.count_containing("No plugins loaded from"), 1);
    assert_eq!(h.runner.commands().len(), 5);
}

#[cfg(unix)]
#[tokio::test]
async fn test_manifest_command_logs_program_output() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(
        dir.path(),
        "echo",
        r#"{"commands": [{"name": "say", "program": "echo", "args": ["plugin says"]}]}"#,
    );
    let plugins = dir.path().to_path_buf();
    let h = harness_with(|builder| builder.plugins_dir(plugins));

    let report = h.runner.run("say hi there").await;

    assert_eq!(report.failures, 0);
    assert_eq!(h.logger.count_containing("plugin says hi there"), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_manifest_command_failure_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(
        dir.path(),
        "broken_tool",
        r#"{"commands": [{"name": "fail", "program": "false"}]}"#,
    );
    let plugins = dir.path().to_path_buf();
    let h = harness_with(|builder| builder.plugins_dir(plugins));

    let report = h.runner.run("fail\ntype ok").await;

    assert_eq!(report.outcome, SessionOutcome::Finished);
    assert_eq!(report.failures, 1);
    assert_eq!(h.logger.count_containing("[HandlerFailure]"), 1);
    assert_eq!(h.driver.typed(), "ok");
}

#[tokio::test]
async fn test_panicking_plugin_is_isolated() {
    let h = harness_with(|builder| {
        builder
            .plugin(Box::new(PanickingPlugin))
            .plugin(Box::new(SamplePlugin))
    });

    assert_eq!(h.plugins.loaded, vec!["sample_plugin"]);
    assert_eq!(h.plugins.failed.len(), 1);
    assert_eq!(h.plugins.failed[0].0, "panicking");
    assert!(h.plugins.failed[0].1.contains("plugin exploded"));
    assert_eq!(h.logger.count_containing("Failed to load plugin"), 1);
    assert_eq!(h.logger.count_containing("Failed to load plugin panicking"), 1);

    let report = h.runner.run("hello again").await;
    assert_eq!(report.outcome, SessionOutcome::Finished);
    assert_eq!(
        h.logger
            .count_containing("Hello from sample plugin! Args: again"),
        1
    );
}

#[tokio::test]
async fn test_dry_run_skips_plugin_programs() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(
        dir.path(),
        "tools",
        r#"{"commands": [{"name": "fail", "program": "definitely-not-a-program", "args": ["-x"]}]}"#,
    );
    let plugins = dir.path().to_path_buf();
    let mut config = quiet_config();
    config.executor.dry_run = true;

    let h = harness_with(|builder| builder.config(config).plugins_dir(plugins));

    let report = h.runner.run("fail now").await;

    assert_eq!(report.outcome, SessionOutcome::Finished);
    assert_eq!(report.failures, 0);
    assert_eq!(
        h.logger
            .count_containing("Dry run: skipped `definitely-not-a-program -x now`"),
        1
    );
}
