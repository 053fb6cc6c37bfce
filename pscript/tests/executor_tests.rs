use pscript::commands::BUILTIN_COMMANDS;
use pscript::{
    CaptureLogger, CommandRegistry, Executor, ExecutorConfig, Flow, ScriptError, SimulatedDriver,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn executor(driver: &SimulatedDriver, registry: CommandRegistry) -> Executor {
    Executor::new(
        registry,
        Arc::new(driver.clone()),
        ExecutorConfig::immediate(),
    )
}

#[test]
fn test_builtins_are_registered() {
    let driver = SimulatedDriver::new();
    let executor = executor(&driver, CommandRegistry::new());
    assert_eq!(executor.registry().list_names(), BUILTIN_COMMANDS);
}

#[tokio::test]
async fn test_unknown_command_error_carries_lowercase_name() {
    let driver = SimulatedDriver::new();
    let mut executor = executor(&driver, CommandRegistry::new());
    let logger = CaptureLogger::new();

    let err = executor
        .execute("DANCE", "", &logger, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ScriptError::UnknownCommand(ref name) if name == "dance"));
    assert_eq!(err.to_string(), "Unknown command: dance");
}

#[tokio::test]
async fn test_exit_returns_exit_flow() {
    let driver = SimulatedDriver::new();
    let mut executor = executor(&driver, CommandRegistry::new());
    let logger = CaptureLogger::new();

    let flow = executor
        .execute("exit", "", &logger, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(flow, Flow::Exit);
}

#[tokio::test]
async fn test_cancelled_token_skips_typing() {
    let driver = SimulatedDriver::new();
    let mut executor = Executor::new(
        CommandRegistry::new(),
        Arc::new(driver.clone()),
        ExecutorConfig {
            type_settle_ms: 10,
            ..ExecutorConfig::immediate()
        },
    );
    let logger = CaptureLogger::new();
    let token = CancellationToken::new();
    token.cancel();

    let flow = executor
        .execute("type", "hello", &logger, &token)
        .await
        .unwrap();

    assert_eq!(flow, Flow::Continue);
    assert_eq!(driver.typed(), "");
}

#[tokio::test]
async fn test_open_records_handle_and_focuses_window() {
    let driver = SimulatedDriver::new();
    let mut executor = executor(&driver, CommandRegistry::new());
    let logger = CaptureLogger::new();

    executor
        .execute("open", "Calculator", &logger, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(executor.open_processes(), vec!["calculator"]);
    assert_eq!(driver.focus_requests(), vec!["Calculator"]);
    assert_eq!(logger.lines(), vec!["Opened calculator", "Focused calculator window"]);
}

#[tokio::test]
async fn test_open_without_name_is_invalid() {
    let driver = SimulatedDriver::new();
    let mut executor = executor(&driver, CommandRegistry::new());
    let logger = CaptureLogger::new();

    let err = executor
        .execute("open", "  ", &logger, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "InvalidArgument");
    assert!(driver.launched().is_empty());
}
