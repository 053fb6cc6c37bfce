//! Built-in commands: `wait`, `open`, `close`, `type` and `exit`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::ScriptError;
use crate::executor::CommandContext;
use crate::registry::{CommandHandler, CommandRegistry, Flow};

mod close;
mod open;
mod type_text;
mod wait;

pub use close::CloseCommand;
pub use open::OpenCommand;
pub use type_text::TypeCommand;
pub use wait::{parse_seconds, WaitCommand};

pub const BUILTIN_COMMANDS: &[&str] = &["close", "exit", "open", "type", "wait"];

pub struct ExitCommand;

#[async_trait]
impl CommandHandler for ExitCommand {
    async fn invoke(
        &self,
        _ctx: &mut CommandContext<'_>,
        _argument: &str,
    ) -> Result<Flow, ScriptError> {
        Ok(Flow::Exit)
    }
}

pub(crate) fn register_builtins(registry: &mut CommandRegistry) {
    registry.register("wait", Arc::new(WaitCommand));
    registry.register("open", Arc::new(OpenCommand));
    registry.register("close", Arc::new(CloseCommand));
    registry.register("type", Arc::new(TypeCommand));
    registry.register("exit", Arc::new(ExitCommand));
}
