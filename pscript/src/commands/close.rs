use async_trait::async_trait;

use crate::errors::ScriptError;
use crate::executor::CommandContext;
use crate::registry::{CommandHandler, Flow};

pub struct CloseCommand;

#[async_trait]
impl CommandHandler for CloseCommand {
    async fn invoke(
        &self,
        ctx: &mut CommandContext<'_>,
        argument: &str,
    ) -> Result<Flow, ScriptError> {
        let app_name = argument.trim().to_lowercase();

        let Some(process) = ctx.processes().get_mut(&app_name) else {
            return Err(ScriptError::NotRunning(app_name));
        };
        process
            .terminate()
            .await
            .map_err(|e| ScriptError::handler_failure("close", e.to_string()))?;

        ctx.processes().remove(&app_name);
        ctx.log(&format!("Closed {app_name}"));
        Ok(Flow::Continue)
    }
}
