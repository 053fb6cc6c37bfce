use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::applications;
use crate::errors::ScriptError;
use crate::executor::CommandContext;
use crate::registry::{CommandHandler, Flow};

pub struct OpenCommand;

#[async_trait]
impl CommandHandler for OpenCommand {
    #[instrument(level = "debug", skip(self, ctx))]
    async fn invoke(
        &self,
        ctx: &mut CommandContext<'_>,
        argument: &str,
    ) -> Result<Flow, ScriptError> {
        let app_name = argument.trim().to_lowercase();
        if app_name.is_empty() {
            return Err(ScriptError::invalid_argument(
                "open",
                "an application name is required",
            ));
        }

        let target = applications::lookup(&app_name)
            .ok_or_else(|| ScriptError::UnknownApplication(app_name.clone()))?;

        let process = ctx
            .driver()
            .launch(target)
            .map_err(|e| ScriptError::handler_failure("open", e.to_string()))?;

        // A second `open` replaces the handle without closing the first process.
        if let Some(previous) = ctx.processes().insert(&app_name, process) {
            warn!(
                previous_pid = ?previous.id(),
                "Handle for '{}' overwritten; previous process left running", app_name
            );
        }
        ctx.log(&format!("Opened {app_name}"));

        if !ctx.sleep(ctx.config().open_settle()).await {
            return Ok(Flow::Continue);
        }

        let title = applications::window_title_hint(&app_name);
        match ctx.driver().focus_window(&title) {
            Ok(true) => ctx.log(&format!("Focused {app_name} window")),
            Ok(false) => ctx.log(&format!("No '{title}' window found to focus")),
            Err(e) => ctx.log(&format!("Failed to focus {app_name} window: {e}")),
        }
        Ok(Flow::Continue)
    }
}
