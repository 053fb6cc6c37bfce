use async_trait::async_trait;
use tracing::debug;

use crate::errors::ScriptError;
use crate::executor::CommandContext;
use crate::keyboard;
use crate::registry::{CommandHandler, Flow};

pub struct TypeCommand;

#[async_trait]
impl CommandHandler for TypeCommand {
    async fn invoke(
        &self,
        ctx: &mut CommandContext<'_>,
        argument: &str,
    ) -> Result<Flow, ScriptError> {
        let text = keyboard::substitute_literals(argument);
        let strokes = keyboard::keystrokes(&text).map_err(|ch| {
            ScriptError::invalid_argument("type", format!("cannot type character {ch:?}"))
        })?;

        ctx.log(&format!("Typing text: {argument}"));

        // Give the target window a moment to take focus.
        if !ctx.sleep(ctx.config().type_settle()).await {
            return Ok(Flow::Continue);
        }

        let interval = ctx.config().key_interval();
        for (index, stroke) in strokes.iter().enumerate() {
            if index > 0 && !ctx.sleep(interval).await {
                debug!(typed = index, total = strokes.len(), "Typing interrupted");
                break;
            }
            ctx.driver()
                .send_keystroke(stroke)
                .map_err(|e| ScriptError::handler_failure("type", e.to_string()))?;
        }
        Ok(Flow::Continue)
    }
}
