use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::errors::ScriptError;
use crate::executor::CommandContext;
use crate::registry::{CommandHandler, Flow};

/// Parse a non-negative number of seconds, fractional values allowed.
pub fn parse_seconds(argument: &str) -> Result<Duration, ScriptError> {
    let trimmed = argument.trim();
    let seconds: f64 = trimmed
        .parse()
        .map_err(|_| ScriptError::invalid_argument("wait", format!("Invalid wait time: {trimmed:?}")))?;

    Duration::try_from_secs_f64(seconds).map_err(|_| {
        ScriptError::invalid_argument(
            "wait",
            format!("Wait time must be a finite, non-negative number of seconds, got {trimmed}"),
        )
    })
}

pub struct WaitCommand;

#[async_trait]
impl CommandHandler for WaitCommand {
    async fn invoke(
        &self,
        ctx: &mut CommandContext<'_>,
        argument: &str,
    ) -> Result<Flow, ScriptError> {
        let duration = parse_seconds(argument)?;
        ctx.log(&format!("Waiting for {} seconds...", duration.as_secs_f64()));

        if !ctx.sleep(duration).await {
            debug!("Wait interrupted by abort request");
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds_accepts_fractions() {
        assert_eq!(parse_seconds("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_seconds("1.5").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_seconds(" 2 ").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn test_parse_seconds_rejects_bad_input() {
        for bad in ["abc", "", "-1", "NaN", "inf", "1s"] {
            let err = parse_seconds(bad).unwrap_err();
            assert_eq!(err.kind(), "InvalidArgument", "input {bad:?}");
        }
    }
}
