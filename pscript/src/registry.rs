use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::errors::ScriptError;
use crate::executor::CommandContext;

/// What the run loop should do after a command returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop dispatching. Raised by `exit`; not a failure.
    Exit,
}

/// A capability bound to a command name.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn invoke(
        &self,
        ctx: &mut CommandContext<'_>,
        argument: &str,
    ) -> Result<Flow, ScriptError>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&mut CommandContext<'_>, &str) -> Result<Flow, ScriptError> + Send + Sync,
{
    async fn invoke(
        &self,
        ctx: &mut CommandContext<'_>,
        argument: &str,
    ) -> Result<Flow, ScriptError> {
        (self.0)(ctx, argument)
    }
}

/// Case-insensitive mapping from command name to handler.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. A previous handler under the same name is replaced.
    pub fn register(&mut self, name: &str, handler: Arc<dyn CommandHandler>) {
        let key = name.to_lowercase();
        if self.commands.insert(key.clone(), handler).is_some() {
            debug!("Replaced handler for command '{}'", key);
        }
    }

    /// Register a synchronous closure as a handler.
    pub fn register_fn<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&mut CommandContext<'_>, &str) -> Result<Flow, ScriptError> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnHandler(handler)));
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.commands.get(&name.to_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_lowercase())
    }

    /// Registered names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.list_names())
            .finish()
    }
}
