use async_trait::async_trait;
use std::sync::Arc;

use crate::applications::LaunchTarget;
use crate::errors::ScriptError;
use crate::keyboard::Keystroke;

mod input;
pub mod simulated;
pub mod system;

pub use simulated::SimulatedDriver;
pub use system::SystemDriver;

/// A process started by `open`.
#[async_trait]
pub trait AppProcess: Send + Sync {
    /// OS process id, if the process has not been reaped yet.
    fn id(&self) -> Option<u32>;

    /// Ask the process to exit and wait until it has.
    async fn terminate(&mut self) -> Result<(), ScriptError>;
}

/// The OS-facing side effects the built-in commands need
pub trait AutomationDriver: Send + Sync {
    /// Spawn a detached process for `target`.
    fn launch(&self, target: &LaunchTarget) -> Result<Box<dyn AppProcess>, ScriptError>;

    /// Bring a window whose title contains `title_hint` to the foreground.
    /// Returns `Ok(false)` when no such window was found.
    fn focus_window(&self, title_hint: &str) -> Result<bool, ScriptError>;

    /// Press and release one key, holding shift if the keystroke needs it.
    fn send_keystroke(&self, keystroke: &Keystroke) -> Result<(), ScriptError>;

    /// Last known pointer position in screen pixels.
    fn pointer_position(&self) -> Option<(f64, f64)>;

    /// Size of the primary display in pixels.
    fn screen_size(&self) -> Option<(f64, f64)>;
}

/// Create the driver for the current platform, or a simulated one that
/// performs no OS side effects.
pub fn create_driver(simulated: bool) -> Arc<dyn AutomationDriver> {
    if simulated {
        Arc::new(SimulatedDriver::new())
    } else {
        Arc::new(SystemDriver::new())
    }
}
