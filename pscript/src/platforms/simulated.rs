//! Driver that records what it was asked to do instead of touching the desktop.
//!
//! Used for dry runs and throughout the test suite.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::{AppProcess, AutomationDriver};
use crate::applications::LaunchTarget;
use crate::errors::ScriptError;
use crate::keyboard::Keystroke;

/// Everything the simulated desktop has seen so far.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulatedActivity {
    pub launched: Vec<String>,
    pub focus_requests: Vec<String>,
    pub typed: String,
    pub terminated: Vec<u32>,
}

#[derive(Debug)]
struct SimulatedState {
    activity: SimulatedActivity,
    pointer: Option<(f64, f64)>,
    screen: (f64, f64),
    next_pid: u32,
    fail_launches: bool,
}

impl Default for SimulatedState {
    fn default() -> Self {
        Self {
            activity: SimulatedActivity::default(),
            pointer: Some((640.0, 360.0)),
            screen: (1280.0, 720.0),
            next_pid: 1000,
            fail_launches: false,
        }
    }
}

/// Clones share the same state, so a test can keep one handle and give
/// another to the engine.
#[derive(Debug, Clone, Default)]
pub struct SimulatedDriver {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn activity(&self) -> SimulatedActivity {
        self.state().activity.clone()
    }

    pub fn launched(&self) -> Vec<String> {
        self.state().activity.launched.clone()
    }

    pub fn typed(&self) -> String {
        self.state().activity.typed.clone()
    }

    pub fn terminated(&self) -> Vec<u32> {
        self.state().activity.terminated.clone()
    }

    pub fn focus_requests(&self) -> Vec<String> {
        self.state().activity.focus_requests.clone()
    }

    pub fn set_pointer(&self, x: f64, y: f64) {
        self.state().pointer = Some((x, y));
    }

    /// Behave like a host where the pointer cannot be read.
    pub fn clear_pointer(&self) {
        self.state().pointer = None;
    }

    pub fn set_screen_size(&self, width: f64, height: f64) {
        self.state().screen = (width, height);
    }

    /// Make every later `launch` fail, as if the program were missing.
    pub fn fail_launches(&self, fail: bool) {
        self.state().fail_launches = fail;
    }
}

impl AutomationDriver for SimulatedDriver {
    fn launch(&self, target: &LaunchTarget) -> Result<Box<dyn AppProcess>, ScriptError> {
        let mut state = self.state();
        if state.fail_launches {
            return Err(ScriptError::Platform(format!(
                "Failed to launch {}: simulated failure",
                target.program
            )));
        }
        let pid = state.next_pid;
        state.next_pid += 1;
        state.activity.launched.push(target.program.to_string());
        debug!(program = target.program, pid, "Simulated launch");

        Ok(Box::new(SimulatedProcess {
            pid: Some(pid),
            state: Arc::clone(&self.state),
        }))
    }

    fn focus_window(&self, title_hint: &str) -> Result<bool, ScriptError> {
        self.state()
            .activity
            .focus_requests
            .push(title_hint.to_string());
        Ok(true)
    }

    fn send_keystroke(&self, keystroke: &Keystroke) -> Result<(), ScriptError> {
        self.state().activity.typed.push(keystroke.ch);
        Ok(())
    }

    fn pointer_position(&self) -> Option<(f64, f64)> {
        self.state().pointer
    }

    fn screen_size(&self) -> Option<(f64, f64)> {
        Some(self.state().screen)
    }
}

struct SimulatedProcess {
    pid: Option<u32>,
    state: Arc<Mutex<SimulatedState>>,
}

#[async_trait]
impl AppProcess for SimulatedProcess {
    fn id(&self) -> Option<u32> {
        self.pid
    }

    async fn terminate(&mut self) -> Result<(), ScriptError> {
        if let Some(pid) = self.pid.take() {
            self.state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .activity
                .terminated
                .push(pid);
        }
        Ok(())
    }
}
