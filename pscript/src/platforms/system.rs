//! Driver that acts on the real desktop.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use super::{input, AppProcess, AutomationDriver};
use crate::applications::LaunchTarget;
use crate::errors::ScriptError;
use crate::keyboard::Keystroke;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDriver;

impl SystemDriver {
    pub fn new() -> Self {
        Self
    }
}

impl AutomationDriver for SystemDriver {
    fn launch(&self, target: &LaunchTarget) -> Result<Box<dyn AppProcess>, ScriptError> {
        let mut command = Command::new(target.program);
        command
            .args(target.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        #[cfg(target_os = "windows")]
        {
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            command.creation_flags(DETACHED_PROCESS);
        }

        let child = command.spawn().map_err(|e| {
            ScriptError::Platform(format!("Failed to launch {}: {e}", target.program))
        })?;
        info!(program = target.program, pid = ?child.id(), "Launched process");
        Ok(Box::new(SystemProcess { child }))
    }

    fn focus_window(&self, title_hint: &str) -> Result<bool, ScriptError> {
        focus_window_by_title(title_hint)
    }

    fn send_keystroke(&self, keystroke: &Keystroke) -> Result<(), ScriptError> {
        input::send_keystroke(keystroke)
    }

    fn pointer_position(&self) -> Option<(f64, f64)> {
        input::pointer_position()
    }

    fn screen_size(&self) -> Option<(f64, f64)> {
        input::screen_size()
    }
}

pub struct SystemProcess {
    child: Child,
}

#[async_trait]
impl AppProcess for SystemProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn terminate(&mut self) -> Result<(), ScriptError> {
        #[cfg(unix)]
        {
            if let Some(pid) = self.child.id() {
                // SIGTERM lets the application shut down cleanly.
                let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
                if rc != 0 {
                    return Err(ScriptError::Platform(format!(
                        "Failed to signal process {pid}: {}",
                        std::io::Error::last_os_error()
                    )));
                }
            }
        }
        #[cfg(not(unix))]
        {
            self.child.start_kill().map_err(|e| {
                ScriptError::Platform(format!("Failed to terminate process: {e}"))
            })?;
        }

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| ScriptError::Platform(format!("Failed to wait for process: {e}")))?;
        debug!(?status, "Process exited");
        Ok(())
    }
}

#[cfg(target_os = "windows")]
fn focus_window_by_title(title_hint: &str) -> Result<bool, ScriptError> {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{
        BringWindowToTop, IsIconic, SetForegroundWindow, ShowWindow, SW_RESTORE,
    };

    let windows = xcap::Window::all()
        .map_err(|e| ScriptError::Platform(format!("Failed to get windows: {e}")))?;

    let Some(window) = windows.iter().find(|w| {
        w.title()
            .map(|title| title.contains(title_hint))
            .unwrap_or(false)
    }) else {
        return Ok(false);
    };

    let id = window
        .id()
        .map_err(|e| ScriptError::Platform(format!("Failed to get window handle: {e}")))?;

    unsafe {
        let hwnd = HWND(id as isize as *mut core::ffi::c_void);

        if IsIconic(hwnd).as_bool() {
            debug!("Window is minimized, restoring it");
            let _ = ShowWindow(hwnd, SW_RESTORE);
        }
        let _ = BringWindowToTop(hwnd);

        let focused = SetForegroundWindow(hwnd).as_bool();
        if !focused {
            debug!("SetForegroundWindow failed for '{}'", title_hint);
        }
        Ok(focused)
    }
}

#[cfg(target_os = "macos")]
fn focus_window_by_title(title_hint: &str) -> Result<bool, ScriptError> {
    let script = format!("tell application \"{title_hint}\" to activate");
    let output = std::process::Command::new("osascript")
        .args(["-e", &script])
        .output()
        .map_err(|e| ScriptError::Platform(format!("Failed to run osascript: {e}")))?;
    Ok(output.status.success())
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn focus_window_by_title(title_hint: &str) -> Result<bool, ScriptError> {
    // wmctrl matches on a title substring; without it there is nothing to do.
    match std::process::Command::new("wmctrl")
        .args(["-a", title_hint])
        .output()
    {
        Ok(output) => Ok(output.status.success()),
        Err(e) => {
            debug!("wmctrl unavailable, skipping window focus: {}", e);
            Ok(false)
        }
    }
}
