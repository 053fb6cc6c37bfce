//! Pointer-in-corner watchdog.
//!
//! While a session runs, a background task samples the pointer position. Moving
//! the pointer into any screen corner cancels the session's abort token; the run
//! loop notices at the next command boundary.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const UNAVAILABLE_MESSAGE: &str =
    "Failsafe inactive: pointer position is unavailable, corner abort is disabled.";

use crate::config::FailsafeConfig;
use crate::logger::ScriptLogger;
use crate::platforms::AutomationDriver;

/// Whether `position` lies within `margin` pixels of a corner of a screen of
/// the given `size`.
pub fn in_corner(position: (f64, f64), size: (f64, f64), margin: f64) -> bool {
    let (x, y) = position;
    let (width, height) = size;
    let right = (width - 1.0).max(0.0);
    let bottom = (height - 1.0).max(0.0);

    let near_vertical_edge = x <= margin || x >= right - margin;
    let near_horizontal_edge = y <= margin || y >= bottom - margin;
    near_vertical_edge && near_horizontal_edge
}

pub struct Failsafe {
    stop: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Failsafe {
    /// Start sampling. `abort` is cancelled when the pointer reaches a corner.
    /// If the pointer cannot be read, that is reported once through `logger`.
    pub fn spawn(
        driver: Arc<dyn AutomationDriver>,
        abort: CancellationToken,
        logger: Arc<dyn ScriptLogger>,
        config: &FailsafeConfig,
    ) -> Self {
        let stop = CancellationToken::new();
        let stop_signal = stop.clone();
        let period = config.interval();
        let margin = config.margin;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut reported_unavailable = false;

            loop {
                tokio::select! {
                    _ = stop_signal.cancelled() => break,
                    _ = abort.cancelled() => break,
                    _ = ticker.tick() => {
                        let (Some(position), Some(size)) =
                            (driver.pointer_position(), driver.screen_size())
                        else {
                            if !reported_unavailable {
                                warn!("Pointer position unavailable, failsafe idle");
                                logger.log(UNAVAILABLE_MESSAGE);
                                reported_unavailable = true;
                            }
                            continue;
                        };

                        if in_corner(position, size, margin) {
                            warn!(?position, "Pointer reached a screen corner, aborting script");
                            abort.cancel();
                            break;
                        }
                    }
                }
            }
            debug!("Failsafe watchdog stopped");
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop sampling and wait for the task to finish.
    pub async fn stop(mut self) {
        self.stop.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Failsafe {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}
