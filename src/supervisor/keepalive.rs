//! Keepalive pulse task.
//!
//! While a session is established, jump briefly at a fixed interval. The
//! pulse is a no-op as far as gameplay goes; it only resets the server's
//! idle-disconnect timer. A pulse against a session that has already gone
//! away is logged and swallowed, never treated as a session failure.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::{Control, SessionHandle};

/// Spawn the recurring pulse task. The first pulse fires one full interval
/// after spawn, not immediately. The caller aborts the task when the
/// session ends.
pub(crate) fn start(
    handle: SessionHandle,
    interval: Duration,
    pulse_duration: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // interval's first tick completes immediately; skip it
        ticker.tick().await;
        loop {
            ticker.tick().await;
            pulse_once(&handle, pulse_duration).await;
        }
    })
}

/// One pulse: assert jump, hold it for the pulse duration, release.
async fn pulse_once(handle: &SessionHandle, pulse_duration: Duration) {
    if let Err(e) = handle.set_control(Control::Jump, true) {
        warn!("Keepalive pulse failed: {}", e);
        return;
    }
    debug!("Keepalive pulse");
    tokio::time::sleep(pulse_duration).await;
    if let Err(e) = handle.set_control(Control::Jump, false) {
        warn!("Keepalive release failed: {}", e);
    }
}
