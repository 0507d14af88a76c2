//! Per-channel playback watchdog.
//!
//! One supervisor thread runs for each acquired channel. Every poll interval
//! it ticks the registry: natural completion and timeout release the channel
//! there, a stop-all makes the next tick observe the channel's disappearance,
//! and while playback continues the supervisor renders the channel's
//! progress row. The thread exits on any terminal tick and never writes to
//! the display afterwards.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::registry::{ChannelHandle, ChannelRegistry, Tick};
use super::surface::Surface;

/// Format the elapsed/total bar: `|████----| 1.2s`.
pub fn format_progress(elapsed: f32, total: f32, width: usize) -> String {
    let fraction = if total > 0.0 {
        (elapsed / total).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let filled = (fraction * width as f32) as usize;
    let filled = filled.min(width);
    let bar: String = "█".repeat(filled) + &"-".repeat(width - filled);
    format!("|{bar}| {elapsed:.1}s")
}

/// Full progress row for a channel: `Ch 1:            kick.wav |██--| 0.4s`.
pub fn format_row(slot: usize, name: &str, elapsed: f32, duration: f32, width: usize) -> String {
    format!(
        "Ch {}: {:>20} {}",
        slot + 1,
        name,
        format_progress(elapsed, duration, width)
    )
}

/// Spawn the watchdog thread for a freshly acquired channel.
///
/// The thread is detached by callers; after a stop-all it observes `Stopped`
/// within one poll interval and exits quietly.
pub fn spawn_supervisor(
    registry: Arc<ChannelRegistry>,
    handle: ChannelHandle,
    surface: Arc<dyn Surface>,
    poll_interval: Duration,
    progress_width: usize,
) -> JoinHandle<()> {
    thread::spawn(move || {
        loop {
            let tick = registry.tick(&handle, surface.as_ref(), |elapsed, duration| {
                format_row(handle.slot, &handle.name, elapsed, duration, progress_width)
            });

            match tick {
                Tick::Progress { .. } => {}
                Tick::Completed => {
                    log::debug!("channel {} completed", handle.id);
                    break;
                }
                Tick::TimedOut => {
                    log::debug!("channel {} timed out after {:.1}s", handle.id, handle.duration);
                    break;
                }
                Tick::Stopped => {
                    log::debug!("channel {} stopped out-of-band", handle.id);
                    break;
                }
            }

            thread::sleep(poll_interval);
        }
    })
}
