//! Bounded playback channel registry.
//!
//! The registry owns the set of concurrently active channels: at most
//! `max_channels` at a time, each holding the lowest free slot index, its
//! player process, and its probed duration. Every mutation (admission,
//! supervisor poll, release, stop-all) funnels through one mutex, so no
//! interleaving can observe an over-capacity set or a duplicated slot, and
//! display rows are only written while the writing channel is verifiably
//! still registered.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use super::launcher::{LaunchError, PlayerProcess};
use super::surface::Surface;

pub type ChannelId = u64;

/// Terminal row owned by a playback slot (row 0 is the banner).
pub fn slot_row(slot: usize) -> u16 {
    slot as u16 + 1
}

/// Caller-side view of an acquired channel. The registry keeps the process;
/// the handle carries everything a supervisor needs to poll and render.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    pub id: ChannelId,
    pub slot: usize,
    pub name: String,
    pub duration: f32,
    pub started: Instant,
}

struct ActiveChannel {
    id: ChannelId,
    slot: usize,
    player: Box<dyn PlayerProcess>,
    started: Instant,
    duration: f32,
}

struct RegistryInner {
    active: Vec<ActiveChannel>,
    next_id: ChannelId,
}

pub struct ChannelRegistry {
    max_channels: usize,
    inner: Mutex<RegistryInner>,
}

/// Outcome of one supervisor poll step.
#[derive(Debug, PartialEq)]
pub enum Tick {
    /// Channel was released out-of-band; the poller must exit without
    /// touching the display.
    Stopped,
    /// Player exited on its own; channel released, row cleared.
    Completed,
    /// Declared duration elapsed; player terminated, channel released,
    /// row cleared.
    TimedOut,
    /// Still playing; the rendered progress row was written.
    Progress { elapsed: f32, duration: f32 },
}

impl ChannelRegistry {
    pub fn new(max_channels: usize) -> Self {
        Self {
            max_channels,
            inner: Mutex::new(RegistryInner {
                active: Vec::new(),
                next_id: 0,
            }),
        }
    }

    pub fn max_channels(&self) -> usize {
        self.max_channels
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Admit a new channel if capacity allows.
    ///
    /// Returns `Ok(None)` when all slots are taken; `spawn` is not called
    /// and nothing is launched. Otherwise `spawn` runs under the registry
    /// lock (probe + launch) and its failure admits nothing, so a failed
    /// launch never consumes a slot.
    pub fn try_acquire<F>(&self, path: &Path, spawn: F) -> Result<Option<ChannelHandle>, LaunchError>
    where
        F: FnOnce() -> Result<(Box<dyn PlayerProcess>, f32), LaunchError>,
    {
        let mut inner = self.lock();

        if inner.active.len() >= self.max_channels {
            return Ok(None);
        }

        // Lowest unused slot keeps the display rows visually stable
        let slot = (0..self.max_channels)
            .find(|s| !inner.active.iter().any(|c| c.slot == *s))
            .expect("active count below capacity implies a free slot");

        let (player, duration) = spawn()?;

        let id = inner.next_id;
        inner.next_id += 1;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let started = Instant::now();

        inner.active.push(ActiveChannel {
            id,
            slot,
            player,
            started,
            duration,
        });

        log::info!("channel {id} on slot {slot}: {name} ({duration:.1}s)");

        Ok(Some(ChannelHandle {
            id,
            slot,
            name,
            duration,
            started,
        }))
    }

    /// One supervisor poll step with an explicit notion of "now".
    ///
    /// The registration re-check, process poll, timeout comparison, and any
    /// display write all happen under the lock, so a stale poller can never
    /// write into a row that has been reassigned.
    pub fn tick_at<F>(
        &self,
        handle: &ChannelHandle,
        now: Instant,
        surface: &dyn Surface,
        render: F,
    ) -> Tick
    where
        F: FnOnce(f32, f32) -> String,
    {
        let mut inner = self.lock();

        let Some(pos) = inner.active.iter().position(|c| c.id == handle.id) else {
            return Tick::Stopped;
        };

        if !inner.active[pos].player.is_alive() {
            let channel = inner.active.remove(pos);
            let _ = surface.clear_row(slot_row(channel.slot));
            return Tick::Completed;
        }

        let elapsed = now
            .checked_duration_since(inner.active[pos].started)
            .map(|d| d.as_secs_f32())
            .unwrap_or(0.0);

        if elapsed >= inner.active[pos].duration {
            let mut channel = inner.active.remove(pos);
            channel.player.terminate();
            let _ = surface.clear_row(slot_row(channel.slot));
            return Tick::TimedOut;
        }

        let duration = inner.active[pos].duration;
        let line = render(elapsed, duration);
        if let Err(e) = surface.write_row(slot_row(inner.active[pos].slot), &line) {
            log::error!("progress write failed: {e}");
        }
        Tick::Progress { elapsed, duration }
    }

    pub fn tick<F>(&self, handle: &ChannelHandle, surface: &dyn Surface, render: F) -> Tick
    where
        F: FnOnce(f32, f32) -> String,
    {
        self.tick_at(handle, Instant::now(), surface, render)
    }

    /// Terminate and remove one channel. Idempotent: releasing a channel
    /// that already completed or was stopped is a no-op.
    pub fn release(&self, handle: &ChannelHandle, surface: &dyn Surface) -> bool {
        let mut inner = self.lock();

        let Some(pos) = inner.active.iter().position(|c| c.id == handle.id) else {
            return false;
        };

        let mut channel = inner.active.remove(pos);
        channel.player.terminate();
        let _ = surface.clear_row(slot_row(channel.slot));
        log::info!("channel {} released", channel.id);
        true
    }

    /// Terminate and remove every active channel; the stop-all and quit
    /// path. Returns how many channels were torn down.
    pub fn release_all(&self, surface: &dyn Surface) -> usize {
        let mut inner = self.lock();

        let released = inner.active.len();
        for channel in inner.active.iter_mut() {
            channel.player.terminate();
            let _ = surface.clear_row(slot_row(channel.slot));
        }
        inner.active.clear();

        if released > 0 {
            log::info!("released all channels ({released})");
        }
        released
    }

    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }

    pub fn active_slots(&self) -> Vec<usize> {
        let mut slots: Vec<usize> = self.lock().active.iter().map(|c| c.slot).collect();
        slots.sort_unstable();
        slots
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FakePlayer, FakePlayerProbe};
    use super::*;
    use crate::board::surface::fake::{FakeSurface, SurfaceEvent};
    use std::time::Duration;

    fn acquire(
        registry: &ChannelRegistry,
        path: &str,
        duration: f32,
    ) -> (ChannelHandle, FakePlayerProbe) {
        let (player, probe) = FakePlayer::new();
        let handle = registry
            .try_acquire(Path::new(path), || Ok((Box::new(player), duration)))
            .unwrap()
            .expect("capacity available");
        (handle, probe)
    }

    fn no_render(_: f32, _: f32) -> String {
        unreachable!("render must not be called for a terminal tick")
    }

    #[test]
    fn test_capacity_bound_is_never_exceeded() {
        let registry = ChannelRegistry::new(3);

        for i in 0..3 {
            acquire(&registry, &format!("clip{i}.wav"), 5.0);
        }
        assert_eq!(registry.active_count(), 3);

        // Fourth request is dropped without launching anything
        let result = registry
            .try_acquire(Path::new("clip3.wav"), || {
                panic!("spawn must not run at capacity")
            })
            .unwrap();
        assert!(result.is_none());
        assert_eq!(registry.active_count(), 3);
        assert_eq!(registry.active_slots(), vec![0, 1, 2]);
    }

    #[test]
    fn test_slots_are_distinct_and_lowest_first() {
        let registry = ChannelRegistry::new(3);

        let (h0, _) = acquire(&registry, "a.wav", 5.0);
        let (h1, _) = acquire(&registry, "b.wav", 5.0);
        let (h2, _) = acquire(&registry, "c.wav", 5.0);
        assert_eq!((h0.slot, h1.slot, h2.slot), (0, 1, 2));

        // Free the middle slot; the next acquire must take it
        let surface = FakeSurface::new();
        registry.release(&h1, &surface);
        assert_eq!(registry.active_slots(), vec![0, 2]);

        let (h3, _) = acquire(&registry, "d.wav", 5.0);
        assert_eq!(h3.slot, 1);
        assert_eq!(registry.active_slots(), vec![0, 1, 2]);
    }

    #[test]
    fn test_release_is_idempotent() {
        let registry = ChannelRegistry::new(2);
        let surface = FakeSurface::new();

        let (handle, probe) = acquire(&registry, "a.wav", 5.0);

        assert!(registry.release(&handle, &surface));
        assert!(probe.was_terminated());
        assert_eq!(registry.active_count(), 0);

        // Second release of the same channel: no-op, no extra row clear
        let clears_before = surface.rows_cleared().len();
        assert!(!registry.release(&handle, &surface));
        assert_eq!(surface.rows_cleared().len(), clears_before);
    }

    #[test]
    fn test_release_clears_owned_row() {
        let registry = ChannelRegistry::new(2);
        let surface = FakeSurface::new();

        let (h0, _) = acquire(&registry, "a.wav", 5.0);
        let (h1, _) = acquire(&registry, "b.wav", 5.0);

        registry.release(&h1, &surface);
        assert_eq!(surface.rows_cleared(), vec![slot_row(1)]);

        registry.release(&h0, &surface);
        assert_eq!(surface.rows_cleared(), vec![slot_row(1), slot_row(0)]);
    }

    #[test]
    fn test_release_all_terminates_everything() {
        let registry = ChannelRegistry::new(3);
        let surface = FakeSurface::new();

        let (_, p0) = acquire(&registry, "a.wav", 5.0);
        let (_, p1) = acquire(&registry, "b.wav", 5.0);

        assert_eq!(registry.release_all(&surface), 2);
        assert_eq!(registry.active_count(), 0);
        assert!(p0.was_terminated());
        assert!(p1.was_terminated());

        let mut cleared = surface.rows_cleared();
        cleared.sort_unstable();
        assert_eq!(cleared, vec![slot_row(0), slot_row(1)]);
    }

    #[test]
    fn test_release_all_on_empty_registry() {
        let registry = ChannelRegistry::new(3);
        let surface = FakeSurface::new();
        assert_eq!(registry.release_all(&surface), 0);
    }

    #[test]
    fn test_tick_progress_writes_owned_row() {
        let registry = ChannelRegistry::new(2);
        let surface = FakeSurface::new();

        let (handle, _) = acquire(&registry, "a.wav", 10.0);

        let tick = registry.tick_at(
            &handle,
            handle.started + Duration::from_secs(2),
            &surface,
            |elapsed, duration| format!("{elapsed:.1}/{duration:.1}"),
        );

        match tick {
            Tick::Progress { elapsed, duration } => {
                assert!((elapsed - 2.0).abs() < 0.1);
                assert_eq!(duration, 10.0);
            }
            other => panic!("expected Progress, got {other:?}"),
        }
        assert_eq!(
            surface.events(),
            vec![SurfaceEvent::Write(slot_row(0), "2.0/10.0".to_string())]
        );
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_tick_timeout_within_one_poll() {
        let registry = ChannelRegistry::new(2);
        let surface = FakeSurface::new();

        let (handle, probe) = acquire(&registry, "a.wav", 1.0);

        let tick = registry.tick_at(
            &handle,
            handle.started + Duration::from_millis(1100),
            &surface,
            no_render,
        );

        assert_eq!(tick, Tick::TimedOut);
        assert!(probe.was_terminated());
        assert_eq!(registry.active_count(), 0);
        assert_eq!(surface.rows_cleared(), vec![slot_row(0)]);
    }

    #[test]
    fn test_tick_detects_natural_completion() {
        let registry = ChannelRegistry::new(2);
        let surface = FakeSurface::new();

        let (handle, probe) = acquire(&registry, "a.wav", 30.0);
        probe.finish(); // player exits on its own

        let tick = registry.tick(&handle, &surface, no_render);

        assert_eq!(tick, Tick::Completed);
        // Exited by itself, never signaled
        assert!(!probe.was_terminated());
        assert_eq!(registry.active_count(), 0);
        assert_eq!(surface.rows_cleared(), vec![slot_row(0)]);
    }

    #[test]
    fn test_stale_tick_is_stopped_and_silent() {
        let registry = ChannelRegistry::new(2);
        let surface = FakeSurface::new();

        let (handle, _) = acquire(&registry, "a.wav", 5.0);
        registry.release_all(&surface);

        // A new channel takes slot 0; the stale poller must not touch it
        let (_, _) = acquire(&registry, "b.wav", 5.0);
        let events_before = surface.events().len();

        let tick = registry.tick(&handle, &surface, no_render);

        assert_eq!(tick, Tick::Stopped);
        assert_eq!(surface.events().len(), events_before);
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_launch_failure_consumes_no_slot() {
        let registry = ChannelRegistry::new(2);

        let result = registry.try_acquire(Path::new("a.wav"), || {
            Err(LaunchError::UnsupportedFormat("wav".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(registry.active_count(), 0);

        // The failed attempt left slot 0 free
        let (handle, _) = acquire(&registry, "b.wav", 5.0);
        assert_eq!(handle.slot, 0);
    }

    #[test]
    fn test_handle_name_is_basename() {
        let registry = ChannelRegistry::new(1);
        let (handle, _) = acquire(&registry, "sounds/deep/kick.wav", 5.0);
        assert_eq!(handle.name, "kick.wav");
    }

    #[test]
    fn test_elapsed_before_start_is_zero() {
        let registry = ChannelRegistry::new(1);
        let surface = FakeSurface::new();

        let (handle, _) = acquire(&registry, "a.wav", 5.0);

        // A now earlier than the start instant clamps to zero elapsed
        let tick = registry.tick_at(&handle, handle.started, &surface, |e, d| {
            format!("{e}/{d}")
        });
        assert!(matches!(tick, Tick::Progress { elapsed, .. } if elapsed == 0.0));
    }
}
