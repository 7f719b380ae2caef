//! System idle watching for automatic timer pause.
//!
//! A sampling loop polls the OS idle clock every few seconds and feeds it
//! through an edge detector, so crossing the threshold fires exactly once
//! per absence instead of every poll.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use log::{debug, warn};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const POLL_SECS: u64 = 5;
/// Idle time below this after a detected absence counts as the user coming
/// back.
pub const RECOVERY_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleSignal {
    /// The user has been away at least the configured timeout.
    Detected,
    /// The user is back after a detected absence.
    Resumed,
}

/// Source of the OS-level idle clock. A trait so the sampling loop can be
/// tested without a real input stack.
pub trait IdleProbe: Send + Sync {
    fn idle_seconds(&self) -> u64;
}

pub struct SystemIdleProbe;

impl IdleProbe for SystemIdleProbe {
    fn idle_seconds(&self) -> u64 {
        match user_idle::UserIdle::get_time() {
            Ok(idle) => idle.as_seconds(),
            Err(err) => {
                warn!("idle probe failed: {err}");
                0
            }
        }
    }
}

/// Edge detector over successive idle readings.
#[derive(Debug, Default)]
pub struct IdleEdge {
    idle_paused: bool,
}

impl IdleEdge {
    pub fn observe(&mut self, idle_secs: u64, timeout_secs: u64) -> Option<IdleSignal> {
        if !self.idle_paused && idle_secs >= timeout_secs {
            self.idle_paused = true;
            return Some(IdleSignal::Detected);
        }
        if self.idle_paused && idle_secs < RECOVERY_SECS {
            self.idle_paused = false;
            return Some(IdleSignal::Resumed);
        }
        None
    }

    pub fn is_idle_paused(&self) -> bool {
        self.idle_paused
    }
}

/// Owns the sampling task. Reconfiguring cancels the previous loop and, when
/// enabled, starts a fresh one with a clean edge state.
pub struct IdleMonitor {
    cancel: Mutex<Option<CancellationToken>>,
}

impl IdleMonitor {
    pub fn new() -> Self {
        Self {
            cancel: Mutex::new(None),
        }
    }

    pub fn configure<F>(
        &self,
        enabled: bool,
        timeout_minutes: u32,
        probe: Arc<dyn IdleProbe>,
        timer_running: Arc<AtomicBool>,
        on_signal: F,
    ) where
        F: Fn(IdleSignal, u64) + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.cancel.lock().unwrap().replace(token.clone()) {
            previous.cancel();
        }
        if !enabled {
            debug!("idle detection off");
            return;
        }

        let timeout_secs = u64::from(timeout_minutes) * 60;
        debug!("idle detection on, timeout {timeout_secs}s");
        // Spawned via the Tauri runtime so configuring from setup (plain
        // main thread, no tokio context entered) cannot panic.
        tauri::async_runtime::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(POLL_SECS));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut edge = IdleEdge::default();
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        // Only watch while a countdown is in flight, but keep
                        // watching through an idle pause so recovery fires.
                        if !timer_running.load(Ordering::Relaxed) && !edge.is_idle_paused() {
                            continue;
                        }
                        let idle = probe.idle_seconds();
                        if let Some(signal) = edge.observe(idle, timeout_secs) {
                            on_signal(signal, idle);
                        }
                    }
                }
            }
        });
    }

}

impl Default for IdleMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverIdle;

    impl IdleProbe for NeverIdle {
        fn idle_seconds(&self) -> u64 {
            0
        }
    }

    #[test]
    fn configure_works_without_an_ambient_runtime() {
        // Startup configures the monitor from the setup hook, which runs on
        // the main thread with no tokio context entered.
        let monitor = IdleMonitor::new();
        let running = Arc::new(AtomicBool::new(true));
        monitor.configure(true, 1, Arc::new(NeverIdle), running, |_, _| {});
        // Reconfiguring tears the loop down again.
        monitor.configure(false, 1, Arc::new(NeverIdle), Arc::new(AtomicBool::new(false)), |_, _| {});
    }

    #[test]
    fn detection_fires_once_per_absence() {
        let mut edge = IdleEdge::default();
        assert_eq!(edge.observe(0, 600), None);
        assert_eq!(edge.observe(595, 600), None);
        assert_eq!(edge.observe(600, 600), Some(IdleSignal::Detected));
        // Staying idle does not re-fire.
        assert_eq!(edge.observe(700, 600), None);
        assert_eq!(edge.observe(1200, 600), None);
    }

    #[test]
    fn recovery_requires_dropping_below_threshold() {
        let mut edge = IdleEdge::default();
        edge.observe(600, 600);
        // Still over the recovery bar.
        assert_eq!(edge.observe(30, 600), None);
        assert_eq!(edge.observe(RECOVERY_SECS, 600), None);
        assert_eq!(edge.observe(2, 600), Some(IdleSignal::Resumed));
        assert!(!edge.is_idle_paused());
    }

    #[test]
    fn full_cycle_can_repeat() {
        let mut edge = IdleEdge::default();
        assert_eq!(edge.observe(600, 600), Some(IdleSignal::Detected));
        assert_eq!(edge.observe(1, 600), Some(IdleSignal::Resumed));
        assert_eq!(edge.observe(650, 600), Some(IdleSignal::Detected));
        assert_eq!(edge.observe(0, 600), Some(IdleSignal::Resumed));
    }
}
