use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use tauri::AppHandle;
use tauri_plugin_notification::NotificationExt;
use tokio::time::MissedTickBehavior;

use crate::audio;
use crate::stats::format_duration;
use crate::store::DataStore;
use crate::windows::WindowOrchestrator;

use super::state::{Completion, EndOutcome, TimerEngine, TimerMode};

/// Gap between a completion and the automatic switch to the next phase.
const AUTO_ADVANCE_MS: u64 = 1500;
/// How long the done state lingers after a manual end.
const DONE_REVERT_END_SECS: u64 = 5;
/// How long the done state lingers after a natural finish with no break.
const DONE_REVERT_FINISH_SECS: u64 = 8;

const DEFAULT_FOCUS_SECS: u64 = 25 * 60;

/// Full state snapshot for a display that just asked.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub time: String,
    pub progress: f64,
    pub status: TimerMode,
    pub total_seconds: u64,
    pub remaining_seconds: u64,
    pub is_break: bool,
    pub session_start: Option<DateTime<Utc>>,
    pub label: String,
}

/// Drives the countdown from a 1 Hz ticker task and turns engine events into
/// side effects: ledger writes, chimes, notifications, and window swaps.
/// Cheap to clone; all clones share the same engine.
#[derive(Clone)]
pub struct TimerController {
    app: AppHandle,
    store: DataStore,
    engine: Arc<tokio::sync::Mutex<TimerEngine>>,
    label: Arc<Mutex<String>>,
    ticker: Arc<Mutex<Option<tauri::async_runtime::JoinHandle<()>>>>,
    /// Delayed auto-advance or done-revert, superseded by any user action.
    pending: Arc<Mutex<Option<tauri::async_runtime::JoinHandle<()>>>>,
    /// Mirror of the run state for cheap reads off the async path.
    running: Arc<AtomicBool>,
}

impl TimerController {
    pub fn new(app: AppHandle, store: DataStore) -> Self {
        Self {
            app,
            store,
            engine: Arc::new(tokio::sync::Mutex::new(TimerEngine::new(DEFAULT_FOCUS_SECS))),
            label: Arc::new(Mutex::new(String::new())),
            ticker: Arc::new(Mutex::new(None)),
            pending: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag the idle monitor polls.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    fn windows(&self) -> Option<Arc<WindowOrchestrator>> {
        use tauri::Manager;
        self.app
            .try_state::<crate::AppState>()
            .map(|state| state.windows.clone())
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        let engine = self.engine.lock().await;
        let payload = engine.tick_payload();
        TimerSnapshot {
            time: payload.time,
            progress: payload.progress,
            status: payload.status,
            total_seconds: engine.total_seconds(),
            remaining_seconds: engine.remaining_seconds(),
            is_break: engine.is_break(),
            session_start: engine.session_start(),
            label: self.label.lock().unwrap().clone(),
        }
    }

    pub async fn set_duration(&self, seconds: u64) {
        {
            let mut engine = self.engine.lock().await;
            engine.set_duration(seconds);
        }
        self.broadcast_time().await;
    }

    pub fn set_label(&self, label: String) {
        *self.label.lock().unwrap() = label;
    }

    pub async fn start(&self) {
        self.cancel_pending();
        let started = {
            let mut engine = self.engine.lock().await;
            engine.start(Utc::now());
            engine.is_running()
        };
        if started {
            self.running.store(true, Ordering::Relaxed);
            self.spawn_ticker();
            if let Some(windows) = self.windows() {
                windows.set_timer_running(true);
            }
        }
        self.broadcast_time().await;
    }

    pub async fn pause(&self) {
        self.cancel_pending();
        {
            let mut engine = self.engine.lock().await;
            engine.pause();
        }
        self.running.store(false, Ordering::Relaxed);
        self.stop_ticker();
        self.broadcast_time().await;
    }

    pub async fn resume(&self) {
        self.cancel_pending();
        let resumed = {
            let mut engine = self.engine.lock().await;
            engine.resume(Utc::now());
            engine.is_running()
        };
        if resumed {
            self.running.store(true, Ordering::Relaxed);
            self.spawn_ticker();
        }
        self.broadcast_time().await;
    }

    pub async fn toggle_pause(&self) {
        let paused = {
            let engine = self.engine.lock().await;
            engine.is_paused()
        };
        let running = self.running.load(Ordering::Relaxed);
        if running {
            self.pause().await;
        } else if paused {
            self.resume().await;
        } else {
            self.start().await;
        }
    }

    /// End the focus stretch now. Returns the ledger index when the elapsed
    /// time was long enough to record, so the display can offer a notes
    /// prompt.
    pub async fn end(&self) -> Option<usize> {
        self.cancel_pending();
        let outcome = {
            let mut engine = self.engine.lock().await;
            engine.end()
        };
        if outcome == EndOutcome::Ignored {
            return None;
        }
        self.running.store(false, Ordering::Relaxed);
        self.stop_ticker();
        if let Some(windows) = self.windows() {
            windows.set_timer_running(false);
        }

        let label = self.label.lock().unwrap().clone();
        let index = record_end(&self.store, outcome, &label, Utc::now());
        if let EndOutcome::Logged { elapsed } = outcome {
            info!("session ended early after {elapsed}s");
            self.notify_session_logged(elapsed);
            self.schedule_done_revert(DONE_REVERT_END_SECS);
        }
        self.broadcast_time().await;
        index
    }

    pub async fn reset(&self) {
        self.cancel_pending();
        {
            let mut engine = self.engine.lock().await;
            engine.reset();
        }
        self.running.store(false, Ordering::Relaxed);
        self.stop_ticker();
        if let Some(windows) = self.windows() {
            windows.set_timer_running(false);
        }
        self.broadcast_time().await;
    }

    fn spawn_ticker(&self) {
        let mut guard = self.ticker.lock().unwrap();
        if let Some(task) = guard.take() {
            task.abort();
        }
        let controller = self.clone();
        *guard = Some(tauri::async_runtime::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !controller.advance().await {
                    break;
                }
            }
        }));
    }

    fn stop_ticker(&self) {
        if let Some(task) = self.ticker.lock().unwrap().take() {
            task.abort();
        }
    }

    /// One second of countdown. Returns false once the ticker should stop.
    async fn advance(&self) -> bool {
        let (completion, still_running) = {
            let mut engine = self.engine.lock().await;
            let completion = engine.tick();
            (completion, engine.is_running())
        };
        self.broadcast_time().await;
        if let Some(completion) = completion {
            self.running.store(false, Ordering::Relaxed);
            self.handle_completion(completion).await;
        }
        still_running
    }

    async fn handle_completion(&self, completion: Completion) {
        match completion {
            Completion::FocusFinished { elapsed } => {
                audio::play_completion_chime();
                let label = self.label.lock().unwrap().clone();
                self.store.add_session(elapsed, &label, Utc::now());
                info!("focus session finished ({elapsed}s)");
                self.notify_session_logged(elapsed);

                let break_settings = self.store.settings().timer.break_timer;
                if break_settings.enabled {
                    // Stay on the mini surface through the short gap.
                    let secs = u64::from(break_settings.break_minutes) * 60;
                    let controller = self.clone();
                    self.schedule(Duration::from_millis(AUTO_ADVANCE_MS), async move {
                        controller.begin_break(secs).await;
                    });
                } else {
                    if let Some(windows) = self.windows() {
                        windows.set_timer_running(false);
                    }
                    self.schedule_done_revert(DONE_REVERT_FINISH_SECS);
                }
            }
            Completion::BreakFinished { .. } => {
                audio::play_completion_chime();
                let controller = self.clone();
                self.schedule(Duration::from_millis(AUTO_ADVANCE_MS), async move {
                    controller.start().await;
                });
            }
        }
    }

    async fn begin_break(&self, seconds: u64) {
        {
            let mut engine = self.engine.lock().await;
            engine.begin_break(seconds, Utc::now());
        }
        self.running.store(true, Ordering::Relaxed);
        self.spawn_ticker();
        self.broadcast_time().await;
    }

    /// After the done state has been on screen long enough, rewind the
    /// display to a fresh countdown.
    fn schedule_done_revert(&self, delay_secs: u64) {
        let controller = self.clone();
        self.schedule(Duration::from_secs(delay_secs), async move {
            {
                let mut engine = controller.engine.lock().await;
                engine.acknowledge_done();
            }
            controller.broadcast_time().await;
        });
    }

    fn schedule(&self, delay: Duration, task: impl std::future::Future<Output = ()> + Send + 'static) {
        let mut guard = self.pending.lock().unwrap();
        if let Some(previous) = guard.take() {
            previous.abort();
        }
        *guard = Some(tauri::async_runtime::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    fn cancel_pending(&self) {
        if let Some(task) = self.pending.lock().unwrap().take() {
            task.abort();
        }
    }

    async fn broadcast_time(&self) {
        let payload = {
            let engine = self.engine.lock().await;
            engine.tick_payload()
        };
        if let Some(windows) = self.windows() {
            windows.broadcast(&crate::ipc::DisplayMessage::UpdateTime(payload));
        }
    }

    fn notify_session_logged(&self, elapsed: u64) {
        let result = self
            .app
            .notification()
            .builder()
            .title("Session complete")
            .body(format!("{} of focus logged.", format_duration(elapsed)))
            .show();
        if let Err(err) = result {
            warn!("notification failed: {err}");
        }
    }
}

/// Ledger write for an explicit end. Only a long-enough stretch produces a
/// record; discarded and ignored ends leave the ledger untouched and give
/// the display nothing to attach notes to.
fn record_end(
    store: &DataStore,
    outcome: EndOutcome,
    label: &str,
    ended_at: chrono::DateTime<Utc>,
) -> Option<usize> {
    match outcome {
        EndOutcome::Logged { elapsed } => Some(store.add_session(elapsed, label, ended_at)),
        EndOutcome::Discarded | EndOutcome::Ignored => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, DataStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path().join("focusflow-data.json"));
        (dir, store)
    }

    #[test]
    fn short_end_yields_no_session_index() {
        let (_dir, store) = store();
        assert_eq!(
            record_end(&store, EndOutcome::Discarded, "writing", Utc::now()),
            None
        );
        assert_eq!(
            record_end(&store, EndOutcome::Ignored, "writing", Utc::now()),
            None
        );
        assert!(store.sessions().is_empty());
    }

    #[test]
    fn logged_end_returns_the_new_index() {
        let (_dir, store) = store();
        let index = record_end(
            &store,
            EndOutcome::Logged { elapsed: 42 },
            "writing",
            Utc::now(),
        );
        assert_eq!(index, Some(0));
        let sessions = store.sessions();
        assert_eq!(sessions[0].duration, 42);
        assert_eq!(sessions[0].label, "writing");
    }
}
