use chrono::{DateTime, Utc};
use serde::Serialize;

/// Focus stretches shorter than this are dropped instead of logged when the
/// user ends a session early.
pub const MIN_LOGGED_SECS: u64 = 10;

/// What a tick that hit zero means for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// A focus countdown ran out naturally; `elapsed` is the full duration.
    FocusFinished { elapsed: u64 },
    /// A break ran out; the focus timer should come back at this duration.
    BreakFinished { resume_focus_secs: u64 },
}

/// Result of an explicit end request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOutcome {
    /// Nothing was in flight (or a break was running, which cannot be ended
    /// into a session).
    Ignored,
    /// The stretch was too short to be worth a ledger entry.
    Discarded,
    /// `elapsed` seconds of focus should be logged.
    Logged { elapsed: u64 },
}

/// Coarse phase reported to the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Ready,
    Focusing,
    Paused,
    Break,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickPayload {
    pub time: String,
    pub progress: f64,
    pub status: TimerMode,
}

/// The countdown itself, with no clocks or I/O attached. The controller
/// drives it from a 1 Hz ticker; everything here is synchronous so the
/// transitions can be tested directly.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    total_seconds: u64,
    remaining_seconds: u64,
    running: bool,
    paused: bool,
    break_mode: bool,
    /// Focus duration to restore once a break ends.
    last_focus_duration: u64,
    session_start: Option<DateTime<Utc>>,
    /// Set after a completion or logged end until the display acknowledges it.
    done: bool,
}

impl TimerEngine {
    pub fn new(total_seconds: u64) -> Self {
        Self {
            total_seconds,
            remaining_seconds: total_seconds,
            running: false,
            paused: false,
            break_mode: false,
            last_focus_duration: total_seconds,
            session_start: None,
            done: false,
        }
    }

    /// Change the focus duration. Ignored while a countdown is in flight so
    /// the display cannot yank a running timer out from under itself.
    pub fn set_duration(&mut self, seconds: u64) {
        if self.running || self.paused {
            return;
        }
        self.total_seconds = seconds;
        self.remaining_seconds = seconds;
        self.last_focus_duration = seconds;
        self.done = false;
    }

    /// Start, or resume if paused. A zero-length countdown never starts.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.running {
            return;
        }
        if self.paused {
            self.paused = false;
            self.running = true;
            return;
        }
        // Starting while the done state lingers begins a fresh countdown
        // instead of wedging on the expired one.
        self.acknowledge_done();
        if self.remaining_seconds == 0 {
            return;
        }
        if !self.break_mode {
            self.last_focus_duration = self.total_seconds;
            self.session_start = Some(now);
        }
        self.running = true;
        self.done = false;
    }

    pub fn pause(&mut self) {
        if self.running {
            self.running = false;
            self.paused = true;
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        if self.paused {
            self.start(now);
        }
    }

    pub fn toggle_pause(&mut self, now: DateTime<Utc>) {
        if self.running {
            self.pause();
        } else {
            self.start(now);
        }
    }

    /// Advance one second. Returns what happened when the countdown hits
    /// zero, otherwise `None`.
    pub fn tick(&mut self) -> Option<Completion> {
        if !self.running {
            return None;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return None;
        }
        self.running = false;
        if self.break_mode {
            self.break_mode = false;
            let resume = self.last_focus_duration;
            self.total_seconds = resume;
            self.remaining_seconds = resume;
            Some(Completion::BreakFinished {
                resume_focus_secs: resume,
            })
        } else {
            self.done = true;
            self.session_start = None;
            Some(Completion::FocusFinished {
                elapsed: self.total_seconds,
            })
        }
    }

    /// End the current focus stretch early. Breaks cannot be ended into a
    /// session and are ignored.
    pub fn end(&mut self) -> EndOutcome {
        if self.break_mode || (!self.running && !self.paused) {
            return EndOutcome::Ignored;
        }
        let elapsed = self.total_seconds - self.remaining_seconds;
        self.running = false;
        self.paused = false;
        self.session_start = None;
        if elapsed < MIN_LOGGED_SECS {
            self.remaining_seconds = self.total_seconds;
            return EndOutcome::Discarded;
        }
        self.done = true;
        self.remaining_seconds = self.total_seconds;
        EndOutcome::Logged { elapsed }
    }

    /// Swap into a break countdown (called after a focus completion).
    pub fn begin_break(&mut self, seconds: u64, now: DateTime<Utc>) {
        self.break_mode = true;
        self.done = false;
        self.total_seconds = seconds;
        self.remaining_seconds = seconds;
        self.paused = false;
        self.running = true;
        self.session_start = Some(now);
    }

    /// Abandon whatever is in flight and rewind to the focus duration.
    pub fn reset(&mut self) {
        if self.break_mode {
            self.total_seconds = self.last_focus_duration;
        }
        self.break_mode = false;
        self.running = false;
        self.paused = false;
        self.done = false;
        self.session_start = None;
        self.remaining_seconds = self.total_seconds;
    }

    /// The display saw the done state; rewind for the next session.
    pub fn acknowledge_done(&mut self) {
        if self.done {
            self.done = false;
            self.remaining_seconds = self.total_seconds;
        }
    }

    pub fn mode(&self) -> TimerMode {
        if self.done {
            TimerMode::Done
        } else if self.break_mode {
            TimerMode::Break
        } else if self.paused {
            TimerMode::Paused
        } else if self.running {
            TimerMode::Focusing
        } else {
            TimerMode::Ready
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_break(&self) -> bool {
        self.break_mode
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    pub fn session_start(&self) -> Option<DateTime<Utc>> {
        self.session_start
    }

    /// Remaining time as `HH:MM:SS`.
    pub fn clock(&self) -> String {
        let s = self.remaining_seconds;
        format!("{:02}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60)
    }

    pub fn tick_payload(&self) -> TickPayload {
        let progress = if self.total_seconds == 0 {
            0.0
        } else {
            (self.total_seconds - self.remaining_seconds) as f64 / self.total_seconds as f64
        };
        TickPayload {
            time: self.clock(),
            progress,
            status: self.mode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn run_out(engine: &mut TimerEngine) -> Completion {
        loop {
            if let Some(completion) = engine.tick() {
                return completion;
            }
        }
    }

    #[test]
    fn starts_and_counts_down() {
        let mut engine = TimerEngine::new(3);
        assert_eq!(engine.mode(), TimerMode::Ready);
        engine.start(now());
        assert_eq!(engine.mode(), TimerMode::Focusing);
        assert_eq!(engine.tick(), None);
        assert_eq!(engine.remaining_seconds(), 2);
        assert_eq!(engine.clock(), "00:00:02");
    }

    #[test]
    fn zero_duration_never_starts() {
        let mut engine = TimerEngine::new(0);
        engine.start(now());
        assert_eq!(engine.mode(), TimerMode::Ready);
    }

    #[test]
    fn ticks_are_inert_while_paused() {
        let mut engine = TimerEngine::new(10);
        engine.start(now());
        engine.tick();
        engine.pause();
        assert_eq!(engine.mode(), TimerMode::Paused);
        assert_eq!(engine.tick(), None);
        assert_eq!(engine.remaining_seconds(), 9);
        engine.resume(now());
        engine.tick();
        assert_eq!(engine.remaining_seconds(), 8);
    }

    #[test]
    fn natural_finish_reports_full_duration_and_goes_done() {
        let mut engine = TimerEngine::new(3);
        engine.start(now());
        assert_eq!(run_out(&mut engine), Completion::FocusFinished { elapsed: 3 });
        assert_eq!(engine.mode(), TimerMode::Done);
        assert_eq!(engine.remaining_seconds(), 0);

        engine.acknowledge_done();
        assert_eq!(engine.mode(), TimerMode::Ready);
        assert_eq!(engine.remaining_seconds(), 3);
    }

    #[test]
    fn start_while_done_begins_a_fresh_countdown() {
        let mut engine = TimerEngine::new(3);
        engine.start(now());
        let _ = run_out(&mut engine);
        assert_eq!(engine.mode(), TimerMode::Done);

        // Pressing start without waiting out the done state.
        engine.start(now());
        assert_eq!(engine.mode(), TimerMode::Focusing);
        assert_eq!(engine.remaining_seconds(), 3);
        assert_eq!(engine.tick(), None);
        assert_eq!(engine.remaining_seconds(), 2);
    }

    #[test]
    fn duration_is_locked_while_in_flight() {
        let mut engine = TimerEngine::new(100);
        engine.start(now());
        engine.set_duration(5);
        assert_eq!(engine.total_seconds(), 100);
        engine.pause();
        engine.set_duration(5);
        assert_eq!(engine.total_seconds(), 100);
        engine.reset();
        engine.set_duration(5);
        assert_eq!(engine.total_seconds(), 5);
    }

    #[test]
    fn short_end_is_discarded_and_rewound() {
        let mut engine = TimerEngine::new(1500);
        engine.start(now());
        for _ in 0..5 {
            engine.tick();
        }
        assert_eq!(engine.end(), EndOutcome::Discarded);
        assert_eq!(engine.mode(), TimerMode::Ready);
        assert_eq!(engine.remaining_seconds(), 1500);
    }

    #[test]
    fn long_end_logs_elapsed_and_goes_done() {
        let mut engine = TimerEngine::new(1500);
        engine.start(now());
        for _ in 0..42 {
            engine.tick();
        }
        assert_eq!(engine.end(), EndOutcome::Logged { elapsed: 42 });
        assert_eq!(engine.mode(), TimerMode::Done);
        assert_eq!(engine.remaining_seconds(), 1500);
    }

    #[test]
    fn end_without_a_session_is_ignored() {
        let mut engine = TimerEngine::new(1500);
        assert_eq!(engine.end(), EndOutcome::Ignored);
    }

    #[test]
    fn end_while_paused_still_logs() {
        let mut engine = TimerEngine::new(1500);
        engine.start(now());
        for _ in 0..30 {
            engine.tick();
        }
        engine.pause();
        assert_eq!(engine.end(), EndOutcome::Logged { elapsed: 30 });
    }

    #[test]
    fn break_finish_restores_the_focus_duration() {
        let mut engine = TimerEngine::new(1500);
        engine.start(now());
        let _ = run_out(&mut engine);
        engine.acknowledge_done();

        engine.begin_break(2, now());
        assert_eq!(engine.mode(), TimerMode::Break);
        assert_eq!(
            run_out(&mut engine),
            Completion::BreakFinished {
                resume_focus_secs: 1500
            }
        );
        assert_eq!(engine.mode(), TimerMode::Ready);
        assert_eq!(engine.remaining_seconds(), 1500);
    }

    #[test]
    fn ending_a_break_is_ignored() {
        let mut engine = TimerEngine::new(1500);
        engine.begin_break(300, now());
        engine.tick();
        assert_eq!(engine.end(), EndOutcome::Ignored);
        assert_eq!(engine.mode(), TimerMode::Break);
    }

    #[test]
    fn reset_during_break_rewinds_to_focus_duration() {
        let mut engine = TimerEngine::new(1500);
        engine.begin_break(300, now());
        engine.tick();
        engine.reset();
        assert_eq!(engine.mode(), TimerMode::Ready);
        assert_eq!(engine.total_seconds(), 1500);
        assert_eq!(engine.remaining_seconds(), 1500);
    }

    #[test]
    fn progress_runs_from_zero_to_one() {
        let mut engine = TimerEngine::new(4);
        engine.start(now());
        assert_eq!(engine.tick_payload().progress, 0.0);
        engine.tick();
        assert_eq!(engine.tick_payload().progress, 0.25);
        engine.tick();
        engine.tick();
        engine.tick();
        assert_eq!(engine.tick_payload().progress, 1.0);
        assert_eq!(engine.tick_payload().status, TimerMode::Done);
    }
}
