//! Session engine implementation.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads - the caller is responsible for calling `tick()` periodically.
//! Elapsed time is always `now - started_at`, so missed ticks and process
//! suspension cannot corrupt it.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused -> Running)* -> Ringing -> Idle
//!           any state --reset/toggle_mode--> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new(SystemClock, Database::open()?, alerts);
//! engine.start();
//! // Once a second:
//! engine.tick(); // Returns Some(Event::RingingStarted) when the session completes
//! ```

use chrono::Duration;

use super::progress::{format_mm_ss, ProgressBand};
use super::session::{clamp_minutes, Session, SessionMode, SessionState};
use crate::alert::AlertLoop;
use crate::clock::{secs_between, Clock};
use crate::events::Event;
use crate::storage::SessionStore;

/// Tunables the host may read from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Duration selected when switching to focus, and of a fresh session.
    pub focus_minutes: u32,
    /// Duration selected when switching to break.
    pub break_minutes: u32,
    /// Dismissing the alert switches to the opposite mode.
    pub auto_advance: bool,
}

impl EngineOptions {
    pub fn default_minutes(&self, mode: SessionMode) -> u32 {
        match mode {
            SessionMode::Focus => self.focus_minutes,
            SessionMode::Break => self.break_minutes,
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            break_minutes: 5,
            auto_advance: false,
        }
    }
}

/// Core session engine.
///
/// Owns the session exclusively. Every mutating operation writes the session
/// through to the store; reads never touch it.
pub struct SessionEngine<C, S, A>
where
    C: Clock,
    S: SessionStore,
    A: AlertLoop,
{
    clock: C,
    store: S,
    alerts: A,
    options: EngineOptions,
    session: Session,
}

impl<C, S, A> SessionEngine<C, S, A>
where
    C: Clock,
    S: SessionStore,
    A: AlertLoop,
{
    /// Restore the engine from `store` and reconcile it against `clock`.
    pub fn new(clock: C, store: S, alerts: A) -> Self {
        Self::with_options(clock, store, alerts, EngineOptions::default())
    }

    pub fn with_options(clock: C, store: S, alerts: A, options: EngineOptions) -> Self {
        let options = EngineOptions {
            focus_minutes: clamp_minutes(f64::from(options.focus_minutes)),
            break_minutes: clamp_minutes(f64::from(options.break_minutes)),
            ..options
        };
        let session = Self::restore(&store, &options);
        let mut engine = Self {
            clock,
            store,
            alerts,
            options,
            session,
        };
        engine.reconcile_on_launch();
        engine
    }

    fn restore(store: &S, options: &EngineOptions) -> Session {
        let fresh = || Session::new(SessionMode::Focus, options.focus_minutes);
        match store.load() {
            Ok(Some(record)) => match Session::decode(&record) {
                Ok(session) => {
                    tracing::debug!(state = ?session.state.kind(), "restored session");
                    session
                }
                Err(e) => {
                    tracing::warn!(error = %e, "discarding corrupt session record");
                    fresh()
                }
            },
            Ok(None) => fresh(),
            Err(e) => {
                tracing::warn!(error = %e, "session store unreadable, starting fresh");
                fresh()
            }
        }
    }

    /// One jump from the persisted start instant to now. No per-second replay.
    fn reconcile_on_launch(&mut self) {
        match self.session.state {
            SessionState::Running { .. } => {
                if self.reconcile().is_some() {
                    tracing::info!("session completed while suspended");
                }
            }
            SessionState::Ringing => self.alerts.start(),
            SessionState::Idle | SessionState::Paused => {}
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn mode(&self) -> SessionMode {
        self.session.mode
    }

    pub fn duration_minutes(&self) -> u32 {
        self.session.duration_minutes
    }

    pub fn total_secs(&self) -> f64 {
        self.session.total_secs()
    }

    /// Elapsed seconds as of now, within `[0, total]`.
    pub fn effective_elapsed(&self) -> f64 {
        let total = self.total_secs();
        match self.session.state {
            SessionState::Running { started_at } => {
                secs_between(started_at, self.clock.now()).clamp(0.0, total)
            }
            _ => self.session.elapsed_secs.min(total),
        }
    }

    pub fn remaining_secs(&self) -> f64 {
        (self.total_secs() - self.effective_elapsed()).max(0.0)
    }

    /// Remaining time as `MM:SS`.
    pub fn remaining_display(&self) -> String {
        format_mm_ss(self.remaining_secs())
    }

    /// 0.0 .. 1.0 progress within the session.
    pub fn progress(&self) -> f64 {
        let total = self.total_secs();
        if total <= 0.0 {
            return 0.0;
        }
        (self.effective_elapsed() / total).clamp(0.0, 1.0)
    }

    pub fn progress_band(&self) -> ProgressBand {
        ProgressBand::from_progress(self.progress())
    }

    pub fn session_label(&self) -> &'static str {
        self.session.mode.label()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.session.state, SessionState::Running { .. })
    }

    pub fn is_ringing(&self) -> bool {
        self.session.state == SessionState::Ringing
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn alert_loop(&self) -> &A {
        &self.alerts
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.session.state.kind(),
            mode: self.session.mode,
            session_label: self.session_label().to_string(),
            duration_minutes: self.session.duration_minutes,
            elapsed_secs: self.effective_elapsed(),
            remaining_secs: self.remaining_secs(),
            remaining_display: self.remaining_display(),
            progress: self.progress(),
            progress_band: self.progress_band(),
            is_running: self.is_running(),
            is_ringing: self.is_ringing(),
            started_at: self.session.state.started_at(),
            at: self.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start from idle or resume from pause. No-op while running or ringing.
    pub fn start(&mut self) -> Option<Event> {
        match self.session.state {
            SessionState::Idle | SessionState::Paused => {
                let now = self.clock.now();
                let carried = self.session.elapsed_secs;
                let started_at = now - Duration::milliseconds((carried * 1000.0).round() as i64);
                self.session.state = SessionState::Running { started_at };
                self.save();
                tracing::debug!(resumed_from_secs = carried, "session started");
                Some(Event::SessionStarted {
                    mode: self.session.mode,
                    duration_minutes: self.session.duration_minutes,
                    resumed_from_secs: carried,
                    at: now,
                })
            }
            SessionState::Running { .. } | SessionState::Ringing => None,
        }
    }

    /// Freeze elapsed time. If the session already ran out, it rings instead.
    pub fn pause(&mut self) -> Option<Event> {
        if let Some(rang) = self.reconcile() {
            return Some(rang);
        }
        match self.session.state {
            SessionState::Running { .. } => {
                self.session.elapsed_secs = self.effective_elapsed();
                self.session.state = SessionState::Paused;
                self.save();
                tracing::debug!(elapsed_secs = self.session.elapsed_secs, "session paused");
                Some(Event::SessionPaused {
                    elapsed_secs: self.session.elapsed_secs,
                    remaining_secs: self.remaining_secs(),
                    at: self.clock.now(),
                })
            }
            _ => None,
        }
    }

    /// Pause when running, start otherwise.
    pub fn toggle(&mut self) -> Option<Event> {
        if self.is_running() {
            self.pause()
        } else {
            self.start()
        }
    }

    pub fn reset(&mut self) -> Option<Event> {
        self.clear();
        self.save();
        tracing::debug!("session reset");
        Some(Event::SessionReset {
            at: self.clock.now(),
        })
    }

    /// Call periodically. Returns `Some(Event::RingingStarted)` when the session completes.
    pub fn tick(&mut self) -> Option<Event> {
        self.reconcile()
    }

    /// Change the duration, clamped to `[1, 60]` minutes.
    ///
    /// While running or ringing the session restarts from idle. While idle or
    /// paused only the duration changes, unless prior progress no longer fits.
    pub fn set_duration(&mut self, minutes: f64) -> Option<Event> {
        let duration_minutes = clamp_minutes(minutes);
        if f64::from(duration_minutes) != minutes {
            tracing::debug!(requested = minutes, applied = duration_minutes, "duration clamped");
        }
        self.session.duration_minutes = duration_minutes;

        let reset = match self.session.state {
            SessionState::Running { .. } | SessionState::Ringing => true,
            SessionState::Paused | SessionState::Idle => {
                self.session.elapsed_secs >= self.total_secs()
            }
        };
        if reset {
            self.clear();
        }
        self.save();
        Some(Event::DurationChanged {
            duration_minutes,
            reset,
            at: self.clock.now(),
        })
    }

    /// Switch focus <-> break, select that mode's default duration, and reset.
    pub fn toggle_mode(&mut self) -> Option<Event> {
        self.switch_mode();
        self.clear();
        self.save();
        tracing::debug!(mode = ?self.session.mode, "mode toggled");
        Some(Event::ModeToggled {
            mode: self.session.mode,
            duration_minutes: self.session.duration_minutes,
            at: self.clock.now(),
        })
    }

    /// Dismiss the alert. No-op unless ringing.
    pub fn stop_ringing(&mut self) -> Option<Event> {
        if !self.is_ringing() {
            return None;
        }
        self.clear();
        if self.options.auto_advance {
            self.switch_mode();
        }
        self.save();
        tracing::info!(next_mode = ?self.session.mode, "ringing stopped");
        Some(Event::RingingStopped {
            next_mode: self.session.mode,
            at: self.clock.now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Recompute elapsed time from the clock; ring if the session ran out.
    fn reconcile(&mut self) -> Option<Event> {
        if !self.is_running() {
            return None;
        }
        let elapsed = self.effective_elapsed();
        self.session.elapsed_secs = elapsed;
        if elapsed >= self.total_secs() {
            return Some(self.enter_ringing());
        }
        None
    }

    fn enter_ringing(&mut self) -> Event {
        self.session.elapsed_secs = self.total_secs();
        self.session.state = SessionState::Ringing;
        self.alerts.start();
        self.save();
        tracing::info!(mode = ?self.session.mode, "session complete, ringing");
        Event::RingingStarted {
            mode: self.session.mode,
            duration_minutes: self.session.duration_minutes,
            at: self.clock.now(),
        }
    }

    /// Back to idle with nothing elapsed. Stops the alert loop.
    fn clear(&mut self) {
        self.alerts.stop();
        self.session.elapsed_secs = 0.0;
        self.session.state = SessionState::Idle;
    }

    fn switch_mode(&mut self) {
        self.session.mode = self.session.mode.toggled();
        self.session.duration_minutes = self.options.default_minutes(self.session.mode);
    }

    fn save(&mut self) {
        let record = match self.session.encode() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode session");
                return;
            }
        };
        if let Err(e) = self.store.save(&record) {
            tracing::warn!(error = %e, "failed to persist session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::HeadlessAlertLoop;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use crate::timer::TimerState;
    use chrono::{TimeZone, Utc};

    type TestEngine = SessionEngine<ManualClock, MemoryStore, HeadlessAlertLoop>;

    fn engine() -> TestEngine {
        engine_with(MemoryStore::new())
    }

    fn engine_with(store: MemoryStore) -> TestEngine {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 23, 9, 0, 0).unwrap());
        SessionEngine::new(clock, store, HeadlessAlertLoop::new())
    }

    #[test]
    fn fresh_engine_is_idle_focus_25() {
        let engine = engine();
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.mode(), SessionMode::Focus);
        assert_eq!(engine.duration_minutes(), 25);
        assert_eq!(engine.remaining_display(), "25:00");
        assert_eq!(engine.session_label(), "Session");
        assert_eq!(engine.progress(), 0.0);
        assert_eq!(engine.progress_band(), ProgressBand::Normal);
    }

    #[test]
    fn reads_do_not_save() {
        let store = MemoryStore::new();
        let engine = engine_with(store.clone());
        let _ = engine.snapshot();
        let _ = engine.remaining_display();
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn start_pause_start() {
        let mut engine = engine();
        assert!(engine.start().is_some());
        assert!(engine.is_running());
        assert!(engine.start().is_none());

        engine.clock().advance_secs(30);
        assert!(engine.pause().is_some());
        assert_eq!(engine.state(), SessionState::Paused);
        assert_eq!(engine.session().elapsed_secs, 30.0);
        assert!(engine.pause().is_none());

        assert!(engine.start().is_some());
        assert!(engine.is_running());
    }

    #[test]
    fn start_then_pause_without_advance_keeps_elapsed() {
        let mut engine = engine();
        engine.start();
        engine.clock().advance(Duration::milliseconds(12_345));
        engine.pause();
        let paused_at = engine.session().elapsed_secs;
        assert_eq!(paused_at, 12.345);

        engine.start();
        engine.pause();
        assert_eq!(engine.session().elapsed_secs, paused_at);
    }

    #[test]
    fn toggle_flips_between_running_and_paused() {
        let mut engine = engine();
        engine.toggle();
        assert!(engine.is_running());
        engine.toggle();
        assert_eq!(engine.state(), SessionState::Paused);
    }

    #[test]
    fn tick_rings_when_elapsed_reaches_total() {
        let mut engine = engine();
        engine.set_duration(1.0);
        engine.start();

        engine.clock().advance_secs(59);
        assert!(engine.tick().is_none());
        assert!(engine.is_running());

        engine.clock().advance_secs(1);
        let event = engine.tick();
        assert!(matches!(event, Some(Event::RingingStarted { .. })));
        assert!(engine.is_ringing());
        assert!(engine.alert_loop().is_active());
        assert_eq!(engine.session().elapsed_secs, 60.0);
        assert!(engine.tick().is_none());
    }

    #[test]
    fn pause_after_time_ran_out_rings_instead() {
        let mut engine = engine();
        engine.start();
        engine.clock().advance_secs(2000);
        let event = engine.pause();
        assert!(matches!(event, Some(Event::RingingStarted { .. })));
        assert!(engine.is_ringing());
    }

    #[test]
    fn start_while_ringing_is_noop() {
        let mut engine = engine();
        engine.start();
        engine.clock().advance_secs(1500);
        engine.tick();
        assert!(engine.start().is_none());
        assert!(engine.toggle().is_none());
        assert!(engine.is_ringing());
    }

    #[test]
    fn reset_stops_alerts_and_zeroes() {
        let mut engine = engine();
        engine.start();
        engine.clock().advance_secs(1500);
        engine.tick();
        assert!(engine.alert_loop().is_active());

        engine.reset();
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.session().elapsed_secs, 0.0);
        assert!(!engine.alert_loop().is_active());
    }

    #[test]
    fn stop_ringing_returns_to_idle() {
        let mut engine = engine();
        assert!(engine.stop_ringing().is_none());

        engine.start();
        engine.clock().advance_secs(1500);
        engine.tick();
        let event = engine.stop_ringing();
        assert!(matches!(
            event,
            Some(Event::RingingStopped {
                next_mode: SessionMode::Focus,
                ..
            })
        ));
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.duration_minutes(), 25);
        assert!(!engine.alert_loop().is_active());
    }

    #[test]
    fn auto_advance_primes_opposite_mode() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 23, 9, 0, 0).unwrap());
        let options = EngineOptions {
            auto_advance: true,
            ..EngineOptions::default()
        };
        let mut engine = SessionEngine::with_options(
            clock,
            MemoryStore::new(),
            HeadlessAlertLoop::new(),
            options,
        );
        engine.start();
        engine.clock().advance_secs(1500);
        engine.tick();
        engine.stop_ringing();
        assert_eq!(engine.mode(), SessionMode::Break);
        assert_eq!(engine.duration_minutes(), 5);
        assert_eq!(engine.state(), SessionState::Idle);
    }

    #[test]
    fn set_duration_clamps() {
        let mut engine = engine();
        engine.set_duration(0.0);
        assert_eq!(engine.duration_minutes(), 1);
        engine.set_duration(500.0);
        assert_eq!(engine.duration_minutes(), 60);
        engine.set_duration(90.0);
        assert_eq!(engine.duration_minutes(), 60);
        engine.set_duration(-5.0);
        assert_eq!(engine.duration_minutes(), 1);
    }

    #[test]
    fn set_duration_while_running_resets() {
        let mut engine = engine();
        engine.start();
        engine.clock().advance_secs(120);
        let event = engine.set_duration(10.0);
        assert!(matches!(
            event,
            Some(Event::DurationChanged { reset: true, .. })
        ));
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.session().elapsed_secs, 0.0);
        assert_eq!(engine.remaining_display(), "10:00");
    }

    #[test]
    fn set_duration_while_paused_keeps_progress_that_fits() {
        let mut engine = engine();
        engine.start();
        engine.clock().advance_secs(120);
        engine.pause();

        engine.set_duration(10.0);
        assert_eq!(engine.state(), SessionState::Paused);
        assert_eq!(engine.session().elapsed_secs, 120.0);
        assert_eq!(engine.remaining_display(), "08:00");

        engine.set_duration(2.0);
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.session().elapsed_secs, 0.0);
    }

    #[test]
    fn set_duration_while_idle_drops_progress_that_no_longer_fits() {
        let store = MemoryStore::with_record(
            r#"{"mode":"focus","durationMinutes":25,"elapsedSeconds":1000,"state":"idle"}"#,
        );
        let mut engine = engine_with(store.clone());
        assert_eq!(engine.session().elapsed_secs, 1000.0);

        let event = engine.set_duration(1.0);
        assert!(matches!(event, Some(Event::DurationChanged { reset: true, .. })));
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.duration_minutes(), 1);
        assert_eq!(engine.session().elapsed_secs, 0.0);
        assert_eq!(engine.remaining_display(), "01:00");

        let saved = Session::decode(&store.record().unwrap()).unwrap();
        assert!(saved.elapsed_secs <= saved.total_secs());
    }

    #[test]
    fn set_duration_while_idle_keeps_progress_that_fits() {
        let store = MemoryStore::with_record(
            r#"{"mode":"focus","durationMinutes":25,"elapsedSeconds":30,"state":"idle"}"#,
        );
        let mut engine = engine_with(store);
        engine.set_duration(10.0);
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.session().elapsed_secs, 30.0);
    }

    #[test]
    fn set_duration_while_ringing_dismisses_alert() {
        let mut engine = engine();
        engine.start();
        engine.clock().advance_secs(1500);
        engine.tick();
        engine.set_duration(30.0);
        assert_eq!(engine.state(), SessionState::Idle);
        assert!(!engine.alert_loop().is_active());
    }

    #[test]
    fn toggle_mode_alternates_defaults() {
        let mut engine = engine();
        engine.start();
        engine.toggle_mode();
        assert_eq!(engine.mode(), SessionMode::Break);
        assert_eq!(engine.duration_minutes(), 5);
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.session_label(), "Break");

        engine.toggle_mode();
        assert_eq!(engine.mode(), SessionMode::Focus);
        assert_eq!(engine.duration_minutes(), 25);
    }

    #[test]
    fn every_mutation_saves() {
        let store = MemoryStore::new();
        let mut engine = engine_with(store.clone());
        engine.start();
        engine.pause();
        engine.set_duration(10.0);
        engine.toggle_mode();
        engine.reset();
        assert_eq!(store.save_count(), 5);

        engine.tick();
        assert_eq!(store.save_count(), 5);
    }

    #[test]
    fn progress_bands_follow_elapsed() {
        let mut engine = engine();
        engine.set_duration(10.0);
        engine.start();
        engine.clock().advance_secs(450);
        assert_eq!(engine.progress_band(), ProgressBand::Warning);
        engine.clock().advance_secs(90);
        assert_eq!(engine.progress_band(), ProgressBand::Critical);
        assert_eq!(engine.progress(), 0.9);
    }

    #[test]
    fn clock_running_backwards_clamps_to_zero() {
        let mut engine = engine();
        engine.start();
        engine.clock().advance_secs(-300);
        assert_eq!(engine.effective_elapsed(), 0.0);
        assert_eq!(engine.remaining_display(), "25:00");
    }

    #[test]
    fn snapshot_reports_derived_values() {
        let mut engine = engine();
        engine.start();
        engine.clock().advance_secs(600);
        match engine.snapshot() {
            Event::StateSnapshot {
                state,
                remaining_display,
                progress,
                is_running,
                started_at,
                ..
            } => {
                assert_eq!(state, TimerState::Running);
                assert_eq!(remaining_display, "15:00");
                assert_eq!(progress, 0.4);
                assert!(is_running);
                assert!(started_at.is_some());
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }
}
