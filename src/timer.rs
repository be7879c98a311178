use crate::clock::{duration_ms, Clock};
use crate::config::Config;
use crate::schedule::{Scheduler, TaskHandle};
use crate::util::format_time;
use std::time::{Duration, Instant};

pub const READY_LABEL: &str = "READY";
pub const HOLD_LABEL: &str = "HOLD...";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerSettings {
    pub min_hold: Duration,
    pub settle: Duration,
    pub refresh: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for TimerSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            min_hold: Duration::from_millis(cfg.min_hold_ms),
            settle: Duration::from_millis(cfg.settle_ms),
            refresh: Duration::from_millis(cfg.refresh_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum TimerPhase {
    Idle,
    Arming,
    Running,
    Settled,
}

/// What a single input or timer event did to the stopwatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// Event not meaningful in the current phase
    Ignored,
    Armed,
    /// Released before the minimum hold; no solve
    Disarmed { held_ms: f64 },
    Started,
    /// Display ticker fired while running
    Refreshed { elapsed_ms: f64 },
    /// Run stopped; the caller owns recording this time
    Settled { elapsed_ms: f64 },
    /// Settle delay ran out
    Reset,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Idle,
    Arming { since: Instant },
    Running { since: Instant },
    Settled { elapsed_ms: f64 },
}

/// Hold-to-start stopwatch driven by a single press/release signal.
///
/// Owns two timer resources: a periodic display ticker that exists only
/// while running, and a one-shot auto-return that exists only while settled.
/// Each slot holds at most one handle and is cancelled before being replaced.
#[derive(Debug)]
pub struct Stopwatch<C: Clock> {
    clock: C,
    settings: TimerSettings,
    state: State,
    scheduler: Scheduler,
    ticker: Option<TaskHandle>,
    auto_return: Option<TaskHandle>,
    live_ms: f64,
}

impl<C: Clock> Stopwatch<C> {
    pub fn new(clock: C, settings: TimerSettings) -> Self {
        Self {
            clock,
            settings,
            state: State::Idle,
            scheduler: Scheduler::new(),
            ticker: None,
            auto_return: None,
            live_ms: 0.0,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        match self.state {
            State::Idle => TimerPhase::Idle,
            State::Arming { .. } => TimerPhase::Arming,
            State::Running { .. } => TimerPhase::Running,
            State::Settled { .. } => TimerPhase::Settled,
        }
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn signal_down(&mut self) -> Transition {
        let now = self.clock.now();
        let transition = match self.state {
            State::Idle => self.arm(now),
            State::Arming { .. } => Transition::Ignored,
            State::Running { since } => {
                let elapsed_ms = duration_ms(now.saturating_duration_since(since));
                self.stop_ticker();
                self.state = State::Settled { elapsed_ms };
                self.live_ms = elapsed_ms;
                self.schedule_auto_return(now);
                Transition::Settled { elapsed_ms }
            }
            State::Settled { .. } => {
                // Same cleanup as the timed auto-return, then honor the new hold.
                self.return_to_idle();
                self.arm(now)
            }
        };
        self.trace(transition);
        transition
    }

    pub fn signal_up(&mut self) -> Transition {
        let now = self.clock.now();
        let transition = match self.state {
            State::Arming { since } => {
                let held = now.saturating_duration_since(since);
                if held < self.settings.min_hold {
                    self.return_to_idle();
                    Transition::Disarmed {
                        held_ms: duration_ms(held),
                    }
                } else {
                    self.state = State::Running { since: now };
                    self.live_ms = 0.0;
                    self.start_ticker(now);
                    Transition::Started
                }
            }
            _ => Transition::Ignored,
        };
        self.trace(transition);
        transition
    }

    /// Fire whatever scheduled work is due and feed it back as events.
    pub fn poll(&mut self) -> Vec<Transition> {
        let now = self.clock.now();
        let mut transitions = Vec::new();

        for handle in self.scheduler.fire_due(now) {
            if self.auto_return == Some(handle) {
                self.auto_return = None;
                if let State::Settled { .. } = self.state {
                    self.return_to_idle();
                    self.trace(Transition::Reset);
                    transitions.push(Transition::Reset);
                }
            } else if self.ticker == Some(handle) {
                if let State::Running { since } = self.state {
                    self.live_ms = duration_ms(now.saturating_duration_since(since));
                    transitions.push(Transition::Refreshed {
                        elapsed_ms: self.live_ms,
                    });
                }
            }
        }

        transitions
    }

    /// Release both timer resources; used when the session ends.
    pub fn cancel_all(&mut self) {
        self.return_to_idle();
    }

    /// Time spent in the arming phase so far
    pub fn held_for(&self) -> Option<Duration> {
        match self.state {
            State::Arming { since } => Some(self.clock.now().saturating_duration_since(since)),
            _ => None,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        match self.state {
            State::Running { since } => duration_ms(self.clock.now().saturating_duration_since(since)),
            State::Settled { elapsed_ms } => elapsed_ms,
            State::Idle | State::Arming { .. } => 0.0,
        }
    }

    /// Text for the main timer display. The running value only moves when
    /// the display ticker fires.
    pub fn display(&self) -> String {
        match self.state {
            State::Idle => READY_LABEL.to_string(),
            State::Arming { .. } => HOLD_LABEL.to_string(),
            State::Running { .. } => format_time(Some(self.live_ms)),
            State::Settled { elapsed_ms } => format_time(Some(elapsed_ms)),
        }
    }

    pub fn has_ticker(&self) -> bool {
        self.ticker.is_some_and(|h| self.scheduler.is_live(h))
    }

    pub fn has_pending_auto_return(&self) -> bool {
        self.auto_return.is_some_and(|h| self.scheduler.is_live(h))
    }

    pub fn scheduled_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    fn arm(&mut self, now: Instant) -> Transition {
        self.state = State::Arming { since: now };
        self.live_ms = 0.0;
        Transition::Armed
    }

    fn return_to_idle(&mut self) {
        self.stop_ticker();
        if let Some(h) = self.auto_return.take() {
            self.scheduler.cancel(h);
        }
        self.state = State::Idle;
        self.live_ms = 0.0;
    }

    fn start_ticker(&mut self, now: Instant) {
        self.stop_ticker();
        self.ticker = Some(self.scheduler.schedule_every(now, self.settings.refresh));
    }

    fn stop_ticker(&mut self) {
        if let Some(h) = self.ticker.take() {
            self.scheduler.cancel(h);
        }
    }

    fn schedule_auto_return(&mut self, now: Instant) {
        if let Some(h) = self.auto_return.take() {
            self.scheduler.cancel(h);
        }
        self.auto_return = Some(self.scheduler.schedule_once(now, self.settings.settle));
    }

    fn trace(&self, transition: Transition) {
        if transition != Transition::Ignored {
            tracing::debug!(phase = %self.phase(), ?transition, "stopwatch transition");
        }
    }
}
