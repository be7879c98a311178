use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::clock::Clock;
use crate::runtime::AppEvent;
use crate::session::Session;
use crate::solve::Solve;
use crate::store::Store;
use crate::timer::{Stopwatch, TimerPhase, Transition};

/// Without release reporting, held keys show up as a stream of presses.
/// A press this soon after the previous one is taken as auto-repeat; it
/// covers the usual initial repeat delay of desktop terminals.
pub const REPEAT_GAP: Duration = Duration::from_millis(700);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Panel {
    Overview,
    Averages,
    Times,
    #[strum(serialize = "Progress")]
    Chart,
}

impl Panel {
    pub const ALL: [Panel; 4] = [Panel::Overview, Panel::Averages, Panel::Times, Panel::Chart];

    fn from_digit(c: char) -> Option<Self> {
        match c {
            '1' => Some(Panel::Overview),
            '2' => Some(Panel::Averages),
            '3' => Some(Panel::Times),
            '4' => Some(Panel::Chart),
            _ => None,
        }
    }
}

/// Which statistics panels are on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panels {
    overview: bool,
    averages: bool,
    times: bool,
    chart: bool,
}

impl Default for Panels {
    fn default() -> Self {
        Self {
            overview: true,
            averages: true,
            times: true,
            chart: true,
        }
    }
}

impl Panels {
    fn slot(&mut self, panel: Panel) -> &mut bool {
        match panel {
            Panel::Overview => &mut self.overview,
            Panel::Averages => &mut self.averages,
            Panel::Times => &mut self.times,
            Panel::Chart => &mut self.chart,
        }
    }

    pub fn is_visible(&self, panel: Panel) -> bool {
        match panel {
            Panel::Overview => self.overview,
            Panel::Averages => self.averages,
            Panel::Times => self.times,
            Panel::Chart => self.chart,
        }
    }

    pub fn toggle(&mut self, panel: Panel) {
        let slot = self.slot(panel);
        *slot = !*slot;
    }

    pub fn any_visible(&self) -> bool {
        Panel::ALL.iter().any(|&p| self.is_visible(p))
    }

    /// Hide everything if anything is showing, otherwise show everything.
    pub fn toggle_all(&mut self) {
        let visible = !self.any_visible();
        for panel in Panel::ALL {
            *self.slot(panel) = visible;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Timing,
    /// Waiting for y/n before wiping every solve and best
    ConfirmClear,
}

/// Glue between terminal input, the stopwatch and the session.
pub struct App<C: Clock, S: Store> {
    pub stopwatch: Stopwatch<C>,
    pub session: Session<S>,
    pub state: AppState,
    pub panels: Panels,
    /// Terminal reports key releases. Without them a release is synthesized
    /// once the minimum hold has passed.
    pub release_events: bool,
    pub status: Option<String>,
    /// Cursor into the times list, newest first
    selected: usize,
    last_space: Option<Instant>,
    should_quit: bool,
}

impl<C: Clock, S: Store> App<C, S> {
    pub fn new(stopwatch: Stopwatch<C>, session: Session<S>, release_events: bool) -> Self {
        Self {
            stopwatch,
            session,
            state: AppState::Timing,
            panels: Panels::default(),
            release_events,
            status: None,
            selected: 0,
            last_space: None,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn on_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Tick => self.on_tick(),
            AppEvent::Resize => {}
            AppEvent::FocusLost => self.on_focus_lost(),
            AppEvent::Key(key) => self.on_key(key),
        }
    }

    pub fn on_tick(&mut self) {
        self.stopwatch.poll();

        if !self.release_events {
            let min_hold = self.stopwatch.settings().min_hold;
            if self.stopwatch.held_for().is_some_and(|held| held >= min_hold) {
                self.release();
            }
        }
    }

    pub fn press(&mut self) {
        if let Transition::Settled { elapsed_ms } = self.stopwatch.signal_down() {
            match self.session.record_solve(elapsed_ms) {
                Ok(_) => {
                    self.selected = 0;
                    self.status = None;
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to persist solve");
                    self.status = Some(format!("could not save solve: {e}"));
                }
            }
        }
    }

    pub fn release(&mut self) {
        self.stopwatch.signal_up();
    }

    /// Space press as delivered by the terminal. Without release reporting
    /// the presses of a held key are filtered out as auto-repeat.
    fn on_space(&mut self) {
        if !self.release_events {
            let now = self.stopwatch.clock().now();
            let repeat = self
                .last_space
                .is_some_and(|prev| now.saturating_duration_since(prev) < REPEAT_GAP);
            self.last_space = Some(now);
            if repeat {
                tracing::trace!("space auto-repeat ignored");
                return;
            }
        }
        self.press();
    }

    /// A hold in progress is dropped; its release would never arrive.
    fn on_focus_lost(&mut self) {
        if self.stopwatch.phase() == TimerPhase::Arming {
            tracing::debug!("focus lost while arming");
            self.stopwatch.cancel_all();
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_solve(&self) -> Option<&Solve> {
        self.session.solves().get(self.selected)
    }

    /// Move the times cursor; positive is towards older solves.
    pub fn move_selection(&mut self, delta: isize) {
        let last = self.session.solves().len().saturating_sub(1);
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }

    pub fn delete_selected(&mut self) {
        let Some(id) = self.selected_solve().map(|s| s.id) else {
            return;
        };
        if let Err(e) = self.session.delete_solve(id) {
            tracing::error!(error = %e, id, "failed to persist deletion");
            self.status = Some(format!("could not delete solve: {e}"));
        }
        self.move_selection(0);
    }

    pub fn request_clear(&mut self) {
        if self.session.solves().is_empty() {
            self.status = Some("nothing to clear".to_string());
        } else {
            self.state = AppState::ConfirmClear;
        }
    }

    pub fn confirm_clear(&mut self, confirmed: bool) {
        self.state = AppState::Timing;
        if !confirmed {
            return;
        }
        self.selected = 0;
        match self.session.clear_all() {
            Ok(()) => self.status = Some("all solves cleared".to_string()),
            Err(e) => {
                tracing::error!(error = %e, "failed to persist clear");
                self.status = Some(format!("could not clear solves: {e}"));
            }
        }
    }

    /// Release timer resources before exit.
    pub fn shutdown(&mut self) {
        self.stopwatch.cancel_all();
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Press
            && key.modifiers.contains(KeyModifiers::CONTROL)
            && key.code == KeyCode::Char('c')
        {
            self.should_quit = true;
            return;
        }

        match self.state {
            AppState::ConfirmClear => {
                if key.kind != KeyEventKind::Press {
                    return;
                }
                match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => self.confirm_clear(true),
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        self.confirm_clear(false)
                    }
                    _ => {}
                }
            }
            AppState::Timing => match (key.code, key.kind) {
                (KeyCode::Char(' '), KeyEventKind::Press) => self.on_space(),
                (KeyCode::Char(' '), KeyEventKind::Release) => self.release(),
                (_, KeyEventKind::Release) | (_, KeyEventKind::Repeat) => {}
                (KeyCode::Esc, _) | (KeyCode::Char('q'), _) => self.should_quit = true,
                // everything else waits until the clock is stopped
                _ if self.stopwatch.phase() == TimerPhase::Running => {}
                (KeyCode::Char('s'), _) => self.panels.toggle_all(),
                (KeyCode::Char(c @ '1'..='4'), _) => {
                    if let Some(panel) = Panel::from_digit(c) {
                        self.panels.toggle(panel);
                    }
                }
                (KeyCode::Up, _) | (KeyCode::Char('k'), _) => self.move_selection(-1),
                (KeyCode::Down, _) | (KeyCode::Char('j'), _) => self.move_selection(1),
                (KeyCode::Char('d'), _) | (KeyCode::Backspace, _) => self.delete_selected(),
                (KeyCode::Char('c'), _) => self.request_clear(),
                _ => {}
            },
        }
    }
}
