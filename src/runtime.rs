//! Event plumbing between the terminal and the app.
//!
//! The loop never blocks longer than one tick, so the stopwatch gets polled
//! often enough for its 10ms display refresh even when no key is touched.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppEvent {
    /// Press, repeat or release. Releases only arrive with keyboard enhancement.
    Key(KeyEvent),
    Resize,
    /// Terminal lost focus; a hold in progress can no longer be released.
    FocusLost,
    Tick,
}

impl AppEvent {
    /// Terminal events the app cares about; everything else is dropped.
    pub fn from_terminal(ev: Event) -> Option<Self> {
        match ev {
            Event::Key(key) => Some(AppEvent::Key(key)),
            Event::Resize(_, _) => Some(AppEvent::Resize),
            Event::FocusLost => Some(AppEvent::FocusLost),
            _ => None,
        }
    }
}

pub trait AppEventSource {
    /// Wait up to `wait` for the next event.
    fn next_event(&self, wait: Duration) -> Option<AppEvent>;
}

/// Events delivered over a channel, fed by the terminal reader thread in
/// the binary and directly by tests.
pub struct ChannelSource {
    rx: Receiver<AppEvent>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }

    /// Spawn a thread that forwards crossterm events until the app hangs up.
    pub fn terminal() -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || loop {
            let ev = match event::read() {
                Ok(ev) => ev,
                Err(e) => {
                    tracing::warn!(error = %e, "terminal event reader stopped");
                    return;
                }
            };
            if let Some(app_event) = AppEvent::from_terminal(ev) {
                if tx.send(app_event).is_err() {
                    return;
                }
            }
        });

        Self { rx }
    }
}

impl AppEventSource for ChannelSource {
    fn next_event(&self, wait: Duration) -> Option<AppEvent> {
        match self.rx.recv_timeout(wait) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout) => None,
            // no producer left: keep ticking at the normal pace
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(wait);
                None
            }
        }
    }
}

/// Turns an event source into a steady stream of events and ticks.
pub struct Runner<E: AppEventSource> {
    source: E,
    tick: Duration,
}

impl<E: AppEventSource> Runner<E> {
    pub fn new(source: E, tick: Duration) -> Self {
        Self { source, tick }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Next event, or `Tick` once the tick interval passes without one.
    pub fn step(&self) -> AppEvent {
        self.source.next_event(self.tick).unwrap_or(AppEvent::Tick)
    }
}
