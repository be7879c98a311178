use std::sync::mpsc::{self, Sender};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use cubik::app::App;
use cubik::clock::ManualClock;
use cubik::runtime::{AppEvent, ChannelSource, Runner};
use cubik::session::Session;
use cubik::stats::WindowSize;
use cubik::store::MemoryStore;
use cubik::timer::{Stopwatch, TimerPhase, TimerSettings};

type Harness = (
    ManualClock,
    Sender<AppEvent>,
    Runner<ChannelSource>,
    App<ManualClock, MemoryStore>,
);

// Headless integration using the internal runtime + App without a TTY
fn harness(release_events: bool) -> Harness {
    let clock = ManualClock::new();
    let stopwatch = Stopwatch::new(clock.clone(), TimerSettings::default());
    let app = App::new(stopwatch, Session::load(MemoryStore::new()), release_events);

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(ChannelSource::new(rx), Duration::from_millis(1));
    (clock, tx, runner, app)
}

fn space(kind: KeyEventKind) -> AppEvent {
    AppEvent::Key(KeyEvent::new_with_kind(
        KeyCode::Char(' '),
        KeyModifiers::NONE,
        kind,
    ))
}

/// Send one event through the runner and hand whatever comes out to the app.
fn pump(
    tx: &Sender<AppEvent>,
    runner: &Runner<ChannelSource>,
    app: &mut App<ManualClock, MemoryStore>,
    ev: AppEvent,
) {
    tx.send(ev).unwrap();
    app.on_event(runner.step());
}

fn tick(runner: &Runner<ChannelSource>, app: &mut App<ManualClock, MemoryStore>) {
    app.on_event(runner.step());
}

#[test]
fn headless_solve_flow_records_time() {
    let (clock, tx, runner, mut app) = harness(true);

    pump(&tx, &runner, &mut app, space(KeyEventKind::Press));
    assert_eq!(app.stopwatch.phase(), TimerPhase::Arming);

    clock.advance_ms(200);
    pump(&tx, &runner, &mut app, space(KeyEventKind::Release));
    assert_eq!(app.stopwatch.phase(), TimerPhase::Running);

    clock.advance_ms(12_340);
    tick(&runner, &mut app);
    assert_eq!(app.stopwatch.display(), "12.34");

    pump(&tx, &runner, &mut app, space(KeyEventKind::Press));
    assert_eq!(app.stopwatch.phase(), TimerPhase::Settled);
    assert_eq!(app.session.solves().len(), 1);
    assert_eq!(app.session.solves()[0].elapsed_ms, 12_340.0);

    // settle delay returns to idle on a later tick
    clock.advance_ms(750);
    tick(&runner, &mut app);
    assert_eq!(app.stopwatch.phase(), TimerPhase::Idle);
    assert_eq!(app.stopwatch.scheduled_tasks(), 0);
}

#[test]
fn headless_without_release_events_starts_after_hold() {
    let (clock, tx, runner, mut app) = harness(false);

    pump(&tx, &runner, &mut app, space(KeyEventKind::Press));
    clock.advance_ms(99);
    tick(&runner, &mut app);
    assert_eq!(app.stopwatch.phase(), TimerPhase::Arming);

    clock.advance_ms(1);
    tick(&runner, &mut app);
    assert_eq!(app.stopwatch.phase(), TimerPhase::Running);

    clock.advance_ms(5_000);
    pump(&tx, &runner, &mut app, space(KeyEventKind::Press));
    assert_eq!(app.session.solves().len(), 1);
    assert_eq!(app.session.solves()[0].elapsed_ms, 5_000.0);
}

#[test]
fn headless_five_solves_produce_ao5() {
    let (clock, tx, runner, mut app) = harness(true);

    for ms in [10_000, 11_000, 12_000, 13_000, 30_000] {
        pump(&tx, &runner, &mut app, space(KeyEventKind::Press));
        clock.advance_ms(150);
        pump(&tx, &runner, &mut app, space(KeyEventKind::Release));
        clock.advance_ms(ms);
        pump(&tx, &runner, &mut app, space(KeyEventKind::Press));
        clock.advance_ms(750);
        tick(&runner, &mut app);
    }

    let ao5 = app.session.snapshot().window(WindowSize::Ao5).unwrap();
    assert_eq!(ao5.current, Some(12_000.0));
    assert_eq!(ao5.best, Some(12_000.0));
}

#[test]
fn headless_quit_cancels_timers() {
    let (clock, tx, runner, mut app) = harness(true);

    pump(&tx, &runner, &mut app, space(KeyEventKind::Press));
    clock.advance_ms(150);
    pump(&tx, &runner, &mut app, space(KeyEventKind::Release));
    assert!(app.stopwatch.has_ticker());

    pump(
        &tx,
        &runner,
        &mut app,
        AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
    );
    assert!(app.should_quit());
    app.shutdown();
    assert_eq!(app.stopwatch.scheduled_tasks(), 0);
}
