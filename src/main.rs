use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{
        DisableFocusChange, EnableFocusChange, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use cubik::{
    app::App,
    app_dirs::AppDirs,
    clock::SystemClock,
    config::{ConfigOverrides, ConfigStore, FileConfigStore, StorageBackend},
    runtime::{ChannelSource, Runner},
    session::Session,
    store::{open_store, Store},
    timer::{Stopwatch, TimerSettings},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, File, OpenOptions},
    io::{self, stdin},
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

/// hold-to-start speedcubing timer with rolling averages and personal bests
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A hold-to-start speedcubing timer. Hold space, release to start, press to stop. Tracks Ao5 through Ao100 and keeps your best averages even after you delete solves."
)]
pub struct Cli {
    /// minimum hold in milliseconds before a release starts the timer
    #[clap(long)]
    min_hold_ms: Option<u64>,

    /// how long a finished time stays on screen, in milliseconds
    #[clap(long)]
    settle_ms: Option<u64>,

    /// event loop tick in milliseconds
    #[clap(long)]
    tick_rate_ms: Option<u64>,

    /// where solves and best averages are stored
    #[clap(long, value_enum)]
    storage: Option<StorageBackend>,

    /// directory for stored solves and the log file
    #[clap(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// config file to use instead of the default location
    #[clap(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// write the effective settings back to the config file
    #[clap(long)]
    save_config: bool,

    /// write every solve as CSV to this path and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// log file verbosity
    #[clap(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(Debug, Copy, Clone, ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            min_hold_ms: self.min_hold_ms,
            settle_ms: self.settle_ms,
            tick_rate_ms: self.tick_rate_ms,
            storage: self.storage,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .clone()
        .or_else(AppDirs::state_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    init_logging(&data_dir, cli.log_level.into());

    let config_store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let mut config = config_store.load();
    config.apply(&cli.overrides());
    config.validate()?;
    if cli.save_config {
        config_store.save(&config)?;
        tracing::info!(path = %config_store.path().display(), "saved config");
    }

    let session = Session::load(open_store(config.storage, &data_dir)?);

    if let Some(path) = &cli.export {
        session.export_csv(File::create(path)?)?;
        println!(
            "exported {} solves to {}",
            session.solves().len(),
            path.display()
        );
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let release_events = supports_keyboard_enhancement().unwrap_or(false);
    if release_events {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )?;
    }
    tracing::info!(release_events, "terminal ready");

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let stopwatch = Stopwatch::new(SystemClock, TimerSettings::from(&config));
    let mut app = App::new(stopwatch, session, release_events);
    let result = start_tui(
        &mut terminal,
        &mut app,
        Duration::from_millis(config.tick_rate_ms),
    );
    app.shutdown();

    if release_events {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableFocusChange, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, S: Store>(
    terminal: &mut Terminal<B>,
    app: &mut App<SystemClock, S>,
    tick: Duration,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(ChannelSource::terminal(), tick);

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
        app.on_event(runner.step());
        if app.should_quit() {
            return Ok(());
        }
    }
}

/// Log to a file next to the stored solves; the terminal belongs to the TUI.
fn init_logging(dir: &Path, level: tracing::Level) {
    if fs::create_dir_all(dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(AppDirs::LOG_FILE))
    else {
        return;
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}
