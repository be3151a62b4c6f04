pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::OpenOptions,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};
use typefall::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    events::{EngineState, GameEvent},
    runtime::{ChannelEventSource, Clock, MonotonicClock, Runner, TermEvent},
    scores::{ClassicScore, GameMode, ScoreStore, SqliteScoreStore, SurvivalScore},
    session::GameSession,
    vocabulary::{EmbeddedWordSource, FileWordSource, WordSource},
};

const TICK_RATE_MS: u64 = 50;

/// terminal typing game: a timed classic drill and a falling-word survival mode
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type words against the clock in classic mode, or type falling words before they reach the bottom in survival mode."
)]
pub struct Cli {
    /// mode to open in
    #[clap(short = 'm', long, value_enum, default_value_t = StartMode::Menu)]
    mode: StartMode,

    /// length of a classic round in seconds
    #[clap(short = 's', long)]
    secs: Option<u32>,

    /// edits allowed for a classic word to still count as close
    #[clap(short = 't', long)]
    tolerance: Option<usize>,

    /// JSON array of words to play with instead of the bundled list
    #[clap(short = 'w', long)]
    words: Option<PathBuf>,

    /// seed word selection and spawn positions for a repeatable game
    #[clap(long)]
    seed: Option<u64>,

    /// make backspace delete one character instead of clearing the input
    #[clap(long)]
    no_quick_clear: bool,

    /// config file to read (defaults to the platform config dir)
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum, strum_macros::Display)]
pub enum StartMode {
    Menu,
    Classic,
    Survival,
}

impl Cli {
    /// Stored config with command line overrides applied
    fn to_config(&self) -> Config {
        let store = match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        };
        let mut config = store.load();

        if let Some(secs) = self.secs {
            config.classic.duration_secs = secs;
        }
        if let Some(tolerance) = self.tolerance {
            config.classic.tolerance = tolerance;
        }
        if self.no_quick_clear {
            config.quick_clear = false;
        }
        config
    }

    fn word_source(&self) -> Box<dyn WordSource> {
        match &self.words {
            Some(path) => Box::new(FileWordSource::new(path)),
            None => Box::new(EmbeddedWordSource::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen {
    Menu,
    LoadError,
    Playing(GameMode),
    Results(GameMode),
}

pub struct App {
    pub session: GameSession,
    /// Game time of the step being handled
    pub now: Duration,
    pub requested: Option<GameMode>,
    pub classic_board: Vec<ClassicScore>,
    pub survival_board: Vec<SurvivalScore>,
}

impl App {
    pub fn new(session: GameSession) -> Self {
        let mut app = Self {
            session,
            now: Duration::ZERO,
            requested: None,
            classic_board: Vec::new(),
            survival_board: Vec::new(),
        };
        app.refresh_boards();
        app
    }

    pub fn screen(&self) -> Screen {
        if self.session.last_error().is_some() {
            return Screen::LoadError;
        }
        match (self.session.mode(), self.session.state()) {
            (None, _) => Screen::Menu,
            (Some(mode), EngineState::Ended) => Screen::Results(mode),
            (Some(mode), _) => Screen::Playing(mode),
        }
    }

    pub fn start(&mut self, mode: GameMode) {
        self.requested = Some(mode);
        let started = match mode {
            GameMode::Classic => self.session.start_classic(self.now),
            GameMode::Survival => self.session.start_survival(self.now),
        };
        if let Err(e) = started {
            log::debug!("{mode} not started: {e}");
        }
    }

    pub fn on_tick(&mut self, now: Duration) {
        self.now = now;
        self.session.advance(now);
        self.process_events();
    }

    /// Returns true when the app should quit
    pub fn on_key(&mut self, key: KeyEvent, now: Duration) -> bool {
        self.now = now;
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        match self.screen() {
            Screen::Menu => match key.code {
                KeyCode::Char('1') | KeyCode::Char('c') => self.start(GameMode::Classic),
                KeyCode::Char('2') | KeyCode::Char('s') => self.start(GameMode::Survival),
                KeyCode::Esc | KeyCode::Char('q') => return true,
                _ => {}
            },
            Screen::LoadError => match key.code {
                KeyCode::Char('r') => {
                    if let Some(mode) = self.requested {
                        self.start(mode);
                    }
                }
                KeyCode::Char('m') => {
                    self.session.back_to_menu();
                    self.refresh_boards();
                }
                KeyCode::Esc => return true,
                _ => {}
            },
            Screen::Playing(_) => match key.code {
                KeyCode::Esc => {
                    self.session.back_to_menu();
                    self.refresh_boards();
                }
                KeyCode::Backspace => self.session.backspace(),
                KeyCode::Enter => self.session.submit(now),
                KeyCode::Char(c) => self.session.type_char(c),
                _ => {}
            },
            Screen::Results(_) => match key.code {
                KeyCode::Char('r') => {
                    if let Err(e) = self.session.retry(now) {
                        log::debug!("retry failed: {e}");
                    }
                }
                KeyCode::Char('m') => {
                    self.session.back_to_menu();
                    self.refresh_boards();
                }
                KeyCode::Esc => return true,
                _ => {}
            },
        }

        self.process_events();
        false
    }

    fn process_events(&mut self) {
        let mut ended = false;
        for event in self.session.drain_events() {
            match event {
                GameEvent::Ended(_) => ended = true,
                GameEvent::LevelUp { level, .. } => log::debug!("reached level {level}"),
                _ => {}
            }
        }
        if ended {
            self.refresh_boards();
        }
    }

    fn refresh_boards(&mut self) {
        let (classic, survival) = self.session.leaderboards();
        self.classic_board = classic;
        self.survival_board = survival;
    }
}

fn init_logging() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    // the terminal belongs to the UI, so logs go to a file or nowhere
    let log_file = AppDirs::log_path().and_then(|path| {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok()?;
        }
        OpenOptions::new().create(true).append(true).open(path).ok()
    });
    match log_file {
        Some(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }

    let _ = builder.try_init();
}

fn open_score_store() -> Result<Box<dyn ScoreStore>, Box<dyn Error>> {
    match SqliteScoreStore::open_default() {
        Ok(store) => Ok(Box::new(store)),
        Err(e) => {
            log::warn!("scores will not be saved this session: {e}");
            Ok(Box::new(SqliteScoreStore::in_memory()?))
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let mut config = cli.to_config();
    let (cols, _) = terminal::size()?;
    config.survival.play_width = ui::play_width_for(cols);

    let session = match GameSession::new(config, cli.word_source(), open_score_store()?, cli.seed) {
        Ok(session) => session,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
        }
    };
    let clock = MonotonicClock::new();
    let mut app = App::new(session);
    app.now = clock.now();
    match cli.mode {
        StartMode::Menu => {}
        StartMode::Classic => app.start(GameMode::Classic),
        StartMode::Survival => app.start(GameMode::Survival),
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, clock);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    clock: MonotonicClock,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        ChannelEventSource::crossterm(),
        clock,
        Duration::from_millis(TICK_RATE_MS),
    );

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        let step = runner.step();
        match step.event {
            TermEvent::Tick => app.on_tick(step.at),
            TermEvent::Resize => {}
            TermEvent::Key(key) => {
                if app.on_key(key, step.at) {
                    break;
                }
            }
        }
    }

    Ok(())
}
