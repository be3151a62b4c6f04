use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use typefall::config::Config;
use typefall::events::{EngineState, GameEvent};
use typefall::runtime::{ChannelEventSource, Clock, ManualClock, Runner, TermEvent};
use typefall::scores::{GameMode, SqliteScoreStore};
use typefall::session::GameSession;
use typefall::vocabulary::StaticWordSource;

fn session(words: &[&str], config: Config) -> GameSession {
    GameSession::new(
        config,
        Box::new(StaticWordSource::new(words.iter().copied())),
        Box::new(SqliteScoreStore::in_memory().unwrap()),
        Some(7),
    )
    .unwrap()
}

fn key(c: char) -> TermEvent {
    TermEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn enter() -> TermEvent {
    TermEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
}

/// Runner ticking every millisecond of game time over a hand-driven clock
fn runner(
    rx: mpsc::Receiver<TermEvent>,
    clock: &ManualClock,
) -> Runner<ChannelEventSource, ManualClock> {
    Runner::new(
        ChannelEventSource::new(rx),
        clock.clone(),
        Duration::from_millis(1),
    )
}

/// Feeds runner steps into the session; after each tick the clock moves on by `tick`
fn drive(
    session: &mut GameSession,
    runner: &Runner<ChannelEventSource, ManualClock>,
    clock: &ManualClock,
    tick: Duration,
    max_steps: u32,
) {
    for _ in 0..max_steps {
        let step = runner.step();
        match step.event {
            TermEvent::Tick => {
                session.advance(step.at);
                clock.advance(tick);
            }
            TermEvent::Resize => {}
            TermEvent::Key(key) => match key.code {
                KeyCode::Char(c) => session.type_char(c),
                KeyCode::Enter => session.submit(step.at),
                KeyCode::Backspace => session.backspace(),
                _ => {}
            },
        }
        if session.state() == EngineState::Ended {
            break;
        }
    }
}

// Headless classic round using the runtime without a TTY
#[test]
fn headless_classic_round_records_score() {
    let mut config = Config::default();
    config.classic.duration_secs = 2;
    let mut session = session(&["cat"], config);
    let clock = ManualClock::new();

    session.start_classic(clock.now()).unwrap();

    let (tx, rx) = mpsc::channel();
    for c in "cat".chars() {
        tx.send(key(c)).unwrap();
    }
    tx.send(enter()).unwrap();

    let runner = runner(rx, &clock);
    drive(&mut session, &runner, &clock, Duration::from_millis(500), 100);

    assert_eq!(session.state(), EngineState::Ended);
    let events = session.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::WordCompleted { perfect: true, .. })));
    assert!(events.iter().any(|e| matches!(e, GameEvent::Ended(_))));

    let result = session.classic().and_then(|e| e.result()).cloned().unwrap();
    assert_eq!(result.perfect_words, 1);
    // one word in two seconds
    assert_eq!(result.wpm, 30);

    let (classic, survival) = session.leaderboards();
    assert_eq!(classic.len(), 1);
    assert!(survival.is_empty());
}

#[test]
fn headless_close_word_is_revealed_then_advances() {
    let mut session = session(&["house"], Config::default());
    let clock = ManualClock::new();
    session.start_classic(clock.now()).unwrap();

    session.input("hous");
    session.submit(clock.now());

    let engine = session.classic().unwrap();
    assert_eq!(engine.revealed(), Some("house"));
    assert_eq!(engine.session().imperfect_words, 1);
    assert_eq!(engine.session().words_typed, 0.5);

    // a second submit during the reveal is ignored
    session.submit(clock.now());
    assert_eq!(session.classic().unwrap().session().imperfect_words, 1);

    clock.advance(Duration::from_millis(500));
    session.advance(clock.now());
    assert_eq!(session.classic().unwrap().revealed(), None);
    assert_eq!(session.current_input(), "");
}

#[test]
fn headless_survival_run_ends_when_health_runs_out() {
    let mut config = Config::default();
    config.survival.starting_health = 20;
    config.survival.miss_damage = 10;
    let mut session = session(&["rain"], config);
    let clock = ManualClock::new();

    session.start_survival(clock.now()).unwrap();
    assert_eq!(session.mode(), Some(GameMode::Survival));

    let (_tx, rx) = mpsc::channel();
    let runner = runner(rx, &clock);
    drive(&mut session, &runner, &clock, Duration::from_millis(250), 1_000);

    assert_eq!(session.state(), EngineState::Ended);
    let events = session.drain_events();
    let missed = events
        .iter()
        .filter(|e| matches!(e, GameEvent::WordMissed { .. }))
        .count();
    assert_eq!(missed, 2);

    let engine = session.survival().unwrap();
    assert_eq!(engine.stats().health, 0);
    assert!(engine.active_words().is_empty());
    assert_eq!(engine.armed_timers(), 0);

    let (_, survival) = session.leaderboards();
    assert_eq!(survival.len(), 1);
    assert_eq!(survival[0].words_destroyed, 0);
}

#[test]
fn headless_survival_typing_destroys_falling_word() {
    let mut session = session(&["rain"], Config::default());
    let clock = ManualClock::new();
    session.start_survival(clock.now()).unwrap();

    clock.advance(Duration::from_millis(3_000));
    session.advance(clock.now());
    assert_eq!(session.survival().unwrap().active_words().len(), 1);

    for c in "RAIN".chars() {
        session.type_char(c);
    }

    let engine = session.survival().unwrap();
    assert!(engine.active_words().is_empty());
    assert_eq!(engine.stats().words_destroyed, 1);
    assert_eq!(engine.stats().score, 4);
    assert_eq!(session.current_input(), "");
}

#[test]
fn headless_menu_abandons_game_without_recording() {
    let mut session = session(&["cat"], Config::default());
    let clock = ManualClock::new();
    session.start_classic(clock.now()).unwrap();

    session.back_to_menu();
    assert_eq!(session.mode(), None);
    assert_eq!(session.state(), EngineState::Idle);

    // timers from the abandoned game never fire
    clock.advance(Duration::from_secs(120));
    session.advance(clock.now());
    let (classic, _) = session.leaderboards();
    assert!(classic.is_empty());
}
