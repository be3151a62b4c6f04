use std::time::Duration;

use typefall::config::Config;
use typefall::runtime::{Clock, ManualClock};
use typefall::scores::{GameMode, ScoreStore, SqliteScoreStore, LEADERBOARD_SIZE};
use typefall::session::GameSession;
use typefall::vocabulary::StaticWordSource;

fn session_at(path: &std::path::Path) -> GameSession {
    let mut config = Config::default();
    config.classic.duration_secs = 1;
    GameSession::new(
        config,
        Box::new(StaticWordSource::new(["go"])),
        Box::new(SqliteScoreStore::open(path).unwrap()),
        Some(1),
    )
    .unwrap()
}

/// One classic round of a second, completing `words` perfect words
fn play_round(session: &mut GameSession, clock: &ManualClock, words: usize) {
    session.start_classic(clock.now()).unwrap();
    for _ in 0..words {
        session.input("go");
        session.submit(clock.now());
    }
    clock.advance(Duration::from_secs(1));
    session.advance(clock.now());
}

#[test]
fn classic_board_keeps_best_five_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("scores.db");
    let clock = ManualClock::new();

    {
        let mut session = session_at(&db);
        for words in [1, 4, 2, 6, 3, 5, 0] {
            play_round(&mut session, &clock, words);
        }
    }

    let session = session_at(&db);
    let (classic, survival) = session.leaderboards();
    assert_eq!(classic.len(), LEADERBOARD_SIZE);
    assert_eq!(
        classic.iter().map(|s| s.wpm).collect::<Vec<_>>(),
        vec![360, 300, 240, 180, 120]
    );
    assert!(survival.is_empty());
}

#[test]
fn survival_board_is_separate_from_classic() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("scores.db");
    let clock = ManualClock::new();
    let mut session = session_at(&db);

    play_round(&mut session, &clock, 2);
    session.start_survival(clock.now()).unwrap();
    session.end();

    let (classic, survival) = session.leaderboards();
    assert_eq!(classic.len(), 1);
    assert_eq!(survival.len(), 1);
    assert_eq!(survival[0].score, 0);
    assert_eq!(survival[0].level, 1);
}

#[test]
fn corrupt_board_reads_as_empty_and_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("scores.db");
    SqliteScoreStore::open(&db)
        .unwrap()
        .write(GameMode::Classic, "{not json")
        .unwrap();

    let clock = ManualClock::new();
    let mut session = session_at(&db);
    assert!(session.leaderboards().0.is_empty());

    play_round(&mut session, &clock, 1);
    let (classic, _) = session.leaderboards();
    assert_eq!(classic.len(), 1);
    assert_eq!(classic[0].wpm, 60);
}
