use crate::app_dirs::AppDirs;
use crate::error::GameResult;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::path::{Path, PathBuf};

/// Entries kept per leaderboard
pub const LEADERBOARD_SIZE: usize = 5;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Classic,
    Survival,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassicScore {
    pub wpm: u32,
    pub accuracy: u32,
    pub perfect_words: u32,
    pub imperfect_words: u32,
    pub words_typed: f64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalScore {
    pub score: u32,
    pub level: u32,
    pub words_destroyed: u32,
    pub date: DateTime<Utc>,
}

/// Summary emitted when a game ends
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreRecord {
    Classic(ClassicScore),
    Survival(SurvivalScore),
}

impl ScoreRecord {
    pub fn mode(&self) -> GameMode {
        match self {
            ScoreRecord::Classic(_) => GameMode::Classic,
            ScoreRecord::Survival(_) => GameMode::Survival,
        }
    }
}

/// A score that can be ranked on its mode's leaderboard
pub trait Ranked: Serialize + DeserializeOwned + Clone {
    const MODE: GameMode;

    fn primary_metric(&self) -> u32;
}

impl Ranked for ClassicScore {
    const MODE: GameMode = GameMode::Classic;

    fn primary_metric(&self) -> u32 {
        self.wpm
    }
}

impl Ranked for SurvivalScore {
    const MODE: GameMode = GameMode::Survival;

    fn primary_metric(&self) -> u32 {
        self.score
    }
}

/// Adds `record`, keeping the best [`LEADERBOARD_SIZE`] by primary metric.
/// Equal metrics keep their existing order, so older entries win ties.
pub fn rank_into<T: Ranked>(board: Vec<T>, record: T) -> Vec<T> {
    board
        .into_iter()
        .chain(std::iter::once(record))
        .sorted_by_key(|r| Reverse(r.primary_metric()))
        .take(LEADERBOARD_SIZE)
        .collect()
}

/// Raw key-value persistence, one JSON document per mode
pub trait ScoreStore {
    fn read(&self, mode: GameMode) -> GameResult<Option<String>>;
    fn write(&self, mode: GameMode, data: &str) -> GameResult<()>;
}

/// Reads a leaderboard; unreadable or malformed data yields an empty board.
pub fn load_leaderboard<T: Ranked>(store: &dyn ScoreStore) -> Vec<T> {
    let raw = match store.read(T::MODE) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            log::warn!("could not read {} scores: {e}", T::MODE);
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(board) => board
            .into_iter()
            .sorted_by_key(|r| Reverse(r.primary_metric()))
            .take(LEADERBOARD_SIZE)
            .collect(),
        Err(e) => {
            log::warn!("discarding malformed {} scores: {e}", T::MODE);
            Vec::new()
        }
    }
}

/// Inserts `record` into its leaderboard and writes the result back.
pub fn record_score<T: Ranked>(store: &dyn ScoreStore, record: T) -> GameResult<Vec<T>> {
    let board = rank_into(load_leaderboard(store), record);
    let data = serde_json::to_string(&board).unwrap_or_else(|_| "[]".to_string());
    store.write(T::MODE, &data)?;
    Ok(board)
}

pub fn record(store: &dyn ScoreStore, record: &ScoreRecord) -> GameResult<()> {
    match record {
        ScoreRecord::Classic(score) => record_score(store, score.clone()).map(|_| ()),
        ScoreRecord::Survival(score) => record_score(store, score.clone()).map(|_| ()),
    }
}

/// SQLite-backed score store
#[derive(Debug)]
pub struct SqliteScoreStore {
    conn: Connection,
}

impl SqliteScoreStore {
    /// Opens the store at the standard state location
    pub fn open_default() -> GameResult<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("typefall_scores.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(db_path: P) -> GameResult<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(db_path)?)
    }

    pub fn in_memory() -> GameResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> GameResult<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS leaderboards (
                mode TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(Self { conn })
    }
}

impl ScoreStore for SqliteScoreStore {
    fn read(&self, mode: GameMode) -> GameResult<Option<String>> {
        let data = self
            .conn
            .query_row(
                "SELECT data FROM leaderboards WHERE mode = ?1",
                [mode.as_ref()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(data)
    }

    fn write(&self, mode: GameMode, data: &str) -> GameResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO leaderboards (mode, data, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(mode) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
            "#,
            params![mode.as_ref(), data, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
