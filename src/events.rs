use crate::scores::{GameMode, ScoreRecord};

/// Lifecycle shared by both engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Idle,
    Running,
    Ended,
}

/// Discrete signals for the presentation and audio collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Started {
        mode: GameMode,
    },
    WordSpawned {
        word: String,
    },
    /// `perfect` is false for a close-enough classic submission
    WordCompleted {
        word: String,
        perfect: bool,
    },
    WordMissed {
        word: String,
        health: i32,
    },
    LevelUp {
        level: u32,
        spawn_interval_ms: f64,
        base_fall_secs: f64,
    },
    Ended(ScoreRecord),
}
