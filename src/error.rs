use thiserror::Error;

/// Errors surfaced by the game core
#[derive(Debug, Error)]
pub enum GameError {
    #[error("vocabulary unavailable: {0}")]
    VocabularyUnavailable(String),

    #[error("no words of at most {max_len} characters in vocabulary")]
    EmptyVocabularyAfterFilter { max_len: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("score storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GameResult<T> = Result<T, GameError>;
