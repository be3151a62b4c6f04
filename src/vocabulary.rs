use crate::error::{GameError, GameResult};
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

static LANG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/lang");

/// Supplies candidate words; implementations may hit the network or disk and can fail.
pub trait WordSource {
    fn fetch_vocabulary(&self) -> GameResult<Vec<String>>;
}

#[derive(Deserialize, Clone, Debug)]
struct Language {
    #[allow(dead_code)]
    name: String,
    words: Vec<String>,
}

/// Word list bundled into the binary
#[derive(Debug, Clone)]
pub struct EmbeddedWordSource {
    name: String,
}

impl EmbeddedWordSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for EmbeddedWordSource {
    fn default() -> Self {
        Self::new("english")
    }
}

impl WordSource for EmbeddedWordSource {
    fn fetch_vocabulary(&self) -> GameResult<Vec<String>> {
        let file_name = format!("{}.json", self.name);
        let file = LANG_DIR.get_file(&file_name).ok_or_else(|| {
            GameError::VocabularyUnavailable(format!("no bundled word list named {file_name}"))
        })?;
        let contents = file.contents_utf8().ok_or_else(|| {
            GameError::VocabularyUnavailable(format!("{file_name} is not valid utf-8"))
        })?;
        let lang: Language = serde_json::from_str(contents)
            .map_err(|e| GameError::VocabularyUnavailable(format!("{file_name}: {e}")))?;

        Ok(lang.words)
    }
}

/// JSON array of strings on disk, the same shape a remote word API returns
#[derive(Debug, Clone)]
pub struct FileWordSource {
    path: PathBuf,
}

impl FileWordSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl WordSource for FileWordSource {
    fn fetch_vocabulary(&self) -> GameResult<Vec<String>> {
        let bytes = fs::read(&self.path).map_err(|e| self.unavailable(e))?;
        serde_json::from_slice::<Vec<String>>(&bytes).map_err(|e| self.unavailable(e))
    }
}

impl FileWordSource {
    fn unavailable(&self, e: impl std::fmt::Display) -> GameError {
        GameError::VocabularyUnavailable(format!("{}: {e}", self.path.display()))
    }
}

/// Fixed in-memory list
#[derive(Debug, Clone, Default)]
pub struct StaticWordSource {
    words: Vec<String>,
}

impl StaticWordSource {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }
}

impl WordSource for StaticWordSource {
    fn fetch_vocabulary(&self) -> GameResult<Vec<String>> {
        Ok(self.words.clone())
    }
}

/// Non-empty list of playable words, each between 1 and `max_len` chars
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    words: Vec<String>,
}

impl Vocabulary {
    pub fn load(source: &dyn WordSource, max_len: usize) -> GameResult<Self> {
        let raw = source.fetch_vocabulary().inspect_err(|e| {
            log::warn!("failed to fetch vocabulary: {e}");
        })?;
        let fetched = raw.len();
        let vocab = Self::from_words(raw, max_len)?;
        log::info!(
            "vocabulary loaded: {} of {fetched} words kept (max {max_len} chars)",
            vocab.len()
        );
        Ok(vocab)
    }

    pub fn from_words<I, S>(words: I, max_len: usize) -> GameResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words
            .into_iter()
            .map(Into::into)
            .map(|w| w.trim().to_string())
            .filter(|w| {
                let len = w.chars().count();
                len > 0 && len <= max_len
            })
            .collect();

        if words.is_empty() {
            return Err(GameError::EmptyVocabularyAfterFilter { max_len });
        }

        Ok(Self { words })
    }

    /// Uniform pick with replacement
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        // never empty by construction
        self.words.choose(rng).map_or("", String::as_str)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
