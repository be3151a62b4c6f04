use crate::error::{GameError, GameResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassicConfig {
    pub duration_secs: u32,
    /// Edits allowed for a word to still count as "close"
    pub tolerance: usize,
    /// Fraction of a word credited for a close submission
    pub error_penalty: f64,
    pub advance_delay_ms: u64,
}

impl Default for ClassicConfig {
    fn default() -> Self {
        Self {
            duration_secs: 60,
            tolerance: 1,
            error_penalty: 0.5,
            advance_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SurvivalConfig {
    pub base_spawn_rate_ms: u64,
    pub min_spawn_rate_ms: u64,
    /// Spawn rate multiplier applied per level
    pub spawn_growth: f64,
    pub difficulty_interval_ms: u64,
    pub base_fall_secs: f64,
    pub min_base_fall_secs: f64,
    pub fall_step_secs: f64,
    pub min_fall_secs: f64,
    pub starting_health: i32,
    pub miss_damage: i32,
    pub spawn_attempts: usize,
    /// Width of the play area in terminal columns
    pub play_width: f64,
}

impl Default for SurvivalConfig {
    fn default() -> Self {
        Self {
            base_spawn_rate_ms: 3000,
            min_spawn_rate_ms: 500,
            spawn_growth: 1.1,
            difficulty_interval_ms: 10_000,
            base_fall_secs: 15.0,
            min_base_fall_secs: 5.0,
            fall_step_secs: 0.5,
            min_fall_secs: 1.0,
            starting_health: 100,
            miss_damage: 10,
            spawn_attempts: 10,
            play_width: 80.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub classic: ClassicConfig,
    pub survival: SurvivalConfig,
    pub max_word_len: usize,
    /// Backspace wipes the whole input instead of one char
    pub quick_clear: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            classic: ClassicConfig::default(),
            survival: SurvivalConfig::default(),
            max_word_len: 6,
            quick_clear: true,
        }
    }
}

fn invalid(msg: impl Into<String>) -> GameError {
    GameError::InvalidConfiguration(msg.into())
}

impl ClassicConfig {
    pub fn validate(&self) -> GameResult<()> {
        if self.duration_secs == 0 {
            return Err(invalid("classic duration must be at least one second"));
        }
        if !(0.0..=1.0).contains(&self.error_penalty) {
            return Err(invalid(format!(
                "error penalty {} must be within 0..=1",
                self.error_penalty
            )));
        }
        Ok(())
    }
}

impl SurvivalConfig {
    pub fn validate(&self) -> GameResult<()> {
        if self.base_spawn_rate_ms == 0 || self.min_spawn_rate_ms == 0 {
            return Err(invalid("spawn rates must be positive"));
        }
        if self.min_spawn_rate_ms > self.base_spawn_rate_ms {
            return Err(invalid(format!(
                "min spawn rate {}ms exceeds base spawn rate {}ms",
                self.min_spawn_rate_ms, self.base_spawn_rate_ms
            )));
        }
        if !self.spawn_growth.is_finite() || self.spawn_growth <= 1.0 {
            return Err(invalid("spawn growth must be greater than 1"));
        }
        if self.difficulty_interval_ms == 0 {
            return Err(invalid("difficulty interval must be positive"));
        }
        let durations = [
            self.base_fall_secs,
            self.min_base_fall_secs,
            self.min_fall_secs,
        ];
        if durations.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(invalid("fall durations must be positive"));
        }
        if self.min_base_fall_secs > self.base_fall_secs {
            return Err(invalid(format!(
                "min base fall {}s exceeds base fall {}s",
                self.min_base_fall_secs, self.base_fall_secs
            )));
        }
        if !self.fall_step_secs.is_finite() || self.fall_step_secs < 0.0 {
            return Err(invalid("fall step must not be negative"));
        }
        if self.starting_health <= 0 || self.miss_damage <= 0 {
            return Err(invalid("health and miss damage must be positive"));
        }
        if self.spawn_attempts == 0 {
            return Err(invalid("spawn attempts must be at least one"));
        }
        if !self.play_width.is_finite() || self.play_width <= 0.0 {
            return Err(invalid("play width must be positive"));
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> GameResult<()> {
        if self.max_word_len == 0 {
            return Err(invalid("max word length must be at least one"));
        }
        self.classic.validate()?;
        self.survival.validate()
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "typefall") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("typefall_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!("ignoring malformed config {}: {e}", self.path.display()),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
