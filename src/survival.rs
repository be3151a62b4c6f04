use crate::config::SurvivalConfig;
use crate::error::GameResult;
use crate::events::{EngineState, GameEvent};
use crate::matching::{match_prefix, PrefixMatch};
use crate::scores::{GameMode, ScoreRecord, SurvivalScore};
use crate::timers::{TimerId, TimerQueue};
use crate::vocabulary::Vocabulary;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

/// Identity of one spawned word; duplicates of the same text get distinct ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WordId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct FallingWord {
    pub id: WordId,
    pub text: String,
    /// Left edge, in play-area columns
    pub x: f64,
    pub width: f64,
    pub spawned_at: Duration,
    pub fall_secs: f64,
    expiry: TimerId,
}

impl FallingWord {
    pub fn deadline(&self) -> Duration {
        self.spawned_at + Duration::from_secs_f64(self.fall_secs)
    }

    /// How far down the word has fallen, 0 at spawn and 1 at the bottom
    pub fn fall_fraction(&self, now: Duration) -> f64 {
        let fallen = now.saturating_sub(self.spawned_at).as_secs_f64();
        (fallen / self.fall_secs).clamp(0.0, 1.0)
    }
}

/// Per-word render data
#[derive(Debug, Clone, PartialEq)]
pub struct FallingWordView {
    pub id: WordId,
    pub text: String,
    pub x: f64,
    pub fall_fraction: f64,
    pub highlight: PrefixMatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalState {
    /// May dip below zero with damage values that do not divide the starting health
    pub health: i32,
    pub score: u32,
    pub level: u32,
    pub spawn_interval_ms: f64,
    pub base_fall_secs: f64,
    pub words_destroyed: u32,
    pub words_missed: u32,
}

impl SurvivalState {
    fn fresh(config: &SurvivalConfig) -> Self {
        Self {
            health: config.starting_health,
            score: 0,
            level: 1,
            spawn_interval_ms: config.base_spawn_rate_ms as f64,
            base_fall_secs: config.base_fall_secs,
            words_destroyed: 0,
            words_missed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SurvivalTimer {
    Spawn,
    Difficulty,
    Expire(WordId),
}

/// Falling-word survival game
#[derive(Debug)]
pub struct SurvivalEngine {
    config: SurvivalConfig,
    vocabulary: Vocabulary,
    rng: StdRng,
    state: EngineState,
    stats: SurvivalState,
    // spawn order
    active: Vec<FallingWord>,
    input: String,
    timers: TimerQueue<SurvivalTimer>,
    spawn_timer: Option<TimerId>,
    generation: u64,
    next_word_id: u64,
    result: Option<SurvivalScore>,
    events: Vec<GameEvent>,
}

impl SurvivalEngine {
    pub fn new(config: SurvivalConfig, vocabulary: Vocabulary) -> GameResult<Self> {
        Self::with_rng(config, vocabulary, StdRng::from_entropy())
    }

    pub fn with_seed(
        config: SurvivalConfig,
        vocabulary: Vocabulary,
        seed: u64,
    ) -> GameResult<Self> {
        Self::with_rng(config, vocabulary, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SurvivalConfig, vocabulary: Vocabulary, rng: StdRng) -> GameResult<Self> {
        config.validate()?;
        Ok(Self {
            stats: SurvivalState::fresh(&config),
            config,
            vocabulary,
            rng,
            state: EngineState::Idle,
            active: Vec::new(),
            input: String::new(),
            timers: TimerQueue::new(),
            spawn_timer: None,
            generation: 0,
            next_word_id: 0,
            result: None,
            events: Vec::new(),
        })
    }

    /// Begins a run with the spawn and difficulty triggers armed.
    /// Does nothing while a run is already in progress.
    pub fn start(&mut self, now: Duration) {
        if self.state == EngineState::Running {
            log::debug!("survival start ignored: already running");
            return;
        }

        self.generation += 1;
        self.timers.clear();
        self.active.clear();
        self.input.clear();
        self.result = None;
        self.stats = SurvivalState::fresh(&self.config);

        self.spawn_timer = Some(self.timers.every(
            now,
            self.spawn_interval(),
            self.generation,
            SurvivalTimer::Spawn,
        ));
        self.timers.every(
            now,
            Duration::from_millis(self.config.difficulty_interval_ms),
            self.generation,
            SurvivalTimer::Difficulty,
        );

        self.state = EngineState::Running;
        self.events.push(GameEvent::Started {
            mode: GameMode::Survival,
        });
        log::info!("survival run {} started", self.generation);
    }

    /// Feeds the live input text. Completes at most one word: the earliest-spawned
    /// active word equal to the trimmed input, ignoring case.
    pub fn on_input(&mut self, typed: &str) -> Option<FallingWord> {
        if self.state != EngineState::Running {
            return None;
        }

        self.input = typed.to_string();
        let needle = typed.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        let idx = self
            .active
            .iter()
            .position(|w| w.text.to_lowercase() == needle)?;
        Some(self.complete(idx))
    }

    /// Fires every timer due by `now`, in deadline order.
    pub fn advance(&mut self, now: Duration) {
        while let Some(fired) = self.timers.pop_due(now) {
            if fired.generation != self.generation || self.state != EngineState::Running {
                log::debug!("dropping stale survival timer {:?}", fired.kind);
                continue;
            }

            match fired.kind {
                SurvivalTimer::Spawn => self.spawn(fired.at),
                SurvivalTimer::Difficulty => self.level_up(fired.at),
                SurvivalTimer::Expire(id) => self.miss(id),
            }
        }
    }

    /// Stops a running game early and emits its score.
    pub fn end(&mut self) {
        if self.state == EngineState::Running {
            self.finish();
        }
    }

    /// Drops back to idle, cancelling every outstanding timer.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.timers.clear();
        self.spawn_timer = None;
        self.active.clear();
        self.input.clear();
        self.state = EngineState::Idle;
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn stats(&self) -> &SurvivalState {
        &self.stats
    }

    pub fn active_words(&self) -> &[FallingWord] {
        &self.active
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn has_finished(&self) -> bool {
        self.state == EngineState::Ended
    }

    pub fn health_fraction(&self) -> f64 {
        (f64::from(self.stats.health) / f64::from(self.config.starting_health)).clamp(0.0, 1.0)
    }

    pub fn view(&self, now: Duration) -> Vec<FallingWordView> {
        let typed = self.input.trim();
        self.active
            .iter()
            .map(|w| FallingWordView {
                id: w.id,
                text: w.text.clone(),
                x: w.x,
                fall_fraction: w.fall_fraction(now),
                highlight: match_prefix(typed, &w.text),
            })
            .collect()
    }

    pub fn result(&self) -> Option<&SurvivalScore> {
        self.result.as_ref()
    }

    pub fn config(&self) -> &SurvivalConfig {
        &self.config
    }

    pub fn armed_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn spawn_interval(&self) -> Duration {
        Duration::from_secs_f64(self.stats.spawn_interval_ms / 1000.0)
    }

    fn fall_secs(&self) -> f64 {
        let secs =
            self.stats.base_fall_secs - f64::from(self.stats.level) * self.config.fall_step_secs;
        secs.max(self.config.min_fall_secs)
    }

    fn spawn(&mut self, at: Duration) {
        let text = self.vocabulary.choose(&mut self.rng).to_string();
        let width = text.width() as f64;
        let x = self.pick_position(width);
        let fall_secs = self.fall_secs();

        let id = WordId(self.next_word_id);
        self.next_word_id += 1;
        let expiry = self.timers.once(
            at,
            Duration::from_secs_f64(fall_secs),
            self.generation,
            SurvivalTimer::Expire(id),
        );

        log::debug!("spawned {text:?} at x={x:.1}, falling for {fall_secs:.1}s");
        self.events.push(GameEvent::WordSpawned { word: text.clone() });
        self.active.push(FallingWord {
            id,
            text,
            x,
            width,
            spawned_at: at,
            fall_secs,
            expiry,
        });
    }

    /// Samples up to `spawn_attempts` positions, taking the first clear of every active word.
    /// Falls back to the last sample when all collide.
    fn pick_position(&mut self, width: f64) -> f64 {
        let span = (self.config.play_width - width).max(0.0);
        let mut x = 0.0;

        for _ in 0..self.config.spawn_attempts {
            x = if span > 0.0 {
                self.rng.gen_range(0.0..span)
            } else {
                0.0
            };
            if !self.collides(x) {
                return x;
            }
        }

        log::debug!("no clear spawn position after {} attempts", self.config.spawn_attempts);
        x
    }

    fn collides(&self, x: f64) -> bool {
        self.active.iter().any(|w| (w.x - x).abs() < w.width)
    }

    fn complete(&mut self, idx: usize) -> FallingWord {
        let word = self.active.remove(idx);
        self.timers.cancel(word.expiry);
        self.input.clear();
        self.stats.words_destroyed += 1;
        self.stats.score += word.text.chars().count() as u32;
        self.events.push(GameEvent::WordCompleted {
            word: word.text.clone(),
            perfect: true,
        });
        word
    }

    fn miss(&mut self, id: WordId) {
        let Some(idx) = self.active.iter().position(|w| w.id == id) else {
            return;
        };
        let word = self.active.remove(idx);

        self.stats.health -= self.config.miss_damage;
        self.stats.words_missed += 1;
        log::debug!("missed {:?}, health {}", word.text, self.stats.health);
        self.events.push(GameEvent::WordMissed {
            word: word.text,
            health: self.stats.health,
        });

        if self.stats.health <= 0 {
            self.finish();
        }
    }

    fn level_up(&mut self, at: Duration) {
        self.stats.level += 1;

        let multiplier = self.config.spawn_growth.powi(self.stats.level as i32 - 1);
        self.stats.spawn_interval_ms = (self.config.base_spawn_rate_ms as f64 / multiplier)
            .max(self.config.min_spawn_rate_ms as f64);

        // swap the spawn trigger for one at the new rate
        if let Some(old) = self.spawn_timer.take() {
            self.timers.cancel(old);
        }
        self.spawn_timer = Some(self.timers.every(
            at,
            self.spawn_interval(),
            self.generation,
            SurvivalTimer::Spawn,
        ));

        self.stats.base_fall_secs = (self.config.base_fall_secs
            - f64::from(self.stats.level) * self.config.fall_step_secs)
            .max(self.config.min_base_fall_secs);

        log::info!(
            "level {}: spawn every {}ms ({}% of base), base fall {}s",
            self.stats.level,
            self.stats.spawn_interval_ms.round(),
            (100.0 / multiplier).round(),
            self.stats.base_fall_secs
        );
        self.events.push(GameEvent::LevelUp {
            level: self.stats.level,
            spawn_interval_ms: self.stats.spawn_interval_ms,
            base_fall_secs: self.stats.base_fall_secs,
        });
    }

    fn finish(&mut self) {
        self.timers.clear();
        self.spawn_timer = None;
        self.active.clear();
        self.state = EngineState::Ended;

        let score = SurvivalScore {
            score: self.stats.score,
            level: self.stats.level,
            words_destroyed: self.stats.words_destroyed,
            date: Utc::now(),
        };
        log::info!(
            "survival run {} ended: score {}, level {}, {} destroyed",
            self.generation,
            score.score,
            score.level,
            score.words_destroyed
        );
        self.result = Some(score.clone());
        self.events.push(GameEvent::Ended(ScoreRecord::Survival(score)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn vocab() -> Vocabulary {
        Vocabulary::from_words(["cat", "dog", "sun", "map", "owl"], 6).unwrap()
    }

    fn engine() -> SurvivalEngine {
        SurvivalEngine::with_seed(SurvivalConfig::default(), vocab(), 3).unwrap()
    }

    #[test]
    fn test_start_resets_state() {
        let mut engine = engine();
        engine.start(ms(0));
        let stats = engine.stats();
        assert_eq!(stats.health, 100);
        assert_eq!(stats.score, 0);
        assert_eq!(stats.level, 1);
        assert_eq!(stats.spawn_interval_ms, 3000.0);
        assert!(engine.active_words().is_empty());
        // spawn + difficulty
        assert_eq!(engine.armed_timers(), 2);
    }

    #[test]
    fn test_first_spawn_after_one_interval() {
        let mut engine = engine();
        engine.start(ms(0));
        engine.advance(ms(2999));
        assert!(engine.active_words().is_empty());

        engine.advance(ms(3000));
        assert_eq!(engine.active_words().len(), 1);
        let word = &engine.active_words()[0];
        assert_eq!(word.fall_secs, 14.5);
        assert_eq!(word.deadline(), ms(17_500));
        assert!(word.x >= 0.0 && word.x + word.width <= 80.0);
    }

    #[test]
    fn test_completing_a_word_scores_its_length() {
        let mut engine = engine();
        engine.start(ms(0));
        engine.advance(ms(6000));
        assert_eq!(engine.active_words().len(), 2);

        let target = engine.active_words()[1].clone();
        let completed = engine.on_input(&format!(" {} ", target.text.to_uppercase()));

        // duplicates resolve to the earliest spawn
        let expected = engine
            .active_words()
            .iter()
            .chain(completed.iter())
            .filter(|w| w.text == target.text)
            .map(|w| w.id)
            .min()
            .unwrap();
        let completed = completed.unwrap();
        assert_eq!(completed.id, expected);
        assert_eq!(engine.active_words().len(), 1);
        assert_eq!(engine.stats().score, target.text.chars().count() as u32);
        assert_eq!(engine.stats().words_destroyed, 1);
        assert!(engine.input().is_empty());
    }

    #[test]
    fn test_duplicate_words_complete_one_instance_at_a_time() {
        let only_cat = Vocabulary::from_words(["cat"], 6).unwrap();
        let mut engine = SurvivalEngine::with_seed(SurvivalConfig::default(), only_cat, 1).unwrap();
        engine.start(ms(0));
        engine.advance(ms(6000));
        assert_eq!(engine.active_words().len(), 2);
        let first = engine.active_words()[0].id;

        let done = engine.on_input("cat").unwrap();
        assert_eq!(done.id, first);
        assert_eq!(engine.active_words().len(), 1);
        assert_eq!(engine.stats().score, 3);

        // the cancelled expiry must not cost health later
        engine.advance(ms(17_600));
        assert_eq!(engine.stats().health, 100);
    }

    #[test]
    fn test_partial_input_only_highlights() {
        let mut engine = engine();
        engine.start(ms(0));
        engine.advance(ms(3000));
        let word = engine.active_words()[0].text.clone();
        let prefix: String = word.chars().take(2).collect();

        assert!(engine.on_input(&prefix).is_none());
        let view = engine.view(ms(3000));
        assert_eq!(view[0].highlight.matched_prefix, prefix);
        assert_eq!(view[0].fall_fraction, 0.0);
    }

    #[test]
    fn test_ten_misses_end_the_game_at_zero_health() {
        let mut engine = engine();
        engine.start(ms(0));
        engine.drain_events();

        let mut t = 0;
        while engine.state() == EngineState::Running && t < 600_000 {
            t += 100;
            engine.advance(ms(t));
        }

        assert_eq!(engine.state(), EngineState::Ended);
        assert_eq!(engine.stats().words_missed, 10);
        assert_eq!(engine.stats().health, 0);
        assert_eq!(engine.armed_timers(), 0);
        assert!(engine.active_words().is_empty());

        let events = engine.drain_events();
        let misses = events
            .iter()
            .filter(|e| matches!(e, GameEvent::WordMissed { .. }))
            .count();
        assert_eq!(misses, 10);
        assert_matches!(events.last(), Some(GameEvent::Ended(ScoreRecord::Survival(_))));
    }

    #[test]
    fn test_health_can_go_negative_with_uneven_damage() {
        let config = SurvivalConfig {
            miss_damage: 30,
            ..SurvivalConfig::default()
        };
        let mut engine = SurvivalEngine::with_seed(config, vocab(), 5).unwrap();
        engine.start(ms(0));
        let mut t = 0;
        while engine.state() == EngineState::Running && t < 600_000 {
            t += 100;
            engine.advance(ms(t));
        }
        assert_eq!(engine.stats().words_missed, 4);
        assert_eq!(engine.stats().health, -20);
    }

    #[test]
    fn test_difficulty_ramp() {
        let mut engine = engine();
        engine.start(ms(0));
        engine.drain_events();
        engine.advance(ms(10_000));

        let stats = engine.stats();
        assert_eq!(stats.level, 2);
        assert!((stats.spawn_interval_ms - 3000.0 / 1.1).abs() < 1e-9);
        assert_eq!(stats.base_fall_secs, 14.0);
        assert!(engine
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::LevelUp { level: 2, .. })));
        // spawn, difficulty and the expiries of the words spawned at 3s, 6s, 9s
        assert_eq!(engine.armed_timers(), 5);
    }

    #[test]
    fn test_spawn_rate_and_fall_floors() {
        let mut engine = engine();
        engine.start(ms(0));
        // level 31 after 300s of ramps; keep words from ending the game
        for step in 1..=300u64 {
            engine.advance(ms(step * 1000));
            let texts: Vec<String> = engine.active_words().iter().map(|w| w.text.clone()).collect();
            for text in texts {
                engine.on_input(&text);
            }
        }
        assert_eq!(engine.state(), EngineState::Running);
        assert_eq!(engine.stats().level, 31);
        assert_eq!(engine.stats().spawn_interval_ms, 500.0);
        assert_eq!(engine.stats().base_fall_secs, 5.0);
        assert_eq!(engine.fall_secs(), 1.0);
    }

    #[test]
    fn test_falling_words_keep_their_duration() {
        let mut engine = engine();
        engine.start(ms(0));
        engine.advance(ms(3000));
        let early = engine.active_words()[0].clone();
        engine.advance(ms(10_000));

        let same = engine
            .active_words()
            .iter()
            .find(|w| w.id == early.id)
            .unwrap();
        assert_eq!(same.fall_secs, 14.5);
        assert_eq!(engine.fall_secs(), 13.0);
    }

    #[test]
    fn test_spawn_positions_avoid_collisions() {
        let config = SurvivalConfig {
            base_spawn_rate_ms: 100,
            min_spawn_rate_ms: 100,
            difficulty_interval_ms: 600_000,
            play_width: 400.0,
            ..SurvivalConfig::default()
        };
        let mut engine = SurvivalEngine::with_seed(config, vocab(), 2024).unwrap();
        engine.start(ms(0));
        engine.advance(ms(1000));

        let words = engine.active_words();
        assert_eq!(words.len(), 10);

        let clean = words
            .iter()
            .enumerate()
            .filter(|(i, w)| {
                words[..*i]
                    .iter()
                    .all(|o| (o.x - w.x).abs() >= o.width.min(w.width))
            })
            .count();
        assert!(clean >= 9, "only {clean} of 10 spawns were clear");
    }

    #[test]
    fn test_crowded_field_falls_back_to_last_sample() {
        let config = SurvivalConfig {
            base_spawn_rate_ms: 100,
            min_spawn_rate_ms: 100,
            difficulty_interval_ms: 600_000,
            play_width: 8.0,
            ..SurvivalConfig::default()
        };
        let only_cat = Vocabulary::from_words(["cat"], 6).unwrap();
        let mut engine = SurvivalEngine::with_seed(config, only_cat, 9).unwrap();
        engine.start(ms(0));
        engine.advance(ms(1000));

        // a 5-column range cannot hold ten 3-wide words apart
        let words = engine.active_words();
        assert_eq!(words.len(), 10);
        assert!(words.iter().all(|w| w.x >= 0.0 && w.x < 5.0));
        assert!(words
            .iter()
            .enumerate()
            .any(|(i, w)| words[..i].iter().any(|o| (o.x - w.x).abs() < o.width)));
    }

    #[test]
    fn test_start_twice_is_idempotent() {
        let mut once = engine();
        once.start(ms(0));
        once.advance(ms(3000));

        let mut twice = engine();
        twice.start(ms(0));
        twice.start(ms(0));
        twice.advance(ms(3000));

        assert_eq!(once.stats(), twice.stats());
        assert_eq!(once.active_words(), twice.active_words());
        assert_eq!(once.armed_timers(), twice.armed_timers());
    }

    #[test]
    fn test_start_while_running_keeps_score() {
        let mut engine = engine();
        engine.start(ms(0));
        engine.advance(ms(3000));
        let text = engine.active_words()[0].text.clone();
        engine.on_input(&text);
        let score = engine.stats().score;

        engine.start(ms(3500));
        assert_eq!(engine.stats().score, score);
    }

    #[test]
    fn test_timers_after_end_are_noops() {
        let mut engine = engine();
        engine.start(ms(0));
        engine.advance(ms(9000));
        engine.end();
        assert_eq!(engine.state(), EngineState::Ended);
        let stats = engine.stats().clone();

        engine.advance(ms(120_000));
        assert_eq!(engine.stats(), &stats);
        assert!(engine.on_input("cat").is_none());
    }

    #[test]
    fn test_reset_invalidates_pending_expiries() {
        let mut engine = engine();
        engine.start(ms(0));
        engine.advance(ms(3000));
        engine.reset();
        assert_eq!(engine.armed_timers(), 0);
        assert_eq!(engine.state(), EngineState::Idle);

        engine.start(ms(20_000));
        engine.advance(ms(21_000));
        assert_eq!(engine.stats().health, 100);
    }
}
