use crate::config::ClassicConfig;
use crate::error::GameResult;
use crate::events::{EngineState, GameEvent};
use crate::matching::{classify, match_prefix, MatchClass, PrefixMatch};
use crate::scores::{ClassicScore, GameMode, ScoreRecord};
use crate::timers::{TimerId, TimerQueue};
use crate::vocabulary::Vocabulary;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

/// Counters for one timed classic run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassicSession {
    pub current_word: String,
    pub time_left_secs: u32,
    pub total_keystrokes: u32,
    pub correct_keystrokes: u32,
    pub words_typed: f64,
    pub perfect_words: u32,
    pub imperfect_words: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ClassicTimer {
    Countdown,
    Advance,
}

/// Single-target timed typing drill
#[derive(Debug)]
pub struct ClassicEngine {
    config: ClassicConfig,
    vocabulary: Vocabulary,
    rng: StdRng,
    state: EngineState,
    session: ClassicSession,
    input: String,
    feedback: Option<MatchClass>,
    revealed: Option<String>,
    timers: TimerQueue<ClassicTimer>,
    pending_advance: Option<TimerId>,
    generation: u64,
    result: Option<ClassicScore>,
    events: Vec<GameEvent>,
}

impl ClassicEngine {
    pub fn new(config: ClassicConfig, vocabulary: Vocabulary) -> GameResult<Self> {
        Self::with_rng(config, vocabulary, StdRng::from_entropy())
    }

    pub fn with_seed(config: ClassicConfig, vocabulary: Vocabulary, seed: u64) -> GameResult<Self> {
        Self::with_rng(config, vocabulary, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ClassicConfig, vocabulary: Vocabulary, rng: StdRng) -> GameResult<Self> {
        config.validate()?;
        Ok(Self {
            session: ClassicSession {
                time_left_secs: config.duration_secs,
                ..ClassicSession::default()
            },
            config,
            vocabulary,
            rng,
            state: EngineState::Idle,
            input: String::new(),
            feedback: None,
            revealed: None,
            timers: TimerQueue::new(),
            pending_advance: None,
            generation: 0,
            result: None,
            events: Vec::new(),
        })
    }

    /// Begins a run. Does nothing while a run is already in progress.
    pub fn start(&mut self, now: Duration) {
        if self.state == EngineState::Running {
            log::debug!("classic start ignored: already running");
            return;
        }

        self.generation += 1;
        self.timers.clear();
        self.pending_advance = None;
        self.revealed = None;
        self.result = None;
        self.session = ClassicSession {
            time_left_secs: self.config.duration_secs,
            ..ClassicSession::default()
        };
        self.next_word();
        self.timers
            .every(now, COUNTDOWN_STEP, self.generation, ClassicTimer::Countdown);
        self.state = EngineState::Running;
        self.events.push(GameEvent::Started {
            mode: GameMode::Classic,
        });
        log::info!(
            "classic run {} started ({}s)",
            self.generation,
            self.config.duration_secs
        );
    }

    /// Classifies the live input; counts the keystroke but never advances the word.
    pub fn on_keystroke(&mut self, typed: &str) -> Option<MatchClass> {
        if self.state != EngineState::Running {
            return None;
        }

        self.input = typed.to_string();
        self.session.total_keystrokes += 1;

        let class = classify(typed, &self.session.current_word, self.config.tolerance);
        if class != MatchClass::Wrong {
            self.session.correct_keystrokes += 1;
        }
        self.feedback = Some(class);
        Some(class)
    }

    /// Confirms `typed` against the target. Returns `None` when nothing is accepted,
    /// including while a close word is still being revealed.
    pub fn on_submit(&mut self, typed: &str, now: Duration) -> Option<MatchClass> {
        if self.state != EngineState::Running || self.revealed.is_some() {
            return None;
        }

        let word = self.session.current_word.clone();
        match classify(typed, &word, self.config.tolerance) {
            MatchClass::Exact => {
                self.session.perfect_words += 1;
                self.session.words_typed += 1.0;
                self.events.push(GameEvent::WordCompleted {
                    word,
                    perfect: true,
                });
                self.next_word();
                Some(MatchClass::Exact)
            }
            MatchClass::Close => {
                self.session.imperfect_words += 1;
                self.session.words_typed += self.config.error_penalty;
                self.events.push(GameEvent::WordCompleted {
                    word: word.clone(),
                    perfect: false,
                });
                self.revealed = Some(word);
                self.pending_advance = Some(self.timers.once(
                    now,
                    Duration::from_millis(self.config.advance_delay_ms),
                    self.generation,
                    ClassicTimer::Advance,
                ));
                Some(MatchClass::Close)
            }
            MatchClass::Wrong => None,
        }
    }

    /// Fires every timer due by `now`.
    pub fn advance(&mut self, now: Duration) {
        while let Some(fired) = self.timers.pop_due(now) {
            if fired.generation != self.generation || self.state != EngineState::Running {
                log::debug!("dropping stale classic timer {:?}", fired.kind);
                continue;
            }

            match fired.kind {
                ClassicTimer::Countdown => {
                    self.session.time_left_secs = self.session.time_left_secs.saturating_sub(1);
                    if self.session.time_left_secs == 0 {
                        self.finish();
                    }
                }
                ClassicTimer::Advance => {
                    self.pending_advance = None;
                    self.revealed = None;
                    self.next_word();
                }
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
        self.pending_advance = None;
        self.revealed = None;
        self.input.clear();
        self.feedback = None;
        self.state = EngineState::Idle;
    }

    pub fn wpm(&self) -> u32 {
        let elapsed_secs = self
            .config
            .duration_secs
            .saturating_sub(self.session.time_left_secs);
        let minutes = f64::from(elapsed_secs) / 60.0;
        if minutes == 0.0 {
            return 0;
        }
        let credited = f64::from(self.session.perfect_words)
            + f64::from(self.session.imperfect_words) * self.config.error_penalty;
        (credited / minutes).round() as u32
    }

    pub fn accuracy(&self) -> u32 {
        if self.session.total_keystrokes == 0 {
            return 100;
        }
        (f64::from(self.session.correct_keystrokes) / f64::from(self.session.total_keystrokes)
            * 100.0)
            .round() as u32
    }

    pub fn has_started(&self) -> bool {
        self.state != EngineState::Idle
    }

    pub fn has_finished(&self) -> bool {
        self.state == EngineState::Ended
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn session(&self) -> &ClassicSession {
        &self.session
    }

    pub fn current_word(&self) -> &str {
        &self.session.current_word
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn feedback(&self) -> Option<MatchClass> {
        self.feedback
    }

    /// Correct spelling shown after a close submission, until the next word arrives
    pub fn revealed(&self) -> Option<&str> {
        self.revealed.as_deref()
    }

    pub fn highlight(&self) -> PrefixMatch {
        match_prefix(&self.input, &self.session.current_word)
    }

    /// Share of the countdown still remaining, 0..=1
    pub fn time_fraction(&self) -> f64 {
        f64::from(self.session.time_left_secs) / f64::from(self.config.duration_secs)
    }

    pub fn result(&self) -> Option<&ClassicScore> {
        self.result.as_ref()
    }

    pub fn config(&self) -> &ClassicConfig {
        &self.config
    }

    pub fn armed_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn next_word(&mut self) {
        self.input.clear();
        self.feedback = None;
        self.session.current_word = self.vocabulary.choose(&mut self.rng).to_string();
    }

    fn finish(&mut self) {
        self.timers.clear();
        self.pending_advance = None;
        self.revealed = None;
        self.state = EngineState::Ended;

        let score = ClassicScore {
            wpm: self.wpm(),
            accuracy: self.accuracy(),
            perfect_words: self.session.perfect_words,
            imperfect_words: self.session.imperfect_words,
            words_typed: self.session.words_typed,
            date: Utc::now(),
        };
        log::info!(
            "classic run {} ended: {} wpm, {}% accuracy ({} perfect, {} close)",
            self.generation,
            score.wpm,
            score.accuracy,
            score.perfect_words,
            score.imperfect_words
        );
        self.result = Some(score.clone());
        self.events.push(GameEvent::Ended(ScoreRecord::Classic(score)));
    }
}
