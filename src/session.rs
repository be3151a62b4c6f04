use crate::classic::ClassicEngine;
use crate::config::Config;
use crate::error::GameResult;
use crate::events::{EngineState, GameEvent};
use crate::scores::{self, ClassicScore, GameMode, ScoreStore, SurvivalScore};
use crate::survival::SurvivalEngine;
use crate::vocabulary::{Vocabulary, WordSource};
use std::fmt;
use std::time::Duration;

/// Owns everything one player's session needs: config, vocabulary, both engines and the
/// score store. Built once by the entry point.
pub struct GameSession {
    config: Config,
    source: Box<dyn WordSource>,
    store: Box<dyn ScoreStore>,
    seed: Option<u64>,
    vocabulary: Option<Vocabulary>,
    classic: Option<ClassicEngine>,
    survival: Option<SurvivalEngine>,
    mode: Option<GameMode>,
    last_error: Option<String>,
    events: Vec<GameEvent>,
}

impl fmt::Debug for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("config", &self.config)
            .field("seed", &self.seed)
            .field("mode", &self.mode)
            .field("state", &self.state())
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl GameSession {
    pub fn new(
        config: Config,
        source: Box<dyn WordSource>,
        store: Box<dyn ScoreStore>,
        seed: Option<u64>,
    ) -> GameResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            store,
            seed,
            vocabulary: None,
            classic: None,
            survival: None,
            mode: None,
            last_error: None,
            events: Vec::new(),
        })
    }

    pub fn start_classic(&mut self, now: Duration) -> GameResult<()> {
        if self.classic.is_none() {
            let vocabulary = self.vocabulary()?;
            let config = self.config.classic.clone();
            let engine = match self.seed {
                Some(seed) => ClassicEngine::with_seed(config, vocabulary, seed)?,
                None => ClassicEngine::new(config, vocabulary)?,
            };
            self.classic = Some(engine);
        }
        if let Some(engine) = self.classic.as_mut() {
            engine.start(now);
        }
        self.switch_to(GameMode::Classic);
        Ok(())
    }

    pub fn start_survival(&mut self, now: Duration) -> GameResult<()> {
        if self.survival.is_none() {
            let vocabulary = self.vocabulary()?;
            let config = self.config.survival.clone();
            let engine = match self.seed {
                Some(seed) => SurvivalEngine::with_seed(config, vocabulary, seed)?,
                None => SurvivalEngine::new(config, vocabulary)?,
            };
            self.survival = Some(engine);
        }
        if let Some(engine) = self.survival.as_mut() {
            engine.start(now);
        }
        self.switch_to(GameMode::Survival);
        Ok(())
    }

    /// Restarts whichever mode was played last
    pub fn retry(&mut self, now: Duration) -> GameResult<()> {
        match self.mode {
            Some(GameMode::Classic) => self.start_classic(now),
            Some(GameMode::Survival) => self.start_survival(now),
            None => Ok(()),
        }
    }

    /// Replaces the whole input text, as an input field change does
    pub fn input(&mut self, text: &str) {
        match self.mode {
            Some(GameMode::Classic) => {
                if let Some(engine) = self.classic.as_mut() {
                    engine.on_keystroke(text);
                }
            }
            Some(GameMode::Survival) => {
                if let Some(engine) = self.survival.as_mut() {
                    engine.on_input(text);
                }
            }
            None => {}
        }
        self.collect();
    }

    pub fn type_char(&mut self, c: char) {
        let mut text = self.current_input().to_string();
        text.push(c);
        self.input(&text);
    }

    /// Drops one char. In survival with quick clear on, wipes the whole input.
    pub fn backspace(&mut self) {
        let text = if self.config.quick_clear && self.mode == Some(GameMode::Survival) {
            String::new()
        } else {
            let mut text = self.current_input().to_string();
            text.pop();
            text
        };
        self.input(&text);
    }

    /// Explicit confirm (Enter); only classic mode acts on it
    pub fn submit(&mut self, now: Duration) {
        if self.mode == Some(GameMode::Classic) {
            if let Some(engine) = self.classic.as_mut() {
                let typed = engine.input().to_string();
                engine.on_submit(&typed, now);
            }
        }
        self.collect();
    }

    pub fn advance(&mut self, now: Duration) {
        match self.mode {
            Some(GameMode::Classic) => {
                if let Some(engine) = self.classic.as_mut() {
                    engine.advance(now);
                }
            }
            Some(GameMode::Survival) => {
                if let Some(engine) = self.survival.as_mut() {
                    engine.advance(now);
                }
            }
            None => {}
        }
        self.collect();
    }

    pub fn end(&mut self) {
        match self.mode {
            Some(GameMode::Classic) => {
                if let Some(engine) = self.classic.as_mut() {
                    engine.end();
                }
            }
            Some(GameMode::Survival) => {
                if let Some(engine) = self.survival.as_mut() {
                    engine.end();
                }
            }
            None => {}
        }
        self.collect();
    }

    /// Abandons any game in progress without recording it
    pub fn back_to_menu(&mut self) {
        self.last_error = None;
        if let Some(engine) = self.classic.as_mut() {
            engine.reset();
        }
        if let Some(engine) = self.survival.as_mut() {
            engine.reset();
        }
        self.mode = None;
    }

    pub fn leaderboards(&self) -> (Vec<ClassicScore>, Vec<SurvivalScore>) {
        (
            scores::load_leaderboard(self.store.as_ref()),
            scores::load_leaderboard(self.store.as_ref()),
        )
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn mode(&self) -> Option<GameMode> {
        self.mode
    }

    /// State of the engine for the current mode; idle in the menu
    pub fn state(&self) -> EngineState {
        match self.mode {
            Some(GameMode::Classic) => self.classic.as_ref().map(ClassicEngine::state),
            Some(GameMode::Survival) => self.survival.as_ref().map(SurvivalEngine::state),
            None => None,
        }
        .unwrap_or_default()
    }

    pub fn classic(&self) -> Option<&ClassicEngine> {
        self.classic.as_ref()
    }

    pub fn survival(&self) -> Option<&SurvivalEngine> {
        self.survival.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Why the last start attempt failed, if it did
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn current_input(&self) -> &str {
        match self.mode {
            Some(GameMode::Classic) => self.classic.as_ref().map_or("", ClassicEngine::input),
            Some(GameMode::Survival) => self.survival.as_ref().map_or("", SurvivalEngine::input),
            None => "",
        }
    }

    fn vocabulary(&mut self) -> GameResult<Vocabulary> {
        if let Some(vocabulary) = &self.vocabulary {
            return Ok(vocabulary.clone());
        }

        match Vocabulary::load(self.source.as_ref(), self.config.max_word_len) {
            Ok(vocabulary) => {
                self.last_error = None;
                self.vocabulary = Some(vocabulary.clone());
                Ok(vocabulary)
            }
            Err(e) => {
                log::error!("cannot start a game: {e}");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn switch_to(&mut self, mode: GameMode) {
        // leaving a running game of the other mode abandons it
        match mode {
            GameMode::Classic => {
                if let Some(engine) = self.survival.as_mut() {
                    engine.reset();
                }
            }
            GameMode::Survival => {
                if let Some(engine) = self.classic.as_mut() {
                    engine.reset();
                }
            }
        }
        self.mode = Some(mode);
        self.collect();
    }

    fn collect(&mut self) {
        let mut drained = Vec::new();
        if let Some(engine) = self.classic.as_mut() {
            drained.extend(engine.drain_events());
        }
        if let Some(engine) = self.survival.as_mut() {
            drained.extend(engine.drain_events());
        }

        for event in &drained {
            if let GameEvent::Ended(record) = event {
                if let Err(e) = scores::record(self.store.as_ref(), record) {
                    log::warn!("could not save {} score: {e}", record.mode());
                }
            }
        }
        self.events.extend(drained);
    }
}
