//! Pattern memory game
//!
//! The engine plays a growing prefix of a random colour pattern and checks
//! the player's presses against it:
//! 1. `play_turn` hands `pattern[0..=progress]` to a presenter, then unlocks input
//! 2. `check_press` advances within the round, or closes it
//! 3. Completing the whole pattern scores its length and starts a longer one
//! 4. A mistake records the score and restarts at the starting length
//!
//! Rendering and audio live behind the `Presenter` seam.

pub mod scores;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::store::StoreError;

pub use scores::{HighScoreTable, StoredScore, SCORE_DATE_FORMAT};

/// The four game colours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    Yellow,
    Blue,
    Red,
    Green,
}

impl Symbol {
    pub const ALL: [Symbol; 4] = [Symbol::Yellow, Symbol::Blue, Symbol::Red, Symbol::Green];

    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::Yellow => "yellow",
            Symbol::Blue => "blue",
            Symbol::Red => "red",
            Symbol::Green => "green",
        }
    }

    /// Uniformly random symbol
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Symbol {
    type Err = GameError;

    /// Accepts the full name or its first letter, any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yellow" | "y" => Ok(Symbol::Yellow),
            "blue" | "b" => Ok(Symbol::Blue),
            "red" | "r" => Ok(Symbol::Red),
            "green" | "g" => Ok(Symbol::Green),
            other => Err(GameError::UnknownSymbol(other.to_string())),
        }
    }
}

/// Shows one symbol of the playback and returns once it has been shown
#[async_trait]
pub trait Presenter: Send {
    async fn present(&mut self, symbol: Symbol);
}

/// What a press did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PressOutcome {
    /// Correct, still the player's turn
    Advance,
    /// Correct, round finished; the next playback is one symbol longer
    RoundComplete,
    /// Correct, whole pattern finished; a longer pattern replaces it
    PatternComplete { gained: u32 },
    /// Wrong; the game restarts
    Mismatch { final_score: u32, recorded: bool },
}

impl PressOutcome {
    /// Whether the engine takes the next turn
    pub fn engine_proceeds(&self) -> bool {
        !matches!(self, PressOutcome::Advance)
    }
}

/// Score signals for the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    ScoreChanged { score: u32 },
    PatternStarted { length: usize },
    HighScoresChanged,
}

pub struct PatternEngine<R: Rng = StdRng> {
    rng: R,
    pattern: Vec<Symbol>,
    place: usize,
    progress: usize,
    score: u32,
    accepting_input: bool,
    starting_length: usize,
    growth: usize,
    high_scores: HighScoreTable,
    events: broadcast::Sender<GameEvent>,
}

impl PatternEngine<StdRng> {
    pub fn from_entropy(config: &GameConfig, high_scores: HighScoreTable) -> Self {
        Self::new(config, high_scores, StdRng::from_entropy())
    }
}

impl<R: Rng> PatternEngine<R> {
    /// New engine with a pattern of the starting length ready to play
    pub fn new(config: &GameConfig, high_scores: HighScoreTable, rng: R) -> Self {
        let (events, _) = broadcast::channel(64);
        let mut engine = Self {
            rng,
            pattern: Vec::new(),
            place: 0,
            progress: 0,
            score: 0,
            accepting_input: false,
            starting_length: config.starting_length,
            growth: config.growth,
            high_scores,
            events,
        };
        engine.generate_pattern(config.starting_length);
        engine
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    pub fn pattern(&self) -> &[Symbol] {
        &self.pattern
    }

    pub fn place(&self) -> usize {
        self.place
    }

    pub fn progress(&self) -> usize {
        self.progress
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn accepting_input(&self) -> bool {
        self.accepting_input
    }

    /// Replace the pattern with `length` random symbols and rewind.
    pub fn generate_pattern(&mut self, length: usize) {
        let rng = &mut self.rng;
        self.pattern = (0..length).map(|_| Symbol::random(&mut *rng)).collect();
        self.place = 0;
        self.progress = 0;
        self.accepting_input = false;
        debug!(length, "New pattern");
        let _ = self.events.send(GameEvent::PatternStarted { length });
    }

    /// Prefix shown on the next playback
    pub fn playback(&self) -> &[Symbol] {
        let end = (self.progress + 1).min(self.pattern.len());
        &self.pattern[..end]
    }

    /// Present the current prefix, then accept input.
    ///
    /// Returns the number of symbols shown.
    pub async fn play_turn(&mut self, presenter: &mut dyn Presenter) -> Result<usize, GameError> {
        if self.pattern.is_empty() {
            return Err(GameError::NoPattern);
        }
        self.accepting_input = false;

        let shown = self.playback().to_vec();
        for symbol in &shown {
            presenter.present(*symbol).await;
        }

        self.accepting_input = true;
        Ok(shown.len())
    }

    /// Check a player press against the pattern.
    pub fn check_press(&mut self, symbol: Symbol) -> Result<PressOutcome, GameError> {
        if !self.accepting_input {
            return Err(GameError::InputLocked);
        }
        let expected = *self.pattern.get(self.place).ok_or(GameError::NoPattern)?;
        let last = self.pattern.len() - 1;

        let outcome = if symbol == expected {
            if self.place != self.progress && self.place != last {
                self.place += 1;
                PressOutcome::Advance
            } else if self.place == last {
                let gained = self.pattern.len() as u32;
                self.score += gained;
                info!(gained, score = self.score, "Pattern complete");
                self.generate_pattern(self.pattern.len() + self.growth);
                PressOutcome::PatternComplete { gained }
            } else {
                self.place = 0;
                self.progress += 1;
                self.accepting_input = false;
                PressOutcome::RoundComplete
            }
        } else {
            let final_score = self.score;
            let recorded = self.record_score(final_score);
            self.score = 0;
            self.generate_pattern(self.starting_length);
            PressOutcome::Mismatch {
                final_score,
                recorded,
            }
        };

        let _ = self.events.send(GameEvent::ScoreChanged { score: self.score });
        Ok(outcome)
    }

    fn record_score(&mut self, score: u32) -> bool {
        if score == 0 {
            return false;
        }
        match self.high_scores.record(score, chrono::Utc::now()) {
            Ok(kept) => {
                let _ = self.events.send(GameEvent::HighScoresChanged);
                kept
            }
            Err(e) => {
                warn!(score, error = %e, "Could not save high score");
                false
            }
        }
    }

    pub fn high_scores(&self) -> Result<Vec<StoredScore>, GameError> {
        Ok(self.high_scores.list()?)
    }
}

/// Game errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum GameError {
    #[error("Input locked until playback finishes")]
    InputLocked,

    #[error("No pattern to play")]
    NoPattern,

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Score storage error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[derive(Default)]
    struct Recorder {
        shown: Vec<Symbol>,
    }

    #[async_trait]
    impl Presenter for Recorder {
        async fn present(&mut self, symbol: Symbol) {
            self.shown.push(symbol);
        }
    }

    fn engine(seed: u64) -> PatternEngine<StdRng> {
        let table = HighScoreTable::new(Box::new(MemoryStore::new()), 20);
        PatternEngine::new(&GameConfig::default(), table, StdRng::seed_from_u64(seed))
    }

    fn wrong(symbol: Symbol) -> Symbol {
        Symbol::ALL.into_iter().find(|s| *s != symbol).unwrap()
    }

    /// Play rounds perfectly until the current pattern is complete
    async fn clear_pattern(engine: &mut PatternEngine<StdRng>) -> u32 {
        let mut presenter = Recorder::default();
        loop {
            engine.play_turn(&mut presenter).await.unwrap();
            let round = engine.playback().to_vec();
            for symbol in round {
                match engine.check_press(symbol).unwrap() {
                    PressOutcome::Advance | PressOutcome::RoundComplete => {}
                    PressOutcome::PatternComplete { gained } => return gained,
                    other => panic!("unexpected {:?}", other),
                }
            }
        }
    }

    #[test]
    fn test_generate_pattern_length() {
        let mut engine = engine(1);
        assert_eq!(engine.pattern().len(), 10);
        engine.generate_pattern(3);
        assert_eq!(engine.pattern().len(), 3);
        assert_eq!((engine.place(), engine.progress()), (0, 0));
        assert!(engine.pattern().iter().all(|s| Symbol::ALL.contains(s)));
    }

    #[test]
    fn test_input_locked_before_playback() {
        let mut engine = engine(2);
        let first = engine.pattern()[0];
        assert!(matches!(engine.check_press(first), Err(GameError::InputLocked)));
    }

    #[tokio::test]
    async fn test_playback_grows_by_round() {
        let mut engine = engine(3);
        let mut presenter = Recorder::default();

        assert_eq!(engine.play_turn(&mut presenter).await.unwrap(), 1);
        let first = engine.pattern()[0];
        assert_eq!(engine.check_press(first).unwrap(), PressOutcome::RoundComplete);
        assert!(!engine.accepting_input());

        assert_eq!(engine.play_turn(&mut presenter).await.unwrap(), 2);
        assert_eq!(presenter.shown, vec![first, first, engine.pattern()[1]]);

        assert_eq!(engine.check_press(first).unwrap(), PressOutcome::Advance);
        assert_eq!(engine.place(), 1);
    }

    #[tokio::test]
    async fn test_full_replay_scores_length_and_grows() {
        let mut engine = engine(4);
        engine.generate_pattern(4);

        assert_eq!(clear_pattern(&mut engine).await, 4);
        assert_eq!(engine.score(), 4);
        assert_eq!(engine.pattern().len(), 9);
        assert_eq!((engine.place(), engine.progress()), (0, 0));
    }

    #[tokio::test]
    async fn test_mismatch_records_and_resets() {
        let store = MemoryStore::new();
        let table = HighScoreTable::new(Box::new(store.clone()), 20);
        let mut engine = PatternEngine::new(&GameConfig::default(), table, StdRng::seed_from_u64(5));
        engine.generate_pattern(2);
        clear_pattern(&mut engine).await;

        let mut presenter = Recorder::default();
        engine.play_turn(&mut presenter).await.unwrap();
        let bad = wrong(engine.pattern()[0]);
        assert_eq!(
            engine.check_press(bad).unwrap(),
            PressOutcome::Mismatch { final_score: 2, recorded: true }
        );
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.pattern().len(), 10);
        assert_eq!(engine.high_scores().unwrap()[0].score, 2);
    }

    #[tokio::test]
    async fn test_mismatch_with_zero_score_records_nothing() {
        let mut engine = engine(6);
        let mut presenter = Recorder::default();
        engine.play_turn(&mut presenter).await.unwrap();
        let bad = wrong(engine.pattern()[0]);

        assert_eq!(
            engine.check_press(bad).unwrap(),
            PressOutcome::Mismatch { final_score: 0, recorded: false }
        );
        assert!(engine.high_scores().unwrap().is_empty());
    }

    #[test]
    fn test_symbol_parse() {
        assert_eq!("R".parse::<Symbol>().unwrap(), Symbol::Red);
        assert_eq!(" green ".parse::<Symbol>().unwrap(), Symbol::Green);
        assert!("purple".parse::<Symbol>().is_err());
    }
}
