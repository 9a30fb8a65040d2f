//! Game logic for the three-player Iterated Prisoner's Dilemma arena.
//!
//! The crate provides:
//! - the payoff table and the episode environment
//! - rule-based, genetic and reasoning-service strategies
//! - the pairing scheduler and the tournament runner
//!
//! It compiles natively and, with the `wasm` feature, to WASM for replays.

mod error;
mod random;
mod environment;
mod strategy;
mod genetic;
mod reasoning;
mod pairing;
mod game;
mod tournament;

#[cfg(feature = "wasm")]
mod wasm;

use serde::{Deserialize, Serialize};

pub use error::{ArenaError, Result};
pub use random::SeededRng;
pub use environment::{EnvConfig, Environment, EpisodeState, HistoryBuffer, Info, Observation, Reset, StepResult};
pub use strategy::{Defector, RuleKind, RuleState, RuleStrategy, Strategy, StrategySpec};
pub use genetic::{gene_index, gene_labels, genotype_len, GeneticStrategy, Genotype, MAX_MEMORY_LEN};
pub use reasoning::{parse_action, Message, ReasoningClient, ReasoningStrategy, RetryPolicy, Role};
pub use pairing::schedule_pairs;
pub use game::{run_episode, EpisodeResult, RoundRecord};
pub use tournament::{run_tournament, Standing, TournamentResult};

/// Number of seats in every episode.
pub const N_PLAYERS: usize = 3;

/// Number of distinct joint outcomes of one round (2^N_PLAYERS).
pub const N_OUTCOMES: usize = 8;

/// A move in the game, or the sentinel for a round not yet played.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
#[repr(i8)]
pub enum Action {
    /// Not yet played. Never a legal move.
    NoAction = -1,
    Cooperate = 0,
    Defect = 1,
}

impl Action {
    /// Numeric value: -1, 0 or 1.
    pub fn value(self) -> i8 {
        self as i8
    }

    /// True for Cooperate and Defect.
    pub fn is_played(self) -> bool {
        self != Action::NoAction
    }

    /// Bit used by the payoff table and the gene encoding (C = 0, D = 1).
    pub fn bit(self) -> Option<usize> {
        match self {
            Action::Cooperate => Some(0),
            Action::Defect => Some(1),
            Action::NoAction => None,
        }
    }

    /// Single-letter form used in tables and logs.
    pub fn letter(self) -> char {
        match self {
            Action::Cooperate => 'C',
            Action::Defect => 'D',
            Action::NoAction => '-',
        }
    }

    /// Cooperate or Defect with equal probability.
    pub fn random(rng: &mut SeededRng) -> Self {
        if rng.next_bool() {
            Action::Defect
        } else {
            Action::Cooperate
        }
    }
}

impl From<Action> for i8 {
    fn from(action: Action) -> Self {
        action.value()
    }
}

impl TryFrom<i8> for Action {
    type Error = ArenaError;

    fn try_from(value: i8) -> Result<Self> {
        Action::try_from(value as i64)
    }
}

impl TryFrom<i64> for Action {
    type Error = ArenaError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            -1 => Ok(Action::NoAction),
            0 => Ok(Action::Cooperate),
            1 => Ok(Action::Defect),
            _ => Err(ArenaError::UnknownAction { value }),
        }
    }
}

/// Reward table indexed by (self, opponent 1, opponent 2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoffMatrix {
    table: [[[i32; 2]; 2]; 2],
}

impl PayoffMatrix {
    /// The tournament payoffs.
    pub const STANDARD: PayoffMatrix = PayoffMatrix {
        table: [[[6, 3], [3, 0]], [[8, 5], [5, 2]]],
    };

    /// Table indexed `[me][opp1][opp2]` by action bit (C = 0, D = 1).
    pub fn new(table: [[[i32; 2]; 2]; 2]) -> Self {
        Self { table }
    }

    /// Reward for `me` given the two opponents' moves.
    ///
    /// Fails with `InvalidAction` if any move is `NoAction`; the seat in the
    /// error is the position inside the triple.
    pub fn reward(&self, me: Action, opp1: Action, opp2: Action) -> Result<i32> {
        let bit = |seat: usize, action: Action| {
            action.bit().ok_or(ArenaError::InvalidAction { seat, action })
        };
        Ok(self.table[bit(0, me)?][bit(1, opp1)?][bit(2, opp2)?])
    }

    /// Reward when everybody cooperates.
    pub fn mutual_cooperation(&self) -> i32 {
        self.table[0][0][0]
    }

    /// Reward when everybody defects.
    pub fn mutual_defection(&self) -> i32 {
        self.table[1][1][1]
    }
}

impl Default for PayoffMatrix {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Reward for `me` under the standard payoff table.
pub fn payoff(me: Action, opp1: Action, opp2: Action) -> Result<i32> {
    PayoffMatrix::STANDARD.reward(me, opp1, opp2)
}
