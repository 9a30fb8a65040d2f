//! Episode environment
//!
//! Tracks the round history of one three-seat episode and computes the
//! seat-relative rewards. Every seat perceives itself as row 0 of its
//! observation, so one strategy can occupy any seat unmodified.

use serde::{Deserialize, Serialize};

use crate::error::{ArenaError, Result};
use crate::random::SeededRng;
use crate::{Action, PayoffMatrix, N_PLAYERS};

/// Per-seat auxiliary data returned by `reset` and `step`. Always empty.
pub type Info = serde_json::Map<String, serde_json::Value>;

/// Bounds for the per-episode horizon
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvConfig {
    pub min_rounds: u32,
    pub max_rounds: u32,
}

impl EnvConfig {
    /// Validated config; requires `1 <= min_rounds <= max_rounds`
    pub fn new(min_rounds: u32, max_rounds: u32) -> Result<Self> {
        let config = Self { min_rounds, max_rounds };
        config.validate()?;
        Ok(config)
    }

    /// 20 to 50 rounds per episode
    pub fn standard() -> Self {
        Self { min_rounds: 20, max_rounds: 50 }
    }

    /// Every episode lasts exactly `rounds` rounds
    pub fn fixed(rounds: u32) -> Self {
        Self { min_rounds: rounds, max_rounds: rounds }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_rounds == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "min_rounds must be at least 1".to_string(),
            });
        }
        if self.min_rounds > self.max_rounds {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "min_rounds {} exceeds max_rounds {}",
                    self.min_rounds, self.max_rounds
                ),
            });
        }
        Ok(())
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Round history of one episode: one row per seat, newest column last.
///
/// Unplayed columns hold `NoAction` and always form a prefix of every row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryBuffer {
    rows: [Vec<Action>; N_PLAYERS],
}

impl HistoryBuffer {
    pub fn new(width: usize) -> Self {
        Self {
            rows: std::array::from_fn(|_| vec![Action::NoAction; width]),
        }
    }

    pub fn width(&self) -> usize {
        self.rows[0].len()
    }

    pub fn row(&self, seat: usize) -> &[Action] {
        &self.rows[seat]
    }

    /// Drop the oldest column and append `actions` in seat order.
    fn push_column(&mut self, actions: &[Action; N_PLAYERS]) {
        for (row, action) in self.rows.iter_mut().zip(actions) {
            row.rotate_left(1);
            if let Some(newest) = row.last_mut() {
                *newest = *action;
            }
        }
    }

    /// View from `seat`: row 0 is the seat itself, then the others in
    /// cyclic order.
    pub fn rotated(&self, seat: usize) -> Observation {
        Observation {
            rows: std::array::from_fn(|k| self.rows[(seat + k) % N_PLAYERS].clone()),
        }
    }
}

/// One seat's view of the history. Row 0 is the observer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ObservationRows")]
pub struct Observation {
    rows: [Vec<Action>; N_PLAYERS],
}

#[derive(Deserialize)]
struct ObservationRows {
    rows: [Vec<Action>; N_PLAYERS],
}

impl TryFrom<ObservationRows> for Observation {
    type Error = ArenaError;

    fn try_from(raw: ObservationRows) -> Result<Self> {
        Observation::from_rows(raw.rows)
    }
}

impl Observation {
    /// Build an observation directly.
    ///
    /// # Errors
    /// `MalformedObservation` unless every row has the same length.
    pub fn from_rows(rows: [Vec<Action>; N_PLAYERS]) -> Result<Self> {
        let widths = rows.each_ref().map(|row| row.len());
        if widths.iter().any(|w| *w != widths[0]) {
            return Err(ArenaError::MalformedObservation { widths });
        }
        Ok(Self { rows })
    }

    /// Observation of `width` unplayed columns.
    pub fn empty(width: usize) -> Self {
        HistoryBuffer::new(width).rotated(0)
    }

    pub fn rows(&self) -> &[Vec<Action>; N_PLAYERS] {
        &self.rows
    }

    pub fn row(&self, k: usize) -> &[Action] {
        &self.rows[k]
    }

    pub fn width(&self) -> usize {
        self.rows[0].len()
    }

    /// Action of row `k` played `n` rounds before the newest column.
    pub fn ago(&self, k: usize, n: usize) -> Action {
        let row = &self.rows[k];
        row.len()
            .checked_sub(n + 1)
            .map(|i| row[i])
            .unwrap_or(Action::NoAction)
    }

    /// Newest action of row `k`.
    pub fn last(&self, k: usize) -> Action {
        self.ago(k, 0)
    }

    /// The newest `n` cells of row `k` (fewer if the row is shorter).
    pub fn recent(&self, k: usize, n: usize) -> &[Action] {
        let row = &self.rows[k];
        &row[row.len().saturating_sub(n)..]
    }

    /// All rows at column `c`, in observer order.
    pub fn column(&self, c: usize) -> [Action; N_PLAYERS] {
        std::array::from_fn(|k| self.rows[k][c])
    }

    /// Number of columns in which every seat has played.
    pub fn rounds_known(&self) -> usize {
        (0..self.width())
            .filter(|c| self.column(*c).iter().all(|a| a.is_played()))
            .count()
    }
}

/// Lifecycle of an environment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpisodeState {
    Uninitialized,
    InEpisode { round: u32, horizon: u32 },
    Terminated { horizon: u32 },
}

impl EpisodeState {
    fn name(&self) -> &'static str {
        match self {
            EpisodeState::Uninitialized => "uninitialized",
            EpisodeState::InEpisode { .. } => "in episode",
            EpisodeState::Terminated { .. } => "terminated",
        }
    }
}

/// Output of `Environment::reset`
#[derive(Clone, Debug)]
pub struct Reset {
    pub observations: [Observation; N_PLAYERS],
    pub infos: [Info; N_PLAYERS],
}

/// Output of `Environment::step`, indexed by seat
#[derive(Clone, Debug)]
pub struct StepResult {
    pub observations: [Observation; N_PLAYERS],
    pub rewards: [i32; N_PLAYERS],
    pub terminations: [bool; N_PLAYERS],
    pub truncations: [bool; N_PLAYERS],
    pub infos: [Info; N_PLAYERS],
}

impl StepResult {
    /// True once the episode has ended (for every seat at once).
    pub fn is_done(&self) -> bool {
        self.terminations.iter().any(|t| *t)
    }
}

/// Three-seat iterated prisoner's dilemma
#[derive(Clone, Debug)]
pub struct Environment {
    config: EnvConfig,
    payoffs: PayoffMatrix,
    history: HistoryBuffer,
    state: EpisodeState,
}

impl Environment {
    pub fn new(config: EnvConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            payoffs: PayoffMatrix::STANDARD,
            history: HistoryBuffer::new(config.max_rounds as usize),
            state: EpisodeState::Uninitialized,
        })
    }

    /// Replace the payoff table
    pub fn with_payoffs(mut self, payoffs: PayoffMatrix) -> Self {
        self.payoffs = payoffs;
        self
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn payoffs(&self) -> &PayoffMatrix {
        &self.payoffs
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Current view for `seat`
    pub fn observe(&self, seat: usize) -> Observation {
        self.history.rotated(seat % N_PLAYERS)
    }

    /// Start a new episode with a horizon drawn from `rng`
    pub fn reset(&mut self, rng: &mut SeededRng) -> Reset {
        let horizon = rng.next_inclusive(self.config.min_rounds, self.config.max_rounds);
        self.history = HistoryBuffer::new(self.config.max_rounds as usize);
        self.state = EpisodeState::InEpisode { round: 0, horizon };
        log::trace!("episode reset with horizon {}", horizon);

        Reset {
            observations: std::array::from_fn(|seat| self.observe(seat)),
            infos: std::array::from_fn(|_| Info::new()),
        }
    }

    /// Play one round. `actions[i]` is the move of seat `i`.
    ///
    /// On error the history is left untouched.
    pub fn step(&mut self, actions: [Action; N_PLAYERS]) -> Result<StepResult> {
        let (round, horizon) = match self.state {
            EpisodeState::InEpisode { round, horizon } => (round, horizon),
            other => {
                return Err(ArenaError::InvalidState {
                    expected: "in episode",
                    found: other.name(),
                })
            }
        };

        for (seat, action) in actions.iter().enumerate() {
            if !action.is_played() {
                return Err(ArenaError::InvalidAction { seat, action: *action });
            }
        }

        // Rewards come from the triple rotated to start at each seat
        let mut rewards = [0i32; N_PLAYERS];
        for (seat, reward) in rewards.iter_mut().enumerate() {
            *reward = self.payoffs.reward(
                actions[seat],
                actions[(seat + 1) % N_PLAYERS],
                actions[(seat + 2) % N_PLAYERS],
            )?;
        }

        self.history.push_column(&actions);
        let round = round + 1;
        let done = round == horizon;
        self.state = if done {
            EpisodeState::Terminated { horizon }
        } else {
            EpisodeState::InEpisode { round, horizon }
        };
        log::trace!("round {}/{}: actions {:?} rewards {:?}", round, horizon, actions, rewards);

        Ok(StepResult {
            observations: std::array::from_fn(|seat| self.observe(seat)),
            rewards,
            terminations: [done; N_PLAYERS],
            truncations: [false; N_PLAYERS],
            infos: std::array::from_fn(|_| Info::new()),
        })
    }
}
