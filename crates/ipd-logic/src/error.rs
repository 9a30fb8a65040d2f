//! Error types for environment, strategy and tournament operations.

use thiserror::Error;

use crate::{Action, N_PLAYERS};

/// Errors that can occur while running the arena.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// An action outside {Cooperate, Defect} was played.
    #[error("invalid action {action:?} for seat {seat}")]
    InvalidAction { seat: usize, action: Action },

    /// A numeric value that is not an action code.
    #[error("unknown action value {value}")]
    UnknownAction { value: i64 },

    /// Operation not allowed in the current environment state.
    #[error("invalid environment state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },

    /// Observation rows of different lengths.
    #[error("observation rows must have equal length, got {widths:?}")]
    MalformedObservation { widths: [usize; N_PLAYERS] },

    /// Genotype length does not match the declared memory length.
    #[error("genotype for memory length {memory_len} must have {expected} genes, got {actual}")]
    MalformedGenotype {
        memory_len: usize,
        expected: usize,
        actual: usize,
    },

    /// Memory length outside [1, MAX_MEMORY_LEN].
    #[error("memory length {memory_len} out of range")]
    InvalidMemoryLength { memory_len: usize },

    /// A genotype gene that is not Cooperate or Defect.
    #[error("gene {index} is {action:?}, expected Cooperate or Defect")]
    InvalidGene { index: usize, action: Action },

    /// Configuration values are out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A tournament needs at least three players.
    #[error("tournament needs at least 3 players, got {count}")]
    NotEnoughPlayers { count: usize },

    /// A pairing referenced a player that does not exist.
    #[error("pairing references player {index} but only {players} are registered")]
    MissingSeat { index: usize, players: usize },

    /// A strategy failed while choosing an action.
    #[error("strategy {name} failed: {message}")]
    Strategy { name: String, message: String },

    /// The external reasoning service failed to answer.
    #[error("reasoning service failed: {message}")]
    Collaborator { message: String },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ArenaError>;
