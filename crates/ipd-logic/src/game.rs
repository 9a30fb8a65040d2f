//! Episode execution engine

use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::error::{ArenaError, Result};
use crate::random::SeededRng;
use crate::strategy::Strategy;
use crate::{Action, N_PLAYERS};

/// Result of a single round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub actions: [Action; N_PLAYERS],
    pub rewards: [i32; N_PLAYERS],
    pub cumulative: [i64; N_PLAYERS],
}

/// Result of a complete episode
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeResult {
    pub names: [String; N_PLAYERS],
    pub rounds: Vec<RoundRecord>,
    pub totals: [i64; N_PLAYERS],
    pub round_count: u32,
}

/// Run one episode with `seats[i]` playing seat `i`
///
/// Resets every seat and the environment, then plays until the drawn
/// horizon. All seats choose from the same pre-round observations; the
/// moves are applied together.
///
/// # Errors
/// A failing `play` surfaces as `ArenaError::Strategy` naming the seat's
/// player; an illegal move surfaces as `InvalidAction`.
pub fn run_episode(
    env: &mut Environment,
    seats: &mut [Box<dyn Strategy>; N_PLAYERS],
    rng: &mut SeededRng,
) -> Result<EpisodeResult> {
    for seat in seats.iter_mut() {
        seat.reset();
    }
    let mut observations = env.reset(rng).observations;
    let mut rewards: [Option<i32>; N_PLAYERS] = [None; N_PLAYERS];

    let mut rounds = Vec::new();
    let mut totals = [0i64; N_PLAYERS];

    loop {
        let mut actions = [Action::NoAction; N_PLAYERS];
        for (seat, strategy) in seats.iter_mut().enumerate() {
            actions[seat] = strategy
                .play(&observations[seat], rewards[seat], rng)
                .map_err(|err| match err {
                    ArenaError::Strategy { .. } => err,
                    other => ArenaError::Strategy {
                        name: strategy.name().to_string(),
                        message: other.to_string(),
                    },
                })?;
        }

        let step = env.step(actions)?;
        for (total, reward) in totals.iter_mut().zip(step.rewards) {
            *total += reward as i64;
        }
        rounds.push(RoundRecord {
            round: rounds.len() as u32,
            actions,
            rewards: step.rewards,
            cumulative: totals,
        });

        let done = step.is_done();
        rewards = step.rewards.map(Some);
        observations = step.observations;
        if done {
            break;
        }
    }

    let names = std::array::from_fn(|seat| seats[seat].name().to_string());
    log::debug!("episode {:?}: {} rounds, totals {:?}", names, rounds.len(), totals);

    Ok(EpisodeResult {
        names,
        round_count: rounds.len() as u32,
        rounds,
        totals,
    })
}
