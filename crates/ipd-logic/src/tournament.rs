//! Tournament runner
//!
//! Every player takes the focal seat in turn. For each trial the scheduler
//! draws fresh opponent pairs, and the focal player meets each pair for one
//! episode. A player's score is its mean focal-seat episode total.

use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::error::{ArenaError, Result};
use crate::game::run_episode;
use crate::pairing::schedule_pairs;
use crate::random::SeededRng;
use crate::strategy::Strategy;
use crate::N_PLAYERS;

/// Average payoff of one player
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub name: String,
    pub average_payoff: f64,
    pub episodes: u64,
}

/// Final standings, ascending by average payoff
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TournamentResult {
    pub standings: Vec<Standing>,
}

impl TournamentResult {
    /// Average payoff of the player with this display name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.standings
            .iter()
            .find(|standing| standing.name == name)
            .map(|standing| standing.average_payoff)
    }

    /// Highest average payoff
    pub fn winner(&self) -> Option<&Standing> {
        self.standings.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Standing> {
        self.standings.iter()
    }

    pub fn len(&self) -> usize {
        self.standings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.standings.is_empty()
    }
}

/// Run `trials` scheduling rounds with each player in the focal seat
///
/// `players` are prototypes: every episode seats fresh copies, so one
/// player may fill several seats of the same roster. Standings are keyed by
/// display name; give duplicates distinct names to tell them apart.
///
/// # Errors
/// - `NotEnoughPlayers` with fewer than three players
/// - `InvalidConfig` when `trials` is zero
/// - the first episode failure, unchanged
pub fn run_tournament(
    env: &mut Environment,
    players: &[Box<dyn Strategy>],
    trials: u32,
    rng: &mut SeededRng,
) -> Result<TournamentResult> {
    if players.len() < N_PLAYERS {
        return Err(ArenaError::NotEnoughPlayers {
            count: players.len(),
        });
    }
    if trials == 0 {
        return Err(ArenaError::InvalidConfig {
            reason: "tournament needs at least one trial".to_string(),
        });
    }

    log::info!(
        "tournament start: {} players, {} trials, rounds {}..={}",
        players.len(),
        trials,
        env.config().min_rounds,
        env.config().max_rounds,
    );

    let seat = |index: usize| -> Result<Box<dyn Strategy>> {
        players
            .get(index)
            .map(|player| player.clone_box())
            .ok_or(ArenaError::MissingSeat {
                index,
                players: players.len(),
            })
    };

    let mut standings = Vec::with_capacity(players.len());
    for (focal, player) in players.iter().enumerate() {
        let mut tally = 0i64;
        let mut episodes = 0u64;
        // Own stream per focal player: its schedules and episodes draw from it alone
        let mut stream = rng.fork(focal as u32);

        for _ in 0..trials {
            for (opp1, opp2) in schedule_pairs(players.len(), &mut stream) {
                let mut roster = [seat(focal)?, seat(opp1)?, seat(opp2)?];
                let result = run_episode(env, &mut roster, &mut stream)?;
                tally += result.totals[0];
                episodes += 1;
            }
        }

        let average_payoff = tally as f64 / episodes as f64;
        log::debug!(
            "{} finished {} episodes, average payoff {:.3}",
            player.name(),
            episodes,
            average_payoff
        );
        standings.push(Standing {
            name: player.name().to_string(),
            average_payoff,
            episodes,
        });
    }

    standings.sort_by(|a, b| a.average_payoff.total_cmp(&b.average_payoff));

    if let Some(best) = standings.last() {
        log::info!(
            "tournament finished: {} leads with {:.3}",
            best.name,
            best.average_payoff
        );
    }

    Ok(TournamentResult { standings })
}
