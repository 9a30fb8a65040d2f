//! Randomized opponent pairing for one tournament trial
//!
//! Every player lands in at least one pair. With an odd player count the
//! leftover player is paired with someone who already has a partner.

use crate::random::SeededRng;

/// Partition `player_count` players into opponent pairs
///
/// - shuffle the indices and pair them off consecutively
/// - if one index is left over, pair it with a uniformly random other index
///
/// Fewer than two players yields no pairs. Repeated calls are independent;
/// nothing prevents the same pair from appearing in different trials.
pub fn schedule_pairs(player_count: usize, rng: &mut SeededRng) -> Vec<(usize, usize)> {
    if player_count < 2 {
        return Vec::new();
    }

    let mut players: Vec<usize> = (0..player_count).collect();
    rng.shuffle(&mut players);

    let mut schedule: Vec<(usize, usize)> = players
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect();

    if let [leftover] = players.chunks_exact(2).remainder() {
        let leftover = *leftover;
        let partner = loop {
            let candidate = rng.next_range(player_count as u32) as usize;
            if candidate != leftover {
                break candidate;
            }
        };
        schedule.push((leftover, partner));
    }

    schedule
}
