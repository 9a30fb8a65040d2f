//! Strategy definitions and execution

use serde::{Deserialize, Serialize};

use crate::environment::Observation;
use crate::error::Result;
use crate::genetic::{GeneticStrategy, Genotype};
use crate::random::SeededRng;
use crate::{Action, PayoffMatrix};

/// A player in the arena.
///
/// `play` sees the seat's rotated observation and the reward of the
/// previous round (`None` on the first round of an episode). `reset` is
/// called before every episode and must restore the initial private state.
pub trait Strategy: Send {
    /// Display name, used as the key of tournament results.
    fn name(&self) -> &str;

    /// Choose Cooperate or Defect.
    fn play(
        &mut self,
        observation: &Observation,
        reward: Option<i32>,
        rng: &mut SeededRng,
    ) -> Result<Action>;

    /// Restore the initial per-episode state.
    fn reset(&mut self) {}

    /// Fresh boxed copy, used to seat one player several times.
    fn clone_box(&self) -> Box<dyn Strategy>;
}

impl Clone for Box<dyn Strategy> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Rule-based strategy catalogue.
///
/// "Soft" variants react when both opponents defect, "tough" variants
/// when either does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    /// Always cooperate.
    Naive,
    /// Always defect.
    Defector,
    /// Uniform random choice each round.
    Random,
    /// Defect only if both opponents defected last round.
    SoftT4T,
    /// Defect if either opponent defected last round.
    ToughT4T,
    /// Keep punishing whoever defected until they cooperate again.
    FairT4T,
    /// FairT4T whose cooperation decays into random defection.
    DecayingT4T,
    /// Punish with growing streaks, then calm down with one cooperation.
    GradualT4T,
    /// Defect if both opponents defected in each of the last two rounds.
    SoftT42T,
    /// Defect if either opponent defected in each of the last two rounds.
    ToughT42T,
    /// Defect once both opponents have accumulated two defections.
    AnotherT42T,
    /// Defect forever once both opponents defect together.
    SoftGrudger,
    /// Defect forever once either opponent defects.
    ToughGrudger,
    /// Cooperate when everyone agreed last round, otherwise mostly defect.
    Grofman,
    /// Tough tit-for-tat that sneaks in a defection 10% of the time.
    Joss,
    /// Cooperate for ten rounds, then grudge on any defection.
    Davis,
    /// Cooperate as often as the opponents do on average.
    AverageCopier,
    /// Cooperate on power-of-two rounds, otherwise tough tit-for-tat.
    Proposer,
    /// React to its own average score.
    Stalker,
    /// Defect with a probability growing every round.
    BetterAndBetter,
    /// Retaliate with ever longer streaks after being exploited.
    Shubik,
    /// Mirror the opponents' recent average cooperation, minus 10%.
    SoftTullock,
    /// Mirror the least cooperative opponent's recent rate, minus 10%.
    ToughTullock,
}

impl RuleKind {
    pub const ALL: [RuleKind; 23] = [
        RuleKind::Naive,
        RuleKind::Defector,
        RuleKind::Random,
        RuleKind::SoftT4T,
        RuleKind::ToughT4T,
        RuleKind::FairT4T,
        RuleKind::DecayingT4T,
        RuleKind::GradualT4T,
        RuleKind::SoftT42T,
        RuleKind::ToughT42T,
        RuleKind::AnotherT42T,
        RuleKind::SoftGrudger,
        RuleKind::ToughGrudger,
        RuleKind::Grofman,
        RuleKind::Joss,
        RuleKind::Davis,
        RuleKind::AverageCopier,
        RuleKind::Proposer,
        RuleKind::Stalker,
        RuleKind::BetterAndBetter,
        RuleKind::Shubik,
        RuleKind::SoftTullock,
        RuleKind::ToughTullock,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::Naive => "Naive",
            RuleKind::Defector => "Defector",
            RuleKind::Random => "Random",
            RuleKind::SoftT4T => "SoftT4T",
            RuleKind::ToughT4T => "ToughT4T",
            RuleKind::FairT4T => "FairT4T",
            RuleKind::DecayingT4T => "DecayingT4T",
            RuleKind::GradualT4T => "GradualT4T",
            RuleKind::SoftT42T => "SoftT42T",
            RuleKind::ToughT42T => "ToughT42T",
            RuleKind::AnotherT42T => "AnotherT42T",
            RuleKind::SoftGrudger => "SoftGrudger",
            RuleKind::ToughGrudger => "ToughGrudger",
            RuleKind::Grofman => "Grofman",
            RuleKind::Joss => "Joss",
            RuleKind::Davis => "Davis",
            RuleKind::AverageCopier => "AverageCopier",
            RuleKind::Proposer => "Proposer",
            RuleKind::Stalker => "Stalker",
            RuleKind::BetterAndBetter => "BetterAndBetter",
            RuleKind::Shubik => "Shubik",
            RuleKind::SoftTullock => "SoftTullock",
            RuleKind::ToughTullock => "ToughTullock",
        }
    }

    /// Get a human-readable description (used by the WASM module)
    pub fn describe(&self) -> &'static str {
        match self {
            RuleKind::Naive => "Always cooperates.",
            RuleKind::Defector => "Always defects.",
            RuleKind::Random => "Cooperates or defects at random.",
            RuleKind::SoftT4T => "Defects only if both opponents defected in the last round.",
            RuleKind::ToughT4T => "Defects if either opponent defected in the last round.",
            RuleKind::FairT4T => "Punishes exactly the opponents who defected, until they cooperate.",
            RuleKind::DecayingT4T => "Fair tit-for-tat whose cooperation fades towards a coin flip.",
            RuleKind::GradualT4T => "Retaliates with longer streaks each time, then forgives.",
            RuleKind::SoftT42T => "Defects if both opponents defected twice in a row.",
            RuleKind::ToughT42T => "Defects if either opponent defected twice in a row.",
            RuleKind::AnotherT42T => "Defects once both opponents have defected twice.",
            RuleKind::SoftGrudger => "Cooperates until both opponents defect together, then always defects.",
            RuleKind::ToughGrudger => "Cooperates until anyone defects, then always defects.",
            RuleKind::Grofman => "Cooperates if everyone agreed last round, else cooperates 2/7 of the time.",
            RuleKind::Joss => "Tough tit-for-tat that defects 10% of the time anyway.",
            RuleKind::Davis => "Cooperates for ten rounds, then defects forever after any defection.",
            RuleKind::AverageCopier => "Cooperates with the opponents' average cooperation rate.",
            RuleKind::Proposer => "Cooperates on power-of-two rounds, otherwise tough tit-for-tat.",
            RuleKind::Stalker => "Adjusts to its own average score.",
            RuleKind::BetterAndBetter => "Defects more and more often as the episode goes on.",
            RuleKind::Shubik => "Retaliates after being exploited, each streak longer than the last.",
            RuleKind::SoftTullock => "Copies the opponents' recent average cooperation, minus 10%.",
            RuleKind::ToughTullock => "Copies the least cooperative opponent's recent rate, minus 10%.",
        }
    }
}

/// Which opponent(s) FairT4T is currently punishing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Defector {
    Both,
    Opp1,
    Opp2,
}

/// Per-episode state of a rule strategy. `reset` restores `Default`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleState {
    pub rounds_played: u32,
    pub triggered: bool,
    pub defector: Option<Defector>,
    pub calming: bool,
    pub punishing: bool,
    pub punishment_count: u32,
    pub punishment_limit: u32,
    pub opp_defections: [u32; 2],
    pub retaliating: bool,
    pub retaliation_length: u32,
    pub retaliation_remaining: u32,
    pub score: i32,
}

impl RuleState {
    /// Count this round; true if it is the first of the episode.
    fn start(&mut self) -> bool {
        let start = self.rounds_played == 0;
        self.rounds_played += 1;
        start
    }
}

/// A rule-based strategy with its episode state
#[derive(Clone, Debug, PartialEq)]
pub struct RuleStrategy {
    kind: RuleKind,
    name: String,
    state: RuleState,
}

impl RuleStrategy {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            name: kind.name().to_string(),
            state: RuleState::default(),
        }
    }

    /// Override the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn state(&self) -> &RuleState {
        &self.state
    }
}

impl Strategy for RuleStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn play(
        &mut self,
        observation: &Observation,
        reward: Option<i32>,
        rng: &mut SeededRng,
    ) -> Result<Action> {
        execute_rule(self.kind, &mut self.state, observation, reward, rng)
    }

    fn reset(&mut self) {
        self.state = RuleState::default();
    }

    fn clone_box(&self) -> Box<dyn Strategy> {
        Box::new(self.clone())
    }
}

/// Serializable description of a player, used to build rosters from JSON
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StrategySpec {
    Rule(RuleKind),
    Genetic {
        memory_len: usize,
        genes: Vec<Action>,
        #[serde(default)]
        name: Option<String>,
    },
}

impl StrategySpec {
    pub fn build(&self) -> Result<Box<dyn Strategy>> {
        let strategy: Box<dyn Strategy> = match self {
            StrategySpec::Rule(kind) => Box::new(RuleStrategy::new(*kind)),
            StrategySpec::Genetic { memory_len, genes, name } => {
                let genotype = Genotype::new(*memory_len, genes.clone())?;
                let strategy = GeneticStrategy::new(genotype);
                Box::new(match name {
                    Some(name) => strategy.with_name(name.clone()),
                    None => strategy,
                })
            }
        };
        Ok(strategy)
    }
}

// ── Rule execution ──────────────────────────────────────────────────

const DECAY_ROUNDS: f64 = 200.0;
const DECAY_END_COOPERATION: f64 = 0.5;
const GROFMAN_COOPERATION: f64 = 2.0 / 7.0;
const JOSS_SNEAK_PERCENT: u8 = 10;
const DAVIS_GRACE_ROUNDS: u32 = 10;
const BETTER_AND_BETTER_ROUNDS: f64 = 1000.0;
const TULLOCK_GRACE_ROUNDS: u32 = 11;
const TULLOCK_WINDOW: usize = 10;
const TULLOCK_DISCOUNT: f64 = 0.1;

fn defected(observation: &Observation, opponent: usize) -> bool {
    observation.last(opponent) == Action::Defect
}

fn defected_twice(observation: &Observation, opponent: usize) -> bool {
    observation.ago(opponent, 0) == Action::Defect && observation.ago(opponent, 1) == Action::Defect
}

fn defect_if(condition: bool) -> Action {
    if condition {
        Action::Defect
    } else {
        Action::Cooperate
    }
}

/// Execute a rule strategy for one round
fn execute_rule(
    kind: RuleKind,
    state: &mut RuleState,
    observation: &Observation,
    reward: Option<i32>,
    rng: &mut SeededRng,
) -> Result<Action> {
    let action = match kind {
        RuleKind::Naive => Action::Cooperate,
        RuleKind::Defector => Action::Defect,
        RuleKind::Random => Action::random(rng),
        RuleKind::SoftT4T => {
            if state.start() {
                return Ok(Action::Cooperate);
            }
            defect_if(defected(observation, 1) && defected(observation, 2))
        }
        RuleKind::ToughT4T => {
            if state.start() {
                return Ok(Action::Cooperate);
            }
            defect_if(defected(observation, 1) || defected(observation, 2))
        }
        RuleKind::FairT4T => execute_fair_t4t(state, observation),
        RuleKind::DecayingT4T => execute_decaying_t4t(state, observation, rng),
        RuleKind::GradualT4T => execute_gradual_t4t(state, observation),
        RuleKind::SoftT42T => {
            let action = if state.rounds_played < 2 {
                Action::Cooperate
            } else {
                defect_if(defected_twice(observation, 1) && defected_twice(observation, 2))
            };
            state.rounds_played += 1;
            action
        }
        RuleKind::ToughT42T => {
            let action = if state.rounds_played < 2 {
                Action::Cooperate
            } else {
                defect_if(defected_twice(observation, 1) || defected_twice(observation, 2))
            };
            state.rounds_played += 1;
            action
        }
        RuleKind::AnotherT42T => execute_another_t42t(state, observation),
        RuleKind::SoftGrudger => {
            if state.start() {
                return Ok(Action::Cooperate);
            }
            if defected(observation, 1) && defected(observation, 2) {
                state.triggered = true;
            }
            defect_if(state.triggered)
        }
        RuleKind::ToughGrudger => {
            if state.start() {
                return Ok(Action::Cooperate);
            }
            if defected(observation, 1) || defected(observation, 2) {
                state.triggered = true;
            }
            defect_if(state.triggered)
        }
        RuleKind::Grofman => {
            let agreed = observation.last(0) == observation.last(1)
                && observation.last(1) == observation.last(2);
            let action = if state.rounds_played == 0 || agreed {
                Action::Cooperate
            } else {
                defect_if(rng.next_f64() > GROFMAN_COOPERATION)
            };
            state.rounds_played += 1;
            action
        }
        RuleKind::Joss => {
            if state.start() {
                Action::Cooperate
            } else if defected(observation, 1) || defected(observation, 2) {
                Action::Defect
            } else {
                defect_if(rng.next_percent() < JOSS_SNEAK_PERCENT)
            }
        }
        RuleKind::Davis => {
            if state.rounds_played > DAVIS_GRACE_ROUNDS
                && (defected(observation, 1) || defected(observation, 2))
            {
                state.triggered = true;
            }
            state.rounds_played += 1;
            defect_if(state.triggered)
        }
        RuleKind::AverageCopier => {
            let action = if state.rounds_played == 0 {
                Action::Cooperate
            } else {
                let rate = (cooperation_rate(observation.row(1)) + cooperation_rate(observation.row(2))) / 2.0;
                defect_if(rng.next_f64() >= rate)
            };
            state.rounds_played += 1;
            action
        }
        RuleKind::Proposer => {
            let r = state.rounds_played;
            let action = if r == 0 || r.is_power_of_two() {
                Action::Cooperate
            } else {
                defect_if(defected(observation, 1) || defected(observation, 2))
            };
            state.rounds_played += 1;
            action
        }
        RuleKind::Stalker => execute_stalker(state, reward, rng),
        RuleKind::BetterAndBetter => {
            let p = state.rounds_played as f64 / BETTER_AND_BETTER_ROUNDS;
            state.rounds_played += 1;
            defect_if(rng.next_f64() < p)
        }
        RuleKind::Shubik => execute_shubik(state, observation),
        RuleKind::SoftTullock => execute_tullock(state, observation, rng, |a, b| (a + b) / 2.0),
        RuleKind::ToughTullock => execute_tullock(state, observation, rng, f64::min),
    };
    Ok(action)
}

/// Share of played cells that are Cooperate; 1.0 when nothing was played
fn cooperation_rate(row: &[Action]) -> f64 {
    let played = row.iter().filter(|a| a.is_played()).count();
    if played == 0 {
        return 1.0;
    }
    let cooperated = row.iter().filter(|a| **a == Action::Cooperate).count();
    cooperated as f64 / played as f64
}

/// FairT4T: track who defected and punish them until they cooperate
fn execute_fair_t4t(state: &mut RuleState, observation: &Observation) -> Action {
    if state.start() {
        return Action::Cooperate;
    }

    let d1 = defected(observation, 1);
    let d2 = defected(observation, 2);

    if state.defector.is_none() {
        state.defector = match (d1, d2) {
            (true, true) => Some(Defector::Both),
            (true, false) => Some(Defector::Opp1),
            (false, true) => Some(Defector::Opp2),
            (false, false) => None,
        };
    }

    let still_defecting = match state.defector {
        None => return Action::Cooperate,
        Some(Defector::Both) => d1 || d2,
        Some(Defector::Opp1) => d1,
        Some(Defector::Opp2) => d2,
    };

    if still_defecting {
        Action::Defect
    } else {
        state.defector = None;
        Action::Cooperate
    }
}

/// DecayingT4T: FairT4T whose cooperation probability decays linearly
fn execute_decaying_t4t(
    state: &mut RuleState,
    observation: &Observation,
    rng: &mut SeededRng,
) -> Action {
    let action = execute_fair_t4t(state, observation);
    if action == Action::Cooperate {
        let keep = (1.0 - DECAY_END_COOPERATION / DECAY_ROUNDS * state.rounds_played as f64)
            .max(DECAY_END_COOPERATION);
        if rng.next_f64() > keep {
            return Action::Defect;
        }
    }
    action
}

/// GradualT4T: punishment streaks that grow by one per provocation
fn execute_gradual_t4t(state: &mut RuleState, observation: &Observation) -> Action {
    if state.start() {
        return Action::Cooperate;
    }

    if state.calming {
        state.calming = false;
        return Action::Cooperate;
    }

    if state.punishing {
        if state.punishment_count < state.punishment_limit {
            state.punishment_count += 1;
            return Action::Defect;
        }
        state.calming = true;
        state.punishing = false;
        state.punishment_count = 0;
        return Action::Cooperate;
    }

    if defected(observation, 1) || defected(observation, 2) {
        state.punishing = true;
        state.punishment_count += 1;
        state.punishment_limit += 1;
        return Action::Defect;
    }

    Action::Cooperate
}

/// AnotherT42T: defect once both opponents defected twice, then recount
fn execute_another_t42t(state: &mut RuleState, observation: &Observation) -> Action {
    if state.start() {
        return Action::Cooperate;
    }

    for (count, opponent) in state.opp_defections.iter_mut().zip([1, 2]) {
        if defected(observation, opponent) {
            *count += 1;
        }
    }

    if state.opp_defections.iter().all(|c| *c >= 2) {
        state.opp_defections = [0, 0];
        return Action::Defect;
    }

    Action::Cooperate
}

/// Stalker: react to the running average of the rewards it was paid
///
/// The thresholds are the standard mutual cooperation and mutual defection
/// payoffs; the score is whatever the environment actually paid.
fn execute_stalker(state: &mut RuleState, reward: Option<i32>, rng: &mut SeededRng) -> Action {
    let action = if state.rounds_played == 0 {
        Action::Cooperate
    } else {
        let payoffs = PayoffMatrix::STANDARD;
        state.score += reward.unwrap_or_default();
        let average = state.score as f64 / state.rounds_played as f64;
        let good = payoffs.mutual_cooperation() as f64;
        let bad = payoffs.mutual_defection() as f64;

        if average > good {
            Action::Defect
        } else if average > (good + bad) / 2.0 {
            Action::Cooperate
        } else if average > bad {
            Action::Defect
        } else {
            Action::random(rng)
        }
    };
    state.rounds_played += 1;
    action
}

/// Shubik: each exploitation starts a retaliation one round longer
fn execute_shubik(state: &mut RuleState, observation: &Observation) -> Action {
    if state.start() {
        return Action::Cooperate;
    }

    if !state.retaliating
        && observation.last(0) == Action::Cooperate
        && (defected(observation, 1) || defected(observation, 2))
    {
        state.retaliating = true;
        state.retaliation_length += 1;
        state.retaliation_remaining = state.retaliation_length;
    }

    if state.retaliating {
        state.retaliation_remaining -= 1;
        if state.retaliation_remaining == 0 {
            state.retaliating = false;
        }
        return Action::Defect;
    }

    Action::Cooperate
}

/// Tullock: cooperate at the opponents' recent rate, combined by `combine`
fn execute_tullock(
    state: &mut RuleState,
    observation: &Observation,
    rng: &mut SeededRng,
    combine: fn(f64, f64) -> f64,
) -> Action {
    let action = if state.rounds_played < TULLOCK_GRACE_ROUNDS {
        Action::Cooperate
    } else {
        let rate = |opponent: usize| {
            let defections = observation
                .recent(opponent, TULLOCK_WINDOW)
                .iter()
                .filter(|a| **a == Action::Defect)
                .count();
            (TULLOCK_WINDOW - defections) as f64 / TULLOCK_WINDOW as f64
        };
        let p = (combine(rate(1), rate(2)) - TULLOCK_DISCOUNT).max(0.0);
        defect_if(rng.next_f64() > p)
    };
    state.rounds_played += 1;
    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use Action::{Cooperate as C, Defect as D};

    fn make_rng() -> SeededRng {
        SeededRng::from_seed(42)
    }

    /// Observation from letter rows, e.g. `["-CD", "-DD", "-CC"]`
    fn obs(rows: [&str; 3]) -> Observation {
        Observation::from_rows(rows.map(|row| {
            row.chars()
                .map(|c| match c {
                    'C' => C,
                    'D' => D,
                    _ => Action::NoAction,
                })
                .collect()
        }))
        .unwrap()
    }

    /// Play `kind` through successive prefixes of the given opponent rows,
    /// feeding its own moves back into row 0.
    fn play_through(kind: RuleKind, opp1: &str, opp2: &str) -> Vec<Action> {
        let mut strategy = RuleStrategy::new(kind);
        let mut rng = make_rng();
        let width = opp1.len() + 1;
        let mut own = String::new();
        let mut moves = Vec::new();
        let mut reward = None;
        for r in 0..=opp1.len() {
            let pad = "-".repeat(width - r);
            let o = obs([
                &format!("{}{}", pad, own),
                &format!("{}{}", pad, &opp1[..r]),
                &format!("{}{}", pad, &opp2[..r]),
            ]);
            if r > 0 {
                reward = Some(crate::payoff(o.last(0), o.last(1), o.last(2)).unwrap());
            }
            let m = strategy.play(&o, reward, &mut rng).unwrap();
            own.push(m.letter());
            moves.push(m);
        }
        moves
    }

    #[test]
    fn test_naive_and_defector() {
        let mut rng = make_rng();
        let o = obs(["DD", "DD", "DD"]);
        assert_eq!(RuleStrategy::new(RuleKind::Naive).play(&o, None, &mut rng), Ok(C));
        assert_eq!(RuleStrategy::new(RuleKind::Defector).play(&o, Some(0), &mut rng), Ok(D));
    }

    #[test]
    fn test_random_plays_both() {
        let mut strategy = RuleStrategy::new(RuleKind::Random);
        let mut rng = make_rng();
        let o = obs(["--", "--", "--"]);
        let defects = (0..200)
            .filter(|_| strategy.play(&o, None, &mut rng).unwrap() == D)
            .count();
        assert!(defects > 60 && defects < 140, "defects = {}", defects);
    }

    #[test]
    fn test_soft_t4t() {
        assert_eq!(play_through(RuleKind::SoftT4T, "DDC", "CDD"), vec![C, C, D, C]);
    }

    #[test]
    fn test_tough_t4t() {
        assert_eq!(play_through(RuleKind::ToughT4T, "DCC", "CCD"), vec![C, D, C, D]);
    }

    #[test]
    fn test_fair_t4t_punishes_only_defector() {
        // Opp1 defects twice; opp2 defecting later is ignored while opp1 is tracked
        assert_eq!(
            play_through(RuleKind::FairT4T, "DDCC", "CCDC"),
            vec![C, D, D, C, C]
        );
    }

    #[test]
    fn test_fair_t4t_both() {
        // Tracking both: keeps defecting while either continues
        assert_eq!(
            play_through(RuleKind::FairT4T, "DCC", "DDC"),
            vec![C, D, D, C]
        );
    }

    #[test]
    fn test_gradual_t4t_streaks() {
        // First provocation: 1 defection then calm; second: 2 defections
        let moves = play_through(RuleKind::GradualT4T, "DCCCDCCCC", "CCCCCCCCC");
        assert_eq!(moves, vec![C, D, C, C, C, D, D, C, C, C]);
    }

    #[test]
    fn test_t42t_variants() {
        assert_eq!(play_through(RuleKind::SoftT42T, "DDD", "CDD"), vec![C, C, C, D]);
        assert_eq!(play_through(RuleKind::ToughT42T, "DDC", "CCC"), vec![C, C, D, C]);
    }

    #[test]
    fn test_another_t42t_counts() {
        assert_eq!(
            play_through(RuleKind::AnotherT42T, "DCDC", "CDDC"),
            vec![C, C, C, D, C]
        );
    }

    #[test]
    fn test_grudgers() {
        assert_eq!(play_through(RuleKind::SoftGrudger, "DDCC", "CDCC"), vec![C, C, D, D, D]);
        assert_eq!(play_through(RuleKind::ToughGrudger, "DCC", "CCC"), vec![C, D, D, D]);
    }

    #[test]
    fn test_davis_grace_period() {
        let opp = "DDDDDDDDDDDDD";
        let moves = play_through(RuleKind::Davis, opp, opp);
        assert!(moves[..=DAVIS_GRACE_ROUNDS as usize].iter().all(|m| *m == C));
        assert!(moves[DAVIS_GRACE_ROUNDS as usize + 1..].iter().all(|m| *m == D));
    }

    #[test]
    fn test_proposer_power_of_two_rounds() {
        let moves = play_through(RuleKind::Proposer, "DDDDDDDDD", "CCCCCCCCC");
        // rounds 0, 1, 2, 4, 8 cooperate
        assert_eq!(moves, vec![C, C, C, D, C, D, D, D, C, D]);
    }

    #[test]
    fn test_shubik_growing_retaliation() {
        let moves = play_through(RuleKind::Shubik, "DCCCDCCCC", "CCCCCCCCC");
        assert_eq!(moves, vec![C, D, C, C, C, D, D, C, C, C]);
    }

    #[test]
    fn test_stalker_tracks_score() {
        // Everyone cooperates: average 6 is not above good, above midpoint
        let moves = play_through(RuleKind::Stalker, "CCCC", "CCCC");
        assert_eq!(moves, vec![C; 5]);
    }

    #[test]
    fn test_stalker_scores_paid_rewards() {
        // Cooperation that only ever pays 1 averages at mutual defection level
        let mut strategy = RuleStrategy::new(RuleKind::Stalker);
        let mut rng = make_rng();
        strategy.play(&obs(["--", "--", "--"]), None, &mut rng).unwrap();
        for _ in 0..5 {
            strategy.play(&obs(["-C", "-C", "-C"]), Some(1), &mut rng).unwrap();
        }
        assert_eq!(strategy.state().score, 5);
    }

    #[test]
    fn test_stalker_exploiting_defects() {
        let mut strategy = RuleStrategy::new(RuleKind::Stalker);
        let mut rng = make_rng();
        strategy.play(&obs(["--", "--", "--"]), None, &mut rng).unwrap();
        // Own D against two C: 8 points on average, above 6
        let m = strategy.play(&obs(["-D", "-C", "-C"]), Some(8), &mut rng).unwrap();
        assert_eq!(m, D);
        assert_eq!(strategy.state().score, 8);
    }

    #[test]
    fn test_joss_mostly_cooperates_with_cooperators() {
        let mut strategy = RuleStrategy::new(RuleKind::Joss);
        let mut rng = make_rng();
        strategy.play(&obs(["-", "-", "-"]), None, &mut rng).unwrap();
        let defects = (0..1000)
            .filter(|_| strategy.play(&obs(["C", "C", "C"]), None, &mut rng).unwrap() == D)
            .count();
        assert!(defects > 50 && defects < 150, "defects = {}", defects);
        assert_eq!(strategy.play(&obs(["C", "D", "C"]), None, &mut rng), Ok(D));
    }

    #[test]
    fn test_grofman_cooperates_on_agreement() {
        let mut strategy = RuleStrategy::new(RuleKind::Grofman);
        let mut rng = make_rng();
        for _ in 0..20 {
            assert_eq!(strategy.play(&obs(["D", "D", "D"]), None, &mut rng), Ok(C));
        }
    }

    #[test]
    fn test_average_copier_follows_opponents() {
        let mut strategy = RuleStrategy::new(RuleKind::AverageCopier);
        let mut rng = make_rng();
        assert_eq!(strategy.play(&obs(["--", "--", "--"]), None, &mut rng), Ok(C));
        for _ in 0..50 {
            assert_eq!(strategy.play(&obs(["CC", "CC", "CC"]), None, &mut rng), Ok(C));
            assert_eq!(strategy.play(&obs(["-C", "-D", "-D"]), None, &mut rng), Ok(D));
        }
    }

    #[test]
    fn test_better_and_better_starts_cooperative() {
        let mut strategy = RuleStrategy::new(RuleKind::BetterAndBetter);
        let mut rng = make_rng();
        assert_eq!(strategy.play(&obs(["-", "-", "-"]), None, &mut rng), Ok(C));
    }

    #[test]
    fn test_tullock_grace_then_mirrors() {
        let mut strategy = RuleStrategy::new(RuleKind::ToughTullock);
        let mut rng = make_rng();
        let all_d = obs(["DDDDDDDDDDDD", "DDDDDDDDDDDD", "DDDDDDDDDDDD"]);
        for _ in 0..TULLOCK_GRACE_ROUNDS {
            assert_eq!(strategy.play(&all_d, None, &mut rng), Ok(C));
        }
        // Opponents never cooperated: probability floors at zero
        for _ in 0..20 {
            assert_eq!(strategy.play(&all_d, None, &mut rng), Ok(D));
        }
    }

    #[test]
    fn test_decaying_t4t_starts_cooperative() {
        let mut strategy = RuleStrategy::new(RuleKind::DecayingT4T);
        let mut rng = make_rng();
        assert_eq!(strategy.play(&obs(["-", "-", "-"]), None, &mut rng), Ok(C));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut strategy = RuleStrategy::new(RuleKind::ToughGrudger);
        let mut rng = make_rng();
        strategy.play(&obs(["-", "-", "-"]), None, &mut rng).unwrap();
        assert_eq!(strategy.play(&obs(["C", "D", "C"]), Some(3), &mut rng), Ok(D));
        assert!(strategy.state().triggered);

        strategy.reset();
        assert_eq!(strategy.state(), &RuleState::default());
        assert_eq!(strategy.play(&obs(["C", "D", "C"]), None, &mut rng), Ok(C));
    }

    #[test]
    fn test_all_kinds_have_distinct_names() {
        let mut names: Vec<_> = RuleKind::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), RuleKind::ALL.len());
        assert!(RuleKind::ALL.iter().all(|k| !k.describe().is_empty()));
    }

    #[test]
    fn test_with_name_and_clone_box() {
        let strategy = RuleStrategy::new(RuleKind::Joss).with_name("joss-1");
        let boxed: Box<dyn Strategy> = Box::new(strategy);
        let copy = boxed.clone();
        assert_eq!(copy.name(), "joss-1");
    }

    #[test]
    fn test_spec_builds_strategies() {
        let spec: StrategySpec = serde_json::from_str(r#"{"Rule": "SoftGrudger"}"#).unwrap();
        assert_eq!(spec.build().unwrap().name(), "SoftGrudger");

        let spec: StrategySpec = serde_json::from_str(
            r#"{"Genetic": {"memory_len": 1, "genes": [0,1,1,1,1,1,1,1,1], "name": "g1"}}"#,
        )
        .unwrap();
        assert_eq!(spec.build().unwrap().name(), "g1");

        let bad = StrategySpec::Genetic { memory_len: 1, genes: vec![C; 3], name: None };
        assert!(bad.build().is_err());
    }
}
