//! WASM bindings for frontend episode replay and tournaments

use wasm_bindgen::prelude::*;

use crate::genetic::{gene_labels, GeneticStrategy, Genotype, MAX_MEMORY_LEN};
use crate::{run_episode, run_tournament, EnvConfig, Environment, RuleKind, SeededRng, Strategy, StrategySpec, N_PLAYERS};

/// Parse a JSON list of strategy specs into playable strategies.
///
/// Each entry is either `{"Rule": "SoftGrudger"}` or
/// `{"Genetic": {"memory_len": 1, "genes": [0, 1, ...], "name": "..."}}`.
fn parse_roster(json: &str) -> Result<Vec<Box<dyn Strategy>>, String> {
    let specs: Vec<StrategySpec> =
        serde_json::from_str(json).map_err(|e| format!("Invalid roster: {}", e))?;
    specs
        .iter()
        .map(|spec| spec.build().map_err(|e| e.to_string()))
        .collect()
}

/// Empty input selects the standard 20 to 50 round horizon.
fn parse_config(json: &str) -> Result<EnvConfig, String> {
    if json.trim().is_empty() {
        return Ok(EnvConfig::standard());
    }
    let config: EnvConfig =
        serde_json::from_str(json).map_err(|e| format!("Invalid config: {}", e))?;
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn parse_seed(seed: &[u8]) -> Result<SeededRng, JsError> {
    let seed_arr: [u8; 32] = seed
        .try_into()
        .map_err(|_| JsError::new("Seed must be exactly 32 bytes"))?;
    Ok(SeededRng::new(&seed_arr, 0))
}

/// Replay one episode with full round-by-round details
///
/// # Arguments
/// * `roster_json` - JSON list of exactly three strategy specs, seat order
/// * `config_json` - JSON `EnvConfig`, or empty for the standard horizon
/// * `seed` - 32-byte randomness seed
///
/// # Returns
/// JSON serialized EpisodeResult
#[wasm_bindgen]
pub fn replay_episode(roster_json: &str, config_json: &str, seed: &[u8]) -> Result<JsValue, JsError> {
    let roster = parse_roster(roster_json).map_err(|e| JsError::new(&e))?;
    let count = roster.len();
    let mut seats: [Box<dyn Strategy>; N_PLAYERS] = roster
        .try_into()
        .map_err(|_| JsError::new(&format!("Roster must have exactly 3 strategies, got {}", count)))?;
    let config = parse_config(config_json).map_err(|e| JsError::new(&e))?;
    let mut rng = parse_seed(seed)?;

    let mut env = Environment::new(config).map_err(|e| JsError::new(&e.to_string()))?;
    let result = run_episode(&mut env, &mut seats, &mut rng).map_err(|e| JsError::new(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&result)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

/// Run a full tournament over the roster
///
/// # Returns
/// JSON serialized TournamentResult, standings ascending by payoff
#[wasm_bindgen]
pub fn run_tournament_json(
    roster_json: &str,
    config_json: &str,
    trials: u32,
    seed: &[u8],
) -> Result<JsValue, JsError> {
    let players = parse_roster(roster_json).map_err(|e| JsError::new(&e))?;
    let config = parse_config(config_json).map_err(|e| JsError::new(&e))?;
    let mut rng = parse_seed(seed)?;

    let mut env = Environment::new(config).map_err(|e| JsError::new(&e.to_string()))?;
    let result = run_tournament(&mut env, &players, trials, &mut rng)
        .map_err(|e| JsError::new(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&result)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

#[derive(serde::Serialize)]
struct StrategyInfo {
    id: RuleKind,
    name: String,
    description: String,
}

/// Get all available rule strategies
#[wasm_bindgen]
pub fn get_strategy_types() -> Result<JsValue, JsError> {
    let types: Vec<StrategyInfo> = RuleKind::ALL
        .iter()
        .map(|kind| StrategyInfo {
            id: *kind,
            name: kind.name().to_string(),
            description: kind.describe().to_string(),
        })
        .collect();

    serde_wasm_bindgen::to_value(&types)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

/// History labels for every gene of a genotype with this memory length
#[wasm_bindgen]
pub fn get_gene_labels(memory_len: usize) -> Result<js_sys::Array, JsError> {
    if memory_len == 0 || memory_len > MAX_MEMORY_LEN {
        return Err(JsError::new(&format!("Memory length must be in 1..={}", MAX_MEMORY_LEN)));
    }
    Ok(gene_labels(memory_len)
        .into_iter()
        .map(|label| JsValue::from_str(&label))
        .collect())
}

/// Human-readable lookup table of a genotype
///
/// `genes_json` is a JSON array of 0 (cooperate) and 1 (defect).
#[wasm_bindgen]
pub fn describe_genotype(memory_len: usize, genes_json: &str) -> Result<String, JsError> {
    let genes = serde_json::from_str(genes_json)
        .map_err(|e| JsError::new(&format!("Invalid genes: {}", e)))?;
    let genotype = Genotype::new(memory_len, genes).map_err(|e| JsError::new(&e.to_string()))?;

    Ok(GeneticStrategy::new(genotype).describe())
}
