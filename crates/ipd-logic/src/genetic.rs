//! Genetically encoded strategies
//!
//! A genotype is a flat table of actions. The table is split into one
//! region per number of known rounds `k` (0..=M), region `k` holding 8^k
//! genes, one for every sequence of `k` joint outcomes. `gene_index` maps
//! the newest M columns of an observation to a position in that table, so
//! a single table covers the start of an episode as well as its middle.

use serde::Serialize;

use crate::environment::Observation;
use crate::error::{ArenaError, Result};
use crate::random::SeededRng;
use crate::strategy::Strategy;
use crate::{Action, N_OUTCOMES, N_PLAYERS};

/// Largest supported memory length (8^8 genes in the last region).
pub const MAX_MEMORY_LEN: usize = 8;

/// Number of genes for memory length `memory_len`: sum of 8^k for k in 0..=M
pub fn genotype_len(memory_len: usize) -> usize {
    (0..=memory_len as u32)
        .map(|k| N_OUTCOMES.saturating_pow(k))
        .fold(0usize, |total, region| total.saturating_add(region))
}

/// Outcome code of one column in [0, 8), or `None` if any seat is unplayed.
///
/// Row `rank` of the observation contributes `bit * 2^rank`, so the
/// observer is the lowest bit.
fn outcome_code(column: [Action; N_PLAYERS]) -> Option<usize> {
    column
        .iter()
        .enumerate()
        .try_fold(0usize, |code, (rank, action)| action.bit().map(|bit| code | (bit << rank)))
}

/// Gene index for the newest `memory_len` columns of `observation`.
///
/// Known columns are accumulated as a base-8 number (newest column least
/// significant) plus one offset per known column; unknown columns add
/// nothing. With no known column the index is 0. The result is always
/// below `genotype_len(memory_len)`. At most `MAX_MEMORY_LEN` columns are
/// read.
pub fn gene_index(observation: &Observation, memory_len: usize) -> usize {
    let width = observation.width();
    let window = memory_len.min(MAX_MEMORY_LEN).min(width);

    let mut index = 0usize;
    let mut weight = 1usize;
    for age in 0..window {
        let known = outcome_code(observation.column(width - 1 - age));
        if let Some(code) = known {
            index += code * weight + weight;
        }
        weight *= N_OUTCOMES;
    }
    index
}

/// Human-readable history for every gene position, e.g. `"CCD DCC"`.
///
/// Each outcome is written as the observer, opponent 1 and opponent 2
/// letters, oldest round first; position 0 is `"Start"`.
pub fn gene_labels(memory_len: usize) -> Vec<String> {
    let mut labels = Vec::with_capacity(genotype_len(memory_len));
    labels.push("Start".to_string());
    for known in 1..=memory_len as u32 {
        for sequence in 0..N_OUTCOMES.pow(known) {
            let rounds: Vec<String> = (0..known)
                .rev()
                .map(|age| {
                    let code = sequence / N_OUTCOMES.pow(age) % N_OUTCOMES;
                    (0..N_PLAYERS)
                        .map(|rank| if code >> rank & 1 == 1 { 'D' } else { 'C' })
                        .collect()
                })
                .collect();
            labels.push(rounds.join(" "));
        }
    }
    labels
}

/// Validated action table for a given memory length
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Genotype {
    memory_len: usize,
    genes: Vec<Action>,
}

impl Genotype {
    pub fn new(memory_len: usize, genes: Vec<Action>) -> Result<Self> {
        check_memory_len(memory_len)?;

        let expected = genotype_len(memory_len);
        if genes.len() != expected {
            return Err(ArenaError::MalformedGenotype {
                memory_len,
                expected,
                actual: genes.len(),
            });
        }
        if let Some((index, action)) = genes.iter().enumerate().find(|(_, a)| !a.is_played()) {
            return Err(ArenaError::InvalidGene { index, action: *action });
        }

        Ok(Self { memory_len, genes })
    }

    /// Uniformly random genotype
    pub fn random(memory_len: usize, rng: &mut SeededRng) -> Result<Self> {
        check_memory_len(memory_len)?;
        let genes = (0..genotype_len(memory_len)).map(|_| Action::random(rng)).collect();
        Ok(Self { memory_len, genes })
    }

    pub fn memory_len(&self) -> usize {
        self.memory_len
    }

    pub fn genes(&self) -> &[Action] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Action the genotype prescribes for `observation`
    pub fn lookup(&self, observation: &Observation) -> Action {
        self.genes[gene_index(observation, self.memory_len)]
    }
}

fn check_memory_len(memory_len: usize) -> Result<()> {
    if memory_len == 0 || memory_len > MAX_MEMORY_LEN {
        return Err(ArenaError::InvalidMemoryLength { memory_len });
    }
    Ok(())
}

/// Strategy that looks its move up in a genotype
#[derive(Clone, Debug, PartialEq)]
pub struct GeneticStrategy {
    name: String,
    genotype: Genotype,
}

impl GeneticStrategy {
    pub fn new(genotype: Genotype) -> Self {
        Self {
            name: "Genetic".to_string(),
            genotype,
        }
    }

    /// Strategy with a random genotype
    pub fn random(memory_len: usize, rng: &mut SeededRng) -> Result<Self> {
        Ok(Self::new(Genotype::random(memory_len, rng)?))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn genotype(&self) -> &Genotype {
        &self.genotype
    }

    pub fn memory_len(&self) -> usize {
        self.genotype.memory_len()
    }

    /// One line per gene: history label and prescribed action
    pub fn describe(&self) -> String {
        gene_labels(self.memory_len())
            .iter()
            .zip(self.genotype.genes())
            .map(|(label, gene)| format!("{}: {}", label, gene.letter()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Strategy for GeneticStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn play(
        &mut self,
        observation: &Observation,
        _reward: Option<i32>,
        _rng: &mut SeededRng,
    ) -> Result<Action> {
        Ok(self.genotype.lookup(observation))
    }

    fn clone_box(&self) -> Box<dyn Strategy> {
        Box::new(self.clone())
    }
}
