//! Agent collection and the ordered two-phase update.
//!
//! Every update runs all steering decisions against the field as it was at
//! the start of the call (phase A), and only then lets agents move and
//! deposit (phase B). No agent ever senses a deposit made in the same update.

use crate::agent::{Agent, StepOutcome};
use crate::config::{ConfigError, PopulationConfig, Species};
use crate::field::Field;
use crate::policy::Spawn;
use crate::simulation::PointerSample;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Counts from one population update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Agents whose life ran out
    pub respawns: usize,
    /// Agents reset after non-finite state
    pub resets: usize,
}

impl UpdateReport {
    fn record(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Moved => {}
            StepOutcome::Respawned => self.respawns += 1,
            StepOutcome::Reset => self.resets += 1,
        }
    }

    /// Accumulate another report
    pub fn merge(&mut self, other: UpdateReport) {
        self.respawns += other.respawns;
        self.resets += other.resets;
    }
}

/// The simulated population
pub struct Population {
    agents: Vec<Agent>,
    species: Vec<Species>,
    /// Run phase A on the rayon pool
    parallel: bool,
    rng: ChaCha8Rng,
}

impl Population {
    /// Build the population described by `config` inside a `width` x `height` field
    pub fn new(
        config: &PopulationConfig,
        width: usize,
        height: usize,
        rng: &mut ChaCha8Rng,
    ) -> Result<Self, ConfigError> {
        if config.agents == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        let weights: Vec<f32> = config.species.iter().map(|s| s.weight).collect();
        let counts = apportion(&weights, config.agents).ok_or(ConfigError::NoSpecies)?;

        let mut agents = Vec::with_capacity(config.agents);
        for (species_id, (&count, species)) in counts.iter().zip(&config.species).enumerate() {
            for _ in 0..count {
                let agent_rng = ChaCha8Rng::seed_from_u64(rng.gen());
                agents.push(Agent::spawn(species_id, species, width, height, agent_rng));
            }
        }

        log::debug!(
            "Population of {} agents across {} species: {:?}",
            agents.len(),
            config.species.len(),
            counts
        );

        Ok(Self {
            agents,
            species: config.species.clone(),
            parallel: config.parallel,
            rng: ChaCha8Rng::seed_from_u64(rng.gen()),
        })
    }

    /// Assemble a population from hand-placed agents
    pub fn from_agents(
        agents: Vec<Agent>,
        species: Vec<Species>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        if agents.is_empty() {
            return Err(ConfigError::EmptyPopulation);
        }
        if species.is_empty() {
            return Err(ConfigError::NoSpecies);
        }
        if let Some(agent) = agents.iter().find(|a| a.species >= species.len()) {
            return Err(ConfigError::InvalidSpecies {
                index: agent.species,
                reason: format!("only {} species defined", species.len()),
            });
        }
        Ok(Self {
            agents,
            species,
            parallel: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Toggle parallel steering
    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    /// One ordered sub-step: all steering, then all movement and deposits
    pub fn update(&mut self, field: &mut Field, pointer: Option<&PointerSample>) -> UpdateReport {
        self.steer_all(field, pointer);
        self.step_all(field)
    }

    /// Phase A: every agent decides against the same, unmodified field
    pub fn steer_all(&mut self, field: &Field, pointer: Option<&PointerSample>) {
        let species = &self.species;
        if self.parallel {
            self.agents.par_iter_mut().for_each(|agent| {
                agent.decide_steer(field, &species[agent.species], pointer);
            });
        } else {
            for agent in &mut self.agents {
                agent.decide_steer(field, &species[agent.species], pointer);
            }
        }
    }

    /// Phase B: move and deposit in index order (later agents win shared cells)
    pub fn step_all(&mut self, field: &mut Field) -> UpdateReport {
        let mut report = UpdateReport::default();
        for agent in &mut self.agents {
            let outcome = agent.step(field, &self.species[agent.species]);
            report.record(outcome);
        }
        report
    }

    /// Relocate `count` randomly chosen agents to `origin` with fresh headings
    pub fn burst_respawn(
        &mut self,
        count: usize,
        origin: Spawn,
        width: usize,
        height: usize,
    ) -> usize {
        let count = count.min(self.agents.len());
        let chosen = rand::seq::index::sample(&mut self.rng, self.agents.len(), count);
        for idx in chosen.iter() {
            self.agents[idx].relocate(origin, width as f32, height as f32);
        }
        log::debug!("Burst respawn relocated {} agents", count);
        count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    /// Number of agents of each species
    pub fn species_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.species.len()];
        for agent in &self.agents {
            counts[agent.species] += 1;
        }
        counts
    }
}

/// Split `total` by `weights` with the largest-remainder method.
/// Ties in the remainder go to the earlier species.
pub fn apportion(weights: &[f32], total: usize) -> Option<Vec<usize>> {
    let sum: f64 = weights.iter().map(|&w| w.max(0.0) as f64).sum();
    if weights.is_empty() || sum <= 0.0 || !sum.is_finite() {
        return None;
    }

    let quotas: Vec<f64> = weights
        .iter()
        .map(|&w| w.max(0.0) as f64 / sum * total as f64)
        .collect();
    let mut counts: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();
    let assigned: usize = counts.iter().sum();

    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = quotas[a] - quotas[a].floor();
        let rb = quotas[b] - quotas[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(&b))
    });
    for &i in order.iter().take(total.saturating_sub(assigned)) {
        counts[i] += 1;
    }
    Some(counts)
}
