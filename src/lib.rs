//! # stigmergy
//!
//! Stigmergic multi-agent raster simulation: many simple agents sense a
//! shared toroidal color field, steer toward (or away from) what they read,
//! and deposit color where they land. Trails, branches and networks emerge
//! from the feedback loop.
//!
//! ## Features
//!
//! - **Ordered**: every agent steers against the same field state before any agent deposits
//! - **Parallel**: optional Rayon steering phase, bit-identical to sequential
//! - **Configurable**: YAML configuration files and named presets
//! - **Reproducible**: one injected seed drives every random stream
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stigmergy::{Config, PointerSample, SimulationState};
//!
//! let config = Config::preset("classic").unwrap();
//! let mut sim = SimulationState::new_with_seed(config, 42).unwrap();
//!
//! // Drive frames from your own loop
//! for _ in 0..100 {
//!     let field = sim.frame(&PointerSample::default());
//!     let _pixels = field.to_rgba8();
//! }
//! println!("{}", sim.stats.summary());
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use stigmergy::Config;
//!
//! let mut config = Config::default();
//! config.population.agents = 500;
//! config.simulation.substeps = 4;
//! assert!(config.validate().is_ok());
//! ```

pub mod agent;
pub mod config;
pub mod field;
pub mod policy;
pub mod population;
pub mod simulation;
pub mod stats;

// Re-export main types
pub use agent::Agent;
pub use config::{Config, ConfigError, Species};
pub use field::{Field, Rgba};
pub use population::Population;
pub use simulation::{PointerSample, SimulationState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark on the default configuration
pub fn benchmark(frames: u64, agents: usize) -> Result<BenchmarkResult, ConfigError> {
    use std::time::Instant;

    let mut config = Config::default();
    config.population.agents = agents;
    config.population.parallel = true;

    let mut sim = SimulationState::new_with_seed(config, 0)?;

    let start = Instant::now();
    sim.run(frames);
    let elapsed = start.elapsed();

    Ok(BenchmarkResult {
        frames,
        agents: sim.population().len(),
        field: (sim.field().width(), sim.field().height()),
        elapsed_secs: elapsed.as_secs_f64(),
        frames_per_second: frames as f64 / elapsed.as_secs_f64(),
        agent_steps_per_second: (frames * agents as u64) as f64 / elapsed.as_secs_f64(),
    })
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub frames: u64,
    pub agents: usize,
    pub field: (usize, usize),
    pub elapsed_secs: f64,
    pub frames_per_second: f64,
    pub agent_steps_per_second: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Frames: {}", self.frames)?;
        writeln!(f, "Agents: {}", self.agents)?;
        writeln!(f, "Field: {}x{}", self.field.0, self.field.1)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} frames/s", self.frames_per_second)?;
        writeln!(f, "Throughput: {:.0} agent steps/s", self.agent_steps_per_second)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_quick_simulation() {
        let mut sim = SimulationState::new_with_seed(Config::default(), 1).unwrap();
        sim.run(10);
        assert_eq!(sim.frame_count(), 10);
    }

    #[test]
    fn test_benchmark() {
        let result = benchmark(10, 100).unwrap();
        assert_eq!(result.frames, 10);
        assert_eq!(result.agents, 100);
        assert!(result.frames_per_second > 0.0);
    }

    #[test]
    fn test_benchmark_rejects_empty_population() {
        assert!(benchmark(1, 0).is_err());
    }
}
