//! Simulation state and the per-frame driver.

use crate::config::{Config, ConfigError};
use crate::field::Field;
use crate::population::{Population, UpdateReport};
use crate::stats::{FrameStats, StatsHistory};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

/// Pointer input sampled once per frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerSample {
    pub x: f32,
    pub y: f32,
    /// Pointer is over the field
    pub active: bool,
    /// Button held; paints a stroke from the previous dragging sample
    pub dragging: bool,
}

impl PointerSample {
    /// An active, non-dragging pointer at `(x, y)`
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            active: true,
            dragging: false,
        }
    }

    /// An active, dragging pointer at `(x, y)`
    pub fn drag(x: f32, y: f32) -> Self {
        Self {
            dragging: true,
            ..Self::at(x, y)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Running,
    /// Reset requested; the next frame rebuilds field and population first
    Resetting,
}

/// One running simulation
pub struct SimulationState {
    // World
    field: Field,
    population: Population,

    // State
    frame: u64,
    phase: RunPhase,
    /// Last dragging pointer position, cleared when the drag ends
    last_drag: Option<(f32, f32)>,

    // Configuration
    config: Config,

    // Statistics
    pub stats: FrameStats,
    pub stats_history: StatsHistory,

    // Master random stream (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,
}

impl SimulationState {
    /// Create a simulation, using the configured seed or a random one
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let seed = config
            .simulation
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen());
        Self::new_with_seed(config, seed)
    }

    /// Create a simulation with a specific seed for reproducibility
    pub fn new_with_seed(config: Config, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (field, population) = build(&config, &mut rng)?;

        log::info!(
            "Simulation created: {}x{} field, {} agents, {} species, {} substeps, seed {}",
            field.width(),
            field.height(),
            population.len(),
            population.species().len(),
            config.simulation.substeps,
            seed
        );

        Ok(Self {
            field,
            population,
            frame: 0,
            phase: RunPhase::Running,
            last_drag: None,
            stats: FrameStats::new(),
            stats_history: StatsHistory::new(config.logging.stats_interval),
            config,
            rng,
            seed,
        })
    }

    /// Advance one rendered frame and return the field to present
    pub fn frame(&mut self, pointer: &PointerSample) -> &Field {
        if self.phase == RunPhase::Resetting {
            if let Err(e) = self.reset() {
                log::error!("Reset failed, continuing with previous state: {}", e);
                self.phase = RunPhase::Running;
            }
        }
        let start = Instant::now();

        // Phase 1: fade
        self.field.decay(&self.config.field.decay);

        // Phase 2: periodic burst
        if let Some(burst) = &self.config.population.burst {
            if (self.frame + 1) % burst.interval == 0 {
                let moved = self.population.burst_respawn(
                    burst.count,
                    burst.origin,
                    self.field.width(),
                    self.field.height(),
                );
                log::debug!("Frame {}: burst respawn of {} agents", self.frame + 1, moved);
            }
        }

        // Phase 3: sub-steps
        let mut report = UpdateReport::default();
        for _ in 0..self.config.simulation.substeps {
            report.merge(self.population.update(&mut self.field, Some(pointer)));
        }

        // Phase 4: pointer painting
        self.paint(pointer);

        // Phase 5: bookkeeping
        self.frame += 1;
        self.update_stats(report, start.elapsed().as_secs_f32());

        &self.field
    }

    /// Advance one frame with no pointer input
    pub fn step(&mut self) {
        self.frame(&PointerSample::default());
    }

    /// Run for the given number of frames
    pub fn run(&mut self, frames: u64) {
        for _ in 0..frames {
            self.step();
        }
    }

    /// Run with a callback after every frame
    pub fn run_with_callback<F>(&mut self, frames: u64, mut callback: F)
    where
        F: FnMut(&SimulationState, u64),
    {
        for i in 0..frames {
            self.step();
            callback(self, i);
        }
    }

    /// Ask for a rebuild at the start of the next frame
    pub fn request_reset(&mut self) {
        log::info!("Reset requested at frame {}", self.frame);
        self.phase = RunPhase::Resetting;
    }

    /// Rebuild field and population from the configuration now
    pub fn reset(&mut self) -> Result<(), ConfigError> {
        let (width, height) = (self.config.field.width, self.config.field.height);
        self.population =
            Population::new(&self.config.population, width, height, &mut self.rng)?;
        self.field.resize(width, height)?;
        self.last_drag = None;
        self.phase = RunPhase::Running;
        log::info!(
            "Simulation reset at frame {}: {}x{} field, {} agents",
            self.frame,
            self.field.width(),
            self.field.height(),
            self.population.len()
        );
        Ok(())
    }

    /// Change the field dimensions; implies a reset
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroSizedField { width, height });
        }
        log::info!(
            "Resizing field from {}x{} to {}x{}",
            self.field.width(),
            self.field.height(),
            width,
            height
        );
        self.config.field.width = width;
        self.config.field.height = height;
        self.reset()
    }

    fn paint(&mut self, pointer: &PointerSample) {
        if !(pointer.active && pointer.dragging) {
            self.last_drag = None;
            return;
        }
        let to = (pointer.x, pointer.y);
        let from = self.last_drag.unwrap_or(to);
        let brush = &self.config.interaction;
        self.field
            .stroke(from, to, brush.brush_radius, brush.brush_color, brush.brush_blend);
        self.last_drag = Some(to);
    }

    fn update_stats(&mut self, report: UpdateReport, elapsed_secs: f32) {
        self.stats.frame = self.frame;
        self.stats.update(&self.field, self.population.len(), report);
        self.stats.frames_per_second = if elapsed_secs > 0.0 {
            1.0 / elapsed_secs
        } else {
            0.0
        };

        if self.frame % self.config.logging.stats_interval == 0 {
            log::debug!("{}", self.stats.summary());
            self.stats_history.record(self.stats.clone());
        }
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Frames completed since construction (resets do not rewind it)
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Get seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

fn build(config: &Config, rng: &mut ChaCha8Rng) -> Result<(Field, Population), ConfigError> {
    let field = Field::with_background(
        config.field.width,
        config.field.height,
        config.field.background,
    )?;
    let population = Population::new(
        &config.population,
        config.field.width,
        config.field.height,
        rng,
    )?;
    Ok((field, population))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BurstConfig;
    use crate::field::Decay;
    use crate::policy::Spawn;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.field.width = 40;
        config.field.height = 30;
        config.population.agents = 50;
        config
    }

    #[test]
    fn test_simulation_creation() {
        let sim = SimulationState::new_with_seed(test_config(), 42).unwrap();
        assert_eq!(sim.population().len(), 50);
        assert_eq!(sim.field().width(), 40);
        assert_eq!(sim.frame_count(), 0);
        assert_eq!(sim.seed(), 42);
    }

    #[test]
    fn test_configured_seed_is_used() {
        let mut config = test_config();
        config.simulation.seed = Some(1234);
        let sim = SimulationState::new(config).unwrap();
        assert_eq!(sim.seed(), 1234);
    }

    #[test]
    fn test_misconfiguration_is_fatal() {
        let mut config = test_config();
        config.population.agents = 0;
        assert!(matches!(
            SimulationState::new_with_seed(config, 1),
            Err(ConfigError::EmptyPopulation)
        ));
    }

    #[test]
    fn test_frame_counts_and_records_stats() {
        let mut config = test_config();
        config.logging.stats_interval = 5;
        let mut sim = SimulationState::new_with_seed(config, 7).unwrap();
        sim.run(20);

        assert_eq!(sim.frame_count(), 20);
        assert_eq!(sim.stats.frame, 20);
        assert_eq!(sim.stats_history.snapshots.len(), 4);
        assert!(sim.stats.coverage > 0.0);
    }

    #[test]
    fn test_run_with_callback() {
        let mut sim = SimulationState::new_with_seed(test_config(), 7).unwrap();
        let mut seen = Vec::new();
        sim.run_with_callback(3, |s, i| seen.push((i, s.frame_count())));
        assert_eq!(seen, vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_request_reset_rebuilds_on_next_frame() {
        let mut config = test_config();
        config.field.decay = Decay::None;
        let mut sim = SimulationState::new_with_seed(config, 3).unwrap();
        sim.run(10);

        sim.request_reset();
        assert_eq!(sim.phase(), RunPhase::Resetting);
        sim.step();
        assert_eq!(sim.phase(), RunPhase::Running);
        assert_eq!(sim.population().len(), 50);
        // one frame of deposits after the rebuild: at most one cell per agent
        let painted = sim.field().cells().iter().filter(|c| c[3] > 0.0).count();
        assert!(painted <= 50);
        assert_eq!(sim.frame_count(), 11);
    }

    #[test]
    fn test_reset_draws_new_layout() {
        let mut sim = SimulationState::new_with_seed(test_config(), 3).unwrap();
        let positions = |sim: &SimulationState| -> Vec<(f32, f32)> {
            sim.population().agents().iter().map(|a| (a.x, a.y)).collect()
        };
        let before = positions(&sim);
        sim.reset().unwrap();
        let after = positions(&sim);
        assert_ne!(before, after);
    }

    #[test]
    fn test_resize_resets_field() {
        let mut sim = SimulationState::new_with_seed(test_config(), 3).unwrap();
        sim.run(5);
        sim.resize(16, 12).unwrap();

        assert_eq!((sim.field().width(), sim.field().height()), (16, 12));
        assert!(sim.field().cells().iter().all(|&c| c == [0.0; 4]));
        for agent in sim.population().agents() {
            assert!(agent.x < 16.0 && agent.y < 12.0);
        }
        assert!(matches!(sim.resize(0, 12), Err(ConfigError::ZeroSizedField { .. })));
        assert_eq!(sim.field().width(), 16);
    }

    #[test]
    fn test_drag_paints_stroke() {
        let mut config = test_config();
        config.population.agents = 1;
        config.field.decay = Decay::None;
        config.interaction.brush_radius = 0.0;
        config.interaction.brush_color = [10.0, 20.0, 30.0, 255.0];
        let mut sim = SimulationState::new_with_seed(config, 5).unwrap();

        sim.frame(&PointerSample::drag(2.5, 20.5));
        assert_eq!(sim.field().get(2.0, 20.0), [10.0, 20.0, 30.0, 255.0]);
        sim.frame(&PointerSample::drag(12.5, 20.5));
        for x in 3..=12 {
            assert_eq!(sim.field().get(x as f32, 20.0), [10.0, 20.0, 30.0, 255.0]);
        }

        // releasing the button ends the stroke
        sim.frame(&PointerSample::at(30.5, 5.5));
        sim.frame(&PointerSample::drag(35.5, 5.5));
        assert_ne!(sim.field().get(33.0, 5.0), [10.0, 20.0, 30.0, 255.0]);
    }

    #[test]
    fn test_burst_fires_on_interval() {
        let mut config = test_config();
        config.population.burst = Some(BurstConfig {
            interval: 4,
            count: 50,
            origin: Spawn::Point { x: 1.0, y: 1.0 },
        });
        config.field.decay = Decay::None;
        let mut sim = SimulationState::new_with_seed(config, 9).unwrap();
        sim.run(3);
        assert!(sim.population().agents().iter().any(|a| (a.x, a.y) != (1.0, 1.0)));

        sim.run(1);
        // relocated to (1, 1) then moved one cell in some direction
        for agent in sim.population().agents() {
            let (dx, dy) = (agent.x - 1.0, agent.y - 1.0);
            let d = (dx * dx + dy * dy).sqrt();
            let wrapped = agent.x > 35.0 || agent.y > 25.0;
            assert!(wrapped || (d - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_same_seed_same_field() {
        let run = || {
            let mut sim = SimulationState::new_with_seed(test_config(), 99).unwrap();
            sim.run(15);
            sim.field().clone()
        };
        assert_eq!(run(), run());
    }
}
