//! Configuration system for the simulation.
//!
//! Supports YAML configuration files with sensible defaults and a handful of
//! named presets for the common variants.

use crate::field::{check_color, Blend, Channel, Decay, Rgba};
use crate::policy::{
    Deposit, Influence, Lifespan, PointerInfluence, Speed, Spawn, Steering, TieBreak,
};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::Path;
use thiserror::Error;

/// Largest number of sub-steps allowed per rendered frame
pub const MAX_SUBSTEPS: u32 = 50;

/// Names accepted by [`Config::preset`]
pub const PRESETS: [&str; 4] = ["classic", "branching", "lifecycle", "dual"];

/// Configuration errors, fatal to simulation start
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("field must have non-zero dimensions, got {width}x{height}")]
    ZeroSizedField { width: usize, height: usize },
    #[error("population must contain at least one agent")]
    EmptyPopulation,
    #[error("at least one species with a positive weight is required")]
    NoSpecies,
    #[error("species {index}: {reason}")]
    InvalidSpecies { index: usize, reason: String },
    #[error("substeps must be between 1 and {max}, got {value}", max = MAX_SUBSTEPS)]
    InvalidSubsteps { value: u32 },
    #[error("invalid background color: {0}")]
    InvalidBackground(String),
    #[error("invalid decay: {0}")]
    InvalidDecay(String),
    #[error("invalid burst respawn: {0}")]
    InvalidBurst(String),
    #[error("invalid interaction settings: {0}")]
    InvalidInteraction(String),
    #[error("invalid logging settings: {0}")]
    InvalidLogging(String),
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub field: FieldConfig,
    pub population: PopulationConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Raster dimensions and fading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub width: usize,
    pub height: usize,
    /// Initial and reset color of every cell
    #[serde(default)]
    pub background: Rgba,
    /// Applied once per rendered frame
    #[serde(default)]
    pub decay: Decay,
}

/// Agents and their kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Total number of agents, fixed for the run
    pub agents: usize,
    /// Evaluate the steering phase on the rayon pool
    #[serde(default)]
    pub parallel: bool,
    /// Agent kinds; counts are apportioned by weight
    pub species: Vec<Species>,
    /// Periodic relocation of a random subset
    #[serde(default)]
    pub burst: Option<BurstConfig>,
}

/// One agent kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    /// Relative share of the population
    pub weight: f32,
    /// Distance from the agent to each probe point
    pub sensor_offset: f32,
    /// Angular spread of the side probes (radians)
    pub sensor_angle: f32,
    /// Heading change per steering decision (radians)
    pub turn_angle: f32,
    #[serde(default)]
    pub channel: Channel,
    #[serde(default)]
    pub steering: Steering,
    /// Uniform heading noise per decision (radians)
    #[serde(default)]
    pub jitter: f32,
    #[serde(default)]
    pub speed: Speed,
    pub color: Rgba,
    #[serde(default)]
    pub deposit: Deposit,
    /// Initial placement
    #[serde(default)]
    pub spawn: Spawn,
    #[serde(default)]
    pub lifespan: Option<Lifespan>,
    #[serde(default)]
    pub pointer: Option<PointerInfluence>,
}

/// Burst respawn settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurstConfig {
    /// Rendered frames between bursts
    pub interval: u64,
    /// Agents relocated per burst
    pub count: usize,
    pub origin: Spawn,
}

/// Frame driver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Population updates per rendered frame
    pub substeps: u32,
    /// Fixed seed; a random one is drawn when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Drag painting brush
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfig {
    pub brush_radius: f32,
    pub brush_color: Rgba,
    pub brush_blend: Blend,
}

/// Logging and statistics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Frames between stats snapshots
    pub stats_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            field: FieldConfig::default(),
            population: PopulationConfig::default(),
            simulation: SimulationConfig::default(),
            interaction: InteractionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            background: [0.0, 0.0, 0.0, 0.0],
            decay: Decay::default(),
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            agents: 2000,
            parallel: false,
            species: vec![Species::default()],
            burst: None,
        }
    }
}

impl Default for Species {
    fn default() -> Self {
        Self {
            name: "trail".to_string(),
            weight: 1.0,
            sensor_offset: 9.0,
            sensor_angle: PI / 4.0,
            turn_angle: PI / 4.0,
            channel: Channel::Average,
            steering: Steering::default(),
            jitter: 0.0,
            speed: Speed::default(),
            color: [255.0, 255.0, 255.0, 255.0],
            deposit: Deposit::Additive,
            spawn: Spawn::Random,
            lifespan: None,
            pointer: None,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            substeps: 1,
            seed: None,
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            brush_radius: 3.0,
            brush_color: [255.0, 255.0, 255.0, 255.0],
            brush_blend: Blend::Overwrite,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 50,
            log_level: "info".to_string(),
        }
    }
}

impl Species {
    /// Validate one species
    pub fn validate(&self) -> Result<(), String> {
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(format!("weight {} must be finite and >= 0", self.weight));
        }
        for (name, v) in [
            ("sensor_offset", self.sensor_offset),
            ("sensor_angle", self.sensor_angle),
            ("turn_angle", self.turn_angle),
            ("jitter", self.jitter),
        ] {
            if !v.is_finite() {
                return Err(format!("{} must be finite", name));
            }
        }
        if self.jitter < 0.0 {
            return Err("jitter must be >= 0".to_string());
        }
        if let Steering::MinSeek { straight_bias, .. } | Steering::MaxSeek { straight_bias, .. } =
            self.steering
        {
            if !straight_bias.is_finite() {
                return Err("straight_bias must be finite".to_string());
            }
        }
        self.speed.validate()?;
        check_color(&self.color)?;
        if let Deposit::RevisitAlpha { step } = self.deposit {
            if !step.is_finite() || step < 0.0 {
                return Err("revisit alpha step must be finite and >= 0".to_string());
            }
        }
        self.spawn.validate()?;
        if let Some(life) = &self.lifespan {
            if life.min == 0 || life.min > life.max {
                return Err(format!(
                    "lifespan range {}..={} must satisfy 1 <= min <= max",
                    life.min, life.max
                ));
            }
            life.origin.validate()?;
        }
        if let Some(pointer) = &self.pointer {
            if !pointer.radius.is_finite()
                || pointer.radius < 0.0
                || !(0.0..=1.0).contains(&pointer.factor)
            {
                return Err("pointer radius must be >= 0 and factor within 0..=1".to_string());
            }
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field.width == 0 || self.field.height == 0 {
            return Err(ConfigError::ZeroSizedField {
                width: self.field.width,
                height: self.field.height,
            });
        }
        check_color(&self.field.background).map_err(ConfigError::InvalidBackground)?;
        self.field.decay.validate()?;

        if self.population.agents == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.population.species.is_empty()
            || self.population.species.iter().all(|s| s.weight <= 0.0)
        {
            return Err(ConfigError::NoSpecies);
        }
        for (index, species) in self.population.species.iter().enumerate() {
            species
                .validate()
                .map_err(|reason| ConfigError::InvalidSpecies { index, reason })?;
        }
        if let Some(burst) = &self.population.burst {
            if burst.interval == 0 {
                return Err(ConfigError::InvalidBurst("interval must be > 0".to_string()));
            }
            if burst.count > self.population.agents {
                return Err(ConfigError::InvalidBurst(format!(
                    "count {} exceeds population {}",
                    burst.count, self.population.agents
                )));
            }
            burst.origin.validate().map_err(ConfigError::InvalidBurst)?;
        }

        if self.simulation.substeps == 0 || self.simulation.substeps > MAX_SUBSTEPS {
            return Err(ConfigError::InvalidSubsteps {
                value: self.simulation.substeps,
            });
        }

        let brush = &self.interaction;
        if !brush.brush_radius.is_finite() || brush.brush_radius < 0.0 {
            return Err(ConfigError::InvalidInteraction(
                "brush_radius must be finite and >= 0".to_string(),
            ));
        }
        check_color(&brush.brush_color).map_err(ConfigError::InvalidInteraction)?;

        if self.logging.stats_interval == 0 {
            return Err(ConfigError::InvalidLogging(
                "stats_interval must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Named configuration for a common variant
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        match name {
            // dark trail follower on a white field, fading back to white
            "classic" => {
                config.field.background = [255.0, 255.0, 255.0, 255.0];
                config.field.decay = Decay::BlendToward {
                    color: [255.0, 255.0, 255.0, 255.0],
                    fraction: 0.05,
                };
                config.simulation.substeps = 4;
                config.population.species = vec![Species {
                    name: "ink".to_string(),
                    sensor_offset: 10.0,
                    sensor_angle: PI / 8.0,
                    turn_angle: PI / 5.0,
                    steering: Steering::MinSeek {
                        straight_bias: 0.0,
                        tie_break: TieBreak::PreferCenter,
                    },
                    jitter: 0.05,
                    color: [0.0, 0.0, 0.0, 255.0],
                    deposit: Deposit::Overwrite,
                    ..Species::default()
                }];
            }
            "branching" => {
                config.field.decay = Decay::StepToward {
                    target: [0.0, 0.0, 0.0, 0.0],
                    step: 2.0,
                };
                config.population.species = vec![Species {
                    name: "branch".to_string(),
                    steering: Steering::ThreeWayBranch,
                    speed: Speed::Random { min: 0.5, max: 1.5 },
                    color: [40.0, 200.0, 120.0, 255.0],
                    deposit: Deposit::RevisitAlpha { step: 30.0 },
                    spawn: Spawn::Disc { radius: 40.0 },
                    ..Species::default()
                }];
            }
            "lifecycle" => {
                config.population.burst = Some(BurstConfig {
                    interval: 200,
                    count: 100,
                    origin: Spawn::Center,
                });
                config.population.species = vec![Species {
                    name: "ember".to_string(),
                    speed: Speed::Coupled {
                        sum_min: 0.0,
                        sum_max: 765.0,
                        speed_min: 0.5,
                        speed_max: 2.5,
                    },
                    color: [255.0, 140.0, 40.0, 255.0],
                    deposit: Deposit::LifeWeighted,
                    spawn: Spawn::Center,
                    lifespan: Some(Lifespan {
                        min: 100,
                        max: 400,
                        origin: Spawn::Center,
                    }),
                    pointer: Some(PointerInfluence {
                        radius: 40.0,
                        factor: 0.2,
                        mode: Influence::Attract,
                    }),
                    ..Species::default()
                }];
            }
            "dual" => {
                config.population.species = vec![
                    Species {
                        name: "seeker".to_string(),
                        weight: 80.0,
                        channel: Channel::Red,
                        color: [255.0, 40.0, 40.0, 255.0],
                        ..Species::default()
                    },
                    Species {
                        name: "avoider".to_string(),
                        weight: 20.0,
                        channel: Channel::Red,
                        steering: Steering::MinSeek {
                            straight_bias: 0.0,
                            tie_break: TieBreak::FirstIndex,
                        },
                        speed: Speed::Fixed { value: 1.5 },
                        color: [40.0, 40.0, 255.0, 255.0],
                        ..Species::default()
                    },
                ];
            }
            other => return Err(ConfigError::UnknownPreset(other.to_string())),
        }
        Ok(config)
    }
}
