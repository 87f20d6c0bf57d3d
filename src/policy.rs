//! Pluggable per-species behavior: steering, speed, deposit, spawning.
//!
//! Each policy is a serde-tagged enum chosen once in the configuration, so one
//! engine covers every variant (trail followers, space seekers, branching
//! walkers, respawning or speed-coupled agents) without per-variant code paths.

use crate::field::Blend;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Resolution of equal readings in min/max seeking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// First extreme in `left, center, right` order wins
    #[default]
    FirstIndex,
    /// Center wins whenever it equals the extreme
    PreferCenter,
}

/// Steering decision relative to the current heading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Left,
    Straight,
    Right,
}

impl Turn {
    /// Map a sensor index (0 = left, 1 = center, 2 = right)
    #[inline]
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Turn::Left,
            1 => Turn::Straight,
            _ => Turn::Right,
        }
    }

    /// Multiplier for the turn angle
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Turn::Left => -1.0,
            Turn::Straight => 0.0,
            Turn::Right => 1.0,
        }
    }
}

/// How the three sensor readings become a turn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Steering {
    /// Head for the lowest reading (`center - straight_bias` competes)
    MinSeek {
        #[serde(default)]
        straight_bias: f32,
        #[serde(default)]
        tie_break: TieBreak,
    },
    /// Head for the highest reading (`center + straight_bias` competes)
    MaxSeek {
        #[serde(default)]
        straight_bias: f32,
        #[serde(default)]
        tie_break: TieBreak,
    },
    /// Straight if center is strictly highest, random if strictly lowest,
    /// otherwise toward the higher side
    ThreeWayBranch,
}

impl Default for Steering {
    fn default() -> Self {
        Steering::MaxSeek {
            straight_bias: 0.0,
            tie_break: TieBreak::FirstIndex,
        }
    }
}

impl Steering {
    /// Pick a turn from `left`, `center`, `right` readings
    pub fn choose<R: Rng + ?Sized>(&self, left: f32, center: f32, right: f32, rng: &mut R) -> Turn {
        match *self {
            Steering::MinSeek {
                straight_bias,
                tie_break,
            } => {
                let values = [left, center - straight_bias, right];
                Turn::from_index(extreme_index(&values, |a, b| a < b, tie_break))
            }
            Steering::MaxSeek {
                straight_bias,
                tie_break,
            } => {
                let values = [left, center + straight_bias, right];
                Turn::from_index(extreme_index(&values, |a, b| a > b, tie_break))
            }
            Steering::ThreeWayBranch => {
                if center > left && center > right {
                    Turn::Straight
                } else if center < left && center < right {
                    if rng.gen::<bool>() {
                        Turn::Right
                    } else {
                        Turn::Left
                    }
                } else if left > right {
                    Turn::Left
                } else if right > left {
                    Turn::Right
                } else {
                    Turn::Straight
                }
            }
        }
    }
}

/// Index of the extreme value; strict comparison keeps the first match
fn extreme_index<F>(values: &[f32; 3], better: F, tie_break: TieBreak) -> usize
where
    F: Fn(f32, f32) -> bool,
{
    let mut best = 0;
    for i in 1..values.len() {
        if better(values[i], values[best]) {
            best = i;
        }
    }
    if tie_break == TieBreak::PreferCenter && best != 1 && values[1] == values[best] {
        best = 1;
    }
    best
}

/// How fast an agent moves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Speed {
    Fixed { value: f32 },
    /// Drawn uniformly at every spawn
    Random { min: f32, max: f32 },
    /// Linear map of the summed sensor readings, clamped to the speed range
    Coupled {
        sum_min: f32,
        sum_max: f32,
        speed_min: f32,
        speed_max: f32,
    },
}

impl Default for Speed {
    fn default() -> Self {
        Speed::Fixed { value: 1.0 }
    }
}

impl Speed {
    /// Speed assigned at spawn
    pub fn initial<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        match *self {
            Speed::Fixed { value } => value,
            Speed::Random { min, max } => {
                if max > min {
                    rng.gen_range(min..max)
                } else {
                    min
                }
            }
            Speed::Coupled { speed_min, .. } => speed_min,
        }
    }

    /// Speed derived from the summed readings, if coupled
    pub fn coupled(&self, sensed_sum: f32) -> Option<f32> {
        match *self {
            Speed::Coupled {
                sum_min,
                sum_max,
                speed_min,
                speed_max,
            } => {
                let span = sum_max - sum_min;
                let t = if span > 0.0 {
                    ((sensed_sum - sum_min) / span).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                Some(speed_min + (speed_max - speed_min) * t)
            }
            _ => None,
        }
    }

    /// Largest speed this policy can produce
    pub fn max(&self) -> f32 {
        match *self {
            Speed::Fixed { value } => value,
            Speed::Random { min, max } => min.max(max),
            Speed::Coupled {
                speed_min,
                speed_max,
                ..
            } => speed_min.max(speed_max),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let ok = match *self {
            Speed::Fixed { value } => value.is_finite() && value >= 0.0,
            Speed::Random { min, max } => {
                min.is_finite() && max.is_finite() && min >= 0.0 && min <= max
            }
            Speed::Coupled {
                sum_min,
                sum_max,
                speed_min,
                speed_max,
            } => {
                [sum_min, sum_max, speed_min, speed_max]
                    .iter()
                    .all(|v| v.is_finite())
                    && sum_min < sum_max
                    && speed_min >= 0.0
                    && speed_max >= 0.0
            }
        };
        if ok {
            Ok(())
        } else {
            Err(format!("invalid speed policy {:?}", self))
        }
    }
}

/// How an agent writes into the field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Deposit {
    Overwrite,
    Additive,
    Subtractive,
    RevisitAlpha { step: f32 },
    /// Color scaled by the remaining-life fraction
    LifeWeighted,
    /// Color scaled by current speed over the policy's maximum speed
    SpeedWeighted,
}

impl Default for Deposit {
    fn default() -> Self {
        Deposit::Additive
    }
}

impl Deposit {
    /// Resolve to a field blend for one agent's current state
    pub fn blend(&self, life_ratio: f32, speed_ratio: f32) -> Blend {
        match *self {
            Deposit::Overwrite => Blend::Overwrite,
            Deposit::Additive => Blend::Additive,
            Deposit::Subtractive => Blend::Subtractive,
            Deposit::RevisitAlpha { step } => Blend::RevisitAlpha { step },
            Deposit::LifeWeighted => Blend::Scaled { ratio: life_ratio },
            Deposit::SpeedWeighted => Blend::Scaled { ratio: speed_ratio },
        }
    }
}

/// Where agents appear
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Spawn {
    Center,
    Random,
    Point { x: f32, y: f32 },
    /// Uniform inside a disc around the center
    Disc { radius: f32 },
}

impl Default for Spawn {
    fn default() -> Self {
        Spawn::Random
    }
}

impl Spawn {
    /// Draw a position inside a `width` x `height` field
    pub fn position<R: Rng + ?Sized>(&self, width: f32, height: f32, rng: &mut R) -> (f32, f32) {
        match *self {
            Spawn::Center => (width / 2.0, height / 2.0),
            Spawn::Random => (rng.gen_range(0.0..width), rng.gen_range(0.0..height)),
            Spawn::Point { x, y } => (x, y),
            Spawn::Disc { radius } => {
                let angle = rng.gen_range(0.0..TAU);
                let r = radius * rng.gen::<f32>().sqrt();
                (width / 2.0 + r * angle.cos(), height / 2.0 + r * angle.sin())
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let ok = match *self {
            Spawn::Center | Spawn::Random => true,
            Spawn::Point { x, y } => x.is_finite() && y.is_finite(),
            Spawn::Disc { radius } => radius.is_finite() && radius >= 0.0,
        };
        if ok {
            Ok(())
        } else {
            Err(format!("invalid spawn origin {:?}", self))
        }
    }
}

/// Finite life with respawn on death
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lifespan {
    /// Life drawn uniformly from `min..=max` steps
    pub min: u32,
    pub max: u32,
    /// Respawn location
    #[serde(default = "Lifespan::default_origin")]
    pub origin: Spawn,
}

impl Lifespan {
    fn default_origin() -> Spawn {
        Spawn::Center
    }

    /// Fresh life counter
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.min..=self.max)
    }
}

/// Attraction or repulsion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Influence {
    Attract,
    Repel,
}

/// Steering toward or away from an active pointer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerInfluence {
    pub radius: f32,
    /// Fraction of the angular difference applied per call
    pub factor: f32,
    pub mode: Influence,
}

impl PointerInfluence {
    /// New heading after blending toward (or away from) `bearing`
    pub fn apply(&self, heading: f32, bearing: f32) -> f32 {
        let target = match self.mode {
            Influence::Attract => bearing,
            Influence::Repel => bearing + PI,
        };
        heading + shortest_angle(target - heading) * self.factor
    }
}

/// Signed angle in `[-PI, PI)` equivalent to `delta`
#[inline]
pub fn shortest_angle(delta: f32) -> f32 {
    (delta + PI).rem_euclid(TAU) - PI
}
