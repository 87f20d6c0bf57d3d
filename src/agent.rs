//! Agent structure and behavior.
//!
//! An agent senses the field at three probe points, steers, moves, and
//! deposits color where it lands. Behavior parameters live in the agent's
//! [`Species`]; the agent itself only carries its mutable state.

use crate::config::Species;
use crate::field::Field;
use crate::policy::{Spawn, Turn};
use crate::simulation::PointerSample;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::f32::consts::TAU;

/// Species index into the population's species table
pub type SpeciesId = usize;

/// Remaining and total life of a mortal agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Life {
    pub remaining: u32,
    pub max: u32,
}

impl Life {
    /// Remaining fraction in `0.0..=1.0`
    #[inline]
    pub fn ratio(&self) -> f32 {
        if self.max == 0 {
            0.0
        } else {
            self.remaining as f32 / self.max as f32
        }
    }
}

/// What happened during one [`Agent::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    /// Life ran out and the agent started over
    Respawned,
    /// Non-finite state was detected and replaced
    Reset,
}

/// An agent in the simulation
#[derive(Clone, Debug)]
pub struct Agent {
    // Kinematics
    pub x: f32,
    pub y: f32,
    /// Radians, unbounded; only used through sin/cos
    pub heading: f32,
    pub speed: f32,

    // Kind
    pub species: SpeciesId,

    // Lifecycle (only for species with a lifespan)
    pub life: Option<Life>,

    // Private random stream, seeded from the simulation RNG
    rng: ChaCha8Rng,
}

impl Agent {
    /// Create an agent with explicit state
    pub fn new(
        x: f32,
        y: f32,
        heading: f32,
        speed: f32,
        species: SpeciesId,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            x,
            y,
            heading,
            speed,
            species,
            life: None,
            rng,
        }
    }

    /// Attach a life counter
    pub fn with_life(mut self, remaining: u32, max: u32) -> Self {
        self.life = Some(Life { remaining, max });
        self
    }

    /// Create an agent placed by the species' spawn policy
    pub fn spawn(
        species_id: SpeciesId,
        species: &Species,
        width: usize,
        height: usize,
        mut rng: ChaCha8Rng,
    ) -> Self {
        let (x, y) = species.spawn.position(width as f32, height as f32, &mut rng);
        let heading = rng.gen_range(0.0..TAU);
        let speed = species.speed.initial(&mut rng);
        let life = species.lifespan.map(|span| {
            let max = span.draw(&mut rng);
            Life { remaining: max, max }
        });

        let mut agent = Self {
            x,
            y,
            heading,
            speed,
            species: species_id,
            life,
            rng,
        };
        agent.wrap_position(width as f32, height as f32);
        agent
    }

    /// Read the field at a probe point `offset` radians off the heading
    #[inline]
    pub fn sense(&self, field: &Field, species: &Species, offset: f32) -> f32 {
        let angle = self.heading + offset;
        let px = self.x + species.sensor_offset * angle.cos();
        let py = self.y + species.sensor_offset * angle.sin();
        field.sample(px, py, species.channel)
    }

    /// Left, center and right readings
    pub fn readings(&self, field: &Field, species: &Species) -> (f32, f32, f32) {
        (
            self.sense(field, species, -species.sensor_angle),
            self.sense(field, species, 0.0),
            self.sense(field, species, species.sensor_angle),
        )
    }

    /// Sense and update heading (and coupled speed). Reads the field only.
    pub fn decide_steer(
        &mut self,
        field: &Field,
        species: &Species,
        pointer: Option<&PointerSample>,
    ) -> Turn {
        // Pointer influence comes before the sensor term
        if let (Some(influence), Some(p)) = (species.pointer.as_ref(), pointer) {
            if p.active {
                let (dx, dy) = (p.x - self.x, p.y - self.y);
                if dx * dx + dy * dy <= influence.radius * influence.radius {
                    self.heading = influence.apply(self.heading, dy.atan2(dx));
                }
            }
        }

        let (left, center, right) = self.readings(field, species);
        let turn = species.steering.choose(left, center, right, &mut self.rng);
        self.heading += species.turn_angle * turn.sign();

        if species.jitter > 0.0 {
            self.heading += self.rng.gen_range(-species.jitter..=species.jitter);
        }
        // keep small turns representable in long runs
        self.heading = wrap_coord(self.heading, TAU);

        if let Some(speed) = species.speed.coupled(left + center + right) {
            self.speed = speed;
        }

        log::trace!(
            "agent at ({:.1}, {:.1}) read ({:.1}, {:.1}, {:.1}) -> {:?}",
            self.x,
            self.y,
            left,
            center,
            right,
            turn
        );
        turn
    }

    /// Move, age, respawn if dead, then deposit into the field
    pub fn step(&mut self, field: &mut Field, species: &Species) -> StepOutcome {
        let (width, height) = (field.width() as f32, field.height() as f32);
        let mut outcome = StepOutcome::Moved;

        if self.is_valid() {
            self.x += self.speed * self.heading.cos();
            self.y += self.speed * self.heading.sin();
            self.wrap_position(width, height);
        }

        if !self.is_valid() {
            log::warn!(
                "agent state became non-finite (x={}, y={}, heading={}, speed={}), resetting",
                self.x,
                self.y,
                self.heading,
                self.speed
            );
            self.respawn(species, width, height);
            outcome = StepOutcome::Reset;
        } else if let Some(life) = self.life.as_mut() {
            life.remaining = life.remaining.saturating_sub(1);
            if life.remaining == 0 {
                self.respawn(species, width, height);
                outcome = StepOutcome::Respawned;
            }
        }

        let life_ratio = self.life.map_or(1.0, |l| l.ratio());
        let max_speed = species.speed.max();
        let speed_ratio = if max_speed > 0.0 {
            self.speed / max_speed
        } else {
            0.0
        };
        let blend = species.deposit.blend(life_ratio, speed_ratio);
        field.deposit(self.x, self.y, species.color, blend);

        outcome
    }

    /// Start over at the species' respawn origin with fresh heading, speed and life
    pub fn respawn(&mut self, species: &Species, width: f32, height: f32) {
        let origin = species
            .lifespan
            .map_or(species.spawn, |span| span.origin);
        let (x, y) = origin.position(width, height, &mut self.rng);
        self.x = x;
        self.y = y;
        self.heading = self.rng.gen_range(0.0..TAU);
        self.speed = species.speed.initial(&mut self.rng);
        if let Some(span) = species.lifespan {
            let max = span.draw(&mut self.rng);
            self.life = Some(Life { remaining: max, max });
        }
        self.wrap_position(width, height);
    }

    /// Move to `origin` with a fresh heading; life is left alone
    pub fn relocate(&mut self, origin: Spawn, width: f32, height: f32) {
        let (x, y) = origin.position(width, height, &mut self.rng);
        self.x = x;
        self.y = y;
        self.heading = self.rng.gen_range(0.0..TAU);
        self.wrap_position(width, height);
    }

    /// Position, heading and speed are all finite
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.heading.is_finite()
            && self.speed.is_finite()
    }

    /// Keep the position inside `[0, width) x [0, height)`
    #[inline]
    fn wrap_position(&mut self, width: f32, height: f32) {
        self.x = wrap_coord(self.x, width);
        self.y = wrap_coord(self.y, height);
    }
}

/// Wrap into `[0, size)`; `rem_euclid` can round up to `size` for tiny negative inputs
#[inline]
fn wrap_coord(v: f32, size: f32) -> f32 {
    let w = v.rem_euclid(size);
    if w >= size {
        0.0
    } else {
        w
    }
}
