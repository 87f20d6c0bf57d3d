//! Toroidal color field shared by every agent.
//!
//! Each cell holds an `[r, g, b, a]` record of `f32` channels in `0..=255`.
//! All coordinate accesses wrap on both axes before indexing, so there is no
//! out-of-range coordinate: `(-1, y)` and `(width - 1, y)` address the same cell.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

/// One cell of the field: red, green, blue, alpha.
pub type Rgba = [f32; 4];

/// Upper bound of every channel.
pub const CHANNEL_MAX: f32 = 255.0;

/// Which part of a cell an agent reads when sensing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
    /// Mean of red, green and blue
    #[default]
    Average,
    /// Perceptual luminance of red, green and blue
    Luminance,
}

impl Channel {
    /// Read this channel out of a cell
    #[inline]
    pub fn read(&self, cell: &Rgba) -> f32 {
        match self {
            Channel::Red => cell[0],
            Channel::Green => cell[1],
            Channel::Blue => cell[2],
            Channel::Alpha => cell[3],
            Channel::Average => (cell[0] + cell[1] + cell[2]) / 3.0,
            Channel::Luminance => 0.299 * cell[0] + 0.587 * cell[1] + 0.114 * cell[2],
        }
    }
}

/// How a deposited color combines with the cell it lands on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Blend {
    /// Replace all four channels
    Overwrite,
    /// `channel = clamp(channel + color)`
    Additive,
    /// `channel = clamp(channel - color)`
    Subtractive,
    /// Alpha-composite; revisited cells (alpha > 0) receive `step` less alpha
    RevisitAlpha { step: f32 },
    /// Color channels scaled by `ratio`, then additive; alpha is added unscaled
    Scaled { ratio: f32 },
}

/// Global per-frame fading of the field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Decay {
    None,
    /// Mix every cell toward `color` by `fraction` (a translucent overwrite)
    BlendToward { color: Rgba, fraction: f32 },
    /// Move every channel toward `target` by a fixed `step`
    StepToward { target: Rgba, step: f32 },
}

impl Default for Decay {
    fn default() -> Self {
        Decay::BlendToward {
            color: [0.0, 0.0, 0.0, 0.0],
            fraction: 0.05,
        }
    }
}

impl Decay {
    /// Check parameters are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Decay::None => Ok(()),
            Decay::BlendToward { color, fraction } => {
                if !(0.0..=1.0).contains(&fraction) {
                    return Err(ConfigError::InvalidDecay(format!(
                        "blend fraction {} must be between 0.0 and 1.0",
                        fraction
                    )));
                }
                check_color(&color).map_err(ConfigError::InvalidDecay)
            }
            Decay::StepToward { target, step } => {
                if !step.is_finite() || step < 0.0 {
                    return Err(ConfigError::InvalidDecay(format!(
                        "step {} must be finite and >= 0",
                        step
                    )));
                }
                check_color(&target).map_err(ConfigError::InvalidDecay)
            }
        }
    }
}

/// Check a color lies inside the channel range
pub(crate) fn check_color(color: &Rgba) -> Result<(), String> {
    if color
        .iter()
        .all(|c| c.is_finite() && (0.0..=CHANNEL_MAX).contains(c))
    {
        Ok(())
    } else {
        Err(format!("color {:?} has channels outside 0..=255", color))
    }
}

/// The shared raster
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    width: usize,
    height: usize,
    /// Row-major, `cells[y * width + x]`
    cells: Vec<Rgba>,
    background: Rgba,
}

impl Field {
    /// Create a field filled with transparent black
    pub fn new(width: usize, height: usize) -> Result<Self, ConfigError> {
        Self::with_background(width, height, [0.0; 4])
    }

    /// Create a field filled with `background`
    pub fn with_background(
        width: usize,
        height: usize,
        background: Rgba,
    ) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroSizedField { width, height });
        }
        Ok(Self {
            width,
            height,
            cells: vec![background; width * height],
            background,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn background(&self) -> Rgba {
        self.background
    }

    /// Floor and wrap continuous coordinates into a cell position
    #[inline]
    pub fn wrap(&self, x: f32, y: f32) -> (usize, usize) {
        (wrap_axis(x, self.width), wrap_axis(y, self.height))
    }

    #[inline]
    fn index(&self, x: f32, y: f32) -> usize {
        let (cx, cy) = self.wrap(x, y);
        cy * self.width + cx
    }

    /// Full cell record at a (wrapped) position
    #[inline]
    pub fn get(&self, x: f32, y: f32) -> Rgba {
        self.cells[self.index(x, y)]
    }

    /// Read one channel at a (wrapped) position
    #[inline]
    pub fn sample(&self, x: f32, y: f32, channel: Channel) -> f32 {
        channel.read(&self.cells[self.index(x, y)])
    }

    /// Blend `color` into the cell at a (wrapped) position
    #[inline]
    pub fn deposit(&mut self, x: f32, y: f32, color: Rgba, blend: Blend) {
        let idx = self.index(x, y);
        blend_into(&mut self.cells[idx], color, blend);
    }

    /// Apply one frame of decay to every cell
    pub fn decay(&mut self, decay: &Decay) {
        match *decay {
            Decay::None => {}
            Decay::BlendToward { color, fraction } => {
                let fraction = fraction.clamp(0.0, 1.0);
                for cell in &mut self.cells {
                    for (ch, &target) in cell.iter_mut().zip(color.iter()) {
                        let moved = *ch + (target - *ch) * fraction;
                        *ch = approach(*ch, target, moved);
                    }
                }
            }
            Decay::StepToward { target, step } => {
                for cell in &mut self.cells {
                    for (ch, &t) in cell.iter_mut().zip(target.iter()) {
                        let moved = if *ch > t { *ch - step } else { *ch + step };
                        *ch = approach(*ch, t, moved);
                    }
                }
            }
        }
    }

    /// Paint a round brush of `radius` cells at unit intervals along the
    /// shortest wrapped path from `from` to `to`.
    ///
    /// `from` itself is only painted when both points fall together, so a drag
    /// continued frame after frame never paints its joints twice.
    pub fn stroke(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        radius: f32,
        color: Rgba,
        blend: Blend,
    ) {
        if ![from.0, from.1, to.0, to.1, radius].iter().all(|v| v.is_finite()) {
            return;
        }
        let (w, h) = (self.width as f32, self.height as f32);
        let from = (from.0.rem_euclid(w), from.1.rem_euclid(h));
        let (dx, dy) = (shortest_offset(to.0 - from.0, w), shortest_offset(to.1 - from.1, h));

        // a wrapped path is never longer than half the perimeter
        let length = (dx * dx + dy * dy).sqrt();
        let steps = (length.ceil() as usize).min(self.width + self.height);
        let r = radius.max(0.0).min(w.max(h));
        let reach = r.ceil() as i32;

        let first = if steps == 0 { 0 } else { 1 };
        for i in first..=steps {
            let t = if steps == 0 { 0.0 } else { i as f32 / steps as f32 };
            let (px, py) = (from.0 + dx * t, from.1 + dy * t);
            for oy in -reach..=reach {
                for ox in -reach..=reach {
                    if (ox * ox + oy * oy) as f32 <= r * r {
                        self.deposit(px + ox as f32, py + oy as f32, color, blend);
                    }
                }
            }
        }
    }

    /// Set every cell to `color`
    pub fn fill(&mut self, color: Rgba) {
        self.cells.iter_mut().for_each(|c| *c = color);
    }

    /// Reset every cell to the background
    pub fn clear(&mut self) {
        self.fill(self.background);
    }

    /// Change dimensions; contents are reset to the background
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroSizedField { width, height });
        }
        self.width = width;
        self.height = height;
        self.cells.resize(width * height, self.background);
        self.clear();
        Ok(())
    }

    /// Raw cell records, row-major
    pub fn cells(&self) -> &[Rgba] {
        &self.cells
    }

    /// Row-major RGBA8 buffer for presentation
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.cells
            .iter()
            .flat_map(|cell| cell.map(|c| c.round().clamp(0.0, CHANNEL_MAX) as u8))
            .collect()
    }

    /// Mean of a channel over the whole field
    pub fn mean(&self, channel: Channel) -> f32 {
        let total: f64 = self.cells.iter().map(|c| channel.read(c) as f64).sum();
        (total / self.cells.len() as f64) as f32
    }

    /// Fraction of cells whose channel exceeds `threshold`
    pub fn coverage(&self, channel: Channel, threshold: f32) -> f32 {
        let covered = self
            .cells
            .iter()
            .filter(|c| channel.read(c) > threshold)
            .count();
        covered as f32 / self.cells.len() as f32
    }
}

/// Floor then wrap one coordinate. Non-finite input saturates in the cast
/// and still lands on a valid cell.
#[inline]
fn wrap_axis(v: f32, size: usize) -> usize {
    (v.floor() as i64).rem_euclid(size as i64) as usize
}

/// Signed offset in `(-size / 2, size / 2]` equivalent to `delta` on a ring of `size`
#[inline]
fn shortest_offset(delta: f32, size: f32) -> f32 {
    let d = delta.rem_euclid(size);
    if d > size / 2.0 {
        d - size
    } else {
        d
    }
}

/// Accept `moved` unless it passed `target`, in which case stop at the target
#[inline]
fn approach(current: f32, target: f32, moved: f32) -> f32 {
    if current < target {
        moved.min(target)
    } else if current > target {
        moved.max(target)
    } else {
        target
    }
}

#[inline]
fn blend_into(cell: &mut Rgba, color: Rgba, blend: Blend) {
    match blend {
        Blend::Overwrite => *cell = color,
        Blend::Additive => {
            for (ch, c) in cell.iter_mut().zip(color) {
                *ch = (*ch + c).clamp(0.0, CHANNEL_MAX);
            }
        }
        Blend::Subtractive => {
            for (ch, c) in cell.iter_mut().zip(color) {
                *ch = (*ch - c).clamp(0.0, CHANNEL_MAX);
            }
        }
        Blend::RevisitAlpha { step } => {
            let mut alpha = color[3];
            if cell[3] > 0.0 {
                alpha = (alpha - step).max(0.0);
            }
            let t = (alpha / CHANNEL_MAX).clamp(0.0, 1.0);
            for i in 0..3 {
                cell[i] = (cell[i] + (color[i] - cell[i]) * t).clamp(0.0, CHANNEL_MAX);
            }
            cell[3] = (cell[3] + alpha).clamp(0.0, CHANNEL_MAX);
        }
        Blend::Scaled { ratio } => {
            let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
            for i in 0..3 {
                cell[i] = (cell[i] + color[i] * ratio).clamp(0.0, CHANNEL_MAX);
            }
            cell[3] = (cell[3] + color[3]).clamp(0.0, CHANNEL_MAX);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_negative_and_overflow() {
        let field = Field::new(10, 8).unwrap();
        assert_eq!(field.wrap(-1.0, 0.0), (9, 0));
        assert_eq!(field.wrap(10.0, 8.0), (0, 0));
        assert_eq!(field.wrap(-0.5, -8.5), (9, 7));
        assert_eq!(field.wrap(25.9, 17.2), (5, 1));
    }

    #[test]
    fn test_wrap_non_finite_stays_in_range() {
        let field = Field::new(7, 5).unwrap();
        for v in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let (x, y) = field.wrap(v, v);
            assert!(x < 7 && y < 5);
        }
    }

    #[test]
    fn test_zero_sized_field_rejected() {
        assert!(matches!(
            Field::new(0, 10),
            Err(ConfigError::ZeroSizedField { width: 0, height: 10 })
        ));
        let mut field = Field::new(4, 4).unwrap();
        assert!(field.resize(4, 0).is_err());
        assert_eq!(field.width(), 4);
    }

    #[test]
    fn test_channel_readings() {
        let cell = [30.0, 60.0, 90.0, 200.0];
        assert_eq!(Channel::Red.read(&cell), 30.0);
        assert_eq!(Channel::Alpha.read(&cell), 200.0);
        assert_eq!(Channel::Average.read(&cell), 60.0);
        let lum = Channel::Luminance.read(&cell);
        assert!((lum - (0.299 * 30.0 + 0.587 * 60.0 + 0.114 * 90.0)).abs() < 1e-4);
    }

    #[test]
    fn test_deposit_additive_clamps() {
        let mut field = Field::new(4, 4).unwrap();
        field.deposit(1.0, 1.0, [200.0, 10.0, 0.0, 255.0], Blend::Additive);
        field.deposit(1.0, 1.0, [200.0, 10.0, 0.0, 255.0], Blend::Additive);
        assert_eq!(field.get(1.0, 1.0), [255.0, 20.0, 0.0, 255.0]);
    }

    #[test]
    fn test_deposit_subtractive_clamps() {
        let mut field = Field::with_background(4, 4, [100.0, 100.0, 100.0, 100.0]).unwrap();
        field.deposit(2.0, 3.0, [150.0, 50.0, 0.0, 0.0], Blend::Subtractive);
        assert_eq!(field.get(2.0, 3.0), [0.0, 50.0, 100.0, 100.0]);
    }

    #[test]
    fn test_deposit_overwrite_and_wrap() {
        let mut field = Field::new(5, 5).unwrap();
        field.deposit(-1.0, 5.0, [1.0, 2.0, 3.0, 4.0], Blend::Overwrite);
        assert_eq!(field.get(4.0, 0.0), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_revisit_alpha_reduces_second_visit() {
        let mut field = Field::new(3, 3).unwrap();
        let color = [255.0, 0.0, 0.0, 100.0];
        field.deposit(0.0, 0.0, color, Blend::RevisitAlpha { step: 40.0 });
        assert_eq!(field.get(0.0, 0.0)[3], 100.0);

        field.deposit(0.0, 0.0, color, Blend::RevisitAlpha { step: 40.0 });
        // second visit only adds 60
        assert_eq!(field.get(0.0, 0.0)[3], 160.0);
    }

    #[test]
    fn test_scaled_deposit() {
        let mut field = Field::new(3, 3).unwrap();
        field.deposit(1.0, 1.0, [100.0, 200.0, 50.0, 255.0], Blend::Scaled { ratio: 0.5 });
        assert_eq!(field.get(1.0, 1.0), [50.0, 100.0, 25.0, 255.0]);
    }

    #[test]
    fn test_blend_decay_never_overshoots() {
        let mut field = Field::with_background(2, 2, [255.0, 0.0, 128.0, 255.0]).unwrap();
        let decay = Decay::BlendToward {
            color: [0.0, 0.0, 0.0, 0.0],
            fraction: 0.3,
        };
        let mut prev = field.get(0.0, 0.0);
        for _ in 0..200 {
            field.decay(&decay);
            let cur = field.get(0.0, 0.0);
            for i in 0..4 {
                assert!(cur[i] <= prev[i]);
                assert!(cur[i] >= 0.0);
            }
            prev = cur;
        }
    }

    #[test]
    fn test_step_decay_reaches_target() {
        let mut field = Field::with_background(2, 2, [10.0, 250.0, 100.0, 0.0]).unwrap();
        let decay = Decay::StepToward {
            target: [100.0, 100.0, 100.0, 100.0],
            step: 7.0,
        };
        for _ in 0..50 {
            field.decay(&decay);
        }
        assert_eq!(field.get(1.0, 1.0), [100.0, 100.0, 100.0, 100.0]);
    }

    #[test]
    fn test_decay_validation() {
        assert!(Decay::default().validate().is_ok());
        assert!(Decay::BlendToward { color: [0.0; 4], fraction: 1.5 }.validate().is_err());
        assert!(Decay::StepToward { target: [0.0; 4], step: -1.0 }.validate().is_err());
        assert!(Decay::StepToward { target: [300.0, 0.0, 0.0, 0.0], step: 1.0 }
            .validate()
            .is_err());
    }

    #[test]
    fn test_stroke_paints_segment() {
        let mut field = Field::new(20, 20).unwrap();
        field.stroke((2.0, 5.0), (12.0, 5.0), 0.0, [255.0; 4], Blend::Overwrite);
        for x in 3..=12 {
            assert_eq!(field.get(x as f32, 5.0), [255.0; 4]);
        }
        // the start point belongs to the previous segment
        assert_eq!(field.get(2.0, 5.0), [0.0; 4]);
        assert_eq!(field.get(13.0, 5.0), [0.0; 4]);
        assert_eq!(field.get(5.0, 6.0), [0.0; 4]);
    }

    #[test]
    fn test_chained_strokes_paint_joints_once() {
        let mut field = Field::new(20, 20).unwrap();
        let dab = [10.0, 10.0, 10.0, 10.0];
        field.stroke((4.0, 4.0), (4.0, 4.0), 0.0, dab, Blend::Additive);
        field.stroke((4.0, 4.0), (8.0, 4.0), 0.0, dab, Blend::Additive);
        field.stroke((8.0, 4.0), (8.0, 9.0), 0.0, dab, Blend::Additive);
        for cell in [(4.0, 4.0), (6.0, 4.0), (8.0, 4.0), (8.0, 9.0)] {
            assert_eq!(field.get(cell.0, cell.1), dab);
        }
    }

    #[test]
    fn test_stroke_takes_shortest_wrapped_path() {
        let mut field = Field::new(20, 10).unwrap();
        field.stroke((18.0, 5.0), (2.0, 5.0), 0.0, [255.0; 4], Blend::Overwrite);
        for x in [19.0, 0.0, 1.0, 2.0] {
            assert_eq!(field.get(x, 5.0), [255.0; 4]);
        }
        assert_eq!(field.get(10.0, 5.0), [0.0; 4]);
    }

    #[test]
    fn test_stroke_huge_jump_is_bounded() {
        let mut field = Field::new(20, 20).unwrap();
        field.stroke((0.0, 0.0), (1.0e12, -3.0e11), 0.0, [255.0; 4], Blend::Overwrite);
        field.stroke((0.0, 0.0), (f32::INFINITY, 3.0), 0.0, [255.0; 4], Blend::Overwrite);
        let painted = field.cells().iter().filter(|&&c| c != [0.0; 4]).count();
        assert!(painted <= 41);
    }

    #[test]
    fn test_resize_resets_to_background() {
        let mut field = Field::with_background(4, 4, [9.0; 4]).unwrap();
        field.deposit(1.0, 1.0, [255.0; 4], Blend::Overwrite);
        field.resize(6, 3).unwrap();
        assert_eq!((field.width(), field.height()), (6, 3));
        assert_eq!(field.cells().len(), 18);
        assert!(field.cells().iter().all(|&c| c == [9.0; 4]));
    }

    #[test]
    fn test_stroke_radius_covers_disc() {
        let mut field = Field::new(20, 20).unwrap();
        field.stroke((10.0, 10.0), (10.0, 10.0), 2.0, [255.0; 4], Blend::Overwrite);
        assert_eq!(field.get(12.0, 10.0), [255.0; 4]);
        assert_eq!(field.get(10.0, 8.0), [255.0; 4]);
        assert_eq!(field.get(12.0, 12.0), [0.0; 4]);
    }

    #[test]
    fn test_rgba8_and_stats() {
        let mut field = Field::new(2, 1).unwrap();
        field.deposit(0.0, 0.0, [255.0, 255.0, 255.0, 255.0], Blend::Overwrite);
        assert_eq!(field.to_rgba8(), vec![255, 255, 255, 255, 0, 0, 0, 0]);
        assert_eq!(field.mean(Channel::Red), 127.5);
        assert_eq!(field.coverage(Channel::Average, 10.0), 0.5);
    }
}
