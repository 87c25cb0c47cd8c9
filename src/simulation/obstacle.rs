//! Solid obstacles: analytic shapes rasterized into the obstacle mask, a square brush for
//! interactive painting and a few preset scenes.

use std::str::FromStr;

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::{
    error::{LbmError, Result},
    floating_type_mod::FT,
    lattice_state::LatticeState,
    vec2f, V2,
};

/// A shape given by its signed distance, negative inside.
#[enum_dispatch]
pub trait ObstacleShape {
    fn probe(&self, p: V2) -> FT;

    /// Axis aligned bounds (min, max) that contain every covered cell.
    fn bounds(&self) -> (V2, V2);

    fn covers(&self, x: usize, y: usize) -> bool {
        self.probe(vec2f(x as FT, y as FT)) <= 0.
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: V2,
    pub radius: FT,
}

impl ObstacleShape for Circle {
    fn probe(&self, p: V2) -> FT {
        (p - self.center).norm() - self.radius
    }

    fn bounds(&self) -> (V2, V2) {
        let r = vec2f(self.radius, self.radius);
        (self.center - r, self.center + r)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Square {
    pub center: V2,
    pub half_size: FT,
}

fn box_distance(p: V2, center: V2, half_extents: V2) -> FT {
    let d = (p - center).abs() - half_extents;
    let outside = d.map(|v| v.max(0.)).norm();
    let inside = d.x.max(d.y).min(0.);
    outside + inside
}

impl ObstacleShape for Square {
    fn probe(&self, p: V2) -> FT {
        box_distance(p, self.center, vec2f(self.half_size, self.half_size))
    }

    fn bounds(&self) -> (V2, V2) {
        let h = vec2f(self.half_size, self.half_size);
        (self.center - h, self.center + h)
    }
}

/// A wall of `thickness` columns starting at column `x`, covering rows `y_min..=y_max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerticalWall {
    pub x: FT,
    pub y_min: FT,
    pub y_max: FT,
    pub thickness: FT,
}

impl VerticalWall {
    fn center_and_half_extents(&self) -> (V2, V2) {
        let half_width = ((self.thickness - 1.) * 0.5).max(0.);
        let half_height = (self.y_max - self.y_min).abs() * 0.5;
        let center = vec2f(self.x + half_width, (self.y_min + self.y_max) * 0.5);
        (center, vec2f(half_width, half_height))
    }
}

impl ObstacleShape for VerticalWall {
    fn probe(&self, p: V2) -> FT {
        let (center, half_extents) = self.center_and_half_extents();
        box_distance(p, center, half_extents)
    }

    fn bounds(&self) -> (V2, V2) {
        let (center, half_extents) = self.center_and_half_extents();
        (center - half_extents, center + half_extents)
    }
}

#[enum_dispatch(ObstacleShape)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Obstacle {
    Circle(Circle),
    Square(Square),
    VerticalWall(VerticalWall),
}

/// Inclusive cell range `[lo, hi]` of one axis clipped to `0..len`, `None` if empty.
fn clip_axis(lo: FT, hi: FT, len: usize) -> Option<(usize, usize)> {
    let lo = lo.floor().max(0.);
    let hi = hi.ceil().min(len as FT - 1.);
    if !(lo <= hi) {
        return None;
    }
    Some((lo as usize, hi as usize))
}

/// Mark every grid cell covered by `shape` as solid. Returns the number of covered cells.
pub fn place_obstacle(state: &mut LatticeState, shape: &impl ObstacleShape) -> usize {
    let (min, max) = shape.bounds();
    let (x_range, y_range) = match (
        clip_axis(min.x, max.x, state.width()),
        clip_axis(min.y, max.y, state.height()),
    ) {
        (Some(x_range), Some(y_range)) => (x_range, y_range),
        _ => return 0,
    };

    let mut count = 0;
    for y in y_range.0..=y_range.1 {
        for x in x_range.0..=x_range.1 {
            if shape.covers(x, y) {
                state.set_obstacle(x, y, true);
                count += 1;
            }
        }
    }
    count
}

/// Brush radius of the interactive painter (a 3x3 stamp).
pub const DEFAULT_BRUSH_RADIUS: usize = 1;

/// Set (or clear) the square `[x - radius, x + radius] x [y - radius, y + radius]`, clipped
/// to the grid. Returns the number of touched cells.
pub fn paint_brush(state: &mut LatticeState, x: i64, y: i64, radius: usize, solid: bool) -> usize {
    let r = radius as i64;
    let mut count = 0;
    for ny in y - r..=y + r {
        for nx in x - r..=x + r {
            if state.checked_idx(nx, ny).is_some() {
                state.set_obstacle(nx as usize, ny as usize, solid);
                count += 1;
            }
        }
    }
    count
}

/// Like [`paint_brush`], but reports strokes outside the grid as an error.
pub fn paint_brush_checked(state: &mut LatticeState, x: i64, y: i64, radius: usize, solid: bool) -> Result<usize> {
    if state.checked_idx(x, y).is_none() {
        return Err(LbmError::OutOfGrid {
            x,
            y,
            width: state.width(),
            height: state.height(),
        });
    }
    Ok(paint_brush(state, x, y, radius, solid))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenePreset {
    Cylinder,
    Square,
    Wall,
    Empty,
}

pub const ALL_SCENE_PRESETS: [ScenePreset; 4] = [
    ScenePreset::Cylinder,
    ScenePreset::Square,
    ScenePreset::Wall,
    ScenePreset::Empty,
];

impl ScenePreset {
    pub fn name(self) -> &'static str {
        match self {
            ScenePreset::Cylinder => "cylinder",
            ScenePreset::Square => "square",
            ScenePreset::Wall => "wall",
            ScenePreset::Empty => "empty",
        }
    }

    /// Obstacles of this preset, sized relative to the lattice.
    pub fn obstacles(self, width: usize, height: usize) -> Vec<Obstacle> {
        let center = vec2f((width / 3) as FT, (height / 2) as FT);
        let h = height as FT;

        match self {
            ScenePreset::Cylinder => vec![Circle {
                center,
                radius: h * 0.12,
            }
            .into()],
            ScenePreset::Square => vec![Square {
                center,
                half_size: h * 0.1,
            }
            .into()],
            ScenePreset::Wall => vec![VerticalWall {
                x: center.x,
                y_min: (h * 0.3).round(),
                y_max: (h * 0.7).round(),
                thickness: 2.,
            }
            .into()],
            ScenePreset::Empty => vec![],
        }
    }
}

impl FromStr for ScenePreset {
    type Err = LbmError;

    fn from_str(s: &str) -> Result<Self> {
        ALL_SCENE_PRESETS
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| LbmError::UnknownPreset(s.to_string()))
    }
}
