use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    color_map::ColorMap,
    concurrency::par_iter_mut1,
    error::{LbmError, Result},
    floating_type_mod::FT,
    lattice_state::LatticeState,
    vec3f,
};

/// Color of solid cells.
pub const OBSTACLE_COLOR: [u8; 3] = [255, 100, 100];

/// Gain of the classic speed ramp: a speed of 255/2000 saturates the channel.
pub const CLASSIC_GAIN: FT = 2000.;

pub fn color_map_inferno(min: FT, max: FT) -> ColorMap {
    let stops: [(FT, [FT; 3]); 9] = [
        (0.0, [0.0015, 0.0005, 0.0139]),
        (2. / 15., [0.1424, 0.0462, 0.3086]),
        (4. / 15., [0.3665, 0.0716, 0.4320]),
        (6. / 15., [0.5783, 0.1480, 0.4044]),
        (8. / 15., [0.7805, 0.2433, 0.2995]),
        (10. / 15., [0.9296, 0.4115, 0.1454]),
        (12. / 15., [0.9876, 0.6453, 0.0399]),
        (14. / 15., [0.9500, 0.9034, 0.3803]),
        (1.0, [0.9884, 0.9984, 0.6449]),
    ];

    ColorMap::new(
        stops
            .iter()
            .map(|&(t, [r, g, b])| (min + (max - min) * t, vec3f(r, g, b)))
            .collect(),
    )
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum VisualizedAttribute {
    Speed,
    Density,
    VelocityX,
    VelocityY,
}

pub const ALL_VISUALIZED_ATTRIBUTES: [VisualizedAttribute; 4] = [
    VisualizedAttribute::Speed,
    VisualizedAttribute::Density,
    VisualizedAttribute::VelocityX,
    VisualizedAttribute::VelocityY,
];

impl VisualizedAttribute {
    pub fn name(self) -> &'static str {
        match self {
            VisualizedAttribute::Speed => "speed",
            VisualizedAttribute::Density => "density",
            VisualizedAttribute::VelocityX => "velocity-x",
            VisualizedAttribute::VelocityY => "velocity-y",
        }
    }

    /// Value range the inferno ramp spans for this attribute.
    pub fn default_range(self) -> (FT, FT) {
        match self {
            VisualizedAttribute::Speed => (0., 0.2),
            VisualizedAttribute::Density => (0.95, 1.05),
            VisualizedAttribute::VelocityX => (-0.1, 0.2),
            VisualizedAttribute::VelocityY => (-0.1, 0.1),
        }
    }

    pub fn value(self, state: &LatticeState, i: usize) -> FT {
        let ux = state.velocity_x[i];
        let uy = state.velocity_y[i];
        match self {
            VisualizedAttribute::Speed => (ux * ux + uy * uy).sqrt(),
            VisualizedAttribute::Density => state.density[i],
            VisualizedAttribute::VelocityX => ux,
            VisualizedAttribute::VelocityY => uy,
        }
    }
}

impl FromStr for VisualizedAttribute {
    type Err = LbmError;

    fn from_str(s: &str) -> Result<Self> {
        ALL_VISUALIZED_ATTRIBUTES
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| LbmError::UnknownAttribute(s.to_string()))
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ColorScheme {
    /// Black to cyan ramp of the magnitude, saturating early.
    Classic,
    Inferno,
}

impl FromStr for ColorScheme {
    type Err = LbmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "classic" => Ok(ColorScheme::Classic),
            "inferno" => Ok(ColorScheme::Inferno),
            _ => Err(LbmError::UnknownAttribute(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualizationParams {
    pub visualized_attribute: VisualizedAttribute,
    pub color_scheme: ColorScheme,
    /// Overrides [`VisualizedAttribute::default_range`] for the inferno ramp.
    #[serde(default)]
    pub range: Option<(FT, FT)>,
}

impl Default for VisualizationParams {
    fn default() -> Self {
        Self {
            visualized_attribute: VisualizedAttribute::Speed,
            color_scheme: ColorScheme::Classic,
            range: None,
        }
    }
}

fn classic_color(magnitude: FT) -> [u8; 3] {
    // `min` would turn NaN into 255
    if magnitude.is_nan() {
        return [0, 0, 50];
    }
    let v = (magnitude * CLASSIC_GAIN).min(255.) as u8;
    [0, v, v / 2 + 50]
}

/// RGB bytes of the whole lattice, `width * height * 3` values. Pixel row `r` shows
/// lattice row `y = r`.
pub fn render_rgb(state: &LatticeState, params: VisualizationParams) -> Vec<u8> {
    let attr = params.visualized_attribute;
    let color_map = match params.color_scheme {
        ColorScheme::Inferno => {
            let (min, max) = params.range.unwrap_or_else(|| attr.default_range());
            Some(color_map_inferno(min, max))
        }
        ColorScheme::Classic => None,
    };

    let mut pixels = vec![[0u8; 3]; state.num_cells()];
    par_iter_mut1(&mut pixels, |i, pixel| {
        if state.obstacle[i] {
            *pixel = OBSTACLE_COLOR;
            return;
        }

        let value = attr.value(state, i);
        *pixel = match &color_map {
            Some(color_map) => {
                let c = color_map.get_u8(value);
                [c.x, c.y, c.z]
            }
            None => {
                let magnitude = match attr {
                    VisualizedAttribute::Density => (value - 1.).abs(),
                    _ => value.abs(),
                };
                classic_color(magnitude)
            }
        };
    });

    pixels.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_ramp_matches_reference_look() {
        assert_eq!(classic_color(0.), [0, 0, 50]);
        assert_eq!(classic_color(0.05), [0, 100, 100]);
        assert_eq!(classic_color(1.), [0, 255, 177]);
        assert_eq!(classic_color(FT::NAN), [0, 0, 50]);
    }

    #[test]
    fn diverged_cells_render_dark() {
        let mut state = LatticeState::new(3, 1, 1.0, 0.1).unwrap();
        state.velocity_x[1] = FT::NAN;
        let rgb = render_rgb(&state, VisualizationParams::default());
        assert_eq!(&rgb[3..6], &[0, 0, 50]);
    }

    #[test]
    fn rendering_covers_every_cell_in_grid_order() {
        let mut state = LatticeState::new(4, 3, 1.0, 0.1).unwrap();
        state.set_obstacle(1, 2, true);
        let i = state.idx(3, 0);
        state.velocity_x[i] = 0.05;

        let rgb = render_rgb(&state, VisualizationParams::default());
        assert_eq!(rgb.len(), 4 * 3 * 3);

        let pixel = |x: usize, y: usize| {
            let p = (y * 4 + x) * 3;
            [rgb[p], rgb[p + 1], rgb[p + 2]]
        };
        assert_eq!(pixel(1, 2), OBSTACLE_COLOR);
        assert_eq!(pixel(3, 0), [0, 100, 100]);
        assert_eq!(pixel(0, 0), [0, 0, 50]);
    }

    #[test]
    fn inferno_uses_the_attribute_range() {
        let mut state = LatticeState::new(2, 1, 1.0, 0.1).unwrap();
        state.velocity_y[1] = 0.1;
        let params = VisualizationParams {
            visualized_attribute: VisualizedAttribute::VelocityY,
            color_scheme: ColorScheme::Inferno,
            range: None,
        };
        let rgb = render_rgb(&state, params);
        let top = color_map_inferno(0., 1.).get_u8(1.);
        assert_eq!(&rgb[3..6], &[top.x, top.y, top.z]);
        assert_ne!(&rgb[0..3], &rgb[3..6]);
    }

    #[test]
    fn attribute_names_parse() {
        assert_eq!("speed".parse::<VisualizedAttribute>().unwrap(), VisualizedAttribute::Speed);
        assert_eq!(
            "Velocity-X".parse::<VisualizedAttribute>().unwrap(),
            VisualizedAttribute::VelocityX
        );
        assert!(matches!(
            "pressure".parse::<VisualizedAttribute>(),
            Err(LbmError::UnknownAttribute(_))
        ));
        assert_eq!("inferno".parse::<ColorScheme>().unwrap(), ColorScheme::Inferno);
    }
}
