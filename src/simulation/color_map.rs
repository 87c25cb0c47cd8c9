use crate::{floating_type_mod::FT, V};

pub type Color = V<FT, 3>;

/// Piecewise linear color ramp over sorted stops; values outside the stops are clamped.
pub struct ColorMap {
    insertions: Vec<(FT, Color)>,
}

impl ColorMap {
    pub fn new(mut insertions: Vec<(FT, Color)>) -> Self {
        insertions.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { insertions }
    }

    pub fn get(&self, x: FT) -> Color {
        let (first, last) = match (self.insertions.first(), self.insertions.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Color::zeros(),
        };
        if x.is_nan() || x <= first.0 {
            return first.1;
        }
        if x >= last.0 {
            return last.1;
        }

        // stops are sorted and `first.0 < x < last.0`, so exactly one window contains x
        self.insertions
            .windows(2)
            .find(|w| x >= w[0].0 && x <= w[1].0)
            .map(|w| {
                let span = w[1].0 - w[0].0;
                if span <= 0. {
                    return w[1].1;
                }
                let interp = (x - w[0].0) / span;
                w[0].1 + interp * (w[1].1 - w[0].1)
            })
            .unwrap_or(last.1)
    }

    pub fn get_u8(&self, x: FT) -> V<u8, 3> {
        self.get(x).map(|f| (f.max(0.).min(1.) * 255.) as u8)
    }

    pub fn color_stops(&self) -> &[(FT, Color)] {
        &self.insertions
    }
}
