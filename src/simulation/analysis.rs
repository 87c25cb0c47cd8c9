//! Global flow metrics and the CSV formats they are logged in.

use std::io::Write;

use crate::{error::Result, floating_type_mod::FT, lattice_state::LatticeState};

pub const METRICS_HEADER: &str = "Step,KineticEnergy,TotalMass,Residual";
pub const PERFORMANCE_HEADER: &str = "Step,Seconds";
pub const SNAPSHOT_HEADER: &str = "x,y,rho,ux,uy,barrier";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub step: usize,
    /// Σ ½ ρ |u|² over all cells.
    pub kinetic_energy: f64,
    /// Σ ρ over all cells.
    pub total_mass: f64,
    /// Mean absolute change of (ux, uy) per cell since the previous sample.
    pub residual: f64,
}

/// Metrics of the published fields. `previous` holds the velocity fields of the last sample;
/// without one the residual is zero.
pub fn compute_metrics(state: &LatticeState, step: usize, previous: Option<(&[FT], &[FT])>) -> Metrics {
    let mut kinetic_energy = 0f64;
    let mut total_mass = 0f64;

    for i in 0..state.num_cells() {
        let rho = state.density[i] as f64;
        let ux = state.velocity_x[i] as f64;
        let uy = state.velocity_y[i] as f64;
        total_mass += rho;
        kinetic_energy += 0.5 * rho * (ux * ux + uy * uy);
    }

    let residual = match previous {
        Some((prev_x, prev_y)) if prev_x.len() == state.num_cells() && prev_y.len() == state.num_cells() => {
            let sum: f64 = (0..state.num_cells())
                .map(|i| {
                    (state.velocity_x[i] as f64 - prev_x[i] as f64).abs()
                        + (state.velocity_y[i] as f64 - prev_y[i] as f64).abs()
                })
                .sum();
            sum / state.num_cells() as f64
        }
        _ => 0.,
    };

    Metrics {
        step,
        kinetic_energy,
        total_mass,
        residual,
    }
}

/// Keeps the velocity fields between samples so consecutive samples get a residual.
#[derive(Default)]
pub struct MetricsSampler {
    previous: Option<(Vec<FT>, Vec<FT>)>,
}

impl MetricsSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, state: &LatticeState, step: usize) -> Metrics {
        let metrics = compute_metrics(
            state,
            step,
            self.previous.as_ref().map(|(x, y)| (x.as_slice(), y.as_slice())),
        );

        match &mut self.previous {
            Some((x, y)) if x.len() == state.num_cells() => {
                x.copy_from_slice(&state.velocity_x);
                y.copy_from_slice(&state.velocity_y);
            }
            previous => *previous = Some((state.velocity_x.clone(), state.velocity_y.clone())),
        }

        metrics
    }

    /// Forget the last sample, e.g. after the lattice was reset.
    pub fn clear(&mut self) {
        self.previous = None;
    }
}

/// Scientific notation with a signed two digit exponent (`1.500000e-03`).
fn format_exp(v: f64, precision: usize) -> String {
    let s = format!("{:.*e}", precision, v);
    match s.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => s,
    }
}

pub struct MetricsLog<W: Write> {
    writer: W,
}

impl<W: Write> MetricsLog<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "{}", METRICS_HEADER)?;
        Ok(MetricsLog { writer })
    }

    pub fn append(&mut self, metrics: &Metrics) -> Result<()> {
        writeln!(
            self.writer,
            "{},{:.6},{:.6},{}",
            metrics.step,
            metrics.kinetic_energy,
            metrics.total_mass,
            format_exp(metrics.residual, 6)
        )?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

pub struct PerformanceLog<W: Write> {
    writer: W,
}

impl<W: Write> PerformanceLog<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "{}", PERFORMANCE_HEADER)?;
        Ok(PerformanceLog { writer })
    }

    pub fn append(&mut self, step: usize, seconds: f64) -> Result<()> {
        writeln!(self.writer, "{},{:.6}", step, seconds)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

pub fn snapshot_file_name(step: usize) -> String {
    format!("snapshot_{:05}.csv", step)
}

/// Full-grid dump of the published fields, row by row starting at `y = 0`.
pub fn write_snapshot<W: Write>(mut writer: W, state: &LatticeState) -> Result<()> {
    writeln!(writer, "{}", SNAPSHOT_HEADER)?;
    for y in 0..state.height() {
        for x in 0..state.width() {
            let i = state.idx(x, y);
            writeln!(
                writer,
                "{},{},{:.4},{:.4},{:.4},{}",
                x,
                y,
                state.density[i],
                state.velocity_x[i],
                state.velocity_y[i],
                state.obstacle[i] as u8
            )?;
        }
    }
    writer.flush()?;
    Ok(())
}
