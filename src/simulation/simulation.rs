use std::fmt::Display;

use num_traits::Float;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    analysis::Metrics,
    error::Result,
    floating_type_mod::FT,
    lattice_state::LatticeState,
    obstacle::{paint_brush, place_obstacle, Obstacle, ScenePreset, DEFAULT_BRUSH_RADIUS},
    simulation_parameters::SimulationParams,
    solver,
    statistics::{PerformanceCounters, ValueCounters},
};

/// Obstacles of a scene. Parsed from the scene yaml file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

impl SceneConfig {
    pub fn from_preset(preset: ScenePreset, width: usize, height: usize) -> SceneConfig {
        SceneConfig {
            obstacles: preset.obstacles(width, height),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<SceneConfig> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// A lattice together with the parameters that drive it and its step counters.
pub struct LbmSimulation {
    pub state: LatticeState,
    params: SimulationParams,
    step_number: usize,

    pub pcounters: PerformanceCounters,
    pub vcounters: ValueCounters,
}

impl LbmSimulation {
    pub fn new(params: SimulationParams, counters_enabled: bool) -> Result<LbmSimulation> {
        let params = params.clamped();
        let state = LatticeState::new(params.width, params.height, params.relaxation_rate, params.inlet_speed)?;

        Ok(LbmSimulation {
            state,
            params,
            step_number: 0,
            pcounters: PerformanceCounters::new(counters_enabled),
            vcounters: ValueCounters::new(counters_enabled),
        })
    }

    pub fn params(&self) -> SimulationParams {
        self.params
    }

    /// Number of completed solver steps.
    pub fn step_number(&self) -> usize {
        self.step_number
    }

    /// Replace the control parameters between two steps. The values are clamped into their
    /// safe ranges; the lattice size cannot change here.
    pub fn set_params(&mut self, params: SimulationParams) {
        let params = SimulationParams {
            width: self.params.width,
            height: self.params.height,
            ..params.clamped()
        };
        params.apply_to(&mut self.state);
        self.params = params;
    }

    pub fn set_relaxation_rate(&mut self, relaxation_rate: FT) {
        self.set_params(SimulationParams {
            relaxation_rate,
            ..self.params
        });
    }

    pub fn set_inlet_speed(&mut self, inlet_speed: FT) {
        self.set_params(SimulationParams {
            inlet_speed,
            ..self.params
        });
    }

    pub fn single_step(&mut self) {
        self.pcounters.begin("simulation-step");
        solver::step(&mut self.state, self.params.obstacle_populations);
        self.pcounters.end("simulation-step");
        self.step_number += 1;
    }

    /// The steps between two rendered frames.
    pub fn run_frame(&mut self) {
        self.pcounters.begin("frame");
        for _ in 0..self.params.steps_per_frame {
            self.single_step();
        }
        self.pcounters.end("frame");
    }

    pub fn place_obstacles(&mut self, obstacles: &[Obstacle]) -> usize {
        obstacles.iter().map(|o| place_obstacle(&mut self.state, o)).sum()
    }

    /// One stroke of the obstacle brush at `(x, y)`.
    pub fn paint(&mut self, x: i64, y: i64, solid: bool) -> usize {
        paint_brush(&mut self.state, x, y, DEFAULT_BRUSH_RADIUS, solid)
    }

    /// Back to rest equilibrium and step 0.
    pub fn reset(&mut self, keep_obstacles: bool) {
        self.state.reset(keep_obstacles);
        self.step_number = 0;
    }

    pub fn record_metrics(&mut self, metrics: &Metrics) {
        self.vcounters.add_value("kinetic-energy", metrics.kinetic_energy as FT);
        self.vcounters.add_value("total-mass", metrics.total_mass as FT);
        self.vcounters.add_value("residual", metrics.residual as FT);
    }
}

pub fn init_lbm_sim(params: SimulationParams, scene: &SceneConfig, counters_enabled: bool) -> Result<LbmSimulation> {
    let mut sim = LbmSimulation::new(params, counters_enabled)?;
    let solid_cells = sim.place_obstacles(&scene.obstacles);

    debug!(
        width = sim.params.width,
        height = sim.params.height,
        relaxation_rate = sim.params.relaxation_rate as f64,
        inlet_speed = sim.params.inlet_speed as f64,
        obstacles = scene.obstacles.len(),
        solid_cells,
        "initialized lattice"
    );

    Ok(sim)
}

pub fn is_ft_approx_eq<FT: Float>(a: FT, b: FT, tolerance: FT) -> bool {
    assert!(!a.is_nan());
    assert!(!b.is_nan());
    b <= a + tolerance && b >= a - tolerance
}

pub fn assert_ft_approx_eq<FT: Float + Display>(a: FT, b: FT, tolerance: FT, s: impl FnOnce() -> String) {
    if !is_ft_approx_eq(a, b, tolerance) {
        panic!(
            "{} value not equal with a tolerance of {}:\n\ta={}\n\tb={}\n",
            s(),
            tolerance,
            a,
            b
        );
    }
}
