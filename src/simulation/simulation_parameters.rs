use std::{collections::HashMap, ops::RangeInclusive};

use serde::{Deserialize, Serialize};

use crate::{
    error::{LbmError, Result},
    floating_type_mod::FT,
    lattice_state::{LatticeState, DEFAULT_HEIGHT, DEFAULT_WIDTH},
    solver::ObstaclePopulations,
};

/// Range the configuration surface clamps the relaxation rate to. The solver itself is only
/// stable for `0 < ω < 2` and does not check anything.
pub const RELAXATION_RATE_RANGE: RangeInclusive<FT> = 0.1..=1.99;

/// Range the configuration surface clamps the inlet speed to.
pub const INLET_SPEED_RANGE: RangeInclusive<FT> = 0.0..=0.5;

pub const DEFAULT_RELAXATION_RATE: FT = 1.8;
pub const DEFAULT_INLET_SPEED: FT = 0.1;

/// Solver steps between two rendered frames.
pub const DEFAULT_STEPS_PER_FRAME: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub width: usize,
    pub height: usize,

    // BGK relaxation rate ω (viscosity = (1/ω - 1/2) / 3 in lattice units)
    pub relaxation_rate: FT,
    pub inlet_speed: FT,

    pub steps_per_frame: usize,
    pub obstacle_populations: ObstaclePopulations,
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            relaxation_rate: DEFAULT_RELAXATION_RATE,
            inlet_speed: DEFAULT_INLET_SPEED,
            steps_per_frame: DEFAULT_STEPS_PER_FRAME,
            obstacle_populations: ObstaclePopulations::Frozen,
        }
    }
}

fn clamp_to(v: FT, range: &RangeInclusive<FT>) -> FT {
    if v.is_nan() {
        *range.start()
    } else {
        v.max(*range.start()).min(*range.end())
    }
}

impl SimulationParams {
    /// Copy with the control parameters clamped into their safe ranges.
    pub fn clamped(self) -> SimulationParams {
        SimulationParams {
            relaxation_rate: clamp_to(self.relaxation_rate, &RELAXATION_RATE_RANGE),
            inlet_speed: clamp_to(self.inlet_speed, &INLET_SPEED_RANGE),
            steps_per_frame: self.steps_per_frame.max(1),
            ..self
        }
    }

    /// Kinematic viscosity in lattice units implied by the relaxation rate.
    pub fn viscosity(&self) -> FT {
        (1. / self.relaxation_rate - 0.5) / 3.
    }

    /// Reynolds number of a flow with the inlet speed around an object of `length` cells.
    pub fn reynolds_number(&self, length: FT) -> FT {
        self.inlet_speed * length / self.viscosity()
    }

    /// Hand the two control parameters to a running lattice (between steps).
    pub fn apply_to(&self, state: &mut LatticeState) {
        state.relaxation_rate = self.relaxation_rate;
        state.inlet_speed = self.inlet_speed;
    }

    pub fn from_yaml(yaml: &str) -> Result<SimulationParams> {
        let params: SimulationParams = match parse_yaml(yaml)? {
            serde_yaml::Value::Null => SimulationParams::default(),
            value => serde_yaml::from_value(value)?,
        };
        params.validate()?;
        Ok(params)
    }

    /// Parse `yaml` and replace its top-level keys by the ones found in `overwrite_yaml`.
    /// An empty overwrite changes nothing.
    pub fn from_yaml_with_overwrite(yaml: &str, overwrite_yaml: &str) -> Result<SimulationParams> {
        let mut simulation_params_serde = parse_yaml(yaml)?;
        if simulation_params_serde.is_null() {
            simulation_params_serde = serde_yaml::to_value(SimulationParams::default())?;
        }

        let overwrite_config: HashMap<String, serde_yaml::Value> = match parse_yaml(overwrite_yaml)? {
            serde_yaml::Value::Null => HashMap::new(),
            value => serde_yaml::from_value(value)?,
        };
        let mapping = simulation_params_serde
            .as_mapping_mut()
            .ok_or_else(|| LbmError::InvalidConfig("simulation parameters are not a mapping".into()))?;

        let defaults = serde_yaml::to_value(SimulationParams::default())?;
        for (k, v) in overwrite_config.into_iter() {
            let key = serde_yaml::Value::String(k.clone());
            let known = defaults.as_mapping().map_or(false, |d| d.contains_key(&key));
            if !known {
                return Err(LbmError::UnknownAttribute(k));
            }
            mapping.insert(key, v);
        }

        let params: SimulationParams = serde_yaml::from_value(simulation_params_serde)?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(LbmError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Blank documents parse as null instead of failing at end of input.
fn parse_yaml(yaml: &str) -> Result<serde_yaml::Value> {
    if yaml.trim().is_empty() {
        return Ok(serde_yaml::Value::Null);
    }
    Ok(serde_yaml::from_str(yaml)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamping_keeps_values_inside_ranges() {
        let params = SimulationParams {
            relaxation_rate: 2.5,
            inlet_speed: -0.2,
            steps_per_frame: 0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(params.relaxation_rate, 1.99);
        assert_eq!(params.inlet_speed, 0.);
        assert_eq!(params.steps_per_frame, 1);

        let params = SimulationParams {
            relaxation_rate: 0.,
            inlet_speed: 0.9,
            ..Default::default()
        }
        .clamped();
        assert_eq!(params.relaxation_rate, 0.1);
        assert_eq!(params.inlet_speed, 0.5);

        let params = SimulationParams {
            relaxation_rate: FT::NAN,
            ..Default::default()
        }
        .clamped();
        assert_eq!(params.relaxation_rate, 0.1);
    }

    #[test]
    fn values_inside_ranges_are_untouched() {
        let params = SimulationParams::default();
        assert_eq!(params.clamped(), params);
    }

    #[test]
    fn empty_mapping_gives_defaults() {
        let params = SimulationParams::from_yaml("{}").unwrap();
        assert_eq!(params, SimulationParams::default());
        assert_eq!(params.width, 200);
        assert_eq!(params.height, 100);
    }

    #[test]
    fn yaml_fields_are_read() {
        let yaml = "width: 64\nheight: 32\nrelaxation_rate: 1.2\ninlet_speed: 0.05\nobstacle_populations: ResetToRest\n";
        let params = SimulationParams::from_yaml(yaml).unwrap();
        assert_eq!(params.width, 64);
        assert_eq!(params.height, 32);
        assert_eq!(params.relaxation_rate, 1.2);
        assert_eq!(params.inlet_speed, 0.05);
        assert_eq!(params.steps_per_frame, DEFAULT_STEPS_PER_FRAME);
        assert_eq!(params.obstacle_populations, ObstaclePopulations::ResetToRest);
    }

    #[test]
    fn overwrite_replaces_keys() {
        let params = SimulationParams::from_yaml_with_overwrite("width: 64\nheight: 32\n", "height: 16\ninlet_speed: 0.2\n")
            .unwrap();
        assert_eq!(params.width, 64);
        assert_eq!(params.height, 16);
        assert_eq!(params.inlet_speed, 0.2);
    }

    #[test]
    fn empty_overwrite_changes_nothing() {
        for overwrite in ["", "\n", "~\n"] {
            let params = SimulationParams::from_yaml_with_overwrite("width: 64\n", overwrite).unwrap();
            assert_eq!(params.width, 64);
            assert_eq!(params.height, 100);
        }
        assert_eq!(SimulationParams::from_yaml("").unwrap(), SimulationParams::default());
    }

    #[test]
    fn overwrite_rejects_unknown_keys() {
        let result = SimulationParams::from_yaml_with_overwrite("width: 64\n", "viscosity: 0.1\n");
        assert!(matches!(result, Err(LbmError::UnknownAttribute(k)) if k == "viscosity"));
    }

    #[test]
    fn zero_sized_lattice_is_rejected() {
        assert!(matches!(
            SimulationParams::from_yaml("width: 0\n"),
            Err(LbmError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn yaml_round_trip() {
        let params = SimulationParams {
            width: 10,
            relaxation_rate: 1.5,
            ..Default::default()
        };
        let yaml = params.to_yaml().unwrap();
        assert_eq!(SimulationParams::from_yaml(&yaml).unwrap(), params);
    }

    #[test]
    fn viscosity_follows_relaxation_rate() {
        let params = SimulationParams {
            relaxation_rate: 1.,
            ..Default::default()
        };
        crate::assert_ft_approx_eq(params.viscosity(), 1. / 6., 1e-6, || "viscosity".to_string());
        crate::assert_ft_approx_eq(params.reynolds_number(24.), 0.1 * 24. * 6., 1e-3, || "reynolds".to_string());
    }

    #[test]
    fn parameters_reach_the_lattice() {
        let mut state = LatticeState::new(4, 4, 1.0, 0.0).unwrap();
        SimulationParams::default().apply_to(&mut state);
        assert_eq!(state.relaxation_rate, DEFAULT_RELAXATION_RATE);
        assert_eq!(state.inlet_speed, DEFAULT_INLET_SPEED);
    }
}
