//! One time step of the D2Q9 lattice: pull streaming, moments, inlet, BGK collision.

use serde::{Deserialize, Serialize};

use crate::{
    concurrency::par_chunks_mut4,
    floating_type_mod::FT,
    lattice::{equilibrium, CX, CY, OPP, Q, W},
    lattice_state::{LatticeState, StepView},
};

/// What happens to the populations stored at solid cells during a step.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ObstaclePopulations {
    /// Solid cells are skipped: their scratch entries are not written, so whatever they held
    /// before becoming solid keeps being swapped back and forth. Published moments are left
    /// untouched.
    Frozen,

    /// Solid cells are reset to the rest equilibrium every step and publish density 1 and zero
    /// velocity.
    ResetToRest,
}

impl Default for ObstaclePopulations {
    fn default() -> Self {
        ObstaclePopulations::Frozen
    }
}

/// Pull the nine populations that stream into `(x, y)` from the current buffer.
///
/// Out-of-grid neighbors contribute the rest weight `W[k]`; a solid neighbor reflects this
/// cell's own population in the opposite direction (mid-link bounce-back).
#[inline]
pub fn gather(current: &[FT], obstacle: &[bool], width: usize, height: usize, x: usize, y: usize) -> [FT; Q] {
    let i = y * width + x;
    let mut gathered = [0.; Q];

    for k in 0..Q {
        let nx = x as i64 - CX[k] as i64;
        let ny = y as i64 - CY[k] as i64;

        gathered[k] = if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
            W[k]
        } else {
            let n = ny as usize * width + nx as usize;
            if obstacle[n] {
                current[i * Q + OPP[k]]
            } else {
                current[n * Q + k]
            }
        };
    }

    gathered
}

/// Density and momentum of a set of populations.
#[inline]
pub fn moments(f: &[FT; Q]) -> (FT, FT, FT) {
    let mut rho = 0.;
    let mut mx = 0.;
    let mut my = 0.;
    for k in 0..Q {
        rho += f[k];
        mx += f[k] * CX[k] as FT;
        my += f[k] * CY[k] as FT;
    }
    (rho, mx, my)
}

/// Advance `state` by exactly one time step.
///
/// All cells read only the pre-step buffer; the buffers swap after the whole grid has been
/// processed. Any relaxation rate and inlet speed are accepted; outside `0 < ω < 2` the
/// result diverges instead of failing.
pub fn step(state: &mut LatticeState, obstacle_populations: ObstaclePopulations) {
    let view = state.step_view();
    sweep(view, obstacle_populations);
    state.swap_buffers();
}

fn sweep(view: StepView<'_>, obstacle_populations: ObstaclePopulations) {
    let StepView {
        width,
        height,
        current,
        scratch,
        density,
        velocity_x,
        velocity_y,
        obstacle,
        relaxation_rate: omega,
        inlet_speed,
    } = view;

    par_chunks_mut4(
        scratch,
        width * Q,
        density,
        velocity_x,
        velocity_y,
        width,
        |y, scratch_row, density_row, ux_row, uy_row| {
            for x in 0..width {
                let i = y * width + x;
                let out = &mut scratch_row[x * Q..(x + 1) * Q];

                if obstacle[i] {
                    if obstacle_populations == ObstaclePopulations::ResetToRest {
                        out.copy_from_slice(&W);
                        density_row[x] = 1.;
                        ux_row[x] = 0.;
                        uy_row[x] = 0.;
                    }
                    continue;
                }

                let gathered = gather(current, obstacle, width, height, x, y);
                out.copy_from_slice(&gathered);

                let (mut rho, mx, my) = moments(&gathered);
                let (mut ux, mut uy) = (ux_row[x], uy_row[x]);
                if rho > 0. {
                    ux = mx / rho;
                    uy = my / rho;
                }

                if x == 0 {
                    ux = inlet_speed;
                    uy = 0.;
                    rho = 1.;
                }

                density_row[x] = rho;
                ux_row[x] = ux;
                uy_row[x] = uy;

                for k in 0..Q {
                    let f_eq = equilibrium(k, rho, ux, uy);
                    out[k] = (1. - omega) * out[k] + omega * f_eq;
                }
            }
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert_ft_approx_eq, lattice::equilibrium_all};

    fn rest_state(width: usize, height: usize, omega: FT, inlet_speed: FT) -> LatticeState {
        LatticeState::new(width, height, omega, inlet_speed).unwrap()
    }

    #[test]
    fn interior_density_is_kept_after_one_step() {
        let mut state = rest_state(20, 10, 1.8, 0.1);
        step(&mut state, ObstaclePopulations::Frozen);

        for y in 0..10 {
            for x in 1..20 {
                let i = state.idx(x, y);
                assert_ft_approx_eq(state.density[i], 1.0, 1e-5, || format!("density at ({}, {})", x, y));
            }
        }
    }

    #[test]
    fn inlet_column_is_forced_exactly() {
        let mut state = rest_state(16, 8, 1.2, 0.07);
        for n in 0..25 {
            step(&mut state, ObstaclePopulations::Frozen);
            for y in 0..8 {
                let i = state.idx(0, y);
                assert_eq!(state.velocity_x[i], 0.07, "step {} row {}", n, y);
                assert_eq!(state.velocity_y[i], 0., "step {} row {}", n, y);
                assert_eq!(state.density[i], 1., "step {} row {}", n, y);
            }
        }
    }

    #[test]
    fn inlet_speed_change_applies_on_next_step() {
        let mut state = rest_state(8, 4, 1.0, 0.1);
        step(&mut state, ObstaclePopulations::Frozen);
        state.inlet_speed = 0.25;
        step(&mut state, ObstaclePopulations::Frozen);
        assert_eq!(state.velocity_x[state.idx(0, 2)], 0.25);
    }

    #[test]
    fn solid_neighbor_reflects_own_opposite_population() {
        let mut state = rest_state(5, 5, 1.0, 0.);
        state.set_obstacle(3, 2, true);

        let cell = state.idx(2, 2);
        let injected: [FT; Q] = [0.40, 0.11, 0.12, 0.13, 0.14, 0.021, 0.022, 0.023, 0.024];
        state.cell_populations_mut(cell).copy_from_slice(&injected);

        let gathered = gather(state.populations(), &state.obstacle, 5, 5, 2, 2);

        // direction 3 (west) is pulled from the east neighbor (3, 2), which is solid
        assert_eq!(gathered[3], injected[OPP[3]]);
        assert_eq!(gathered[3], injected[1]);

        // the rest population is the cell's own, all other neighbors are fluid at rest
        assert_eq!(gathered[0], injected[0]);
        for k in [1, 2, 4, 5, 6, 7, 8] {
            assert_eq!(gathered[k], W[k], "direction {}", k);
        }
    }

    #[test]
    fn diagonal_solid_neighbor_reflects_diagonal() {
        let mut state = rest_state(5, 5, 1.0, 0.);
        // (1, 1) is the source of direction 5 (north-east) for cell (2, 2)
        state.set_obstacle(1, 1, true);

        let cell = state.idx(2, 2);
        state.cell_populations_mut(cell)[OPP[5]] = 0.5;

        let gathered = gather(state.populations(), &state.obstacle, 5, 5, 2, 2);
        assert_eq!(gathered[5], 0.5);
    }

    #[test]
    fn bounce_back_value_reaches_next_buffer() {
        // ω = 0 disables collision, so the scratch buffer holds the pure streamed values
        let mut state = rest_state(5, 5, 0., 0.);
        state.set_obstacle(2, 3, true);

        let cell = state.idx(2, 2);
        state.cell_populations_mut(cell)[OPP[4]] = 0.3;

        step(&mut state, ObstaclePopulations::Frozen);
        // direction 4 (south) streams from (2, 3), which is solid
        assert_eq!(state.cell_populations(cell)[4], 0.3);
    }

    #[test]
    fn out_of_grid_neighbors_contribute_rest_weights() {
        let mut state = rest_state(3, 3, 1.0, 0.);
        for cell in 0..state.num_cells() {
            state.cell_populations_mut(cell).iter_mut().for_each(|f| *f = 0.9);
        }

        let gathered = gather(state.populations(), &state.obstacle, 3, 3, 0, 0);
        for k in 0..Q {
            let from_outside = CX[k] > 0 || CY[k] > 0;
            let expected = if from_outside { W[k] } else { 0.9 };
            assert_eq!(gathered[k], expected, "direction {}", k);
        }
    }

    #[test]
    fn rest_equilibrium_is_a_fixed_point() {
        let mut state = rest_state(24, 12, 1.7, 0.);
        for _ in 0..1000 {
            step(&mut state, ObstaclePopulations::Frozen);
        }

        for i in 0..state.num_cells() {
            assert_ft_approx_eq(state.density[i], 1.0, 1e-4, || format!("density[{}]", i));
            assert_ft_approx_eq(state.velocity_x[i], 0.0, 1e-5, || format!("ux[{}]", i));
            assert_ft_approx_eq(state.velocity_y[i], 0.0, 1e-5, || format!("uy[{}]", i));
        }
    }

    #[test]
    fn published_moments_match_populations() {
        let mut state = rest_state(30, 15, 1.5, 0.1);
        state.set_obstacle(10, 7, true);
        for _ in 0..40 {
            step(&mut state, ObstaclePopulations::Frozen);
        }

        // after collision the populations carry the published density (collision conserves it)
        for y in 0..15 {
            for x in 1..30 {
                let i = state.idx(x, y);
                if state.obstacle[i] {
                    continue;
                }
                let f: &[FT] = state.cell_populations(i);
                let rho: FT = f.iter().sum();
                assert_ft_approx_eq(rho, state.density[i], 1e-4, || format!("density at ({}, {})", x, y));
            }
        }
    }

    #[test]
    fn frozen_obstacle_keeps_its_populations() {
        let mut state = rest_state(6, 6, 1.0, 0.1);
        state.set_obstacle(3, 3, true);
        let cell = state.idx(3, 3);

        for _ in 0..7 {
            step(&mut state, ObstaclePopulations::Frozen);
            assert_eq!(state.cell_populations(cell), &W[..]);
            assert_eq!(state.velocity_x[cell], 0.);
        }
    }

    #[test]
    fn reset_policy_restores_rest_equilibrium_on_new_obstacles() {
        let mut frozen = rest_state(12, 6, 1.0, 0.1);
        let mut reset = rest_state(12, 6, 1.0, 0.1);
        for _ in 0..10 {
            step(&mut frozen, ObstaclePopulations::Frozen);
            step(&mut reset, ObstaclePopulations::ResetToRest);
        }

        frozen.set_obstacle(2, 3, true);
        reset.set_obstacle(2, 3, true);
        let cell = reset.idx(2, 3);

        step(&mut frozen, ObstaclePopulations::Frozen);
        step(&mut reset, ObstaclePopulations::ResetToRest);
        step(&mut frozen, ObstaclePopulations::Frozen);
        step(&mut reset, ObstaclePopulations::ResetToRest);

        assert_eq!(reset.cell_populations(cell), &W[..]);
        assert_eq!(reset.density[cell], 1.);
        assert_ne!(frozen.cell_populations(cell), &W[..]);
    }

    #[test]
    fn non_positive_density_keeps_prior_velocity() {
        // a fluid cell walled in on all sides with all populations drained
        let mut state = rest_state(3, 3, 1.0, 0.);
        for cell in 0..state.num_cells() {
            state.cell_populations_mut(cell).iter_mut().for_each(|f| *f = 0.);
        }
        for y in 0..3 {
            for x in 0..3 {
                if (x, y) != (1, 1) {
                    state.set_obstacle(x, y, true);
                }
            }
        }
        let center = state.idx(1, 1);
        state.velocity_x[center] = 0.02;
        state.velocity_y[center] = -0.01;

        step(&mut state, ObstaclePopulations::Frozen);
        assert_eq!(state.density[center], 0.);
        assert_eq!(state.velocity_x[center], 0.02);
        assert_eq!(state.velocity_y[center], -0.01);
    }

    #[test]
    fn collision_relaxes_toward_equilibrium() {
        // a single interior cell with a perturbed population relaxes with ω = 1 onto f_eq
        let mut state = rest_state(3, 3, 1.0, 0.);
        let center = state.idx(1, 1);
        // population streaming into the center from the west neighbor
        let west = state.idx(0, 1);
        state.cell_populations_mut(west)[1] = W[1] + 0.05;

        step(&mut state, ObstaclePopulations::Frozen);

        let rho = state.density[center];
        let ux = state.velocity_x[center];
        let uy = state.velocity_y[center];
        assert!(ux > 0.);

        let expected = equilibrium_all(rho, ux, uy);
        for k in 0..Q {
            assert_ft_approx_eq(state.cell_populations(center)[k], expected[k], 1e-6, || format!("f[{}]", k));
        }
    }

    /// Cell-by-cell sequential step, compared bit for bit against the row-parallel sweep.
    fn reference_step(state: &LatticeState) -> (Vec<FT>, Vec<FT>, Vec<FT>, Vec<FT>) {
        let (width, height) = (state.width(), state.height());
        let omega = state.relaxation_rate;
        let mut next = state.populations().to_vec();
        let mut density = state.density.clone();
        let mut ux_out = state.velocity_x.clone();
        let mut uy_out = state.velocity_y.clone();

        for y in 0..height {
            for x in 0..width {
                let i = state.idx(x, y);
                if state.obstacle[i] {
                    continue;
                }
                let f = gather(state.populations(), &state.obstacle, width, height, x, y);
                let (mut rho, mx, my) = moments(&f);
                let (mut ux, mut uy) = (ux_out[i], uy_out[i]);
                if rho > 0. {
                    ux = mx / rho;
                    uy = my / rho;
                }
                if x == 0 {
                    ux = state.inlet_speed;
                    uy = 0.;
                    rho = 1.;
                }
                density[i] = rho;
                ux_out[i] = ux;
                uy_out[i] = uy;
                for k in 0..Q {
                    next[i * Q + k] = (1. - omega) * f[k] + omega * equilibrium(k, rho, ux, uy);
                }
            }
        }
        (next, density, ux_out, uy_out)
    }

    #[test]
    fn parallel_sweep_matches_sequential_reference() {
        let mut state = rest_state(23, 11, 1.7, 0.08);
        state.set_obstacle(7, 5, true);
        state.set_obstacle(8, 5, true);
        state.set_obstacle(8, 6, true);
        // solid cells keep rest populations in both buffers
        let fluid_cells: Vec<usize> = (0..state.num_cells()).filter(|&c| !state.obstacle[c]).collect();
        for cell in fluid_cells {
            for k in 0..Q {
                let wobble = ((cell * 7 + k * 3) % 11) as FT * 0.002;
                state.cell_populations_mut(cell)[k] = W[k] * (1. + wobble);
            }
        }

        for _ in 0..3 {
            let (populations, density, ux, uy) = reference_step(&state);
            step(&mut state, ObstaclePopulations::Frozen);
            assert_eq!(state.populations(), &populations[..]);
            assert_eq!(state.density, density);
            assert_eq!(state.velocity_x, ux);
            assert_eq!(state.velocity_y, uy);
        }
    }
}
