/*!
D2Q9 lattice Boltzmann simulation of two dimensional flow around solid obstacles.

The `simulation` module holds the solver and everything that works on its fields
(obstacles, metrics, coloring); `platform` is the command line driver that writes
logs, snapshots, images and VTK series to disk.
*/

mod platform;
mod simulation;

pub use simulation::{
    analysis, assert_ft_approx_eq, color_map, colors, concurrency, error, floating_type_mod, init_lbm_sim,
    is_ft_approx_eq, lattice, lattice_state, obstacle, simulation_parameters, solver, statistics, vec2f, vec3f,
    LbmSimulation, SceneConfig, V, V2, V3,
};

pub use platform::start;
