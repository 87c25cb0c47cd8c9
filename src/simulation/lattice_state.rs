use crate::{
    error::{LbmError, Result},
    floating_type_mod::FT,
    lattice::{Q, W},
};

/// Reference lattice width.
pub const DEFAULT_WIDTH: usize = 200;

/// Reference lattice height.
pub const DEFAULT_HEIGHT: usize = 100;

/// All grid-sized arrays of one simulation plus its two control parameters.
///
/// Populations are stored cell-major (`cell * Q + k`) with `cell = y * width + x`.
/// Exactly one of the two population buffers is current at any time; the other
/// one is scratch space that only the solver writes.
pub struct LatticeState {
    width: usize,
    height: usize,

    populations: [Vec<FT>; 2],
    current: usize,

    pub density: Vec<FT>,
    pub velocity_x: Vec<FT>,
    pub velocity_y: Vec<FT>,
    pub obstacle: Vec<bool>,

    /// BGK relaxation rate ω. Stable only inside `(0, 2)`, not checked here.
    pub relaxation_rate: FT,
    /// Velocity imposed on the inflow column `x = 0`.
    pub inlet_speed: FT,
}

/// Split borrow of a state for one sweep: the current buffer read-only, everything the
/// sweep writes mutable.
pub struct StepView<'a> {
    pub width: usize,
    pub height: usize,
    pub current: &'a [FT],
    pub scratch: &'a mut [FT],
    pub density: &'a mut [FT],
    pub velocity_x: &'a mut [FT],
    pub velocity_y: &'a mut [FT],
    pub obstacle: &'a [bool],
    pub relaxation_rate: FT,
    pub inlet_speed: FT,
}

fn try_filled<T: Clone>(len: usize, value: T, cells: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| LbmError::Allocation { cells })?;
    v.resize(len, value);
    Ok(v)
}

impl LatticeState {
    /// Allocate a `width x height` lattice at rest equilibrium (density 1, zero velocity,
    /// no obstacles).
    pub fn new(width: usize, height: usize, relaxation_rate: FT, inlet_speed: FT) -> Result<LatticeState> {
        let cells = width
            .checked_mul(height)
            .filter(|&n| n > 0)
            .ok_or(LbmError::InvalidDimensions { width, height })?;
        let population_len = cells
            .checked_mul(Q)
            .ok_or(LbmError::Allocation { cells })?;

        let mut state = LatticeState {
            width,
            height,
            populations: [
                try_filled(population_len, 0., cells)?,
                try_filled(population_len, 0., cells)?,
            ],
            current: 0,
            density: try_filled(cells, 1., cells)?,
            velocity_x: try_filled(cells, 0., cells)?,
            velocity_y: try_filled(cells, 0., cells)?,
            obstacle: try_filled(cells, false, cells)?,
            relaxation_rate,
            inlet_speed,
        };
        state.reset(false);

        Ok(state)
    }

    /// Restore the rest equilibrium in place. The obstacle mask survives when
    /// `keep_obstacles` is set.
    pub fn reset(&mut self, keep_obstacles: bool) {
        for buffer in &mut self.populations {
            for cell in buffer.chunks_exact_mut(Q) {
                cell.copy_from_slice(&W);
            }
        }
        self.current = 0;
        self.density.iter_mut().for_each(|rho| *rho = 1.);
        self.velocity_x.iter_mut().for_each(|u| *u = 0.);
        self.velocity_y.iter_mut().for_each(|u| *u = 0.);
        if !keep_obstacles {
            self.obstacle.iter_mut().for_each(|o| *o = false);
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn num_cells(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    /// Cell index for signed coordinates, `None` outside the grid.
    #[inline]
    pub fn checked_idx(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            None
        } else {
            Some(self.idx(x as usize, y as usize))
        }
    }

    /// The current population buffer.
    pub fn populations(&self) -> &[FT] {
        &self.populations[self.current]
    }

    /// Current populations of one cell.
    pub fn cell_populations(&self, cell: usize) -> &[FT] {
        &self.populations()[cell * Q..(cell + 1) * Q]
    }

    /// Mutable access to the current populations of one cell, for seeding states.
    pub fn cell_populations_mut(&mut self, cell: usize) -> &mut [FT] {
        &mut self.populations[self.current][cell * Q..(cell + 1) * Q]
    }

    /// Which of the two buffers is current (0 or 1).
    pub fn current_buffer(&self) -> usize {
        self.current
    }

    pub fn is_obstacle(&self, x: usize, y: usize) -> bool {
        self.obstacle[self.idx(x, y)]
    }

    /// Mark or clear a solid cell. Marked cells get a zero published velocity, which is
    /// what rendering and export expect at walls.
    pub fn set_obstacle(&mut self, x: usize, y: usize, solid: bool) {
        let i = self.idx(x, y);
        self.obstacle[i] = solid;
        if solid {
            self.velocity_x[i] = 0.;
            self.velocity_y[i] = 0.;
        }
    }

    pub fn num_obstacle_cells(&self) -> usize {
        self.obstacle.iter().filter(|&&o| o).count()
    }

    pub(crate) fn step_view(&mut self) -> StepView<'_> {
        let (first, second) = self.populations.split_at_mut(1);
        let (current, scratch) = if self.current == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        };

        StepView {
            width: self.width,
            height: self.height,
            current,
            scratch,
            density: &mut self.density,
            velocity_x: &mut self.velocity_x,
            velocity_y: &mut self.velocity_y,
            obstacle: &self.obstacle,
            relaxation_rate: self.relaxation_rate,
            inlet_speed: self.inlet_speed,
        }
    }

    /// Commit a finished sweep: the scratch buffer becomes current.
    pub(crate) fn swap_buffers(&mut self) {
        self.current = 1 - self.current;
    }

    /// True when no published field contains NaN or infinity.
    pub fn fields_are_finite(&self) -> bool {
        self.density
            .iter()
            .chain(self.velocity_x.iter())
            .chain(self.velocity_y.iter())
            .all(|v| v.is_finite())
    }
}
