//! D2Q9 lattice constants.
//!
//! Nine discrete velocities on the 2D square lattice:
//! ```text
//!   6   2   5
//!    \  |  /
//!   3 - 0 - 1
//!    /  |  \
//!   7   4   8
//! ```

use crate::floating_type_mod::FT;

/// Number of discrete velocity directions.
pub const Q: usize = 9;

/// Equilibrium weights: rest, four axis directions, four diagonals.
pub const W: [FT; Q] = [
    4. / 9.,
    1. / 9.,
    1. / 9.,
    1. / 9.,
    1. / 9.,
    1. / 36.,
    1. / 36.,
    1. / 36.,
    1. / 36.,
];

/// x components of the discrete velocities.
pub const CX: [i32; Q] = [0, 1, 0, -1, 0, 1, -1, -1, 1];

/// y components of the discrete velocities.
pub const CY: [i32; Q] = [0, 0, 1, 0, -1, 1, 1, -1, -1];

/// Index of the reversed direction, used for bounce-back.
pub const OPP: [usize; Q] = [0, 3, 4, 1, 2, 7, 8, 5, 6];

/// Second-order truncated Maxwell-Boltzmann equilibrium for direction `k`.
///
/// f_k^eq = w_k ρ [1 + 3(c_k·u) + 9/2(c_k·u)² - 3/2(u·u)]
#[inline]
pub fn equilibrium(k: usize, density: FT, ux: FT, uy: FT) -> FT {
    let cu = CX[k] as FT * ux + CY[k] as FT * uy;
    let uu = ux * ux + uy * uy;
    W[k] * density * (1. + 3. * cu + 4.5 * cu * cu - 1.5 * uu)
}

/// All nine equilibrium values for the given moments.
#[inline]
pub fn equilibrium_all(density: FT, ux: FT, uy: FT) -> [FT; Q] {
    std::array::from_fn(|k| equilibrium(k, density, ux, uy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_ft_approx_eq;

    #[test]
    fn weights_are_normalized() {
        let sum: FT = W.iter().sum();
        assert_ft_approx_eq(sum, 1.0, 1e-6, || "sum of weights".to_string());

        let mx: FT = (0..Q).map(|k| W[k] * CX[k] as FT).sum();
        let my: FT = (0..Q).map(|k| W[k] * CY[k] as FT).sum();
        assert_eq!(mx, 0.);
        assert_eq!(my, 0.);
    }

    #[test]
    fn opposite_is_an_involution() {
        for k in 0..Q {
            assert_eq!(OPP[OPP[k]], k);
            assert_eq!(CX[OPP[k]], -CX[k]);
            assert_eq!(CY[OPP[k]], -CY[k]);
        }
    }

    #[test]
    fn velocities_are_unit_stencil() {
        assert_eq!((CX[0], CY[0]), (0, 0));
        for k in 1..5 {
            assert_eq!(CX[k].abs() + CY[k].abs(), 1, "axis direction {}", k);
        }
        for k in 5..Q {
            assert_eq!((CX[k].abs(), CY[k].abs()), (1, 1), "diagonal direction {}", k);
        }
    }

    #[test]
    fn equilibrium_at_rest_is_weight() {
        for k in 0..Q {
            assert_ft_approx_eq(equilibrium(k, 1.0, 0., 0.), W[k], 1e-7, || format!("f_eq[{}]", k));
        }
    }

    #[test]
    fn equilibrium_reproduces_moments() {
        let (rho, ux, uy) = (1.2, 0.05, -0.03);
        let feq = equilibrium_all(rho, ux, uy);

        let density: FT = feq.iter().sum();
        let mx: FT = (0..Q).map(|k| feq[k] * CX[k] as FT).sum();
        let my: FT = (0..Q).map(|k| feq[k] * CY[k] as FT).sum();

        assert_ft_approx_eq(density, rho, 1e-5, || "zeroth moment".to_string());
        assert_ft_approx_eq(mx / density, ux, 1e-5, || "first moment x".to_string());
        assert_ft_approx_eq(my / density, uy, 1e-5, || "first moment y".to_string());
    }
}
