// SPDX-License-Identifier: AGPL-3.0-only

//! Per-matrix projection onto SU(3).
//!
//! The fast path is the Newton iteration for the unitary polar factor,
//! `X ← ½(X + (X†)⁻¹)`, which converges quadratically for any nonsingular
//! input. Convergence is judged on the Frobenius change per step; the
//! iterate is then carried from U(3) to SU(3) by dividing out the cube
//! root of its determinant. Degenerate or non-converging inputs fall back
//! to the Jacobi SVD (`U V†`), tolerances permitting.
//!
//! The returned deviation is always recomputed from the final matrix —
//! ‖M'†M' − I‖_F + |det M' − 1| — never taken from an iteration flag.
//! Failure counting in the sweep keys off that number alone.
//!
//! # References
//!
//! - Higham, "Computing the polar decomposition — with applications",
//!   SISSC 7 (1986) — Newton iteration, quadratic convergence
//! - Golub & Van Loan, "Matrix Computations" (4th ed.), §8.6

use crate::lattice::complex_f64::Complex64;
use crate::lattice::su3::Su3Matrix;
use crate::tolerances::{DET_INVERSION_GUARD, MAX_POLAR_ITER};

use super::config::UnitarizeConfig;
use super::svd3::svd3;

/// Result of projecting one link.
#[derive(Clone, Copy, Debug)]
pub struct Projection {
    /// Best available projected matrix (the input itself when nothing ran).
    pub matrix: Su3Matrix,
    /// Whether the path that produced `matrix` met its own tolerance.
    pub converged: bool,
    /// ‖M'†M' − I‖_F + |det M' − 1| of `matrix`; the failure criterion.
    pub deviation: f64,
    /// Whether the SVD path produced `matrix`.
    pub used_svd: bool,
}

/// Outcome of the bounded Newton polar iteration.
enum PolarOutcome {
    /// Step change dropped below `unitarity_eps` within the cap.
    Converged(Su3Matrix),
    /// Cap reached; best iterate retained.
    Capped(Su3Matrix),
    /// Determinant fell under [`DET_INVERSION_GUARD`] or the iterate left
    /// finite range — no usable iterate.
    Degenerate,
}

/// Project one 3×3 complex matrix onto the nearest SU(3) element.
pub fn project_su3(m: &Su3Matrix, config: &UnitarizeConfig) -> Projection {
    if !m.is_finite() {
        // Non-finite input: fail immediately, pass the input through.
        return Projection {
            matrix: *m,
            converged: false,
            deviation: f64::INFINITY,
            used_svd: false,
        };
    }

    let mut best = *m;
    if !config.svd_only {
        match polar_iterate(m, config.unitarity_eps) {
            PolarOutcome::Converged(x) => {
                let fixed = fix_det_phase(&x);
                return Projection {
                    matrix: fixed,
                    converged: true,
                    deviation: fixed.su3_deviation(),
                    used_svd: false,
                };
            }
            PolarOutcome::Capped(x) => best = x,
            PolarOutcome::Degenerate => {}
        }
        if !config.allow_svd {
            return Projection {
                matrix: best,
                converged: false,
                deviation: best.su3_deviation(),
                used_svd: false,
            };
        }
    }

    let svd = svd3(m);
    let residual = svd.reconstruction_residual(m);
    let accepted =
        residual <= config.svd_abs_error + config.svd_rel_error * m.norm_sq().sqrt();
    let fixed = fix_det_phase(&svd.nearest_unitary());
    let deviation = fixed.su3_deviation();
    Projection {
        matrix: fixed,
        converged: accepted && deviation.is_finite(),
        deviation,
        used_svd: true,
    }
}

/// Newton polar iteration `X ← ½(X + (X†)⁻¹)` with Frobenius stopping rule.
fn polar_iterate(m: &Su3Matrix, eps: f64) -> PolarOutcome {
    let mut x = *m;
    for _ in 0..MAX_POLAR_ITER {
        let Some(inv_dag) = x.adjoint().inverse() else {
            return PolarOutcome::Degenerate;
        };
        let next = (x + inv_dag).scale(0.5);
        if !next.is_finite() {
            return PolarOutcome::Degenerate;
        }
        let step = next.diff_norm_sq(&x).sqrt();
        x = next;
        if step < eps {
            return PolarOutcome::Converged(x);
        }
    }
    PolarOutcome::Capped(x)
}

/// Project from U(3) onto SU(3): divide by the cube root of the
/// determinant (magnitude and phase), making det = 1.
fn fix_det_phase(u: &Su3Matrix) -> Su3Matrix {
    let det = u.det();
    let r = det.abs();
    if r < DET_INVERSION_GUARD {
        // A vanishing determinant has no meaningful cube root; leave the
        // matrix for the deviation check to reject.
        return *u;
    }
    let root = Complex64::from_polar(-det.arg() / 3.0).scale(r.powf(-1.0 / 3.0));
    u.scale_complex(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tolerances::DEFAULT_MAX_ALLOWED_ERROR;

    fn cfg() -> UnitarizeConfig {
        UnitarizeConfig::default()
    }

    #[test]
    fn exact_su3_is_fixed_point() {
        let mut seed = 3u64;
        for _ in 0..10 {
            let u = Su3Matrix::random_su3(&mut seed);
            let p = project_su3(&u, &cfg());
            assert!(p.converged);
            assert!(!p.used_svd);
            assert!(p.deviation < DEFAULT_MAX_ALLOWED_ERROR);
            assert!(p.matrix.diff_norm_sq(&u) < 1e-20, "projection moved an SU(3) input");
        }
    }

    #[test]
    fn scaled_unitary_is_restored() {
        let mut seed = 8u64;
        for scale in [0.5, 0.99, 1.01, 1.8] {
            let u = Su3Matrix::random_su3(&mut seed);
            let p = project_su3(&u.scale(scale), &cfg());
            assert!(p.converged, "scale {scale} should converge");
            assert!(
                p.deviation < DEFAULT_MAX_ALLOWED_ERROR,
                "scale {scale}: deviation {}",
                p.deviation
            );
            assert!(
                p.matrix.diff_norm_sq(&u) < 1e-18,
                "scale {scale}: polar factor should be the original unitary"
            );
        }
    }

    #[test]
    fn scaled_identity_projects_to_identity() {
        let m = Su3Matrix::IDENTITY.scale(1.01);
        let p = project_su3(&m, &cfg());
        assert!(p.converged);
        assert!(p.deviation < 1e-11);
        assert!(p.matrix.diff_norm_sq(&Su3Matrix::IDENTITY) < 1e-22);
    }

    #[test]
    fn projection_is_idempotent() {
        let mut seed = 15u64;
        let m = Su3Matrix::random_su3(&mut seed).scale(1.2);
        let once = project_su3(&m, &cfg());
        let twice = project_su3(&once.matrix, &cfg());
        assert!(twice.converged);
        assert!(
            twice.matrix.diff_norm_sq(&once.matrix).sqrt() < cfg().unitarity_eps,
            "re-projection must be a near-no-op"
        );
    }

    #[test]
    fn nan_input_fails_without_projecting() {
        let mut m = Su3Matrix::IDENTITY;
        m.m[0][0] = Complex64::new(f64::NAN, 0.0);
        let p = project_su3(&m, &cfg());
        assert!(!p.converged);
        assert!(p.deviation.is_infinite());
        assert!(!p.used_svd);
    }

    #[test]
    fn singular_input_routes_to_svd() {
        let mut m = Su3Matrix::IDENTITY;
        m.m[2][2] = Complex64::ZERO;
        let p = project_su3(&m, &cfg());
        assert!(p.used_svd, "det = 0 must take the SVD path");
        assert!(p.matrix.is_finite());
        // corrected or counted, never a crash; here the SVD can fix it
        assert!(p.deviation < 1e-10);
    }

    #[test]
    fn singular_input_without_svd_is_counted() {
        let mut m = Su3Matrix::IDENTITY;
        m.m[2][2] = Complex64::ZERO;
        let config = UnitarizeConfig {
            allow_svd: false,
            ..cfg()
        };
        let p = project_su3(&m, &config);
        assert!(!p.converged);
        assert!(!p.used_svd);
        assert!(p.deviation > DEFAULT_MAX_ALLOWED_ERROR);
    }

    #[test]
    fn svd_only_bypasses_fast_path() {
        let mut seed = 44u64;
        let m = Su3Matrix::random_su3(&mut seed).scale(1.05);
        let config = UnitarizeConfig {
            svd_only: true,
            ..cfg()
        };
        let p = project_su3(&m, &config);
        assert!(p.used_svd);
        assert!(p.converged);
        assert!(p.deviation < DEFAULT_MAX_ALLOWED_ERROR);
    }

    #[test]
    fn svd_and_polar_paths_agree() {
        let mut seed = 60u64;
        let m = Su3Matrix::random_su3(&mut seed).scale(1.1);
        let fast = project_su3(&m, &cfg());
        let slow = project_su3(
            &m,
            &UnitarizeConfig {
                svd_only: true,
                ..cfg()
            },
        );
        assert!(
            fast.matrix.diff_norm_sq(&slow.matrix).sqrt() < 1e-10,
            "both paths should find the same nearest SU(3) matrix"
        );
    }

    #[test]
    fn det_phase_is_fixed_exactly() {
        // unitary matrix with det = e^{iθ}, θ ≠ 0
        let mut seed = 70u64;
        let u = Su3Matrix::random_su3(&mut seed);
        let m = u.scale_complex(Complex64::from_polar(0.4));
        let p = project_su3(&m, &cfg());
        assert!(p.converged);
        assert!((p.matrix.det() - Complex64::ONE).abs() < 1e-13);
    }
}
