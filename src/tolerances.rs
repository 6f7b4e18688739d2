// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized numerical constants with justification.
//!
//! Every threshold used by the unitarization engine is defined here with
//! documentation of its origin and rationale. No ad-hoc magic numbers.
//!
//! | Category | Basis | Example |
//! |----------|-------|---------|
//! | Machine precision | IEEE 754 f64 | 1e-10 for exact arithmetic |
//! | Numerical method | Algorithm convergence | 1e-6 for iterative projection |
//! | Production defaults | HISQ smearing practice | 1e-11 max link error |

// ═══════════════════════════════════════════════════════════════════
// Machine-precision tolerances (IEEE 754 f64)
// ═══════════════════════════════════════════════════════════════════

/// Tolerance for operations that should be exact in f64 arithmetic.
///
/// f64 has ~15.9 significant digits; 1e-10 allows 5 digits of accumulated
/// rounding in compositions of exact operations (Gram-Schmidt, adjugate
/// inverse, 3×3 products).
pub const EXACT_F64: f64 = 1e-10;

// ═══════════════════════════════════════════════════════════════════
// Sweep defaults
// ═══════════════════════════════════════════════════════════════════

/// Default convergence threshold for the Newton polar iteration.
///
/// The iteration converges quadratically once the iterate is near the
/// unitary polar factor; 1e-6 on the per-step Frobenius change leaves the
/// final iterate within ~1e-12 of the fixed point, which the determinant
/// phase fix then carries to SU(3).
pub const DEFAULT_UNITARITY_EPS: f64 = 1e-6;

/// Default per-link deviation bound above which a link counts as failed.
///
/// Downstream staggered-fermion kernels assume links unitary to near
/// machine precision; 1e-11 on ‖U†U − I‖_F + |det U − 1| leaves four
/// orders of headroom over f64 epsilon for accumulated smearing error.
pub const DEFAULT_MAX_ALLOWED_ERROR: f64 = 1e-11;

/// Default relative reconstruction tolerance for the SVD fallback.
///
/// The one-sided Jacobi SVD reconstructs well-conditioned fat links to
/// ~1e-14 relative; 1e-4 only rejects genuinely ill-conditioned inputs
/// whose decomposition did not stabilize.
pub const DEFAULT_SVD_REL_ERROR: f64 = 1e-4;

/// Default absolute reconstruction tolerance for the SVD fallback.
///
/// Floor for links of small norm, where the relative bound degenerates.
pub const DEFAULT_SVD_ABS_ERROR: f64 = 1e-5;

// ═══════════════════════════════════════════════════════════════════
// Projection internals
// ═══════════════════════════════════════════════════════════════════

/// Iteration cap for the Newton polar iteration.
///
/// Quadratic convergence reaches f64 precision in ≤ 9 doublings from any
/// reasonably conditioned start; 20 is twice that, so hitting the cap
/// means the input is pathological, not that the cap is tight.
pub const MAX_POLAR_ITER: usize = 20;

/// Determinant magnitude below which the adjugate inverse is refused.
///
/// The adjugate inverse amplifies rounding by ~1/|det| for norm-O(1)
/// matrices. At 1e-8 the inverse retains ~8 significant digits — enough
/// for the polar iteration to contract. Smaller determinants route to the
/// SVD path, which has no inversion.
pub const DET_INVERSION_GUARD: f64 = 1e-8;

/// Off-diagonal convergence threshold for the one-sided Jacobi SVD.
///
/// Column pairs with relative Hermitian coupling |a_p†a_q|/(‖a_p‖‖a_q‖)
/// below this are treated as orthogonal. 1e-14 is ~50× f64 epsilon,
/// reachable in ≤ 4 sweeps for 3×3 inputs.
pub const SVD_JACOBI_EPS: f64 = 1e-14;

/// Sweep cap for the one-sided Jacobi SVD.
///
/// Jacobi on a 3×3 converges in a handful of sweeps; 30 sweeps without
/// convergence indicates non-finite data, and the caller's reconstruction
/// residual check rejects the result.
pub const MAX_JACOBI_SWEEPS: usize = 30;

/// Relative singular-value floor for forming U columns.
///
/// Columns with σ below this fraction of σ_max are rank-deficient; their
/// U columns are completed by conjugate cross products instead of dividing
/// by a vanishing σ. 1e-14 sits just above f64 epsilon so only true rank
/// loss triggers completion.
pub const SVD_RANK_GUARD: f64 = 1e-14;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_ordering() {
        assert!(DEFAULT_MAX_ALLOWED_ERROR < DEFAULT_UNITARITY_EPS);
        assert!(DEFAULT_SVD_ABS_ERROR < DEFAULT_SVD_REL_ERROR);
        assert!(SVD_JACOBI_EPS < DEFAULT_MAX_ALLOWED_ERROR);
        assert!(SVD_RANK_GUARD < DET_INVERSION_GUARD);
    }

    #[test]
    fn iteration_caps_are_finite_and_positive() {
        assert!(MAX_POLAR_ITER > 0);
        assert!(MAX_JACOBI_SWEEPS > 0);
    }

    #[test]
    fn all_tolerances_are_positive() {
        let tols = [
            EXACT_F64,
            DEFAULT_UNITARITY_EPS,
            DEFAULT_MAX_ALLOWED_ERROR,
            DEFAULT_SVD_REL_ERROR,
            DEFAULT_SVD_ABS_ERROR,
            DET_INVERSION_GUARD,
            SVD_JACOBI_EPS,
            SVD_RANK_GUARD,
        ];
        for (i, &t) in tols.iter().enumerate() {
            assert!(t > 0.0, "tolerance index {i} must be positive, got {t}");
        }
    }
}
