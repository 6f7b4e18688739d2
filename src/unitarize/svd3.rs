// SPDX-License-Identifier: AGPL-3.0-only

//! One-sided Jacobi SVD for 3×3 complex matrices.
//!
//! The fallback path of the projector: `M = U Σ V†`, with `U V†` the
//! nearest unitary matrix to M in Frobenius norm. One-sided Jacobi
//! orthogonalizes the columns of M by phase-adjusted 2×2 rotations,
//! accumulating V; it needs no inversion, so it is the path of choice for
//! degenerate and ill-conditioned links.
//!
//! # References
//!
//! - Golub & Van Loan, "Matrix Computations" (4th ed.), §8.6 — Jacobi SVD
//! - Higham, "Functions of Matrices" (2008), Ch. 8 — nearest unitary

use crate::lattice::complex_f64::Complex64;
use crate::lattice::su3::Su3Matrix;
use crate::tolerances::{MAX_JACOBI_SWEEPS, SVD_JACOBI_EPS, SVD_RANK_GUARD};

/// Singular value decomposition of a 3×3 complex matrix.
///
/// `u` and `v` are unitary; `sigma` is sorted descending.
#[derive(Clone, Copy, Debug)]
pub struct Svd3 {
    pub u: Su3Matrix,
    pub sigma: [f64; 3],
    pub v: Su3Matrix,
}

impl Svd3 {
    /// The unitary factor `U V†` — nearest unitary matrix to the input.
    pub fn nearest_unitary(&self) -> Su3Matrix {
        self.u * self.v.adjoint()
    }

    /// Reconstruction residual ‖U Σ V† − M‖_F against the original matrix.
    ///
    /// The acceptance measure for the SVD path: a decomposition that does
    /// not reproduce its input is rejected by the caller's tolerances.
    #[must_use]
    pub fn reconstruction_residual(&self, m: &Su3Matrix) -> f64 {
        let mut us = self.u;
        for j in 0..3 {
            for i in 0..3 {
                us.m[i][j] = us.m[i][j].scale(self.sigma[j]);
            }
        }
        ((us * self.v.adjoint()) - *m).norm_sq().sqrt()
    }
}

/// Decompose `m = U Σ V†` by one-sided Jacobi column orthogonalization.
///
/// Rank-deficient inputs are handled: U columns whose singular value falls
/// below [`SVD_RANK_GUARD`] (relative to σ_max) are completed by conjugate
/// cross products, so U is unitary for every input.
pub fn svd3(m: &Su3Matrix) -> Svd3 {
    let mut a = *m;
    let mut v = Su3Matrix::IDENTITY;

    for _ in 0..MAX_JACOBI_SWEEPS {
        let mut rotated = false;
        for p in 0..2 {
            for q in (p + 1)..3 {
                let alpha = col_norm_sq(&a, p);
                let beta = col_norm_sq(&a, q);
                let gamma = col_dot(&a, p, q);
                let g = gamma.abs();
                let scale = (alpha * beta).sqrt();
                if scale <= 0.0 || g <= SVD_JACOBI_EPS * scale {
                    continue;
                }
                rotated = true;

                // Phase-adjust so the 2×2 Gram block is real symmetric,
                // then apply the classic Jacobi rotation that zeroes it.
                let phase = Complex64::from_polar(-gamma.arg());
                let zeta = (beta - alpha) / (2.0 * g);
                let t = zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = c * t;

                rotate_cols(&mut a, p, q, c, s, phase);
                rotate_cols(&mut v, p, q, c, s, phase);
            }
        }
        if !rotated {
            break;
        }
    }

    let sigma_raw = [
        col_norm_sq(&a, 0).sqrt(),
        col_norm_sq(&a, 1).sqrt(),
        col_norm_sq(&a, 2).sqrt(),
    ];

    // Sort columns by singular value, descending, permuting A and V together.
    let mut order = [0usize, 1, 2];
    order.sort_by(|&i, &j| sigma_raw[j].total_cmp(&sigma_raw[i]));

    let mut a_sorted = Su3Matrix::ZERO;
    let mut v_sorted = Su3Matrix::ZERO;
    let mut sigma = [0.0f64; 3];
    for (new_j, &old_j) in order.iter().enumerate() {
        sigma[new_j] = sigma_raw[old_j];
        for i in 0..3 {
            a_sorted.m[i][new_j] = a.m[i][old_j];
            v_sorted.m[i][new_j] = v.m[i][old_j];
        }
    }

    Svd3 {
        u: build_u(&a_sorted, &sigma),
        sigma,
        v: v_sorted,
    }
}

fn col_norm_sq(m: &Su3Matrix, j: usize) -> f64 {
    (0..3).map(|i| m.m[i][j].abs_sq()).sum()
}

/// Hermitian column inner product a_p† · a_q.
fn col_dot(m: &Su3Matrix, p: usize, q: usize) -> Complex64 {
    let mut s = Complex64::ZERO;
    for i in 0..3 {
        s += m.m[i][p].conj() * m.m[i][q];
    }
    s
}

/// Apply the unitary 2×2 rotation J = P·R to columns (p, q):
/// a_p ← c·a_p − s·phase·a_q, a_q ← s·a_p + c·phase·a_q.
fn rotate_cols(m: &mut Su3Matrix, p: usize, q: usize, c: f64, s: f64, phase: Complex64) {
    for i in 0..3 {
        let ap = m.m[i][p];
        let aq = m.m[i][q] * phase;
        m.m[i][p] = ap.scale(c) - aq.scale(s);
        m.m[i][q] = ap.scale(s) + aq.scale(c);
    }
}

/// Normalize the orthogonalized columns into U, completing rank-deficient
/// columns so U is always unitary.
fn build_u(a: &Su3Matrix, sigma: &[f64; 3]) -> Su3Matrix {
    let sig_max = sigma[0];
    let mut u = Su3Matrix::ZERO;
    let mut rank = 0usize;
    for j in 0..3 {
        // sigma is sorted, so valid columns form a prefix
        if sigma[j] > SVD_RANK_GUARD * sig_max && sigma[j] > 0.0 {
            let inv = 1.0 / sigma[j];
            for i in 0..3 {
                u.m[i][j] = a.m[i][j].scale(inv);
            }
            rank = j + 1;
        }
    }

    match rank {
        3 => u,
        2 => {
            let c2 = conj_cross(&u, 0, 1);
            set_col(&mut u, 2, c2);
            u
        }
        1 => {
            let c1 = orthogonal_unit(&u, 0);
            set_col(&mut u, 1, c1);
            let c2 = conj_cross(&u, 0, 1);
            set_col(&mut u, 2, c2);
            u
        }
        _ => Su3Matrix::IDENTITY,
    }
}

fn set_col(m: &mut Su3Matrix, j: usize, col: [Complex64; 3]) {
    for i in 0..3 {
        m.m[i][j] = col[i];
    }
}

/// Unit vector orthogonal (Hermitian inner product) to both columns j0, j1:
/// the cross product of the conjugated columns, normalized.
fn conj_cross(m: &Su3Matrix, j0: usize, j1: usize) -> [Complex64; 3] {
    let a = [m.m[0][j0].conj(), m.m[1][j0].conj(), m.m[2][j0].conj()];
    let b = [m.m[0][j1].conj(), m.m[1][j1].conj(), m.m[2][j1].conj()];
    let w = [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ];
    normalize3(w)
}

/// Unit vector orthogonal to column j0, built from the basis vector least
/// aligned with it.
fn orthogonal_unit(m: &Su3Matrix, j0: usize) -> [Complex64; 3] {
    let u0 = [m.m[0][j0], m.m[1][j0], m.m[2][j0]];
    let k = (0..3)
        .min_by(|&i, &j| u0[i].abs_sq().total_cmp(&u0[j].abs_sq()))
        .unwrap_or(0);
    // w = e_k − u0 (u0† e_k)
    let proj = u0[k].conj();
    let mut w = [Complex64::ZERO; 3];
    for i in 0..3 {
        w[i] = -(u0[i] * proj);
    }
    w[k] += Complex64::ONE;
    normalize3(w)
}

fn normalize3(w: [Complex64; 3]) -> [Complex64; 3] {
    let n: f64 = w.iter().map(|c| c.abs_sq()).sum::<f64>().sqrt();
    if n > 0.0 {
        [w[0].scale(1.0 / n), w[1].scale(1.0 / n), w[2].scale(1.0 / n)]
    } else {
        [Complex64::ONE, Complex64::ZERO, Complex64::ZERO]
    }
}
