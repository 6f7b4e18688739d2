// SPDX-License-Identifier: AGPL-3.0-only

//! SU(3) matrix algebra for lattice gauge links.
//!
//! An SU(3) matrix is a 3×3 unitary matrix with determinant 1. A gauge link
//! `U_μ`(x) lives in (or, after smearing, near) SU(3); this module provides
//! the raw matrix operations the unitarization engine is built from:
//! adjoint, determinant, adjugate inverse, Frobenius norms, and the
//! deviation-from-SU(3) measure used for failure accounting.
//!
//! Storage: row-major, 9 Complex64 values (18 f64).
//!
//! # References
//!
//! - Gattringer & Lang, "QCD on the Lattice" (2010), Ch. 2
//! - Higham, "Functions of Matrices" (2008), Ch. 8 — polar decomposition

use std::ops::{Add, Mul, Sub};

use super::complex_f64::Complex64;
use super::constants::LATTICE_DIVISION_GUARD;
use crate::tolerances::DET_INVERSION_GUARD;

/// 3×3 complex matrix — gauge-link variable.
///
/// Row-major storage: `m[row][col]`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[must_use]
pub struct Su3Matrix {
    /// Matrix elements m[row][col].
    pub m: [[Complex64; 3]; 3],
}

impl Mul for Su3Matrix {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                let mut s = Complex64::ZERO;
                for k in 0..3 {
                    s += self.m[i][k] * rhs.m[k][j];
                }
                r.m[i][j] = s;
            }
        }
        r
    }
}

impl Add for Su3Matrix {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[i][j] + rhs.m[i][j];
            }
        }
        r
    }
}

impl Sub for Su3Matrix {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[i][j] - rhs.m[i][j];
            }
        }
        r
    }
}

impl Su3Matrix {
    /// 3×3 identity matrix.
    pub const IDENTITY: Self = Self {
        m: [
            [Complex64::ONE, Complex64::ZERO, Complex64::ZERO],
            [Complex64::ZERO, Complex64::ONE, Complex64::ZERO],
            [Complex64::ZERO, Complex64::ZERO, Complex64::ONE],
        ],
    };

    /// Zero matrix (all elements 0).
    pub const ZERO: Self = Self {
        m: [[Complex64::ZERO; 3]; 3],
    };

    /// Conjugate transpose (adjoint / dagger).
    pub fn adjoint(self) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[j][i].conj();
            }
        }
        r
    }

    /// Trace: Tr(U) = sum\_i `U_ii`
    pub fn trace(self) -> Complex64 {
        self.m[0][0] + self.m[1][1] + self.m[2][2]
    }

    /// Determinant of a 3×3 complex matrix.
    pub fn det(self) -> Complex64 {
        let m = &self.m;
        let a = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1]);
        let b = m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0]);
        let c = m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
        a - b + c
    }

    /// Scale by a real number.
    pub fn scale(self, s: f64) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[i][j].scale(s);
            }
        }
        r
    }

    /// Scale by a complex number.
    pub fn scale_complex(self, s: Complex64) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[i][j] * s;
            }
        }
        r
    }

    /// Frobenius norm squared: sum |`m_ij`|²
    #[must_use]
    pub fn norm_sq(self) -> f64 {
        let mut s = 0.0;
        for i in 0..3 {
            for j in 0..3 {
                s += self.m[i][j].abs_sq();
            }
        }
        s
    }

    /// Squared Frobenius distance to another matrix.
    #[must_use]
    pub fn diff_norm_sq(self, other: &Self) -> f64 {
        (self - *other).norm_sq()
    }

    /// True when every matrix element is finite (no NaN/Inf).
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.m
            .iter()
            .all(|row| row.iter().all(|c| c.is_finite()))
    }

    /// Adjugate-based inverse.
    ///
    /// Returns `None` when `|det|` falls below [`DET_INVERSION_GUARD`]: the
    /// adjugate formula loses one digit of accuracy per decade of
    /// determinant magnitude, so near-singular matrices are rejected here
    /// and routed to the SVD path by the caller.
    #[must_use]
    pub fn inverse(self) -> Option<Self> {
        let det = self.det();
        if det.abs() < DET_INVERSION_GUARD {
            return None;
        }
        let m = &self.m;
        // adj[i][j] = cofactor[j][i]
        let adj = [
            [
                m[1][1] * m[2][2] - m[1][2] * m[2][1],
                m[0][2] * m[2][1] - m[0][1] * m[2][2],
                m[0][1] * m[1][2] - m[0][2] * m[1][1],
            ],
            [
                m[1][2] * m[2][0] - m[1][0] * m[2][2],
                m[0][0] * m[2][2] - m[0][2] * m[2][0],
                m[0][2] * m[1][0] - m[0][0] * m[1][2],
            ],
            [
                m[1][0] * m[2][1] - m[1][1] * m[2][0],
                m[0][1] * m[2][0] - m[0][0] * m[2][1],
                m[0][0] * m[1][1] - m[0][1] * m[1][0],
            ],
        ];
        let inv_det = Complex64::ONE / det;
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = adj[i][j] * inv_det;
            }
        }
        Some(r)
    }

    /// Unitarity residual: ‖U†U − I‖_F.
    ///
    /// Zero for an exactly unitary matrix, regardless of its determinant
    /// phase.
    #[must_use]
    pub fn unitarity_error(&self) -> f64 {
        ((self.adjoint() * *self) - Self::IDENTITY).norm_sq().sqrt()
    }

    /// Deviation from SU(3): ‖U†U − I‖_F + |det U − 1|.
    ///
    /// The authoritative failure measure for unitarization — it checks both
    /// orthonormality and the determinant constraint, computed from the
    /// matrix itself rather than any iteration flag.
    #[must_use]
    pub fn su3_deviation(&self) -> f64 {
        self.unitarity_error() + (self.det() - Complex64::ONE).abs()
    }

    /// Orthonormalize rows by modified Gram-Schmidt, closing the third row
    /// as conj(row0 × row1) so det = 1 exactly.
    ///
    /// Used for constructing exact SU(3) matrices from random data; the
    /// production projection path is `unitarize::projector`, which preserves
    /// the input matrix's polar factor instead of privileging row order.
    pub(crate) fn orthonormalize_rows(self) -> Self {
        let mut u = self;

        let n0 = row_norm(&u, 0);
        if n0 > LATTICE_DIVISION_GUARD {
            let inv = 1.0 / n0;
            for j in 0..3 {
                u.m[0][j] = u.m[0][j].scale(inv);
            }
        }

        let dot01 = row_dot(&u, 0, 1);
        for j in 0..3 {
            u.m[1][j] -= u.m[0][j] * dot01;
        }
        let n1 = row_norm(&u, 1);
        if n1 > LATTICE_DIVISION_GUARD {
            let inv = 1.0 / n1;
            for j in 0..3 {
                u.m[1][j] = u.m[1][j].scale(inv);
            }
        }

        u.m[2][0] = (u.m[0][1] * u.m[1][2] - u.m[0][2] * u.m[1][1]).conj();
        u.m[2][1] = (u.m[0][2] * u.m[1][0] - u.m[0][0] * u.m[1][2]).conj();
        u.m[2][2] = (u.m[0][0] * u.m[1][1] - u.m[0][1] * u.m[1][0]).conj();

        u
    }

    /// Generate a random exact SU(3) matrix.
    ///
    /// Fills a 3×3 matrix with Gaussian complex entries and orthonormalizes.
    /// The result satisfies U†U = I and det U = 1 to machine precision —
    /// the reference input for projection tests.
    pub fn random_su3(seed: &mut u64) -> Self {
        use super::constants::lcg_gaussian;

        let mut g = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                g.m[i][j] = Complex64::new(lcg_gaussian(seed), lcg_gaussian(seed));
            }
        }
        g.orthonormalize_rows()
    }
}

fn row_norm(u: &Su3Matrix, row: usize) -> f64 {
    let mut s = 0.0;
    for j in 0..3 {
        s += u.m[row][j].abs_sq();
    }
    s.sqrt()
}

fn row_dot(u: &Su3Matrix, r1: usize, r2: usize) -> Complex64 {
    let mut s = Complex64::ZERO;
    for j in 0..3 {
        s += u.m[r1][j].conj() * u.m[r2][j];
    }
    s
}
