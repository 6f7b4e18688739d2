// SPDX-License-Identifier: AGPL-3.0-only

//! 4D gauge-field container: one SU(3) link per site per direction.
//!
//! The unitarization engine is purely local — it never reads neighbor
//! links — so this container carries no halo machinery. It fixes the memory
//! order the engine contracts on: site-major, direction-fastest,
//! `links[site * 4 + mu]`, with site indices running z fastest, then y,
//! then x, then t.
//!
//! Storage is owned by the caller side of the engine boundary; sweeps
//! borrow `links` for read and write but never reallocate it.

use super::complex_f64::Complex64;
use super::constants::{lcg_gaussian, lcg_uniform_f64, N_DIM, REALS_PER_LINK};
use super::su3::Su3Matrix;
use crate::error::RelinkError;

/// 4D lattice of SU(3) link variables.
///
/// Links are stored as `links[site_index * 4 + mu]` where mu ∈ {0,1,2,3}
/// is the spacetime direction.
#[allow(missing_docs)]
pub struct GaugeField {
    pub dims: [usize; 4],
    /// Link variables: links[site * 4 + mu]
    pub links: Vec<Su3Matrix>,
}

impl GaugeField {
    /// Total number of lattice sites.
    #[must_use]
    pub const fn volume(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2] * self.dims[3]
    }

    /// Total number of links: 4 × volume.
    #[must_use]
    pub const fn link_count(&self) -> usize {
        N_DIM * self.volume()
    }

    /// Convert 4D coordinates to linear site index.
    ///
    /// Convention: `dims = [Nx, Ny, Nz, Nt]`, `x = [x, y, z, t]`.
    /// Index order: z fastest, then y, then x, then t (slowest).
    /// `idx = t*NxNyNz + x*NyNz + y*Nz + z`
    #[must_use]
    pub const fn site_index(&self, x: [usize; 4]) -> usize {
        x[3] * (self.dims[0] * self.dims[1] * self.dims[2])
            + x[0] * (self.dims[1] * self.dims[2])
            + x[1] * self.dims[2]
            + x[2]
    }

    /// Convert linear site index to 4D coordinates.
    ///
    /// Returns `[x, y, z, t]` where `dims = [Nx, Ny, Nz, Nt]`.
    #[must_use]
    pub const fn site_coords(&self, idx: usize) -> [usize; 4] {
        let nxyz = self.dims[0] * self.dims[1] * self.dims[2];
        let t = idx / nxyz;
        let rem = idx % nxyz;
        let x0 = rem / (self.dims[1] * self.dims[2]);
        let rem2 = rem % (self.dims[1] * self.dims[2]);
        let x1 = rem2 / self.dims[2];
        let x2 = rem2 % self.dims[2];
        [x0, x1, x2, t]
    }

    /// Get link `U_mu`(x).
    pub fn link(&self, x: [usize; 4], mu: usize) -> Su3Matrix {
        let idx = self.site_index(x);
        self.links[idx * N_DIM + mu]
    }

    /// Set link `U_mu`(x).
    pub fn set_link(&mut self, x: [usize; 4], mu: usize, u: Su3Matrix) {
        let idx = self.site_index(x);
        self.links[idx * N_DIM + mu] = u;
    }

    /// Cold start: all links = identity (exactly on the manifold).
    #[must_use]
    pub fn cold_start(dims: [usize; 4]) -> Self {
        let vol = dims[0] * dims[1] * dims[2] * dims[3];
        Self {
            dims,
            links: vec![Su3Matrix::IDENTITY; vol * N_DIM],
        }
    }

    /// Random start: independent exact SU(3) links from the deterministic LCG.
    #[must_use]
    pub fn random_start(dims: [usize; 4], seed: u64) -> Self {
        let vol = dims[0] * dims[1] * dims[2] * dims[3];
        let mut rng_seed = seed;
        let links: Vec<Su3Matrix> = (0..vol * N_DIM)
            .map(|_| Su3Matrix::random_su3(&mut rng_seed))
            .collect();
        Self { dims, links }
    }

    /// Drifted start: random SU(3) links pushed off the group manifold.
    ///
    /// Each link is scaled by a random factor in [1−drift, 1+drift] and
    /// perturbed by additive Gaussian noise of amplitude drift/10 — a stand-in
    /// for the accumulated floating-point error of fat-link smearing, which
    /// is what a production sweep actually consumes.
    #[must_use]
    pub fn drifted_start(dims: [usize; 4], seed: u64, drift: f64) -> Self {
        let vol = dims[0] * dims[1] * dims[2] * dims[3];
        let mut rng_seed = seed;
        let links: Vec<Su3Matrix> = (0..vol * N_DIM)
            .map(|_| {
                let u = Su3Matrix::random_su3(&mut rng_seed);
                let scale = 1.0 + drift * (2.0 * lcg_uniform_f64(&mut rng_seed) - 1.0);
                let mut v = u.scale(scale);
                for row in &mut v.m {
                    for c in row.iter_mut() {
                        *c += Complex64::new(
                            lcg_gaussian(&mut rng_seed) * drift * 0.1,
                            lcg_gaussian(&mut rng_seed) * drift * 0.1,
                        );
                    }
                }
                v
            })
            .collect();
        Self { dims, links }
    }

    /// Flatten links to an f64 buffer: 18 reals per link, row-major,
    /// (re, im) interleaved, link order unchanged.
    #[must_use]
    pub fn to_flat_f64(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.links.len() * REALS_PER_LINK);
        for u in &self.links {
            for row in &u.m {
                for c in row {
                    out.push(c.re);
                    out.push(c.im);
                }
            }
        }
        out
    }

    /// Rebuild a field from a flat f64 buffer produced by [`Self::to_flat_f64`].
    ///
    /// # Errors
    ///
    /// [`RelinkError::NotLinkAligned`] when the buffer is not a multiple of
    /// 18 reals, [`RelinkError::LengthMismatch`] when the link count does
    /// not equal 4 × volume of `dims`.
    pub fn from_flat_f64(dims: [usize; 4], flat: &[f64]) -> Result<Self, RelinkError> {
        if flat.len() % REALS_PER_LINK != 0 {
            return Err(RelinkError::NotLinkAligned { len: flat.len() });
        }
        let n_links = flat.len() / REALS_PER_LINK;
        let vol = dims[0] * dims[1] * dims[2] * dims[3];
        if n_links != vol * N_DIM {
            return Err(RelinkError::LengthMismatch {
                input: n_links,
                output: vol * N_DIM,
            });
        }
        let links = flat
            .chunks_exact(REALS_PER_LINK)
            .map(matrix_from_reals)
            .collect();
        Ok(Self { dims, links })
    }
}

/// Decode one link from 18 reals (row-major, re/im interleaved).
#[must_use]
pub fn matrix_from_reals(reals: &[f64]) -> Su3Matrix {
    debug_assert_eq!(reals.len(), REALS_PER_LINK);
    let mut u = Su3Matrix::ZERO;
    for i in 0..3 {
        for j in 0..3 {
            let k = (i * 3 + j) * 2;
            u.m[i][j] = Complex64::new(reals[k], reals[k + 1]);
        }
    }
    u
}

/// Encode one link into 18 reals (row-major, re/im interleaved).
pub fn matrix_to_reals(u: &Su3Matrix, reals: &mut [f64]) {
    debug_assert_eq!(reals.len(), REALS_PER_LINK);
    for i in 0..3 {
        for j in 0..3 {
            let k = (i * 3 + j) * 2;
            reals[k] = u.m[i][j].re;
            reals[k + 1] = u.m[i][j].im;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_link_count() {
        let f = GaugeField::cold_start([4, 4, 4, 8]);
        assert_eq!(f.volume(), 512);
        assert_eq!(f.link_count(), 2048);
        assert_eq!(f.links.len(), 2048);
    }

    #[test]
    fn site_index_round_trip() {
        let f = GaugeField::cold_start([3, 4, 5, 6]);
        for idx in 0..f.volume() {
            let x = f.site_coords(idx);
            assert_eq!(f.site_index(x), idx);
            for (d, &c) in x.iter().enumerate() {
                assert!(c < f.dims[d]);
            }
        }
    }

    #[test]
    fn link_accessors_round_trip() {
        let mut f = GaugeField::cold_start([2, 2, 2, 2]);
        let mut seed = 5u64;
        let u = Su3Matrix::random_su3(&mut seed);
        f.set_link([1, 0, 1, 0], 2, u);
        assert!(f.link([1, 0, 1, 0], 2).diff_norm_sq(&u) < 1e-30);
        assert!(f.link([1, 0, 1, 0], 3).diff_norm_sq(&Su3Matrix::IDENTITY) < 1e-30);
    }

    #[test]
    fn random_start_links_are_su3() {
        let f = GaugeField::random_start([2, 2, 2, 2], 11);
        for u in &f.links {
            assert!(u.su3_deviation() < 1e-10);
        }
    }

    #[test]
    fn drifted_start_links_are_off_manifold() {
        let f = GaugeField::drifted_start([2, 2, 2, 2], 11, 0.05);
        let worst = f
            .links
            .iter()
            .map(Su3Matrix::su3_deviation)
            .fold(0.0f64, f64::max);
        assert!(worst > 1e-6, "drift should leave the manifold, worst {worst}");
    }

    #[test]
    fn flat_round_trip() {
        let f = GaugeField::drifted_start([2, 2, 2, 2], 3, 0.02);
        let flat = f.to_flat_f64();
        assert_eq!(flat.len(), f.link_count() * REALS_PER_LINK);
        let g = GaugeField::from_flat_f64(f.dims, &flat).expect("round trip");
        for (a, b) in f.links.iter().zip(g.links.iter()) {
            assert!(a.diff_norm_sq(b) < 1e-30);
        }
    }

    #[test]
    fn from_flat_rejects_misaligned() {
        let err = GaugeField::from_flat_f64([2, 2, 2, 2], &[0.0; 19]);
        assert!(matches!(err, Err(RelinkError::NotLinkAligned { len: 19 })));
    }

    #[test]
    fn from_flat_rejects_wrong_volume() {
        let err = GaugeField::from_flat_f64([2, 2, 2, 2], &[0.0; 18]);
        assert!(matches!(err, Err(RelinkError::LengthMismatch { .. })));
    }
}
