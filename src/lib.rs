// SPDX-License-Identifier: AGPL-3.0-only

//! hotSpring relink — SU(3) gauge-link unitarization engine.
//!
//! Projects numerically drifted 3×3 complex link matrices back onto the
//! SU(3) manifold across every link of a 4D lattice: Newton polar
//! iteration on the fast path, one-sided Jacobi SVD as the robust
//! fallback, rayon-parallel sweeps with race-free failure counting.
//!
//! ## Modules
//!   - `lattice` — complex/SU(3) matrix algebra and the 4D link container
//!   - `unitarize` — per-matrix projection, sweep dispatch, failure stats
//!   - `tolerances` — centralized numerical constants with justification
//!   - `error` — structural sweep errors (per-link failures are counted,
//!     not raised)
//!
//! ## Binaries
//!   - `bench_unitarize` — drifted-lattice sweep driver: timing, failure
//!     rate, polar-vs-SVD comparison, optional JSON report

pub mod error;
pub mod lattice;
pub mod tolerances;
pub mod unitarize;
