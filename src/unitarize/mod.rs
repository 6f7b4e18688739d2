// SPDX-License-Identifier: AGPL-3.0-only

//! SU(3) link unitarization engine.
//!
//! Smearing/fattening leaves link matrices off the group manifold by
//! accumulated floating-point error; downstream fermion kernels need them
//! unitary to strict tolerance. This engine projects every link of the
//! locally owned lattice back onto SU(3), in parallel, with auditable
//! failure accounting.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `config` | Per-sweep tolerances and path selection |
//! | `projector` | Newton polar projection of one matrix |
//! | `svd3` | One-sided Jacobi SVD fallback |
//! | `sweep` | Parallel whole-lattice dispatch, failure counting |
//!
//! # References
//!
//! - Hasenfratz & Knechtli, PRD 64, 034504 (2001) — fat links and projection
//! - Higham, "Computing the polar decomposition", SISSC 7 (1986)

/// Per-sweep tolerances and path selection.
pub mod config;
/// Newton polar projection of one 3×3 matrix onto SU(3).
pub mod projector;
/// One-sided Jacobi SVD for the fallback path.
pub mod svd3;
/// Parallel whole-lattice sweep with atomic failure accounting.
pub mod sweep;

pub use config::UnitarizeConfig;
pub use projector::{project_su3, Projection};
pub use sweep::{
    print_sweep_summary, unitarize_field, unitarize_flat_f32, unitarize_flat_f64,
    unitarize_links, unitarize_links_in_place, SweepStats,
};
