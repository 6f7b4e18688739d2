// SPDX-License-Identifier: AGPL-3.0-only

//! Lattice gauge-link data model.
//!
//! The unitarization engine consumes arbitrary 3×3 complex matrices; this
//! module supplies the matrix algebra and the 4D link container it operates
//! on, plus the deterministic LCG used to build test lattices.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `complex_f64` | Complex f64 arithmetic |
//! | `constants` | LCG PRNG, color/dimension counts, numerical guards |
//! | `su3` | SU(3) 3×3 complex matrix operations |
//! | `field` | 4D gauge-field container and flat buffer layout |
//!
//! # References
//!
//! - Gattringer & Lang, "Quantum Chromodynamics on the Lattice" (2010)
//! - MILC/HISQ smearing practice for why links drift off SU(3)

/// Complex f64 arithmetic (re, im).
pub mod complex_f64;
/// LCG PRNG, lattice constants, and shared numerical guards.
pub mod constants;
/// 4D gauge-field container: links\[site × 4 + mu\], flat buffer codecs.
pub mod field;
/// SU(3) 3×3 complex matrix operations (algebra, norms, deviation).
pub mod su3;
