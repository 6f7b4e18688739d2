// SPDX-License-Identifier: AGPL-3.0-only

//! Whole-lattice unitarization sweep.
//!
//! One work unit per link, dispatched over the rayon pool — an
//! embarrassingly parallel map with no ordering between links. The only
//! shared mutable state is a pair of atomic counters (failures, SVD
//! fallbacks); increments are `Relaxed` fetch-adds, so totals are
//! order-independent and lose no updates. Per-link outputs land in
//! disjoint slots, and the maximum deviation is combined with `f64::max`,
//! which is also order-independent. A sweep therefore produces identical
//! results at any thread count.
//!
//! Per-link numerical failures never abort the sweep; only structural
//! misuse (mismatched buffers, bad tolerances) errors out, and it does so
//! before any projection runs.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::error::RelinkError;
use crate::lattice::constants::REALS_PER_LINK;
use crate::lattice::field::{matrix_from_reals, matrix_to_reals, GaugeField};
use crate::lattice::su3::Su3Matrix;

use super::config::UnitarizeConfig;
use super::projector::project_su3;

/// Tally of one unitarization sweep.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SweepStats {
    /// Links processed (4 × local volume for a whole-field sweep).
    pub total_links: usize,
    /// Links whose deviation exceeded `max_allowed_error` or whose
    /// projection did not converge.
    pub failures: usize,
    /// Links that went through the SVD path.
    pub svd_fallbacks: usize,
    /// Largest post-projection deviation seen in the sweep.
    pub max_deviation: f64,
    /// Wall-clock time of the sweep.
    pub wall_time_s: f64,
}

impl SweepStats {
    /// Failures divided by links processed; 0 for an empty sweep.
    ///
    /// Cross-process aggregation (summing failure counts over ranks) is the
    /// caller's concern.
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        if self.total_links == 0 {
            0.0
        } else {
            self.failures as f64 / self.total_links as f64
        }
    }

    fn empty(wall_time_s: f64) -> Self {
        Self {
            total_links: 0,
            failures: 0,
            svd_fallbacks: 0,
            max_deviation: 0.0,
            wall_time_s,
        }
    }
}

/// Project one link into its output slot, updating the shared counters.
/// Returns the deviation for the max-reduction.
///
/// Takes the input by value: `Su3Matrix` is a small `Copy` type, and the
/// copy makes the in-place and two-buffer sweeps share one code path.
fn project_link(
    input: Su3Matrix,
    out: &mut Su3Matrix,
    config: &UnitarizeConfig,
    failures: &AtomicUsize,
    svd_fallbacks: &AtomicUsize,
) -> f64 {
    let p = project_su3(&input, config);
    if p.used_svd {
        svd_fallbacks.fetch_add(1, Ordering::Relaxed);
    }
    if !p.converged || p.deviation > config.max_allowed_error {
        failures.fetch_add(1, Ordering::Relaxed);
    }
    *out = p.matrix;
    p.deviation
}

/// Unitarize every link from `input` into `output` (disjoint buffers).
///
/// # Errors
///
/// [`RelinkError::LengthMismatch`] when the buffers differ in length,
/// [`RelinkError::InvalidConfig`] for bad tolerances. Both are raised
/// before any projection runs.
pub fn unitarize_links(
    input: &[Su3Matrix],
    output: &mut [Su3Matrix],
    config: &UnitarizeConfig,
) -> Result<SweepStats, RelinkError> {
    config.validate()?;
    if input.len() != output.len() {
        return Err(RelinkError::LengthMismatch {
            input: input.len(),
            output: output.len(),
        });
    }
    let t0 = Instant::now();
    if input.is_empty() {
        return Ok(SweepStats::empty(t0.elapsed().as_secs_f64()));
    }

    let failures = AtomicUsize::new(0);
    let svd_fallbacks = AtomicUsize::new(0);

    let max_deviation = output
        .par_iter_mut()
        .zip(input.par_iter())
        .map(|(out, m)| project_link(*m, out, config, &failures, &svd_fallbacks))
        .reduce(|| 0.0f64, f64::max);

    Ok(SweepStats {
        total_links: input.len(),
        failures: failures.load(Ordering::Relaxed),
        svd_fallbacks: svd_fallbacks.load(Ordering::Relaxed),
        max_deviation,
        wall_time_s: t0.elapsed().as_secs_f64(),
    })
}

/// Unitarize every link of `links` in place (aliased input/output).
///
/// # Errors
///
/// [`RelinkError::InvalidConfig`] for bad tolerances.
pub fn unitarize_links_in_place(
    links: &mut [Su3Matrix],
    config: &UnitarizeConfig,
) -> Result<SweepStats, RelinkError> {
    config.validate()?;
    let t0 = Instant::now();
    if links.is_empty() {
        return Ok(SweepStats::empty(t0.elapsed().as_secs_f64()));
    }

    let failures = AtomicUsize::new(0);
    let svd_fallbacks = AtomicUsize::new(0);
    let total_links = links.len();

    let max_deviation = links
        .par_iter_mut()
        .map(|slot| project_link(*slot, slot, config, &failures, &svd_fallbacks))
        .reduce(|| 0.0f64, f64::max);

    Ok(SweepStats {
        total_links,
        failures: failures.load(Ordering::Relaxed),
        svd_fallbacks: svd_fallbacks.load(Ordering::Relaxed),
        max_deviation,
        wall_time_s: t0.elapsed().as_secs_f64(),
    })
}

/// Unitarize a whole gauge field in place: 4 × volume links.
///
/// # Errors
///
/// [`RelinkError::InvalidConfig`] for bad tolerances.
pub fn unitarize_field(
    field: &mut GaugeField,
    config: &UnitarizeConfig,
) -> Result<SweepStats, RelinkError> {
    unitarize_links_in_place(&mut field.links, config)
}

/// Unitarize a flat f64 link buffer (18 reals per link, row-major,
/// re/im interleaved — the layout of [`GaugeField::to_flat_f64`]).
///
/// # Errors
///
/// [`RelinkError::NotLinkAligned`] when a buffer is not a multiple of 18
/// reals, [`RelinkError::LengthMismatch`] on differing lengths,
/// [`RelinkError::InvalidConfig`] for bad tolerances.
pub fn unitarize_flat_f64(
    input: &[f64],
    output: &mut [f64],
    config: &UnitarizeConfig,
) -> Result<SweepStats, RelinkError> {
    config.validate()?;
    check_flat_lengths(input.len(), output.len())?;
    let t0 = Instant::now();
    if input.is_empty() {
        return Ok(SweepStats::empty(t0.elapsed().as_secs_f64()));
    }

    let failures = AtomicUsize::new(0);
    let svd_fallbacks = AtomicUsize::new(0);
    let total_links = input.len() / REALS_PER_LINK;

    let max_deviation = output
        .par_chunks_mut(REALS_PER_LINK)
        .zip(input.par_chunks(REALS_PER_LINK))
        .map(|(out, reals)| {
            let mut slot = Su3Matrix::ZERO;
            let dev = project_link(
                matrix_from_reals(reals),
                &mut slot,
                config,
                &failures,
                &svd_fallbacks,
            );
            matrix_to_reals(&slot, out);
            dev
        })
        .reduce(|| 0.0f64, f64::max);

    Ok(SweepStats {
        total_links,
        failures: failures.load(Ordering::Relaxed),
        svd_fallbacks: svd_fallbacks.load(Ordering::Relaxed),
        max_deviation,
        wall_time_s: t0.elapsed().as_secs_f64(),
    })
}

/// Unitarize a flat f32 link buffer: same layout as the f64 entry point.
/// Each link is widened to f64 for projection and narrowed on store;
/// the projection arithmetic itself is always f64.
///
/// # Errors
///
/// Same conditions as [`unitarize_flat_f64`].
pub fn unitarize_flat_f32(
    input: &[f32],
    output: &mut [f32],
    config: &UnitarizeConfig,
) -> Result<SweepStats, RelinkError> {
    config.validate()?;
    check_flat_lengths(input.len(), output.len())?;
    let t0 = Instant::now();
    if input.is_empty() {
        return Ok(SweepStats::empty(t0.elapsed().as_secs_f64()));
    }

    let failures = AtomicUsize::new(0);
    let svd_fallbacks = AtomicUsize::new(0);
    let total_links = input.len() / REALS_PER_LINK;

    let max_deviation = output
        .par_chunks_mut(REALS_PER_LINK)
        .zip(input.par_chunks(REALS_PER_LINK))
        .map(|(out, reals)| {
            let mut wide = [0.0f64; REALS_PER_LINK];
            for (w, &r) in wide.iter_mut().zip(reals.iter()) {
                *w = f64::from(r);
            }
            let mut slot = Su3Matrix::ZERO;
            let dev = project_link(
                matrix_from_reals(&wide),
                &mut slot,
                config,
                &failures,
                &svd_fallbacks,
            );
            let mut narrow = [0.0f64; REALS_PER_LINK];
            matrix_to_reals(&slot, &mut narrow);
            for (o, &w) in out.iter_mut().zip(narrow.iter()) {
                *o = w as f32;
            }
            dev
        })
        .reduce(|| 0.0f64, f64::max);

    Ok(SweepStats {
        total_links,
        failures: failures.load(Ordering::Relaxed),
        svd_fallbacks: svd_fallbacks.load(Ordering::Relaxed),
        max_deviation,
        wall_time_s: t0.elapsed().as_secs_f64(),
    })
}

fn check_flat_lengths(input: usize, output: usize) -> Result<(), RelinkError> {
    if input % REALS_PER_LINK != 0 {
        return Err(RelinkError::NotLinkAligned { len: input });
    }
    if output % REALS_PER_LINK != 0 {
        return Err(RelinkError::NotLinkAligned { len: output });
    }
    if input != output {
        return Err(RelinkError::LengthMismatch { input, output });
    }
    Ok(())
}

/// Print a formatted sweep summary.
pub fn print_sweep_summary(stats: &SweepStats) {
    let rate = if stats.wall_time_s > 0.0 {
        stats.total_links as f64 / stats.wall_time_s
    } else {
        0.0
    };
    println!(
        "  links: {:>10} | failures: {:>6} (rate {:.3e}) | svd fallbacks: {:>6}",
        stats.total_links,
        stats.failures,
        stats.failure_rate(),
        stats.svd_fallbacks,
    );
    println!(
        "  max deviation: {:.3e} | wall time: {:.3}s ({:.3e} links/s)",
        stats.max_deviation, stats.wall_time_s, rate,
    );
    if stats.failures > 0 {
        println!("  nonzero failure rate — loosen max_allowed_error or the SVD tolerances, or inspect the smearing upstream");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::complex_f64::Complex64;

    fn cfg() -> UnitarizeConfig {
        UnitarizeConfig::default()
    }

    fn drifted_batch(n: usize, seed: u64) -> Vec<Su3Matrix> {
        let mut s = seed;
        (0..n)
            .map(|_| Su3Matrix::random_su3(&mut s).scale(1.03))
            .collect()
    }

    #[test]
    fn empty_sweep_returns_zero_stats() {
        let mut out: Vec<Su3Matrix> = Vec::new();
        let stats = unitarize_links(&[], &mut out, &cfg()).expect("empty sweep");
        assert_eq!(stats.total_links, 0);
        assert_eq!(stats.failures, 0);
        assert!((stats.failure_rate() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn length_mismatch_is_structural_error() {
        let input = drifted_batch(4, 1);
        let mut out = vec![Su3Matrix::IDENTITY; 3];
        let err = unitarize_links(&input, &mut out, &cfg());
        assert!(matches!(err, Err(RelinkError::LengthMismatch { input: 4, output: 3 })));
    }

    #[test]
    fn invalid_config_is_structural_error() {
        let input = drifted_batch(2, 1);
        let mut out = vec![Su3Matrix::IDENTITY; 2];
        let bad = UnitarizeConfig {
            max_allowed_error: -1.0,
            ..cfg()
        };
        assert!(matches!(
            unitarize_links(&input, &mut out, &bad),
            Err(RelinkError::InvalidConfig(_))
        ));
    }

    #[test]
    fn drifted_batch_fully_corrected() {
        let input = drifted_batch(64, 9);
        let mut out = vec![Su3Matrix::ZERO; 64];
        let stats = unitarize_links(&input, &mut out, &cfg()).expect("sweep");
        assert_eq!(stats.total_links, 64);
        assert_eq!(stats.failures, 0);
        assert!(stats.max_deviation < cfg().max_allowed_error);
        for u in &out {
            assert!(u.su3_deviation() < cfg().max_allowed_error);
        }
    }

    #[test]
    fn in_place_matches_two_buffer_sweep() {
        let input = drifted_batch(32, 17);
        let mut out = vec![Su3Matrix::ZERO; 32];
        let a = unitarize_links(&input, &mut out, &cfg()).expect("two-buffer");

        let mut links = input;
        let b = unitarize_links_in_place(&mut links, &cfg()).expect("in-place");

        assert_eq!(a.failures, b.failures);
        for (x, y) in out.iter().zip(links.iter()) {
            assert_eq!(x, y, "in-place and two-buffer sweeps must agree exactly");
        }
    }

    #[test]
    fn nan_link_counts_once_and_leaves_others_alone() {
        let mut input = drifted_batch(16, 23);
        input[7].m[1][1] = Complex64::new(f64::NAN, 0.0);
        let mut out = vec![Su3Matrix::ZERO; 16];
        let stats = unitarize_links(&input, &mut out, &cfg()).expect("sweep");
        assert_eq!(stats.failures, 1);
        assert!(stats.max_deviation.is_infinite());
        for (i, u) in out.iter().enumerate() {
            if i != 7 {
                assert!(u.su3_deviation() < cfg().max_allowed_error, "link {i} affected");
            }
        }
    }

    #[test]
    fn reordered_batch_gives_identical_results() {
        let input = drifted_batch(40, 31);
        let mut out_fwd = vec![Su3Matrix::ZERO; 40];
        let a = unitarize_links(&input, &mut out_fwd, &cfg()).expect("forward");

        let reversed: Vec<Su3Matrix> = input.iter().rev().copied().collect();
        let mut out_rev = vec![Su3Matrix::ZERO; 40];
        let b = unitarize_links(&reversed, &mut out_rev, &cfg()).expect("reversed");

        assert_eq!(a.failures, b.failures);
        for (x, y) in out_fwd.iter().zip(out_rev.iter().rev()) {
            assert_eq!(x, y, "execution order must not change per-link output");
        }
    }

    #[test]
    fn flat_f64_matches_matrix_sweep() {
        let field = GaugeField::drifted_start([2, 2, 2, 2], 5, 0.02);
        let flat_in = field.to_flat_f64();
        let mut flat_out = vec![0.0f64; flat_in.len()];
        let a = unitarize_flat_f64(&flat_in, &mut flat_out, &cfg()).expect("flat");

        let mut links = field.links;
        let b = unitarize_links_in_place(&mut links, &cfg()).expect("matrix");

        assert_eq!(a.total_links, b.total_links);
        assert_eq!(a.failures, b.failures);
        let rebuilt = GaugeField::from_flat_f64([2, 2, 2, 2], &flat_out).expect("rebuild");
        for (x, y) in rebuilt.links.iter().zip(links.iter()) {
            assert_eq!(x, y);
        }
    }

    #[test]
    fn flat_f32_corrects_to_single_precision() {
        let field = GaugeField::drifted_start([2, 2, 2, 2], 13, 0.02);
        let flat_in: Vec<f32> = field.to_flat_f64().iter().map(|&v| v as f32).collect();
        let mut flat_out = vec![0.0f32; flat_in.len()];
        let stats = unitarize_flat_f32(&flat_in, &mut flat_out, &cfg()).expect("flat f32");
        assert_eq!(stats.failures, 0);

        // narrowing to f32 costs ~1e-7 per entry; check unitarity at that scale
        for chunk in flat_out.chunks_exact(REALS_PER_LINK) {
            let wide: Vec<f64> = chunk.iter().map(|&v| f64::from(v)).collect();
            let u = matrix_from_reals(&wide);
            assert!(u.su3_deviation() < 1e-5, "deviation {}", u.su3_deviation());
        }
    }

    #[test]
    fn flat_rejects_misaligned_buffer() {
        let input = vec![0.0f64; 19];
        let mut out = vec![0.0f64; 19];
        assert!(matches!(
            unitarize_flat_f64(&input, &mut out, &cfg()),
            Err(RelinkError::NotLinkAligned { len: 19 })
        ));
    }

    #[test]
    fn field_sweep_covers_all_links() {
        let mut field = GaugeField::drifted_start([2, 2, 2, 4], 41, 0.03);
        let n = field.link_count();
        let stats = unitarize_field(&mut field, &cfg()).expect("field sweep");
        assert_eq!(stats.total_links, n);
        assert_eq!(stats.failures, 0);
        for u in &field.links {
            assert!(u.su3_deviation() < cfg().max_allowed_error);
        }
    }

    #[test]
    fn svd_only_sweep_still_corrects() {
        let input = drifted_batch(16, 53);
        let mut out = vec![Su3Matrix::ZERO; 16];
        let config = UnitarizeConfig {
            svd_only: true,
            ..cfg()
        };
        let stats = unitarize_links(&input, &mut out, &config).expect("svd-only");
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.svd_fallbacks, 16, "every link must take the SVD path");
    }

    #[test]
    fn print_summary_no_panic() {
        let stats = SweepStats {
            total_links: 2048,
            failures: 3,
            svd_fallbacks: 5,
            max_deviation: 2.4e-10,
            wall_time_s: 0.125,
        };
        print_sweep_summary(&stats);
    }
}
