// SPDX-License-Identifier: AGPL-3.0-only

//! Link Unitarization Benchmark — drifted-lattice sweep driver
//!
//! Builds a lattice of randomly drifted SU(3) links (a stand-in for the
//! output of fat-link smearing), projects every link back onto the group
//! manifold, and reports timing, failure count, and failure rate. With
//! `--compare-svd` the same lattice is also swept through the SVD-only
//! path to cross-check the fast projection.
//!
//! Multi-rank runs aggregate failure counts by a plain sum outside this
//! driver; a nonzero rate here is advisory, not fatal.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin bench_unitarize -- \
//!   --dims=8x8x8x8 --drift=0.05 --seed=42 --compare-svd --json=results/unitarize.json
//! ```

use hotspring_relink::lattice::field::GaugeField;
use hotspring_relink::unitarize::{
    print_sweep_summary, unitarize_links, SweepStats, UnitarizeConfig,
};
use serde::Serialize;
use std::time::Instant;

#[derive(Serialize)]
struct BenchReport {
    dims: [usize; 4],
    drift: f64,
    seed: u64,
    config: UnitarizeConfig,
    sweep: SweepStats,
    svd_only_sweep: Option<SweepStats>,
}

fn parse_dims(val: &str) -> Option<[usize; 4]> {
    let parts: Vec<usize> = val.split('x').filter_map(|p| p.parse().ok()).collect();
    if parts.len() == 4 {
        Some([parts[0], parts[1], parts[2], parts[3]])
    } else {
        None
    }
}

fn main() {
    let mut dims = [8usize, 8, 8, 8];
    let mut drift = 0.05f64;
    let mut seed = 42u64;
    let mut compare_svd = false;
    let mut json_path: Option<String> = None;

    for arg in std::env::args().skip(1) {
        if let Some(val) = arg.strip_prefix("--dims=") {
            dims = parse_dims(val).unwrap_or_else(|| {
                eprintln!("bad --dims value {val:?}, expected NxNxNxN");
                std::process::exit(2);
            });
        } else if let Some(val) = arg.strip_prefix("--drift=") {
            drift = val.parse().expect("bad --drift value");
        } else if let Some(val) = arg.strip_prefix("--seed=") {
            seed = val.parse().expect("bad --seed value");
        } else if arg == "--compare-svd" {
            compare_svd = true;
        } else if let Some(val) = arg.strip_prefix("--json=") {
            json_path = Some(val.to_string());
        } else {
            eprintln!("unknown option {arg:?}");
            std::process::exit(2);
        }
    }

    let config = UnitarizeConfig::default();

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  Link Unitarization Sweep — polar + SVD fallback         ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();
    println!(
        "  lattice: {}×{}×{}×{} | links: {} | drift: {drift} | seed: {seed}",
        dims[0],
        dims[1],
        dims[2],
        dims[3],
        4 * dims.iter().product::<usize>(),
    );
    println!(
        "  eps: {:.1e} | max error: {:.1e} | svd rel/abs: {:.1e}/{:.1e}",
        config.unitarity_eps,
        config.max_allowed_error,
        config.svd_rel_error,
        config.svd_abs_error,
    );
    println!("  rayon threads: {}", rayon::current_num_threads());
    println!();

    let t_build = Instant::now();
    let field = GaugeField::drifted_start(dims, seed, drift);
    println!(
        "  drifted field built in {:.3}s",
        t_build.elapsed().as_secs_f64()
    );
    println!();

    println!("═══ Sweep: polar iteration with SVD fallback ═══");
    let mut out = vec![hotspring_relink::lattice::su3::Su3Matrix::ZERO; field.links.len()];
    let sweep = unitarize_links(&field.links, &mut out, &config).expect("sweep");
    print_sweep_summary(&sweep);
    println!();

    let svd_only_sweep = if compare_svd {
        println!("═══ Sweep: SVD only (validation path) ═══");
        let svd_config = UnitarizeConfig {
            svd_only: true,
            ..config
        };
        let mut out_svd = vec![hotspring_relink::lattice::su3::Su3Matrix::ZERO; field.links.len()];
        let s = unitarize_links(&field.links, &mut out_svd, &svd_config).expect("svd sweep");
        print_sweep_summary(&s);

        let worst = out
            .iter()
            .zip(out_svd.iter())
            .map(|(a, b)| a.diff_norm_sq(b).sqrt())
            .fold(0.0f64, f64::max);
        println!("  max |polar − svd| per link: {worst:.3e}");
        println!();
        Some(s)
    } else {
        None
    };

    if sweep.failures == 0 {
        println!("  unitarization successful — all links on SU(3)");
    } else {
        println!(
            "  {} links failed (rate {:.3e})",
            sweep.failures,
            sweep.failure_rate()
        );
    }

    if let Some(path) = json_path {
        let report = BenchReport {
            dims,
            drift,
            seed,
            config,
            sweep,
            svd_only_sweep,
        };
        if let Some(parent) = std::path::Path::new(&path).parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let json = serde_json::to_string_pretty(&report).expect("serialize report");
        std::fs::write(&path, json).expect("write report");
        println!("  report written to {path}");
    }
}
