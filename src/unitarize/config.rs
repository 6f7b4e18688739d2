// SPDX-License-Identifier: AGPL-3.0-only

//! Sweep configuration — an explicit value, not process state.
//!
//! The engine takes the configuration by shared reference into every sweep
//! call. There is no global configure step: concurrent sweeps with different
//! tolerances are safe by construction, and reconfiguring mid-sweep is
//! unrepresentable.

use serde::{Deserialize, Serialize};

use crate::error::RelinkError;
use crate::tolerances::{
    DEFAULT_MAX_ALLOWED_ERROR, DEFAULT_SVD_ABS_ERROR, DEFAULT_SVD_REL_ERROR,
    DEFAULT_UNITARITY_EPS,
};

/// Tolerances and strategy selection for one unitarization sweep.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitarizeConfig {
    /// Frobenius-norm step threshold that stops the polar iteration.
    pub unitarity_eps: f64,
    /// Deviation above which a projected link counts as a failure.
    pub max_allowed_error: f64,
    /// Permit the SVD fallback when the polar iteration does not converge.
    pub allow_svd: bool,
    /// Route every link through the SVD path, bypassing the polar iteration.
    /// Used for validating the fallback against the fast path.
    pub svd_only: bool,
    /// Relative reconstruction tolerance for accepting an SVD result.
    pub svd_rel_error: f64,
    /// Absolute reconstruction tolerance for accepting an SVD result.
    pub svd_abs_error: f64,
}

impl Default for UnitarizeConfig {
    fn default() -> Self {
        Self {
            unitarity_eps: DEFAULT_UNITARITY_EPS,
            max_allowed_error: DEFAULT_MAX_ALLOWED_ERROR,
            allow_svd: true,
            svd_only: false,
            svd_rel_error: DEFAULT_SVD_REL_ERROR,
            svd_abs_error: DEFAULT_SVD_ABS_ERROR,
        }
    }
}

impl UnitarizeConfig {
    /// True when any path may use the SVD (`svd_only` forces it regardless
    /// of `allow_svd`).
    #[must_use]
    pub const fn svd_permitted(&self) -> bool {
        self.allow_svd || self.svd_only
    }

    /// Reject non-positive or non-finite tolerances before a sweep starts.
    ///
    /// # Errors
    ///
    /// [`RelinkError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), RelinkError> {
        let checks = [
            ("unitarity_eps", self.unitarity_eps),
            ("max_allowed_error", self.max_allowed_error),
            ("svd_rel_error", self.svd_rel_error),
            ("svd_abs_error", self.svd_abs_error),
        ];
        for (name, v) in checks {
            if !(v.is_finite() && v > 0.0) {
                return Err(RelinkError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {v}"
                )));
            }
        }
        Ok(())
    }
}
