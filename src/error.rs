// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for sweep-level misuse.
//!
//! Per-link numerical failures are never errors — they are counted in
//! [`crate::unitarize::sweep::SweepStats`] and the sweep completes. This
//! enum covers only structural misuse detected before any projection runs:
//! mismatched buffers, misaligned flat layouts, and nonsensical tolerance
//! values.

use std::fmt;

/// Errors arising from sweep setup.
#[derive(Debug)]
pub enum RelinkError {
    /// Input and output link buffers have different lengths.
    LengthMismatch {
        /// Input buffer length (links or reals, depending on entry point).
        input: usize,
        /// Output buffer length.
        output: usize,
    },

    /// A flat buffer's length is not a multiple of 18 reals per link.
    NotLinkAligned {
        /// Offending buffer length in reals.
        len: usize,
    },

    /// A tolerance in the configuration is non-positive or non-finite.
    InvalidConfig(String),
}

impl fmt::Display for RelinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { input, output } => {
                write!(
                    f,
                    "Input/output link buffers differ in length: {input} vs {output}"
                )
            }
            Self::NotLinkAligned { len } => {
                write!(
                    f,
                    "Flat link buffer length {len} is not a multiple of 18 reals per link"
                )
            }
            Self::InvalidConfig(msg) => write!(f, "Invalid unitarization config: {msg}"),
        }
    }
}

impl std::error::Error for RelinkError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_length_mismatch() {
        let err = RelinkError::LengthMismatch {
            input: 12,
            output: 8,
        };
        assert_eq!(
            err.to_string(),
            "Input/output link buffers differ in length: 12 vs 8"
        );
    }

    #[test]
    fn display_not_link_aligned() {
        let err = RelinkError::NotLinkAligned { len: 17 };
        assert!(err.to_string().contains("17"));
        assert!(err.to_string().contains("18"));
    }

    #[test]
    fn display_invalid_config() {
        let err = RelinkError::InvalidConfig("unitarity_eps must be positive".into());
        assert!(err.to_string().contains("unitarity_eps"));
    }

    #[test]
    fn error_trait_works() {
        let err = RelinkError::NotLinkAligned { len: 5 };
        let dyn_err: &dyn std::error::Error = &err;
        assert!(dyn_err.to_string().contains("5"));
    }
}
