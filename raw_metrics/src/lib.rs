//! `raw_metrics` computes full-reference quality metrics between two raw
//! (uncompressed) video sequences: PSNR, APSNR, MSE, SSIM, MS-SSIM, an
//! SSIM-derived artifact count, MWDVQM and UQI.
//!
//! Inputs are raw elementary streams of declared geometry; a dozen packed,
//! planar and interlaced YUV and RGB layouts are supported at 8, 10, 12 and
//! 16 bits per sample. Results are produced per frame and averaged across a
//! frame range, broken down per image plane and overall.

#![allow(clippy::cast_lossless)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::unreadable_literal)]
#![deny(missing_docs)]

#[macro_use]
extern crate itertools;
#[macro_use]
extern crate thiserror;

pub mod video;

/// Possible errors that may occur while opening inputs or computing metrics.
///
/// This enum may be added to in the future and should not be assumed to be
/// exhaustive.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A primitive was called with an out-of-range argument, an empty region
    /// of interest, or a buffer too small for the requested geometry.
    #[error("Invalid parameter: {reason}")]
    InvalidParam {
        #[doc(hidden)]
        reason: &'static str,
    },
    /// An input file could not be opened.
    #[error("Unable to open sequence file {index}: {path}")]
    CannotOpenInput {
        #[doc(hidden)]
        index: usize,
        #[doc(hidden)]
        path: String,
    },
    /// An input file contains no whole frame.
    #[error("Empty input file!")]
    EmptyInput,
    /// An input file could be read, but is not supported by the current
    /// metric.
    #[error("Input not supported: {reason}")]
    UnsupportedInput {
        #[doc(hidden)]
        reason: &'static str,
    },
    /// One sequence is RGB and the other YUV.
    #[error("Unable to compare RGB with YUV!")]
    ColorFamilyMismatch,
    /// One sequence is interlaced and the other progressive.
    #[error("Unable to compare interlaced with progressive sequences!")]
    InterlaceMismatch,
    /// Chroma-plane metrics were requested for sequences whose chroma
    /// sampling differs.
    #[error("Unable to compare sequences of different sizes on chromaticity channels!")]
    ChromaMismatch,
    /// An input file ended in the middle of a frame that the schedule said
    /// should exist.
    #[error("Could not read input file: {reason}")]
    MalformedInput {
        #[doc(hidden)]
        reason: &'static str,
    },
    /// A working buffer could not be sized for the requested geometry.
    #[error("Failed to allocate memory!")]
    MemoryAlloc,
}

#[cfg(test)]
pub(crate) fn assert_metric_eq(expected: f64, value: f64) {
    assert!(
        (expected - value).abs() < 0.005,
        "expected {}, got {}",
        expected,
        value
    );
}
