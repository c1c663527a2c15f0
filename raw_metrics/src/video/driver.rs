//! Comparison driver.
//!
//! Opens both frame sources, computes the aligned frame schedule, runs every
//! active evaluator over each scheduled pair in index order, and finalizes
//! the per-sequence averages. Frame pairs are processed strictly
//! sequentially, so accumulation order is deterministic; parallelism lives
//! inside the evaluators.

use crate::video::format::{BitDepth, SequenceFormat};
use crate::video::msssim::MsSsimEvaluator;
use crate::video::mwdvqm::MwdvqmEvaluator;
use crate::video::psnr::PsnrEvaluator;
use crate::video::source::FrameSource;
use crate::video::ssim::SsimEvaluator;
use crate::video::uqi::UqiEvaluator;
use crate::video::{mse_to_psnr, Components, Evaluator, MetricMask, Pixel};
use crate::MetricsError;
use std::path::PathBuf;

/// Frame schedule of one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Every frame from the start of the sequence.
    Full,
    /// `count` frames starting at `first`, advancing by `step`. The count is
    /// clamped to the frames the source actually holds.
    Window {
        /// Number of frames to process.
        count: i64,
        /// First frame index.
        first: i64,
        /// Index increment between processed frames.
        step: i64,
    },
    /// Seek-stress mode: starting at `to`, read forward one frame at a time
    /// and jump back to `to` whenever the index reaches `from`, producing
    /// `(from - to) * (iterations + 1)` reads.
    Seek {
        /// Index that triggers the jump back.
        from: i64,
        /// Jump target and starting index.
        to: i64,
        /// Number of extra passes over the `[to, from)` range.
        iterations: i64,
    },
}

/// One input sequence and its per-source options.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Path of the raw file.
    pub path: PathBuf,
    /// Layout tag.
    pub format: SequenceFormat,
    /// Bottom field first, for interlaced layouts.
    pub bottom_first: bool,
    /// Right shift applied to every sample at load.
    pub rshift: u32,
    /// Frame schedule.
    pub schedule: Schedule,
}

impl SourceOptions {
    /// Options with the default schedule and no shift.
    pub fn new<P: Into<PathBuf>>(path: P, format: SequenceFormat) -> Self {
        SourceOptions {
            path: path.into(),
            format,
            bottom_first: false,
            rshift: 0,
            schedule: Schedule::Full,
        }
    }
}

/// Options of a whole comparison run.
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// The reference sequence.
    pub first: SourceOptions,
    /// The distorted sequence.
    pub second: SourceOptions,
    /// Luma width in pixels.
    pub width: usize,
    /// Luma height in pixels.
    pub height: usize,
    /// Bit depth of both sequences.
    pub bit_depth: BitDepth,
    /// Plane and metric selection.
    pub components: Components,
}

/// Benign schedule problems: reported alongside the results, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ScheduleWarning {
    /// A window's first frame lies at or past the end of its sequence;
    /// nothing is compared and the run still counts as success.
    FirstFrameBeyondEof,
    /// A seek-stress range is out of bounds for source `index` (1-based);
    /// that seek request is dropped and the run continues.
    BadSeekRange {
        /// Which source carried the bad range.
        index: usize,
    },
}

/// Everything one comparison run produced.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ComparisonResults {
    /// Produced metric names, e.g. `"Y-PSNR"`; overall entries use the bare
    /// metric name.
    pub metric_names: Vec<String>,
    /// Whether each name participates in the text output.
    pub output_flags: Vec<bool>,
    /// Per-frame values, one inner vector per scheduled pair, ordered like
    /// `metric_names`.
    pub per_frame: Vec<Vec<f64>>,
    /// Final per-sequence values, ordered like `metric_names`.
    pub averages: Vec<f64>,
    /// Schedule warnings raised during setup.
    pub warnings: Vec<ScheduleWarning>,
}

impl ComparisonResults {
    fn empty(warnings: Vec<ScheduleWarning>) -> Self {
        ComparisonResults {
            metric_names: Vec::new(),
            output_flags: Vec::new(),
            per_frame: Vec::new(),
            averages: Vec::new(),
            warnings,
        }
    }
}

/// Runs a full comparison.
///
/// Rejects incompatible sequence pairs, opens both sources, dispatches to
/// the 8- or 16-bit pipeline, and returns per-frame and per-sequence
/// results.
pub fn run_comparison(options: &CompareOptions) -> Result<ComparisonResults, MetricsError> {
    let f1 = options.first.format;
    let f2 = options.second.format;
    if f1.is_rgb() != f2.is_rgb() {
        return Err(MetricsError::ColorFamilyMismatch);
    }
    if f1.is_interlaced() != f2.is_interlaced() {
        return Err(MetricsError::InterlaceMismatch);
    }
    if f1.chroma_class() != f2.chroma_class() && options.components.chroma_requested() {
        return Err(MetricsError::ChromaMismatch);
    }
    match options.bit_depth {
        BitDepth::Eight => run::<u8>(options),
        _ => run::<u16>(options),
    }
}

fn open_source<T: Pixel>(
    options: &SourceOptions,
    width: usize,
    height: usize,
    bit_depth: BitDepth,
    index: usize,
) -> Result<FrameSource<T>, MetricsError> {
    FrameSource::open(
        &options.path,
        width,
        height,
        options.format,
        options.bottom_first,
        bit_depth,
        options.rshift,
    )
    .map_err(|e| match e {
        MetricsError::CannotOpenInput { path, .. } => MetricsError::CannotOpenInput { index, path },
        other => other,
    })
}

struct SourceSchedule {
    count: i64,
    first: i64,
    step: i64,
    seek: Option<(i64, i64, i64)>,
}

fn source_schedule(schedule: Schedule) -> SourceSchedule {
    match schedule {
        Schedule::Full => SourceSchedule {
            count: -1,
            first: 0,
            step: 1,
            seek: None,
        },
        Schedule::Window { count, first, step } => SourceSchedule {
            count,
            first,
            step: step.max(1),
            seek: None,
        },
        Schedule::Seek {
            from,
            to,
            iterations,
        } => SourceSchedule {
            count: -1,
            first: 0,
            step: 1,
            seek: (iterations > 0).then_some((from, to, iterations)),
        },
    }
}

fn clamp_window(sched: &mut SourceSchedule, source_len: i64, common_len: i64) {
    if sched.count < 0 {
        sched.count = common_len;
    } else {
        let last = (sched.first + (sched.count - 1) * sched.step + 1).min(source_len);
        sched.count = (last - sched.first - 1) / sched.step + 1;
    }
}

fn run<T: Pixel>(options: &CompareOptions) -> Result<ComparisonResults, MetricsError> {
    let mut warnings = Vec::new();
    let mut src1 = open_source::<T>(
        &options.first,
        options.width,
        options.height,
        options.bit_depth,
        1,
    )?;
    let mut src2 = open_source::<T>(
        &options.second,
        options.width,
        options.height,
        options.bit_depth,
        2,
    )?;

    let frames1 = src1.frame_count() as i64;
    let frames2 = src2.frame_count() as i64;
    let frames = frames1.min(frames2);
    if frames == 0 {
        return Err(MetricsError::EmptyInput);
    }

    let mut sched1 = source_schedule(options.first.schedule);
    let mut sched2 = source_schedule(options.second.schedule);

    if sched1.first >= frames1 || sched2.first >= frames2 {
        warnings.push(ScheduleWarning::FirstFrameBeyondEof);
        return Ok(ComparisonResults::empty(warnings));
    }

    clamp_window(&mut sched1, frames1, frames);
    clamp_window(&mut sched2, frames2, frames);

    for (index, sched, len) in [(1usize, &mut sched1, frames1), (2, &mut sched2, frames2)] {
        if let Some((from, to, _)) = sched.seek {
            if from < 1 || from > len || to < 0 || to >= len {
                sched.seek = None;
                warnings.push(ScheduleWarning::BadSeekRange { index });
            }
        }
    }

    if let Some((from, to, iterations)) = sched1.seek {
        sched1.count = (from - to) * (iterations + 1);
        sched1.first = to;
        if sched2.seek.is_none() {
            sched2.count = frames2;
        }
    }
    if let Some((from, to, iterations)) = sched2.seek {
        sched2.count = (from - to) * (iterations + 1);
        sched2.first = to;
        if sched1.seek.is_none() {
            sched1.count = frames1;
        }
    }

    let frame_count = sched1.count.min(sched2.count);

    let requested = options.components.requested();
    let mut evaluators: Vec<Box<dyn Evaluator<T>>> = Vec::new();
    if requested.intersects(MetricMask::PSNR | MetricMask::APSNR | MetricMask::MSE) {
        evaluators.push(Box::new(PsnrEvaluator::new()));
    }
    if requested.intersects(MetricMask::MSSIM | MetricMask::ARTIFACTS) {
        evaluators.push(Box::new(MsSsimEvaluator::new()));
    } else if requested.intersects(MetricMask::SSIM) {
        evaluators.push(Box::new(SsimEvaluator::new()));
    }
    if requested.intersects(MetricMask::MWDVQM) {
        evaluators.push(Box::new(MwdvqmEvaluator::new()));
    }
    if requested.intersects(MetricMask::UQI) {
        evaluators.push(Box::new(UqiEvaluator::new()));
    }

    let mut metric_names = Vec::new();
    let mut output_flags = Vec::new();
    let mut averages = Vec::new();
    for evaluator in &mut evaluators {
        evaluator.bind_selection(
            &options.components,
            &mut metric_names,
            &mut output_flags,
            &mut averages,
        );
    }
    for evaluator in &mut evaluators {
        evaluator.allocate(&src1)?;
    }

    if frame_count <= 0 {
        return Ok(ComparisonResults::empty(warnings));
    }

    let mut per_frame: Vec<Vec<f64>> = Vec::with_capacity(frame_count as usize);
    let mut idx1 = sched1.first;
    let mut idx2 = sched2.first;
    for _ in 0..frame_count {
        if let Some((from, to, _)) = sched1.seek {
            if idx1 == from {
                idx1 = to;
            }
        }
        if let Some((from, to, _)) = sched2.seek {
            if idx2 == from {
                idx2 = to;
            }
        }
        src1.read(idx1 as usize)?;
        src2.read(idx2 as usize)?;
        let mut row = Vec::with_capacity(metric_names.len());
        for evaluator in &mut evaluators {
            evaluator.compute(&src1, &src2, &mut row, &mut averages)?;
        }
        per_frame.push(row);
        idx1 += sched1.step;
        idx2 += sched2.step;
    }

    let norm = 1.0 / frame_count as f64;
    let max_err = options.bit_depth.max_error();
    for (name, avg) in metric_names.iter().zip(averages.iter_mut()) {
        *avg *= norm;
        if name.contains("PSNR") && !name.contains("APSNR") {
            *avg = mse_to_psnr(*avg, max_err);
        }
    }
    for (name, flag) in metric_names.iter().zip(output_flags.iter_mut()) {
        if name.contains("MSE") {
            *flag = false;
        }
    }

    Ok(ComparisonResults {
        metric_names,
        output_flags,
        per_frame,
        averages,
        warnings,
    })
}
