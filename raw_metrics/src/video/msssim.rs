//! Multi-scale structural similarity, shared with single-scale SSIM and the
//! artifact counter.
//!
//! MS-SSIM evaluates the SSIM contrast/structure term on a five-level
//! pyramid built by 2x area-average decimation and combines the levels with
//! the exponents from the original publication:
//! https://ece.uwaterloo.ca/~z70wang/publications/msssim.pdf
//!
//! The smoothing runs as a streaming row-wise convolution: each horizontal
//! band of the valid region keeps a ring of `ysz` row-filtered buffers for
//! the five quantities and reduces its partial sums independently, so bands
//! parallelize as a plain summation reduction.

use crate::video::format::ChromaClass;
use crate::video::kernels::{convert_to_f32, downsample_2x_f32};
use crate::video::plane::{PlaneBuf, Roi};
use crate::video::source::FrameSource;
use crate::video::ssim::{kernel_indices, smoothing_kernels, ssim_constants};
use crate::video::{
    aggregate_overall, bind_names, Components, Evaluator, MetricDesc, MetricMask, Pixel, Selection,
};
use crate::MetricsError;
use rayon::prelude::*;

const METRICS: [MetricDesc; 3] = [
    MetricDesc {
        name: "MSSIM",
        output: MetricMask::MSSIM,
        compute: MetricMask::MSSIM,
    },
    MetricDesc {
        name: "SSIM",
        output: MetricMask::SSIM,
        compute: MetricMask::SSIM,
    },
    MetricDesc {
        name: "ARTIFACTS",
        output: MetricMask::ARTIFACTS,
        compute: MetricMask::ARTIFACTS,
    },
];

const PYRAMID_DEPTH: usize = 5;
const MIN_BAND_HEIGHT: usize = 64;
const MAX_BAND_CONTEXTS: usize = 8;
const ARTIFACT_THRESHOLD: f64 = 0.3;
const MS_WEIGHTS: [f64; PYRAMID_DEPTH] = [0.0448, 0.2856, 0.3001, 0.2363, 0.1333];
const MIN_PLANE: usize = 176;

fn ssim_family() -> MetricMask {
    MetricMask::MSSIM | MetricMask::SSIM | MetricMask::ARTIFACTS
}

/// Evaluator producing MS-SSIM, single-scale SSIM and the artifact count
/// from one shared pyramid per plane.
pub struct MsSsimEvaluator {
    sel: Selection,
    chroma_class: ChromaClass,
    kernels: [Vec<f32>; 3],
    xk: [usize; 4],
    yk: [usize; 4],
    c1: f32,
    c2: f32,
    im1: PlaneBuf<f32>,
    im2: PlaneBuf<f32>,
    imt: PlaneBuf<f32>,
}

impl MsSsimEvaluator {
    /// Creates an unbound evaluator.
    pub fn new() -> Self {
        MsSsimEvaluator {
            sel: Selection::unbound(),
            chroma_class: ChromaClass::C420,
            kernels: smoothing_kernels(),
            xk: [0; 4],
            yk: [0; 4],
            c1: 0.0,
            c2: 0.0,
            im1: PlaneBuf::empty(),
            im2: PlaneBuf::empty(),
            imt: PlaneBuf::empty(),
        }
    }
}

impl Default for MsSsimEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pixel> Evaluator<T> for MsSsimEvaluator {
    fn bind_selection(
        &mut self,
        components: &Components,
        names: &mut Vec<String>,
        output_flags: &mut Vec<bool>,
        averages: &mut Vec<f64>,
    ) {
        self.sel = bind_names(&METRICS, components, names, output_flags, averages);
    }

    fn allocate(&mut self, reference: &FrameSource<T>) -> Result<(), MetricsError> {
        self.chroma_class = reference.format().chroma_class();
        let (xk, yk) = kernel_indices(self.chroma_class, reference.is_interlaced());
        self.xk = xk;
        self.yk = yk;
        let (c1, c2) = ssim_constants(reference.bit_depth().max_error());
        self.c1 = c1;
        self.c2 = c2;

        let p0 = reference.plane(0);
        let mut min = Roi::new(MIN_PLANE, MIN_PLANE);
        let chroma_active = self.sel.c_mask[1].intersects(ssim_family())
            || self.sel.c_mask[2].intersects(ssim_family());
        if chroma_active {
            match self.chroma_class {
                ChromaClass::C420 => {}
                ChromaClass::C422 => min.width *= 2,
                ChromaClass::C444 => {
                    min.width *= 2;
                    min.height *= 2;
                }
            }
        }
        if p0.width < min.width || p0.height < min.height {
            return Err(MetricsError::UnsupportedInput {
                reason: "frame too small for multi-scale SSIM",
            });
        }

        self.im1 = PlaneBuf::new(p0.width, p0.height);
        self.im2 = PlaneBuf::new(p0.width, p0.height);
        self.imt = PlaneBuf::new(p0.width, p0.height);
        Ok(())
    }

    fn compute(
        &mut self,
        first: &FrameSource<T>,
        second: &FrameSource<T>,
        values: &mut Vec<f64>,
        averages: &mut [f64],
    ) -> Result<(), MetricsError> {
        let sel = self.sel;
        let mut ms_idx = [0.0f64; 5];
        let mut ss_idx = [0.0f64; 5];
        let mut af_idx = [0.0f64; 5];

        for i in 0..sel.num_planes {
            if !sel.c_mask[i].intersects(ssim_family()) {
                continue;
            }
            let p1 = first.plane(i);
            let p2 = second.plane(i);
            let depth = if sel.c_mask[i].intersects(MetricMask::MSSIM | MetricMask::ARTIFACTS) {
                PYRAMID_DEPTH
            } else {
                1
            };

            let stride = self.im1.stride();
            convert_to_f32(p1, self.im1.data_mut(), stride)?;
            convert_to_f32(p2, self.im2.data_mut(), stride)?;
            let mut cur = p1.roi();

            let xknl = self.kernels[self.xk[i]].clone();
            let yknl = self.kernels[self.yk[i]].clone();
            let c1 = self.c1;
            let c2 = self.c2 + self.c1;

            let mut mssim = [0.0f64; PYRAMID_DEPTH];
            let mut mcs = [0.0f64; PYRAMID_DEPTH];
            let mut artcnt = [0.0f64; PYRAMID_DEPTH];

            for k in 0..depth {
                if k > 0 {
                    let out =
                        downsample_2x_f32(self.im1.data(), stride, cur, self.imt.data_mut(), stride)?;
                    std::mem::swap(&mut self.im1, &mut self.imt);
                    downsample_2x_f32(self.im2.data(), stride, cur, self.imt.data_mut(), stride)?;
                    std::mem::swap(&mut self.im2, &mut self.imt);
                    cur = out;
                }

                // A scale too small for the kernels contributes nothing.
                if cur.width < xknl.len() || cur.height < yknl.len() {
                    continue;
                }
                let valid = Roi::new(cur.width - xknl.len() + 1, cur.height - yknl.len() + 1);

                let mut bands = valid.height / MIN_BAND_HEIGHT;
                bands = bands.max(1).min(MAX_BAND_CONTEXTS);
                bands = bands.min(rayon::current_num_threads().max(1));
                let band_height = valid.height / bands;

                let im1 = self.im1.data();
                let im2 = self.im2.data();
                let parts: Vec<(f64, f64, u64)> = (0..bands)
                    .into_par_iter()
                    .map(|r| {
                        let y0 = r * band_height;
                        let rows = if r + 1 == bands {
                            valid.height - y0
                        } else {
                            band_height
                        };
                        band_ssim(im1, im2, stride, cur.width, y0, rows, &xknl, &yknl, c1, c2)
                    })
                    .collect();

                let mut ssim_sum = 0.0f64;
                let mut cs_sum = 0.0f64;
                let mut art_sum = 0u64;
                for (s, c, a) in parts {
                    ssim_sum += s;
                    cs_sum += c;
                    art_sum += a;
                }
                let count = valid.area() as f64;
                mssim[k] = (ssim_sum / count).max(0.0);
                mcs[k] = (cs_sum / count).max(0.0);
                artcnt[k] = (art_sum as f64 / count).max(0.0);
            }

            if sel.c_mask[i].intersects(MetricMask::MSSIM) {
                let mut combined = mssim[PYRAMID_DEPTH - 1].powf(MS_WEIGHTS[PYRAMID_DEPTH - 1]);
                for k in 0..PYRAMID_DEPTH - 1 {
                    combined *= mcs[k].powf(MS_WEIGHTS[k]);
                }
                ms_idx[i] = combined;
            }
            if sel.c_mask[i].intersects(MetricMask::SSIM) {
                ss_idx[i] = mssim[0];
            }
            if sel.c_mask[i].intersects(MetricMask::ARTIFACTS) {
                af_idx[i] = 0.5 * (artcnt[3] + artcnt[4]);
            }
        }

        let mut j = values.len();
        for (mask, idx) in [
            (MetricMask::MSSIM, &mut ms_idx),
            (MetricMask::SSIM, &mut ss_idx),
            (MetricMask::ARTIFACTS, &mut af_idx),
        ] {
            for i in 0..sel.num_planes {
                if sel.c_mask[i].intersects(mask) {
                    values.push(idx[i]);
                    averages[j] += idx[i];
                    j += 1;
                }
            }
            if sel.c_mask[sel.num_planes].intersects(mask) {
                let overall = aggregate_overall(self.chroma_class, idx, sel.num_planes);
                idx[sel.num_planes] = overall;
                values.push(overall);
                averages[j] += overall;
                j += 1;
            }
        }
        Ok(())
    }
}

/// Horizontal convolution of one row into its ring slot.
fn row_conv(src: &[f32], kernel: &[f32], dst: &mut [f32]) {
    for (x, d) in dst.iter_mut().enumerate() {
        let mut acc = 0.0f64;
        for (k, w) in kernel.iter().enumerate() {
            acc += *w as f64 * src[x + k] as f64;
        }
        *d = acc as f32;
    }
}

/// Streams one horizontal band of the valid region and returns its partial
/// `(sum of ssim, sum of cs, artifact count)`.
///
/// `y0`/`rows` address output rows of the valid region; the band reads input
/// rows `y0 .. y0 + rows + ysz - 1` and owns its ring of filtered rows, so
/// concurrent bands share nothing writable.
fn band_ssim(
    src1: &[f32],
    src2: &[f32],
    stride: usize,
    width: usize,
    y0: usize,
    rows: usize,
    xknl: &[f32],
    yknl: &[f32],
    c1: f32,
    c2: f32,
) -> (f64, f64, u64) {
    let xsz = xknl.len();
    let ysz = yknl.len();
    let vw = width - xsz + 1;

    // Ring layout: quantity q occupies slots [q*ysz, (q+1)*ysz).
    let mut ring: Vec<Vec<f32>> = (0..5 * ysz).map(|_| vec![0.0f32; vw]).collect();
    let mut sq1 = vec![0.0f32; width];
    let mut sq2 = vec![0.0f32; width];
    let mut m12 = vec![0.0f32; width];
    let mut moments: Vec<[f64; 5]> = vec![[0.0; 5]; vw];

    let mut ssim = 0.0f64;
    let mut cs = 0.0f64;
    let mut artifacts = 0u64;

    for n in 0..rows + ysz - 1 {
        let iy = y0 + n;
        let r1 = &src1[iy * stride..iy * stride + width];
        let r2 = &src2[iy * stride..iy * stride + width];
        for x in 0..width {
            sq1[x] = r1[x] * r1[x];
            sq2[x] = r2[x] * r2[x];
            m12[x] = r1[x] * r2[x];
        }
        let slot = n % ysz;
        row_conv(r1, xknl, &mut ring[slot]);
        row_conv(r2, xknl, &mut ring[ysz + slot]);
        row_conv(&sq1, xknl, &mut ring[2 * ysz + slot]);
        row_conv(&sq2, xknl, &mut ring[3 * ysz + slot]);
        row_conv(&m12, xknl, &mut ring[4 * ysz + slot]);

        if n + 1 < ysz {
            continue;
        }
        for m in moments.iter_mut() {
            *m = [0.0; 5];
        }
        for i in 0..ysz {
            let s = (n + 1 - ysz + i) % ysz;
            let w = yknl[i] as f64;
            for q in 0..5 {
                let row = &ring[q * ysz + s];
                for (m, v) in moments.iter_mut().zip(row) {
                    m[q] += w * *v as f64;
                }
            }
        }
        for m in &moments {
            let mx = m[0] as f32;
            let my = m[1] as f32;
            let t1 = 2.0 * mx * my + c1;
            let t2 = 2.0 * m[4] as f32 - t1 + c2;
            let t3 = mx * mx + my * my + c1;
            let t4 = m[2] as f32 + m[3] as f32 - t3 + c2;
            let cs_term = t2 as f64 / t4 as f64;
            cs += cs_term;
            ssim += (t1 * t2) as f64 / (t3 * t4) as f64;
            if cs_term < ARTIFACT_THRESHOLD {
                artifacts += 1;
            }
        }
    }
    (ssim, cs, artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::format::{BitDepth, SequenceFormat};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn textured_i420(w: usize, h: usize) -> Vec<u8> {
        let mut bytes: Vec<u8> = (0..w * h)
            .map(|i| {
                let x = i % w;
                let y = i / w;
                ((x * 3 + y * 5 + (x * y) % 31) % 256) as u8
            })
            .collect();
        bytes.resize(w * h * 3 / 2, 100);
        bytes
    }

    fn open_i420(f: &NamedTempFile, w: usize, h: usize) -> FrameSource<u8> {
        let mut s: FrameSource<u8> = FrameSource::open(
            f.path(),
            w,
            h,
            SequenceFormat::I420P,
            false,
            BitDepth::Eight,
            0,
        )
        .unwrap();
        s.read(0).unwrap();
        s
    }

    #[test]
    fn identical_frames_score_one_with_no_artifacts() {
        let w = 352;
        let h = 288;
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&textured_i420(w, h)).unwrap();
        f.flush().unwrap();
        let src1 = open_i420(&f, w, h);
        let src2 = open_i420(&f, w, h);

        let mut eval = MsSsimEvaluator::new();
        let mut components = Components::yuv();
        components.add_plane(0, MetricMask::MSSIM | MetricMask::SSIM | MetricMask::ARTIFACTS);
        let (mut names, mut flags, mut avgs) = (Vec::new(), Vec::new(), Vec::new());
        Evaluator::<u8>::bind_selection(&mut eval, &components, &mut names, &mut flags, &mut avgs);
        assert_eq!(names, vec!["Y-MSSIM", "Y-SSIM", "Y-ARTIFACTS"]);

        eval.allocate(&src1).unwrap();
        let mut values = Vec::new();
        eval.compute(&src1, &src2, &mut values, &mut avgs).unwrap();
        assert!((values[0] - 1.0).abs() < 1e-6, "mssim = {}", values[0]);
        assert!((values[1] - 1.0).abs() < 1e-6, "ssim = {}", values[1]);
        assert_eq!(values[2], 0.0);
    }

    #[test]
    fn distortion_lowers_the_score() {
        let w = 352;
        let h = 288;
        let clean = textured_i420(w, h);
        let mut noisy = clean.clone();
        for (i, b) in noisy.iter_mut().enumerate().take(w * h) {
            if i % 3 == 0 {
                *b = b.wrapping_add(24);
            }
        }
        let mut f1 = NamedTempFile::new().unwrap();
        f1.write_all(&clean).unwrap();
        f1.flush().unwrap();
        let mut f2 = NamedTempFile::new().unwrap();
        f2.write_all(&noisy).unwrap();
        f2.flush().unwrap();
        let src1 = open_i420(&f1, w, h);
        let src2 = open_i420(&f2, w, h);

        let mut eval = MsSsimEvaluator::new();
        let mut components = Components::yuv();
        components.add_plane(0, MetricMask::MSSIM);
        let (mut names, mut flags, mut avgs) = (Vec::new(), Vec::new(), Vec::new());
        Evaluator::<u8>::bind_selection(&mut eval, &components, &mut names, &mut flags, &mut avgs);
        eval.allocate(&src1).unwrap();
        let mut values = Vec::new();
        eval.compute(&src1, &src2, &mut values, &mut avgs).unwrap();
        assert!(values[0] > 0.0 && values[0] < 0.999, "mssim = {}", values[0]);
    }

    #[test]
    fn small_frames_are_rejected() {
        let w = 96;
        let h = 96;
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&textured_i420(w, h)).unwrap();
        f.flush().unwrap();
        let src = open_i420(&f, w, h);

        let mut eval = MsSsimEvaluator::new();
        let mut components = Components::yuv();
        components.add_plane(0, MetricMask::MSSIM);
        let (mut names, mut flags, mut avgs) = (Vec::new(), Vec::new(), Vec::new());
        Evaluator::<u8>::bind_selection(&mut eval, &components, &mut names, &mut flags, &mut avgs);
        assert!(eval.allocate(&src).is_err());
    }
}
