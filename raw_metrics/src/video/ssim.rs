//! Structural Similarity index, single-scale.
//!
//! The SSIM index is a full reference metric; the measurement is based on
//! an initial uncompressed or distortion-free image as reference. SSIM is
//! designed to improve on traditional methods such as PSNR and MSE.
//!
//! See https://en.wikipedia.org/wiki/Structural_similarity for more details.

use crate::video::format::ChromaClass;
use crate::video::kernels::{
    convert_to_f32, filter_col_f32, filter_row_f32, mean_f32, mul_f32, square_f32,
};
use crate::video::plane::{PlaneBuf, Roi};
use crate::video::source::FrameSource;
use crate::video::{
    aggregate_overall, bind_names, Components, Evaluator, MetricDesc, MetricMask, Pixel, Selection,
};
use crate::MetricsError;

const METRICS: [MetricDesc; 1] = [MetricDesc {
    name: "SSIM",
    output: MetricMask::SSIM,
    compute: MetricMask::SSIM,
}];

/// Builds a normalized 1-D Gaussian kernel of the given size.
pub(crate) fn gaussian_kernel(size: usize, sigma: f32) -> Vec<f32> {
    let mut kernel = vec![0.0f32; size];
    let mut sum = 0.0f32;
    for (i, k) in kernel.iter_mut().enumerate() {
        let val = (i as i32 - (size / 2) as i32) as f32;
        *k = (-(val * val) / (2.0 * sigma * sigma)).exp();
        sum += *k;
    }
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// The three smoothing kernels; index 0 applies to full-resolution planes
/// and each halving of resolution advances one index.
pub(crate) fn smoothing_kernels() -> [Vec<f32>; 3] {
    [
        gaussian_kernel(11, 1.5),
        gaussian_kernel(7, 0.75),
        gaussian_kernel(5, 0.375),
    ]
}

/// Per-plane horizontal and vertical kernel indices. Chroma planes advance
/// the horizontal index when horizontally subsampled and the vertical index
/// when vertically subsampled; interlaced sources advance every vertical
/// index to compensate the halved field height.
pub(crate) fn kernel_indices(class: ChromaClass, interlaced: bool) -> ([usize; 4], [usize; 4]) {
    let mut xk = [0usize; 4];
    let mut yk = [0usize; 4];
    for i in 0..4 {
        if i != 0 {
            match class {
                ChromaClass::C444 => {}
                ChromaClass::C422 => xk[i] += 1,
                ChromaClass::C420 => {
                    xk[i] += 1;
                    yk[i] += 1;
                }
            }
        }
        if interlaced {
            yk[i] += 1;
        }
    }
    (xk, yk)
}

/// The stabilizing constants `(K1*MaxErr)^2` and `(K2*MaxErr)^2` with
/// `K1 = 0.01` and `K2 = 0.03`.
pub(crate) fn ssim_constants(max_err: f64) -> (f32, f32) {
    let m = max_err as f32;
    (0.0001 * m * m, 0.0009 * m * m)
}

/// Fuses the five smoothed maps into the SSIM map.
fn ssim_map(
    mu1: &[f32],
    mu2: &[f32],
    mu1_sq: &[f32],
    mu2_sq: &[f32],
    mu1_mu2: &[f32],
    dst: &mut [f32],
    stride: usize,
    roi: Roi,
    c1: f32,
    c2: f32,
) {
    let c2 = c2 + c1;
    for y in 0..roi.height {
        let o = y * stride;
        for x in 0..roi.width {
            let mx = mu1[o + x];
            let my = mu2[o + x];
            let t1 = 2.0 * mx * my + c1;
            let t2 = 2.0 * mu1_mu2[o + x] - t1 + c2;
            let t3 = mx * mx + my * my + c1;
            let t4 = mu1_sq[o + x] + mu2_sq[o + x] - t3 + c2;
            dst[o + x] = if t3 * t4 >= f32::EPSILON {
                (t1 * t2) / (t3 * t4)
            } else if t3 >= f32::EPSILON {
                t1 / t3
            } else {
                1.0
            };
        }
    }
}

/// Single-scale SSIM evaluator using separable Gaussian smoothing over the
/// valid region of each plane.
pub struct SsimEvaluator {
    sel: Selection,
    chroma_class: ChromaClass,
    kernels: [Vec<f32>; 3],
    xk: [usize; 4],
    yk: [usize; 4],
    c1: f32,
    c2: f32,
    mu1: PlaneBuf<f32>,
    mu2: PlaneBuf<f32>,
    mu1_sq: PlaneBuf<f32>,
    mu2_sq: PlaneBuf<f32>,
    mu1_mu2: PlaneBuf<f32>,
    tmp: PlaneBuf<f32>,
}

impl SsimEvaluator {
    /// Creates an unbound evaluator.
    pub fn new() -> Self {
        SsimEvaluator {
            sel: Selection::unbound(),
            chroma_class: ChromaClass::C420,
            kernels: smoothing_kernels(),
            xk: [0; 4],
            yk: [0; 4],
            c1: 0.0,
            c2: 0.0,
            mu1: PlaneBuf::empty(),
            mu2: PlaneBuf::empty(),
            mu1_sq: PlaneBuf::empty(),
            mu2_sq: PlaneBuf::empty(),
            mu1_mu2: PlaneBuf::empty(),
            tmp: PlaneBuf::empty(),
        }
    }
}

impl Default for SsimEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pixel> Evaluator<T> for SsimEvaluator {
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
        if p0.is_empty() {
            return Err(MetricsError::MemoryAlloc);
        }
        self.mu1 = PlaneBuf::new(p0.width, p0.height);
        self.mu2 = PlaneBuf::new(p0.width, p0.height);
        self.mu1_sq = PlaneBuf::new(p0.width, p0.height);
        self.mu2_sq = PlaneBuf::new(p0.width, p0.height);
        self.mu1_mu2 = PlaneBuf::new(p0.width, p0.height);
        self.tmp = PlaneBuf::new(p0.width, p0.height);
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
        let mut sums = [0.0f64; 5];
        let mut j = values.len();

        for i in 0..sel.num_planes {
            if !sel.c_mask[i].intersects(MetricMask::SSIM) {
                continue;
            }
            let p1 = first.plane(i);
            let p2 = second.plane(i);
            let roi = p1.roi();
            let stride = self.mu1.stride();

            let kx = self.xk[i];
            let ky = self.yk[i];
            let xsz = self.kernels[kx].len();
            let ysz = self.kernels[ky].len();
            if roi.width < xsz || roi.height < ysz {
                return Err(MetricsError::UnsupportedInput {
                    reason: "plane smaller than the smoothing kernel",
                });
            }
            let valid = Roi::new(roi.width - xsz + 1, roi.height - ysz + 1);
            let rows = Roi::new(valid.width, roi.height);

            convert_to_f32(p1, self.mu1.data_mut(), stride)?;
            convert_to_f32(p2, self.mu2.data_mut(), stride)?;
            square_f32(self.mu1.data(), stride, self.mu1_sq.data_mut(), stride, roi)?;
            square_f32(self.mu2.data(), stride, self.mu2_sq.data_mut(), stride, roi)?;
            mul_f32(
                self.mu1.data(),
                stride,
                self.mu2.data(),
                stride,
                self.mu1_mu2.data_mut(),
                stride,
                roi,
            )?;

            let xknl = &self.kernels[kx];
            let yknl = &self.kernels[ky];
            filter_row_f32(self.mu1.data(), stride, self.tmp.data_mut(), stride, rows, xknl)?;
            filter_col_f32(self.tmp.data(), stride, self.mu1.data_mut(), stride, valid, yknl)?;
            filter_row_f32(self.mu2.data(), stride, self.tmp.data_mut(), stride, rows, xknl)?;
            filter_col_f32(self.tmp.data(), stride, self.mu2.data_mut(), stride, valid, yknl)?;
            filter_row_f32(
                self.mu1_sq.data(),
                stride,
                self.tmp.data_mut(),
                stride,
                rows,
                xknl,
            )?;
            filter_col_f32(
                self.tmp.data(),
                stride,
                self.mu1_sq.data_mut(),
                stride,
                valid,
                yknl,
            )?;
            filter_row_f32(
                self.mu2_sq.data(),
                stride,
                self.tmp.data_mut(),
                stride,
                rows,
                xknl,
            )?;
            filter_col_f32(
                self.tmp.data(),
                stride,
                self.mu2_sq.data_mut(),
                stride,
                valid,
                yknl,
            )?;
            filter_row_f32(
                self.mu1_mu2.data(),
                stride,
                self.tmp.data_mut(),
                stride,
                rows,
                xknl,
            )?;
            filter_col_f32(
                self.tmp.data(),
                stride,
                self.mu1_mu2.data_mut(),
                stride,
                valid,
                yknl,
            )?;

            ssim_map(
                self.mu1.data(),
                self.mu2.data(),
                self.mu1_sq.data(),
                self.mu2_sq.data(),
                self.mu1_mu2.data(),
                self.tmp.data_mut(),
                stride,
                valid,
                self.c1,
                self.c2,
            );
            sums[i] = mean_f32(self.tmp.data(), stride, valid)?;
            values.push(sums[i]);
            averages[j] += sums[i];
            j += 1;
        }

        if sel.c_mask[sel.num_planes].intersects(MetricMask::SSIM) {
            sums[sel.num_planes] = aggregate_overall(self.chroma_class, &sums, sel.num_planes);
            values.push(sums[sel.num_planes]);
            averages[j] += sums[sel.num_planes];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::format::{BitDepth, SequenceFormat};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn kernels_are_normalized() {
        for kernel in smoothing_kernels() {
            let sum: f32 = kernel.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
            // Symmetric around the center tap.
            let n = kernel.len();
            for i in 0..n / 2 {
                assert!((kernel[i] - kernel[n - 1 - i]).abs() < 1e-7);
            }
        }
    }

    #[test]
    fn kernel_indices_compensate_resolution() {
        let (xk, yk) = kernel_indices(ChromaClass::C420, false);
        assert_eq!(xk, [0, 1, 1, 1]);
        assert_eq!(yk, [0, 1, 1, 1]);
        let (xk, yk) = kernel_indices(ChromaClass::C422, true);
        assert_eq!(xk, [0, 1, 1, 1]);
        assert_eq!(yk, [1, 1, 1, 1]);
        let (xk, yk) = kernel_indices(ChromaClass::C444, false);
        assert_eq!(xk, [0, 0, 0, 0]);
        assert_eq!(yk, [0, 0, 0, 0]);
    }

    #[test]
    fn identical_planes_score_one() {
        let w = 32;
        let h = 24;
        let mut bytes: Vec<u8> = (0..w * h).map(|i| (i * 7 % 251) as u8).collect();
        bytes.resize(w * h * 3 / 2, 128);
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&bytes).unwrap();
        f.flush().unwrap();

        let open = || {
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
        };
        let src1 = open();
        let src2 = open();

        let mut eval = SsimEvaluator::new();
        let mut components = Components::yuv();
        components.add_plane(0, MetricMask::SSIM);
        let (mut names, mut flags, mut avgs) = (Vec::new(), Vec::new(), Vec::new());
        Evaluator::<u8>::bind_selection(&mut eval, &components, &mut names, &mut flags, &mut avgs);
        eval.allocate(&src1).unwrap();
        let mut values = Vec::new();
        eval.compute(&src1, &src2, &mut values, &mut avgs).unwrap();
        assert_eq!(names, vec!["Y-SSIM"]);
        assert!((values[0] - 1.0).abs() < 1e-6);
    }
}
