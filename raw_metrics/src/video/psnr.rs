//! Peak Signal-to-Noise Ratio metric.
//!
//! PSNR is defined via the mean squared error between two images. Two
//! flavors are produced: `PSNR` converts the MSE averaged across the whole
//! sequence, while `APSNR` averages the per-frame PSNR values directly.
//! The underlying MSE is tracked as a metric of its own so the sequence
//! average can be formed on the error scale.
//!
//! See https://en.wikipedia.org/wiki/Peak_signal-to-noise_ratio for more details.

use crate::video::format::ChromaClass;
use crate::video::kernels::l2_norm_diff;
use crate::video::source::FrameSource;
use crate::video::{
    aggregate_overall, bind_names, mse_to_psnr, Components, Evaluator, MetricDesc, MetricMask,
    Pixel, Selection,
};
use crate::MetricsError;

const METRICS: [MetricDesc; 3] = [
    MetricDesc {
        name: "MSE",
        output: MetricMask::MSE,
        compute: MetricMask::MSE,
    },
    MetricDesc {
        name: "PSNR",
        output: MetricMask::PSNR,
        compute: MetricMask::PSNR,
    },
    MetricDesc {
        name: "APSNR",
        output: MetricMask::APSNR,
        compute: MetricMask::APSNR,
    },
];

/// Evaluator producing MSE, PSNR and APSNR per plane and overall.
pub struct PsnrEvaluator {
    sel: Selection,
    chroma_class: ChromaClass,
    max_err: f64,
}

impl PsnrEvaluator {
    /// Creates an unbound evaluator.
    pub fn new() -> Self {
        PsnrEvaluator {
            sel: Selection::unbound(),
            chroma_class: ChromaClass::C420,
            max_err: 255.0,
        }
    }
}

impl Default for PsnrEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pixel> Evaluator<T> for PsnrEvaluator {
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
        self.max_err = reference.bit_depth().max_error();
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
            if sel.c_mask[i].intersects(MetricMask::MSE) {
                let p1 = first.plane(i);
                let p2 = second.plane(i);
                let norm = l2_norm_diff(p1, p2)?;
                sums[i] = norm * norm / p1.roi().area() as f64;
                values.push(sums[i]);
                averages[j] += sums[i];
                j += 1;
            }
        }

        sums[sel.num_planes] = aggregate_overall(self.chroma_class, &sums, sel.num_planes);
        if sel.c_mask[sel.num_planes].intersects(MetricMask::MSE) {
            values.push(sums[sel.num_planes]);
            averages[j] += sums[sel.num_planes];
            j += 1;
        }

        // PSNR emits the converted value per frame but accumulates the raw
        // MSE; the sequence average is converted once at the end.
        for i in 0..=sel.num_planes {
            if sel.c_mask[i].intersects(MetricMask::PSNR) {
                values.push(mse_to_psnr(sums[i], self.max_err));
                averages[j] += sums[i];
                j += 1;
            }
        }
        for i in 0..=sel.num_planes {
            if sel.c_mask[i].intersects(MetricMask::APSNR) {
                let psnr = mse_to_psnr(sums[i], self.max_err);
                values.push(psnr);
                averages[j] += psnr;
                j += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_metric_eq;
    use crate::video::format::{BitDepth, SequenceFormat};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn i420_source(y: &[u8], w: usize, h: usize) -> (NamedTempFile, FrameSource<u8>) {
        let mut bytes = y.to_vec();
        bytes.resize(w * h * 3 / 2, 128);
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&bytes).unwrap();
        f.flush().unwrap();
        let mut src = FrameSource::open(
            f.path(),
            w,
            h,
            SequenceFormat::I420P,
            false,
            BitDepth::Eight,
            0,
        )
        .unwrap();
        src.read(0).unwrap();
        (f, src)
    }

    #[test]
    fn unit_error_reference_point() {
        let (_f1, src1) = i420_source(&vec![0u8; 64], 8, 8);
        let (_f2, src2) = i420_source(&vec![1u8; 64], 8, 8);

        let mut eval = PsnrEvaluator::new();
        let mut components = Components::yuv();
        components.add_plane(0, MetricMask::PSNR | MetricMask::APSNR | MetricMask::MSE);
        let (mut names, mut flags, mut avgs) = (Vec::new(), Vec::new(), Vec::new());
        Evaluator::<u8>::bind_selection(&mut eval, &components, &mut names, &mut flags, &mut avgs);
        assert_eq!(names, vec!["Y-MSE", "Y-PSNR", "Y-APSNR"]);

        eval.allocate(&src1).unwrap();
        let mut values = Vec::new();
        eval.compute(&src1, &src2, &mut values, &mut avgs).unwrap();
        assert_metric_eq(1.0, values[0]);
        assert_metric_eq(48.1308, values[1]);
        assert_metric_eq(48.1308, values[2]);
        // The PSNR accumulator carries the MSE, the APSNR one the PSNR.
        assert_metric_eq(1.0, avgs[1]);
        assert_metric_eq(48.1308, avgs[2]);
    }

    #[test]
    fn identical_frames_hit_the_cap() {
        let (_f1, src1) = i420_source(&vec![42u8; 64], 8, 8);
        let (_f2, src2) = i420_source(&vec![42u8; 64], 8, 8);

        let mut eval = PsnrEvaluator::new();
        let mut components = Components::yuv();
        components.add_all(MetricMask::PSNR | MetricMask::MSE);
        let (mut names, mut flags, mut avgs) = (Vec::new(), Vec::new(), Vec::new());
        Evaluator::<u8>::bind_selection(&mut eval, &components, &mut names, &mut flags, &mut avgs);
        eval.allocate(&src1).unwrap();
        let mut values = Vec::new();
        eval.compute(&src1, &src2, &mut values, &mut avgs).unwrap();
        let psnr_idx = names.iter().position(|n| n == "PSNR").unwrap();
        assert_eq!(values[psnr_idx], 1000.0);
    }
}
