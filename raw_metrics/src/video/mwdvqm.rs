//! MPEG-weighted DCT-domain video quality metric.
//!
//! Each 8x8 block of both images is transformed with the forward 8x8 DCT,
//! brightness-normalized through an adaptive DC compensation factor, and
//! differenced with weights from the inverse of the MPEG-1 luma
//! quantization matrix. The per-block mean and maximum of the weighted
//! difference drive the plane score.

use crate::video::format::ChromaClass;
use crate::video::source::FrameSource;
use crate::video::{
    aggregate_overall, bind_names, Components, Evaluator, MetricDesc, MetricMask, Pixel, Selection,
};
use crate::MetricsError;
use num_traits::AsPrimitive;
use std::f64::consts::PI;

const METRICS: [MetricDesc; 1] = [MetricDesc {
    name: "MWDVQM",
    output: MetricMask::MWDVQM,
    compute: MetricMask::MWDVQM,
}];

#[rustfmt::skip]
const MPEG_QUANT: [i16; 64] = [
     8, 16, 19, 22, 26, 27, 29, 34,
    16, 16, 22, 21, 27, 29, 34, 37,
    19, 22, 26, 27, 29, 31, 34, 38,
    22, 22, 26, 27, 29, 34, 37, 40,
    22, 26, 27, 29, 32, 35, 40, 48,
    26, 27, 29, 32, 35, 40, 48, 58,
    26, 27, 29, 34, 38, 46, 56, 69,
    27, 29, 35, 38, 46, 56, 69, 83,
];

/// Orthonormal type-II DCT basis; `basis[u][x]` is the weight of input
/// sample `x` in output frequency `u`. The DC coefficient of a uniform
/// 8-bit mid-grey block lands at 1024.
fn dct_basis() -> [[f32; 8]; 8] {
    let mut basis = [[0.0f32; 8]; 8];
    for (u, row) in basis.iter_mut().enumerate() {
        let cu = if u == 0 { (0.5f64).sqrt() } else { 1.0 };
        for (x, b) in row.iter_mut().enumerate() {
            *b = (0.5 * cu * ((2 * x + 1) as f64 * u as f64 * PI / 16.0).cos()) as f32;
        }
    }
    basis
}

fn fdct8x8(basis: &[[f32; 8]; 8], block: &mut [f32; 64]) {
    let mut tmp = [0.0f32; 64];
    for r in 0..8 {
        for u in 0..8 {
            let mut acc = 0.0f32;
            for x in 0..8 {
                acc += basis[u][x] * block[r * 8 + x];
            }
            tmp[r * 8 + u] = acc;
        }
    }
    for v in 0..8 {
        for u in 0..8 {
            let mut acc = 0.0f32;
            for r in 0..8 {
                acc += basis[v][r] * tmp[r * 8 + u];
            }
            block[v * 8 + u] = acc;
        }
    }
}

/// Evaluator producing the MWDVQM score per plane and overall. Lower is
/// better; identical planes score zero.
pub struct MwdvqmEvaluator {
    sel: Selection,
    chroma_class: ChromaClass,
    basis: [[f32; 8]; 8],
    inv_quant: [f32; 64],
}

impl MwdvqmEvaluator {
    /// Creates an unbound evaluator.
    pub fn new() -> Self {
        let mut inv_quant = [0.0f32; 64];
        for (w, q) in inv_quant.iter_mut().zip(MPEG_QUANT.iter()) {
            *w = 1.0 / *q as f32;
        }
        MwdvqmEvaluator {
            sel: Selection::unbound(),
            chroma_class: ChromaClass::C420,
            basis: dct_basis(),
            inv_quant,
        }
    }
}

impl Default for MwdvqmEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pixel> Evaluator<T> for MwdvqmEvaluator {
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
            if !sel.c_mask[i].intersects(MetricMask::MWDVQM) {
                continue;
            }
            let p1 = first.plane(i);
            let p2 = second.plane(i);
            if p1.roi() != p2.roi() {
                return Err(MetricsError::InvalidParam {
                    reason: "mismatched view dimensions",
                });
            }

            let mut fb1 = [0.0f32; 64];
            let mut fb2 = [0.0f32; 64];
            let mut bmean = 0.0f64;
            let mut bmax = 0.0f64;
            for by in 0..p1.height / 8 {
                for bx in 0..p1.width / 8 {
                    for r in 0..8 {
                        let row1 = p1.row(by * 8 + r);
                        let row2 = p2.row(by * 8 + r);
                        for c in 0..8 {
                            fb1[r * 8 + c] = row1[bx * 8 + c].as_();
                            fb2[r * 8 + c] = row2[bx * 8 + c].as_();
                        }
                    }
                    fdct8x8(&self.basis, &mut fb1);
                    fdct8x8(&self.basis, &mut fb2);

                    let f1 = if fb1[0] > 0.0 {
                        (fb1[0] / 1024.0).powf(0.65) / fb1[0]
                    } else {
                        1.0
                    };
                    let f2 = if fb2[0] > 0.0 {
                        (fb2[0] / 1024.0).powf(0.65) / fb2[0]
                    } else {
                        1.0
                    };

                    let mut block_sum = 0.0f32;
                    let mut block_max = 0.0f32;
                    for t in 0..64 {
                        let d = (fb1[t] * f1 - fb2[t] * f2).abs() * self.inv_quant[t];
                        block_sum += d;
                        if d > block_max {
                            block_max = d;
                        }
                    }
                    bmean += (block_sum / 64.0) as f64;
                    bmax = bmax.max(block_max as f64);
                }
            }
            sums[i] = 50.0 * (12800.0 * bmean / p1.roi().area() as f64 + bmax);
            values.push(sums[i]);
            averages[j] += sums[i];
            j += 1;
        }

        if sel.c_mask[sel.num_planes].intersects(MetricMask::MWDVQM) {
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

    #[test]
    fn dct_dc_of_uniform_mid_grey_is_1024() {
        let basis = dct_basis();
        let mut block = [128.0f32; 64];
        fdct8x8(&basis, &mut block);
        assert!((block[0] - 1024.0).abs() < 0.01, "dc = {}", block[0]);
        for (t, v) in block.iter().enumerate().skip(1) {
            assert!(v.abs() < 0.01, "ac[{}] = {}", t, v);
        }
    }

    #[test]
    fn dct_preserves_energy() {
        let basis = dct_basis();
        let mut block = [0.0f32; 64];
        for (i, b) in block.iter_mut().enumerate() {
            *b = ((i * 37 + 11) % 251) as f32;
        }
        let spatial_energy: f64 = block.iter().map(|v| (*v as f64) * (*v as f64)).sum();
        fdct8x8(&basis, &mut block);
        let freq_energy: f64 = block.iter().map(|v| (*v as f64) * (*v as f64)).sum();
        assert!(
            (spatial_energy - freq_energy).abs() / spatial_energy < 1e-5,
            "{} vs {}",
            spatial_energy,
            freq_energy
        );
    }

    #[test]
    fn matched_uniform_blocks_cancel() {
        // Two uniform blocks with the same DC: the compensated spectra are
        // identical, so the weighted difference is exactly zero.
        let basis = dct_basis();
        let mut a = [200.0f32; 64];
        let mut b = [200.0f32; 64];
        fdct8x8(&basis, &mut a);
        fdct8x8(&basis, &mut b);
        let fa = (a[0] / 1024.0).powf(0.65) / a[0];
        let fb = (b[0] / 1024.0).powf(0.65) / b[0];
        for t in 0..64 {
            assert!((a[t] * fa - b[t] * fb).abs() < 1e-6);
        }
    }
}
