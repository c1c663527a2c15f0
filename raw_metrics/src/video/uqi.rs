//! Universal Quality Index (Wang-Bovik, 1997).
//!
//! A correlation-like statistic evaluated on every 8x8 sliding window and
//! averaged over the plane. The degenerate-window fallbacks of the
//! reference implementation are preserved: a flat pair of windows with
//! matching means scores 1.

use crate::video::format::ChromaClass;
use crate::video::plane::PlaneView;
use crate::video::source::FrameSource;
use crate::video::{
    aggregate_overall, bind_names, Components, Evaluator, MetricDesc, MetricMask, Pixel, Selection,
};
use crate::MetricsError;
use num_traits::AsPrimitive;

const METRICS: [MetricDesc; 1] = [MetricDesc {
    name: "UQI",
    output: MetricMask::UQI,
    compute: MetricMask::UQI,
}];

const WINDOW: usize = 8;

/// Evaluator producing the Universal Quality Index per plane and overall.
pub struct UqiEvaluator {
    sel: Selection,
    chroma_class: ChromaClass,
}

impl UqiEvaluator {
    /// Creates an unbound evaluator.
    pub fn new() -> Self {
        UqiEvaluator {
            sel: Selection::unbound(),
            chroma_class: ChromaClass::C420,
        }
    }
}

impl Default for UqiEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// UQI over all 8x8 sliding windows of a plane pair, with windowed sums
/// maintained incrementally along both axes.
fn plane_uqi<T: Pixel>(p1: PlaneView<'_, T>, p2: PlaneView<'_, T>) -> Result<f64, MetricsError> {
    if p1.roi() != p2.roi() {
        return Err(MetricsError::InvalidParam {
            reason: "mismatched view dimensions",
        });
    }
    let (w, h) = (p1.width, p1.height);
    if w < WINDOW || h < WINDOW {
        return Err(MetricsError::UnsupportedInput {
            reason: "plane smaller than the quality index window",
        });
    }

    let n = (WINDOW * WINDOW) as f64;
    // Per-column sums over the current 8-row strip.
    let mut c1 = vec![0.0f64; w];
    let mut c2 = vec![0.0f64; w];
    let mut c11 = vec![0.0f64; w];
    let mut c22 = vec![0.0f64; w];
    let mut c12 = vec![0.0f64; w];

    let add_row = |y: usize, sign: f64, c1: &mut [f64], c2: &mut [f64], c11: &mut [f64],
                   c22: &mut [f64], c12: &mut [f64]| {
        let r1 = p1.row(y);
        let r2 = p2.row(y);
        for x in 0..w {
            let a: f64 = r1[x].as_();
            let b: f64 = r2[x].as_();
            c1[x] += sign * a;
            c2[x] += sign * b;
            c11[x] += sign * a * a;
            c22[x] += sign * b * b;
            c12[x] += sign * a * b;
        }
    };

    for y in 0..WINDOW {
        add_row(y, 1.0, &mut c1, &mut c2, &mut c11, &mut c22, &mut c12);
    }

    let mut total = 0.0f64;
    let mut count = 0u64;
    for wy in 0..=h - WINDOW {
        if wy > 0 {
            add_row(wy - 1, -1.0, &mut c1, &mut c2, &mut c11, &mut c22, &mut c12);
            add_row(
                wy + WINDOW - 1,
                1.0,
                &mut c1,
                &mut c2,
                &mut c11,
                &mut c22,
                &mut c12,
            );
        }

        let mut s1: f64 = c1[..WINDOW].iter().sum();
        let mut s2: f64 = c2[..WINDOW].iter().sum();
        let mut s11: f64 = c11[..WINDOW].iter().sum();
        let mut s22: f64 = c22[..WINDOW].iter().sum();
        let mut s12: f64 = c12[..WINDOW].iter().sum();
        for wx in 0..=w - WINDOW {
            if wx > 0 {
                let lead = wx + WINDOW - 1;
                let trail = wx - 1;
                s1 += c1[lead] - c1[trail];
                s2 += c2[lead] - c2[trail];
                s11 += c11[lead] - c11[trail];
                s22 += c22[lead] - c22[trail];
                s12 += c12[lead] - c12[trail];
            }
            let b1 = s1 * s2;
            let b2 = s1 * s1 + s2 * s2;
            let cross = n * s12 - b1;
            let d1 = n * (s11 + s22) - b2;
            let denom = d1 * b2;
            let q = if denom != 0.0 {
                4.0 * cross * b1 / denom
            } else if b2 != 0.0 {
                2.0 * b1 / b2
            } else {
                1.0
            };
            total += q;
            count += 1;
        }
    }
    Ok(total / count as f64)
}

impl<T: Pixel> Evaluator<T> for UqiEvaluator {
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

        // The alpha plane never participates, even for RGB with alpha.
        for i in 0..sel.num_planes.min(3) {
            if !sel.c_mask[i].intersects(MetricMask::UQI) {
                continue;
            }
            sums[i] = plane_uqi(first.plane(i), second.plane(i))?;
            values.push(sums[i]);
            averages[j] += sums[i];
            j += 1;
        }

        if sel.c_mask[sel.num_planes].intersects(MetricMask::UQI) {
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
    use crate::video::plane::PlaneBuf;

    fn plane_from(values: &[u8], w: usize, h: usize) -> PlaneBuf<u8> {
        let mut p = PlaneBuf::new(w, h);
        p.data_mut().copy_from_slice(values);
        p
    }

    #[test]
    fn identical_planes_score_one() {
        let w = 16;
        let h = 12;
        let data: Vec<u8> = (0..w * h).map(|i| (i * 13 % 240) as u8).collect();
        let a = plane_from(&data, w, h);
        let b = plane_from(&data, w, h);
        let q = plane_uqi(a.view(), b.view()).unwrap();
        assert!((q - 1.0).abs() < 1e-9, "q = {}", q);
    }

    #[test]
    fn flat_identical_planes_score_one() {
        let a = plane_from(&[7u8; 64], 8, 8);
        let b = plane_from(&[7u8; 64], 8, 8);
        assert_eq!(plane_uqi(a.view(), b.view()).unwrap(), 1.0);
        let z1 = plane_from(&[0u8; 64], 8, 8);
        let z2 = plane_from(&[0u8; 64], 8, 8);
        assert_eq!(plane_uqi(z1.view(), z2.view()).unwrap(), 1.0);
    }

    #[test]
    fn distortion_lowers_the_index() {
        let w = 16;
        let h = 16;
        let data: Vec<u8> = (0..w * h).map(|i| (i * 11 % 200) as u8).collect();
        let noisy: Vec<u8> = data
            .iter()
            .map(|&v| if v % 2 == 0 { v.saturating_add(30) } else { v })
            .collect();
        let a = plane_from(&data, w, h);
        let b = plane_from(&noisy, w, h);
        let q = plane_uqi(a.view(), b.view()).unwrap();
        assert!(q < 1.0 && q > -1.0, "q = {}", q);
    }

    #[test]
    fn tiny_planes_are_rejected() {
        let a = plane_from(&[0u8; 16], 4, 4);
        let b = plane_from(&[0u8; 16], 4, 4);
        assert!(plane_uqi(a.view(), b.view()).is_err());
    }
}
