//! Stride-aware primitives on single-channel images.
//!
//! Every primitive takes explicit row strides and a region of interest and
//! validates geometry against the supplied buffers, returning
//! [`MetricsError::InvalidParam`] instead of reading out of bounds. All
//! primitives are pure; only [`right_shift_in_place`] mutates its source.
//!
//! The convolution primitives produce the valid region only: output sample
//! `(x, y)` is the kernel applied to the input window *starting* at
//! `(x, y)`, so the caller accounts for the `kernel_len / 2` anchor shift
//! when mapping output coordinates back to input space.

use crate::video::pixel::{CastFromPrimitive, Pixel};
use crate::video::plane::{PlaneView, Roi};
use crate::MetricsError;
use num_traits::AsPrimitive;

#[inline]
fn check_bounds(len: usize, stride: usize, roi: Roi) -> Result<(), MetricsError> {
    if roi.is_empty() {
        return Err(MetricsError::InvalidParam {
            reason: "empty region of interest",
        });
    }
    if stride < roi.width {
        return Err(MetricsError::InvalidParam {
            reason: "stride smaller than row width",
        });
    }
    if len < (roi.height - 1) * stride + roi.width {
        return Err(MetricsError::InvalidParam {
            reason: "buffer too small for region",
        });
    }
    Ok(())
}

fn check_kernel(kernel: &[f32]) -> Result<(), MetricsError> {
    if kernel.is_empty() || kernel.len() % 2 == 0 {
        return Err(MetricsError::InvalidParam {
            reason: "kernel length must be odd",
        });
    }
    Ok(())
}

/// Shifts every sample in the region right by `value` bits, in place.
///
/// A shift of zero is a no-op; a shift of the container width or more is
/// rejected.
pub fn right_shift_in_place<T: Pixel>(
    value: u32,
    data: &mut [T],
    stride: usize,
    roi: Roi,
) -> Result<(), MetricsError> {
    if value == 0 {
        return Ok(());
    }
    if value >= T::container_bits() {
        return Err(MetricsError::InvalidParam {
            reason: "shift exceeds sample container width",
        });
    }
    check_bounds(data.len(), stride, roi)?;
    for y in 0..roi.height {
        let row = &mut data[y * stride..y * stride + roi.width];
        for s in row {
            *s = s.unsigned_shr(value);
        }
    }
    Ok(())
}

/// Widens every sample of `src` into `dst` as `f32`.
pub fn convert_to_f32<T: Pixel>(
    src: PlaneView<'_, T>,
    dst: &mut [f32],
    dst_stride: usize,
) -> Result<(), MetricsError> {
    let roi = src.roi();
    check_bounds(dst.len(), dst_stride, roi)?;
    for (y, row) in src.rows().enumerate() {
        let drow = &mut dst[y * dst_stride..y * dst_stride + roi.width];
        for (d, s) in drow.iter_mut().zip(row) {
            *d = s.as_();
        }
    }
    Ok(())
}

/// Squares every sample of `src` into `dst`.
pub fn square_f32(
    src: &[f32],
    src_stride: usize,
    dst: &mut [f32],
    dst_stride: usize,
    roi: Roi,
) -> Result<(), MetricsError> {
    check_bounds(src.len(), src_stride, roi)?;
    check_bounds(dst.len(), dst_stride, roi)?;
    for y in 0..roi.height {
        let srow = &src[y * src_stride..y * src_stride + roi.width];
        let drow = &mut dst[y * dst_stride..y * dst_stride + roi.width];
        for (d, s) in drow.iter_mut().zip(srow) {
            *d = s * s;
        }
    }
    Ok(())
}

/// Multiplies `src1` and `src2` element-wise into `dst`.
pub fn mul_f32(
    src1: &[f32],
    src1_stride: usize,
    src2: &[f32],
    src2_stride: usize,
    dst: &mut [f32],
    dst_stride: usize,
    roi: Roi,
) -> Result<(), MetricsError> {
    check_bounds(src1.len(), src1_stride, roi)?;
    check_bounds(src2.len(), src2_stride, roi)?;
    check_bounds(dst.len(), dst_stride, roi)?;
    for y in 0..roi.height {
        let a = &src1[y * src1_stride..y * src1_stride + roi.width];
        let b = &src2[y * src2_stride..y * src2_stride + roi.width];
        let drow = &mut dst[y * dst_stride..y * dst_stride + roi.width];
        for (d, (a, b)) in drow.iter_mut().zip(a.iter().zip(b)) {
            *d = a * b;
        }
    }
    Ok(())
}

/// Arithmetic mean of the samples in the region.
pub fn mean_f32(src: &[f32], stride: usize, roi: Roi) -> Result<f64, MetricsError> {
    check_bounds(src.len(), stride, roi)?;
    let mut sum = 0.0f64;
    for y in 0..roi.height {
        let row = &src[y * stride..y * stride + roi.width];
        for s in row {
            sum += *s as f64;
        }
    }
    Ok(sum / roi.area() as f64)
}

/// L2 norm of the per-sample difference of two equally sized views:
/// `sqrt(sum((a - b)^2))`.
pub fn l2_norm_diff<T: Pixel>(
    src1: PlaneView<'_, T>,
    src2: PlaneView<'_, T>,
) -> Result<f64, MetricsError> {
    if src1.roi() != src2.roi() {
        return Err(MetricsError::InvalidParam {
            reason: "mismatched view dimensions",
        });
    }
    if src1.is_empty() {
        return Err(MetricsError::InvalidParam {
            reason: "empty region of interest",
        });
    }
    let mut sum = 0.0f64;
    for (row1, row2) in src1.rows().zip(src2.rows()) {
        for (a, b) in row1.iter().zip(row2) {
            let a: i64 = a.as_();
            let b: i64 = b.as_();
            let d = (a - b) as f64;
            sum += d * d;
        }
    }
    Ok(sum.sqrt())
}

/// 1-D horizontal convolution over the valid region.
///
/// `roi` gives the output size: `roi.width` must not exceed the input width
/// minus `kernel.len() - 1`.
pub fn filter_row_f32(
    src: &[f32],
    src_stride: usize,
    dst: &mut [f32],
    dst_stride: usize,
    roi: Roi,
    kernel: &[f32],
) -> Result<(), MetricsError> {
    check_kernel(kernel)?;
    let in_roi = Roi::new(roi.width + kernel.len() - 1, roi.height);
    check_bounds(src.len(), src_stride, in_roi)?;
    check_bounds(dst.len(), dst_stride, roi)?;
    for y in 0..roi.height {
        let srow = &src[y * src_stride..y * src_stride + in_roi.width];
        let drow = &mut dst[y * dst_stride..y * dst_stride + roi.width];
        for (x, d) in drow.iter_mut().enumerate() {
            let mut acc = 0.0f64;
            for (k, w) in kernel.iter().enumerate() {
                acc += *w as f64 * srow[x + k] as f64;
            }
            *d = acc as f32;
        }
    }
    Ok(())
}

/// 1-D vertical convolution over the valid region; the symmetric
/// counterpart of [`filter_row_f32`].
pub fn filter_col_f32(
    src: &[f32],
    src_stride: usize,
    dst: &mut [f32],
    dst_stride: usize,
    roi: Roi,
    kernel: &[f32],
) -> Result<(), MetricsError> {
    check_kernel(kernel)?;
    let in_roi = Roi::new(roi.width, roi.height + kernel.len() - 1);
    check_bounds(src.len(), src_stride, in_roi)?;
    check_bounds(dst.len(), dst_stride, roi)?;
    for y in 0..roi.height {
        let drow = &mut dst[y * dst_stride..y * dst_stride + roi.width];
        for (x, d) in drow.iter_mut().enumerate() {
            let mut acc = 0.0f64;
            for (k, w) in kernel.iter().enumerate() {
                acc += *w as f64 * src[(y + k) * src_stride + x] as f64;
            }
            *d = acc as f32;
        }
    }
    Ok(())
}

/// Area-averaging 2x decimation. Odd trailing rows and columns of the input
/// are discarded before averaging. Returns the output region.
pub fn downsample_2x_f32(
    src: &[f32],
    src_stride: usize,
    src_roi: Roi,
    dst: &mut [f32],
    dst_stride: usize,
) -> Result<Roi, MetricsError> {
    let even = Roi::new(src_roi.width & !1, src_roi.height & !1);
    check_bounds(src.len(), src_stride, even)?;
    let out = Roi::new(even.width / 2, even.height / 2);
    check_bounds(dst.len(), dst_stride, out)?;
    for y in 0..out.height {
        let r0 = &src[2 * y * src_stride..2 * y * src_stride + even.width];
        let r1 = &src[(2 * y + 1) * src_stride..(2 * y + 1) * src_stride + even.width];
        let drow = &mut dst[y * dst_stride..y * dst_stride + out.width];
        for (x, d) in drow.iter_mut().enumerate() {
            *d = 0.25 * (r0[2 * x] + r0[2 * x + 1] + r1[2 * x] + r1[2 * x + 1]);
        }
    }
    Ok(out)
}

fn check_chroma_pair(roi: Roi) -> Result<(), MetricsError> {
    if roi.width < 2 || roi.width % 2 != 0 {
        return Err(MetricsError::InvalidParam {
            reason: "width must be even and at least 2",
        });
    }
    Ok(())
}

/// De-interleaves an NV12 frame (full Y plane plus half-height interleaved
/// UV) into I420 planes. `roi` is the luma geometry.
pub fn nv12_to_i420<T: Pixel>(
    src_y: &[T],
    src_y_stride: usize,
    src_uv: &[T],
    src_uv_stride: usize,
    dst_y: &mut [T],
    dst_y_stride: usize,
    dst_u: &mut [T],
    dst_u_stride: usize,
    dst_v: &mut [T],
    dst_v_stride: usize,
    roi: Roi,
) -> Result<(), MetricsError> {
    check_chroma_pair(roi)?;
    if roi.height < 2 || roi.height % 2 != 0 {
        return Err(MetricsError::InvalidParam {
            reason: "height must be even and at least 2",
        });
    }
    check_bounds(src_y.len(), src_y_stride, roi)?;
    check_bounds(dst_y.len(), dst_y_stride, roi)?;
    let chroma = Roi::new(roi.width / 2, roi.height / 2);
    check_bounds(src_uv.len(), src_uv_stride, Roi::new(roi.width, chroma.height))?;
    check_bounds(dst_u.len(), dst_u_stride, chroma)?;
    check_bounds(dst_v.len(), dst_v_stride, chroma)?;

    for y in 0..roi.height {
        dst_y[y * dst_y_stride..y * dst_y_stride + roi.width]
            .copy_from_slice(&src_y[y * src_y_stride..y * src_y_stride + roi.width]);
    }
    for y in 0..chroma.height {
        let s = &src_uv[y * src_uv_stride..y * src_uv_stride + roi.width];
        let du = &mut dst_u[y * dst_u_stride..y * dst_u_stride + chroma.width];
        let dv = &mut dst_v[y * dst_v_stride..y * dst_v_stride + chroma.width];
        for (uv, u, v) in izip!(s.chunks_exact(2), du.iter_mut(), dv.iter_mut()) {
            *u = uv[0];
            *v = uv[1];
        }
    }
    Ok(())
}

/// De-interleaves an NV16 frame (full Y plane plus full-height interleaved
/// UV) into I422 planes. `roi` is the luma geometry.
pub fn nv16_to_i422<T: Pixel>(
    src_y: &[T],
    src_y_stride: usize,
    src_uv: &[T],
    src_uv_stride: usize,
    dst_y: &mut [T],
    dst_y_stride: usize,
    dst_u: &mut [T],
    dst_u_stride: usize,
    dst_v: &mut [T],
    dst_v_stride: usize,
    roi: Roi,
) -> Result<(), MetricsError> {
    check_chroma_pair(roi)?;
    check_bounds(src_y.len(), src_y_stride, roi)?;
    check_bounds(dst_y.len(), dst_y_stride, roi)?;
    let chroma = Roi::new(roi.width / 2, roi.height);
    check_bounds(src_uv.len(), src_uv_stride, Roi::new(roi.width, roi.height))?;
    check_bounds(dst_u.len(), dst_u_stride, chroma)?;
    check_bounds(dst_v.len(), dst_v_stride, chroma)?;

    for y in 0..roi.height {
        dst_y[y * dst_y_stride..y * dst_y_stride + roi.width]
            .copy_from_slice(&src_y[y * src_y_stride..y * src_y_stride + roi.width]);
    }
    for y in 0..roi.height {
        let s = &src_uv[y * src_uv_stride..y * src_uv_stride + roi.width];
        let du = &mut dst_u[y * dst_u_stride..y * dst_u_stride + chroma.width];
        let dv = &mut dst_v[y * dst_v_stride..y * dst_v_stride + chroma.width];
        for (uv, u, v) in izip!(s.chunks_exact(2), du.iter_mut(), dv.iter_mut()) {
            *u = uv[0];
            *v = uv[1];
        }
    }
    Ok(())
}

/// Unpacks a YUY2 stream (`[Y0 Cb Y1 Cr]` repeating) into I422 planes.
/// `roi` is the luma geometry; `src_stride` is in samples.
pub fn yuy2_to_i422<T: Pixel>(
    src: &[T],
    src_stride: usize,
    dst_y: &mut [T],
    dst_y_stride: usize,
    dst_u: &mut [T],
    dst_u_stride: usize,
    dst_v: &mut [T],
    dst_v_stride: usize,
    roi: Roi,
) -> Result<(), MetricsError> {
    check_chroma_pair(roi)?;
    check_bounds(src.len(), src_stride, Roi::new(roi.width * 2, roi.height))?;
    check_bounds(dst_y.len(), dst_y_stride, roi)?;
    let chroma = Roi::new(roi.width / 2, roi.height);
    check_bounds(dst_u.len(), dst_u_stride, chroma)?;
    check_bounds(dst_v.len(), dst_v_stride, chroma)?;

    for y in 0..roi.height {
        let s = &src[y * src_stride..y * src_stride + roi.width * 2];
        let dy = &mut dst_y[y * dst_y_stride..y * dst_y_stride + roi.width];
        let du = &mut dst_u[y * dst_u_stride..y * dst_u_stride + chroma.width];
        let dv = &mut dst_v[y * dst_v_stride..y * dst_v_stride + chroma.width];
        for (quad, yy, u, v) in izip!(
            s.chunks_exact(4),
            dy.chunks_exact_mut(2),
            du.iter_mut(),
            dv.iter_mut()
        ) {
            yy[0] = quad[0];
            *u = quad[1];
            yy[1] = quad[2];
            *v = quad[3];
        }
    }
    Ok(())
}

/// De-interleaves a 4-channel packed image into four planes; channel `c` of
/// each pixel lands in `dst[c]`.
pub fn copy_c4p4<T: Pixel>(
    src: &[T],
    src_stride: usize,
    dst: [&mut [T]; 4],
    dst_stride: usize,
    roi: Roi,
) -> Result<(), MetricsError> {
    check_bounds(src.len(), src_stride, Roi::new(roi.width * 4, roi.height))?;
    let [d0, d1, d2, d3] = dst;
    check_bounds(d0.len(), dst_stride, roi)?;
    check_bounds(d1.len(), dst_stride, roi)?;
    check_bounds(d2.len(), dst_stride, roi)?;
    check_bounds(d3.len(), dst_stride, roi)?;
    for y in 0..roi.height {
        let s = &src[y * src_stride..y * src_stride + roi.width * 4];
        let r0 = &mut d0[y * dst_stride..y * dst_stride + roi.width];
        let r1 = &mut d1[y * dst_stride..y * dst_stride + roi.width];
        let r2 = &mut d2[y * dst_stride..y * dst_stride + roi.width];
        let r3 = &mut d3[y * dst_stride..y * dst_stride + roi.width];
        for (quad, a, b, c, d) in izip!(
            s.chunks_exact(4),
            r0.iter_mut(),
            r1.iter_mut(),
            r2.iter_mut(),
            r3.iter_mut()
        ) {
            *a = quad[0];
            *b = quad[1];
            *c = quad[2];
            *d = quad[3];
        }
    }
    Ok(())
}

#[inline]
fn unpack_10_10_10_2<T: Pixel>(word: u32) -> [T; 4] {
    [
        T::cast_from((word & 0x3ff) as u16),
        T::cast_from(((word >> 10) & 0x3ff) as u16),
        T::cast_from(((word >> 20) & 0x3ff) as u16),
        T::cast_from((word >> 30) as u16),
    ]
}

/// Unpacks Y410 32-bit words into 10-bit Y, U, V, A planes.
///
/// Word layout: bits `[0..9]` = U, `[10..19]` = Y, `[20..29]` = V,
/// `[30..31]` = A. `dst` is `[Y, U, V, A]`; `src_stride` is in bytes.
pub fn y410_to_planar<T: Pixel>(
    src: &[u8],
    src_stride: usize,
    dst: [&mut [T]; 4],
    dst_stride: usize,
    roi: Roi,
) -> Result<(), MetricsError> {
    check_bounds(src.len(), src_stride, Roi::new(roi.width * 4, roi.height))?;
    let [dy, du, dv, da] = dst;
    check_bounds(dy.len(), dst_stride, roi)?;
    check_bounds(du.len(), dst_stride, roi)?;
    check_bounds(dv.len(), dst_stride, roi)?;
    check_bounds(da.len(), dst_stride, roi)?;
    for y in 0..roi.height {
        let s = &src[y * src_stride..y * src_stride + roi.width * 4];
        let ry = &mut dy[y * dst_stride..y * dst_stride + roi.width];
        let ru = &mut du[y * dst_stride..y * dst_stride + roi.width];
        let rv = &mut dv[y * dst_stride..y * dst_stride + roi.width];
        let ra = &mut da[y * dst_stride..y * dst_stride + roi.width];
        for (word, yy, u, v, a) in izip!(
            s.chunks_exact(4),
            ry.iter_mut(),
            ru.iter_mut(),
            rv.iter_mut(),
            ra.iter_mut()
        ) {
            let w = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            let [w_u, w_y, w_v, w_a] = unpack_10_10_10_2::<T>(w);
            *u = w_u;
            *yy = w_y;
            *v = w_v;
            *a = w_a;
        }
    }
    Ok(())
}

/// Unpacks A2RGB10 32-bit words into 10-bit B, G, R, A planes.
///
/// Word layout: bits `[0..9]` = B, `[10..19]` = G, `[20..29]` = R,
/// `[30..31]` = A. `dst` is `[B, G, R, A]`; `src_stride` is in bytes.
pub fn a2rgb10_to_planar<T: Pixel>(
    src: &[u8],
    src_stride: usize,
    dst: [&mut [T]; 4],
    dst_stride: usize,
    roi: Roi,
) -> Result<(), MetricsError> {
    check_bounds(src.len(), src_stride, Roi::new(roi.width * 4, roi.height))?;
    let [db, dg, dr, da] = dst;
    check_bounds(db.len(), dst_stride, roi)?;
    check_bounds(dg.len(), dst_stride, roi)?;
    check_bounds(dr.len(), dst_stride, roi)?;
    check_bounds(da.len(), dst_stride, roi)?;
    for y in 0..roi.height {
        let s = &src[y * src_stride..y * src_stride + roi.width * 4];
        let rb = &mut db[y * dst_stride..y * dst_stride + roi.width];
        let rg = &mut dg[y * dst_stride..y * dst_stride + roi.width];
        let rr = &mut dr[y * dst_stride..y * dst_stride + roi.width];
        let ra = &mut da[y * dst_stride..y * dst_stride + roi.width];
        for (word, b, g, r, a) in izip!(
            s.chunks_exact(4),
            rb.iter_mut(),
            rg.iter_mut(),
            rr.iter_mut(),
            ra.iter_mut()
        ) {
            let w = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            let [w_b, w_g, w_r, w_a] = unpack_10_10_10_2::<T>(w);
            *b = w_b;
            *g = w_g;
            *r = w_r;
            *a = w_a;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::plane::PlaneBuf;

    fn view(buf: &PlaneBuf<u8>) -> PlaneView<'_, u8> {
        buf.view()
    }

    #[test]
    fn right_shift_bounds() {
        let mut data = [0x80u8; 16];
        let roi = Roi::new(4, 4);
        assert!(right_shift_in_place(8, &mut data[..], 4, roi).is_err());
        right_shift_in_place(0, &mut data[..], 4, roi).unwrap();
        assert_eq!(data[0], 0x80);
        right_shift_in_place(4, &mut data[..], 4, roi).unwrap();
        assert_eq!(data[0], 0x08);

        let mut wide = [0x8000u16; 4];
        assert!(right_shift_in_place(16, &mut wide[..], 2, Roi::new(2, 2)).is_err());
        right_shift_in_place(6, &mut wide[..], 2, Roi::new(2, 2)).unwrap();
        assert_eq!(wide[0], 0x0200);
    }

    #[test]
    fn l2_norm_diff_matches_hand_computation() {
        let mut a = PlaneBuf::<u8>::new(2, 2);
        let mut b = PlaneBuf::<u8>::new(2, 2);
        a.data_mut().copy_from_slice(&[0, 0, 0, 0]);
        b.data_mut().copy_from_slice(&[3, 4, 0, 0]);
        let nd = l2_norm_diff(view(&a), view(&b)).unwrap();
        assert!((nd - 5.0).abs() < 1e-12);
    }

    #[test]
    fn row_filter_matches_naive_convolution() {
        let src = [1.0f32, 2.0, 3.0, 4.0, 5.0];
        let kernel = [0.25f32, 0.5, 0.25];
        let mut dst = [0.0f32; 3];
        filter_row_f32(&src, 5, &mut dst, 3, Roi::new(3, 1), &kernel).unwrap();
        assert_eq!(dst, [2.0, 3.0, 4.0]);
    }

    #[test]
    fn col_filter_matches_naive_convolution() {
        let src = [1.0f32, 10.0, 2.0, 20.0, 3.0, 30.0];
        let kernel = [0.5f32, 0.25, 0.25];
        let mut dst = [0.0f32; 2];
        filter_col_f32(&src, 2, &mut dst, 2, Roi::new(2, 1), &kernel).unwrap();
        assert!((dst[0] - (0.5 + 0.5 + 0.75)).abs() < 1e-6);
        assert!((dst[1] - (5.0 + 5.0 + 7.5)).abs() < 1e-6);
    }

    #[test]
    fn downsample_discards_odd_edges() {
        // 5x3 input: only the 4x2 even prefix participates.
        let src: Vec<f32> = (0..15).map(|v| v as f32).collect();
        let mut dst = [0.0f32; 2];
        let out = downsample_2x_f32(&src, 5, Roi::new(5, 3), &mut dst, 2).unwrap();
        assert_eq!(out, Roi::new(2, 1));
        assert_eq!(dst[0], 0.25 * (0.0 + 1.0 + 5.0 + 6.0));
        assert_eq!(dst[1], 0.25 * (2.0 + 3.0 + 7.0 + 8.0));
    }

    #[test]
    fn nv12_round_trip() {
        // 4x2 luma, 2x1 chroma.
        let y: Vec<u8> = (0..8).collect();
        let uv = [100u8, 200, 101, 201];
        let mut dy = [0u8; 8];
        let mut du = [0u8; 2];
        let mut dv = [0u8; 2];
        nv12_to_i420(&y, 4, &uv, 4, &mut dy, 4, &mut du, 2, &mut dv, 2, Roi::new(4, 2)).unwrap();
        assert_eq!(&dy[..], &y[..]);
        assert_eq!(du, [100, 101]);
        assert_eq!(dv, [200, 201]);
    }

    #[test]
    fn nv16_round_trip() {
        let y: Vec<u8> = (0..8).collect();
        let uv = [10u8, 20, 11, 21, 12, 22, 13, 23];
        let mut dy = [0u8; 8];
        let mut du = [0u8; 4];
        let mut dv = [0u8; 4];
        nv16_to_i422(&y, 4, &uv, 4, &mut dy, 4, &mut du, 2, &mut dv, 2, Roi::new(4, 2)).unwrap();
        assert_eq!(&dy[..], &y[..]);
        assert_eq!(du, [10, 11, 12, 13]);
        assert_eq!(dv, [20, 21, 22, 23]);
    }

    #[test]
    fn yuy2_round_trip() {
        let src = [1u8, 50, 2, 60, 3, 51, 4, 61];
        let mut dy = [0u8; 4];
        let mut du = [0u8; 2];
        let mut dv = [0u8; 2];
        yuy2_to_i422(&src, 8, &mut dy, 4, &mut du, 2, &mut dv, 2, Roi::new(4, 1)).unwrap();
        assert_eq!(dy, [1, 2, 3, 4]);
        assert_eq!(du, [50, 51]);
        assert_eq!(dv, [60, 61]);
    }

    #[test]
    fn c4p4_round_trip() {
        let src = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut d0 = [0u8; 2];
        let mut d1 = [0u8; 2];
        let mut d2 = [0u8; 2];
        let mut d3 = [0u8; 2];
        copy_c4p4(
            &src,
            8,
            [&mut d0[..], &mut d1[..], &mut d2[..], &mut d3[..]],
            2,
            Roi::new(2, 1),
        )
        .unwrap();
        assert_eq!(d0, [1, 5]);
        assert_eq!(d1, [2, 6]);
        assert_eq!(d2, [3, 7]);
        assert_eq!(d3, [4, 8]);
    }

    #[test]
    fn y410_unpacks_fields() {
        let word: u32 = (3 << 30) | (0x2aa << 20) | (0x155 << 10) | 0x0ff;
        let src = word.to_le_bytes();
        let mut dy = [0u16; 1];
        let mut du = [0u16; 1];
        let mut dv = [0u16; 1];
        let mut da = [0u16; 1];
        y410_to_planar(
            &src,
            4,
            [&mut dy[..], &mut du[..], &mut dv[..], &mut da[..]],
            1,
            Roi::new(1, 1),
        )
        .unwrap();
        assert_eq!(du[0], 0x0ff);
        assert_eq!(dy[0], 0x155);
        assert_eq!(dv[0], 0x2aa);
        assert_eq!(da[0], 3);
    }

    #[test]
    fn a2rgb10_unpacks_fields() {
        let word: u32 = (1 << 30) | (0x123 << 20) | (0x256 << 10) | 0x389;
        let src = word.to_le_bytes();
        let mut db = [0u16; 1];
        let mut dg = [0u16; 1];
        let mut dr = [0u16; 1];
        let mut da = [0u16; 1];
        a2rgb10_to_planar(
            &src,
            4,
            [&mut db[..], &mut dg[..], &mut dr[..], &mut da[..]],
            1,
            Roi::new(1, 1),
        )
        .unwrap();
        assert_eq!(db[0], 0x389);
        assert_eq!(dg[0], 0x256);
        assert_eq!(dr[0], 0x123);
        assert_eq!(da[0], 1);
    }
}
