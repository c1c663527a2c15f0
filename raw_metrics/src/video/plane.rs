//! Owned sample planes and stride-aware views into them.
//!
//! A [`PlaneBuf`] owns the samples of one image plane; every view handed out
//! is a borrow into that arena, so plane lifetimes are tied to their owner
//! and packed read buffers and demux targets stay in disjoint ownership
//! regions.

/// A rectangular region of interest, in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    /// Width in samples.
    pub width: usize,
    /// Height in rows.
    pub height: usize,
}

impl Roi {
    /// Convenience constructor.
    pub fn new(width: usize, height: usize) -> Self {
        Roi { width, height }
    }

    /// Number of samples covered.
    pub fn area(self) -> usize {
        self.width * self.height
    }

    /// Whether either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An owned plane of samples with row stride.
///
/// The stride always equals the width for buffers allocated here; the
/// separate field exists so that views derived from this buffer can carry a
/// different (e.g. doubled) stride.
#[derive(Debug, Clone)]
pub struct PlaneBuf<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
    stride: usize,
}

impl<T: Copy + Default> PlaneBuf<T> {
    /// Allocates a zeroed `width`×`height` plane.
    pub fn new(width: usize, height: usize) -> Self {
        PlaneBuf {
            data: vec![T::default(); width * height],
            width,
            height,
            stride: width,
        }
    }

    /// A zero-sized placeholder for planes a layout does not carry.
    pub fn empty() -> Self {
        PlaneBuf {
            data: Vec::new(),
            width: 0,
            height: 0,
            stride: 0,
        }
    }

    /// Width in samples.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row stride in samples.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Whether this plane holds no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The backing samples.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// The backing samples, mutably.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// A full-frame view of the plane.
    pub fn view(&self) -> PlaneView<'_, T> {
        PlaneView {
            data: &self.data,
            stride: self.stride,
            width: self.width,
            height: self.height,
        }
    }

    /// A single-field view: the stride doubles, the height halves, and the
    /// bottom field starts one source row down.
    pub fn field_view(&self, bottom: bool) -> PlaneView<'_, T> {
        if self.data.is_empty() {
            return self.view();
        }
        let offset = if bottom { self.stride } else { 0 };
        PlaneView {
            data: &self.data[offset..],
            stride: self.stride * 2,
            width: self.width,
            height: self.height / 2,
        }
    }
}

/// A borrowed, stride-aware rectangle of samples inside a [`PlaneBuf`].
#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a, T> {
    data: &'a [T],
    /// Row stride in samples. May exceed `width`.
    pub stride: usize,
    /// Width in samples.
    pub width: usize,
    /// Height in rows.
    pub height: usize,
}

impl<'a, T: Copy> PlaneView<'a, T> {
    /// The samples of row `y`.
    pub fn row(&self, y: usize) -> &'a [T] {
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    /// Iterates over the rows of the view.
    pub fn rows(&self) -> impl Iterator<Item = &'a [T]> + 'a {
        let this = *self;
        (0..this.height).map(move |y| this.row(y))
    }

    /// The dimensions of the view.
    pub fn roi(&self) -> Roi {
        Roi::new(self.width, self.height)
    }

    /// Whether this view covers no samples.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(width: usize, height: usize) -> PlaneBuf<u16> {
        let mut buf = PlaneBuf::new(width, height);
        for (i, s) in buf.data_mut().iter_mut().enumerate() {
            *s = i as u16;
        }
        buf
    }

    #[test]
    fn full_view_rows() {
        let buf = numbered(4, 3);
        let view = buf.view();
        assert_eq!(view.row(0), &[0, 1, 2, 3]);
        assert_eq!(view.row(2), &[8, 9, 10, 11]);
        assert_eq!(view.rows().count(), 3);
    }

    #[test]
    fn field_views_split_rows_by_parity() {
        let buf = numbered(4, 4);
        let top = buf.field_view(false);
        let bottom = buf.field_view(true);
        assert_eq!(top.height, 2);
        assert_eq!(top.stride, 8);
        assert_eq!(top.row(0), &[0, 1, 2, 3]);
        assert_eq!(top.row(1), &[8, 9, 10, 11]);
        assert_eq!(bottom.row(0), &[4, 5, 6, 7]);
        assert_eq!(bottom.row(1), &[12, 13, 14, 15]);
    }

    #[test]
    fn empty_plane_views() {
        let buf = PlaneBuf::<u8>::empty();
        assert!(buf.is_empty());
        assert!(buf.view().is_empty());
        assert!(buf.field_view(true).is_empty());
    }
}
