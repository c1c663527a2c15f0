//! Raw file readers presenting frames as planes.
//!
//! A [`FrameSource`] owns the file handle, the packed read buffer and the
//! demuxed plane buffers. Each read materializes one frame (or field) as up
//! to four plane views with uniform strides; the last decoded frame stays
//! cached so re-reads of the other field are free.

use crate::video::format::{BitDepth, ChromaClass, SequenceFormat};
use crate::video::kernels;
use crate::video::pixel::{CastFromPrimitive, Pixel};
use crate::video::plane::{PlaneBuf, PlaneView, Roi};
use crate::MetricsError;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// A raw video file of declared geometry, demuxed on demand into planes.
///
/// For interlaced layouts every stored frame counts as two fields, and
/// [`FrameSource::plane`] returns single-field views with doubled stride.
pub struct FrameSource<T: Pixel> {
    file: File,
    format: SequenceFormat,
    bit_depth: BitDepth,
    rshift: u32,
    bottom_first: bool,
    interlaced: bool,
    width: usize,
    height: usize,
    frame_bytes: usize,
    num_fields: usize,
    raw: Vec<u8>,
    samples: Vec<T>,
    planes: [PlaneBuf<T>; 4],
    cur_frame: Option<usize>,
    bottom: bool,
}

impl<T: Pixel> FrameSource<T> {
    /// Opens a raw sequence file.
    ///
    /// The file length is truncated to whole frames; a trailing partial
    /// frame is treated as end of stream. `rshift` is applied to every
    /// active plane once per frame at load time.
    pub fn open<P: AsRef<Path>>(
        path: P,
        width: usize,
        height: usize,
        format: SequenceFormat,
        bottom_first: bool,
        bit_depth: BitDepth,
        rshift: u32,
    ) -> Result<Self, MetricsError> {
        if width == 0 || height == 0 {
            return Err(MetricsError::InvalidParam {
                reason: "frame dimensions must be positive",
            });
        }
        let class = format.chroma_class();
        if (class == ChromaClass::C420 && (width % 2 != 0 || height % 2 != 0))
            || (class == ChromaClass::C422 && width % 2 != 0)
        {
            return Err(MetricsError::InvalidParam {
                reason: "frame dimensions must match the chroma subsampling",
            });
        }
        if let Some(natural) = format.natural_bit_depth() {
            if natural.container_bytes() != bit_depth.container_bytes() {
                return Err(MetricsError::InvalidParam {
                    reason: "bit depth incompatible with the sequence layout",
                });
            }
        }

        let file = File::open(path.as_ref()).map_err(|_| MetricsError::CannotOpenInput {
            index: 0,
            path: path.as_ref().display().to_string(),
        })?;
        let file_len = file
            .metadata()
            .map(|m| m.len())
            .map_err(|_| MetricsError::MalformedInput {
                reason: "unable to query file length",
            })?;

        let frame_samples = format.frame_samples(width, height);
        let frame_bytes = frame_samples * format.source_sample_bytes(bit_depth);
        let interlaced = format.is_interlaced();
        let mut num_fields = (file_len / frame_bytes as u64) as usize;
        if interlaced {
            num_fields *= 2;
        }

        let planes = Self::plane_layout(format, width, height);
        let samples = if format.is_packed_32() {
            Vec::new()
        } else {
            vec![T::default(); frame_samples]
        };

        Ok(FrameSource {
            file,
            format,
            bit_depth,
            rshift,
            bottom_first,
            interlaced,
            width,
            height,
            frame_bytes,
            num_fields,
            raw: vec![0u8; frame_bytes],
            samples,
            planes,
            cur_frame: None,
            bottom: false,
        })
    }

    fn plane_layout(format: SequenceFormat, w: usize, h: usize) -> [PlaneBuf<T>; 4] {
        use SequenceFormat::*;
        match format.chroma_class() {
            ChromaClass::C420 => [
                PlaneBuf::new(w, h),
                PlaneBuf::new(w / 2, h / 2),
                PlaneBuf::new(w / 2, h / 2),
                PlaneBuf::empty(),
            ],
            ChromaClass::C422 => [
                PlaneBuf::new(w, h),
                PlaneBuf::new(w / 2, h),
                PlaneBuf::new(w / 2, h),
                PlaneBuf::empty(),
            ],
            ChromaClass::C444 => {
                let alpha = match format {
                    I444P | I444I | I410P | I410I => PlaneBuf::empty(),
                    _ => PlaneBuf::new(w, h),
                };
                [
                    PlaneBuf::new(w, h),
                    PlaneBuf::new(w, h),
                    PlaneBuf::new(w, h),
                    alpha,
                ]
            }
        }
    }

    /// Number of frames the driver can request; fields count individually
    /// for interlaced sources.
    pub fn frame_count(&self) -> usize {
        self.num_fields
    }

    /// Whether frames are presented as fields.
    pub fn is_interlaced(&self) -> bool {
        self.interlaced
    }

    /// Bit depth of the demuxed samples.
    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    /// The layout tag this source was opened with.
    pub fn format(&self) -> SequenceFormat {
        self.format
    }

    /// Reads the frame backing `field_index`, demuxing and shifting its
    /// planes unless it is already cached.
    pub fn read(&mut self, field_index: usize) -> Result<(), MetricsError> {
        let (frame, bottom) = if self.interlaced {
            (field_index >> 1, self.bottom_first ^ (field_index & 1 == 1))
        } else {
            (field_index, false)
        };
        self.bottom = bottom;
        if self.cur_frame == Some(frame) {
            return Ok(());
        }

        self.file
            .seek(SeekFrom::Start(frame as u64 * self.frame_bytes as u64))
            .map_err(|_| MetricsError::MalformedInput {
                reason: "seek past end of file",
            })?;
        self.file
            .read_exact(&mut self.raw)
            .map_err(|_| MetricsError::MalformedInput {
                reason: "unexpected end of file",
            })?;
        self.demux()?;

        let shifted_planes = if self.format.is_rgb() { 4 } else { 3 };
        for plane in self.planes.iter_mut().take(shifted_planes) {
            if plane.is_empty() {
                continue;
            }
            let roi = Roi::new(plane.width(), plane.height());
            let stride = plane.stride();
            kernels::right_shift_in_place(self.rshift, plane.data_mut(), stride, roi)?;
        }
        self.cur_frame = Some(frame);
        Ok(())
    }

    fn demux(&mut self) -> Result<(), MetricsError> {
        use SequenceFormat::*;
        let (w, h) = (self.width, self.height);
        let wh = w * h;
        let roi = Roi::new(w, h);

        if !self.format.is_packed_32() {
            if self.format.source_sample_bytes(self.bit_depth) == 1 {
                for (d, s) in self.samples.iter_mut().zip(self.raw.iter()) {
                    *d = T::cast_from(*s);
                }
            } else {
                for (d, s) in self.samples.iter_mut().zip(self.raw.chunks_exact(2)) {
                    *d = T::from_le_bytes(s);
                }
            }
        }

        let samples = &self.samples;
        let [p0, p1, p2, p3] = &mut self.planes;
        match self.format {
            I420P | I420I => {
                fill_plane(samples, 0, p0)?;
                fill_plane(samples, wh, p1)?;
                fill_plane(samples, wh + wh / 4, p2)?;
            }
            Yv12P | Yv12I => {
                fill_plane(samples, 0, p0)?;
                fill_plane(samples, wh, p2)?;
                fill_plane(samples, wh + wh / 4, p1)?;
            }
            Nv12P | Nv12I => {
                let (sy, suv) = samples.split_at(wh);
                kernels::nv12_to_i420(
                    sy,
                    w,
                    suv,
                    w,
                    p0.data_mut(),
                    w,
                    p1.data_mut(),
                    w / 2,
                    p2.data_mut(),
                    w / 2,
                    roi,
                )?;
            }
            I422P | I422I => {
                fill_plane(samples, 0, p0)?;
                fill_plane(samples, wh, p1)?;
                fill_plane(samples, wh + wh / 2, p2)?;
            }
            Yuy2P | Yuy2I => {
                kernels::yuy2_to_i422(
                    samples,
                    w * 2,
                    p0.data_mut(),
                    w,
                    p1.data_mut(),
                    w / 2,
                    p2.data_mut(),
                    w / 2,
                    roi,
                )?;
            }
            Nv16P | Nv16I => {
                let (sy, suv) = samples.split_at(wh);
                kernels::nv16_to_i422(
                    sy,
                    w,
                    suv,
                    w,
                    p0.data_mut(),
                    w,
                    p1.data_mut(),
                    w / 2,
                    p2.data_mut(),
                    w / 2,
                    roi,
                )?;
            }
            I444P | I444I | I410P | I410I => {
                fill_plane(samples, 0, p0)?;
                fill_plane(samples, wh, p1)?;
                fill_plane(samples, 2 * wh, p2)?;
            }
            AyuvP | AyuvI => {
                // Packed channel order is V, U, Y, A.
                kernels::copy_c4p4(
                    samples,
                    w * 4,
                    [p2.data_mut(), p1.data_mut(), p0.data_mut(), p3.data_mut()],
                    w,
                    roi,
                )?;
            }
            Y416P | Y416I => {
                // Packed channel order is U, Y, V, A.
                kernels::copy_c4p4(
                    samples,
                    w * 4,
                    [p1.data_mut(), p0.data_mut(), p2.data_mut(), p3.data_mut()],
                    w,
                    roi,
                )?;
            }
            Rgb32P | Rgb32I | Argb16P => {
                // Packed channel order is B, G, R, A.
                kernels::copy_c4p4(
                    samples,
                    w * 4,
                    [p0.data_mut(), p1.data_mut(), p2.data_mut(), p3.data_mut()],
                    w,
                    roi,
                )?;
            }
            Y410P | Y410I => {
                kernels::y410_to_planar(
                    &self.raw,
                    w * 4,
                    [p0.data_mut(), p1.data_mut(), p2.data_mut(), p3.data_mut()],
                    w,
                    roi,
                )?;
            }
            A2Rgb10P | A2Rgb10I => {
                kernels::a2rgb10_to_planar(
                    &self.raw,
                    w * 4,
                    [p0.data_mut(), p1.data_mut(), p2.data_mut(), p3.data_mut()],
                    w,
                    roi,
                )?;
            }
        }
        Ok(())
    }

    /// A view of plane `idx` of the last read frame: the whole plane for
    /// progressive sources, the selected field for interlaced ones.
    pub fn plane(&self, idx: usize) -> PlaneView<'_, T> {
        if self.interlaced {
            self.planes[idx].field_view(self.bottom)
        } else {
            self.planes[idx].view()
        }
    }
}

fn fill_plane<T: Pixel>(
    samples: &[T],
    offset: usize,
    plane: &mut PlaneBuf<T>,
) -> Result<(), MetricsError> {
    let len = plane.width() * plane.height();
    let end = offset + len;
    if samples.len() < end {
        return Err(MetricsError::InvalidParam {
            reason: "plane region outside the frame buffer",
        });
    }
    plane.data_mut().copy_from_slice(&samples[offset..end]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_raw(bytes: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    fn i420_frame(w: usize, h: usize, y: u8, u: u8, v: u8) -> Vec<u8> {
        let mut frame = vec![y; w * h];
        frame.extend(std::iter::repeat(u).take(w * h / 4));
        frame.extend(std::iter::repeat(v).take(w * h / 4));
        frame
    }

    #[test]
    fn i420_frame_count_ignores_trailing_partial() {
        let mut bytes = i420_frame(4, 4, 1, 2, 3);
        bytes.extend(i420_frame(4, 4, 4, 5, 6));
        bytes.extend([0u8; 7]);
        let f = write_raw(&bytes);
        let src: FrameSource<u8> = FrameSource::open(
            f.path(),
            4,
            4,
            SequenceFormat::I420P,
            false,
            BitDepth::Eight,
            0,
        )
        .unwrap();
        assert_eq!(src.frame_count(), 2);
        assert!(!src.is_interlaced());
    }

    #[test]
    fn i420_planes_demux() {
        let f = write_raw(&i420_frame(4, 4, 10, 20, 30));
        let mut src: FrameSource<u8> = FrameSource::open(
            f.path(),
            4,
            4,
            SequenceFormat::I420P,
            false,
            BitDepth::Eight,
            0,
        )
        .unwrap();
        src.read(0).unwrap();
        assert!(src.plane(0).rows().all(|r| r.iter().all(|&s| s == 10)));
        assert!(src.plane(1).rows().all(|r| r.iter().all(|&s| s == 20)));
        assert!(src.plane(2).rows().all(|r| r.iter().all(|&s| s == 30)));
        assert_eq!(src.plane(1).width, 2);
        assert_eq!(src.plane(1).height, 2);
    }

    #[test]
    fn yv12_swaps_chroma_planes() {
        let f = write_raw(&i420_frame(4, 4, 10, 20, 30));
        let mut src: FrameSource<u8> = FrameSource::open(
            f.path(),
            4,
            4,
            SequenceFormat::Yv12P,
            false,
            BitDepth::Eight,
            0,
        )
        .unwrap();
        src.read(0).unwrap();
        // The first chroma block of a YV12 stream is V.
        assert!(src.plane(2).rows().all(|r| r.iter().all(|&s| s == 20)));
        assert!(src.plane(1).rows().all(|r| r.iter().all(|&s| s == 30)));
    }

    #[test]
    fn nv12_matches_equivalent_i420() {
        // 4x2 frame with distinct chroma samples.
        let mut bytes = vec![9u8; 8];
        bytes.extend([50, 60, 51, 61]); // UVUV
        let f = write_raw(&bytes);
        let mut src: FrameSource<u8> = FrameSource::open(
            f.path(),
            4,
            2,
            SequenceFormat::Nv12P,
            false,
            BitDepth::Eight,
            0,
        )
        .unwrap();
        src.read(0).unwrap();
        assert_eq!(src.plane(1).row(0), &[50, 51]);
        assert_eq!(src.plane(2).row(0), &[60, 61]);
    }

    #[test]
    fn interlaced_fields_respect_field_order() {
        let w = 4;
        let h = 4;
        // Even rows hold 100, odd rows hold 200.
        let mut bytes = Vec::new();
        for row in 0..h {
            bytes.extend(std::iter::repeat(if row % 2 == 0 { 100u8 } else { 200 }).take(w));
        }
        bytes.extend([0u8; 8]); // chroma
        let f = write_raw(&bytes);
        let mut src: FrameSource<u8> = FrameSource::open(
            f.path(),
            w,
            h,
            SequenceFormat::I420I,
            true,
            BitDepth::Eight,
            0,
        )
        .unwrap();
        assert_eq!(src.frame_count(), 2);

        // Bottom-first: field 0 is the bottom field (odd rows).
        src.read(0).unwrap();
        assert!(src.plane(0).rows().all(|r| r.iter().all(|&s| s == 200)));
        src.read(1).unwrap();
        assert!(src.plane(0).rows().all(|r| r.iter().all(|&s| s == 100)));
        assert_eq!(src.plane(0).height, 2);
        assert_eq!(src.plane(0).stride, 8);
    }

    #[test]
    fn sixteen_bit_little_endian_with_rshift() {
        // One 2x2 I420 frame at 10 bits stored with a 6-bit left bias.
        let samples: [u16; 6] = [0x4000, 0x8000, 0xc000, 0xffc0, 0x0040, 0x0080];
        let mut bytes = Vec::new();
        for s in samples {
            bytes.extend(s.to_le_bytes());
        }
        let f = write_raw(&bytes);
        let mut src: FrameSource<u16> = FrameSource::open(
            f.path(),
            2,
            2,
            SequenceFormat::I420P,
            false,
            BitDepth::Ten,
            6,
        )
        .unwrap();
        src.read(0).unwrap();
        assert_eq!(src.plane(0).row(0), &[0x100, 0x200]);
        assert_eq!(src.plane(0).row(1), &[0x300, 0x3ff]);
        assert_eq!(src.plane(1).row(0), &[0x1]);
        assert_eq!(src.plane(2).row(0), &[0x2]);
    }

    #[test]
    fn excessive_rshift_is_rejected_at_read() {
        let f = write_raw(&i420_frame(4, 4, 0, 0, 0));
        let mut src: FrameSource<u8> = FrameSource::open(
            f.path(),
            4,
            4,
            SequenceFormat::I420P,
            false,
            BitDepth::Eight,
            8,
        )
        .unwrap();
        assert!(src.read(0).is_err());
    }
}
