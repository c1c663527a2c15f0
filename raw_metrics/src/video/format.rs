//! Sequence tags describing the layout of a raw video stream.
//!
//! A tag names both the pixel layout (planar, semi-planar or packed) and the
//! scan type (progressive or interlaced). All other geometry attributes are
//! derived from it.

use std::fmt;
use std::str::FromStr;

/// Relative chroma-to-luma sampling of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ChromaClass {
    /// 4:2:0 — chroma subsampled 2x in both dimensions.
    C420,
    /// 4:2:2 — chroma subsampled 2x horizontally.
    C422,
    /// 4:4:4 — chroma at full resolution. RGB always falls in this class.
    C444,
}

/// Bit depth of the stored samples.
///
/// 10- and 12-bit samples live LSB-aligned in 16-bit little-endian
/// containers after the optional right shift applied at load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum BitDepth {
    /// 8 bits per sample.
    Eight,
    /// 10 bits per sample.
    Ten,
    /// 12 bits per sample.
    Twelve,
    /// 16 bits per sample.
    Sixteen,
}

impl BitDepth {
    /// Largest representable error between two samples at this depth.
    pub fn max_error(self) -> f64 {
        match self {
            BitDepth::Eight => 255.0,
            BitDepth::Ten => 1023.0,
            BitDepth::Twelve => 4095.0,
            BitDepth::Sixteen => 65535.0,
        }
    }

    /// Bytes per sample in the demuxed plane buffers.
    pub fn container_bytes(self) -> usize {
        match self {
            BitDepth::Eight => 1,
            _ => 2,
        }
    }

    /// Parses the `-bd` CLI value.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(BitDepth::Eight),
            10 => Some(BitDepth::Ten),
            12 => Some(BitDepth::Twelve),
            16 => Some(BitDepth::Sixteen),
            _ => None,
        }
    }
}

/// Pixel layout and scan type of a raw sequence.
///
/// The `P`/`I` suffix selects progressive or interlaced scan; interlaced
/// sources present each field as one frame to the processing loop.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SequenceFormat {
    // 4:2:0
    I420P,
    I420I,
    Yv12P,
    Yv12I,
    Nv12P,
    Nv12I,
    // 4:2:2
    Yuy2P,
    Yuy2I,
    Nv16P,
    Nv16I,
    I422P,
    I422I,
    // 4:4:4
    AyuvP,
    AyuvI,
    Y410P,
    Y410I,
    Y416P,
    Y416I,
    I444P,
    I444I,
    I410P,
    I410I,
    // RGB
    Rgb32P,
    Rgb32I,
    A2Rgb10P,
    A2Rgb10I,
    Argb16P,
}

impl SequenceFormat {
    /// Whether the source carries two fields per stored frame.
    pub fn is_interlaced(self) -> bool {
        use SequenceFormat::*;
        matches!(
            self,
            I420I | Yv12I | Nv12I | Yuy2I | Nv16I | I422I | AyuvI | Y410I | Y416I | I444I | I410I
                | Rgb32I | A2Rgb10I
        )
    }

    /// Whether the source is an RGB layout rather than YUV.
    pub fn is_rgb(self) -> bool {
        use SequenceFormat::*;
        matches!(self, Rgb32P | Rgb32I | A2Rgb10P | A2Rgb10I | Argb16P)
    }

    /// Chroma sampling class of the layout.
    pub fn chroma_class(self) -> ChromaClass {
        use SequenceFormat::*;
        match self {
            AyuvP | AyuvI | Y410P | Y410I | Y416P | Y416I | I444P | I444I | I410P | I410I
            | Rgb32P | Rgb32I | A2Rgb10P | A2Rgb10I | Argb16P => ChromaClass::C444,
            Yuy2P | Yuy2I | Nv16P | Nv16I | I422P | I422I => ChromaClass::C422,
            _ => ChromaClass::C420,
        }
    }

    /// Bit depth implied by the layout itself, if any.
    ///
    /// Y410, I410 and A2RGB10 are inherently 10-bit; Y416 and ARGB16 are
    /// inherently 16-bit. The remaining layouts take their depth from the
    /// `-bd` option.
    pub fn natural_bit_depth(self) -> Option<BitDepth> {
        use SequenceFormat::*;
        match self {
            Y410P | Y410I | I410P | I410I | A2Rgb10P | A2Rgb10I => Some(BitDepth::Ten),
            Y416P | Y416I | Argb16P => Some(BitDepth::Sixteen),
            _ => None,
        }
    }

    /// Whether the raw stream packs whole pixels into 32-bit words.
    pub fn is_packed_32(self) -> bool {
        use SequenceFormat::*;
        matches!(self, Y410P | Y410I | A2Rgb10P | A2Rgb10I)
    }

    /// Source samples (or, for packed 32-bit layouts, bytes) per frame of
    /// `width`×`height` pixels.
    pub fn frame_samples(self, width: usize, height: usize) -> usize {
        use SequenceFormat::*;
        match self.chroma_class() {
            ChromaClass::C420 => width * height * 3 / 2,
            ChromaClass::C422 => width * height * 2,
            ChromaClass::C444 => match self {
                I444P | I444I | I410P | I410I => width * height * 3,
                _ => width * height * 4,
            },
        }
    }

    /// Bytes per source sample in the raw stream: 1 for 8-bit and for the
    /// packed 32-bit layouts (whose "samples" are bytes), 2 otherwise.
    pub fn source_sample_bytes(self, bit_depth: BitDepth) -> usize {
        if bit_depth == BitDepth::Eight || self.is_packed_32() {
            1
        } else {
            2
        }
    }
}

impl fmt::Display for SequenceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = format!("{:?}", self).to_lowercase();
        f.write_str(&s)
    }
}

impl FromStr for SequenceFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use SequenceFormat::*;
        Ok(match s {
            "i420p" => I420P,
            "i420i" => I420I,
            "yv12p" => Yv12P,
            "yv12i" => Yv12I,
            "nv12p" => Nv12P,
            "nv12i" => Nv12I,
            "yuy2p" => Yuy2P,
            "yuy2i" => Yuy2I,
            "nv16p" => Nv16P,
            "nv16i" => Nv16I,
            "i422p" => I422P,
            "i422i" => I422I,
            "ayuvp" => AyuvP,
            "ayuvi" => AyuvI,
            "y410p" => Y410P,
            "y410i" => Y410I,
            "y416p" => Y416P,
            "y416i" => Y416I,
            "i444p" => I444P,
            "i444i" => I444I,
            "i410p" => I410P,
            "i410i" => I410I,
            "rgb32p" => Rgb32P,
            "rgb32i" => Rgb32I,
            "a2rgb10p" => A2Rgb10P,
            "a2rgb10i" => A2Rgb10I,
            "argb16p" => Argb16P,
            _ => return Err(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_parse_and_classify() {
        let fmt: SequenceFormat = "nv12i".parse().unwrap();
        assert_eq!(fmt, SequenceFormat::Nv12I);
        assert!(fmt.is_interlaced());
        assert!(!fmt.is_rgb());
        assert_eq!(fmt.chroma_class(), ChromaClass::C420);

        let fmt: SequenceFormat = "a2rgb10p".parse().unwrap();
        assert!(fmt.is_rgb());
        assert!(fmt.is_packed_32());
        assert_eq!(fmt.natural_bit_depth(), Some(BitDepth::Ten));
        assert_eq!(fmt.chroma_class(), ChromaClass::C444);

        assert!("i420x".parse::<SequenceFormat>().is_err());
    }

    #[test]
    fn frame_geometry() {
        assert_eq!(SequenceFormat::I420P.frame_samples(16, 8), 192);
        assert_eq!(SequenceFormat::Yuy2P.frame_samples(16, 8), 256);
        assert_eq!(SequenceFormat::I444P.frame_samples(16, 8), 384);
        assert_eq!(SequenceFormat::AyuvP.frame_samples(16, 8), 512);
        // Packed 32-bit: four bytes per pixel, one "sample" per byte.
        assert_eq!(SequenceFormat::Y410P.frame_samples(16, 8), 512);
        assert_eq!(
            SequenceFormat::Y410P.source_sample_bytes(BitDepth::Ten),
            1
        );
        assert_eq!(
            SequenceFormat::I420P.source_sample_bytes(BitDepth::Ten),
            2
        );
    }

    #[test]
    fn max_error_per_depth() {
        assert_eq!(BitDepth::Eight.max_error(), 255.0);
        assert_eq!(BitDepth::Ten.max_error(), 1023.0);
        assert_eq!(BitDepth::Twelve.max_error(), 4095.0);
        assert_eq!(BitDepth::Sixteen.max_error(), 65535.0);
        assert_eq!(BitDepth::from_bits(12), Some(BitDepth::Twelve));
        assert_eq!(BitDepth::from_bits(9), None);
    }
}
