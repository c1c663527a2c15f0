//! Text emission of metric values.
//!
//! One line per metric: per-frame lines list every scheduled frame's value,
//! average lines carry the per-sequence value. All numbers are fixed-point,
//! width 8, precision 5.

use std::io::{self, Write};

/// Writes the per-frame lines for every name whose output flag is on.
///
/// APSNR has no meaningful per-frame value distinct from PSNR and is always
/// skipped here.
pub fn write_per_frame<W: Write>(
    out: &mut W,
    names: &[String],
    flags: &[bool],
    per_frame: &[Vec<f64>],
) -> io::Result<()> {
    for (i, name) in names.iter().enumerate() {
        if !flags[i] || name.contains("APSNR") {
            continue;
        }
        write!(out, "<pfr_metric={}>", name)?;
        for frame in per_frame {
            write!(out, " {:8.5}", frame[i])?;
        }
        writeln!(out, "</pfr_metric>")?;
    }
    Ok(())
}

/// Writes the per-sequence line for every name whose output flag is on.
pub fn write_averages<W: Write>(
    out: &mut W,
    names: &[String],
    flags: &[bool],
    averages: &[f64],
) -> io::Result<()> {
    for (i, name) in names.iter().enumerate() {
        if !flags[i] {
            continue;
        }
        writeln!(out, "<avg_metric={}> {:8.5}</avg_metric>", name, averages[i])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_frame_lines_skip_apsnr_and_disabled_names() {
        let names = vec![
            "Y-MSE".to_string(),
            "Y-PSNR".to_string(),
            "Y-APSNR".to_string(),
        ];
        let flags = vec![false, true, true];
        let per_frame = vec![vec![1.0, 48.13084, 48.13084], vec![0.0, 1000.0, 1000.0]];
        let mut out = Vec::new();
        write_per_frame(&mut out, &names, &flags, &per_frame).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<pfr_metric=Y-PSNR> 48.13084 1000.00000</pfr_metric>\n"
        );
    }

    #[test]
    fn average_lines_use_fixed_width_format() {
        let names = vec!["SSIM".to_string()];
        let flags = vec![true];
        let mut out = Vec::new();
        write_averages(&mut out, &names, &flags, &[0.5]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<avg_metric=SSIM>  0.50000</avg_metric>\n"
        );
    }
}
