use raw_metrics::video::driver::{
    run_comparison, CompareOptions, Schedule, ScheduleWarning, SourceOptions,
};
use raw_metrics::video::format::{BitDepth, SequenceFormat};
use raw_metrics::video::output::{write_averages, write_per_frame};
use raw_metrics::video::{Components, MetricMask};
use raw_metrics::MetricsError;
use std::io::{self, Write};
use std::process::exit;

const ERRORS: [&str; 15] = [
    "ERROR: Unable to parse input metric specifications!",
    "ERROR: Empty metrics set!",
    "ERROR: Unable to open first sequence file!",
    "ERROR: Unable to open second sequence file!",
    "ERROR: Unspecified error during metric calculation!",
    "ERROR: Empty input file!",
    "WARNING: Incorrect selective frames parameters: not enough frames in sequences!",
    "ERROR: Unsupported sequence type!",
    "ERROR: Unable to compare interlaced with progressive sequences!",
    "ERROR: Unable to compare sequences of different sizes on chromaticity channels!",
    "ERROR: Unable to compare RGB with YUV!",
    "ERROR: Unable to use parameters \"fs\" and \"numseekframe\" together!",
    "WARNING: Wrong seek ranges!",
    "ERROR: Failed to allocate memory!",
    "ERROR: Unsupported bit depth!",
];

fn usage() -> i32 {
    println!("Usage:");
    println!("raw-metrics <Options> <metric1> ... [<metricN>]... <plane1> ...[<planeN>] ...");
    println!("Possible metrics are: psnr, apsnr, ssim, mssim, artifacts, mwdvqm, uqi");
    println!("Possible planes are: y, u, v, overall, all");
    println!("Required options are:");
    println!("    -i1 <filename> - name of first file to compare");
    println!("    -i2 <filename> - name of second file to compare");
    println!("    -w  <integer> - width of sequences pixels");
    println!("    -h  <integer> - height of sequences pixels");
    println!("Optional parameters are:");
    println!("    -fs1 <i1> <i2> <i3> - calculate metric only for <i1> number of frames from 1st file starting with <i2>th sequence frame with step <i3>");
    println!("    -fs2 <i1> <i2> <i3> - calculate metric only for <i1> number of frames from 2nd file starting with <i2>th sequence frame with step <i3>");
    println!("    -fs <i1> <i2> <i3>  - calculate metric only for <i1> number of frames starting with <i2>th sequence frame with step <i3>");
    println!("    -alpha              - calculate metrics for RGB alpha channel");
    println!("    -numseekframe1 <from> <to> <num> - performs seeks to particular position in 1st file. FROM - position FROM, TO - seek position, NUM - number of iterations");
    println!("    -numseekframe2 <from> <to> <num> - performs seeks to particular position in 2nd file. FROM - position FROM, TO - seek position, NUM - number of iterations");
    println!("    -nopfm              - suppress per-frame metrics output");
    println!("    -st type1 [type2]   - input sequences type (type1 for both sequences, type2 override type for second sequence)");
    println!("                          4:2:0 types: i420p (default), i420i, yv12p, nv12p, yv12i, nv12i");
    println!("                          4:2:2 types: yuy2p, yuy2i, nv16p, nv16i, i422p, i422i");
    println!("                          4:4:4 types: ayuvp, ayuvi, y410p, y410i, y416p, y416i, i444p, i444i, i410p, i410i");
    println!("                          RGB types  : rgb32p, rgb32i, a2rgb10p, a2rgb10i, argb16p");
    println!("    -bd <integer>       - bit depth of sequences pixels");
    println!("                          Possible values: 8, 10, 12, 16");
    println!("    -rshift1 <integer>  - shift pixel values for <integer> bits to the right in first file");
    println!("    -rshift2 <integer>  - shift pixel values for <integer> bits to the right in second file");
    println!("    -btm_first          - bottom field first for interlaced sources");
    println!("    -btm_first1         - bottom field first for the 1st source");
    println!("    -btm_first2         - bottom field first for the 2nd source");
    println!("NOTES:    1. Different chromaticity representations can be compared on Y channel only.");
    println!("          2. In case of 10 bits non-zero values must be located from bit #0 to bit #9.");
    println!("             If such bits are located from bit #6 to bit #15 use parameters \"-rshift1 6 -rshift2 6\"");
    println!("Example: ");
    println!("    raw-metrics -i1 foreman.yuv -i2 x264_decoded.yuv -w 352 -h 288 psnr all ssim y");
    println!("    raw-metrics -i1 foreman.yuv -i2 x264_decoded.yuv -w 352 -h 288 -nopfm -st i420p -fs 20 0 1 psnr y");
    println!();
    println!("Wrong input parameters!!!");
    -1
}

fn parse_int(s: &str) -> i64 {
    s.parse().unwrap_or(0)
}

fn metric_token(token: &str) -> Option<MetricMask> {
    Some(match token {
        "psnr" => MetricMask::PSNR | MetricMask::MSE,
        "apsnr" => MetricMask::APSNR | MetricMask::MSE,
        "ssim" => MetricMask::SSIM,
        "mssim" => MetricMask::MSSIM,
        "artifacts" => MetricMask::ARTIFACTS,
        "mwdvqm" => MetricMask::MWDVQM,
        "uqi" => MetricMask::UQI,
        _ => return None,
    })
}

/// Parses the trailing `<metric>... <plane>...` token groups.
fn parse_metrics(components: &mut Components, args: &[String], mut i: usize) -> Result<(), ()> {
    while i < args.len() {
        let mut mask = MetricMask::empty();
        while i + 1 < args.len() {
            match metric_token(&args[i]) {
                Some(m) => {
                    mask |= m;
                    i += 1;
                }
                None => break,
            }
        }
        if mask.is_empty() {
            return Err(());
        }

        let mut got_plane = false;
        while i < args.len() {
            let token = &args[i];
            let matched = if token == "overall" {
                components.add_overall(mask);
                true
            } else if token == "all" {
                components.add_all(mask);
                true
            } else if token.len() == 1 {
                let c = token.chars().next().unwrap();
                match components
                    .labels()
                    .iter()
                    .take(3)
                    .position(|l| l.to_ascii_lowercase() == c)
                {
                    Some(p) => {
                        components.add_plane(p, mask);
                        true
                    }
                    None => false,
                }
            } else {
                false
            };
            if !matched {
                break;
            }
            i += 1;
            got_plane = true;
        }
        if !got_plane {
            return Err(());
        }
    }
    Ok(())
}

fn error_code(err: &MetricsError) -> (usize, i32) {
    match err {
        MetricsError::CannotOpenInput { index: 1, .. } => (2, -3),
        MetricsError::CannotOpenInput { .. } => (3, -4),
        MetricsError::EmptyInput => (5, -6),
        MetricsError::InterlaceMismatch => (8, -8),
        MetricsError::ChromaMismatch => (9, -9),
        MetricsError::ColorFamilyMismatch => (10, -10),
        MetricsError::MemoryAlloc => (13, -13),
        MetricsError::InvalidParam { .. }
        | MetricsError::UnsupportedInput { .. }
        | MetricsError::MalformedInput { .. } => (4, -5),
    }
}

fn run(args: Vec<String>) -> i32 {
    let mut input1: Option<String> = None;
    let mut input2: Option<String> = None;
    let mut width = 0i64;
    let mut height = 0i64;
    let mut sq1 = SequenceFormat::I420P;
    let mut sq2 = SequenceFormat::I420P;
    let mut bit_depth = BitDepth::Eight;
    let mut no_pfm = false;
    let mut alpha = false;
    let mut order1 = false;
    let mut order2 = false;
    let mut rshift1 = 0u32;
    let mut rshift2 = 0u32;
    let mut fs: Option<(i64, i64, i64)> = None;
    let mut fs1: Option<(i64, i64, i64)> = None;
    let mut fs2: Option<(i64, i64, i64)> = None;
    let mut seek1: Option<(i64, i64, i64)> = None;
    let mut seek2: Option<(i64, i64, i64)> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-i1" if i + 1 < args.len() => {
                input1 = Some(args[i + 1].clone());
                i += 2;
            }
            "-i2" if i + 1 < args.len() => {
                input2 = Some(args[i + 1].clone());
                i += 2;
            }
            "-w" if i + 1 < args.len() => {
                width = parse_int(&args[i + 1]);
                i += 2;
            }
            "-h" if i + 1 < args.len() => {
                height = parse_int(&args[i + 1]);
                i += 2;
            }
            "-rshift1" if i + 1 < args.len() => {
                rshift1 = parse_int(&args[i + 1]).max(0) as u32;
                i += 2;
            }
            "-rshift2" if i + 1 < args.len() => {
                rshift2 = parse_int(&args[i + 1]).max(0) as u32;
                i += 2;
            }
            "-fs" if i + 3 < args.len() => {
                if seek1.is_some() || seek2.is_some() {
                    println!("{}", ERRORS[11]);
                    return -11;
                }
                fs = Some((
                    parse_int(&args[i + 1]),
                    parse_int(&args[i + 2]),
                    parse_int(&args[i + 3]),
                ));
                i += 4;
            }
            "-fs1" if i + 3 < args.len() => {
                if seek1.is_some() || seek2.is_some() {
                    println!("{}", ERRORS[11]);
                    return -11;
                }
                if fs.is_none() {
                    fs1 = Some((
                        parse_int(&args[i + 1]),
                        parse_int(&args[i + 2]),
                        parse_int(&args[i + 3]),
                    ));
                }
                i += 4;
            }
            "-fs2" if i + 3 < args.len() => {
                if seek1.is_some() || seek2.is_some() {
                    println!("{}", ERRORS[11]);
                    return -11;
                }
                if fs.is_none() {
                    fs2 = Some((
                        parse_int(&args[i + 1]),
                        parse_int(&args[i + 2]),
                        parse_int(&args[i + 3]),
                    ));
                }
                i += 4;
            }
            "-nopfm" => {
                no_pfm = true;
                i += 1;
            }
            "-alpha" => {
                alpha = true;
                i += 1;
            }
            "-btm_first" => {
                order1 = true;
                order2 = true;
                i += 1;
            }
            "-btm_first1" => {
                order1 = true;
                i += 1;
            }
            "-btm_first2" => {
                order2 = true;
                i += 1;
            }
            "-numseekframe1" if i + 3 < args.len() => {
                if fs.is_some() || fs1.is_some() || fs2.is_some() {
                    println!("{}", ERRORS[11]);
                    return -11;
                }
                seek1 = Some((
                    parse_int(&args[i + 1]),
                    parse_int(&args[i + 2]),
                    parse_int(&args[i + 3]),
                ));
                i += 4;
            }
            "-numseekframe2" if i + 3 < args.len() => {
                if fs.is_some() || fs1.is_some() || fs2.is_some() {
                    println!("{}", ERRORS[11]);
                    return -11;
                }
                seek2 = Some((
                    parse_int(&args[i + 1]),
                    parse_int(&args[i + 2]),
                    parse_int(&args[i + 3]),
                ));
                i += 4;
            }
            "-bd" if i + 1 < args.len() => {
                match parse_int(&args[i + 1])
                    .try_into()
                    .ok()
                    .and_then(BitDepth::from_bits)
                {
                    Some(bd) => bit_depth = bd,
                    None => {
                        println!("{}", ERRORS[14]);
                        return -14;
                    }
                }
                i += 2;
            }
            "-st" if i + 1 < args.len() => {
                match args[i + 1].parse::<SequenceFormat>() {
                    Ok(f) => sq1 = f,
                    Err(_) => {
                        println!("{}", ERRORS[7]);
                        return -7;
                    }
                }
                i += 2;
                sq2 = sq1;
                if i < args.len() {
                    if let Ok(f) = args[i].parse::<SequenceFormat>() {
                        sq2 = f;
                        i += 1;
                    }
                }
                if let Some(bd) = sq2.natural_bit_depth().or(sq1.natural_bit_depth()) {
                    bit_depth = bd;
                }
                if sq1.is_interlaced() != sq2.is_interlaced() {
                    println!("{}", ERRORS[8]);
                    return -8;
                }
            }
            _ => break,
        }
    }

    if sq1.is_rgb() != sq2.is_rgb() {
        println!("{}", ERRORS[10]);
        return -10;
    }

    let mut components = if sq1.is_rgb() {
        Components::rgb(alpha)
    } else {
        Components::yuv()
    };

    let (input1, input2) = match (input1, input2) {
        (Some(a), Some(b)) if width > 0 && height > 0 => (a, b),
        _ => return usage(),
    };

    if parse_metrics(&mut components, &args, i).is_err() {
        println!("{}", ERRORS[0]);
        return -1;
    }
    if components.requested().is_empty() {
        println!("{}", ERRORS[1]);
        return -2;
    }

    let schedule = |own_fs: Option<(i64, i64, i64)>, seek: Option<(i64, i64, i64)>| {
        if let Some((count, first, step)) = fs.or(own_fs) {
            Schedule::Window { count, first, step }
        } else if let Some((from, to, iterations)) = seek {
            Schedule::Seek {
                from,
                to,
                iterations,
            }
        } else {
            Schedule::Full
        }
    };

    let options = CompareOptions {
        first: SourceOptions {
            path: input1.into(),
            format: sq1,
            bottom_first: order1,
            rshift: rshift1,
            schedule: schedule(fs1, seek1),
        },
        second: SourceOptions {
            path: input2.into(),
            format: sq2,
            bottom_first: order2,
            rshift: rshift2,
            schedule: schedule(fs2, seek2),
        },
        width: width as usize,
        height: height as usize,
        bit_depth,
        components,
    };

    let results = match run_comparison(&options) {
        Ok(results) => results,
        Err(err) => {
            let (msg, code) = error_code(&err);
            println!("{}", ERRORS[msg]);
            return code;
        }
    };

    for warning in &results.warnings {
        match warning {
            ScheduleWarning::FirstFrameBeyondEof => println!("{}", ERRORS[6]),
            ScheduleWarning::BadSeekRange { .. } => println!("{}", ERRORS[12]),
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if !no_pfm {
        let _ = write_per_frame(
            &mut out,
            &results.metric_names,
            &results.output_flags,
            &results.per_frame,
        );
    }
    let _ = write_averages(
        &mut out,
        &results.metric_names,
        &results.output_flags,
        &results.averages,
    );
    let _ = out.flush();
    0
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    exit(run(args));
}
