mod video;
mod windows;

use anyhow::{bail, Context, Result};
use clap::Parser;
use spring_gauge::{ColorRange, DisplacementReport, GaugeConfig, GaugeError, Hsv, SessionConfig, SourceError, TrackingSession};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use video::VideoFileSource;
use windows::{close_windows, ClickCalibration, LiveDisplay};

#[derive(Parser, Debug)]
#[command(name = "spring_gauge_viewer", about = "Calibrate on a video's first frame and track a colour marker live")]
struct Args {
    /// Video file to measure.
    video: PathBuf,
    /// TOML file with reference width and colour range.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Physical distance between the calibration clicks, in millimetres.
    /// Prompted for when neither this nor the config provides it.
    #[arg(long, value_name = "MM")]
    width_mm: Option<f64>,
    /// Lower HSV bound, `H,S,V` (hue 0-179).
    #[arg(long, value_name = "H,S,V", value_parser = parse_hsv, requires = "upper")]
    lower: Option<Hsv>,
    /// Upper HSV bound, `H,S,V` (hue 0-179).
    #[arg(long, value_name = "H,S,V", value_parser = parse_hsv, requires = "lower")]
    upper: Option<Hsv>,
}

fn parse_hsv(text: &str) -> Result<Hsv, String> {
    match text.split(',').map(|part| part.trim().parse::<u8>()).collect::<Result<Vec<_>, _>>() {
        Ok(values) if values.len() == 3 => Ok(Hsv::new(values[0], values[1], values[2])),
        _ => Err(format!("expected H,S,V with values 0-255, got `{text}`")),
    }
}

fn prompt_width_mm() -> Result<f64> {
    println!("Enter the actual width of spring in mm:");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("no reference width entered");
    }
    line.trim()
        .parse::<f64>()
        .with_context(|| format!("`{}` is not a number", line.trim()))
}

/// The line printed on stderr when a run ends in a fatal error. A video that
/// opens but yields no frame is reported like one that cannot be opened.
fn diagnostic(error: &GaugeError) -> String {
    match error {
        GaugeError::Source(SourceError::NoFirstFrame) => "Error: Couldn't read the video file".to_string(),
        other => format!("Error: {other}"),
    }
}

fn print_report(report: &DisplacementReport) {
    println!("{report}");
    println!("{}", report.max_frame_index);
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spring_gauge=info,spring_gauge_viewer=info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    // --- 1. Configuration ---
    let config = match &args.config {
        Some(path) => GaugeConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => GaugeConfig::default(),
    };
    let color_range = match (args.lower, args.upper) {
        (Some(lower), Some(upper)) => ColorRange::new(lower, upper)?,
        _ => config.color,
    };

    // --- 2. Video Source ---
    let source = match VideoFileSource::open(&args.video) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: Couldn't read the video file ({e})");
            print_report(&DisplacementReport::default());
            return Ok(());
        }
    };

    // --- 3. Reference Width ---
    let real_width_mm = match args.width_mm.or(config.reference_width_mm) {
        Some(width) => width,
        None => prompt_width_mm()?,
    };
    let mut session = match TrackingSession::new(SessionConfig::new(real_width_mm).with_color_range(color_range)) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {e}");
            print_report(&DisplacementReport::default());
            return Ok(());
        }
    };

    // --- 4. Calibrate And Track ---
    let outcome = session.run(source, ClickCalibration, LiveDisplay);
    close_windows();

    if let Some(e) = outcome.error() {
        eprintln!("{}", diagnostic(e));
    }
    print_report(&outcome.report);
    Ok(())
}
