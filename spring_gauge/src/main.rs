// Headless runner: measures the marker displacement over a directory of frame
// images, with calibration points and reference width supplied up front.

use anyhow::{bail, Context, Result};
use clap::Parser;
use spring_gauge::{
    ColorRange, DisplacementReport, FixedPoints, GaugeConfig, Hsv, ImageSequenceSource, NullDisplay, PixelPoint, SessionConfig,
    TrackingSession,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "spring_gauge", about = "Measure the maximum displacement of a colour marker")]
struct Args {
    /// Directory of frame images, played back in file-name order.
    frames: PathBuf,
    /// TOML file with reference width, colour range and calibration points.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Physical distance between the calibration points, in millimetres.
    #[arg(long, value_name = "MM")]
    width_mm: Option<f64>,
    /// First calibration point, `X,Y` in pixels.
    #[arg(long, value_name = "X,Y", value_parser = parse_point, requires = "point_b")]
    point_a: Option<PixelPoint>,
    /// Second calibration point, `X,Y` in pixels.
    #[arg(long, value_name = "X,Y", value_parser = parse_point, requires = "point_a")]
    point_b: Option<PixelPoint>,
    /// Lower HSV bound, `H,S,V` (hue 0-179).
    #[arg(long, value_name = "H,S,V", value_parser = parse_hsv, requires = "upper")]
    lower: Option<Hsv>,
    /// Upper HSV bound, `H,S,V` (hue 0-179).
    #[arg(long, value_name = "H,S,V", value_parser = parse_hsv, requires = "lower")]
    upper: Option<Hsv>,
}

fn parse_point(text: &str) -> Result<PixelPoint, String> {
    match text.split(',').map(|part| part.trim().parse::<i32>()).collect::<Result<Vec<_>, _>>() {
        Ok(values) if values.len() == 2 => Ok(PixelPoint::new(values[0], values[1])),
        _ => Err(format!("expected X,Y, got `{text}`")),
    }
}

fn parse_hsv(text: &str) -> Result<Hsv, String> {
    match text.split(',').map(|part| part.trim().parse::<u8>()).collect::<Result<Vec<_>, _>>() {
        Ok(values) if values.len() == 3 => Ok(Hsv::new(values[0], values[1], values[2])),
        _ => Err(format!("expected H,S,V with values 0-255, got `{text}`")),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spring_gauge=info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => GaugeConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => GaugeConfig::default(),
    };

    let color_range = match (args.lower, args.upper) {
        (Some(lower), Some(upper)) => ColorRange::new(lower, upper)?,
        _ => config.color,
    };
    let Some(real_width_mm) = args.width_mm.or(config.reference_width_mm) else {
        bail!("no reference width: pass --width-mm or set reference_width_mm in the config");
    };
    let points = match (args.point_a, args.point_b, config.calibration) {
        (Some(a), Some(b), _) => vec![a, b],
        (_, _, Some(calibration)) => calibration.points().to_vec(),
        _ => bail!("headless runs need calibration points: pass --point-a/--point-b or a [calibration] section"),
    };

    let mut session = match TrackingSession::new(SessionConfig::new(real_width_mm).with_color_range(color_range)) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {e}");
            print_report(&DisplacementReport::default());
            return Ok(());
        }
    };

    let source = match ImageSequenceSource::open(&args.frames) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: Couldn't read the frame source ({e})");
            print_report(&DisplacementReport::default());
            return Ok(());
        }
    };

    let outcome = session.run(source, FixedPoints::new(points), NullDisplay);
    if let Some(e) = outcome.error() {
        eprintln!("Error: {e}");
    }
    print_report(&outcome.report);
    Ok(())
}

fn print_report(report: &DisplacementReport) {
    println!("{report}");
    println!("{}", report.max_frame_index);
}
