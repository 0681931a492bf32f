use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, ValueEnum};
use roi_preprocess::config::PreprocessConfig;
use roi_preprocess::{
    Dims, Layout, PreProcessSession, Precision, ProfilingRegistry, ResizeAlgorithm, Roi, RoiBlob,
    TensorBuffer, TensorDesc, imaging,
};
use tracing_subscriber::EnvFilter;

/// Crop, resize and convert an image into a network input tensor.
#[derive(Parser, Debug)]
#[command(name = "roiprep")]
#[command(about = "✂️ Turn an image region into a network input tensor")]
#[command(long_about = "Load an image, crop a region of interest, resize it to the input size and
convert it to the requested layout and precision. Writes PNG when the result
is an 8-bit image, raw little-endian tensor bytes otherwise.")]
struct Args {
    /// Input image
    #[arg(short, long, help = "Image to read (any format the image crate decodes)")]
    input: PathBuf,

    /// Region of interest
    #[arg(long, help = "Region as x,y,width,height (default: whole image)")]
    roi: Option<String>,

    /// Destination size
    #[arg(short, long, default_value = "224x224", help = "Destination spatial size as WIDTHxHEIGHT")]
    size: String,

    /// Resize algorithm
    #[arg(short, long, value_enum, default_value_t = ResizeAlgorithm::Bilinear)]
    algorithm: ResizeAlgorithm,

    /// Destination layout
    #[arg(short, long, value_enum, default_value_t = Layout::NCHW)]
    layout: Layout,

    /// Destination precision
    #[arg(short, long, value_enum, default_value_t = Precision::FP32)]
    precision: Precision,

    /// Channels taken from the image
    #[arg(short, long, default_value_t = 3, help = "1 (luma), 3 (RGB) or 4 (RGBA)")]
    channels: usize,

    /// Number of executions, for timing
    #[arg(short, long, default_value_t = 1)]
    repeat: u32,

    /// Output path
    #[arg(short, long, help = "Where to write the result (PNG or raw bytes)")]
    output: Option<PathBuf>,

    /// Profiling report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
    #[value(name = "none")]
    Silent,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.repeat == 0 {
        bail!("--repeat must be at least 1");
    }
    let (width, height) = parse_size(&args.size)?;

    let source = imaging::load(&args.input, args.channels)
        .with_context(|| format!("loading {}", args.input.display()))?;
    let roi = match args.roi.as_deref() {
        Some(text) => RoiBlob::new(source.clone(), parse_roi(text)?)?,
        None => RoiBlob::full(source.clone()),
    };

    let dest_dims = Dims::new(1, args.channels, height, width);
    let dest = TensorBuffer::allocate(TensorDesc::new(args.precision, args.layout, dest_dims)?)?;

    let registry = Arc::new(ProfilingRegistry::new());
    let config = PreprocessConfig {
        default_algorithm: args.algorithm,
        ..PreprocessConfig::default()
    };
    let mut session = PreProcessSession::builder()
        .config(config)
        .profiler(registry.clone())
        .roi(roi)
        .build()?;

    for _ in 0..args.repeat {
        session.execute_default(&dest)?;
    }

    if let Some(path) = &args.output {
        let png = imaging::save(&dest, path).with_context(|| format!("writing {}", path.display()))?;
        let kind = if png { "PNG" } else { "raw tensor" };
        println!("{} {} → {}", kind, dest.desc(), path.display());
    }

    let report = registry.snapshot();
    match args.report {
        ReportFormat::Text => println!("{report}"),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report.to_json())?),
        ReportFormat::Silent => {}
    }
    Ok(())
}

/// Parse "x,y,w,h" into a region of interest
fn parse_roi(text: &str) -> Result<Roi> {
    let parts = text
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| anyhow!("Invalid ROI: {text}. Use x,y,width,height"))?;
    match parts[..] {
        [x, y, w, h] => Ok(Roi::new(x, y, w, h)),
        _ => Err(anyhow!("Invalid ROI: {text}. Expected 4 values, got {}", parts.len())),
    }
}

/// Parse "WxH" into (width, height)
fn parse_size(size: &str) -> Result<(usize, usize)> {
    let (w, h) = size
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("Invalid size: {size}. Use WIDTHxHEIGHT, e.g. 224x224"))?;
    let w: usize = w.trim().parse().map_err(|_| anyhow!("Invalid width in size: {w}"))?;
    let h: usize = h.trim().parse().map_err(|_| anyhow!("Invalid height in size: {h}"))?;
    if w == 0 || h == 0 {
        bail!("Size must be non-zero: {size}");
    }
    Ok((w, h))
}
