use std::path::Path;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use edge_core::{EdgeBridge, ProcessorConfig};

const FRAMES: usize = 30;

/// Largest test card the demo will synthesize (a 16K frame)
const MAX_DEMO_PIXELS: usize = 15360 * 8640;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage:");
        eprintln!("  edge-demo canny <width> <height> [threshold1 threshold2] [--config <file.toml>]");
        eprintln!("  edge-demo gray <width> <height> [--config <file.toml>]");
        std::process::exit(2);
    }

    let width: i32 = args[2].parse().context("invalid width")?;
    let height: i32 = args[3].parse().context("invalid height")?;

    let mut rest: Vec<&str> = args[4..].iter().map(String::as_str).collect();
    let config = match rest.iter().position(|a| *a == "--config") {
        Some(i) => {
            let path = rest.get(i + 1).context("--config requires a path")?;
            let config = ProcessorConfig::load_from_file(Path::new(path))?;
            rest.drain(i..i + 2);
            config
        }
        None => ProcessorConfig::default(),
    };

    let bridge: EdgeBridge = EdgeBridge::new();
    bridge.init_with_config(config);

    let frame = synthetic_frame(width, height)?;

    let output = match args[1].as_str() {
        "canny" => {
            let (t1, t2) = match rest.as_slice() {
                [t1, t2, ..] => (
                    t1.parse().context("invalid threshold1")?,
                    t2.parse().context("invalid threshold2")?,
                ),
                _ => bridge
                    .config()
                    .map(|c| c.default_thresholds())
                    .unwrap_or((50, 150)),
            };
            info!(t1, t2, "Running Canny");
            run_frames(&bridge, || bridge.process_edge_detect(&frame, width, height, t1, t2))?
        }
        "gray" => run_frames(&bridge, || bridge.process_grayscale(&frame, width, height))?,
        other => anyhow::bail!("unknown mode: {}", other),
    };

    let lit = output.chunks_exact(3).filter(|px| px[0] > 0).count();
    println!("OUTPUT_BYTES={}", output.len());
    println!("NONZERO_PIXELS={}", lit);
    Ok(())
}

/// Push the same frame through the bridge a few times and report timing
fn run_frames(
    bridge: &EdgeBridge,
    mut process: impl FnMut() -> Option<Vec<u8>>,
) -> anyhow::Result<Vec<u8>> {
    let mut total_ms = 0.0;
    let mut last = None;
    for _ in 0..FRAMES {
        last = Some(process().context("frame rejected (see log)")?);
        total_ms += bridge.last_processing_time_millis();
    }

    let (w, h) = bridge.last_frame_dimensions();
    println!("FRAME={}x{}", w, h);
    println!("MEAN_MS={:.3}", total_ms / FRAMES as f64);
    last.context("no frames processed")
}

/// Byte length of a `width` x `height` RGBA frame, if the demo can build one
fn frame_len(width: i32, height: i32) -> anyhow::Result<usize> {
    if width <= 0 || height <= 0 {
        anyhow::bail!("dimensions must be positive, got {}x{}", width, height);
    }
    let pixels = (width as usize)
        .checked_mul(height as usize)
        .filter(|&n| n <= MAX_DEMO_PIXELS)
        .with_context(|| format!("{}x{} exceeds the demo limit of {} pixels", width, height, MAX_DEMO_PIXELS))?;
    Ok(pixels * 4)
}

/// RGBA test card: checkerboard over a horizontal ramp
fn synthetic_frame(width: i32, height: i32) -> anyhow::Result<Vec<u8>> {
    let len = frame_len(width, height)?;
    let (width, height) = (width as usize, height as usize);
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .with_context(|| format!("could not allocate a {}x{} frame", width, height))?;
    for y in 0..height {
        for x in 0..width {
            let ramp = (x * 255 / width.max(1)) as u8;
            let v = if (x / 16 + y / 16) % 2 == 0 { ramp } else { 255 - ramp };
            buf.extend_from_slice(&[v, v / 2, 255 - v, 255]);
        }
    }
    Ok(buf)
}
