use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use cortexview::demo::{self, DemoSettings};
use cortexview::{GpuBackend, GpuContext, LoopState, RenderLoop, ViewerConfig, ViewportContext};

#[derive(Parser, Debug)]
#[command(name = "cortexview")]
#[command(author, version, about = "Animated cortical surface viewer")]
struct Args {
    /// Config file (defaults to ./cortexview.toml or the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Window width
    #[arg(long)]
    width: Option<u32>,

    /// Window height
    #[arg(long)]
    height: Option<u32>,

    /// Demo mesh longitude resolution
    #[arg(long, default_value = "64")]
    vertices_per_ring: usize,

    /// Demo mesh latitude resolution
    #[arg(long, default_value = "48")]
    rings: usize,

    /// Demo animation length in frames
    #[arg(long, default_value = "120")]
    frames: usize,

    /// Render this many frames offscreen instead of opening a window
    #[arg(long, value_name = "N")]
    headless: Option<usize>,

    /// PNG written by --headless
    #[arg(short, long, default_value = "cortexview.png")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ViewerConfig::load_default(),
    };
    if let Some(width) = args.width {
        config.window.width = width;
    }
    if let Some(height) = args.height {
        config.window.height = height;
    }

    let payload = demo::hemisphere(&DemoSettings {
        vertices_per_ring: args.vertices_per_ring,
        rings: args.rings,
        frames: args.frames,
    })?;

    match args.headless {
        Some(frames) => render_headless(&config, payload, frames, &args.output),
        None => Ok(cortexview::run(config, payload)?),
    }
}

/// Render `frames` frames at the configured playback rate and save the last one.
fn render_headless(
    config: &ViewerConfig,
    payload: cortexview::Payload,
    frames: usize,
    output: &Path,
) -> Result<()> {
    let (width, height) = (config.window.width, config.window.height);
    let gpu = GpuContext::new_headless(width, height)?;
    let backend = GpuBackend::new(gpu, &payload, &config.render);

    let start = Instant::now();
    let mut viewport = ViewportContext::new_at(backend, payload, config, start)?;
    let mut render_loop = RenderLoop::new(config.render.failure_warn_every);
    let frame_time = Duration::from_secs_f64(1.0 / config.playback.fps);

    for i in 0..frames.max(1) {
        let now = start + frame_time * i as u32;
        if render_loop.step(&mut viewport, now) == LoopState::Stopped {
            bail!("render loop stopped after {} frames", i);
        }
    }

    let readback = viewport.backend().gpu().last_readback();
    let image = image::RgbaImage::from_raw(readback.width, readback.height, readback.rgba)
        .context("readback size does not match the target")?;
    image
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;
    log::info!(
        "Wrote {}x{} frame {} to {}",
        readback.width,
        readback.height,
        viewport.timeline().current_frame(),
        output.display()
    );
    Ok(())
}
