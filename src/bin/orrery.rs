use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use orrery::{RenderThreading, Snapshot, SystemState, VideoOpts};

#[derive(Parser, Debug)]
#[command(name = "orrery", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a state JSON to a PNG still.
    Image(ImageArgs),
    /// Render a snapshot-sequence JSON to an MP4 (requires `ffmpeg` on PATH).
    Video(VideoArgs),
}

#[derive(Parser, Debug)]
struct ImageArgs {
    /// Input system state JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct VideoArgs {
    /// Input JSON: ordered array of `{ "state": ..., "caption": ... }`.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Frames per second.
    #[arg(long, default_value_t = orrery::pipeline::DEFAULT_FPS)]
    fps: u32,

    /// Seconds each snapshot is held on screen.
    #[arg(long, default_value_t = orrery::pipeline::DEFAULT_HOLD_SECONDS)]
    hold_seconds: f64,

    /// Interpolated frames between consecutive snapshots.
    #[arg(long, default_value_t = orrery::pipeline::DEFAULT_TRANSITION_FRAMES)]
    transition_frames: u64,

    /// Enable frame-level parallelism.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// Encoder binary to invoke.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg_bin: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Image(args) => cmd_image(args),
        Command::Video(args) => cmd_video(args),
    }
}

fn cmd_image(args: ImageArgs) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("read state file '{}'", args.in_path.display()))?;
    let state: SystemState = serde_json::from_str(&json)
        .with_context(|| format!("parse state file '{}'", args.in_path.display()))?;

    let out = orrery::render_image(&state, &args.out)?;
    println!("{}", out.display());
    Ok(())
}

fn cmd_video(args: VideoArgs) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("read snapshot file '{}'", args.in_path.display()))?;
    let snapshots: Vec<Snapshot> = serde_json::from_str(&json)
        .with_context(|| format!("parse snapshot file '{}'", args.in_path.display()))?;

    let opts = VideoOpts {
        fps: args.fps,
        hold_seconds: args.hold_seconds,
        transition_frames: args.transition_frames,
        overwrite: true,
        threading: RenderThreading {
            parallel: args.parallel,
            threads: args.threads,
        },
        ffmpeg_bin: args.ffmpeg_bin,
    };

    let out = orrery::render_video(&snapshots, &args.out, &opts)?;
    println!("{}", out.display());
    Ok(())
}
