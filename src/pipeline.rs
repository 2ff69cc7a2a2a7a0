use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::core::{BACKGROUND_RGB, FrameRGBA};
use crate::encode_ffmpeg::{EncodeConfig, encode_frame_sequence, ensure_parent_dir, frame_file_name};
use crate::error::{OrreryError, OrreryResult};
use crate::model::SystemState;
use crate::scene::{FrameOverlay, render_frame, render_still};
use crate::timeline::{FrameInstruction, Snapshot, plan_video, resolve_frame, sequence_frames};

/// Default video parameters: 2s holds and half-second transitions at 30fps.
pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_HOLD_SECONDS: f64 = 2.0;
pub const DEFAULT_TRANSITION_FRAMES: u64 = 15;

/// Frame-level threading for video rendering. Each frame is a pure function
/// of its own (possibly interpolated) state, so frames parallelize freely.
#[derive(Clone, Debug, Default)]
pub struct RenderThreading {
    pub parallel: bool,
    /// Worker thread override; `None` uses rayon defaults.
    pub threads: Option<usize>,
}

/// Options for [`render_video`].
#[derive(Clone, Debug)]
pub struct VideoOpts {
    pub fps: u32,
    pub hold_seconds: f64,
    pub transition_frames: u64,
    pub overwrite: bool,
    pub threading: RenderThreading,
    /// Encoder binary; the system `ffmpeg` by default.
    pub ffmpeg_bin: PathBuf,
}

impl Default for VideoOpts {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            hold_seconds: DEFAULT_HOLD_SECONDS,
            transition_frames: DEFAULT_TRANSITION_FRAMES,
            overwrite: true,
            threading: RenderThreading::default(),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
        }
    }
}

/// Render one state to a PNG still and return its location.
#[tracing::instrument(skip_all, fields(people = state.people.len()))]
pub fn render_image(state: &SystemState, out_path: impl Into<PathBuf>) -> OrreryResult<PathBuf> {
    let out_path = out_path.into();
    let frame = render_still(state)?;
    ensure_parent_dir(&out_path)?;
    write_png(&frame, &out_path)?;
    tracing::info!(out = %out_path.display(), "rendered still image");
    Ok(out_path)
}

/// Render an ordered snapshot sequence to an MP4 and return its location.
///
/// Frames are written as a numbered PNG sequence in an ephemeral directory,
/// then handed to the external encoder. The directory is released on every
/// exit path — success, encoder failure, or render error.
#[tracing::instrument(skip_all, fields(snapshots = snapshots.len()))]
pub fn render_video(
    snapshots: &[Snapshot],
    out_path: impl Into<PathBuf>,
    opts: &VideoOpts,
) -> OrreryResult<PathBuf> {
    let out_path = out_path.into();
    let plan = plan_video(
        snapshots.len(),
        opts.fps,
        opts.hold_seconds,
        opts.transition_frames,
    )?;

    // Reject malformed history and a missing encoder before any frame lands
    // on disk.
    for snap in snapshots {
        snap.state.validate()?;
    }
    crate::encode_ffmpeg::probe_encoder(&opts.ffmpeg_bin)?;

    let frames_dir = std::env::temp_dir().join(format!(
        "orrery_frames_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ));
    std::fs::create_dir_all(&frames_dir).map_err(|e| {
        OrreryError::Other(anyhow::Error::new(e).context("failed to create frame directory"))
    })?;
    let _guard = TempDirGuard(Some(frames_dir.clone()));

    let instructions = sequence_frames(snapshots.len(), &plan);
    let total = plan.total_frames;

    if opts.threading.parallel {
        let pool = build_thread_pool(opts.threading.threads)?;
        pool.install(|| {
            instructions
                .par_iter()
                .enumerate()
                .try_for_each(|(index, instruction)| {
                    write_frame(snapshots, instruction, index as u64, total, &frames_dir)
                })
        })?;
    } else {
        for (index, instruction) in instructions.iter().enumerate() {
            write_frame(snapshots, instruction, index as u64, total, &frames_dir)?;
        }
    }
    tracing::info!(frames = total, dir = %frames_dir.display(), "rendered frame sequence");

    let cfg = EncodeConfig {
        fps: plan.fps,
        out_path: out_path.clone(),
        overwrite: opts.overwrite,
        ffmpeg_bin: opts.ffmpeg_bin.clone(),
    };
    encode_frame_sequence(&cfg, &frames_dir)?;

    Ok(out_path)
}

fn write_frame(
    snapshots: &[Snapshot],
    instruction: &FrameInstruction,
    index: u64,
    total_frames: u64,
    frames_dir: &Path,
) -> OrreryResult<()> {
    let (state, caption) = resolve_frame(snapshots, instruction);
    let overlay = FrameOverlay {
        caption,
        progress: Some(index as f64 / (total_frames.saturating_sub(1).max(1)) as f64),
    };
    let frame = render_frame(&state, &overlay)?;
    write_png(&frame, &frames_dir.join(frame_file_name(index)))
}

fn write_png(frame: &FrameRGBA, path: &Path) -> OrreryResult<()> {
    let rgb = frame.to_opaque_rgb(BACKGROUND_RGB);
    image::save_buffer_with_format(
        path,
        &rgb,
        frame.width,
        frame.height,
        image::ColorType::Rgb8,
        image::ImageFormat::Png,
    )
    .map_err(|e| {
        OrreryError::Other(
            anyhow::Error::new(e).context(format!("failed to write '{}'", path.display())),
        )
    })
}

fn build_thread_pool(threads: Option<usize>) -> OrreryResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(OrreryError::validation(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| OrreryError::validation(format!("failed to build rayon thread pool: {e}")))
}

struct TempDirGuard(Option<PathBuf>);

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_dir_all(path);
        }
    }
}
