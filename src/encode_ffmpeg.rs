use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{OrreryError, OrreryResult};

/// Frame file pattern handed to the encoder as an image-sequence input.
pub const FRAME_FILE_PATTERN: &str = "frame_%06d.png";

/// Fixed-width, strictly increasing frame file name for `index`.
pub fn frame_file_name(index: u64) -> String {
    format!("frame_{index:06}.png")
}

/// Configuration for the external encoder invocation.
#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub fps: u32,
    pub out_path: PathBuf,
    pub overwrite: bool,
    /// Encoder binary to invoke; the system `ffmpeg` by default. Overridable
    /// so callers (and tests) can point at a specific build.
    pub ffmpeg_bin: PathBuf,
}

impl EncodeConfig {
    pub fn new(out_path: impl Into<PathBuf>, fps: u32) -> Self {
        Self {
            fps,
            out_path: out_path.into(),
            overwrite: true,
            ffmpeg_bin: PathBuf::from("ffmpeg"),
        }
    }

    pub fn validate(&self) -> OrreryResult<()> {
        if self.fps == 0 {
            return Err(OrreryError::validation("encode fps must be non-zero"));
        }
        if self.out_path.as_os_str().is_empty() {
            return Err(OrreryError::validation("encode out_path must be non-empty"));
        }
        Ok(())
    }
}

/// Check that the encoder binary exists and answers a version probe.
///
/// A missing or broken encoder is reported as [`OrreryError::EncoderUnavailable`],
/// distinct from a failed encode, so callers can show an actionable message.
pub fn probe_encoder(bin: &Path) -> OrreryResult<()> {
    let status = Command::new(bin)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(s) if s.success() => Ok(()),
        Ok(s) => Err(OrreryError::encoder_unavailable(format!(
            "'{}' failed its version probe with {s}",
            bin.display()
        ))),
        Err(e) => Err(OrreryError::encoder_unavailable(format!(
            "'{}' could not be invoked (is ffmpeg installed and on PATH?): {e}",
            bin.display()
        ))),
    }
}

/// Encode the `frame_%06d.png` sequence under `frames_dir` into an H.264 MP4
/// at `cfg.out_path`.
///
/// Single blocking subprocess call; stderr is captured and surfaced in
/// [`OrreryError::EncodingFailed`] when the encoder exits non-zero.
#[tracing::instrument(skip(cfg), fields(out = %cfg.out_path.display()))]
pub fn encode_frame_sequence(cfg: &EncodeConfig, frames_dir: &Path) -> OrreryResult<()> {
    cfg.validate()?;
    ensure_parent_dir(&cfg.out_path)?;
    if !cfg.overwrite && cfg.out_path.exists() {
        return Err(OrreryError::validation(format!(
            "output file '{}' already exists",
            cfg.out_path.display()
        )));
    }

    probe_encoder(&cfg.ffmpeg_bin)?;

    let mut cmd = Command::new(&cfg.ffmpeg_bin);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    cmd.arg(if cfg.overwrite { "-y" } else { "-n" });
    cmd.args(["-loglevel", "error", "-framerate", &cfg.fps.to_string(), "-i"])
        .arg(frames_dir.join(FRAME_FILE_PATTERN));
    // h264 + yuv420p for broad compatibility; fast preset favors encode
    // speed over exhaustive compression.
    cmd.args([
        "-c:v",
        "libx264",
        "-pix_fmt",
        "yuv420p",
        "-preset",
        "fast",
        "-crf",
        "23",
        "-movflags",
        "+faststart",
    ])
    .arg(&cfg.out_path);

    let output = cmd.output().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            OrreryError::encoder_unavailable(format!(
                "'{}' disappeared between probe and invocation: {e}",
                cfg.ffmpeg_bin.display()
            ))
        } else {
            OrreryError::Other(anyhow::Error::new(e).context("failed to run encoder"))
        }
    })?;

    if !output.status.success() {
        return Err(OrreryError::EncodingFailed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    tracing::info!(out = %cfg.out_path.display(), "encoded frame sequence");
    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> OrreryResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}
