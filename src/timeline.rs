use crate::error::{OrreryError, OrreryResult};
use crate::model::SystemState;

/// One historical state plus the human-readable caption describing the change
/// that produced it ("Added Riya as Friend", ...).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub state: SystemState,
    #[serde(default)]
    pub caption: Option<String>,
}

/// Derived frame counts for a timeline video. Never stored — recomputed from
/// the snapshot sequence and the caller's parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct VideoPlan {
    pub total_frames: u64,
    pub fps: u32,
    pub hold_frames: u64,
    pub transition_frames: u64,
}

/// `hold_frames = round(hold_seconds * fps)`;
/// `total = N * hold_frames + (N - 1) * transition_frames`.
pub fn plan_video(
    snapshot_count: usize,
    fps: u32,
    hold_seconds: f64,
    transition_frames: u64,
) -> OrreryResult<VideoPlan> {
    if snapshot_count < 2 {
        return Err(OrreryError::insufficient_history(format!(
            "need at least 2 snapshots to generate a video, got {snapshot_count}"
        )));
    }
    if fps == 0 {
        return Err(OrreryError::validation("fps must be non-zero"));
    }
    if !hold_seconds.is_finite() || hold_seconds <= 0.0 {
        return Err(OrreryError::validation("hold_seconds must be > 0"));
    }

    let n = snapshot_count as u64;
    let hold_frames = (hold_seconds * f64::from(fps)).round() as u64;
    if hold_frames == 0 {
        return Err(OrreryError::validation(
            "hold_seconds * fps rounds to zero frames",
        ));
    }

    Ok(VideoPlan {
        total_frames: n * hold_frames + (n - 1) * transition_frames,
        fps,
        hold_frames,
        transition_frames,
    })
}

/// What one video frame shows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameInstruction {
    /// Repeat snapshot `snapshot` unchanged. `captioned` is set for every
    /// hold frame of snapshots after the first, signaling "what changed".
    Hold { snapshot: usize, captioned: bool },
    /// Interpolate between snapshot `from` and `from + 1` at time `t`.
    Transition { from: usize, t: f64 },
}

/// Expand a plan into one instruction per frame, in render order.
pub fn sequence_frames(snapshot_count: usize, plan: &VideoPlan) -> Vec<FrameInstruction> {
    let mut frames = Vec::with_capacity(plan.total_frames as usize);
    for snapshot in 0..snapshot_count {
        for _ in 0..plan.hold_frames {
            frames.push(FrameInstruction::Hold {
                snapshot,
                captioned: snapshot > 0,
            });
        }
        if snapshot + 1 < snapshot_count {
            for step in 0..plan.transition_frames {
                frames.push(FrameInstruction::Transition {
                    from: snapshot,
                    t: step as f64 / plan.transition_frames as f64,
                });
            }
        }
    }
    frames
}

/// Resolve one instruction against the snapshot sequence: the state to render
/// (held, or freshly interpolated) and the caption to overlay, if any.
pub fn resolve_frame(
    snapshots: &[Snapshot],
    instruction: &FrameInstruction,
) -> (SystemState, Option<String>) {
    match *instruction {
        FrameInstruction::Hold {
            snapshot,
            captioned,
        } => {
            let snap = &snapshots[snapshot];
            let caption = if captioned { snap.caption.clone() } else { None };
            (snap.state.clone(), caption)
        }
        FrameInstruction::Transition { from, t } => (
            crate::interp::interpolate(&snapshots[from].state, &snapshots[from + 1].state, t),
            None,
        ),
    }
}
