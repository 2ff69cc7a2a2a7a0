//! Orrery renders a social-graph "solar system" — a central owner orbited by
//! tagged people at normalized positions — into still images and timeline
//! videos.
//!
//! The pipeline is deterministic and CPU-only:
//!
//! - Build (or receive) a [`SystemState`]
//! - [`render_image`] composites one PNG still
//! - [`render_video`] sequences held + interpolated frames between ordered
//!   [`Snapshot`]s and hands the numbered frame sequence to `ffmpeg`
#![forbid(unsafe_code)]

pub mod blur_cpu;
pub mod core;
pub mod draw_cpu;
pub mod encode_ffmpeg;
pub mod error;
pub mod interp;
pub mod model;
pub mod pipeline;
pub mod scene;
pub mod starfield;
pub mod text;
pub mod timeline;

pub use crate::core::{BACKGROUND_RGB, CANVAS, CENTER, FrameRGBA, SCALE};
pub use crate::error::{OrreryError, OrreryResult};
pub use crate::interp::{ease_in_out, interpolate, lerp};
pub use crate::model::{HexColor, Owner, PersonVisual, SystemState, TagBadge};
pub use crate::pipeline::{RenderThreading, VideoOpts, render_image, render_video};
pub use crate::scene::{FrameOverlay, render_frame, render_still};
pub use crate::starfield::{Star, generate_stars};
pub use crate::timeline::{
    FrameInstruction, Snapshot, VideoPlan, plan_video, resolve_frame, sequence_frames,
};
