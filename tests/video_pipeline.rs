use std::collections::BTreeMap;
use std::path::PathBuf;

use orrery::error::OrreryError;
use orrery::{Owner, PersonVisual, Snapshot, SystemState, VideoOpts};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("it").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn state(people: Vec<PersonVisual>) -> SystemState {
    let n = people.len() as u32;
    let mut tag_tally = BTreeMap::new();
    if n > 0 {
        tag_tally.insert("Untagged".to_string(), n);
    }
    SystemState {
        owner: Owner {
            id: "user-9".to_string(),
            name: "Riya".to_string(),
            avatar_ref: None,
        },
        people,
        tag_tally,
        active_count: n,
        timestamp: "2024-06-15T12:00:00Z".parse().unwrap(),
    }
}

fn person(id: &str, x: f64, y: f64) -> PersonVisual {
    PersonVisual {
        id: id.to_string(),
        name: id.to_string(),
        x,
        y,
        tag: None,
        avatar_ref: None,
        orbit_speed: 1.0,
        size_multiplier: 1.0,
        color_override: None,
        note: None,
        closeness_score: None,
        alpha: 1.0,
    }
}

fn two_snapshots() -> Vec<Snapshot> {
    vec![
        Snapshot {
            state: state(vec![person("p0", 0.5, 0.0)]),
            caption: Some("System created".to_string()),
        },
        Snapshot {
            state: state(vec![person("p0", -0.5, 0.25)]),
            caption: Some("Moved p0 closer".to_string()),
        },
    ]
}

/// Minimal parameters so failure-path tests only render a couple of frames.
fn tiny_opts() -> VideoOpts {
    VideoOpts {
        fps: 1,
        hold_seconds: 1.0,
        transition_frames: 0,
        ..VideoOpts::default()
    }
}

fn leftover_frame_dirs() -> Vec<PathBuf> {
    let prefix = format!("orrery_frames_{}_", std::process::id());
    std::fs::read_dir(std::env::temp_dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
        })
        .collect()
}

#[test]
fn one_snapshot_is_insufficient_history() {
    let out = scratch_dir("video_insufficient").join("out.mp4");
    let _ = std::fs::remove_file(&out);

    let err =
        orrery::render_video(&two_snapshots()[..1], &out, &VideoOpts::default()).unwrap_err();
    assert!(matches!(err, OrreryError::InsufficientHistory(_)));
    assert!(!out.exists());
}

#[test]
fn missing_encoder_is_unavailable_not_encoding_failed() {
    let out = scratch_dir("video_no_encoder").join("out.mp4");
    let _ = std::fs::remove_file(&out);

    let opts = VideoOpts {
        ffmpeg_bin: PathBuf::from("definitely-not-an-encoder-binary"),
        ..tiny_opts()
    };
    let err = orrery::render_video(&two_snapshots(), &out, &opts).unwrap_err();
    assert!(matches!(err, OrreryError::EncoderUnavailable(_)));
    assert!(!out.exists());
}

/// A fake encoder that answers the version probe but fails the encode run:
/// exercises the `EncodingFailed` path with captured diagnostics, and the
/// guarantee that ephemeral frame storage is released on failure.
#[cfg(unix)]
#[test]
fn failing_encoder_surfaces_diagnostics_and_cleans_up() {
    use std::os::unix::fs::PermissionsExt as _;

    let dir = scratch_dir("video_fake_encoder");
    let fake = dir.join("fake-ffmpeg.sh");
    std::fs::write(
        &fake,
        "#!/bin/sh\nif [ \"$1\" = \"-version\" ]; then exit 0; fi\necho 'boom: no codec' >&2\nexit 3\n",
    )
    .unwrap();
    std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

    let out = dir.join("out.mp4");
    let _ = std::fs::remove_file(&out);

    let opts = VideoOpts {
        ffmpeg_bin: fake,
        ..tiny_opts()
    };
    let err = orrery::render_video(&two_snapshots(), &out, &opts).unwrap_err();

    match err {
        OrreryError::EncodingFailed { status, stderr } => {
            assert!(!status.success());
            assert!(stderr.contains("boom"), "stderr was: {stderr}");
        }
        other => panic!("expected EncodingFailed, got: {other}"),
    }
    assert!(!out.exists());
    assert!(leftover_frame_dirs().is_empty());
}
