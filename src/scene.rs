use kurbo::Point;

use crate::blur_cpu::blur_surface;
use crate::core::{BACKGROUND_RGB, CANVAS, CENTER, FrameRGBA, SCALE, premul_from_straight};
use crate::draw_cpu::Surface;
use crate::error::OrreryResult;
use crate::model::{Owner, PersonVisual, SystemState};
use crate::starfield::generate_stars;
use crate::text::{FontWeight, draw_text, measure};

const TITLE: &str = "My Solar System";
const GOLD: [u8; 3] = [255, 215, 0];
const GRADIENT_CENTER: [u8; 3] = [15, 27, 61]; // #0F1B3D
const WHITE: [u8; 3] = [255, 255, 255];
const RING_RADII: [f64; 5] = [100.0, 200.0, 300.0, 400.0, 450.0];
const PLANET_RADIUS: f64 = 20.0;
const OWNER_RADIUS: f64 = 40.0;

/// Video-only additions to a frame.
#[derive(Clone, Debug, Default)]
pub struct FrameOverlay {
    /// Short "what changed" line above the stats bar.
    pub caption: Option<String>,
    /// Timeline progress in [0, 1]; drawn as a thin bar on the bottom edge.
    pub progress: Option<f64>,
}

/// Render one still image of a state (no caption, no progress bar).
pub fn render_still(state: &SystemState) -> OrreryResult<FrameRGBA> {
    render_frame(state, &FrameOverlay::default())
}

/// Turn one `SystemState` into one frame raster.
///
/// Layers composite bottom-up: background, radial gradient, star field,
/// orbital rings, connection lines, blurred entity glow, entity bodies and
/// labels, center owner marker, stats bar, title, then the optional video
/// overlay. The state is validated on entry; out-of-range positions or
/// colors fail here rather than producing a corrupt frame.
#[tracing::instrument(skip(state, overlay), fields(people = state.people.len()))]
pub fn render_frame(state: &SystemState, overlay: &FrameOverlay) -> OrreryResult<FrameRGBA> {
    state.validate()?;

    let mut img = Surface::filled(CANVAS, CANVAS, BACKGROUND_RGB);

    draw_radial_gradient(&mut img)?;
    draw_star_field(&mut img, &state.owner.id);
    draw_orbital_rings(&mut img);
    draw_connections(&mut img, &state.people);
    draw_people_glow(&mut img, &state.people)?;
    draw_people_solid(&mut img, &state.people);
    draw_center_owner(&mut img, &state.owner)?;
    draw_stats_bar(&mut img, state);
    draw_title(&mut img);

    if let Some(caption) = overlay.caption.as_deref() {
        draw_caption(&mut img, caption);
    }
    if let Some(progress) = overlay.progress {
        draw_progress_bar(&mut img, progress);
    }

    Ok(FrameRGBA {
        width: img.width,
        height: img.height,
        data: img.data,
    })
}

/// Map a normalized position to canvas pixel space.
fn to_canvas(x: f64, y: f64) -> Point {
    Point::new(CENTER.0 + x * SCALE, CENTER.1 + y * SCALE)
}

/// Soft glow from a deep-blue center fading to darkness by radius 500,
/// quantized into 10px bands.
fn draw_radial_gradient(img: &mut Surface) -> OrreryResult<()> {
    let mut layer = Surface::new(CANVAS, CANVAS);
    let max_radius = 500.0;

    for y in 0..CANVAS {
        let dy = f64::from(y) - CENTER.1;
        for x in 0..CANVAS {
            let dx = f64::from(x) - CENTER.0;
            let d = (dx * dx + dy * dy).sqrt();
            if d > max_radius {
                continue;
            }
            let band = ((d / 10.0).ceil() * 10.0).max(10.0);
            let alpha = (40.0 * (1.0 - band / max_radius)) as u8;
            if alpha == 0 {
                continue;
            }
            let idx = ((y as usize) * (CANVAS as usize) + (x as usize)) * 4;
            layer.data[idx..idx + 4].copy_from_slice(&premul_from_straight(
                GRADIENT_CENTER[0],
                GRADIENT_CENTER[1],
                GRADIENT_CENTER[2],
                alpha,
            ));
        }
    }

    img.composite_over(&layer)
}

fn draw_star_field(img: &mut Surface, seed: &str) {
    for star in generate_stars(seed) {
        img.fill_circle(
            Point::new(f64::from(star.x), f64::from(star.y)),
            f64::from(star.radius),
            [star.brightness; 3],
            star.alpha,
        );
    }
}

fn draw_orbital_rings(img: &mut Surface) {
    for radius in RING_RADII {
        img.stroke_circle(Point::new(CENTER.0, CENTER.1), radius, WHITE, 18);
    }
}

/// One line per entity from center to its position, tinted by the entity
/// color at ~15% opacity.
fn draw_connections(img: &mut Surface, people: &[PersonVisual]) {
    let center = Point::new(CENTER.0, CENTER.1);
    for p in people {
        img.line(center, to_canvas(p.x, p.y), p.draw_color(), 38);
    }
}

/// Aggregate glow layer: three concentric discs per entity, opacity scaled
/// by the entity's fade alpha, blurred once as a whole and composited.
fn draw_people_glow(img: &mut Surface, people: &[PersonVisual]) -> OrreryResult<()> {
    if people.is_empty() {
        return Ok(());
    }
    let mut layer = Surface::new(CANVAS, CANVAS);
    for p in people {
        let pos = to_canvas(p.x, p.y);
        let color = p.draw_color();
        for (glow_r, base_alpha) in [(26.0, 30.0), (24.0, 50.0), (22.0, 80.0)] {
            layer.fill_circle(pos, glow_r, color, (base_alpha * p.alpha) as u8);
        }
    }
    blur_surface(&mut layer, 8, 4.0)?;
    img.composite_over(&layer)
}

fn draw_people_solid(img: &mut Surface, people: &[PersonVisual]) {
    for p in people {
        let pos = to_canvas(p.x, p.y);
        img.fill_circle(pos, PLANET_RADIUS, p.draw_color(), (255.0 * p.alpha) as u8);

        let width = measure(&p.name, FontWeight::Regular, 12.0);
        draw_text(
            img,
            &p.name,
            pos.x - width / 2.0,
            pos.y + 25.0,
            FontWeight::Regular,
            12.0,
            WHITE,
            (230.0 * p.alpha) as u8,
        );
    }
}

/// Gold center marker with its own blurred bloom, "YOU" above, name below.
fn draw_center_owner(img: &mut Surface, owner: &Owner) -> OrreryResult<()> {
    let center = Point::new(CENTER.0, CENTER.1);

    let mut bloom = Surface::new(CANVAS, CANVAS);
    for (glow_r, alpha) in [(52.0, 15u8), (48.0, 25), (44.0, 40)] {
        bloom.fill_circle(center, glow_r, GOLD, alpha);
    }
    blur_surface(&mut bloom, 12, 6.0)?;
    img.composite_over(&bloom)?;

    img.fill_circle(center, OWNER_RADIUS, GOLD, 255);

    let you_width = measure("YOU", FontWeight::Regular, 10.0);
    draw_text(
        img,
        "YOU",
        CENTER.0 - you_width / 2.0,
        CENTER.1 - 58.0,
        FontWeight::Regular,
        10.0,
        WHITE,
        153,
    );

    let name_width = measure(&owner.name, FontWeight::Bold, 16.0);
    draw_text(
        img,
        &owner.name,
        CENTER.0 - name_width / 2.0,
        CENTER.1 + 48.0,
        FontWeight::Bold,
        16.0,
        WHITE,
        255,
    );

    Ok(())
}

/// Translucent strip along the bottom: entity count and tag breakdown on the
/// left, snapshot month/year on the right.
fn draw_stats_bar(img: &mut Surface, state: &SystemState) {
    let h = i64::from(CANVAS);
    img.fill_rect(0, h - 80, i64::from(CANVAS), h, [0, 0, 0], 153);

    let count_line = format!("{} people in my orbit", state.active_count);
    draw_text(img, &count_line, 30.0, 1010.0, FontWeight::Bold, 18.0, WHITE, 255);

    let breakdown = state
        .tag_tally
        .iter()
        .map(|(name, count)| format!("{count} {name}"))
        .collect::<Vec<_>>()
        .join(" \u{00B7} ");
    draw_text(img, &breakdown, 30.0, 1038.0, FontWeight::Regular, 13.0, WHITE, 179);

    let date = state.timestamp.format("%b %Y").to_string();
    let date_width = measure(&date, FontWeight::Regular, 13.0);
    draw_text(
        img,
        &date,
        1050.0 - date_width,
        1025.0,
        FontWeight::Regular,
        13.0,
        WHITE,
        128,
    );
}

fn draw_title(img: &mut Surface) {
    let width = measure(TITLE, FontWeight::Bold, 20.0);
    draw_text(
        img,
        TITLE,
        CENTER.0 - width / 2.0,
        25.0,
        FontWeight::Bold,
        20.0,
        WHITE,
        204,
    );
    img.line(Point::new(510.0, 55.0), Point::new(570.0, 55.0), WHITE, 51);
}

fn draw_caption(img: &mut Surface, caption: &str) {
    let width = measure(caption, FontWeight::Bold, 16.0);
    draw_text(
        img,
        caption,
        CENTER.0 - width / 2.0,
        960.0,
        FontWeight::Bold,
        16.0,
        WHITE,
        200,
    );
}

fn draw_progress_bar(img: &mut Surface, progress: f64) {
    let progress = progress.clamp(0.0, 1.0);
    let bar_width = (f64::from(CANVAS) * progress).round() as i64;
    let h = i64::from(CANVAS);
    img.fill_rect(0, h - 4, bar_width, h, WHITE, 100);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Owner, PersonVisual};
    use std::collections::BTreeMap;

    fn owner() -> Owner {
        Owner {
            id: "user-1".to_string(),
            name: "Riya".to_string(),
            avatar_ref: None,
        }
    }

    fn empty_state() -> SystemState {
        SystemState {
            owner: owner(),
            people: Vec::new(),
            tag_tally: BTreeMap::new(),
            active_count: 0,
            timestamp: "2024-06-15T12:00:00Z".parse().unwrap(),
        }
    }

    fn pixel(frame: &FrameRGBA, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y as usize) * (frame.width as usize) + (x as usize)) * 4;
        [
            frame.data[idx],
            frame.data[idx + 1],
            frame.data[idx + 2],
            frame.data[idx + 3],
        ]
    }

    #[test]
    fn zero_entity_state_still_renders_owner_marker() {
        let frame = render_still(&empty_state()).unwrap();
        assert_eq!(frame.width, CANVAS);
        assert_eq!(frame.height, CANVAS);
        // Center of the canvas is the solid gold owner disc.
        assert_eq!(pixel(&frame, 540, 540), [255, 215, 0, 255]);
    }

    #[test]
    fn malformed_state_fails_loudly() {
        let mut state = empty_state();
        state.people.push(PersonVisual {
            id: "p".to_string(),
            name: "p".to_string(),
            x: 2.0,
            y: 0.0,
            tag: None,
            avatar_ref: None,
            orbit_speed: 1.0,
            size_multiplier: 1.0,
            color_override: None,
            note: None,
            closeness_score: None,
            alpha: 1.0,
        });
        state.tag_tally.insert("Untagged".to_string(), 1);
        state.active_count = 1;
        assert!(render_still(&state).is_err());
    }

    #[test]
    fn progress_bar_fills_bottom_edge() {
        let overlay = FrameOverlay {
            caption: None,
            progress: Some(1.0),
        };
        let frame = render_frame(&empty_state(), &overlay).unwrap();
        let without = render_still(&empty_state()).unwrap();
        // The bottom rows differ once the bar is drawn full-width.
        assert_ne!(pixel(&frame, 5, 1078), pixel(&without, 5, 1078));
    }

    #[test]
    fn entity_body_is_drawn_at_mapped_position() {
        let mut state = empty_state();
        state.people.push(PersonVisual {
            id: "p".to_string(),
            name: "P".to_string(),
            x: 0.5,
            y: 0.0,
            tag: None,
            avatar_ref: None,
            orbit_speed: 1.0,
            size_multiplier: 1.0,
            color_override: Some("#FF0000".parse().unwrap()),
            note: None,
            closeness_score: None,
            alpha: 1.0,
        });
        state.tag_tally.insert("Untagged".to_string(), 1);
        state.active_count = 1;

        let frame = render_still(&state).unwrap();
        // (0.5, 0) maps to (540 + 225, 540); the body disc is solid red there.
        let px = pixel(&frame, 765, 540);
        assert_eq!(px[3], 255);
        assert!(px[0] > 200 && px[1] < 80 && px[2] < 80);
    }
}
