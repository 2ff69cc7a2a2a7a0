use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::{OrreryError, OrreryResult};

/// 6-hex-digit RGB color. Parses with or without a leading `#`; the canonical
/// serialized form is uppercase `#RRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HexColor([u8; 3]);

impl HexColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn rgb(self) -> [u8; 3] {
        self.0
    }
}

impl FromStr for HexColor {
    type Err = OrreryError;

    fn from_str(s: &str) -> OrreryResult<Self> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(OrreryError::state(format!(
                "color '{s}' is not a 6-hex-digit RGB string"
            )));
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16);
        Ok(Self([
            channel(0).map_err(|e| OrreryError::state(format!("color '{s}': {e}")))?,
            channel(2).map_err(|e| OrreryError::state(format!("color '{s}': {e}")))?,
            channel(4).map_err(|e| OrreryError::state(format!("color '{s}': {e}")))?,
        ]))
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

impl serde::Serialize for HexColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for HexColor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The user at the center of the system.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Owner {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar_ref: Option<String>,
}

/// Tag metadata merged onto an entity by the collaborator.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TagBadge {
    pub name: String,
    pub color: HexColor,
    #[serde(default)]
    pub icon: Option<String>,
}

/// One orbiting entity's renderable attributes.
///
/// `alpha` is an interpolation-only opacity scalar (fade in/out during
/// transitions), distinct from per-pixel image alpha. Snapshots arrive with
/// the default 1.0.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PersonVisual {
    pub id: String,
    pub name: String,
    /// Normalized position, each component in [-1.0, 1.0]; center is (0, 0).
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub tag: Option<TagBadge>,
    #[serde(default)]
    pub avatar_ref: Option<String>,
    #[serde(default = "unit")]
    pub orbit_speed: f64,
    #[serde(default = "unit")]
    pub size_multiplier: f64,
    /// Overrides the tag color for lines/glow/body when present.
    #[serde(default)]
    pub color_override: Option<HexColor>,
    #[serde(default)]
    pub note: Option<String>,
    /// Closeness score, 0-100.
    #[serde(default)]
    pub closeness_score: Option<u8>,
    #[serde(default = "unit")]
    pub alpha: f64,
}

fn unit() -> f64 {
    1.0
}

impl PersonVisual {
    /// Color the compositor draws this entity with: explicit override, then
    /// tag color, then white.
    pub fn draw_color(&self) -> [u8; 3] {
        self.color_override
            .or_else(|| self.tag.as_ref().map(|t| t.color))
            .map(HexColor::rgb)
            .unwrap_or([255, 255, 255])
    }
}

/// One point-in-time renderable snapshot of the social graph.
///
/// Immutable once constructed; the interpolator only produces new values.
/// `tag_tally` and `active_count` arrive precomputed from the collaborator's
/// aggregation and are validated for consistency, never recomputed here.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SystemState {
    pub owner: Owner,
    pub people: Vec<PersonVisual>,
    pub tag_tally: BTreeMap<String, u32>,
    pub active_count: u32,
    pub timestamp: DateTime<Utc>,
}

impl SystemState {
    /// Reject states that must not reach the renderer. Interpolated states
    /// pass too: the entity list may be a union wider than `active_count`,
    /// so entity count is deliberately not checked against it.
    pub fn validate(&self) -> OrreryResult<()> {
        let mut seen = BTreeSet::new();
        for p in &self.people {
            if !seen.insert(p.id.as_str()) {
                return Err(OrreryError::state(format!(
                    "duplicate entity id '{}'",
                    p.id
                )));
            }
            if !(p.x >= -1.0 && p.x <= 1.0 && p.y >= -1.0 && p.y <= 1.0) {
                return Err(OrreryError::state(format!(
                    "entity '{}' position ({}, {}) outside [-1, 1]",
                    p.id, p.x, p.y
                )));
            }
            if !(p.alpha >= 0.0 && p.alpha <= 1.0) {
                return Err(OrreryError::state(format!(
                    "entity '{}' alpha {} outside [0, 1]",
                    p.id, p.alpha
                )));
            }
            if let Some(score) = p.closeness_score
                && score > 100
            {
                return Err(OrreryError::state(format!(
                    "entity '{}' closeness score {score} outside 0-100",
                    p.id
                )));
            }
        }

        let tally_sum: u64 = self.tag_tally.values().map(|&v| u64::from(v)).sum();
        if tally_sum != u64::from(self.active_count) {
            return Err(OrreryError::state(format!(
                "tag tally sums to {tally_sum} but active_count is {}",
                self.active_count
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn basic_state() -> SystemState {
        let mut tag_tally = BTreeMap::new();
        tag_tally.insert("Friend".to_string(), 1);
        tag_tally.insert("Untagged".to_string(), 1);
        SystemState {
            owner: Owner {
                id: "u0".to_string(),
                name: "Riya".to_string(),
                avatar_ref: None,
            },
            people: vec![
                PersonVisual {
                    tag: Some(TagBadge {
                        name: "Friend".to_string(),
                        color: "#4A90D9".parse().unwrap(),
                        icon: None,
                    }),
                    ..person("p0", 0.5, 0.0)
                },
                person("p1", -0.25, 0.75),
            ],
            tag_tally,
            active_count: 2,
            timestamp: "2024-06-15T12:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn hex_color_roundtrips_uppercase() {
        let c: HexColor = "#FF5733".parse().unwrap();
        assert_eq!(c.rgb(), [0xFF, 0x57, 0x33]);
        assert_eq!(c.to_string(), "#FF5733");

        let lower: HexColor = "4a90d9".parse().unwrap();
        assert_eq!(lower.to_string(), "#4A90D9");
    }

    #[test]
    fn hex_color_rejects_malformed_strings() {
        assert!("#FFF".parse::<HexColor>().is_err());
        assert!("#GGGGGG".parse::<HexColor>().is_err());
        assert!("FF57331".parse::<HexColor>().is_err());
        assert!("".parse::<HexColor>().is_err());
    }

    #[test]
    fn json_roundtrip() {
        let state = basic_state();
        let s = serde_json::to_string_pretty(&state).unwrap();
        let de: SystemState = serde_json::from_str(&s).unwrap();
        assert_eq!(de.people.len(), 2);
        assert_eq!(
            de.people[0].tag.as_ref().unwrap().color.to_string(),
            "#4A90D9"
        );
        assert_eq!(de.active_count, 2);
    }

    #[test]
    fn deserialize_applies_defaults() {
        let json = r#"{
            "id": "p9", "name": "Aman", "x": 0.1, "y": -0.2
        }"#;
        let p: PersonVisual = serde_json::from_str(json).unwrap();
        assert_eq!(p.alpha, 1.0);
        assert_eq!(p.orbit_speed, 1.0);
        assert_eq!(p.size_multiplier, 1.0);
        assert!(p.tag.is_none());
        assert!(p.closeness_score.is_none());
    }

    #[test]
    fn validate_accepts_basic_state() {
        assert!(basic_state().validate().is_ok());
    }

    #[test]
    fn validate_rejects_position_out_of_range() {
        let mut state = basic_state();
        state.people[0].x = 1.5;
        assert!(matches!(state.validate(), Err(OrreryError::State(_))));

        let mut state = basic_state();
        state.people[1].y = f64::NAN;
        assert!(state.validate().is_err());
    }

    #[test]
    fn validate_rejects_alpha_out_of_range() {
        let mut state = basic_state();
        state.people[0].alpha = 1.01;
        assert!(matches!(state.validate(), Err(OrreryError::State(_))));
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let mut state = basic_state();
        state.people[1].id = state.people[0].id.clone();
        assert!(state.validate().is_err());
    }

    #[test]
    fn validate_rejects_tally_mismatch() {
        let mut state = basic_state();
        state.active_count = 5;
        assert!(state.validate().is_err());
    }

    #[test]
    fn draw_color_prefers_override_then_tag() {
        let mut p = person("p0", 0.0, 0.0);
        assert_eq!(p.draw_color(), [255, 255, 255]);

        p.tag = Some(TagBadge {
            name: "Family".to_string(),
            color: HexColor::new(0x22, 0x44, 0x66),
            icon: None,
        });
        assert_eq!(p.draw_color(), [0x22, 0x44, 0x66]);

        p.color_override = Some(HexColor::new(0xFF, 0x00, 0x00));
        assert_eq!(p.draw_color(), [0xFF, 0x00, 0x00]);
    }
}
