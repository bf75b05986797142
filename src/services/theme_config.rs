// Theme Config Normalizer
// Reads the stored theme JSON across its historical layouts
//
// Three layouts have been written over time and legacy records are never
// migrated, so every read has to accept all of them:
//   1. shade values:  {"primary": {"shades": {"600": {"$value": "#RRGGBB"}}}, "neutral": ...}
//   2. flat hues:     {"primary": {"hue": 210}, "neutral": {"hue": 210}}
//   3. state hues:    {"primaryHue": 210, "neutralHue": 210}, optionally nested under "_state"

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Hue used for any role whose hue cannot be read
pub const DEFAULT_HUE: f64 = 210.0;

const HEX_COLOR_PATTERN: &str = r"^#[0-9A-Fa-f]{6}$";
const STATE_KEY: &str = "_state";

static HEX_COLOR_REGEX: OnceLock<Regex> = OnceLock::new();

/// Why a theme config (or one of its fields) could not be read
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Malformed theme JSON: {0}")]
    MalformedJson(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Field {field} is not {expected}")]
    TypeMismatch { field: String, expected: &'static str },
}

/// A hue read from the config, remembering why it was defaulted (if it was)
#[derive(Debug, Clone, PartialEq)]
pub struct HueReading {
    pub degrees: f64,
    pub fallback: Option<ConfigError>,
}

impl HueReading {
    fn stored(degrees: f64) -> Self {
        Self { degrees, fallback: None }
    }

    fn defaulted(reason: ConfigError) -> Self {
        Self {
            degrees: DEFAULT_HUE,
            fallback: Some(reason),
        }
    }

    pub fn is_default(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Normalized palette information extracted from a theme config
#[derive(Debug, Clone, PartialEq)]
pub enum ThemePalette {
    /// Literal `#RRGGBB` colors (uppercased) for primary-600 and neutral-600
    Colors { primary: String, neutral: String },
    /// Hues in degrees; the 600 shades still need deriving
    Hues { primary: HueReading, neutral: HueReading },
}

type Probe = fn(&Map<String, Value>) -> Result<ThemePalette, ConfigError>;

/// Tried in order, first success wins
const PROBES: [(&str, Probe); 3] = [
    ("shade-value", probe_shade_values),
    ("flat-hue", probe_flat_hues),
    ("state-hue", probe_state_hues),
];

/// Extract a palette from raw theme JSON
pub fn normalize(raw: &str) -> Result<ThemePalette, ConfigError> {
    let document: Value =
        serde_json::from_str(raw).map_err(|e| ConfigError::MalformedJson(e.to_string()))?;

    let root = document.as_object().ok_or_else(|| ConfigError::TypeMismatch {
        field: "$".to_string(),
        expected: "an object",
    })?;

    let mut last_error = ConfigError::MissingField("$".to_string());
    for (label, probe) in PROBES {
        match probe(root) {
            Ok(palette) => {
                log::trace!("Theme config matched {label} layout");
                return Ok(palette);
            }
            Err(e) => {
                log::trace!("Theme config is not {label} layout: {e}");
                last_error = e;
            }
        }
    }

    Err(last_error)
}

fn probe_shade_values(root: &Map<String, Value>) -> Result<ThemePalette, ConfigError> {
    let primary = hex_at(root, &["primary", "shades", "600", "$value"])?;
    let neutral = hex_at(root, &["neutral", "shades", "600", "$value"])?;
    Ok(ThemePalette::Colors { primary, neutral })
}

fn probe_flat_hues(root: &Map<String, Value>) -> Result<ThemePalette, ConfigError> {
    let primary = number_at(root, &["primary", "hue"])?;
    let neutral = number_at(root, &["neutral", "hue"])?;
    Ok(ThemePalette::Hues {
        primary: HueReading::stored(primary),
        neutral: HueReading::stored(neutral),
    })
}

fn probe_state_hues(root: &Map<String, Value>) -> Result<ThemePalette, ConfigError> {
    let state = match root.get(STATE_KEY) {
        Some(Value::Object(nested)) => nested,
        _ => root,
    };

    let read = |key: &str| match number_at(state, &[key]) {
        Ok(degrees) => HueReading::stored(degrees),
        Err(reason) => HueReading::defaulted(reason),
    };

    Ok(ThemePalette::Hues {
        primary: read("primaryHue"),
        neutral: read("neutralHue"),
    })
}

fn lookup<'a>(root: &'a Map<String, Value>, path: &[&str]) -> Result<&'a Value, ConfigError> {
    let mut current = root;
    for (depth, key) in path.iter().enumerate() {
        let value = current
            .get(*key)
            .ok_or_else(|| ConfigError::MissingField(path[..=depth].join(".")))?;

        if depth + 1 == path.len() {
            return Ok(value);
        }

        current = value.as_object().ok_or_else(|| ConfigError::TypeMismatch {
            field: path[..=depth].join("."),
            expected: "an object",
        })?;
    }

    Err(ConfigError::MissingField(path.join(".")))
}

fn number_at(root: &Map<String, Value>, path: &[&str]) -> Result<f64, ConfigError> {
    lookup(root, path)?
        .as_f64()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ConfigError::TypeMismatch {
            field: path.join("."),
            expected: "a number",
        })
}

fn hex_at(root: &Map<String, Value>, path: &[&str]) -> Result<String, ConfigError> {
    let mismatch = || ConfigError::TypeMismatch {
        field: path.join("."),
        expected: "a #RRGGBB color",
    };

    let raw = lookup(root, path)?.as_str().ok_or_else(mismatch)?;
    let trimmed = raw.trim();
    let hex_regex = HEX_COLOR_REGEX.get_or_init(|| Regex::new(HEX_COLOR_PATTERN).unwrap());
    if !hex_regex.is_match(trimmed) {
        return Err(mismatch());
    }

    Ok(trimmed.to_ascii_uppercase())
}
