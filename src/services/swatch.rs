// Swatch Rendering
// Representative list-view colors for a theme

use serde::Serialize;

use super::color::ShadeRole;
use super::theme_config::{normalize, ThemePalette};

pub const DEFAULT_PRIMARY_COLOR: &str = "#4299F0";
pub const DEFAULT_NEUTRAL_COLOR: &str = "#666666";

/// The primary-600 and neutral-600 colors shown next to a theme
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Swatch {
    pub primary_color: String,
    pub neutral_color: String,
}

impl Default for Swatch {
    fn default() -> Self {
        Self {
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            neutral_color: DEFAULT_NEUTRAL_COLOR.to_string(),
        }
    }
}

impl Swatch {
    pub fn from_palette(palette: &ThemePalette) -> Self {
        match palette {
            ThemePalette::Colors { primary, neutral } => Self {
                primary_color: primary.clone(),
                neutral_color: neutral.clone(),
            },
            ThemePalette::Hues { primary, neutral } => Self {
                primary_color: ShadeRole::Primary600.derive(primary.degrees),
                neutral_color: ShadeRole::Neutral600.derive(neutral.degrees),
            },
        }
    }
}

/// Swatch for a stored theme config. Never fails: unreadable configs get the
/// default colors so one bad record cannot break a listing.
pub fn render_swatch(json_data: &str) -> Swatch {
    match normalize(json_data) {
        Ok(palette) => Swatch::from_palette(&palette),
        Err(e) => {
            log::debug!("Using default swatch: {e}");
            Swatch::default()
        }
    }
}
