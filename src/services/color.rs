// Color Derivation
// HSL to hex conversion for the design system's swatch shades

/// A shade of a palette role whose saturation/lightness is fixed by the
/// design system. Only the hue comes from the stored theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadeRole {
    /// `primary-600`: 78% saturation, 50% lightness
    Primary600,
    /// `neutral-600`: 7% saturation, 46% lightness
    Neutral600,
}

impl ShadeRole {
    pub fn saturation(&self) -> f64 {
        match self {
            ShadeRole::Primary600 => 78.0,
            ShadeRole::Neutral600 => 7.0,
        }
    }

    pub fn lightness(&self) -> f64 {
        match self {
            ShadeRole::Primary600 => 50.0,
            ShadeRole::Neutral600 => 46.0,
        }
    }

    /// Hex color of this shade for the given hue
    pub fn derive(&self, hue: f64) -> String {
        derive_color(hue, self.saturation(), self.lightness())
    }
}

/// Convert an HSL color to an uppercase `#RRGGBB` string.
///
/// Hue wraps into `[0, 360)`; saturation and lightness are clamped to
/// `[0, 100]`. Non-finite inputs are treated as 0. Channels are rounded half
/// away from zero.
pub fn derive_color(hue: f64, saturation: f64, lightness: f64) -> String {
    let h = normalize_hue(hue);
    let s = clamp_percent(saturation) / 100.0;
    let l = clamp_percent(lightness) / 100.0;

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    format!(
        "#{:02X}{:02X}{:02X}",
        to_channel(r + m),
        to_channel(g + m),
        to_channel(b + m)
    )
}

fn normalize_hue(hue: f64) -> f64 {
    if !hue.is_finite() {
        return 0.0;
    }
    let wrapped = hue.rem_euclid(360.0);
    // rem_euclid can land exactly on 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

fn clamp_percent(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

fn to_channel(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}
