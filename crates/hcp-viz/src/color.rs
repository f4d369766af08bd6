//! RGBA colors and process palettes.

use serde::Deserialize;
use std::fmt;

/// 8-bit RGB color with a float alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// Alpha in `[0, 1]`
    pub a: f64,
}

impl Color {
    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#rrggbb` or `rrggbb`. `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Parse a hex color, black when malformed.
    pub fn hex(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    /// Same color at opacity `a`.
    pub const fn translucent(self, a: f64) -> Self {
        Self { a, ..self }
    }

    /// Darker shade for outlines.
    pub fn darken(self, factor: f64) -> Self {
        let f = (1.0 - factor).clamp(0.0, 1.0);
        Self {
            r: (self.r as f64 * f).round() as u8,
            g: (self.g as f64 * f).round() as u8,
            b: (self.b as f64 * f).round() as u8,
            a: self.a,
        }
    }
}

/// Formats as an SVG paint value: `#rrggbb` when opaque, `rgba(...)` otherwise.
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { r, g, b, a } = *self;
        if a >= 1.0 - 1e-6 {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "rgba({r},{g},{b},{a:.3})")
        }
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(d)?;
        Color::parse(&text).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid color '{text}', expected #rrggbb"))
        })
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::rgb(0, 0, 0)
    }
}

/// CMS six-color palette (Petroff).
pub const CMS_PETROFF6: &[&str] =
    &["#5790fc", "#f89c20", "#e42536", "#964a8b", "#9c9ca1", "#7a21dd"];

/// CMS ten-color palette (Petroff).
pub const CMS_PETROFF10: &[&str] = &[
    "#3f90da", "#ffa90e", "#bd1f01", "#94a4a2", "#832db6", "#a96b59", "#e76300", "#b9ac70",
    "#717581", "#92dadd",
];

/// Tableau 10.
pub const TABLEAU10: &[&str] = &[
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
    "#9c755f", "#bab0ab",
];

/// Colors of a named palette; unknown names fall back to `cms_petroff6`.
pub fn palette_colors(name: &str) -> Vec<Color> {
    let hexes = match name {
        "cms_petroff6" => CMS_PETROFF6,
        "cms_petroff10" => CMS_PETROFF10,
        "tableau10" => TABLEAU10,
        other => {
            log::warn!("unknown palette '{other}', using cms_petroff6");
            CMS_PETROFF6
        }
    };
    hexes.iter().copied().map(Color::hex).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        let c = Color::hex("#E42536");
        assert_eq!((c.r, c.g, c.b), (0xE4, 0x25, 0x36));
        assert!(Color::parse("#12345").is_none());
        assert!(Color::parse("zzzzzz").is_none());
        assert_eq!(Color::hex("nope"), Color::rgb(0, 0, 0));
    }

    #[test]
    fn svg_paint_values() {
        assert_eq!(Color::rgb(29, 78, 216).to_string(), "#1d4ed8");
        assert_eq!(Color::rgb(29, 78, 216).translucent(0.5).to_string(), "rgba(29,78,216,0.500)");
    }

    #[test]
    fn palettes() {
        assert_eq!(palette_colors("cms_petroff10").len(), 10);
        assert_eq!(palette_colors("tableau10")[0], Color::rgb(0x4e, 0x79, 0xa7));
        assert_eq!(palette_colors("unknown").len(), 6);
    }

    #[test]
    fn deserialize_rejects_garbage() {
        let c: Color = serde_json::from_str("\"#5790fc\"").unwrap();
        assert_eq!(c, Color::rgb(0x57, 0x90, 0xfc));
        assert!(serde_json::from_str::<Color>("\"red\"").is_err());
    }
}
