//! Fixed colour palette for annotations.

use serde::{Deserialize, Serialize};

/// Colours an annotation can be drawn in. Chosen at creation, never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteColor {
    #[default]
    Red,
    Green,
    Blue,
    Yellow,
    Magenta,
    Cyan,
}

impl PaletteColor {
    /// Get all palette colours in display order.
    pub fn all() -> &'static [PaletteColor] {
        &[
            PaletteColor::Red,
            PaletteColor::Green,
            PaletteColor::Blue,
            PaletteColor::Yellow,
            PaletteColor::Magenta,
            PaletteColor::Cyan,
        ]
    }

    /// Hex string as stored by the backend.
    pub fn hex(&self) -> &'static str {
        match self {
            PaletteColor::Red => "#FF0000",
            PaletteColor::Green => "#00FF00",
            PaletteColor::Blue => "#0000FF",
            PaletteColor::Yellow => "#FFFF00",
            PaletteColor::Magenta => "#FF00FF",
            PaletteColor::Cyan => "#00FFFF",
        }
    }

    /// Parse a backend hex string (case-insensitive). Returns None for
    /// colours outside the palette.
    pub fn from_hex(hex: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.hex().eq_ignore_ascii_case(hex.trim()))
    }

    /// RGB colour with components in 0-255.
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            PaletteColor::Red => [255, 0, 0],
            PaletteColor::Green => [0, 255, 0],
            PaletteColor::Blue => [0, 0, 255],
            PaletteColor::Yellow => [255, 255, 0],
            PaletteColor::Magenta => [255, 0, 255],
            PaletteColor::Cyan => [0, 255, 255],
        }
    }

    /// RGBA with components in 0.0-1.0.
    pub fn rgba(&self, alpha: f32) -> [f32; 4] {
        let [r, g, b] = self.rgb();
        [
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            alpha,
        ]
    }
}
