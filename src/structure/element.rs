//! Per-element display tables.
//!
//! Radii are display radii in scene units (already tuned for the 0.55
//! centering scale), not van der Waals radii. Colors are packed `0xRRGGBB`.

/// Radius used for any element missing from [`ELEMENT_TABLE`].
pub const FALLBACK_RADIUS: f32 = 0.38;

/// Color used for any element missing from [`ELEMENT_TABLE`] (light gray).
pub const FALLBACK_COLOR: u32 = 0x00b0_bec5;

/// Display entry for one element symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementStyle {
    /// Element symbol with canonical capitalization.
    pub symbol: &'static str,
    /// Base display radius.
    pub radius: f32,
    /// Packed `0xRRGGBB` color.
    pub color: u32,
}

/// Elements with dedicated radius and color entries.
pub const ELEMENT_TABLE: &[ElementStyle] = &[
    ElementStyle { symbol: "H", radius: 0.25, color: 0x00ff_ffff },
    ElementStyle { symbol: "C", radius: 0.40, color: 0x0044_4444 },
    ElementStyle { symbol: "N", radius: 0.38, color: 0x0030_50f8 },
    ElementStyle { symbol: "O", radius: 0.36, color: 0x00ff_0d0d },
    ElementStyle { symbol: "F", radius: 0.34, color: 0x0090_e050 },
    ElementStyle { symbol: "Cl", radius: 0.42, color: 0x001f_f01f },
    ElementStyle { symbol: "Br", radius: 0.45, color: 0x00a6_2929 },
    ElementStyle { symbol: "I", radius: 0.50, color: 0x0094_0094 },
    ElementStyle { symbol: "P", radius: 0.42, color: 0x00ff_8000 },
    ElementStyle { symbol: "S", radius: 0.44, color: 0x00ff_ff30 },
    ElementStyle { symbol: "Na", radius: 0.50, color: 0x00a0_a0ff },
    ElementStyle { symbol: "K", radius: 0.52, color: 0x008f_40d4 },
];

/// Look up the display entry for a symbol. Matching is exact, so `"CL"`
/// and `"cl"` fall back just like unknown elements.
#[must_use]
pub fn lookup(symbol: &str) -> Option<&'static ElementStyle> {
    ELEMENT_TABLE.iter().find(|e| e.symbol == symbol)
}

/// Base display radius for a symbol.
#[must_use]
pub fn radius(symbol: &str) -> f32 {
    lookup(symbol).map_or(FALLBACK_RADIUS, |e| e.radius)
}

/// Packed color for a symbol.
#[must_use]
pub fn color_hex(symbol: &str) -> u32 {
    lookup(symbol).map_or(FALLBACK_COLOR, |e| e.color)
}

/// Linear RGB in `[0, 1]` for a symbol.
#[must_use]
pub fn color_rgb(symbol: &str) -> [f32; 3] {
    hex_to_rgb(color_hex(symbol))
}

/// Unpack `0xRRGGBB` into `[r, g, b]` floats.
#[must_use]
pub fn hex_to_rgb(hex: u32) -> [f32; 3] {
    let r = ((hex >> 16) & 0xff) as f32 / 255.0;
    let g = ((hex >> 8) & 0xff) as f32 / 255.0;
    let b = (hex & 0xff) as f32 / 255.0;
    [r, g, b]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_elements() {
        assert_eq!(radius("C"), 0.40);
        assert_eq!(radius("Cl"), 0.42);
        assert_eq!(color_hex("O"), 0xff0d0d);
        assert_eq!(color_rgb("H"), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn unknown_elements_fall_back() {
        assert_eq!(radius("Xe"), FALLBACK_RADIUS);
        assert_eq!(color_hex("Xe"), FALLBACK_COLOR);
        // Lookup is case-sensitive.
        assert_eq!(radius("CL"), FALLBACK_RADIUS);
    }

    #[test]
    fn hex_unpacking() {
        let [r, g, b] = hex_to_rgb(0x00ff_8000);
        assert_eq!(r, 1.0);
        assert!((g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(b, 0.0);
    }
}
