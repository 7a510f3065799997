//! Colour strings from specs, normalized to packed `0xRRGGBB`.

use bevy::color::Color;

pub const DEFAULT_SHAPE_COLOR: u32 = 0xFFFFFF;
pub const DEFAULT_TEXT_COLOR: u32 = 0xFFFFFF;
pub const DEFAULT_BACKGROUND: u32 = 0x87CEEB;

const NAMED: &[(&str, u32)] = &[
    ("black", 0x000000),
    ("white", 0xFFFFFF),
    ("red", 0xFF0000),
    ("green", 0x008000),
    ("lime", 0x00FF00),
    ("blue", 0x0000FF),
    ("yellow", 0xFFFF00),
    ("orange", 0xFFA500),
    ("purple", 0x800080),
    ("pink", 0xFFC0CB),
    ("cyan", 0x00FFFF),
    ("magenta", 0xFF00FF),
    ("brown", 0xA52A2A),
    ("gray", 0x808080),
    ("grey", 0x808080),
    ("gold", 0xFFD700),
    ("skyblue", 0x87CEEB),
];

/// Parse `#RRGGBB`, `0xRRGGBB`, `#RGB`, a decimal integer or a CSS name.
pub fn parse_color(raw: &str) -> Option<u32> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return parse_hex(hex).filter(|_| hex.len() == 6);
    }
    if let Ok(value) = s.parse::<u32>() {
        return (value <= 0xFFFFFF).then_some(value);
    }
    let lower = s.to_ascii_lowercase();
    NAMED
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, value)| *value)
}

fn parse_hex(hex: &str) -> Option<u32> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => u32::from_str_radix(hex, 16).ok(),
        3 => {
            let short = u32::from_str_radix(hex, 16).ok()?;
            let (r, g, b) = ((short >> 8) & 0xF, (short >> 4) & 0xF, short & 0xF);
            Some(((r * 0x11) << 16) | ((g * 0x11) << 8) | (b * 0x11))
        }
        _ => None,
    }
}

pub fn resolve_color(raw: Option<&str>, fallback: u32) -> u32 {
    raw.and_then(parse_color).unwrap_or(fallback)
}

pub fn to_bevy(packed: u32) -> Color {
    Color::srgb_u8(
        ((packed >> 16) & 0xFF) as u8,
        ((packed >> 8) & 0xFF) as u8,
        (packed & 0xFF) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_every_documented_form() {
        assert_eq!(parse_color("#ff8800"), Some(0xFF8800));
        assert_eq!(parse_color("0x00FF00"), Some(0x00FF00));
        assert_eq!(parse_color("#f80"), Some(0xFF8800));
        assert_eq!(parse_color("16777215"), Some(0xFFFFFF));
        assert_eq!(parse_color("  Gold "), Some(0xFFD700));
    }

    #[test]
    fn malformed_input_falls_back() {
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#gggggg"), None);
        assert_eq!(parse_color("0x123"), None);
        assert_eq!(parse_color("99999999"), None);
        assert_eq!(parse_color("chartreuse-ish"), None);
        assert_eq!(resolve_color(Some("nope"), 0x123456), 0x123456);
        assert_eq!(resolve_color(None, DEFAULT_SHAPE_COLOR), DEFAULT_SHAPE_COLOR);
    }

    #[test]
    fn converts_to_srgb() {
        let c = to_bevy(0xFF0000).to_srgba();
        assert!((c.red - 1.0).abs() < 1e-6);
        assert!(c.green.abs() < 1e-6);
    }
}
