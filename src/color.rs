use egui::Color32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Straight (non-premultiplied) ARGB color as stored in documents.
///
/// Persisted as an `#aarrggbb` string. Anything that does not parse loads as
/// [`Color::TRANSPARENT`] instead of failing the whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::argb(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const SKY_BLUE: Color = Color::rgb(135, 206, 235);
    pub const SALMON: Color = Color::rgb(250, 128, 114);
    pub const SELECTION: Color = Color::rgb(0, 122, 204);

    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::argb(255, r, g, b)
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// `#aarrggbb`, lowercase
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.a, self.r, self.g, self.b)
    }

    /// Parses `#aarrggbb`, `#rrggbb`, `#argb` and `#rgb` (the leading `#` is optional).
    pub fn parse_hex(text: &str) -> Option<Color> {
        let digits = text.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let nibble = |i: usize| u8::from_str_radix(&digits[i..=i], 16).ok().map(|v| v * 17);
        let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();

        match digits.len() {
            3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            4 => Some(Color::argb(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
            6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Color::argb(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    pub fn from_hex_or_transparent(text: &str) -> Color {
        Self::parse_hex(text).unwrap_or(Self::TRANSPARENT)
    }

    /// Convert for painting, multiplying alpha by `opacity` (clamped to 0..=1)
    pub fn to_color32(self, opacity: f32) -> Color32 {
        let alpha = (f32::from(self.a) * opacity.clamp(0.0, 1.0)).round() as u8;
        Color32::from_rgba_unmultiplied(self.r, self.g, self.b, alpha)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawColor {
            Text(String),
            Other(serde::de::IgnoredAny),
        }

        Ok(match RawColor::deserialize(deserializer)? {
            RawColor::Text(text) => Color::from_hex_or_transparent(&text),
            RawColor::Other(_) => Color::TRANSPARENT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let color = Color::argb(0x80, 0x12, 0xab, 0xff);
        assert_eq!(color.to_hex(), "#8012abff");
        assert_eq!(Color::parse_hex(&color.to_hex()), Some(color));
    }

    #[test]
    fn test_short_forms() {
        assert_eq!(Color::parse_hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse_hex("8000"), Some(Color::argb(0x88, 0, 0, 0)));
        assert_eq!(Color::parse_hex("#00ff00"), Some(Color::rgb(0, 255, 0)));
    }

    #[test]
    fn test_malformed_is_transparent() {
        assert_eq!(Color::from_hex_or_transparent("#12345"), Color::TRANSPARENT);
        assert_eq!(Color::from_hex_or_transparent("not a color"), Color::TRANSPARENT);
        assert_eq!(Color::from_hex_or_transparent(""), Color::TRANSPARENT);

        let parsed: Color = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, Color::TRANSPARENT);
        let parsed: Color = serde_json::from_str("\"#zzzzzzzz\"").unwrap();
        assert_eq!(parsed, Color::TRANSPARENT);
    }

    #[test]
    fn test_opacity_scales_alpha() {
        let c = Color::rgb(10, 20, 30).to_color32(0.5);
        assert_eq!(c.a(), 128);
    }
}
