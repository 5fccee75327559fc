//! RGB colors: packed-hex parsing, HSL conversion, and linear blending.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned when a color input is malformed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColorError {
    /// Packed hex value has bits above `0xFFFFFF`.
    #[error("hex color {0:#x} exceeds 0xFFFFFF")]
    HexOutOfRange(u32),

    /// A textual hex color could not be parsed.
    #[error("invalid hex color string '{0}'")]
    InvalidHexString(String),

    /// A channel is NaN or infinite.
    #[error("color channel {channel} is not finite")]
    NonFinite { channel: char },

    /// A channel lies outside `[0.0, 1.0]`.
    #[error("color channel {channel} = {value} is outside [0, 1]")]
    ComponentOutOfRange { channel: char, value: f32 },
}

/// An RGB color with channels in `[0.0, 1.0]`.
///
/// Fields are public for cheap construction in shader code paths; use
/// [`Color::new`] or [`Color::validated`] when the values come from outside.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// Hue-saturation-lightness triple, every component in `[0.0, 1.0]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    /// Build a color, rejecting non-finite or out-of-range channels.
    pub fn new(r: f32, g: f32, b: f32) -> Result<Self, ColorError> {
        Color { r, g, b }.validated()
    }

    /// Check every channel is finite and inside `[0.0, 1.0]`.
    pub fn validated(self) -> Result<Self, ColorError> {
        for (channel, value) in [('r', self.r), ('g', self.g), ('b', self.b)] {
            if !value.is_finite() {
                return Err(ColorError::NonFinite { channel });
            }
            if !(0.0..=1.0).contains(&value) {
                return Err(ColorError::ComponentOutOfRange { channel, value });
            }
        }
        Ok(self)
    }

    /// Decode a packed `0xRRGGBB` value.
    pub fn from_hex(hex: u32) -> Result<Self, ColorError> {
        if hex > 0xFF_FFFF {
            return Err(ColorError::HexOutOfRange(hex));
        }
        Ok(Self {
            r: ((hex >> 16) & 0xFF) as f32 / 255.0,
            g: ((hex >> 8) & 0xFF) as f32 / 255.0,
            b: (hex & 0xFF) as f32 / 255.0,
        })
    }

    /// Parse `"#rrggbb"`, `"0xrrggbb"` or bare `"rrggbb"`.
    pub fn from_hex_str(s: &str) -> Result<Self, ColorError> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::InvalidHexString(s.to_string()));
        }
        let hex =
            u32::from_str_radix(digits, 16).map_err(|_| ColorError::InvalidHexString(s.to_string()))?;
        Self::from_hex(hex)
    }

    /// Convert from HSL.
    ///
    /// Hue wraps modulo 1; saturation and lightness are clamped to `[0, 1]`.
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let h = h.rem_euclid(1.0);
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);

        if s == 0.0 {
            return Self { r: l, g: l, b: l };
        }

        let p = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let q = 2.0 * l - p;

        Self {
            r: hue_to_rgb(q, p, h + 1.0 / 3.0),
            g: hue_to_rgb(q, p, h),
            b: hue_to_rgb(q, p, h - 1.0 / 3.0),
        }
    }

    /// Convert to HSL. Achromatic colors report hue and saturation 0.
    pub fn to_hsl(&self) -> Hsl {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let l = (min + max) / 2.0;

        if max == min {
            return Hsl { h: 0.0, s: 0.0, l };
        }

        let delta = max - min;
        let s = if l <= 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };

        let h = if max == self.r {
            (self.g - self.b) / delta + if self.g < self.b { 6.0 } else { 0.0 }
        } else if max == self.g {
            (self.b - self.r) / delta + 2.0
        } else {
            (self.r - self.g) / delta + 4.0
        };

        Hsl { h: h / 6.0, s, l }
    }

    /// Pack into `0xRRGGBB`, rounding each channel.
    pub fn to_hex(&self) -> u32 {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    /// Linear blend: `t = 0.0` returns `self`, `t = 1.0` returns `other`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        Color {
            r: self.r * (1.0 - t) + other.r * t,
            g: self.g * (1.0 - t) + other.g * t,
            b: self.b * (1.0 - t) + other.b * t,
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Decode sRGB-encoded channels to linear light.
    ///
    /// Colors are stored as authored; the renderer decodes them when packing
    /// uniforms and vertex data for an sRGB render target.
    pub fn to_linear(self) -> Color {
        Color {
            r: srgb_to_linear(self.r),
            g: srgb_to_linear(self.g),
            b: srgb_to_linear(self.b),
        }
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex_str(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.to_hex())
    }
}

impl From<Color> for [f32; 3] {
    fn from(c: Color) -> Self {
        c.to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn assert_close(a: Color, b: Color) {
        assert!(
            (a.r - b.r).abs() < EPS && (a.g - b.g).abs() < EPS && (a.b - b.b).abs() < EPS,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn test_from_hex_decodes_channels() {
        let c = Color::from_hex(0x0088ff).unwrap();
        assert_eq!(c.r, 0.0);
        assert!((c.g - 136.0 / 255.0).abs() < EPS);
        assert_eq!(c.b, 1.0);
    }

    #[test]
    fn test_from_hex_rejects_overflow() {
        assert_eq!(
            Color::from_hex(0x1_000000),
            Err(ColorError::HexOutOfRange(0x1_000000))
        );
    }

    #[test]
    fn test_from_hex_str_accepts_prefixes() {
        let expected = Color::from_hex(0x0088ff).unwrap();
        assert_eq!(Color::from_hex_str("#0088ff").unwrap(), expected);
        assert_eq!(Color::from_hex_str("0x0088FF").unwrap(), expected);
        assert_eq!("0088ff".parse::<Color>().unwrap(), expected);
    }

    #[test]
    fn test_from_hex_str_rejects_malformed() {
        for bad in ["", "#08f", "#0088fg", "blue", "#0088ff00"] {
            assert!(
                matches!(Color::from_hex_str(bad), Err(ColorError::InvalidHexString(_))),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn test_new_rejects_out_of_range_and_nan() {
        assert!(matches!(
            Color::new(1.5, 0.0, 0.0),
            Err(ColorError::ComponentOutOfRange { channel: 'r', .. })
        ));
        assert!(matches!(
            Color::new(0.0, f32::NAN, 0.0),
            Err(ColorError::NonFinite { channel: 'g' })
        ));
        assert!(Color::new(0.2, 0.4, 0.6).is_ok());
    }

    #[test]
    fn test_hsl_primaries() {
        assert_close(Color::from_hsl(0.0, 1.0, 0.5), Color { r: 1.0, g: 0.0, b: 0.0 });
        assert_close(Color::from_hsl(1.0 / 3.0, 1.0, 0.5), Color { r: 0.0, g: 1.0, b: 0.0 });
        assert_close(Color::from_hsl(2.0 / 3.0, 1.0, 0.5), Color { r: 0.0, g: 0.0, b: 1.0 });
    }

    #[test]
    fn test_hsl_zero_saturation_is_grey() {
        let c = Color::from_hsl(0.6, 0.0, 0.3);
        assert_eq!(c, Color { r: 0.3, g: 0.3, b: 0.3 });
    }

    #[test]
    fn test_hsl_hue_wraps() {
        assert_close(Color::from_hsl(1.6, 0.2, 0.5), Color::from_hsl(0.6, 0.2, 0.5));
        assert_close(Color::from_hsl(-0.4, 0.2, 0.5), Color::from_hsl(0.6, 0.2, 0.5));
    }

    #[test]
    fn test_hsl_star_tint_recovers_components() {
        for l in [0.1_f32, 0.35, 0.5, 0.75, 0.9] {
            let hsl = Color::from_hsl(0.6, 0.2, l).to_hsl();
            assert!((hsl.h - 0.6).abs() < 1e-4, "hue {} at l={l}", hsl.h);
            assert!((hsl.s - 0.2).abs() < 1e-4, "saturation {} at l={l}", hsl.s);
            assert!((hsl.l - l).abs() < 1e-5);
        }
    }

    #[test]
    fn test_to_hex_round_trips_default_rim() {
        assert_eq!(Color::from_hex(0x0088ff).unwrap().to_hex(), 0x0088ff);
        assert_eq!(Color::from_hex(0x0088ff).unwrap().to_string(), "#0088ff");
    }

    #[test]
    fn test_to_linear_keeps_endpoints_and_darkens_midtones() {
        assert_eq!(Color::BLACK.to_linear(), Color::BLACK);
        assert_close(Color::WHITE.to_linear(), Color::WHITE);
        let mid = Color { r: 0.5, g: 0.5, b: 0.5 }.to_linear();
        assert!((mid.r - 0.214_041).abs() < 1e-4, "{}", mid.r);
    }

    #[test]
    fn test_lerp_endpoints_are_exact() {
        let a = Color::BLACK;
        let b = Color::from_hex(0x0088ff).unwrap();
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
    }
}
