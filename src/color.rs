use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Linear-ish RGB color with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// `0xRRGGBB` as used for scene constants.
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    /// Converts hue (degrees), saturation and lightness (both `0.0..=1.0`).
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 360.0;
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);

        if s == 0.0 {
            return Self::new(l, l, l);
        }

        let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;

        Self {
            r: hue_to_channel(p, q, h + 1.0 / 3.0),
            g: hue_to_channel(p, q, h),
            b: hue_to_channel(p, q, h - 1.0 / 3.0),
        }
    }

    /// Returns (hue in degrees, saturation, lightness).
    pub fn to_hsl(self) -> (f32, f32, f32) {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let l = (max + min) / 2.0;

        if (max - min).abs() < f32::EPSILON {
            return (0.0, 0.0, l);
        }

        let d = max - min;
        let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
        let h = if max == self.r {
            (self.g - self.b) / d + if self.g < self.b { 6.0 } else { 0.0 }
        } else if max == self.g {
            (self.b - self.r) / d + 2.0
        } else {
            (self.r - self.g) / d + 4.0
        };

        (h * 60.0, s, l)
    }

    pub fn scale(self, k: f32) -> Self {
        Self::new(self.r * k, self.g * k, self.b * k)
    }

    pub fn add(self, other: Rgb) -> Self {
        Self::new(self.r + other.r, self.g + other.g, self.b + other.b)
    }

    /// Component-wise product, used for light * albedo.
    pub fn modulate(self, other: Rgb) -> Self {
        Self::new(self.r * other.r, self.g * other.g, self.b * other.b)
    }

    /// Linear blend toward `other` by `t`.
    pub fn mix(self, other: Rgb, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    pub fn clamped(self) -> Self {
        Self::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }

    pub fn to_rgb8(self) -> [u8; 3] {
        let c = self.clamped();
        [
            (c.r * 255.0).round() as u8,
            (c.g * 255.0).round() as u8,
            (c.b * 255.0).round() as u8,
        ]
    }

    pub fn hex_string(self) -> String {
        let [r, g, b] = self.to_rgb8();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    pub fn parse_hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Self::from_hex)
    }
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex_string())
    }
}

// Options files spell colors as "#rrggbb".
impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex_string())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rgb::parse_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsl_primaries() {
        let red = Rgb::from_hsl(0.0, 1.0, 0.5);
        assert_eq!(red.to_rgb8(), [255, 0, 0]);
        let green = Rgb::from_hsl(120.0, 1.0, 0.5);
        assert_eq!(green.to_rgb8(), [0, 255, 0]);
        let blue = Rgb::from_hsl(240.0, 1.0, 0.5);
        assert_eq!(blue.to_rgb8(), [0, 0, 255]);
    }

    #[test]
    fn hsl_sixty_percent_lightness_keeps_full_saturation() {
        let c = Rgb::from_hsl(200.0, 1.0, 0.6);
        let (h, s, l) = c.to_hsl();
        assert!((h - 200.0).abs() < 0.5, "hue was {}", h);
        assert!((s - 1.0).abs() < 1e-3, "saturation was {}", s);
        assert!((l - 0.6).abs() < 1e-3, "lightness was {}", l);
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(Rgb::parse_hex("#05020a"), Some(Rgb::from_hex(0x05020a)));
        assert_eq!(Rgb::from_hex(0x00ffff).hex_string(), "#00ffff");
        assert_eq!(Rgb::parse_hex("nope"), None);
    }
}
