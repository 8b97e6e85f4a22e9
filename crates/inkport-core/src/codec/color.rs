//! Stroke colors: 24-bit RGB values, solid colors and evenly spaced gradients.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb24 {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Rgb24 {
    /// Create a color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a 6-digit hex color (`RRGGBB`, case-insensitive, optional `#`).
    #[must_use]
    pub fn parse_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Uppercase `RRGGBB` without prefix or alpha.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Convert unit-range float channels, rounding `c * 255` and clamping.
    #[must_use]
    pub fn from_unit(r: f32, g: f32, b: f32) -> Self {
        #[allow(clippy::cast_sign_loss)]
        let quantize = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::new(quantize(r), quantize(g), quantize(b))
    }

    /// Channels as unit-range floats.
    #[must_use]
    pub fn to_unit(self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }
}

impl fmt::Display for Rgb24 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

/// A gradient of at least two evenly spaced stops.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gradient {
    stops: Vec<Rgb24>,
}

impl Gradient {
    /// Minimum number of stops a gradient must have.
    pub const MIN_STOPS: usize = 2;

    /// Create a gradient, returning `None` when fewer than two stops are given.
    #[must_use]
    pub fn new(stops: Vec<Rgb24>) -> Option<Self> {
        (stops.len() >= Self::MIN_STOPS).then_some(Self { stops })
    }

    /// The stop colors in order.
    #[must_use]
    pub fn stops(&self) -> &[Rgb24] {
        &self.stops
    }

    /// Stops paired with their parametric position `i / (n - 1)`.
    pub fn keys(&self) -> impl Iterator<Item = (f32, Rgb24)> + '_ {
        let last = (self.stops.len() - 1) as f32;
        self.stops
            .iter()
            .enumerate()
            .map(move |(i, color)| (i as f32 / last, *color))
    }
}

/// Color of one stroke.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StrokeColor {
    /// Single color along the whole stroke
    Const(Rgb24),
    /// Multi-stop gradient along the stroke parameter
    Gradient(Gradient),
}

impl StrokeColor {
    /// Wire name of the color kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Const(_) => "const",
            Self::Gradient(_) => "gradient",
        }
    }

    /// All color values in wire order.
    #[must_use]
    pub fn values(&self) -> &[Rgb24] {
        match self {
            Self::Const(color) => std::slice::from_ref(color),
            Self::Gradient(gradient) => gradient.stops(),
        }
    }

    /// The first color value, used as the grouping key.
    #[must_use]
    pub fn primary(&self) -> Rgb24 {
        self.values()[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(Rgb24::parse_hex("FF0000"), Some(Rgb24::new(255, 0, 0)));
        assert_eq!(Rgb24::parse_hex("00ff7f"), Some(Rgb24::new(0, 255, 127)));
        assert_eq!(Rgb24::parse_hex("#0A0b0C"), Some(Rgb24::new(10, 11, 12)));
    }

    #[test]
    fn test_parse_hex_rejects_malformed() {
        assert_eq!(Rgb24::parse_hex(""), None);
        assert_eq!(Rgb24::parse_hex("FFF"), None);
        assert_eq!(Rgb24::parse_hex("FF0000FF"), None);
        assert_eq!(Rgb24::parse_hex("GG0000"), None);
        assert_eq!(Rgb24::parse_hex("+F0000"), None);
        assert_eq!(Rgb24::parse_hex("ÿÿÿ"), None);
    }

    #[test]
    fn test_to_hex_uppercase() {
        assert_eq!(Rgb24::new(171, 205, 239).to_hex(), "ABCDEF");
        assert_eq!(Rgb24::new(0, 1, 2).to_hex(), "000102");
    }

    #[test]
    fn test_from_unit_rounds_and_clamps() {
        assert_eq!(Rgb24::from_unit(1.0, 0.5, 0.0), Rgb24::new(255, 128, 0));
        assert_eq!(Rgb24::from_unit(1.5, -0.2, 0.2), Rgb24::new(255, 0, 51));
    }

    #[test]
    fn test_gradient_requires_two_stops() {
        assert!(Gradient::new(vec![]).is_none());
        assert!(Gradient::new(vec![Rgb24::new(0, 0, 0)]).is_none());
        assert!(Gradient::new(vec![Rgb24::new(0, 0, 0), Rgb24::new(1, 1, 1)]).is_some());
    }

    #[test]
    fn test_gradient_stop_spacing() {
        let two = Gradient::new(vec![Rgb24::new(0, 0, 0), Rgb24::new(255, 255, 255)]).unwrap();
        let times: Vec<f32> = two.keys().map(|(t, _)| t).collect();
        assert_eq!(times, vec![0.0, 1.0]);

        let five = Gradient::new(vec![Rgb24::new(0, 0, 0); 5]).unwrap();
        let times: Vec<f32> = five.keys().map(|(t, _)| t).collect();
        assert_eq!(times, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_primary_color() {
        let red = Rgb24::new(255, 0, 0);
        assert_eq!(StrokeColor::Const(red).primary(), red);
        let gradient = Gradient::new(vec![red, Rgb24::new(0, 0, 255)]).unwrap();
        assert_eq!(StrokeColor::Gradient(gradient).primary(), red);
    }
}
