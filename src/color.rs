use std::ops::{ Add, AddAssign, Sub, Mul };

use crate::feq;
use crate::tuple::Tuple4D;

/// A linear RGB color.
///
/// Components are nominally in `[0, 1]` but are left unclamped while light is
/// being accumulated; clamping happens when a pixel is encoded.
///
/// # Examples
///
/// ```
/// # use scene_tracer::color::Color;
/// let c = Color::rgb(0.5, 0.25, 1.0) * Color::rgb(0.5, 1.0, 0.0);
/// assert_eq!(c, Color::rgb(0.25, 0.25, 0.0));
/// ```
#[derive(Copy, Clone, Debug, Default, PartialOrd)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Component-wise equality within `FEQ_EPSILON`.
impl PartialEq for Color {
    fn eq(&self, other: &Color) -> bool {
        feq(self.r, other.r) &&
            feq(self.g, other.g) &&
            feq(self.b, other.b)
    }
}

/// Scene files write colors as 3-vectors; `x`, `y`, `z` become `r`, `g`, `b`.
impl From<Tuple4D> for Color {
    fn from(t: Tuple4D) -> Color {
        Color { r: t.x, g: t.y, b: t.z }
    }
}

impl Color {
    pub fn rgb(r: f64, g: f64, b: f64) -> Color {
        Color { r, g, b }
    }

    pub fn black() -> Color {
        Color::rgb(0.0, 0.0, 0.0)
    }

    pub fn white() -> Color {
        Color::rgb(1.0, 1.0, 1.0)
    }

    /// Builds a color from 8-bit channels.
    pub fn from_bytes(rgb: [u8; 3]) -> Color {
        Color::rgb(
            f64::from(rgb[0]) / 255.0,
            f64::from(rgb[1]) / 255.0,
            f64::from(rgb[2]) / 255.0,
        )
    }

    /// True when every channel is exactly zero, e.g. an unused coefficient.
    pub fn is_black(&self) -> bool {
        self.r == 0.0 && self.g == 0.0 && self.b == 0.0
    }

    /// Multiplies each component of the two colors.
    pub fn hadamard(c1: &Color, c2: &Color) -> Color {
        Color::rgb(c1.r * c2.r, c1.g * c2.g, c1.b * c2.b)
    }

    /// Linear interpolation; `t == 0.0` gives `self`.
    pub fn lerp(&self, other: &Color, t: f64) -> Color {
        *self * (1.0 - t) + *other * t
    }

    /// Encodes for display: applies `1 / gamma`, clamps and quantizes to
    /// 8 bits per channel.
    pub fn to_bytes(&self, gamma: f64) -> [u8; 3] {
        let encode = |c: f64| {
            let c = c.max(0.0).powf(1.0 / gamma).min(1.0);
            (c * 255.0).round() as u8
        };

        [encode(self.r), encode(self.g), encode(self.b)]
    }
}

impl Add<Color> for Color {
    type Output = Color;

    fn add(self, other: Color) -> Self::Output {
        Color {
            r: self.r + other.r,
            g: self.g + other.g,
            b: self.b + other.b,
        }
    }
}

impl AddAssign<Color> for Color {
    fn add_assign(&mut self, other: Color) {
        *self = *self + other;
    }
}

impl Sub<Color> for Color {
    type Output = Color;

    fn sub(self, other: Color) -> Self::Output {
        Color {
            r: self.r - other.r,
            g: self.g - other.g,
            b: self.b - other.b,
        }
    }
}

impl Mul<f64> for Color {
    type Output = Color;

    fn mul(self, other: f64) -> Self::Output {
        Color {
            r: self.r * other,
            g: self.g * other,
            b: self.b * other,
        }
    }
}

impl Mul<Color> for f64 {
    type Output = Color;

    fn mul(self, other: Color) -> Self::Output {
        other * self
    }
}

/// Shorthand for `Color::hadamard`.
impl Mul<Color> for Color {
    type Output = Color;

    fn mul(self, other: Color) -> Self::Output {
        Color::hadamard(&self, &other)
    }
}

#[test]
fn add_and_subtract() {
    let c1 = Color::rgb(0.9, 0.6, 0.75);
    let c2 = Color::rgb(0.7, 0.1, 0.25);

    assert_eq!(c1 + c2, Color::rgb(1.6, 0.7, 1.0));
    assert_eq!(c1 - c2, Color::rgb(0.2, 0.5, 0.5));

    let mut acc = Color::black();
    acc += c1;
    acc += c2;
    assert_eq!(acc, c1 + c2);
}

#[test]
fn scale_and_modulate() {
    let c = Color::rgb(1.0, 0.2, 0.4);

    assert_eq!(c * 0.5, Color::rgb(0.5, 0.1, 0.2));
    assert_eq!(0.5 * c, c * 0.5);
    assert_eq!(c * Color::rgb(0.9, 1.0, 0.1), Color::rgb(0.9, 0.2, 0.04));
}

#[test]
fn lerp_between_colors() {
    let a = Color::black();
    let b = Color::rgb(1.0, 0.5, 0.0);

    assert_eq!(a.lerp(&b, 0.0), a);
    assert_eq!(a.lerp(&b, 0.5), Color::rgb(0.5, 0.25, 0.0));
}

#[test]
fn encoding_clamps_and_applies_gamma() {
    assert_eq!(Color::rgb(2.0, -1.0, 1.0).to_bytes(1.0), [255, 0, 255]);
    assert_eq!(Color::rgb(0.5, 0.5, 0.5).to_bytes(1.0), [128, 128, 128]);

    // 0.25 ^ (1 / 2) == 0.5
    assert_eq!(Color::rgb(0.25, 0.0, 0.0).to_bytes(2.0), [128, 0, 0]);
}

#[test]
fn from_bytes_round_trip() {
    let c = Color::from_bytes([255, 0, 51]);
    assert_eq!(c, Color::rgb(1.0, 0.0, 0.2));
    assert_eq!(c.to_bytes(1.0), [255, 0, 51]);
}
