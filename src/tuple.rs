use std::ops::{ Add, Sub, Neg, Mul, Index };

use crate::feq;

/// A homogeneous 3D coordinate.
///
/// Points carry `w == 1.0` and vectors carry `w == 0.0`, so that translation
/// only ever affects points when multiplied through a `Matrix4D`.
#[derive(Debug, Default, Copy, Clone, PartialOrd)]
pub struct Tuple4D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64
}

impl PartialEq for Tuple4D {
    fn eq(&self, other: &Tuple4D) -> bool {
        feq(self.x, other.x) &&
            feq(self.y, other.y) &&
            feq(self.z, other.z) &&
            feq(self.w, other.w)
    }
}

impl Tuple4D {
    pub fn tuple(x: f64, y: f64, z: f64, w: f64) -> Tuple4D {
        Tuple4D { x, y, z, w }
    }

    pub fn point(x: f64, y: f64, z: f64) -> Tuple4D {
        Tuple4D { x, y, z, w: 1.0 }
    }

    pub fn vector(x: f64, y: f64, z: f64) -> Tuple4D {
        Tuple4D { x, y, z, w: 0.0 }
    }

    pub fn origin() -> Tuple4D {
        Tuple4D::point(0.0, 0.0, 0.0)
    }

    pub fn is_point(&self) -> bool {
        self.w == 1.0
    }

    pub fn is_vector(&self) -> bool {
        self.w == 0.0
    }

    /// Drops the `w` component, turning a point into its position vector.
    pub fn as_vector(&self) -> Tuple4D {
        Tuple4D { w: 0.0, ..*self }
    }

    pub fn as_point(&self) -> Tuple4D {
        Tuple4D { w: 1.0, ..*self }
    }

    /// Euclidean length of the `xyz` part.
    pub fn magnitude(&self) -> f64 {
        self.dot3(self).sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    /// Returns a unit vector with the same direction.
    ///
    /// A zero vector stays a zero vector instead of turning into NaNs.
    pub fn normalize(&self) -> Tuple4D {
        let mag = self.magnitude();
        if mag == 0.0 {
            return self.as_vector();
        }

        Tuple4D::vector(self.x / mag, self.y / mag, self.z / mag)
    }

    /// Dot product ignoring `w`; usable between points and vectors alike.
    pub fn dot3(&self, other: &Tuple4D) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Tuple4D) -> Tuple4D {
        Tuple4D {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
            w: 0.0
        }
    }

    /// Reflects a vector across a normal.
    pub fn reflect(&self, normal: &Tuple4D) -> Tuple4D {
        *self - (*normal * 2.0 * self.dot3(normal))
    }

    /// Bends a unit direction through a surface with Snell's law.
    ///
    /// `self` points towards the surface and `normal` is the unit normal on
    /// the incoming side. `n1` is the index of refraction the ray is leaving
    /// and `n2` the one it enters. Returns `None` on total internal
    /// reflection.
    pub fn refract(&self, normal: &Tuple4D, n1: f64, n2: f64)
        -> Option<Tuple4D> {
        let eta = n1 / n2;
        let cos_i = -self.dot3(normal);
        let cos2_t = 1.0 - eta * eta * (1.0 - cos_i * cos_i);

        if cos2_t < 0.0 {
            return None;
        }

        let bent = *self * eta + *normal * (eta * cos_i - cos2_t.sqrt());
        Some(bent.as_vector())
    }
}

/// Component access by axis number (`0 => x`, `1 => y`, `2 => z`, `3 => w`).
impl Index<usize> for Tuple4D {
    type Output = f64;

    fn index(&self, axis: usize) -> &f64 {
        match axis {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            3 => &self.w,
            _ => panic!("Tuple4D axis {} out of range", axis),
        }
    }
}

impl Add for Tuple4D {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
            w: self.w + other.w
        }
    }
}

impl Sub for Tuple4D {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
            w: self.w - other.w
        }
    }
}

impl Neg for Tuple4D {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: -self.w
        }
    }
}

impl Mul<f64> for Tuple4D {
    type Output = Self;

    fn mul(self, other: f64) -> Self {
        Self {
            x: self.x * other,
            y: self.y * other,
            z: self.z * other,
            w: self.w * other
        }
    }
}

impl Mul<Tuple4D> for f64 {
    type Output = Tuple4D;

    fn mul(self, other: Tuple4D) -> Tuple4D {
        other * self
    }
}

/* Tests */

#[test]
fn point_minus_point_is_vector() {
    let p1 = Tuple4D::point(4.0, -1.0, 2.0);
    let p2 = Tuple4D::point(1.0, 1.0, 1.0);

    let v = p1 - p2;
    assert!(v.is_vector());
    assert_eq!(v, Tuple4D::vector(3.0, -2.0, 1.0));
}

#[test]
fn point_plus_vector_is_point() {
    let p = Tuple4D::point(1.0, 2.0, 3.0);
    let v = Tuple4D::vector(0.5, 0.5, -3.0);

    assert!((p + v).is_point());
    assert_eq!(p + v, Tuple4D::point(1.5, 2.5, 0.0));
}

#[test]
fn scalar_multiplication_commutes() {
    let v = Tuple4D::vector(1.0, -2.0, 0.25);

    assert_eq!(v * 4.0, 4.0 * v);
    assert_eq!(v * 4.0, Tuple4D::vector(4.0, -8.0, 1.0));
}

#[test]
fn magnitude_ignores_w() {
    let p = Tuple4D::point(2.0, 3.0, 6.0);
    assert_eq!(p.magnitude(), 7.0);
}

#[test]
fn normalize_yields_unit_vector() {
    let v = Tuple4D::vector(0.0, 3.0, 4.0).normalize();

    assert_eq!(v, Tuple4D::vector(0.0, 0.6, 0.8));
    assert!(crate::feq(v.magnitude(), 1.0));
}

#[test]
fn normalize_zero_vector_stays_zero() {
    let v = Tuple4D::vector(0.0, 0.0, 0.0).normalize();
    assert!(v.is_zero());
    assert!(!v.x.is_nan());
}

#[test]
fn cross_follows_right_hand_rule() {
    let x = Tuple4D::vector(1.0, 0.0, 0.0);
    let y = Tuple4D::vector(0.0, 1.0, 0.0);

    assert_eq!(x.cross(&y), Tuple4D::vector(0.0, 0.0, 1.0));
    assert_eq!(y.cross(&x), Tuple4D::vector(0.0, 0.0, -1.0));
}

#[test]
fn reflect_off_slanted_surface() {
    let v = Tuple4D::vector(0.0, -1.0, 0.0);
    let half = 2.0f64.sqrt() / 2.0;
    let n = Tuple4D::vector(half, half, 0.0);

    assert_eq!(v.reflect(&n), Tuple4D::vector(1.0, 0.0, 0.0));
}

#[test]
fn refract_normal_incidence_does_not_bend() {
    let d = Tuple4D::vector(0.0, 0.0, -1.0);
    let n = Tuple4D::vector(0.0, 0.0, 1.0);

    let t = d.refract(&n, 1.0, 1.5).unwrap();
    assert_eq!(t, d);
}

#[test]
fn refract_obeys_snell() {
    let half = 2.0f64.sqrt() / 2.0;
    let d = Tuple4D::vector(half, -half, 0.0);
    let n = Tuple4D::vector(0.0, 1.0, 0.0);

    let t = d.refract(&n, 1.0, 1.5).unwrap();
    let sin_t = t.x / t.magnitude();
    assert!(crate::feq(sin_t * 1.5, half));
    assert!(t.y < 0.0);
}

#[test]
fn refract_total_internal_reflection() {
    let d = Tuple4D::vector(0.9, -(1.0f64 - 0.81).sqrt(), 0.0);
    let n = Tuple4D::vector(0.0, 1.0, 0.0);

    assert_eq!(d.refract(&n, 1.5, 1.0), None);
}

#[test]
fn index_by_axis() {
    let p = Tuple4D::point(7.0, 8.0, 9.0);
    assert_eq!((p[0], p[1], p[2], p[3]), (7.0, 8.0, 9.0, 1.0));
}
