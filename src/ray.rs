use crate::tuple::Tuple4D;
use crate::matrix::Matrix4D;

/// A ray with an origin point and a direction vector.
///
/// The direction is not required to be unit length; intersection routines
/// report `t` in this ray's own parameter units.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Ray {
    pub origin: Tuple4D,
    pub direction: Tuple4D,
}

impl Ray {
    pub fn new(origin: Tuple4D, direction: Tuple4D) -> Ray {
        Ray { origin: origin.as_point(), direction: direction.as_vector() }
    }

    pub fn position(&self, t: f64) -> Tuple4D {
        self.origin + (t * self.direction)
    }

    pub fn transform(&self, m: &Matrix4D) -> Ray {
        Ray {
            origin: *m * self.origin,
            direction: *m * self.direction,
        }
    }
}

#[test]
fn new_forces_point_and_vector() {
    let r = Ray::new(Tuple4D::vector(1.0, 2.0, 3.0), Tuple4D::point(0.0, 0.0, 1.0));

    assert!(r.origin.is_point());
    assert!(r.direction.is_vector());
}

#[test]
fn position_along_unnormalized_ray() {
    let r = Ray::new(Tuple4D::point(1.0, 0.0, 0.0), Tuple4D::vector(0.0, 2.0, 0.0));

    assert_eq!(r.position(0.0), Tuple4D::point(1.0, 0.0, 0.0));
    assert_eq!(r.position(1.5), Tuple4D::point(1.0, 3.0, 0.0));
    assert_eq!(r.position(-1.0), Tuple4D::point(1.0, -2.0, 0.0));
}

#[test]
fn transform_scales_direction() {
    let r = Ray::new(Tuple4D::point(1.0, 2.0, 3.0), Tuple4D::vector(0.0, 1.0, 0.0));
    let m = Matrix4D::translation(1.0, 1.0, 1.0) * Matrix4D::scaling(2.0, 3.0, 4.0);
    let t = r.transform(&m);

    assert_eq!(t.origin, Tuple4D::point(3.0, 7.0, 13.0));
    assert_eq!(t.direction, Tuple4D::vector(0.0, 3.0, 0.0));
}
