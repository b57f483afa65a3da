use std::f64::consts::PI;

use crate::consts::{ POLE_EPSILON, TUBE_EPSILON, CONE_LINEAR_EPSILON };
use crate::tuple::Tuple4D;
use crate::ray::Ray;
use crate::matrix::{ Matrix4D, Transform };
use crate::intersect::Hit;
use crate::error::GeometryError;

/// The primitive a `Shape` is made of. Each lives in a canonical object
/// space.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    /// A unit sphere centered at the origin.
    Sphere,

    /// A box spanning `[-1, 1]` on every axis.
    Box,

    /// A unit-radius cylinder around the z axis, capped at `z = 0` and
    /// `z = 1`.
    Cylinder,

    /// A cone around the z axis with its apex at the origin, opening to a
    /// unit-radius cap at `z = 1`.
    Cone,
}

impl ShapeKind {
    /// The scene-file keyword which declares this kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            ShapeKind::Sphere => "sphere",
            ShapeKind::Box => "box",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Cone => "cone",
        }
    }
}

/// A primitive placed in the world.
///
/// The transform is fixed when the shape is declared. Materials are shared,
/// so a shape only stores the name it asked for and, once the scene has been
/// built, the index of the resolved material (`None` means the default).
#[derive(Clone, Debug)]
pub struct Shape {
    pub kind: ShapeKind,
    pub name: String,
    pub material_name: String,
    pub material: Option<usize>,

    /// Scene-file line of the declaration, for diagnostics.
    pub line: usize,

    transform: Transform,
}

impl Shape {
    pub fn new(kind: ShapeKind) -> Shape {
        Shape {
            kind,
            name: String::new(),
            material_name: String::new(),
            material: None,
            line: 0,
            transform: Transform::identity(),
        }
    }

    pub fn sphere() -> Shape {
        Shape::new(ShapeKind::Sphere)
    }

    pub fn cube() -> Shape {
        Shape::new(ShapeKind::Box)
    }

    pub fn cylinder() -> Shape {
        Shape::new(ShapeKind::Cylinder)
    }

    pub fn cone() -> Shape {
        Shape::new(ShapeKind::Cone)
    }

    /// Builder-style variant of `set_transform`.
    pub fn with_transform(mut self, m: Matrix4D) -> Result<Shape, GeometryError> {
        self.set_transform(m)?;
        Ok(self)
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Sets the world transform, recomputing its inverse and normal matrix.
    pub fn set_transform(&mut self, m: Matrix4D) -> Result<(), GeometryError> {
        self.transform.set_matrix(m)
    }

    /// Intersects a world-space ray with this shape.
    ///
    /// The ray is taken into object space through the inverse transform.
    /// Affine maps preserve the ray parameter, so the returned `t` is valid
    /// for the world ray as given. With `full` set, the point, normal and
    /// tangents are carried back to world space.
    pub fn hit(&self, ray: &Ray, full: bool, min_t: f64) -> Option<Hit> {
        let local = self.transform.ray_to_object(ray);
        let mut hit = self.local_hit(&local, full, min_t)?;

        if full {
            hit.point = self.transform.point_to_world(hit.point);
            hit.normal = self.transform.normal_to_world(hit.normal);
            hit.dpdu = self.transform.vector_to_world(hit.dpdu);
            hit.dpdv = self.transform.vector_to_world(hit.dpdv);
        }

        Some(hit)
    }

    /// Intersects an object-space ray with the canonical primitive.
    ///
    /// The nearest hit with `t >= min_t` is returned. Solvers work on a unit
    /// direction, so `min_t` is scaled by the direction length going in and
    /// `t` is scaled back coming out; the caller sees its own units either
    /// way. Only `t` is filled in unless `full` is set.
    pub fn local_hit(&self, ray: &Ray, full: bool, min_t: f64) -> Option<Hit> {
        let len = ray.direction.magnitude();
        if len == 0.0 {
            return None;
        }

        let unit = Ray::new(ray.origin, ray.direction * (1.0 / len));
        let min_t = min_t * len;

        let mut hit = match self.kind {
            ShapeKind::Sphere => Self::intersect_sphere(&unit, full, min_t),
            ShapeKind::Box => Self::intersect_box(&unit, full, min_t),
            ShapeKind::Cylinder => Self::intersect_cylinder(&unit, full, min_t),
            ShapeKind::Cone => Self::intersect_cone(&unit, full, min_t),
        }?;

        hit.t /= len;
        Some(hit)
    }

    fn intersect_sphere(ray: &Ray, full: bool, min_t: f64) -> Option<Hit> {
        let o = ray.origin.as_vector();
        let b = -o.dot3(&ray.direction);
        let disc = b * b - o.dot3(&o) + 1.0;

        if disc < 0.0 {
            return None;
        }

        let root = disc.sqrt();
        let far = b + root;
        if far <= min_t {
            return None;
        }

        let near = b - root;
        let t = if near > min_t { near } else { far };

        if !full {
            return Some(Hit::at(t));
        }

        let p = ray.position(t);
        let z = p.z.clamp(-1.0, 1.0);
        let phi = (-z).acos();
        let v = phi / PI;

        let sin_phi = phi.sin();
        let u = if sin_phi < POLE_EPSILON {
            0.0
        } else {
            let cos_theta = p.x / sin_phi;
            let u = if cos_theta >= 1.0 {
                0.0
            } else if cos_theta <= -1.0 {
                0.5
            } else {
                cos_theta.acos() / (2.0 * PI)
            };

            if p.y > 0.0 { u } else { 1.0 - u }
        };

        let dpdu = Self::azimuth_tangent(&p);
        let dpdv = p.as_vector().cross(&dpdu).normalize();

        Some(Hit {
            t,
            point: p,
            normal: p.as_vector().normalize(),
            u,
            v,
            dpdu,
            dpdv,
            ..Default::default()
        })
    }

    /// Tests the six face planes and keeps the nearest one that lands on
    /// the face.
    fn intersect_box(ray: &Ray, full: bool, min_t: f64) -> Option<Hit> {
        let mut best: Option<Hit> = None;

        for axis in 0..3 {
            let d = ray.direction[axis];
            if d == 0.0 {
                continue;
            }

            let (i1, i2) = ((axis + 1) % 3, (axis + 2) % 3);
            for &side in [-1.0, 1.0].iter() {
                let t = (side - ray.origin[axis]) / d;
                if t < min_t || best.map_or(false, |b| t >= b.t) {
                    continue;
                }

                let p = ray.position(t);
                if p[i1].abs() > 1.0 || p[i2].abs() > 1.0 {
                    continue;
                }

                best = Some(if full {
                    Hit {
                        normal: unit_axis(axis) * side,
                        ..Self::planar_hit(t, p, i1, i2)
                    }
                } else {
                    Hit::at(t)
                });
            }
        }

        best
    }

    fn intersect_cylinder(ray: &Ray, full: bool, min_t: f64) -> Option<Hit> {
        let tube = Self::cylinder_tube(ray, full, min_t);
        let bottom = Self::disc_cap(ray, full, min_t, 0.0, -1.0);
        let top = Self::disc_cap(ray, full, min_t, 1.0, 1.0);

        Hit::nearest(Hit::nearest(tube, bottom), top)
    }

    fn cylinder_tube(ray: &Ray, full: bool, min_t: f64) -> Option<Hit> {
        let (o, d) = (ray.origin, ray.direction);

        // Parallel to the axis: the tube can't be hit.
        let a = d.x * d.x + d.y * d.y;
        if a < TUBE_EPSILON {
            return None;
        }

        let b = d.x * o.x + d.y * o.y;
        let c = o.x * o.x + o.y * o.y - 1.0;
        let disc = b * b - a * c;
        if disc < 0.0 {
            return None;
        }

        let root = disc.sqrt();
        let t = Self::first_in_span(ray, min_t, (-b - root) / a, (-b + root) / a)?;

        if !full {
            return Some(Hit::at(t));
        }

        let p = ray.position(t);
        let mut u = p.x.clamp(-1.0, 1.0).acos() / (2.0 * PI);
        if p.y < 0.0 {
            u = 1.0 - u;
        }

        Some(Hit {
            t,
            point: p,
            normal: Tuple4D::vector(p.x, p.y, 0.0).normalize(),
            u,
            v: p.z,
            dpdu: Self::azimuth_tangent(&p),
            dpdv: unit_axis(2),
            ..Default::default()
        })
    }

    fn intersect_cone(ray: &Ray, full: bool, min_t: f64) -> Option<Hit> {
        let side = Self::cone_side(ray, full, min_t);
        let base = Self::disc_cap(ray, full, min_t, 1.0, 1.0);

        Hit::nearest(side, base)
    }

    /// The lateral surface `x^2 + y^2 = z^2` for `z` in `[0, 1]`.
    ///
    /// Uses the half-b quadratic `a t^2 + 2 b t + c = 0`. When `a` vanishes
    /// the ray runs parallel to a generator line and the equation is linear,
    /// `t = -c / 2b`. If `b` vanishes as well the ray lies along the surface
    /// through the apex and counts as a miss.
    fn cone_side(ray: &Ray, full: bool, min_t: f64) -> Option<Hit> {
        let (o, d) = (ray.origin, ray.direction);

        let a = d.x * d.x + d.y * d.y - d.z * d.z;
        let b = d.x * o.x + d.y * o.y - d.z * o.z;
        let c = o.x * o.x + o.y * o.y - o.z * o.z;

        let t = if a.abs() < CONE_LINEAR_EPSILON {
            if b.abs() < TUBE_EPSILON {
                return None;
            }

            let t = -0.5 * c / b;
            Self::first_in_span(ray, min_t, t, t)?
        } else {
            let disc = b * b - a * c;
            if disc < 0.0 {
                return None;
            }

            let root = disc.sqrt();
            let (t1, t2) = ((-b - root) / a, (-b + root) / a);
            Self::first_in_span(ray, min_t, t1.min(t2), t1.max(t2))?
        };

        if !full {
            return Some(Hit::at(t));
        }

        let p = ray.position(t);

        // p x (p x z) points away from the axis and down the slope.
        let outward = Tuple4D::vector(p.x * p.z, p.y * p.z, -(p.x * p.x + p.y * p.y));
        let normal = if outward.magnitude() < POLE_EPSILON {
            Tuple4D::vector(0.0, 0.0, -1.0)
        } else {
            outward.normalize()
        };

        let mut u = if p.z < POLE_EPSILON {
            0.0
        } else {
            (p.x / p.z).clamp(-1.0, 1.0).acos() / (2.0 * PI)
        };
        if p.y < 0.0 {
            u = 1.0 - u;
        }

        Some(Hit {
            t,
            point: p,
            normal,
            u,
            v: p.z,
            dpdu: Self::azimuth_tangent(&p),
            dpdv: p.as_vector().normalize(),
            ..Default::default()
        })
    }

    /// A unit disc in the plane `z = height`, facing `+z` or `-z`.
    fn disc_cap(ray: &Ray, full: bool, min_t: f64, height: f64, facing: f64)
        -> Option<Hit> {
        if ray.direction.z == 0.0 {
            return None;
        }

        let t = (height - ray.origin.z) / ray.direction.z;
        if t < min_t {
            return None;
        }

        let p = ray.position(t);
        if p.x * p.x + p.y * p.y > 1.0 {
            return None;
        }

        if !full {
            return Some(Hit::at(t));
        }

        Some(Hit {
            normal: Tuple4D::vector(0.0, 0.0, facing),
            ..Self::planar_hit(t, p, 0, 1)
        })
    }

    /// Picks the smaller of two ordered roots that is past `min_t` and lands
    /// within `z` in `[0, 1]`.
    fn first_in_span(ray: &Ray, min_t: f64, t1: f64, t2: f64) -> Option<f64> {
        let valid = |t: f64| {
            let z = ray.origin.z + t * ray.direction.z;
            t >= min_t && (0.0..=1.0).contains(&z)
        };

        if valid(t1) {
            Some(t1)
        } else if valid(t2) {
            Some(t2)
        } else {
            None
        }
    }

    /// Texture frame for a point on an axis-aligned face spanning `[-1, 1]`
    /// along axes `i1` and `i2`.
    fn planar_hit(t: f64, p: Tuple4D, i1: usize, i2: usize) -> Hit {
        Hit {
            t,
            point: p,
            u: (p[i1] + 1.0) / 2.0,
            v: (p[i2] + 1.0) / 2.0,
            dpdu: unit_axis(i1),
            dpdv: unit_axis(i2),
            ..Default::default()
        }
    }

    /// Direction of increasing azimuth around the z axis.
    fn azimuth_tangent(p: &Tuple4D) -> Tuple4D {
        let t = Tuple4D::vector(-p.y, p.x, 0.0);
        if t.magnitude() < POLE_EPSILON {
            unit_axis(0)
        } else {
            t.normalize()
        }
    }
}

fn unit_axis(axis: usize) -> Tuple4D {
    match axis {
        0 => Tuple4D::vector(1.0, 0.0, 0.0),
        1 => Tuple4D::vector(0.0, 1.0, 0.0),
        _ => Tuple4D::vector(0.0, 0.0, 1.0),
    }
}

#[cfg(test)]
use crate::feq;

#[cfg(test)]
fn ray(origin: (f64, f64, f64), direction: (f64, f64, f64)) -> Ray {
    Ray::new(
        Tuple4D::point(origin.0, origin.1, origin.2),
        Tuple4D::vector(direction.0, direction.1, direction.2),
    )
}

#[cfg(test)]
fn assert_parallel(a: Tuple4D, b: Tuple4D) {
    let d = a.normalize().dot3(&b.normalize()).abs();
    assert!(crate::feq(d, 1.0), "{:?} is not parallel to {:?}", a, b);
}

#[test]
fn sphere_hit_along_inward_normal() {
    let s = Shape::sphere();
    let h = s.local_hit(&ray((0.0, 0.0, 3.0), (0.0, 0.0, -1.0)), true, 0.0).unwrap();

    assert_eq!(h.t, 2.0);
    assert_eq!(h.point, Tuple4D::point(0.0, 0.0, 1.0));
    assert_eq!(h.normal, Tuple4D::vector(0.0, 0.0, 1.0));
}

#[test]
fn sphere_hit_from_inside_takes_far_root() {
    let s = Shape::sphere();
    let h = s.local_hit(&ray((0.0, 0.0, 0.0), (1.0, 0.0, 0.0)), false, 0.0001).unwrap();

    assert_eq!(h.t, 1.0);
}

#[test]
fn sphere_behind_ray_misses() {
    let s = Shape::sphere();
    assert!(s.local_hit(&ray((0.0, 0.0, 3.0), (0.0, 0.0, 1.0)), true, 0.0).is_none());
    assert!(s.local_hit(&ray((0.0, 2.0, 3.0), (0.0, 0.0, -1.0)), true, 0.0).is_none());
}

#[test]
fn sphere_t_uses_callers_units() {
    let s = Shape::sphere();
    let h = s.local_hit(&ray((0.0, 0.0, 3.0), (0.0, 0.0, -2.0)), false, 0.0).unwrap();
    assert_eq!(h.t, 1.0);

    // min_t is in the same units: 1.5 lies past the near root at 1.0.
    let h = s.local_hit(&ray((0.0, 0.0, 3.0), (0.0, 0.0, -2.0)), false, 1.5).unwrap();
    assert_eq!(h.t, 2.0);
}

#[test]
fn sphere_texture_coordinates() {
    let s = Shape::sphere();
    let h = s.local_hit(&ray((0.0, 3.0, 0.0), (0.0, -1.0, 0.0)), true, 0.0).unwrap();

    assert!(crate::feq(h.u, 0.25));
    assert!(crate::feq(h.v, 0.5));
    assert_eq!(h.dpdu, Tuple4D::vector(-1.0, 0.0, 0.0));

    let pole = s.local_hit(&ray((0.0, 0.0, -3.0), (0.0, 0.0, 1.0)), true, 0.0).unwrap();
    assert_eq!(pole.u, 0.0);
    assert!(crate::feq(pole.v, 0.0));
    assert!(!pole.dpdv.x.is_nan());
}

#[test]
fn shadow_mode_only_fills_t() {
    let s = Shape::sphere();
    let h = s.local_hit(&ray((0.0, 0.0, 3.0), (0.0, 0.0, -1.0)), false, 0.0).unwrap();

    assert_eq!(h.t, 2.0);
    assert_eq!(h.normal, Tuple4D::default());
}

#[test]
fn box_hit_along_inward_normal() {
    let b = Shape::cube();
    let h = b.local_hit(&ray((5.0, 0.5, 0.0), (-1.0, 0.0, 0.0)), true, 0.0).unwrap();

    assert_eq!(h.t, 4.0);
    assert_eq!(h.normal, Tuple4D::vector(1.0, 0.0, 0.0));
    assert!(crate::feq(h.u, 0.75));
    assert!(crate::feq(h.v, 0.5));
    assert_eq!(h.dpdu, Tuple4D::vector(0.0, 1.0, 0.0));
    assert_eq!(h.dpdv, Tuple4D::vector(0.0, 0.0, 1.0));
}

#[test]
fn box_hit_on_negative_face() {
    let b = Shape::cube();
    let h = b.local_hit(&ray((0.2, -4.0, 0.3), (0.0, 1.0, 0.0)), true, 0.0).unwrap();

    assert_eq!(h.t, 3.0);
    assert_eq!(h.normal, Tuple4D::vector(0.0, -1.0, 0.0));
}

#[test]
fn box_misses_beside_face() {
    let b = Shape::cube();
    assert!(b.local_hit(&ray((5.0, 2.0, 0.0), (-1.0, 0.0, 0.0)), true, 0.0).is_none());
}

#[test]
fn box_hit_from_inside() {
    let b = Shape::cube();
    let h = b.local_hit(&ray((0.0, 0.0, 0.0), (0.0, 0.0, 1.0)), true, 0.0001).unwrap();

    assert_eq!(h.t, 1.0);
    assert_eq!(h.normal, Tuple4D::vector(0.0, 0.0, 1.0));
}

#[test]
fn cylinder_tube_along_inward_normal() {
    let c = Shape::cylinder();
    let h = c.local_hit(&ray((3.0, 0.0, 0.5), (-1.0, 0.0, 0.0)), true, 0.0).unwrap();

    assert_eq!(h.t, 2.0);
    assert_eq!(h.normal, Tuple4D::vector(1.0, 0.0, 0.0));
    assert!(crate::feq(h.v, 0.5));
    assert!(crate::feq(h.u, 0.0));
    assert_eq!(h.dpdv, Tuple4D::vector(0.0, 0.0, 1.0));
}

#[test]
fn cylinder_caps() {
    let c = Shape::cylinder();

    let top = c.local_hit(&ray((0.2, 0.0, 3.0), (0.0, 0.0, -1.0)), true, 0.0).unwrap();
    assert_eq!(top.t, 2.0);
    assert_eq!(top.normal, Tuple4D::vector(0.0, 0.0, 1.0));
    assert!(crate::feq(top.u, 0.6));

    let bottom = c.local_hit(&ray((0.0, 0.3, -2.0), (0.0, 0.0, 1.0)), true, 0.0).unwrap();
    assert_eq!(bottom.t, 2.0);
    assert_eq!(bottom.normal, Tuple4D::vector(0.0, 0.0, -1.0));
}

#[test]
fn cylinder_is_bounded() {
    let c = Shape::cylinder();

    assert!(c.local_hit(&ray((3.0, 0.0, 2.0), (-1.0, 0.0, 0.0)), true, 0.0).is_none());
    assert!(c.local_hit(&ray((3.0, 0.0, -0.1), (-1.0, 0.0, 0.0)), true, 0.0).is_none());
}

#[test]
fn cylinder_takes_nearest_part() {
    // Enters through the side, leaves through the top cap.
    let c = Shape::cylinder();
    let d = Tuple4D::vector(-1.0, 0.0, 1.0).normalize();
    let r = Ray::new(Tuple4D::point(2.0, 0.0, -0.5), d);

    let h = c.local_hit(&r, true, 0.0).unwrap();
    assert_eq!(h.point, Tuple4D::point(1.0, 0.0, 0.5));
    assert_eq!(h.normal, Tuple4D::vector(1.0, 0.0, 0.0));

    let inside = c.local_hit(&r, true, h.t + 0.001).unwrap();
    assert_eq!(inside.point, Tuple4D::point(0.5, 0.0, 1.0));
    assert_eq!(inside.normal, Tuple4D::vector(0.0, 0.0, 1.0));
}

#[test]
fn cone_side_quadratic() {
    let c = Shape::cone();
    let h = c.local_hit(&ray((3.0, 0.0, 0.5), (-1.0, 0.0, 0.0)), true, 0.0).unwrap();

    assert_eq!(h.t, 2.5);
    assert_eq!(h.point, Tuple4D::point(0.5, 0.0, 0.5));
    assert_eq!(h.normal, Tuple4D::vector(1.0, 0.0, -1.0).normalize());
}

#[test]
fn cone_hit_along_inward_normal_is_linear_case() {
    // Travelling along the inward normal keeps the ray parallel to the
    // opposite generator line, so the quadratic term vanishes.
    let c = Shape::cone();
    let n = Tuple4D::vector(1.0, 0.0, -1.0).normalize();
    let surface = Tuple4D::point(0.5, 0.0, 0.5);
    let r = Ray::new(surface + n * 2.0, -n);

    let h = c.local_hit(&r, true, 0.0).unwrap();
    assert_eq!(h.t, 2.0);
    assert_eq!(h.point, surface);
    assert_parallel(h.normal, n);
}

#[test]
fn cone_ray_along_surface_misses() {
    let c = Shape::cone();
    let d = Tuple4D::vector(1.0, 0.0, 1.0).normalize();
    let r = Ray::new(Tuple4D::point(-1.0, 0.0, -1.0), d);

    // Only the base cap can be hit from here, and this line leaves through
    // its rim at x = 1.
    let h = c.local_hit(&r, true, 0.0);
    assert!(h.map_or(true, |h| h.normal == Tuple4D::vector(0.0, 0.0, 1.0)));
}

#[test]
fn cone_base_cap() {
    let c = Shape::cone();
    let h = c.local_hit(&ray((0.2, 0.1, 3.0), (0.0, 0.0, -1.0)), true, 0.0).unwrap();

    assert_eq!(h.t, 2.0);
    assert_eq!(h.normal, Tuple4D::vector(0.0, 0.0, 1.0));
}

#[test]
fn cone_is_bounded_below_apex() {
    let c = Shape::cone();
    assert!(c.local_hit(&ray((3.0, 0.0, -0.5), (-1.0, 0.0, 0.0)), true, 0.0).is_none());
}

#[test]
fn transformed_sphere_world_hit() {
    let s = Shape::sphere().with_transform(
        Matrix4D::translation(0.0, 0.0, -5.0) * Matrix4D::scaling(2.0, 2.0, 2.0)
    ).unwrap();

    let h = s.hit(&ray((0.0, 0.0, 0.0), (0.0, 0.0, -1.0)), true, 0.0).unwrap();
    assert_eq!(h.t, 3.0);
    assert_eq!(h.point, Tuple4D::point(0.0, 0.0, -3.0));
    assert_eq!(h.normal, Tuple4D::vector(0.0, 0.0, 1.0));

    let h = s.hit(&ray((0.0, 0.0, 0.0), (0.0, 0.0, -2.0)), false, 0.0).unwrap();
    assert_eq!(h.t, 1.5);
}

#[test]
fn world_hit_round_trips_through_object_space() {
    let transforms = vec![
        Matrix4D::translation(1.0, -2.0, 0.5),
        Matrix4D::rotation(40.0, Tuple4D::vector(1.0, 2.0, 0.5)).unwrap(),
        Matrix4D::scaling(0.5, 2.0, 3.0),
        Matrix4D::translation(0.0, 1.0, -1.0)
            * Matrix4D::rotation(-70.0, Tuple4D::vector(0.0, 1.0, 0.0)).unwrap()
            * Matrix4D::scaling(1.5, 0.7, 1.0),
    ];

    for kind in [ShapeKind::Sphere, ShapeKind::Box, ShapeKind::Cylinder, ShapeKind::Cone].iter() {
        for m in transforms.iter() {
            let s = Shape::new(*kind).with_transform(*m).unwrap();

            // Aim at the world image of a point inside the primitive.
            let target = *m * Tuple4D::point(0.1, 0.2, 0.6);
            let origin = target + Tuple4D::vector(3.0, 4.0, 12.0);
            let r = Ray::new(origin, target - origin);

            let h = s.hit(&r, true, 0.0).unwrap();
            assert_eq!(h.point, r.position(h.t));

            let local = *s.transform().inverse() * h.point;
            let direct = s.local_hit(&s.transform().ray_to_object(&r), true, 0.0).unwrap();
            assert_eq!(local, direct.point);
        }
    }
}

#[test]
fn stretched_sphere_matches_its_ellipsoid() {
    // Centered at (1, 0, 0) with semi-axes 2, 1 and 3.
    let m = Matrix4D::translation(1.0, 0.0, 0.0) * Matrix4D::scaling(2.0, 1.0, 3.0);
    let s = Shape::sphere().with_transform(m).unwrap();

    let r = ray((1.0, 0.5, 10.0), (0.05, -0.05, -1.0));
    let h = s.hit(&r, true, 0.0).unwrap();

    // Solve the ellipsoid's implicit equation for the world ray directly.
    let (o, d) = (r.origin, r.direction);
    let (ox, dx) = (o.x - 1.0, d.x);
    let a = dx * dx / 4.0 + d.y * d.y + d.z * d.z / 9.0;
    let b = 2.0 * (ox * dx / 4.0 + o.y * d.y + o.z * d.z / 9.0);
    let c = ox * ox / 4.0 + o.y * o.y + o.z * o.z / 9.0 - 1.0;
    let t = (-b - (b * b - 4.0 * a * c).sqrt()) / (2.0 * a);
    assert!(feq(h.t, t));

    let p = h.point;
    let implicit = (p.x - 1.0).powi(2) / 4.0 + p.y * p.y + p.z * p.z / 9.0;
    assert!(feq(implicit, 1.0));

    let gradient = Tuple4D::vector((p.x - 1.0) / 2.0, 2.0 * p.y, 2.0 * p.z / 9.0);
    assert_eq!(h.normal, gradient.normalize());
}

#[test]
fn singular_transform_is_rejected() {
    let r = Shape::sphere().with_transform(Matrix4D::scaling(1.0, 1.0, 0.0));
    assert!(matches!(r, Err(GeometryError::SingularMatrix)));
}
