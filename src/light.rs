use crate::color::Color;
use crate::tuple::Tuple4D;
use crate::material::Material;
use crate::error::GeometryError;

/// Where a light's rays come from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LightKind {
    /// Light radiating from a point.
    Point(Tuple4D),

    /// Parallel light travelling along a unit direction, as from the sun.
    Directional(Tuple4D),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub name: String,
    pub color: Color,
    pub kind: LightKind,
}

impl Light {
    pub fn point(color: Color, position: Tuple4D) -> Light {
        Light {
            name: String::new(),
            color,
            kind: LightKind::Point(position.as_point()),
        }
    }

    /// A directional light; the direction is that of the light's travel and
    /// must not be zero.
    pub fn directional(color: Color, direction: Tuple4D)
        -> Result<Light, GeometryError> {
        if direction.is_zero() {
            return Err(GeometryError::ZeroDirection);
        }

        Ok(Light {
            name: String::new(),
            color,
            kind: LightKind::Directional(direction.normalize()),
        })
    }

    /// The unit vector from `p` towards the light and the distance to it.
    ///
    /// Directional lights are infinitely far away.
    pub fn towards(&self, p: Tuple4D) -> (Tuple4D, f64) {
        match self.kind {
            LightKind::Point(position) => {
                let v = position - p;
                (v.normalize(), v.magnitude())
            },
            LightKind::Directional(direction) => (-direction, std::f64::INFINITY),
        }
    }
}

/// Phong diffuse and specular contribution of one light at a surface point.
///
/// `texture` modulates the diffuse term only; ambient light is accounted for
/// once per hit by the caller. `lightv`, `eyev` and `normalv` are unit
/// vectors pointing away from the surface. A point in shadow receives
/// nothing.
pub fn lighting(m: &Material, texture: Color, light_color: Color,
    lightv: Tuple4D, eyev: Tuple4D, normalv: Tuple4D, in_shadow: bool) -> Color {
    if in_shadow {
        return Color::black();
    }

    // The light is behind the surface.
    let light_dot_normal = lightv.dot3(&normalv);
    if light_dot_normal <= 0.0 {
        return Color::black();
    }

    let diffuse = m.kd * texture * light_color * light_dot_normal;

    let reflectv = (-lightv).reflect(&normalv);
    let reflect_dot_eye = reflectv.dot3(&eyev);

    let specular = if reflect_dot_eye <= 0.0 || m.is_matte() {
        Color::black()
    } else {
        m.ks * light_color * reflect_dot_eye.powf(m.shiny)
    };

    diffuse + specular
}

#[cfg(test)]
fn shiny_white() -> Material {
    Material {
        ka: Color::white() * 0.1,
        kd: Color::white() * 0.9,
        ks: Color::white() * 0.9,
        shiny: 200.0,
        ..Default::default()
    }
}

#[test]
fn eye_between_light_and_surface() {
    let m = shiny_white();
    let v = Tuple4D::vector(0.0, 0.0, -1.0);

    let c = lighting(&m, Color::white(), Color::white(), v, v, v, false);
    assert_eq!(c, Color::rgb(1.8, 1.8, 1.8));
}

#[test]
fn eye_in_path_of_reflection() {
    let m = shiny_white();
    let half = 2.0f64.sqrt() / 2.0;
    let normalv = Tuple4D::vector(0.0, 0.0, -1.0);
    let lightv = Tuple4D::vector(0.0, half, -half);
    let eyev = Tuple4D::vector(0.0, -half, -half);

    let c = lighting(&m, Color::white(), Color::white(), lightv, eyev, normalv, false);
    assert_eq!(c, Color::white() * (0.9 * half + 0.9));
}

#[test]
fn light_behind_surface() {
    let m = shiny_white();
    let normalv = Tuple4D::vector(0.0, 0.0, -1.0);
    let lightv = Tuple4D::vector(0.0, 0.0, 1.0);

    let c = lighting(&m, Color::white(), Color::white(), lightv, normalv, normalv, false);
    assert_eq!(c, Color::black());
}

#[test]
fn shadow_removes_direct_light() {
    let m = shiny_white();
    let v = Tuple4D::vector(0.0, 0.0, -1.0);

    assert_eq!(lighting(&m, Color::white(), Color::white(), v, v, v, true), Color::black());
}

#[test]
fn texture_modulates_diffuse_only() {
    let m = shiny_white();
    let v = Tuple4D::vector(0.0, 0.0, -1.0);
    let red = Color::rgb(1.0, 0.0, 0.0);

    let c = lighting(&m, red, Color::white(), v, v, v, false);
    assert_eq!(c, Color::rgb(1.8, 0.9, 0.9));
}

#[test]
fn point_light_direction_and_distance() {
    let l = Light::point(Color::white(), Tuple4D::point(0.0, 0.0, 5.0));
    let (dir, dist) = l.towards(Tuple4D::point(0.0, 0.0, 1.0));

    assert_eq!(dir, Tuple4D::vector(0.0, 0.0, 1.0));
    assert_eq!(dist, 4.0);
}

#[test]
fn directional_light_is_infinitely_far() {
    let l = Light::directional(Color::white(), Tuple4D::vector(0.0, -2.0, 0.0)).unwrap();
    let (dir, dist) = l.towards(Tuple4D::point(3.0, 1.0, 2.0));

    assert_eq!(dir, Tuple4D::vector(0.0, 1.0, 0.0));
    assert!(dist.is_infinite());
}

#[test]
fn zero_direction_is_degenerate() {
    let l = Light::directional(Color::white(), Tuple4D::vector(0.0, 0.0, 0.0));
    assert_eq!(l, Err(GeometryError::ZeroDirection));
}
