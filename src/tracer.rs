use crate::ray::Ray;
use crate::tuple::Tuple4D;
use crate::color::Color;
use crate::intersect::Hit;
use crate::light::lighting;
use crate::scene::Scene;
use crate::consts::{ MAX_RECURSION_DEPTH, RAY_EPSILON, VACUUM_RI };

/// Recursive shading over a read-only scene.
///
/// A `Tracer` holds no mutable state, so one can be shared by every render
/// worker.
#[derive(Clone, Copy, Debug)]
pub struct Tracer<'s> {
    scene: &'s Scene,

    /// Rays at this depth get local illumination only.
    pub max_depth: usize,

    /// Minimum `t` for secondary and shadow rays.
    pub epsilon: f64,
}

impl<'s> Tracer<'s> {
    pub fn new(scene: &'s Scene) -> Tracer<'s> {
        Tracer { scene, max_depth: MAX_RECURSION_DEPTH, epsilon: RAY_EPSILON }
    }

    pub fn with_limits(scene: &'s Scene, max_depth: usize, epsilon: f64) -> Tracer<'s> {
        Tracer { scene, max_depth, epsilon }
    }

    pub fn scene(&self) -> &'s Scene {
        self.scene
    }

    /// Color seen along a camera ray; misses show the background.
    pub fn primary(&self, ray: &Ray, background: Color) -> Color {
        match self.scene.closest_hit(ray, self.epsilon) {
            Some(hit) => self.shade(ray, &hit, 0),
            None => background,
        }
    }

    /// Color carried back along a secondary ray; misses contribute nothing.
    pub fn trace(&self, ray: &Ray, depth: usize) -> Color {
        match self.scene.closest_hit(ray, self.epsilon) {
            Some(hit) => self.shade(ray, &hit, depth),
            None => Color::black(),
        }
    }

    /// True if anything lies strictly between `point` and a light
    /// `distance` away along `lightv`. Transparent shapes cast shadows too.
    pub fn is_shadowed(&self, point: Tuple4D, lightv: Tuple4D, distance: f64) -> bool {
        let r = Ray::new(point, lightv);
        self.scene.occluded(&r, self.epsilon, distance)
    }

    /// Ambient, direct light from every visible light, then reflection and
    /// refraction until `max_depth`.
    pub fn shade(&self, ray: &Ray, hit: &Hit, depth: usize) -> Color {
        let shape = match hit.shape {
            Some(i) => &self.scene.shapes[i],
            None => return Color::black(),
        };
        let m = self.scene.material_for(shape);
        let texture = m.texture_color(hit.u, hit.v).unwrap_or_else(Color::white);

        let direction = ray.direction.normalize();
        let entering = direction.dot3(&hit.normal) < 0.0;

        // Shade the side the ray arrived on.
        let normalv = if entering { hit.normal } else { -hit.normal };
        let eyev = -direction;

        let mut color = m.ka * texture;

        for light in self.scene.lights.iter() {
            let (lightv, distance) = light.towards(hit.point);
            let in_shadow = self.is_shadowed(hit.point, lightv, distance);
            color += lighting(m, texture, light.color, lightv, eyev, normalv, in_shadow);
        }

        if depth >= self.max_depth {
            return color;
        }

        if !m.is_matte() {
            let reflected = Ray::new(hit.point, direction.reflect(&normalv));
            color += m.ks * self.trace(&reflected, depth + 1);
        }

        if !m.is_opaque() {
            let (n1, n2) = if entering {
                (VACUUM_RI, m.index)
            } else {
                (m.index, VACUUM_RI)
            };

            // Total internal reflection leaves nothing to transmit.
            if let Some(bent) = direction.refract(&normalv, n1, n2) {
                let refracted = Ray::new(hit.point, bent);
                color += m.kt * self.trace(&refracted, depth + 1);
            }
        }

        color
    }
}

#[cfg(test)]
use crate::parser::Parser;
#[cfg(test)]
use crate::camera::Camera;
#[cfg(test)]
use crate::consts::DEFAULT_AMBIENT;

#[cfg(test)]
fn scene(text: &str) -> Scene {
    let mut s = Parser::parse_str(text, ".").unwrap();
    s.setup();
    s
}

#[cfg(test)]
fn down_z_from(z: f64) -> Ray {
    Ray::new(Tuple4D::point(0.0, 0.0, z), Tuple4D::vector(0.0, 0.0, -1.0))
}

/// A glass ball in front of a red backdrop.
#[cfg(test)]
const GLASS_BALL: &str = "
    material { name = glass  kt = (1, 1, 1)  index = 1.5 }
    material { name = red  ka = (1, 0, 0) }
    sphere { material = glass }
    translate { (0, 0, -5) }
    scale { (10, 10, 0.1) }
    box { material = red }
";

#[test]
fn unit_sphere_seen_head_on() {
    let s = scene("
        light { position = (0, 0, 5) }
        sphere { }
        camera { eye = (0, 0, 5)  center = (0, 0, 0)  background = (0.1, 0.2, 0.3) }
    ");

    let camera = Camera::new(&s.camera, 11, 11).unwrap();
    let image = camera.render(&Tracer::new(&s));
    let background = Color::rgb(0.1, 0.2, 0.3);

    let center = image.read_pixel(5, 5).unwrap();
    assert!(!center.is_black());
    assert_ne!(center, background);

    for &(x, y) in &[(0, 0), (10, 0), (0, 10), (10, 10)] {
        assert_eq!(image.read_pixel(x, y).unwrap(), background);
    }
}

#[test]
fn head_on_highlight_is_full_diffuse() {
    // Light behind the eye: N.L = 1 at the nearest point.
    let s = scene("light { position = (0, 0, 5) } sphere { }");
    let c = Tracer::new(&s).trace(&down_z_from(5.0), 0);

    assert_eq!(c, Color::white());
}

#[test]
fn occluder_leaves_exactly_ambient() {
    let lit = "
        material { name = matte  ka = (0.2, 0.2, 0.2)  kd = (0.8, 0.8, 0.8) }
        light { position = (0, 10, 10) }
        sphere { material = matte }
    ";
    let blocker = "
        translate { (0, 5, 5.5) }
        scale { (0.5, 0.5, 0.5) }
        sphere { material = matte }
    ";

    let open = scene(lit);
    let c = Tracer::new(&open).trace(&down_z_from(5.0), 0);
    assert!(c.r > 0.2);

    let blocked = scene(&format!("{}{}", lit, blocker));
    let c = Tracer::new(&blocked).trace(&down_z_from(5.0), 0);
    assert_eq!(c, Color::white() * DEFAULT_AMBIENT);
}

#[test]
fn light_behind_surface_contributes_nothing() {
    let s = scene("light { position = (0, 0, -5) } sphere { }");
    let c = Tracer::new(&s).trace(&down_z_from(5.0), 0);

    assert_eq!(c, Color::white() * DEFAULT_AMBIENT);
}

#[test]
fn directional_light_is_never_out_of_range() {
    let s = scene("light { direction = (0, 0, -1) } sphere { }");
    let c = Tracer::new(&s).trace(&down_z_from(5.0), 0);

    assert_eq!(c, Color::white());
}

#[test]
fn primary_miss_shows_background_secondary_miss_is_black() {
    let s = scene("sphere { }");
    let t = Tracer::new(&s);
    let away = Ray::new(Tuple4D::point(0.0, 0.0, 5.0), Tuple4D::vector(0.0, 0.0, 1.0));
    let sky = Color::rgb(0.3, 0.5, 0.9);

    assert_eq!(t.primary(&away, sky), sky);
    assert_eq!(t.trace(&away, 1), Color::black());
}

#[test]
fn glass_at_normal_incidence_passes_straight_through() {
    let s = scene(GLASS_BALL);
    let c = Tracer::new(&s).trace(&down_z_from(5.0), 0);

    // Unbent through both surfaces onto the backdrop.
    assert_eq!(c, Color::rgb(1.0, 0.0, 0.0));
}

#[test]
fn off_axis_entry_bends_toward_axis() {
    let s = scene(GLASS_BALL);
    let d = Tuple4D::vector(0.0, 0.0, -1.0);
    let h = s.closest_hit(&Ray::new(Tuple4D::point(0.5, 0.0, 5.0), d), RAY_EPSILON).unwrap();

    let bent = d.refract(&h.normal, VACUUM_RI, 1.5).unwrap();
    assert!(bent.x < 0.0);
    assert!(crate::feq(bent.magnitude(), 1.0));
}

#[test]
fn recursion_stops_at_max_depth() {
    let s = scene(GLASS_BALL);
    let ray = down_z_from(5.0);

    // Depth 1 reaches the far side of the ball but can go no further.
    assert_eq!(Tracer::with_limits(&s, 1, RAY_EPSILON).trace(&ray, 0), Color::black());
    assert_eq!(Tracer::with_limits(&s, 2, RAY_EPSILON).trace(&ray, 0), Color::rgb(1.0, 0.0, 0.0));
    assert_eq!(Tracer::with_limits(&s, 0, RAY_EPSILON).trace(&ray, 0), Color::black());
}

#[test]
fn mirror_reflects_what_is_behind_the_eye() {
    let s = scene("
        material { name = mirror  ks = (1, 1, 1)  shiny = 50 }
        material { name = green  ka = (0, 1, 0) }
        sphere { material = mirror }
        translate { (0, 0, 10) }
        scale { (10, 10, 0.1) }
        box { material = green }
    ");

    let c = Tracer::new(&s).trace(&down_z_from(5.0), 0);
    assert_eq!(c, Color::rgb(0.0, 1.0, 0.0));
}

#[test]
fn transparent_shapes_cast_shadows() {
    let s = scene("
        material { name = glass  kt = (1, 1, 1) }
        light { position = (0, 0, 10) }
        sphere { }
        translate { (0, 0, 7) }
        scale { (0.5, 0.5, 0.5) }
        sphere { material = glass }
    ");

    let t = Tracer::new(&s);
    let p = Tuple4D::point(0.0, 0.0, 1.0);
    assert!(t.is_shadowed(p, Tuple4D::vector(0.0, 0.0, 1.0), 9.0));
    assert!(!t.is_shadowed(p, Tuple4D::vector(0.0, 0.0, 1.0), 5.0));
}

#[test]
fn checker_tints_ambient_and_diffuse() {
    let board = "
        material { name = board  ka = (1, 1, 1)  kd = (1, 1, 1)  checker = (1, 0, 0) (0, 0, 1) 2 1 }
        box { material = board }
    ";
    let at = |x: f64| Ray::new(Tuple4D::point(x, 0.2, 5.0), Tuple4D::vector(0.0, 0.0, -1.0));

    // Unlit, only the ambient term remains.
    let dark = scene(board);
    let t = Tracer::new(&dark);
    assert_eq!(t.trace(&at(-0.5), 0), Color::rgb(1.0, 0.0, 0.0));
    assert_eq!(t.trace(&at(0.5), 0), Color::rgb(0.0, 0.0, 1.0));

    let lit = scene(&format!("light {{ position = (0, 0, 10) }} {}", board));
    let c = Tracer::new(&lit).trace(&at(-0.5), 0);
    assert!(c.r > 1.0);
    assert_eq!((c.g, c.b), (0.0, 0.0));
}
