use log::debug;

use crate::ray::Ray;
use crate::tuple::Tuple4D;
use crate::matrix::Matrix4D;
use crate::color::Color;
use crate::canvas::Canvas;
use crate::tracer::Tracer;
use crate::consts::DEFAULT_FOVY;
use crate::error::GeometryError;
use crate::config::within_pixel_budget;

/// Camera parameters as declared in a scene file.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraSpec {
    pub name: String,
    pub eye: Tuple4D,
    pub center: Tuple4D,
    pub up: Tuple4D,

    /// Vertical field of view, in degrees.
    pub fovy: f64,

    /// Color of primary rays which hit nothing.
    pub background: Color,

    /// Preferred output size, if the scene asks for one.
    pub resolution: Option<(usize, usize)>,
}

impl Default for CameraSpec {
    fn default() -> CameraSpec {
        CameraSpec {
            name: String::new(),
            eye: Tuple4D::point(0.0, 0.0, 5.0),
            center: Tuple4D::origin(),
            up: Tuple4D::vector(0.0, 1.0, 0.0),
            fovy: DEFAULT_FOVY,
            background: Color::black(),
            resolution: None,
        }
    }
}

/// A pinhole camera bound to an output size.
///
/// The image plane sits one unit in front of the eye. Pixels are square, so
/// the horizontal extent follows from `fovy` and the aspect ratio.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub hsize: usize,
    pub vsize: usize,

    pub half_width: f64,
    pub half_height: f64,
    pub pixel_size: f64,

    pub background: Color,

    /// Camera-to-world matrix, the inverse of the view transform.
    to_world: Matrix4D,
}

impl Camera {
    pub fn new(spec: &CameraSpec, hsize: usize, vsize: usize)
        -> Result<Camera, GeometryError> {
        if hsize == 0 || vsize == 0 {
            return Err(GeometryError::DegenerateView("empty image"));
        }

        if !within_pixel_budget(hsize, vsize) {
            return Err(GeometryError::DegenerateView("image too large"));
        }

        if !(spec.fovy > 0.0 && spec.fovy < 180.0) {
            return Err(GeometryError::DegenerateView("field of view out of range"));
        }

        let view = Matrix4D::view_transform(spec.eye, spec.center, spec.up)?;
        let to_world = view.inverse().ok_or(GeometryError::SingularMatrix)?;

        let half_height = (spec.fovy.to_radians() / 2.0).tan();
        let aspect = (hsize as f64) / (vsize as f64);
        let half_width = half_height * aspect;
        let pixel_size = half_height * 2.0 / (vsize as f64);

        debug!("camera {}x{} fovy {} from {:?}", hsize, vsize, spec.fovy, spec.eye);

        Ok(Camera {
            hsize,
            vsize,
            half_width,
            half_height,
            pixel_size,
            background: spec.background,
            to_world,
        })
    }

    /// The primary ray through the center of pixel `(px, py)`; `(0, 0)` is
    /// the top-left corner.
    pub fn ray_for_pixel(&self, px: usize, py: usize) -> Ray {
        let xoffset = (px as f64 + 0.5) * self.pixel_size;
        let yoffset = (py as f64 + 0.5) * self.pixel_size;

        // Camera space looks down -z with +x to the right.
        let camera_x = xoffset - self.half_width;
        let camera_y = self.half_height - yoffset;

        let pixel = self.to_world * Tuple4D::point(camera_x, camera_y, -1.0);
        let origin = self.to_world * Tuple4D::origin();

        Ray::new(origin, (pixel - origin).normalize())
    }

    /// Renders on the calling thread. See `parallel::render` for the pooled
    /// version.
    pub fn render(&self, tracer: &Tracer) -> Canvas {
        let mut image = Canvas::new(self.hsize, self.vsize);

        for y in 0..self.vsize {
            for x in 0..self.hsize {
                let color = tracer.primary(&self.ray_for_pixel(x, y), self.background);
                image.write_pixel(x, y, &color);
            }
        }

        image
    }
}

#[cfg(test)]
fn looking_down_z() -> CameraSpec {
    CameraSpec {
        eye: Tuple4D::origin(),
        center: Tuple4D::point(0.0, 0.0, -1.0),
        fovy: 90.0,
        ..Default::default()
    }
}

#[test]
fn pixel_size_for_landscape_canvas() {
    let c = Camera::new(&looking_down_z(), 200, 100).unwrap();

    assert!(crate::feq(c.half_height, 1.0));
    assert!(crate::feq(c.half_width, 2.0));
    assert!(crate::feq(c.pixel_size, 0.02));
}

#[test]
fn ray_through_center() {
    let c = Camera::new(&looking_down_z(), 201, 101).unwrap();
    let r = c.ray_for_pixel(100, 50);

    assert_eq!(r.origin, Tuple4D::point(0.0, 0.0, 0.0));
    assert_eq!(r.direction, Tuple4D::vector(0.0, 0.0, -1.0));
}

#[test]
fn ray_through_top_left_corner() {
    let c = Camera::new(&looking_down_z(), 2, 2).unwrap();
    let r = c.ray_for_pixel(0, 0);

    assert_eq!(r.direction, Tuple4D::vector(-0.5, 0.5, -1.0).normalize());
}

#[test]
fn ray_when_camera_moved() {
    let spec = CameraSpec {
        eye: Tuple4D::point(0.0, 2.0, -5.0),
        center: Tuple4D::point(0.0, 2.0, 0.0),
        fovy: 90.0,
        ..Default::default()
    };
    let c = Camera::new(&spec, 11, 11).unwrap();
    let r = c.ray_for_pixel(5, 5);

    assert_eq!(r.origin, Tuple4D::point(0.0, 2.0, -5.0));
    assert_eq!(r.direction, Tuple4D::vector(0.0, 0.0, 1.0));

    // Looking down +z, image-right is world -x.
    let right = c.ray_for_pixel(10, 5);
    assert!(right.direction.x < 0.0);
}

#[test]
fn degenerate_cameras_are_rejected() {
    let spec = CameraSpec { center: Tuple4D::point(0.0, 0.0, 5.0), ..Default::default() };
    assert!(Camera::new(&spec, 10, 10).is_err());

    assert!(Camera::new(&CameraSpec::default(), 0, 10).is_err());

    let wide = CameraSpec { fovy: 180.0, ..Default::default() };
    assert!(Camera::new(&wide, 10, 10).is_err());

    assert!(Camera::new(&CameraSpec::default(), usize::MAX, 2).is_err());
}
