use std::path::{ Path, PathBuf };

use crate::color::Color;
use crate::error::ResourceError;

/// A procedural checkerboard in texture space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Checker {
    pub color1: Color,
    pub color2: Color,
    pub u_scale: f64,
    pub v_scale: f64,
}

impl Checker {
    pub fn new(color1: Color, color2: Color, u_scale: f64, v_scale: f64) -> Checker {
        Checker { color1, color2, u_scale, v_scale }
    }

    /// Squares whose cell indices sum to an even number take `color1`.
    pub fn color_at(&self, u: f64, v: f64) -> Color {
        let cell = (u * self.u_scale).floor() + (v * self.v_scale).floor();

        if (cell as i64).rem_euclid(2) == 0 {
            self.color1
        } else {
            self.color2
        }
    }
}

/// A decoded RGB image, stored bottom row first so that `v == 0` addresses
/// the bottom of the picture.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl Raster {
    /// Wraps pixels given bottom row first.
    pub fn new(width: usize, height: usize, pixels: Vec<Color>) -> Option<Raster> {
        if width == 0 || height == 0 || pixels.len() != width * height {
            return None;
        }

        Some(Raster { width, height, pixels })
    }

    /// Decodes any format the `image` crate understands (PPM, PNG, ...).
    pub fn load(path: &Path) -> Result<Raster, ResourceError> {
        let img = image::open(path)
            .map_err(|source| ResourceError::Texture { path: path.to_path_buf(), source })?
            .to_rgb8();

        let (width, height) = (img.width() as usize, img.height() as usize);

        // Image rows run top to bottom; flip them.
        let pixels = img.rows().rev()
            .flat_map(|row| row.map(|p| Color::from_bytes(p.0)))
            .collect();

        Raster::new(width, height, pixels)
            .ok_or_else(|| ResourceError::EmptyImage { path: path.to_path_buf() })
    }

    fn pixel(&self, x: usize, y: usize) -> Color {
        self.pixels[y * self.width + x]
    }

    /// Bilinear sample at `(u, v)` in `[0, 1]`.
    pub fn sample(&self, u: f64, v: f64) -> Color {
        let x = u.clamp(0.0, 1.0) * (self.width - 1) as f64;
        let y = v.clamp(0.0, 1.0) * (self.height - 1) as f64;

        let (x0, y0) = (x.floor() as usize, y.floor() as usize);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let (fx, fy) = (x - x0 as f64, y - y0 as f64);

        let bottom = self.pixel(x0, y0).lerp(&self.pixel(x1, y0), fx);
        let top = self.pixel(x0, y1).lerp(&self.pixel(x1, y1), fx);
        bottom.lerp(&top, fy)
    }
}

/// An image mapped onto a surface, repeated `u_scale` by `v_scale` times.
///
/// The raster is only present once `load` has succeeded.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageTexture {
    pub path: PathBuf,
    pub u_scale: f64,
    pub v_scale: f64,
    raster: Option<Raster>,
}

impl ImageTexture {
    pub fn new<P: Into<PathBuf>>(path: P, u_scale: f64, v_scale: f64) -> ImageTexture {
        ImageTexture { path: path.into(), u_scale, v_scale, raster: None }
    }

    pub fn with_raster(mut self, raster: Raster) -> ImageTexture {
        self.raster = Some(raster);
        self
    }

    /// Reads the image, resolving a relative path against `base_dir`.
    pub fn load(&mut self, base_dir: &Path) -> Result<(), ResourceError> {
        let path = if self.path.is_relative() {
            base_dir.join(&self.path)
        } else {
            self.path.clone()
        };

        self.raster = Some(Raster::load(&path)?);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.raster.is_some()
    }

    /// The texture color at `(u, v)`, or `None` if nothing was loaded.
    pub fn color_at(&self, u: f64, v: f64) -> Option<Color> {
        let raster = self.raster.as_ref()?;
        let su = (u * self.u_scale).rem_euclid(1.0);
        let sv = (v * self.v_scale).rem_euclid(1.0);

        Some(raster.sample(su, sv))
    }
}

#[test]
fn checker_parity() {
    let c = Checker::new(Color::white(), Color::black(), 4.0, 2.0);

    assert_eq!(c.color_at(0.1, 0.1), Color::white());
    assert_eq!(c.color_at(0.3, 0.1), Color::black());
    assert_eq!(c.color_at(0.3, 0.6), Color::white());
    assert_eq!(c.color_at(0.1, 0.6), Color::black());
}

#[test]
fn checker_handles_negative_cells() {
    let c = Checker::new(Color::white(), Color::black(), 1.0, 1.0);
    assert_eq!(c.color_at(-0.5, 0.5), Color::black());
}

#[cfg(test)]
fn two_by_two() -> Raster {
    // bottom row: red, green; top row: blue, white
    Raster::new(2, 2, vec![
        Color::rgb(1.0, 0.0, 0.0), Color::rgb(0.0, 1.0, 0.0),
        Color::rgb(0.0, 0.0, 1.0), Color::white(),
    ]).unwrap()
}

#[test]
fn raster_bilinear_sampling() {
    let r = two_by_two();

    assert_eq!(r.sample(0.0, 0.0), Color::rgb(1.0, 0.0, 0.0));
    assert_eq!(r.sample(1.0, 1.0), Color::white());
    assert_eq!(r.sample(0.5, 0.0), Color::rgb(0.5, 0.5, 0.0));
    assert_eq!(r.sample(0.5, 0.5), Color::rgb(0.5, 0.5, 0.5));
}

#[test]
fn raster_rejects_bad_dimensions() {
    assert!(Raster::new(0, 1, vec![]).is_none());
    assert!(Raster::new(2, 2, vec![Color::black()]).is_none());
}

#[test]
fn image_texture_repeats() {
    let t = ImageTexture::new("unused.ppm", 2.0, 1.0).with_raster(two_by_two());

    assert_eq!(t.color_at(0.0, 0.0), t.color_at(0.5, 0.0));
    assert_eq!(t.color_at(0.25, 0.0), Some(Color::rgb(0.5, 0.5, 0.0)));
}

#[test]
fn unloaded_texture_has_no_color() {
    let mut t = ImageTexture::new("definitely/not/here.ppm", 1.0, 1.0);

    assert!(t.load(Path::new(".")).is_err());
    assert!(!t.is_loaded());
    assert_eq!(t.color_at(0.5, 0.5), None);
}
