use std::path::Path;

use log::{ debug, warn };

use crate::color::Color;
use crate::consts::{ DEFAULT_AMBIENT, DEFAULT_DIFFUSE, VACUUM_RI };
use crate::texture::{ Checker, ImageTexture };

/// Surface response coefficients, shared between shapes by name.
///
/// `ka`, `kd`, `ks` and `kt` weight the ambient, diffuse, specular (and
/// mirror reflection) and transmitted terms respectively. A texture, if any,
/// modulates the ambient and diffuse terms.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,

    pub ka: Color,
    pub kd: Color,
    pub ks: Color,
    pub kt: Color,

    /// Index of refraction of the material's interior.
    pub index: f64,

    /// Phong exponent.
    pub shiny: f64,

    pub checker: Option<Checker>,
    pub image: Option<ImageTexture>,
}

impl Default for Material {
    fn default() -> Material {
        Material {
            name: String::new(),
            ka: Color::black(),
            kd: Color::black(),
            ks: Color::black(),
            kt: Color::black(),
            index: VACUUM_RI,
            shiny: 1.0,
            checker: None,
            image: None,
        }
    }
}

impl Material {
    /// The material of shapes which don't name one: dull and grey-white.
    pub fn fallback() -> Material {
        Material {
            ka: Color::white() * DEFAULT_AMBIENT,
            kd: Color::white() * DEFAULT_DIFFUSE,
            ..Default::default()
        }
    }

    /// No specular term, hence no reflection rays either.
    pub fn is_matte(&self) -> bool {
        self.ks.is_black()
    }

    /// No transmission, hence no refraction rays either.
    pub fn is_opaque(&self) -> bool {
        self.kt.is_black()
    }

    /// Texture color at `(u, v)`, or `None` for an untextured surface.
    ///
    /// A checker wins over an image if both are configured.
    pub fn texture_color(&self, u: f64, v: f64) -> Option<Color> {
        if let Some(checker) = &self.checker {
            return Some(checker.color_at(u, v));
        }

        self.image.as_ref().and_then(|img| img.color_at(u, v))
    }

    /// Loads image textures relative to `base_dir`.
    ///
    /// Unreadable images are dropped with a warning and the material renders
    /// untextured.
    pub fn setup(&mut self, base_dir: &Path) {
        if self.checker.is_some() && self.image.is_some() {
            warn!("material '{}' has both a checker and an image texture; \
                using the checker", self.name);
        }

        let failed = match self.image.as_mut() {
            Some(img) if !img.is_loaded() => match img.load(base_dir) {
                Ok(()) => {
                    debug!("loaded texture {} for material '{}'",
                        img.path.display(), self.name);
                    false
                },
                Err(e) => {
                    warn!("{}; material '{}' will render untextured", e, self.name);
                    true
                },
            },
            _ => false,
        };

        if failed {
            self.image = None;
        }
    }
}

#[test]
fn fallback_material_coefficients() {
    let m = Material::fallback();

    assert_eq!(m.ka, Color::rgb(0.2, 0.2, 0.2));
    assert_eq!(m.kd, Color::rgb(0.8, 0.8, 0.8));
    assert!(m.is_matte());
    assert!(m.is_opaque());
}

#[test]
fn matte_and_opaque_follow_coefficients() {
    let m = Material {
        ks: Color::rgb(0.0, 0.1, 0.0),
        kt: Color::rgb(0.5, 0.5, 0.5),
        ..Default::default()
    };

    assert!(!m.is_matte());
    assert!(!m.is_opaque());
}

#[test]
fn checker_takes_priority_over_image() {
    use crate::texture::Raster;

    let raster = Raster::new(1, 1, vec![Color::rgb(0.0, 0.0, 1.0)]).unwrap();
    let mut m = Material {
        checker: Some(Checker::new(Color::white(), Color::black(), 1.0, 1.0)),
        image: Some(ImageTexture::new("x.ppm", 1.0, 1.0).with_raster(raster)),
        ..Default::default()
    };

    assert_eq!(m.texture_color(0.5, 0.5), Some(Color::white()));

    m.checker = None;
    assert_eq!(m.texture_color(0.5, 0.5), Some(Color::rgb(0.0, 0.0, 1.0)));
}

#[test]
fn missing_texture_degrades_to_untextured() {
    let mut m = Material {
        name: "wood".to_string(),
        kd: Color::white(),
        image: Some(ImageTexture::new("no/such/wood.ppm", 1.0, 1.0)),
        ..Default::default()
    };

    m.setup(Path::new("."));
    assert!(m.image.is_none());
    assert_eq!(m.texture_color(0.3, 0.3), None);
}
