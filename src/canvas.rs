use std::io;
use std::io::{ BufWriter, Write };
use std::fs::File;
use std::path::Path;

use image::{ Rgb, RgbImage };
use log::info;

use crate::color::Color;
use crate::error::TraceError;

/// A canvas for drawing pixels.
///
/// The canvas stores the linear colors the tracer computes for each pixel,
/// row 0 at the top. Gamma encoding and clamping only happen on output.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Canvas {
    /// The width of the canvas, in pixels.
    pub width: usize,

    /// The height of the canvas, in pixels.
    pub height: usize,

    /// The pixels of the canvas, stored as a flattened vector.
    pixels: Vec<Color>,
}

impl Canvas {
    /// Creates a black canvas with specified width and height.
    pub fn new(width: usize, height: usize) -> Canvas {
        Canvas {
            width,
            height,
            pixels: vec![Color::black(); width * height]
        }
    }

    /// Saves the canvas, choosing the format from the file extension.
    ///
    /// `.ppm` files are written as binary PPM; anything else goes through
    /// the `image` crate's encoders (PNG, BMP, ...).
    pub fn save<P: AsRef<Path>>(&self, path: P, gamma: f64) -> Result<(), TraceError> {
        let path = path.as_ref();
        let is_ppm = path.extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("ppm"));

        if is_ppm {
            let mut out = BufWriter::new(File::create(path)?);
            self.write_ppm(&mut out, gamma)?;
            out.flush()?;
        } else {
            self.to_image(gamma).save(path)?;
        }

        info!("saved {}x{} image to {}", self.width, self.height, path.display());
        Ok(())
    }

    /// Writes a binary (`P6`) PPM, rows top to bottom.
    pub fn write_ppm<W: Write>(&self, out: &mut W, gamma: f64) -> io::Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;

        for pixel in self.pixels.iter() {
            out.write_all(&pixel.to_bytes(gamma))?;
        }

        Ok(())
    }

    /// Encodes the canvas as 8-bit RGB.
    pub fn to_image(&self, gamma: f64) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            Rgb(self.pixels[y as usize * self.width + x as usize].to_bytes(gamma))
        })
    }

    /// Writes a color to a location on the `Canvas`.
    ///
    /// Out-of-bounds pixels are ignored. `x` is the column and `y` the row,
    /// both zero-indexed.
    pub fn write_pixel(&mut self, x: usize, y: usize, pixel: &Color) {
        // Silently ignore out-of-bounds pixels
        if x >= self.width || y >= self.height {
            return;
        }

        self.pixels[(y * self.width) + x] = *pixel;
    }

    /// Copies a full row of pixels into place.
    pub fn write_row(&mut self, y: usize, row: &[Color]) {
        if y >= self.height || row.len() != self.width {
            return;
        }

        let start = y * self.width;
        self.pixels[start..start + self.width].copy_from_slice(row);
    }

    /// Reads a color from a location on the `Canvas`, or `None` when out of
    /// bounds.
    pub fn read_pixel(&self, x: usize, y: usize) -> Option<Color> {
        // Return nothing if pixel is out-of-bounds
        if x >= self.width || y >= self.height {
            return None
        }

        Some(self.pixels[(y * self.width) + x])
    }
}

#[test]
fn new_canvas_is_black() {
    let c = Canvas::new(10, 20);

    assert_eq!(c.read_pixel(9, 19), Some(Color::black()));
    assert_eq!(c.read_pixel(10, 0), None);
}

#[test]
fn write_and_read_pixel() {
    let purple = Color::rgb(1.0, 0.0, 1.0);
    let mut c = Canvas::new(8, 8);

    c.write_pixel(4, 2, &purple);
    c.write_pixel(8, 8, &purple);

    assert_eq!(c.read_pixel(4, 2), Some(purple));
    assert_eq!(c.read_pixel(2, 4), Some(Color::black()));
}

#[test]
fn rows_land_in_place() {
    let mut c = Canvas::new(3, 2);
    let red = Color::rgb(1.0, 0.0, 0.0);

    c.write_row(1, &[red; 3]);
    c.write_row(0, &[red; 2]);

    assert_eq!(c.read_pixel(2, 1), Some(red));
    assert_eq!(c.read_pixel(0, 0), Some(Color::black()));
}

#[test]
fn ppm_header_and_bytes() {
    let mut c = Canvas::new(2, 1);
    c.write_pixel(0, 0, &Color::rgb(1.5, 0.0, -0.5));
    c.write_pixel(1, 0, &Color::rgb(0.0, 1.0, 0.0));

    let mut out = Vec::new();
    c.write_ppm(&mut out, 1.0).unwrap();

    let mut expected = b"P6\n2 1\n255\n".to_vec();
    expected.extend_from_slice(&[255, 0, 0, 0, 255, 0]);
    assert_eq!(out, expected);
}

#[test]
fn image_conversion_is_row_major() {
    let mut c = Canvas::new(2, 2);
    c.write_pixel(1, 0, &Color::white());

    let img = c.to_image(2.4);
    assert_eq!(img.get_pixel(1, 0), &Rgb([255, 255, 255]));
    assert_eq!(img.get_pixel(0, 1), &Rgb([0, 0, 0]));
}
