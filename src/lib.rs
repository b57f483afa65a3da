pub mod consts;
pub mod error;
pub mod config;

pub mod tuple;
pub mod matrix;
pub mod ray;
pub mod intersect;
pub mod shape;

pub mod color;
pub mod texture;
pub mod material;
pub mod light;
pub mod camera;

pub mod scene;
pub mod lexer;
pub mod parser;

pub mod tracer;
pub mod canvas;
pub mod parallel;

use consts::FEQ_EPSILON;

/// Approximate floating point equality, used by the `PartialEq` impls of the
/// geometric types.
pub fn feq(left: f64, right: f64) -> bool {
    (left - right).abs() < FEQ_EPSILON
}
