use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Degenerate geometry detected while a scene is being set up.
///
/// These are raised eagerly so that NaNs never reach the shading code.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("transform matrix is singular (degenerate scale?)")]
    SingularMatrix,

    #[error("rotation axis has zero length")]
    ZeroAxis,

    #[error("light direction has zero length")]
    ZeroDirection,

    #[error("degenerate camera view: {0}")]
    DegenerateView(&'static str),
}

/// Misuse of the `up`/`down` hierarchy commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("cannot use 'down' without creating a child object first")]
    NoChild,

    #[error("hierarchy underflow")]
    Underflow,
}

/// A fatal problem in a scene description. Every variant except `Io` knows
/// the line it was raised on.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("could not read scene file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: {source}")]
    Degenerate {
        line: usize,
        #[source]
        source: GeometryError,
    },

    #[error("line {line}: {source}")]
    Hierarchy {
        line: usize,
        #[source]
        source: HierarchyError,
    },

    #[error("line {line}: unknown material '{name}'")]
    UnknownMaterial { line: usize, name: String },
}

impl ParseError {
    pub fn syntax<S: Into<String>>(line: usize, message: S) -> ParseError {
        ParseError::Syntax { line, message: message.into() }
    }

    /// The scene file line the error refers to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Io { .. } => None,
            ParseError::Syntax { line, .. }
                | ParseError::Degenerate { line, .. }
                | ParseError::Hierarchy { line, .. }
                | ParseError::UnknownMaterial { line, .. } => Some(*line),
        }
    }
}

/// Result type for scene parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// A missing or unreadable external resource. Never fatal: the owner logs it
/// and carries on without the resource.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("could not load texture {}: {source}", path.display())]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("texture {} has no pixels", path.display())]
    EmptyImage { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed config file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level error for loading and rendering a scene.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not write image: {0}")]
    Io(#[from] io::Error),

    #[error("could not encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("render worker failed: {0}")]
    Worker(String),

    #[error("render cancelled")]
    Cancelled,
}

#[test]
fn parse_errors_report_their_line() {
    let e = ParseError::syntax(12, "expected '{'");
    assert_eq!(e.line(), Some(12));
    assert_eq!(e.to_string(), "line 12: expected '{'");

    let e = ParseError::Degenerate { line: 3, source: GeometryError::SingularMatrix };
    assert_eq!(e.line(), Some(3));
    assert!(e.to_string().starts_with("line 3: transform matrix is singular"));
}

#[test]
fn io_errors_have_no_line() {
    let e = ParseError::Io {
        path: PathBuf::from("missing.scn"),
        source: io::Error::new(io::ErrorKind::NotFound, "not found"),
    };
    assert_eq!(e.line(), None);
}
