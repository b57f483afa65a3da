use std::fs;
use std::path::Path;

use log::{ debug, info, warn };

use crate::lexer::{ Lexer, Token, TokenKind };
use crate::tuple::Tuple4D;
use crate::matrix::Matrix4D;
use crate::color::Color;
use crate::shape::{ Shape, ShapeKind };
use crate::material::Material;
use crate::texture::{ Checker, ImageTexture };
use crate::light::Light;
use crate::camera::CameraSpec;
use crate::scene::{ Scene, SceneBuilder };
use crate::config::within_pixel_budget;
use crate::consts::MAX_PIXELS;
use crate::error::{ ParseError, ParseResult };

/// What one object block in a scene file produces.
#[derive(Clone, Debug)]
pub enum SceneObject {
    Material(Material),
    Light(Light),
    Shape(Shape),
    Camera(CameraSpec),
}

type Factory = fn(&mut Parser<'_>, usize) -> ParseResult<SceneObject>;
type Command = fn(&mut Parser<'_>, usize) -> ParseResult<()>;

/// Object keywords and the readers that build them. The `usize` is the line
/// the keyword was found on.
const OBJECT_TYPES: &[(&str, Factory)] = &[
    ("material", |p, line| p.read_material(line)),
    ("light", |p, line| p.read_light(line)),
    ("sphere", |p, line| p.read_shape(ShapeKind::Sphere, line)),
    ("cylinder", |p, line| p.read_shape(ShapeKind::Cylinder, line)),
    ("cone", |p, line| p.read_shape(ShapeKind::Cone, line)),
    ("box", |p, line| p.read_shape(ShapeKind::Box, line)),
    ("camera", |p, line| p.read_camera(line)),
];

/// Transform stack and hierarchy commands, each written `name { ... }`.
const COMMANDS: &[(&str, Command)] = &[
    ("push", |p, _| {
        p.builder.stack_mut().push(None);
        Ok(())
    }),
    ("pop", |p, line| {
        p.builder.stack_mut().pop()
            .map(|_| ())
            .ok_or_else(|| ParseError::syntax(line, "transform stack underflow"))
    }),
    ("identity", |p, _| {
        p.builder.stack_mut().set_identity();
        Ok(())
    }),
    ("translate", |p, _| {
        let v = p.read_vector()?;
        p.builder.stack_mut().apply(Matrix4D::translation(v.x, v.y, v.z));
        Ok(())
    }),
    ("rotate", |p, line| {
        let degrees = p.read_double()?;
        let axis = p.read_vector()?;
        let m = Matrix4D::rotation(degrees, axis)
            .map_err(|source| ParseError::Degenerate { line, source })?;
        p.builder.stack_mut().apply(m);
        Ok(())
    }),
    ("scale", |p, _| {
        let v = p.read_vector()?;
        p.builder.stack_mut().apply(Matrix4D::scaling(v.x, v.y, v.z));
        Ok(())
    }),
    ("up", |p, line| p.builder.up(line)),
    ("down", |p, line| p.builder.down(line)),
];

/// How a parameter value is read and stored into the object being built.
enum Setter<T> {
    Str(fn(&mut T, String)),
    Double(fn(&mut T, f64)),
    Vector(fn(&mut T, Tuple4D)),
    Point(fn(&mut T, Tuple4D)),

    /// Reads its own value from the token stream.
    Special(fn(&mut Parser<'_>, &mut T) -> ParseResult<()>),
}

type ParamSpec<T> = (&'static str, Setter<T>);

const MATERIAL_PARAMS: &[ParamSpec<Material>] = &[
    ("name", Setter::Str(|m, s| m.name = s)),
    ("ka", Setter::Vector(|m, v| m.ka = Color::from(v))),
    ("kd", Setter::Vector(|m, v| m.kd = Color::from(v))),
    ("ks", Setter::Vector(|m, v| m.ks = Color::from(v))),
    ("kt", Setter::Vector(|m, v| m.kt = Color::from(v))),
    ("index", Setter::Double(|m, x| m.index = x)),
    ("shiny", Setter::Double(|m, x| m.shiny = x)),
    ("texture", Setter::Special(|p, m| p.read_texture(m))),
    ("checker", Setter::Special(|p, m| p.read_checker(m))),
];

const SHAPE_PARAMS: &[ParamSpec<Shape>] = &[
    ("name", Setter::Str(|s, name| s.name = name)),
    ("material", Setter::Str(|s, name| s.material_name = name)),
];

/// A light as written: a point light unless a direction is given.
struct LightDecl {
    name: String,
    position: Tuple4D,
    color: Color,
    direction: Option<Tuple4D>,
}

const LIGHT_PARAMS: &[ParamSpec<LightDecl>] = &[
    ("name", Setter::Str(|l, s| l.name = s)),
    ("position", Setter::Point(|l, p| l.position = p)),
    ("color", Setter::Vector(|l, v| l.color = Color::from(v))),
    ("direction", Setter::Vector(|l, v| l.direction = Some(v))),
];

const CAMERA_PARAMS: &[ParamSpec<CameraSpec>] = &[
    ("name", Setter::Str(|c, s| c.name = s)),
    ("eye", Setter::Point(|c, p| c.eye = p)),
    ("center", Setter::Point(|c, p| c.center = p)),
    ("up", Setter::Vector(|c, v| c.up = v)),
    ("fovy", Setter::Double(|c, x| c.fovy = x)),
    ("background", Setter::Vector(|c, v| c.background = Color::from(v))),
    ("resolution", Setter::Special(|p, c| p.read_resolution(c))),
];

/// Reads a scene description into a `Scene`.
///
/// The file is a sequence of object blocks (`sphere { material = red }`)
/// and transform commands (`translate { (0, 1, 0) }`). Shapes take the top
/// of the transform stack at the point they are declared, so order matters.
/// The first error aborts the whole load.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    pending: Option<Token>,
    line: usize,
    builder: SceneBuilder,
}

impl<'a> Parser<'a> {
    fn new<P: AsRef<Path>>(text: &'a str, base_dir: P) -> Parser<'a> {
        Parser {
            lexer: Lexer::new(text),
            pending: None,
            line: 1,
            builder: SceneBuilder::new(base_dir),
        }
    }

    /// Parses a scene file. Texture paths are resolved against the file's
    /// directory.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> ParseResult<Scene> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| ParseError::Io { path: path.to_path_buf(), source })?;

        info!("reading scene {}", path.display());

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Parser::parse_str(&text, base_dir)
    }

    /// Parses scene text held in memory.
    pub fn parse_str<P: AsRef<Path>>(text: &str, base_dir: P) -> ParseResult<Scene> {
        Parser::new(text, base_dir).parse()
    }

    fn parse(mut self) -> ParseResult<Scene> {
        while let Some(token) = self.next_token()? {
            let line = token.line;
            let word = match token.kind {
                TokenKind::Word(word) => word,
                other => return Err(ParseError::syntax(line,
                    format!("expected an object type or command, found {}", other))),
            };

            if let Some((_, factory)) = OBJECT_TYPES.iter().find(|(k, _)| *k == word) {
                let object = factory(&mut self, line)?;
                self.add(object, line)?;
                continue;
            }

            if let Some((_, command)) = COMMANDS.iter().find(|(k, _)| *k == word) {
                self.expect_symbol('{')?;
                command(&mut self, line)?;
                self.expect_symbol('}')?;
                continue;
            }

            return Err(ParseError::syntax(line,
                format!("unknown object type or command '{}'", word)));
        }

        if self.builder.stack().depth() > 1 {
            warn!("{} unmatched push at end of scene", self.builder.stack().depth() - 1);
        }

        self.builder.build()
    }

    fn add(&mut self, object: SceneObject, line: usize) -> ParseResult<()> {
        match object {
            SceneObject::Material(m) => {
                if m.name.is_empty() {
                    warn!("line {}: material has no name and cannot be used", line);
                }
                debug!("material '{}'", m.name);
                self.builder.add_material(m);
            },
            SceneObject::Light(l) => {
                debug!("light '{}'", l.name);
                self.builder.add_light(l);
            },
            SceneObject::Shape(s) => {
                self.builder.add_shape(s)?;
            },
            SceneObject::Camera(c) => {
                debug!("camera '{}'", c.name);
                self.builder.set_camera(c);
            },
        }

        Ok(())
    }

    /* Token stream */

    fn next_token(&mut self) -> ParseResult<Option<Token>> {
        let token = match self.pending.take() {
            Some(t) => Some(t),
            None => self.lexer.next().transpose()?,
        };

        if let Some(t) = &token {
            self.line = t.line;
        }

        Ok(token)
    }

    fn next_required(&mut self, expected: &str) -> ParseResult<Token> {
        let line = self.line;
        self.next_token()?.ok_or_else(|| ParseError::syntax(line,
            format!("unexpected end of file, expected {}", expected)))
    }

    fn unread(&mut self, token: Token) {
        self.pending = Some(token);
    }

    fn expect_symbol(&mut self, c: char) -> ParseResult<()> {
        let expected = format!("'{}'", c);
        let token = self.next_required(&expected)?;

        match token.kind {
            TokenKind::Symbol(s) if s == c => Ok(()),
            other => Err(ParseError::syntax(token.line,
                format!("expected {}, found {}", expected, other))),
        }
    }

    /// Reads `{ key = value ... }` into `target` using its parameter table.
    fn read_block<T>(&mut self, target: &mut T, params: &[ParamSpec<T>]) -> ParseResult<()> {
        self.expect_symbol('{')?;

        loop {
            let token = self.next_required("a parameter name or '}'")?;
            let key = match token.kind {
                TokenKind::Symbol('}') => return Ok(()),
                TokenKind::Word(ref key) => key,
                other => return Err(ParseError::syntax(token.line,
                    format!("expected a parameter name, found {}", other))),
            };

            let setter = params.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, s)| s)
                .ok_or_else(|| ParseError::syntax(token.line,
                    format!("unknown parameter '{}'", key)))?;

            self.expect_symbol('=')?;

            match setter {
                Setter::Str(set) => set(target, self.read_string()?),
                Setter::Double(set) => set(target, self.read_double()?),
                Setter::Vector(set) => set(target, self.read_vector()?),
                Setter::Point(set) => set(target, self.read_point()?),
                Setter::Special(read) => read(self, target)?,
            }
        }
    }

    /* Typed value readers */

    fn read_double(&mut self) -> ParseResult<f64> {
        let token = self.next_required("a number")?;
        match token.kind {
            TokenKind::Number(x) => Ok(x),
            other => Err(ParseError::syntax(token.line,
                format!("expected a number, found {}", other))),
        }
    }

    fn read_string(&mut self) -> ParseResult<String> {
        let token = self.next_required("a name")?;
        match token.kind {
            TokenKind::Word(s) | TokenKind::Str(s) => Ok(s),
            other => Err(ParseError::syntax(token.line,
                format!("expected a name, found {}", other))),
        }
    }

    /// Reads `( x y ... )` into `values`.
    fn read_tuple(&mut self, values: &mut [f64]) -> ParseResult<()> {
        self.expect_symbol('(')?;
        for v in values.iter_mut() {
            *v = self.read_double()?;
        }
        self.expect_symbol(')')
    }

    fn read_vec2(&mut self) -> ParseResult<[f64; 2]> {
        let mut v = [0.0; 2];
        self.read_tuple(&mut v)?;
        Ok(v)
    }

    fn read_vector(&mut self) -> ParseResult<Tuple4D> {
        let mut v = [0.0; 3];
        self.read_tuple(&mut v)?;
        Ok(Tuple4D::vector(v[0], v[1], v[2]))
    }

    fn read_point(&mut self) -> ParseResult<Tuple4D> {
        Ok(self.read_vector()?.as_point())
    }

    /// Runs `read` either bare or wrapped in its own `{ }`.
    fn maybe_braced<T, F>(&mut self, read: F) -> ParseResult<T>
        where F: FnOnce(&mut Parser<'a>) -> ParseResult<T> {
        let token = self.next_required("a value")?;
        if token.kind == TokenKind::Symbol('{') {
            let value = read(self)?;
            self.expect_symbol('}')?;
            Ok(value)
        } else {
            self.unread(token);
            read(self)
        }
    }

    /* Special readers */

    /// `texture = file uScale vScale`
    fn read_texture(&mut self, m: &mut Material) -> ParseResult<()> {
        let (path, u, v) = self.maybe_braced(|p| {
            Ok((p.read_string()?, p.read_double()?, p.read_double()?))
        })?;

        m.image = Some(ImageTexture::new(path, u, v));
        Ok(())
    }

    /// `checker = color1 color2 uScale vScale`
    fn read_checker(&mut self, m: &mut Material) -> ParseResult<()> {
        let checker = self.maybe_braced(|p| {
            let c1 = Color::from(p.read_vector()?);
            let c2 = Color::from(p.read_vector()?);
            Ok(Checker::new(c1, c2, p.read_double()?, p.read_double()?))
        })?;

        m.checker = Some(checker);
        Ok(())
    }

    /// `resolution = (width height)`
    fn read_resolution(&mut self, c: &mut CameraSpec) -> ParseResult<()> {
        let line = self.line;
        let [w, h] = self.read_vec2()?;

        if w < 1.0 || h < 1.0 || w.fract() != 0.0 || h.fract() != 0.0 {
            return Err(ParseError::syntax(line,
                format!("resolution must be two positive integers, found ({} {})", w, h)));
        }

        // Compare as floats first; `as usize` saturates.
        let limit = MAX_PIXELS as f64;
        if w > limit || h > limit || !within_pixel_budget(w as usize, h as usize) {
            return Err(ParseError::syntax(line,
                format!("resolution ({} {}) exceeds {} pixels", w, h, MAX_PIXELS)));
        }

        c.resolution = Some((w as usize, h as usize));
        Ok(())
    }

    /* Object factories */

    fn read_material(&mut self, _line: usize) -> ParseResult<SceneObject> {
        let mut m = Material::default();
        self.read_block(&mut m, MATERIAL_PARAMS)?;
        Ok(SceneObject::Material(m))
    }

    fn read_shape(&mut self, kind: ShapeKind, line: usize) -> ParseResult<SceneObject> {
        let mut s = Shape::new(kind);
        s.line = line;
        self.read_block(&mut s, SHAPE_PARAMS)?;
        Ok(SceneObject::Shape(s))
    }

    fn read_light(&mut self, line: usize) -> ParseResult<SceneObject> {
        let mut decl = LightDecl {
            name: String::new(),
            position: Tuple4D::origin(),
            color: Color::white(),
            direction: None,
        };
        self.read_block(&mut decl, LIGHT_PARAMS)?;

        let mut light = match decl.direction {
            Some(d) => Light::directional(decl.color, d)
                .map_err(|source| ParseError::Degenerate { line, source })?,
            None => Light::point(decl.color, decl.position),
        };
        light.name = decl.name;

        Ok(SceneObject::Light(light))
    }

    fn read_camera(&mut self, line: usize) -> ParseResult<SceneObject> {
        let mut c = CameraSpec::default();
        self.read_block(&mut c, CAMERA_PARAMS)?;

        // Reject unusable views here, where the line is still known.
        Matrix4D::view_transform(c.eye, c.center, c.up)
            .map_err(|source| ParseError::Degenerate { line, source })?;

        if !(c.fovy > 0.0 && c.fovy < 180.0) {
            return Err(ParseError::syntax(line,
                format!("fovy must be between 0 and 180 degrees, found {}", c.fovy)));
        }

        Ok(SceneObject::Camera(c))
    }
}

#[cfg(test)]
use crate::light::LightKind;
#[cfg(test)]
use crate::error::HierarchyError;

#[cfg(test)]
fn parse(text: &str) -> ParseResult<Scene> {
    Parser::parse_str(text, ".")
}

#[cfg(test)]
fn syntax_line(text: &str) -> usize {
    match parse(text) {
        Err(e) => e.line().unwrap(),
        Ok(_) => panic!("scene should not parse:\n{}", text),
    }
}

#[test]
fn reads_materials_and_shapes() {
    let scene = parse("
        # two materials, one shape each
        material { name = red  ka = (0.1, 0, 0)  kd = (0.9, 0, 0)  shiny = 20 }
        material {
            name = glass
            ks = (0.2, 0.2, 0.2)
            kt = (0.8, 0.8, 0.8)
            index = 1.52
        }
        sphere { name = ball  material = red }
        box { material = glass }
    ").unwrap();

    assert_eq!(scene.shapes.len(), 2);
    assert_eq!(scene.shapes[0].kind, ShapeKind::Sphere);
    assert_eq!(scene.shapes[0].name, "ball");
    assert_eq!(scene.shapes[1].kind, ShapeKind::Box);

    let red = scene.material_for(&scene.shapes[0]);
    assert_eq!(red.kd, Color::rgb(0.9, 0.0, 0.0));
    assert_eq!(red.shiny, 20.0);
    assert!(red.is_matte());

    let glass = scene.material_for(&scene.shapes[1]);
    assert!(!glass.is_opaque());
    assert_eq!(glass.index, crate::consts::GLASS_RI);
}

#[test]
fn reads_textures_bare_or_braced() {
    let scene = parse("
        material { name = a  checker = (1, 1, 1) (0, 0, 0) 4 2 }
        material { name = b  checker = { (1, 0, 0) (0, 0, 1) 1 1 } }
        material { name = c  texture = { wood.ppm 2 3 } }
        material { name = d  texture = \"my wood.png\" 1 1 }
    ").unwrap();

    let a = scene.material("a").unwrap().checker.unwrap();
    assert_eq!(a.u_scale, 4.0);
    assert_eq!(a.v_scale, 2.0);

    let b = scene.material("b").unwrap().checker.unwrap();
    assert_eq!(b.color2, Color::rgb(0.0, 0.0, 1.0));

    let c = scene.material("c").unwrap().image.as_ref().unwrap();
    assert_eq!(c.path, Path::new("wood.ppm"));
    assert_eq!((c.u_scale, c.v_scale), (2.0, 3.0));

    let d = scene.material("d").unwrap().image.as_ref().unwrap();
    assert_eq!(d.path, Path::new("my wood.png"));
}

#[test]
fn transforms_are_order_dependent() {
    let scene = parse("
        sphere { }
        scale { (2, 2, 2) }
        sphere { }
        translate { (1, 0, 0) }
        sphere { }
    ").unwrap();

    let m: Vec<Matrix4D> = scene.shapes.iter().map(|s| *s.transform().matrix()).collect();
    assert_eq!(m[0], Matrix4D::identity());
    assert_eq!(m[1], Matrix4D::scaling(2.0, 2.0, 2.0));
    assert_eq!(m[2], Matrix4D::scaling(2.0, 2.0, 2.0) * Matrix4D::translation(1.0, 0.0, 0.0));
}

#[test]
fn push_pop_scopes_transforms() {
    let scene = parse("
        translate { (0, 0, -5) }
        push { }
            rotate { 90 (0, 0, 1) }
            box { }
        pop { }
        cone { }
        identity { }
        cylinder { }
    ").unwrap();

    let t = Matrix4D::translation(0.0, 0.0, -5.0);
    assert_eq!(*scene.shapes[0].transform().matrix(), t * Matrix4D::rotation_z(std::f64::consts::FRAC_PI_2));
    assert_eq!(*scene.shapes[1].transform().matrix(), t);
    assert_eq!(*scene.shapes[2].transform().matrix(), Matrix4D::identity());
}

#[test]
fn lights_and_camera() {
    let scene = parse("
        light { name = key  position = (0, 5, 5)  color = (1, 0.5, 0.5) }
        light { direction = (0, -1, 0) }
        camera { eye = (0, 0, 10)  fovy = 60  background = (0.1, 0.1, 0.2)  resolution = (64, 32) }
    ").unwrap();

    assert_eq!(scene.lights.len(), 2);
    assert_eq!(scene.lights[0].name, "key");
    assert_eq!(scene.lights[0].kind, LightKind::Point(Tuple4D::point(0.0, 5.0, 5.0)));
    assert_eq!(scene.lights[1].kind, LightKind::Directional(Tuple4D::vector(0.0, -1.0, 0.0)));

    assert_eq!(scene.camera.eye, Tuple4D::point(0.0, 0.0, 10.0));
    assert_eq!(scene.camera.fovy, 60.0);
    assert_eq!(scene.camera.resolution, Some((64, 32)));
}

#[test]
fn last_camera_wins() {
    let scene = parse("camera { fovy = 30 } camera { fovy = 50 }").unwrap();
    assert_eq!(scene.camera.fovy, 50.0);
}

#[test]
fn hierarchy_commands() {
    let scene = parse("
        sphere { name = a }
        down { }
            sphere { name = c }
            down { }
            up { }
            sphere { name = d }
        up { }
        sphere { name = b }
    ").unwrap();

    assert_eq!(scene.graph.children(None), &[0, 3]);
    assert_eq!(scene.graph.children(Some(0)), &[1, 2]);
}

#[test]
fn hierarchy_misuse_reports_line() {
    match parse("sphere { }\nup { }") {
        Err(ParseError::Hierarchy { line, source }) => {
            assert_eq!(line, 2);
            assert_eq!(source, HierarchyError::Underflow);
        },
        _ => panic!("expected a hierarchy error"),
    }

    assert_eq!(syntax_line("\n\ndown { }"), 3);
}

#[test]
fn errors_carry_line_numbers() {
    // missing brace
    assert_eq!(syntax_line("sphere { }\nsphere\n"), 2);
    // unknown type
    assert_eq!(syntax_line("\ntorus { }"), 2);
    // malformed number
    assert_eq!(syntax_line("material {\n index = 1.2.3 }"), 2);
    // type mismatch
    assert_eq!(syntax_line("material {\n\n shiny = (1, 2, 3) }"), 3);
    // unknown parameter
    assert_eq!(syntax_line("sphere {\n radius = 2 }"), 2);
    // missing '='
    assert_eq!(syntax_line("sphere { material red }"), 1);
    // unclosed block at end of file
    assert_eq!(syntax_line("material { name = a\n\n"), 1);
    // popping the sentinel
    assert_eq!(syntax_line("push { } pop { }\npop { }"), 2);
}

#[test]
fn degenerate_geometry_is_fatal() {
    assert_eq!(syntax_line("scale { (1, 0, 1) }\n\nbox { }"), 3);
    assert_eq!(syntax_line("\nrotate { 30 (0, 0, 0) }"), 2);
    assert_eq!(syntax_line("light {\n direction = (0, 0, 0) }"), 1);
    assert_eq!(syntax_line("camera { eye = (0, 0, 0)  center = (0, 0, 0) }"), 1);
}

#[test]
fn oversized_resolution_is_rejected() {
    assert_eq!(syntax_line("sphere { }\ncamera {\n resolution = (100000000000, 100000000000) }"), 3);
    assert_eq!(syntax_line("camera { resolution = (10000, 10000) }"), 1);
    assert!(matches!(parse("camera { resolution = (1e30, 1) }"),
        Err(ParseError::Syntax { line: 1, .. })));

    let scene = parse("camera { resolution = (8192, 8192) }").unwrap();
    assert_eq!(scene.camera.resolution, Some((8192, 8192)));
}

#[test]
fn unknown_material_reported_at_shape() {
    match parse("material { name = a }\n\ncone { material = b }") {
        Err(ParseError::UnknownMaterial { line, name }) => {
            assert_eq!(line, 3);
            assert_eq!(name, "b");
        },
        _ => panic!("expected an unknown material"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let err = Parser::parse_file("no/such/scene.txt").err().unwrap();
    assert!(err.line().is_none());
}

#[test]
fn sample_scene_parses() {
    let scene = Parser::parse_file(concat!(env!("CARGO_MANIFEST_DIR"), "/scenes/showcase.scn"))
        .unwrap();

    assert_eq!(scene.shapes.len(), 5);
    assert_eq!(scene.lights.len(), 2);
    assert_eq!(scene.camera.name, "main");
    assert!(scene.base_dir.ends_with("scenes"));

    // The spire was declared one level below the pillar.
    let spire = scene.shapes.iter().position(|s| s.name == "spire").unwrap();
    let pillar = scene.shapes.iter().position(|s| s.name == "pillar").unwrap();
    assert_eq!(scene.graph.parent(spire), Some(pillar));

    // Its apex points up, away from the pillar top.
    let t = scene.shapes[spire].transform();
    let apex = t.point_to_world(Tuple4D::point(0.0, 0.0, 0.0));
    let base = t.point_to_world(Tuple4D::point(0.0, 0.0, 1.0));
    assert!(apex.y > base.y);
}
