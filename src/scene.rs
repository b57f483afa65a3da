use std::collections::HashMap;
use std::path::{ Path, PathBuf };

use log::{ debug, info, warn };

use crate::ray::Ray;
use crate::shape::Shape;
use crate::intersect::Hit;
use crate::material::Material;
use crate::light::Light;
use crate::camera::CameraSpec;
use crate::matrix::MatrixStack;
use crate::error::{ HierarchyError, ParseError, ParseResult };

/// Index of a shape, both in `Scene::shapes` and in the `SceneGraph`.
pub type NodeId = usize;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// The object hierarchy built by the `up` and `down` commands.
///
/// Nodes live in an arena indexed like the scene's shape list. Every node
/// owns a child list, and so does the root. The cursor names the owner of
/// the list new shapes are added to (`None` for the root list).
///
/// The hierarchy only records structure; shape transforms come from the
/// matrix stack and are not inherited through it.
#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    level: Option<NodeId>,
}

impl SceneGraph {
    pub fn new() -> SceneGraph {
        Default::default()
    }

    /// Appends a node to the current level and returns its id.
    pub fn add(&mut self) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node { parent: self.level, children: Vec::new() });

        match self.level {
            Some(owner) => self.nodes[owner].children.push(id),
            None => self.roots.push(id),
        }

        id
    }

    /// Descends into the child list of the last node added at this level.
    pub fn down(&mut self) -> Result<(), HierarchyError> {
        let last = *self.children(self.level).last().ok_or(HierarchyError::NoChild)?;
        self.level = Some(last);
        Ok(())
    }

    /// Leaves the current child list.
    ///
    /// This is two hops in the graph: from the list to the node owning it,
    /// then from that node to the list that contains it. So after `down`
    /// into the children of `C`, `up` lands on the list holding `C` and its
    /// siblings. Fails at the root.
    pub fn up(&mut self) -> Result<(), HierarchyError> {
        let owner = self.level.ok_or(HierarchyError::Underflow)?;
        self.level = self.nodes[owner].parent;
        Ok(())
    }

    /// Owner of the current child list, `None` at the root.
    pub fn level(&self) -> Option<NodeId> {
        self.level
    }

    /// The child list owned by `owner`, or the root list.
    pub fn children(&self, owner: Option<NodeId>) -> &[NodeId] {
        match owner {
            Some(id) => &self.nodes[id].children,
            None => &self.roots,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Everything needed to render: shapes, shared materials, lights and the
/// camera. Read-only once built.
#[derive(Clone, Debug)]
pub struct Scene {
    pub shapes: Vec<Shape>,
    pub graph: SceneGraph,
    pub materials: Vec<Material>,
    pub lights: Vec<Light>,
    pub camera: CameraSpec,

    /// Directory relative texture paths are resolved against.
    pub base_dir: PathBuf,

    fallback: Material,
}

impl Scene {
    /// The material a shape renders with.
    pub fn material_for(&self, shape: &Shape) -> &Material {
        shape.material
            .and_then(|i| self.materials.get(i))
            .unwrap_or(&self.fallback)
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name == name)
    }

    /// Loads textures. Must run before rendering; failures only degrade the
    /// affected materials.
    pub fn setup(&mut self) {
        for m in self.materials.iter_mut() {
            m.setup(&self.base_dir);
        }

        info!("scene ready: {} shapes, {} materials, {} lights",
            self.shapes.len(), self.materials.len(), self.lights.len());
    }

    /// The nearest hit past `min_t` over all shapes, with full surface
    /// fields and `shape` set.
    ///
    /// Candidates are found with cheap `t`-only queries; only the winner is
    /// queried again for its surface fields.
    pub fn closest_hit(&self, ray: &Ray, min_t: f64) -> Option<Hit> {
        let mut nearest: Option<(usize, f64)> = None;

        for (i, shape) in self.shapes.iter().enumerate() {
            if let Some(h) = shape.hit(ray, false, min_t) {
                if nearest.map_or(true, |(_, t)| h.t < t) {
                    nearest = Some((i, h.t));
                }
            }
        }

        let (index, _) = nearest?;
        let mut hit = self.shapes[index].hit(ray, true, min_t)?;
        hit.shape = Some(index);
        Some(hit)
    }

    /// True if anything is hit with `min_t < t < max_t`.
    pub fn occluded(&self, ray: &Ray, min_t: f64, max_t: f64) -> bool {
        self.shapes.iter()
            .filter_map(|s| s.hit(ray, false, min_t))
            .any(|h| h.t > min_t && h.t < max_t)
    }
}

/// Accumulates a scene while it is being read.
///
/// Owns the transform stack and the hierarchy cursor, neither of which
/// outlives parsing.
#[derive(Debug)]
pub struct SceneBuilder {
    stack: MatrixStack,
    graph: SceneGraph,
    shapes: Vec<Shape>,
    materials: Vec<Material>,
    material_index: HashMap<String, usize>,
    lights: Vec<Light>,
    camera: Option<CameraSpec>,
    base_dir: PathBuf,
}

impl SceneBuilder {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> SceneBuilder {
        SceneBuilder {
            stack: MatrixStack::new(),
            graph: SceneGraph::new(),
            shapes: Vec::new(),
            materials: Vec::new(),
            material_index: HashMap::new(),
            lights: Vec::new(),
            camera: None,
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn stack(&self) -> &MatrixStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut MatrixStack {
        &mut self.stack
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Adds a shape at the current hierarchy level, fixing its transform to
    /// the top of the matrix stack.
    pub fn add_shape(&mut self, mut shape: Shape) -> ParseResult<NodeId> {
        let line = shape.line;
        shape.set_transform(*self.stack.peek())
            .map_err(|source| ParseError::Degenerate { line, source })?;

        let id = self.graph.add();
        debug!("{} '{}' added as node {} under {:?}",
            shape.kind.keyword(), shape.name, id, self.graph.parent(id));

        self.shapes.push(shape);
        Ok(id)
    }

    /// Registers a material. A later material with the same name replaces
    /// the earlier one.
    pub fn add_material(&mut self, material: Material) {
        if let Some(&i) = self.material_index.get(&material.name) {
            warn!("material '{}' redefined; the last definition wins", material.name);
            self.materials[i] = material;
            return;
        }

        self.material_index.insert(material.name.clone(), self.materials.len());
        self.materials.push(material);
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// Sets the camera; the last one declared wins.
    pub fn set_camera(&mut self, camera: CameraSpec) {
        if self.camera.is_some() {
            warn!("more than one camera declared; using '{}'", camera.name);
        }

        self.camera = Some(camera);
    }

    pub fn down(&mut self, line: usize) -> ParseResult<()> {
        self.graph.down().map_err(|source| ParseError::Hierarchy { line, source })
    }

    pub fn up(&mut self, line: usize) -> ParseResult<()> {
        self.graph.up().map_err(|source| ParseError::Hierarchy { line, source })
    }

    /// Resolves material names and finishes the scene.
    ///
    /// Shapes may name materials declared after them. Naming a material that
    /// is never declared is an error at the shape's line.
    pub fn build(self) -> ParseResult<Scene> {
        let SceneBuilder {
            graph, mut shapes, materials, material_index, lights, camera, base_dir, ..
        } = self;

        for shape in shapes.iter_mut() {
            if shape.material_name.is_empty() {
                continue;
            }

            let index = material_index.get(&shape.material_name).ok_or_else(||
                ParseError::UnknownMaterial {
                    line: shape.line,
                    name: shape.material_name.clone(),
                }
            )?;
            shape.material = Some(*index);
        }

        let camera = camera.unwrap_or_else(|| {
            warn!("scene declares no camera; using the default view");
            CameraSpec::default()
        });

        if lights.is_empty() {
            warn!("scene declares no lights; only ambient light will be visible");
        }

        Ok(Scene {
            shapes,
            graph,
            materials,
            lights,
            camera,
            base_dir,
            fallback: Material::fallback(),
        })
    }
}

#[cfg(test)]
use crate::matrix::Matrix4D;
#[cfg(test)]
use crate::tuple::Tuple4D;

#[test]
fn down_requires_a_child() {
    let mut g = SceneGraph::new();
    assert_eq!(g.down(), Err(HierarchyError::NoChild));

    g.add();
    assert_eq!(g.down(), Ok(()));
    assert_eq!(g.down(), Err(HierarchyError::NoChild));
}

#[test]
fn up_at_root_underflows() {
    let mut g = SceneGraph::new();
    assert_eq!(g.up(), Err(HierarchyError::Underflow));
}

#[test]
fn up_returns_to_list_holding_the_owner() {
    let mut g = SceneGraph::new();
    let a = g.add();
    g.down().unwrap();
    let c = g.add();
    assert_eq!(g.parent(c), Some(a));

    // Into C's children and straight back out: the level holding C.
    g.down().unwrap();
    assert_eq!(g.level(), Some(c));
    g.up().unwrap();
    assert_eq!(g.level(), Some(a));
    assert_eq!(g.children(g.level()), &[c]);

    // One more and we're back at the root, beside A.
    g.up().unwrap();
    assert_eq!(g.level(), None);
    let b = g.add();
    assert_eq!(g.children(None), &[a, b]);
}

#[test]
fn down_enters_most_recent_sibling() {
    let mut g = SceneGraph::new();
    g.add();
    let second = g.add();

    g.down().unwrap();
    let child = g.add();
    assert_eq!(g.parent(child), Some(second));
}

#[test]
fn shapes_take_stack_top_at_declaration() {
    let mut b = SceneBuilder::new(".");
    let early = b.add_shape(Shape::sphere()).unwrap();

    b.stack_mut().apply(Matrix4D::translation(0.0, 3.0, 0.0));
    let late = b.add_shape(Shape::sphere()).unwrap();

    let scene = b.build().unwrap();
    assert_eq!(*scene.shapes[early].transform().matrix(), Matrix4D::identity());
    assert_eq!(*scene.shapes[late].transform().matrix(),
        Matrix4D::translation(0.0, 3.0, 0.0));
}

#[test]
fn singular_stack_top_is_a_parse_error() {
    let mut b = SceneBuilder::new(".");
    b.stack_mut().apply(Matrix4D::scaling(0.0, 1.0, 1.0));

    let mut s = Shape::cube();
    s.line = 7;
    let err = b.add_shape(s).unwrap_err();
    assert_eq!(err.line(), Some(7));
}

#[test]
fn materials_resolve_by_name_after_the_fact() {
    let mut b = SceneBuilder::new(".");

    let mut s = Shape::sphere();
    s.material_name = "red".to_string();
    b.add_shape(s).unwrap();
    b.add_shape(Shape::cube()).unwrap();

    b.add_material(Material { name: "red".to_string(), ..Default::default() });

    let scene = b.build().unwrap();
    assert_eq!(scene.material_for(&scene.shapes[0]).name, "red");
    assert_eq!(*scene.material_for(&scene.shapes[1]), Material::fallback());
}

#[test]
fn unknown_material_is_fatal() {
    let mut b = SceneBuilder::new(".");
    let mut s = Shape::sphere();
    s.material_name = "nope".to_string();
    s.line = 4;
    b.add_shape(s).unwrap();

    match b.build() {
        Err(ParseError::UnknownMaterial { line, name }) => {
            assert_eq!(line, 4);
            assert_eq!(name, "nope");
        },
        other => panic!("unexpected {:?}", other.map(|s| s.shapes.len())),
    }
}

#[test]
fn closest_hit_scans_every_shape() {
    let mut b = SceneBuilder::new(".");
    b.stack_mut().push(Some(Matrix4D::translation(0.0, 0.0, -10.0)));
    b.add_shape(Shape::sphere()).unwrap();
    b.stack_mut().pop();
    b.stack_mut().push(Some(Matrix4D::translation(0.0, 0.0, -4.0)));
    b.add_shape(Shape::cube()).unwrap();

    let scene = b.build().unwrap();
    let r = Ray::new(Tuple4D::origin(), Tuple4D::vector(0.0, 0.0, -1.0));

    let h = scene.closest_hit(&r, 0.0001).unwrap();
    assert_eq!(h.shape, Some(1));
    assert!(crate::feq(h.t, 3.0));
    assert_eq!(h.normal, Tuple4D::vector(0.0, 0.0, 1.0));

    assert!(scene.occluded(&r, 0.0001, 20.0));
    assert!(!scene.occluded(&r, 0.0001, 2.5));
}
