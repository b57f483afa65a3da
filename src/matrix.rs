use std::fmt;
use std::ops::{ Index, IndexMut, Mul };
use std::convert::From;

use crate::feq;
use crate::tuple::Tuple4D;
use crate::ray::Ray;
use crate::error::GeometryError;

/// Pivots smaller than this are treated as zero when inverting.
const SINGULAR_EPSILON: f64 = 1e-12;

/// A 4x4 matrix.
///
/// Encodes affine transformations of homogeneous points and vectors (`w`
/// components of `1.0` and `0.0`, respectively). Elements are stored in
/// row-major order and addressed as `m[(row, col)]`.
///
/// Composition follows the usual column-vector convention: in `a * b * p`,
/// `b` is applied to `p` first.
///
/// # Examples
///
/// ```
/// # use scene_tracer::tuple::Tuple4D;
/// # use scene_tracer::matrix::Matrix4D;
/// let m = Matrix4D::translation(1.0, 0.0, 0.0) * Matrix4D::scaling(2.0, 2.0, 2.0);
/// assert_eq!(m * Tuple4D::point(1.0, 1.0, 1.0), Tuple4D::point(3.0, 2.0, 2.0));
/// ```
#[derive(Copy, Clone, Debug, PartialOrd)]
pub struct Matrix4D {
    data: [f64; 16],
}

/// Matrices are compared element-wise, within `FEQ_EPSILON`.
impl PartialEq for Matrix4D {
    fn eq(&self, other: &Matrix4D) -> bool {
        self.data.iter().zip(other.data.iter()).all(|(x, y)| feq(*x, *y))
    }
}

impl Default for Matrix4D {
    fn default() -> Matrix4D {
        Matrix4D::identity()
    }
}

impl Matrix4D {
    /// Creates a new `Matrix4D`. All elements are initialized to `0.0`.
    pub fn zero() -> Matrix4D {
        Matrix4D { data: [0.0; 16] }
    }

    /// Instantiates a 4x4 identity matrix.
    pub fn identity() -> Matrix4D {
        let mut buf = [0.0; 16];
        buf[0] = 1.0; buf[5] = 1.0; buf[10] = 1.0; buf[15] = 1.0;

        Matrix4D { data: buf }
    }

    /// Instantiates a translation by `x`, `y` and `z`.
    pub fn translation(x: f64, y: f64, z: f64) -> Matrix4D {
        let mut trans = Self::identity();
        trans[(0, 3)] = x;
        trans[(1, 3)] = y;
        trans[(2, 3)] = z;

        trans
    }

    /// Instantiates a scale by `x`, `y` and `z` along the respective axes.
    pub fn scaling(x: f64, y: f64, z: f64) -> Matrix4D {
        let mut scale = Self::identity();
        scale[(0, 0)] = x;
        scale[(1, 1)] = y;
        scale[(2, 2)] = z;

        scale
    }

    /// Rotation about the X axis by `r` radians.
    pub fn rotation_x(r: f64) -> Matrix4D {
        Self::rotation_about(Tuple4D::vector(1.0, 0.0, 0.0), r)
    }

    /// Rotation about the Y axis by `r` radians.
    pub fn rotation_y(r: f64) -> Matrix4D {
        Self::rotation_about(Tuple4D::vector(0.0, 1.0, 0.0), r)
    }

    /// Rotation about the Z axis by `r` radians.
    pub fn rotation_z(r: f64) -> Matrix4D {
        Self::rotation_about(Tuple4D::vector(0.0, 0.0, 1.0), r)
    }

    /// Rotation by `degrees` about an arbitrary `axis`.
    ///
    /// Positive angles turn counter-clockwise when looking down the axis
    /// towards the origin. The axis need not be unit length, but it must not
    /// be zero.
    ///
    /// # Examples
    ///
    /// ```
    /// # use scene_tracer::tuple::Tuple4D;
    /// # use scene_tracer::matrix::Matrix4D;
    /// let m = Matrix4D::rotation(90.0, Tuple4D::vector(0.0, 0.0, 2.0)).unwrap();
    /// assert_eq!(m * Tuple4D::point(1.0, 0.0, 0.0), Tuple4D::point(0.0, 1.0, 0.0));
    /// ```
    pub fn rotation(degrees: f64, axis: Tuple4D)
        -> Result<Matrix4D, GeometryError> {
        if axis.magnitude() < SINGULAR_EPSILON {
            return Err(GeometryError::ZeroAxis);
        }

        Ok(Self::rotation_about(axis.normalize(), degrees.to_radians()))
    }

    /// Rodrigues' formula for a unit `axis`.
    fn rotation_about(axis: Tuple4D, r: f64) -> Matrix4D {
        let (s, c) = r.sin_cos();
        let t = 1.0 - c;
        let Tuple4D { x, y, z, .. } = axis;

        Matrix4D::from([
            t * x * x + c,     t * x * y - s * z, t * x * z + s * y, 0.0,
            t * x * y + s * z, t * y * y + c,     t * y * z - s * x, 0.0,
            t * x * z - s * y, t * y * z + s * x, t * z * z + c,     0.0,
            0.0,               0.0,               0.0,               1.0,
        ])
    }

    /// Generates a view transformation.
    ///
    /// The result moves the world so that an eye at `from`, looking at `to`,
    /// ends up at the origin looking down `-z` with `up` projected onto `+y`.
    /// Fails when the eye sits on its target or `up` is parallel to the line
    /// of sight.
    pub fn view_transform(from: Tuple4D, to: Tuple4D, up: Tuple4D)
        -> Result<Matrix4D, GeometryError> {
        let sight = to - from;
        if sight.magnitude() < SINGULAR_EPSILON {
            return Err(GeometryError::DegenerateView("eye and center coincide"));
        }

        let forward = sight.normalize();
        let right = forward.cross(&up.normalize());
        if right.magnitude() < SINGULAR_EPSILON {
            return Err(GeometryError::DegenerateView(
                "up vector is parallel to the view direction"
            ));
        }

        let right = right.normalize();
        let true_up = right.cross(&forward);

        let orientation = Matrix4D::from([
            right.x,    right.y,    right.z,    0.0,
            true_up.x,  true_up.y,  true_up.z,  0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0,        0.0,        0.0,        1.0,
        ]);

        Ok(orientation * Matrix4D::translation(-from.x, -from.y, -from.z))
    }

    /// Produces the transpose of a matrix, returning a new matrix.
    pub fn transposition(&self) -> Matrix4D {
        let mut buf = *self;

        for r in 0..4 {
            for c in (r+1)..4 {
                buf.data.swap(r * 4 + c, c * 4 + r);
            }
        }

        buf
    }

    /// Calculates the inverse of a `Matrix4D`, if it exists.
    ///
    /// Uses Gauss-Jordan elimination with partial pivoting. Returns `None`
    /// for singular matrices and for matrices containing non-finite values.
    pub fn inverse(&self) -> Option<Matrix4D> {
        if self.data.iter().any(|x| !x.is_finite()) {
            return None;
        }

        let mut a = *self;
        let mut inv = Matrix4D::identity();

        for col in 0..4 {
            // Pick the largest remaining entry in this column as the pivot.
            let pivot = (col..4).max_by(|&i, &j| {
                a[(i, col)].abs().partial_cmp(&a[(j, col)].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;

            if a[(pivot, col)].abs() < SINGULAR_EPSILON {
                return None;
            }

            a.swap_rows(col, pivot);
            inv.swap_rows(col, pivot);

            let scale = 1.0 / a[(col, col)];
            for c in 0..4 {
                a[(col, c)] *= scale;
                inv[(col, c)] *= scale;
            }

            for r in 0..4 {
                if r == col {
                    continue;
                }

                let factor = a[(r, col)];
                if factor == 0.0 {
                    continue;
                }

                for c in 0..4 {
                    let (da, dinv) = (factor * a[(col, c)], factor * inv[(col, c)]);
                    a[(r, c)] -= da;
                    inv[(r, c)] -= dinv;
                }
            }
        }

        Some(inv)
    }

    fn swap_rows(&mut self, r1: usize, r2: usize) {
        if r1 == r2 {
            return;
        }

        for c in 0..4 {
            self.data.swap(r1 * 4 + c, r2 * 4 + c);
        }
    }

    /// The upper-left 3x3 block embedded in an otherwise-identity matrix.
    pub fn linear_part(&self) -> Matrix4D {
        let mut m = Matrix4D::identity();
        for r in 0..3 {
            for c in 0..3 {
                m[(r, c)] = self[(r, c)];
            }
        }

        m
    }
}

impl From<[f64; 16]> for Matrix4D {
    fn from(data: [f64; 16]) -> Matrix4D {
        Matrix4D { data }
    }
}

impl Index<(usize, usize)> for Matrix4D {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &f64 {
        &self.data[(index.0 * 4) + index.1]
    }
}

impl IndexMut<(usize, usize)> for Matrix4D {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut f64 {
        &mut self.data[(index.0 * 4) + index.1]
    }
}

/// Matrix product. Not commutative in general.
impl Mul<Matrix4D> for Matrix4D {
    type Output = Matrix4D;

    fn mul(self, other: Matrix4D) -> Matrix4D {
        let mut res = Matrix4D::zero();

        for r in 0..4 {
            for c in 0..4 {
                res[(r, c)] = self[(r, 0)] * other[(0, c)]
                    + self[(r, 1)] * other[(1, c)]
                    + self[(r, 2)] * other[(2, c)]
                    + self[(r, 3)] * other[(3, c)]
            }
        }

        res
    }
}

/// Applies a matrix to a column `Tuple4D`.
impl Mul<Tuple4D> for Matrix4D {
    type Output = Tuple4D;

    fn mul(self, other: Tuple4D) -> Tuple4D {
        let mut buf = [0.0; 4];

        for (r, out) in buf.iter_mut().enumerate() {
            *out = self[(r, 0)] * other.x
                + self[(r, 1)] * other.y
                + self[(r, 2)] * other.z
                + self[(r, 3)] * other.w;
        }

        Tuple4D { x: buf[0], y: buf[1], z: buf[2], w: buf[3] }
    }
}

impl fmt::Display for Matrix4D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..4 {
            write!(f, "|")?;
            for c in 0..4 {
                write!(f, " {} |", self[(r, c)])?;
            }

            if r != 3 {
                writeln!(f)?;
            }
        }

        Ok(())
    }
}

/// A world transform together with the matrices derived from it.
///
/// `inverse` maps world space to object space, and `normal_matrix` (the
/// transposed inverse of the 3x3 block, translation stripped) carries
/// object-space normals back to world space. The three are always updated
/// together.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    matrix: Matrix4D,
    inverse: Matrix4D,
    normal_matrix: Matrix4D,
}

impl Default for Transform {
    fn default() -> Transform {
        Transform::identity()
    }
}

impl Transform {
    pub fn identity() -> Transform {
        Transform {
            matrix: Matrix4D::identity(),
            inverse: Matrix4D::identity(),
            normal_matrix: Matrix4D::identity(),
        }
    }

    /// Builds a transform, failing on a singular matrix.
    pub fn new(matrix: Matrix4D) -> Result<Transform, GeometryError> {
        let inverse = matrix.inverse().ok_or(GeometryError::SingularMatrix)?;
        let normal_matrix = inverse.linear_part().transposition();

        Ok(Transform { matrix, inverse, normal_matrix })
    }

    /// Replaces the matrix. On failure the transform is left untouched.
    pub fn set_matrix(&mut self, matrix: Matrix4D) -> Result<(), GeometryError> {
        *self = Transform::new(matrix)?;
        Ok(())
    }

    pub fn matrix(&self) -> &Matrix4D {
        &self.matrix
    }

    pub fn inverse(&self) -> &Matrix4D {
        &self.inverse
    }

    pub fn normal_matrix(&self) -> &Matrix4D {
        &self.normal_matrix
    }

    /// Brings a world-space ray into object space.
    pub fn ray_to_object(&self, ray: &Ray) -> Ray {
        ray.transform(&self.inverse)
    }

    pub fn point_to_world(&self, p: Tuple4D) -> Tuple4D {
        self.matrix * p
    }

    pub fn vector_to_world(&self, v: Tuple4D) -> Tuple4D {
        self.matrix * v.as_vector()
    }

    /// Carries an object-space normal to a unit world-space normal.
    pub fn normal_to_world(&self, n: Tuple4D) -> Tuple4D {
        (self.normal_matrix * n.as_vector()).normalize()
    }
}

/// The transform stack used while a scene is being read.
///
/// The bottom entry is an identity sentinel which can be reset but never
/// popped, so the stack is never empty.
#[derive(Clone, Debug)]
pub struct MatrixStack {
    stack: Vec<Matrix4D>,
}

impl Default for MatrixStack {
    fn default() -> MatrixStack {
        MatrixStack::new()
    }
}

impl MatrixStack {
    pub fn new() -> MatrixStack {
        MatrixStack { stack: vec![Matrix4D::identity()] }
    }

    /// Pushes a new entry: the current top right-multiplied by `m`, or a
    /// copy of the top when `m` is `None` (a save point).
    pub fn push(&mut self, m: Option<Matrix4D>) {
        let top = *self.peek();
        self.stack.push(match m {
            Some(m) => top * m,
            None => top,
        });
    }

    /// Right-multiplies the current top by `m` in place.
    pub fn apply(&mut self, m: Matrix4D) {
        let last = self.stack.len() - 1;
        self.stack[last] = self.stack[last] * m;
    }

    /// Discards the top entry. Returns `None` instead of removing the
    /// sentinel.
    pub fn pop(&mut self) -> Option<Matrix4D> {
        if self.stack.len() == 1 {
            return None;
        }

        self.stack.pop()
    }

    pub fn peek(&self) -> &Matrix4D {
        &self.stack[self.stack.len() - 1]
    }

    /// Resets the top entry to the identity.
    pub fn set_identity(&mut self) {
        let last = self.stack.len() - 1;
        self.stack[last] = Matrix4D::identity();
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

#[test]
fn identity_is_neutral() {
    let i = Matrix4D::identity();
    let a: Matrix4D = [ 1.0, 2.0, 3.0, 4.0,
                        2.0, 4.0, 4.0, 2.0,
                        8.0, 6.0, 4.0, 1.0,
                        0.0, 0.0, 0.0, 1.0, ].into();

    assert_eq!(i * a, a);
    assert_eq!(a * i, a);
}

#[test]
fn transpose_swaps_rows_and_columns() {
    let a: Matrix4D = [ 0.0, 9.0, 3.0, 0.0,
                        9.0, 8.0, 0.0, 8.0,
                        1.0, 8.0, 5.0, 3.0,
                        0.0, 0.0, 5.0, 8.0, ].into();

    let t = a.transposition();
    assert_eq!(t[(0, 2)], 1.0);
    assert_eq!(t[(2, 0)], 3.0);
    assert_eq!(t.transposition(), a);
}

#[test]
fn inverse_of_general_matrix() {
    let a: Matrix4D = [  8.0, -5.0,  9.0,  2.0,
                         7.0,  5.0,  6.0,  1.0,
                        -6.0,  0.0,  9.0,  6.0,
                        -3.0,  0.0, -9.0, -4.0, ].into();

    let expected: Matrix4D = [ -0.15385, -0.15385, -0.28205, -0.53846,
                               -0.07692,  0.12308,  0.02564,  0.03077,
                                0.35897,  0.35897,  0.43590,  0.92308,
                               -0.69231, -0.69231, -0.76923, -1.92308, ].into();

    let inv = a.inverse().unwrap();
    assert_eq!(inv, expected);
    assert_eq!(a * inv, Matrix4D::identity());
}

#[test]
fn singular_matrix_has_no_inverse() {
    let a = Matrix4D::scaling(1.0, 0.0, 1.0);
    assert_eq!(a.inverse(), None);
}

#[test]
fn translation_ignores_vectors() {
    let m = Matrix4D::translation(5.0, -3.0, 2.0);

    assert_eq!(m * Tuple4D::point(-3.0, 4.0, 5.0), Tuple4D::point(2.0, 1.0, 7.0));
    assert_eq!(m * Tuple4D::vector(-3.0, 4.0, 5.0), Tuple4D::vector(-3.0, 4.0, 5.0));
}

#[test]
fn axis_rotations_turn_counter_clockwise() {
    let quarter = std::f64::consts::FRAC_PI_2;

    assert_eq!(Matrix4D::rotation_x(quarter) * Tuple4D::point(0.0, 1.0, 0.0),
        Tuple4D::point(0.0, 0.0, 1.0));
    assert_eq!(Matrix4D::rotation_y(quarter) * Tuple4D::point(0.0, 0.0, 1.0),
        Tuple4D::point(1.0, 0.0, 0.0));
    assert_eq!(Matrix4D::rotation_z(quarter) * Tuple4D::point(0.0, 1.0, 0.0),
        Tuple4D::point(-1.0, 0.0, 0.0));
}

#[test]
fn axis_angle_rotation_in_degrees() {
    let axis = Tuple4D::vector(1.0, 1.0, 1.0);
    let m = Matrix4D::rotation(120.0, axis).unwrap();

    // A third of a turn about the diagonal cycles the axes.
    assert_eq!(m * Tuple4D::point(1.0, 0.0, 0.0), Tuple4D::point(0.0, 1.0, 0.0));
    assert_eq!(m * Tuple4D::point(0.0, 0.0, 1.0), Tuple4D::point(1.0, 0.0, 0.0));
}

#[test]
fn rotation_about_zero_axis_fails() {
    let r = Matrix4D::rotation(30.0, Tuple4D::vector(0.0, 0.0, 0.0));
    assert_eq!(r, Err(GeometryError::ZeroAxis));
}

#[test]
fn view_transform_moves_world() {
    let from = Tuple4D::point(0.0, 0.0, 8.0);
    let to = Tuple4D::point(0.0, 0.0, 0.0);
    let up = Tuple4D::vector(0.0, 1.0, 0.0);

    assert_eq!(Matrix4D::view_transform(from, to, up).unwrap(),
        Matrix4D::translation(0.0, 0.0, -8.0));
}

#[test]
fn arbitrary_view_transform() {
    let from = Tuple4D::point(1.0, 3.0, 2.0);
    let to = Tuple4D::point(4.0, -2.0, 8.0);
    let up = Tuple4D::vector(1.0, 1.0, 0.0);

    let a: Matrix4D = [ -0.50709, 0.50709,  0.67612, -2.36643,
                         0.76772, 0.60609,  0.12122, -2.82843,
                        -0.35857, 0.59761, -0.71714,  0.00000,
                         0.00000, 0.00000,  0.00000,  1.00000, ].into();

    assert_eq!(Matrix4D::view_transform(from, to, up).unwrap(), a);
}

#[test]
fn degenerate_views_are_rejected() {
    let p = Tuple4D::point(1.0, 1.0, 1.0);
    let up = Tuple4D::vector(0.0, 1.0, 0.0);

    assert!(Matrix4D::view_transform(p, p, up).is_err());
    assert!(Matrix4D::view_transform(p, Tuple4D::point(1.0, 5.0, 1.0), up).is_err());
}

#[test]
fn transform_rejects_singular_matrix() {
    let r = Transform::new(Matrix4D::scaling(2.0, 0.0, 1.0));
    assert_eq!(r, Err(GeometryError::SingularMatrix));

    let mut t = Transform::new(Matrix4D::translation(1.0, 0.0, 0.0)).unwrap();
    assert!(t.set_matrix(Matrix4D::scaling(0.0, 0.0, 0.0)).is_err());
    assert_eq!(*t.matrix(), Matrix4D::translation(1.0, 0.0, 0.0));
}

#[test]
fn normals_use_inverse_transpose() {
    // A sphere squashed along y; the normal at the top must still point up
    // and the translation must not leak into it.
    let m = Matrix4D::translation(3.0, 4.0, 5.0) * Matrix4D::scaling(1.0, 0.5, 1.0);
    let t = Transform::new(m).unwrap();

    let half = 2.0f64.sqrt() / 2.0;
    let n = t.normal_to_world(Tuple4D::vector(0.0, half, -half));

    assert_eq!(n, Tuple4D::vector(0.0, 0.89443, -0.44721));
    assert_eq!(t.normal_to_world(Tuple4D::vector(0.0, 1.0, 0.0)),
        Tuple4D::vector(0.0, 1.0, 0.0));
}

#[test]
fn stack_push_pop_law() {
    let m1 = Matrix4D::translation(1.0, 2.0, 3.0)
        * Matrix4D::rotation(35.0, Tuple4D::vector(0.0, 1.0, 1.0)).unwrap();
    let m2 = Matrix4D::scaling(2.0, 0.5, 4.0);

    let mut stack = MatrixStack::new();
    stack.push(Some(m1));
    let after_m1 = *stack.peek();

    stack.push(Some(m2));
    assert_eq!(*stack.peek(), m1 * m2);

    stack.pop();
    assert_eq!(*stack.peek(), after_m1);
}

#[test]
fn stack_save_point_and_apply() {
    let mut stack = MatrixStack::new();
    stack.apply(Matrix4D::translation(0.0, 1.0, 0.0));
    stack.push(None);
    stack.apply(Matrix4D::scaling(3.0, 3.0, 3.0));

    assert_eq!(*stack.peek() * Tuple4D::point(1.0, 0.0, 0.0),
        Tuple4D::point(3.0, 1.0, 0.0));

    stack.pop();
    assert_eq!(*stack.peek(), Matrix4D::translation(0.0, 1.0, 0.0));
}

#[test]
fn stack_never_pops_sentinel() {
    let mut stack = MatrixStack::new();
    stack.apply(Matrix4D::scaling(2.0, 2.0, 2.0));
    assert_eq!(stack.pop(), None);
    assert_eq!(stack.depth(), 1);

    stack.set_identity();
    assert_eq!(*stack.peek(), Matrix4D::identity());
}
