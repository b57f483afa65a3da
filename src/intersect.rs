use crate::tuple::Tuple4D;

/// The result of a ray/shape intersection query.
///
/// Returned by value from every query so that concurrent renders never share
/// a record. When a query runs without full fields only `t` (and `shape`) are
/// meaningful; the remaining fields keep their defaults.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Hit {
    /// Ray parameter of the hit, in the units of the ray that was queried.
    pub t: f64,

    /// Index of the hit shape in its `Scene`, once the scene has stamped it.
    pub shape: Option<usize>,

    pub point: Tuple4D,
    pub normal: Tuple4D,

    /// Texture coordinates, both in `[0, 1]`.
    pub u: f64,
    pub v: f64,

    /// Surface tangents along increasing `u` and `v`.
    pub dpdu: Tuple4D,
    pub dpdv: Tuple4D,
}

impl Hit {
    /// A hit that only records its ray parameter.
    pub fn at(t: f64) -> Hit {
        Hit { t, ..Default::default() }
    }

    /// Keeps whichever of two optional hits is nearer.
    pub fn nearest(a: Option<Hit>, b: Option<Hit>) -> Option<Hit> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if b.t < a.t { b } else { a }),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

#[test]
fn nearest_prefers_smaller_t() {
    let a = Some(Hit::at(2.0));
    let b = Some(Hit::at(0.5));

    assert_eq!(Hit::nearest(a, b).map(|h| h.t), Some(0.5));
    assert_eq!(Hit::nearest(b, a).map(|h| h.t), Some(0.5));
}

#[test]
fn nearest_with_missing_side() {
    let a = Some(Hit::at(3.0));

    assert_eq!(Hit::nearest(a, None).map(|h| h.t), Some(3.0));
    assert_eq!(Hit::nearest(None, a).map(|h| h.t), Some(3.0));
    assert_eq!(Hit::nearest(None, None), None);
}
