pub mod obj;

/// One mesh vertex position `[x, y, z]`.
pub type Vertex = [f64; 3];

/// Per-vertex displacement from `from` to `to`.
///
/// Vertices are paired by index; the longer list is truncated to the shorter.
pub fn displacements(from: &[Vertex], to: &[Vertex]) -> Vec<Vertex> {
    from.iter()
        .zip(to.iter())
        .map(|(a, b)| [b[0] - a[0], b[1] - a[1], b[2] - a[2]])
        .collect()
}
