use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::Vertex;
use crate::error::MotionError;

/// Read the `v x y z` lines of a Wavefront OBJ file, in file order.
///
/// Normals, texture coordinates, faces and comments are skipped.
pub fn load_vertices(path: &Path) -> Result<Vec<Vertex>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read mesh: {:?}", path))?;
    parse_vertices(&content, path)
}

pub fn parse_vertices(content: &str, path: &Path) -> Result<Vec<Vertex>> {
    let mut vertices = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        if !line.starts_with("v ") {
            continue;
        }

        let bad = || MotionError::BadVertex { path: path.to_path_buf(), line: idx + 1 };
        let mut coords = line.split_whitespace().skip(1);
        let mut vertex = [0.0; 3];
        for slot in vertex.iter_mut() {
            let value = coords.next().ok_or_else(bad)?;
            *slot = value.parse::<f64>().map_err(|_| bad())?;
        }
        vertices.push(vertex);
    }

    Ok(vertices)
}
