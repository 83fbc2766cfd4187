//! OBJ loader for externally supplied fur meshes.
//!
//! Supports positions, normals, texture coordinates, polygon faces (fan
//! triangulated) and a `mtllib` reference whose first `map_Kd` becomes the
//! diffuse texture. Faces without normals get smooth, area-weighted normals so
//! shells can be extruded along them.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};

use crate::mesh::{MeshData, MeshVertex};

/// Mesh plus the material information the renderer cares about.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjModel {
    pub mesh: MeshData,
    /// Material libraries named by `mtllib`, as written in the file.
    pub material_libs: Vec<String>,
    /// Diffuse map resolved relative to the OBJ file, if any.
    pub diffuse_map: Option<PathBuf>,
}

/// Load an OBJ model from a file path, following `mtllib` to find a diffuse map.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> Result<ObjModel> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open OBJ file: {}", path.display()))?;
    let mut model = load_obj_from_reader(BufReader::new(file))?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    for lib in &model.material_libs {
        let mtl_path = base.join(lib);
        match File::open(&mtl_path) {
            Ok(f) => {
                if let Some(map) = parse_diffuse_map(BufReader::new(f))? {
                    model.diffuse_map = Some(base.join(map));
                    break;
                }
            }
            Err(e) => log::warn!("Material library {} not readable: {e}", mtl_path.display()),
        }
    }

    log::info!(
        "Loaded OBJ {}: {} vertices, {} triangles, diffuse={:?}",
        path.display(),
        model.mesh.vertices.len(),
        model.mesh.triangle_count(),
        model.diffuse_map
    );
    Ok(model)
}

/// Load an OBJ model from a [`BufRead`] implementation. `mtllib` is recorded, not followed.
pub fn load_obj_from_reader<R: BufRead>(reader: R) -> Result<ObjModel> {
    parse_obj(reader)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str) -> Result<ObjModel> {
    parse_obj(io::Cursor::new(contents))
}

fn parse_obj<R: BufRead>(reader: R) -> Result<ObjModel> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();
    let mut material_libs = Vec::new();

    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
    struct Key(usize, Option<usize>, Option<usize>);

    let mut unique: HashMap<Key, u32> = HashMap::new();
    let mut vertices: Vec<MeshVertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    // Vertices whose face element carried no `vn` index.
    let mut missing_normal: Vec<bool> = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                positions.push([x, y, z]);
            }
            "vt" => {
                let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                let v = parse_f32(parts.next(), line_no, "v coordinate")?;
                texcoords.push([u, v]);
            }
            "vn" => {
                let nx = parse_f32(parts.next(), line_no, "nx coordinate")?;
                let ny = parse_f32(parts.next(), line_no, "ny coordinate")?;
                let nz = parse_f32(parts.next(), line_no, "nz coordinate")?;
                normals.push([nx, ny, nz]);
            }
            "mtllib" => {
                let rest = trimmed["mtllib".len()..].trim();
                if !rest.is_empty() {
                    material_libs.push(rest.to_string());
                }
            }
            "f" => {
                let mut face: Vec<u32> = Vec::new();
                for part in parts {
                    let (vi, vti, vni) = parse_face_vertex(
                        part,
                        positions.len(),
                        texcoords.len(),
                        normals.len(),
                        line_no,
                    )?;
                    let key = Key(vi, vti, vni);
                    let index = match unique.get(&key) {
                        Some(&idx) => idx,
                        None => {
                            let uv = vti.map(|i| texcoords[i]).unwrap_or([0.0, 0.0]);
                            let normal = vni.map(|i| normals[i]).unwrap_or([0.0, 0.0, 0.0]);
                            let idx = u32::try_from(vertices.len())
                                .map_err(|_| anyhow!("Too many vertices in OBJ (>{})", u32::MAX))?;
                            vertices.push(MeshVertex::new(positions[vi], normal, uv));
                            missing_normal.push(vni.is_none());
                            unique.insert(key, idx);
                            idx
                        }
                    };
                    face.push(index);
                }

                if face.len() < 3 {
                    log::debug!("Skipping degenerate face on line {}", line_no + 1);
                    continue;
                }
                for tri in 1..(face.len() - 1) {
                    indices.extend_from_slice(&[face[0], face[tri], face[tri + 1]]);
                }
            }
            _ => {
                // o/g/s/usemtl and friends carry nothing the shell pass needs.
            }
        }
    }

    if vertices.is_empty() || indices.is_empty() {
        anyhow::bail!("OBJ contained no triangles");
    }

    let mut mesh = MeshData::new(vertices, indices);
    let generated = missing_normal.iter().filter(|&&m| m).count();
    if generated > 0 {
        log::debug!("Generating smooth normals for {generated} OBJ vertices without one");
        generate_smooth_normals(&mut mesh, &missing_normal);
    }

    Ok(ObjModel {
        mesh,
        material_libs,
        diffuse_map: None,
    })
}

/// Set the normal of every vertex flagged in `missing` to the normalised,
/// area-weighted sum of adjacent face normals. Other normals are kept.
///
/// Vertices are shared only when the OBJ references the same position/uv/normal
/// triple, so seams keep hard edges.
fn generate_smooth_normals(mesh: &mut MeshData, missing: &[bool]) {
    let mut acc = vec![[0.0f32; 3]; mesh.vertices.len()];
    for tri in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.vertices[i as usize].position);
        let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let n = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];
        for &i in tri {
            let slot = &mut acc[i as usize];
            slot[0] += n[0];
            slot[1] += n[1];
            slot[2] += n[2];
        }
    }
    for ((v, n), _) in mesh
        .vertices
        .iter_mut()
        .zip(acc)
        .zip(missing)
        .filter(|(_, m)| **m)
    {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        v.normal = if len > f32::EPSILON {
            [n[0] / len, n[1] / len, n[2] / len]
        } else {
            [0.0, 0.0, 1.0]
        };
    }
}

/// First `map_Kd` entry of an MTL file.
fn parse_diffuse_map<R: BufRead>(reader: R) -> Result<Option<String>> {
    for line in reader.lines() {
        let line = line.context("Failed to read MTL line")?;
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("map_Kd") {
            // Options such as `-s 1 1 1` may precede the file name; take the last token.
            if let Some(name) = rest.split_whitespace().last() {
                return Ok(Some(name.to_string()));
            }
        }
    }
    Ok(None)
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> Result<f32> {
    let token = value.ok_or_else(|| anyhow!("Missing {} on line {}", what, line_no + 1))?;
    token
        .parse::<f32>()
        .with_context(|| format!("Failed to parse {} on line {}", what, line_no + 1))
}

fn parse_face_vertex(
    token: &str,
    pos_count: usize,
    tex_count: usize,
    norm_count: usize,
    line_no: usize,
) -> Result<(usize, Option<usize>, Option<usize>)> {
    let mut split = token.split('/');
    let pos = split
        .next()
        .ok_or_else(|| anyhow!("Malformed face element '{}' on line {}", token, line_no + 1))?;
    let pos_idx = resolve_index(pos, pos_count, line_no)?;

    let tex_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, tex_count, line_no)?),
        _ => None,
    };

    let norm_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, norm_count, line_no)?),
        _ => None,
    };

    Ok((pos_idx, tex_idx, norm_idx))
}

/// 1-based or negative (relative) OBJ index to a 0-based index checked against `len`.
fn resolve_index(token: &str, len: usize, line_no: usize) -> Result<usize> {
    let raw = token
        .parse::<i64>()
        .with_context(|| format!("Invalid index '{}' on line {}", token, line_no + 1))?;
    let idx = match raw {
        0 => anyhow::bail!("OBJ indices are 1-based; found 0 on line {}", line_no + 1),
        r if r > 0 => r - 1,
        r => len as i64 + r,
    };
    if idx < 0 || idx as usize >= len {
        anyhow::bail!(
            "OBJ index {} resolved out of bounds (len={}) on line {}",
            raw,
            len,
            line_no + 1
        );
    }
    Ok(idx as usize)
}
