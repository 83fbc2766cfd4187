//! Mesh providers for the shell renderer.
//!
//! Both providers emit the same vertex layout (position, normal, uv) and
//! counter-clockwise winding, so either can feed the shell pass unchanged.

use std::path::PathBuf;

use anyhow::Result;

use crate::{
    mesh::MeshData,
    obj::load_obj_from_path,
    sphere::{SphereParams, generate_sphere},
    texture::TextureData,
};

/// Supplies static geometry once, before the render loop starts.
pub trait MeshSource {
    fn provide(&self) -> Result<MeshData>;

    /// Geometry plus the diffuse map to modulate the fur colour with, if any.
    fn provide_textured(&self) -> Result<(MeshData, Option<TextureData>)> {
        Ok((self.provide()?, None))
    }

    fn describe(&self) -> String;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SphereSource(pub SphereParams);

impl MeshSource for SphereSource {
    fn provide(&self) -> Result<MeshData> {
        Ok(generate_sphere(&self.0))
    }

    fn describe(&self) -> String {
        format!(
            "sphere r={} sectors={} stacks={}",
            self.0.radius, self.0.sectors, self.0.stacks
        )
    }
}

/// OBJ file on disk; an explicit diffuse path overrides the material's `map_Kd`.
#[derive(Clone, Debug)]
pub struct ObjSource {
    pub path: PathBuf,
    pub diffuse_override: Option<PathBuf>,
}

impl ObjSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            diffuse_override: None,
        }
    }

    pub fn with_diffuse(mut self, path: Option<PathBuf>) -> Self {
        self.diffuse_override = path;
        self
    }
}

impl MeshSource for ObjSource {
    fn provide(&self) -> Result<MeshData> {
        Ok(load_obj_from_path(&self.path)?.mesh)
    }

    fn provide_textured(&self) -> Result<(MeshData, Option<TextureData>)> {
        let model = load_obj_from_path(&self.path)?;
        let diffuse = self
            .diffuse_override
            .as_ref()
            .or(model.diffuse_map.as_ref())
            .map(TextureData::load_png)
            .transpose()?;
        Ok((model.mesh, diffuse))
    }

    fn describe(&self) -> String {
        format!("obj {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_source_provides_valid_mesh() {
        let src = SphereSource::default();
        let (mesh, diffuse) = src.provide_textured().expect("sphere");
        assert!(mesh.is_valid());
        assert!(diffuse.is_none());
        assert!(src.describe().contains("sectors=36"));
    }

    #[test]
    fn obj_source_reports_missing_file() {
        let src = ObjSource::new("missing/model.obj");
        let err = src.provide().expect_err("must fail");
        assert!(format!("{err:#}").contains("missing/model.obj"));
    }
}
