//! CPU-side mesh representation shared by every mesh provider.

/// Vertex with position/normal/uv. Values are in object space.
///
/// Field order and sizes match the shader's vertex slots 0/1/2.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Indexed triangle list with tightly-packed vertices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Non-empty, a whole number of triangles, and every index in range.
    pub fn is_valid(&self) -> bool {
        let n = self.vertices.len();
        !self.vertices.is_empty()
            && !self.indices.is_empty()
            && self.indices.len() % 3 == 0
            && self.indices.iter().all(|&i| (i as usize) < n)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_data_validity() {
        let data = MeshData::new(vec![MeshVertex::default(); 3], vec![0, 1, 2]);
        assert!(data.is_valid());
        assert_eq!(data.triangle_count(), 1);

        let out_of_range = MeshData::new(vec![MeshVertex::default(); 3], vec![0, 1, 3]);
        assert!(!out_of_range.is_valid());

        let partial = MeshData::new(vec![MeshVertex::default(); 3], vec![0, 1]);
        assert!(!partial.is_valid());
    }
}
