//! Static vertex/index buffers for the shell mesh. Uploaded once at startup.

use asset::{MeshData, MeshVertex};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::{RenderError, RenderResult};

/// Vertex: position + normal + uv, 32 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ShellVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl ShellVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<ShellVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
    };
}

impl From<&MeshVertex> for ShellVertex {
    fn from(v: &MeshVertex) -> Self {
        Self {
            position: v.position,
            normal: v.normal,
            uv: v.uv,
        }
    }
}

pub struct GpuMesh {
    vertex_buf: wgpu::Buffer,
    index_buf: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, mesh: &MeshData) -> RenderResult<Self> {
        if !mesh.is_valid() {
            return Err(RenderError::InvalidMesh);
        }
        let vertices: Vec<ShellVertex> = mesh.vertices.iter().map(ShellVertex::from).collect();

        let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Shell VB"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Shell IB"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        log::info!(
            "Uploaded mesh: {} vertices, {} triangles",
            vertices.len(),
            mesh.triangle_count()
        );

        Ok(Self {
            vertex_buf,
            index_buf,
            index_count: mesh.indices.len() as u32,
        })
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn bind(&self, rpass: &mut wgpu::RenderPass<'_>) {
        rpass.set_vertex_buffer(0, self.vertex_buf.slice(..));
        rpass.set_index_buffer(self.index_buf.slice(..), wgpu::IndexFormat::Uint32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_shader_slots() {
        assert_eq!(std::mem::size_of::<ShellVertex>(), 32);
        assert_eq!(ShellVertex::LAYOUT.array_stride, 32);
        let offsets: Vec<u64> = ShellVertex::LAYOUT.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
        let locations: Vec<u32> = ShellVertex::LAYOUT
            .attributes
            .iter()
            .map(|a| a.shader_location)
            .collect();
        assert_eq!(locations, vec![0, 1, 2]);
    }

    #[test]
    fn converts_mesh_vertices_field_by_field() {
        let v = MeshVertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.25, 0.75]);
        let s = ShellVertex::from(&v);
        assert_eq!(s.position, v.position);
        assert_eq!(s.normal, v.normal);
        assert_eq!(s.uv, v.uv);
    }
}
