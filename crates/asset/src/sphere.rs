//! Latitude/longitude UV sphere.

use std::f32::consts::PI;

use crate::mesh::{MeshData, MeshVertex};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphereParams {
    pub radius: f32,
    /// Longitude subdivisions.
    pub sectors: u32,
    /// Latitude subdivisions, pole to pole.
    pub stacks: u32,
}

impl Default for SphereParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            sectors: 36,
            stacks: 18,
        }
    }
}

impl SphereParams {
    /// `(sectors, stacks)` as generated: at least 3 sectors and 2 stacks.
    fn subdivisions(&self) -> (u32, u32) {
        (self.sectors.max(3), self.stacks.max(2))
    }

    pub fn vertex_count(&self) -> usize {
        let (sectors, stacks) = self.subdivisions();
        (stacks as usize + 1) * (sectors as usize + 1)
    }

    /// Pole rows contribute one triangle per sector, all other rows two.
    pub fn index_count(&self) -> usize {
        let (sectors, stacks) = self.subdivisions();
        6 * sectors as usize * (stacks as usize - 1)
    }
}

/// Build the sphere. The seam column is duplicated so `u` runs 0..=1.
///
/// Triangles are counter-clockwise seen from outside, +Z is the north pole.
pub fn generate_sphere(params: &SphereParams) -> MeshData {
    let radius = params.radius;
    let (sectors, stacks) = params.subdivisions();

    let sector_step = 2.0 * PI / sectors as f32;
    let stack_step = PI / stacks as f32;
    let inv_radius = if radius != 0.0 { 1.0 / radius } else { 0.0 };

    let mut vertices = Vec::with_capacity(params.vertex_count());
    for i in 0..=stacks {
        let stack_angle = PI / 2.0 - i as f32 * stack_step;
        let ring = radius * stack_angle.cos();
        let z = radius * stack_angle.sin();

        for j in 0..=sectors {
            let sector_angle = j as f32 * sector_step;
            let x = ring * sector_angle.cos();
            let y = ring * sector_angle.sin();
            vertices.push(MeshVertex::new(
                [x, y, z],
                [x * inv_radius, y * inv_radius, z * inv_radius],
                [j as f32 / sectors as f32, i as f32 / stacks as f32],
            ));
        }
    }

    let mut indices = Vec::with_capacity(params.index_count());
    for i in 0..stacks {
        let mut k1 = i * (sectors + 1);
        let mut k2 = k1 + sectors + 1;
        for _ in 0..sectors {
            if i != 0 {
                indices.extend_from_slice(&[k1, k2, k1 + 1]);
            }
            if i != stacks - 1 {
                indices.extend_from_slice(&[k1 + 1, k2, k2 + 1]);
            }
            k1 += 1;
            k2 += 1;
        }
    }

    MeshData::new(vertices, indices)
}
