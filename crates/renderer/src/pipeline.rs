//! wgpu pipeline for the shell pass.
//!
//! Group 0 holds the frame block (binding 0) and the layer block (binding 1).
//! The layer block lives in one buffer with a slot per shell; each draw picks
//! its slot with a dynamic offset, and all slots are uploaded with a single
//! `write_buffer` after the draws are recorded.

use std::num::NonZeroU64;

use crate::fur_textures::FurTextureBindings;
use crate::gpu_mesh::{GpuMesh, ShellVertex};
use crate::program::{FRAGMENT_ENTRY, ShaderProgram, ShellLocations, VERTEX_ENTRY};
use crate::shell::ShellEncoder;
use crate::uniforms::UniformBlock;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Most shells drawn in one frame.
pub const MAX_SHELL_LAYERS: u32 = 1 << 16;

pub struct ShellPipeline {
    pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    uniform_bg: wgpu::BindGroup,
    frame_buf: wgpu::Buffer,
    layer_buf: wgpu::Buffer,
    frame_binding: u32,
    layer_binding: u32,
    layer_size: u64,
    layer_stride: u64,
    layer_capacity: u32,
    max_layer_slots: u32,
}

impl ShellPipeline {
    /// Returns `None` when the program lacks either uniform block.
    pub fn new(
        device: &wgpu::Device,
        program: &ShaderProgram,
        locations: &ShellLocations,
        fur: &FurTextureBindings,
        color_format: wgpu::TextureFormat,
        initial_layers: u32,
    ) -> Option<Self> {
        let (Some(frame_block), Some(layer_block)) = (&locations.frame_block, &locations.layer_block)
        else {
            log::error!("Shader '{}' has no frame/layer uniform blocks", program.label());
            return None;
        };
        let frame_size = u64::from(frame_block.size);
        let layer_size = u64::from(layer_block.size);
        let layer_stride = layer_stride(
            layer_size,
            device.limits().min_uniform_buffer_offset_alignment,
        );

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shell uniforms BGL"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: frame_block.binding,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(frame_size),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: layer_block.binding,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: NonZeroU64::new(layer_size),
                    },
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(program.label()),
            source: wgpu::ShaderSource::Wgsl(program.source().into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shell PipelineLayout"),
            bind_group_layouts: &[&uniform_layout, fur.layout()],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Shell Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(VERTEX_ENTRY),
                buffers: &[ShellVertex::LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(FRAGMENT_ENTRY),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // Shells are seen from both sides near silhouettes.
            primitive: wgpu::PrimitiveState {
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let frame_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shell frame UBO"),
            size: frame_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let max_slots = max_layer_slots(layer_stride, device.limits().max_buffer_size);
        let layer_capacity = initial_layers.clamp(1, max_slots);
        let layer_buf = create_layer_buffer(device, layer_stride, layer_capacity);
        let uniform_bg = create_uniform_bg(
            device,
            &uniform_layout,
            (frame_block.binding, &frame_buf),
            (layer_block.binding, &layer_buf, layer_size),
        );

        log::info!(
            "Shell pipeline ready: frame block {frame_size} B, layer block {layer_size} B (stride {layer_stride})"
        );

        Some(Self {
            pipeline,
            uniform_layout,
            uniform_bg,
            frame_buf,
            layer_buf,
            frame_binding: frame_block.binding,
            layer_binding: layer_block.binding,
            layer_size,
            layer_stride,
            layer_capacity,
            max_layer_slots: max_slots,
        })
    }

    #[inline]
    pub fn layer_capacity(&self) -> u32 {
        self.layer_capacity
    }

    /// Grow the layer-slot buffer so `layer_count` shells fit, up to what the
    /// device allows. Shells past the last slot are skipped. Call outside a pass.
    pub fn ensure_layer_capacity(&mut self, device: &wgpu::Device, layer_count: u32) {
        if layer_count <= self.layer_capacity || self.layer_capacity >= self.max_layer_slots {
            return;
        }
        let capacity = grown_capacity(layer_count, self.max_layer_slots);
        log::debug!("Growing layer slots {} -> {capacity}", self.layer_capacity);

        self.layer_buf = create_layer_buffer(device, self.layer_stride, capacity);
        self.uniform_bg = create_uniform_bg(
            device,
            &self.uniform_layout,
            (self.frame_binding, &self.frame_buf),
            (self.layer_binding, &self.layer_buf, self.layer_size),
        );
        self.layer_capacity = capacity;
    }

    pub fn begin<'a, 'enc>(
        &'a self,
        rpass: &'a mut wgpu::RenderPass<'enc>,
        fur: &'a FurTextureBindings,
        mesh: &'a GpuMesh,
    ) -> WgpuShellPass<'a, 'enc> {
        WgpuShellPass {
            rpass,
            pipeline: self,
            fur,
            mesh,
            frame_bytes: Vec::new(),
            layer_bytes: Vec::new(),
            skipped: 0,
        }
    }
}

/// Block size rounded up to the dynamic-offset alignment.
fn layer_stride(layer_size: u64, alignment: u32) -> u64 {
    let align = u64::from(alignment.max(1));
    layer_size.div_ceil(align) * align
}

/// Slots one layer buffer can hold: bounded by `max_buffer_size`, by dynamic
/// offsets fitting in `u32`, and by [`MAX_SHELL_LAYERS`]. Never below 1.
fn max_layer_slots(stride: u64, max_buffer_size: u64) -> u32 {
    let stride = stride.max(1);
    let by_buffer = max_buffer_size / stride;
    let by_offset = u64::from(u32::MAX) / stride + 1;
    let slots = by_buffer.min(by_offset).min(u64::from(MAX_SHELL_LAYERS));
    u32::try_from(slots).unwrap_or(MAX_SHELL_LAYERS).max(1)
}

/// Next power of two holding `requested` slots, capped at `max_slots`.
fn grown_capacity(requested: u32, max_slots: u32) -> u32 {
    requested
        .checked_next_power_of_two()
        .unwrap_or(max_slots)
        .min(max_slots)
}

fn create_layer_buffer(device: &wgpu::Device, stride: u64, capacity: u32) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Shell layer UBO"),
        size: stride * u64::from(capacity),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_uniform_bg(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    (frame_binding, frame_buf): (u32, &wgpu::Buffer),
    (layer_binding, layer_buf, layer_size): (u32, &wgpu::Buffer, u64),
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Shell uniforms BG"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: frame_binding,
                resource: frame_buf.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: layer_binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: layer_buf,
                    offset: 0,
                    size: NonZeroU64::new(layer_size),
                }),
            },
        ],
    })
}

/// [`ShellEncoder`] recording into an open render pass.
///
/// Uniform bytes are staged on the CPU; [`WgpuShellPass::finish`] uploads them
/// before the command buffer is submitted.
pub struct WgpuShellPass<'a, 'enc> {
    rpass: &'a mut wgpu::RenderPass<'enc>,
    pipeline: &'a ShellPipeline,
    fur: &'a FurTextureBindings,
    mesh: &'a GpuMesh,
    frame_bytes: Vec<u8>,
    layer_bytes: Vec<u8>,
    skipped: u32,
}

impl ShellEncoder for WgpuShellPass<'_, '_> {
    fn bind_program(&mut self, frame: &UniformBlock) {
        self.frame_bytes.clear();
        self.frame_bytes.extend_from_slice(frame.bytes());

        self.rpass.set_pipeline(&self.pipeline.pipeline);
        self.rpass.set_bind_group(1, self.fur.bind_group(), &[]);
        self.mesh.bind(self.rpass);
    }

    fn draw_layer(&mut self, layer_index: u32, layer: &UniformBlock, index_count: u32) {
        if layer_index >= self.pipeline.layer_capacity {
            self.skipped += 1;
            return;
        }
        let offset = u64::from(layer_index) * self.pipeline.layer_stride;
        let (Ok(dynamic), Ok(start)) = (u32::try_from(offset), usize::try_from(offset)) else {
            self.skipped += 1;
            return;
        };
        self.layer_bytes.resize(start, 0);
        self.layer_bytes.extend_from_slice(layer.bytes());

        self.rpass
            .set_bind_group(0, &self.pipeline.uniform_bg, &[dynamic]);
        self.rpass.draw_indexed(0..index_count, 0, 0..1);
    }
}

impl WgpuShellPass<'_, '_> {
    /// Upload the staged blocks: one write for the frame, one for all layers.
    pub fn finish(self, queue: &wgpu::Queue) {
        if self.skipped > 0 {
            log::warn!("{} shells exceeded the layer slots and were skipped", self.skipped);
        }
        if !self.frame_bytes.is_empty() {
            queue.write_buffer(&self.pipeline.frame_buf, 0, &self.frame_bytes);
        }
        if !self.layer_bytes.is_empty() {
            queue.write_buffer(&self.pipeline.layer_buf, 0, &self.layer_bytes);
        }
    }
}
