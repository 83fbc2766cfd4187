//! GPU side of the fur density textures plus the diffuse map.
//!
//! All density textures go into one `R8Unorm` 2D array; array layer `i` is
//! texture unit `i` of the shell protocol. Group 1 layout:
//! 0 = fur array, 1 = fur sampler, 2 = diffuse, 3 = diffuse sampler.
//! A shader declaring a plain `texture_2d` gets a `D2` view of layer 0.

use asset::{FurLayerSet, TextureData};

use crate::error::{RenderError, RenderResult};
use crate::program::names;
use crate::uniforms::UniformTable;

/// Upper bound the shader iterates over; keep in sync with `fur.wgsl`.
pub const MAX_FUR_LAYERS: u32 = 8;

/// What to do when more fur textures exist than can be bound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BudgetPolicy {
    /// Bind the first `limit` textures and warn.
    #[default]
    Clamp,
    /// Fail startup.
    Refuse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureBudget {
    pub limit: u32,
    pub policy: BudgetPolicy,
}

impl TextureBudget {
    pub fn from_limits(limits: &wgpu::Limits, policy: BudgetPolicy) -> Self {
        Self {
            limit: limits.max_texture_array_layers.min(MAX_FUR_LAYERS),
            policy,
        }
    }

    /// Number of textures to bind out of `requested`.
    pub fn fit(&self, requested: u32) -> RenderResult<u32> {
        if requested == 0 {
            return Err(RenderError::NoFurLayers);
        }
        if requested <= self.limit {
            return Ok(requested);
        }
        match self.policy {
            BudgetPolicy::Clamp => {
                log::warn!(
                    "{requested} fur textures requested, binding the first {}",
                    self.limit
                );
                Ok(self.limit)
            }
            BudgetPolicy::Refuse => Err(RenderError::TextureBudget {
                requested,
                limit: self.limit,
            }),
        }
    }
}

/// View dimension of the fur binding as the shader declares it.
/// Shaders without a fur texture get the array view.
pub fn fur_view_dimension(table: &UniformTable) -> wgpu::TextureViewDimension {
    let declared = table
        .texture(names::FUR_TEXTURES)
        .or_else(|| table.texture(names::FUR_TEXTURE));
    match declared {
        Some(tb) if !tb.arrayed => wgpu::TextureViewDimension::D2,
        _ => wgpu::TextureViewDimension::D2Array,
    }
}

fn layout_entries(fur_dimension: wgpu::TextureViewDimension) -> [wgpu::BindGroupLayoutEntry; 4] {
    let texture = |binding, view_dimension| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        },
        count: None,
    };
    let sampler = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    };
    [
        texture(0, fur_dimension),
        sampler(1),
        texture(2, wgpu::TextureViewDimension::D2),
        sampler(3),
    ]
}

pub struct FurTextureBindings {
    layer_count: u32,
    #[allow(dead_code)]
    fur_texture: wgpu::Texture,
    #[allow(dead_code)]
    diffuse_texture: wgpu::Texture,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl FurTextureBindings {
    /// Upload the first `layer_count` textures of `fur` and the diffuse map.
    /// A `D2` fur view only ever sees the first texture.
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        fur: &FurLayerSet,
        layer_count: u32,
        fur_dimension: wgpu::TextureViewDimension,
        diffuse: &TextureData,
    ) -> RenderResult<Self> {
        let mut layer_count = layer_count.min(fur.len() as u32);
        if layer_count == 0 {
            return Err(RenderError::NoFurLayers);
        }
        if fur_dimension == wgpu::TextureViewDimension::D2 {
            layer_count = 1;
        }

        let size = wgpu::Extent3d {
            width: fur.width(),
            height: fur.height(),
            depth_or_array_layers: layer_count,
        };
        let fur_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Fur density array"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (i, layer) in fur.layers().iter().take(layer_count as usize).enumerate() {
            queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &fur_texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: i as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                layer.as_bytes(),
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(layer.width()),
                    rows_per_image: Some(layer.height()),
                },
                wgpu::Extent3d {
                    depth_or_array_layers: 1,
                    ..size
                },
            );
        }
        let fur_view = fur_texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Fur density view"),
            dimension: Some(fur_dimension),
            base_array_layer: 0,
            array_layer_count: Some(layer_count),
            ..Default::default()
        });

        let diffuse_size = wgpu::Extent3d {
            width: diffuse.width,
            height: diffuse.height,
            depth_or_array_layers: 1,
        };
        let diffuse_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Diffuse"),
            size: diffuse_size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &diffuse_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &diffuse.data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(diffuse.bytes_per_row()),
                rows_per_image: Some(diffuse.height),
            },
            diffuse_size,
        );
        let diffuse_view = diffuse_texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Tiles must repeat; no mipmaps are generated.
        let fur_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Fur sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let diffuse_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Diffuse sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let layout = Self::create_layout(device, fur_dimension);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Fur textures BG"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&fur_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&fur_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&diffuse_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&diffuse_sampler),
                },
            ],
        });

        log::info!(
            "Uploaded {layer_count} fur textures ({}x{}) and a {}x{} diffuse map",
            fur.width(),
            fur.height(),
            diffuse.width,
            diffuse.height
        );

        Ok(Self {
            layer_count,
            fur_texture,
            diffuse_texture,
            layout,
            bind_group,
        })
    }

    fn create_layout(
        device: &wgpu::Device,
        fur_dimension: wgpu::TextureViewDimension,
    ) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Fur textures BGL"),
            entries: &layout_entries(fur_dimension),
        })
    }

    /// Number of bound fur textures (array layers).
    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
