//! Renderer: wgpu init, fur texture upload, and the shell pass.
//! wgpu = 23.x, winit = 0.30.x

pub mod error;
pub mod fur_textures;
pub mod gpu_mesh;
pub mod pipeline;
pub mod program;
pub mod shell;
pub mod uniforms;

use std::sync::Arc;

use asset::{FurLayerSet, MeshData, TextureData};
use wgpu::{
    CommandEncoder, CommandEncoderDescriptor, Device, DeviceDescriptor, Extent3d, Features,
    Instance, InstanceDescriptor, Limits, LoadOp, Operations, PowerPreference, PresentMode, Queue,
    RenderPassColorAttachment, RenderPassDescriptor, StoreOp, Surface, SurfaceConfiguration,
    SurfaceError, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor,
};
use winit::{dpi::PhysicalSize, window::Window};

pub use error::{RenderError, RenderResult};
pub use fur_textures::{
    BudgetPolicy, FurTextureBindings, MAX_FUR_LAYERS, TextureBudget, fur_view_dimension,
};
pub use gpu_mesh::{GpuMesh, ShellVertex};
pub use pipeline::{DEPTH_FORMAT, MAX_SHELL_LAYERS, ShellPipeline, WgpuShellPass};
pub use program::{ShaderProgram, ShellLocations};
pub use shell::{FrameMatrices, ShellEncoder, ShellParameters, ShellRenderer, shell_heights};

/// Everything the renderer needs at startup.
pub struct RendererSetup<'a> {
    pub backends: wgpu::Backends,
    pub fur: &'a FurLayerSet,
    pub mesh: &'a MeshData,
    /// Multiplied into the base colour; white when absent.
    pub diffuse: Option<&'a TextureData>,
    pub program: ShaderProgram,
    pub budget_policy: BudgetPolicy,
    pub clear_color: wgpu::Color,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draws: u32,
}

/// Handed to the overlay callback after the shell pass has been recorded.
pub struct OverlayTarget<'a> {
    pub device: &'a Device,
    pub queue: &'a Queue,
    pub encoder: &'a mut CommandEncoder,
    pub view: &'a TextureView,
    pub size: (u32, u32),
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Shell pass
    program: ShaderProgram,
    shell: ShellRenderer,
    pipeline: Option<ShellPipeline>,
    fur: FurTextureBindings,
    mesh: GpuMesh,

    // Depth
    depth_view: TextureView,

    clear_color: wgpu::Color,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window> and upload all static data.
    pub async fn new(window: Arc<Window>, setup: RendererSetup<'_>) -> RenderResult<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(InstanceDescriptor {
            backends: setup.backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        let info = adapter.get_info();
        log::info!("Adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("Furshell Device"),
                    required_features: Features::empty(),
                    required_limits: Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;
        device.on_uncaptured_error(Box::new(|e| log::error!("wgpu: {e}")));

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .unwrap_or(TextureFormat::Bgra8UnormSrgb);

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        let depth_view = create_depth_view(&device, &surface_config);

        // ==== Static data ====
        let budget = TextureBudget::from_limits(&device.limits(), setup.budget_policy);
        let bound = budget.fit(setup.fur.len() as u32)?;
        let white = TextureData::solid([255, 255, 255, 255]);
        let diffuse = setup.diffuse.unwrap_or(&white);
        let mut program = setup.program;
        let fur_dimension = fur_view_dimension(program.uniforms());
        let fur = FurTextureBindings::upload(
            &device,
            &queue,
            setup.fur,
            bound,
            fur_dimension,
            diffuse,
        )?;
        let mesh = GpuMesh::upload(&device, setup.mesh)?;

        // ==== Pipeline ====
        let pipeline = if program.is_linked() {
            let locations = ShellLocations::resolve(program.uniforms(), fur.layer_count());
            device.push_error_scope(wgpu::ErrorFilter::Validation);
            let pipeline = ShellPipeline::new(
                &device,
                &program,
                &locations,
                &fur,
                surface_format,
                ShellParameters::default().layer_count,
            );
            match device.pop_error_scope().await {
                Some(err) => {
                    program.mark_link_failed(err.to_string());
                    None
                }
                None if pipeline.is_none() => {
                    program.mark_link_failed("shader lacks the shell uniform blocks");
                    None
                }
                None => pipeline,
            }
        } else {
            None
        };
        if pipeline.is_none() {
            log::warn!("Shell pass disabled; frames will only be cleared");
        }
        let shell = ShellRenderer::new(&program, fur.layer_count());

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            program,
            shell,
            pipeline,
            fur,
            mesh,
            depth_view,
            clear_color: setup.clear_color,
            width,
            height,
        })
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    /// Render one frame: clear, shell pass, overlay, present.
    pub fn render<F>(
        &mut self,
        params: &ShellParameters,
        matrices: &FrameMatrices,
        overlay: F,
    ) -> Result<FrameStats, SurfaceError>
    where
        F: FnOnce(OverlayTarget<'_>) -> Vec<wgpu::CommandBuffer>,
    {
        let params = &ShellParameters {
            layer_count: params.layer_count.min(MAX_SHELL_LAYERS),
            ..*params
        };
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.ensure_layer_capacity(&self.device, params.layer_count);
        }

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        let mut draws = 0;
        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("ShellPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(self.clear_color),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(pipeline) = self.pipeline.as_ref() {
                let mut pass = pipeline.begin(&mut rpass, &self.fur, &self.mesh);
                draws = self
                    .shell
                    .render_frame(&mut pass, self.mesh.index_count(), params, matrices);
                pass.finish(&self.queue);
            }
        }

        let overlay_buffers = overlay(OverlayTarget {
            device: &self.device,
            queue: &self.queue,
            encoder: &mut encoder,
            view: &view,
            size: (self.width, self.height),
        });

        self.queue
            .submit(submission_order(overlay_buffers, encoder.finish()));
        frame.present();
        Ok(FrameStats { draws })
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn surface_format(&self) -> TextureFormat {
        self.surface_config.format
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    /// Fur textures actually bound after the texture budget was applied.
    pub fn bound_fur_layers(&self) -> u32 {
        self.fur.layer_count()
    }
}

/// Overlay buffers first, then the frame's own encoder.
fn submission_order<T>(overlay: Vec<T>, frame: T) -> impl Iterator<Item = T> {
    overlay.into_iter().chain(std::iter::once(frame))
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_buffers_are_submitted_before_the_frame() {
        let order: Vec<&str> =
            submission_order(vec!["egui upload", "egui callback"], "frame").collect();
        assert_eq!(order, ["egui upload", "egui callback", "frame"]);
        assert_eq!(submission_order(Vec::new(), "frame").collect::<Vec<_>>(), ["frame"]);
    }
}
