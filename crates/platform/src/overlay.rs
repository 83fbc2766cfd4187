//! egui control panel drawn on top of the shell pass.

use corelib::Vec3;
use egui::ViewportId;
use egui_wgpu::ScreenDescriptor;
use renderer::{FrameStats, OverlayTarget, ShellParameters};
use winit::{event::WindowEvent, window::Window};

pub const MAX_UI_LAYERS: u32 = 256;

/// Read-only numbers shown in the panel.
#[derive(Clone, Copy, Debug, Default)]
pub struct PanelInfo {
    pub fps: f32,
    pub stats: FrameStats,
    pub fur_textures: u32,
    pub shader_linked: bool,
}

pub struct Overlay {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    paint_jobs: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    pixels_per_point: f32,
}

impl Overlay {
    pub fn new(window: &Window, device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, format, None, 1, false);

        Self {
            ctx,
            state,
            renderer,
            paint_jobs: Vec::new(),
            textures_delta: egui::TexturesDelta::default(),
            pixels_per_point: window.scale_factor() as f32,
        }
    }

    /// Returns `true` when egui consumed the event.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Build the panel; edits land in `params` and apply from the next frame.
    pub fn prepare(&mut self, window: &Window, params: &mut ShellParameters, info: PanelInfo) {
        let raw_input = self.state.take_egui_input(window);
        let output = self.ctx.run(raw_input, |ctx| {
            egui::Window::new("Fur").resizable(false).show(ctx, |ui| {
                ui.label(format!("{:.1} fps", info.fps));
                ui.label(format!("{} shell draws", info.stats.draws));
                ui.label(format!("{} fur textures bound", info.fur_textures));
                if !info.shader_linked {
                    ui.colored_label(egui::Color32::RED, "shader failed to link");
                }
                ui.separator();

                ui.add(egui::Slider::new(&mut params.layer_count, 0..=MAX_UI_LAYERS).text("layers"));
                ui.add(egui::Slider::new(&mut params.fur_length, 0.0..=2.0).text("fur length"));
                color_row(ui, "fur colour", &mut params.base_color);
                color_row(ui, "light colour", &mut params.light_color);

                ui.horizontal(|ui| {
                    ui.label("light");
                    ui.add(egui::DragValue::new(&mut params.light_pos.x).speed(0.1));
                    ui.add(egui::DragValue::new(&mut params.light_pos.y).speed(0.1));
                    ui.add(egui::DragValue::new(&mut params.light_pos.z).speed(0.1));
                });
            });
        });

        self.state
            .handle_platform_output(window, output.platform_output);
        self.paint_jobs = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        self.pixels_per_point = output.pixels_per_point;
        self.textures_delta.append(output.textures_delta);
    }

    /// Record the egui pass on top of the frame. Returns egui's own command
    /// buffers, which must be submitted ahead of `target.encoder`.
    pub fn paint(&mut self, target: OverlayTarget<'_>) -> Vec<wgpu::CommandBuffer> {
        let OverlayTarget {
            device,
            queue,
            encoder,
            view,
            size,
        } = target;
        let screen = ScreenDescriptor {
            size_in_pixels: [size.0, size.1],
            pixels_per_point: self.pixels_per_point,
        };

        for (id, delta) in &self.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        let extra = self
            .renderer
            .update_buffers(device, queue, encoder, &self.paint_jobs, &screen);

        {
            let rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            let mut rpass = rpass.forget_lifetime();
            self.renderer.render(&mut rpass, &self.paint_jobs, &screen);
        }

        for id in &self.textures_delta.free {
            self.renderer.free_texture(id);
        }
        self.textures_delta = egui::TexturesDelta::default();
        extra
    }
}

fn color_row(ui: &mut egui::Ui, label: &str, color: &mut Vec3) {
    ui.horizontal(|ui| {
        ui.label(label);
        let mut rgb = color.to_array();
        if ui.color_edit_button_rgb(&mut rgb).changed() {
            *color = Vec3::from_array(rgb);
        }
    });
}
