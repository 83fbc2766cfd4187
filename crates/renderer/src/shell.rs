//! Shell-texturing draw loop.
//!
//! One frame = bind the program once, write the frame block once, then for
//! each shell `i` in `0..layer_count` write `shellHeight = i / layer_count`
//! plus the model matrix and issue one indexed draw over the whole mesh.
//! Displacement along the normal happens in the vertex stage, so the host
//! never touches geometry after startup.
//!
//! [`ShellEncoder`] is the seam between the loop and the graphics API: the
//! wgpu implementation lives in [`crate::pipeline`], tests use a recorder.

use glam::{Mat4, Vec3};

use crate::program::{ShaderProgram, ShellLocations};
use crate::uniforms::UniformBlock;

/// Per-frame shading inputs shared by every shell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShellParameters {
    pub layer_count: u32,
    /// Offset of the outermost shell along the normal, in object units.
    pub fur_length: f32,
    pub base_color: Vec3,
    pub light_pos: Vec3,
    pub view_pos: Vec3,
    pub light_color: Vec3,
}

impl Default for ShellParameters {
    fn default() -> Self {
        Self {
            layer_count: 128,
            fur_length: 0.5,
            base_color: Vec3::new(0.2, 0.9, 0.3),
            light_pos: Vec3::new(5.0, 5.0, 5.0),
            view_pos: Vec3::new(3.0, 3.0, 3.0),
            light_color: Vec3::ONE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub model: Mat4,
}

impl Default for FrameMatrices {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            model: Mat4::IDENTITY,
        }
    }
}

/// `i / layer_count` for `i` in `0..layer_count`: strictly increasing, in `[0, 1)`.
pub fn shell_heights(layer_count: u32) -> impl ExactSizeIterator<Item = f32> {
    (0..layer_count).map(move |i| i as f32 / layer_count as f32)
}

/// Receives the draw stream of one frame.
pub trait ShellEncoder {
    /// Bind program, fur textures and mesh buffers; upload the frame block.
    fn bind_program(&mut self, frame: &UniformBlock);

    /// Draw the full mesh once with this shell's block.
    fn draw_layer(&mut self, layer_index: u32, layer: &UniformBlock, index_count: u32);
}

/// Host side of the shell pass: owns the resolved locations and the CPU
/// images of both uniform blocks.
#[derive(Debug)]
pub struct ShellRenderer {
    locations: ShellLocations,
    frame: UniformBlock,
    layer: UniformBlock,
    linked: bool,
    fur_units: u32,
}

impl ShellRenderer {
    /// `fur_units` is the number of density textures actually bound.
    pub fn new(program: &ShaderProgram, fur_units: u32) -> Self {
        let locations = ShellLocations::resolve(program.uniforms(), fur_units);
        let frame = locations
            .frame_block
            .as_ref()
            .map(UniformBlock::new)
            .unwrap_or_else(UniformBlock::detached);
        let layer = locations
            .layer_block
            .as_ref()
            .map(UniformBlock::new)
            .unwrap_or_else(UniformBlock::detached);

        Self {
            fur_units: locations.bound_units(),
            locations,
            frame,
            layer,
            linked: program.is_linked(),
        }
    }

    pub fn locations(&self) -> &ShellLocations {
        &self.locations
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Record one frame. Returns the number of draws issued.
    ///
    /// An unlinked program or `layer_count == 0` records nothing.
    pub fn render_frame<E: ShellEncoder>(
        &mut self,
        encoder: &mut E,
        index_count: u32,
        params: &ShellParameters,
        matrices: &FrameMatrices,
    ) -> u32 {
        if !self.linked || params.layer_count == 0 {
            return 0;
        }

        let loc = &self.locations;
        let frame = &mut self.frame;
        frame.set(loc.view, matrices.view);
        frame.set(loc.projection, matrices.projection);
        frame.set(loc.light_pos, params.light_pos);
        frame.set(loc.view_pos, params.view_pos);
        frame.set(loc.light_color, params.light_color);
        frame.set(loc.object_color, params.base_color);
        frame.set(loc.fur_length, params.fur_length);
        frame.set(loc.fur_layer_count, self.fur_units);
        encoder.bind_program(frame);

        let mut draws = 0;
        for (i, height) in shell_heights(params.layer_count).enumerate() {
            self.layer.set(loc.shell_height, height);
            self.layer.set(loc.model, matrices.model);
            encoder.draw_layer(i as u32, &self.layer, index_count);
            draws += 1;
        }
        log::trace!("Shell pass: {draws} draws of {index_count} indices");
        draws
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Call {
        Bind(UniformBlock),
        Draw { index: u32, block: UniformBlock, count: u32 },
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl ShellEncoder for Recorder {
        fn bind_program(&mut self, frame: &UniformBlock) {
            self.calls.push(Call::Bind(frame.clone()));
        }

        fn draw_layer(&mut self, layer_index: u32, layer: &UniformBlock, index_count: u32) {
            self.calls.push(Call::Draw {
                index: layer_index,
                block: layer.clone(),
                count: index_count,
            });
        }
    }

    impl Recorder {
        fn draws(&self) -> impl Iterator<Item = (&u32, &UniformBlock, &u32)> {
            self.calls.iter().filter_map(|c| match c {
                Call::Draw { index, block, count } => Some((index, block, count)),
                Call::Bind(_) => None,
            })
        }
    }

    fn run(layers: u32) -> (ShellRenderer, Recorder, u32) {
        let program = ShaderProgram::builtin();
        let mut renderer = ShellRenderer::new(&program, 5);
        let mut rec = Recorder::default();
        let params = ShellParameters {
            layer_count: layers,
            ..Default::default()
        };
        let n = renderer.render_frame(&mut rec, 3672, &params, &FrameMatrices::default());
        (renderer, rec, n)
    }

    #[test]
    fn heights_for_128_layers() {
        let h: Vec<f32> = shell_heights(128).collect();
        assert_eq!(h.len(), 128);
        assert_eq!(h[0], 0.0);
        assert_eq!(h[127], 127.0 / 128.0);
        for (i, w) in h.windows(2).enumerate() {
            assert!(w[1] > w[0]);
            assert_eq!(w[1], (i + 1) as f32 / 128.0);
        }
        assert!(h.iter().all(|&x| (0.0..1.0).contains(&x)));
    }

    #[test]
    fn zero_layers_issue_no_draws() {
        let (_, rec, n) = run(0);
        assert_eq!(n, 0);
        assert!(rec.calls.is_empty());
    }

    #[test]
    fn single_layer_draws_once_at_height_zero() {
        let (renderer, rec, n) = run(1);
        assert_eq!(n, 1);
        let draws: Vec<_> = rec.draws().collect();
        assert_eq!(draws.len(), 1);
        let (index, block, count) = draws[0];
        assert_eq!((*index, *count), (0, 3672));
        assert_eq!(block.get::<f32>(renderer.locations().shell_height), Some(0.0));
    }

    #[test]
    fn frame_block_bound_once_before_all_draws() {
        let (renderer, rec, n) = run(128);
        assert_eq!(n, 128);
        assert!(matches!(rec.calls[0], Call::Bind(_)));
        assert_eq!(rec.calls.iter().filter(|c| matches!(c, Call::Bind(_))).count(), 1);

        let heights: Vec<f32> = rec
            .draws()
            .map(|(_, b, _)| b.get::<f32>(renderer.locations().shell_height).unwrap_or(-1.0))
            .collect();
        let expected: Vec<f32> = shell_heights(128).collect();
        assert_eq!(heights, expected);

        let indices: Vec<u32> = rec.draws().map(|(i, _, _)| *i).collect();
        assert_eq!(indices, (0..128).collect::<Vec<_>>());
    }

    #[test]
    fn frame_and_layer_values_reach_their_blocks() {
        let program = ShaderProgram::builtin();
        let mut renderer = ShellRenderer::new(&program, 5);
        let mut rec = Recorder::default();
        let params = ShellParameters {
            layer_count: 2,
            fur_length: 0.25,
            ..Default::default()
        };
        let model = Mat4::from_rotation_y(0.3);
        let matrices = FrameMatrices {
            view: Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0)),
            model,
            ..Default::default()
        };
        renderer.render_frame(&mut rec, 6, &params, &matrices);

        let loc = renderer.locations().clone();
        let Call::Bind(frame) = &rec.calls[0] else {
            panic!("first call must bind");
        };
        assert_eq!(frame.get::<Mat4>(loc.view), Some(matrices.view));
        assert_eq!(frame.get::<f32>(loc.fur_length), Some(0.25));
        assert_eq!(frame.get::<Vec3>(loc.object_color), Some(params.base_color));
        assert_eq!(frame.get::<Vec3>(loc.light_pos), Some(params.light_pos));
        assert_eq!(frame.get::<u32>(loc.fur_layer_count), Some(5));
        // Layer-cadence names are not part of the frame block.
        assert_eq!(frame.get::<Mat4>(loc.model), None);

        for (_, block, _) in rec.draws() {
            assert_eq!(block.get::<Mat4>(loc.model), Some(model));
        }
    }

    #[test]
    fn unlinked_program_draws_nothing() {
        let program = ShaderProgram::compile("broken", "not wgsl at all");
        let mut renderer = ShellRenderer::new(&program, 5);
        let mut rec = Recorder::default();
        let n = renderer.render_frame(&mut rec, 36, &ShellParameters::default(), &FrameMatrices::default());
        assert_eq!(n, 0);
        assert!(rec.calls.is_empty());
        assert!(!renderer.is_linked());
    }

    #[test]
    fn zero_fur_length_still_draws_every_shell() {
        let program = ShaderProgram::builtin();
        let mut renderer = ShellRenderer::new(&program, 1);
        let mut rec = Recorder::default();
        let params = ShellParameters {
            layer_count: 4,
            fur_length: 0.0,
            ..Default::default()
        };
        assert_eq!(renderer.render_frame(&mut rec, 3, &params, &FrameMatrices::default()), 4);
        let Call::Bind(frame) = &rec.calls[0] else {
            panic!("first call must bind");
        };
        assert_eq!(frame.get::<f32>(renderer.locations().fur_length), Some(0.0));
    }
}
