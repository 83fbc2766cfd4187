//! Shader program front end: compile WGSL on the CPU, reflect its parameters,
//! and resolve the shell protocol's locations once.
//!
//! Compilation problems are reported, never fatal. A program that failed to
//! parse, validate or link still exists; it just has an empty table and
//! [`ShaderProgram::is_linked`] returns `false`.

use std::path::Path;

use naga::ShaderStage;

use crate::uniforms::{BlockLayout, TextureUnit, UniformLocation, UniformTable};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// The fur shader shipped with the renderer.
pub const BUILTIN_FUR_SHADER: &str = include_str!("shaders/fur.wgsl");

/// Parameter names of the shell protocol, exactly as the shader declares them.
pub mod names {
    pub const VIEW: &str = "view";
    pub const PROJECTION: &str = "projection";
    pub const MODEL: &str = "model";
    pub const LIGHT_POS: &str = "lightPos";
    pub const VIEW_POS: &str = "viewPos";
    pub const LIGHT_COLOR: &str = "lightColor";
    pub const OBJECT_COLOR: &str = "objectColor";
    pub const FUR_LENGTH: &str = "furLength";
    pub const FUR_LAYER_COUNT: &str = "furLayerCount";
    pub const SHELL_HEIGHT: &str = "shellHeight";
    pub const FUR_TEXTURES: &str = "furTextures";
    pub const FUR_TEXTURE: &str = "furTexture";
}

#[derive(Debug)]
pub struct ShaderProgram {
    label: String,
    source: String,
    table: UniformTable,
    diagnostics: Option<String>,
}

impl ShaderProgram {
    pub fn builtin() -> Self {
        Self::compile("fur.wgsl", BUILTIN_FUR_SHADER)
    }

    /// Read and compile a WGSL file. Read errors produce an unlinked program.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let label = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(source) => Self::compile(label, source),
            Err(e) => Self::unlinked(label, String::new(), format!("failed to read shader: {e}")),
        }
    }

    pub fn compile(label: impl Into<String>, source: impl Into<String>) -> Self {
        let label = label.into();
        let source = source.into();

        let module = match naga::front::wgsl::parse_str(&source) {
            Ok(m) => m,
            Err(e) => {
                let report = e.emit_to_string(&source);
                return Self::unlinked(label, source, report);
            }
        };

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        if let Err(e) = validator.validate(&module) {
            let report = e.emit_to_string(&source);
            return Self::unlinked(label, source, report);
        }

        let missing: Vec<&str> = [
            (VERTEX_ENTRY, ShaderStage::Vertex),
            (FRAGMENT_ENTRY, ShaderStage::Fragment),
        ]
        .into_iter()
        .filter(|(name, stage)| {
            !module
                .entry_points
                .iter()
                .any(|ep| ep.name == *name && ep.stage == *stage)
        })
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            let report = format!("missing entry point(s): {}", missing.join(", "));
            return Self::unlinked(label, source, report);
        }

        log::info!("Shader '{label}' compiled");
        Self {
            table: UniformTable::reflect(&module),
            label,
            source,
            diagnostics: None,
        }
    }

    fn unlinked(label: String, source: String, diagnostics: String) -> Self {
        log::error!("Shader '{label}' failed to build:\n{diagnostics}");
        Self {
            label,
            source,
            table: UniformTable::empty(),
            diagnostics: Some(diagnostics),
        }
    }

    /// Record a failure found later (GPU pipeline creation) and drop the table.
    pub fn mark_link_failed(&mut self, diagnostics: impl Into<String>) {
        let diagnostics = diagnostics.into();
        log::error!("Shader '{}' failed to link:\n{diagnostics}", self.label);
        self.table = UniformTable::empty();
        self.diagnostics = Some(diagnostics);
    }

    #[inline]
    pub fn is_linked(&self) -> bool {
        self.diagnostics.is_none()
    }

    pub fn diagnostics(&self) -> Option<&str> {
        self.diagnostics.as_deref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn uniforms(&self) -> &UniformTable {
        &self.table
    }
}

/// Every location the shell loop touches, looked up once per program.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShellLocations {
    // per frame
    pub view: Option<UniformLocation>,
    pub projection: Option<UniformLocation>,
    pub light_pos: Option<UniformLocation>,
    pub view_pos: Option<UniformLocation>,
    pub light_color: Option<UniformLocation>,
    pub object_color: Option<UniformLocation>,
    pub fur_length: Option<UniformLocation>,
    pub fur_layer_count: Option<UniformLocation>,
    // per layer
    pub model: Option<UniformLocation>,
    pub shell_height: Option<UniformLocation>,
    /// `furTextures[i]`; index is the texture unit.
    pub fur_textures: Vec<Option<TextureUnit>>,
    pub frame_block: Option<BlockLayout>,
    pub layer_block: Option<BlockLayout>,
}

impl ShellLocations {
    pub fn resolve(table: &UniformTable, fur_units: u32) -> Self {
        let find = |name: &str| {
            let loc = table.location(name);
            if loc.is_none() && !table.is_empty() {
                log::debug!("Shader has no '{name}' parameter; writes will be ignored");
            }
            loc
        };

        let fur_textures = match (table.texture(names::FUR_TEXTURES), table.texture(names::FUR_TEXTURE)) {
            (Some(tb), _) if tb.arrayed => (0..fur_units)
                .map(|layer| {
                    Some(TextureUnit {
                        group: tb.group,
                        binding: tb.binding,
                        layer,
                    })
                })
                .collect(),
            (Some(tb), _) | (None, Some(tb)) => (0..fur_units)
                .map(|layer| {
                    (layer == 0).then_some(TextureUnit {
                        group: tb.group,
                        binding: tb.binding,
                        layer: 0,
                    })
                })
                .collect(),
            (None, None) => vec![None; fur_units as usize],
        };

        Self {
            view: find(names::VIEW),
            projection: find(names::PROJECTION),
            light_pos: find(names::LIGHT_POS),
            view_pos: find(names::VIEW_POS),
            light_color: find(names::LIGHT_COLOR),
            object_color: find(names::OBJECT_COLOR),
            fur_length: find(names::FUR_LENGTH),
            fur_layer_count: find(names::FUR_LAYER_COUNT),
            model: find(names::MODEL),
            shell_height: find(names::SHELL_HEIGHT),
            fur_textures,
            frame_block: table.block_of(names::VIEW).cloned(),
            layer_block: table.block_of(names::SHELL_HEIGHT).cloned(),
        }
    }

    /// Texture units the shader can actually read.
    pub fn bound_units(&self) -> u32 {
        self.fur_textures.iter().filter(|u| u.is_some()).count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::UniformKind;

    #[test]
    fn builtin_shader_links() {
        let program = ShaderProgram::builtin();
        assert!(program.is_linked(), "{:?}", program.diagnostics());
        assert!(!program.uniforms().is_empty());
    }

    #[test]
    fn builtin_shader_exposes_full_protocol() {
        let program = ShaderProgram::builtin();
        let locs = ShellLocations::resolve(program.uniforms(), 5);

        for (name, loc, kind) in [
            ("view", locs.view, UniformKind::Mat4),
            ("projection", locs.projection, UniformKind::Mat4),
            ("model", locs.model, UniformKind::Mat4),
            ("lightPos", locs.light_pos, UniformKind::Vec3),
            ("viewPos", locs.view_pos, UniformKind::Vec3),
            ("lightColor", locs.light_color, UniformKind::Vec3),
            ("objectColor", locs.object_color, UniformKind::Vec3),
            ("furLength", locs.fur_length, UniformKind::Float),
            ("furLayerCount", locs.fur_layer_count, UniformKind::UInt),
            ("shellHeight", locs.shell_height, UniformKind::Float),
        ] {
            assert_eq!(loc.map(|l| l.kind), Some(kind), "{name}");
        }

        let frame = locs.frame_block.as_ref().expect("frame block");
        let layer = locs.layer_block.as_ref().expect("layer block");
        assert_eq!((frame.group, frame.binding), (0, 0));
        assert_eq!((layer.group, layer.binding), (0, 1));
        assert_eq!(locs.model.map(|l| l.binding), Some(1));
        assert_eq!(locs.light_pos.map(|l| l.binding), Some(0));

        assert_eq!(locs.bound_units(), 5);
        for (unit, tex) in locs.fur_textures.iter().enumerate() {
            assert_eq!(tex.map(|t| t.layer), Some(unit as u32));
        }
    }

    #[test]
    fn syntax_error_yields_unlinked_program_with_diagnostics() {
        let program = ShaderProgram::compile("broken", "fn vs_main( {");
        assert!(!program.is_linked());
        assert!(program.diagnostics().is_some_and(|d| !d.is_empty()));
        assert!(program.uniforms().is_empty());

        let locs = ShellLocations::resolve(program.uniforms(), 3);
        assert_eq!(locs.view, None);
        assert_eq!(locs.frame_block, None);
        assert_eq!(locs.bound_units(), 0);
        assert_eq!(locs.fur_textures.len(), 3);
    }

    #[test]
    fn missing_entry_point_fails_link() {
        let src = "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }";
        let program = ShaderProgram::compile("vs only", src);
        assert!(!program.is_linked());
        assert!(program.diagnostics().is_some_and(|d| d.contains(FRAGMENT_ENTRY)));
    }

    #[test]
    fn unreadable_file_yields_unlinked_program() {
        let program = ShaderProgram::from_path("no/such/shader.wgsl");
        assert!(!program.is_linked());
        assert!(program.diagnostics().is_some_and(|d| d.contains("failed to read")));
    }

    #[test]
    fn single_fur_texture_binds_only_unit_zero() {
        let src = r#"
            @group(1) @binding(0) var furTexture: texture_2d<f32>;
            @group(1) @binding(1) var s: sampler;
            @vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }
            @fragment fn fs_main() -> @location(0) vec4<f32> {
                return textureSampleLevel(furTexture, s, vec2<f32>(0.5), 0.0);
            }
        "#;
        let program = ShaderProgram::compile("single", src);
        assert!(program.is_linked(), "{:?}", program.diagnostics());
        let locs = ShellLocations::resolve(program.uniforms(), 4);
        assert_eq!(locs.bound_units(), 1);
        assert!(locs.fur_textures[0].is_some());
        assert!(locs.fur_textures[1..].iter().all(Option::is_none));
    }

    #[test]
    fn late_link_failure_clears_table() {
        let mut program = ShaderProgram::builtin();
        program.mark_link_failed("pipeline rejected");
        assert!(!program.is_linked());
        assert_eq!(program.uniforms().location("view"), None);
    }
}
