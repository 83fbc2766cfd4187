//! Named shader parameters, resolved once from the shader module.
//!
//! [`UniformTable::reflect`] walks every `var<uniform>` struct and every
//! texture handle in a naga module and records where each named member lives.
//! Lookups of unknown names return `None`; writing through a `None` location
//! is a silent no-op, so a shader that dropped a parameter (or failed to
//! compile and has an empty table) never aborts a frame.

use std::collections::HashMap;

use glam::{Mat4, Vec3, Vec4};
use naga::{AddressSpace, ImageClass, Scalar, TypeInner, VectorSize};

/// Value types the shell protocol writes into uniform blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    UInt,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformKind {
    pub fn size(self) -> usize {
        match self {
            UniformKind::Float | UniformKind::Int | UniformKind::UInt => 4,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 => 16,
            UniformKind::Mat4 => 64,
        }
    }

    fn from_naga(inner: &TypeInner) -> Option<Self> {
        match *inner {
            TypeInner::Scalar(s) if s == Scalar::F32 => Some(UniformKind::Float),
            TypeInner::Scalar(s) if s == Scalar::I32 => Some(UniformKind::Int),
            TypeInner::Scalar(s) if s == Scalar::U32 => Some(UniformKind::UInt),
            TypeInner::Vector {
                size: VectorSize::Tri,
                scalar,
            } if scalar == Scalar::F32 => Some(UniformKind::Vec3),
            TypeInner::Vector {
                size: VectorSize::Quad,
                scalar,
            } if scalar == Scalar::F32 => Some(UniformKind::Vec4),
            TypeInner::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Quad,
                scalar,
            } if scalar == Scalar::F32 => Some(UniformKind::Mat4),
            _ => None,
        }
    }
}

/// Where a named member lives: its block (group/binding) and byte offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
    pub offset: u32,
    pub kind: UniformKind,
}

/// A `var<uniform>` block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockLayout {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    /// Struct size in bytes, including trailing padding.
    pub size: u32,
}

/// A texture handle bound at (group, binding); `arrayed` for `texture_2d_array`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureBinding {
    pub group: u32,
    pub binding: u32,
    pub arrayed: bool,
}

/// One texture unit: a binding plus the array layer it reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureUnit {
    pub group: u32,
    pub binding: u32,
    pub layer: u32,
}

#[derive(Clone, Debug, Default)]
pub struct UniformTable {
    members: HashMap<String, UniformLocation>,
    blocks: Vec<BlockLayout>,
    textures: HashMap<String, TextureBinding>,
}

impl UniformTable {
    /// Table with no entries; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn reflect(module: &naga::Module) -> Self {
        let mut table = Self::default();

        for (_, var) in module.global_variables.iter() {
            let Some(rb) = var.binding.as_ref() else {
                continue;
            };
            let var_name = var.name.clone().unwrap_or_default();

            match (var.space, &module.types[var.ty].inner) {
                (AddressSpace::Uniform, TypeInner::Struct { members, span }) => {
                    table.blocks.push(BlockLayout {
                        name: var_name,
                        group: rb.group,
                        binding: rb.binding,
                        size: *span,
                    });
                    for member in members {
                        let Some(name) = member.name.as_ref() else {
                            continue;
                        };
                        match UniformKind::from_naga(&module.types[member.ty].inner) {
                            Some(kind) => {
                                table.members.insert(
                                    name.clone(),
                                    UniformLocation {
                                        group: rb.group,
                                        binding: rb.binding,
                                        offset: member.offset,
                                        kind,
                                    },
                                );
                            }
                            None => log::debug!("Uniform member '{name}' has an unsupported type"),
                        }
                    }
                }
                (
                    AddressSpace::Handle,
                    TypeInner::Image {
                        arrayed,
                        class: ImageClass::Sampled { .. },
                        ..
                    },
                ) => {
                    table.textures.insert(
                        var_name,
                        TextureBinding {
                            group: rb.group,
                            binding: rb.binding,
                            arrayed: *arrayed,
                        },
                    );
                }
                _ => {}
            }
        }

        table
    }

    #[inline]
    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.members.get(name).copied()
    }

    pub fn block(&self, group: u32, binding: u32) -> Option<&BlockLayout> {
        self.blocks
            .iter()
            .find(|b| b.group == group && b.binding == binding)
    }

    /// Block holding the named member.
    pub fn block_of(&self, name: &str) -> Option<&BlockLayout> {
        self.location(name)
            .and_then(|loc| self.block(loc.group, loc.binding))
    }

    pub fn texture(&self, name: &str) -> Option<TextureBinding> {
        self.textures.get(name).copied()
    }

    pub fn blocks(&self) -> &[BlockLayout] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.textures.is_empty()
    }
}

/// Value that can be written into a uniform block.
pub trait UniformValue: Sized {
    const KIND: UniformKind;
    fn write_to(&self, dst: &mut [u8]);
    fn read_from(src: &[u8]) -> Self;
}

impl UniformValue for f32 {
    const KIND: UniformKind = UniformKind::Float;
    fn write_to(&self, dst: &mut [u8]) {
        dst.copy_from_slice(bytemuck::bytes_of(self));
    }
    fn read_from(src: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(src)
    }
}

impl UniformValue for i32 {
    const KIND: UniformKind = UniformKind::Int;
    fn write_to(&self, dst: &mut [u8]) {
        dst.copy_from_slice(bytemuck::bytes_of(self));
    }
    fn read_from(src: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(src)
    }
}

impl UniformValue for u32 {
    const KIND: UniformKind = UniformKind::UInt;
    fn write_to(&self, dst: &mut [u8]) {
        dst.copy_from_slice(bytemuck::bytes_of(self));
    }
    fn read_from(src: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(src)
    }
}

impl UniformValue for Vec3 {
    const KIND: UniformKind = UniformKind::Vec3;
    fn write_to(&self, dst: &mut [u8]) {
        dst.copy_from_slice(bytemuck::cast_slice(&self.to_array()));
    }
    fn read_from(src: &[u8]) -> Self {
        Vec3::from_array(bytemuck::pod_read_unaligned(src))
    }
}

impl UniformValue for Vec4 {
    const KIND: UniformKind = UniformKind::Vec4;
    fn write_to(&self, dst: &mut [u8]) {
        dst.copy_from_slice(bytemuck::cast_slice(&self.to_array()));
    }
    fn read_from(src: &[u8]) -> Self {
        Vec4::from_array(bytemuck::pod_read_unaligned(src))
    }
}

impl UniformValue for Mat4 {
    const KIND: UniformKind = UniformKind::Mat4;
    fn write_to(&self, dst: &mut [u8]) {
        dst.copy_from_slice(bytemuck::cast_slice(&self.to_cols_array()));
    }
    fn read_from(src: &[u8]) -> Self {
        Mat4::from_cols_array(&bytemuck::pod_read_unaligned(src))
    }
}

/// CPU image of one uniform block, uploaded verbatim to its GPU buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformBlock {
    group: u32,
    binding: u32,
    bytes: Vec<u8>,
}

impl UniformBlock {
    pub fn new(layout: &BlockLayout) -> Self {
        Self {
            group: layout.group,
            binding: layout.binding,
            bytes: vec![0; layout.size as usize],
        }
    }

    /// Block that accepts nothing; stands in when the shader lacks the block.
    pub fn detached() -> Self {
        Self {
            group: u32::MAX,
            binding: u32::MAX,
            bytes: Vec::new(),
        }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn range(&self, loc: UniformLocation, kind: UniformKind) -> Option<std::ops::Range<usize>> {
        if loc.group != self.group || loc.binding != self.binding || loc.kind != kind {
            return None;
        }
        let start = loc.offset as usize;
        let end = start + kind.size();
        (end <= self.bytes.len()).then_some(start..end)
    }

    /// Write `value` at `loc`. Returns `false` (and writes nothing) when the
    /// location is missing, belongs to another block, or has another type.
    pub fn set<V: UniformValue>(&mut self, loc: Option<UniformLocation>, value: V) -> bool {
        match loc.and_then(|l| self.range(l, V::KIND)) {
            Some(range) => {
                value.write_to(&mut self.bytes[range]);
                true
            }
            None => false,
        }
    }

    pub fn get<V: UniformValue>(&self, loc: Option<UniformLocation>) -> Option<V> {
        loc.and_then(|l| self.range(l, V::KIND))
            .map(|range| V::read_from(&self.bytes[range]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = r#"
        struct Params {
            scale: f32,
            tint: vec3<f32>,
            count: u32,
            xform: mat4x4<f32>,
            flags: vec2<u32>,
        };
        @group(0) @binding(3) var<uniform> params: Params;
        @group(1) @binding(0) var layers: texture_2d_array<f32>;
        @group(1) @binding(1) var single: texture_2d<f32>;
        @group(1) @binding(2) var samp: sampler;

        @vertex
        fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
            let t = textureSampleLevel(layers, samp, vec2<f32>(0.0), 0u, 0.0)
                + textureSampleLevel(single, samp, vec2<f32>(0.0), 0.0);
            return params.xform * vec4<f32>(params.tint * params.scale, f32(params.count)) + t * f32(i);
        }
    "#;

    fn table() -> UniformTable {
        let module = naga::front::wgsl::parse_str(SRC).expect("test shader parses");
        UniformTable::reflect(&module)
    }

    #[test]
    fn reflects_members_with_std140_offsets() {
        let t = table();
        let scale = t.location("scale").expect("scale");
        assert_eq!((scale.group, scale.binding, scale.offset), (0, 3, 0));
        assert_eq!(scale.kind, UniformKind::Float);

        let tint = t.location("tint").expect("tint");
        assert_eq!((tint.offset, tint.kind), (16, UniformKind::Vec3));
        assert_eq!(t.location("count").map(|l| l.offset), Some(28));
        assert_eq!(t.location("xform").map(|l| (l.offset, l.kind)), Some((32, UniformKind::Mat4)));

        // vec2<u32> is outside the protocol's value set.
        assert_eq!(t.location("flags"), None);
        assert_eq!(t.location("nope"), None);

        let block = t.block_of("tint").expect("block");
        assert_eq!(block.name, "params");
        assert_eq!(block.size, 112);
    }

    #[test]
    fn reflects_texture_handles() {
        let t = table();
        assert_eq!(
            t.texture("layers"),
            Some(TextureBinding { group: 1, binding: 0, arrayed: true })
        );
        assert_eq!(t.texture("single").map(|b| b.arrayed), Some(false));
        assert_eq!(t.texture("samp"), None);
    }

    #[test]
    fn block_writes_land_at_reflected_offsets() {
        let t = table();
        let mut block = UniformBlock::new(t.block(0, 3).expect("block"));
        assert_eq!(block.len(), 112);

        assert!(block.set(t.location("tint"), Vec3::new(1.0, 2.0, 3.0)));
        assert!(block.set(t.location("count"), 7u32));
        let m = Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0));
        assert!(block.set(t.location("xform"), m));

        assert_eq!(&block.bytes()[16..20], &1.0f32.to_ne_bytes());
        assert_eq!(block.get::<u32>(t.location("count")), Some(7));
        assert_eq!(block.get::<Mat4>(t.location("xform")), Some(m));
    }

    #[test]
    fn mismatched_or_missing_locations_are_ignored() {
        let t = table();
        let mut block = UniformBlock::new(t.block(0, 3).expect("block"));
        let before = block.clone();

        assert!(!block.set(t.location("missing"), 1.0f32));
        // Wrong type for the member.
        assert!(!block.set(t.location("scale"), Vec3::ONE));
        // Location from another block.
        let foreign = UniformLocation { group: 0, binding: 0, offset: 0, kind: UniformKind::Float };
        assert!(!block.set(Some(foreign), 1.0f32));
        assert_eq!(block, before);

        let mut detached = UniformBlock::detached();
        assert!(!detached.set(t.location("scale"), 1.0f32));
        assert!(detached.is_empty());
    }
}
