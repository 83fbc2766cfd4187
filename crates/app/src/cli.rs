//! Command-line arguments for the fur demo.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum GpuBackend {
    Auto,
    Vulkan,
    Dx12,
    Metal,
    Gl,
}

impl GpuBackend {
    pub fn backends(self) -> wgpu::Backends {
        match self {
            GpuBackend::Auto => wgpu::Backends::all(),
            GpuBackend::Vulkan => wgpu::Backends::VULKAN,
            GpuBackend::Dx12 => wgpu::Backends::DX12,
            GpuBackend::Metal => wgpu::Backends::METAL,
            GpuBackend::Gl => wgpu::Backends::GL,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DensityPreset {
    Sparse,
    Medium,
    Dense,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BudgetArg {
    Clamp,
    Refuse,
}

/// Shell-textured fur demo.
///
/// CLI values override the built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "furshell", about = "Real-time shell-texturing fur renderer")]
pub struct CliArgs {
    /// Graphics backend.
    #[arg(long, value_enum)]
    pub gpu_backend: Option<GpuBackend>,

    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Number of shells drawn per frame.
    #[arg(long)]
    pub layers: Option<u32>,

    /// Length of the outermost shell along the normal.
    #[arg(long, allow_negative_numbers = true)]
    pub fur_length: Option<f32>,

    /// Edge length of every density texture, in pixels.
    #[arg(long)]
    pub texture_size: Option<u32>,

    /// Comma-separated dot sizes, one density texture each.
    #[arg(long, value_delimiter = ',')]
    pub dot_sizes: Option<Vec<f32>>,

    /// Dot density preset.
    #[arg(long, value_enum)]
    pub density: Option<DensityPreset>,

    /// Explicit pixels per dot; overrides --density.
    #[arg(long)]
    pub pixels_per_dot: Option<u32>,

    /// Seed of the first density texture; texture i uses seed + i.
    #[arg(long)]
    pub seed: Option<u64>,

    /// OBJ mesh to render instead of the sphere.
    #[arg(long)]
    pub mesh: Option<PathBuf>,

    /// Diffuse PNG multiplied into the fur colour.
    #[arg(long)]
    pub diffuse: Option<PathBuf>,

    /// WGSL shader replacing the built-in one.
    #[arg(long)]
    pub shader: Option<PathBuf>,

    /// Write every density texture as PNG into this directory.
    #[arg(long)]
    pub dump_textures: Option<PathBuf>,

    /// What to do when more textures exist than can be bound.
    #[arg(long, value_enum)]
    pub texture_budget: Option<BudgetArg>,

    /// Model spin in radians per second.
    #[arg(long, allow_negative_numbers = true)]
    pub spin_rate: Option<f32>,

    /// Show the control panel.
    #[arg(long)]
    pub show_ui: bool,

    /// Show FPS in the window title.
    #[arg(long)]
    pub show_fps: bool,
}
